//! Transfer engine: the operation surface over containers and slots
//!
//! Every public operation is atomic: preconditions are checked against a
//! read-only view first, mutation happens only once the whole operation is
//! known to succeed, and a rejected call leaves every slot untouched. After
//! a successful mutation the engine flushes every touched container through
//! the state store and only then notifies observers, so persisted state
//! always reflects the post-condition before the caller regains control.
//!
//! The model is single-threaded and run-to-completion. Observers receive
//! plain event values with no engine handle, so an observer cannot re-enter
//! a mutation while one is in flight; the borrow checker enforces what
//! other engines police with a runtime flag.

use std::collections::HashMap;

use log::warn;

use super::capacity::CapacityPolicy;
use super::container::{Container, ContainerId, SlotAddr};
use super::currency::CurrencyLedger;
use super::error::TransferError;
use super::events::{ContainerEvent, ContainerObserver, InteractionGate};
use super::resolver::can_stack;
use super::router::{self, RouteOutcome};
use super::slot::SlotRole;
use crate::item::{ItemCatalog, ItemCategory, ItemStack};
use crate::save::{codec, StateStore};
use crate::world::{ContainerRegistry, Manifest};

/// A container touched by the current operation, and whether its carry
/// slot changed (which re-runs the capacity policy)
struct Touched {
    id: ContainerId,
    carry_changed: bool,
}

impl Touched {
    fn plain(id: ContainerId) -> Self {
        Touched {
            id,
            carry_changed: false,
        }
    }

    fn carry(id: ContainerId) -> Self {
        Touched {
            id,
            carry_changed: true,
        }
    }
}

fn push_changed(events: &mut Vec<ContainerEvent>, container: ContainerId) {
    let event = ContainerEvent::Changed { container };
    if !events.contains(&event) {
        events.push(event);
    }
}

/// Owns the live containers and applies every storage mutation
///
/// Containers, the world-chest manifest registry, the currency ledger and
/// the state store all hang off the engine; the item catalog is passed
/// into each call. There is no global anywhere — a second engine over a
/// second store is a perfectly valid thing to construct.
pub struct TransferEngine<S: StateStore> {
    containers: HashMap<ContainerId, Container>,
    registry: ContainerRegistry,
    ledger: CurrencyLedger,
    observers: Vec<Box<dyn ContainerObserver>>,
    gate: Option<Box<dyn InteractionGate>>,
    store: S,
}

impl<S: StateStore> TransferEngine<S> {
    pub fn new(store: S) -> Self {
        TransferEngine {
            containers: HashMap::new(),
            registry: ContainerRegistry::new(),
            ledger: CurrencyLedger::new(),
            observers: Vec::new(),
            gate: None,
            store,
        }
    }

    /// Subscribes an observer; notified after mutation + persistence,
    /// in subscription order
    pub fn add_observer(&mut self, observer: Box<dyn ContainerObserver>) {
        self.observers.push(observer);
    }

    /// Installs the interaction collaborator's open-container query,
    /// which gates quick transfer against world chests
    pub fn set_gate(&mut self, gate: Box<dyn InteractionGate>) {
        self.gate = Some(gate);
    }

    /// Attaches a container (replacing any previous one with the same id)
    pub fn attach_container(&mut self, container: Container) {
        self.containers.insert(container.id(), container);
    }

    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(&id)
    }

    pub fn registry(&self) -> &ContainerRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &CurrencyLedger {
        &self.ledger
    }

    /// Progression collaborator's entry point for the mirrored currency
    /// scalar
    pub fn set_mirrored_currency(&mut self, amount: u64) {
        self.ledger.set_mirrored(amount);
    }

    /// The one logical currency quantity: every currency stack in every
    /// attached container, plus the mirrored scalar
    pub fn currency_total(&self, catalog: &ItemCatalog) -> u64 {
        self.ledger.total(catalog, self.containers.values())
    }

    // ======================================================================
    // Transfer operations
    // ======================================================================

    /// Moves the source stack into an empty destination slot
    ///
    /// Requires the destination to be active, empty, and role-compatible
    /// with the stack's category.
    pub fn move_to_empty(
        &mut self,
        catalog: &ItemCatalog,
        src: SlotAddr,
        dst: SlotAddr,
    ) -> Result<(), TransferError> {
        let (src_stack, src_role, _) = self.slot_view(src)?;
        let stack = src_stack.ok_or(TransferError::EmptySource(src))?;
        let category = self.category_of(catalog, &stack)?;

        let (dst_stack, dst_role, dst_active) = self.slot_view(dst)?;
        if !dst_active {
            return Err(TransferError::SlotInactive(dst));
        }
        if dst_stack.is_some() {
            return Err(TransferError::SlotOccupied(dst));
        }
        if !dst_role.accepts(category) {
            return Err(TransferError::RoleRejected {
                addr: dst,
                role: dst_role.name(),
                item_id: stack.item_id,
            });
        }

        let taken = self.take_validated(src);
        self.place_validated(dst, taken);

        let mut events = Vec::new();
        push_changed(&mut events, src.container);
        push_changed(&mut events, dst.container);
        let touched = [
            touch_for(src.container, src_role),
            touch_for(dst.container, dst_role),
        ];
        self.finish(catalog, &touched, events)
    }

    /// Drag-and-drop semantics: move into an empty slot, merge equal
    /// kinds, otherwise swap
    ///
    /// A merge always absorbs the whole source stack — two partial stacks
    /// are never left behind. A swap requires both roles to accept the
    /// other's category; if either refuses, nothing moves.
    pub fn stack_or_swap(
        &mut self,
        catalog: &ItemCatalog,
        src: SlotAddr,
        dst: SlotAddr,
    ) -> Result<(), TransferError> {
        if src == dst {
            return Ok(());
        }

        let (src_stack, src_role, src_active) = self.slot_view(src)?;
        let stack = src_stack.ok_or(TransferError::EmptySource(src))?;

        let (dst_stack, dst_role, dst_active) = self.slot_view(dst)?;
        let Some(resident) = dst_stack else {
            return self.move_to_empty(catalog, src, dst);
        };
        if !dst_active {
            return Err(TransferError::SlotInactive(dst));
        }

        if can_stack(catalog, &stack, &resident) {
            // Merge: destination absorbs the whole source stack.
            if resident.count().checked_add(stack.count()).is_none() {
                return Err(TransferError::InvalidAmount {
                    requested: stack.count(),
                    available: u32::MAX - resident.count(),
                });
            }
            let taken = self.take_validated(src);
            let merged = self
                .containers
                .get_mut(&dst.container)
                .and_then(|container| container.slot_mut(dst.index))
                .and_then(|slot| slot.stack_mut())
                .expect("validated destination vanished mid-operation")
                .merge_from(taken);
            debug_assert!(merged.is_ok());
        } else {
            // Swap, gated on both role filters.
            if !src_active {
                return Err(TransferError::SlotInactive(src));
            }
            let src_category = self.category_of(catalog, &stack)?;
            let dst_category = self.category_of(catalog, &resident)?;
            if !dst_role.accepts(src_category) {
                return Err(TransferError::RoleRejected {
                    addr: dst,
                    role: dst_role.name(),
                    item_id: stack.item_id,
                });
            }
            if !src_role.accepts(dst_category) {
                return Err(TransferError::RoleRejected {
                    addr: src,
                    role: src_role.name(),
                    item_id: resident.item_id,
                });
            }

            let from_src = self.take_validated(src);
            let from_dst = self.take_validated(dst);
            self.place_validated(dst, from_src);
            self.place_validated(src, from_dst);
        }

        let mut events = Vec::new();
        push_changed(&mut events, src.container);
        push_changed(&mut events, dst.container);
        let touched = [
            touch_for(src.container, src_role),
            touch_for(dst.container, dst_role),
        ];
        self.finish(catalog, &touched, events)
    }

    /// Quick transfer (double-click): routes the source stack into the
    /// destination container
    ///
    /// The equipment router gets first refusal; then an existing stack of
    /// the same kind; then the first empty active generic slot. Fails with
    /// `ContainerFull` when none of those exists, leaving the source where
    /// it was. When an interaction gate is installed, world chests on
    /// either side must be open.
    pub fn collect_to_container(
        &mut self,
        catalog: &ItemCatalog,
        src: SlotAddr,
        dst: ContainerId,
    ) -> Result<(), TransferError> {
        if let Some(gate) = &self.gate {
            for id in [src.container, dst] {
                if id.is_world() && !gate.is_container_open(id) {
                    return Err(TransferError::ContainerNotOpen(id));
                }
            }
        }

        let (src_stack, src_role, _) = self.slot_view(src)?;
        let stack = src_stack.ok_or(TransferError::EmptySource(src))?;
        let category = self.category_of(catalog, &stack)?;
        if !self.containers.contains_key(&dst) {
            return Err(TransferError::UnknownContainer(dst));
        }

        // Lift the stack out first so same-container collects cannot merge
        // the stack into itself; it goes back untouched on any failure.
        let taken = self.take_validated(src);

        let dst_container = self
            .containers
            .get_mut(&dst)
            .expect("validated container vanished mid-operation");
        let placement = match router::route(dst_container, catalog, &taken) {
            Ok(RouteOutcome::Placed {
                slot,
                auto_equipped,
            }) => Ok((slot, auto_equipped)),
            Ok(RouteOutcome::FallThrough) | Err(TransferError::UpgradeRejected { .. }) => {
                let dst_container = self
                    .containers
                    .get_mut(&dst)
                    .expect("validated container vanished mid-operation");
                match dst_container.insert_stack(taken.clone()) {
                    Ok(index) => Ok((index, false)),
                    Err(_) => Err(TransferError::ContainerFull(dst)),
                }
            }
            Err(err) => Err(err),
        };

        let (placed_index, auto_equipped) = match placement {
            Ok(result) => result,
            Err(err) => {
                // Undo the lift; the operation never happened.
                self.place_validated(src, taken);
                return Err(err);
            }
        };

        let placed_role = self
            .containers
            .get(&dst)
            .and_then(|container| container.slot(placed_index))
            .map(|slot| slot.role())
            .unwrap_or(SlotRole::Generic);

        let mut events = Vec::new();
        push_changed(&mut events, src.container);
        push_changed(&mut events, dst);
        if auto_equipped {
            events.push(ContainerEvent::AutoEquipped {
                container: dst,
                role: placed_role,
                item_id: taken.item_id.clone(),
            });
        }

        let touched = [
            touch_for(src.container, src_role),
            if placed_role == SlotRole::CarryEquip || category == ItemCategory::CarryUpgrade {
                Touched::carry(dst)
            } else {
                Touched::plain(dst)
            },
        ];
        self.finish(catalog, &touched, events)
    }

    /// Splits `amount` items off a slot and hands them to the caller
    ///
    /// Taking the whole stack empties the slot. The withdrawn stack is the
    /// caller's responsibility from here (a held cursor stack, a drop into
    /// the world); the engine only guarantees the container it left.
    pub fn withdraw(
        &mut self,
        catalog: &ItemCatalog,
        addr: SlotAddr,
        amount: u32,
    ) -> Result<ItemStack, TransferError> {
        let (slot_stack, role, _) = self.slot_view(addr)?;
        let stack = slot_stack.ok_or(TransferError::EmptySource(addr))?;
        if amount == 0 || amount > stack.count() {
            return Err(TransferError::InvalidAmount {
                requested: amount,
                available: stack.count(),
            });
        }

        let withdrawn = if amount == stack.count() {
            self.take_validated(addr)
        } else {
            self.containers
                .get_mut(&addr.container)
                .and_then(|container| container.slot_mut(addr.index))
                .and_then(|slot| slot.stack_mut())
                .and_then(|stack| stack.split(amount))
                .expect("validated split failed mid-operation")
        };

        let mut events = Vec::new();
        push_changed(&mut events, addr.container);
        self.finish(catalog, &[touch_for(addr.container, role)], events)?;
        Ok(withdrawn)
    }

    /// Adds new items to a container (pickup, loot, reward)
    ///
    /// All-or-nothing: the equipment router gets first refusal, then
    /// merge-or-empty-slot placement; a full container rejects the whole
    /// amount. Fires `ItemAdded` on success.
    pub fn deposit(
        &mut self,
        catalog: &ItemCatalog,
        dst: ContainerId,
        item_id: &str,
        count: u32,
    ) -> Result<(), TransferError> {
        let def = catalog
            .get(item_id)
            .ok_or_else(|| TransferError::UnknownItem(item_id.to_string()))?;
        let category = def.category;
        let Some(stack) = ItemStack::new(item_id, count) else {
            return Err(TransferError::InvalidAmount {
                requested: count,
                available: 0,
            });
        };
        if !self.containers.contains_key(&dst) {
            return Err(TransferError::UnknownContainer(dst));
        }

        let dst_container = self
            .containers
            .get_mut(&dst)
            .expect("validated container vanished mid-operation");
        let (placed_index, auto_equipped) = match router::route(dst_container, catalog, &stack) {
            Ok(RouteOutcome::Placed {
                slot,
                auto_equipped,
            }) => (slot, auto_equipped),
            Ok(RouteOutcome::FallThrough) | Err(TransferError::UpgradeRejected { .. }) => {
                let dst_container = self
                    .containers
                    .get_mut(&dst)
                    .expect("validated container vanished mid-operation");
                match dst_container.insert_stack(stack.clone()) {
                    Ok(index) => (index, false),
                    Err(_) => return Err(TransferError::ContainerFull(dst)),
                }
            }
            Err(err) => return Err(err),
        };

        let placed_role = self
            .containers
            .get(&dst)
            .and_then(|container| container.slot(placed_index))
            .map(|slot| slot.role())
            .unwrap_or(SlotRole::Generic);

        let mut events = Vec::new();
        push_changed(&mut events, dst);
        events.push(ContainerEvent::ItemAdded {
            container: dst,
            item_id: item_id.to_string(),
            count,
        });
        if auto_equipped {
            events.push(ContainerEvent::AutoEquipped {
                container: dst,
                role: placed_role,
                item_id: item_id.to_string(),
            });
        }

        let touched = [if category == ItemCategory::CarryUpgrade
            && placed_role == SlotRole::CarryEquip
        {
            Touched::carry(dst)
        } else {
            Touched::plain(dst)
        }];
        self.finish(catalog, &touched, events)
    }

    /// Explicitly equips the item in `src` into its dedicated slot in the
    /// same container
    ///
    /// An occupied weapon slot swaps; occupied armor/carry slots swap only
    /// for a strict upgrade (`UpgradeRejected` otherwise); the revive slot
    /// never swaps (`ReviveCapReached`). The displaced item lands in the
    /// source slot.
    pub fn try_equip(
        &mut self,
        catalog: &ItemCatalog,
        src: SlotAddr,
    ) -> Result<(), TransferError> {
        let (src_stack, src_role, _) = self.slot_view(src)?;
        let stack = src_stack.ok_or(TransferError::EmptySource(src))?;
        let category = self.category_of(catalog, &stack)?;

        let Some(role) = SlotRole::dedicated_for(category) else {
            return Err(TransferError::NotEquippable(stack.item_id));
        };
        if role == SlotRole::Currency {
            // Currency is routed, not equipped.
            return Err(TransferError::NotEquippable(stack.item_id));
        }

        let container = self
            .containers
            .get(&src.container)
            .ok_or(TransferError::UnknownContainer(src.container))?;
        let Some(dedicated_index) = container.role_slot_index(role) else {
            return Err(TransferError::NotEquippable(stack.item_id));
        };
        if dedicated_index == src.index {
            return Ok(());
        }
        let dst = SlotAddr::new(src.container, dedicated_index);

        let resident = container
            .slot(dedicated_index)
            .and_then(|slot| slot.stack())
            .cloned();

        match resident {
            None => {
                let taken = self.take_validated(src);
                self.place_validated(dst, taken);
            }
            Some(equipped) => {
                if role == SlotRole::ReviveEquip {
                    return Err(TransferError::ReviveCapReached);
                }
                if matches!(role, SlotRole::ArmorEquip | SlotRole::CarryEquip) {
                    let offered_def = catalog
                        .get(&stack.item_id)
                        .ok_or_else(|| TransferError::UnknownItem(stack.item_id.clone()))?;
                    let equipped_def = catalog
                        .get(&equipped.item_id)
                        .ok_or_else(|| TransferError::UnknownItem(equipped.item_id.clone()))?;
                    if !offered_def.is_upgrade_over(equipped_def) {
                        return Err(TransferError::UpgradeRejected {
                            offered: stack.item_id,
                            equipped: equipped.item_id,
                        });
                    }
                }

                let from_src = self.take_validated(src);
                let from_dst = self.take_validated(dst);
                self.place_validated(dst, from_src);
                self.place_validated(src, from_dst);
            }
        }

        let mut events = Vec::new();
        push_changed(&mut events, src.container);
        let carry_changed = role == SlotRole::CarryEquip || src_role == SlotRole::CarryEquip;
        let touched = [Touched {
            id: src.container,
            carry_changed,
        }];
        self.finish(catalog, &touched, events)
    }

    /// Re-partitions a container's generic slots into `requested` active
    /// ones
    ///
    /// Stacks caught outside the new active range are forfeit and returned
    /// to the caller — the engine's one documented loss path. Persisted
    /// state reflects the shrink before this returns.
    pub fn set_active_count(
        &mut self,
        catalog: &ItemCatalog,
        id: ContainerId,
        requested: usize,
    ) -> Result<Vec<ItemStack>, TransferError> {
        let container = self
            .containers
            .get_mut(&id)
            .ok_or(TransferError::UnknownContainer(id))?;
        let (_, cleared) = container.set_active_count(requested);

        let mut events = Vec::new();
        push_changed(&mut events, id);
        self.finish(catalog, &[Touched::plain(id)], events)?;
        Ok(cleared)
    }

    /// Moves currency between two containers' currency slots
    ///
    /// The only way currency crosses containers; the three homes of the
    /// one logical amount are never reconciled implicitly.
    pub fn transfer_currency(
        &mut self,
        catalog: &ItemCatalog,
        src: ContainerId,
        dst: ContainerId,
        amount: u32,
    ) -> Result<(), TransferError> {
        if src == dst {
            return Ok(());
        }

        let src_container = self
            .containers
            .get(&src)
            .ok_or(TransferError::UnknownContainer(src))?;
        let src_index = src_container
            .role_slot_index(SlotRole::Currency)
            .ok_or(TransferError::NoCurrencySlot(src))?;
        let src_addr = SlotAddr::new(src, src_index);
        let held = src_container
            .slot(src_index)
            .and_then(|slot| slot.stack())
            .cloned()
            .ok_or(TransferError::EmptySource(src_addr))?;
        if amount == 0 || amount > held.count() {
            return Err(TransferError::InvalidAmount {
                requested: amount,
                available: held.count(),
            });
        }

        let dst_container = self
            .containers
            .get(&dst)
            .ok_or(TransferError::UnknownContainer(dst))?;
        if dst_container.role_slot_index(SlotRole::Currency).is_none() {
            return Err(TransferError::NoCurrencySlot(dst));
        }

        let moving = ItemStack::new(held.item_id.clone(), amount)
            .expect("amount validated non-zero");

        // Place into the destination first (atomic on its own), then
        // subtract the validated amount from the source.
        let dst_container = self
            .containers
            .get_mut(&dst)
            .expect("validated container vanished mid-operation");
        match router::route(dst_container, catalog, &moving)? {
            RouteOutcome::Placed { .. } => {}
            RouteOutcome::FallThrough => return Err(TransferError::NoCurrencySlot(dst)),
        }

        if amount == held.count() {
            self.take_validated(src_addr);
        } else {
            self.containers
                .get_mut(&src)
                .and_then(|container| container.slot_mut(src_index))
                .and_then(|slot| slot.stack_mut())
                .and_then(|stack| stack.split(amount))
                .expect("validated currency split failed mid-operation");
        }

        let mut events = Vec::new();
        push_changed(&mut events, src);
        push_changed(&mut events, dst);
        let touched = [Touched::plain(src), Touched::plain(dst)];
        self.finish(catalog, &touched, events)
    }

    // ======================================================================
    // World containers
    // ======================================================================

    /// Opens a world chest, reattaching its persisted manifest if one
    /// exists
    ///
    /// Returns true when a manifest was found (contents restored); false
    /// when this chest has never been seen, in which case the caller
    /// populates it and registers it with `adopt_world_chest`.
    pub fn open_world_chest(
        &mut self,
        instance_id: u64,
        slot_count: usize,
    ) -> Result<bool, TransferError> {
        let id = ContainerId::WorldChest(instance_id);
        if self.containers.contains_key(&id) {
            return Ok(true);
        }

        match self.registry.get(instance_id) {
            Some(manifest) => {
                // Manifests carry no slot positions; refill in order. Size
                // up if the manifest somehow outgrew the requested layout.
                let slots = slot_count.max(manifest.entries.len());
                let mut container = Container::world_chest(instance_id, slots);
                for entry in &manifest.entries {
                    let Some(stack) = ItemStack::new(entry.item_id.clone(), entry.count) else {
                        continue;
                    };
                    if container.insert_stack(stack).is_err() {
                        warn!("chest_{}: manifest entry did not fit on reopen", instance_id);
                    }
                }
                self.containers.insert(id, container);
                Ok(true)
            }
            None => {
                self.containers
                    .insert(id, Container::world_chest(instance_id, slot_count));
                Ok(false)
            }
        }
    }

    /// Registers a freshly populated world chest: stores its manifest,
    /// flushes it, and notifies observers
    pub fn adopt_world_chest(
        &mut self,
        catalog: &ItemCatalog,
        container: Container,
    ) -> Result<(), TransferError> {
        let id = container.id();
        if !id.is_world() {
            return Err(TransferError::UnknownContainer(id));
        }
        self.containers.insert(id, container);

        let mut events = Vec::new();
        push_changed(&mut events, id);
        self.finish(catalog, &[Touched::plain(id)], events)
    }

    /// Detaches a world chest from the engine; its manifest stays in the
    /// registry (and the store), which is how contents survive the host
    /// object being unloaded
    pub fn close_world_chest(&mut self, instance_id: u64) -> bool {
        self.containers
            .remove(&ContainerId::WorldChest(instance_id))
            .is_some()
    }

    // ======================================================================
    // Session restore
    // ======================================================================

    /// Restores a container from the store, or attaches the template fresh
    ///
    /// The template supplies the layout; the stored record supplies the
    /// contents. Active capacity is re-derived from the equipped carry
    /// upgrade after decode. Returns true if a record was found.
    pub fn restore_container(
        &mut self,
        catalog: &ItemCatalog,
        template: Container,
    ) -> Result<bool, TransferError> {
        let id = template.id();
        match self.store.load_container(id)? {
            Some(record) => {
                let mut container = template;
                codec::decode_into(&record, catalog, &mut container)?;
                let target = container
                    .policy()
                    .clamp(
                        container
                            .policy()
                            .active_for_tier(container.carry_tier(catalog)),
                        container.generic_count(),
                    );
                let (_, cleared) = container.set_active_count(target);
                if !cleared.is_empty() {
                    warn!("{}: restore clipped {} stacks above capacity", id, cleared.len());
                }
                self.containers.insert(id, container);
                Ok(true)
            }
            None => {
                self.containers.insert(id, template);
                Ok(false)
            }
        }
    }

    /// Loads every persisted world-chest manifest into the registry
    /// (session start)
    pub fn hydrate_manifests(&mut self, catalog: &ItemCatalog) -> Result<usize, TransferError> {
        let records = self.store.load_all_manifests()?;
        let count = records.len();
        for record in records {
            let manifest = codec::decode_manifest(&record, catalog)?;
            self.registry.put(record.instance_id, manifest);
        }
        Ok(count)
    }

    // ======================================================================
    // Internals
    // ======================================================================

    fn slot_view(
        &self,
        addr: SlotAddr,
    ) -> Result<(Option<ItemStack>, SlotRole, bool), TransferError> {
        let container = self
            .containers
            .get(&addr.container)
            .ok_or(TransferError::UnknownContainer(addr.container))?;
        let slot = container
            .slot(addr.index)
            .ok_or(TransferError::InvalidSlot(addr))?;
        Ok((slot.stack().cloned(), slot.role(), slot.is_active()))
    }

    fn category_of(
        &self,
        catalog: &ItemCatalog,
        stack: &ItemStack,
    ) -> Result<ItemCategory, TransferError> {
        catalog
            .get(&stack.item_id)
            .map(|def| def.category)
            .ok_or_else(|| TransferError::UnknownItem(stack.item_id.clone()))
    }

    /// Takes a stack whose presence was validated this operation
    fn take_validated(&mut self, addr: SlotAddr) -> ItemStack {
        self.containers
            .get_mut(&addr.container)
            .and_then(|container| container.slot_mut(addr.index))
            .and_then(|slot| slot.take())
            .expect("validated slot emptied mid-operation")
    }

    /// Places into a slot whose emptiness was validated this operation
    fn place_validated(&mut self, addr: SlotAddr, stack: ItemStack) {
        self.containers
            .get_mut(&addr.container)
            .and_then(|container| container.slot_mut(addr.index))
            .expect("validated slot vanished mid-operation")
            .place(stack)
            .expect("validated slot occupied mid-operation");
    }

    /// Post-mutation tail shared by every operation: re-run the capacity
    /// policy where a carry slot changed, flush every touched container,
    /// then notify observers — strictly in that order.
    fn finish(
        &mut self,
        catalog: &ItemCatalog,
        touched: &[Touched],
        mut events: Vec<ContainerEvent>,
    ) -> Result<(), TransferError> {
        for touch in touched {
            if !touch.carry_changed {
                continue;
            }
            let Some(container) = self.containers.get(&touch.id) else {
                continue;
            };
            let target = container.policy().clamp(
                container
                    .policy()
                    .active_for_tier(container.carry_tier(catalog)),
                container.generic_count(),
            );
            if target == container.active_generic_count() {
                continue;
            }
            self.containers
                .get_mut(&touch.id)
                .expect("container vanished mid-operation")
                .set_active_count(target);
            push_changed(&mut events, touch.id);
        }

        let mut flushed: Vec<ContainerId> = Vec::new();
        for touch in touched {
            if flushed.contains(&touch.id) {
                continue;
            }
            flushed.push(touch.id);
            let Some(container) = self.containers.get(&touch.id) else {
                continue;
            };
            match touch.id {
                ContainerId::WorldChest(instance_id) => {
                    let manifest = Manifest::from_container(container);
                    let record = codec::encode_manifest(instance_id, &manifest);
                    self.registry.put(instance_id, manifest);
                    self.store.flush_manifest(&record)?;
                }
                _ => {
                    let record = codec::encode_container(container);
                    self.store.flush_container(&record)?;
                }
            }
        }

        for event in &events {
            for observer in &mut self.observers {
                observer.on_event(event);
            }
        }
        Ok(())
    }
}

fn touch_for(id: ContainerId, role: SlotRole) -> Touched {
    if role == SlotRole::CarryEquip {
        Touched::carry(id)
    } else {
        Touched::plain(id)
    }
}

/// Convenience constructor for the usual single-save setup: player
/// inventory + stash attached, containers restored from the store when
/// records exist
pub fn standard_engine<S: StateStore>(
    store: S,
    catalog: &ItemCatalog,
    generic_slots: usize,
    policy: CapacityPolicy,
    stash_slots: usize,
    stash_locked: usize,
) -> Result<TransferEngine<S>, TransferError> {
    let mut engine = TransferEngine::new(store);
    engine.restore_container(catalog, Container::player_inventory(generic_slots, policy))?;
    engine.restore_container(catalog, Container::stash(stash_slots, stash_locked))?;
    engine.hydrate_manifests(catalog)?;
    Ok(engine)
}
