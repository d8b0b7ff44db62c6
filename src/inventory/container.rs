use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use super::capacity::CapacityPolicy;
use super::slot::{Slot, SlotRole};
use crate::item::{ItemCatalog, ItemStack, UpgradeTier};

/// Stable identity of a container
///
/// The carried inventory and the stash are singletons per save; world
/// chests carry the instance id of their host object, which is how a
/// chest's contents survive the host being unloaded and recreated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerId {
    Inventory,
    Stash,
    WorldChest(u64),
}

impl ContainerId {
    /// Returns true for transient world containers backed by a manifest
    pub fn is_world(self) -> bool {
        matches!(self, ContainerId::WorldChest(_))
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerId::Inventory => write!(f, "inventory"),
            ContainerId::Stash => write!(f, "stash"),
            ContainerId::WorldChest(id) => write!(f, "chest_{}", id),
        }
    }
}

/// Address of a single slot: container identity + slot index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotAddr {
    pub container: ContainerId,
    pub index: usize,
}

impl SlotAddr {
    pub fn new(container: ContainerId, index: usize) -> Self {
        SlotAddr { container, index }
    }
}

impl fmt::Display for SlotAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.container, self.index)
    }
}

/// An ordered, fixed-size collection of slots with a stable identity
///
/// Slots are created once, at construction, and never added or removed
/// afterwards; only their stack and active flag ever change. Role
/// assignment is fixed for the container's whole life.
#[derive(Debug, Clone)]
pub struct Container {
    id: ContainerId,
    slots: Vec<Slot>,
    policy: CapacityPolicy,
}

impl Container {
    /// Creates a container with an explicit slot-role layout
    ///
    /// Generic slots beyond the policy's base active count start inactive;
    /// dedicated slots are always active; locked slots never are.
    pub fn with_layout(id: ContainerId, roles: &[SlotRole], policy: CapacityPolicy) -> Self {
        let generic_total = roles
            .iter()
            .filter(|r| matches!(r, SlotRole::Generic))
            .count();
        let base_active = policy.clamp(policy.active_for_tier(None), generic_total);

        let mut seen_generic = 0;
        let slots = roles
            .iter()
            .map(|&role| {
                if matches!(role, SlotRole::Generic) {
                    seen_generic += 1;
                    if seen_generic <= base_active {
                        Slot::new(role)
                    } else {
                        Slot::inactive(role)
                    }
                } else {
                    Slot::new(role)
                }
            })
            .collect();

        Container { id, slots, policy }
    }

    /// The player's carried inventory: currency, weapon, armor, carry and
    /// revive slots up front, then `generic` generic slots governed by the
    /// capacity policy
    pub fn player_inventory(generic: usize, policy: CapacityPolicy) -> Self {
        let mut roles = vec![
            SlotRole::Currency,
            SlotRole::WeaponEquip,
            SlotRole::ArmorEquip,
            SlotRole::CarryEquip,
            SlotRole::ReviveEquip,
        ];
        roles.extend(std::iter::repeat(SlotRole::Generic).take(generic));
        Container::with_layout(ContainerId::Inventory, &roles, policy)
    }

    /// The persistent stash: a currency slot, `generic` always-active
    /// generic slots, and `locked` not-yet-purchased slots
    pub fn stash(generic: usize, locked: usize) -> Self {
        let mut roles = vec![SlotRole::Currency];
        roles.extend(std::iter::repeat(SlotRole::Generic).take(generic));
        roles.extend(std::iter::repeat(SlotRole::Locked).take(locked));
        Container::with_layout(ContainerId::Stash, &roles, CapacityPolicy::all_active())
    }

    /// A transient world chest: all-generic, all-active slots
    pub fn world_chest(instance_id: u64, slots: usize) -> Self {
        let roles = vec![SlotRole::Generic; slots];
        Container::with_layout(
            ContainerId::WorldChest(instance_id),
            &roles,
            CapacityPolicy::all_active(),
        )
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_empty())
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    pub fn policy(&self) -> &CapacityPolicy {
        &self.policy
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index)
    }

    /// Index of the first slot with the given role
    pub fn role_slot_index(&self, role: SlotRole) -> Option<usize> {
        self.slots.iter().position(|slot| slot.role() == role)
    }

    /// Index of the first empty, active, generic slot
    pub fn first_empty_active_generic(&self) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.role() == SlotRole::Generic && slot.is_active() && slot.is_empty()
        })
    }

    /// Index of the first active slot whose stack can absorb `item_id`
    pub fn find_stackable(&self, item_id: &str) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.is_active()
                && slot
                    .stack()
                    .is_some_and(|stack| stack.item_id == item_id)
        })
    }

    /// Total count of an item kind across every slot
    pub fn count_item(&self, item_id: &str) -> u64 {
        self.slots
            .iter()
            .filter_map(|slot| slot.stack())
            .filter(|stack| stack.item_id == item_id)
            .map(|stack| u64::from(stack.count()))
            .sum()
    }

    /// Iterator over all held stacks, in slot order
    pub fn iter_stacks(&self) -> impl Iterator<Item = &ItemStack> {
        self.slots.iter().filter_map(|slot| slot.stack())
    }

    /// Number of generic slots (active or not)
    pub fn generic_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.role() == SlotRole::Generic)
            .count()
    }

    /// Number of currently active generic slots
    pub fn active_generic_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.role() == SlotRole::Generic && slot.is_active())
            .count()
    }

    /// Tier of the equipped carry upgrade, if any
    pub fn carry_tier(&self, catalog: &ItemCatalog) -> Option<UpgradeTier> {
        let index = self.role_slot_index(SlotRole::CarryEquip)?;
        let stack = self.slots[index].stack()?;
        catalog.get(&stack.item_id).and_then(|def| def.tier)
    }

    /// Re-partitions the generic slots into `requested` active ones
    ///
    /// The request is clamped to `[min_active, generic_total]`. Stacks in
    /// slots that fall outside the new active range are forcibly cleared
    /// and returned to the caller: losing a carry upgrade forfeits the
    /// overflow, which is the engine's one documented loss path. The whole
    /// re-partition is computed and applied in one pass; there is no
    /// partially re-flagged state.
    pub(crate) fn set_active_count(&mut self, requested: usize) -> (usize, Vec<ItemStack>) {
        let applied = self.policy.clamp(requested, self.generic_count());

        let mut cleared = Vec::new();
        let mut seen_generic = 0;
        for slot in &mut self.slots {
            if slot.role() != SlotRole::Generic {
                continue;
            }
            seen_generic += 1;
            let active = seen_generic <= applied;
            if !active {
                if let Some(stack) = slot.take() {
                    warn!(
                        "{}: capacity shrink forfeits {} x{}",
                        self.id,
                        stack.item_id,
                        stack.count()
                    );
                    cleared.push(stack);
                }
            }
            slot.set_active(active);
        }

        (applied, cleared)
    }

    /// Merges a stack into the container, or places it in the first empty
    /// active generic slot
    ///
    /// This is plain slot placement; equipment/currency routing is the
    /// transfer engine's job and happens before this is reached. Returns
    /// the stack back untouched if the container is full.
    pub(crate) fn insert_stack(&mut self, stack: ItemStack) -> Result<usize, ItemStack> {
        if let Some(index) = self.find_stackable(&stack.item_id) {
            // Same kind is already here; merge_from can only fail on
            // overflow, in which case fall through to an empty slot.
            match self.slots[index].stack_mut() {
                Some(existing) => match existing.merge_from(stack) {
                    Ok(()) => return Ok(index),
                    Err(stack) => return self.place_in_empty_generic(stack),
                },
                None => unreachable!("find_stackable returned an empty slot"),
            }
        }
        self.place_in_empty_generic(stack)
    }

    fn place_in_empty_generic(&mut self, stack: ItemStack) -> Result<usize, ItemStack> {
        match self.first_empty_active_generic() {
            Some(index) => {
                self.slots[index].place(stack).map(|()| index)
            }
            None => Err(stack),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemCategory, ItemDefinition};

    fn catalog() -> ItemCatalog {
        let mut catalog = ItemCatalog::new();
        catalog
            .register(
                ItemDefinition::new("items/pack_t2", "Pack II", "", ItemCategory::CarryUpgrade)
                    .with_tier(2),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_player_inventory_layout() {
        let c = Container::player_inventory(10, CapacityPolicy::new(5));

        assert_eq!(c.len(), 15);
        assert_eq!(c.role_slot_index(SlotRole::Currency), Some(0));
        assert_eq!(c.role_slot_index(SlotRole::WeaponEquip), Some(1));
        assert_eq!(c.role_slot_index(SlotRole::ReviveEquip), Some(4));
        assert_eq!(c.generic_count(), 10);
        // Only the policy floor starts active
        assert_eq!(c.active_generic_count(), 5);
    }

    #[test]
    fn test_stash_slots_all_active_plus_locked() {
        let c = Container::stash(8, 4);

        assert_eq!(c.active_generic_count(), 8);
        let locked = c.slots().filter(|s| s.role() == SlotRole::Locked).count();
        assert_eq!(locked, 4);
        assert!(c.slots().filter(|s| s.role() == SlotRole::Locked).all(|s| !s.is_active()));
    }

    #[test]
    fn test_insert_prefers_merge_over_empty_slot() {
        let mut c = Container::world_chest(7, 5);
        c.insert_stack(ItemStack::new("items/scrap", 3).unwrap()).unwrap();
        c.insert_stack(ItemStack::new("items/cloth", 1).unwrap()).unwrap();

        let index = c.insert_stack(ItemStack::new("items/scrap", 2).unwrap()).unwrap();

        assert_eq!(index, 0);
        assert_eq!(c.count_item("items/scrap"), 5);
        // No second scrap stack appeared
        let scrap_slots = c.iter_stacks().filter(|s| s.item_id == "items/scrap").count();
        assert_eq!(scrap_slots, 1);
    }

    #[test]
    fn test_insert_into_full_container_returns_stack() {
        let mut c = Container::world_chest(7, 1);
        c.insert_stack(ItemStack::new("items/scrap", 1).unwrap()).unwrap();

        let rejected = c.insert_stack(ItemStack::new("items/cloth", 1).unwrap()).unwrap_err();
        assert_eq!(rejected.item_id, "items/cloth");
    }

    #[test]
    fn test_shrink_clears_overflow_slots() {
        let policy = CapacityPolicy::new(5).with_tier(1, 10);
        let mut c = Container::with_layout(
            ContainerId::Inventory,
            &[SlotRole::Generic; 10],
            policy,
        );
        let (applied, _) = c.set_active_count(10);
        assert_eq!(applied, 10);
        for i in 0..10 {
            let id = format!("items/thing_{}", i);
            c.insert_stack(ItemStack::new(id, 1).unwrap()).unwrap();
        }

        let (applied, cleared) = c.set_active_count(5);

        assert_eq!(applied, 5);
        assert_eq!(cleared.len(), 5);
        assert_eq!(c.active_generic_count(), 5);
        // Slots 0-4 untouched
        for i in 0..5 {
            assert!(c.slot(i).unwrap().stack().is_some());
        }
        for i in 5..10 {
            assert!(c.slot(i).unwrap().is_empty());
            assert!(!c.slot(i).unwrap().is_active());
        }
    }

    #[test]
    fn test_carry_tier_reads_equipped_pack() {
        let catalog = catalog();
        let mut c = Container::player_inventory(4, CapacityPolicy::new(4));
        let carry = c.role_slot_index(SlotRole::CarryEquip).unwrap();
        c.slot_mut(carry)
            .unwrap()
            .place(ItemStack::new("items/pack_t2", 1).unwrap())
            .unwrap();

        assert_eq!(c.carry_tier(&catalog), Some(UpgradeTier(2)));
    }
}
