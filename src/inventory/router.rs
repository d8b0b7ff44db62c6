//! Equipment router: dedicated-slot placement for special item categories
//!
//! Runs before generic slot placement whenever currency, equipment or a
//! revive charge is being added to a container that exposes the matching
//! dedicated slot. Every path either applies completely or leaves the
//! container untouched; all preconditions (eviction space, upgrade
//! comparisons) are checked before the first mutation.

use log::warn;

use super::container::Container;
use super::error::TransferError;
use super::slot::SlotRole;
use crate::item::{ItemCatalog, ItemCategory, ItemStack};

/// What the router did with an incoming stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouteOutcome {
    /// The stack landed in a dedicated slot
    Placed {
        slot: usize,
        /// True when the item went to an equipment slot (fires AutoEquipped)
        auto_equipped: bool,
    },

    /// Not the router's business; caller proceeds with generic placement
    FallThrough,
}

/// Routes `stack` toward its dedicated slot in `container`, if any
///
/// The stack is only borrowed: on success a clone is placed and the caller
/// clears its own source; on failure nothing at all has changed.
pub(crate) fn route(
    container: &mut Container,
    catalog: &ItemCatalog,
    stack: &ItemStack,
) -> Result<RouteOutcome, TransferError> {
    let def = catalog
        .get(&stack.item_id)
        .ok_or_else(|| TransferError::UnknownItem(stack.item_id.clone()))?;

    match def.category {
        ItemCategory::Generic => Ok(RouteOutcome::FallThrough),
        ItemCategory::Currency => route_currency(container, stack),
        ItemCategory::Weapon => route_weapon(container, stack),
        ItemCategory::Armor => route_upgrade(container, catalog, stack, SlotRole::ArmorEquip),
        ItemCategory::CarryUpgrade => {
            route_upgrade(container, catalog, stack, SlotRole::CarryEquip)
        }
        ItemCategory::ReviveCharge => route_revive(container, stack),
    }
}

/// Currency always goes to the currency slot; a foreign occupant (a
/// corrupt save, or a swap gone wrong in an older version) is evicted to
/// a generic slot first.
fn route_currency(
    container: &mut Container,
    stack: &ItemStack,
) -> Result<RouteOutcome, TransferError> {
    let Some(index) = container.role_slot_index(SlotRole::Currency) else {
        return Ok(RouteOutcome::FallThrough);
    };

    let foreign = match container.slot(index).and_then(|slot| slot.stack()) {
        Some(existing) if existing.item_id == stack.item_id => None,
        Some(existing) => Some(existing.item_id.clone()),
        None => None,
    };

    if let Some(foreign_id) = foreign {
        let Some(dest) = container.first_empty_active_generic() else {
            return Err(TransferError::ContainerFull(container.id()));
        };
        warn!(
            "{}: currency slot held '{}', evicting to slot {}",
            container.id(),
            foreign_id,
            dest
        );
        let taken = container
            .slot_mut(index)
            .and_then(|slot| slot.take())
            .expect("foreign occupant vanished");
        let placed = container
            .slot_mut(dest)
            .expect("eviction slot vanished")
            .place(taken);
        debug_assert!(placed.is_ok());
    }

    let slot = container.slot_mut(index).expect("currency slot vanished");
    match slot.stack_mut() {
        Some(existing) => {
            let available = u32::MAX - existing.count();
            existing
                .merge_from(stack.clone())
                .map_err(|_| TransferError::InvalidAmount {
                    requested: stack.count(),
                    available,
                })?;
        }
        None => {
            let placed = slot.place(stack.clone());
            debug_assert!(placed.is_ok());
        }
    }

    Ok(RouteOutcome::Placed {
        slot: index,
        auto_equipped: false,
    })
}

/// An empty weapon slot takes the weapon directly; an occupied one sends
/// the weapon on to generic storage.
fn route_weapon(
    container: &mut Container,
    stack: &ItemStack,
) -> Result<RouteOutcome, TransferError> {
    let Some(index) = container.role_slot_index(SlotRole::WeaponEquip) else {
        return Ok(RouteOutcome::FallThrough);
    };

    let slot = container.slot_mut(index).expect("weapon slot vanished");
    if !slot.is_empty() {
        return Ok(RouteOutcome::FallThrough);
    }
    let placed = slot.place(stack.clone());
    debug_assert!(placed.is_ok());

    Ok(RouteOutcome::Placed {
        slot: index,
        auto_equipped: true,
    })
}

/// Tiered equipment (armor, carry upgrades) equips only when it strictly
/// improves on the current item; the displaced item moves to a generic
/// slot.
fn route_upgrade(
    container: &mut Container,
    catalog: &ItemCatalog,
    stack: &ItemStack,
    role: SlotRole,
) -> Result<RouteOutcome, TransferError> {
    let Some(index) = container.role_slot_index(role) else {
        return Ok(RouteOutcome::FallThrough);
    };

    let current = container
        .slot(index)
        .and_then(|slot| slot.stack())
        .cloned();

    match current {
        None => {
            let placed = container
                .slot_mut(index)
                .expect("equip slot vanished")
                .place(stack.clone());
            debug_assert!(placed.is_ok());
            Ok(RouteOutcome::Placed {
                slot: index,
                auto_equipped: true,
            })
        }
        Some(equipped) => {
            let offered_def = catalog
                .get(&stack.item_id)
                .ok_or_else(|| TransferError::UnknownItem(stack.item_id.clone()))?;
            let equipped_def = catalog
                .get(&equipped.item_id)
                .ok_or_else(|| TransferError::UnknownItem(equipped.item_id.clone()))?;

            if !offered_def.is_upgrade_over(equipped_def) {
                return Err(TransferError::UpgradeRejected {
                    offered: stack.item_id.clone(),
                    equipped: equipped.item_id.clone(),
                });
            }

            // Upgrade: the replaced item needs a generic slot before
            // anything moves.
            let Some(dest) = container.first_empty_active_generic() else {
                return Err(TransferError::ContainerFull(container.id()));
            };

            let old = container
                .slot_mut(index)
                .and_then(|slot| slot.take())
                .expect("equipped item vanished");
            let placed = container
                .slot_mut(dest)
                .expect("displacement slot vanished")
                .place(old);
            debug_assert!(placed.is_ok());
            let placed = container
                .slot_mut(index)
                .expect("equip slot vanished")
                .place(stack.clone());
            debug_assert!(placed.is_ok());

            Ok(RouteOutcome::Placed {
                slot: index,
                auto_equipped: true,
            })
        }
    }
}

/// At most one revive charge ever occupies the dedicated slot. A second
/// charge is rejected outright, never merged; multi-charge stacks stay in
/// generic storage.
fn route_revive(
    container: &mut Container,
    stack: &ItemStack,
) -> Result<RouteOutcome, TransferError> {
    let Some(index) = container.role_slot_index(SlotRole::ReviveEquip) else {
        return Ok(RouteOutcome::FallThrough);
    };

    if stack.count() > 1 {
        return Ok(RouteOutcome::FallThrough);
    }

    let slot = container.slot_mut(index).expect("revive slot vanished");
    if !slot.is_empty() {
        return Err(TransferError::ReviveCapReached);
    }
    let placed = slot.place(stack.clone());
    debug_assert!(placed.is_ok());

    Ok(RouteOutcome::Placed {
        slot: index,
        auto_equipped: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::capacity::CapacityPolicy;
    use crate::item::ItemDefinition;

    fn catalog() -> ItemCatalog {
        let mut catalog = ItemCatalog::new();
        for def in [
            ItemDefinition::new("items/coin", "Coin", "", ItemCategory::Currency),
            ItemDefinition::new("items/scrap", "Scrap", "", ItemCategory::Generic),
            ItemDefinition::new("items/sword_t1", "Sword I", "", ItemCategory::Weapon).with_tier(1),
            ItemDefinition::new("items/vest_t1", "Vest I", "", ItemCategory::Armor).with_tier(1),
            ItemDefinition::new("items/vest_t2", "Vest II", "", ItemCategory::Armor).with_tier(2),
            ItemDefinition::new("items/pack_t1", "Pack I", "", ItemCategory::CarryUpgrade)
                .with_tier(1),
            ItemDefinition::new("items/revive", "Revive", "", ItemCategory::ReviveCharge),
        ] {
            catalog.register(def).unwrap();
        }
        catalog
    }

    fn inventory() -> Container {
        Container::player_inventory(6, CapacityPolicy::new(6))
    }

    #[test]
    fn test_weapon_auto_equips_into_empty_slot() {
        let catalog = catalog();
        let mut c = inventory();
        let stack = ItemStack::new("items/sword_t1", 1).unwrap();

        let outcome = route(&mut c, &catalog, &stack).unwrap();

        let weapon_slot = c.role_slot_index(SlotRole::WeaponEquip).unwrap();
        assert_eq!(
            outcome,
            RouteOutcome::Placed {
                slot: weapon_slot,
                auto_equipped: true
            }
        );
        assert_eq!(c.slot(weapon_slot).unwrap().stack().unwrap().item_id, "items/sword_t1");
    }

    #[test]
    fn test_second_weapon_falls_through() {
        let catalog = catalog();
        let mut c = inventory();
        let stack = ItemStack::new("items/sword_t1", 1).unwrap();
        route(&mut c, &catalog, &stack).unwrap();

        let outcome = route(&mut c, &catalog, &stack).unwrap();
        assert_eq!(outcome, RouteOutcome::FallThrough);
    }

    #[test]
    fn test_armor_downgrade_rejected_slot_unchanged() {
        let catalog = catalog();
        let mut c = inventory();
        let vest2 = ItemStack::new("items/vest_t2", 1).unwrap();
        route(&mut c, &catalog, &vest2).unwrap();

        let vest1 = ItemStack::new("items/vest_t1", 1).unwrap();
        let err = route(&mut c, &catalog, &vest1).unwrap_err();

        assert!(matches!(err, TransferError::UpgradeRejected { .. }));
        let armor_slot = c.role_slot_index(SlotRole::ArmorEquip).unwrap();
        assert_eq!(c.slot(armor_slot).unwrap().stack().unwrap().item_id, "items/vest_t2");
        // Nothing leaked into generic storage either
        assert_eq!(c.count_item("items/vest_t1"), 0);
    }

    #[test]
    fn test_armor_upgrade_displaces_old_to_generic() {
        let catalog = catalog();
        let mut c = inventory();
        let vest1 = ItemStack::new("items/vest_t1", 1).unwrap();
        route(&mut c, &catalog, &vest1).unwrap();

        let vest2 = ItemStack::new("items/vest_t2", 1).unwrap();
        let outcome = route(&mut c, &catalog, &vest2).unwrap();

        let armor_slot = c.role_slot_index(SlotRole::ArmorEquip).unwrap();
        assert!(matches!(outcome, RouteOutcome::Placed { auto_equipped: true, .. }));
        assert_eq!(c.slot(armor_slot).unwrap().stack().unwrap().item_id, "items/vest_t2");
        assert_eq!(c.count_item("items/vest_t1"), 1);
    }

    #[test]
    fn test_currency_merges_into_currency_slot() {
        let catalog = catalog();
        let mut c = inventory();
        route(&mut c, &catalog, &ItemStack::new("items/coin", 40).unwrap()).unwrap();
        route(&mut c, &catalog, &ItemStack::new("items/coin", 2).unwrap()).unwrap();

        let currency_slot = c.role_slot_index(SlotRole::Currency).unwrap();
        assert_eq!(c.slot(currency_slot).unwrap().stack().unwrap().count(), 42);
    }

    #[test]
    fn test_currency_evicts_foreign_occupant() {
        let catalog = catalog();
        let mut c = inventory();
        let currency_slot = c.role_slot_index(SlotRole::Currency).unwrap();
        // Simulate a corrupted save: scrap sitting in the currency slot
        c.slot_mut(currency_slot)
            .unwrap()
            .place(ItemStack::new("items/scrap", 5).unwrap())
            .unwrap();

        route(&mut c, &catalog, &ItemStack::new("items/coin", 10).unwrap()).unwrap();

        assert_eq!(c.slot(currency_slot).unwrap().stack().unwrap().item_id, "items/coin");
        assert_eq!(c.count_item("items/scrap"), 5);
    }

    #[test]
    fn test_revive_cap_is_one() {
        let catalog = catalog();
        let mut c = inventory();
        let charge = ItemStack::new("items/revive", 1).unwrap();
        route(&mut c, &catalog, &charge).unwrap();

        let err = route(&mut c, &catalog, &charge).unwrap_err();
        assert!(matches!(err, TransferError::ReviveCapReached));

        let revive_slot = c.role_slot_index(SlotRole::ReviveEquip).unwrap();
        assert_eq!(c.slot(revive_slot).unwrap().stack().unwrap().count(), 1);
    }

    #[test]
    fn test_multi_charge_revive_stack_falls_through() {
        let catalog = catalog();
        let mut c = inventory();
        let stack = ItemStack::new("items/revive", 3).unwrap();

        let outcome = route(&mut c, &catalog, &stack).unwrap();
        assert_eq!(outcome, RouteOutcome::FallThrough);
    }

    #[test]
    fn test_chest_without_dedicated_slots_falls_through() {
        let catalog = catalog();
        let mut chest = Container::world_chest(9, 4);

        let outcome = route(
            &mut chest,
            &catalog,
            &ItemStack::new("items/coin", 10).unwrap(),
        )
        .unwrap();
        assert_eq!(outcome, RouteOutcome::FallThrough);
    }
}
