use crate::item::{ItemCatalog, ItemCategory};

use super::container::Container;

/// The one logical currency quantity
///
/// Currency can sit in the inventory's currency slot, the stash's currency
/// slot, and a scalar mirrored from the progression subsystem — three
/// places, one amount. The pieces are only ever moved through explicit
/// engine operations; nothing reconciles or merges them silently.
#[derive(Debug, Default)]
pub struct CurrencyLedger {
    mirrored: u64,
}

impl CurrencyLedger {
    pub fn new() -> Self {
        CurrencyLedger { mirrored: 0 }
    }

    /// The scalar mirrored from the progression subsystem
    pub fn mirrored(&self) -> u64 {
        self.mirrored
    }

    /// Updates the mirrored scalar
    ///
    /// This is the progression collaborator's public entry point; the
    /// field is not reachable any other way.
    pub fn set_mirrored(&mut self, amount: u64) {
        self.mirrored = amount;
    }

    /// Sums the logical currency total: every currency-category stack in
    /// the given containers, plus the mirrored scalar
    pub fn total<'a>(
        &self,
        catalog: &ItemCatalog,
        containers: impl Iterator<Item = &'a Container>,
    ) -> u64 {
        let held: u64 = containers
            .flat_map(|container| container.iter_stacks())
            .filter(|stack| {
                catalog
                    .get(&stack.item_id)
                    .is_some_and(|def| def.category == ItemCategory::Currency)
            })
            .map(|stack| u64::from(stack.count()))
            .sum();
        held + self.mirrored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::capacity::CapacityPolicy;
    use crate::inventory::slot::SlotRole;
    use crate::item::{ItemDefinition, ItemStack};

    fn catalog() -> ItemCatalog {
        let mut catalog = ItemCatalog::new();
        catalog
            .register(ItemDefinition::new("items/coin", "Coin", "", ItemCategory::Currency))
            .unwrap();
        catalog
            .register(ItemDefinition::new("items/scrap", "Scrap", "", ItemCategory::Generic))
            .unwrap();
        catalog
    }

    #[test]
    fn test_total_spans_containers_and_mirror() {
        let catalog = catalog();
        let mut inventory = Container::player_inventory(4, CapacityPolicy::new(4));
        let mut stash = Container::stash(4, 0);

        let slot = inventory.role_slot_index(SlotRole::Currency).unwrap();
        inventory
            .slot_mut(slot)
            .unwrap()
            .place(ItemStack::new("items/coin", 120).unwrap())
            .unwrap();
        let slot = stash.role_slot_index(SlotRole::Currency).unwrap();
        stash
            .slot_mut(slot)
            .unwrap()
            .place(ItemStack::new("items/coin", 30).unwrap())
            .unwrap();
        // Non-currency stacks never count
        inventory
            .insert_stack(ItemStack::new("items/scrap", 99).unwrap())
            .unwrap();

        let mut ledger = CurrencyLedger::new();
        ledger.set_mirrored(50);

        let total = ledger.total(&catalog, [&inventory, &stash].into_iter());
        assert_eq!(total, 200);
    }
}
