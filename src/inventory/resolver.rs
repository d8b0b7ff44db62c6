//! Stacking resolver: the one predicate deciding whether two stacks merge
//!
//! Kept pure and free of instance identity so that stash, inventory and
//! chest stacks generated independently still stack with each other.

use crate::item::{ItemCatalog, ItemStack};

/// Returns true iff the two stacks' definitions describe the same item kind
///
/// Symmetric for all inputs. Stacks whose definitions are missing from the
/// catalog never stack with anything.
pub fn can_stack(catalog: &ItemCatalog, a: &ItemStack, b: &ItemStack) -> bool {
    match (catalog.get(&a.item_id), catalog.get(&b.item_id)) {
        (Some(def_a), Some(def_b)) => def_a.same_item(def_b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemCategory, ItemDefinition};

    fn catalog() -> ItemCatalog {
        let mut catalog = ItemCatalog::new();
        catalog
            .register(ItemDefinition::new("items/scrap", "Scrap", "", ItemCategory::Generic))
            .unwrap();
        catalog
            .register(ItemDefinition::new("items/cloth", "Cloth", "", ItemCategory::Generic))
            .unwrap();
        catalog
    }

    #[test]
    fn test_same_kind_stacks_symmetrically() {
        let catalog = catalog();
        let a = ItemStack::new("items/scrap", 3).unwrap();
        let b = ItemStack::new("items/scrap", 9).unwrap();

        assert!(can_stack(&catalog, &a, &b));
        assert!(can_stack(&catalog, &b, &a));
    }

    #[test]
    fn test_different_kinds_never_stack() {
        let catalog = catalog();
        let a = ItemStack::new("items/scrap", 3).unwrap();
        let b = ItemStack::new("items/cloth", 3).unwrap();

        assert!(!can_stack(&catalog, &a, &b));
        assert!(!can_stack(&catalog, &b, &a));
    }

    #[test]
    fn test_unknown_definition_never_stacks() {
        let catalog = catalog();
        let a = ItemStack::new("items/ghost", 1).unwrap();
        let b = ItemStack::new("items/ghost", 1).unwrap();

        assert!(!can_stack(&catalog, &a, &b));
    }
}
