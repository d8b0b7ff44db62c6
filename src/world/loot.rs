//! Loot population for freshly discovered world chests
//!
//! When a chest is opened for the first time there is no manifest to
//! reattach; the interaction layer populates the container from a loot
//! table and registers the result with the engine. Population is plain
//! weighted rolls plus two injection rules: a fixed-count guaranteed
//! category and a fixed-probability special item.

use log::{debug, warn};
use rand::Rng;

use crate::inventory::Container;
use crate::item::{ItemCatalog, ItemCategory, ItemStack};

/// One weighted loot table line
#[derive(Debug, Clone)]
pub struct LootEntry {
    pub item_id: String,
    pub weight: u32,
    pub min_count: u32,
    pub max_count: u32,
}

/// Weighted random contents for a container kind
#[derive(Debug, Clone, Default)]
pub struct LootTable {
    entries: Vec<LootEntry>,
    rolls: usize,
    special: Option<(String, f64)>,
    guaranteed: Vec<(ItemCategory, u32)>,
}

impl LootTable {
    /// A table that performs `rolls` weighted draws
    pub fn new(rolls: usize) -> Self {
        LootTable {
            rolls,
            ..Default::default()
        }
    }

    /// Adds a weighted line; zero weight means the line never rolls
    pub fn with_entry(
        mut self,
        item_id: impl Into<String>,
        weight: u32,
        min_count: u32,
        max_count: u32,
    ) -> Self {
        self.entries.push(LootEntry {
            item_id: item_id.into(),
            weight,
            min_count: min_count.max(1),
            max_count: max_count.max(min_count.max(1)),
        });
        self
    }

    /// Injects one `item_id` with the given probability per population
    pub fn with_special(mut self, item_id: impl Into<String>, chance: f64) -> Self {
        self.special = Some((item_id.into(), chance.clamp(0.0, 1.0)));
        self
    }

    /// Guarantees `count` items of a category, drawn from the catalog
    pub fn with_guaranteed(mut self, category: ItemCategory, count: u32) -> Self {
        self.guaranteed.push((category, count));
        self
    }

    /// Fills a container from this table; returns the number of stacks
    /// placed
    ///
    /// Guaranteed categories are injected first so a small container is
    /// never filled up by ordinary rolls before its guarantees land. A
    /// full container ends population early rather than erroring — loot
    /// generation is best-effort by design.
    pub fn populate<R: Rng>(
        &self,
        container: &mut Container,
        catalog: &ItemCatalog,
        rng: &mut R,
    ) -> usize {
        let mut placed = 0;

        for (category, count) in &self.guaranteed {
            let mut candidates: Vec<&str> = catalog
                .all_items()
                .into_iter()
                .filter(|def| def.category == *category)
                .map(|def| def.id.as_str())
                .collect();
            candidates.sort_unstable();
            if candidates.is_empty() {
                warn!("loot table guarantees {:?} but catalog has none", category);
                continue;
            }
            let pick = candidates[rng.gen_range(0..candidates.len())];
            if self.place(container, pick, *count) {
                placed += 1;
            }
        }

        if let Some((item_id, chance)) = &self.special {
            if rng.gen_bool(*chance) && self.place(container, item_id, 1) {
                placed += 1;
            }
        }

        let total_weight: u32 = self.entries.iter().map(|entry| entry.weight).sum();
        if total_weight == 0 {
            return placed;
        }
        for _ in 0..self.rolls {
            if container.first_empty_active_generic().is_none() {
                debug!("{}: full during loot population", container.id());
                break;
            }
            let mut ticket = rng.gen_range(0..total_weight);
            let entry = self
                .entries
                .iter()
                .find(|entry| {
                    if ticket < entry.weight {
                        true
                    } else {
                        ticket -= entry.weight;
                        false
                    }
                })
                .expect("weighted draw out of range");
            let count = rng.gen_range(entry.min_count..=entry.max_count);
            if self.place(container, &entry.item_id, count) {
                placed += 1;
            }
        }

        placed
    }

    fn place(&self, container: &mut Container, item_id: &str, count: u32) -> bool {
        let Some(stack) = ItemStack::new(item_id, count) else {
            return false;
        };
        match container.insert_stack(stack) {
            Ok(_) => true,
            Err(stack) => {
                debug!(
                    "{}: no room for {} x{} during loot population",
                    container.id(),
                    stack.item_id,
                    stack.count()
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemDefinition;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog() -> ItemCatalog {
        let mut catalog = ItemCatalog::new();
        for def in [
            ItemDefinition::new("items/scrap", "Scrap", "", ItemCategory::Generic),
            ItemDefinition::new("items/cloth", "Cloth", "", ItemCategory::Generic),
            ItemDefinition::new("items/revive", "Revive", "", ItemCategory::ReviveCharge),
            ItemDefinition::new("items/sword_t1", "Sword I", "", ItemCategory::Weapon).with_tier(1),
        ] {
            catalog.register(def).unwrap();
        }
        catalog
    }

    #[test]
    fn test_guaranteed_category_always_lands() {
        let catalog = catalog();
        let table = LootTable::new(3)
            .with_entry("items/scrap", 5, 1, 4)
            .with_entry("items/cloth", 5, 1, 2)
            .with_guaranteed(ItemCategory::Weapon, 1);

        for seed in 0..20 {
            let mut chest = Container::world_chest(seed, 8);
            let mut rng = StdRng::seed_from_u64(seed);
            table.populate(&mut chest, &catalog, &mut rng);
            assert_eq!(
                chest.count_item("items/sword_t1"),
                1,
                "seed {} missed the guarantee",
                seed
            );
        }
    }

    #[test]
    fn test_certain_special_always_lands() {
        let catalog = catalog();
        let table = LootTable::new(0).with_special("items/revive", 1.0);

        let mut chest = Container::world_chest(1, 4);
        let mut rng = StdRng::seed_from_u64(7);
        let placed = table.populate(&mut chest, &catalog, &mut rng);

        assert_eq!(placed, 1);
        assert_eq!(chest.count_item("items/revive"), 1);
    }

    #[test]
    fn test_impossible_special_never_lands() {
        let catalog = catalog();
        let table = LootTable::new(0).with_special("items/revive", 0.0);

        let mut chest = Container::world_chest(1, 4);
        let mut rng = StdRng::seed_from_u64(7);
        table.populate(&mut chest, &catalog, &mut rng);

        assert_eq!(chest.count_item("items/revive"), 0);
    }

    #[test]
    fn test_zero_weight_entry_never_rolls() {
        let catalog = catalog();
        let table = LootTable::new(50)
            .with_entry("items/scrap", 1, 1, 1)
            .with_entry("items/cloth", 0, 1, 1);

        let mut chest = Container::world_chest(1, 60);
        let mut rng = StdRng::seed_from_u64(42);
        table.populate(&mut chest, &catalog, &mut rng);

        assert_eq!(chest.count_item("items/cloth"), 0);
        assert!(chest.count_item("items/scrap") >= 50);
    }

    #[test]
    fn test_population_stops_when_container_fills() {
        let catalog = catalog();
        // Distinct kinds cannot merge forever, so a tiny chest fills up
        let table = LootTable::new(100)
            .with_entry("items/scrap", 1, 1, 1)
            .with_entry("items/cloth", 1, 1, 1);

        let mut chest = Container::world_chest(1, 2);
        let mut rng = StdRng::seed_from_u64(3);
        table.populate(&mut chest, &catalog, &mut rng);

        // Never more stacks than slots, and no panic on the way
        assert!(chest.iter_stacks().count() <= 2);
    }
}
