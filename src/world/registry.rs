use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::inventory::Container;

/// One manifest line: an item kind and how many of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub item_id: String,
    pub count: u32,
}

/// The persisted snapshot of a world container's contents
///
/// A plain ordered list of (item, count) pairs; slot positions are not
/// recorded beyond that order. Manifests are always re-derived whole from
/// current slot contents, never patched, so they cannot drift from the
/// container they describe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Derives a manifest from a container's current slot contents
    pub fn from_container(container: &Container) -> Self {
        let entries = container
            .iter_stacks()
            .map(|stack| ManifestEntry {
                item_id: stack.item_id.clone(),
                count: stack.count(),
            })
            .collect();
        Manifest { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total count of one item kind across the manifest
    pub fn count_item(&self, item_id: &str) -> u64 {
        self.entries
            .iter()
            .filter(|entry| entry.item_id == item_id)
            .map(|entry| u64::from(entry.count))
            .sum()
    }
}

/// Keys persistent loot manifests by container instance identity
///
/// A world chest's `Container` is recreated every time its host object is
/// instantiated; the manifest stored here is what survives in between.
/// That is the whole mechanism behind "loot persists after leaving and
/// returning" — the host object itself never outlives the visit.
#[derive(Debug, Default)]
pub struct ContainerRegistry {
    manifests: HashMap<u64, Manifest>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        ContainerRegistry {
            manifests: HashMap::new(),
        }
    }

    /// Looks up the manifest for a container instance
    pub fn get(&self, instance_id: u64) -> Option<&Manifest> {
        self.manifests.get(&instance_id)
    }

    /// Stores the full manifest for a container instance, replacing any
    /// previous snapshot
    pub fn put(&mut self, instance_id: u64, manifest: Manifest) {
        self.manifests.insert(instance_id, manifest);
    }

    /// Removes a manifest (host object permanently destroyed)
    pub fn remove(&mut self, instance_id: u64) -> Option<Manifest> {
        self.manifests.remove(&instance_id)
    }

    pub fn contains(&self, instance_id: u64) -> bool {
        self.manifests.contains_key(&instance_id)
    }

    /// All known instance ids
    pub fn instance_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.manifests.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemStack;

    #[test]
    fn test_manifest_snapshot_and_lookup() {
        let mut chest = Container::world_chest(11, 5);
        chest
            .insert_stack(ItemStack::new("items/scrap", 3).unwrap())
            .unwrap();
        chest
            .insert_stack(ItemStack::new("items/cloth", 1).unwrap())
            .unwrap();

        let mut registry = ContainerRegistry::new();
        registry.put(11, Manifest::from_container(&chest));

        let manifest = registry.get(11).unwrap();
        assert_eq!(manifest.entries.len(), 2);
        assert_eq!(manifest.count_item("items/scrap"), 3);
        assert!(!registry.contains(12));
    }

    #[test]
    fn test_put_replaces_whole_snapshot() {
        let mut registry = ContainerRegistry::new();
        let mut chest = Container::world_chest(11, 5);
        chest
            .insert_stack(ItemStack::new("items/scrap", 3).unwrap())
            .unwrap();
        registry.put(11, Manifest::from_container(&chest));

        // Chest emptied; re-derived manifest replaces the old one entirely
        let empty_chest = Container::world_chest(11, 5);
        registry.put(11, Manifest::from_container(&empty_chest));

        assert!(registry.get(11).unwrap().is_empty());
    }
}
