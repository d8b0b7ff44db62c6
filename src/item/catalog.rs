use std::collections::HashMap;

use log::debug;
use thiserror::Error;

use super::category::ItemCategory;
use super::definition::ItemDefinition;

/// Errors raised while building the catalog
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// An item with this identity key is already registered
    #[error("item '{0}' already registered")]
    DuplicateId(String),
}

/// Central catalog of all item definitions
///
/// This is the single source of truth for what item kinds exist. All item
/// references (in slots, manifests, saves) are identity keys that look up
/// definitions here. The catalog is built once at startup and read-only
/// afterwards; the engine takes it as a call argument, never through a
/// global.
pub struct ItemCatalog {
    items: HashMap<String, ItemDefinition>,

    /// Legacy key -> current key, built from each definition's legacy_ids
    legacy: HashMap<String, String>,
}

impl ItemCatalog {
    /// Creates a new empty catalog
    pub fn new() -> Self {
        ItemCatalog {
            items: HashMap::new(),
            legacy: HashMap::new(),
        }
    }

    /// Registers a new item definition
    ///
    /// Returns an error if an item with this identity key already exists.
    /// The definition's legacy keys are indexed for save-file fallback
    /// resolution; a legacy key already claimed by an earlier registration
    /// keeps its first owner.
    pub fn register(&mut self, item: ItemDefinition) -> Result<(), CatalogError> {
        if self.items.contains_key(&item.id) {
            return Err(CatalogError::DuplicateId(item.id));
        }

        for old_key in &item.legacy_ids {
            self.legacy
                .entry(old_key.clone())
                .or_insert_with(|| item.id.clone());
        }

        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    /// Gets an item definition by its current identity key
    pub fn get(&self, id: &str) -> Option<&ItemDefinition> {
        self.items.get(id)
    }

    /// Returns true if an item with this identity key exists
    pub fn exists(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Resolves a persisted identity key, tolerating catalog reorganizations
    ///
    /// Tries, in order:
    /// 1. the exact key,
    /// 2. the legacy-key index (items that were renamed/moved),
    /// 3. a final-path-segment match (the key's last `/` segment against
    ///    each registered key's last segment), for items whose directory
    ///    moved without being recorded as a legacy key.
    ///
    /// Returns None only when every fallback fails; the persistence codec
    /// then decodes that slot as empty rather than failing the container.
    pub fn resolve(&self, key: &str) -> Option<&ItemDefinition> {
        if let Some(item) = self.items.get(key) {
            return Some(item);
        }

        if let Some(current) = self.legacy.get(key) {
            debug!("catalog: resolved '{}' via legacy key -> '{}'", key, current);
            return self.items.get(current);
        }

        let tail = key.rsplit('/').next()?;
        let found = self
            .items
            .values()
            .find(|item| item.id.rsplit('/').next() == Some(tail));
        if let Some(item) = found {
            debug!("catalog: resolved '{}' via path tail -> '{}'", key, item.id);
        }
        found
    }

    /// Returns the first registered definition of a category
    ///
    /// Used by the codec to re-materialize the currency and revive-charge
    /// scalars, which are persisted as bare counts without an identity key.
    pub fn first_of_category(&self, category: ItemCategory) -> Option<&ItemDefinition> {
        // HashMap order is arbitrary; pick deterministically by key.
        self.items
            .values()
            .filter(|item| item.category == category)
            .min_by(|a, b| a.id.cmp(&b.id))
    }

    /// Returns all item definitions
    pub fn all_items(&self) -> Vec<&ItemDefinition> {
        self.items.values().collect()
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for ItemCatalog {
    fn default() -> Self {
        Self::new()
    }
}
