use serde::{Deserialize, Serialize};

use super::category::{ItemCategory, UpgradeTier};

/// The blueprint for an item kind
///
/// This defines the static properties of an item that are shared
/// across all instances. Think of it as the "class" and ItemStack
/// as the "instance". Definitions are immutable once registered in
/// the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Unique identity key, written as a catalog path
    /// (e.g. "items/materials/scrap"). Used for lookups and saves.
    pub id: String,

    /// Display name shown in UI
    pub name: String,

    /// Description shown in tooltips
    pub description: String,

    /// Behavioral category (drives slot roles and equipment routing)
    pub category: ItemCategory,

    /// Upgrade tier for tiered equipment; None for untiered items
    pub tier: Option<UpgradeTier>,

    /// Former identity keys this item was registered under, newest first.
    /// The persistence codec tries these when the primary key no longer
    /// resolves after a catalog reorganization.
    pub legacy_ids: Vec<String>,
}

impl ItemDefinition {
    /// Creates a new item definition with no tier and no legacy keys
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        category: ItemCategory,
    ) -> Self {
        ItemDefinition {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            category,
            tier: None,
            legacy_ids: Vec::new(),
        }
    }

    /// Sets the upgrade tier (tiered equipment only)
    pub fn with_tier(mut self, tier: u8) -> Self {
        self.tier = Some(UpgradeTier(tier));
        self
    }

    /// Records former identity keys for save-file fallback resolution
    pub fn with_legacy_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.legacy_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if this definition and `other` describe the same item
    /// kind for stacking purposes
    ///
    /// Equivalence is category + identity key, never instance identity and
    /// never any mutable field, so independently generated stacks of the
    /// same kind (stash, inventory, chest) always merge. Symmetric by
    /// construction.
    pub fn same_item(&self, other: &ItemDefinition) -> bool {
        self.category == other.category && self.id == other.id
    }

    /// Returns true if this item is a strict tier upgrade over `other`
    ///
    /// Both items must belong to the same category and carry a tier;
    /// anything else is never an upgrade.
    pub fn is_upgrade_over(&self, other: &ItemDefinition) -> bool {
        if self.category != other.category {
            return false;
        }
        match (self.tier, other.tier) {
            (Some(mine), Some(theirs)) => mine.is_upgrade_over(theirs),
            _ => false,
        }
    }
}
