use serde::{Deserialize, Serialize};

/// Broad behavioral category of an item
///
/// The category is decided once, here, and drives every routing and
/// role-filter decision in the engine. Nothing else in the crate is
/// allowed to ask "is this a coin?" by other means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    /// The distinguished currency item kind
    Currency,

    /// Equippable weapon
    Weapon,

    /// Equippable armor (tiered)
    Armor,

    /// Carry-capacity upgrade, e.g. a backpack (tiered)
    CarryUpgrade,

    /// Single-use self-revive charge
    ReviveCharge,

    /// Everything else: materials, loot, junk
    Generic,
}

impl ItemCategory {
    /// Returns true if items of this category go through the equipment
    /// router before generic slot placement
    pub fn is_routed(self) -> bool {
        !matches!(self, ItemCategory::Generic)
    }
}

/// Upgrade tier for tiered equipment (armor, carry upgrades, weapons)
///
/// Comparison is monotonic: a higher tier is always an upgrade over a
/// lower one, and equal tiers never upgrade each other.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UpgradeTier(pub u8);

impl UpgradeTier {
    /// Returns true if this tier strictly improves on `other`
    pub fn is_upgrade_over(self, other: UpgradeTier) -> bool {
        self > other
    }
}
