use std::collections::BTreeMap;

use crate::item::UpgradeTier;

/// Governs how many generic slots of a container are active
///
/// Active capacity follows the equipped carry upgrade: no upgrade means
/// `min_active` slots, and each known tier maps to its own count. Counts
/// are clamped to the container's generic slot total when applied.
#[derive(Debug, Clone)]
pub struct CapacityPolicy {
    min_active: usize,
    tier_to_active: BTreeMap<UpgradeTier, usize>,
}

impl CapacityPolicy {
    /// Creates a policy with a floor of `min_active` slots and no tiers
    pub fn new(min_active: usize) -> Self {
        CapacityPolicy {
            min_active,
            tier_to_active: BTreeMap::new(),
        }
    }

    /// A policy where every generic slot is always active (stash, chests)
    pub fn all_active() -> Self {
        CapacityPolicy {
            min_active: usize::MAX,
            tier_to_active: BTreeMap::new(),
        }
    }

    /// Maps an upgrade tier to its active slot count
    pub fn with_tier(mut self, tier: u8, active: usize) -> Self {
        self.tier_to_active.insert(UpgradeTier(tier), active);
        self
    }

    /// The guaranteed minimum number of active generic slots
    pub fn min_active(&self) -> usize {
        self.min_active
    }

    /// Active slot count for an equipped carry tier (None = no upgrade)
    ///
    /// An unknown tier falls back to the highest known tier at or below
    /// it, so a save from a newer item table degrades gracefully.
    pub fn active_for_tier(&self, tier: Option<UpgradeTier>) -> usize {
        let from_tier = tier.and_then(|t| {
            self.tier_to_active
                .range(..=t)
                .next_back()
                .map(|(_, count)| *count)
        });
        from_tier.unwrap_or(0).max(self.min_active)
    }

    /// Clamps a requested active count to `[min_active, generic_total]`
    pub fn clamp(&self, requested: usize, generic_total: usize) -> usize {
        requested.max(self.min_active).min(generic_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CapacityPolicy {
        CapacityPolicy::new(4).with_tier(1, 6).with_tier(2, 10)
    }

    #[test]
    fn test_no_upgrade_gives_minimum() {
        assert_eq!(policy().active_for_tier(None), 4);
    }

    #[test]
    fn test_known_tiers() {
        assert_eq!(policy().active_for_tier(Some(UpgradeTier(1))), 6);
        assert_eq!(policy().active_for_tier(Some(UpgradeTier(2))), 10);
    }

    #[test]
    fn test_unknown_tier_rounds_down() {
        // Tier 3 isn't mapped; nearest tier at or below is 2
        assert_eq!(policy().active_for_tier(Some(UpgradeTier(3))), 10);
    }

    #[test]
    fn test_clamp_bounds() {
        let p = policy();
        assert_eq!(p.clamp(0, 12), 4); // floor
        assert_eq!(p.clamp(20, 12), 12); // ceiling
        assert_eq!(p.clamp(7, 12), 7);
    }
}
