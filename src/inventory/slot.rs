use serde::{Deserialize, Serialize};

use crate::item::{ItemCategory, ItemStack};

/// The restriction a slot places on what it may hold
///
/// Role assignment is static for the life of a container: slot 0 of the
/// player inventory is always the currency slot, and so on. `accepts` is
/// the one dispatch table for every "can this item go here" question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotRole {
    /// Holds anything
    Generic,

    /// Dedicated currency slot
    Currency,

    /// Dedicated weapon slot
    WeaponEquip,

    /// Dedicated armor slot
    ArmorEquip,

    /// Dedicated carry-upgrade slot (drives active capacity)
    CarryEquip,

    /// Dedicated self-revive slot (hard cap of one charge)
    ReviveEquip,

    /// Present but not purchased/unlocked; holds nothing
    Locked,
}

impl SlotRole {
    /// Returns true if this role accepts items of the given category
    pub fn accepts(self, category: ItemCategory) -> bool {
        match self {
            SlotRole::Generic => true,
            SlotRole::Currency => category == ItemCategory::Currency,
            SlotRole::WeaponEquip => category == ItemCategory::Weapon,
            SlotRole::ArmorEquip => category == ItemCategory::Armor,
            SlotRole::CarryEquip => category == ItemCategory::CarryUpgrade,
            SlotRole::ReviveEquip => category == ItemCategory::ReviveCharge,
            SlotRole::Locked => false,
        }
    }

    /// Short lowercase name, used in log and error messages
    pub fn name(self) -> &'static str {
        match self {
            SlotRole::Generic => "generic",
            SlotRole::Currency => "currency",
            SlotRole::WeaponEquip => "weapon",
            SlotRole::ArmorEquip => "armor",
            SlotRole::CarryEquip => "carry",
            SlotRole::ReviveEquip => "revive",
            SlotRole::Locked => "locked",
        }
    }

    /// The dedicated role an item category routes to, if any
    pub fn dedicated_for(category: ItemCategory) -> Option<SlotRole> {
        match category {
            ItemCategory::Currency => Some(SlotRole::Currency),
            ItemCategory::Weapon => Some(SlotRole::WeaponEquip),
            ItemCategory::Armor => Some(SlotRole::ArmorEquip),
            ItemCategory::CarryUpgrade => Some(SlotRole::CarryEquip),
            ItemCategory::ReviveCharge => Some(SlotRole::ReviveEquip),
            ItemCategory::Generic => None,
        }
    }
}

/// A single storage cell
///
/// Holds zero or one stack. Fields are private so the only mutations are
/// the ones below, all of which preserve the "occupied means count > 0"
/// invariant (the stack type itself makes count 0 unrepresentable).
#[derive(Debug, Clone)]
pub struct Slot {
    stack: Option<ItemStack>,
    role: SlotRole,
    active: bool,
}

impl Slot {
    /// Creates an empty active slot with the given role
    pub fn new(role: SlotRole) -> Self {
        Slot {
            stack: None,
            role,
            active: !matches!(role, SlotRole::Locked),
        }
    }

    /// Creates an empty inactive slot (above the current capacity tier)
    pub fn inactive(role: SlotRole) -> Self {
        Slot {
            stack: None,
            role,
            active: false,
        }
    }

    /// The stack held here, if any
    pub fn stack(&self) -> Option<&ItemStack> {
        self.stack.as_ref()
    }

    /// This slot's role
    pub fn role(&self) -> SlotRole {
        self.role
    }

    /// Whether the slot is currently usable
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the slot holds nothing
    pub fn is_empty(&self) -> bool {
        self.stack.is_none()
    }

    pub(crate) fn stack_mut(&mut self) -> Option<&mut ItemStack> {
        self.stack.as_mut()
    }

    /// Removes and returns the stack, leaving the slot empty
    pub(crate) fn take(&mut self) -> Option<ItemStack> {
        self.stack.take()
    }

    /// Places a stack into an empty slot
    ///
    /// Returns the stack back if the slot is already occupied; role and
    /// activity checks are the engine's responsibility and happen before
    /// any mutation.
    pub(crate) fn place(&mut self, stack: ItemStack) -> Result<(), ItemStack> {
        if self.stack.is_some() {
            return Err(stack);
        }
        self.stack = Some(stack);
        Ok(())
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
