use thiserror::Error;

use super::container::{ContainerId, SlotAddr};
use crate::save::SaveError;

/// Errors that can occur during transfer-engine operations
///
/// Every rejected operation leaves all slots exactly as they were; none of
/// these is fatal and none is ever swallowed silently.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The source slot holds nothing
    #[error("source slot {0} is empty")]
    EmptySource(SlotAddr),

    /// The destination slot is below the active capacity tier or locked
    #[error("slot {0} is inactive")]
    SlotInactive(SlotAddr),

    /// The destination slot already holds a stack
    #[error("slot {0} is occupied")]
    SlotOccupied(SlotAddr),

    /// A slot's role filter rejected the item's category
    #[error("slot {addr} ({role}) does not accept '{item_id}'")]
    RoleRejected {
        addr: SlotAddr,
        role: &'static str,
        item_id: String,
    },

    /// Explicit equip of an item that has no dedicated slot here
    #[error("'{0}' cannot be equipped here")]
    NotEquippable(String),

    /// Currency operation against a container with no currency slot
    #[error("container {0} has no currency slot")]
    NoCurrencySlot(ContainerId),

    /// No stackable or empty active generic slot is available
    #[error("container {0} is full")]
    ContainerFull(ContainerId),

    /// Zero amount, or more than the source stack holds
    #[error("invalid amount {requested} (available: {available})")]
    InvalidAmount { requested: u32, available: u32 },

    /// Slot index out of bounds for its container
    #[error("invalid slot index {0}")]
    InvalidSlot(SlotAddr),

    /// Item identity key not present in the catalog
    #[error("unknown item '{0}'")]
    UnknownItem(String),

    /// No container with this identity is attached to the engine
    #[error("unknown container {0}")]
    UnknownContainer(ContainerId),

    /// Quick transfer attempted against a container the interaction layer
    /// reports as closed
    #[error("container {0} is not open")]
    ContainerNotOpen(ContainerId),

    /// Equipment router: the offered item does not improve on what is
    /// already equipped
    #[error("'{offered}' is not an upgrade over equipped '{equipped}'")]
    UpgradeRejected { offered: String, equipped: String },

    /// The revive slot already holds its single allowed charge
    #[error("revive slot already holds a charge")]
    ReviveCapReached,

    /// Flushing the post-operation state to the store failed
    #[error(transparent)]
    Save(#[from] SaveError),
}
