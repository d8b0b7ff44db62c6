// Inventory system module
//
// This module provides the storage core of the crate:
// - Slots with roles and active flags
// - Containers (inventory, stash, world chests) with capacity policies
// - The stacking resolver and the transfer engine built on top of them
// - The equipment router, currency ledger and observer events

pub mod capacity;
pub mod container;
pub mod currency;
pub mod error;
pub mod events;
pub mod resolver;
pub(crate) mod router;
pub mod slot;
pub mod transfer;

// Re-export main types
pub use capacity::CapacityPolicy;
pub use container::{Container, ContainerId, SlotAddr};
pub use currency::CurrencyLedger;
pub use error::TransferError;
pub use events::{ContainerEvent, ContainerObserver, EventLog, InteractionGate};
pub use resolver::can_stack;
pub use slot::{Slot, SlotRole};
pub use transfer::{standard_engine, TransferEngine};
