//! packrat — slot-based container storage and transfer engine
//!
//! Stores stackable item instances in fixed-capacity slots across multiple
//! containers (world loot chests, the carried inventory, a persistent
//! stash, dedicated equipment and currency slots) and moves, stacks, swaps
//! and persists them under strict no-duplication, no-loss guarantees.
//!
//! This is a library: there is no entry point here. The interaction/UI
//! layer constructs an [`item::ItemCatalog`], attaches containers to a
//! [`inventory::TransferEngine`] over a [`save::StateStore`], and drives
//! the engine's operations from user input. The engine owns every storage
//! invariant; collaborators only consume its events and queries.
//!
//! Design points worth knowing before digging in:
//! - A stack's count is a `NonZeroU32`; an "empty stack" cannot be
//!   constructed, so an empty slot is always `None`.
//! - Every operation is atomic: validation happens against a read-only
//!   view, and a rejected operation has mutated nothing.
//! - Persistence is flush-after-each-operation, on the same call stack;
//!   observers are notified only after the flush.

pub mod inventory;
pub mod item;
pub mod save;
pub mod world;

pub use inventory::{
    can_stack, standard_engine, CapacityPolicy, Container, ContainerEvent, ContainerId,
    ContainerObserver, CurrencyLedger, EventLog, InteractionGate, Slot, SlotAddr, SlotRole,
    TransferEngine, TransferError,
};
pub use item::{ItemCatalog, ItemCategory, ItemDefinition, ItemStack, UpgradeTier};
pub use save::{FileStore, MemoryStore, SaveError, StateStore};
pub use world::{ContainerRegistry, LootTable, Manifest};
