// Persistence module
//
// This module provides save/load support for the transfer engine:
// - Wire record types (one record per container, plus chest manifests)
// - The codec between containers and records, with fallback key resolution
// - State stores (in-memory and file-backed) the engine flushes through

pub mod codec;
pub mod store;
pub mod types;

// Re-export main types
pub use codec::{decode_into, decode_manifest, encode_container, encode_manifest};
pub use store::{FileStore, MemoryStore, StateStore};
pub use types::{ContainerRecord, ManifestRecord, SaveError, SlotRecord, CURRENT_SAVE_VERSION};
