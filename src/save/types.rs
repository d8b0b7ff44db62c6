//! Persisted record types
//!
//! One record per container plus a currency scalar, serialized as JSON.
//! World-chest manifests use the same per-slot record shape, keyed by the
//! host object's instance id. Field names are camelCase on the wire; that
//! is the format the external store expects.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inventory::ContainerId;

/// Current save format version
pub const CURRENT_SAVE_VERSION: u32 = 1;

/// One persisted slot: an identity key and a count
///
/// An empty slot is an empty `item_key` with a count of zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub item_key: String,

    #[serde(default)]
    pub count: u32,
}

impl SlotRecord {
    /// The record for an empty slot
    pub fn empty() -> Self {
        SlotRecord {
            item_key: String::new(),
            count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.item_key.is_empty() || self.count == 0
    }
}

/// Full snapshot of one container
///
/// The currency and revive-charge slots are persisted as scalars, not as
/// slot records; `slots` covers every remaining slot in index order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    pub version: u32,
    pub container_id: ContainerId,
    pub saved_at: SystemTime,
    pub currency: u64,
    pub revive_charge: u8,
    pub slots: Vec<SlotRecord>,
}

/// Full snapshot of a world chest's manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRecord {
    pub version: u32,
    pub instance_id: u64,
    pub saved_at: SystemTime,
    pub slots: Vec<SlotRecord>,
}

/// Errors from the persistence layer
///
/// Note what is *not* here: an unresolvable item key during decode is not
/// an error. It is logged, the slot decodes empty, and decoding continues;
/// one stale key must never corrupt the rest of the container.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The record was written by a newer format than this build knows
    #[error("unsupported save version: {0}")]
    InvalidVersion(u32),

    /// A record was asked to decode into a container with a different identity
    #[error("record for {found} cannot restore container {expected}")]
    ContainerMismatch { expected: String, found: String },
}
