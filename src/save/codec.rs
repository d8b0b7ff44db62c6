//! Persistence codec: containers and currency state to/from wire records
//!
//! Encoding is total; decoding is deliberately lossy in exactly one way:
//! an item key that no longer resolves in the catalog (after all fallback
//! keys) logs a warning and yields an empty slot. One stale key never
//! corrupts the rest of the container, and decode as a whole never fails
//! because of catalog drift.

use std::time::SystemTime;

use log::warn;

use super::types::{ContainerRecord, ManifestRecord, SlotRecord, CURRENT_SAVE_VERSION};
use super::SaveError;
use crate::inventory::{Container, Slot, SlotRole};
use crate::item::{ItemCatalog, ItemCategory, ItemStack};
use crate::world::{Manifest, ManifestEntry};

/// Roles that are persisted as scalars rather than slot records
fn is_scalar_role(role: SlotRole) -> bool {
    matches!(role, SlotRole::Currency | SlotRole::ReviveEquip)
}

fn slot_record(slot: &Slot) -> SlotRecord {
    match slot.stack() {
        Some(stack) => SlotRecord {
            item_key: stack.item_id.clone(),
            count: stack.count(),
        },
        None => SlotRecord::empty(),
    }
}

/// Snapshots a container into its wire record
///
/// The currency and revive slots become the record's scalars; every other
/// slot becomes a `SlotRecord` in index order (empty slots included, so
/// positions survive the round trip).
pub fn encode_container(container: &Container) -> ContainerRecord {
    let currency = container
        .role_slot_index(SlotRole::Currency)
        .and_then(|index| container.slot(index))
        .and_then(|slot| slot.stack())
        .map(|stack| u64::from(stack.count()))
        .unwrap_or(0);

    let revive_charge = container
        .role_slot_index(SlotRole::ReviveEquip)
        .and_then(|index| container.slot(index))
        .map(|slot| u8::from(!slot.is_empty()))
        .unwrap_or(0);

    let slots = container
        .slots()
        .filter(|slot| !is_scalar_role(slot.role()))
        .map(slot_record)
        .collect();

    ContainerRecord {
        version: CURRENT_SAVE_VERSION,
        container_id: container.id(),
        saved_at: SystemTime::now(),
        currency,
        revive_charge,
        slots,
    }
}

/// Restores a record into a freshly constructed container template
///
/// The template supplies the layout (roles, policy); the record supplies
/// the contents. Slot records map onto the template's non-scalar slots in
/// index order. Unresolvable keys decode to empty slots with a warning;
/// a role mismatch (corrupt record) is likewise skipped rather than
/// violating the role filter.
pub fn decode_into(
    record: &ContainerRecord,
    catalog: &ItemCatalog,
    container: &mut Container,
) -> Result<(), SaveError> {
    if record.version > CURRENT_SAVE_VERSION {
        return Err(SaveError::InvalidVersion(record.version));
    }
    if record.container_id != container.id() {
        return Err(SaveError::ContainerMismatch {
            expected: container.id().to_string(),
            found: record.container_id.to_string(),
        });
    }

    let target_indices: Vec<usize> = (0..container.len())
        .filter(|&index| {
            container
                .slot(index)
                .is_some_and(|slot| !is_scalar_role(slot.role()))
        })
        .collect();

    if record.slots.len() != target_indices.len() {
        warn!(
            "{}: record has {} slots, container expects {}; extra entries are dropped",
            container.id(),
            record.slots.len(),
            target_indices.len()
        );
    }

    for (&index, slot_record) in target_indices.iter().zip(&record.slots) {
        if slot_record.is_empty() {
            continue;
        }

        let Some(def) = catalog.resolve(&slot_record.item_key) else {
            warn!(
                "{}: item key '{}' did not resolve, slot {} decodes empty",
                container.id(),
                slot_record.item_key,
                index
            );
            continue;
        };

        let role = container.slot(index).map(|slot| slot.role());
        if !role.is_some_and(|role| role.accepts(def.category)) {
            warn!(
                "{}: '{}' does not belong in slot {}, skipping",
                container.id(),
                def.id,
                index
            );
            continue;
        }

        // Resolution may have gone through a legacy key; store under the
        // current identity so the next save is clean.
        let Some(stack) = ItemStack::new(def.id.clone(), slot_record.count) else {
            continue;
        };
        let slot = container.slot_mut(index).expect("indexed slot vanished");
        if slot.place(stack).is_err() {
            warn!("{}: slot {} already occupied during decode", container.id(), index);
        }
    }

    decode_currency_scalar(record.currency, catalog, container);
    decode_revive_scalar(record.revive_charge, catalog, container);

    Ok(())
}

fn decode_currency_scalar(amount: u64, catalog: &ItemCatalog, container: &mut Container) {
    if amount == 0 {
        return;
    }
    let Some(index) = container.role_slot_index(SlotRole::Currency) else {
        warn!("{}: record carries currency but container has no currency slot", container.id());
        return;
    };
    let Some(def) = catalog.first_of_category(ItemCategory::Currency) else {
        warn!("{}: no currency item registered, {} units dropped", container.id(), amount);
        return;
    };
    let count = u32::try_from(amount).unwrap_or_else(|_| {
        warn!("{}: currency {} exceeds stack limit, clamping", container.id(), amount);
        u32::MAX
    });
    let Some(stack) = ItemStack::new(def.id.clone(), count) else {
        return;
    };
    let slot = container.slot_mut(index).expect("currency slot vanished");
    if slot.place(stack).is_err() {
        warn!("{}: currency slot already occupied during decode", container.id());
    }
}

fn decode_revive_scalar(charge: u8, catalog: &ItemCatalog, container: &mut Container) {
    if charge == 0 {
        return;
    }
    let Some(index) = container.role_slot_index(SlotRole::ReviveEquip) else {
        return;
    };
    let Some(def) = catalog.first_of_category(ItemCategory::ReviveCharge) else {
        warn!("{}: no revive item registered, charge dropped", container.id());
        return;
    };
    // The cap is one regardless of what the record claims.
    let Some(stack) = ItemStack::new(def.id.clone(), 1) else {
        return;
    };
    let slot = container.slot_mut(index).expect("revive slot vanished");
    if slot.place(stack).is_err() {
        warn!("{}: revive slot already occupied during decode", container.id());
    }
}

/// Snapshots a world-chest manifest into its wire record
pub fn encode_manifest(instance_id: u64, manifest: &Manifest) -> ManifestRecord {
    let slots = manifest
        .entries
        .iter()
        .map(|entry| SlotRecord {
            item_key: entry.item_id.clone(),
            count: entry.count,
        })
        .collect();

    ManifestRecord {
        version: CURRENT_SAVE_VERSION,
        instance_id,
        saved_at: SystemTime::now(),
        slots,
    }
}

/// Restores a manifest from its wire record
///
/// Unresolvable entries are logged and dropped, same as container decode.
pub fn decode_manifest(
    record: &ManifestRecord,
    catalog: &ItemCatalog,
) -> Result<Manifest, SaveError> {
    if record.version > CURRENT_SAVE_VERSION {
        return Err(SaveError::InvalidVersion(record.version));
    }

    let entries = record
        .slots
        .iter()
        .filter(|slot| !slot.is_empty())
        .filter_map(|slot| match catalog.resolve(&slot.item_key) {
            Some(def) => Some(ManifestEntry {
                item_id: def.id.clone(),
                count: slot.count,
            }),
            None => {
                warn!(
                    "chest_{}: manifest key '{}' did not resolve, entry dropped",
                    record.instance_id, slot.item_key
                );
                None
            }
        })
        .collect();

    Ok(Manifest { entries })
}
