//! Per-viewer visibility flags.
//!
//! Read and delete state is computed per viewer and lives alongside the
//! otherwise-immutable message. All mutations are idempotent: flagging an
//! already-flagged message is a successful no-op.

use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{Message, normalize_name};
use crate::store::MessageStore;

/// Which per-viewer flag to set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityFlag {
    Read,
    Deleted,
}

/// Set a visibility flag for a viewer, writing through to disk.
/// `Ok(false)` when the id is not admitted.
pub fn set_visibility_flag(
    store: &MessageStore,
    id: Uuid,
    viewer: &str,
    flag: VisibilityFlag,
) -> StoreResult<bool> {
    let updated = store.modify(id, |message| match flag {
        VisibilityFlag::Read => message.mark_read_by(viewer),
        VisibilityFlag::Deleted => message.mark_deleted_by(viewer),
    })?;
    Ok(updated.is_some())
}

pub fn mark_read(store: &MessageStore, id: Uuid, viewer: &str) -> StoreResult<bool> {
    set_visibility_flag(store, id, viewer, VisibilityFlag::Read)
}

pub fn mark_deleted(store: &MessageStore, id: Uuid, viewer: &str) -> StoreResult<bool> {
    set_visibility_flag(store, id, viewer, VisibilityFlag::Deleted)
}

/// Delete a message for a viewer after checking they participate in it.
/// `Ok(false)` when the id is not admitted.
pub fn delete_for_participant(
    store: &MessageStore,
    id: Uuid,
    viewer: &str,
) -> StoreResult<bool> {
    let Some(message) = store.get_by_id(id) else {
        return Ok(false);
    };
    if !message.is_participant(viewer) {
        return Err(StoreError::NotParticipant {
            viewer: normalize_name(viewer),
            id,
        });
    }
    mark_deleted(store, id, viewer)
}

pub fn read_status(message: &Message, viewer: &str) -> bool {
    message.is_read_by(viewer)
}

pub fn deleted_status(message: &Message, viewer: &str) -> bool {
    message.is_deleted_for(viewer)
}

/// `None` when the id is not admitted.
pub fn is_read_by(store: &MessageStore, id: Uuid, viewer: &str) -> Option<bool> {
    store.get_by_id(id).map(|m| m.is_read_by(viewer))
}

/// `None` when the id is not admitted.
pub fn is_deleted_by(store: &MessageStore, id: Uuid, viewer: &str) -> Option<bool> {
    store.get_by_id(id).map(|m| m.is_deleted_for(viewer))
}
