//! Recipient-filtered views.
//!
//! Two distinct views exist and every read path must apply their rules
//! identically. The inbox view hides messages the viewer has deleted for
//! themselves; the audit view applies no deletion filtering at all and
//! exposes the per-viewer read/delete sets.

use crate::error::StoreResult;
use crate::models::{Message, normalize_name};
use crate::service::pagination::{Paginated, paginate};
use crate::store::MessageStore;

/// Newest first, ties broken by id for determinism.
fn sort_newest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Apply the inbox visibility rule to a list of messages: the viewer is a
/// recipient or the sender, and has not deleted the message.
pub fn filter_for_viewer(messages: &[Message], viewer: &str) -> Vec<Message> {
    let viewer = normalize_name(viewer);
    messages
        .iter()
        .filter(|m| {
            let is_recipient = m.to.contains(&viewer);
            let is_sender = m.sender == viewer;
            let is_deleted = m.deleted_by.contains(&viewer);
            (is_recipient || is_sender) && !is_deleted
        })
        .cloned()
        .collect()
}

/// Inbox view for a viewer, newest first.
pub fn inbox_for_viewer(store: &MessageStore, viewer: &str) -> Vec<Message> {
    let mut visible = filter_for_viewer(&store.get_all(), viewer);
    sort_newest_first(&mut visible);
    visible
}

/// Audit view for a subject name: every message the name participates in,
/// deleted or not, newest first.
pub fn audit_for_name(store: &MessageStore, name: &str) -> Vec<Message> {
    let name = normalize_name(name);
    let mut matching: Vec<Message> = store
        .get_all()
        .into_iter()
        .filter(|m| m.to.contains(&name) || m.sender == name)
        .collect();
    sort_newest_first(&mut matching);
    matching
}

/// Paged inbox view.
pub fn list_inbox(
    store: &MessageStore,
    viewer: &str,
    page: i64,
    per_page: i64,
) -> StoreResult<Paginated<Message>> {
    paginate(&inbox_for_viewer(store, viewer), page, per_page)
}

/// Paged audit view.
pub fn list_audit(
    store: &MessageStore,
    name: &str,
    page: i64,
    per_page: i64,
) -> StoreResult<Paginated<Message>> {
    paginate(&audit_for_name(store, name), page, per_page)
}
