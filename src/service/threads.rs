//! Paged thread resolution.

use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::Message;
use crate::service::pagination::{Paginated, paginate};
use crate::store::MessageStore;
use crate::threading::resolve_thread;

/// Resolve the thread containing `id` and page its members (the requested
/// message excluded, newest first). `Ok(None)` when `id` is not admitted.
pub fn resolve_thread_page(
    store: &MessageStore,
    id: Uuid,
    page: i64,
    per_page: i64,
) -> StoreResult<Option<(Message, Paginated<Message>)>> {
    let Some(thread) = resolve_thread(store, id) else {
        return Ok(None);
    };
    let paged = paginate(&thread.members, page, per_page)?;
    Ok(Some((thread.root, paged)))
}
