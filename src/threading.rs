//! Thread resolution over the in-memory index.
//!
//! Reply chains are reconstructed defensively: parent pointers come from a
//! possibly-corrupted dataset, so chain length and shape are untrusted.
//! Root finding is bounded iteration with a visited set, never recursion; a
//! dangling parent reference makes the current message an effective root
//! and is deliberately left unrepaired. Descendant collection is a
//! fixed-point sweep over a snapshot of the index. The sweep is quadratic
//! in the worst case, which is acceptable for a single-node store, and
//! immune to mid-scan writes because the snapshot is taken once.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::Message;
use crate::store::MessageStore;

/// A fully resolved thread.
///
/// `members` holds every message in the thread except the one resolution
/// started from, newest first. Per-viewer deletion flags are not applied: a
/// thread is a structural view and includes messages a participant has
/// deleted for themselves.
#[derive(Debug, Clone)]
pub struct Thread {
    pub root: Message,
    pub members: Vec<Message>,
}

/// Resolve the thread containing `id`. `None` when `id` is not admitted.
pub fn resolve_thread(store: &MessageStore, id: Uuid) -> Option<Thread> {
    let snapshot = store.get_all();
    resolve_thread_in(&snapshot, id)
}

/// Resolve a thread over an explicit snapshot.
pub fn resolve_thread_in(snapshot: &[Message], id: Uuid) -> Option<Thread> {
    let by_id: HashMap<Uuid, &Message> = snapshot.iter().map(|m| (m.id, m)).collect();
    let requested = by_id.get(&id)?;

    let root = find_root(&by_id, requested);
    let thread_ids = collect_thread_ids(snapshot, root.id);

    let mut members: Vec<Message> = snapshot
        .iter()
        .filter(|m| m.id != id && thread_ids.contains(&m.id))
        .cloned()
        .collect();
    // Newest first; id as tiebreaker keeps equal timestamps deterministic.
    members.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    Some(Thread {
        root: (*root).clone(),
        members,
    })
}

/// Walk parent pointers upward until the true root, an unresolvable
/// parent, or a cycle.
fn find_root<'a>(by_id: &HashMap<Uuid, &'a Message>, start: &'a Message) -> &'a Message {
    let mut visited: HashSet<Uuid> = HashSet::new();
    visited.insert(start.id);

    let mut current = start;
    while let Some(parent_id) = current.parent_id {
        if visited.contains(&parent_id) {
            // Cycle in the parent chain; treat the current message as root.
            break;
        }
        let Some(parent) = by_id.get(&parent_id) else {
            // Dangling reference: the current message is an effective root.
            break;
        };
        visited.insert(parent_id);
        current = parent;
    }
    current
}

/// Fixed-point sweep: starting from `{root}`, keep adding any message whose
/// parent is already in the set until a full pass adds nothing.
fn collect_thread_ids(snapshot: &[Message], root_id: Uuid) -> HashSet<Uuid> {
    let mut thread_ids: HashSet<Uuid> = HashSet::new();
    thread_ids.insert(root_id);

    loop {
        let mut changed = false;
        for message in snapshot {
            if let Some(parent_id) = message.parent_id {
                if !thread_ids.contains(&message.id) && thread_ids.contains(&parent_id) {
                    thread_ids.insert(message.id);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    thread_ids
}
