//! The write path for new messages.
//!
//! Mirrors what senders expect of a mail system: the reserved recipient
//! `everyone` fans out to every registered agent except the sender, a reply
//! must name an existing parent, reply subjects gain a `Re: ` prefix, and
//! the sender has implicitly read what they wrote.

use crate::error::{StoreError, StoreResult};
use crate::models::{Message, NewMessage};
use crate::store::MessageStore;

/// Reserved recipient name that expands to every registered agent.
pub const BROADCAST_NAME: &str = "everyone";

/// Prefix a reply subject unless it already carries one.
pub fn reply_subject(subject: &str) -> String {
    if subject.to_lowercase().starts_with("re:") {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

/// Validate and store a new message, writing through to disk.
pub fn send(store: &MessageStore, draft: NewMessage) -> StoreResult<Message> {
    let mut draft = draft;

    if draft.to.iter().any(|name| name == BROADCAST_NAME) {
        let agents = store.registered_agent_names();
        draft.to = expand_broadcast(&draft.to, &draft.sender, &agents);
        if draft.to.is_empty() {
            return Err(StoreError::BroadcastEmpty);
        }
    }

    if let Some(parent_id) = draft.parent_id {
        // Dangling references are tolerated in admitted data but never
        // written: a reply must name a live parent.
        if !store.exists(parent_id) {
            return Err(StoreError::ParentNotFound(parent_id));
        }
        draft.subject = reply_subject(&draft.subject);
    }

    let mut message = draft.into_message();
    let sender = message.sender.clone();
    message.mark_read_by(&sender);
    store.create(message)
}

/// Replace the broadcast name with every registered agent except the
/// sender, deduplicating while preserving order.
fn expand_broadcast(to: &[String], sender: &str, agents: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    for name in to {
        if name != BROADCAST_NAME && !expanded.contains(name) {
            expanded.push(name.clone());
        }
    }
    for agent in agents {
        if agent != sender && !expanded.contains(agent) {
            expanded.push(agent.clone());
        }
    }
    expanded
}
