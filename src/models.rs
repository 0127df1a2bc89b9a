//! Message model, participant normalization, and validation.
//!
//! Two trust levels exist for candidate records: the strict path
//! ([`validate_for_create`]) rejects on any defect and backs the write API;
//! the lenient, repairing path lives in the admission pipeline and is only
//! applied to data read from disk at startup.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::error::ValidationError;

/// Fixed textual timestamp format: second precision, mandatory UTC marker.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Fields accepted in a message creation payload.
pub const ALLOWED_CREATE_FIELDS: [&str; 5] = ["to", "from", "subject", "content", "isResponseTo"];

/// Fields a persisted message record may carry; anything else is stripped
/// during admission.
pub const ALLOWED_RECORD_FIELDS: [&str; 9] = [
    "id",
    "to",
    "from",
    "subject",
    "content",
    "timestamp",
    "isResponseTo",
    "readBy",
    "deletedBy",
];

static MESSAGE_ID_REGEX: OnceLock<Regex> = OnceLock::new();

fn message_id_regex() -> &'static Regex {
    MESSAGE_ID_REGEX.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .expect("message id pattern is valid")
    })
}

/// Normalize a participant name: trimmed, lowercased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalize a list of names, dropping entries that normalize to empty and
/// deduplicating while preserving first occurrence.
pub fn normalize_name_list<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for name in names {
        let normalized = normalize_name(name.as_ref());
        if !normalized.is_empty() && !result.contains(&normalized) {
            result.push(normalized);
        }
    }
    result
}

/// Whether a string is a message identifier in canonical hyphenated hex
/// form. Unhyphenated, braced, and URN renderings are rejected.
pub fn is_valid_message_id(value: &str) -> bool {
    message_id_regex().is_match(value)
}

/// Parse a canonical hyphenated identifier; `None` for any other form.
pub fn parse_message_id(value: &str) -> Option<Uuid> {
    if !is_valid_message_id(value) {
        return None;
    }
    Uuid::parse_str(value).ok()
}

/// Parse a timestamp in the fixed format; `None` on any deviation
/// (sub-second precision, offsets, missing `Z`).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Render a timestamp in the fixed format.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Current UTC time truncated to the second, matching what the fixed
/// format can represent.
pub fn now_second_precision() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Serde adapter holding `created_at`/`quarantined_at` to the fixed format.
pub mod timestamp_format {
    use super::{DateTime, TIMESTAMP_FORMAT, Utc, parse_timestamp};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&timestamp.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp format: {raw}")))
    }
}

/// An admitted, immutable message. Only `read_by`/`deleted_by` mutate after
/// creation; everything else is fixed for the record's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub to: Vec<String>,
    #[serde(rename = "from")]
    pub sender: String,
    pub subject: String,
    #[serde(rename = "content")]
    pub body: String,
    #[serde(rename = "timestamp", with = "timestamp_format")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "isResponseTo", default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub read_by: Vec<String>,
    #[serde(default)]
    pub deleted_by: Vec<String>,
}

impl Message {
    /// All participants: recipients plus the sender, deduplicated.
    pub fn participants(&self) -> Vec<String> {
        let mut participants = self.to.clone();
        if !participants.contains(&self.sender) {
            participants.push(self.sender.clone());
        }
        participants
    }

    pub fn is_participant(&self, name: &str) -> bool {
        let normalized = normalize_name(name);
        self.sender == normalized || self.to.contains(&normalized)
    }

    pub fn is_read_by(&self, name: &str) -> bool {
        self.read_by.contains(&normalize_name(name))
    }

    pub fn is_deleted_for(&self, name: &str) -> bool {
        self.deleted_by.contains(&normalize_name(name))
    }

    /// Record that `name` has read this message. Idempotent.
    pub fn mark_read_by(&mut self, name: &str) {
        let normalized = normalize_name(name);
        if !normalized.is_empty() && !self.read_by.contains(&normalized) {
            self.read_by.push(normalized);
        }
    }

    /// Record that `name` has deleted this message for themselves. Idempotent.
    pub fn mark_deleted_by(&mut self, name: &str) {
        let normalized = normalize_name(name);
        if !normalized.is_empty() && !self.deleted_by.contains(&normalized) {
            self.deleted_by.push(normalized);
        }
    }
}

/// A validated, normalized draft ready to become a [`Message`].
///
/// Produced by [`validate_for_create`] (untrusted payloads) or
/// [`NewMessage::new`] (typed callers); either way the name fields are
/// already normalized and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub to: Vec<String>,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub parent_id: Option<Uuid>,
}

impl NewMessage {
    pub fn new<S: AsRef<str>>(
        to: &[S],
        sender: &str,
        subject: &str,
        body: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Self, ValidationError> {
        if to.is_empty() {
            return Err(ValidationError::EmptyValue("to"));
        }
        if to.iter().any(|name| normalize_name(name.as_ref()).is_empty()) {
            return Err(ValidationError::EmptyValue("to"));
        }
        let sender = normalize_name(sender);
        if sender.is_empty() {
            return Err(ValidationError::EmptyValue("from"));
        }
        Ok(Self {
            to: normalize_name_list(to),
            sender,
            subject: subject.to_string(),
            body: body.to_string(),
            parent_id,
        })
    }

    /// Seal the draft: assign a fresh identifier and the current UTC time.
    pub fn into_message(self) -> Message {
        Message {
            id: Uuid::new_v4(),
            to: self.to,
            sender: self.sender,
            subject: self.subject,
            body: self.body,
            created_at: now_second_precision(),
            parent_id: self.parent_id,
            read_by: Vec::new(),
            deleted_by: Vec::new(),
        }
    }
}

/// Strictly validate an untrusted create payload.
///
/// Checks, in order: unknown fields, missing required fields, per-field
/// type and shape, reply-reference format. The first defect wins; nothing
/// is repaired on this path.
pub fn validate_for_create(payload: &Value) -> Result<NewMessage, ValidationError> {
    let object = payload.as_object().ok_or(ValidationError::WrongType {
        field: "body",
        expected: "a JSON object",
    })?;

    for key in object.keys() {
        if !ALLOWED_CREATE_FIELDS.contains(&key.as_str()) {
            return Err(ValidationError::UnknownField(key.clone()));
        }
    }

    for field in ["to", "from", "subject", "content"] {
        if !object.contains_key(field) {
            return Err(ValidationError::MissingField(field));
        }
    }

    let to = object["to"].as_array().ok_or(ValidationError::WrongType {
        field: "to",
        expected: "an array",
    })?;
    if to.is_empty() {
        return Err(ValidationError::EmptyValue("to"));
    }
    let mut recipients: Vec<String> = Vec::with_capacity(to.len());
    for entry in to {
        let name = entry.as_str().ok_or(ValidationError::WrongType {
            field: "to",
            expected: "an array of strings",
        })?;
        if normalize_name(name).is_empty() {
            return Err(ValidationError::EmptyValue("to"));
        }
        recipients.push(name.to_string());
    }

    let sender = object["from"].as_str().ok_or(ValidationError::WrongType {
        field: "from",
        expected: "a string",
    })?;
    if normalize_name(sender).is_empty() {
        return Err(ValidationError::EmptyValue("from"));
    }

    let subject = object["subject"]
        .as_str()
        .ok_or(ValidationError::WrongType {
            field: "subject",
            expected: "a string",
        })?;
    let body = object["content"]
        .as_str()
        .ok_or(ValidationError::WrongType {
            field: "content",
            expected: "a string",
        })?;

    let parent_id = match object.get("isResponseTo") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(parse_message_id(raw).ok_or_else(|| {
            ValidationError::InvalidReference {
                field: "isResponseTo",
                value: raw.clone(),
            }
        })?),
        Some(_) => {
            return Err(ValidationError::WrongType {
                field: "isResponseTo",
                expected: "a string or null",
            });
        }
    };

    NewMessage::new(&recipients, sender, subject, body, parent_id)
}

/// A record excluded from the live index, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    pub original: Value,
    pub reason: String,
    #[serde(with = "timestamp_format")]
    pub quarantined_at: DateTime<Utc>,
}

impl QuarantineEntry {
    pub fn new(original: Value, reason: impl Into<String>) -> Self {
        Self {
            original,
            reason: reason.into(),
            quarantined_at: now_second_precision(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Alice  "), "alice");
        assert_eq!(normalize_name("BOB"), "bob");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_normalize_name_list_dedupes_preserving_order() {
        let names = ["Alice", "  bob ", "ALICE", "", "carol", "Bob"];
        assert_eq!(normalize_name_list(&names), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_message_id_accepts_canonical_form_only() {
        assert!(is_valid_message_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_valid_message_id("550E8400-E29B-41D4-A716-446655440000"));
        // Unhyphenated, braced, and URN forms are not canonical.
        assert!(!is_valid_message_id("550e8400e29b41d4a716446655440000"));
        assert!(!is_valid_message_id(
            "{550e8400-e29b-41d4-a716-446655440000}"
        ));
        assert!(!is_valid_message_id(
            "urn:uuid:550e8400-e29b-41d4-a716-446655440000"
        ));
        assert!(!is_valid_message_id("not-a-uuid"));
        assert!(!is_valid_message_id(""));
    }

    #[test]
    fn test_parse_timestamp_strict_format() {
        assert!(parse_timestamp("2024-01-15T10:30:00Z").is_some());
        assert!(parse_timestamp("2024-01-15T10:30:00").is_none());
        assert!(parse_timestamp("2024-01-15T10:30:00.123Z").is_none());
        assert!(parse_timestamp("2024-01-15T10:30:00+00:00").is_none());
        assert!(parse_timestamp("2024-01-15 10:30:00Z").is_none());
        assert!(parse_timestamp("garbage").is_none());
    }

    #[test]
    fn test_timestamp_round_trip() {
        let parsed = parse_timestamp("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(format_timestamp(&parsed), "2024-01-15T10:30:00Z");
    }

    #[test]
    fn test_message_serde_round_trip() {
        let message = Message {
            id: Uuid::new_v4(),
            to: vec!["alice".to_string(), "bob".to_string()],
            sender: "carol".to_string(),
            subject: "Status".to_string(),
            body: "All good.".to_string(),
            created_at: parse_timestamp("2024-03-01T08:00:00Z").unwrap(),
            parent_id: None,
            read_by: vec!["carol".to_string()],
            deleted_by: Vec::new(),
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["from"], "carol");
        assert_eq!(value["content"], "All good.");
        assert_eq!(value["timestamp"], "2024-03-01T08:00:00Z");
        assert_eq!(value["isResponseTo"], Value::Null);
        assert_eq!(value["readBy"], json!(["carol"]));

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn test_participants_and_membership() {
        let mut message = NewMessage::new(&["Alice", "Bob"], "Carol", "hi", "body", None)
            .unwrap()
            .into_message();

        assert_eq!(message.participants(), vec!["alice", "bob", "carol"]);
        assert!(message.is_participant("ALICE"));
        assert!(message.is_participant(" carol "));
        assert!(!message.is_participant("mallory"));

        message.mark_read_by("Alice");
        message.mark_read_by("alice");
        assert_eq!(message.read_by, vec!["alice"]);

        message.mark_deleted_by(" BOB ");
        assert!(message.is_deleted_for("bob"));
        assert!(!message.is_deleted_for("alice"));
    }

    #[test]
    fn test_new_message_rejects_empty_names() {
        let empty: [&str; 0] = [];
        assert_eq!(
            NewMessage::new(&empty, "carol", "s", "b", None),
            Err(ValidationError::EmptyValue("to"))
        );
        assert_eq!(
            NewMessage::new(&["alice", "  "], "carol", "s", "b", None),
            Err(ValidationError::EmptyValue("to"))
        );
        assert_eq!(
            NewMessage::new(&["alice"], "   ", "s", "b", None),
            Err(ValidationError::EmptyValue("from"))
        );
    }

    #[test]
    fn test_validate_for_create_accepts_valid_payload() {
        let payload = json!({
            "to": ["Alice", "BOB", "alice"],
            "from": " Carol ",
            "subject": "Weekly sync",
            "content": "Notes attached.",
            "isResponseTo": null,
        });

        let draft = validate_for_create(&payload).unwrap();
        assert_eq!(draft.to, vec!["alice", "bob"]);
        assert_eq!(draft.sender, "carol");
        assert_eq!(draft.subject, "Weekly sync");
        assert_eq!(draft.parent_id, None);
    }

    #[test]
    fn test_validate_for_create_rejects_unknown_field() {
        let payload = json!({
            "to": ["alice"],
            "from": "bob",
            "subject": "s",
            "content": "c",
            "priority": "high",
        });
        assert_eq!(
            validate_for_create(&payload),
            Err(ValidationError::UnknownField("priority".to_string()))
        );
    }

    #[test]
    fn test_validate_for_create_rejects_missing_fields() {
        let payload = json!({"to": ["alice"], "from": "bob", "subject": "s"});
        assert_eq!(
            validate_for_create(&payload),
            Err(ValidationError::MissingField("content"))
        );
    }

    #[test]
    fn test_validate_for_create_rejects_wrong_types() {
        let payload = json!({"to": "alice", "from": "bob", "subject": "s", "content": "c"});
        assert!(matches!(
            validate_for_create(&payload),
            Err(ValidationError::WrongType { field: "to", .. })
        ));

        let payload = json!({"to": ["alice", 7], "from": "bob", "subject": "s", "content": "c"});
        assert!(matches!(
            validate_for_create(&payload),
            Err(ValidationError::WrongType { field: "to", .. })
        ));

        let payload = json!({"to": ["alice"], "from": "bob", "subject": 1, "content": "c"});
        assert!(matches!(
            validate_for_create(&payload),
            Err(ValidationError::WrongType { field: "subject", .. })
        ));
    }

    #[test]
    fn test_validate_for_create_rejects_bad_parent_reference() {
        let payload = json!({
            "to": ["alice"],
            "from": "bob",
            "subject": "s",
            "content": "c",
            "isResponseTo": "not-a-uuid",
        });
        assert!(matches!(
            validate_for_create(&payload),
            Err(ValidationError::InvalidReference { field: "isResponseTo", .. })
        ));

        let payload = json!({
            "to": ["alice"],
            "from": "bob",
            "subject": "s",
            "content": "c",
            "isResponseTo": 42,
        });
        assert!(matches!(
            validate_for_create(&payload),
            Err(ValidationError::WrongType { field: "isResponseTo", .. })
        ));
    }

    #[test]
    fn test_into_message_assigns_identity_and_time() {
        let message = NewMessage::new(&["alice"], "bob", "s", "b", None)
            .unwrap()
            .into_message();
        assert!(is_valid_message_id(&message.id.to_string()));
        assert_eq!(message.created_at.nanosecond(), 0);
        assert!(message.read_by.is_empty());
        assert!(message.deleted_by.is_empty());
    }
}
