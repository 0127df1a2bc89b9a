//! Startup admission pipeline.
//!
//! Transforms the on-disk dataset, whatever its state, into a clean
//! in-memory index plus a quarantine set. Runs once per process lifetime
//! before any request is served; re-running it against its own output is a
//! no-op.
//!
//! Repair is bounded to representational defects (whitespace, casing,
//! container shape, missing optional sets). Anything that would require
//! guessing intent, like a missing required field or a malformed
//! identifier or timestamp, quarantines the record instead. Identifier
//! collisions quarantine every copy: there is no principled way to pick a
//! winner.

use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    ALLOWED_RECORD_FIELDS, Message, QuarantineEntry, is_valid_message_id, normalize_name,
    parse_timestamp,
};
use crate::store::files;

pub(crate) const DATA_VERSION: u64 = 1;

/// Result of one pipeline run: the admitted index plus the full quarantine
/// set (pre-existing entries and new ones).
pub(crate) struct AdmissionOutcome {
    pub messages: HashMap<Uuid, Message>,
    pub quarantined: Vec<QuarantineEntry>,
}

enum VersionCheck {
    Current,
    CurrentTextual,
    Unsupported,
}

fn classify_version(value: &Value) -> VersionCheck {
    match value {
        Value::Number(number) if number.as_f64() == Some(DATA_VERSION as f64) => {
            VersionCheck::Current
        }
        Value::String(text) if text == "1" => VersionCheck::CurrentTextual,
        _ => VersionCheck::Unsupported,
    }
}

pub(crate) fn empty_messages_doc() -> Value {
    json!({"version": DATA_VERSION, "messages": []})
}

pub(crate) fn empty_quarantine_doc() -> Value {
    json!({"version": DATA_VERSION, "quarantined": []})
}

/// Run the pipeline and persist both cleaned files before returning.
pub(crate) fn run(messages_path: &Path, quarantine_path: &Path) -> StoreResult<AdmissionOutcome> {
    log::info!("running admission over {}", messages_path.display());

    let records = load_main_records(messages_path)?;
    let mut quarantined = load_quarantine(quarantine_path)?;

    let mut messages: HashMap<Uuid, Message> = HashMap::new();

    // Group by claimed identifier first: a collision poisons the index
    // regardless of content validity, so it is checked before any
    // field-level repair.
    let mut id_counts: HashMap<String, usize> = HashMap::new();
    for record in &records {
        if let Some(key) = claimed_id_key(record) {
            *id_counts.entry(key).or_insert(0) += 1;
        }
    }

    for record in records {
        if let Some(key) = claimed_id_key(&record) {
            if id_counts.get(&key).copied().unwrap_or(0) > 1 {
                let reason = format!("duplicate id: {}", display_id(&record));
                log::warn!("quarantined record: {reason}");
                quarantined.push(QuarantineEntry::new(record, reason));
                continue;
            }
        }

        match repair_record(&record) {
            Ok(fixed) => match serde_json::from_value::<Message>(fixed) {
                Ok(message) => {
                    messages.insert(message.id, message);
                }
                Err(err) => {
                    let reason = format!("failed to construct message: {err}");
                    log::warn!("quarantined record: {reason}");
                    quarantined.push(QuarantineEntry::new(record, reason));
                }
            },
            Err(reasons) => {
                let reason = reasons.join("; ");
                log::warn!("quarantined record: {reason}");
                quarantined.push(QuarantineEntry::new(record, reason));
            }
        }
    }

    persist(messages_path, quarantine_path, &messages, &quarantined)?;

    log::info!(
        "admission complete: {} messages loaded, {} quarantined",
        messages.len(),
        quarantined.len()
    );

    Ok(AdmissionOutcome {
        messages,
        quarantined,
    })
}

/// Persist the cleaned dataset and the quarantine set.
pub(crate) fn persist(
    messages_path: &Path,
    quarantine_path: &Path,
    messages: &HashMap<Uuid, Message>,
    quarantined: &[QuarantineEntry],
) -> StoreResult<()> {
    files::write_json(messages_path, &messages_doc(messages)?)?;
    files::write_json(quarantine_path, &quarantine_doc(quarantined)?)?;
    Ok(())
}

pub(crate) fn messages_doc(messages: &HashMap<Uuid, Message>) -> StoreResult<Value> {
    // Deterministic file order regardless of map iteration order.
    let mut ordered: Vec<&Message> = messages.values().collect();
    ordered.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
    let serialized = ordered
        .into_iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()?;
    Ok(json!({"version": DATA_VERSION, "messages": serialized}))
}

pub(crate) fn quarantine_doc(quarantined: &[QuarantineEntry]) -> StoreResult<Value> {
    let serialized = quarantined
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()?;
    Ok(json!({"version": DATA_VERSION, "quarantined": serialized}))
}

/// Load the raw candidate records from the main dataset.
///
/// Structural defects here are fatal; the single exception is an
/// unsupported version marker, where no per-record interpretation of the
/// foreign schema is reasonable, so the file is backed up wholesale and a
/// fresh empty dataset takes its place.
fn load_main_records(path: &Path) -> StoreResult<Vec<Value>> {
    let Some(doc) = files::read_json(path)? else {
        files::write_json(path, &empty_messages_doc())?;
        log::info!("created new dataset file: {}", path.display());
        return Ok(Vec::new());
    };

    let Some(object) = doc.as_object() else {
        return Err(StoreError::Corrupt(format!(
            "{}: expected a JSON object at top level",
            path.display()
        )));
    };

    let Some(version) = object.get("version") else {
        return Err(StoreError::Corrupt(format!(
            "{}: missing 'version' field",
            path.display()
        )));
    };

    match classify_version(version) {
        VersionCheck::Current => {}
        VersionCheck::CurrentTextual => {
            log::debug!("converted dataset version from string to integer");
        }
        VersionCheck::Unsupported => {
            log::warn!("unsupported version in {}: {version}", path.display());
            files::backup_file(path, "old")?;
            files::write_json(path, &empty_messages_doc())?;
            return Ok(Vec::new());
        }
    }

    match object.get("messages") {
        None => {
            log::debug!("added missing 'messages' key with default empty array");
            Ok(Vec::new())
        }
        Some(Value::Array(records)) => Ok(records.clone()),
        Some(_) => Err(StoreError::Corrupt(format!(
            "{}: 'messages' field is not an array",
            path.display()
        ))),
    }
}

/// Load existing quarantine entries. Quarantine is diagnostic, not
/// authoritative: any defect backs the file up and starts a fresh empty
/// set rather than failing startup.
fn load_quarantine(path: &Path) -> StoreResult<Vec<QuarantineEntry>> {
    let doc = match files::read_json(path) {
        Ok(doc) => doc,
        Err(err) => {
            log::warn!("invalid quarantine file {}: {err}", path.display());
            files::backup_file(path, "bak")?;
            files::write_json(path, &empty_quarantine_doc())?;
            return Ok(Vec::new());
        }
    };

    let Some(doc) = doc else {
        files::write_json(path, &empty_quarantine_doc())?;
        log::info!("created new quarantine file: {}", path.display());
        return Ok(Vec::new());
    };

    match parse_quarantine_doc(&doc) {
        Ok(entries) => Ok(entries),
        Err(reason) => {
            log::warn!("invalid quarantine file {}: {reason}", path.display());
            files::backup_file(path, "bak")?;
            files::write_json(path, &empty_quarantine_doc())?;
            Ok(Vec::new())
        }
    }
}

fn parse_quarantine_doc(doc: &Value) -> Result<Vec<QuarantineEntry>, String> {
    let object = doc
        .as_object()
        .ok_or_else(|| "expected a JSON object at top level".to_string())?;
    let version = object
        .get("version")
        .ok_or_else(|| "missing 'version' field".to_string())?;
    match classify_version(version) {
        VersionCheck::Current | VersionCheck::CurrentTextual => {}
        VersionCheck::Unsupported => return Err(format!("unsupported version: {version}")),
    }
    let entries = object
        .get("quarantined")
        .ok_or_else(|| "missing 'quarantined' field".to_string())?;
    serde_json::from_value(entries.clone()).map_err(|err| format!("malformed entries: {err}"))
}

/// Key used for duplicate grouping; `None` when the record carries nothing
/// that could collide.
fn claimed_id_key(record: &Value) -> Option<String> {
    match record.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) if id.is_empty() => None,
        Some(Value::String(id)) => Some(format!("\"{id}\"")),
        Some(other) => Some(other.to_string()),
    }
}

fn display_id(record: &Value) -> String {
    match record.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Lenient per-record validation with bounded auto-fix.
///
/// Returns the repaired record ready for typed construction, or the full
/// list of unrecoverable defects.
fn repair_record(record: &Value) -> Result<Value, Vec<String>> {
    let Some(object) = record.as_object() else {
        return Err(vec!["record must be an object".to_string()]);
    };

    let mut errors: Vec<String> = Vec::new();
    let mut fixed: Map<String, Value> = object.clone();

    for field in ["id", "to", "from", "subject", "content", "timestamp"] {
        if !object.contains_key(field) {
            errors.push(format!("missing required field: {field}"));
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    match object.get("id") {
        Some(Value::String(id)) => {
            if !is_valid_message_id(id) {
                errors.push(format!("invalid identifier format for 'id': {id}"));
            }
        }
        _ => errors.push("field 'id' must be a string".to_string()),
    }

    match object.get("to") {
        Some(Value::Array(entries)) => {
            let cleaned = clean_name_set(entries);
            if cleaned.is_empty() {
                errors.push("field 'to' must have at least one valid recipient".to_string());
            }
            fixed.insert("to".to_string(), json!(cleaned));
        }
        _ => errors.push("field 'to' must be an array".to_string()),
    }

    match object.get("from") {
        Some(Value::String(sender)) => {
            let normalized = normalize_name(sender);
            if normalized.is_empty() {
                errors.push("field 'from' cannot be empty".to_string());
            }
            fixed.insert("from".to_string(), json!(normalized));
        }
        _ => errors.push("field 'from' must be a string".to_string()),
    }

    match object.get("subject") {
        Some(Value::String(subject)) => {
            fixed.insert("subject".to_string(), json!(subject.trim()));
        }
        _ => errors.push("field 'subject' must be a string".to_string()),
    }

    match object.get("content") {
        Some(Value::String(content)) => {
            fixed.insert("content".to_string(), json!(content.trim()));
        }
        _ => errors.push("field 'content' must be a string".to_string()),
    }

    match object.get("timestamp") {
        Some(Value::String(timestamp)) => {
            if parse_timestamp(timestamp).is_none() {
                errors.push(format!("invalid timestamp format: {timestamp}"));
            }
        }
        Some(other) => errors.push(format!("invalid timestamp format: {other}")),
        None => {}
    }

    match object.get("isResponseTo") {
        None | Some(Value::Null) => {}
        Some(Value::String(parent)) => {
            if !is_valid_message_id(parent) {
                errors.push(format!(
                    "invalid identifier format for 'isResponseTo': {parent}"
                ));
            }
        }
        Some(_) => errors.push("field 'isResponseTo' must be a string or null".to_string()),
    }

    for field in ["readBy", "deletedBy"] {
        match object.get(field) {
            None => {
                fixed.insert(field.to_string(), json!([]));
                log::debug!("record {}: added missing '{field}' field", display_id(record));
            }
            Some(Value::Array(entries)) => {
                fixed.insert(field.to_string(), json!(clean_name_set(entries)));
            }
            Some(_) => errors.push(format!("field '{field}' must be an array")),
        }
    }

    let extra: Vec<String> = fixed
        .keys()
        .filter(|key| !ALLOWED_RECORD_FIELDS.contains(&key.as_str()))
        .cloned()
        .collect();
    for field in extra {
        fixed.remove(&field);
        log::debug!("record {}: stripped extra field '{field}'", display_id(record));
    }

    if errors.is_empty() {
        Ok(Value::Object(fixed))
    } else {
        Err(errors)
    }
}

/// Keep string entries only, normalized, non-empty, first occurrence wins.
fn clean_name_set(entries: &[Value]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for entry in entries {
        if let Value::String(name) = entry {
            let normalized = normalize_name(name);
            if !normalized.is_empty() && !cleaned.contains(&normalized) {
                cleaned.push(normalized);
            }
        }
    }
    cleaned
}
