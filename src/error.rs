use thiserror::Error;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the store engine.
///
/// Per-record admission defects never appear here; they are recorded as
/// quarantine entries instead. Missing lookups are `Option`, not errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The main dataset is unparseable or structurally malformed. The
    /// surrounding process must not start.
    #[error("data file is corrupt: {0}")]
    Corrupt(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("page argument must be a positive integer, got {0}")]
    InvalidPage(i64),
    #[error("page {page} exceeds total pages ({total_pages})")]
    PageOutOfRange { page: i64, total_pages: i64 },
    #[error("parent message with id '{0}' not found")]
    ParentNotFound(Uuid),
    #[error("no known agents to broadcast to")]
    BroadcastEmpty,
    #[error("user '{viewer}' is not a participant in message '{id}'")]
    NotParticipant { viewer: String, id: Uuid },
    #[error("agent name '{0}' is already taken")]
    NameTaken(String),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Defects found while strictly validating a create payload.
///
/// One variant per defect class so callers can map them to their own
/// error codes without string matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("field '{0}' cannot be empty or whitespace")]
    EmptyValue(&'static str),
    #[error("invalid identifier for field '{field}': '{value}'")]
    InvalidReference {
        field: &'static str,
        value: String,
    },
    #[error("unknown field in request: '{0}'")]
    UnknownField(String),
}
