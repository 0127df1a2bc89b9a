//! mailstore: a single-node, file-persisted message store.
//!
//! Producers submit immutable messages; consumers retrieve per-recipient
//! views, reconstruct reply chains into threads, and mark per-viewer
//! read/delete state. The store is admitted from disk once at startup
//! (repairing what is representational, quarantining what is not) and
//! serves every read from an in-memory index that writes through to the
//! backing file synchronously.
//!
//! ```no_run
//! use mailstore::{MessageStore, StoreConfig};
//!
//! let store = MessageStore::new(StoreConfig::from_env());
//! store.admit().expect("dataset must admit before serving");
//! ```

pub mod error;
pub mod models;
pub mod service;
pub mod store;
pub mod threading;

pub use error::{StoreError, StoreResult, ValidationError};
pub use models::{Message, NewMessage, QuarantineEntry, validate_for_create};
pub use store::{MessageStore, StoreConfig};
pub use threading::{Thread, resolve_thread};

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

/// Initialize logging for the host process. Safe to call more than once.
pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    });
}
