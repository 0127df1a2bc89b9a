//! Service layer: the read views and write operations the API layer
//! consumes. Everything here works through an explicit [`MessageStore`]
//! handle.
//!
//! [`MessageStore`]: crate::store::MessageStore

pub mod compose;
pub mod inbox;
pub mod pagination;
pub mod status;
pub mod threads;

pub use compose::{BROADCAST_NAME, reply_subject, send};
pub use inbox::{audit_for_name, filter_for_viewer, inbox_for_viewer, list_audit, list_inbox};
pub use pagination::{
    PAGE_SIZE_AUDIT, PAGE_SIZE_INBOX, PAGE_SIZE_THREAD, PageInfo, Paginated, paginate,
};
pub use status::{
    VisibilityFlag, delete_for_participant, deleted_status, is_deleted_by, is_read_by, mark_deleted,
    mark_read, read_status, set_visibility_flag,
};
pub use threads::resolve_thread_page;
