//! Structured logging schema and field name constants for notekeeper.
//!
//! Events use literal field names (`subsystem`, `component`, `op`,
//! `identity_id`, `note_id`, `tag_count`, `duration_ms`, ...). The constants
//! below name the fields that the HTTP layer declares empty on the
//! per-request span and fills in later with [`tracing::Span::record`]; the
//! span declaration must use the same names.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, race resolved, suspicious input |
//! | INFO  | Lifecycle events, completed mutations, logins |
//! | DEBUG | Decision points, intermediate values |
//! | TRACE | Per-item iteration (individual tags) |
//!
//! Secrets (passwords, hashes, session tokens) are never logged.

/// Correlation ID propagated from the `x-request-id` header.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Identity UUID the request acts on behalf of.
pub const IDENTITY_ID: &str = "identity_id";

/// Note UUID targeted by the request.
pub const NOTE_ID: &str = "note_id";
