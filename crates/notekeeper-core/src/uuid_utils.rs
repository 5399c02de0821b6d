//! UUID v7 utilities for time-ordered identifiers.
//!
//! Identities, notes and tags are keyed by UUIDv7, which embeds a
//! millisecond timestamp in the first 48 bits, so ids double as a
//! tie-breaker after `created_at_utc` when listing notes.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// # Example
///
/// ```
/// use notekeeper_core::uuid_utils::new_v7;
///
/// let id = new_v7();
/// assert_eq!(id.get_version_num(), 7);
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}
