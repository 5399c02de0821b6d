//! Capability services called by the HTTP handlers.
//!
//! Services own the conversion from store and auth errors into
//! [`ServiceError`](crate::error::ServiceError).

pub mod accounts;
pub mod notebook;

pub use accounts::AccountService;
pub use notebook::NotebookService;
