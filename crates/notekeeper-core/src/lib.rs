//! # notekeeper-core
//!
//! Core types, traits, and abstractions for notekeeper.
//!
//! This crate provides the identity, note and tag data model, the repository
//! traits every store backend implements, and the tag normalization rules
//! shared by the store and service layers.

pub mod error;
pub mod logging;
#[cfg(feature = "mock")]
pub mod mock;
pub mod models;
pub mod tags;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use tags::{normalize_tag, TagSet, MAX_TAG_LENGTH};
pub use traits::*;
pub use uuid_utils::new_v7;
