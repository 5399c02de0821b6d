//! # notekeeper-db
//!
//! PostgreSQL database layer for notekeeper.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for identities, notes, tags and sessions
//! - Transactional note writes (note row and tag links commit together)
//! - Embedded schema migrations
//!
//! ## Example
//!
//! ```rust,ignore
//! use notekeeper_db::{CreateNoteRequest, Database, NoteRepository, TagSet};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/notekeeper").await?;
//!     db.migrate().await?;
//!
//!     let note_id = db.notes.insert(owner_id, CreateNoteRequest {
//!         title: "Shopping".to_string(),
//!         body: "milk, eggs".to_string(),
//!         tags: TagSet::parse("food, errand")?,
//!     }).await?;
//!
//!     println!("Created note: {}", note_id);
//!     Ok(())
//! }
//! ```
pub mod identities;
pub mod notes;
pub mod pool;
pub mod sessions;
pub mod tags;

// Test fixtures for integration tests
// Note: Compiled whenever migrations are so integration tests (in tests/) can use it
#[cfg(feature = "migrations")]
pub mod test_fixtures;

// Re-export core types
pub use notekeeper_core::*;

pub use identities::PgIdentityRepository;
pub use notes::PgNoteRepository;
pub use pool::{
    create_pool, create_pool_with_config, create_pool_with_options, log_pool_metrics, PoolConfig,
};
pub use sessions::PgSessionRepository;
pub use tags::PgTagRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Identity repository (unique by email).
    pub identities: PgIdentityRepository,
    /// Note repository; owns tag linking for note writes.
    pub notes: PgNoteRepository,
    /// Read access to the global tag vocabulary.
    pub tags: PgTagRepository,
    /// Server-side session store.
    pub sessions: PgSessionRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            identities: PgIdentityRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            sessions: PgSessionRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
