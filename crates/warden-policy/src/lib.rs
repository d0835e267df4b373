//! Policy model and storage for wardend
//!
//! Provides:
//! - `PolicyEntry` / `PolicyTable`: the per-app blocked/time-limit table
//! - `PolicyCache`: the engine's in-memory mirror, wholesale-replaced on push
//! - `PolicyStore`: the store interface (one-shot fetch, push subscription,
//!   blocked-flag write-back)
//! - `SqlitePolicyStore`: local SQLite-backed store
//! - `MemoryPolicyStore`: in-process store for tests

mod cache;
mod entry;
mod memory;
mod sqlite;
mod traits;

pub use cache::*;
pub use entry::*;
pub use memory::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Policy store errors
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for PolicyError {
    fn from(e: rusqlite::Error) -> Self {
        PolicyError::Database(e.to_string())
    }
}

pub type PolicyResult<T> = Result<T, PolicyError>;
