//! Key-value store capability
//!
//! The widget persists two small values per site: its visual state and the
//! session id. Both go through [`StateStore`], which keeps the lifecycle and
//! session logic independent of where values actually live:
//! - `memory` - process-local map, the default and the test double
//! - `json_file` - JSON object on disk, loaded once and rewritten on set
//! - `sqlite` - single key/value table in an SQLite database
//!
//! Reads and writes are synchronous and last-write-wins.

pub mod json_file;
pub mod memory;
pub mod sqlite;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::Result;

/// Synchronous string key-value store
pub trait StateStore: Send + Sync {
    /// Read a value, `Ok(None)` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;
}
