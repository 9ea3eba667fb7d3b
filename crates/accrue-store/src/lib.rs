//! # accrue-store
//!
//! Key-value persistence for accumulator and position records.
//!
//! Everything above this crate talks to storage through the [`KvStore`]
//! trait: exact-key reads, unconditional upserts, deletes, and an ordered
//! prefix scan used only for debugging and migrations.
//!
//! ## Backends
//!
//! - [`sqlite::SqliteStore`]: single SQLite database, one `kv` table.
//!   WAL mode, schema version in `PRAGMA user_version`.
//! - [`memory::MemStore`]: ordered in-memory map for tests and simulation.
//!
//! Records are CBOR-encoded through [`codec`].

pub mod codec;
pub mod config;
pub mod memory;
pub mod migrations;
pub mod schema;
pub mod sqlite;

pub use config::StoreConfig;
pub use memory::MemStore;
pub use sqlite::{SqliteStore, SqliteTx};

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Storage error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A key-value pair returned by a prefix scan.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Byte-keyed storage with atomic single-key operations.
///
/// Within one store handle, reads observe every earlier write.
pub trait KvStore {
    /// Fetch the value at `key`. A missing key is `Ok(None)`, not an error.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite the value at `key`.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove `key`. Removing a missing key is a no-op.
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// All pairs whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>>;

    /// Whether `key` is present.
    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<T: KvStore + ?Sized> KvStore for &mut T {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        (**self).delete(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>> {
        (**self).scan_prefix(prefix)
    }
}

/// Smallest key strictly greater than every key starting with `prefix`.
///
/// Returns `None` when no such bound exists (empty prefix or all `0xFF`).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
