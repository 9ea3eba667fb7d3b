//! SQLite-backed store.
//!
//! All records live in one `kv` table keyed by BLOB. Writes made through a
//! [`SqliteTx`] become visible to other connections only when the closure
//! passed to [`SqliteStore::transaction`] returns `Ok`.

use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::config::StoreConfig;
use crate::{migrations, prefix_end, KvPair, KvStore, Result, StoreError, SCHEMA_VERSION};

/// Store over an owned SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

/// Store view over an open SQLite transaction.
#[derive(Debug)]
pub struct SqliteTx<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl SqliteStore {
    /// Open or create the database at `path` with default pragmas.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(&StoreConfig::at(path))
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        Self::open_with_config(&StoreConfig::default())
    }

    /// Open the database described by `config` and run pending migrations.
    pub fn open_with_config(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let conn = match config.db_path() {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Connection::open(&path)?
            }
            None => Connection::open_in_memory()?,
        };
        configure(&conn, config)?;
        migrations::run(&conn)?;
        tracing::debug!(path = %config.path, "store opened");
        Ok(Self { conn })
    }

    /// Open an existing database without write access.
    ///
    /// Nothing is created or migrated, and the journal mode is left as the
    /// writer set it.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Io`] if there is no file at `path`
    /// - [`StoreError::Migration`] if the schema version is not
    ///   [`SCHEMA_VERSION`]
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no store at {}", path.display()),
            )));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let busy_timeout = StoreConfig::default().busy_timeout_ms;
        conn.busy_timeout(Duration::from_millis(u64::from(busy_timeout)))?;

        let version = migrations::current_version(&conn)?;
        if version != SCHEMA_VERSION {
            return Err(StoreError::Migration(format!(
                "store {} is at schema v{version}, expected v{SCHEMA_VERSION}",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), "store opened read-only");
        Ok(Self { conn })
    }

    /// Run `f` inside a SQLite transaction.
    ///
    /// Commits when `f` returns `Ok`; rolls back every write made through the
    /// transaction when it returns `Err`.
    pub fn transaction<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut SqliteTx<'_>) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let tx = self.conn.transaction().map_err(StoreError::from)?;
        let mut scoped = SqliteTx { tx };
        match f(&mut scoped) {
            Ok(value) => {
                scoped.tx.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(err) => {
                scoped.tx.rollback().map_err(StoreError::from)?;
                tracing::debug!("store transaction rolled back");
                Err(err)
            }
        }
    }
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = {};
         PRAGMA synchronous = {};
         PRAGMA cache_size = -{};",
        config.busy_timeout_ms,
        config.synchronous,
        config.cache_size_kib,
    ))?;
    Ok(())
}

fn get_in(conn: &Connection, key: &[u8]) -> Result<Option<Vec<u8>>> {
    let value = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

fn set_in(conn: &Connection, key: &[u8], value: &[u8]) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

fn delete_in(conn: &Connection, key: &[u8]) -> Result<()> {
    conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
    Ok(())
}

fn scan_in(conn: &Connection, prefix: &[u8]) -> Result<Vec<KvPair>> {
    let pairs = match prefix_end(prefix) {
        Some(end) => {
            let mut stmt = conn.prepare_cached(
                "SELECT key, value FROM kv WHERE key >= ?1 AND key < ?2 ORDER BY key",
            )?;
            let rows = stmt.query_map(params![prefix, end], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<rusqlite::Result<Vec<KvPair>>>()?
        }
        None => {
            let mut stmt =
                conn.prepare_cached("SELECT key, value FROM kv WHERE key >= ?1 ORDER BY key")?;
            let rows = stmt.query_map(params![prefix], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<rusqlite::Result<Vec<KvPair>>>()?
        }
    };
    Ok(pairs)
}

impl KvStore for SqliteStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        get_in(&self.conn, key)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        set_in(&self.conn, key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        delete_in(&self.conn, key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>> {
        scan_in(&self.conn, prefix)
    }
}

impl KvStore for SqliteTx<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        get_in(&self.tx, key)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        set_in(&self.tx, key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        delete_in(&self.tx, key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>> {
        scan_in(&self.tx, prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> SqliteStore {
        SqliteStore::open_memory().expect("open test store")
    }

    /// Fresh per-test directory under the system temp dir.
    fn temp_dir(name: &str) -> std::path::PathBuf {
        let pid = std::process::id();
        let dir = std::env::temp_dir().join(format!("accrue-store-{pid}-{name}"));
        if dir.exists() {
            std::fs::remove_dir_all(&dir).expect("remove stale dir");
        }
        dir
    }

    #[test]
    fn test_set_and_get() {
        let mut store = test_store();
        store.set(b"accum/acc/pool-1", b"record").expect("set");
        assert_eq!(
            store.get(b"accum/acc/pool-1").expect("get"),
            Some(b"record".to_vec())
        );
    }

    #[test]
    fn test_get_missing() {
        let store = test_store();
        assert_eq!(store.get(b"nonexistent").expect("get"), None);
    }

    #[test]
    fn test_delete() {
        let mut store = test_store();
        store.set(b"k", b"v").expect("set");
        store.delete(b"k").expect("delete");
        assert!(!store.has(b"k").expect("has"));
    }

    #[test]
    fn test_scan_prefix_ordered() {
        let mut store = test_store();
        store.set(b"p/2", b"b").expect("set");
        store.set(b"p/1", b"a").expect("set");
        store.set(b"q/1", b"c").expect("set");

        let pairs = store.scan_prefix(b"p/").expect("scan");
        assert_eq!(
            pairs,
            vec![
                (b"p/1".to_vec(), b"a".to_vec()),
                (b"p/2".to_vec(), b"b".to_vec()),
            ]
        );
    }

    #[test]
    fn test_scan_prefix_high_bytes() {
        let mut store = test_store();
        store.set(&[0xFF, 0x01], b"a").expect("set");
        store.set(&[0xFE], b"b").expect("set");
        let pairs = store.scan_prefix(&[0xFF]).expect("scan");
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_transaction_commits() {
        let mut store = test_store();
        store
            .transaction(|tx| -> Result<()> {
                tx.set(b"k", b"v")?;
                assert_eq!(tx.get(b"k")?, Some(b"v".to_vec()));
                Ok(())
            })
            .expect("commit");
        assert_eq!(store.get(b"k").expect("get"), Some(b"v".to_vec()));
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut store = test_store();
        store.set(b"k", b"before").expect("set");

        let result = store.transaction(|tx| -> Result<()> {
            tx.set(b"k", b"after")?;
            tx.set(b"other", b"x")?;
            Err(StoreError::Migration("abort".into()))
        });

        assert!(result.is_err());
        assert_eq!(store.get(b"k").expect("get"), Some(b"before".to_vec()));
        assert_eq!(store.get(b"other").expect("get"), None);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = temp_dir("persists");
        let path = dir.join("ledger.db");
        {
            let mut store = SqliteStore::open(&path).expect("open");
            store.set(b"k", b"v").expect("set");
        }
        let store = SqliteStore::open(&path).expect("reopen");
        assert_eq!(store.get(b"k").expect("get"), Some(b"v".to_vec()));
        drop(store);
        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[test]
    fn test_read_only_missing_file() {
        let dir = temp_dir("read-only-missing");
        let path = dir.join("ledger.db");

        let err = SqliteStore::open_read_only(&path).expect_err("missing file");
        assert!(matches!(err, StoreError::Io(_)));
        assert!(!path.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn test_read_only_unmigrated_file() {
        let dir = temp_dir("read-only-unmigrated");
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("ledger.db");
        {
            let conn = Connection::open(&path).expect("create");
            conn.execute_batch("CREATE TABLE other (x INTEGER);")
                .expect("table");
        }

        let err = SqliteStore::open_read_only(&path).expect_err("unmigrated");
        assert!(matches!(err, StoreError::Migration(_)));
        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[test]
    fn test_read_only_reads_but_never_writes() {
        let dir = temp_dir("read-only-reads");
        let path = dir.join("ledger.db");
        {
            let mut store = SqliteStore::open(&path).expect("open");
            store.set(b"k", b"v").expect("set");
        }

        let mut store = SqliteStore::open_read_only(&path).expect("open read-only");
        assert_eq!(store.get(b"k").expect("get"), Some(b"v".to_vec()));
        assert!(store.set(b"k", b"w").is_err());
        assert_eq!(store.get(b"k").expect("get"), Some(b"v".to_vec()));
        drop(store);
        std::fs::remove_dir_all(&dir).expect("cleanup");
    }
}
