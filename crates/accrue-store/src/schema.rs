//! SQL schema definitions.

/// Schema for the v1 database: a single ordered key-value table.
///
/// SQLite compares BLOBs with `memcmp`, so `ORDER BY key` and range
/// predicates give the same ordering as [`crate::MemStore`].
pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key BLOB PRIMARY KEY,
    value BLOB NOT NULL
) WITHOUT ROWID;
"#;
