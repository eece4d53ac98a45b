//! SQL DDL for initializing the URL and user tables.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema with:
/// - `urls.long` UNIQUE: content-level dedup, the only conflict source on create
/// - `urls.short` deliberately NOT unique; indexed for lookups only
/// - `urls.deleted` BOOLEAN (stored as INTEGER 0/1), flips 0 -> 1 only
/// - `users.user_id` UNIQUE: the existence check relies on this constraint
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS urls (
    short VARCHAR(5) NOT NULL,
    long TEXT NOT NULL UNIQUE,
    user_id VARCHAR(16) NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_urls_short ON urls(short);

CREATE INDEX IF NOT EXISTS idx_urls_user_id ON urls(user_id);

CREATE TABLE IF NOT EXISTS users (
    user_id VARCHAR(16) NOT NULL UNIQUE
);
"#;
