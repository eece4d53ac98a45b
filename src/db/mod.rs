//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: the URL and user stores over a shared pool

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{DeleteBatch, UrlRecord};
pub use schema::SQLITE_INIT;
pub use sqlite::{Repositories, SqlitePool, UrlStorage, UserStorage};
