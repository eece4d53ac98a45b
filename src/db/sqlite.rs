use crate::db::models::{DeleteBatch, UrlRecord};
use crate::db::schema::SQLITE_INIT;
use crate::error::{ShortenerError, StorageError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Error as SqlxError, Pool, QueryBuilder, Sqlite};
use std::collections::BTreeMap;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub type SqlitePool = Pool<Sqlite>;

/// Bound a single storage call. Timeouts become `StorageError::Timeout`,
/// the inner sqlx result is handed back untouched so callers can inspect it.
async fn bounded<T, F>(limit: Duration, fut: F) -> Result<Result<T, SqlxError>, ShortenerError>
where
    F: Future<Output = Result<T, SqlxError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| StorageError::Timeout(limit).into())
}

fn is_unique_violation(err: &SqlxError) -> bool {
    matches!(err, SqlxError::Database(db_err) if db_err.is_unique_violation())
}

/// Open a pool for `database_url`, creating the file if missing.
pub async fn connect(database_url: &str) -> Result<SqlitePool, ShortenerError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
    Ok(pool)
}

/// Single-connection in-memory pool. The database lives as long as the connection.
pub async fn connect_in_memory() -> Result<SqlitePool, ShortenerError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}

/// Initialize the schema by executing the bundled DDL.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), ShortenerError> {
    // sqlx::query runs one statement at a time
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}

/// Owns the `urls` table.
#[derive(Clone)]
pub struct UrlStorage {
    pool: SqlitePool,
    timeout: Duration,
}

impl UrlStorage {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Insert a live mapping. A second insert of the same `long`, whoever
    /// owns it and whether or not it is deleted, fails with `Conflict`.
    pub async fn create(&self, short: &str, long: &str, owner: &str) -> Result<(), ShortenerError> {
        let res = bounded(
            self.timeout,
            sqlx::query("INSERT INTO urls (short, long, user_id, deleted) VALUES (?, ?, ?, 0)")
                .bind(short)
                .bind(long)
                .bind(owner)
                .execute(&self.pool),
        )
        .await?;

        match res {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                debug!(short, long, "long url already stored");
                Err(ShortenerError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Short -> long. Deleted rows report `Gone`, missing rows `NotFound`.
    /// With colliding short codes the earliest row wins.
    pub async fn resolve(&self, short: &str) -> Result<String, ShortenerError> {
        let record = self.get(short).await?.ok_or(ShortenerError::NotFound)?;
        if record.deleted {
            return Err(ShortenerError::Gone);
        }
        Ok(record.long)
    }

    pub async fn get(&self, short: &str) -> Result<Option<UrlRecord>, ShortenerError> {
        let row = bounded(
            self.timeout,
            sqlx::query_as::<_, UrlRecord>(
                r#"SELECT short, long, user_id, deleted
                   FROM urls WHERE short = ? ORDER BY rowid LIMIT 1"#,
            )
            .bind(short)
            .fetch_optional(&self.pool),
        )
        .await??;
        Ok(row)
    }

    /// Reverse lookup, used to recover from `Conflict`.
    pub async fn resolve_short_for(&self, long: &str) -> Result<String, ShortenerError> {
        let row: Option<(String,)> = bounded(
            self.timeout,
            sqlx::query_as("SELECT short FROM urls WHERE long = ?")
                .bind(long)
                .fetch_optional(&self.pool),
        )
        .await??;
        row.map(|r| r.0).ok_or(ShortenerError::NotFound)
    }

    /// Every mapping created by `owner`, deleted ones included.
    pub async fn list_by_owner(&self, owner: &str) -> Result<BTreeMap<String, String>, ShortenerError> {
        let rows: Vec<(String, String)> = bounded(
            self.timeout,
            sqlx::query_as("SELECT short, long FROM urls WHERE user_id = ? ORDER BY rowid")
                .bind(owner)
                .fetch_all(&self.pool),
        )
        .await??;
        Ok(rows.into_iter().collect())
    }

    /// Flag every `(owner, short)` pair deleted in one UPDATE.
    /// Rows of other owners are never touched. Returns the number of rows flipped.
    pub async fn batch_soft_delete(&self, batch: &DeleteBatch) -> Result<u64, ShortenerError> {
        if batch.shorts.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE urls SET deleted = 1 WHERE user_id = ");
        qb.push_bind(batch.owner.clone());
        qb.push(" AND deleted = 0 AND short IN (");
        let mut list = qb.separated(", ");
        for short in &batch.shorts {
            list.push_bind(short.clone());
        }
        list.push_unseparated(")");

        let done = bounded(self.timeout, qb.build().execute(&self.pool)).await??;
        Ok(done.rows_affected())
    }
}

/// Owns the `users` table.
#[derive(Clone)]
pub struct UserStorage {
    pool: SqlitePool,
    timeout: Duration,
}

impl UserStorage {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Plain insert; a duplicate id is a storage error here.
    pub async fn insert(&self, id: &str) -> Result<(), ShortenerError> {
        bounded(
            self.timeout,
            sqlx::query("INSERT INTO users (user_id) VALUES (?)")
                .bind(id)
                .execute(&self.pool),
        )
        .await??;
        Ok(())
    }

    /// Existence check implemented as an insert attempt.
    ///
    /// Unique violation means the id was already there (`true`). A clean
    /// insert means it was not, but it is now (`false`). The side effect is
    /// intentional and callers rely on it.
    pub async fn check_exists(&self, id: &str) -> Result<bool, ShortenerError> {
        let res = bounded(
            self.timeout,
            sqlx::query("INSERT INTO users (user_id) VALUES (?)")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;

        match res {
            Ok(_) => {
                info!(user_id = id, "unknown user id recorded by existence check");
                Ok(false)
            }
            Err(e) if is_unique_violation(&e) => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

/// Both tables over one shared pool.
#[derive(Clone)]
pub struct Repositories {
    pub urls: UrlStorage,
    pub users: UserStorage,
    pool: SqlitePool,
    timeout: Duration,
}

impl Repositories {
    /// Initialize the schema and hand out per-table stores.
    pub async fn new(pool: SqlitePool, timeout: Duration) -> Result<Self, ShortenerError> {
        init_schema(&pool).await?;
        Ok(Self {
            urls: UrlStorage::new(pool.clone(), timeout),
            users: UserStorage::new(pool.clone(), timeout),
            pool,
            timeout,
        })
    }

    pub async fn in_memory(timeout: Duration) -> Result<Self, ShortenerError> {
        Self::new(connect_in_memory().await?, timeout).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Health check for the shared pool.
    pub async fn ping(&self) -> Result<(), ShortenerError> {
        bounded(self.timeout, sqlx::query("SELECT 1").execute(&self.pool)).await??;
        Ok(())
    }
}
