use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct UrlRecord {
    pub short: String,
    pub long: String,
    #[sqlx(rename = "user_id")]
    pub owner: String,
    pub deleted: bool,
}

/// A bulk soft-delete request: every short code is scoped to `owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteBatch {
    pub owner: String,
    pub shorts: Vec<String>,
}
