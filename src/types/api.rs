use serde::{Deserialize, Serialize};

/// Body of `POST /api/shorten`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub result: String,
}

/// One entry of `POST /api/shorten/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequestItem {
    pub correlation_id: String,
    pub original_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponseItem {
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Entry of `GET /api/user/urls`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUrl {
    pub short_url: String,
    pub original_url: String,
}
