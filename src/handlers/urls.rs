use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, warn};

use crate::middleware::CallerId;
use crate::router::ShortenerState;
use crate::types::api::{BatchRequestItem, BatchResponseItem, ShortenRequest, ShortenResponse, UserUrl};
use crate::ShortenerError;

fn short_url(state: &ShortenerState, headers: &HeaderMap, short: &str) -> String {
    match state.base_url.as_deref() {
        Some(base) => format!("{base}/{short}"),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("localhost");
            format!("http://{host}/{short}")
        }
    }
}

fn created_or_conflict(created: bool) -> StatusCode {
    if created {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    }
}

/// POST / : plain-text long URL in, plain-text short URL out.
pub async fn shorten_text(
    State(state): State<ShortenerState>,
    CallerId(user_id): CallerId,
    headers: HeaderMap,
    body: String,
) -> Result<Response, ShortenerError> {
    let shortened = state.urls.shorten(&user_id, body.trim()).await?;
    let status = created_or_conflict(shortened.created);
    Ok((
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        short_url(&state, &headers, &shortened.short),
    )
        .into_response())
}

/// POST /api/shorten
pub async fn shorten_json(
    State(state): State<ShortenerState>,
    CallerId(user_id): CallerId,
    headers: HeaderMap,
    Json(req): Json<ShortenRequest>,
) -> Result<Response, ShortenerError> {
    let shortened = state.urls.shorten(&user_id, &req.url).await?;
    let status = created_or_conflict(shortened.created);
    let body = ShortenResponse {
        result: short_url(&state, &headers, &shortened.short),
    };
    Ok((status, Json(body)).into_response())
}

/// POST /api/shorten/batch
pub async fn shorten_batch(
    State(state): State<ShortenerState>,
    CallerId(user_id): CallerId,
    headers: HeaderMap,
    Json(items): Json<Vec<BatchRequestItem>>,
) -> Response {
    let outcomes = state.urls.shorten_batch(&user_id, items).await;
    let body: Vec<BatchResponseItem> = outcomes
        .into_iter()
        .map(|o| match o.result {
            Ok(s) => BatchResponseItem {
                correlation_id: o.correlation_id,
                short_url: Some(short_url(&state, &headers, &s.short)),
                error: None,
            },
            Err(e) => BatchResponseItem {
                correlation_id: o.correlation_id,
                short_url: None,
                error: Some(e.code().to_string()),
            },
        })
        .collect();
    (StatusCode::CREATED, Json(body)).into_response()
}

/// GET /{id} : 307 to the long URL, 404 if unknown, 410 if deleted.
pub async fn redirect(
    State(state): State<ShortenerState>,
    Path(id): Path<String>,
) -> Result<Redirect, ShortenerError> {
    let long = state.urls.storage().resolve(&id).await?;
    Ok(Redirect::temporary(&long))
}

/// GET /api/user/urls
pub async fn list_user_urls(
    State(state): State<ShortenerState>,
    CallerId(user_id): CallerId,
    headers: HeaderMap,
) -> Result<Response, ShortenerError> {
    let owned = state.urls.storage().list_by_owner(&user_id).await?;
    if owned.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let body: Vec<UserUrl> = owned
        .into_iter()
        .map(|(short, long)| UserUrl {
            short_url: short_url(&state, &headers, &short),
            original_url: long,
        })
        .collect();
    Ok(Json(body).into_response())
}

/// DELETE /api/user/urls : accepted, applied in the background.
pub async fn delete_user_urls(
    State(state): State<ShortenerState>,
    CallerId(user_id): CallerId,
    Json(shorts): Json<Vec<String>>,
) -> Result<StatusCode, ShortenerError> {
    debug!(user_id = %user_id, count = shorts.len(), "queueing soft-delete");
    state.deletions.submit(user_id, shorts)?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /ping : storage health.
pub async fn ping(State(state): State<ShortenerState>) -> StatusCode {
    match state.repos.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "storage ping failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
