use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;

use crate::db::Repositories;
use crate::handlers::urls::{
    delete_user_urls, list_user_urls, ping, redirect, shorten_batch, shorten_json, shorten_text,
};
use crate::middleware::establish_identity;
use crate::service::{DeletionHandle, IdentityService, UrlService};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ShortenerState {
    pub urls: UrlService,
    pub identity: IdentityService,
    pub deletions: DeletionHandle,
    pub repos: Repositories,
    /// Prefix for rendered short links; `http://{Host}` when unset.
    pub base_url: Option<Arc<str>>,
}

impl ShortenerState {
    pub fn new(
        repos: Repositories,
        identity: IdentityService,
        deletions: DeletionHandle,
        base_url: Option<&str>,
    ) -> Self {
        Self {
            urls: UrlService::new(repos.urls.clone()),
            identity,
            deletions,
            repos,
            base_url: base_url.map(|b| Arc::from(b.trim_end_matches('/'))),
        }
    }
}

pub fn shortener_router(state: ShortenerState) -> Router {
    Router::new()
        .route("/", post(shorten_text))
        .route("/api/shorten", post(shorten_json))
        .route("/api/shorten/batch", post(shorten_batch))
        .route("/api/user/urls", get(list_user_urls).delete(delete_user_urls))
        .route("/ping", get(ping))
        .route("/{id}", get(redirect))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            establish_identity,
        ))
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .with_state(state)
}
