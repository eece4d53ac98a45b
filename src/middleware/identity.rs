use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::warn;

use crate::config::{IDENTITY_COOKIE, IDENTITY_COOKIE_TTL};
use crate::error::ShortenerError;
use crate::router::ShortenerState;
use crate::service::Identity;

/// Resolve the caller from the `UserTokenID` cookie, minting a new identity
/// when the cookie is missing or does not check out. A freshly issued token
/// is attached to the response.
pub async fn establish_identity(
    State(state): State<ShortenerState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let token = jar.get(IDENTITY_COOKIE).map(|c| c.value().to_owned());

    let identity = match state.identity.establish(token.as_deref()).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "failed to establish caller identity");
            return e.into_response();
        }
    };

    let issued = identity.issued_token.clone();
    req.extensions_mut().insert(identity);
    let resp = next.run(req).await;

    match issued {
        Some(token) => (jar.add(build_cookie(token)), resp).into_response(),
        None => resp,
    }
}

fn build_cookie(value: String) -> Cookie<'static> {
    Cookie::build(Cookie::new(IDENTITY_COOKIE, value))
        .path("/")
        .max_age(IDENTITY_COOKIE_TTL)
        .build()
}

/// The user id established by [`establish_identity`] for this request.
#[derive(Debug, Clone)]
pub struct CallerId(pub String);

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ShortenerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .map(|identity| CallerId(identity.id.clone()))
            .ok_or(ShortenerError::MissingIdentity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::StatusCode;
    use axum::routing::get;
    use tower::ServiceExt;

    #[tokio::test]
    async fn caller_id_without_middleware_uses_error_body() {
        let app = Router::new().route("/", get(|CallerId(id): CallerId| async move { id }));
        let resp = app
            .oneshot(axum::http::Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(body["error"]["message"].is_string());
    }
}
