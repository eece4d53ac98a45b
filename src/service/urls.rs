use crate::db::UrlStorage;
use crate::error::ShortenerError;
use crate::service::codegen;
use crate::types::api::BatchRequestItem;
use tracing::{debug, warn};
use url::Url;

/// Result of shortening one long URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortened {
    pub short: String,
    /// `false` when the long URL was already stored and its code was reused.
    pub created: bool,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub correlation_id: String,
    pub result: Result<Shortened, ShortenerError>,
}

#[derive(Clone)]
pub struct UrlService {
    urls: UrlStorage,
}

impl UrlService {
    pub fn new(urls: UrlStorage) -> Self {
        Self { urls }
    }

    pub fn storage(&self) -> &UrlStorage {
        &self.urls
    }

    /// Store `long` for `owner`, or hand back the code it already has.
    pub async fn shorten(&self, owner: &str, long: &str) -> Result<Shortened, ShortenerError> {
        // the parser silently drops tabs and newlines, the stored text would keep them
        if long.chars().any(|c| c.is_control()) {
            return Err(ShortenerError::UrlControlChars);
        }
        Url::parse(long)?;
        let short = codegen::short();
        match self.urls.create(&short, long, owner).await {
            Ok(()) => Ok(Shortened {
                short,
                created: true,
            }),
            Err(ShortenerError::Conflict) => {
                let existing = self.urls.resolve_short_for(long).await?;
                debug!(short = %existing, "reusing existing mapping");
                Ok(Shortened {
                    short: existing,
                    created: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Shorten every entry in order. A failing entry is reported in place
    /// and does not stop the rest of the batch.
    pub async fn shorten_batch(&self, owner: &str, items: Vec<BatchRequestItem>) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            let result = self.shorten(owner, &item.original_url).await;
            if let Err(e) = &result {
                warn!(correlation_id = %item.correlation_id, error = %e, "batch entry failed");
            }
            outcomes.push(BatchOutcome {
                correlation_id: item.correlation_id,
                result,
            });
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Repositories;
    use std::time::Duration;

    async fn service() -> UrlService {
        let repos = Repositories::in_memory(Duration::from_secs(5)).await.unwrap();
        UrlService::new(repos.urls)
    }

    fn item(id: &str, url: &str) -> BatchRequestItem {
        BatchRequestItem {
            correlation_id: id.to_string(),
            original_url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn second_shorten_reuses_code() {
        let svc = service().await;
        let first = svc.shorten("u1", "https://x.com/a").await.unwrap();
        assert!(first.created);
        let second = svc.shorten("u2", "https://x.com/a").await.unwrap();
        assert!(!second.created);
        assert_eq!(second.short, first.short);
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_before_storage() {
        let svc = service().await;
        assert!(matches!(
            svc.shorten("u1", "not a url").await,
            Err(ShortenerError::UrlParse(_))
        ));
        assert!(svc.storage().list_by_owner("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn url_with_embedded_newline_is_rejected() {
        let svc = service().await;
        for long in ["https://x.com/a\nb", "https://x.com/\ta", "https://x.com/a\r"] {
            let err = svc.shorten("u1", long).await.unwrap_err();
            assert!(matches!(err, ShortenerError::UrlControlChars));
            assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        }
        assert!(svc.storage().list_by_owner("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_keeps_order_and_survives_bad_entries() {
        let svc = service().await;
        let existing = svc.shorten("u1", "https://b.example").await.unwrap();

        let outcomes = svc
            .shorten_batch(
                "u1",
                vec![
                    item("1", "https://a.example"),
                    item("2", "::bad::"),
                    item("3", "https://b.example"),
                ],
            )
            .await;

        let ids: Vec<_> = outcomes.iter().map(|o| o.correlation_id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert!(outcomes[0].result.as_ref().unwrap().created);
        assert!(outcomes[1].result.is_err());
        assert_eq!(outcomes[2].result.as_ref().unwrap().short, existing.short);
    }

    #[tokio::test]
    async fn batch_with_duplicate_entries_maps_to_one_code() {
        let svc = service().await;
        let outcomes = svc
            .shorten_batch(
                "u1",
                vec![item("a", "https://same.example"), item("b", "https://same.example")],
            )
            .await;
        let a = outcomes[0].result.as_ref().unwrap();
        let b = outcomes[1].result.as_ref().unwrap();
        assert_eq!(a.short, b.short);
        assert_eq!(svc.storage().list_by_owner("u1").await.unwrap().len(), 1);
    }
}
