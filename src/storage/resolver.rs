//! Asset reference resolution
//!
//! Records store either a storage key or an absolute external URL. Readers
//! need a URL, so keys are exchanged for presigned URLs on every fetch.
//! Nothing is cached: presigned URLs expire.

use std::sync::Arc;
use std::time::Duration;

use super::ObjectStore;
use crate::metrics::SIGNED_URL_FAILURES_TOTAL;

/// Schemes treated as permanent, already-usable references
const PASSTHROUGH_SCHEMES: &[&str] = &["http", "https", "data", "blob"];

/// Returns true when `reference` is an absolute URL rather than a storage key
pub fn is_absolute_url(reference: &str) -> bool {
    url::Url::parse(reference)
        .map(|parsed| PASSTHROUGH_SCHEMES.contains(&parsed.scheme()))
        .unwrap_or(false)
}

/// Maps stored asset references to temporary URLs
#[derive(Clone)]
pub struct AssetResolver {
    store: Arc<dyn ObjectStore>,
    ttl: Duration,
}

impl AssetResolver {
    pub fn new(store: Arc<dyn ObjectStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Resolve a key or URL to something a browser can load
    ///
    /// Absolute URLs come back unchanged. Keys are presigned; a failure is
    /// logged and yields `None` so callers treat the asset as absent.
    pub async fn resolve(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }

        if is_absolute_url(reference) {
            return Some(reference.to_string());
        }

        match self.store.create_signed_url(reference, self.ttl).await {
            Ok(url) => Some(url),
            Err(error) => {
                SIGNED_URL_FAILURES_TOTAL.inc();
                tracing::warn!(key = reference, %error, "Failed to create signed URL");
                None
            }
        }
    }

    /// [`resolve`](Self::resolve) for optional columns
    pub async fn resolve_opt(&self, reference: Option<&str>) -> Option<String> {
        match reference {
            Some(reference) => self.resolve(reference).await,
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::storage::MockObjectStore;
    use mockall::predicate::eq;

    const DAY: Duration = Duration::from_secs(86_400);

    #[test]
    fn detects_absolute_urls() {
        assert!(is_absolute_url("https://cdn.example.com/a.png"));
        assert!(is_absolute_url("http://example.com/a.png"));
        assert!(is_absolute_url("data:image/png;base64,AAAA"));
        assert!(!is_absolute_url("u1/courses/c1-x.png"));
        assert!(!is_absolute_url("courses/cover.png"));
        assert!(!is_absolute_url("ftp://example.com/a.png"));
    }

    #[tokio::test]
    async fn absolute_urls_pass_through_without_store_call() {
        let mut store = MockObjectStore::new();
        store.expect_create_signed_url().never();
        let resolver = AssetResolver::new(Arc::new(store), DAY);

        let url = "https://cdn.example.com/cover.png";
        assert_eq!(resolver.resolve(url).await.as_deref(), Some(url));
    }

    #[tokio::test]
    async fn keys_are_presigned_with_configured_ttl() {
        let mut store = MockObjectStore::new();
        store
            .expect_create_signed_url()
            .with(eq("u1/courses/c1-x.png"), eq(DAY))
            .times(1)
            .returning(|key, _| Ok(format!("https://signed.example.com/{key}?sig=1")));
        let resolver = AssetResolver::new(Arc::new(store), DAY);

        assert_eq!(
            resolver.resolve("u1/courses/c1-x.png").await.as_deref(),
            Some("https://signed.example.com/u1/courses/c1-x.png?sig=1")
        );
    }

    #[tokio::test]
    async fn signing_failure_resolves_to_none() {
        let mut store = MockObjectStore::new();
        store
            .expect_create_signed_url()
            .returning(|_, _| Err(AppError::Storage("offline".to_string())));
        let resolver = AssetResolver::new(Arc::new(store), DAY);

        assert_eq!(resolver.resolve("u1/courses/c1-x.png").await, None);
    }

    #[tokio::test]
    async fn empty_and_missing_references_resolve_to_none() {
        let mut store = MockObjectStore::new();
        store.expect_create_signed_url().never();
        let resolver = AssetResolver::new(Arc::new(store), DAY);

        assert_eq!(resolver.resolve("  ").await, None);
        assert_eq!(resolver.resolve_opt(None).await, None);
    }
}
