//! Remote blog API client.
//!
//! Three endpoints drive the sync:
//! - `GET /classify/` -> `{ "YYYY-MM": { "article": n, "section": m } }`
//! - `GET /classify/?month=YYYY-MM` -> `[ArticleSummary]`
//! - `GET /{type}/{id}/` -> `ArticleDetail`
//!
//! Every request carries a rotated identity header. Detail and image fetches
//! additionally block on the shared rate limiter; listing calls are exempt.
//! There is no automatic retry: a non-2xx response surfaces as
//! `AppError::Remote` and the caller decides what to skip.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::error::{AppError, Result};
use crate::models::{ArticleDetail, ArticleKind, ArticleSummary};
use crate::services::identity::IdentityPool;
use crate::services::rate_limit::RateLimiter;

/// Per-month article/note counts from the classify endpoint.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MonthCounts {
    #[serde(default)]
    pub article: u64,
    #[serde(default)]
    pub section: u64,
}

/// HTTP client for the blog API.
pub struct BlogClient {
    client: reqwest::Client,
    base_url: String,
    identities: Arc<IdentityPool>,
    limiter: Arc<RateLimiter>,
}

impl BlogClient {
    /// Create a client sharing the given identity pool and rate limiter.
    pub fn new(
        config: &ApiConfig,
        identities: Arc<IdentityPool>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .default_headers(Self::base_headers())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            identities,
            limiter,
        })
    }

    /// Headers sent with every request, mirroring the browser frontend.
    fn base_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "accept",
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            "accept-language",
            HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
        );
        headers.insert(
            "origin",
            HeaderValue::from_static("https://www.cuiliangblog.cn"),
        );
        headers.insert(
            "referer",
            HeaderValue::from_static("https://www.cuiliangblog.cn/"),
        );
        headers
    }

    /// Issue a GET, attaching a rotated identity and optionally waiting for
    /// a rate-limit slot.
    async fn get(&self, url: &str, limited: bool) -> Result<reqwest::Response> {
        if limited {
            self.limiter.admit().await;
        }

        let response = self
            .client
            .get(url)
            .header("user-agent", self.identities.rotate())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::remote(url, status.as_u16()));
        }
        Ok(response)
    }

    /// Fetch the month index: every month that has content, with counts.
    pub async fn list_months(&self) -> Result<BTreeMap<String, MonthCounts>> {
        let url = format!("{}/classify/", self.base_url);
        Ok(self.get(&url, false).await?.json().await?)
    }

    /// Fetch the article/note listing for one month (`YYYY-MM`).
    pub async fn list_month(&self, month: &str) -> Result<Vec<ArticleSummary>> {
        let url = format!("{}/classify/?month={}", self.base_url, month);
        Ok(self.get(&url, false).await?.json().await?)
    }

    /// Fetch full detail for one article or note. Rate-limited.
    pub async fn get_detail(&self, id: u64, kind: ArticleKind) -> Result<ArticleDetail> {
        let url = format!("{}/{}/{}/", self.base_url, kind.as_str(), id);
        Ok(self.get(&url, true).await?.json().await?)
    }

    /// Download raw image bytes from an arbitrary URL. Rate-limited.
    pub async fn download_image(&self, url: &str) -> Result<Bytes> {
        Ok(self.get(url, true).await?.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;

    fn client() -> BlogClient {
        let identities = Arc::new(IdentityPool::new(vec!["test-ua".into()], 1));
        let limiter = Arc::new(RateLimiter::new(100, Duration::from_secs(1)));
        BlogClient::new(&ApiConfig::default(), identities, limiter).unwrap()
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let identities = Arc::new(IdentityPool::new(vec!["ua".into()], 1));
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(1)));
        let config = ApiConfig {
            base_url: "https://api.example.com/v1/blog/".into(),
            ..ApiConfig::default()
        };
        let client = BlogClient::new(&config, identities, limiter).unwrap();
        assert_eq!(client.base_url, "https://api.example.com/v1/blog");
    }

    #[test]
    fn month_counts_tolerate_missing_fields() {
        let counts: MonthCounts = serde_json::from_str(r#"{"section": 2}"#).unwrap();
        assert_eq!(counts.article, 0);
        assert_eq!(counts.section, 2);
    }

    #[tokio::test]
    async fn unreachable_host_is_an_http_error() {
        let client = client();
        // Connection refused, not a panic and not a Remote status error.
        let err = client
            .download_image("http://127.0.0.1:1/missing.png")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Http(_)));
    }
}
