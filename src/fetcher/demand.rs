use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::fetcher::{get_json_with_retry, http_client, DemandSource, RawDemand};

/// HTTP trends collaborator: `GET {base}/interest?keyword=…`.
pub struct TrendsClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: usize,
    request_delay: Duration,
}

impl TrendsClient {
    pub fn new(base_url: &str, max_retries: usize, request_delay_ms: u64) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
            request_delay: Duration::from_millis(request_delay_ms),
        })
    }

    fn interest_url(&self) -> String {
        format!("{}/interest", self.base_url)
    }
}

#[async_trait]
impl DemandSource for TrendsClient {
    fn name(&self) -> &str {
        "trends-http"
    }

    async fn fetch_demand(&self, keyword: &str) -> Result<RawDemand> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        let url = self.interest_url();
        let mut raw: RawDemand =
            get_json_with_retry(&self.client, &url, &[("keyword", keyword)], self.max_retries).await?;
        debug!(keyword, points = raw.history.len(), "fetched interest history");
        raw.keyword.get_or_insert_with(|| keyword.to_string());
        Ok(raw)
    }
}
