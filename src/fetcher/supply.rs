use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::fetcher::{get_json_with_retry, http_client, parse_supply_count, SupplySource};
use crate::types::SupplyCount;

/// HTTP marketplace collaborator: `GET {base}/{marketplace}/count?keyword=…`
/// answering `{"count": …}`.
pub struct MarketplaceClient {
    client: reqwest::Client,
    base_url: String,
    marketplaces: Vec<String>,
    max_retries: usize,
    request_delay: Duration,
}

impl MarketplaceClient {
    pub fn new(
        base_url: &str,
        marketplaces: Vec<String>,
        max_retries: usize,
        request_delay_ms: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            marketplaces,
            max_retries,
            request_delay: Duration::from_millis(request_delay_ms),
        })
    }

    fn count_url(&self, marketplace: &str) -> String {
        format!("{}/{}/count", self.base_url, marketplace)
    }
}

#[async_trait]
impl SupplySource for MarketplaceClient {
    fn name(&self) -> &str {
        "marketplace-http"
    }

    fn marketplaces(&self) -> &[String] {
        &self.marketplaces
    }

    async fn fetch_count(&self, marketplace: &str, keyword: &str) -> Result<SupplyCount> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        let body: serde_json::Value = get_json_with_retry(
            &self.client,
            &self.count_url(marketplace),
            &[("keyword", keyword)],
            self.max_retries,
        )
        .await?;
        Ok(body
            .get("count")
            .map(parse_supply_count)
            .unwrap_or(SupplyCount::Unavailable))
    }
}
