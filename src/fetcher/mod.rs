//! Demand and supply collaborators.
//!
//! The engine only ever sees resolved records. Everything that can block,
//! fail or rate-limit lives behind [`DemandSource`] and [`SupplySource`].

pub mod demand;
pub mod fixture;
pub mod supply;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::RETRY_BACKOFF_MS;
use crate::error::{AppError, Result};
use crate::types::{InterestPoint, KeywordSupplyRecord, SupplyCount};

pub use demand::TrendsClient;
pub use fixture::{FixtureDemandSource, FixtureSupplySource};
pub use supply::MarketplaceClient;

/// Demand payload as returned by the trends collaborator.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawDemand {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default, alias = "interest_over_time")]
    pub history: Vec<InterestPoint>,
    /// Missing or null means 0, not an error.
    #[serde(default)]
    pub purchase_intent_score: Option<f64>,
    #[serde(default)]
    pub avg_price: Option<f64>,
    /// When absent the demand normalizer estimates it from average interest.
    #[serde(default)]
    pub monthly_searches: Option<u64>,
}

impl RawDemand {
    pub fn purchase_intent(&self) -> f64 {
        self.purchase_intent_score.unwrap_or(0.0)
    }
}

#[async_trait]
pub trait DemandSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_demand(&self, keyword: &str) -> Result<RawDemand>;
}

#[async_trait]
pub trait SupplySource: Send + Sync {
    fn name(&self) -> &str;

    fn marketplaces(&self) -> &[String];

    async fn fetch_count(&self, marketplace: &str, keyword: &str) -> Result<SupplyCount>;
}

/// Query every marketplace of `source` for one keyword. A failing marketplace
/// is recorded as unavailable, never as zero.
pub async fn collect_supply(source: &dyn SupplySource, keyword: &str) -> KeywordSupplyRecord {
    let mut counts = BTreeMap::new();
    for marketplace in source.marketplaces() {
        let count = match source.fetch_count(marketplace, keyword).await {
            Ok(c) => c,
            Err(e) => {
                warn!(keyword, marketplace = %marketplace, "supply lookup failed: {e}");
                SupplyCount::Unavailable
            }
        };
        counts.insert(marketplace.clone(), count);
    }
    KeywordSupplyRecord::new(keyword, counts)
}

/// Interpret a marketplace count value.
///
/// Accepts integers, numeric strings with thousands separators ("1,234"),
/// and treats `null`, negative sentinels and "unavailable" as unavailable.
pub fn parse_supply_count(v: &serde_json::Value) -> SupplyCount {
    match v {
        serde_json::Value::Number(n) => match (n.as_u64(), n.as_f64()) {
            (Some(c), _) => SupplyCount::Available(c),
            (None, Some(f)) if f.is_finite() && f >= 0.0 => SupplyCount::Available(f.round() as u64),
            _ => SupplyCount::Unavailable,
        },
        serde_json::Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
            cleaned
                .parse::<u64>()
                .map(SupplyCount::Available)
                .unwrap_or(SupplyCount::Unavailable)
        }
        _ => SupplyCount::Unavailable,
    }
}

/// GET `url` and decode JSON, retrying transport errors, 429 and 5xx with the
/// RETRY_BACKOFF_MS schedule. Other 4xx responses fail immediately.
pub async fn get_json_with_retry<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
    max_retries: usize,
) -> Result<T> {
    let mut attempt = 0usize;
    loop {
        let outcome = match client.get(url).query(query).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(resp.json::<T>().await?);
                }
                let retryable = status.as_u16() == 429 || status.is_server_error();
                let err = AppError::Collector(format!("{url} returned {status}"));
                if !retryable {
                    return Err(err);
                }
                err
            }
            Err(e) => AppError::Http(e),
        };

        if attempt >= max_retries {
            return Err(outcome);
        }
        let delay_ms = RETRY_BACKOFF_MS
            .get(attempt)
            .or(RETRY_BACKOFF_MS.last())
            .copied()
            .unwrap_or(1_000);
        debug!(url, attempt, delay_ms, "retrying collaborator request: {outcome}");
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        attempt += 1;
    }
}

/// Build the shared HTTP client for collaborators.
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(crate::config::HTTP_TIMEOUT_SECS))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn count_parsing_accepts_numbers_and_strings() {
        assert_eq!(parse_supply_count(&json!(42)), SupplyCount::Available(42));
        assert_eq!(parse_supply_count(&json!(0)), SupplyCount::Available(0));
        assert_eq!(parse_supply_count(&json!("1,234")), SupplyCount::Available(1_234));
        assert_eq!(parse_supply_count(&json!(12.0)), SupplyCount::Available(12));
    }

    #[test]
    fn count_parsing_maps_sentinels_to_unavailable() {
        assert_eq!(parse_supply_count(&json!(-1)), SupplyCount::Unavailable);
        assert_eq!(parse_supply_count(&json!("unavailable")), SupplyCount::Unavailable);
        assert_eq!(parse_supply_count(&json!(null)), SupplyCount::Unavailable);
        assert_eq!(parse_supply_count(&json!({"n": 1})), SupplyCount::Unavailable);
    }

    #[test]
    fn raw_demand_defaults_missing_intent_to_zero() {
        let raw: RawDemand =
            serde_json::from_value(json!({"history": [{"date": "2024-01-01", "value": 40}]})).unwrap();
        assert_eq!(raw.purchase_intent(), 0.0);
        assert_eq!(raw.history.len(), 1);
        assert_eq!(raw.monthly_searches, None);
    }

    #[test]
    fn raw_demand_treats_null_intent_as_zero() {
        let raw: RawDemand = serde_json::from_value(json!({
            "history": [{"date": "2024-01-01", "value": 40}],
            "purchase_intent_score": null,
            "avg_price": null
        }))
        .unwrap();
        assert_eq!(raw.purchase_intent_score, None);
        assert_eq!(raw.purchase_intent(), 0.0);
        assert_eq!(raw.avg_price, None);
    }

    #[test]
    fn raw_demand_accepts_empty_payload() {
        let raw: RawDemand = serde_json::from_value(json!({})).unwrap();
        assert!(raw.history.is_empty());
    }

    struct FlakySupply {
        markets: Vec<String>,
    }

    #[async_trait]
    impl SupplySource for FlakySupply {
        fn name(&self) -> &str {
            "flaky"
        }

        fn marketplaces(&self) -> &[String] {
            &self.markets
        }

        async fn fetch_count(&self, marketplace: &str, _keyword: &str) -> Result<SupplyCount> {
            match marketplace {
                "ebay" => Ok(SupplyCount::Available(250)),
                _ => Err(AppError::Collector("timeout".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn failing_marketplace_is_unavailable_not_zero() {
        let source = FlakySupply { markets: vec!["ebay".to_string(), "amazon".to_string()] };
        let rec = collect_supply(&source, "plush").await;
        assert_eq!(rec.counts["amazon"], SupplyCount::Unavailable);
        assert_eq!(rec.total_supply, Some(250));
    }
}
