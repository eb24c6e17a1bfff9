//! File-backed collaborators for offline runs and tests.
//!
//! Demand fixture: either an array of demand payloads carrying `keyword`, or
//! an object keyed by keyword. Supply fixture: an array of
//! `{ "keyword": …, "<marketplace>_count": …, "total_supply": … }` records;
//! `total_supply` in the file is ignored and recomputed from the counts.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::error::{AppError, Result};
use crate::fetcher::{parse_supply_count, DemandSource, RawDemand, SupplySource};
use crate::types::SupplyCount;

fn key(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

pub struct FixtureDemandSource {
    records: HashMap<String, RawDemand>,
}

impl FixtureDemandSource {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        let source = Self::from_json(&text)?;
        info!(path = %path.as_ref().display(), keywords = source.records.len(), "loaded demand fixture");
        Ok(source)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let mut records = HashMap::new();
        match value {
            Value::Array(items) => {
                for item in items {
                    let raw: RawDemand = serde_json::from_value(item)?;
                    let Some(kw) = raw.keyword.clone() else {
                        return Err(AppError::Config("demand fixture entry without keyword".to_string()));
                    };
                    records.insert(key(&kw), raw);
                }
            }
            Value::Object(map) => {
                for (kw, item) in map {
                    let mut raw: RawDemand = serde_json::from_value(item)?;
                    raw.keyword.get_or_insert_with(|| kw.clone());
                    records.insert(key(&kw), raw);
                }
            }
            _ => {
                return Err(AppError::Config(
                    "demand fixture must be a JSON array or object".to_string(),
                ))
            }
        }
        Ok(Self { records })
    }
}

#[async_trait]
impl DemandSource for FixtureDemandSource {
    fn name(&self) -> &str {
        "demand-fixture"
    }

    async fn fetch_demand(&self, keyword: &str) -> Result<RawDemand> {
        self.records
            .get(&key(keyword))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("no demand fixture for '{keyword}'")))
    }
}

pub struct FixtureSupplySource {
    marketplaces: Vec<String>,
    counts: HashMap<String, HashMap<String, SupplyCount>>,
}

impl FixtureSupplySource {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        let source = Self::from_json(&text)?;
        info!(
            path = %path.as_ref().display(),
            keywords = source.counts.len(),
            marketplaces = ?source.marketplaces,
            "loaded supply fixture"
        );
        Ok(source)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let Value::Array(items) = serde_json::from_str::<Value>(text)? else {
            return Err(AppError::Config("supply fixture must be a JSON array".to_string()));
        };

        let mut marketplaces = BTreeSet::new();
        let mut counts = HashMap::new();
        for item in items {
            let Some(obj) = item.as_object() else { continue };
            let Some(kw) = obj.get("keyword").and_then(|k| k.as_str()) else {
                return Err(AppError::Config("supply fixture entry without keyword".to_string()));
            };
            let per_market: HashMap<String, SupplyCount> = obj
                .iter()
                .filter_map(|(k, v)| {
                    k.strip_suffix("_count").map(|m| (m.to_string(), parse_supply_count(v)))
                })
                .collect();
            marketplaces.extend(per_market.keys().cloned());
            counts.insert(key(kw), per_market);
        }

        Ok(Self { marketplaces: marketplaces.into_iter().collect(), counts })
    }
}

#[async_trait]
impl SupplySource for FixtureSupplySource {
    fn name(&self) -> &str {
        "supply-fixture"
    }

    fn marketplaces(&self) -> &[String] {
        &self.marketplaces
    }

    async fn fetch_count(&self, marketplace: &str, keyword: &str) -> Result<SupplyCount> {
        let per_market = self
            .counts
            .get(&key(keyword))
            .ok_or_else(|| AppError::NotFound(format!("no supply fixture for '{keyword}'")))?;
        Ok(per_market.get(marketplace).copied().unwrap_or(SupplyCount::Unavailable))
    }
}
