use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::types::StrategyKind;

pub const TRENDS_API_URL: &str = "http://localhost:8081";
pub const MARKETPLACE_API_URL: &str = "http://localhost:8082";

/// Timeout applied to every collaborator HTTP request (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Retry backoff values in milliseconds, indexed by attempt.
pub const RETRY_BACKOFF_MS: &[u64] = &[500, 1_000, 2_000, 4_000];

/// Added to the listing count before the log10 compression so that an empty
/// market still has a pressure of exactly 1.0.
pub const SUPPLY_PRESSURE_FLOOR: f64 = 10.0;

/// Average price used to normalise the revenue strategy back onto the same
/// scale as the search-volume strategies.
pub const REVENUE_PRICE_SCALE: f64 = 25.0;

/// Fraction of qualified searches assumed to convert into a sale. Only used for
/// the projected-sales line of the timeline export.
pub const CONVERSION_RATE: f64 = 0.02;

/// Last value must exceed the baseline mean by this factor to count as a spike.
pub const SPIKE_RATIO: f64 = 1.3;
/// Minimum history length before spike detection is attempted.
pub const SPIKE_MIN_POINTS: usize = 6;
/// Trailing points excluded from the spike baseline.
pub const SPIKE_TAIL: usize = 3;

/// Keywords analysed when neither KEYWORDS nor a request supplies any.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "clash royale plush",
    "skibidi toilet toy",
    "digital circus plush",
    "poppy playtime toy",
    "among us plush",
    "bluey toys",
    "squishmallow rare",
    "pokemon plush",
    "roblox toy",
    "minecraft plush",
];

/// Competition tier upper bounds on total listings (exclusive).
pub mod competition_thresholds {
    pub const BLUE_OCEAN_MAX: u64 = 100;
    pub const LOW_MAX: u64 = 500;
    pub const MODERATE_MAX: u64 = 2_000;
    pub const HIGH_MAX: u64 = 10_000;
}

/// Tunable scoring constants. The defaults were calibrated for a US search
/// volume scale and should be re-tuned for other markets.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub strategy: StrategyKind,
    /// Maps base_ratio × momentum onto roughly 0–100 (CALIBRATION_DIVISOR).
    pub calibration_divisor: f64,
    pub saturation_high_threshold: u64,
    pub saturation_high_penalty: f64,
    pub saturation_extreme_threshold: u64,
    pub saturation_extreme_penalty: f64,
    /// Multiplier gain per unit of positive trend velocity.
    pub momentum_factor: f64,
    pub momentum_cap: f64,
    /// demand_signal below this is diagnosed as insufficient demand.
    pub low_demand_threshold: f64,
    /// Monthly searches represented by one point of average interest.
    pub searches_per_interest_point: f64,
    /// Any single marketplace above this count forces an "avoid" verdict.
    pub max_single_marketplace: u64,
    pub verdict_excellent: f64,
    pub verdict_viable: f64,
    pub verdict_risky: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Momentum,
            calibration_divisor: 50.0,
            saturation_high_threshold: 10_000,
            saturation_high_penalty: 10.0,
            saturation_extreme_threshold: 20_000,
            saturation_extreme_penalty: 15.0,
            momentum_factor: 0.5,
            momentum_cap: 2.0,
            low_demand_threshold: 500.0,
            searches_per_interest_point: 1_000.0,
            max_single_marketplace: 50_000,
            verdict_excellent: 70.0,
            verdict_viable: 50.0,
            verdict_risky: 30.0,
        }
    }
}

impl ScoringConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        let strategy = match std::env::var("SCORING_STRATEGY") {
            Ok(s) => s.parse::<StrategyKind>()?,
            Err(_) => d.strategy,
        };
        let cfg = Self {
            strategy,
            calibration_divisor: env_or("CALIBRATION_DIVISOR", d.calibration_divisor),
            saturation_high_threshold: env_or("SATURATION_HIGH_THRESHOLD", d.saturation_high_threshold),
            saturation_high_penalty: env_or("SATURATION_HIGH_PENALTY", d.saturation_high_penalty),
            saturation_extreme_threshold: env_or(
                "SATURATION_EXTREME_THRESHOLD",
                d.saturation_extreme_threshold,
            ),
            saturation_extreme_penalty: env_or("SATURATION_EXTREME_PENALTY", d.saturation_extreme_penalty),
            momentum_factor: env_or("MOMENTUM_FACTOR", d.momentum_factor),
            momentum_cap: env_or("MOMENTUM_CAP", d.momentum_cap),
            low_demand_threshold: env_or("LOW_DEMAND_THRESHOLD", d.low_demand_threshold),
            searches_per_interest_point: env_or(
                "SEARCHES_PER_INTEREST_POINT",
                d.searches_per_interest_point,
            ),
            max_single_marketplace: env_or("MAX_SINGLE_MARKETPLACE", d.max_single_marketplace),
            verdict_excellent: env_or("VERDICT_EXCELLENT", d.verdict_excellent),
            verdict_viable: env_or("VERDICT_VIABLE", d.verdict_viable),
            verdict_risky: env_or("VERDICT_RISKY", d.verdict_risky),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.calibration_divisor <= 0.0 {
            return Err(AppError::Config("CALIBRATION_DIVISOR must be positive".to_string()));
        }
        if self.momentum_cap < 1.0 {
            return Err(AppError::Config("MOMENTUM_CAP must be >= 1.0".to_string()));
        }
        if self.saturation_extreme_threshold < self.saturation_high_threshold {
            return Err(AppError::Config(
                "SATURATION_EXTREME_THRESHOLD must be >= SATURATION_HIGH_THRESHOLD".to_string(),
            ));
        }
        if !(self.verdict_excellent >= self.verdict_viable && self.verdict_viable >= self.verdict_risky) {
            return Err(AppError::Config(
                "verdict thresholds must be descending: excellent >= viable >= risky".to_string(),
            ));
        }
        Ok(())
    }
}

/// Thresholds for the filtered report view.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub min_interest: f64,
    pub max_supply: u64,
    pub require_rising: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { min_interest: 20.0, max_supply: 500, require_rising: true }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    pub output_dir: String,
    pub timeline_dir: String,
    pub trends_api_url: String,
    pub marketplace_api_url: String,
    /// Marketplaces queried for supply (MARKETPLACES, comma-separated).
    pub marketplaces: Vec<String>,
    /// Keywords analysed at startup and on refresh (KEYWORDS, comma-separated).
    pub keywords: Vec<String>,
    /// Replaces the trends HTTP collaborator with a JSON file (DEMAND_FIXTURE).
    pub demand_fixture: Option<String>,
    /// Replaces the marketplace HTTP collaborator with a JSON file (SUPPLY_FIXTURE).
    pub supply_fixture: Option<String>,
    pub request_delay_ms: u64,
    pub max_retries: usize,
    pub fetch_concurrency: usize,
    /// 0 disables the periodic re-run.
    pub refresh_interval_secs: u64,
    pub top_n_results: usize,
    pub temporal_analysis: bool,
    pub scoring: ScoringConfig,
    pub filter: FilterConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let fd = FilterConfig::default();
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "trendarb.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "data/output".to_string()),
            timeline_dir: std::env::var("TIMELINE_DIR")
                .unwrap_or_else(|_| "data/frontend".to_string()),
            trends_api_url: std::env::var("TRENDS_API_URL")
                .unwrap_or_else(|_| TRENDS_API_URL.to_string()),
            marketplace_api_url: std::env::var("MARKETPLACE_API_URL")
                .unwrap_or_else(|_| MARKETPLACE_API_URL.to_string()),
            marketplaces: {
                let list = split_list(&std::env::var("MARKETPLACES").unwrap_or_default());
                if list.is_empty() { vec!["ebay".to_string()] } else { list }
            },
            keywords: {
                let list = split_list(&std::env::var("KEYWORDS").unwrap_or_default());
                if list.is_empty() {
                    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
                } else {
                    list
                }
            },
            demand_fixture: std::env::var("DEMAND_FIXTURE").ok().filter(|s| !s.is_empty()),
            supply_fixture: std::env::var("SUPPLY_FIXTURE").ok().filter(|s| !s.is_empty()),
            request_delay_ms: env_or("REQUEST_DELAY_MS", 0),
            max_retries: env_or("MAX_RETRIES", 3),
            fetch_concurrency: env_or::<usize>("FETCH_CONCURRENCY", 4).max(1),
            refresh_interval_secs: env_or("REFRESH_INTERVAL_SECS", 0),
            top_n_results: env_or("TOP_N_RESULTS", 10),
            temporal_analysis: env_or("TEMPORAL_ANALYSIS", true),
            scoring: ScoringConfig::from_env()?,
            filter: FilterConfig {
                min_interest: env_or("FILTER_MIN_INTEREST", fd.min_interest),
                max_supply: env_or("FILTER_MAX_SUPPLY", fd.max_supply),
                require_rising: env_or("FILTER_REQUIRE_RISING", fd.require_rising),
            },
        })
    }
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empty() {
        assert_eq!(split_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn default_scoring_config_is_valid() {
        assert!(ScoringConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_divisor() {
        let cfg = ScoringConfig { calibration_divisor: 0.0, ..ScoringConfig::default() };
        assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn rejects_inverted_verdict_thresholds() {
        let cfg = ScoringConfig { verdict_viable: 80.0, ..ScoringConfig::default() };
        assert!(cfg.validate().is_err());
    }
}
