use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Demand side
// ---------------------------------------------------------------------------

/// One observation of relative search interest (0–100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestPoint {
    pub date: String,
    pub value: u32,
}

/// Demand metrics for one keyword, derived once from the collaborator payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordDemandRecord {
    pub keyword: String,
    /// Oldest first.
    pub history: Vec<InterestPoint>,
    pub avg_interest: f64,
    pub trend_slope: f64,
    /// None when the mean interest is zero.
    pub trend_consistency: Option<f64>,
    pub recent_spike: bool,
    /// 0–100.
    pub purchase_intent: f64,
    pub avg_price: Option<f64>,
    pub monthly_searches: u64,
}

impl KeywordDemandRecord {
    pub fn values(&self) -> Vec<f64> {
        self.history.iter().map(|p| p.value as f64).collect()
    }

    /// Monthly searches represented by one point of average interest for this
    /// keyword. Used to rescale window-local averages.
    pub fn searches_per_point(&self, fallback: f64) -> f64 {
        if self.avg_interest > 0.0 {
            self.monthly_searches as f64 / self.avg_interest
        } else {
            fallback
        }
    }
}

// ---------------------------------------------------------------------------
// Supply side
// ---------------------------------------------------------------------------

/// Listing count reported by one marketplace. `Unavailable` is never read as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyCount {
    Available(u64),
    Unavailable,
}

impl SupplyCount {
    pub fn available(&self) -> Option<u64> {
        match self {
            SupplyCount::Available(n) => Some(*n),
            SupplyCount::Unavailable => None,
        }
    }
}

impl std::fmt::Display for SupplyCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupplyCount::Available(n) => write!(f, "{n}"),
            SupplyCount::Unavailable => write!(f, "unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordSupplyRecord {
    pub keyword: String,
    /// marketplace name → listing count
    pub counts: BTreeMap<String, SupplyCount>,
    /// Sum of available counts only. None when no marketplace reported.
    pub total_supply: Option<u64>,
}

impl KeywordSupplyRecord {
    pub fn new(keyword: impl Into<String>, counts: BTreeMap<String, SupplyCount>) -> Self {
        let total_supply = crate::engine::supply::aggregate_total(counts.values());
        Self { keyword: keyword.into(), counts, total_supply }
    }

    /// Largest count reported by any single marketplace.
    pub fn max_single(&self) -> Option<u64> {
        self.counts.values().filter_map(SupplyCount::available).max()
    }
}

// ---------------------------------------------------------------------------
// Competition classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionLevel {
    /// fewer than 100 listings
    BlueOcean,
    /// 100–499
    Low,
    /// 500–1 999
    Moderate,
    /// 2 000–9 999
    High,
    /// 10 000 and up
    Extreme,
}

impl CompetitionLevel {
    pub fn from_supply(total_supply: u64) -> Self {
        use crate::config::competition_thresholds::*;
        if total_supply < BLUE_OCEAN_MAX {
            CompetitionLevel::BlueOcean
        } else if total_supply < LOW_MAX {
            CompetitionLevel::Low
        } else if total_supply < MODERATE_MAX {
            CompetitionLevel::Moderate
        } else if total_supply < HIGH_MAX {
            CompetitionLevel::High
        } else {
            CompetitionLevel::Extreme
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompetitionLevel::BlueOcean => "blue ocean",
            CompetitionLevel::Low => "low",
            CompetitionLevel::Moderate => "moderate",
            CompetitionLevel::High => "high",
            CompetitionLevel::Extreme => "extreme",
        }
    }
}

impl std::fmt::Display for CompetitionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompetitionLevel::BlueOcean => "blue_ocean",
            CompetitionLevel::Low => "low",
            CompetitionLevel::Moderate => "moderate",
            CompetitionLevel::High => "high",
            CompetitionLevel::Extreme => "extreme",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Scoring formula generation, chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// demand / (supply + 1)
    Ratio,
    /// price-weighted demand over log pressure
    Revenue,
    /// demand over log pressure, no momentum
    LogPressure,
    /// log pressure with momentum amplification
    Momentum,
}

impl FromStr for StrategyKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ratio" => Ok(StrategyKind::Ratio),
            "revenue" => Ok(StrategyKind::Revenue),
            "log_pressure" | "log-pressure" => Ok(StrategyKind::LogPressure),
            "momentum" => Ok(StrategyKind::Momentum),
            other => Err(AppError::Config(format!(
                "unknown scoring strategy '{other}' (expected ratio, revenue, log_pressure or momentum)"
            ))),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StrategyKind::Ratio => "ratio",
            StrategyKind::Revenue => "revenue",
            StrategyKind::LogPressure => "log_pressure",
            StrategyKind::Momentum => "momentum",
        };
        write!(f, "{s}")
    }
}

/// Every intermediate of one score computation. Enough on its own to explain
/// the final number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub strategy: StrategyKind,
    pub demand_signal: f64,
    pub supply_pressure: f64,
    pub base_ratio: f64,
    /// 1.0–cap
    pub momentum_multiplier: f64,
    /// Average-price weighting; 1.0 unless the revenue strategy is active.
    pub price_factor: f64,
    pub saturation_penalty: f64,
    pub raw_score: f64,
    /// 0–100
    pub final_score: f64,
    /// None = supply data unavailable (unscored).
    pub total_supply: Option<u64>,
    pub competition: Option<CompetitionLevel>,
    pub trend_velocity: f64,
}

impl ScoreBreakdown {
    /// Breakdown for a keyword whose supply could not be measured.
    pub fn unscored(strategy: StrategyKind, trend_velocity: f64) -> Self {
        Self {
            strategy,
            demand_signal: 0.0,
            supply_pressure: 0.0,
            base_ratio: 0.0,
            momentum_multiplier: 1.0,
            price_factor: 1.0,
            saturation_penalty: 0.0,
            raw_score: 0.0,
            final_score: 0.0,
            total_supply: None,
            competition: None,
            trend_velocity,
        }
    }

    /// False when the "no supply data" condition is flagged.
    pub fn is_scored(&self) -> bool {
        self.total_supply.is_some()
    }
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictTier {
    Excellent,
    Viable,
    Risky,
    Avoid,
    /// Supply data missing; never ranked.
    NoData,
}

impl std::fmt::Display for VerdictTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VerdictTier::Excellent => "excellent",
            VerdictTier::Viable => "viable",
            VerdictTier::Risky => "risky",
            VerdictTier::Avoid => "avoid",
            VerdictTier::NoData => "no_data",
        };
        write!(f, "{s}")
    }
}

/// The single factor holding a below-excellent score down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitingFactor {
    ExtremeSaturation,
    InsufficientDemand,
    UnfavorableRatio,
}

impl std::fmt::Display for LimitingFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LimitingFactor::ExtremeSaturation => "extreme saturation",
            LimitingFactor::InsufficientDemand => "insufficient demand",
            LimitingFactor::UnfavorableRatio => "unfavorable demand/supply ratio",
        };
        write!(f, "{s}")
    }
}

/// The strongest factor behind an excellent score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavorableFactor {
    BlueOceanSupply,
    StrongMomentum,
    StrongRatio,
}

impl std::fmt::Display for FavorableFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FavorableFactor::BlueOceanSupply => "almost no competing listings",
            FavorableFactor::StrongMomentum => "strong upward search momentum",
            FavorableFactor::StrongRatio => "high qualified demand per unit of supply pressure",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub tier: VerdictTier,
    /// Name of the policy rule that fixed the tier.
    pub rule: &'static str,
    pub diagnosis: Option<LimitingFactor>,
    pub strength: Option<FavorableFactor>,
    pub headline: String,
    pub details: Vec<String>,
}

impl Verdict {
    /// Headline and details joined into one paragraph.
    pub fn text(&self) -> String {
        let mut out = self.headline.clone();
        for line in &self.details {
            out.push(' ');
            out.push_str(line);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Temporal windows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemporalWindow {
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "12m")]
    TwelveMonths,
}

impl TemporalWindow {
    pub const ALL: [TemporalWindow; 5] = [
        TemporalWindow::SevenDays,
        TemporalWindow::OneMonth,
        TemporalWindow::ThreeMonths,
        TemporalWindow::SixMonths,
        TemporalWindow::TwelveMonths,
    ];

    pub fn days(&self) -> usize {
        match self {
            TemporalWindow::SevenDays => 7,
            TemporalWindow::OneMonth => 30,
            TemporalWindow::ThreeMonths => 90,
            TemporalWindow::SixMonths => 180,
            TemporalWindow::TwelveMonths => 365,
        }
    }
}

impl std::fmt::Display for TemporalWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TemporalWindow::SevenDays => "7d",
            TemporalWindow::OneMonth => "1m",
            TemporalWindow::ThreeMonths => "3m",
            TemporalWindow::SixMonths => "6m",
            TemporalWindow::TwelveMonths => "12m",
        };
        write!(f, "{s}")
    }
}

/// Evaluation period: the full history or one trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Overall,
    Window(TemporalWindow),
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Overall => write!(f, "overall"),
            Period::Window(w) => write!(f, "{w}"),
        }
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Evaluation results
// ---------------------------------------------------------------------------

/// Score and verdict for one (keyword, period) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodResult {
    pub period: Period,
    pub points: usize,
    pub avg_interest: f64,
    pub monthly_searches: u64,
    pub trend_velocity: f64,
    pub is_rising: bool,
    pub breakdown: ScoreBreakdown,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordEvaluation {
    pub keyword: String,
    pub demand: KeywordDemandRecord,
    pub supply: KeywordSupplyRecord,
    pub overall: PeriodResult,
    /// Trailing windows, shortest first. Windows without history are absent.
    pub periods: Vec<PeriodResult>,
}

impl KeywordEvaluation {
    pub fn is_scored(&self) -> bool {
        self.overall.breakdown.is_scored()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn competition_tiers_are_inclusive_low_exclusive_high() {
        assert_eq!(CompetitionLevel::from_supply(0), CompetitionLevel::BlueOcean);
        assert_eq!(CompetitionLevel::from_supply(99), CompetitionLevel::BlueOcean);
        assert_eq!(CompetitionLevel::from_supply(100), CompetitionLevel::Low);
        assert_eq!(CompetitionLevel::from_supply(499), CompetitionLevel::Low);
        assert_eq!(CompetitionLevel::from_supply(500), CompetitionLevel::Moderate);
        assert_eq!(CompetitionLevel::from_supply(1_999), CompetitionLevel::Moderate);
        assert_eq!(CompetitionLevel::from_supply(2_000), CompetitionLevel::High);
        assert_eq!(CompetitionLevel::from_supply(9_999), CompetitionLevel::High);
        assert_eq!(CompetitionLevel::from_supply(10_000), CompetitionLevel::Extreme);
    }

    #[test]
    fn strategy_kind_parses_names() {
        assert_eq!("momentum".parse::<StrategyKind>().unwrap(), StrategyKind::Momentum);
        assert_eq!("Log-Pressure".parse::<StrategyKind>().unwrap(), StrategyKind::LogPressure);
        assert!("magic".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn supply_record_ignores_unavailable_components() {
        let mut counts = BTreeMap::new();
        counts.insert("ebay".to_string(), SupplyCount::Available(120));
        counts.insert("amazon".to_string(), SupplyCount::Unavailable);
        let rec = KeywordSupplyRecord::new("plush", counts);
        assert_eq!(rec.total_supply, Some(120));
        assert_eq!(rec.max_single(), Some(120));
    }

    #[test]
    fn all_unavailable_is_distinguishable_from_zero_listings() {
        let counts = ["ebay", "amazon"]
            .iter()
            .map(|m| (m.to_string(), SupplyCount::Unavailable))
            .collect();
        let missing = KeywordSupplyRecord::new("plush", counts);
        assert_eq!(missing.total_supply, None);

        let mut counts = BTreeMap::new();
        counts.insert("ebay".to_string(), SupplyCount::Available(0));
        let empty_market = KeywordSupplyRecord::new("plush", counts);
        assert_eq!(empty_market.total_supply, Some(0));
    }

    #[test]
    fn period_serializes_as_label() {
        let json = serde_json::to_string(&Period::Window(TemporalWindow::ThreeMonths)).unwrap();
        assert_eq!(json, "\"3m\"");
        assert_eq!(Period::Overall.to_string(), "overall");
    }
}
