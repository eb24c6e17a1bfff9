//! Flat report rows shared by the CSV files, the database and the HTTP layer.

pub mod csv_writer;
pub mod timeline;

use serde::{Deserialize, Serialize};

use crate::config::FilterConfig;
use crate::types::{CompetitionLevel, KeywordEvaluation, PeriodResult, StrategyKind};

/// One (keyword, period) result. Column names and order are a contract with
/// the presentation layer; every period of every keyword has the same fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub rank: usize,
    pub keyword: String,
    pub period: String,
    pub opportunity_score: f64,
    pub demand_signal: f64,
    pub total_supply: Option<u64>,
    pub competition_level: Option<CompetitionLevel>,
    pub supply_pressure: f64,
    pub base_ratio: f64,
    pub momentum_multiplier: f64,
    pub saturation_penalty: f64,
    pub trend_velocity: f64,
    pub is_rising: bool,
    pub avg_interest: f64,
    pub monthly_searches: u64,
    pub strategy: StrategyKind,
    pub verdict_tier: String,
    pub verdict: String,
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

impl ReportRow {
    pub fn from_period(rank: usize, keyword: &str, p: &PeriodResult) -> Self {
        let b = &p.breakdown;
        Self {
            rank,
            keyword: keyword.to_string(),
            period: p.period.to_string(),
            opportunity_score: round4(b.final_score),
            demand_signal: round4(b.demand_signal),
            total_supply: b.total_supply,
            competition_level: b.competition,
            supply_pressure: round4(b.supply_pressure),
            base_ratio: round4(b.base_ratio),
            momentum_multiplier: round4(b.momentum_multiplier),
            saturation_penalty: b.saturation_penalty,
            trend_velocity: round4(p.trend_velocity),
            is_rising: p.is_rising,
            avg_interest: round4(p.avg_interest),
            monthly_searches: p.monthly_searches,
            strategy: b.strategy,
            verdict_tier: p.verdict.tier.to_string(),
            verdict: p.verdict.text(),
        }
    }
}

/// One overall row per keyword, ranked in input order (1-based).
pub fn overall_rows(ranked: &[KeywordEvaluation]) -> Vec<ReportRow> {
    ranked
        .iter()
        .enumerate()
        .map(|(i, e)| ReportRow::from_period(i + 1, &e.keyword, &e.overall))
        .collect()
}

/// Overall row followed by each trailing window, for one keyword.
pub fn keyword_period_rows(rank: usize, e: &KeywordEvaluation) -> Vec<ReportRow> {
    std::iter::once(&e.overall)
        .chain(e.periods.iter())
        .map(|p| ReportRow::from_period(rank, &e.keyword, p))
        .collect()
}

/// keyword × period rows for every ranked keyword.
pub fn period_rows(ranked: &[KeywordEvaluation]) -> Vec<ReportRow> {
    ranked
        .iter()
        .enumerate()
        .flat_map(|(i, e)| keyword_period_rows(i + 1, e))
        .collect()
}

/// Sort by overall score descending (ties by keyword), split off unscored
/// keywords and keep the first `top_n` scored ones. `top_n == 0` keeps all.
pub fn rank(
    evaluations: Vec<KeywordEvaluation>,
    top_n: usize,
) -> (Vec<KeywordEvaluation>, Vec<KeywordEvaluation>) {
    let (mut scored, unscored): (Vec<_>, Vec<_>) =
        evaluations.into_iter().partition(KeywordEvaluation::is_scored);
    scored.sort_by(|a, b| {
        b.overall
            .breakdown
            .final_score
            .total_cmp(&a.overall.breakdown.final_score)
            .then_with(|| a.keyword.cmp(&b.keyword))
    });
    if top_n > 0 {
        scored.truncate(top_n);
    }
    (scored, unscored)
}

/// Quick-screen filter over overall rows: low supply, enough interest and,
/// optionally, rising.
#[derive(Debug, Clone, PartialEq)]
pub struct OpportunityFilter {
    pub min_interest: f64,
    pub max_supply: u64,
    pub require_rising: bool,
}

impl From<&FilterConfig> for OpportunityFilter {
    fn from(cfg: &FilterConfig) -> Self {
        Self {
            min_interest: cfg.min_interest,
            max_supply: cfg.max_supply,
            require_rising: cfg.require_rising,
        }
    }
}

impl OpportunityFilter {
    pub fn matches(&self, row: &ReportRow) -> bool {
        let Some(supply) = row.total_supply else {
            return false;
        };
        supply <= self.max_supply
            && row.avg_interest >= self.min_interest
            && (!self.require_rising || row.is_rising)
    }

    pub fn apply<'a>(&self, rows: impl IntoIterator<Item = &'a ReportRow>) -> Vec<ReportRow> {
        rows.into_iter().filter(|r| self.matches(r)).cloned().collect()
    }
}
