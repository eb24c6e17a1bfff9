//! Trailing-window re-evaluation of one keyword's demand history.
//!
//! Only the demand side varies per window: each window gets its own average
//! interest, slope and monthly-search estimate. Purchase intent and supply are
//! fixed for the keyword and applied by the caller.

use crate::engine::demand::estimate_monthly_searches;
use crate::engine::trend;
use crate::types::{KeywordDemandRecord, Period, TemporalWindow};

/// Demand figures for one evaluation period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodDemand {
    pub period: Period,
    pub points: usize,
    pub avg_interest: f64,
    pub monthly_searches: u64,
    pub trend_velocity: f64,
    /// None when the period's mean interest is zero.
    pub consistency: Option<f64>,
    pub is_rising: bool,
}

/// Positive slope, or a spike on the latest point.
pub fn is_rising(values: &[f64]) -> bool {
    trend::slope(values) > 0.0 || trend::recent_spike(values)
}

/// Whole-history figures; uses the record's monthly searches as given.
pub fn overall(record: &KeywordDemandRecord) -> PeriodDemand {
    let values = record.values();
    PeriodDemand {
        period: Period::Overall,
        points: values.len(),
        avg_interest: record.avg_interest,
        monthly_searches: record.monthly_searches,
        trend_velocity: record.trend_slope,
        consistency: record.trend_consistency,
        is_rising: is_rising(&values),
    }
}

#[derive(Debug, Clone)]
pub struct TemporalAnalyzer {
    /// Searches per interest point when the record's own ratio is undefined.
    fallback_per_point: f64,
}

impl TemporalAnalyzer {
    pub fn new(fallback_per_point: f64) -> Self {
        Self { fallback_per_point }
    }

    /// Trailing `days` points, or the whole history when shorter. None when
    /// there is nothing to evaluate.
    pub fn window(&self, record: &KeywordDemandRecord, window: TemporalWindow) -> Option<PeriodDemand> {
        let values = record.values();
        if values.is_empty() {
            return None;
        }
        let start = values.len().saturating_sub(window.days());
        let slice = &values[start..];

        let avg_interest = trend::mean(slice);
        let per_point = record.searches_per_point(self.fallback_per_point);
        Some(PeriodDemand {
            period: Period::Window(window),
            points: slice.len(),
            avg_interest,
            monthly_searches: estimate_monthly_searches(avg_interest, per_point),
            trend_velocity: trend::slope(slice),
            consistency: (avg_interest > 0.0).then(|| trend::consistency(slice)),
            is_rising: is_rising(slice),
        })
    }

    /// Every window, shortest first; empty windows are absent.
    pub fn analyze(&self, record: &KeywordDemandRecord) -> Vec<PeriodDemand> {
        TemporalWindow::ALL
            .iter()
            .filter_map(|w| self.window(record, *w))
            .collect()
    }
}
