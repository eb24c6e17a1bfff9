//! Demand/supply opportunity scoring.
//!
//! Every function here is pure: no I/O, no shared mutable state. The
//! [`Engine`] is `Send + Sync` and can be shared across tasks as-is.

pub mod demand;
pub mod score;
pub mod strategy;
pub mod supply;
pub mod temporal;
pub mod trend;
pub mod verdict;

use crate::config::ScoringConfig;
use crate::types::{KeywordDemandRecord, KeywordEvaluation, KeywordSupplyRecord, PeriodResult, StrategyKind};

use score::{OpportunityScorer, ScoreInput};
use temporal::{PeriodDemand, TemporalAnalyzer};
use verdict::{VerdictGenerator, VerdictInput};

#[derive(Debug)]
pub struct Engine {
    scorer: OpportunityScorer,
    verdicts: VerdictGenerator,
    temporal: TemporalAnalyzer,
}

impl Engine {
    pub fn new(cfg: &ScoringConfig) -> Self {
        Self {
            scorer: OpportunityScorer::new(cfg),
            verdicts: VerdictGenerator::new(cfg),
            temporal: TemporalAnalyzer::new(cfg.searches_per_interest_point),
        }
    }

    pub fn strategy(&self) -> StrategyKind {
        self.scorer.kind()
    }

    /// Score one period of a keyword. Intent, price and supply are the
    /// keyword's fixed values; only `period` carries time-varying demand.
    pub fn evaluate_period(
        &self,
        demand: &KeywordDemandRecord,
        supply: &KeywordSupplyRecord,
        period: PeriodDemand,
    ) -> PeriodResult {
        let breakdown = self.scorer.score(&ScoreInput {
            monthly_searches: period.monthly_searches,
            purchase_intent: demand.purchase_intent,
            total_supply: supply.total_supply,
            trend_velocity: period.trend_velocity,
            avg_price: demand.avg_price,
        });
        let verdict = self.verdicts.generate(&VerdictInput {
            breakdown: &breakdown,
            max_single_marketplace: supply.max_single(),
            consistency: period.consistency,
            is_rising: period.is_rising,
        });
        PeriodResult {
            period: period.period,
            points: period.points,
            avg_interest: period.avg_interest,
            monthly_searches: period.monthly_searches,
            trend_velocity: period.trend_velocity,
            is_rising: period.is_rising,
            breakdown,
            verdict,
        }
    }

    /// Overall score plus, when `temporal` is set, one result per non-empty
    /// trailing window.
    pub fn evaluate(
        &self,
        demand: KeywordDemandRecord,
        supply: KeywordSupplyRecord,
        temporal: bool,
    ) -> KeywordEvaluation {
        let overall = self.evaluate_period(&demand, &supply, temporal::overall(&demand));
        let periods = if temporal {
            self.temporal
                .analyze(&demand)
                .into_iter()
                .map(|p| self.evaluate_period(&demand, &supply, p))
                .collect()
        } else {
            Vec::new()
        };
        KeywordEvaluation { keyword: demand.keyword.clone(), demand, supply, overall, periods }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::engine::demand::build_record;
    use crate::types::{InterestPoint, Period, SupplyCount, TemporalWindow, VerdictTier};

    fn demand(values: &[u32], intent: f64, monthly: Option<u64>) -> KeywordDemandRecord {
        let history = values
            .iter()
            .enumerate()
            .map(|(i, &value)| InterestPoint { date: format!("2024-01-{:02}", i + 1), value })
            .collect();
        build_record("plush", history, intent, None, monthly, 1_000.0).unwrap()
    }

    fn supply(counts: &[(&str, SupplyCount)]) -> KeywordSupplyRecord {
        let map: BTreeMap<String, SupplyCount> =
            counts.iter().map(|(m, c)| (m.to_string(), *c)).collect();
        KeywordSupplyRecord::new("plush", map)
    }

    #[test]
    fn evaluates_overall_and_windows_with_uniform_fields() {
        let engine = Engine::new(&ScoringConfig::default());
        let eval = engine.evaluate(
            demand(&[20, 30, 40, 50, 60], 70.0, Some(10_000)),
            supply(&[("ebay", SupplyCount::Available(60)), ("etsy", SupplyCount::Available(40))]),
            true,
        );
        assert_eq!(eval.keyword, "plush");
        assert_eq!(eval.overall.period, Period::Overall);
        assert_eq!(eval.overall.monthly_searches, 10_000);
        assert_eq!(eval.overall.breakdown.total_supply, Some(100));
        assert_eq!(eval.periods.len(), 5);
        for p in std::iter::once(&eval.overall).chain(&eval.periods) {
            assert!((0.0..=100.0).contains(&p.breakdown.final_score));
            assert_eq!(p.breakdown.total_supply, Some(100));
            assert!(!p.verdict.headline.is_empty());
        }
    }

    #[test]
    fn window_verdicts_quote_window_consistency() {
        let mut values: Vec<u32> = (0..13).map(|i| if i % 2 == 0 { 5 } else { 60 }).collect();
        values.extend([90; 7]);
        let engine = Engine::new(&ScoringConfig::default());
        let eval = engine.evaluate(
            demand(&values, 70.0, None),
            supply(&[("ebay", SupplyCount::Available(200))]),
            true,
        );
        let week = eval
            .periods
            .iter()
            .find(|p| p.period == Period::Window(TemporalWindow::SevenDays))
            .unwrap();
        assert!(week.verdict.text().contains("Interest consistency 100%."), "{}", week.verdict.text());
        assert!(!eval.overall.verdict.text().contains("Interest consistency 100%."));
    }

    #[test]
    fn temporal_off_yields_only_overall() {
        let engine = Engine::new(&ScoringConfig::default());
        let eval = engine.evaluate(
            demand(&[20, 30], 50.0, None),
            supply(&[("ebay", SupplyCount::Available(10))]),
            false,
        );
        assert!(eval.periods.is_empty());
    }

    #[test]
    fn missing_supply_leaves_keyword_unscored() {
        let engine = Engine::new(&ScoringConfig::default());
        let eval = engine.evaluate(
            demand(&[80, 90], 90.0, Some(100_000)),
            supply(&[("ebay", SupplyCount::Unavailable)]),
            true,
        );
        assert!(!eval.is_scored());
        assert_eq!(eval.overall.verdict.tier, VerdictTier::NoData);
        assert!(eval.periods.iter().all(|p| p.breakdown.final_score == 0.0));
    }

    #[test]
    fn overflowing_marketplace_is_avoided() {
        let engine = Engine::new(&ScoringConfig::default());
        let eval = engine.evaluate(
            demand(&[80, 90], 90.0, Some(10_000_000)),
            supply(&[("amazon", SupplyCount::Available(60_000))]),
            false,
        );
        assert_eq!(eval.overall.verdict.tier, VerdictTier::Avoid);
        assert_eq!(eval.overall.verdict.rule, "marketplace_overflow");
    }
}
