use crate::config::ScoringConfig;
use crate::engine::strategy::{build_strategy, DemandInput, ScoreContext, ScoringStrategy, SupplyInput};
use crate::types::{ScoreBreakdown, StrategyKind};

/// Flat inputs of one score evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInput {
    pub monthly_searches: u64,
    /// 0–100
    pub purchase_intent: f64,
    /// None = supply data unavailable (disqualifying).
    pub total_supply: Option<u64>,
    /// Signed; typically a trend slope.
    pub trend_velocity: f64,
    pub avg_price: Option<f64>,
}

/// `clamp(1 + max(0, v) × factor, 1.0, cap)`. Falling interest never drops
/// below the neutral 1.0.
pub fn momentum_multiplier(trend_velocity: f64, factor: f64, cap: f64) -> f64 {
    let boost = 1.0 + trend_velocity.max(0.0) * factor;
    if boost.is_nan() {
        return 1.0;
    }
    boost.clamp(1.0, cap.max(1.0))
}

/// Tiered deduction for structurally oversaturated markets. Thresholds are
/// inclusive so the first penalised count is also the first "extreme" tier count.
pub fn saturation_penalty(total_supply: u64, cfg: &ScoringConfig) -> f64 {
    if total_supply >= cfg.saturation_extreme_threshold {
        cfg.saturation_extreme_penalty
    } else if total_supply >= cfg.saturation_high_threshold {
        cfg.saturation_high_penalty
    } else {
        0.0
    }
}

pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, 100.0)
}

/// Applies the configured scoring strategy. Stateless and side-effect free;
/// safe to share across threads.
#[derive(Debug)]
pub struct OpportunityScorer {
    strategy: Box<dyn ScoringStrategy>,
}

impl OpportunityScorer {
    pub fn new(cfg: &ScoringConfig) -> Self {
        Self { strategy: build_strategy(cfg) }
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn score(&self, input: &ScoreInput) -> ScoreBreakdown {
        let demand = DemandInput {
            monthly_searches: input.monthly_searches,
            purchase_intent: input.purchase_intent,
            avg_price: input.avg_price,
        };
        let supply = SupplyInput { total_supply: input.total_supply };
        let ctx = ScoreContext { trend_velocity: input.trend_velocity };
        self.strategy.score(&demand, &supply, &ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompetitionLevel;

    fn scorer() -> OpportunityScorer {
        OpportunityScorer::new(&ScoringConfig::default())
    }

    fn input(monthly: u64, intent: f64, supply: Option<u64>, velocity: f64) -> ScoreInput {
        ScoreInput {
            monthly_searches: monthly,
            purchase_intent: intent,
            total_supply: supply,
            trend_velocity: velocity,
            avg_price: None,
        }
    }

    fn approx(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn hot_niche_caps_at_100() {
        let b = scorer().score(&input(10_000, 70.0, Some(100), 1.5));
        assert!(approx(b.demand_signal, 7_000.0, 1e-9));
        assert!(approx(b.supply_pressure, 2.0414, 1e-4));
        assert!(approx(b.base_ratio, 3_429.0, 1.0));
        assert!(approx(b.momentum_multiplier, 1.75, 1e-12));
        assert!(b.raw_score > 100.0);
        assert_eq!(b.saturation_penalty, 0.0);
        assert_eq!(b.final_score, 100.0);
        assert_eq!(b.competition, Some(CompetitionLevel::Low));
    }

    #[test]
    fn saturated_niche_clamps_at_zero() {
        let b = scorer().score(&input(5_000, 30.0, Some(10_000), 0.1));
        assert!(approx(b.demand_signal, 1_500.0, 1e-9));
        assert!(approx(b.supply_pressure, 4.0004, 1e-4));
        assert!(approx(b.base_ratio, 374.96, 0.01));
        assert!(approx(b.momentum_multiplier, 1.05, 1e-12));
        assert!(approx(b.raw_score, 7.87, 0.01));
        assert_eq!(b.saturation_penalty, 10.0);
        assert_eq!(b.final_score, 0.0);
        assert_eq!(b.competition, Some(CompetitionLevel::Extreme));
    }

    #[test]
    fn failed_supply_is_zeroed_and_flagged() {
        let b = scorer().score(&input(10_000, 70.0, None, 1.5));
        assert_eq!(b.final_score, 0.0);
        assert_eq!(b.demand_signal, 0.0);
        assert_eq!(b.supply_pressure, 0.0);
        assert_eq!(b.base_ratio, 0.0);
        assert_eq!(b.saturation_penalty, 0.0);
        assert_eq!(b.competition, None);
        assert!(!b.is_scored());
    }

    #[test]
    fn momentum_is_neutral_for_negative_velocity() {
        assert_eq!(momentum_multiplier(-3.0, 0.5, 2.0), 1.0);
        assert_eq!(momentum_multiplier(0.0, 0.5, 2.0), 1.0);
        assert_eq!(momentum_multiplier(f64::NAN, 0.5, 2.0), 1.0);
    }

    #[test]
    fn momentum_is_monotone_and_capped() {
        let mut prev = 1.0;
        for step in 0..100 {
            let m = momentum_multiplier(step as f64 * 0.05, 0.5, 2.0);
            assert!(m >= prev);
            assert!(m <= 2.0);
            prev = m;
        }
        assert_eq!(momentum_multiplier(f64::INFINITY, 0.5, 2.0), 2.0);
    }

    #[test]
    fn saturation_penalty_tiers() {
        let cfg = ScoringConfig::default();
        assert_eq!(saturation_penalty(9_999, &cfg), 0.0);
        assert_eq!(saturation_penalty(10_000, &cfg), 10.0);
        assert_eq!(saturation_penalty(19_999, &cfg), 10.0);
        assert_eq!(saturation_penalty(20_000, &cfg), 15.0);
    }

    #[test]
    fn final_score_bounded_for_extremes() {
        let s = scorer();
        let cases = [
            input(0, 0.0, Some(10_000_000), 0.0),
            input(u64::MAX, 100.0, Some(0), f64::MAX),
            input(u64::MAX, 100.0, Some(u64::MAX), -f64::MAX),
            input(1, 0.001, Some(10_000_000), 1e9),
            input(50, 100.0, Some(0), f64::NAN),
        ];
        for c in cases {
            let b = s.score(&c);
            assert!((0.0..=100.0).contains(&b.final_score), "{c:?} -> {}", b.final_score);
            assert!((1.0..=2.0).contains(&b.momentum_multiplier));
        }
    }

    #[test]
    fn more_supply_never_raises_score() {
        let s = scorer();
        let mut prev = f64::INFINITY;
        for supply in [0u64, 10, 99, 500, 5_000, 10_000, 10_001, 20_001, 1_000_000] {
            let score = s.score(&input(40_000, 60.0, Some(supply), 0.4)).final_score;
            assert!(score <= prev, "supply {supply}: {score} > {prev}");
            prev = score;
        }
    }

    #[test]
    fn more_demand_never_lowers_score() {
        let s = scorer();
        let mut prev = 0.0;
        for monthly in [0u64, 100, 1_000, 5_000, 20_000, 100_000] {
            let score = s.score(&input(monthly, 45.0, Some(800), 0.2)).final_score;
            assert!(score >= prev);
            prev = score;
        }
    }

    #[test]
    fn scoring_is_deterministic() {
        let s = scorer();
        let i = input(12_345, 55.5, Some(321), 0.77);
        assert_eq!(s.score(&i), s.score(&i));
    }

    #[test]
    fn calibration_divisor_is_configurable() {
        let cfg = ScoringConfig { calibration_divisor: 100.0, ..ScoringConfig::default() };
        let half = OpportunityScorer::new(&cfg).score(&input(1_000, 50.0, Some(0), 0.0));
        let full = scorer().score(&input(1_000, 50.0, Some(0), 0.0));
        assert!(approx(half.final_score * 2.0, full.final_score, 1e-9));
    }
}
