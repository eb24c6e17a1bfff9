//! Scoring formula generations behind one contract.
//!
//! Each strategy turns the same demand/supply/context inputs into a
//! [`ScoreBreakdown`]. They share the edge-case policy: unavailable supply is
//! unscored, non-positive demand scores zero, and the final score is clamped
//! to 0–100.

use crate::config::{ScoringConfig, REVENUE_PRICE_SCALE};
use crate::engine::demand::demand_signal;
use crate::engine::score::{clamp_score, momentum_multiplier, saturation_penalty};
use crate::engine::supply::{competition_level, supply_pressure};
use crate::types::{ScoreBreakdown, StrategyKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandInput {
    pub monthly_searches: u64,
    /// 0–100
    pub purchase_intent: f64,
    pub avg_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupplyInput {
    /// None = supply data unavailable.
    pub total_supply: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreContext {
    /// Signed trend slope for the evaluated period.
    pub trend_velocity: f64,
}

pub trait ScoringStrategy: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> StrategyKind;

    fn score(&self, demand: &DemandInput, supply: &SupplyInput, ctx: &ScoreContext) -> ScoreBreakdown;
}

pub fn build_strategy(cfg: &ScoringConfig) -> Box<dyn ScoringStrategy> {
    match cfg.strategy {
        StrategyKind::Ratio => Box::new(RatioStrategy),
        StrategyKind::Revenue => Box::new(RevenueStrategy { cfg: cfg.clone() }),
        StrategyKind::LogPressure => Box::new(LogPressureStrategy { cfg: cfg.clone() }),
        StrategyKind::Momentum => Box::new(MomentumStrategy { cfg: cfg.clone() }),
    }
}

/// Outcome of the shared edge-case checks.
enum Prepared {
    Ready { signal: f64, total: u64, pressure: f64 },
    Settled(ScoreBreakdown),
}

fn prepare(
    kind: StrategyKind,
    demand: &DemandInput,
    supply: &SupplyInput,
    ctx: &ScoreContext,
    pressure_of: fn(u64) -> f64,
) -> Prepared {
    let Some(total) = supply.total_supply else {
        return Prepared::Settled(ScoreBreakdown::unscored(kind, ctx.trend_velocity));
    };
    let pressure = pressure_of(total);
    let signal = demand_signal(demand.monthly_searches, demand.purchase_intent);

    if signal <= 0.0 || pressure <= 0.0 {
        // Zeroed breakdown. The raw total stays so the row still reports it
        // and the keyword counts as scored.
        return Prepared::Settled(ScoreBreakdown {
            strategy: kind,
            demand_signal: 0.0,
            supply_pressure: 0.0,
            base_ratio: 0.0,
            momentum_multiplier: 1.0,
            price_factor: 1.0,
            saturation_penalty: 0.0,
            raw_score: 0.0,
            final_score: 0.0,
            total_supply: Some(total),
            competition: None,
            trend_velocity: ctx.trend_velocity,
        });
    }

    Prepared::Ready { signal, total, pressure }
}

// ---------------------------------------------------------------------------
// ratio: demand / (supply + 1)
// ---------------------------------------------------------------------------

/// Linear density. No momentum, no saturation penalty; the ratio itself is
/// the score.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatioStrategy;

fn linear_pressure(total: u64) -> f64 {
    total as f64 + 1.0
}

impl ScoringStrategy for RatioStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Ratio
    }

    fn score(&self, demand: &DemandInput, supply: &SupplyInput, ctx: &ScoreContext) -> ScoreBreakdown {
        let (signal, total, pressure) = match prepare(self.kind(), demand, supply, ctx, linear_pressure) {
            Prepared::Ready { signal, total, pressure } => (signal, total, pressure),
            Prepared::Settled(b) => return b,
        };
        let base_ratio = signal / pressure;
        ScoreBreakdown {
            strategy: self.kind(),
            demand_signal: signal,
            supply_pressure: pressure,
            base_ratio,
            momentum_multiplier: 1.0,
            price_factor: 1.0,
            saturation_penalty: 0.0,
            raw_score: base_ratio,
            final_score: clamp_score(base_ratio),
            total_supply: Some(total),
            competition: Some(competition_level(total)),
            trend_velocity: ctx.trend_velocity,
        }
    }
}

// ---------------------------------------------------------------------------
// log-pressure family
// ---------------------------------------------------------------------------

/// Shared body of the log-pressure strategies.
fn log_pressure_score(
    kind: StrategyKind,
    cfg: &ScoringConfig,
    demand: &DemandInput,
    supply: &SupplyInput,
    ctx: &ScoreContext,
    use_momentum: bool,
    price_factor: f64,
) -> ScoreBreakdown {
    let (signal, total, pressure) = match prepare(kind, demand, supply, ctx, supply_pressure) {
        Prepared::Ready { signal, total, pressure } => (signal, total, pressure),
        Prepared::Settled(b) => return b,
    };

    let base_ratio = signal / pressure;
    let momentum = if use_momentum {
        momentum_multiplier(ctx.trend_velocity, cfg.momentum_factor, cfg.momentum_cap)
    } else {
        1.0
    };
    let raw_score = base_ratio * momentum * price_factor / cfg.calibration_divisor;
    let penalty = saturation_penalty(total, cfg);

    ScoreBreakdown {
        strategy: kind,
        demand_signal: signal,
        supply_pressure: pressure,
        base_ratio,
        momentum_multiplier: momentum,
        price_factor,
        saturation_penalty: penalty,
        raw_score,
        final_score: clamp_score(raw_score - penalty),
        total_supply: Some(total),
        competition: Some(competition_level(total)),
        trend_velocity: ctx.trend_velocity,
    }
}

/// Log-compressed supply, saturation penalty, no momentum.
#[derive(Debug, Clone)]
pub struct LogPressureStrategy {
    pub cfg: ScoringConfig,
}

impl ScoringStrategy for LogPressureStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LogPressure
    }

    fn score(&self, demand: &DemandInput, supply: &SupplyInput, ctx: &ScoreContext) -> ScoreBreakdown {
        log_pressure_score(self.kind(), &self.cfg, demand, supply, ctx, false, 1.0)
    }
}

/// Log-compressed supply amplified by positive momentum. The default.
#[derive(Debug, Clone)]
pub struct MomentumStrategy {
    pub cfg: ScoringConfig,
}

impl ScoringStrategy for MomentumStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Momentum
    }

    fn score(&self, demand: &DemandInput, supply: &SupplyInput, ctx: &ScoreContext) -> ScoreBreakdown {
        log_pressure_score(self.kind(), &self.cfg, demand, supply, ctx, true, 1.0)
    }
}

/// Momentum formula weighted by average selling price relative to
/// REVENUE_PRICE_SCALE. A missing price is neutral (factor 1.0).
#[derive(Debug, Clone)]
pub struct RevenueStrategy {
    pub cfg: ScoringConfig,
}

impl ScoringStrategy for RevenueStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Revenue
    }

    fn score(&self, demand: &DemandInput, supply: &SupplyInput, ctx: &ScoreContext) -> ScoreBreakdown {
        let price_factor = demand
            .avg_price
            .filter(|p| p.is_finite() && *p >= 0.0)
            .map_or(1.0, |p| p / REVENUE_PRICE_SCALE);
        log_pressure_score(self.kind(), &self.cfg, demand, supply, ctx, true, price_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demand(monthly: u64, intent: f64) -> DemandInput {
        DemandInput { monthly_searches: monthly, purchase_intent: intent, avg_price: None }
    }

    fn supply(total: u64) -> SupplyInput {
        SupplyInput { total_supply: Some(total) }
    }

    fn ctx(v: f64) -> ScoreContext {
        ScoreContext { trend_velocity: v }
    }

    fn strategy(kind: StrategyKind) -> Box<dyn ScoringStrategy> {
        build_strategy(&ScoringConfig { strategy: kind, ..ScoringConfig::default() })
    }

    #[test]
    fn build_strategy_respects_kind() {
        for kind in [
            StrategyKind::Ratio,
            StrategyKind::Revenue,
            StrategyKind::LogPressure,
            StrategyKind::Momentum,
        ] {
            assert_eq!(strategy(kind).kind(), kind);
        }
    }

    #[test]
    fn ratio_strategy_is_linear_density() {
        let b = strategy(StrategyKind::Ratio).score(&demand(10_000, 70.0), &supply(100), &ctx(5.0));
        assert!((b.supply_pressure - 101.0).abs() < 1e-9);
        assert!((b.base_ratio - 7_000.0 / 101.0).abs() < 1e-9);
        assert_eq!(b.momentum_multiplier, 1.0);
        assert!((b.final_score - 69.306_930_693).abs() < 1e-6);
    }

    #[test]
    fn log_pressure_ignores_momentum() {
        let b = strategy(StrategyKind::LogPressure).score(&demand(1_000, 50.0), &supply(0), &ctx(3.0));
        assert_eq!(b.momentum_multiplier, 1.0);
        // 500 / 1.0 / 50
        assert!((b.final_score - 10.0).abs() < 1e-9);
    }

    #[test]
    fn revenue_weights_by_price() {
        let s = strategy(StrategyKind::Revenue);
        let cheap = s.score(
            &DemandInput { avg_price: Some(12.5), ..demand(1_000, 50.0) },
            &supply(0),
            &ctx(0.0),
        );
        let dear = s.score(
            &DemandInput { avg_price: Some(50.0), ..demand(1_000, 50.0) },
            &supply(0),
            &ctx(0.0),
        );
        let unknown = s.score(&demand(1_000, 50.0), &supply(0), &ctx(0.0));
        assert!((cheap.price_factor - 0.5).abs() < 1e-12);
        assert!((dear.price_factor - 2.0).abs() < 1e-12);
        assert_eq!(unknown.price_factor, 1.0);
        assert!(cheap.final_score < unknown.final_score);
        assert!(unknown.final_score < dear.final_score);
    }

    #[test]
    fn every_strategy_flags_missing_supply() {
        for kind in [
            StrategyKind::Ratio,
            StrategyKind::Revenue,
            StrategyKind::LogPressure,
            StrategyKind::Momentum,
        ] {
            let b = strategy(kind).score(
                &demand(10_000, 70.0),
                &SupplyInput { total_supply: None },
                &ctx(1.0),
            );
            assert!(!b.is_scored());
            assert_eq!(b.final_score, 0.0);
            assert_eq!(b.demand_signal, 0.0);
        }
    }

    #[test]
    fn zero_demand_zeroes_breakdown() {
        for kind in [StrategyKind::Ratio, StrategyKind::Revenue, StrategyKind::LogPressure, StrategyKind::Momentum] {
            let b = strategy(kind).score(&demand(0, 70.0), &supply(300), &ctx(1.0));
            assert!(b.is_scored(), "{kind}");
            assert_eq!(b.total_supply, Some(300));
            assert_eq!(b.final_score, 0.0);
            assert_eq!(b.raw_score, 0.0);
            assert_eq!(b.demand_signal, 0.0);
            assert_eq!(b.supply_pressure, 0.0);
            assert_eq!(b.base_ratio, 0.0);
            assert_eq!(b.saturation_penalty, 0.0);
            assert_eq!(b.momentum_multiplier, 1.0);
            assert_eq!(b.competition, None);
        }
    }

    #[test]
    fn zero_intent_zeroes_breakdown() {
        let b = strategy(StrategyKind::Momentum).score(&demand(10_000, 0.0), &supply(50), &ctx(0.5));
        assert_eq!(b.final_score, 0.0);
        assert_eq!(b.supply_pressure, 0.0);
        assert_eq!(b.competition, None);
    }
}
