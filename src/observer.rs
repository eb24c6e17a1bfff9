//! Progress narration for pipeline runs.

use tracing::{info, warn};

use crate::types::KeywordEvaluation;

/// Hooks invoked by [`crate::pipeline::Pipeline`] as a run progresses.
/// Default methods do nothing so implementors pick what they care about.
pub trait PipelineObserver: Send + Sync {
    fn run_started(&self, _run_id: &str, _keywords: usize) {}

    fn demand_fetched(&self, _keyword: &str, _points: usize) {}

    /// Keyword dropped before scoring, with a short reason.
    fn keyword_skipped(&self, _keyword: &str, _reason: &str) {}

    fn keyword_evaluated(&self, _evaluation: &KeywordEvaluation) {}

    fn run_finished(&self, _run_id: &str, _ranked: usize, _unscored: usize, _skipped: usize) {}
}

/// Writes each hook as a tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn run_started(&self, run_id: &str, keywords: usize) {
        info!(run_id, keywords, "analysis run started: {keywords} keywords");
    }

    fn demand_fetched(&self, keyword: &str, points: usize) {
        tracing::debug!(keyword, points, "demand history received");
    }

    fn keyword_skipped(&self, keyword: &str, reason: &str) {
        warn!(keyword, reason, "keyword skipped: {reason}");
    }

    fn keyword_evaluated(&self, e: &KeywordEvaluation) {
        let b = &e.overall.breakdown;
        info!(
            keyword = %e.keyword,
            score = b.final_score,
            demand = b.demand_signal,
            supply = ?b.total_supply,
            tier = %e.overall.verdict.tier,
            periods = e.periods.len(),
            "SCORED | {} | {:.1}/100 | {}",
            e.keyword,
            b.final_score,
            e.overall.verdict.tier,
        );
    }

    fn run_finished(&self, run_id: &str, ranked: usize, unscored: usize, skipped: usize) {
        info!(
            run_id,
            ranked,
            unscored,
            skipped,
            "analysis run complete: {ranked} ranked, {unscored} without supply data, {skipped} without demand",
        );
    }
}
