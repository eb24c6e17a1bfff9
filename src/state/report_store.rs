use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use crate::pipeline::{RunReport, RunSummary};
use crate::report::{keyword_period_rows, ReportRow};
use crate::types::KeywordEvaluation;

/// Rank within the latest run plus the full evaluation.
#[derive(Debug, Clone)]
struct StoredEvaluation {
    rank: usize,
    evaluation: KeywordEvaluation,
}

/// In-memory view of the latest results. Pipeline writes, API reads.
///
/// Keyword lookups are case-insensitive. Evaluations from earlier runs stay
/// queryable until a later run requests the same keyword; the ranked list
/// always reflects the latest run only.
pub struct ReportStore {
    evaluations: DashMap<String, StoredEvaluation>,
    ranked: RwLock<Vec<ReportRow>>,
    last_run: RwLock<Option<RunSummary>>,
}

fn key(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

impl ReportStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            evaluations: DashMap::new(),
            ranked: RwLock::new(Vec::new()),
            last_run: RwLock::new(None),
        })
    }

    pub fn publish(&self, report: &RunReport) {
        // Anything this run looked at but did not rank (unscored, skipped or
        // cut by top N) must not keep an older run's score.
        for kw in &report.keywords {
            self.evaluations.remove(&key(kw));
        }
        for (i, e) in report.ranked.iter().enumerate() {
            self.evaluations.insert(
                key(&e.keyword),
                StoredEvaluation { rank: i + 1, evaluation: e.clone() },
            );
        }
        if let Ok(mut ranked) = self.ranked.write() {
            *ranked = report.overall_rows();
        }
        if let Ok(mut last) = self.last_run.write() {
            *last = Some(report.summary());
        }
    }

    /// Overall rows of the latest run, best first.
    pub fn ranked_rows(&self) -> Vec<ReportRow> {
        self.ranked.read().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn get(&self, keyword: &str) -> Option<KeywordEvaluation> {
        self.evaluations.get(&key(keyword)).map(|s| s.evaluation.clone())
    }

    /// Overall plus windowed rows for one keyword.
    pub fn period_rows(&self, keyword: &str) -> Option<Vec<ReportRow>> {
        self.evaluations
            .get(&key(keyword))
            .map(|s| keyword_period_rows(s.rank, &s.evaluation))
    }

    pub fn keyword_count(&self) -> usize {
        self.evaluations.len()
    }

    pub fn last_run(&self) -> Option<RunSummary> {
        self.last_run.read().ok().and_then(|l| l.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::report_with;
    use crate::report::tests::evaluation;

    #[test]
    fn publish_exposes_ranked_rows_and_periods() {
        let store = ReportStore::new();
        store.publish(&report_with(
            vec![
                evaluation("Bluey Toys", &[20, 30, 40], Some(100)),
                evaluation("roblox toy", &[10, 10, 10], Some(3_000)),
            ],
            vec![],
        ));

        let rows = store.ranked_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(store.keyword_count(), 2);

        let periods = store.period_rows("bluey toys").unwrap();
        assert_eq!(periods[0].period, "overall");
        assert_eq!(periods.len(), 6);
        assert!(store.period_rows("nope").is_none());
        assert_eq!(store.last_run().unwrap().ranked, 2);
    }

    #[test]
    fn later_run_replaces_ranking_and_drops_unscored() {
        let store = ReportStore::new();
        store.publish(&report_with(vec![evaluation("a", &[20, 30], Some(10))], vec![]));
        store.publish(&report_with(
            vec![evaluation("b", &[20, 30], Some(10))],
            vec!["a".to_string()],
        ));
        let rows = store.ranked_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].keyword, "b");
        assert!(store.get("a").is_none());
    }

    #[test]
    fn keyword_cut_by_top_n_loses_its_old_result() {
        let store = ReportStore::new();
        store.publish(&report_with(vec![evaluation("a", &[20, 30], Some(10))], vec![]));
        assert!(store.period_rows("a").is_some());

        // Second run evaluated both but kept only "b".
        let mut second = report_with(vec![evaluation("b", &[20, 30], Some(10))], vec![]);
        second.keywords.push("a".to_string());
        store.publish(&second);

        assert!(store.period_rows("a").is_none());
        assert!(store.get("A").is_none());
        assert_eq!(store.keyword_count(), 1);
        let ranked: Vec<_> = store.ranked_rows().into_iter().map(|r| r.keyword).collect();
        assert_eq!(ranked, ["b"]);
    }

    #[test]
    fn keywords_not_requested_again_stay_queryable() {
        let store = ReportStore::new();
        store.publish(&report_with(vec![evaluation("a", &[20, 30], Some(10))], vec![]));
        store.publish(&report_with(vec![evaluation("b", &[20, 30], Some(10))], vec![]));
        assert!(store.get("a").is_some());
        assert_eq!(store.keyword_count(), 2);
    }
}
