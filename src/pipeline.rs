//! One analysis run: collect demand, collect supply, score, rank, persist.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::CollectorLatency;
use crate::config::Config;
use crate::db::DbWriter;
use crate::engine::demand::build_record;
use crate::engine::Engine;
use crate::error::{AppError, Result};
use crate::fetcher::{collect_supply, DemandSource, SupplySource};
use crate::observer::PipelineObserver;
use crate::report::{self, csv_writer, timeline, ReportRow};
use crate::state::ReportStore;
use crate::timefmt::{format_run_id, now_millis};
use crate::types::{KeywordDemandRecord, KeywordEvaluation, StrategyKind};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub fetch_concurrency: usize,
    /// 0 keeps every scored keyword.
    pub top_n: usize,
    pub temporal: bool,
    pub searches_per_point: f64,
    /// None disables the CSV reports.
    pub output_dir: Option<PathBuf>,
    /// None disables the timeline JSON files.
    pub timeline_dir: Option<PathBuf>,
}

impl PipelineSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            fetch_concurrency: cfg.fetch_concurrency.max(1),
            top_n: cfg.top_n_results,
            temporal: cfg.temporal_analysis,
            searches_per_point: cfg.scoring.searches_per_interest_point,
            output_dir: Some(PathBuf::from(&cfg.output_dir)),
            timeline_dir: Some(PathBuf::from(&cfg.timeline_dir)),
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: u64,
    pub finished_at: u64,
    pub strategy: StrategyKind,
    pub requested: usize,
    /// Every keyword this run was asked about, normalised.
    pub keywords: Vec<String>,
    /// Scored keywords, best first, truncated to top N.
    pub ranked: Vec<KeywordEvaluation>,
    /// Keywords without supply data.
    pub unscored: Vec<String>,
    /// Keywords without demand history or whose demand fetch failed.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: u64,
    pub finished_at: u64,
    pub strategy: StrategyKind,
    pub requested: usize,
    pub ranked: usize,
    pub unscored: usize,
    pub skipped: usize,
    pub top_keyword: Option<String>,
    pub top_score: Option<f64>,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        let top = self.ranked.first();
        RunSummary {
            run_id: self.run_id.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            strategy: self.strategy,
            requested: self.requested,
            ranked: self.ranked.len(),
            unscored: self.unscored.len(),
            skipped: self.skipped.len(),
            top_keyword: top.map(|e| e.keyword.clone()),
            top_score: top.map(|e| e.overall.breakdown.final_score),
        }
    }

    pub fn overall_rows(&self) -> Vec<ReportRow> {
        report::overall_rows(&self.ranked)
    }

    pub fn period_rows(&self) -> Vec<ReportRow> {
        report::period_rows(&self.ranked)
    }
}

/// Case-insensitive de-duplication, first spelling wins, blanks dropped.
pub fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty() && seen.insert(k.to_lowercase()))
        .map(str::to_string)
        .collect()
}

pub struct Pipeline {
    engine: Engine,
    demand: Arc<dyn DemandSource>,
    supply: Arc<dyn SupplySource>,
    store: Arc<ReportStore>,
    health: Arc<HealthState>,
    latency: Arc<CollectorLatency>,
    observer: Arc<dyn PipelineObserver>,
    db: Option<DbWriter>,
    settings: PipelineSettings,
    /// Runs are serialised; a second caller waits for the first to finish.
    run_lock: tokio::sync::Mutex<()>,
    run_seq: AtomicU64,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: Engine,
        demand: Arc<dyn DemandSource>,
        supply: Arc<dyn SupplySource>,
        store: Arc<ReportStore>,
        health: Arc<HealthState>,
        latency: Arc<CollectorLatency>,
        observer: Arc<dyn PipelineObserver>,
        db: Option<DbWriter>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            engine,
            demand,
            supply,
            store,
            health,
            latency,
            observer,
            db,
            settings,
            run_lock: tokio::sync::Mutex::new(()),
            run_seq: AtomicU64::new(0),
        }
    }

    pub async fn run(&self, keywords: &[String]) -> Result<RunReport> {
        let keywords = normalize_keywords(keywords);
        if keywords.is_empty() {
            return Err(AppError::Validation("no keywords to analyse".to_string()));
        }

        let _guard = self.run_lock.lock().await;
        self.health.set_run_in_progress(true);
        let result = self.run_locked(keywords).await;
        self.health.set_run_in_progress(false);
        match &result {
            Ok(report) => self.health.record_success(report.finished_at),
            Err(_) => self.health.record_failure(),
        }
        result
    }

    async fn run_locked(&self, keywords: Vec<String>) -> Result<RunReport> {
        let started_ms = now_millis();
        let seq = self.run_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let run_id = format!(
            "{}_{:03}_{seq}",
            format_run_id(started_ms / 1_000),
            started_ms % 1_000
        );
        self.observer.run_started(&run_id, keywords.len());

        let (records, skipped) = self.collect_demand(&keywords).await;
        let evaluations = self.evaluate(records).await;
        let (ranked, unscored) = report::rank(evaluations, self.settings.top_n);

        let report = RunReport {
            run_id,
            started_at: started_ms / 1_000,
            finished_at: now_millis() / 1_000,
            strategy: self.engine.strategy(),
            requested: keywords.len(),
            keywords,
            ranked,
            unscored: unscored.into_iter().map(|e| e.keyword).collect(),
            skipped,
        };

        self.persist(&report).await;
        self.store.publish(&report);
        self.observer.run_finished(
            &report.run_id,
            report.ranked.len(),
            report.unscored.len(),
            report.skipped.len(),
        );
        Ok(report)
    }

    /// Fetch and normalise demand for every keyword, bounded by
    /// `fetch_concurrency`. Returns (records, skipped keywords).
    async fn collect_demand(&self, keywords: &[String]) -> (Vec<KeywordDemandRecord>, Vec<String>) {
        let results: Vec<(String, Result<Option<KeywordDemandRecord>>)> = stream::iter(keywords.to_vec())
            .map(|kw| async move {
                let started = Instant::now();
                let raw = self.demand.fetch_demand(&kw).await;
                self.latency.demand.record(started.elapsed());
                let record = raw.map(|raw| {
                    let intent = raw.purchase_intent();
                    build_record(
                        &kw,
                        raw.history,
                        intent,
                        raw.avg_price,
                        raw.monthly_searches,
                        self.settings.searches_per_point,
                    )
                });
                (kw, record)
            })
            .buffer_unordered(self.settings.fetch_concurrency)
            .collect()
            .await;

        let mut records = Vec::new();
        let mut skipped = Vec::new();
        for (kw, result) in results {
            match result {
                Ok(Some(record)) => {
                    self.observer.demand_fetched(&kw, record.history.len());
                    records.push(record);
                }
                Ok(None) => {
                    self.observer.keyword_skipped(&kw, "no interest history");
                    skipped.push(kw);
                }
                Err(e) => {
                    self.observer.keyword_skipped(&kw, &format!("demand fetch failed: {e}"));
                    skipped.push(kw);
                }
            }
        }
        (records, skipped)
    }

    async fn evaluate(&self, records: Vec<KeywordDemandRecord>) -> Vec<KeywordEvaluation> {
        stream::iter(records)
            .map(|record| async move {
                let started = Instant::now();
                let supply = collect_supply(self.supply.as_ref(), &record.keyword).await;
                self.latency.supply.record(started.elapsed());
                let evaluation = self.engine.evaluate(record, supply, self.settings.temporal);
                self.observer.keyword_evaluated(&evaluation);
                evaluation
            })
            .buffer_unordered(self.settings.fetch_concurrency)
            .collect()
            .await
    }

    /// CSV, timelines and database. Failures are logged; the run itself stands.
    async fn persist(&self, report: &RunReport) {
        if let Some(dir) = &self.settings.output_dir {
            if let Err(e) = csv_writer::write_reports(
                dir,
                &report.run_id,
                &report.overall_rows(),
                &report.period_rows(),
            ) {
                warn!(run_id = %report.run_id, "CSV report failed: {e}");
            }
        }
        if let Some(dir) = &self.settings.timeline_dir {
            for e in &report.ranked {
                let tl = timeline::build(&e.demand, self.settings.searches_per_point);
                if let Err(err) = timeline::write(dir, &tl) {
                    warn!(keyword = %e.keyword, "timeline export failed: {err}");
                }
            }
        }
        if let Some(db) = &self.db {
            db.record(report).await;
        }
    }
}

/// Re-runs the pipeline over a fixed keyword list on an interval.
pub struct PipelineRefresher {
    pipeline: Arc<Pipeline>,
    keywords: Vec<String>,
    every: Duration,
}

impl PipelineRefresher {
    pub fn new(pipeline: Arc<Pipeline>, keywords: Vec<String>, interval_secs: u64) -> Self {
        Self { pipeline, keywords, every: Duration::from_secs(interval_secs.max(1)) }
    }

    pub async fn run(self) {
        let mut ticker = interval(self.every);
        ticker.tick().await; // first tick is immediate; the startup run already happened

        loop {
            ticker.tick().await;
            match self.pipeline.run(&self.keywords).await {
                Ok(report) => info!(
                    run_id = %report.run_id,
                    ranked = report.ranked.len(),
                    "scheduled refresh complete"
                ),
                Err(e) => error!("scheduled refresh failed: {e}"),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::config::ScoringConfig;
    use crate::fetcher::RawDemand;
    use crate::observer::testing::RecordingObserver;
    use crate::types::{InterestPoint, SupplyCount};

    pub(crate) fn report_with(ranked: Vec<KeywordEvaluation>, unscored: Vec<String>) -> RunReport {
        RunReport {
            run_id: "20240101_000000_000_1".to_string(),
            started_at: 1_704_067_200,
            finished_at: 1_704_067_201,
            strategy: StrategyKind::Momentum,
            requested: ranked.len() + unscored.len(),
            keywords: ranked.iter().map(|e| e.keyword.clone()).chain(unscored.iter().cloned()).collect(),
            ranked,
            unscored,
            skipped: Vec::new(),
        }
    }

    struct StubDemand(HashMap<String, Vec<u32>>);

    #[async_trait]
    impl DemandSource for StubDemand {
        fn name(&self) -> &str {
            "stub"
        }

        async fn fetch_demand(&self, keyword: &str) -> Result<RawDemand> {
            let values = self
                .0
                .get(keyword)
                .ok_or_else(|| AppError::Collector(format!("{keyword}: 503")))?;
            Ok(RawDemand {
                keyword: Some(keyword.to_string()),
                history: values
                    .iter()
                    .enumerate()
                    .map(|(i, &value)| InterestPoint { date: format!("2024-02-{:02}", i + 1), value })
                    .collect(),
                purchase_intent_score: Some(60.0),
                avg_price: None,
                monthly_searches: None,
            })
        }
    }

    struct StubSupply {
        markets: Vec<String>,
        counts: HashMap<String, u64>,
    }

    #[async_trait]
    impl SupplySource for StubSupply {
        fn name(&self) -> &str {
            "stub"
        }

        fn marketplaces(&self) -> &[String] {
            &self.markets
        }

        async fn fetch_count(&self, _marketplace: &str, keyword: &str) -> Result<SupplyCount> {
            Ok(self
                .counts
                .get(keyword)
                .map_or(SupplyCount::Unavailable, |n| SupplyCount::Available(*n)))
        }
    }

    fn pipeline(observer: Arc<RecordingObserver>, db: Option<DbWriter>, top_n: usize) -> Pipeline {
        let demand = StubDemand(HashMap::from([
            ("hot".to_string(), vec![20, 40, 60, 80]),
            ("cold".to_string(), vec![5, 4, 3, 2]),
            ("ghost".to_string(), vec![50, 50]),
            ("empty".to_string(), vec![]),
        ]));
        let supply = StubSupply {
            markets: vec!["ebay".to_string()],
            counts: HashMap::from([("hot".to_string(), 50), ("cold".to_string(), 8_000)]),
        };
        Pipeline::new(
            Engine::new(&ScoringConfig::default()),
            Arc::new(demand),
            Arc::new(supply),
            ReportStore::new(),
            Arc::new(HealthState::new()),
            Arc::new(CollectorLatency::new()),
            observer,
            db,
            PipelineSettings {
                fetch_concurrency: 2,
                top_n,
                temporal: true,
                searches_per_point: 1_000.0,
                output_dir: None,
                timeline_dir: None,
            },
        )
    }

    fn kws(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn run_ranks_scored_and_separates_failures() {
        let observer = Arc::new(RecordingObserver::default());
        let p = pipeline(observer.clone(), None, 10);
        let report = p.run(&kws(&["cold", "hot", "ghost", "empty", "missing", "HOT"])).await.unwrap();

        assert_eq!(report.requested, 5);
        let ranked: Vec<_> = report.ranked.iter().map(|e| e.keyword.as_str()).collect();
        assert_eq!(ranked, ["hot", "cold"]);
        assert_eq!(report.unscored, ["ghost"]);
        let mut skipped = report.skipped.clone();
        skipped.sort();
        assert_eq!(skipped, ["empty", "missing"]);
        assert!(report.ranked.iter().all(|e| e.periods.len() == 5));

        let events = observer.events();
        assert_eq!(events.first().map(String::as_str), Some("started:5"));
        assert_eq!(events.last().map(String::as_str), Some("finished:2:1:2"));
        assert!(events.iter().any(|e| e == "skipped:empty:no interest history"));

        assert_eq!(p.store.ranked_rows().len(), 2);
        assert_eq!(p.health.runs_completed(), 1);
        assert!(!p.health.run_in_progress());
        assert_eq!(p.latency.demand.len(), 5);
        assert_eq!(p.latency.supply.len(), 3);
    }

    #[tokio::test]
    async fn top_n_truncates_ranking() {
        let p = pipeline(Arc::new(RecordingObserver::default()), None, 1);
        let report = p.run(&kws(&["hot", "cold"])).await.unwrap();
        assert_eq!(report.ranked.len(), 1);
        assert_eq!(report.summary().top_keyword.as_deref(), Some("hot"));
    }

    #[tokio::test]
    async fn truncated_keyword_is_dropped_from_store() {
        let p = pipeline(Arc::new(RecordingObserver::default()), None, 1);
        p.run(&kws(&["cold"])).await.unwrap();
        assert!(p.store.period_rows("cold").is_some());

        p.run(&kws(&["hot", "cold"])).await.unwrap();
        assert!(p.store.period_rows("cold").is_none());
        assert!(p.store.period_rows("hot").is_some());
        assert_eq!(p.store.keyword_count(), 1);
    }

    #[tokio::test]
    async fn empty_keyword_list_is_rejected() {
        let p = pipeline(Arc::new(RecordingObserver::default()), None, 10);
        assert!(matches!(p.run(&kws(&[" ", ""])).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn run_is_persisted_to_database() {
        let pool = crate::db::connect_memory().await.unwrap();
        let p = pipeline(Arc::new(RecordingObserver::default()), Some(DbWriter::new(pool.clone())), 10);
        let report = p.run(&kws(&["hot", "cold", "ghost"])).await.unwrap();

        let runs = crate::db::recent_runs(&pool, 5).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, report.run_id);
        assert_eq!(runs[0].keywords_ranked, 2);
        assert_eq!(runs[0].keywords_unscored, 1);
        assert_eq!(runs[0].top_keyword.as_deref(), Some("hot"));

        let (run_count, rows) = crate::db::totals(&pool).await.unwrap();
        assert_eq!(run_count, 1);
        assert_eq!(rows, 12);

        let history = crate::db::keyword_history(&pool, "HOT", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].rank, 1);
        assert!(history[0].is_rising);
    }

    #[test]
    fn keywords_are_deduplicated_case_insensitively() {
        assert_eq!(normalize_keywords(&kws(&[" Plush ", "plush", "", "toy"])), ["Plush", "toy"]);
    }
}
