use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::api::latency::{CollectorLatency, Percentiles};
use crate::config::split_list;
use crate::db::models::{EvaluationRow, RunRow};
use crate::error::AppError;
use crate::pipeline::{Pipeline, RunSummary};
use crate::report::{timeline, OpportunityFilter, ReportRow};
use crate::state::ReportStore;

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<ReportStore>,
    pub health: Arc<HealthState>,
    pub latency: Arc<CollectorLatency>,
    pub filter: OpportunityFilter,
    pub timeline_dir: PathBuf,
    pub searches_per_point: f64,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/analyze", get(get_analyze))
        .route("/reports", get(get_reports))
        .route("/reports/:keyword/periods", get(get_keyword_periods))
        .route("/reports/:keyword/timeline", get(get_keyword_timeline))
        .route("/reports/:keyword/history", get(get_keyword_history))
        .route("/runs/summary", get(get_runs_summary))
        .route("/stats/latency", get(get_stats_latency))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
pub struct AnalyzeQuery {
    /// Comma-separated.
    pub keywords: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ReportsQuery {
    pub filtered: Option<bool>,
    pub min_score: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Deserialize, Default)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub summary: RunSummary,
    pub unscored: Vec<String>,
    pub skipped: Vec<String>,
    pub rows: Vec<ReportRow>,
}

#[derive(Serialize)]
pub struct RunsSummaryResponse {
    pub total_runs: i64,
    pub total_rows: i64,
    pub last_run: Option<RunSummary>,
    pub runs: Vec<RunRow>,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub demand: Percentiles,
    pub supply: Percentiles,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub run_in_progress: bool,
    pub last_run_at: Option<u64>,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub keywords_in_store: usize,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_analyze(
    State(state): State<ApiState>,
    Query(params): Query<AnalyzeQuery>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let keywords = split_list(params.keywords.as_deref().unwrap_or_default());
    if keywords.is_empty() {
        return Err(AppError::Validation("keywords parameter is required".to_string()));
    }
    let report = state.pipeline.run(&keywords).await?;
    Ok(Json(AnalyzeResponse {
        summary: report.summary(),
        rows: report.overall_rows(),
        unscored: report.unscored,
        skipped: report.skipped,
    }))
}

async fn get_reports(
    State(state): State<ApiState>,
    Query(params): Query<ReportsQuery>,
) -> Json<Vec<ReportRow>> {
    let mut rows = state.store.ranked_rows();
    if params.filtered.unwrap_or(false) {
        rows = state.filter.apply(&rows);
    }
    if let Some(min) = params.min_score {
        rows.retain(|r| r.opportunity_score >= min);
    }
    if let Some(limit) = params.limit {
        rows.truncate(limit);
    }
    Json(rows)
}

async fn get_keyword_periods(
    State(state): State<ApiState>,
    Path(keyword): Path<String>,
) -> Result<Json<Vec<ReportRow>>, AppError> {
    state
        .store
        .period_rows(&keyword)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no evaluation for '{keyword}'")))
}

/// Latest in-memory history first; falls back to the exported JSON file so
/// keywords from earlier processes stay reachable.
async fn get_keyword_timeline(
    State(state): State<ApiState>,
    Path(keyword): Path<String>,
) -> Result<Json<timeline::KeywordTimeline>, AppError> {
    if let Some(e) = state.store.get(&keyword) {
        return Ok(Json(timeline::build(&e.demand, state.searches_per_point)));
    }
    timeline::read(&state.timeline_dir, &keyword)
        .map(Json)
        .map_err(|_| AppError::NotFound(format!("no timeline for '{keyword}'")))
}

async fn get_keyword_history(
    State(state): State<ApiState>,
    Path(keyword): Path<String>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<EvaluationRow>>, AppError> {
    let rows = crate::db::keyword_history(&state.pool, &keyword, params.limit.unwrap_or(50)).await?;
    Ok(Json(rows))
}

async fn get_runs_summary(
    State(state): State<ApiState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<RunsSummaryResponse>, AppError> {
    let (total_runs, total_rows) = crate::db::totals(&state.pool).await?;
    let runs = crate::db::recent_runs(&state.pool, params.limit.unwrap_or(20)).await?;
    Ok(Json(RunsSummaryResponse {
        total_runs,
        total_rows,
        last_run: state.store.last_run(),
        runs,
    }))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    Json(LatencyResponse {
        demand: state.latency.demand.percentiles(),
        supply: state.latency.supply.percentiles(),
    })
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let last = state.health.last_run_at_secs();
    let status = if state.health.runs_completed() > 0 {
        "ok"
    } else if state.health.run_in_progress() {
        "starting"
    } else {
        "idle"
    };
    Json(HealthResponse {
        status: status.to_string(),
        run_in_progress: state.health.run_in_progress(),
        last_run_at: (last > 0).then_some(last),
        runs_completed: state.health.runs_completed(),
        runs_failed: state.health.runs_failed(),
        keywords_in_store: state.store.keyword_count(),
    })
}
