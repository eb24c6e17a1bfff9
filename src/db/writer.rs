use tracing::{debug, error};

use crate::error::Result;
use crate::pipeline::RunReport;
use crate::report::ReportRow;

/// Persists finished runs to SQLite. One transaction per run: either the run
/// and all of its rows land, or nothing does.
#[derive(Clone)]
pub struct DbWriter {
    pool: sqlx::SqlitePool,
}

impl DbWriter {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Logs instead of failing: a database hiccup must not lose the in-memory
    /// and CSV results of a run.
    pub async fn record(&self, report: &RunReport) {
        if let Err(e) = self.write_run(report).await {
            error!(run_id = %report.run_id, "DB write error: {e}");
        }
    }

    pub async fn write_run(&self, report: &RunReport) -> Result<()> {
        let summary = report.summary();
        let rows = report.period_rows();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO runs (
                id, started_at, finished_at, strategy,
                keywords_requested, keywords_ranked, keywords_unscored, keywords_skipped,
                top_keyword, top_score
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&summary.run_id)
        .bind(summary.started_at as i64)
        .bind(summary.finished_at as i64)
        .bind(summary.strategy.to_string())
        .bind(summary.requested as i64)
        .bind(summary.ranked as i64)
        .bind(summary.unscored as i64)
        .bind(summary.skipped as i64)
        .bind(&summary.top_keyword)
        .bind(summary.top_score)
        .execute(&mut *tx)
        .await?;

        for row in &rows {
            insert_row(&mut tx, &summary.run_id, row).await?;
        }
        tx.commit().await?;

        debug!(run_id = %summary.run_id, rows = rows.len(), "run persisted");
        Ok(())
    }
}

async fn insert_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    run_id: &str,
    r: &ReportRow,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO evaluations (
            run_id, rank, keyword, period,
            opportunity_score, demand_signal, total_supply, competition_level,
            supply_pressure, base_ratio, momentum_multiplier, saturation_penalty,
            trend_velocity, is_rising, avg_interest, monthly_searches,
            strategy, verdict_tier, verdict
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(run_id)
    .bind(r.rank as i64)
    .bind(&r.keyword)
    .bind(&r.period)
    .bind(r.opportunity_score)
    .bind(r.demand_signal)
    .bind(r.total_supply.map(|n| n.min(i64::MAX as u64) as i64))
    .bind(r.competition_level.map(|c| c.to_string()))
    .bind(r.supply_pressure)
    .bind(r.base_ratio)
    .bind(r.momentum_multiplier)
    .bind(r.saturation_penalty)
    .bind(r.trend_velocity)
    .bind(r.is_rising)
    .bind(r.avg_interest)
    .bind(r.monthly_searches.min(i64::MAX as u64) as i64)
    .bind(r.strategy.to_string())
    .bind(&r.verdict_tier)
    .bind(&r.verdict)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
