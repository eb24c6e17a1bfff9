pub mod models;
pub mod writer;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::Result;
use models::{EvaluationRow, RunRow};

pub use writer::DbWriter;

/// Open (creating if needed) the database at `path` and apply migrations.
pub async fn connect(path: &str) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{path}"))?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(5).connect_with(opts).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory database with migrations applied.
#[cfg(test)]
pub async fn connect_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

pub async fn recent_runs(pool: &SqlitePool, limit: i64) -> Result<Vec<RunRow>> {
    Ok(sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, started_at, finished_at, strategy,
               keywords_requested, keywords_ranked, keywords_unscored, keywords_skipped,
               top_keyword, top_score
        FROM runs
        ORDER BY started_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

/// (runs, evaluation rows) stored so far.
pub async fn totals(pool: &SqlitePool) -> Result<(i64, i64)> {
    let (runs,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM runs").fetch_one(pool).await?;
    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM evaluations").fetch_one(pool).await?;
    Ok((runs, rows))
}

/// Overall rows for one keyword across runs, newest first.
pub async fn keyword_history(pool: &SqlitePool, keyword: &str, limit: i64) -> Result<Vec<EvaluationRow>> {
    Ok(sqlx::query_as::<_, EvaluationRow>(
        r#"
        SELECT e.id, e.run_id, e.rank, e.keyword, e.period,
               e.opportunity_score, e.demand_signal, e.total_supply, e.competition_level,
               e.supply_pressure, e.base_ratio, e.momentum_multiplier, e.saturation_penalty,
               e.trend_velocity, e.is_rising, e.avg_interest, e.monthly_searches,
               e.strategy, e.verdict_tier, e.verdict
        FROM evaluations e
        JOIN runs r ON r.id = e.run_id
        WHERE e.keyword = ? COLLATE NOCASE AND e.period = 'overall'
        ORDER BY r.started_at DESC, e.id DESC
        LIMIT ?
        "#,
    )
    .bind(keyword)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}
