mod api;
mod config;
mod db;
mod engine;
mod error;
mod fetcher;
mod observer;
mod pipeline;
mod report;
mod state;
mod timefmt;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::CollectorLatency;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::DbWriter;
use crate::engine::Engine;
use crate::error::Result;
use crate::fetcher::{
    DemandSource, FixtureDemandSource, FixtureSupplySource, MarketplaceClient, SupplySource,
    TrendsClient,
};
use crate::observer::TracingObserver;
use crate::pipeline::{Pipeline, PipelineRefresher, PipelineSettings};
use crate::report::OpportunityFilter;
use crate::state::ReportStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Collaborators ---
    let demand = demand_source(&cfg).await?;
    let supply = supply_source(&cfg).await?;
    info!(
        demand = demand.name(),
        supply = supply.name(),
        marketplaces = ?supply.marketplaces(),
        "collaborators ready"
    );

    // --- Engine + shared state ---
    let engine = Engine::new(&cfg.scoring);
    info!(
        strategy = %engine.strategy(),
        temporal = cfg.temporal_analysis,
        "scoring engine configured"
    );
    let store = ReportStore::new();
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(CollectorLatency::new());

    let pipeline = Arc::new(Pipeline::new(
        engine,
        demand,
        supply,
        Arc::clone(&store),
        Arc::clone(&health),
        Arc::clone(&latency),
        Arc::new(TracingObserver),
        Some(DbWriter::new(pool.clone())),
        PipelineSettings::from_config(&cfg),
    ));

    // --- Startup run ---
    match pipeline.run(&cfg.keywords).await {
        Ok(report) => {
            info!(
                run_id = %report.run_id,
                ranked = report.ranked.len(),
                unscored = report.unscored.len(),
                skipped = report.skipped.len(),
                "startup analysis complete"
            );
            for (i, e) in report.ranked.iter().take(3).enumerate() {
                info!(
                    "#{} {} | score {:.1} | {}",
                    i + 1,
                    e.keyword,
                    e.overall.breakdown.final_score,
                    e.overall.verdict.headline,
                );
            }
        }
        Err(e) => warn!("startup analysis failed: {e}"),
    }

    // --- Periodic refresh ---
    if cfg.refresh_interval_secs > 0 {
        let refresher = PipelineRefresher::new(
            Arc::clone(&pipeline),
            cfg.keywords.clone(),
            cfg.refresh_interval_secs,
        );
        tokio::spawn(async move { refresher.run().await });
        info!("Refreshing every {}s", cfg.refresh_interval_secs);
    }

    // --- HTTP API server ---
    let api_state = ApiState {
        pool,
        pipeline,
        store,
        health,
        latency,
        filter: OpportunityFilter::from(&cfg.filter),
        timeline_dir: PathBuf::from(&cfg.timeline_dir),
        searches_per_point: cfg.scoring.searches_per_interest_point,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn demand_source(cfg: &Config) -> Result<Arc<dyn DemandSource>> {
    Ok(match &cfg.demand_fixture {
        Some(path) => {
            info!("Demand from fixture {path}");
            Arc::new(FixtureDemandSource::load(path).await?)
        }
        None => Arc::new(TrendsClient::new(
            &cfg.trends_api_url,
            cfg.max_retries,
            cfg.request_delay_ms,
        )?),
    })
}

async fn supply_source(cfg: &Config) -> Result<Arc<dyn SupplySource>> {
    Ok(match &cfg.supply_fixture {
        Some(path) => {
            info!("Supply from fixture {path}");
            Arc::new(FixtureSupplySource::load(path).await?)
        }
        None => Arc::new(MarketplaceClient::new(
            &cfg.marketplace_api_url,
            cfg.marketplaces.clone(),
            cfg.max_retries,
            cfg.request_delay_ms,
        )?),
    })
}
