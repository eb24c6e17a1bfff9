/// Row types for the `runs` and `evaluations` tables (migrations/0001_init.sql).

#[derive(Debug, Clone, PartialEq, serde::Serialize, sqlx::FromRow)]
pub struct RunRow {
    pub id: String,
    pub started_at: i64,
    pub finished_at: i64,
    pub strategy: String,
    pub keywords_requested: i64,
    pub keywords_ranked: i64,
    pub keywords_unscored: i64,
    pub keywords_skipped: i64,
    pub top_keyword: Option<String>,
    pub top_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, sqlx::FromRow)]
pub struct EvaluationRow {
    pub id: i64,
    pub run_id: String,
    pub rank: i64,
    pub keyword: String,
    pub period: String,
    pub opportunity_score: f64,
    pub demand_signal: f64,
    pub total_supply: Option<i64>,
    pub competition_level: Option<String>,
    pub supply_pressure: f64,
    pub base_ratio: f64,
    pub momentum_multiplier: f64,
    pub saturation_penalty: f64,
    pub trend_velocity: f64,
    pub is_rising: bool,
    pub avg_interest: f64,
    pub monthly_searches: i64,
    pub strategy: String,
    pub verdict_tier: String,
    pub verdict: String,
}
