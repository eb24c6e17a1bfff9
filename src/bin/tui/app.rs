use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct ReportRowResponse {
    pub rank: usize,
    pub keyword: String,
    pub period: String,
    pub opportunity_score: f64,
    pub demand_signal: f64,
    pub total_supply: Option<u64>,
    pub competition_level: Option<String>,
    pub supply_pressure: f64,
    pub base_ratio: f64,
    pub momentum_multiplier: f64,
    pub saturation_penalty: f64,
    pub trend_velocity: f64,
    pub is_rising: bool,
    pub avg_interest: f64,
    pub monthly_searches: u64,
    pub strategy: String,
    pub verdict_tier: String,
    pub verdict: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct RunSummaryResponse {
    pub run_id: String,
    pub started_at: u64,
    pub finished_at: u64,
    pub strategy: String,
    pub requested: usize,
    pub ranked: usize,
    pub unscored: usize,
    pub skipped: usize,
    pub top_keyword: Option<String>,
    pub top_score: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct RunsSummaryResponse {
    pub total_runs: i64,
    pub total_rows: i64,
    pub last_run: Option<RunSummaryResponse>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct HealthResponse {
    pub status: String,
    pub run_in_progress: bool,
    pub last_run_at: Option<u64>,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub keywords_in_store: usize,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[allow(dead_code)]
pub struct PercentilesResponse {
    pub samples: u64,
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
    pub max_us: Option<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct LatencyResponse {
    pub demand: PercentilesResponse,
    pub supply: PercentilesResponse,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

/// Period breakdown for the selected keyword (from GET /reports/:keyword/periods).
#[derive(Debug, Clone, Default)]
pub struct KeywordDetail {
    pub keyword: Option<String>,
    pub periods: Vec<ReportRowResponse>,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub reports: Vec<ReportRowResponse>,
    pub runs: RunsSummaryResponse,
    pub health: HealthResponse,
    pub latency: LatencyResponse,
    pub detail: KeywordDetail,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            reports: Vec::new(),
            runs: RunsSummaryResponse::default(),
            health: HealthResponse::default(),
            latency: LatencyResponse::default(),
            detail: KeywordDetail::default(),
            base_url,
        }
    }

    pub fn selected_row(&self, index: Option<usize>) -> Option<&ReportRowResponse> {
        index.and_then(|i| self.reports.get(i))
    }

    /// Load the period breakdown for one keyword into `detail`.
    pub async fn fetch_detail(&mut self, client: &reqwest::Client, keyword: &str) {
        let url = format!("{}/reports/{}/periods", self.base_url, encode_path(keyword));
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                if let Ok(periods) = resp.json::<Vec<ReportRowResponse>>().await {
                    self.detail = KeywordDetail { keyword: Some(keyword.to_string()), periods };
                }
            }
        }
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let reports_url = format!("{}/reports", self.base_url);
        let runs_url = format!("{}/runs/summary?limit=1", self.base_url);
        let health_url = format!("{}/health", self.base_url);
        let latency_url = format!("{}/stats/latency", self.base_url);

        let (reports_res, runs_res, health_res, latency_res) = tokio::join!(
            client.get(&reports_url).send(),
            client.get(&runs_url).send(),
            client.get(&health_url).send(),
            client.get(&latency_url).send(),
        );

        let reports_resp = match reports_res {
            Ok(r) => r,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        match reports_resp.json::<Vec<ReportRowResponse>>().await {
            Ok(rows) => {
                self.reports = rows;
                self.status = ConnectionStatus::Connected;
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
                return;
            }
        }

        if let Ok(r) = runs_res {
            if let Ok(runs) = r.json::<RunsSummaryResponse>().await {
                self.runs = runs;
            }
        }
        if let Ok(h) = health_res {
            if let Ok(health) = h.json::<HealthResponse>().await {
                self.health = health;
            }
        }
        if let Ok(l) = latency_res {
            if let Ok(latency) = l.json::<LatencyResponse>().await {
                self.latency = latency;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_score(v: f64) -> String {
    format!("{v:.1}")
}

pub fn format_supply(v: Option<u64>) -> String {
    match v {
        Some(n) if n >= 1_000_000 => format!("{:.1}M", n as f64 / 1_000_000.0),
        Some(n) if n >= 10_000 => format!("{:.1}k", n as f64 / 1_000.0),
        Some(n) => n.to_string(),
        None => "—".to_string(),
    }
}

pub fn format_velocity(v: f64) -> String {
    format!("{v:+.2}")
}

pub fn format_latency_us(us: Option<u64>) -> String {
    match us {
        Some(u) if u >= 1_000_000 => format!("{:.1}s", u as f64 / 1_000_000.0),
        Some(u) => format!("{:.0}ms", u as f64 / 1_000.0),
        None => "—".to_string(),
    }
}

/// Convert a unix-seconds timestamp to HH:MM:SS (UTC).
pub fn format_time_secs(secs: u64) -> String {
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

pub fn short_tier(tier: &str) -> &'static str {
    match tier {
        "excellent" => "EXCL",
        "viable" => "VIAB",
        "risky" => "RISK",
        "avoid" => "AVOID",
        "no_data" => "N/A",
        _ => "—",
    }
}

/// Keep a table selection inside `len` rows; the first row when nothing is
/// selected yet, None for an empty table.
pub fn clamp_selection(len: usize, selected: Option<usize>) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(selected.map_or(0, |i| i.min(len - 1)))
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

/// Percent-encode a keyword for use as a path segment.
pub fn encode_path(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supply_is_abbreviated() {
        assert_eq!(format_supply(Some(950)), "950");
        assert_eq!(format_supply(Some(12_500)), "12.5k");
        assert_eq!(format_supply(Some(2_300_000)), "2.3M");
        assert_eq!(format_supply(None), "—");
    }

    #[test]
    fn selection_stays_in_range() {
        assert_eq!(clamp_selection(0, Some(3)), None);
        assert_eq!(clamp_selection(0, None), None);
        assert_eq!(clamp_selection(4, None), Some(0));
        assert_eq!(clamp_selection(4, Some(2)), Some(2));
        assert_eq!(clamp_selection(2, Some(7)), Some(1));
    }

    #[test]
    fn keywords_are_path_encoded() {
        assert_eq!(encode_path("bluey toys"), "bluey%20toys");
        assert_eq!(encode_path("a/b"), "a%2Fb");
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("café latte", 5), "café…");
        assert_eq!(truncate("short", 10), "short");
    }
}
