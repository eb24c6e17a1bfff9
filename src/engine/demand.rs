use crate::engine::trend;
use crate::timefmt::parse_iso_to_unix_secs;
use crate::types::{InterestPoint, KeywordDemandRecord};

/// Purchase-intent-qualified search volume. Zero intent means zero demand,
/// whatever the traffic.
pub fn demand_signal(monthly_searches: u64, purchase_intent: f64) -> f64 {
    if monthly_searches == 0 || !purchase_intent.is_finite() || purchase_intent <= 0.0 {
        return 0.0;
    }
    monthly_searches as f64 * (purchase_intent.min(100.0) / 100.0)
}

/// Monthly searches implied by an average relative interest.
pub fn estimate_monthly_searches(avg_interest: f64, searches_per_point: f64) -> u64 {
    let est = avg_interest * searches_per_point;
    if est.is_finite() && est > 0.0 {
        est.round() as u64
    } else {
        0
    }
}

/// Build the immutable demand record for one keyword.
///
/// Returns None when the history is empty: such keywords are filtered out,
/// not scored. History is re-ordered oldest first; points with unparsable
/// dates keep their relative position at the end. Values above 100 are capped.
pub fn build_record(
    keyword: &str,
    mut history: Vec<InterestPoint>,
    purchase_intent: f64,
    avg_price: Option<f64>,
    monthly_searches: Option<u64>,
    searches_per_point: f64,
) -> Option<KeywordDemandRecord> {
    if history.is_empty() {
        return None;
    }

    history.sort_by(|a, b| {
        let ka = parse_iso_to_unix_secs(&a.date).unwrap_or(f64::INFINITY);
        let kb = parse_iso_to_unix_secs(&b.date).unwrap_or(f64::INFINITY);
        ka.total_cmp(&kb)
    });
    for p in &mut history {
        p.value = p.value.min(100);
    }

    let values: Vec<f64> = history.iter().map(|p| p.value as f64).collect();
    let avg_interest = trend::mean(&values);
    let trend_consistency = if avg_interest > 0.0 {
        Some(trend::consistency(&values))
    } else {
        None
    };

    let purchase_intent = if purchase_intent.is_finite() {
        purchase_intent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let avg_price = avg_price.filter(|p| p.is_finite() && *p >= 0.0);
    let monthly_searches = monthly_searches
        .unwrap_or_else(|| estimate_monthly_searches(avg_interest, searches_per_point));

    Some(KeywordDemandRecord {
        keyword: keyword.to_string(),
        trend_slope: trend::slope(&values),
        recent_spike: trend::recent_spike(&values),
        history,
        avg_interest,
        trend_consistency,
        purchase_intent,
        avg_price,
        monthly_searches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(values: &[u32]) -> Vec<InterestPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| InterestPoint { date: format!("2024-01-{:02}", i + 1), value: v })
            .collect()
    }

    #[test]
    fn demand_signal_discounts_by_intent() {
        assert_eq!(demand_signal(10_000, 70.0), 7_000.0);
        assert_eq!(demand_signal(5_000, 30.0), 1_500.0);
    }

    #[test]
    fn zero_factor_gives_zero_signal() {
        assert_eq!(demand_signal(0, 90.0), 0.0);
        assert_eq!(demand_signal(1_000_000, 0.0), 0.0);
        assert_eq!(demand_signal(1_000, f64::NAN), 0.0);
    }

    #[test]
    fn empty_history_is_filtered() {
        assert!(build_record("x", Vec::new(), 50.0, None, None, 1_000.0).is_none());
    }

    #[test]
    fn record_derives_statistics() {
        let rec = build_record("plush", points(&[10, 20, 30, 40]), 60.0, Some(19.9), None, 1_000.0)
            .unwrap();
        assert_eq!(rec.avg_interest, 25.0);
        assert_eq!(rec.monthly_searches, 25_000);
        assert!((rec.trend_slope - 10.0).abs() < 1e-9);
        assert!(rec.trend_consistency.is_some());
        assert!(!rec.recent_spike);
        assert_eq!(rec.avg_price, Some(19.9));
    }

    #[test]
    fn provided_monthly_searches_wins() {
        let rec = build_record("plush", points(&[10, 20]), 60.0, None, Some(777), 1_000.0).unwrap();
        assert_eq!(rec.monthly_searches, 777);
    }

    #[test]
    fn zero_mean_history_has_undefined_consistency() {
        let rec = build_record("dead", points(&[0, 0, 0]), 50.0, None, None, 1_000.0).unwrap();
        assert_eq!(rec.trend_consistency, None);
        assert_eq!(rec.monthly_searches, 0);
    }

    #[test]
    fn history_sorted_oldest_first() {
        let history = vec![
            InterestPoint { date: "2024-03-01".into(), value: 30 },
            InterestPoint { date: "2024-01-01".into(), value: 10 },
            InterestPoint { date: "2024-02-01".into(), value: 20 },
        ];
        let rec = build_record("k", history, 50.0, None, None, 1_000.0).unwrap();
        let values: Vec<u32> = rec.history.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![10, 20, 30]);
        assert!(rec.trend_slope > 0.0);
    }

    #[test]
    fn intent_is_clamped() {
        let rec = build_record("k", points(&[50]), 250.0, None, None, 1_000.0).unwrap();
        assert_eq!(rec.purchase_intent, 100.0);
    }
}
