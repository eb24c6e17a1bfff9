//! In-memory latency histograms for collaborator calls.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

/// One histogram in microseconds. Pipeline records, API reads.
pub struct LatencyStats {
    inner: Mutex<Option<hdrhistogram::Histogram<u64>>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Percentiles {
    pub samples: u64,
    pub p50_us: Option<u64>,
    pub p95_us: Option<u64>,
    pub p99_us: Option<u64>,
    pub max_us: Option<u64>,
}

impl LatencyStats {
    /// Tracks 1us to 10 minutes, 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 600_000_000, 3).ok();
        Self { inner: Mutex::new(histogram) }
    }

    pub fn record_us(&self, us: u64) {
        if let Ok(mut guard) = self.inner.lock() {
            if let Some(h) = guard.as_mut() {
                let _ = h.record(us.max(1));
            }
        }
    }

    pub fn record(&self, d: Duration) {
        let us = d.as_micros().min(u128::from(u64::MAX)) as u64;
        self.record_us(us);
    }

    pub fn percentiles(&self) -> Percentiles {
        let Ok(guard) = self.inner.lock() else {
            return Percentiles::default();
        };
        match guard.as_ref() {
            Some(h) if h.len() > 0 => Percentiles {
                samples: h.len(),
                p50_us: Some(h.value_at_quantile(0.5)),
                p95_us: Some(h.value_at_quantile(0.95)),
                p99_us: Some(h.value_at_quantile(0.99)),
                max_us: Some(h.max()),
            },
            _ => Percentiles::default(),
        }
    }

    pub fn len(&self) -> u64 {
        self.inner
            .lock()
            .ok()
            .and_then(|g| g.as_ref().map(|h| h.len()))
            .unwrap_or(0)
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-collaborator latency.
#[derive(Default)]
pub struct CollectorLatency {
    pub demand: LatencyStats,
    pub supply: LatencyStats,
}

impl CollectorLatency {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_has_no_percentiles() {
        let stats = LatencyStats::new();
        assert_eq!(stats.percentiles(), Percentiles::default());
        assert_eq!(stats.len(), 0);
    }

    #[test]
    fn records_durations() {
        let stats = LatencyStats::new();
        for ms in 1..=100u64 {
            stats.record(Duration::from_millis(ms));
        }
        let p = stats.percentiles();
        assert_eq!(p.samples, 100);
        let p50 = p.p50_us.unwrap();
        assert!((49_000..=51_000).contains(&p50), "p50 {p50}");
        assert!(p.p99_us.unwrap() >= p50);
    }
}
