//! Momentum, stability and spike statistics over a time-ordered interest series.

use crate::config::{SPIKE_MIN_POINTS, SPIKE_RATIO, SPIKE_TAIL};

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Ordinary least-squares slope of value against index position.
/// Absolute units per step; 0.0 for fewer than two points.
pub fn slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(values);
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den.abs() < 1e-12 {
        return 0.0;
    }
    num / den
}

/// `1 - stddev/mean`, or 0.0 when the mean is not positive.
/// Not clamped below zero: very volatile series go negative.
pub fn consistency(values: &[f64]) -> f64 {
    let m = mean(values);
    if m <= 0.0 {
        return 0.0;
    }
    1.0 - std_dev(values) / m
}

/// True when the last value exceeds 1.3× the mean of everything before the
/// trailing three points. Needs at least six points.
pub fn recent_spike(values: &[f64]) -> bool {
    if values.len() < SPIKE_MIN_POINTS {
        return false;
    }
    let baseline = mean(&values[..values.len() - SPIKE_TAIL]);
    match values.last() {
        Some(&last) => last > baseline * SPIKE_RATIO,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn slope_of_linear_series() {
        let v: Vec<f64> = (0..10).map(|i| 5.0 + 2.0 * i as f64).collect();
        assert!(approx(slope(&v), 2.0));
    }

    #[test]
    fn slope_keeps_absolute_scale() {
        let small: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let large: Vec<f64> = (0..10).map(|i| 10.0 * i as f64).collect();
        assert!(approx(slope(&large), 10.0 * slope(&small)));
    }

    #[test]
    fn slope_needs_two_points() {
        assert_eq!(slope(&[]), 0.0);
        assert_eq!(slope(&[42.0]), 0.0);
    }

    #[test]
    fn consistency_of_flat_series_is_one() {
        assert!(approx(consistency(&[40.0, 40.0, 40.0, 40.0]), 1.0));
    }

    #[test]
    fn consistency_zero_mean_is_zero() {
        assert_eq!(consistency(&[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(consistency(&[]), 0.0);
    }

    #[test]
    fn consistency_goes_negative_for_volatile_series() {
        // mean 12.5, population stddev ~21.65
        assert!(consistency(&[0.0, 0.0, 0.0, 50.0]) < 0.0);
    }

    #[test]
    fn spike_requires_six_points() {
        assert!(!recent_spike(&[10.0, 10.0, 10.0, 10.0, 90.0]));
    }

    #[test]
    fn spike_detected_against_baseline() {
        // baseline = mean of first three = 10, last = 14 > 13
        assert!(recent_spike(&[10.0, 10.0, 10.0, 10.0, 10.0, 14.0]));
        assert!(!recent_spike(&[10.0, 10.0, 10.0, 10.0, 10.0, 13.0]));
    }
}
