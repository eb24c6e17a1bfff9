use crate::config::SUPPLY_PRESSURE_FLOOR;
use crate::types::{CompetitionLevel, SupplyCount};

/// `log10(total_supply + 10)`; never below 1.0 and strictly increasing.
pub fn supply_pressure(total_supply: u64) -> f64 {
    (total_supply as f64 + SUPPLY_PRESSURE_FLOOR).log10()
}

pub fn competition_level(total_supply: u64) -> CompetitionLevel {
    CompetitionLevel::from_supply(total_supply)
}

/// Sum of the available marketplace counts. None when nothing was available,
/// so "no data" never collapses into "zero listings".
pub fn aggregate_total<'a>(counts: impl IntoIterator<Item = &'a SupplyCount>) -> Option<u64> {
    counts
        .into_iter()
        .filter_map(SupplyCount::available)
        .fold(None, |acc, n| Some(acc.unwrap_or(0).saturating_add(n)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressure_floor_is_one() {
        assert!((supply_pressure(0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pressure_is_strictly_increasing() {
        let mut prev = supply_pressure(0);
        for n in [1u64, 5, 50, 500, 5_000, 50_000, 10_000_000] {
            let p = supply_pressure(n);
            assert!(p > prev, "pressure({n}) = {p} not above {prev}");
            prev = p;
        }
    }

    #[test]
    fn pressure_matches_reference_values() {
        assert!((supply_pressure(100) - 2.041_392_685).abs() < 1e-6);
        assert!((supply_pressure(10_000) - 4.000_434_077).abs() < 1e-6);
    }

    #[test]
    fn aggregate_skips_unavailable() {
        let counts = [SupplyCount::Available(10), SupplyCount::Unavailable, SupplyCount::Available(5)];
        assert_eq!(aggregate_total(&counts), Some(15));
    }

    #[test]
    fn aggregate_all_unavailable_is_none() {
        let counts = [SupplyCount::Unavailable, SupplyCount::Unavailable];
        assert_eq!(aggregate_total(&counts), None);
        assert_eq!(aggregate_total(std::iter::empty()), None);
    }

    #[test]
    fn aggregate_real_zero_is_some() {
        assert_eq!(aggregate_total(&[SupplyCount::Available(0)]), Some(0));
    }
}
