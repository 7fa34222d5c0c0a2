//! Weight normalization.
//!
//! Providers mix conventions (fractions vs percentages, share classes counted
//! twice), so every fund is rescaled to sum to 1 before it enters the matrix.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, ValidationWarning};
use crate::holdings::universe::{FundHoldings, SymbolUniverse};
use crate::types::WeightVector;

/// Default relative band around 1.0 before a raw sum is flagged.
pub const DEFAULT_SUM_TOLERANCE: f64 = 0.05;

/// Raw sums below this are treated as empty funds.
pub const NORMALIZATION_FLOOR: f64 = 1e-10;

/// A fund rescaled onto the resolved universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFund {
    pub symbol: String,
    /// Sums to 1, or is all zeros for a degenerate fund.
    pub weights: WeightVector,
    /// Sum of the fund's weights on the universe before rescaling.
    pub raw_sum: f64,
}

/// Restrict `fund` to `universe` and rescale it to sum to 1.
///
/// Emits `WeightSumOutOfTolerance` when the raw sum is outside `1 ± tolerance`
/// and `DegenerateFund` when it is below [`NORMALIZATION_FLOOR`].
pub fn normalize_fund(
    fund: &FundHoldings,
    universe: &SymbolUniverse,
    tolerance: f64,
) -> (NormalizedFund, Diagnostics) {
    let restricted: WeightVector = fund
        .weights
        .iter()
        .filter(|(ticker, _)| universe.contains(ticker))
        .map(|(ticker, w)| (ticker.clone(), *w))
        .collect();

    let raw_sum: f64 = restricted.values().sum();
    let mut diagnostics = Diagnostics::new();

    if raw_sum < NORMALIZATION_FLOOR {
        diagnostics.push(ValidationWarning::DegenerateFund {
            fund: fund.symbol.clone(),
            observed_sum: raw_sum,
        });
    } else if (raw_sum - 1.0).abs() > tolerance {
        diagnostics.push(ValidationWarning::WeightSumOutOfTolerance {
            fund: fund.symbol.clone(),
            observed_sum: raw_sum,
            deviation_points: (raw_sum - 1.0) * 100.0,
        });
    }

    let normalized = NormalizedFund {
        symbol: fund.symbol.clone(),
        weights: normalize_weights(&restricted),
        raw_sum,
    };
    (normalized, diagnostics)
}

/// Divide every weight by the vector's own sum.
///
/// Returns all zeros when the sum is below [`NORMALIZATION_FLOOR`].
pub fn normalize_weights(weights: &WeightVector) -> WeightVector {
    let raw_sum: f64 = weights.values().sum();
    if raw_sum < NORMALIZATION_FLOOR {
        return weights.keys().map(|k| (k.clone(), 0.0)).collect();
    }
    weights
        .iter()
        .map(|(k, w)| (k.clone(), *w / raw_sum))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fund(symbol: &str, holdings: &[(&str, f64)]) -> FundHoldings {
        FundHoldings {
            symbol: symbol.into(),
            weights: holdings.iter().map(|(t, w)| (t.to_string(), *w)).collect(),
        }
    }

    fn universe(symbols: &[&str]) -> SymbolUniverse {
        SymbolUniverse::from_symbols(symbols.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_sum_within_band_has_no_warning() {
        let f = fund("VTI", &[("AAA", 0.6), ("BBB", 0.42)]);
        let (n, d) = normalize_fund(&f, &universe(&["AAA", "BBB"]), DEFAULT_SUM_TOLERANCE);
        assert!(d.is_empty());
        let total: f64 = n.weights.values().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((n.raw_sum - 1.02).abs() < 1e-12);
    }

    #[test]
    fn test_percentage_convention_flagged_and_rescaled() {
        let f = fund("IWN", &[("AAA", 1.24), ("BBB", 1.24)]);
        let (n, d) = normalize_fund(&f, &universe(&["AAA", "BBB"]), DEFAULT_SUM_TOLERANCE);
        assert!((n.weights["AAA"] - 0.5).abs() < 1e-12);
        match d.iter().next() {
            Some(ValidationWarning::WeightSumOutOfTolerance {
                fund,
                observed_sum,
                deviation_points,
            }) => {
                assert_eq!(fund, "IWN");
                assert!((observed_sum - 2.48).abs() < 1e-12);
                assert!((deviation_points - 148.0).abs() < 1e-9);
            }
            other => panic!("unexpected diagnostic: {:?}", other),
        }
    }

    #[test]
    fn test_under_allocated_fund_flagged() {
        let f = fund("VTV", &[("AAA", 0.5), ("BBB", 0.4)]);
        let (_, d) = normalize_fund(&f, &universe(&["AAA", "BBB"]), DEFAULT_SUM_TOLERANCE);
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_custom_tolerance() {
        let f = fund("VTV", &[("AAA", 0.5), ("BBB", 0.4)]);
        let (_, d) = normalize_fund(&f, &universe(&["AAA", "BBB"]), 0.2);
        assert!(d.is_empty());
    }

    #[test]
    fn test_degenerate_fund_zeroed() {
        let f = fund("ZERO", &[("AAA", 0.0), ("BBB", 1e-12)]);
        let (n, d) = normalize_fund(&f, &universe(&["AAA", "BBB"]), DEFAULT_SUM_TOLERANCE);
        assert!(n.weights.values().all(|w| *w == 0.0));
        assert!(matches!(
            d.iter().next(),
            Some(ValidationWarning::DegenerateFund { .. })
        ));
    }

    #[test]
    fn test_tickers_outside_universe_dropped() {
        let f = fund("VTI", &[("AAA", 0.5), ("FIXTURE", 0.5)]);
        let (n, _) = normalize_fund(&f, &universe(&["AAA"]), DEFAULT_SUM_TOLERANCE);
        assert_eq!(n.weights.len(), 1);
        assert!((n.weights["AAA"] - 1.0).abs() < 1e-15);
        assert!((n.raw_sum - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_normalize_sums_to_one_for_any_scale() {
        for scale in [1e-6, 0.37, 1.0, 2.48, 100.0, 1e6] {
            let w: WeightVector = [("A", 0.1), ("B", 0.25), ("C", 0.65), ("D", 0.0)]
                .iter()
                .map(|(t, v)| (t.to_string(), v * scale))
                .collect();
            let n = normalize_weights(&w);
            let total: f64 = n.values().sum();
            assert!(
                (total - 1.0).abs() < 1e-12,
                "scale {} gave total {}",
                scale,
                total
            );
        }
    }
}
