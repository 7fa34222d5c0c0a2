//! Non-fatal data-quality signals raised during an approximation run.
//!
//! Warnings never abort a run. They are collected in a [`Diagnostics`] list,
//! logged as they are recorded, and returned beside the result so callers can
//! assert on them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single non-fatal finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// Reserved fixture tickers were removed from the symbol universe.
    ReservedSymbolsFiltered { count: usize, symbols: Vec<String> },
    /// A fund's raw weights did not sum to 1 within the tolerance band.
    WeightSumOutOfTolerance {
        fund: String,
        observed_sum: f64,
        /// (observed_sum - 1) expressed in percentage points.
        deviation_points: f64,
    },
    /// A fund's raw sum fell below the numerical floor; its weights were zeroed.
    DegenerateFund { fund: String, observed_sum: f64 },
    /// A caller-supplied initial guess was off the simplex and was projected onto it.
    InitialGuessProjected { provided: Vec<f64>, used: Vec<f64> },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::ReservedSymbolsFiltered { count, symbols } => write!(
                f,
                "Filtered {} reserved symbol(s) from the universe: {}",
                count,
                symbols.join(", ")
            ),
            ValidationWarning::WeightSumOutOfTolerance {
                fund,
                observed_sum,
                deviation_points,
            } => write!(
                f,
                "{} weights sum to {:.4} ({:+.2} points from 100%)",
                fund, observed_sum, deviation_points
            ),
            ValidationWarning::DegenerateFund { fund, observed_sum } => write!(
                f,
                "{} weights sum to {:e}; treated as an empty fund",
                fund, observed_sum
            ),
            ValidationWarning::InitialGuessProjected { provided, used } => write!(
                f,
                "Initial guess {:?} is not on the simplex; using {:?}",
                provided, used
            ),
        }
    }
}

/// Ordered collection of warnings for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<ValidationWarning>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and emit it as a `warn` event.
    pub fn push(&mut self, warning: ValidationWarning) {
        tracing::warn!(kind = warning_kind(&warning), "{}", warning);
        self.0.push(warning);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationWarning> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<ValidationWarning> {
        self.0
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a ValidationWarning;
    type IntoIter = std::slice::Iter<'a, ValidationWarning>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn warning_kind(warning: &ValidationWarning) -> &'static str {
    match warning {
        ValidationWarning::ReservedSymbolsFiltered { .. } => "reserved_symbols_filtered",
        ValidationWarning::WeightSumOutOfTolerance { .. } => "weight_sum_out_of_tolerance",
        ValidationWarning::DegenerateFund { .. } => "degenerate_fund",
        ValidationWarning::InitialGuessProjected { .. } => "initial_guess_projected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_kind_tag() {
        let w = ValidationWarning::WeightSumOutOfTolerance {
            fund: "IWN".into(),
            observed_sum: 2.48,
            deviation_points: 148.0,
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "weight_sum_out_of_tolerance");
        assert_eq!(json["fund"], "IWN");
    }

    #[test]
    fn test_display_cites_deviation() {
        let w = ValidationWarning::WeightSumOutOfTolerance {
            fund: "IWN".into(),
            observed_sum: 2.48,
            deviation_points: 148.0,
        };
        assert!(w.to_string().contains("+148.00 points"));
    }

    #[test]
    fn test_collection_preserves_order() {
        let mut d = Diagnostics::new();
        d.push(ValidationWarning::DegenerateFund {
            fund: "A".into(),
            observed_sum: 0.0,
        });
        d.push(ValidationWarning::ReservedSymbolsFiltered {
            count: 1,
            symbols: vec!["ZZZ".into()],
        });
        assert_eq!(d.len(), 2);
        assert!(matches!(
            d.iter().next(),
            Some(ValidationWarning::DegenerateFund { .. })
        ));
    }
}
