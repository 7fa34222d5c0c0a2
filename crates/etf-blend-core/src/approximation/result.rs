//! The approximation record handed to the dashboard/API layer.

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::approximation::metrics::OptimizationMetrics;
use crate::approximation::solver::OptimizationResult;

/// Slack on the weights-sum check.
pub const WEIGHTS_SUM_TOLERANCE: f64 = 1e-4;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Symbol -> value, serialized as a JSON object in baseline order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledWeights(Vec<(String, f64)>);

/// Constraint re-check on the returned weights, independent of the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintCheck {
    pub weights_sum: f64,
    pub all_weights_non_negative: bool,
    pub all_weights_less_than_one: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproximationResult {
    pub timestamp: DateTime<Utc>,
    pub target_etf: String,
    pub baseline_etfs: Vec<String>,
    /// Lower-cased baseline symbol -> fraction.
    pub optimal_weights: LabeledWeights,
    /// Lower-cased baseline symbol -> percentage.
    pub weights_percentages: LabeledWeights,
    pub optimization_metrics: OptimizationMetrics,
    pub constraints: ConstraintCheck,
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Package weights, metrics and the constraint re-check.
pub fn assemble_result(
    target_etf: &str,
    baseline_etfs: &[String],
    optimization: &OptimizationResult,
    metrics: OptimizationMetrics,
    timestamp: DateTime<Utc>,
) -> ApproximationResult {
    let labels: Vec<String> = baseline_etfs.iter().map(|s| s.to_lowercase()).collect();
    let w = &optimization.weights;

    let optimal_weights = LabeledWeights(labels.iter().cloned().zip(w.iter().copied()).collect());
    let weights_percentages =
        LabeledWeights(labels.into_iter().zip(w.iter().map(|x| x * 100.0)).collect());

    ApproximationResult {
        timestamp,
        target_etf: target_etf.to_string(),
        baseline_etfs: baseline_etfs.to_vec(),
        optimal_weights,
        weights_percentages,
        optimization_metrics: metrics,
        constraints: check_constraints(w),
    }
}

pub fn check_constraints(w: &[f64]) -> ConstraintCheck {
    ConstraintCheck {
        weights_sum: w.iter().sum(),
        all_weights_non_negative: w.iter().all(|x| *x >= 0.0),
        all_weights_less_than_one: w.iter().all(|x| *x <= 1.0),
    }
}

impl ConstraintCheck {
    /// All three checks pass.
    pub fn is_satisfied(&self) -> bool {
        (self.weights_sum - 1.0).abs() < WEIGHTS_SUM_TOLERANCE
            && self.all_weights_non_negative
            && self.all_weights_less_than_one
    }
}

// ---------------------------------------------------------------------------
// LabeledWeights
// ---------------------------------------------------------------------------

impl LabeledWeights {
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(s, _)| s.eq_ignore_ascii_case(symbol))
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(s, v)| (s.as_str(), *v))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().map(|(_, v)| *v)
    }
}

impl FromIterator<(String, f64)> for LabeledWeights {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        LabeledWeights(iter.into_iter().collect())
    }
}

impl Serialize for LabeledWeights {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LabeledWeights {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LabeledWeightsVisitor;

        impl<'de> Visitor<'de> for LabeledWeightsVisitor {
            type Value = LabeledWeights;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of symbol to number")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry::<String, f64>()? {
                    entries.push((k, v));
                }
                Ok(LabeledWeights(entries))
            }
        }

        deserializer.deserialize_map(LabeledWeightsVisitor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approximation::config::SolverMethod;
    use chrono::TimeZone;

    fn optimization(weights: Vec<f64>) -> OptimizationResult {
        OptimizationResult {
            weights,
            final_objective: 0.0,
            initial_objective: 0.0028125,
            initial_weights: vec![0.75, 0.125, 0.125],
            method: SolverMethod::ActiveSet,
            iterations: 2,
            polish_moves: 1,
        }
    }

    fn metrics() -> OptimizationMetrics {
        OptimizationMetrics {
            final_objective_value: 0.0,
            initial_objective_value: 0.0028125,
            improvement_percent: 100.0,
            average_error: 0.0,
            max_error: 0.0,
            error_count: 0,
            total_stocks: 2,
        }
    }

    fn baselines() -> Vec<String> {
        vec!["VTI".into(), "IWN".into(), "VTV".into()]
    }

    #[test]
    fn test_labels_lowercased_in_baseline_order() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let r = assemble_result("EBI", &baselines(), &optimization(vec![0.75, 0.25, 0.0]), metrics(), ts);
        let labels: Vec<&str> = r.optimal_weights.iter().map(|(s, _)| s).collect();
        assert_eq!(labels, vec!["vti", "iwn", "vtv"]);
        assert_eq!(r.weights_percentages.get("VTI"), Some(75.0));
        assert_eq!(r.optimal_weights.get("iwn"), Some(0.25));
    }

    #[test]
    fn test_json_shape() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let r = assemble_result("EBI", &baselines(), &optimization(vec![0.75, 0.25, 0.0]), metrics(), ts);
        let json = serde_json::to_value(&r).unwrap();

        assert_eq!(json["targetEtf"], "EBI");
        assert_eq!(json["timestamp"], "2024-03-01T12:00:00Z");
        assert_eq!(json["optimalWeights"]["vti"], 0.75);
        assert_eq!(json["weightsPercentages"]["iwn"], 25.0);
        assert_eq!(json["optimizationMetrics"]["totalStocks"], 2);
        assert_eq!(json["constraints"]["weightsSum"], 1.0);
        assert_eq!(json["constraints"]["allWeightsNonNegative"], true);

        let text = serde_json::to_string(&r.optimal_weights).unwrap();
        assert_eq!(text, r#"{"vti":0.75,"iwn":0.25,"vtv":0.0}"#);

        let back: ApproximationResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn test_constraint_check_detects_violations() {
        let c = check_constraints(&[1.2, -0.2]);
        assert!(!c.all_weights_non_negative);
        assert!(!c.all_weights_less_than_one);
        assert!(!c.is_satisfied());

        let ok = check_constraints(&[0.5, 0.5]);
        assert!(ok.is_satisfied());
    }
}
