//! Engine configuration.
//!
//! Every field has a default so a config file only needs the overrides.
//! The normalization band and per-symbol error threshold default to the
//! values the dashboard was built against; both are tunable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::BlendError;
use crate::holdings::normalize::DEFAULT_SUM_TOLERANCE;
use crate::holdings::provider::WeightField;
use crate::BlendResult;

pub const DEFAULT_MAX_ITERATIONS: u32 = 5000;
pub const DEFAULT_TOLERANCE: f64 = 1e-7;
/// 0.1 percentage points.
pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.001;

/// Solver algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverMethod {
    /// Primal active-set QP on the K x K Gram system.
    #[default]
    ActiveSet,
    /// Gradient steps of length 1/L projected onto the simplex.
    ///
    /// Converges linearly, so it is only suitable for well-conditioned
    /// baseline sets. Nearly dependent baselines (overlapping share classes,
    /// near-duplicate index funds) can exhaust the iteration budget.
    ProjectedGradient,
}

impl fmt::Display for SolverMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverMethod::ActiveSet => write!(f, "active_set"),
            SolverMethod::ProjectedGradient => write!(f, "projected_gradient"),
        }
    }
}

/// Absolute and relative convergence thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tolerance {
    pub absolute: f64,
    pub relative: f64,
}

impl Tolerance {
    /// Threshold for a quantity whose natural scale is `scale`.
    pub fn bound(&self, scale: f64) -> f64 {
        self.absolute + self.relative * scale.abs()
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance {
            absolute: DEFAULT_TOLERANCE,
            relative: DEFAULT_TOLERANCE,
        }
    }
}

/// Solver budgets and switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverOptions {
    pub method: SolverMethod,
    pub max_iterations: u32,
    pub step_tolerance: Tolerance,
    pub gradient_tolerance: Tolerance,
    /// Reduce degenerate optima to a basic (sparsest) blend.
    pub polish: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            method: SolverMethod::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            step_tolerance: Tolerance::default(),
            gradient_tolerance: Tolerance::default(),
            polish: true,
        }
    }
}

/// Configuration accepted by one approximation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub weight_field: WeightField,
    /// Overrides the default starting point; length must equal the baseline count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_guess: Option<Vec<f64>>,
    #[serde(flatten)]
    pub solver: SolverOptions,
    /// Fixture tickers that must never enter a production universe.
    pub reserved_symbols: BTreeSet<String>,
    /// Relative band around 1.0 for raw weight sums.
    pub sum_tolerance: f64,
    /// Per-symbol absolute error counted by `errorCount`.
    pub error_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            weight_field: WeightField::default(),
            initial_guess: None,
            solver: SolverOptions::default(),
            reserved_symbols: BTreeSet::new(),
            sum_tolerance: DEFAULT_SUM_TOLERANCE,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
        }
    }
}

impl EngineConfig {
    pub fn with_initial_guess(mut self, guess: Vec<f64>) -> Self {
        self.initial_guess = Some(guess);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.solver.max_iterations = max_iterations;
        self
    }

    pub fn with_method(mut self, method: SolverMethod) -> Self {
        self.solver.method = method;
        self
    }

    pub fn with_reserved_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    /// Reject budgets and thresholds that cannot produce a meaningful run.
    pub fn validate(&self) -> BlendResult<()> {
        if self.solver.max_iterations == 0 {
            return Err(BlendError::configuration(
                "maxIterations",
                "must be at least 1",
            ));
        }
        for (field, tol) in [
            ("stepTolerance", &self.solver.step_tolerance),
            ("gradientTolerance", &self.solver.gradient_tolerance),
        ] {
            let valid = tol.absolute.is_finite()
                && tol.relative.is_finite()
                && tol.absolute >= 0.0
                && tol.relative >= 0.0
                && tol.absolute + tol.relative > 0.0;
            if !valid {
                return Err(BlendError::configuration(
                    field,
                    format!(
                        "absolute {} / relative {} must be non-negative and not both zero",
                        tol.absolute, tol.relative
                    ),
                ));
            }
        }
        if !(self.sum_tolerance.is_finite() && self.sum_tolerance >= 0.0) {
            return Err(BlendError::configuration(
                "sumTolerance",
                format!("{} must be a non-negative number", self.sum_tolerance),
            ));
        }
        if !(self.error_threshold.is_finite() && self.error_threshold >= 0.0) {
            return Err(BlendError::configuration(
                "errorThreshold",
                format!("{} must be a non-negative number", self.error_threshold),
            ));
        }
        if let Some(ref guess) = self.initial_guess {
            if let Some(bad) = guess.iter().find(|v| !v.is_finite()) {
                return Err(BlendError::configuration(
                    "initialGuess",
                    format!("non-finite value {}", bad),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.weight_field, WeightField::Weight);
        assert_eq!(cfg.solver.max_iterations, 5000);
        assert_eq!(cfg.solver.method, SolverMethod::ActiveSet);
        assert!(cfg.reserved_symbols.is_empty());
        assert!((cfg.sum_tolerance - 0.05).abs() < 1e-15);
        assert!((cfg.error_threshold - 0.001).abs() < 1e-15);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str(
            r#"{"weightField": "actual_weight", "maxIterations": 200, "method": "projected_gradient"}"#,
        )
        .unwrap();
        assert_eq!(cfg.weight_field, WeightField::ActualWeight);
        assert_eq!(cfg.solver.max_iterations, 200);
        assert_eq!(cfg.solver.method, SolverMethod::ProjectedGradient);
        assert!(cfg.solver.polish);
        assert_eq!(cfg.initial_guess, None);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let cfg = EngineConfig::default().with_max_iterations(0);
        assert!(matches!(
            cfg.validate(),
            Err(BlendError::Configuration { .. })
        ));
    }

    #[test]
    fn test_zero_tolerance_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.solver.step_tolerance = Tolerance {
            absolute: 0.0,
            relative: 0.0,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_non_finite_guess_rejected() {
        let cfg = EngineConfig::default().with_initial_guess(vec![f64::NAN, 1.0]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_tolerance_bound() {
        let t = Tolerance {
            absolute: 1e-7,
            relative: 1e-3,
        };
        assert!((t.bound(-2.0) - (1e-7 + 2e-3)).abs() < 1e-18);
    }
}
