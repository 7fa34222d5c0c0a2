//! Fit-quality diagnostics for a solved blend. Descriptive only.

use serde::{Deserialize, Serialize};

use crate::approximation::problem::OptimizationProblem;
use crate::approximation::solver::OptimizationResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationMetrics {
    pub final_objective_value: f64,
    pub initial_objective_value: f64,
    /// 100 * (f(w0) - f(w*)) / f(w0); 0 when f(w0) is 0.
    pub improvement_percent: f64,
    /// Mean |synthetic - target| over the universe.
    pub average_error: f64,
    pub max_error: f64,
    /// Symbols whose absolute error exceeds the threshold.
    pub error_count: usize,
    /// Universe size N.
    pub total_stocks: usize,
}

/// Compare the blended portfolio against the target, symbol by symbol.
pub fn calculate_metrics(
    problem: &OptimizationProblem,
    result: &OptimizationResult,
    error_threshold: f64,
) -> OptimizationMetrics {
    let errors: Vec<f64> = problem
        .residuals(&result.weights)
        .into_iter()
        .map(f64::abs)
        .collect();
    let n = errors.len();

    let average_error = if n == 0 {
        0.0
    } else {
        errors.iter().sum::<f64>() / n as f64
    };
    let max_error = errors.iter().copied().fold(0.0_f64, f64::max);
    let error_count = errors.iter().filter(|e| **e > error_threshold).count();

    OptimizationMetrics {
        final_objective_value: result.final_objective,
        initial_objective_value: result.initial_objective,
        improvement_percent: improvement_percent(result.initial_objective, result.final_objective),
        average_error,
        max_error,
        error_count,
        total_stocks: n,
    }
}

/// Relative objective reduction in percent.
pub fn improvement_percent(initial: f64, last: f64) -> f64 {
    if initial == 0.0 {
        0.0
    } else {
        100.0 * (initial - last) / initial
    }
}
