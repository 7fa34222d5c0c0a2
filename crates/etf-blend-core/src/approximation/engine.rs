//! One approximation run, end to end.
//!
//! The run has two phases. The fetch phase calls the weight map provider for
//! every fund and finishes before anything numeric starts. The numeric phase
//! (normalize, build, solve, measure, assemble) is pure and owns its problem
//! data, so independent runs can execute concurrently.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::approximation::config::EngineConfig;
use crate::approximation::linalg::project_simplex;
use crate::approximation::matrix::build_matrix;
use crate::approximation::metrics::calculate_metrics;
use crate::approximation::problem::{default_initial_guess, OptimizationProblem};
use crate::approximation::result::{assemble_result, ApproximationResult};
use crate::approximation::solver::solve;
use crate::diagnostics::{Diagnostics, ValidationWarning};
use crate::error::BlendError;
use crate::holdings::normalize::{normalize_fund, NormalizedFund};
use crate::holdings::provider::{HoldingRow, HoldingsTable, WeightMapProvider};
use crate::holdings::universe::{resolve_universe, ResolvedUniverse};
use crate::types::{with_metadata, ComputationOutput};
use crate::BlendResult;

/// Slack before a caller-supplied guess counts as off the simplex.
const GUESS_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Self-contained request: the holdings travel with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproximationRequest {
    pub target_etf: String,
    pub baseline_etfs: Vec<String>,
    pub holdings: Vec<HoldingRow>,
    #[serde(default)]
    pub config: EngineConfig,
}

/// Resolved universe as reported to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniverseReport {
    pub target_etf: String,
    pub baseline_etfs: Vec<String>,
    pub total_stocks: usize,
    pub symbols: Vec<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Approximate `target` as a convex blend of `baselines`.
pub fn approximate(
    target: &str,
    baselines: &[String],
    provider: &dyn WeightMapProvider,
    config: &EngineConfig,
) -> BlendResult<ComputationOutput<ApproximationResult>> {
    let start = Instant::now();
    config.validate()?;
    check_guess_length(config, baselines.len())?;

    let resolved = resolve_universe(
        target,
        baselines,
        provider,
        config.weight_field,
        &config.reserved_symbols,
    )?;

    let (result, diagnostics) = run_numeric_phase(&resolved, config)?;

    tracing::info!(
        target = %result.target_etf,
        baselines = result.baseline_etfs.len(),
        total_stocks = result.optimization_metrics.total_stocks,
        final_objective = result.optimization_metrics.final_objective_value,
        warnings = diagnostics.len(),
        "approximation complete"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Constrained least-squares blend over the probability simplex",
        &serde_json::json!({
            "weight_field": config.weight_field,
            "method": config.solver.method,
            "max_iterations": config.solver.max_iterations,
            "sum_tolerance": config.sum_tolerance,
            "error_threshold": config.error_threshold,
            "polish": config.solver.polish,
        }),
        diagnostics.into_vec(),
        elapsed,
        result,
    ))
}

/// Run [`approximate`] against the holdings embedded in `request`.
pub fn approximate_request(
    request: &ApproximationRequest,
) -> BlendResult<ComputationOutput<ApproximationResult>> {
    let table = HoldingsTable::from_rows(request.holdings.iter().cloned());
    approximate(
        &request.target_etf,
        &request.baseline_etfs,
        &table,
        &request.config,
    )
}

/// Resolve only the symbol universe for `request`.
pub fn universe_request(request: &ApproximationRequest) -> BlendResult<ComputationOutput<UniverseReport>> {
    let start = Instant::now();
    let table = HoldingsTable::from_rows(request.holdings.iter().cloned());
    let resolved = resolve_universe(
        &request.target_etf,
        &request.baseline_etfs,
        &table,
        request.config.weight_field,
        &request.config.reserved_symbols,
    )?;

    let report = UniverseReport {
        target_etf: resolved.target.symbol.clone(),
        baseline_etfs: resolved.baselines.iter().map(|b| b.symbol.clone()).collect(),
        total_stocks: resolved.universe.len(),
        symbols: resolved.universe.as_slice().to_vec(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Union of target and baseline holdings minus reserved symbols",
        &serde_json::json!({
            "weight_field": request.config.weight_field,
            "reserved_symbols": request.config.reserved_symbols,
        }),
        resolved.diagnostics.into_vec(),
        elapsed,
        report,
    ))
}

/// The default heuristic or the caller's guess, placed on the simplex.
///
/// A guess that is already feasible is used as given. Anything else is
/// projected onto the simplex and reported.
pub fn prepare_initial_guess(
    config: &EngineConfig,
    k: usize,
    diagnostics: &mut Diagnostics,
) -> BlendResult<Vec<f64>> {
    check_guess_length(config, k)?;
    let Some(ref guess) = config.initial_guess else {
        return Ok(default_initial_guess(k));
    };

    let on_simplex = (guess.iter().sum::<f64>() - 1.0).abs() <= GUESS_TOLERANCE
        && guess.iter().all(|x| *x >= 0.0 && *x <= 1.0);
    if on_simplex {
        return Ok(guess.clone());
    }

    let used = project_simplex(guess);
    diagnostics.push(ValidationWarning::InitialGuessProjected {
        provided: guess.clone(),
        used: used.clone(),
    });
    Ok(used)
}

// ---------------------------------------------------------------------------
// Numeric phase
// ---------------------------------------------------------------------------

fn run_numeric_phase(
    resolved: &ResolvedUniverse,
    config: &EngineConfig,
) -> BlendResult<(ApproximationResult, Diagnostics)> {
    let mut diagnostics = resolved.diagnostics.clone();

    let (target, d) = normalize_fund(&resolved.target, &resolved.universe, config.sum_tolerance);
    diagnostics.extend(d);
    let mut baselines: Vec<NormalizedFund> = Vec::with_capacity(resolved.baselines.len());
    for fund in &resolved.baselines {
        let (normalized, d) = normalize_fund(fund, &resolved.universe, config.sum_tolerance);
        diagnostics.extend(d);
        baselines.push(normalized);
    }

    let (target_vec, matrix) = build_matrix(&resolved.universe, &target, &baselines);
    let problem = OptimizationProblem::new(target_vec, matrix)?;

    let w0 = prepare_initial_guess(config, problem.k(), &mut diagnostics)?;
    let optimization = solve(&problem, &w0, &config.solver)?;
    let metrics = calculate_metrics(&problem, &optimization, config.error_threshold);

    let baseline_symbols: Vec<String> = resolved.baselines.iter().map(|b| b.symbol.clone()).collect();
    let result = assemble_result(
        &resolved.target.symbol,
        &baseline_symbols,
        &optimization,
        metrics,
        Utc::now(),
    );
    Ok((result, diagnostics))
}

fn check_guess_length(config: &EngineConfig, k: usize) -> BlendResult<()> {
    match config.initial_guess {
        Some(ref guess) if guess.len() != k => Err(BlendError::configuration(
            "initialGuess",
            format!(
                "expected {} weights (one per baseline) but got {}",
                k,
                guess.len()
            ),
        )),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn toy_table() -> HoldingsTable {
        HoldingsTable::new()
            .with_fund("VTI", &[("AAA", 0.6), ("BBB", 0.4)])
            .with_fund("IWN", &[("AAA", 0.2), ("BBB", 0.8)])
            .with_fund("VTV", &[("AAA", 0.5), ("BBB", 0.5)])
            .with_fund("EBI", &[("AAA", 0.5), ("BBB", 0.5)])
    }

    fn toy_baselines() -> Vec<String> {
        vec!["VTI".into(), "IWN".into(), "VTV".into()]
    }

    #[test]
    fn test_toy_scenario() {
        let out = approximate("EBI", &toy_baselines(), &toy_table(), &EngineConfig::default())
            .unwrap();
        let r = &out.result;

        assert!((r.optimal_weights.get("vti").unwrap() - 0.75).abs() < 1e-6);
        assert!((r.optimal_weights.get("iwn").unwrap() - 0.25).abs() < 1e-6);
        assert!(r.optimal_weights.get("vtv").unwrap().abs() < 1e-6);
        assert!(r.optimization_metrics.final_objective_value < 1e-12);
        assert!((r.constraints.weights_sum - 1.0).abs() < 1e-9);
        assert!(r.constraints.is_satisfied());
        assert_eq!(r.optimization_metrics.total_stocks, 2);
        assert_eq!(r.optimization_metrics.error_count, 0);
        assert!((r.optimization_metrics.improvement_percent - 100.0).abs() < 1e-6);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_empty_baselines_fail_before_fetch() {
        let err = approximate("EBI", &[], &toy_table(), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, BlendError::Configuration { .. }));
    }

    #[test]
    fn test_guess_length_mismatch() {
        let cfg = EngineConfig::default().with_initial_guess(vec![0.5, 0.5]);
        let err = approximate("EBI", &toy_baselines(), &toy_table(), &cfg).unwrap_err();
        match err {
            BlendError::Configuration { field, .. } => assert_eq!(field, "initialGuess"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_custom_guess_used() {
        let cfg = EngineConfig::default().with_initial_guess(vec![0.0, 0.0, 1.0]);
        let out = approximate("EBI", &toy_baselines(), &toy_table(), &cfg).unwrap();
        // The start is already an exact blend.
        assert_eq!(out.result.optimization_metrics.initial_objective_value, 0.0);
        assert_eq!(out.result.optimization_metrics.improvement_percent, 0.0);
        assert!(out.result.optimization_metrics.final_objective_value <= 1e-30);
    }

    #[test]
    fn test_off_simplex_guess_projected_with_warning() {
        let mut d = Diagnostics::new();
        let cfg = EngineConfig::default().with_initial_guess(vec![2.0, 0.0]);
        let w = prepare_initial_guess(&cfg, 2, &mut d).unwrap();
        assert_eq!(w, vec![1.0, 0.0]);
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_feasible_guess_kept_without_warning() {
        let mut d = Diagnostics::new();
        let cfg = EngineConfig::default().with_initial_guess(vec![0.2, 0.8]);
        let w = prepare_initial_guess(&cfg, 2, &mut d).unwrap();
        assert_eq!(w, vec![0.2, 0.8]);
        assert!(d.is_empty());
    }

    #[test]
    fn test_request_round_trip() {
        let json = serde_json::json!({
            "targetEtf": "EBI",
            "baselineEtfs": ["VTI", "IWN", "VTV"],
            "holdings": [
                {"etf_symbol": "VTI", "stock_symbol": "AAA", "weight": 0.6},
                {"etf_symbol": "VTI", "stock_symbol": "BBB", "weight": 0.4},
                {"etf_symbol": "IWN", "stock_symbol": "AAA", "weight": 0.2},
                {"etf_symbol": "IWN", "stock_symbol": "BBB", "weight": 0.8},
                {"etf_symbol": "VTV", "stock_symbol": "AAA", "weight": 0.5},
                {"etf_symbol": "VTV", "stock_symbol": "BBB", "weight": 0.5},
                {"etf_symbol": "EBI", "stock_symbol": "AAA", "weight": 0.5},
                {"etf_symbol": "EBI", "stock_symbol": "BBB", "weight": 0.5}
            ]
        });
        let request: ApproximationRequest = serde_json::from_value(json).unwrap();
        let out = approximate_request(&request).unwrap();
        assert_eq!(out.result.baseline_etfs, toy_baselines());
        assert!(out.result.constraints.is_satisfied());
    }

    #[test]
    fn test_universe_request_reports_filtered_symbols() {
        let mut rows = vec![HoldingRow {
            etf_symbol: "EBI".into(),
            stock_symbol: "TEST1".into(),
            weight: 0.01,
            actual_weight: None,
        }];
        rows.push(HoldingRow {
            etf_symbol: "VTI".into(),
            stock_symbol: "AAA".into(),
            weight: 1.0,
            actual_weight: None,
        });
        let request = ApproximationRequest {
            target_etf: "EBI".into(),
            baseline_etfs: vec!["VTI".into()],
            holdings: rows,
            config: EngineConfig::default().with_reserved_symbols(["TEST1"]),
        };
        let out = universe_request(&request).unwrap();
        assert_eq!(out.result.symbols, vec!["AAA".to_string()]);
        assert_eq!(out.warnings.len(), 1);
    }
}
