//! Constrained least-squares solver over the simplex.
//!
//! Both methods work on the K x K quadratic form, so the cost per iteration is
//! independent of the universe size. Objective values reported to callers are
//! always re-evaluated on the full N-row residuals.

use serde::{Deserialize, Serialize};

use crate::approximation::config::{SolverMethod, SolverOptions};
use crate::approximation::linalg::{max_abs, project_simplex, solve_linear};
use crate::approximation::polish::reduce_to_basic;
use crate::approximation::problem::{OptimizationProblem, QuadraticForm};
use crate::error::BlendError;
use crate::BlendResult;

/// Feasibility slack accepted on a starting point.
const START_FEASIBILITY_TOL: f64 = 1e-9;

/// Levenberg damping on the KKT system, relative to the largest diagonal of Q.
const KKT_DAMPING: f64 = 1e-10;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Converged solver output. Never mutated after it is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Optimal baseline weights, in baseline order.
    pub weights: Vec<f64>,
    pub final_objective: f64,
    pub initial_objective: f64,
    /// The starting point the solver was given.
    pub initial_weights: Vec<f64>,
    pub method: SolverMethod,
    pub iterations: u32,
    /// Null-space moves made while reducing a degenerate optimum.
    pub polish_moves: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Solve `problem` from the feasible starting point `w0`.
///
/// Fails with `OptimizationFailure` when the iteration budget runs out; a
/// non-converged point is never returned. The result is never worse than `w0`.
pub fn solve(
    problem: &OptimizationProblem,
    w0: &[f64],
    options: &SolverOptions,
) -> BlendResult<OptimizationResult> {
    if w0.len() != problem.k() {
        return Err(BlendError::configuration(
            "initialGuess",
            format!(
                "expected {} weights (one per baseline) but got {}",
                problem.k(),
                w0.len()
            ),
        ));
    }
    if !problem.is_feasible(w0, START_FEASIBILITY_TOL) {
        return Err(BlendError::configuration(
            "initialGuess",
            format!("{:?} is not on the simplex", w0),
        ));
    }

    let qf = problem.quadratic_form();
    let (mut w, iterations) = match options.method {
        SolverMethod::ActiveSet => active_set(&qf, w0, options)?,
        SolverMethod::ProjectedGradient => projected_gradient(&qf, w0, options)?,
    };

    let mut polish_moves = 0;
    if options.polish {
        let (reduced, moves) = reduce_to_basic(problem, &qf, w);
        w = reduced;
        polish_moves = moves;
    }
    let mut w = clamp_to_simplex(w);

    let initial_objective = problem.objective(w0);
    let mut final_objective = problem.objective(&w);
    if final_objective > initial_objective {
        tracing::debug!(
            final_objective,
            initial_objective,
            "solver point worse than start, keeping start"
        );
        w = w0.to_vec();
        final_objective = initial_objective;
    }

    tracing::debug!(
        method = %options.method,
        iterations,
        polish_moves,
        final_objective,
        "solver converged"
    );

    Ok(OptimizationResult {
        weights: w,
        final_objective,
        initial_objective,
        initial_weights: w0.to_vec(),
        method: options.method,
        iterations,
        polish_moves,
    })
}

// ---------------------------------------------------------------------------
// Active set
// ---------------------------------------------------------------------------

/// Primal active-set method for min w'Qw - 2c'w on the simplex.
///
/// The working set holds indices pinned at zero. On each face the
/// equality-constrained step comes from the damped KKT system; stationarity
/// and the sign of the bound multipliers are judged on the undamped gradient.
fn active_set(
    qf: &QuadraticForm,
    w0: &[f64],
    options: &SolverOptions,
) -> BlendResult<(Vec<f64>, u32)> {
    let k = qf.dim();
    let mut w: Vec<f64> = w0.iter().map(|x| x.max(0.0)).collect();
    let mut active: Vec<bool> = w.iter().map(|x| *x <= 0.0).collect();

    let q_scale = (0..k).fold(0.0_f64, |m, i| m.max(qf.q[i][i]));
    let damping = KKT_DAMPING * q_scale.max(f64::MIN_POSITIVE);
    let mut last_step = f64::INFINITY;

    for iter in 0..options.max_iterations {
        let grad = qf.gradient(&w);
        let free: Vec<usize> = (0..k).filter(|&i| !active[i]).collect();
        let nu = free.iter().map(|&i| grad[i]).sum::<f64>() / free.len() as f64;
        let gtol = options.gradient_tolerance.bound(max_abs(&grad));

        let on_face_optimum = free.iter().all(|&i| (grad[i] - nu).abs() <= gtol);
        if !on_face_optimum {
            let Some(p) = kkt_step(qf, &free, &grad, damping) else {
                tracing::debug!(iteration = iter, free = free.len(), "singular KKT system");
                return Err(BlendError::OptimizationFailure {
                    method: SolverMethod::ActiveSet.to_string(),
                    iterations: iter + 1,
                    last_step,
                });
            };
            let step_norm = max_abs(&p);
            if step_norm > options.step_tolerance.bound(max_abs(&w)) {
                // Ratio test against the zero bounds of the free weights.
                let mut alpha = 1.0;
                let mut blocking = None;
                for (pi, &i) in p.iter().zip(&free) {
                    if *pi < 0.0 {
                        let a = w[i] / -pi;
                        if a < alpha {
                            alpha = a;
                            blocking = Some(i);
                        }
                    }
                }
                for (pi, &i) in p.iter().zip(&free) {
                    w[i] += alpha * pi;
                }
                if let Some(b) = blocking {
                    w[b] = 0.0;
                    active[b] = true;
                }
                for &i in &free {
                    if w[i] <= 0.0 {
                        w[i] = 0.0;
                        active[i] = true;
                    }
                }
                last_step = alpha * step_norm;
                continue;
            }
            last_step = step_norm;
        }

        // Stationary on this face: release the bound with the most negative multiplier.
        let release = (0..k)
            .filter(|&i| active[i])
            .map(|i| (i, grad[i] - nu))
            .filter(|(_, lambda)| *lambda < -gtol)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        match release {
            Some((i, _)) => active[i] = false,
            None => return Ok((w, iter + 1)),
        }
    }

    Err(BlendError::OptimizationFailure {
        method: SolverMethod::ActiveSet.to_string(),
        iterations: options.max_iterations,
        last_step,
    })
}

/// Step p on the free set minimizing the quadratic model with sum(p) = 0.
///
/// [ 2Q_FF + dI  1 ] [ p ]   [ -g_F ]
/// [ 1'          0 ] [ v ] = [  0   ]
fn kkt_step(qf: &QuadraticForm, free: &[usize], grad: &[f64], damping: f64) -> Option<Vec<f64>> {
    let m = free.len();
    let mut a = vec![vec![0.0; m + 1]; m + 1];
    let mut b = vec![0.0; m + 1];
    for (r, &i) in free.iter().enumerate() {
        for (c, &j) in free.iter().enumerate() {
            a[r][c] = 2.0 * qf.q[i][j];
        }
        a[r][r] += damping;
        a[r][m] = 1.0;
        a[m][r] = 1.0;
        b[r] = -grad[i];
    }
    let mut x = solve_linear(a, b)?;
    x.truncate(m);
    Some(x)
}

// ---------------------------------------------------------------------------
// Projected gradient
// ---------------------------------------------------------------------------

/// Gradient steps of length 1/L projected onto the simplex.
///
/// L bounds the largest eigenvalue of 2Q (Gershgorin), so every step is a
/// descent step.
fn projected_gradient(
    qf: &QuadraticForm,
    w0: &[f64],
    options: &SolverOptions,
) -> BlendResult<(Vec<f64>, u32)> {
    let lipschitz = 2.0
        * qf
            .q
            .iter()
            .map(|row| row.iter().map(|x| x.abs()).sum::<f64>())
            .fold(0.0_f64, f64::max);

    let mut w = project_simplex(w0);
    if lipschitz <= f64::MIN_POSITIVE {
        // Q = 0: the objective is constant on the simplex.
        return Ok((w, 0));
    }

    let mut last_step = f64::INFINITY;
    for iter in 0..options.max_iterations {
        let grad = qf.gradient(&w);
        let candidate: Vec<f64> = w
            .iter()
            .zip(&grad)
            .map(|(wi, gi)| wi - gi / lipschitz)
            .collect();
        let next = project_simplex(&candidate);

        let delta: Vec<f64> = next.iter().zip(&w).map(|(a, b)| a - b).collect();
        let step = max_abs(&delta);
        w = next;
        last_step = step;

        let step_ok = step <= options.step_tolerance.bound(max_abs(&w));
        let grad_ok = step * lipschitz <= options.gradient_tolerance.bound(max_abs(&grad));
        if step_ok || grad_ok {
            return Ok((w, iter + 1));
        }
    }

    Err(BlendError::OptimizationFailure {
        method: SolverMethod::ProjectedGradient.to_string(),
        iterations: options.max_iterations,
        last_step,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Clamp to [0, 1] and rescale to sum to 1.
fn clamp_to_simplex(w: Vec<f64>) -> Vec<f64> {
    let clamped: Vec<f64> = w.into_iter().map(|x| x.clamp(0.0, 1.0)).collect();
    let total: f64 = clamped.iter().sum();
    if total <= 0.0 {
        return clamped;
    }
    clamped.into_iter().map(|x| (x / total).min(1.0)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
