//! Reduction of a degenerate optimum to a basic blend.
//!
//! When the baseline columns in the support are linearly dependent (once the
//! sum-to-one row is included) the optimum is a whole face, not a point. Moving
//! along a null-space direction leaves A*w, and therefore the objective,
//! unchanged; each move runs until a weight reaches zero. The direction always
//! drains the last dependent baseline, so earlier baselines keep their weight.

use crate::approximation::linalg::null_vector;
use crate::approximation::problem::{OptimizationProblem, QuadraticForm};

/// Pivot threshold for rank decisions on the scaled system.
const RANK_TOL: f64 = 1e-9;

/// Relative objective increase tolerated from rounding on a null-space move.
const OBJECTIVE_SLACK: f64 = 1e-9;

/// Returns the reduced weights and the number of moves made.
pub fn reduce_to_basic(
    problem: &OptimizationProblem,
    qf: &QuadraticForm,
    mut w: Vec<f64>,
) -> (Vec<f64>, usize) {
    let mut moves = 0;
    let mut objective = problem.objective(&w);

    for _ in 0..w.len() {
        let support: Vec<usize> = (0..w.len()).filter(|&i| w[i] > 0.0).collect();
        if support.len() <= 1 {
            break;
        }

        let Some(d) = null_vector(support_system(qf, &support), RANK_TOL) else {
            break;
        };

        // Longest move along -d that keeps every weight non-negative.
        let mut t = f64::INFINITY;
        let mut blocking = None;
        for (di, &i) in d.iter().zip(&support) {
            if *di > 0.0 {
                let ti = w[i] / di;
                if ti < t {
                    t = ti;
                    blocking = Some(i);
                }
            }
        }
        let Some(b) = blocking else {
            break;
        };

        let mut candidate = w.clone();
        for (di, &i) in d.iter().zip(&support) {
            candidate[i] = (candidate[i] - t * di).max(0.0);
        }
        candidate[b] = 0.0;

        let next = problem.objective(&candidate);
        if next > objective * (1.0 + OBJECTIVE_SLACK) + 1e-15 {
            tracing::debug!(objective, next, "null-space move rejected");
            break;
        }

        w = candidate;
        objective = next;
        moves += 1;
    }

    (w, moves)
}

/// [ Q_SS / s ]
/// [   1'     ]
/// whose null space is null(A_S) intersected with {sum = 0}.
fn support_system(qf: &QuadraticForm, support: &[usize]) -> Vec<Vec<f64>> {
    let scale = support.iter().fold(0.0_f64, |m, &i| m.max(qf.q[i][i]));
    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(support.len() + 1);
    if scale > f64::MIN_POSITIVE {
        for &i in support {
            rows.push(support.iter().map(|&j| qf.q[i][j] / scale).collect());
        }
    }
    rows.push(vec![1.0; support.len()]);
    rows
}
