//! Least-squares blend problem over the probability simplex.
//!
//! minimize   f(w) = sum_i ( sum_j A[i][j] * w[j] - t[i] )^2
//! subject to sum_j w[j] = 1,  0 <= w[j] <= 1

use serde::{Deserialize, Serialize};

use crate::approximation::matrix::WeightMatrix;
use crate::error::BlendError;
use crate::BlendResult;

/// Share of the initial guess placed on the first baseline.
pub const PRIMARY_BASELINE_SHARE: f64 = 0.75;

/// Immutable problem data for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationProblem {
    target: Vec<f64>,
    matrix: WeightMatrix,
}

/// f(w) = w'Qw - 2c'w + t't, with Q = A'A and c = A't.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticForm {
    pub q: Vec<Vec<f64>>,
    pub c: Vec<f64>,
    pub t_sq: f64,
}

impl OptimizationProblem {
    pub fn new(target: Vec<f64>, matrix: WeightMatrix) -> BlendResult<Self> {
        if matrix.cols() == 0 {
            return Err(BlendError::configuration(
                "baselineEtfs",
                "at least one baseline column is required",
            ));
        }
        if target.len() != matrix.rows() {
            return Err(BlendError::configuration(
                "target",
                format!(
                    "target has {} entries but matrix has {} rows",
                    target.len(),
                    matrix.rows()
                ),
            ));
        }
        if matrix.rows() == 0 {
            return Err(BlendError::data("matrix", "symbol universe is empty"));
        }
        let finite = target.iter().all(|v| v.is_finite())
            && (0..matrix.rows()).all(|i| matrix.row(i).iter().all(|v| v.is_finite()));
        if !finite {
            return Err(BlendError::data("matrix", "non-finite weight in problem data"));
        }
        Ok(OptimizationProblem { target, matrix })
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }

    pub fn matrix(&self) -> &WeightMatrix {
        &self.matrix
    }

    /// Number of universe symbols.
    pub fn n(&self) -> usize {
        self.matrix.rows()
    }

    /// Number of baseline funds.
    pub fn k(&self) -> usize {
        self.matrix.cols()
    }

    /// A*w - t
    pub fn residuals(&self, w: &[f64]) -> Vec<f64> {
        self.matrix
            .mul_vec(w)
            .iter()
            .zip(&self.target)
            .map(|(s, t)| s - t)
            .collect()
    }

    /// Sum of squared residuals, evaluated row by row.
    pub fn objective(&self, w: &[f64]) -> f64 {
        self.residuals(w).iter().map(|r| r * r).sum()
    }

    /// 2 * A'(A*w - t)
    pub fn gradient(&self, w: &[f64]) -> Vec<f64> {
        self.matrix
            .transpose_mul_vec(&self.residuals(w))
            .into_iter()
            .map(|g| 2.0 * g)
            .collect()
    }

    /// Reduce the N-row problem to its K x K quadratic form.
    pub fn quadratic_form(&self) -> QuadraticForm {
        QuadraticForm {
            q: self.matrix.gram(),
            c: self.matrix.transpose_mul_vec(&self.target),
            t_sq: self.target.iter().map(|t| t * t).sum(),
        }
    }

    /// Whether `w` lies on the simplex within `tol`.
    pub fn is_feasible(&self, w: &[f64], tol: f64) -> bool {
        w.len() == self.k()
            && (w.iter().sum::<f64>() - 1.0).abs() <= tol
            && w.iter().all(|wi| *wi >= -tol && *wi <= 1.0 + tol)
    }
}

impl QuadraticForm {
    pub fn dim(&self) -> usize {
        self.c.len()
    }

    /// Q*w
    pub fn q_mul(&self, w: &[f64]) -> Vec<f64> {
        self.q
            .iter()
            .map(|row| row.iter().zip(w).map(|(a, b)| a * b).sum())
            .collect()
    }

    /// 2(Qw - c)
    pub fn gradient(&self, w: &[f64]) -> Vec<f64> {
        self.q_mul(w)
            .iter()
            .zip(&self.c)
            .map(|(qw, c)| 2.0 * (qw - c))
            .collect()
    }

    pub fn value(&self, w: &[f64]) -> f64 {
        let qw = self.q_mul(w);
        let wqw: f64 = w.iter().zip(&qw).map(|(a, b)| a * b).sum();
        let cw: f64 = w.iter().zip(&self.c).map(|(a, b)| a * b).sum();
        (wqw - 2.0 * cw + self.t_sq).max(0.0)
    }
}

/// Default starting point: 0.75 on the first baseline, the rest split evenly.
/// A single baseline starts (and ends) at 1.0.
pub fn default_initial_guess(k: usize) -> Vec<f64> {
    match k {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let rest = (1.0 - PRIMARY_BASELINE_SHARE) / (k - 1) as f64;
            let mut w = vec![rest; k];
            w[0] = PRIMARY_BASELINE_SHARE;
            w
        }
    }
}
