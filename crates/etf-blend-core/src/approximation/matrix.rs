//! Alignment of fund weights onto the universe axis.

use serde::{Deserialize, Serialize};

use crate::error::BlendError;
use crate::holdings::normalize::NormalizedFund;
use crate::holdings::universe::SymbolUniverse;
use crate::BlendResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Dense N x K matrix, row-major. Row i is a universe symbol, column j a baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl WeightMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        WeightMatrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from row vectors. Every row must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> BlendResult<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(BlendError::configuration(
                    "matrix",
                    format!("Row {} has {} columns, expected {}", i, row.len(), cols),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(WeightMatrix {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// A * w: the blended (synthetic) portfolio.
    pub fn mul_vec(&self, w: &[f64]) -> Vec<f64> {
        (0..self.rows)
            .map(|i| self.row(i).iter().zip(w).map(|(a, b)| a * b).sum())
            .collect()
    }

    /// A' * v
    pub fn transpose_mul_vec(&self, v: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.cols];
        for (i, vi) in v.iter().enumerate().take(self.rows) {
            for (o, a) in out.iter_mut().zip(self.row(i)) {
                *o += a * vi;
            }
        }
        out
    }

    /// A' * A (K x K).
    #[allow(clippy::needless_range_loop)]
    pub fn gram(&self) -> Vec<Vec<f64>> {
        let k = self.cols;
        let mut g = vec![vec![0.0; k]; k];
        for i in 0..self.rows {
            let row = self.row(i);
            for a in 0..k {
                if row[a] == 0.0 {
                    continue;
                }
                for b in a..k {
                    g[a][b] += row[a] * row[b];
                }
            }
        }
        for a in 0..k {
            for b in 0..a {
                g[a][b] = g[b][a];
            }
        }
        g
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Target vector (length N) and baseline matrix (N x K) on the universe axis.
///
/// Rows follow `universe` order, columns follow `baselines` order. Symbols a
/// fund does not hold are 0.
pub fn build_matrix(
    universe: &SymbolUniverse,
    target: &NormalizedFund,
    baselines: &[NormalizedFund],
) -> (Vec<f64>, WeightMatrix) {
    let n = universe.len();
    let k = baselines.len();

    let target_vec: Vec<f64> = universe
        .iter()
        .map(|t| target.weights.get(t).copied().unwrap_or(0.0))
        .collect();

    let mut matrix = WeightMatrix::zeros(n, k);
    for (j, fund) in baselines.iter().enumerate() {
        for (ticker, w) in &fund.weights {
            if let Some(i) = universe.index_of(ticker) {
                matrix.set(i, j, *w);
            }
        }
    }

    tracing::debug!(rows = n, cols = k, "built weight matrix");
    (target_vec, matrix)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fund(symbol: &str, holdings: &[(&str, f64)]) -> NormalizedFund {
        NormalizedFund {
            symbol: symbol.into(),
            weights: holdings.iter().map(|(t, w)| (t.to_string(), *w)).collect(),
            raw_sum: 1.0,
        }
    }

    #[test]
    fn test_rows_follow_universe_columns_follow_baselines() {
        let universe =
            SymbolUniverse::from_symbols(vec!["CCC".into(), "AAA".into(), "BBB".into()]);
        let target = fund("EBI", &[("AAA", 0.5), ("CCC", 0.5)]);
        let b0 = fund("VTI", &[("BBB", 1.0)]);
        let b1 = fund("IWN", &[("AAA", 0.25), ("CCC", 0.75)]);

        let (t, m) = build_matrix(&universe, &target, &[b0, b1]);

        assert_eq!(t, vec![0.5, 0.0, 0.5]);
        assert_eq!(m.rows(), 3);
        assert_eq!(m.cols(), 2);
        assert_eq!(m.row(0), &[0.0, 0.25]);
        assert_eq!(m.row(1), &[1.0, 0.0]);
        assert_eq!(m.row(2), &[0.0, 0.75]);
    }

    #[test]
    fn test_mul_vec_blends_columns() {
        let m = WeightMatrix::from_rows(&[vec![0.6, 0.2], vec![0.4, 0.8]]).unwrap();
        let s = m.mul_vec(&[0.75, 0.25]);
        assert!((s[0] - 0.5).abs() < 1e-15);
        assert!((s[1] - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_gram_is_symmetric() {
        let m = WeightMatrix::from_rows(&[vec![0.6, 0.2, 0.5], vec![0.4, 0.8, 0.5]]).unwrap();
        let g = m.gram();
        assert!((g[0][1] - 0.44).abs() < 1e-12);
        assert_eq!(g[0][1], g[1][0]);
        assert!((g[2][2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_transpose_mul_vec() {
        let m = WeightMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.transpose_mul_vec(&[1.0, 1.0]), vec![4.0, 6.0]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(WeightMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_err());
    }
}
