//! Small dense linear-algebra kernels for K x K systems.

/// Largest absolute entry (0 for an empty slice).
pub fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |m, x| m.max(x.abs()))
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` when a pivot falls below `1e-300` or the data is not finite.
#[allow(clippy::needless_range_loop)]
pub fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = a[col][col].abs();
        for row in (col + 1)..n {
            let val = a[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }
        if !max_val.is_finite() || max_val < 1e-300 {
            return None;
        }
        if max_row != col {
            a.swap(col, max_row);
            b.swap(col, max_row);
        }

        let pivot_row = a[col].clone();
        let pivot_rhs = b[col];
        for row in (col + 1)..n {
            let factor = a[row][col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            for (cell, pv) in a[row].iter_mut().zip(&pivot_row).skip(col) {
                *cell -= factor * pv;
            }
            b[row] -= factor * pivot_rhs;
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|c| a[row][c] * x[c]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// A non-zero vector in the null space of `m` (rows x cols), if one exists.
///
/// Reduces `m` to row echelon form column by column; a column whose best
/// remaining pivot is at most `tol` is free. The returned vector has a 1 at
/// the last free column and 0 at every other free column.
#[allow(clippy::needless_range_loop)]
pub fn null_vector(mut m: Vec<Vec<f64>>, tol: f64) -> Option<Vec<f64>> {
    let rows = m.len();
    let cols = m.first().map(|r| r.len()).unwrap_or(0);
    let mut pivots: Vec<(usize, usize)> = Vec::new();
    let mut free: Vec<usize> = Vec::new();
    let mut r = 0;

    for c in 0..cols {
        let mut best = r;
        let mut best_val = 0.0;
        for i in r..rows {
            if m[i][c].abs() > best_val {
                best_val = m[i][c].abs();
                best = i;
            }
        }
        if r >= rows || best_val <= tol {
            free.push(c);
            continue;
        }
        m.swap(r, best);
        let p = m[r][c];
        for cell in m[r].iter_mut() {
            *cell /= p;
        }
        let pivot_row = m[r].clone();
        for i in 0..rows {
            if i == r {
                continue;
            }
            let factor = m[i][c];
            if factor == 0.0 {
                continue;
            }
            for (cell, pv) in m[i].iter_mut().zip(&pivot_row) {
                *cell -= factor * pv;
            }
        }
        pivots.push((r, c));
        r += 1;
    }

    let f = *free.last()?;
    let mut d = vec![0.0; cols];
    d[f] = 1.0;
    for (row, col) in pivots {
        d[col] = -m[row][f];
    }
    Some(d)
}

/// Euclidean projection onto the probability simplex {w >= 0, sum w = 1}.
pub fn project_simplex(v: &[f64]) -> Vec<f64> {
    if v.is_empty() {
        return Vec::new();
    }

    let mut u = v.to_vec();
    u.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let mut cssv = 0.0;
    let mut rho = 0_usize;
    let mut theta = 0.0;
    for (i, ui) in u.iter().enumerate() {
        cssv += *ui;
        let t = (cssv - 1.0) / (i as f64 + 1.0);
        if *ui - t > 0.0 {
            rho = i + 1;
            theta = t;
        }
    }

    if rho == 0 {
        return vec![1.0 / v.len() as f64; v.len()];
    }

    v.iter().map(|x| (x - theta).max(0.0)).collect()
}
