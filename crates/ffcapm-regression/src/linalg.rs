//! Dense linear algebra for least squares
//!
//! Householder QR decomposition and triangular solves. Solving through QR
//! avoids forming `XᵀX`, whose condition number is the square of that of `X`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};

/// Householder QR decomposition of a tall matrix (`n >= p`)
///
/// Only `R` and the reflectors are stored; `Q` is applied implicitly.
#[derive(Debug, Clone)]
pub struct HouseholderQr {
    r: Array2<f64>,
    reflectors: Vec<Array1<f64>>,
    rows: usize,
}

impl HouseholderQr {
    /// Decompose `a`
    ///
    /// # Arguments
    /// * `a` - Matrix with at least as many rows as columns
    pub fn decompose(a: ArrayView2<'_, f64>) -> Self {
        let (n, p) = a.dim();
        let mut work = a.to_owned();
        let mut reflectors = Vec::with_capacity(p.min(n));

        for k in 0..p.min(n) {
            let column = work.slice(s![k.., k]).to_owned();
            let norm = column.dot(&column).sqrt();
            let mut v = column;
            if norm > 0.0 {
                let alpha = if v[0] >= 0.0 { -norm } else { norm };
                v[0] -= alpha;
            }
            let vtv = v.dot(&v);
            if vtv > 0.0 {
                // A[k.., k..] -= 2 v (vᵀ A[k.., k..]) / vᵀv
                let mut block = work.slice_mut(s![k.., k..]);
                let projection = v.dot(&block) * (2.0 / vtv);
                for (i, vi) in v.iter().enumerate() {
                    let mut row = block.row_mut(i);
                    row.scaled_add(-vi, &projection);
                }
            }
            reflectors.push(v);
        }

        let mut r = work.slice(s![..p.min(n), ..]).to_owned();
        for i in 0..r.nrows() {
            for j in 0..i.min(r.ncols()) {
                r[[i, j]] = 0.0;
            }
        }
        Self {
            r,
            reflectors,
            rows: n,
        }
    }

    /// Upper triangular factor (`p × p`)
    pub const fn r(&self) -> &Array2<f64> {
        &self.r
    }

    /// Compute `Qᵀ b`
    pub fn apply_qt(&self, b: ArrayView1<'_, f64>) -> Array1<f64> {
        debug_assert_eq!(b.len(), self.rows);
        let mut out = b.to_owned();
        for (k, v) in self.reflectors.iter().enumerate() {
            let vtv = v.dot(v);
            if vtv > 0.0 {
                let mut tail = out.slice_mut(s![k..]);
                let scale = 2.0 * v.dot(&tail) / vtv;
                tail.scaled_add(-scale, v);
            }
        }
        out
    }

    /// Tolerance below which a diagonal entry of `R` counts as zero
    ///
    /// `max|R_ii| · max(n, p) · ε`, the LAPACK-style default.
    pub fn rank_tolerance(&self) -> f64 {
        let max_diag = self.diagonal().fold(0.0_f64, |m, d| m.max(d.abs()));
        max_diag * self.rows.max(self.r.ncols()) as f64 * f64::EPSILON
    }

    /// Numerical rank given a tolerance
    pub fn rank(&self, tolerance: f64) -> usize {
        self.diagonal().filter(|d| d.abs() > tolerance).count()
    }

    fn diagonal(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.r.nrows().min(self.r.ncols())).map(|i| self.r[[i, i]])
    }

    /// Least squares solution of `A x ≈ b`
    ///
    /// Assumes full column rank; check [`Self::rank`] first.
    pub fn solve_least_squares(&self, b: ArrayView1<'_, f64>) -> Array1<f64> {
        let qtb = self.apply_qt(b);
        let p = self.r.ncols();
        back_substitute(&self.r, qtb.slice(s![..p]))
    }

    /// Inverse of `R`, used to form `(AᵀA)⁻¹ = R⁻¹ R⁻ᵀ`
    pub fn r_inverse(&self) -> Array2<f64> {
        let p = self.r.ncols();
        let mut inv = Array2::zeros((p, p));
        let eye = Array2::<f64>::eye(p);
        for j in 0..p {
            let col = back_substitute(&self.r, eye.column(j));
            inv.column_mut(j).assign(&col);
        }
        inv
    }

    /// `(AᵀA)⁻¹` computed from the factorisation
    pub fn gram_inverse(&self) -> Array2<f64> {
        let inv = self.r_inverse();
        inv.dot(&inv.t())
    }
}

/// Solve `R x = b` for upper triangular `R`
///
/// # Arguments
/// * `r` - Square upper triangular matrix with a non-zero diagonal
/// * `b` - Right-hand side
pub fn back_substitute(r: &Array2<f64>, b: ArrayView1<'_, f64>) -> Array1<f64> {
    let p = r.ncols();
    let mut x = Array1::zeros(p);
    for i in (0..p).rev() {
        let mut acc = b[i];
        for j in (i + 1)..p {
            acc -= r[[i, j]] * x[j];
        }
        x[i] = acc / r[[i, i]];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_r_reproduces_gram_matrix() {
        let a = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0], [7.0, 9.0]];
        let qr = HouseholderQr::decompose(a.view());
        let rtr = qr.r().t().dot(qr.r());
        let ata = a.t().dot(&a);
        for (x, y) in rtr.iter().zip(ata.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-10);
        }
        assert_eq!(qr.rank(qr.rank_tolerance()), 2);
    }

    #[test]
    fn test_least_squares_solution() {
        let a = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0]];
        let b = array![1.0, 3.0, 5.0];
        let x = HouseholderQr::decompose(a.view()).solve_least_squares(b.view());
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_collinear_columns_lose_rank() {
        let a = array![[1.0, 2.0], [1.0, 2.0], [1.0, 2.0]];
        let qr = HouseholderQr::decompose(a.view());
        assert_eq!(qr.rank(qr.rank_tolerance()), 1);
    }

    #[test]
    fn test_gram_inverse() {
        let a = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0], [1.0, 3.0]];
        let inv = HouseholderQr::decompose(a.view()).gram_inverse();
        let identity = a.t().dot(&a).dot(&inv);
        assert_relative_eq!(identity[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(identity[[0, 1]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(identity[[1, 1]], 1.0, epsilon = 1e-12);
    }
}
