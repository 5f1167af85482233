//! Dynamically sized vectors and matrices for the constraint solver.
//!
//! These are small (at most 6 wide) and live only for the duration of a single solve,
//! so they're plain `Vec`-backed containers with no attempt at SIMD.

use std::ops;

/// A vector of `N` components, with `N` fixed at construction.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct VectorN {
    data: Vec<f64>,
}

impl VectorN {
    #[inline]
    pub fn zeros(n: usize) -> Self {
        Self { data: vec![0.0; n] }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Set every component to zero, keeping the length.
    #[inline]
    pub fn zero(&mut self) {
        self.data.iter_mut().for_each(|x| *x = 0.0);
    }

    /// Dot product over the shared prefix of the two vectors.
    #[inline]
    pub fn dot(&self, other: &VectorN) -> f64 {
        dot(&self.data, &other.data)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.data.iter()
    }
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl From<Vec<f64>> for VectorN {
    fn from(data: Vec<f64>) -> Self {
        Self { data }
    }
}

impl ops::Index<usize> for VectorN {
    type Output = f64;

    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.data[i]
    }
}
impl ops::IndexMut<usize> for VectorN {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.data[i]
    }
}

impl ops::AddAssign<&VectorN> for VectorN {
    fn add_assign(&mut self, rhs: &VectorN) {
        for (x, y) in self.data.iter_mut().zip(&rhs.data) {
            *x += y;
        }
    }
}
impl ops::SubAssign<&VectorN> for VectorN {
    fn sub_assign(&mut self, rhs: &VectorN) {
        for (x, y) in self.data.iter_mut().zip(&rhs.data) {
            *x -= y;
        }
    }
}
impl ops::Add<&VectorN> for &VectorN {
    type Output = VectorN;

    fn add(self, rhs: &VectorN) -> VectorN {
        let mut out = self.clone();
        out += rhs;
        out
    }
}
impl ops::Sub<&VectorN> for &VectorN {
    type Output = VectorN;

    fn sub(self, rhs: &VectorN) -> VectorN {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}
impl ops::Mul<f64> for VectorN {
    type Output = VectorN;

    fn mul(mut self, rhs: f64) -> VectorN {
        self.data.iter_mut().for_each(|x| *x *= rhs);
        self
    }
}
impl ops::Neg for VectorN {
    type Output = VectorN;

    fn neg(self) -> VectorN {
        self * -1.0
    }
}

/// A row-major matrix of `M` rows and `N` columns, with both fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct MatMN {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl MatMN {
    #[inline]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build a square matrix with `diag` on the diagonal and zeros elsewhere.
    pub fn from_diagonal(diag: &[f64]) -> Self {
        let n = diag.len();
        let mut m = Self::zeros(n, n);
        for (i, d) in diag.iter().enumerate() {
            m[(i, i)] = *d;
        }
        m
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Set every entry to zero, keeping the dimensions.
    #[inline]
    pub fn zero(&mut self) {
        self.data.iter_mut().for_each(|x| *x = 0.0);
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn transpose(&self) -> MatMN {
        let mut t = MatMN::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                t[(j, i)] = self[(i, j)];
            }
        }
        t
    }

    /// Solve `A x = b` for `x` with Gauss-Seidel relaxation.
    ///
    /// Runs exactly `b.len()` sweeps starting from zero, with no convergence check.
    /// Any update that comes out as NaN (a zero on the diagonal) is skipped,
    /// leaving that component unchanged for the sweep.
    pub fn solve_gauss_seidel(&self, b: &VectorN) -> VectorN {
        let n = b.len();
        let mut x = VectorN::zeros(n);
        for _ in 0..n {
            for i in 0..n {
                let a_ii = self[(i, i)];
                let dx = b[i] / a_ii - dot(self.row(i), x.as_slice()) / a_ii;
                if !dx.is_nan() {
                    x[i] += dx;
                }
            }
        }
        x
    }
}

impl ops::Index<(usize, usize)> for MatMN {
    type Output = f64;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.cols + j]
    }
}
impl ops::IndexMut<(usize, usize)> for MatMN {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.cols + j]
    }
}

impl ops::Mul<&VectorN> for &MatMN {
    type Output = VectorN;

    fn mul(self, v: &VectorN) -> VectorN {
        debug_assert_eq!(self.cols, v.len());
        (0..self.rows)
            .map(|i| dot(self.row(i), v.as_slice()))
            .collect::<Vec<_>>()
            .into()
    }
}

impl ops::Mul<&MatMN> for &MatMN {
    type Output = MatMN;

    fn mul(self, rhs: &MatMN) -> MatMN {
        debug_assert_eq!(self.cols, rhs.rows);
        let mut out = MatMN::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for j in 0..rhs.cols {
                out[(i, j)] = (0..self.cols).map(|k| self[(i, k)] * rhs[(k, j)]).sum();
            }
        }
        out
    }
}
