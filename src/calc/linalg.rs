// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Dense Gaussian-elimination linear solver with LU factor reuse (§9
//! "Sparse linear algebra"): the CCS and PRIMA transient cores factor
//! the system matrix once per time step Δt and re-solve with a new
//! right-hand side at every step within that Δt, so the cost that
//! matters is "factor once, solve many".
//!
//! Per-driver MNA systems arising from realistic nets are small (tens
//! of nodes), so a dense solve beats the bookkeeping of an external
//! sparse factorization for this scope.

use crate::error::DcalcError;

/// A row-major `n x n` matrix.
#[derive(Debug, Clone)]
pub struct Matrix {
    pub n: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(n: usize) -> Self {
        Self { n, data: vec![0.0; n * n] }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, v: f64) {
        self.data[i * self.n + j] = v;
    }

    #[inline]
    pub fn add(&mut self, i: usize, j: usize, v: f64) {
        self.data[i * self.n + j] += v;
    }

    pub fn add_scaled(&mut self, other: &Matrix, scale: f64) -> Matrix {
        assert_eq!(self.n, other.n);
        let mut out = self.clone();
        for i in 0..self.data.len() {
            out.data[i] += other.data[i] * scale;
        }
        out
    }
}

/// An LU-factored matrix with partial pivoting, reusable across many
/// `solve` calls against different right-hand sides.
#[derive(Debug, Clone)]
pub struct LuFactorization {
    n: usize,
    lu: Vec<f64>,
    piv: Vec<usize>,
}

impl LuFactorization {
    /// Factors `a` in place (Doolittle LU with partial pivoting).
    /// Fails if a pivot is numerically zero (singular matrix, §7 kind 2).
    pub fn factor(a: &Matrix) -> Result<Self, DcalcError> {
        let n = a.n;
        let mut lu = a.data_clone();
        let mut piv: Vec<usize> = (0..n).collect();

        for k in 0..n {
            let mut max_row = k;
            let mut max_val = lu[k * n + k].abs();
            for i in (k + 1)..n {
                let v = lu[i * n + k].abs();
                if v > max_val {
                    max_val = v;
                    max_row = i;
                }
            }
            if max_val < 1e-300 {
                return Err(DcalcError::numerical(format!("singular matrix at pivot {k}")));
            }
            if max_row != k {
                for j in 0..n {
                    lu.swap(k * n + j, max_row * n + j);
                }
                piv.swap(k, max_row);
            }
            for i in (k + 1)..n {
                let factor = lu[i * n + k] / lu[k * n + k];
                lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    lu[i * n + j] -= factor * lu[k * n + j];
                }
            }
        }
        Ok(Self { n, lu, piv })
    }

    /// Solves `A x = b` against the cached factorization.
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let n = self.n;
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut sum = b[self.piv[i]];
            for j in 0..i {
                sum -= self.lu[i * n + j] * y[j];
            }
            y[i] = sum;
        }
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut sum = y[i];
            for j in (i + 1)..n {
                sum -= self.lu[i * n + j] * x[j];
            }
            x[i] = sum / self.lu[i * n + i];
        }
        x
    }
}

impl Matrix {
    fn data_clone(&self) -> Vec<f64> {
        self.data.clone()
    }
}
