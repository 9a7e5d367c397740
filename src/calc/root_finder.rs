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

//! Newton-with-bisection-fallback root finder (§4.9), used by the
//! effective-capacitance fixed point and by threshold-crossing
//! inversion in the transient calculators.

use crate::error::DcalcError;

/// Finds `x` such that `f(x).0 == 0`, given pre-evaluated endpoint
/// values `(x1, y1)`, `(x2, y2)` that must bracket the root.
///
/// `f(x)` returns `(y, dy/dx)`.
pub fn find_root_bracketed(mut f: impl FnMut(f64) -> (f64, f64), x1: f64, y1: f64, x2: f64, y2: f64, tol: f64, max_iter: usize) -> Result<f64, DcalcError> {
    if y1 == 0.0 {
        return Ok(x1);
    }
    if y2 == 0.0 {
        return Ok(x2);
    }
    if y1.signum() == y2.signum() {
        return Err(DcalcError::numerical(format!("find_root: endpoints do not bracket a sign change (y1={y1}, y2={y2})")));
    }

    // after this, y increases from lo to hi (step 3 of the contract).
    let (mut lo, mut hi) = if y1 < 0.0 { (x1, x2) } else { (x2, x1) };

    let mut x = (lo + hi) / 2.0;
    for _ in 0..max_iter {
        let (y, dy) = f(x);
        if y.abs() < tol || (hi - lo).abs() < tol {
            return Ok(x);
        }

        let newton_x = if dy.abs() > 1e-300 { x - y / dy } else { f64::NAN };
        let x_new = if newton_x.is_finite() && newton_x > lo && newton_x < hi { newton_x } else { (lo + hi) / 2.0 };

        let (y_new, _) = f(x_new);
        if y_new < 0.0 {
            lo = x_new;
        } else {
            hi = x_new;
        }
        x = x_new;
    }
    Err(DcalcError::numerical("find_root: max_iter exhausted without convergence"))
}

/// Evaluates the endpoints itself, then delegates to the bracketed form.
pub fn find_root(mut f: impl FnMut(f64) -> (f64, f64), x1: f64, x2: f64, tol: f64, max_iter: usize) -> Result<f64, DcalcError> {
    let (y1, _) = f(x1);
    let (y2, _) = f(x2);
    find_root_bracketed(f, x1, y1, x2, y2, tol, max_iter)
}
