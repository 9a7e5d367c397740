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

//! NLDM (non-linear delay model) 2-D table: delay or slew indexed by
//! (input-slew, output-load-capacitance), bilinearly interpolated.

/// A single 2-D table over (input-slew axis, load-cap axis). Values
/// are stored row-major by slew index, then load index.
#[derive(Debug, Clone)]
pub struct Table2D {
    slew_axis: Vec<f64>,
    cap_axis: Vec<f64>,
    values: Vec<f64>,
}

impl Table2D {
    /// `values[i * cap_axis.len() + j]` is the table value at
    /// `(slew_axis[i], cap_axis[j])`. Axes must be sorted ascending
    /// and non-empty.
    pub fn new(slew_axis: Vec<f64>, cap_axis: Vec<f64>, values: Vec<f64>) -> Self {
        assert!(!slew_axis.is_empty() && !cap_axis.is_empty(), "NLDM table axes must be non-empty");
        assert_eq!(values.len(), slew_axis.len() * cap_axis.len(), "NLDM table value count must match axis product");
        Self { slew_axis, cap_axis, values }
    }

    /// A degenerate single-point table, useful for scalar/unit models
    /// that still want to go through the same interpolation code path.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![0.0], vec![0.0], vec![value])
    }

    fn bracket(axis: &[f64], x: f64) -> (usize, usize, f64) {
        if axis.len() == 1 {
            return (0, 0, 0.0);
        }
        if x <= axis[0] {
            return (0, 1, 0.0);
        }
        let last = axis.len() - 1;
        if x >= axis[last] {
            return (last - 1, last, 1.0);
        }
        // Linear scan: NLDM axes are small (typically <= 8-10 points).
        let mut lo = 0;
        while lo + 1 < axis.len() && axis[lo + 1] < x {
            lo += 1;
        }
        let hi = lo + 1;
        let frac = (x - axis[lo]) / (axis[hi] - axis[lo]);
        (lo, hi, frac)
    }

    /// Bilinear interpolation, clamping out-of-range inputs to the
    /// nearest edge of the table (matches the extrapolation behavior
    /// of a library characterized only within its swept range).
    pub fn lookup(&self, in_slew: f64, load_cap: f64) -> f64 {
        let (s_lo, s_hi, s_frac) = Self::bracket(&self.slew_axis, in_slew);
        let (c_lo, c_hi, c_frac) = Self::bracket(&self.cap_axis, load_cap);
        let nc = self.cap_axis.len();
        let v00 = self.values[s_lo * nc + c_lo];
        let v01 = self.values[s_lo * nc + c_hi];
        let v10 = self.values[s_hi * nc + c_lo];
        let v11 = self.values[s_hi * nc + c_hi];
        let v0 = v00 + (v01 - v00) * c_frac;
        let v1 = v10 + (v11 - v10) * c_frac;
        v0 + (v1 - v0) * s_frac
    }
}
