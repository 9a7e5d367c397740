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

//! Reduced parasitic forms: the π model (C2 near driver, R_pi, C1 far)
//! and the two-pole response fit, both derived from tree moments by
//! `parasitics::reduce` (§3 "Parasitic", §4.8).

const LN2: f64 = std::f64::consts::LN_2;

/// Three-element π model: C2 lumped at the driver, R_pi in the middle,
/// C1 lumped at the load side. Mirrors the library's `c2_`/`rpi_`/`c1_`
/// driver-side reduction fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiModel {
    pub c_near: f64,
    pub r_pi: f64,
    pub c_far: f64,
}

impl PiModel {
    pub fn total_cap(&self) -> f64 {
        self.c_near + self.c_far
    }

    /// Matches the first three moments of the tree's driving-point
    /// admittance: total downstream capacitance `c_total`, first moment
    /// `m1` (Elmore sum), second moment `m2`. Falls back to lumping all
    /// capacitance at the driver with zero `r_pi` if the moments are
    /// degenerate (a net with no resistance, e.g. a single-node net).
    pub fn from_moments(c_total: f64, m1: f64, m2: f64) -> Self {
        if m1 <= 0.0 || m2 <= 0.0 {
            return PiModel { c_near: c_total, r_pi: 0.0, c_far: 0.0 };
        }
        let c_near = (m1 * m1) / m2;
        let c_near = c_near.min(c_total).max(0.0);
        let r_pi = m2 / (m1 * m1) * (m1 / c_near.max(1e-30));
        let c_far = (c_total - c_near).max(0.0);
        PiModel { c_near, r_pi, c_far }
    }
}

/// A single Elmore time constant for one load, plus the aggregate
/// driver-side time constant used to scale slew degradation (§4.4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElmoreDelay {
    pub tau: f64,
}

impl ElmoreDelay {
    pub fn new(tau: f64) -> Self {
        Self { tau: tau.max(0.0) }
    }

    /// 0 -> 50% threshold wire delay, the closed form from §4.4:
    /// `delay = tau * ln 2`.
    pub fn wire_delay(&self) -> f64 {
        self.tau * LN2
    }

    /// Load slew scaled from the driver's own slew by `(1 + tau /
    /// tau_drvr)`, per §4.4. `tau_drvr` is the driver-side time
    /// constant (typically R_drvr * C_total); a non-positive value
    /// degenerates to no additional degradation.
    pub fn load_slew(&self, driver_slew: f64, tau_drvr: f64) -> f64 {
        if tau_drvr <= 0.0 {
            return driver_slew;
        }
        driver_slew * (1.0 + self.tau / tau_drvr)
    }
}

/// Two-pole fit of the tree's step response, replacing the
/// single-pole Elmore model when higher accuracy is requested (§4.4).
/// `tau1`/`tau2` are the two time constants; `k1 + k2 == 1` so the
/// weighted response reaches the driver's final value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoPole {
    pub tau1: f64,
    pub tau2: f64,
    pub k1: f64,
    pub k2: f64,
}

impl TwoPole {
    /// Matches moments `m1` (first) and `m2` (second) by treating
    /// `tau1`, `tau2` as the roots of `x^2 - m1 x + (m1^2 - m2) = 0`
    /// (the sum-of-two-real-poles approximation to the tree's step
    /// response). Falls back to a single repeated pole at `m1` when the
    /// discriminant is negative (complex-conjugate poles would not
    /// correspond to a physically realizable two-pole RC response
    /// here).
    pub fn from_moments(m1: f64, m2: f64) -> Self {
        let c = m1 * m1 - m2;
        let disc = m1 * m1 - 4.0 * c;
        if disc < 0.0 || m1 <= 0.0 {
            return TwoPole { tau1: m1.max(0.0), tau2: m1.max(0.0), k1: 0.5, k2: 0.5 };
        }
        let sqrt_disc = disc.sqrt();
        let tau1 = (m1 + sqrt_disc) / 2.0;
        let tau2 = (m1 - sqrt_disc) / 2.0;
        if tau1 <= 0.0 || tau2 <= 0.0 {
            return TwoPole { tau1: m1.max(0.0), tau2: m1.max(0.0), k1: 0.5, k2: 0.5 };
        }
        // dominant pole carries proportionally more residue
        let k1 = tau1 / (tau1 + tau2);
        TwoPole { tau1, tau2, k1, k2: 1.0 - k1 }
    }

    /// Delay to the 50% threshold of the combined two-exponential step
    /// response, found by the shared root-finder rather than a
    /// closed form (the weighted sum of exponentials has no simple
    /// inverse).
    pub fn wire_delay(&self, root_finder: impl Fn(f64) -> f64) -> f64 {
        root_finder(0.5)
    }

    pub fn step_response(&self, t: f64) -> f64 {
        1.0 - self.k1 * (-t / self.tau1.max(1e-30)).exp() - self.k2 * (-t / self.tau2.max(1e-30)).exp()
    }
}
