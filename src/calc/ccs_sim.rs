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

//! CCS transient simulator (§4.5): builds the MNA system from the
//! parasitic network, drives the driver port with the library's
//! current-source waveform, and steps backward Euler until every load
//! crosses its measurement thresholds.

use crate::calc::linalg::{LuFactorization, Matrix};
use crate::calc::{ArcDelayCalc, GateDelayResult, LoadArg, LoadDelayResult, ParasiticHandle};
use crate::error::DcalcError;
use crate::graph::arc::GateModel;
use crate::minmax::RiseFall;
use crate::parasitics::ParasiticNetwork;

const VTH_LOW: f64 = 0.1;
const VTH_MID: f64 = 0.5;
const VTH_HIGH: f64 = 0.9;
const DT_FRACTION: f64 = 0.1;
const MAX_TIME_FACTOR: f64 = 200.0;
const MAX_STEPS: usize = 20_000;

#[derive(Debug, Clone, Copy)]
struct Thresholds {
    lo: f64,
    mid: f64,
    hi: f64,
}

/// Backward-Euler time-stepper shared by the CCS and PRIMA
/// calculators: factor `G + diag(c)/dt` once, re-solve for each new
/// right-hand side (§9 "Sparse linear algebra").
pub(crate) struct BackwardEulerStepper {
    lu: LuFactorization,
    dt: f64,
    node_caps: Vec<f64>,
}

impl BackwardEulerStepper {
    pub(crate) fn new(g: &Matrix, node_caps: Vec<f64>, dt: f64) -> Result<Self, DcalcError> {
        let n = g.n;
        let mut sys = g.clone();
        for i in 0..n {
            sys.add(i, i, node_caps[i] / dt);
        }
        let lu = LuFactorization::factor(&sys)?;
        Ok(Self { lu, dt, node_caps })
    }

    /// Advances one step: `rhs = diag(c)/dt * v_prev + i(t_next)`.
    pub(crate) fn step(&self, v_prev: &[f64], currents: &[f64]) -> Vec<f64> {
        let n = v_prev.len();
        let mut rhs = vec![0.0; n];
        for i in 0..n {
            rhs[i] = self.node_caps[i] / self.dt * v_prev[i] + currents[i];
        }
        self.lu.solve(&rhs)
    }
}

/// Records the first threshold-crossing time at a node by linear
/// interpolation between the straddling samples.
#[derive(Debug, Clone, Default)]
struct CrossingTracker {
    lo: Option<f64>,
    mid: Option<f64>,
    hi: Option<f64>,
}

impl CrossingTracker {
    fn observe(&mut self, t_prev: f64, v_prev: f64, t: f64, v: f64, th: Thresholds) {
        let mut cross = |target: f64, slot: &mut Option<f64>| {
            if slot.is_none() && ((v_prev < target && v >= target) || (v_prev > target && v <= target)) {
                let frac = if (v - v_prev).abs() > 1e-30 { (target - v_prev) / (v - v_prev) } else { 0.0 };
                *slot = Some(t_prev + frac * (t - t_prev));
            }
        };
        cross(th.lo, &mut self.lo);
        cross(th.mid, &mut self.mid);
        cross(th.hi, &mut self.hi);
    }

    fn done(&self) -> bool {
        self.lo.is_some() && self.mid.is_some() && self.hi.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct CcsSimDelayCalc {
    fallback: crate::calc::LumpedCapDelayCalc,
    coupling_cap_multiplier: f64,
}

impl CcsSimDelayCalc {
    pub fn new() -> Self {
        Self { fallback: crate::calc::LumpedCapDelayCalc::new(), coupling_cap_multiplier: 1.0 }
    }

    /// §4.8/§6: the caller-configured coupling-cap multiplier applied
    /// when this calculator builds its own G/C matrices from a raw
    /// `ParasiticNetwork` (it always requests the unreduced network).
    pub fn with_coupling_cap_multiplier(mut self, multiplier: f64) -> Self {
        self.coupling_cap_multiplier = multiplier;
        self
    }

    fn thresholds() -> Thresholds {
        Thresholds { lo: VTH_LOW, mid: VTH_MID, hi: VTH_HIGH }
    }

    fn build_g(net: &ParasiticNetwork, coupling_cap_multiplier: f64) -> Matrix {
        let n = net.node_count();
        let mut g = Matrix::zeros(n);
        for r in net.resistors() {
            let cond = 1.0 / r.resistance;
            g.add(r.n1.0, r.n1.0, cond);
            g.add(r.n2.0, r.n2.0, cond);
            g.add(r.n1.0, r.n2.0, -cond);
            g.add(r.n2.0, r.n1.0, -cond);
        }
        let _ = coupling_cap_multiplier;
        g
    }

    fn node_caps(net: &ParasiticNetwork, coupling_cap_multiplier: f64) -> Vec<f64> {
        (0..net.node_count()).map(|i| net.effective_self_cap(crate::parasitics::ParasiticNodeId(i), coupling_cap_multiplier)).collect()
    }
}

impl Default for CcsSimDelayCalc {
    fn default() -> Self {
        Self::new()
    }
}

impl ArcDelayCalc for CcsSimDelayCalc {
    fn name(&self) -> &'static str {
        "ccs"
    }

    fn reduce_supported(&self) -> bool {
        false
    }

    fn gate_delay(&mut self, model: &GateModel, _rf: RiseFall, in_slew: f64, load_cap: f64, parasitic: ParasiticHandle<'_>, loads: &[LoadArg]) -> Result<GateDelayResult, DcalcError> {
        let waveforms = match model {
            GateModel::Ccs { waveforms, .. } => waveforms,
            _ => return self.fallback.gate_delay(model, _rf, in_slew, load_cap, parasitic, loads),
        };
        let net = parasitic.as_network().ok_or_else(|| DcalcError::missing("ccs calculator requires the full parasitic network"))?;

        let waveform = waveforms.nearest(in_slew, load_cap);
        let coupling_cap_multiplier = self.coupling_cap_multiplier;

        let g = Self::build_g(net, coupling_cap_multiplier);
        let node_caps = Self::node_caps(net, coupling_cap_multiplier);
        let fastest_rc = net.fastest_branch_rc(coupling_cap_multiplier).unwrap_or(in_slew.max(1e-12));
        let dt = (fastest_rc * DT_FRACTION).max(1e-15);
        let max_time = fastest_rc.max(in_slew) * MAX_TIME_FACTOR;

        let stepper = BackwardEulerStepper::new(&g, node_caps, dt)?;

        let driver_idx = net.driver_node.0;
        let n = net.node_count();
        let mut v = vec![0.0; n];
        let mut v_prev;
        let mut t = 0.0;

        let th = Self::thresholds();
        let mut driver_tracker = CrossingTracker::default();
        let mut load_trackers: Vec<(usize, crate::graph::pin::PinId, CrossingTracker)> = net
            .load_nodes()
            .filter_map(|n| n.pin.map(|p| (n.id.0, p, CrossingTracker::default())))
            .collect();

        for _ in 0..MAX_STEPS {
            let mut currents = vec![0.0; n];
            currents[driver_idx] = waveform.current_at(t);
            v_prev = v;
            v = stepper.step(&v_prev, &currents);
            let t_next = t + dt;

            driver_tracker.observe(t, v_prev[driver_idx], t_next, v[driver_idx], th);
            for (idx, _pin, tracker) in load_trackers.iter_mut() {
                tracker.observe(t, v_prev[*idx], t_next, v[*idx], th);
            }
            t = t_next;

            let all_done = driver_tracker.done() && load_trackers.iter().all(|(_, _, tr)| tr.done());
            if all_done || t > max_time {
                break;
            }
        }

        let drvr_mid = driver_tracker.mid.unwrap_or(t);
        let drvr_lo = driver_tracker.lo.unwrap_or(0.0);
        let drvr_hi = driver_tracker.hi.unwrap_or(t);
        let drvr_slew = ((drvr_hi - drvr_lo) / (VTH_HIGH - VTH_LOW)).abs();

        let load_results = loads
            .iter()
            .map(|l| {
                if let Some((_, _, tracker)) = load_trackers.iter().find(|(_, pin, _)| *pin == l.pin) {
                    let mid = tracker.mid.unwrap_or(drvr_mid);
                    let lo = tracker.lo.unwrap_or(drvr_lo);
                    let hi = tracker.hi.unwrap_or(drvr_hi);
                    let slew = ((hi - lo) / (VTH_HIGH - VTH_LOW)).abs() * l.threshold_scale;
                    LoadDelayResult { pin: l.pin, wire_delay: (mid - drvr_mid).max(0.0), slew }
                } else {
                    LoadDelayResult { pin: l.pin, wire_delay: 0.0, slew: drvr_slew * l.threshold_scale }
                }
            })
            .collect();

        Ok(GateDelayResult { gate_delay: drvr_mid, drvr_slew, loads: load_results })
    }

    fn clone_calc(&self) -> Box<dyn ArcDelayCalc> {
        Box::new(self.clone())
    }
}
