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

//! PRIMA reducer (§4.6): projects the full MNA system onto a
//! block-Arnoldi Krylov subspace of order `q`, simulates the reduced
//! system with the same backward-Euler stepper as the CCS calculator,
//! then reconstructs port voltages via `x ~= V_q x_q`.

use crate::calc::ccs_sim::BackwardEulerStepper;
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

/// An orthonormal basis `V` (n x q, stored column-major as `q` vectors
/// of length `n`) spanning `span{A^k r0 : k < q}`, `A = -G^-1 C`, `r0 =
/// G^-1 B`, built by block-Arnoldi against a single port (the driver).
pub(crate) struct KrylovBasis {
    columns: Vec<Vec<f64>>,
}

impl KrylovBasis {
    pub(crate) fn build(g_lu: &LuFactorization, c: &Matrix, b_col: &[f64], order: usize) -> Self {
        let n = c.n;
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(order);
        let mut r = g_lu.solve(b_col);
        Self::normalize(&mut r);
        columns.push(r);

        for k in 1..order {
            let prev = &columns[k - 1];
            let mut cv = vec![0.0; n];
            for i in 0..n {
                for j in 0..n {
                    cv[i] += c.get(i, j) * prev[j];
                }
            }
            let mut next = g_lu.solve(&cv);
            // Gram-Schmidt against all previous columns (block-Arnoldi
            // orthonormalization).
            for prev_col in &columns {
                let dot: f64 = next.iter().zip(prev_col.iter()).map(|(a, b)| a * b).sum();
                for i in 0..n {
                    next[i] -= dot * prev_col[i];
                }
            }
            let norm = Self::normalize(&mut next);
            if norm < 1e-14 {
                break;
            }
            columns.push(next);
        }
        Self { columns }
    }

    fn normalize(v: &mut [f64]) -> f64 {
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 1e-300 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        norm
    }

    pub(crate) fn order(&self) -> usize {
        self.columns.len()
    }

    /// Projects `full x = V_q x_q + ...` back to the full-order space
    /// for a single reduced-state vector `xq`.
    pub(crate) fn expand(&self, xq: &[f64], n: usize) -> Vec<f64> {
        let mut x = vec![0.0; n];
        for (col, &xi) in self.columns.iter().zip(xq.iter()) {
            for i in 0..n {
                x[i] += col[i] * xi;
            }
        }
        x
    }

    pub(crate) fn project_matrix(&self, m: &Matrix) -> Matrix {
        let q = self.order();
        let n = m.n;
        let mut out = Matrix::zeros(q);
        // (V^T M V)_{ij} = v_i^T M v_j
        let mut mv = vec![vec![0.0; n]; q];
        for j in 0..q {
            for i in 0..n {
                let mut sum = 0.0;
                for k in 0..n {
                    sum += m.get(i, k) * self.columns[j][k];
                }
                mv[j][i] = sum;
            }
        }
        for i in 0..q {
            for j in 0..q {
                let dot: f64 = self.columns[i].iter().zip(mv[j].iter()).map(|(a, b)| a * b).sum();
                out.set(i, j, dot);
            }
        }
        out
    }

    pub(crate) fn project_vector(&self, v: &[f64]) -> Vec<f64> {
        self.columns.iter().map(|col| col.iter().zip(v.iter()).map(|(a, b)| a * b).sum()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct PrimaDelayCalc {
    order: usize,
    fallback: crate::calc::LumpedCapDelayCalc,
    coupling_cap_multiplier: f64,
}

impl PrimaDelayCalc {
    pub fn new(order: usize) -> Self {
        Self { order: order.max(1), fallback: crate::calc::LumpedCapDelayCalc::new(), coupling_cap_multiplier: 1.0 }
    }

    pub fn set_reduce_order(&mut self, order: usize) {
        self.order = order.max(1);
    }

    /// §4.8/§6: the caller-configured coupling-cap multiplier applied
    /// when this calculator builds its own G/C matrices from a raw
    /// `ParasiticNetwork` (it always requests the unreduced network).
    pub fn with_coupling_cap_multiplier(mut self, multiplier: f64) -> Self {
        self.coupling_cap_multiplier = multiplier;
        self
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
}

impl Default for PrimaDelayCalc {
    fn default() -> Self {
        Self::new(4)
    }
}

impl ArcDelayCalc for PrimaDelayCalc {
    fn name(&self) -> &'static str {
        "prima"
    }

    fn reduce_supported(&self) -> bool {
        false
    }

    fn gate_delay(&mut self, model: &GateModel, _rf: RiseFall, in_slew: f64, load_cap: f64, parasitic: ParasiticHandle<'_>, loads: &[LoadArg]) -> Result<GateDelayResult, DcalcError> {
        let waveforms = match model {
            GateModel::Ccs { waveforms, .. } => waveforms,
            _ => return self.fallback.gate_delay(model, _rf, in_slew, load_cap, parasitic, loads),
        };
        let net = parasitic.as_network().ok_or_else(|| DcalcError::missing("prima calculator requires the full parasitic network"))?;

        let n = net.node_count();
        let g = Self::build_g(net, self.coupling_cap_multiplier);
        let node_caps: Vec<f64> = (0..n).map(|i| net.effective_self_cap(crate::parasitics::ParasiticNodeId(i), self.coupling_cap_multiplier)).collect();
        let mut c = Matrix::zeros(n);
        for i in 0..n {
            c.set(i, i, node_caps[i]);
        }
        let g_lu = LuFactorization::factor(&g)?;

        let mut b_col = vec![0.0; n];
        b_col[net.driver_node.0] = 1.0;

        let order = self.order.min(n);
        let basis = KrylovBasis::build(&g_lu, &c, &b_col, order);
        let q = basis.order();

        let gq = basis.project_matrix(&g);
        let cq = basis.project_matrix(&c);
        let bq = basis.project_vector(&b_col);

        let fastest_rc = net.fastest_branch_rc(self.coupling_cap_multiplier).unwrap_or(in_slew.max(1e-12));
        let dt = (fastest_rc * DT_FRACTION).max(1e-15);
        let max_time = fastest_rc.max(in_slew) * MAX_TIME_FACTOR;

        let stepper = BackwardEulerStepper::new(&gq, cq.diag(), dt)?;

        let waveform = waveforms.nearest(in_slew, load_cap);
        let mut xq = vec![0.0; q];
        let mut t = 0.0;

        let th_lo = VTH_LOW;
        let th_mid = VTH_MID;
        let th_hi = VTH_HIGH;
        let mut drvr_times = (None, None, None);
        let mut load_times: Vec<(crate::graph::pin::PinId, usize, (Option<f64>, Option<f64>, Option<f64>))> =
            loads.iter().filter_map(|l| net.node_of_pin(l.pin).map(|nid| (l.pin, nid.0, (None, None, None)))).collect();

        for _ in 0..MAX_STEPS {
            let rhs_currents: Vec<f64> = bq.iter().map(|b| b * waveform.current_at(t)).collect();
            let xq_prev = xq.clone();
            xq = stepper.step(&xq_prev, &rhs_currents);
            let t_next = t + dt;

            let v_prev = basis.expand(&xq_prev, n);
            let v = basis.expand(&xq, n);

            observe_crossings(t, v_prev[net.driver_node.0], t_next, v[net.driver_node.0], th_lo, th_mid, th_hi, &mut drvr_times);
            for (_, idx, times) in load_times.iter_mut() {
                observe_crossings(t, v_prev[*idx], t_next, v[*idx], th_lo, th_mid, th_hi, times);
            }
            t = t_next;

            let loads_done = load_times.iter().all(|(_, _, (lo, mid, hi))| lo.is_some() && mid.is_some() && hi.is_some());
            let drvr_done = drvr_times.0.is_some() && drvr_times.1.is_some() && drvr_times.2.is_some();
            if (drvr_done && loads_done) || t > max_time {
                break;
            }
        }

        let drvr_mid = drvr_times.1.unwrap_or(t);
        let drvr_lo = drvr_times.0.unwrap_or(0.0);
        let drvr_hi = drvr_times.2.unwrap_or(t);
        let drvr_slew = ((drvr_hi - drvr_lo) / (VTH_HIGH - VTH_LOW)).abs();

        let load_results = loads
            .iter()
            .map(|l| {
                if let Some((_, _, (lo, mid, hi))) = load_times.iter().find(|(pin, _, _)| *pin == l.pin) {
                    let mid = mid.unwrap_or(drvr_mid);
                    let lo = lo.unwrap_or(drvr_lo);
                    let hi = hi.unwrap_or(drvr_hi);
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

#[allow(clippy::too_many_arguments)]
fn observe_crossings(t_prev: f64, v_prev: f64, t: f64, v: f64, th_lo: f64, th_mid: f64, th_hi: f64, times: &mut (Option<f64>, Option<f64>, Option<f64>)) {
    let mut cross = |target: f64, slot: &mut Option<f64>| {
        if slot.is_none() && ((v_prev < target && v >= target) || (v_prev > target && v <= target)) {
            let frac = if (v - v_prev).abs() > 1e-30 { (target - v_prev) / (v - v_prev) } else { 0.0 };
            *slot = Some(t_prev + frac * (t - t_prev));
        }
    };
    cross(th_lo, &mut times.0);
    cross(th_mid, &mut times.1);
    cross(th_hi, &mut times.2);
}

impl Matrix {
    pub(crate) fn diag(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.get(i, i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::pin::PinId;
    use crate::model::ccs_waveform::PwlWaveform;
    use crate::model::CcsArcWaveforms;

    #[test]
    fn krylov_basis_columns_are_orthonormal() {
        let mut net = ParasiticNetwork::new(PinId(0));
        let mid = net.add_node(None, 1.0e-14);
        let load = net.add_node(Some(PinId(1)), 1.0e-13);
        net.add_resistor(net.driver_node, mid, 500.0);
        net.add_resistor(mid, load, 500.0);

        let n = net.node_count();
        let g = PrimaDelayCalc::build_g(&net, 1.0);
        let g_lu = LuFactorization::factor(&g).unwrap();
        let mut c = Matrix::zeros(n);
        c.set(0, 0, 1.0e-14);
        c.set(1, 1, 1.0e-14);
        c.set(2, 2, 1.0e-13);
        let mut b = vec![0.0; n];
        b[0] = 1.0;

        let basis = KrylovBasis::build(&g_lu, &c, &b, 3);
        for col in &basis.columns {
            let norm: f64 = col.iter().map(|x| x * x).sum();
            assert!((norm - 1.0).abs() < 1e-6, "{norm}");
        }
    }

    #[test]
    fn gate_delay_reduces_and_simulates_without_error() {
        let mut net = ParasiticNetwork::new(PinId(0));
        let load = net.add_node(Some(PinId(1)), 1.0e-13);
        net.add_resistor(net.driver_node, load, 1.0e3);

        let waveforms = CcsArcWaveforms::new(vec![0.1e-9], vec![1.0e-13], vec![PwlWaveform::new(vec![0.0, 1.0e-9, 5.0e-9], vec![0.0, 2.0e-3, 2.0e-3])]);
        let model = GateModel::Ccs { waveforms, nldm_fallback: None };
        let mut calc = PrimaDelayCalc::new(2);
        let loads = [LoadArg { pin: PinId(1), cap: 1.0e-13, threshold_scale: 1.0 }];
        let r = calc.gate_delay(&model, RiseFall::Rise, 0.1e-9, 1.0e-13, ParasiticHandle::Network(&net), &loads).unwrap();
        assert!(r.gate_delay >= 0.0);
    }
}
