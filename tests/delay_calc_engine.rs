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

//! End-to-end tests driving the full engine (graph + scheduler +
//! dispatcher + a real calculator) through a handful of the properties
//! a delay calculator is expected to hold: monotonicity in driver
//! capacitance and input slew, cell-swap idempotence, and ordering
//! across analysis points.

use std::cell::Cell;

use dcalc_engine::ap::{AnalysisPointId, AnalysisPointSet};
use dcalc_engine::dispatch::netcaps::NetCaps;
use dcalc_engine::graph::arc::{GateModel, TimingArcSet, TimingArcSetId, TimingRole};
use dcalc_engine::graph::edge::EdgeKind;
use dcalc_engine::graph::pin::{PinDirection, PinId};
use dcalc_engine::minmax::{MinMax, RiseFall};
use dcalc_engine::model::Table2D;
use dcalc_engine::parasitics::ParasiticStore;
use dcalc_engine::{DispatchConfig, NullObserver, ParasiticsReader, Scheduler, Sdc, TimingGraph};

/// A constraint front-end double whose net loading is adjustable at
/// runtime, for capacitance-sweep tests.
struct SweepSdc {
    wire_cap: Cell<f32>,
}

impl SweepSdc {
    fn new(wire_cap: f32) -> Self {
        Self { wire_cap: Cell::new(wire_cap) }
    }
}

impl Sdc for SweepSdc {
    fn pin_net_caps(&self, _pin: PinId, _rf: RiseFall, _ap: AnalysisPointId) -> NetCaps {
        NetCaps::new(0.0, self.wire_cap.get(), 1.0, true)
    }
    fn is_ideal_clock(&self, _pin: PinId) -> bool {
        false
    }
    fn ideal_clock_slew(&self, _pin: PinId, _rf: RiseFall, _ap: AnalysisPointId) -> f64 {
        0.0
    }
}

struct NoParasitics;
impl ParasiticsReader for NoParasitics {
    fn parasitic_for(&self, _net: dcalc_engine::graph::net::NetId, _ap: AnalysisPointId) -> ParasiticStore {
        ParasiticStore::None
    }
}

/// Delay/slew tables monotonically increasing in both input slew and
/// load cap, mirroring how a real cell library's NLDM tables behave.
fn monotonic_delay_table() -> Table2D {
    let slew_axis = vec![0.0, 1.0];
    let cap_axis = vec![0.0, 1.0];
    let mut values = vec![0.0; 4];
    for (i, s) in slew_axis.iter().enumerate() {
        for (j, c) in cap_axis.iter().enumerate() {
            values[i * 2 + j] = 1.0 + 2.0 * s + 5.0 * c;
        }
    }
    Table2D::new(slew_axis, cap_axis, values)
}

fn monotonic_slew_table() -> Table2D {
    let slew_axis = vec![0.0, 1.0];
    let cap_axis = vec![0.0, 1.0];
    let mut values = vec![0.0; 4];
    for (i, s) in slew_axis.iter().enumerate() {
        for (j, c) in cap_axis.iter().enumerate() {
            values[i * 2 + j] = 0.2 + 1.0 * s + 3.0 * c;
        }
    }
    Table2D::new(slew_axis, cap_axis, values)
}

fn one_ap_set() -> AnalysisPointSet {
    let mut aps = AnalysisPointSet::new();
    aps.push("typical", MinMax::Max, MinMax::Max);
    aps
}

/// One inverter: input pin `a`, output pin `z`, single combinational
/// arc set carrying `delay`/`slew` for both polarities.
fn build_inverter(aps: AnalysisPointSet, delay: Table2D, slew: Table2D) -> (TimingGraph, PinId, PinId) {
    let mut g = TimingGraph::new(aps);
    let a = g.add_pin("a", PinDirection::Input);
    let z = g.add_pin("z", PinDirection::Output);
    let net = g.add_net();
    g.pin_mut(a).net = Some(net);
    g.pin_mut(z).net = Some(net);
    g.net_mut(net).drivers.push(z);

    let mut arc_set = TimingArcSet::new(TimingArcSetId(0), "inv");
    arc_set.push(RiseFall::Rise, RiseFall::Fall, TimingRole::Combinational, GateModel::Nldm { delay: delay.clone(), slew: slew.clone() });
    arc_set.push(RiseFall::Fall, RiseFall::Rise, TimingRole::Combinational, GateModel::Nldm { delay, slew });
    let arc_set_id = g.add_arc_set(arc_set);

    let av = g.pin(a).load_vertex.unwrap();
    let zv = g.pin(z).driver_vertex.unwrap();
    g.add_arc_edge(av, zv, EdgeKind::CellArc, arc_set_id);
    (g, a, z)
}

#[test]
fn gate_delay_is_monotonic_in_driver_net_capacitance() {
    let ap = AnalysisPointId(0);
    let mut prev_delay = f64::NEG_INFINITY;
    let mut prev_slew = f64::NEG_INFINITY;

    for &cap in &[0.0f32, 0.25, 0.5, 1.0] {
        let (g, a, z) = build_inverter(one_ap_set(), monotonic_delay_table(), monotonic_slew_table());
        let mut sched = Scheduler::new(g, "lumped-cap", 1, DispatchConfig::default()).unwrap();
        let av = sched.graph.pin(a).load_vertex.unwrap();
        sched.graph.vertex_mut(av).slews.merge(RiseFall::Rise, ap, 0.0);

        let sdc = SweepSdc::new(cap);
        let mut obs = NullObserver;
        sched.recompute(None, &sdc, &NoParasitics, &mut obs).unwrap();

        let zv = sched.graph.pin(z).driver_vertex.unwrap();
        let delay = sched.graph.edge(dcalc_engine::graph::edge::EdgeId(0)).arc_delay.as_ref().unwrap().get(0, ap);
        let slew = sched.graph.vertex(zv).slews.get(RiseFall::Fall, ap);

        assert!(delay >= prev_delay, "delay should not decrease as driver cap grows: {delay} < {prev_delay} at cap={cap}");
        assert!(slew >= prev_slew, "slew should not decrease as driver cap grows: {slew} < {prev_slew} at cap={cap}");
        prev_delay = delay;
        prev_slew = slew;
    }
}

#[test]
fn gate_delay_is_monotonic_in_input_slew() {
    let ap = AnalysisPointId(0);
    let mut prev_delay = f64::NEG_INFINITY;

    for &in_slew in &[0.0f64, 0.3, 0.6, 1.0] {
        let (g, a, z) = build_inverter(one_ap_set(), monotonic_delay_table(), monotonic_slew_table());
        let mut sched = Scheduler::new(g, "lumped-cap", 1, DispatchConfig::default()).unwrap();
        let av = sched.graph.pin(a).load_vertex.unwrap();
        sched.graph.vertex_mut(av).slews.merge(RiseFall::Rise, ap, in_slew);

        let sdc = SweepSdc::new(0.0);
        let mut obs = NullObserver;
        sched.recompute(None, &sdc, &NoParasitics, &mut obs).unwrap();

        let _ = z;
        let delay = sched.graph.edge(dcalc_engine::graph::edge::EdgeId(0)).arc_delay.as_ref().unwrap().get(0, ap);
        assert!(delay >= prev_delay, "delay should not decrease as input slew grows: {delay} < {prev_delay} at in_slew={in_slew}");
        prev_delay = delay;
    }
}

#[test]
fn cell_swap_and_swap_back_reproduces_the_original_delay() {
    let ap = AnalysisPointId(0);
    let (mut g, a, z) = build_inverter(one_ap_set(), monotonic_delay_table(), monotonic_slew_table());

    // A second, faster cell's arc set on the same topology.
    let mut fast_arc_set = TimingArcSet::new(TimingArcSetId(1), "inv_fast");
    let fast = Table2D::constant(0.1);
    fast_arc_set.push(RiseFall::Rise, RiseFall::Fall, TimingRole::Combinational, GateModel::Nldm { delay: fast.clone(), slew: fast.clone() });
    fast_arc_set.push(RiseFall::Fall, RiseFall::Rise, TimingRole::Combinational, GateModel::Nldm { delay: fast.clone(), slew: fast });
    let fast_arc_set_id = g.add_arc_set(fast_arc_set);

    let av = g.pin(a).load_vertex.unwrap();
    g.vertex_mut(av).slews.merge(RiseFall::Rise, ap, 0.2);
    let original_arc_set_id = g.edge(dcalc_engine::graph::edge::EdgeId(0)).arc_set.unwrap();

    let mut sched = Scheduler::new(g, "lumped-cap", 1, DispatchConfig::default()).unwrap();
    let sdc = SweepSdc::new(0.0);
    let mut obs = NullObserver;

    sched.recompute(None, &sdc, &NoParasitics, &mut obs).unwrap();
    let original_delay = sched.graph.edge(dcalc_engine::graph::edge::EdgeId(0)).arc_delay.as_ref().unwrap().get(0, ap);

    let zv = sched.graph.pin(z).driver_vertex.unwrap();
    sched.graph.edge_mut(dcalc_engine::graph::edge::EdgeId(0)).arc_set = Some(fast_arc_set_id);
    sched.invalidate_vertex(zv);
    sched.recompute(None, &sdc, &NoParasitics, &mut obs).unwrap();
    let swapped_delay = sched.graph.edge(dcalc_engine::graph::edge::EdgeId(0)).arc_delay.as_ref().unwrap().get(0, ap);
    assert_ne!(original_delay, swapped_delay, "swapping to a different cell should change the delay");

    sched.graph.edge_mut(dcalc_engine::graph::edge::EdgeId(0)).arc_set = Some(original_arc_set_id);
    sched.invalidate_vertex(zv);
    sched.recompute(None, &sdc, &NoParasitics, &mut obs).unwrap();
    let restored_delay = sched.graph.edge(dcalc_engine::graph::edge::EdgeId(0)).arc_delay.as_ref().unwrap().get(0, ap);
    assert_eq!(restored_delay, original_delay, "swapping back to the original cell should reproduce the original delay");
}

#[test]
fn a_worse_analysis_point_never_reports_a_better_delay_than_a_better_one() {
    let mut aps = AnalysisPointSet::new();
    let fast_ap = aps.push("fast", MinMax::Min, MinMax::Max);
    let slow_ap = aps.push("slow", MinMax::Max, MinMax::Min);

    let (mut g, a, _z) = build_inverter(aps, monotonic_delay_table(), monotonic_slew_table());
    let av = g.pin(a).load_vertex.unwrap();
    // Same network, but the slow corner's characterization sees a
    // larger input slew arriving at this inverter.
    g.vertex_mut(av).slews.merge(RiseFall::Rise, fast_ap, 0.0);
    g.vertex_mut(av).slews.merge(RiseFall::Rise, slow_ap, 1.0);

    let mut sched = Scheduler::new(g, "lumped-cap", 1, DispatchConfig::default()).unwrap();
    let sdc = SweepSdc::new(0.0);
    let mut obs = NullObserver;
    sched.recompute(None, &sdc, &NoParasitics, &mut obs).unwrap();

    let edge = sched.graph.edge(dcalc_engine::graph::edge::EdgeId(0));
    let fast_delay = edge.arc_delay.as_ref().unwrap().get(0, fast_ap);
    let slow_delay = edge.arc_delay.as_ref().unwrap().get(0, slow_ap);
    assert!(slow_delay >= fast_delay, "the slow corner's delay ({slow_delay}) should be at least the fast corner's ({fast_delay})");
}

#[test]
fn incremental_recompute_with_a_loose_tolerance_leaves_downstream_slew_stale() {
    let ap = AnalysisPointId(0);
    let (g, a, z) = build_inverter(one_ap_set(), monotonic_delay_table(), monotonic_slew_table());
    let cfg = DispatchConfig { incremental_delay_tolerance: 1.0, ..DispatchConfig::default() };
    let mut sched = Scheduler::new(g, "lumped-cap", 1, cfg).unwrap();
    let av = sched.graph.pin(a).load_vertex.unwrap();
    sched.graph.vertex_mut(av).slews.merge(RiseFall::Rise, ap, 0.0);

    let sdc = SweepSdc::new(0.0);
    let mut obs = NullObserver;
    sched.recompute(None, &sdc, &NoParasitics, &mut obs).unwrap();
    let zv = sched.graph.pin(z).driver_vertex.unwrap();
    let first_slew = sched.graph.vertex(zv).slews.get(RiseFall::Fall, ap);

    // A tolerance of 1.0 (100% relative change allowed) means any
    // nonzero recomputation is always treated as "unchanged", so a
    // changed input slew's effect never reaches the driver vertex.
    sched.graph.vertex_mut(av).slews.reset_absent(RiseFall::Rise, ap);
    sched.graph.vertex_mut(av).slews.merge(RiseFall::Rise, ap, 1.0);
    sched.invalidate_vertex(zv);
    sched.recompute(None, &sdc, &NoParasitics, &mut obs).unwrap();
    let second_slew = sched.graph.vertex(zv).slews.get(RiseFall::Fall, ap);

    assert_eq!(first_slew, second_slew, "a 100% tolerance should suppress the slew update entirely");
}
