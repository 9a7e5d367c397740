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

//! The delay-calc dispatcher (§4.2): for one driver vertex, finds its
//! incoming cell/latch timing arcs, queries the parasitic and net
//! loading, invokes the configured calculator, and merges the results
//! into the graph.

pub mod netcaps;

pub use netcaps::NetCaps;

use tracing::warn;

use crate::ap::AnalysisPointId;
use crate::calc::{ArcDelayCalc, GateDelayRequest, LoadArg, LumpedCapDelayCalc};
use crate::collaborators::{ParasiticsReader, Sdc};
use crate::error::GraphError;
use crate::graph::arc::{TimingArc, TimingArcSetId};
use crate::graph::edge::{Edge, EdgeId, EdgeKind};
use crate::graph::pin::PinId;
use crate::graph::timing_graph::TimingGraph;
use crate::graph::vertex::VertexId;
use crate::minmax::RiseFall;
use crate::observer::DelayCalcObserver;

#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// §4.2 "Incremental change detection": relative tolerance below
    /// which a recomputed gate delay is treated as unchanged.
    pub incremental_delay_tolerance: f64,
    /// §4.8 / §6: coupling-cap multiplier passed to on-demand reduction
    /// and to calculators that build their own G/C matrices.
    pub coupling_cap_multiplier: f64,
    /// §6: when false, coupling caps are dropped entirely rather than
    /// scaled by `coupling_cap_multiplier` (see
    /// `effective_coupling_cap_multiplier`).
    pub keep_coupling_caps: bool,
    /// §6: whether the Sdc collaborator's reported wire-cap already
    /// includes pin cap, so `dispatch_driver`'s load-cap computation
    /// must not also add pin cap to avoid double-counting it.
    pub pin_cap_included_in_wire_cap: bool,
    /// PRIMA reduction order q, used only when the configured
    /// calculator is `"prima"`.
    pub prima_reduction_order: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            incremental_delay_tolerance: 0.0,
            coupling_cap_multiplier: 1.0,
            keep_coupling_caps: true,
            pin_cap_included_in_wire_cap: false,
            prima_reduction_order: 4,
        }
    }
}

impl DispatchConfig {
    /// §6 "keep coupling caps": the multiplier transient calculators
    /// apply to coupling capacitances, collapsed to `0.0` when the
    /// caller wants coupling caps dropped entirely rather than scaled.
    pub fn effective_coupling_cap_multiplier(&self) -> f64 {
        if self.keep_coupling_caps { self.coupling_cap_multiplier } else { 0.0 }
    }
}

/// What a completed driver dispatch asks the scheduler to do next:
/// whether the calculator failed for any arc (caller may want to log
/// once more at the pass level), and which additional vertices to
/// enqueue (bidirectional loads rebroadcasting a driver-side arrival,
/// §4.2 step 5).
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    pub failed: bool,
    pub reenqueue: Vec<VertexId>,
}

/// One incoming cell/latch timing arc landing on the driver vertex,
/// with the vertex its input slew is read from.
struct IncomingArc<'g> {
    edge_id: EdgeId,
    from_vertex: VertexId,
    arc: &'g TimingArc,
}

/// The normal per-driver dispatch path's incoming arcs: every cell/latch
/// arc, excluding wires and timing-check arcs (checks are resolved by
/// `scheduler::deferred` instead, §4.1).
fn incoming_arcs<'g>(graph: &'g TimingGraph, driver: VertexId, to_rf: RiseFall) -> Vec<IncomingArc<'g>> {
    incoming_arcs_filtered(graph, driver, to_rf, |kind| !matches!(kind, EdgeKind::Wire | EdgeKind::CheckArc))
}

/// Like `incoming_arcs`, restricted to edges whose kind passes
/// `kind_allowed`. Lets the deferred LatchDQ re-dispatch (§4.1, §9 "D->Q
/// arcs remain present for delay reporting") recompute only its own
/// edge kind without disturbing an already-correct `CellArc`
/// contribution to the same vertex.
fn incoming_arcs_filtered<'g>(graph: &'g TimingGraph, driver: VertexId, to_rf: RiseFall, kind_allowed: impl Fn(EdgeKind) -> bool) -> Vec<IncomingArc<'g>> {
    let mut out = Vec::new();
    for &edge_id in graph.fanin_of(driver) {
        let edge = graph.edge(edge_id);
        if edge.disabled || !kind_allowed(edge.kind) {
            continue;
        }
        let Some(arc_set_id) = edge.arc_set else { continue };
        let arc_set = graph.arc_set(arc_set_id);
        for arc in arc_set.arcs_to(to_rf) {
            if arc.role.is_check() {
                continue;
            }
            out.push(IncomingArc { edge_id, from_vertex: edge.from, arc });
        }
    }
    out
}

/// Input slew for one incoming arc: the graph slew at the from-vertex,
/// unless the arc wants an ideal-clock substitution and the from-vertex
/// is in fact ideal-clock driven (§4.2 "Input slew selection").
fn resolve_input_slew(graph: &TimingGraph, sdc: &dyn Sdc, inc: &IncomingArc<'_>, ap: AnalysisPointId) -> f64 {
    let from = graph.vertex(inc.from_vertex);
    if inc.arc.role.wants_ideal_clock_slew() && from.ideal_clock && sdc.is_ideal_clock(from.pin) {
        sdc.ideal_clock_slew(from.pin, inc.arc.from_rf, ap)
    } else {
        from.slews.get(inc.arc.from_rf, ap)
    }
}

/// Builds the per-load argument list passed to a calculator.
/// `cap`/`threshold_scale` are left at their defaults (`0.0`/`1.0`):
/// no collaborator trait in this crate exposes per-load capacitance or
/// threshold data, only the net-level `Sdc::pin_net_caps` (see DESIGN.md
/// for why this is an explicit scope decision rather than a bug).
fn load_args(graph: &TimingGraph, net_loads: &[PinId]) -> Vec<LoadArg> {
    net_loads
        .iter()
        .map(|&pin| LoadArg { pin, cap: 0.0, threshold_scale: 1.0 })
        .collect()
}

/// Merges one arc's computed delay/slew into the graph: the edge's
/// arc-delay slot, the driver vertex's slew (merge rule), each load's
/// wire-delay/slew (merge rule), and collects bidirectional re-enqueues
/// (§4.2 steps 3-5).
#[allow(clippy::too_many_arguments)]
fn apply_gate_result(
    graph: &mut TimingGraph,
    driver: VertexId,
    edge_id: EdgeId,
    arc_index: usize,
    rf: RiseFall,
    ap: AnalysisPointId,
    result: &crate::calc::GateDelayResult,
    tolerance: f64,
    observer: &mut dyn DelayCalcObserver,
    reenqueue: &mut Vec<VertexId>,
) {
    let edge = graph.edge(edge_id);
    let old = edge.arc_delay.as_ref().map(|t| t.get(arc_index, ap));
    let unchanged = match old {
        Some(o) if o != 0.0 => (result.gate_delay - o).abs() / o.abs() <= tolerance,
        _ => false,
    };

    graph.edge_mut(edge_id).arc_delay.as_mut().unwrap().set(arc_index, ap, result.gate_delay);

    if unchanged {
        return;
    }

    observer.delay_changed_from(driver);
    graph.vertex_mut(driver).slews.merge(rf, ap, result.drvr_slew);
    observer.delay_changed_to(driver);

    for load in &result.loads {
        let Some(load_vertex) = graph.pin(load.pin).load_vertex else { continue };
        if let Some(wire_edge_id) = wire_edge_between(graph, driver, load_vertex) {
            graph.edge_mut(wire_edge_id).wire_delay.as_mut().unwrap().merge(rf, ap, load.wire_delay);
        }
        graph.vertex_mut(load_vertex).slews.merge(rf, ap, load.slew);

        if let Some(load_driver_vertex) = graph.pin(load.pin).driver_vertex {
            if graph.pin(load.pin).direction.is_driver_capable() {
                reenqueue.push(load_driver_vertex);
            }
        }
    }
}

fn wire_edge_between(graph: &TimingGraph, driver: VertexId, load_vertex: VertexId) -> Option<EdgeId> {
    graph.fanout_of(driver).iter().copied().find(|&id| {
        let e = graph.edge(id);
        matches!(e.kind, EdgeKind::Wire) && e.to == load_vertex
    })
}

/// Runs the full §4.2 per-driver procedure for one driver vertex,
/// across every analysis point and both rise/fall transitions.
pub fn dispatch_driver(
    graph: &mut TimingGraph,
    driver: VertexId,
    calc: &mut dyn ArcDelayCalc,
    sdc: &dyn Sdc,
    parasitics: &dyn ParasiticsReader,
    cfg: &DispatchConfig,
    observer: &mut dyn DelayCalcObserver,
) -> Result<DispatchOutcome, GraphError> {
    dispatch_driver_filtered(graph, driver, calc, sdc, parasitics, cfg, observer, |kind| !matches!(kind, EdgeKind::Wire | EdgeKind::CheckArc), true)
}

/// Re-dispatches only `driver`'s `LatchDQ`-kind incoming arcs (§4.1's
/// deferred end-of-BFS pass, §9 "D->Q arcs remain present for delay
/// reporting"). A transparent latch's D->Q edge is excluded from
/// levelization (it would otherwise look like a combinational cycle
/// back into its own level), so the normal per-level dispatch may see
/// the D-vertex's slew before it has settled; this pass re-reads it
/// once the whole BFS is done. `reset_absent_on_miss` is false here so a
/// direction with no LatchDQ arc this pass doesn't clobber an
/// already-correct `CellArc` contribution to the same vertex.
pub fn dispatch_latch_dq(
    graph: &mut TimingGraph,
    driver: VertexId,
    calc: &mut dyn ArcDelayCalc,
    sdc: &dyn Sdc,
    parasitics: &dyn ParasiticsReader,
    cfg: &DispatchConfig,
    observer: &mut dyn DelayCalcObserver,
) -> Result<DispatchOutcome, GraphError> {
    dispatch_driver_filtered(graph, driver, calc, sdc, parasitics, cfg, observer, |kind| matches!(kind, EdgeKind::LatchDQ), false)
}

#[allow(clippy::too_many_arguments)]
fn dispatch_driver_filtered(
    graph: &mut TimingGraph,
    driver: VertexId,
    calc: &mut dyn ArcDelayCalc,
    sdc: &dyn Sdc,
    parasitics: &dyn ParasiticsReader,
    cfg: &DispatchConfig,
    observer: &mut dyn DelayCalcObserver,
    kind_allowed: impl Fn(EdgeKind) -> bool + Copy,
    reset_absent_on_miss: bool,
) -> Result<DispatchOutcome, GraphError> {
    let pin = graph.vertex(driver).pin;
    let Some(net) = graph.pin(pin).net else {
        return Ok(DispatchOutcome::default());
    };

    // Parallel multi-driver batch dispatch (§4.2 step 2, primary driver
    // only) is a scheduler-level concern built on `build_batch_requests`
    // below; every other driver — secondaries included — takes the
    // scalar per-arc path here.
    let net_loads = graph.net(net).loads.clone();
    let mut outcome = DispatchOutcome::default();
    let fallback = LumpedCapDelayCalc::new();

    let ap_ids: Vec<AnalysisPointId> = graph.ap_set.ids().collect();
    for ap in ap_ids {
        let store = parasitics.parasitic_for(net, ap);

        for rf in RiseFall::range() {
            let netcaps = sdc.pin_net_caps(pin, rf, ap);
            let load_cap = if cfg.pin_cap_included_in_wire_cap { netcaps.wire_cap() as f64 } else { netcaps.total_cap() };
            let loads = load_args(graph, &net_loads);

            let arcs = incoming_arcs_filtered(graph, driver, rf, kind_allowed);
            let mut seen_rf = false;

            for inc in &arcs {
                let in_slew = resolve_input_slew(graph, sdc, inc, ap);
                let resolved = store.resolved_for(calc.reduce_supported(), cfg.effective_coupling_cap_multiplier());
                let handle = resolved.as_handle();

                let mut result = calc.gate_delay(&inc.arc.model, rf, in_slew, load_cap, handle, &loads);
                if let Err(e) = &result {
                    warn!(target: "dcalc.dispatch", driver = driver.0, ?rf, ap = ap.0, error = %e, "calculator failed, falling back to lumped-cap");
                    outcome.failed = true;
                    let mut fb = fallback.clone();
                    result = fb.gate_delay(&inc.arc.model, rf, in_slew, load_cap, handle, &loads);
                }
                let Ok(result) = result else {
                    continue;
                };

                seen_rf = true;
                apply_gate_result(graph, driver, inc.edge_id, inc.arc.id.0, rf, ap, &result, cfg.incremental_delay_tolerance, observer, &mut outcome.reenqueue);
            }

            if !seen_rf && reset_absent_on_miss {
                reset_absent_direction(graph, driver, &net_loads, rf, ap);
            }
        }
    }

    calc.finish_driver_pin();
    Ok(outcome)
}

/// §4.2 step 6: a direction with no contributing arc this pass is reset
/// to the AP's initial value rather than left stale, so it cannot
/// spuriously propagate a value from a prior pass.
fn reset_absent_direction(graph: &mut TimingGraph, driver: VertexId, net_loads: &[PinId], rf: RiseFall, ap: AnalysisPointId) {
    graph.vertex_mut(driver).slews.reset_absent(rf, ap);
    for &load_pin in net_loads {
        let Some(load_vertex) = graph.pin(load_pin).load_vertex else { continue };
        graph.vertex_mut(load_vertex).slews.reset_absent(rf, ap);
        if let Some(wire_edge_id) = wire_edge_between(graph, driver, load_vertex) {
            graph.edge_mut(wire_edge_id).wire_delay.as_mut().unwrap().reset_absent(rf, ap);
        }
    }
}

/// Builds one `GateDelayRequest` per driver in a parallel multi-driver
/// group for the primary's batch dispatch (§4.2 step 2, §4.7). Each
/// driver contributes its own best incoming arc for `rf`; drivers with
/// no incoming arc for this direction are skipped.
pub fn build_batch_requests<'g>(graph: &'g TimingGraph, drivers: &[PinId], rf: RiseFall, ap: AnalysisPointId, sdc: &dyn Sdc, store: &'g crate::parasitics::ParasiticStore, reduce_supported: bool, coupling_cap_multiplier: f64, loads: &'g [LoadArg]) -> Vec<GateDelayRequest<'g>> {
    let resolved = store.resolved_for(reduce_supported, coupling_cap_multiplier);
    drivers
        .iter()
        .filter_map(|&drvr_pin| {
            let drvr_vertex = graph.pin(drvr_pin).driver_vertex?;
            let inc = incoming_arcs(graph, drvr_vertex, rf).into_iter().next()?;
            let in_slew = resolve_input_slew(graph, sdc, &inc, ap);
            let netcaps = sdc.pin_net_caps(drvr_pin, rf, ap);
            Some(GateDelayRequest { model: &inc.arc.model, rf, in_slew, load_cap: netcaps.total_cap(), parasitic: resolved.as_handle(), loads })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ap::AnalysisPointSet;
    use crate::calc::{GateDelayResult, LoadDelayResult, ParasiticHandle};
    use crate::error::DcalcError;
    use crate::graph::arc::{GateModel, TimingArcSet, TimingRole};
    use crate::graph::pin::PinDirection;
    use crate::minmax::MinMax;
    use crate::observer::NullObserver;
    use crate::parasitics::ParasiticStore;

    fn ap_set() -> AnalysisPointSet {
        let mut aps = AnalysisPointSet::new();
        aps.push("typical", MinMax::Max, MinMax::Max);
        aps
    }

    struct FixedSdc;
    impl Sdc for FixedSdc {
        fn pin_net_caps(&self, _pin: PinId, _rf: RiseFall, _ap: AnalysisPointId) -> NetCaps {
            NetCaps::new(0.01, 0.0, 1.0, true)
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
        fn parasitic_for(&self, _net: crate::graph::net::NetId, _ap: AnalysisPointId) -> ParasiticStore {
            ParasiticStore::None
        }
    }

    struct AlwaysFailCalc;
    impl ArcDelayCalc for AlwaysFailCalc {
        fn name(&self) -> &'static str {
            "always-fail"
        }
        fn gate_delay(&mut self, _model: &GateModel, _rf: RiseFall, _in_slew: f64, _load_cap: f64, _parasitic: ParasiticHandle<'_>, _loads: &[LoadArg]) -> Result<GateDelayResult, DcalcError> {
            Err(DcalcError::numerical("synthetic failure"))
        }
        fn clone_calc(&self) -> Box<dyn ArcDelayCalc> {
            Box::new(AlwaysFailCalc)
        }
    }

    fn build_inverter_graph() -> (TimingGraph, PinId, PinId) {
        let mut g = TimingGraph::new(ap_set());
        let a = g.add_pin("a", PinDirection::Input);
        let z = g.add_pin("z", PinDirection::Output);
        let net = g.add_net();
        g.pin_mut(a).net = Some(net);
        g.pin_mut(z).net = Some(net);
        g.net_mut(net).drivers.push(z);

        let mut arc_set = TimingArcSet::new(TimingArcSetId(0), "inv");
        arc_set.push(RiseFall::Rise, RiseFall::Fall, TimingRole::Combinational, GateModel::Nldm { delay: crate::model::Table2D::constant(1.0), slew: crate::model::Table2D::constant(0.5) });
        arc_set.push(RiseFall::Fall, RiseFall::Rise, TimingRole::Combinational, GateModel::Nldm { delay: crate::model::Table2D::constant(1.0), slew: crate::model::Table2D::constant(0.5) });
        let arc_set_id = g.add_arc_set(arc_set);

        let av = g.pin(a).load_vertex.unwrap();
        let zv = g.pin(z).driver_vertex.unwrap();
        g.add_arc_edge(av, zv, EdgeKind::CellArc, arc_set_id);

        (g, a, z)
    }

    #[test]
    fn dispatch_driver_with_no_net_is_a_no_op() {
        let mut g = TimingGraph::new(ap_set());
        let a = g.add_pin("a", PinDirection::Output);
        let av = g.pin(a).driver_vertex.unwrap();
        let mut calc = LumpedCapDelayCalc::new();
        let mut obs = NullObserver;
        let outcome = dispatch_driver(&mut g, av, &mut calc, &FixedSdc, &NoParasitics, &DispatchConfig::default(), &mut obs).unwrap();
        assert!(!outcome.failed);
        assert!(outcome.reenqueue.is_empty());
    }

    #[test]
    fn dispatch_driver_merges_slew_from_its_incoming_arc() {
        let (mut g, a, z) = build_inverter_graph();
        let ap = AnalysisPointId(0);
        g.vertex_mut(g.pin(a).load_vertex.unwrap()).slews.merge(RiseFall::Rise, ap, 0.2);

        let zv = g.pin(z).driver_vertex.unwrap();
        let mut calc = LumpedCapDelayCalc::new();
        let mut obs = NullObserver;
        let outcome = dispatch_driver(&mut g, zv, &mut calc, &FixedSdc, &NoParasitics, &DispatchConfig::default(), &mut obs).unwrap();
        assert!(!outcome.failed);
        assert_eq!(g.vertex(zv).slews.get(RiseFall::Fall, ap), 0.5);
    }

    #[test]
    fn calculator_failure_falls_back_to_lumped_cap_and_records_failure() {
        let (mut g, a, z) = build_inverter_graph();
        let ap = AnalysisPointId(0);
        g.vertex_mut(g.pin(a).load_vertex.unwrap()).slews.merge(RiseFall::Rise, ap, 0.2);

        let zv = g.pin(z).driver_vertex.unwrap();
        let mut calc = AlwaysFailCalc;
        let mut obs = NullObserver;
        let outcome = dispatch_driver(&mut g, zv, &mut calc, &FixedSdc, &NoParasitics, &DispatchConfig::default(), &mut obs).unwrap();
        assert!(outcome.failed);
        // lumped-cap still produced a result from the constant-1.0 table.
        assert_eq!(g.vertex(zv).slews.get(RiseFall::Fall, ap), 0.5);
    }

    #[test]
    fn result_with_a_load_annotates_the_wire_edge_and_load_vertex() {
        let (mut g, a, z) = build_inverter_graph();
        let b = g.add_pin("b", PinDirection::Input);
        g.pin_mut(b).net = g.pin(z).net;
        g.net_mut(g.pin(z).net.unwrap()).loads.push(b);
        let bv = g.pin(b).load_vertex.unwrap();
        let zv = g.pin(z).driver_vertex.unwrap();
        g.add_wire_edge(zv, bv);

        let ap = AnalysisPointId(0);
        g.vertex_mut(g.pin(a).load_vertex.unwrap()).slews.merge(RiseFall::Rise, ap, 0.2);

        let mut calc = LumpedCapDelayCalc::new();
        let mut obs = NullObserver;
        dispatch_driver(&mut g, zv, &mut calc, &FixedSdc, &NoParasitics, &DispatchConfig::default(), &mut obs).unwrap();

        assert_eq!(g.vertex(bv).slews.get(RiseFall::Fall, ap), 0.5);
    }
}
