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

//! The §4.1 deferred end-of-BFS pass: resolves the two edge kinds the
//! main levelized traversal can't handle in place. `CheckArc` edges
//! aren't levelized at all (a check has no "output" to schedule from);
//! `LatchDQ` edges are excluded from levelization to avoid a false
//! combinational cycle through a transparent latch's feedback path, so
//! the D-vertex's slew may still be settling when the main pass reaches
//! the Q-vertex's level. Both are resolved in one serial pass once
//! `Scheduler::recompute`'s per-level loop is done.

use tracing::warn;

use crate::calc::{ArcDelayCalc, LumpedCapDelayCalc, ParasiticHandle};
use crate::collaborators::{ParasiticsReader, Sdc};
use crate::dispatch::{self, DispatchConfig};
use crate::error::GraphError;
use crate::graph::arc::{GateModel, TimingArc};
use crate::graph::edge::{EdgeId, EdgeKind};
use crate::graph::timing_graph::TimingGraph;
use crate::graph::vertex::VertexId;
use crate::observer::DelayCalcObserver;

/// Computes every `CheckArc` edge's scalar delay (setup/hold/recovery/
/// removal/skew/width/period, §3) and annotates it via `set_annotated`
/// — a check arc's delay isn't a candidate for the vertex-slew "worse
/// wins" merge, it's a constant fact about the library cell. Slack
/// (comparing the check delay against the data/clock arrival) is out of
/// this engine's scope (§8); `observer.check_delay_changed_to` is the
/// hook a caller's own slack pass would subscribe to.
pub fn run_check_arcs(graph: &mut TimingGraph, calc: &mut dyn ArcDelayCalc, observer: &mut dyn DelayCalcObserver) {
    let fallback = LumpedCapDelayCalc::new();
    let ap_ids: Vec<_> = graph.ap_set.ids().collect();

    let mut work: Vec<(EdgeId, VertexId, VertexId, TimingArc)> = Vec::new();
    for edge_id in graph.edge_ids() {
        let edge = graph.edge(edge_id);
        if edge.disabled || edge.kind != EdgeKind::CheckArc {
            continue;
        }
        let Some(arc_set_id) = edge.arc_set else { continue };
        for arc in &graph.arc_set(arc_set_id).arcs {
            if arc.role.is_check() {
                work.push((edge_id, edge.from, edge.to, arc.clone()));
            }
        }
    }

    for (edge_id, from, to, arc) in work {
        if !matches!(arc.model, GateModel::Scalar(_)) {
            continue;
        }
        for &ap in &ap_ids {
            let in_slew = graph.vertex(from).slews.get(arc.from_rf, ap);
            let mut result = calc.gate_delay(&arc.model, arc.to_rf, in_slew, 0.0, ParasiticHandle::None, &[]);
            if let Err(e) = &result {
                warn!(target: "dcalc.dispatch", edge = edge_id.0, ap = ap.0, error = %e, "check-arc calculator failed, falling back to lumped-cap");
                let mut fb = fallback.clone();
                result = fb.gate_delay(&arc.model, arc.to_rf, in_slew, 0.0, ParasiticHandle::None, &[]);
            }
            let Ok(result) = result else {
                continue;
            };
            graph.edge_mut(edge_id).arc_delay.as_mut().unwrap().set_annotated(arc.id.0, ap, result.gate_delay);
            observer.check_delay_changed_to(to);
        }
    }
}

/// Re-dispatches every `LatchDQ` edge's driver vertex once the main BFS
/// has settled, so a transparent latch's D->Q delay/slew is computed
/// from the D-vertex's final slew rather than whatever it held when the
/// latch's own level ran (§9 "D->Q arcs remain present for delay
/// reporting").
pub fn run_latch_dq_arcs(
    graph: &mut TimingGraph,
    calc: &mut dyn ArcDelayCalc,
    sdc: &dyn Sdc,
    parasitics: &dyn ParasiticsReader,
    cfg: &DispatchConfig,
    observer: &mut dyn DelayCalcObserver,
) -> Result<bool, GraphError> {
    let mut targets: Vec<VertexId> = graph
        .edge_ids()
        .filter_map(|id| {
            let edge = graph.edge(id);
            (!edge.disabled && edge.kind == EdgeKind::LatchDQ).then_some(edge.to)
        })
        .collect();
    targets.sort();
    targets.dedup();

    let mut failed = false;
    for driver in targets {
        let outcome = dispatch::dispatch_latch_dq(graph, driver, calc, sdc, parasitics, cfg, observer)?;
        failed |= outcome.failed;
    }
    Ok(failed)
}
