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

//! The scheduler (§4.1): drives the levelized parallel BFS over a
//! `TimingGraph`'s driver vertices, full or incremental, using the
//! dispatcher (`crate::dispatch`) to compute each driver's delays and
//! slews and `level_bfs` to parallelize within a level.

pub mod deferred;
pub mod invalidation;
pub mod level_bfs;

pub use invalidation::DirtySet;

use crate::calc::ArcDelayCalc;
use crate::collaborators::{Network, ParasiticsReader, Sdc};
use crate::dispatch::DispatchConfig;
use crate::error::{EngineError, GraphError};
use crate::graph::pin::PinId;
use crate::graph::timing_graph::TimingGraph;
use crate::graph::vertex::{LEVEL_UNSET, VertexId};
use crate::observer::DelayCalcObserver;

#[derive(Debug, Clone, Default)]
pub struct SchedulerOutcome {
    pub failed: bool,
    pub vertices_dispatched: usize,
}

/// Owns the timing graph and the calculator template cloned per worker
/// thread (§5 "Per-thread calculator state"), plus the dirty set
/// driving incremental recompute (§4.10).
pub struct Scheduler {
    pub graph: TimingGraph,
    calc_template: Box<dyn ArcDelayCalc>,
    dirty: DirtySet,
    worker_threads: usize,
    dispatch_cfg: DispatchConfig,
}

impl Scheduler {
    pub fn new(graph: TimingGraph, calculator: &str, worker_threads: usize, dispatch_cfg: DispatchConfig) -> Result<Self, EngineError> {
        let calc_template = crate::calc::make_calculator(calculator, dispatch_cfg.prima_reduction_order, dispatch_cfg.effective_coupling_cap_multiplier())?;
        Ok(Self { graph, calc_template, dirty: DirtySet::new(), worker_threads, dispatch_cfg })
    }

    pub fn invalidate_vertex(&mut self, v: VertexId) {
        self.dirty.mark(v);
    }

    pub fn invalidate_pin(&mut self, pin: PinId) {
        invalidation::invalidate_pin(&self.graph, &mut self.dirty, pin);
    }

    /// §4.1 `invalidate(pin)`, hierarchical-name form: resolves `name`
    /// through the `Network` collaborator before invalidating.
    pub fn invalidate_hierarchical_pin(&mut self, network: &dyn Network, name: &str) {
        invalidation::invalidate_hierarchical_pin_by_name(&self.graph, &mut self.dirty, network, name);
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Drops every computed annotation, the dirty set, and multi-driver
    /// resolution, without discarding the graph's topology (§4.1
    /// `clear()`).
    pub fn clear(&mut self) {
        for v in self.graph.vertex_ids() {
            self.graph.vertex_mut(v).slews.clear();
        }
        for e in self.graph.edge_ids() {
            let edge = self.graph.edge_mut(e);
            if let Some(t) = edge.wire_delay.as_mut() {
                t.clear();
            }
            if let Some(t) = edge.arc_delay.as_mut() {
                t.clear();
            }
        }
        self.graph.multi_driver.clear();
        self.dirty.clear();
        self.graph.invalidate_levelization();
    }

    /// Runs the §4.1 levelized parallel BFS: full recompute when the
    /// dirty set is empty, otherwise seeded from the dirty set and
    /// propagated forward through re-levelized driver vertices.
    /// `level_limit` caps the deepest level processed, when the caller
    /// only needs a bounded-depth recompute (e.g. a single combinational
    /// hop after an ECO).
    pub fn recompute(&mut self, level_limit: Option<u32>, sdc: &dyn Sdc, parasitics: &dyn ParasiticsReader, observer: &mut dyn DelayCalcObserver) -> Result<SchedulerOutcome, GraphError> {
        if !self.graph.is_levelized() {
            self.graph.levelize()?;
        }

        let max_level = self
            .graph
            .vertex_ids()
            .map(|v| self.graph.vertex(v).level)
            .filter(|&l| l != LEVEL_UNSET)
            .max()
            .unwrap_or(0);
        let top_level = level_limit.map(|l| l.min(max_level)).unwrap_or(max_level);

        let incremental = self.is_dirty();
        let mut by_level: Vec<Vec<VertexId>> = vec![Vec::new(); top_level as usize + 1];
        if incremental {
            for v in self.dirty.drain() {
                let vertex = self.graph.vertex(v);
                if vertex.level == LEVEL_UNSET || vertex.level > top_level || !vertex.is_driver {
                    continue;
                }
                by_level[vertex.level as usize].push(v);
            }
        } else {
            for v in self.graph.vertex_ids() {
                let vertex = self.graph.vertex(v);
                if vertex.is_driver && vertex.level != LEVEL_UNSET && vertex.level <= top_level {
                    by_level[vertex.level as usize].push(v);
                }
            }
        }

        let mut failed = false;
        let mut vertices_dispatched = 0usize;

        for level in 0..=top_level as usize {
            // Re-enqueues landing on this or an earlier level (the
            // bidirectional-load driver rebroadcast of §4.2 step 5) are
            // worked off within the level itself via a small
            // fixed-point loop, bounded by the graph's vertex count so
            // a pathological reenqueue cycle can't spin forever.
            let mut frontier = std::mem::take(&mut by_level[level]);
            let max_rounds = self.graph.vertex_count().max(1);
            let mut rounds = 0;

            while !frontier.is_empty() && rounds < max_rounds {
                vertices_dispatched += frontier.len();
                let outcome = level_bfs::run_level(&mut self.graph, &frontier, self.calc_template.as_ref(), sdc, parasitics, &self.dispatch_cfg, observer, self.worker_threads);
                failed |= outcome.failed;

                let mut next_frontier = Vec::new();
                for v in outcome.reenqueue {
                    let lvl = self.graph.vertex(v).level;
                    if lvl == LEVEL_UNSET {
                        continue;
                    }
                    let lvl = lvl as usize;
                    if lvl > level && lvl < by_level.len() {
                        by_level[lvl].push(v);
                    } else {
                        next_frontier.push(v);
                    }
                }
                frontier = next_frontier;
                rounds += 1;
            }
        }

        // §4.1: the check-edge set and the latch D->Q set are resolved
        // in one serial pass after the whole levelized BFS above has
        // settled, rather than interleaved with it — `CheckArc` edges
        // aren't levelized at all, and `LatchDQ` edges are excluded
        // from levelization to avoid a false combinational cycle, so
        // neither can rely on the per-level traversal order above.
        let mut deferred_calc = self.calc_template.clone_calc();
        deferred::run_check_arcs(&mut self.graph, deferred_calc.as_mut(), observer);
        let latch_failed = deferred::run_latch_dq_arcs(&mut self.graph, deferred_calc.as_mut(), sdc, parasitics, &self.dispatch_cfg, observer)?;
        failed |= latch_failed;

        Ok(SchedulerOutcome { failed, vertices_dispatched })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ap::{AnalysisPointId, AnalysisPointSet};
    use crate::dispatch::netcaps::NetCaps;
    use crate::graph::arc::{GateModel, TimingArcSet, TimingArcSetId, TimingRole};
    use crate::graph::edge::EdgeKind;
    use crate::graph::pin::PinDirection;
    use crate::minmax::{MinMax, RiseFall};
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

    fn inverter_chain(n: usize) -> TimingGraph {
        let mut g = TimingGraph::new(ap_set());
        let mut prev_driver: Option<PinId> = None;
        for idx in 0..n {
            let inp = g.add_pin(format!("in{idx}"), PinDirection::Input);
            let out = g.add_pin(format!("out{idx}"), PinDirection::Output);
            let net = g.add_net();
            g.pin_mut(inp).net = Some(net);
            g.pin_mut(out).net = Some(net);
            g.net_mut(net).drivers.push(out);

            let mut arc_set = TimingArcSet::new(TimingArcSetId(idx), "inv");
            arc_set.push(RiseFall::Rise, RiseFall::Fall, TimingRole::Combinational, GateModel::Nldm { delay: crate::model::Table2D::constant(1.0), slew: crate::model::Table2D::constant(0.5) });
            arc_set.push(RiseFall::Fall, RiseFall::Rise, TimingRole::Combinational, GateModel::Nldm { delay: crate::model::Table2D::constant(1.0), slew: crate::model::Table2D::constant(0.5) });
            let arc_set_id = g.add_arc_set(arc_set);

            let inv = g.pin(inp).load_vertex.unwrap();
            let outv = g.pin(out).driver_vertex.unwrap();
            g.add_arc_edge(inv, outv, EdgeKind::CellArc, arc_set_id);

            if let Some(prev_out) = prev_driver {
                let prev_outv = g.pin(prev_out).driver_vertex.unwrap();
                g.add_wire_edge(prev_outv, inv);
            } else {
                g.vertex_mut(inv).slews.merge(RiseFall::Rise, AnalysisPointId(0), 0.2);
            }
            prev_driver = Some(out);
        }
        g
    }

    #[test]
    fn full_recompute_propagates_through_every_level_of_a_chain() {
        let g = inverter_chain(3);
        let mut sched = Scheduler::new(g, "lumped-cap", 2, DispatchConfig::default()).unwrap();
        let mut obs = NullObserver;
        let outcome = sched.recompute(None, &FixedSdc, &NoParasitics, &mut obs).unwrap();
        assert!(!outcome.failed);
        assert_eq!(outcome.vertices_dispatched, 3);

        for idx in 0..3 {
            let out_pin = sched.graph.pin(PinId(idx * 2 + 1)).id;
            let outv = sched.graph.pin(out_pin).driver_vertex.unwrap();
            assert_eq!(sched.graph.vertex(outv).slews.get(RiseFall::Fall, AnalysisPointId(0)), 0.5);
        }
    }

    #[test]
    fn clear_resets_annotations_and_dirty_set() {
        let g = inverter_chain(1);
        let mut sched = Scheduler::new(g, "lumped-cap", 1, DispatchConfig::default()).unwrap();
        let mut obs = NullObserver;
        sched.recompute(None, &FixedSdc, &NoParasitics, &mut obs).unwrap();
        sched.invalidate_vertex(VertexId(0));
        sched.clear();

        assert!(!sched.is_dirty());
        assert!(!sched.graph.is_levelized());
        for v in sched.graph.vertex_ids() {
            for ap in sched.graph.ap_set.ids() {
                assert!(!sched.graph.vertex(v).slews.is_present(RiseFall::Rise, ap));
            }
        }
    }

    #[test]
    fn incremental_recompute_only_touches_dirty_drivers() {
        let g = inverter_chain(2);
        let mut sched = Scheduler::new(g, "lumped-cap", 1, DispatchConfig::default()).unwrap();
        let mut obs = NullObserver;
        sched.recompute(None, &FixedSdc, &NoParasitics, &mut obs).unwrap();

        let out1_driver = sched.graph.pin(PinId(3)).driver_vertex.unwrap();
        sched.invalidate_vertex(out1_driver);
        let outcome = sched.recompute(None, &FixedSdc, &NoParasitics, &mut obs).unwrap();
        assert_eq!(outcome.vertices_dispatched, 1);
        assert!(!sched.is_dirty());
    }
}
