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

//! Incremental delay-calculation and slew-propagation engine for a
//! levelized gate-level timing graph.
//!
//! A caller builds a `graph::TimingGraph` from its own netlist (§3),
//! implements the four collaborator traits in `collaborators` against
//! its own cell library, parasitics reader, SDC and netlist query
//! surfaces, and drives timing updates through an `Engine`.

pub mod ap;
pub mod calc;
pub mod collaborators;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod minmax;
pub mod model;
pub mod observer;
pub mod parasitics;
pub mod scheduler;

pub use ap::{AnalysisPoint, AnalysisPointId, AnalysisPointSet};
pub use collaborators::{CellLibrary, Network, ParasiticsReader, Sdc};
pub use config::EngineConfig;
pub use dispatch::DispatchConfig;
pub use error::{DcalcError, EngineError, GraphError};
pub use graph::{PinId, TimingGraph, VertexId};
pub use observer::{DelayCalcObserver, NullObserver};
pub use scheduler::{Scheduler, SchedulerOutcome};

/// A validated configuration wired to its scheduler (§6). Construction
/// is the single point where an unrecognized calculator name or an
/// out-of-range config value is rejected (§7 kind 4); every later
/// `recompute`/`invalidate` call is infallible on configuration
/// grounds.
pub struct Engine {
    pub scheduler: Scheduler,
    config: EngineConfig,
}

impl Engine {
    pub fn new(graph: TimingGraph, config: EngineConfig) -> Result<Self, EngineError> {
        let worker_threads = config.validate()?;
        let dispatch_cfg = DispatchConfig {
            incremental_delay_tolerance: config.incremental_delay_tolerance,
            coupling_cap_multiplier: config.coupling_cap_multiplier,
            keep_coupling_caps: config.keep_coupling_caps,
            pin_cap_included_in_wire_cap: config.pin_cap_included_in_wire_cap,
            prima_reduction_order: config.prima_reduction_order,
        };
        let scheduler = Scheduler::new(graph, &config.calculator, worker_threads, dispatch_cfg)?;
        Ok(Self { scheduler, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the scheduler's levelized pass (§4.1): full if nothing is
    /// dirty, incremental otherwise.
    pub fn recompute(&mut self, level_limit: Option<u32>, sdc: &dyn Sdc, parasitics: &dyn ParasiticsReader, observer: &mut dyn DelayCalcObserver) -> Result<SchedulerOutcome, GraphError> {
        self.scheduler.recompute(level_limit, sdc, parasitics, observer)
    }

    pub fn invalidate_pin(&mut self, pin: PinId) {
        self.scheduler.invalidate_pin(pin);
    }

    pub fn invalidate_hierarchical_pin(&mut self, network: &dyn Network, name: &str) {
        self.scheduler.invalidate_hierarchical_pin(network, name);
    }

    pub fn clear(&mut self) {
        self.scheduler.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ap::AnalysisPointSet;
    use crate::dispatch::netcaps::NetCaps;
    use crate::graph::pin::PinDirection;
    use crate::minmax::{MinMax, RiseFall};
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

    #[test]
    fn engine_new_rejects_an_invalid_config() {
        let mut cfg = EngineConfig::default();
        cfg.worker_threads = Some(0);
        let err = Engine::new(TimingGraph::new(ap_set()), cfg).unwrap_err();
        assert!(matches!(err, EngineError::InvalidWorkerCount));
    }

    #[test]
    fn engine_recompute_on_an_empty_graph_does_nothing() {
        let mut engine = Engine::new(TimingGraph::new(ap_set()), EngineConfig::default()).unwrap();
        let mut obs = NullObserver;
        let outcome = engine.recompute(None, &FixedSdc, &NoParasitics, &mut obs).unwrap();
        assert!(!outcome.failed);
        assert_eq!(outcome.vertices_dispatched, 0);
    }

    #[test]
    fn engine_clear_is_idempotent_on_an_empty_graph() {
        let mut g = TimingGraph::new(ap_set());
        g.add_pin("a", PinDirection::Output);
        let mut engine = Engine::new(g, EngineConfig::default()).unwrap();
        engine.clear();
        engine.clear();
        assert!(!engine.scheduler.is_dirty());
    }
}
