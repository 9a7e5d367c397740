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

//! The timing graph: an arena of pins, nets, vertices and edges, plus
//! the levelization pass the scheduler drives its traversal from.
//!
//! Storage follows the teacher's dependency-graph module: owned
//! `Vec`s indexed by small integer ids rather than owning references,
//! so the graph has no lifetime parameter and can be shared behind a
//! lock or handed to worker threads by reference.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::ap::AnalysisPointSet;
use crate::error::GraphError;
use crate::graph::arc::{TimingArcSet, TimingArcSetId};
use crate::graph::edge::{Edge, EdgeId, EdgeKind};
use crate::graph::multi_driver::MultiDriverNetMap;
use crate::graph::net::{Net, NetId};
use crate::graph::pin::{Pin, PinDirection, PinId};
use crate::graph::vertex::{LEVEL_UNSET, Vertex, VertexId};

/// Owns every pin, net, vertex, edge and timing-arc-set in the design,
/// plus the levelization and multi-driver bookkeeping derived from
/// them.
#[derive(Debug)]
pub struct TimingGraph {
    pub ap_set: AnalysisPointSet,
    pins: Vec<Pin>,
    nets: Vec<Net>,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    arc_sets: Vec<TimingArcSet>,
    pub multi_driver: MultiDriverNetMap,
    /// Edges fanning out of a vertex, every kind including `LatchDQ`
    /// included (§9 "remain present for delay reporting"); levelization
    /// builds its own separate graph that excludes `LatchDQ` instead.
    fanout: HashMap<VertexId, Vec<EdgeId>>,
    /// Edges fanning into a vertex, mirroring `fanout`.
    fanin: HashMap<VertexId, Vec<EdgeId>>,
    levelized: bool,
}

impl TimingGraph {
    pub fn new(ap_set: AnalysisPointSet) -> Self {
        Self {
            ap_set,
            pins: Vec::new(),
            nets: Vec::new(),
            vertices: Vec::new(),
            edges: Vec::new(),
            arc_sets: Vec::new(),
            multi_driver: MultiDriverNetMap::new(),
            fanout: HashMap::new(),
            fanin: HashMap::new(),
            levelized: false,
        }
    }

    pub fn add_arc_set(&mut self, arc_set: TimingArcSet) -> TimingArcSetId {
        let id = arc_set.id;
        self.arc_sets.push(arc_set);
        id
    }

    pub fn arc_set(&self, id: TimingArcSetId) -> &TimingArcSet {
        &self.arc_sets[id.0]
    }

    pub fn add_net(&mut self) -> NetId {
        let id = NetId(self.nets.len());
        self.nets.push(Net::new());
        id
    }

    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.0]
    }

    pub fn net_mut(&mut self, id: NetId) -> &mut Net {
        &mut self.nets[id.0]
    }

    /// Adds a pin and its vertex (or vertices, for bidirectional pins;
    /// §3). Returns the pin id.
    pub fn add_pin(&mut self, name: impl Into<String>, direction: PinDirection) -> PinId {
        let id = PinId(self.pins.len());
        let mut pin = Pin::new(id, name, direction);

        if direction.is_load_capable() {
            let v = self.push_vertex(id);
            pin.load_vertex = Some(v);
        }
        if direction.is_driver_capable() {
            let v = self.push_vertex(id);
            self.vertices[v.0].is_driver = true;
            pin.driver_vertex = Some(v);
        }
        self.pins.push(pin);
        self.levelized = false;
        id
    }

    fn push_vertex(&mut self, pin: PinId) -> VertexId {
        let id = VertexId(self.vertices.len());
        self.vertices.push(Vertex::new(id, pin, &self.ap_set));
        id
    }

    pub fn pin(&self, id: PinId) -> &Pin {
        &self.pins[id.0]
    }

    pub fn pin_mut(&mut self, id: PinId) -> &mut Pin {
        &mut self.pins[id.0]
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.0]
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex {
        &mut self.vertices[id.0]
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> {
        (0..self.vertices.len()).map(VertexId)
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> {
        (0..self.edges.len()).map(EdgeId)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.edges[id.0]
    }

    /// Every edge, `LatchDQ` included, is reachable via `fanout`/`fanin`
    /// (§9 "remain present for delay reporting"); only `levelize`'s
    /// separate `DiGraph` excludes `LatchDQ` edges, to keep a transparent
    /// latch's D->Q feedback from looking like a combinational cycle.
    fn push_edge(&mut self, edge: Edge) -> EdgeId {
        let id = edge.id;
        self.fanout.entry(edge.from).or_default().push(id);
        self.fanin.entry(edge.to).or_default().push(id);
        self.edges.push(edge);
        self.levelized = false;
        id
    }

    pub fn add_wire_edge(&mut self, from: VertexId, to: VertexId) -> EdgeId {
        let id = EdgeId(self.edges.len());
        let edge = Edge::new_wire(id, from, to, &self.ap_set);
        self.push_edge(edge)
    }

    /// Also sets the check/latch traversal flags on the edge's endpoint
    /// vertices (§3, §9): a `CheckArc`'s `to` vertex is the checked pin
    /// and its `from` vertex is the check's clock; a `LatchDQ`'s `from`
    /// vertex is the latch's data input.
    pub fn add_arc_edge(&mut self, from: VertexId, to: VertexId, kind: EdgeKind, arc_set: TimingArcSetId) -> EdgeId {
        let id = EdgeId(self.edges.len());
        let arc_count = self.arc_set(arc_set).arcs.len();
        let edge = Edge::new_arc(id, from, to, kind, arc_set, arc_count, &self.ap_set);
        match kind {
            EdgeKind::CheckArc => {
                self.vertices[to.0].has_checks = true;
                self.vertices[from.0].is_check_clock = true;
            }
            EdgeKind::LatchDQ => {
                self.vertices[from.0].is_latch_data = true;
            }
            _ => {}
        }
        self.push_edge(edge)
    }

    pub fn fanout_of(&self, v: VertexId) -> &[EdgeId] {
        self.fanout.get(&v).map(|e| e.as_slice()).unwrap_or(&[])
    }

    pub fn fanin_of(&self, v: VertexId) -> &[EdgeId] {
        self.fanin.get(&v).map(|e| e.as_slice()).unwrap_or(&[])
    }

    /// Assigns each vertex a level number, one plus the max level of its
    /// fanin vertices (0 for roots), over the subgraph with `LatchDQ`
    /// edges removed so transparent-latch D->Q arcs don't make an
    /// otherwise-combinational loop look cyclic (§9). Levels drive the
    /// scheduler's per-level work-stealing traversal.
    pub fn levelize(&mut self) -> Result<(), GraphError> {
        let mut pg: DiGraph<VertexId, ()> = DiGraph::new();
        let mut node_of = HashMap::with_capacity(self.vertices.len());
        for v in self.vertex_ids() {
            let idx = pg.add_node(v);
            node_of.insert(v, idx);
        }
        for edge in &self.edges {
            if edge.excluded_from_levelization() || edge.disabled {
                continue;
            }
            pg.add_edge(node_of[&edge.from], node_of[&edge.to], ());
        }

        let order = toposort(&pg, None).map_err(|_| GraphError::UnexpectedCycle)?;

        for v in self.vertices.iter_mut() {
            v.level = LEVEL_UNSET;
        }
        let index_of: HashMap<NodeIndex, VertexId> = node_of.iter().map(|(v, idx)| (*idx, *v)).collect();
        for idx in order {
            let v = index_of[&idx];
            let mut level: u32 = 0;
            for edge_idx in pg.neighbors_directed(idx, petgraph::Direction::Incoming) {
                let from_v = index_of[&edge_idx];
                let from_level = self.vertices[from_v.0].level;
                if from_level != LEVEL_UNSET {
                    level = level.max(from_level + 1);
                }
            }
            self.vertices[v.0].level = level;
        }

        self.levelized = true;
        let max_level = self.vertices.iter().map(|v| v.level).filter(|&l| l != LEVEL_UNSET).max().unwrap_or(0);
        debug!(target: "dcalc.level", vertex_count = self.vertices.len(), max_level, "levelized timing graph");
        Ok(())
    }

    pub fn is_levelized(&self) -> bool {
        self.levelized
    }

    pub fn invalidate_levelization(&mut self) {
        self.levelized = false;
    }
}
