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

//! Dirty-set tracking for incremental recompute (§4.10). A vertex
//! invalidation just marks it dirty; resolving *which* vertices an
//! edit touches (hierarchical fanout, multi-driver group propagation)
//! happens here so the scheduler's `recompute` only has to drain the set.

use std::collections::BTreeSet;

use crate::collaborators::Network;
use crate::graph::multi_driver::MultiDriverNetMap;
use crate::graph::pin::PinId;
use crate::graph::timing_graph::TimingGraph;
use crate::graph::vertex::VertexId;

#[derive(Debug, Clone, Default)]
pub struct DirtySet {
    vertices: BTreeSet<VertexId>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, v: VertexId) {
        self.vertices.insert(v);
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn contains(&self, v: VertexId) -> bool {
        self.vertices.contains(&v)
    }

    pub fn iter(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.iter().copied()
    }

    /// Drains the set; the scheduler calls this once a recompute pass
    /// over the dirty set has completed (§4.10 "after a completed pass
    /// the dirty set is emptied").
    pub fn drain(&mut self) -> Vec<VertexId> {
        self.vertices.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
    }
}

/// Marks `pin`'s load and driver vertices dirty, resolving multi-driver
/// group membership and hierarchical fanout (§4.10).
pub fn invalidate_pin(graph: &TimingGraph, dirty: &mut DirtySet, pin: PinId) {
    let p = graph.pin(pin);
    if let Some(v) = p.load_vertex {
        dirty.mark(v);
    }
    if let Some(v) = p.driver_vertex {
        dirty.mark(v);
        invalidate_driver_group(graph, dirty, pin);
    }
    if p.hierarchical {
        invalidate_hierarchical_fanout(graph, dirty, pin);
    }
}

/// Multi-driver invalidation: any driver of a group also marks the
/// group's primary driver, so the whole group recomputes from one
/// trigger (§4.10).
fn invalidate_driver_group(graph: &TimingGraph, dirty: &mut DirtySet, pin: PinId) {
    let Some(net) = graph.pin(pin).net else { return };
    if let Some(primary) = primary_driver(&graph.multi_driver, net, pin) {
        if let Some(v) = graph.pin(primary).driver_vertex {
            dirty.mark(v);
        }
    }
}

fn primary_driver(map: &MultiDriverNetMap, net: crate::graph::net::NetId, pin: PinId) -> Option<PinId> {
    map.get(net).map(|g| g.primary).filter(|&p| p != pin)
}

/// A hierarchical pin fans out to every boundary-crossing edge's
/// from-pin: wire edges whose `to` vertex belongs to this pin's load
/// vertex but whose `from` pin lives across the hierarchy boundary
/// (§4.10). In this flattened graph representation, "boundary-crossing"
/// means any wire edge landing on `pin`'s load vertex.
fn invalidate_hierarchical_fanout(graph: &TimingGraph, dirty: &mut DirtySet, pin: PinId) {
    let Some(load_vertex) = graph.pin(pin).load_vertex else { return };
    for &edge_id in graph.fanin_of(load_vertex) {
        let edge = graph.edge(edge_id);
        dirty.mark(edge.from);
    }
}

/// Resolves a hierarchical pin name through the `Network` collaborator
/// and invalidates it, for callers that only have the name (§4.1
/// `invalidate(pin)` contract, hierarchical case).
pub fn invalidate_hierarchical_pin_by_name(graph: &TimingGraph, dirty: &mut DirtySet, network: &dyn Network, name: &str) -> Option<()> {
    let pin = network.hierarchical_pin_by_name(name)?;
    invalidate_pin(graph, dirty, pin);
    Some(())
}
