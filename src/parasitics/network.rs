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

//! Per-net RC parasitic networks: an arena of nodes and a side vector
//! of resistor/capacitor branches (§9 "Parasitic storage"). One
//! network is built per (driver pin, rise/fall, analysis point).

use std::collections::HashMap;

use crate::graph::pin::PinId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParasiticNodeId(pub usize);

#[derive(Debug, Clone)]
pub struct ParasiticNode {
    pub id: ParasiticNodeId,
    /// `Some` for driver-pin and load-pin nodes; `None` for internal
    /// wire subnodes that exist only to host a resistor junction.
    pub pin: Option<PinId>,
    pub self_cap: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Resistor {
    pub n1: ParasiticNodeId,
    pub n2: ParasiticNodeId,
    pub resistance: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct CouplingCap {
    pub n1: ParasiticNodeId,
    pub n2: ParasiticNodeId,
    pub cap: f64,
}

/// An RC network for one net: driver node, load/internal nodes,
/// resistor branches forming a tree, and coupling caps to other nets
/// (folded into self-caps by reduction using a coupling-cap
/// multiplier, §4.8).
#[derive(Debug, Clone)]
pub struct ParasiticNetwork {
    pub driver_node: ParasiticNodeId,
    nodes: Vec<ParasiticNode>,
    resistors: Vec<Resistor>,
    coupling_caps: Vec<CouplingCap>,
    node_of_pin: HashMap<PinId, ParasiticNodeId>,
    adjacency: HashMap<ParasiticNodeId, Vec<usize>>,
}

impl ParasiticNetwork {
    /// Creates a network with just a driver node; `driver_pin` is the
    /// net's driver.
    pub fn new(driver_pin: PinId) -> Self {
        let driver_node = ParasiticNodeId(0);
        let mut node_of_pin = HashMap::new();
        node_of_pin.insert(driver_pin, driver_node);
        Self {
            driver_node,
            nodes: vec![ParasiticNode { id: driver_node, pin: Some(driver_pin), self_cap: 0.0 }],
            resistors: Vec::new(),
            coupling_caps: Vec::new(),
            node_of_pin,
            adjacency: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, pin: Option<PinId>, self_cap: f64) -> ParasiticNodeId {
        let id = ParasiticNodeId(self.nodes.len());
        self.nodes.push(ParasiticNode { id, pin, self_cap });
        if let Some(p) = pin {
            self.node_of_pin.insert(p, id);
        }
        id
    }

    pub fn add_resistor(&mut self, n1: ParasiticNodeId, n2: ParasiticNodeId, resistance: f64) {
        let idx = self.resistors.len();
        self.resistors.push(Resistor { n1, n2, resistance });
        self.adjacency.entry(n1).or_default().push(idx);
        self.adjacency.entry(n2).or_default().push(idx);
    }

    pub fn add_coupling_cap(&mut self, n1: ParasiticNodeId, n2: ParasiticNodeId, cap: f64) {
        self.coupling_caps.push(CouplingCap { n1, n2, cap });
    }

    pub fn node(&self, id: ParasiticNodeId) -> &ParasiticNode {
        &self.nodes[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ParasiticNode> {
        self.nodes.iter()
    }

    pub fn resistors(&self) -> &[Resistor] {
        &self.resistors
    }

    pub fn node_of_pin(&self, pin: PinId) -> Option<ParasiticNodeId> {
        self.node_of_pin.get(&pin).copied()
    }

    pub fn load_nodes(&self) -> impl Iterator<Item = &ParasiticNode> {
        self.nodes.iter().filter(move |n| n.id != self.driver_node && n.pin.is_some())
    }

    /// Resistor indices incident to `node`, for spanning-tree and
    /// MNA-stamping traversal.
    pub fn incident_resistors(&self, node: ParasiticNodeId) -> impl Iterator<Item = &Resistor> {
        self.adjacency.get(&node).into_iter().flatten().map(move |&i| &self.resistors[i])
    }

    /// A node's local capacitance folded with any coupling caps it
    /// participates in, scaled by `coupling_cap_multiplier` (§4.8).
    pub fn effective_self_cap(&self, node: ParasiticNodeId, coupling_cap_multiplier: f64) -> f64 {
        let base = self.nodes[node.0].self_cap;
        let coupling: f64 = self
            .coupling_caps
            .iter()
            .filter(|c| c.n1 == node || c.n2 == node)
            .map(|c| c.cap * coupling_cap_multiplier)
            .sum();
        base + coupling
    }

    pub fn total_self_cap(&self, coupling_cap_multiplier: f64) -> f64 {
        self.nodes.iter().map(|n| self.effective_self_cap(n.id, coupling_cap_multiplier)).sum()
    }

    /// Minimum r*c over every branch, the basis for the CCS/PRIMA
    /// time-step adaptation in §4.5: "Δt adapts from a fraction of the
    /// fastest local RC".
    pub fn fastest_branch_rc(&self, coupling_cap_multiplier: f64) -> Option<f64> {
        self.resistors
            .iter()
            .map(|r| {
                let c1 = self.effective_self_cap(r.n1, coupling_cap_multiplier);
                let c2 = self.effective_self_cap(r.n2, coupling_cap_multiplier);
                r.resistance * c1.max(c2).max(1e-18)
            })
            .filter(|rc| *rc > 0.0)
            .fold(None, |acc, rc| Some(acc.map_or(rc, |a: f64| a.min(rc))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(n: usize) -> PinId {
        PinId(n)
    }

    #[test]
    fn single_load_line_has_one_resistor_and_two_caps() {
        let mut net = ParasiticNetwork::new(pin(0));
        let load = net.add_node(Some(pin(1)), 0.02);
        net.add_resistor(net.driver_node, load, 50.0);
        assert_eq!(net.node_count(), 2);
        assert_eq!(net.resistors().len(), 1);
        assert_eq!(net.load_nodes().count(), 1);
    }

    #[test]
    fn coupling_cap_is_scaled_by_multiplier() {
        let mut net = ParasiticNetwork::new(pin(0));
        let other = net.add_node(None, 0.0);
        net.add_coupling_cap(net.driver_node, other, 0.01);
        assert_eq!(net.effective_self_cap(net.driver_node, 1.0), 0.01);
        assert_eq!(net.effective_self_cap(net.driver_node, 2.0), 0.02);
    }

    #[test]
    fn fastest_branch_rc_picks_the_minimum() {
        let mut net = ParasiticNetwork::new(pin(0));
        let near = net.add_node(Some(pin(1)), 0.01);
        let far = net.add_node(Some(pin(2)), 0.01);
        net.add_resistor(net.driver_node, near, 10.0);
        net.add_resistor(near, far, 1000.0);
        let fastest = net.fastest_branch_rc(1.0).unwrap();
        assert!((fastest - 10.0 * 0.01).abs() < 1e-12, "{fastest}");
    }
}
