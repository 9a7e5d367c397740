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

//! Reduces a full RC `ParasiticNetwork` to a π model plus per-load
//! Elmore time constants (§4.8): builds a rooted spanning tree from
//! the driver, sums downstream capacitance post-order, then matches
//! the first three moments at the driver and integrates R·C downstream
//! per load.

use std::collections::HashMap;

use crate::graph::pin::PinId;
use crate::parasitics::network::{ParasiticNetwork, ParasiticNodeId};
use crate::parasitics::pi_model::{ElmoreDelay, PiModel, TwoPole};

/// The result of reducing one network: a driver-side π model, a
/// two-pole fit of the same moments, and one Elmore time constant per
/// load pin.
#[derive(Debug, Clone)]
pub struct ReducedParasitic {
    pub pi: PiModel,
    pub two_pole: TwoPole,
    pub load_tau: HashMap<PinId, f64>,
    /// Aggregate driver-side time constant (R_drvr-free; this is the
    /// network's own contribution), used as `tau_drvr` in
    /// `ElmoreDelay::load_slew` when no explicit driver resistance is
    /// modeled.
    pub tau_drvr: f64,
}

impl ReducedParasitic {
    pub fn elmore_for(&self, load: PinId) -> ElmoreDelay {
        ElmoreDelay::new(self.load_tau.get(&load).copied().unwrap_or(0.0))
    }
}

struct TreeWalk<'a> {
    net: &'a ParasiticNetwork,
    coupling_cap_multiplier: f64,
    parent: HashMap<ParasiticNodeId, (ParasiticNodeId, f64)>,
    visited: Vec<ParasiticNodeId>,
}

impl<'a> TreeWalk<'a> {
    fn new(net: &'a ParasiticNetwork, coupling_cap_multiplier: f64) -> Self {
        Self { net, coupling_cap_multiplier, parent: HashMap::new(), visited: Vec::new() }
    }

    /// Breadth-first spanning tree from the driver node; parasitic
    /// networks are physically trees (a net has one driver and fans
    /// out), so BFS from the driver visits every node exactly once.
    fn build(&mut self) {
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(self.net.driver_node);
        self.visited.push(self.net.driver_node);
        let mut seen = std::collections::HashSet::new();
        seen.insert(self.net.driver_node);
        while let Some(node) = queue.pop_front() {
            for r in self.net.incident_resistors(node) {
                let other = if r.n1 == node { r.n2 } else { r.n1 };
                if seen.insert(other) {
                    self.parent.insert(other, (node, r.resistance));
                    self.visited.push(other);
                    queue.push_back(other);
                }
            }
        }
    }

    fn children_of(&self) -> HashMap<ParasiticNodeId, Vec<ParasiticNodeId>> {
        let mut children: HashMap<ParasiticNodeId, Vec<ParasiticNodeId>> = HashMap::new();
        for (&node, &(parent, _)) in &self.parent {
            children.entry(parent).or_default().push(node);
        }
        children
    }

    /// Post-order downstream capacitance: `c_total[node] = self_cap +
    /// sum(c_total[child])` (§4.8).
    fn downstream_cap(&self, children: &HashMap<ParasiticNodeId, Vec<ParasiticNodeId>>) -> HashMap<ParasiticNodeId, f64> {
        let mut c_total = HashMap::new();
        // visited is already in BFS order (parents before children);
        // walk it in reverse for a cheap post-order without recursion.
        for &node in self.visited.iter().rev() {
            let own = self.net.effective_self_cap(node, self.coupling_cap_multiplier);
            let children_sum: f64 = children.get(&node).into_iter().flatten().map(|c| c_total[c]).sum();
            c_total.insert(node, own + children_sum);
        }
        c_total
    }

    /// Path resistance from the driver to each node.
    fn path_resistance(&self) -> HashMap<ParasiticNodeId, f64> {
        let mut r_path = HashMap::new();
        r_path.insert(self.net.driver_node, 0.0);
        for &node in &self.visited {
            if node == self.net.driver_node {
                continue;
            }
            let (parent, r) = self.parent[&node];
            let parent_r = r_path[&parent];
            r_path.insert(node, parent_r + r);
        }
        r_path
    }
}

/// Reduces `net` to a π model, a two-pole fit, and per-load Elmore taus.
pub fn reduce_parasitic(net: &ParasiticNetwork, coupling_cap_multiplier: f64) -> ReducedParasitic {
    let mut walk = TreeWalk::new(net, coupling_cap_multiplier);
    walk.build();
    let children = walk.children_of();
    let c_total = walk.downstream_cap(&children);
    let r_path = walk.path_resistance();

    let total_cap = c_total[&net.driver_node];

    // first and second moments at the driver: m1 = sum_i C_i * R_i
    // (Elmore sum over every node), m2 approximated as sum_i C_i *
    // R_i^2 (ignoring shared-path covariance between nodes, a
    // documented simplification consistent with the nearest-corner CCS
    // lookup's accuracy/complexity tradeoff).
    let mut m1 = 0.0;
    let mut m2 = 0.0;
    for &node in &walk.visited {
        let own_cap = net.effective_self_cap(node, coupling_cap_multiplier);
        let r = r_path[&node];
        m1 += own_cap * r;
        m2 += own_cap * r * r;
    }

    let pi = PiModel::from_moments(total_cap, m1, m2);
    let two_pole = TwoPole::from_moments(m1, m2);

    let mut load_tau = HashMap::new();
    for load in net.load_nodes() {
        if let Some(pin) = load.pin {
            load_tau.insert(pin, r_path[&load.id]);
        }
    }

    ReducedParasitic { pi, two_pole, load_tau, tau_drvr: m1 }
}
