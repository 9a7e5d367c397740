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

//! Multi-driver net resolution: a net driven by more than one output
//! pin is given a single logical parasitic network for wire-delay
//! purposes, with one driver designated primary for invalidation
//! propagation (§4.7, §9).

use std::collections::HashMap;

use crate::error::GraphError;
use crate::graph::net::NetId;
use crate::graph::pin::PinId;

/// Resolved view of one multi-driver net: every driver pin on the net
/// plus the pin chosen as primary (the one invalidation and the
/// scheduler's dirty-set propagation key off of).
#[derive(Debug, Clone)]
pub struct MultiDriverNet {
    pub net: NetId,
    pub drivers: Vec<PinId>,
    pub primary: PinId,
}

impl MultiDriverNet {
    /// Builds the resolved view for a net, choosing the first driver in
    /// pin-id order as primary. Fails if the net has no loads, since a
    /// multi-driver net with nothing to drive has no delay to compute
    /// (§7 kind 3).
    pub fn resolve(net: NetId, drivers: Vec<PinId>, load_count: usize) -> Result<Self, GraphError> {
        if load_count == 0 {
            return Err(GraphError::MultiDriverNetHasNoLoads(net));
        }
        let primary = *drivers.iter().min_by_key(|p| p.0).expect("multi-driver net must have at least one driver");
        Ok(Self { net, drivers, primary })
    }

    pub fn is_primary(&self, pin: PinId) -> bool {
        pin == self.primary
    }
}

/// All multi-driver nets in a design, keyed by net for O(1) lookup from
/// the dispatcher and the invalidation machinery.
#[derive(Debug, Clone, Default)]
pub struct MultiDriverNetMap {
    by_net: HashMap<NetId, MultiDriverNet>,
}

impl MultiDriverNetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resolved: MultiDriverNet) {
        self.by_net.insert(resolved.net, resolved);
    }

    pub fn get(&self, net: NetId) -> Option<&MultiDriverNet> {
        self.by_net.get(&net)
    }

    pub fn contains(&self, net: NetId) -> bool {
        self.by_net.contains_key(&net)
    }

    pub fn clear(&mut self) {
        self.by_net.clear();
    }

    /// The primary driver pin to key invalidation off of when `pin`
    /// (any driver of a multi-driver net) changes, falling back to
    /// `pin` itself for single-driver nets (§9).
    pub fn invalidation_key(&self, net: NetId, pin: PinId) -> PinId {
        match self.by_net.get(&net) {
            Some(resolved) => resolved.primary,
            None => pin,
        }
    }
}
