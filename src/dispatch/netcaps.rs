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

//! Per-net loading summary the dispatcher queries alongside the
//! parasitic before invoking a calculator (§4.2 step 1).

/// Pin-cap + wire-cap + fanout + has-set-load for one net, rise/fall
/// and ap. `f32` fields mirror the Sdc collaborator's native precision
/// for constraint-derived net loading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetCaps {
    pin_cap: f32,
    wire_cap: f32,
    fanout: f32,
    has_net_load: bool,
}

impl NetCaps {
    pub fn new(pin_cap: f32, wire_cap: f32, fanout: f32, has_net_load: bool) -> Self {
        Self { pin_cap, wire_cap, fanout, has_net_load }
    }

    pub fn pin_cap(&self) -> f32 {
        self.pin_cap
    }

    pub fn wire_cap(&self) -> f32 {
        self.wire_cap
    }

    pub fn fanout(&self) -> f32 {
        self.fanout
    }

    pub fn has_net_load(&self) -> bool {
        self.has_net_load
    }

    /// Total output-net capacitance the lumped-cap calculator's table
    /// axis is parameterized by: pin-cap + wire-cap (§4.3).
    pub fn total_cap(&self) -> f64 {
        (self.pin_cap + self.wire_cap) as f64
    }
}

impl Default for NetCaps {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, false)
    }
}
