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

//! Pins: input/output terminals of an instance or of the top design.

use crate::graph::net::NetId;
use crate::graph::vertex::VertexId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
    Bidirectional,
    TristateEnable,
}

impl PinDirection {
    pub fn is_driver_capable(self) -> bool {
        matches!(self, PinDirection::Output | PinDirection::Bidirectional | PinDirection::TristateEnable)
    }

    pub fn is_load_capable(self) -> bool {
        matches!(self, PinDirection::Input | PinDirection::Bidirectional)
    }
}

/// An input or output terminal of an instance or of the top design.
/// Bidirectional pins own two vertices (§3): `load_vertex` is always
/// present, `driver_vertex` only for directions that can drive.
#[derive(Debug, Clone)]
pub struct Pin {
    pub id: PinId,
    pub name: String,
    pub direction: PinDirection,
    pub net: Option<NetId>,
    pub hierarchical: bool,
    /// Present for every pin; for a pure output pin this is the only
    /// vertex, representing its drive onto the net.
    pub driver_vertex: Option<VertexId>,
    /// Present for every pin that can receive a value.
    pub load_vertex: Option<VertexId>,
    /// True when an explicit input delay (SDC `set_input_delay`-style
    /// constraint) has been applied to this pin; used by the default
    /// predicate for `bidirect_drvr_slew_from_load` (§9 open question).
    pub has_explicit_input_delay: bool,
}

impl Pin {
    pub fn new(id: PinId, name: impl Into<String>, direction: PinDirection) -> Self {
        Self {
            id,
            name: name.into(),
            direction,
            net: None,
            hierarchical: false,
            driver_vertex: None,
            load_vertex: None,
            has_explicit_input_delay: false,
        }
    }

    /// Default for whether a bidirectional pin's driver slew should be
    /// sourced from its load-side arrival rather than the network slew:
    /// on only when there is no explicit input delay (§9).
    pub fn bidirect_drvr_slew_from_load_default(&self) -> bool {
        self.direction == PinDirection::Bidirectional && !self.has_explicit_input_delay
    }
}
