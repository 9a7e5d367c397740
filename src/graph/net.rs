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

//! Nets: equipotential wire groups connecting driver and load pins.

use crate::graph::pin::PinId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetId(pub usize);

/// Equipotential wire group. Zero or more driver pins, zero or more
/// load pins. A net with more than one driver pin is resolved by the
/// multi-driver machinery in `graph::multi_driver`.
#[derive(Debug, Clone, Default)]
pub struct Net {
    pub drivers: Vec<PinId>,
    pub loads: Vec<PinId>,
}

impl Net {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_multi_driver(&self) -> bool {
        self.drivers.len() > 1
    }
}
