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

//! The timing graph: pins, nets, vertices, edges, timing arcs, and the
//! multi-driver / levelization bookkeeping built on top of them (§3).

pub mod arc;
pub mod edge;
pub mod multi_driver;
pub mod net;
pub mod pin;
pub mod timing_graph;
pub mod vertex;

pub use arc::{GateModel, TimingArc, TimingArcId, TimingArcSet, TimingArcSetId, TimingRole};
pub use edge::{ArcApTable, Edge, EdgeId, EdgeKind};
pub use multi_driver::{MultiDriverNet, MultiDriverNetMap};
pub use net::{Net, NetId};
pub use pin::{Pin, PinDirection, PinId};
pub use timing_graph::TimingGraph;
pub use vertex::{LEVEL_UNSET, RfApTable, Vertex, VertexId};
