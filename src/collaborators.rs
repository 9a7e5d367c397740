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

//! External collaborator interfaces (§6): the engine is a library
//! consumed by a netlist reader, a constraint front-end, and a search
//! subsystem. These traits are the seams those collaborators implement
//! against; none of their concrete implementations live in this crate.

use crate::ap::AnalysisPointId;
use crate::dispatch::netcaps::NetCaps;
use crate::graph::pin::PinId;
use crate::minmax::RiseFall;

/// Netlist query surface (§6 "Netlist reader"). Graph construction
/// itself happens outside this crate; this trait is the seam a caller
/// uses to resolve a hierarchical pin name back to a flat design pin
/// during invalidation (§4.10).
pub trait Network: Send + Sync {
    fn hierarchical_pin_by_name(&self, name: &str) -> Option<PinId>;
}

/// Constraint front-end query surface (§6 "Constraint front-end"):
/// per-pin net loading and ideal-clock/input-delay facts the
/// dispatcher consults (§4.2).
pub trait Sdc: Send + Sync {
    /// pin-cap + wire-cap + fanout + has-set-load for `pin`'s net,
    /// under `rf`/`ap` (§4.2 step 1).
    fn pin_net_caps(&self, pin: PinId, rf: RiseFall, ap: AnalysisPointId) -> NetCaps;

    /// True if `pin` is driven by an ideal (constraint-propagated)
    /// clock rather than the network (§4.2 "Input slew selection").
    fn is_ideal_clock(&self, pin: PinId) -> bool;

    /// The ideal clock's slew for `rf`/`ap`, when `is_ideal_clock` is true.
    fn ideal_clock_slew(&self, pin: PinId, rf: RiseFall, ap: AnalysisPointId) -> f64;
}

/// Cell-library query surface (§6 "Cell-library reader"). Timing arc
/// sets themselves are embedded directly in `TimingGraph` edges; this
/// trait only covers cross-referencing a cell's arc set by name during
/// a cell swap (§8 "Cell swap and swap-back").
pub trait CellLibrary: Send + Sync {
    fn arc_set_by_name(&self, cell_name: &str) -> Option<crate::graph::arc::TimingArcSetId>;
}

/// Parasitics-reader query surface (§6 "Parasitics reader"): a
/// `Parasitic` handle keyed by (net, ap). The dispatcher queries this
/// once per driver pin/ap before invoking the calculator (§4.2 step 1).
pub trait ParasiticsReader: Send + Sync {
    fn parasitic_for(&self, net: crate::graph::net::NetId, ap: AnalysisPointId) -> crate::parasitics::ParasiticStore;
}
