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

//! Timing arc sets: library-defined groups of rise/fall transitions
//! between two cell ports, each carrying a role and a gate model.

use crate::minmax::RiseFall;
use crate::model::{CcsArcWaveforms, Table2D};

/// The functional role of a timing arc (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingRole {
    Combinational,
    TristateEnable,
    TristateDisable,
    RegClkToQ,
    LatchDToQ,
    Setup,
    Hold,
    Recovery,
    Removal,
    Skew,
    Width,
    Period,
}

impl TimingRole {
    pub fn is_check(self) -> bool {
        matches!(
            self,
            TimingRole::Setup | TimingRole::Hold | TimingRole::Recovery | TimingRole::Removal | TimingRole::Skew | TimingRole::Width | TimingRole::Period
        )
    }

    /// True for the arcs the §4.2 "input slew selection for register
    /// clk->Q arcs" rule applies to (and, analogously, check-clock
    /// arcs).
    pub fn wants_ideal_clock_slew(self) -> bool {
        matches!(self, TimingRole::RegClkToQ) || self.is_check()
    }
}

/// Per-(rise/fall-pair) gate model backing one timing arc.
#[derive(Debug, Clone)]
pub enum GateModel {
    /// NLDM 2-D (in-slew, load-cap) tables for delay and slew.
    Nldm { delay: Table2D, slew: Table2D },
    /// CCS current-source waveforms for the transient calculators.
    /// Falls back to the paired NLDM table when a calculator needs one
    /// and none is characterized (§7 kind 1: missing model data).
    Ccs { waveforms: CcsArcWaveforms, nldm_fallback: Option<(Table2D, Table2D)> },
    /// A fixed scalar delay (used by timing-check arcs, which have no
    /// load-dependent gate response).
    Scalar(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimingArcId(pub usize);

/// One rise/fall(from) -> rise/fall(to) transition within a
/// `TimingArcSet`.
#[derive(Debug, Clone)]
pub struct TimingArc {
    pub id: TimingArcId,
    pub from_rf: RiseFall,
    pub to_rf: RiseFall,
    pub role: TimingRole,
    pub model: GateModel,
}

impl TimingArc {
    pub fn new(id: TimingArcId, from_rf: RiseFall, to_rf: RiseFall, role: TimingRole, model: GateModel) -> Self {
        Self { id, from_rf, to_rf, role, model }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimingArcSetId(pub usize);

/// A library-defined group of timing arcs between two cell ports.
#[derive(Debug, Clone)]
pub struct TimingArcSet {
    pub id: TimingArcSetId,
    pub name: String,
    pub arcs: Vec<TimingArc>,
}

impl TimingArcSet {
    pub fn new(id: TimingArcSetId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), arcs: Vec::new() }
    }

    pub fn push(&mut self, from_rf: RiseFall, to_rf: RiseFall, role: TimingRole, model: GateModel) -> TimingArcId {
        let arc_id = TimingArcId(self.arcs.len());
        self.arcs.push(TimingArc::new(arc_id, from_rf, to_rf, role, model));
        arc_id
    }

    pub fn arcs_to(&self, to_rf: RiseFall) -> impl Iterator<Item = &TimingArc> {
        self.arcs.iter().filter(move |a| a.to_rf == to_rf)
    }
}
