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

//! Vertices: one per pin (bidirectional pins produce a load vertex and
//! a driver vertex, per §3). Holds the dense rise/fall x analysis-point
//! slew table and the traversal flags the scheduler and dispatcher
//! consult.

use crate::ap::{AnalysisPointId, AnalysisPointSet, slot_index};
use crate::graph::pin::PinId;
use crate::minmax::{MinMax, RiseFall};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub usize);

pub const LEVEL_UNSET: u32 = u32::MAX;

/// Dense (rise/fall, analysis-point) indexed table of `f64` values,
/// each with its own "has a real value been written" bit so the
/// distinction between "still at its AP init value" and "a calculator
/// computed this exact value" survives (§4.2 step 6).
///
/// Each analysis point carries its own min/max polarity (it is part of
/// the AP's identity, not a single table-wide setting), so the table
/// caches one `MinMax` per AP at construction time rather than taking
/// it as an argument on every call.
#[derive(Debug, Clone)]
pub struct RfApTable {
    values: Vec<f64>,
    annotated: Vec<bool>,
    present: Vec<bool>,
    ap_min_max: Vec<MinMax>,
    ap_count: usize,
}

impl RfApTable {
    pub fn new(ap_set: &AnalysisPointSet) -> Self {
        let ap_count = ap_set.len();
        let ap_min_max: Vec<MinMax> = ap_set.iter().map(|ap| ap.delay_min_max).collect();
        let len = ap_count * RiseFall::COUNT;
        let mut values = vec![0.0; len];
        for (ap_idx, mm) in ap_min_max.iter().enumerate() {
            for rf in 0..RiseFall::COUNT {
                values[ap_idx * RiseFall::COUNT + rf] = mm.init_value();
            }
        }
        Self {
            values,
            annotated: vec![false; len],
            present: vec![false; len],
            ap_min_max,
            ap_count,
        }
    }

    #[inline]
    fn idx(&self, rf: RiseFall, ap: AnalysisPointId) -> usize {
        slot_index(ap, rf.index(), self.ap_count)
    }

    #[inline]
    fn min_max_of(&self, ap: AnalysisPointId) -> MinMax {
        self.ap_min_max[ap.0]
    }

    pub fn get(&self, rf: RiseFall, ap: AnalysisPointId) -> f64 {
        self.values[self.idx(rf, ap)]
    }

    pub fn is_annotated(&self, rf: RiseFall, ap: AnalysisPointId) -> bool {
        self.annotated[self.idx(rf, ap)]
    }

    pub fn is_present(&self, rf: RiseFall, ap: AnalysisPointId) -> bool {
        self.present[self.idx(rf, ap)]
    }

    pub fn set_annotated(&mut self, rf: RiseFall, ap: AnalysisPointId, value: f64) {
        let i = self.idx(rf, ap);
        self.values[i] = value;
        self.annotated[i] = true;
        self.present[i] = true;
    }

    /// Merges `value` into the slot under the AP's own "worse wins"
    /// rule (§3 invariant, §4.2 step 3). No-op if the slot is
    /// annotated. Returns true if the stored value changed.
    pub fn merge(&mut self, rf: RiseFall, ap: AnalysisPointId, value: f64) -> bool {
        let min_max = self.min_max_of(ap);
        let i = self.idx(rf, ap);
        if self.annotated[i] {
            return false;
        }
        let changed = !self.present[i] || min_max.compare(value, self.values[i]);
        if changed {
            self.values[i] = value;
        }
        self.present[i] = true;
        changed
    }

    /// Resets a slot back to the AP's init value and clears its
    /// presence bit, without touching the annotated bit (§4.2 step 6:
    /// "absent direction's slew/wire delays are set to the AP's
    /// initial value").
    pub fn reset_absent(&mut self, rf: RiseFall, ap: AnalysisPointId) {
        let i = self.idx(rf, ap);
        if !self.annotated[i] {
            self.values[i] = self.min_max_of(ap).init_value();
            self.present[i] = false;
        }
    }

    pub fn clear(&mut self) {
        for (ap_idx, mm) in self.ap_min_max.iter().enumerate() {
            for rf in 0..RiseFall::COUNT {
                let i = ap_idx * RiseFall::COUNT + rf;
                self.values[i] = mm.init_value();
                self.annotated[i] = false;
                self.present[i] = false;
            }
        }
    }
}

/// One per pin (two for bidirectional pins, per §3).
#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: VertexId,
    pub pin: PinId,
    pub is_root: bool,
    pub is_driver: bool,
    pub has_checks: bool,
    pub is_check_clock: bool,
    pub is_latch_data: bool,
    pub is_bidirect_driver: bool,
    /// Ideal (constraint-propagated rather than network-propagated)
    /// clock driving this vertex, if any. Consulted by the dispatcher's
    /// clk->Q and check-clock input-slew substitution rule (§4.2).
    pub ideal_clock: bool,
    /// Levelization number excluding D->Q feedback arcs (§9); `LEVEL_UNSET`
    /// until the graph is levelized.
    pub level: u32,
    /// One slew value per (rise/fall, ap), min/max polarity supplied by
    /// the caller when constructing the graph (`TimingGraph::min_max`).
    pub slews: RfApTable,
}

impl Vertex {
    pub fn new(id: VertexId, pin: PinId, ap_set: &AnalysisPointSet) -> Self {
        Self {
            id,
            pin,
            is_root: false,
            is_driver: false,
            has_checks: false,
            is_check_clock: false,
            is_latch_data: false,
            is_bidirect_driver: false,
            ideal_clock: false,
            level: LEVEL_UNSET,
            slews: RfApTable::new(ap_set),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_ap_set() -> AnalysisPointSet {
        let mut aps = AnalysisPointSet::new();
        aps.push("fast", MinMax::Min, MinMax::Max);
        aps.push("slow", MinMax::Max, MinMax::Min);
        aps
    }

    #[test]
    fn fresh_table_holds_each_aps_own_init_value() {
        let aps = two_ap_set();
        let table = RfApTable::new(&aps);
        assert_eq!(table.get(RiseFall::Rise, AnalysisPointId(0)), crate::minmax::INF);
        assert_eq!(table.get(RiseFall::Rise, AnalysisPointId(1)), -crate::minmax::INF);
        assert!(!table.is_present(RiseFall::Rise, AnalysisPointId(0)));
    }

    #[test]
    fn merge_keeps_worse_value_and_reports_change() {
        let aps = two_ap_set();
        let mut table = RfApTable::new(&aps);
        let ap = AnalysisPointId(0); // Min: smaller is worse
        assert!(table.merge(RiseFall::Rise, ap, 5.0));
        assert_eq!(table.get(RiseFall::Rise, ap), 5.0);
        assert!(!table.merge(RiseFall::Rise, ap, 7.0), "larger value should not replace min slot");
        assert_eq!(table.get(RiseFall::Rise, ap), 5.0);
        assert!(table.merge(RiseFall::Rise, ap, 2.0));
        assert_eq!(table.get(RiseFall::Rise, ap), 2.0);
    }

    #[test]
    fn annotated_slot_rejects_merge() {
        let aps = two_ap_set();
        let mut table = RfApTable::new(&aps);
        let ap = AnalysisPointId(0);
        table.set_annotated(RiseFall::Fall, ap, 1.5);
        assert!(!table.merge(RiseFall::Fall, ap, 0.1));
        assert_eq!(table.get(RiseFall::Fall, ap), 1.5);
    }

    #[test]
    fn reset_absent_restores_init_value_unless_annotated() {
        let aps = two_ap_set();
        let mut table = RfApTable::new(&aps);
        let ap = AnalysisPointId(0);
        table.merge(RiseFall::Rise, ap, 3.0);
        table.reset_absent(RiseFall::Rise, ap);
        assert!(!table.is_present(RiseFall::Rise, ap));
        assert_eq!(table.get(RiseFall::Rise, ap), crate::minmax::INF);

        table.set_annotated(RiseFall::Fall, ap, 9.0);
        table.reset_absent(RiseFall::Fall, ap);
        assert_eq!(table.get(RiseFall::Fall, ap), 9.0);
    }
}
