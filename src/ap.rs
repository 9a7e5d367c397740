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

//! Analysis points: the dense (corner, min/max) index that every delay
//! and slew value in the graph is parameterized by.

use crate::minmax::MinMax;
use serde::{Deserialize, Serialize};

/// Dense index of an analysis point within the engine's fixed AP set.
/// Array slots in the graph are sized `ap_count * RiseFall::COUNT`;
/// this index (not a `(corner, MinMax)` pair) is what indexes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnalysisPointId(pub usize);

/// One delay-calculation analysis point: a named corner plus the
/// min/max polarity constraints and checks should use in it.
#[derive(Debug, Clone)]
pub struct AnalysisPoint {
    pub id: AnalysisPointId,
    pub corner: String,
    /// Min/max used for path delay merging (the "constraint" min/max).
    pub delay_min_max: MinMax,
    /// Min/max used for timing-check clock slew selection; independent
    /// of `delay_min_max` because e.g. a max-delay check still wants
    /// the fastest plausible clock slew.
    pub check_clk_slew_min_max: MinMax,
}

impl AnalysisPoint {
    pub fn new(id: AnalysisPointId, corner: impl Into<String>, delay_min_max: MinMax, check_clk_slew_min_max: MinMax) -> Self {
        Self {
            id,
            corner: corner.into(),
            delay_min_max,
            check_clk_slew_min_max,
        }
    }
}

/// The fixed set of analysis points the engine carries for one run.
/// Built once by the caller (typically from a corner list and a
/// min/max selection) and shared read-only across the graph.
#[derive(Debug, Clone, Default)]
pub struct AnalysisPointSet {
    points: Vec<AnalysisPoint>,
}

impl AnalysisPointSet {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn push(&mut self, corner: impl Into<String>, delay_min_max: MinMax, check_clk_slew_min_max: MinMax) -> AnalysisPointId {
        let id = AnalysisPointId(self.points.len());
        self.points.push(AnalysisPoint::new(id, corner, delay_min_max, check_clk_slew_min_max));
        id
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, id: AnalysisPointId) -> &AnalysisPoint {
        &self.points[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnalysisPoint> {
        self.points.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = AnalysisPointId> + '_ {
        (0..self.points.len()).map(AnalysisPointId)
    }
}

/// Flat index into a `slots[ap_count * RiseFall::COUNT]` array: the
/// layout every per-vertex/per-edge annotation table uses so lookups
/// never touch a hash map on the traversal hot path.
#[inline]
pub fn slot_index(ap: AnalysisPointId, rf_index: usize, rf_count: usize) -> usize {
    ap.0 * rf_count + rf_index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minmax::RiseFall;

    #[test]
    fn slot_index_is_dense_and_contiguous() {
        let mut seen = std::collections::HashSet::new();
        let rf_count = RiseFall::COUNT;
        for ap in 0..4 {
            for rf in 0..rf_count {
                let idx = slot_index(AnalysisPointId(ap), rf, rf_count);
                assert!(seen.insert(idx), "duplicate slot index {idx}");
            }
        }
        assert_eq!(seen.len(), 4 * rf_count);
    }

    #[test]
    fn push_assigns_sequential_ids() {
        let mut set = AnalysisPointSet::new();
        let a = set.push("fast", MinMax::Min, MinMax::Max);
        let b = set.push("slow", MinMax::Max, MinMax::Min);
        assert_eq!(a, AnalysisPointId(0));
        assert_eq!(b, AnalysisPointId(1));
        assert_eq!(set.len(), 2);
    }
}
