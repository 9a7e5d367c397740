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

//! Observer hook (§6 "Observer hook"): an optional caller-supplied
//! callback notified as the dispatcher updates vertex timing. Calls are
//! serialized by the engine even though driver-vertex work is
//! parallel (§5 "Shared resources").

use crate::graph::vertex::VertexId;

/// Notified around a vertex's timing update. `delay_changed_from` fires
/// before the dispatcher overwrites a vertex's slew/arc-delay slots,
/// `delay_changed_to` after, and `check_delay_changed_to` after the
/// deferred end-of-BFS pass annotates a timing-check arc's delay
/// (`scheduler::deferred::run_check_arcs`).
pub trait DelayCalcObserver: Send {
    fn delay_changed_from(&mut self, vertex: VertexId);
    fn delay_changed_to(&mut self, vertex: VertexId);
    fn check_delay_changed_to(&mut self, vertex: VertexId);
}

/// No-op observer used when the caller doesn't supply one; lets the
/// dispatcher and scheduler take `&mut dyn DelayCalcObserver` unconditionally
/// instead of threading an `Option` through every call site.
#[derive(Debug, Default)]
pub struct NullObserver;

impl DelayCalcObserver for NullObserver {
    fn delay_changed_from(&mut self, _vertex: VertexId) {}
    fn delay_changed_to(&mut self, _vertex: VertexId) {}
    fn check_delay_changed_to(&mut self, _vertex: VertexId) {}
}
