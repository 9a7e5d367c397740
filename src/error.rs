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

//! Typed error hierarchy, one enum per subsystem rather than a single
//! flat error type, following §7's split between locally-recovered
//! calculator failures and caller-propagated structural/config errors.

use thiserror::Error;

/// Errors from a single calculator invocation (§7 kinds 1-2). These are
/// caught and recovered by the dispatcher; they never reach the caller
/// directly.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DcalcError {
    #[error("missing model data for arc: {0}")]
    MissingModelData(String),

    #[error("numerical failure: {0}")]
    NumericalFailure(String),
}

impl DcalcError {
    pub fn missing(reason: impl Into<String>) -> Self {
        DcalcError::MissingModelData(reason.into())
    }

    pub fn numerical(reason: impl Into<String>) -> Self {
        DcalcError::NumericalFailure(reason.into())
    }
}

/// Structural problems in the timing graph itself (§7 kind 3). These
/// abort the current pass.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("multi-driver net {0:?} has no loads")]
    MultiDriverNetHasNoLoads(crate::graph::net::NetId),

    #[error("hierarchical pin not found: {0}")]
    HierarchicalPinNotFound(String),

    #[error("vertex {0:?} not found")]
    VertexNotFound(crate::graph::vertex::VertexId),

    #[error("cycle detected outside the recognized D->Q feedback set")]
    UnexpectedCycle,
}

/// Configuration problems surfaced at engine construction time (§7 kind 4).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("unknown calculator: {0}")]
    UnknownCalculator(String),

    #[error("invalid incremental delay tolerance {0}: must be in [0, 1)")]
    InvalidTolerance(f64),

    #[error("worker thread count must be >= 1")]
    InvalidWorkerCount,

    #[error("invalid PRIMA reduction order {0}: must be >= 1")]
    InvalidReductionOrder(usize),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dcalc_error_constructors_format_reason() {
        let e = DcalcError::missing("no CCS waveform for arc A1->Z");
        assert_eq!(e.to_string(), "missing model data for arc: no CCS waveform for arc A1->Z");
    }

    #[test]
    fn engine_error_wraps_graph_error() {
        let g = GraphError::UnexpectedCycle;
        let e: EngineError = g.clone().into();
        assert!(matches!(e, EngineError::Graph(ref inner) if *inner == g));
    }
}
