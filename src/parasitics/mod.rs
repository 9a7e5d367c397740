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

//! Parasitic networks and their reduced forms (§3 "Parasitic", §4.8).

pub mod network;
pub mod pi_model;
pub mod reduce;

pub use network::{CouplingCap, ParasiticNetwork, ParasiticNode, ParasiticNodeId, Resistor};
pub use pi_model::{ElmoreDelay, PiModel, TwoPole};
pub use reduce::{ReducedParasitic, reduce_parasitic};

/// What the parasitics reader collaborator hands back for one (net,
/// rise/fall, ap) query (§6 "Parasitics reader" row): one of the three
/// forms named in §3, or nothing when the net carries no extracted
/// parasitic (e.g. an unrouted or ideal net).
#[derive(Debug, Clone)]
pub enum ParasiticStore {
    None,
    Network(ParasiticNetwork),
    Reduced(ReducedParasitic),
}

impl ParasiticStore {
    pub fn is_none(&self) -> bool {
        matches!(self, ParasiticStore::None)
    }

    /// Reduces a full network to π+Elmore form if the calculator needs
    /// one and the store holds a raw network (§4.8); otherwise a no-op.
    /// Returns the form the calculator should actually see.
    pub fn resolved_for(&self, reduce_supported: bool, coupling_cap_multiplier: f64) -> ResolvedParasitic<'_> {
        match self {
            ParasiticStore::None => ResolvedParasitic::None,
            ParasiticStore::Network(net) if reduce_supported => ResolvedParasitic::Network(net),
            ParasiticStore::Network(net) => ResolvedParasitic::Owned(reduce_parasitic(net, coupling_cap_multiplier)),
            ParasiticStore::Reduced(r) => ResolvedParasitic::Reduced(r),
        }
    }
}

/// Borrowed or freshly-computed parasitic form ready to become a
/// `calc::ParasiticHandle`. Kept distinct from `ParasiticStore` because
/// on-demand reduction produces an owned value the caller must keep
/// alive for the duration of one calculator invocation.
pub enum ResolvedParasitic<'a> {
    None,
    Network(&'a ParasiticNetwork),
    Reduced(&'a ReducedParasitic),
    Owned(ReducedParasitic),
}

impl<'a> ResolvedParasitic<'a> {
    pub fn as_handle(&self) -> crate::calc::ParasiticHandle<'_> {
        match self {
            ResolvedParasitic::None => crate::calc::ParasiticHandle::None,
            ResolvedParasitic::Network(n) => crate::calc::ParasiticHandle::Network(n),
            ResolvedParasitic::Reduced(r) => crate::calc::ParasiticHandle::Reduced(r),
            ResolvedParasitic::Owned(r) => crate::calc::ParasiticHandle::Reduced(r),
        }
    }
}
