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

//! Library-supplied gate models: the NLDM delay/slew tables and CCS
//! current waveforms a timing arc carries. Shared between the graph
//! (which stores a model per arc) and the calculators (which read it).

pub mod ccs_waveform;
pub mod nldm_table;

pub use ccs_waveform::CcsArcWaveforms;
pub use nldm_table::Table2D;
