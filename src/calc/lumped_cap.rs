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

//! Lumped-capacitance / NLDM table calculator (§4.3): the engine's
//! default and its calculator-failure fallback (§4.2 "Failure policy").

use crate::calc::{ArcDelayCalc, GateDelayResult, LoadArg, LoadDelayResult, ParasiticHandle};
use crate::error::DcalcError;
use crate::graph::arc::GateModel;
use crate::minmax::RiseFall;

#[derive(Debug, Clone, Default)]
pub struct LumpedCapDelayCalc;

impl LumpedCapDelayCalc {
    pub fn new() -> Self {
        Self
    }
}

impl ArcDelayCalc for LumpedCapDelayCalc {
    fn name(&self) -> &'static str {
        "lumped-cap"
    }

    fn gate_delay(&mut self, model: &GateModel, _rf: RiseFall, in_slew: f64, load_cap: f64, _parasitic: ParasiticHandle<'_>, loads: &[LoadArg]) -> Result<GateDelayResult, DcalcError> {
        let (delay, slew) = match model {
            GateModel::Nldm { delay, slew } => (delay.lookup(in_slew, load_cap), slew.lookup(in_slew, load_cap)),
            GateModel::Ccs { nldm_fallback: Some((delay, slew)), .. } => (delay.lookup(in_slew, load_cap), slew.lookup(in_slew, load_cap)),
            GateModel::Ccs { nldm_fallback: None, .. } => return Err(DcalcError::missing("no NLDM fallback table for CCS-only arc")),
            GateModel::Scalar(v) => (*v, in_slew),
        };

        // Wire delay is zero for a lumped total-capacitance model; load
        // slew equals driver slew, rescaled per-load when the load
        // library's thresholds differ from the driver's (§4.3).
        let loads = loads
            .iter()
            .map(|l| LoadDelayResult { pin: l.pin, wire_delay: 0.0, slew: slew * l.threshold_scale })
            .collect();

        Ok(GateDelayResult { gate_delay: delay, drvr_slew: slew, loads })
    }

    fn clone_calc(&self) -> Box<dyn ArcDelayCalc> {
        Box::new(self.clone())
    }
}
