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

//! Unit delay calculator: every arc contributes a fixed delay and
//! slew, ignoring load and parasitics entirely. Used for quick
//! sanity-check runs and as a calculator-failure backstop's backstop.

use crate::calc::{ArcDelayCalc, GateDelayResult, LoadArg, LoadDelayResult, ParasiticHandle};
use crate::error::DcalcError;
use crate::graph::arc::GateModel;
use crate::minmax::RiseFall;

#[derive(Debug, Clone)]
pub struct UnitDelayCalc {
    pub unit_delay: f64,
    pub unit_slew: f64,
}

impl UnitDelayCalc {
    pub fn new() -> Self {
        Self { unit_delay: 1.0e-10, unit_slew: 1.0e-10 }
    }
}

impl Default for UnitDelayCalc {
    fn default() -> Self {
        Self::new()
    }
}

impl ArcDelayCalc for UnitDelayCalc {
    fn name(&self) -> &'static str {
        "unit"
    }

    fn gate_delay(&mut self, _model: &GateModel, _rf: RiseFall, _in_slew: f64, _load_cap: f64, _parasitic: ParasiticHandle<'_>, loads: &[LoadArg]) -> Result<GateDelayResult, DcalcError> {
        Ok(GateDelayResult {
            gate_delay: self.unit_delay,
            drvr_slew: self.unit_slew,
            loads: loads
                .iter()
                .map(|l| LoadDelayResult { pin: l.pin, wire_delay: 0.0, slew: self.unit_slew })
                .collect(),
        })
    }

    fn clone_calc(&self) -> Box<dyn ArcDelayCalc> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_delay_ignores_load_and_slew_inputs() {
        let mut calc = UnitDelayCalc::new();
        let model = GateModel::Scalar(0.0);
        let loads = [LoadArg { pin: crate::graph::pin::PinId(0), cap: 5.0, threshold_scale: 1.0 }];
        let r1 = calc.gate_delay(&model, RiseFall::Rise, 1.0, 0.01, ParasiticHandle::None, &loads).unwrap();
        let r2 = calc.gate_delay(&model, RiseFall::Rise, 1000.0, 99.0, ParasiticHandle::None, &loads).unwrap();
        assert_eq!(r1.gate_delay, r2.gate_delay);
        assert_eq!(r1.drvr_slew, r2.drvr_slew);
    }
}
