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

//! Delay calculators: pluggable per-arc delay/slew engines selected by
//! name (§4.3-§4.6, §9 "calculator variants"). Every calculator
//! implements `ArcDelayCalc`; the dispatcher (`crate::dispatch`) drives
//! them and falls back to `lumped_cap` on calculator failure (§4.2
//! "Failure policy").

pub mod arnoldi;
pub mod ccs_sim;
pub mod effective_cap;
pub mod linalg;
pub mod lumped_cap;
pub mod prima;
pub mod root_finder;
pub mod unit;

use crate::error::DcalcError;
use crate::graph::arc::GateModel;
use crate::graph::pin::PinId;
use crate::minmax::RiseFall;
use crate::parasitics::{ParasiticNetwork, ReducedParasitic};

pub use arnoldi::ArnoldiDelayCalc;
pub use ccs_sim::CcsSimDelayCalc;
pub use effective_cap::{EffectiveCapDelayCalc, WireModel};
pub use lumped_cap::LumpedCapDelayCalc;
pub use prima::PrimaDelayCalc;
pub use unit::UnitDelayCalc;

/// The parasitic form handed to a calculator for one driver/rf/ap,
/// mirroring §3's three parasitic forms. Calculators that need a form
/// their handle doesn't hold ask the engine to reduce first (§4.8).
pub enum ParasiticHandle<'a> {
    None,
    Reduced(&'a ReducedParasitic),
    Network(&'a ParasiticNetwork),
}

impl<'a> ParasiticHandle<'a> {
    pub fn as_reduced(&self) -> Option<&'a ReducedParasitic> {
        match self {
            ParasiticHandle::Reduced(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_network(&self) -> Option<&'a ParasiticNetwork> {
        match self {
            ParasiticHandle::Network(n) => Some(n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoadArg {
    pub pin: PinId,
    pub cap: f64,
    /// Ratio of the load library's logic/slew thresholds to the
    /// driver's; 1.0 when they match (§4.3 "Threshold adjustment").
    pub threshold_scale: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct LoadDelayResult {
    pub pin: PinId,
    pub wire_delay: f64,
    pub slew: f64,
}

#[derive(Debug, Clone)]
pub struct GateDelayResult {
    pub gate_delay: f64,
    pub drvr_slew: f64,
    pub loads: Vec<LoadDelayResult>,
}

/// One calculator's view of a single driver/arc/rf/ap invocation,
/// batched by the dispatcher for parallel-driver multi-driver nets
/// (§4.2 step 2, §4.7).
pub struct GateDelayRequest<'a> {
    pub model: &'a GateModel,
    pub rf: RiseFall,
    pub in_slew: f64,
    pub load_cap: f64,
    pub parasitic: ParasiticHandle<'a>,
    pub loads: &'a [LoadArg],
}

/// A pluggable delay/slew engine for one cell timing arc (§4.3-§4.6).
/// Object-safe so the dispatcher can hold `Box<dyn ArcDelayCalc>` and
/// select by configured name (§9 "calculator variants").
pub trait ArcDelayCalc: Send {
    fn name(&self) -> &'static str;

    /// Whether this calculator can consume a full `ParasiticNetwork`
    /// directly, or needs the engine to reduce it first (§4.8).
    fn reduce_supported(&self) -> bool {
        false
    }

    fn gate_delay(&mut self, model: &GateModel, rf: RiseFall, in_slew: f64, load_cap: f64, parasitic: ParasiticHandle<'_>, loads: &[LoadArg]) -> Result<GateDelayResult, DcalcError>;

    /// Batch form for parallel multi-driver nets (§4.2 step 2, §4.7);
    /// the default sequentially dispatches each request.
    fn gate_delays(&mut self, requests: &[GateDelayRequest<'_>]) -> Result<Vec<GateDelayResult>, DcalcError> {
        requests.iter().map(|r| self.gate_delay(r.model, r.rf, r.in_slew, r.load_cap, ParasiticHandle::clone_of(&r.parasitic), r.loads)).collect()
    }

    /// Releases per-pin scratch state (e.g. a self-reduced parasitic
    /// cached for the duration of one driver pin's dispatch), §4.2 step 7.
    fn finish_driver_pin(&mut self) {}

    /// Per-worker-thread clone, taken once per level by the scheduler
    /// (§5 "Per-thread calculator state").
    fn clone_calc(&self) -> Box<dyn ArcDelayCalc>;
}

impl<'a> ParasiticHandle<'a> {
    fn clone_of(h: &ParasiticHandle<'a>) -> ParasiticHandle<'a> {
        match h {
            ParasiticHandle::None => ParasiticHandle::None,
            ParasiticHandle::Reduced(r) => ParasiticHandle::Reduced(r),
            ParasiticHandle::Network(n) => ParasiticHandle::Network(n),
        }
    }
}

/// Builds the named calculator, threading through the two knobs that
/// vary per-caller rather than per-calculator-kind: the PRIMA reduction
/// order (only `"prima"` honors it; `"arnoldi"` always reduces to a
/// fixed low order) and the coupling-cap multiplier every transient
/// calculator applies when it builds its own G/C matrices from a raw
/// parasitic network (§6 "Selected calculator name"). Returns a
/// configuration error for an unrecognized name (§7 kind 4).
pub fn make_calculator(name: &str, prima_reduction_order: usize, coupling_cap_multiplier: f64) -> Result<Box<dyn ArcDelayCalc>, crate::error::EngineError> {
    match name {
        "unit" => Ok(Box::new(UnitDelayCalc::new())),
        "lumped-cap" => Ok(Box::new(LumpedCapDelayCalc::new())),
        "pi-elmore" => Ok(Box::new(EffectiveCapDelayCalc::new(WireModel::Elmore))),
        "pi-two-pole" => Ok(Box::new(EffectiveCapDelayCalc::new(WireModel::TwoPole))),
        "ccs" => Ok(Box::new(CcsSimDelayCalc::new().with_coupling_cap_multiplier(coupling_cap_multiplier))),
        "prima" => Ok(Box::new(PrimaDelayCalc::new(prima_reduction_order).with_coupling_cap_multiplier(coupling_cap_multiplier))),
        "arnoldi" => Ok(Box::new(ArnoldiDelayCalc::new().with_coupling_cap_multiplier(coupling_cap_multiplier))),
        other => Err(crate::error::EngineError::UnknownCalculator(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_calculator_rejects_unknown_names() {
        let err = make_calculator("arnoldi-but-misspelled", 4, 1.0).unwrap_err();
        assert!(matches!(err, crate::error::EngineError::UnknownCalculator(_)));
    }

    #[test]
    fn make_calculator_builds_every_documented_name() {
        for name in ["unit", "lumped-cap", "pi-elmore", "pi-two-pole", "ccs", "prima", "arnoldi"] {
            let calc = make_calculator(name, 4, 1.0).unwrap();
            assert_eq!(calc.name(), name, "calculator self-reports a different name than it was constructed with");
        }
    }
}
