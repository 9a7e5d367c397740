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

//! Engine configuration (§6 "Core configuration surface"), validated
//! once at construction time (§7 kind 4: configuration errors surface
//! to the caller rather than being recovered internally).

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Settable by the caller before building an `Engine` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// One of the names `calc::make_calculator` recognizes.
    pub calculator: String,
    /// §4.2 "Incremental change detection": relative tolerance, ∈ [0, 1).
    pub incremental_delay_tolerance: f64,
    /// Worker thread count for the level-synchronous scheduler; `None`
    /// defaults to `num_cpus::get()` (§4.1 "Implementation note").
    pub worker_threads: Option<usize>,
    /// PRIMA reduction order q, used only when `calculator == "prima"`.
    pub prima_reduction_order: usize,
    /// Parasitic-reader knobs (§6 "For parasitic reader").
    pub coupling_cap_multiplier: f64,
    pub keep_coupling_caps: bool,
    pub pin_cap_included_in_wire_cap: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            calculator: "lumped-cap".to_string(),
            incremental_delay_tolerance: 0.0,
            worker_threads: None,
            prima_reduction_order: 4,
            coupling_cap_multiplier: 1.0,
            keep_coupling_caps: true,
            pin_cap_included_in_wire_cap: false,
        }
    }
}

impl EngineConfig {
    /// Validates this configuration and resolves the worker thread
    /// count, returning the concrete thread count to use (§7 kind 4).
    pub fn validate(&self) -> Result<usize, EngineError> {
        if !(0.0..1.0).contains(&self.incremental_delay_tolerance) {
            return Err(EngineError::InvalidTolerance(self.incremental_delay_tolerance));
        }
        if self.prima_reduction_order < 1 {
            return Err(EngineError::InvalidReductionOrder(self.prima_reduction_order));
        }
        let threads = match self.worker_threads {
            Some(0) => return Err(EngineError::InvalidWorkerCount),
            Some(n) => n,
            None => num_cpus::get().max(1),
        };
        // make_calculator validates the name itself; we build eagerly so
        // an unknown name is caught here rather than at first dispatch.
        crate::calc::make_calculator(&self.calculator, self.prima_reduction_order, self.effective_coupling_cap_multiplier())?;
        Ok(threads)
    }

    /// §6 "keep coupling caps": the multiplier transient calculators
    /// apply to coupling capacitances when building their G/C matrices,
    /// collapsed to `0.0` when the caller wants coupling caps dropped
    /// entirely rather than scaled.
    pub fn effective_coupling_cap_multiplier(&self) -> f64 {
        if self.keep_coupling_caps { self.coupling_cap_multiplier } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn tolerance_out_of_range_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.incremental_delay_tolerance = 1.0;
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidTolerance(_))));
    }

    #[test]
    fn zero_worker_threads_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.worker_threads = Some(0);
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidWorkerCount)));
    }

    #[test]
    fn unknown_calculator_name_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.calculator = "not-a-real-calculator".to_string();
        assert!(matches!(cfg.validate(), Err(EngineError::UnknownCalculator(_))));
    }

    #[test]
    fn zero_reduction_order_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.prima_reduction_order = 0;
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidReductionOrder(_))));
    }
}
