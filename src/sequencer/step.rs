//! Transfer step parameters.
//!
//! Flow rates and bottom clearances are explicit per-step values, never
//! ambient instrument state. Every step carries its full pipetting context,
//! so no step can leak settings into the next one.

use crate::error::{ProtocolError, Result};
use crate::geometry::{Labware, WellAddress};
use crate::mix::{CenterMixSpec, EdgeMixSpec};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_rate() -> f64 {
    1.0
}

fn default_clearance() -> f64 {
    1.0
}

fn default_settle() -> Duration {
    Duration::from_secs(1)
}

/// Flow-rate multipliers for one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowRates {
    #[serde(default = "default_rate")]
    pub aspirate: f64,
    #[serde(default = "default_rate")]
    pub dispense: f64,
}

impl Default for FlowRates {
    fn default() -> Self {
        Self {
            aspirate: 1.0,
            dispense: 1.0,
        }
    }
}

/// Heights above the well bottom for liquid contact, millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clearances {
    #[serde(default = "default_clearance")]
    pub aspirate_mm: f64,
    #[serde(default = "default_clearance")]
    pub dispense_mm: f64,
}

impl Default for Clearances {
    fn default() -> Self {
        Self {
            aspirate_mm: 1.0,
            dispense_mm: 1.0,
        }
    }
}

/// Reference to one well of one loaded container, by container index within
/// the run's labware list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellRef {
    pub labware: usize,
    pub address: WellAddress,
}

/// One immutable liquid-transfer step.
///
/// With `dest: None` the step cycles liquid in place at the source
/// (aspirate and dispense at the same well), which is how bulk
/// resuspension before a chained transfer is expressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferStep {
    pub source: WellRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<WellRef>,
    pub volume: f64,
    /// Center mix at the source before the transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_mix: Option<CenterMixSpec>,
    /// Off-center edge mix at the source before the transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_mix: Option<EdgeMixSpec>,
    /// Center mix at the destination after dispensing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_mix: Option<CenterMixSpec>,
    #[serde(default)]
    pub flow: FlowRates,
    #[serde(default)]
    pub clearance: Clearances,
    /// Settle delay after each liquid-contact operation.
    #[serde(default = "default_settle", with = "humantime_serde")]
    pub settle: Duration,
    /// Reuse the tip already held from the previous step instead of
    /// allocating a fresh one.
    #[serde(default)]
    pub shared_tip: bool,
    /// Air volume drawn at the source top before the liquid aspirate
    /// (reverse pipetting).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_air_gap: Option<f64>,
    /// Extra volume dispensed beyond `volume`, expelling the air gap with
    /// the liquid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispense_excess: Option<f64>,
}

impl TransferStep {
    pub fn new(source: WellRef, dest: Option<WellRef>, volume: f64) -> Self {
        Self {
            source,
            dest,
            volume,
            pre_mix: None,
            edge_mix: None,
            post_mix: None,
            flow: FlowRates::default(),
            clearance: Clearances::default(),
            settle: default_settle(),
            shared_tip: false,
            pre_air_gap: None,
            dispense_excess: None,
        }
    }

    /// Volume expelled at the destination.
    pub fn dispense_volume(&self) -> f64 {
        self.volume + self.dispense_excess.unwrap_or(0.0)
    }

    /// Plan-construction-time validation against the loaded labware list.
    pub fn validate(&self, labware: &[Labware]) -> Result<()> {
        if !(self.volume.is_finite() && self.volume > 0.0) {
            return Err(ProtocolError::config(format!(
                "transfer volume must be positive and finite, got {}",
                self.volume
            )));
        }
        if self.pre_air_gap.is_some_and(|v| !(v.is_finite() && v > 0.0)) {
            return Err(ProtocolError::config("air gap volume must be positive"));
        }
        if self.dispense_excess.is_some_and(|v| !(v.is_finite() && v >= 0.0)) {
            return Err(ProtocolError::config(
                "dispense excess must not be negative",
            ));
        }
        self.check_ref(self.source, labware)?;
        if let Some(dest) = self.dest {
            self.check_ref(dest, labware)?;
        }
        if let Some(mix) = &self.pre_mix {
            mix.validate()?;
        }
        if let Some(mix) = &self.edge_mix {
            mix.validate()?;
        }
        if let Some(mix) = &self.post_mix {
            mix.validate()?;
        }
        Ok(())
    }

    fn check_ref(&self, wref: WellRef, labware: &[Labware]) -> Result<()> {
        let container = labware.get(wref.labware).ok_or_else(|| {
            ProtocolError::config(format!(
                "container index {} out of range ({} loaded)",
                wref.labware,
                labware.len()
            ))
        })?;
        container.well(wref.address).map(|_| ())
    }
}
