//! Recording actuator for tests and dry runs.

use super::Actuator;
use crate::error::{ProtocolError, Result};
use crate::geometry::{Point, WellAddress};
use std::time::Duration;

/// One recorded primitive call.
#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    PickUpTip {
        rack_id: String,
        address: WellAddress,
    },
    DropTip,
    Aspirate {
        volume: f64,
        location: Point,
        rate: f64,
    },
    Dispense {
        volume: f64,
        location: Point,
        rate: f64,
    },
    BlowOut {
        location: Point,
    },
    MoveTo {
        location: Point,
    },
    Mix {
        count: u32,
        volume: f64,
        location: Point,
        rate: f64,
    },
    Delay {
        duration: Duration,
    },
    Pause {
        instructions: String,
    },
    Home,
}

impl ActuatorCall {
    /// Short primitive name, convenient for order assertions.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PickUpTip { .. } => "pick_up_tip",
            Self::DropTip => "drop_tip",
            Self::Aspirate { .. } => "aspirate",
            Self::Dispense { .. } => "dispense",
            Self::BlowOut { .. } => "blow_out",
            Self::MoveTo { .. } => "move_to",
            Self::Mix { .. } => "mix",
            Self::Delay { .. } => "delay",
            Self::Pause { .. } => "pause",
            Self::Home => "home",
        }
    }
}

/// Actuator that records every call instead of moving hardware.
///
/// Settle delays return immediately and pauses auto-acknowledge, so a whole
/// plan can be traced in a unit test. A scripted fault can be injected at a
/// given call ordinal to exercise the abort path.
#[derive(Debug, Default)]
pub struct SimulatedActuator {
    calls: Vec<ActuatorCall>,
    fail_at: Option<usize>,
}

impl SimulatedActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the call with ordinal `n` (zero-based) with an actuation fault.
    pub fn fail_at(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self
    }

    pub fn calls(&self) -> &[ActuatorCall] {
        &self.calls
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.iter().map(ActuatorCall::name).collect()
    }

    /// Number of aspirate plus dispense calls recorded.
    pub fn liquid_contact_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    ActuatorCall::Aspirate { .. } | ActuatorCall::Dispense { .. }
                )
            })
            .count()
    }

    /// Instruction texts of all recorded pauses, in order.
    pub fn pause_texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::Pause { instructions } => Some(instructions.as_str()),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, call: ActuatorCall) -> Result<()> {
        if self.fail_at == Some(self.calls.len()) {
            return Err(ProtocolError::fault(
                call.name(),
                "injected fault in simulated actuator",
            ));
        }
        self.calls.push(call);
        Ok(())
    }
}

impl Actuator for SimulatedActuator {
    fn pick_up_tip(&mut self, rack_id: &str, address: WellAddress) -> Result<()> {
        self.record(ActuatorCall::PickUpTip {
            rack_id: rack_id.to_string(),
            address,
        })
    }

    fn drop_tip(&mut self) -> Result<()> {
        self.record(ActuatorCall::DropTip)
    }

    fn aspirate(&mut self, volume: f64, location: Point, rate: f64) -> Result<()> {
        self.record(ActuatorCall::Aspirate {
            volume,
            location,
            rate,
        })
    }

    fn dispense(&mut self, volume: f64, location: Point, rate: f64) -> Result<()> {
        self.record(ActuatorCall::Dispense {
            volume,
            location,
            rate,
        })
    }

    fn blow_out(&mut self, location: Point) -> Result<()> {
        self.record(ActuatorCall::BlowOut { location })
    }

    fn move_to(&mut self, location: Point) -> Result<()> {
        self.record(ActuatorCall::MoveTo { location })
    }

    fn mix(&mut self, count: u32, volume: f64, location: Point, rate: f64) -> Result<()> {
        self.record(ActuatorCall::Mix {
            count,
            volume,
            location,
            rate,
        })
    }

    fn delay(&mut self, duration: Duration) -> Result<()> {
        self.record(ActuatorCall::Delay { duration })
    }

    fn pause(&mut self, instructions: &str) -> Result<()> {
        self.record(ActuatorCall::Pause {
            instructions: instructions.to_string(),
        })
    }

    fn home(&mut self) -> Result<()> {
        self.record(ActuatorCall::Home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls_in_order() {
        let mut sim = SimulatedActuator::new();
        sim.home().unwrap();
        sim.aspirate(30.0, Point::new(0.0, 0.0, 1.0), 1.0).unwrap();
        sim.dispense(30.0, Point::new(1.0, 0.0, 1.0), 1.0).unwrap();
        assert_eq!(sim.call_names(), vec!["home", "aspirate", "dispense"]);
        assert_eq!(sim.liquid_contact_count(), 2);
    }

    #[test]
    fn test_injected_fault_stops_recording() {
        let mut sim = SimulatedActuator::new().fail_at(1);
        sim.home().unwrap();
        let err = sim.drop_tip().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::ActuationFault { call: "drop_tip", .. }
        ));
        assert_eq!(sim.calls().len(), 1);
    }
}
