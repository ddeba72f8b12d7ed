//! Boundary to the physical actuation layer.
//!
//! The instrument exposes coarse blocking primitives and nothing else; all
//! sequencing intelligence lives above this trait. Implementations must be
//! strictly synchronous: each call returns only once the physical motion (or
//! operator acknowledgment, for [`Actuator::pause`]) has completed. Any error
//! is a mechanical fault and aborts the run, because the liquid state at the
//! point of failure is unknown.

pub mod sim;

pub use sim::{ActuatorCall, SimulatedActuator};

use crate::error::Result;
use crate::geometry::{Point, WellAddress};
use std::time::Duration;

/// Blocking motion and liquid primitives of the instrument.
pub trait Actuator {
    /// Picks up a disposable tip from the given rack position.
    fn pick_up_tip(&mut self, rack_id: &str, address: WellAddress) -> Result<()>;

    /// Ejects the currently held tip into the waste.
    fn drop_tip(&mut self) -> Result<()>;

    /// Draws `volume` microlitres at `location`. `rate` is a multiplier on
    /// the instrument's default flow rate.
    fn aspirate(&mut self, volume: f64, location: Point, rate: f64) -> Result<()>;

    /// Expels `volume` microlitres at `location`.
    fn dispense(&mut self, volume: f64, location: Point, rate: f64) -> Result<()>;

    /// Expels residual volume with a plunger blow-out at `location`.
    fn blow_out(&mut self, location: Point) -> Result<()>;

    fn move_to(&mut self, location: Point) -> Result<()>;

    /// In-place aspirate/dispense cycles at a single location.
    fn mix(&mut self, count: u32, volume: f64, location: Point, rate: f64) -> Result<()>;

    /// Blocks for a fixed settle duration.
    fn delay(&mut self, duration: Duration) -> Result<()>;

    /// Displays `instructions` to the operator and blocks until they resume.
    /// There is no timeout.
    fn pause(&mut self, instructions: &str) -> Result<()>;

    /// Homes the carriage.
    fn home(&mut self) -> Result<()>;
}
