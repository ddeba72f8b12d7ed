//! Agitation routines.
//!
//! A plain center-well mix leaves a stagnant boundary layer against the wall
//! of round-bottom and shallow wells. The edge mix sweeps the full
//! cross-section instead: it cycles the tip among four off-center points just
//! above the well floor, aspirating at one edge and dispensing at the
//! opposite edge, then finishes with a single center cycle to homogenize the
//! bulk. Dispense volume exceeds aspirate volume on every leg so the well
//! never overflows from carryover.

use crate::actuator::Actuator;
use crate::error::{ProtocolError, Result};
use crate::geometry::{Point, Well};
use crate::grid::spatial_offset;
use serde::{Deserialize, Serialize};

fn default_cycles() -> u32 {
    2
}

fn default_aspirate_volume() -> f64 {
    290.0
}

fn default_dispense_volume() -> f64 {
    300.0
}

fn default_radius_x() -> f64 {
    5.5
}

fn default_radius_y() -> f64 {
    3.75
}

fn default_z_clearance() -> f64 {
    1.5
}

fn default_aspirate_rate() -> f64 {
    2.0
}

fn default_dispense_rate() -> f64 {
    3.0
}

fn default_center_rate() -> f64 {
    1.0
}

/// Parameters for one off-center edge mix. Defaults match the shallow
/// 24-well culture plates the routine was developed on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeMixSpec {
    #[serde(default = "default_cycles")]
    pub cycles: u32,
    #[serde(default = "default_aspirate_volume")]
    pub aspirate_volume: f64,
    #[serde(default = "default_dispense_volume")]
    pub dispense_volume: f64,
    #[serde(default = "default_radius_x")]
    pub radius_x: f64,
    #[serde(default = "default_radius_y")]
    pub radius_y: f64,
    #[serde(default = "default_z_clearance")]
    pub z_clearance: f64,
    #[serde(default = "default_aspirate_rate")]
    pub aspirate_rate: f64,
    #[serde(default = "default_dispense_rate")]
    pub dispense_rate: f64,
}

impl Default for EdgeMixSpec {
    fn default() -> Self {
        Self {
            cycles: default_cycles(),
            aspirate_volume: default_aspirate_volume(),
            dispense_volume: default_dispense_volume(),
            radius_x: default_radius_x(),
            radius_y: default_radius_y(),
            z_clearance: default_z_clearance(),
            aspirate_rate: default_aspirate_rate(),
            dispense_rate: default_dispense_rate(),
        }
    }
}

impl EdgeMixSpec {
    pub fn validate(&self) -> Result<()> {
        if self.cycles == 0 {
            return Err(ProtocolError::config("edge mix must have at least 1 cycle"));
        }
        if !(self.aspirate_volume.is_finite() && self.aspirate_volume > 0.0) {
            return Err(ProtocolError::config(
                "edge mix aspirate volume must be positive",
            ));
        }
        if !self.dispense_volume.is_finite() || self.dispense_volume < self.aspirate_volume {
            return Err(ProtocolError::config(
                "edge mix dispense volume must be at least the aspirate volume",
            ));
        }
        Ok(())
    }
}

/// A plain in-place center mix, issued as a single `mix` primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterMixSpec {
    pub count: u32,
    pub volume: f64,
    #[serde(default = "default_center_rate")]
    pub rate: f64,
}

impl CenterMixSpec {
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 || !(self.volume.is_finite() && self.volume > 0.0) {
            return Err(ProtocolError::config(
                "center mix needs a positive count and volume",
            ));
        }
        Ok(())
    }
}

/// The four edge points for a well, in east/west/north/south order, displaced
/// from the bottom anchor by (+rx, 0), (-rx, 0), (0, +ry), (0, -ry) at the
/// configured z clearance.
pub fn edge_points(well: &Well, spec: &EdgeMixSpec) -> [Point; 4] {
    let z = spec.z_clearance;
    [
        spatial_offset(well, spec.radius_x, 0.0, z),
        spatial_offset(well, -spec.radius_x, 0.0, z),
        spatial_offset(well, 0.0, spec.radius_y, z),
        spatial_offset(well, 0.0, -spec.radius_y, z),
    ]
}

/// Runs one edge mix: `cycles` sweeps of four aspirate/dispense legs, then a
/// single center cycle. Leg order within a cycle is east-to-west,
/// north-to-south, west-to-east, south-to-north, so consecutive legs reverse
/// direction across the well.
///
/// Issues exactly `8 * cycles + 2` aspirate/dispense calls.
pub fn edge_mix<A: Actuator>(actuator: &mut A, well: &Well, spec: &EdgeMixSpec) -> Result<()> {
    spec.validate()?;
    let [east, west, north, south] = edge_points(well, spec);
    let legs = [(east, west), (north, south), (west, east), (south, north)];

    for _ in 0..spec.cycles {
        for (from, to) in legs {
            actuator.aspirate(spec.aspirate_volume, from, spec.aspirate_rate)?;
            actuator.dispense(spec.dispense_volume, to, spec.dispense_rate)?;
        }
    }

    let center = spatial_offset(well, 0.0, 0.0, spec.z_clearance);
    actuator.aspirate(spec.aspirate_volume, center, spec.aspirate_rate)?;
    actuator.dispense(spec.dispense_volume, center, spec.dispense_rate)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{ActuatorCall, SimulatedActuator};
    use crate::geometry::LabwareCatalog;

    fn source_well() -> crate::geometry::Well {
        LabwareCatalog::builtin()
            .load("nunc_24_pseudo_a", "1", "plate24")
            .unwrap()
            .well("A1".parse().unwrap())
            .unwrap()
            .clone()
    }

    #[test]
    fn test_edge_points_exact_displacements() {
        let well = source_well();
        let spec = EdgeMixSpec::default();
        let bottom = well.bottom();
        let [e, w, n, s] = edge_points(&well, &spec);
        assert_eq!(e, bottom.offset(5.5, 0.0, 1.5));
        assert_eq!(w, bottom.offset(-5.5, 0.0, 1.5));
        assert_eq!(n, bottom.offset(0.0, 3.75, 1.5));
        assert_eq!(s, bottom.offset(0.0, -3.75, 1.5));
    }

    #[test]
    fn test_call_count_is_eight_per_cycle_plus_center_pair() {
        for cycles in [1, 2, 5] {
            let well = source_well();
            let mut sim = SimulatedActuator::new();
            let spec = EdgeMixSpec {
                cycles,
                ..Default::default()
            };
            edge_mix(&mut sim, &well, &spec).unwrap();
            assert_eq!(sim.liquid_contact_count() as u32, 8 * cycles + 2);
        }
    }

    #[test]
    fn test_leg_order_reverses_direction() {
        let well = source_well();
        let spec = EdgeMixSpec {
            cycles: 1,
            ..Default::default()
        };
        let [e, w, n, s] = edge_points(&well, &spec);
        let mut sim = SimulatedActuator::new();
        edge_mix(&mut sim, &well, &spec).unwrap();

        let locations: Vec<Point> = sim
            .calls()
            .iter()
            .map(|c| match c {
                ActuatorCall::Aspirate { location, .. } => *location,
                ActuatorCall::Dispense { location, .. } => *location,
                other => panic!("unexpected call {other:?}"),
            })
            .collect();
        let center = well.bottom().offset(0.0, 0.0, spec.z_clearance);
        assert_eq!(locations, vec![e, w, n, s, w, e, s, n, center, center]);
    }

    #[test]
    fn test_dispense_exceeds_aspirate_on_every_leg() {
        let well = source_well();
        let mut sim = SimulatedActuator::new();
        edge_mix(&mut sim, &well, &EdgeMixSpec::default()).unwrap();
        for call in sim.calls() {
            match call {
                ActuatorCall::Aspirate { volume, .. } => assert_eq!(*volume, 290.0),
                ActuatorCall::Dispense { volume, .. } => assert_eq!(*volume, 300.0),
                other => panic!("unexpected call {other:?}"),
            }
        }
    }

    #[test]
    fn test_overflow_prone_spec_rejected() {
        let spec = EdgeMixSpec {
            aspirate_volume: 300.0,
            dispense_volume: 290.0,
            ..Default::default()
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_non_finite_volumes_rejected() {
        let spec = EdgeMixSpec {
            aspirate_volume: f64::NAN,
            ..Default::default()
        };
        assert!(spec.validate().is_err());
        let spec = EdgeMixSpec {
            dispense_volume: f64::NAN,
            ..Default::default()
        };
        assert!(spec.validate().is_err());
        let center = CenterMixSpec {
            count: 2,
            volume: f64::NAN,
            rate: 1.0,
        };
        assert!(center.validate().is_err());
    }
}
