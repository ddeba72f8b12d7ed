//! Plate-seeding workflow: reverse-pipetting three 220 ul dispenses per well
//! group on one shared tip, the way a multi-channel head seeds a 24-well
//! plate from a trough.

use decant::actuator::{ActuatorCall, SimulatedActuator};
use decant::{LabwareCatalog, PlanDoc, Sequencer};

const SEED_PLAN: &str = r#"
labware:
  - { name: trough, type: axygen_12_reservoir_22ml, slot: "8" }
  - { name: plate24_1, type: nunc_24_plate, slot: "1" }
tip_racks:
  - rack: tip300_1
    pattern: { rows: [A, C, E, G] }
items:
  - transfer:
      source: { labware: trough, well: A12 }
      dest: { labware: plate24_1, well: A1 }
      volume: 210.0
      pre_air_gap: 20.0
      dispense_excess: 10.0
  - transfer:
      source: { labware: trough, well: A12 }
      dest: { labware: plate24_1, well: A1 }
      volume: 210.0
      pre_air_gap: 20.0
      dispense_excess: 10.0
      shared_tip: true
  - transfer:
      source: { labware: trough, well: A12 }
      dest: { labware: plate24_1, well: A1 }
      volume: 210.0
      pre_air_gap: 20.0
      dispense_excess: 10.0
      shared_tip: true
"#;

#[test]
fn test_seed_chain_shares_one_tip() {
    let doc = PlanDoc::from_yaml(SEED_PLAN).unwrap();
    let built = doc.build(&LabwareCatalog::builtin()).unwrap();
    let mut seq = Sequencer::new(built.labware, built.pool, SimulatedActuator::new());
    let report = seq.run(&built.items).unwrap();

    assert_eq!(report.steps_executed, 3);
    assert_eq!(report.tips_consumed, 1);
    let names = seq.actuator().call_names();
    assert_eq!(names.iter().filter(|n| **n == "pick_up_tip").count(), 1);
    assert_eq!(names.iter().filter(|n| **n == "drop_tip").count(), 1);
    assert_eq!(names.last(), Some(&"drop_tip"));
}

#[test]
fn test_seed_reverse_pipetting_volumes() {
    let doc = PlanDoc::from_yaml(SEED_PLAN).unwrap();
    let built = doc.build(&LabwareCatalog::builtin()).unwrap();
    let mut seq = Sequencer::new(built.labware, built.pool, SimulatedActuator::new());
    seq.run(&built.items).unwrap();

    let volumes: Vec<f64> = seq
        .actuator()
        .calls()
        .iter()
        .filter_map(|c| match c {
            ActuatorCall::Aspirate { volume, .. } => Some(*volume),
            ActuatorCall::Dispense { volume, .. } => Some(*volume),
            _ => None,
        })
        .collect();
    // Per step: 20 ul air gap, 210 ul liquid, 220 ul dispensed.
    assert_eq!(
        volumes,
        vec![20.0, 210.0, 220.0, 20.0, 210.0, 220.0, 20.0, 210.0, 220.0]
    );
}

#[test]
fn test_seed_blow_out_at_destination_top() {
    let doc = PlanDoc::from_yaml(SEED_PLAN).unwrap();
    let dest_top = {
        let built = doc.build(&LabwareCatalog::builtin()).unwrap();
        built.labware[1].well("A1".parse().unwrap()).unwrap().top()
    };

    let built = doc.build(&LabwareCatalog::builtin()).unwrap();
    let mut seq = Sequencer::new(built.labware, built.pool, SimulatedActuator::new());
    seq.run(&built.items).unwrap();

    let blow_outs: Vec<_> = seq
        .actuator()
        .calls()
        .iter()
        .filter_map(|c| match c {
            ActuatorCall::BlowOut { location } => Some(*location),
            _ => None,
        })
        .collect();
    assert_eq!(blow_outs.len(), 3);
    for loc in blow_outs {
        assert_eq!(loc, dest_top);
    }
}
