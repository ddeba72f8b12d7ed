//! Transfer sequencing engine.
//!
//! Executes an ordered plan of transfer steps, checkpoints, and homing moves
//! against the actuation layer: acquiring tips from the pool, resolving
//! wells, inserting settle delays and blow-outs between liquid-contact
//! operations, and running the agitation routines a step requests.
//!
//! The engine is strictly sequential and single-threaded; there is one
//! physical actuator and no concurrency anywhere. The first primitive
//! failure aborts the whole run. There is no partial-step retry, because a
//! half-completed aspirate or dispense cannot be safely resumed; recovery is
//! the operator restarting from a known-clean physical state.

mod report;
mod step;

pub use report::RunReport;
pub use step::{Clearances, FlowRates, TransferStep, WellRef};

use crate::actuator::Actuator;
use crate::checkpoint::{Checkpoint, CheckpointController};
use crate::error::Result;
use crate::geometry::{Anchor, Labware, Well};
use crate::mix::edge_mix;
use crate::pool::{TipHandle, TipPool};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One item of an executable plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanItem {
    Transfer(TransferStep),
    Checkpoint(Checkpoint),
    Home,
}

/// Executes plans against one actuator, one tip pool, and one fixed set of
/// loaded containers.
pub struct Sequencer<A: Actuator> {
    labware: Vec<Labware>,
    pool: TipPool,
    actuator: A,
    checkpoints: CheckpointController,
    held_tip: Option<TipHandle>,
    tips_consumed: usize,
}

impl<A: Actuator> Sequencer<A> {
    pub fn new(labware: Vec<Labware>, pool: TipPool, actuator: A) -> Self {
        Self {
            labware,
            pool,
            actuator,
            checkpoints: CheckpointController::new(),
            held_tip: None,
            tips_consumed: 0,
        }
    }

    pub fn labware(&self) -> &[Labware] {
        &self.labware
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn into_actuator(self) -> A {
        self.actuator
    }

    /// Runs a whole plan. Every transfer step is validated before the first
    /// primitive call is issued, so configuration errors can never reach the
    /// instrument.
    pub fn run(&mut self, plan: &[PlanItem]) -> Result<RunReport> {
        for (index, item) in plan.iter().enumerate() {
            if let PlanItem::Transfer(step) = item {
                step.validate(&self.labware)
                    .map_err(|e| e.in_step(index, self.step_container(step)))?;
            }
        }

        let started_at = Utc::now();
        info!(items = plan.len(), "starting run");
        let mut steps_executed = 0;

        for (index, item) in plan.iter().enumerate() {
            match item {
                PlanItem::Transfer(step) => {
                    let keep_tip_after = matches!(
                        plan.get(index + 1),
                        Some(PlanItem::Transfer(next)) if next.shared_tip
                    );
                    debug!(step = index, volume = step.volume, "executing transfer");
                    self.execute_transfer(step, keep_tip_after)
                        .map_err(|e| e.in_step(index, self.step_container(step)))?;
                    steps_executed += 1;
                }
                PlanItem::Checkpoint(checkpoint) => {
                    self.checkpoints
                        .issue(&mut self.actuator, &mut self.pool, checkpoint)
                        .map_err(|e| e.in_step(index, checkpoint.id.clone()))?;
                }
                PlanItem::Home => {
                    self.actuator
                        .home()
                        .map_err(|e| e.in_step(index, "home"))?;
                }
            }
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            steps_executed,
            tips_consumed: self.tips_consumed,
            checkpoints: self.checkpoints.issued().to_vec(),
        };
        info!(
            steps = report.steps_executed,
            tips = report.tips_consumed,
            "run complete"
        );
        Ok(report)
    }

    fn step_container(&self, step: &TransferStep) -> String {
        self.labware
            .get(step.source.labware)
            .map(|l| l.label().to_string())
            .unwrap_or_else(|| format!("container#{}", step.source.labware))
    }

    fn well(&self, wref: WellRef) -> Result<Well> {
        self.labware[wref.labware].well(wref.address).cloned()
    }

    fn acquire_tip(&mut self, step: &TransferStep) -> Result<()> {
        if step.shared_tip && self.held_tip.is_some() {
            return Ok(());
        }
        // A held tip with a non-sharing step means the previous step chose to
        // retain it in error; discard before picking up fresh.
        if let Some(stale) = self.held_tip.take() {
            self.actuator.drop_tip()?;
            self.pool.release(stale);
        }
        let handle = self.pool.allocate()?;
        self.actuator.pick_up_tip(handle.rack_id(), handle.address())?;
        self.held_tip = Some(handle);
        self.tips_consumed += 1;
        Ok(())
    }

    fn execute_transfer(&mut self, step: &TransferStep, keep_tip_after: bool) -> Result<()> {
        self.acquire_tip(step)?;

        let source = self.well(step.source)?;
        let aspirate_at =
            source.position(Anchor::Bottom, 0.0, 0.0, step.clearance.aspirate_mm);

        if let Some(mix) = &step.pre_mix {
            self.actuator.mix(mix.count, mix.volume, aspirate_at, mix.rate)?;
            self.actuator.delay(step.settle)?;
            self.actuator.blow_out(source.top())?;
        }
        if let Some(spec) = &step.edge_mix {
            edge_mix(&mut self.actuator, &source, spec)?;
            self.actuator.delay(step.settle)?;
            self.actuator.blow_out(source.top())?;
        }

        if let Some(gap) = step.pre_air_gap {
            self.actuator.aspirate(gap, source.top(), step.flow.aspirate)?;
        }
        self.actuator
            .aspirate(step.volume, aspirate_at, step.flow.aspirate)?;
        self.actuator.delay(step.settle)?;

        // With no destination the step cycles back into the source well.
        let target = match step.dest {
            Some(dest) => self.well(dest)?,
            None => source,
        };
        let dispense_at =
            target.position(Anchor::Bottom, 0.0, 0.0, step.clearance.dispense_mm);
        self.actuator
            .dispense(step.dispense_volume(), dispense_at, step.flow.dispense)?;
        self.actuator.delay(step.settle)?;
        self.actuator.blow_out(target.top())?;

        if let Some(mix) = &step.post_mix {
            self.actuator.mix(mix.count, mix.volume, dispense_at, mix.rate)?;
            self.actuator.delay(step.settle)?;
            self.actuator.blow_out(target.top())?;
        }

        if !keep_tip_after {
            self.actuator.drop_tip()?;
            if let Some(handle) = self.held_tip.take() {
                self.pool.release(handle);
            }
        }
        Ok(())
    }
}
