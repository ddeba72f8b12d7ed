//! Operator checkpoints.
//!
//! Some interventions cannot be verified programmatically: swapping a tip
//! rack, inserting a slide, adding a reagent to the trough. A checkpoint
//! homes the carriage, displays the instruction text, and blocks until the
//! operator resumes. There is no timeout and no automatic resume; soft
//! real-time windows can only be stated in the displayed text, never
//! enforced.

use crate::actuator::Actuator;
use crate::error::Result;
use crate::pool::TipPool;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// A named pause point with operator-facing instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub instructions: String,
    /// Advisory soft window, e.g. sample quality degrades after 15 minutes.
    /// Appended to the displayed text; enforcement is an operator
    /// responsibility.
    #[serde(default, with = "humantime_serde")]
    pub resume_within: Option<Duration>,
    /// Repopulates every tip rack after the operator resumes, modeling a
    /// physical rack swap performed during the pause.
    #[serde(default)]
    pub reset_tip_racks: bool,
}

impl Checkpoint {
    pub fn new(id: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            instructions: instructions.into(),
            resume_within: None,
            reset_tip_racks: false,
        }
    }

    /// Full operator-facing text, including the soft-window advisory.
    pub fn display_text(&self) -> String {
        match self.resume_within {
            Some(window) => format!(
                "{} [Resume within {}s; this window is not enforced by the instrument.]",
                self.instructions,
                window.as_secs()
            ),
            None => self.instructions.clone(),
        }
    }
}

/// Record of one checkpoint actually issued during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedCheckpoint {
    pub id: String,
    pub instructions: String,
    pub issued_at: DateTime<Utc>,
}

/// Issues checkpoints and keeps the ordered record of what was shown to the
/// operator, so a run report (or a test) can state exactly which
/// instructions were issued and in what order.
#[derive(Debug, Default)]
pub struct CheckpointController {
    issued: Vec<IssuedCheckpoint>,
}

impl CheckpointController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Homes, displays the checkpoint text, and blocks until the operator
    /// resumes. Never silently skipped.
    pub fn issue<A: Actuator>(
        &mut self,
        actuator: &mut A,
        pool: &mut TipPool,
        checkpoint: &Checkpoint,
    ) -> Result<()> {
        let text = checkpoint.display_text();
        if let Some(window) = checkpoint.resume_within {
            warn!(
                checkpoint = %checkpoint.id,
                window_secs = window.as_secs(),
                "checkpoint has an advisory resume window the instrument cannot enforce"
            );
        }
        info!(checkpoint = %checkpoint.id, "pausing for operator");

        actuator.home()?;
        actuator.pause(&text)?;

        if checkpoint.reset_tip_racks {
            pool.reset();
        }

        self.issued.push(IssuedCheckpoint {
            id: checkpoint.id.clone(),
            instructions: text,
            issued_at: Utc::now(),
        });
        Ok(())
    }

    pub fn issued(&self) -> &[IssuedCheckpoint] {
        &self.issued
    }

    pub fn into_issued(self) -> Vec<IssuedCheckpoint> {
        self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::SimulatedActuator;
    use crate::pool::{PopulationPattern, TipPool, TipRack};

    fn pool() -> TipPool {
        TipPool::new(vec![TipRack::new(
            "tips",
            8,
            12,
            PopulationPattern::Rows(vec!['A', 'C', 'E', 'G']),
        )
        .unwrap()])
    }

    #[test]
    fn test_issue_homes_then_pauses_with_text() {
        let mut controller = CheckpointController::new();
        let mut sim = SimulatedActuator::new();
        let mut pool = pool();
        let cp = Checkpoint::new("insert-slide", "Insert IP slide 1 into position 3");
        controller.issue(&mut sim, &mut pool, &cp).unwrap();

        assert_eq!(sim.call_names(), vec!["home", "pause"]);
        assert_eq!(
            sim.pause_texts(),
            vec!["Insert IP slide 1 into position 3"]
        );
        assert_eq!(controller.issued().len(), 1);
        assert_eq!(controller.issued()[0].id, "insert-slide");
    }

    #[test]
    fn test_soft_window_appended_to_text() {
        let mut controller = CheckpointController::new();
        let mut sim = SimulatedActuator::new();
        let mut pool = pool();
        let cp = Checkpoint {
            resume_within: Some(Duration::from_secs(900)),
            ..Checkpoint::new("read-slide", "Run slide 1 on the reader")
        };
        controller.issue(&mut sim, &mut pool, &cp).unwrap();
        let text = sim.pause_texts()[0];
        assert!(text.contains("Run slide 1 on the reader"));
        assert!(text.contains("900s"));
        assert!(text.contains("not enforced"));
    }

    #[test]
    fn test_rack_swap_checkpoint_resets_pool() {
        let mut controller = CheckpointController::new();
        let mut sim = SimulatedActuator::new();
        let mut pool = pool();
        for _ in 0..48 {
            pool.allocate().unwrap();
        }
        assert_eq!(pool.remaining(), 0);

        let cp = Checkpoint {
            reset_tip_racks: true,
            ..Checkpoint::new("swap-racks", "Replace tip rack in slot 7 with odd rows only")
        };
        controller.issue(&mut sim, &mut pool, &cp).unwrap();
        assert_eq!(pool.remaining(), 48);
    }

    #[test]
    fn test_issued_order_preserved() {
        let mut controller = CheckpointController::new();
        let mut sim = SimulatedActuator::new();
        let mut pool = pool();
        for id in ["first", "second", "third"] {
            controller
                .issue(&mut sim, &mut pool, &Checkpoint::new(id, "do the thing"))
                .unwrap();
        }
        let ids: Vec<&str> = controller.issued().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }
}
