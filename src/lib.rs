//! # Decant
//!
//! Core engine for driving an automated liquid-handling instrument through
//! multi-step workflows: filling, serial dilution, mixing, and plate-to-plate
//! transfer. The instrument exposes only coarse blocking primitives and a
//! catalog of declared container geometries. Everything above that line,
//! from positioning and sequencing to consumable bookkeeping, is computed
//! here.
//!
//! ## Modules
//!
//! - `geometry` - Labware catalog, well addressing, and deck coordinates
//! - `grid` - Virtual grid mapping between logical indices and physical wells
//! - `pool` - Partial-resource-pool tracking for disposable tips
//! - `actuator` - Boundary trait to the physical actuation layer, plus a
//!   recording simulator
//! - `mix` - Off-center edge agitation and plain center mixes
//! - `checkpoint` - Blocking, human-acknowledged pause points
//! - `sequencer` - Ordered execution of transfer plans
//! - `plan` - Declarative workflow input with build-time validation
//! - `error` - Error taxonomy for a run

pub mod actuator;
pub mod checkpoint;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod mix;
pub mod plan;
pub mod pool;
pub mod sequencer;

pub use actuator::{Actuator, SimulatedActuator};
pub use checkpoint::{Checkpoint, CheckpointController};
pub use error::{ProtocolError, Result};
pub use geometry::{Anchor, Labware, LabwareCatalog, Point, WellAddress};
pub use grid::GridMapping;
pub use mix::{CenterMixSpec, EdgeMixSpec};
pub use plan::{BuiltPlan, PlanDoc};
pub use pool::{PopulationPattern, TipHandle, TipPool, TipRack};
pub use sequencer::{PlanItem, RunReport, Sequencer, TransferStep, WellRef};
