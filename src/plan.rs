//! Workflow definition input.
//!
//! A plan document is the "script" surface a driver supplies: labware
//! declarations, tip rack declarations with population patterns, and an
//! ordered list of items. High-level `series` items carry a grid mapping and
//! a logical index count per endpoint and expand into concrete transfer
//! steps at build time, which is where every bounds check runs. A plan that
//! builds cleanly cannot produce an indexing error during execution.

use crate::checkpoint::Checkpoint;
use crate::error::{ProtocolError, Result};
use crate::geometry::{Labware, LabwareCatalog, WellAddress};
use crate::grid::GridMapping;
use crate::mix::{CenterMixSpec, EdgeMixSpec};
use crate::pool::{PopulationPattern, TipPool, TipRack};
use crate::sequencer::{Clearances, FlowRates, PlanItem, TransferStep, WellRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

fn default_settle() -> Duration {
    Duration::from_secs(1)
}

fn default_rack_rows() -> usize {
    8
}

fn default_rack_cols() -> usize {
    12
}

/// One labware declaration: a workflow-local name, a catalog type, and a
/// deck slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabwareDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_id: String,
    pub slot: String,
}

/// One tip rack declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TipRackDecl {
    pub rack: String,
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub pattern: PopulationPattern,
    #[serde(default = "default_rack_rows")]
    pub rows: usize,
    #[serde(default = "default_rack_cols")]
    pub cols: usize,
}

/// Pipetting options shared by transfer and series items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_mix: Option<CenterMixSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_mix: Option<EdgeMixSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_mix: Option<CenterMixSpec>,
    #[serde(default)]
    pub flow: FlowRates,
    #[serde(default)]
    pub clearance: Clearances,
    #[serde(default = "default_settle", with = "humantime_serde")]
    pub settle: Duration,
    #[serde(default)]
    pub shared_tip: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_air_gap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispense_excess: Option<f64>,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
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
}

impl StepOptions {
    fn apply(&self, mut step: TransferStep, shared_tip: bool) -> TransferStep {
        step.pre_mix = self.pre_mix;
        step.edge_mix = self.edge_mix;
        step.post_mix = self.post_mix;
        step.flow = self.flow;
        step.clearance = self.clearance;
        step.settle = self.settle;
        step.shared_tip = shared_tip;
        step.pre_air_gap = self.pre_air_gap;
        step.dispense_excess = self.dispense_excess;
        step
    }
}

/// A single well on a named labware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellSpec {
    pub labware: String,
    pub well: WellAddress,
}

/// One explicit transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferDecl {
    pub source: WellSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<WellSpec>,
    pub volume: f64,
    #[serde(flatten)]
    pub options: StepOptions,
}

/// One endpoint of a series: a named labware plus the grid mapping that
/// turns logical indices into its wells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesEndpoint {
    pub labware: String,
    #[serde(flatten)]
    pub grid: GridMapping,
}

/// A run of `count` transfers generated from grid mappings.
///
/// Logical index `i` maps through each endpoint's stride and tile offset,
/// so one declaration expresses "walk the A-row of four tiled 24-well
/// plates into consecutive columns of a 96-well plate".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesDecl {
    pub source: SeriesEndpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<SeriesEndpoint>,
    pub count: usize,
    pub volume: f64,
    #[serde(flatten)]
    pub options: StepOptions,
}

/// One declared plan item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanItemDecl {
    Home,
    Checkpoint(Checkpoint),
    Transfer(Box<TransferDecl>),
    Series(Box<SeriesDecl>),
}

/// A whole declared workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDoc {
    pub labware: Vec<LabwareDecl>,
    #[serde(default)]
    pub tip_racks: Vec<TipRackDecl>,
    /// Items are written as singleton maps (`- series: {...}`), not YAML
    /// tags, so plan documents read like the workflows they describe.
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub items: Vec<PlanItemDecl>,
}

/// Fully validated, executable plan.
#[derive(Debug)]
pub struct BuiltPlan {
    pub labware: Vec<Labware>,
    pub pool: TipPool,
    pub items: Vec<PlanItem>,
}

impl PlanDoc {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads labware, builds the tip pool, and expands every item into
    /// concrete steps. All configuration errors surface here, before any
    /// liquid is moved.
    pub fn build(&self, catalog: &LabwareCatalog) -> Result<BuiltPlan> {
        let mut labware = Vec::with_capacity(self.labware.len());
        let mut index_by_name: HashMap<&str, usize> = HashMap::new();
        for decl in &self.labware {
            if index_by_name.contains_key(decl.name.as_str()) {
                return Err(ProtocolError::config(format!(
                    "duplicate labware name '{}'",
                    decl.name
                )));
            }
            index_by_name.insert(decl.name.as_str(), labware.len());
            labware.push(catalog.load(&decl.type_id, &decl.slot, &decl.name)?);
        }

        let racks = self
            .tip_racks
            .iter()
            .map(|d| TipRack::new(d.rack.clone(), d.rows, d.cols, d.pattern.clone()))
            .collect::<Result<Vec<_>>>()?;
        let pool = TipPool::new(racks);

        let mut items = Vec::new();
        for (item_index, decl) in self.items.iter().enumerate() {
            match decl {
                PlanItemDecl::Home => items.push(PlanItem::Home),
                PlanItemDecl::Checkpoint(cp) => items.push(PlanItem::Checkpoint(cp.clone())),
                PlanItemDecl::Transfer(t) => {
                    let step = self
                        .build_transfer(t, &index_by_name, &labware)
                        .map_err(|e| e.in_step(item_index, t.source.labware.clone()))?;
                    items.push(PlanItem::Transfer(step));
                }
                PlanItemDecl::Series(s) => {
                    let steps = self
                        .build_series(s, &index_by_name, &labware)
                        .map_err(|e| e.in_step(item_index, s.source.labware.clone()))?;
                    items.extend(steps.into_iter().map(PlanItem::Transfer));
                }
            }
        }

        debug!(
            labware = labware.len(),
            items = items.len(),
            "plan built"
        );
        Ok(BuiltPlan {
            labware,
            pool,
            items,
        })
    }

    fn resolve(&self, name: &str, index_by_name: &HashMap<&str, usize>) -> Result<usize> {
        index_by_name.get(name).copied().ok_or_else(|| {
            ProtocolError::config(format!("unknown labware name '{name}'"))
        })
    }

    fn build_transfer(
        &self,
        decl: &TransferDecl,
        index_by_name: &HashMap<&str, usize>,
        labware: &[Labware],
    ) -> Result<TransferStep> {
        let source = WellRef {
            labware: self.resolve(&decl.source.labware, index_by_name)?,
            address: decl.source.well,
        };
        let dest = decl
            .dest
            .as_ref()
            .map(|d| {
                Ok::<_, ProtocolError>(WellRef {
                    labware: self.resolve(&d.labware, index_by_name)?,
                    address: d.well,
                })
            })
            .transpose()?;
        let step = decl.options.apply(
            TransferStep::new(source, dest, decl.volume),
            decl.options.shared_tip,
        );
        step.validate(labware)?;
        Ok(step)
    }

    fn build_series(
        &self,
        decl: &SeriesDecl,
        index_by_name: &HashMap<&str, usize>,
        labware: &[Labware],
    ) -> Result<Vec<TransferStep>> {
        if decl.count == 0 {
            return Err(ProtocolError::config("series count must be at least 1"));
        }
        let source_idx = self.resolve(&decl.source.labware, index_by_name)?;
        let source_grid =
            GridMapping::new(decl.source.grid.stride, decl.source.grid.tile_offset)?;
        source_grid.validate_range(decl.count, &labware[source_idx])?;

        let dest = decl
            .dest
            .as_ref()
            .map(|d| {
                let idx = self.resolve(&d.labware, index_by_name)?;
                let grid = GridMapping::new(d.grid.stride, d.grid.tile_offset)?;
                grid.validate_range(decl.count, &labware[idx])?;
                Ok::<_, ProtocolError>((idx, grid))
            })
            .transpose()?;

        let mut steps = Vec::with_capacity(decl.count);
        for logical in 0..decl.count {
            let source = WellRef {
                labware: source_idx,
                address: source_grid.map(logical, &labware[source_idx])?,
            };
            let dest_ref = dest
                .as_ref()
                .map(|(idx, grid)| {
                    Ok::<_, ProtocolError>(WellRef {
                        labware: *idx,
                        address: grid.map(logical, &labware[*idx])?,
                    })
                })
                .transpose()?;
            // A shared-tip series picks up once and chains the rest.
            let shared = decl.options.shared_tip && logical > 0;
            let step = decl
                .options
                .apply(TransferStep::new(source, dest_ref, decl.volume), shared);
            step.validate(labware)?;
            steps.push(step);
        }
        Ok(steps)
    }
}
