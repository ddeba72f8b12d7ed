//! Partial-resource-pool tracking for disposable tips.
//!
//! Tip racks are frequently loaded with only a subset of their positions
//! populated (odd rows only, for instance, so a fixed-pitch 8-channel head
//! can service a 4-row plate). Attempting to pick up from an empty position
//! on the real instrument aspirates air at best and crashes the head at
//! worst, so the tracker is the single authority on which positions may be
//! picked. Consumed positions only return to service through an explicit
//! operator-acknowledged rack reset.

use crate::error::{ProtocolError, Result};
use crate::geometry::WellAddress;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Which positions of a rack physically hold tips.
///
/// Applied when the rack is constructed and re-applied on every reset; the
/// pattern itself never changes mid-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PopulationPattern {
    #[default]
    Full,
    /// Only the named rows, e.g. `[A, C, E, G]`.
    Rows(Vec<char>),
    /// Only the named 1-based columns.
    Columns(Vec<u8>),
    /// An explicit list of positions.
    Addresses(Vec<WellAddress>),
}

impl PopulationPattern {
    /// Rejects patterns naming positions outside the rack, so a declared
    /// pattern always yields exactly the tips the operator loaded.
    fn validate(&self, rows: usize, cols: usize) -> Result<()> {
        match self {
            Self::Full => Ok(()),
            Self::Rows(list) => {
                for r in list {
                    let idx = (*r as u8).to_ascii_uppercase().checked_sub(b'A');
                    if !idx.is_some_and(|i| (i as usize) < rows) {
                        return Err(ProtocolError::config(format!(
                            "pattern row '{r}' does not exist on a {rows}-row rack"
                        )));
                    }
                }
                Ok(())
            }
            Self::Columns(list) => {
                for c in list {
                    if *c == 0 || (*c as usize) > cols {
                        return Err(ProtocolError::config(format!(
                            "pattern column {c} does not exist on a {cols}-column rack"
                        )));
                    }
                }
                Ok(())
            }
            Self::Addresses(list) => {
                for a in list {
                    if (a.row as usize) >= rows || (a.col as usize) >= cols {
                        return Err(ProtocolError::config(format!(
                            "pattern position {a} does not exist on a {rows}x{cols} rack"
                        )));
                    }
                }
                Ok(())
            }
        }
    }

    fn contains(&self, address: WellAddress) -> bool {
        match self {
            Self::Full => true,
            Self::Rows(rows) => rows
                .iter()
                .any(|r| (*r as u8).to_ascii_uppercase().checked_sub(b'A') == Some(address.row)),
            Self::Columns(cols) => cols.iter().any(|c| c.saturating_sub(1) == address.col),
            Self::Addresses(addresses) => addresses.contains(&address),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    /// No tip was ever loaded at this position.
    Absent,
    Available,
    Consumed,
}

/// One physical tip rack with a fixed population pattern.
#[derive(Debug, Clone)]
pub struct TipRack {
    rack_id: String,
    rows: usize,
    cols: usize,
    pattern: PopulationPattern,
    slots: Vec<SlotState>,
    cursor: usize,
}

impl TipRack {
    pub fn new(
        rack_id: impl Into<String>,
        rows: usize,
        cols: usize,
        pattern: PopulationPattern,
    ) -> Result<Self> {
        let rack_id = rack_id.into();
        pattern.validate(rows, cols).map_err(|e| match e {
            ProtocolError::Configuration(msg) => {
                ProtocolError::config(format!("rack {rack_id}: {msg}"))
            }
            other => other,
        })?;
        let mut rack = Self {
            rack_id,
            rows,
            cols,
            pattern,
            slots: vec![SlotState::Absent; rows * cols],
            cursor: 0,
        };
        rack.apply_pattern();
        Ok(rack)
    }

    pub fn rack_id(&self) -> &str {
        &self.rack_id
    }

    /// Re-applies the population pattern, column-major.
    fn apply_pattern(&mut self) {
        for flat in 0..self.slots.len() {
            let address = WellAddress::from_flat(flat, self.rows);
            self.slots[flat] = if self.pattern.contains(address) {
                SlotState::Available
            } else {
                SlotState::Absent
            };
        }
        self.cursor = 0;
    }

    pub fn remaining(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| **s == SlotState::Available)
            .count()
    }

    fn state(&self, address: WellAddress) -> Result<SlotState> {
        let flat = address.to_flat(self.rows);
        if (address.row as usize) >= self.rows || (address.col as usize) >= self.cols {
            return Err(ProtocolError::PoolExhausted(format!(
                "position {address} does not exist on rack {}",
                self.rack_id
            )));
        }
        Ok(self.slots[flat])
    }

    fn consume(&mut self, address: WellAddress) -> Result<()> {
        match self.state(address)? {
            SlotState::Available => {
                self.slots[address.to_flat(self.rows)] = SlotState::Consumed;
                Ok(())
            }
            SlotState::Absent => Err(ProtocolError::PoolExhausted(format!(
                "position {address} on rack {} is not populated",
                self.rack_id
            ))),
            SlotState::Consumed => Err(ProtocolError::PoolExhausted(format!(
                "position {address} on rack {} was already consumed",
                self.rack_id
            ))),
        }
    }

    /// Next available position in fixed scan order, if any.
    fn next_available(&mut self) -> Option<WellAddress> {
        while self.cursor < self.slots.len() {
            let flat = self.cursor;
            self.cursor += 1;
            if self.slots[flat] == SlotState::Available {
                return Some(WellAddress::from_flat(flat, self.rows));
            }
        }
        None
    }
}

/// Handle for one allocated tip. Move-only: holding it is the proof that the
/// position was available, and releasing it discards the tip for good.
#[derive(Debug, PartialEq, Eq)]
pub struct TipHandle {
    rack_id: String,
    address: WellAddress,
}

impl TipHandle {
    pub fn rack_id(&self) -> &str {
        &self.rack_id
    }

    pub fn address(&self) -> WellAddress {
        self.address
    }
}

/// Ordered collection of tip racks with sequential allocation across them.
#[derive(Debug, Clone, Default)]
pub struct TipPool {
    racks: Vec<TipRack>,
}

impl TipPool {
    pub fn new(racks: Vec<TipRack>) -> Self {
        Self { racks }
    }

    /// Allocates the next available position in declared rack order, marking
    /// it consumed.
    pub fn allocate(&mut self) -> Result<TipHandle> {
        for rack in &mut self.racks {
            if let Some(address) = rack.next_available() {
                rack.consume(address)?;
                debug!(rack = %rack.rack_id, %address, "allocated tip");
                return Ok(TipHandle {
                    rack_id: rack.rack_id.clone(),
                    address,
                });
            }
        }
        Err(ProtocolError::PoolExhausted(format!(
            "no tips remain in any of {} rack(s)",
            self.racks.len()
        )))
    }

    /// Allocates a specific position on a specific rack. The position must be
    /// populated and not yet consumed.
    pub fn allocate_at(&mut self, rack_id: &str, address: WellAddress) -> Result<TipHandle> {
        let rack = self
            .racks
            .iter_mut()
            .find(|r| r.rack_id == rack_id)
            .ok_or_else(|| {
                ProtocolError::PoolExhausted(format!("no tip rack named '{rack_id}'"))
            })?;
        rack.consume(address)?;
        debug!(rack = rack_id, %address, "allocated tip at explicit position");
        Ok(TipHandle {
            rack_id: rack_id.to_string(),
            address,
        })
    }

    /// Discards a used tip. Single-use consumables never return to the
    /// available state here; only [`reset`](Self::reset) repopulates a rack.
    pub fn release(&mut self, handle: TipHandle) {
        debug!(rack = %handle.rack_id, address = %handle.address, "released tip");
    }

    /// Operator-triggered rack swap: every rack's population pattern is
    /// re-applied. Idempotent. Must be paired with a checkpoint instructing
    /// the operator to physically perform the swap.
    pub fn reset(&mut self) {
        for rack in &mut self.racks {
            rack.apply_pattern();
        }
        info!(
            racks = self.racks.len(),
            remaining = self.remaining(),
            "tip racks reset"
        );
    }

    pub fn remaining(&self) -> usize {
        self.racks.iter().map(TipRack::remaining).sum()
    }
}
