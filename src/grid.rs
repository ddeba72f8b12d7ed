//! Virtual grid coordinate mapping.
//!
//! A fixed-pitch multi-channel head is built for one well density (the 8-row,
//! 9 mm pitch of a 96-well plate). Lower-density containers, or several
//! containers tiled into one virtual grid, are addressed by mapping a logical
//! sequential index through a stride and a tile offset into a flat well index
//! on the target container. All bounds checking happens here, at plan
//! construction, so an out-of-range index can never reach the actuator.

use crate::error::{ProtocolError, Result};
use crate::geometry::{Anchor, Labware, Point, Well, WellAddress};
use serde::{Deserialize, Serialize};

fn default_stride() -> usize {
    1
}

/// Validated mapping from logical indices to physical wells.
///
/// `flat = stride * logical + tile_offset`, resolved against the target
/// container's column-major well list. A stride of 4 walks the A-row wells of
/// a 4-row plate; a tile offset of `8 * 6` shifts into the second half of a
/// 96-well grid when two plates share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridMapping {
    #[serde(default = "default_stride")]
    pub stride: usize,
    #[serde(default)]
    pub tile_offset: usize,
}

impl Default for GridMapping {
    fn default() -> Self {
        Self {
            stride: 1,
            tile_offset: 0,
        }
    }
}

impl GridMapping {
    pub fn new(stride: usize, tile_offset: usize) -> Result<Self> {
        if stride == 0 {
            return Err(ProtocolError::config("grid stride must be at least 1"));
        }
        Ok(Self {
            stride,
            tile_offset,
        })
    }

    /// Flat well index for a logical index, unchecked against any container.
    /// `None` when the arithmetic itself overflows.
    pub fn flat_index(&self, logical: usize) -> Option<usize> {
        self.stride
            .checked_mul(logical)
            .and_then(|f| f.checked_add(self.tile_offset))
    }

    /// Resolves a logical index to a physical address on the target
    /// container. Out-of-range resolution is a configuration error.
    pub fn map(&self, logical: usize, labware: &Labware) -> Result<WellAddress> {
        let flat = self.flat_index(logical).ok_or_else(|| {
            ProtocolError::config(format!(
                "logical index {logical} overflows flat indexing (stride {}, tile offset {})",
                self.stride, self.tile_offset
            ))
        })?;
        let len = labware.wells().len();
        if flat >= len {
            return Err(ProtocolError::config(format!(
                "logical index {logical} (stride {}, tile offset {}) resolves to flat index \
                 {flat}, past the {len} wells of {}",
                self.stride,
                self.tile_offset,
                labware.label()
            )));
        }
        Ok(WellAddress::from_flat(flat, labware.rows()))
    }

    /// Resolves a logical index to the well itself.
    pub fn map_well<'a>(&self, logical: usize, labware: &'a Labware) -> Result<&'a Well> {
        let address = self.map(logical, labware)?;
        labware.well(address)
    }

    /// Inverse of [`map`](Self::map) over the bijective region: returns the
    /// logical index iff the address lies exactly on this mapping's lattice.
    pub fn unmap(&self, address: WellAddress, labware: &Labware) -> Option<usize> {
        let flat = address.to_flat(labware.rows());
        if flat < self.tile_offset {
            return None;
        }
        let rel = flat - self.tile_offset;
        if rel % self.stride != 0 {
            return None;
        }
        Some(rel / self.stride)
    }

    /// Fail-fast bounds check for a whole logical index range, run at plan
    /// construction before any liquid is moved.
    pub fn validate_range(&self, logical_count: usize, labware: &Labware) -> Result<()> {
        if logical_count == 0 {
            return Err(ProtocolError::config(format!(
                "empty logical index range for {}",
                labware.label()
            )));
        }
        self.map(logical_count - 1, labware).map(|_| ())
    }
}

/// Coordinate displaced from a well's bottom anchor. Used for off-center
/// agitation points and partial-depth aspirate/dispense heights.
pub fn spatial_offset(well: &Well, dx: f64, dy: f64, dz: f64) -> Point {
    well.position(Anchor::Bottom, dx, dy, dz)
}
