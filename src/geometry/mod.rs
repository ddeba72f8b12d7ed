//! Labware geometry: deck coordinates, well addressing, and loaded containers.
//!
//! The instrument itself only understands 3D points. Everything here exists to
//! turn a declared container type plus a deck slot into an ordered list of
//! wells with known coordinates, so the rest of the crate can reason in
//! addresses ("A1") and anchors (top/bottom) instead of raw millimetres.

mod catalog;

pub use catalog::{LabwareCatalog, LabwareDefinition};

use crate::error::{ProtocolError, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A deck coordinate in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns this point displaced by the given vector.
    pub fn offset(self, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}

/// Reference anchor within a well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Top,
    Bottom,
}

/// A (row, column) well identifier within one container, zero-based.
///
/// Displays and parses as the conventional row-letter/column-number form,
/// e.g. `"A1"` is row 0, column 0. Flat indices are column-major (A1, B1,
/// ... H1, A2, ...) to match the pick order of a multi-channel head moving
/// across columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WellAddress {
    pub row: u8,
    pub col: u8,
}

impl WellAddress {
    pub fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Converts a column-major flat index into an address, given the
    /// container's row count.
    pub fn from_flat(flat: usize, rows: usize) -> Self {
        Self {
            row: (flat % rows) as u8,
            col: (flat / rows) as u8,
        }
    }

    /// Column-major flat index of this address.
    pub fn to_flat(self, rows: usize) -> usize {
        self.col as usize * rows + self.row as usize
    }
}

impl fmt::Display for WellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.row) as char, self.col + 1)
    }
}

impl FromStr for WellAddress {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        let row_char = chars
            .next()
            .ok_or_else(|| ProtocolError::config("empty well address"))?;
        if !row_char.is_ascii_uppercase() {
            return Err(ProtocolError::config(format!(
                "well address '{s}' must start with a row letter A-Z"
            )));
        }
        let col: u8 = chars.as_str().parse().map_err(|_| {
            ProtocolError::config(format!("well address '{s}' has an invalid column number"))
        })?;
        if col == 0 {
            return Err(ProtocolError::config(format!(
                "well address '{s}' column numbers start at 1"
            )));
        }
        Ok(Self {
            row: row_char as u8 - b'A',
            col: col - 1,
        })
    }
}

impl Serialize for WellAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WellAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// One physical well position within a loaded container.
#[derive(Debug, Clone)]
pub struct Well {
    address: WellAddress,
    bottom: Point,
    depth: f64,
}

impl Well {
    pub(crate) fn new(address: WellAddress, bottom: Point, depth: f64) -> Self {
        Self {
            address,
            bottom,
            depth,
        }
    }

    pub fn address(&self) -> WellAddress {
        self.address
    }

    /// Bottom-center reference point.
    pub fn bottom(&self) -> Point {
        self.bottom
    }

    /// Top-center point, bottom displaced by the well depth.
    pub fn top(&self) -> Point {
        self.bottom.offset(0.0, 0.0, self.depth)
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// Coordinate displaced from the given anchor by a vector. This is the
    /// single entry point for partial-depth heights and off-center points.
    pub fn position(&self, anchor: Anchor, dx: f64, dy: f64, dz: f64) -> Point {
        let base = match anchor {
            Anchor::Top => self.top(),
            Anchor::Bottom => self.bottom(),
        };
        base.offset(dx, dy, dz)
    }
}

/// A declared labware item loaded at a deck slot.
///
/// Immutable once loaded; its identity is fixed for the life of a run.
/// Wells are ordered column-major.
#[derive(Debug, Clone)]
pub struct Labware {
    type_id: String,
    label: String,
    deck_slot: String,
    rows: usize,
    cols: usize,
    wells: Vec<Well>,
}

impl Labware {
    pub(crate) fn new(
        type_id: String,
        label: String,
        deck_slot: String,
        rows: usize,
        cols: usize,
        wells: Vec<Well>,
    ) -> Self {
        Self {
            type_id,
            label,
            deck_slot,
            rows,
            cols,
            wells,
        }
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Workflow-local label, e.g. "trough" or "plate24_1A".
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn deck_slot(&self) -> &str {
        &self.deck_slot
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Ordered well list, column-major.
    pub fn wells(&self) -> &[Well] {
        &self.wells
    }

    pub fn well(&self, address: WellAddress) -> Result<&Well> {
        let flat = address.to_flat(self.rows);
        if (address.row as usize) >= self.rows || (address.col as usize) >= self.cols {
            return Err(ProtocolError::config(format!(
                "well {address} does not exist on {} ({}x{} {})",
                self.label, self.rows, self.cols, self.type_id
            )));
        }
        Ok(&self.wells[flat])
    }

    pub fn well_flat(&self, flat: usize) -> Result<&Well> {
        self.wells.get(flat).ok_or_else(|| {
            ProtocolError::config(format!(
                "flat index {flat} out of range for {} ({} wells)",
                self.label,
                self.wells.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display_and_parse() {
        let addr = WellAddress::new(0, 0);
        assert_eq!(addr.to_string(), "A1");
        assert_eq!("A1".parse::<WellAddress>().unwrap(), addr);
        assert_eq!(
            "H12".parse::<WellAddress>().unwrap(),
            WellAddress::new(7, 11)
        );
    }

    #[test]
    fn test_address_parse_rejects_garbage() {
        assert!("".parse::<WellAddress>().is_err());
        assert!("a1".parse::<WellAddress>().is_err());
        assert!("A0".parse::<WellAddress>().is_err());
        assert!("Axy".parse::<WellAddress>().is_err());
    }

    #[test]
    fn test_flat_index_is_column_major() {
        // A1, B1, ... H1, A2 on an 8-row plate.
        assert_eq!(WellAddress::from_flat(0, 8), WellAddress::new(0, 0));
        assert_eq!(WellAddress::from_flat(7, 8), WellAddress::new(7, 0));
        assert_eq!(WellAddress::from_flat(8, 8), WellAddress::new(0, 1));
        for flat in 0..96 {
            assert_eq!(WellAddress::from_flat(flat, 8).to_flat(8), flat);
        }
    }

    #[test]
    fn test_well_anchors() {
        let well = Well::new(WellAddress::new(0, 0), Point::new(10.0, 20.0, 0.0), 11.0);
        assert_eq!(well.top(), Point::new(10.0, 20.0, 11.0));
        assert_eq!(
            well.position(Anchor::Bottom, 5.5, 0.0, 1.5),
            Point::new(15.5, 20.0, 1.5)
        );
        assert_eq!(
            well.position(Anchor::Top, 0.0, 0.0, -20.0),
            Point::new(10.0, 20.0, -9.0)
        );
    }

    #[test]
    fn test_address_serde_round_trip() {
        let addr = WellAddress::new(2, 4);
        let yaml = serde_yaml::to_string(&addr).unwrap();
        assert_eq!(yaml.trim(), "C5");
        let back: WellAddress = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, addr);
    }
}
