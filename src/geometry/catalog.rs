//! Declarative labware catalog.
//!
//! Geometry is supplied, not inferred: every container type a plan references
//! must exist in the catalog, and an unknown type is a fatal configuration
//! error. The built-in catalog covers the plate families the stock workflows
//! use; additional definitions can be merged from YAML.

use super::{Labware, Point, Well, WellAddress};
use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Deck slot pitch of the 3 x 4 slot grid, millimetres.
const SLOT_PITCH_X: f64 = 132.5;
const SLOT_PITCH_Y: f64 = 90.5;

fn default_pitch() -> f64 {
    9.0
}

fn default_a1_x() -> f64 {
    14.38
}

fn default_a1_y() -> f64 {
    74.24
}

/// Declarative geometry for one container type.
///
/// Wells are laid out on a regular grid; `a1_x`/`a1_y` locate the center of
/// well A1 relative to the slot's front-left corner, with row letters
/// increasing toward the front (decreasing y).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabwareDefinition {
    pub rows: usize,
    pub cols: usize,
    #[serde(default = "default_a1_x")]
    pub a1_x: f64,
    #[serde(default = "default_a1_y")]
    pub a1_y: f64,
    #[serde(default = "default_pitch")]
    pub pitch_x: f64,
    #[serde(default = "default_pitch")]
    pub pitch_y: f64,
    pub well_depth: f64,
}

impl LabwareDefinition {
    fn validate(&self, type_id: &str) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ProtocolError::config(format!(
                "labware '{type_id}' must have at least one row and one column"
            )));
        }
        if self.well_depth <= 0.0 {
            return Err(ProtocolError::config(format!(
                "labware '{type_id}' must have a positive well depth"
            )));
        }
        Ok(())
    }
}

/// Catalog mapping container type ids to their declared geometry.
#[derive(Debug, Clone, Default)]
pub struct LabwareCatalog {
    definitions: HashMap<String, LabwareDefinition>,
}

impl LabwareCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the container types the stock workflows use.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        let mut add = |type_id: &str, def: LabwareDefinition| {
            catalog.definitions.insert(type_id.to_string(), def);
        };

        let plate96 = |depth: f64| LabwareDefinition {
            rows: 8,
            cols: 12,
            a1_x: default_a1_x(),
            a1_y: default_a1_y(),
            pitch_x: 9.0,
            pitch_y: 9.0,
            well_depth: depth,
        };
        add("nunc_96_ubottom", plate96(11.5));
        add("corning_96_wellplate_360ul_flat", plate96(10.67));
        add("corning_96_wellplate_500ul", plate96(14.3));
        add("valitacell_96_wellplate_150ul", plate96(10.0));
        add("lonza_96_electroporation", plate96(20.0));
        // Counting slide: 48 chambers addressed through a 96-position grid so
        // a multi-channel head can load alternating columns.
        add("iprasense_48_slide", plate96(1.2));

        let plate24 = |a1_y: f64, depth: f64| LabwareDefinition {
            rows: 4,
            cols: 6,
            a1_x: 17.05,
            a1_y,
            pitch_x: 19.3,
            pitch_y: 19.3,
            well_depth: depth,
        };
        add("nunc_24_plate", plate24(68.87, 17.0));
        // Pseudo variants of the same shallow 24-well plate: the A variant is
        // calibrated one half row-pitch high, the B variant one half row-pitch
        // low, so two plates interleave into the odd/even rows of a virtual
        // 96-well grid under a fixed-pitch multi-channel head.
        add("nunc_24_pseudo_a", plate24(68.87 + 4.825, 10.5));
        add("nunc_24_pseudo_b", plate24(68.87 - 4.825, 10.5));

        add(
            "axygen_12_reservoir_22ml",
            LabwareDefinition {
                rows: 1,
                cols: 12,
                a1_x: default_a1_x(),
                a1_y: 42.78,
                pitch_x: 9.0,
                pitch_y: 9.0,
                well_depth: 39.2,
            },
        );

        catalog
    }

    /// Merges user-declared definitions from a YAML document. Later
    /// definitions replace earlier ones with the same type id.
    pub fn merge_yaml(&mut self, yaml: &str) -> Result<()> {
        let defs: HashMap<String, LabwareDefinition> = serde_yaml::from_str(yaml)?;
        for (type_id, def) in defs {
            def.validate(&type_id)?;
            self.definitions.insert(type_id, def);
        }
        Ok(())
    }

    pub fn insert(&mut self, type_id: impl Into<String>, def: LabwareDefinition) -> Result<()> {
        let type_id = type_id.into();
        def.validate(&type_id)?;
        self.definitions.insert(type_id, def);
        Ok(())
    }

    pub fn definition(&self, type_id: &str) -> Option<&LabwareDefinition> {
        self.definitions.get(type_id)
    }

    /// Loads a container of the given type at a deck slot, generating its
    /// ordered (column-major) well list.
    pub fn load(&self, type_id: &str, deck_slot: &str, label: &str) -> Result<Labware> {
        let def = self.definitions.get(type_id).ok_or_else(|| {
            ProtocolError::config(format!(
                "unknown labware type '{type_id}' for '{label}' (slot {deck_slot})"
            ))
        })?;
        let origin = slot_origin(deck_slot)?;

        let mut wells = Vec::with_capacity(def.rows * def.cols);
        for col in 0..def.cols {
            for row in 0..def.rows {
                let bottom = Point::new(
                    origin.x + def.a1_x + col as f64 * def.pitch_x,
                    origin.y + def.a1_y - row as f64 * def.pitch_y,
                    origin.z,
                );
                wells.push(Well::new(
                    WellAddress::new(row as u8, col as u8),
                    bottom,
                    def.well_depth,
                ));
            }
        }

        Ok(Labware::new(
            type_id.to_string(),
            label.to_string(),
            deck_slot.to_string(),
            def.rows,
            def.cols,
            wells,
        ))
    }
}

/// Front-left corner of a numbered deck slot (1 through 11; 12 is the fixed
/// waste position and cannot hold labware).
fn slot_origin(deck_slot: &str) -> Result<Point> {
    let n: usize = deck_slot.parse().map_err(|_| {
        ProtocolError::config(format!("deck slot '{deck_slot}' is not a slot number"))
    })?;
    if !(1..=11).contains(&n) {
        return Err(ProtocolError::config(format!(
            "deck slot '{deck_slot}' out of range (1-11)"
        )));
    }
    let idx = n - 1;
    Ok(Point::new(
        (idx % 3) as f64 * SLOT_PITCH_X,
        (idx / 3) as f64 * SLOT_PITCH_Y,
        0.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_is_fatal() {
        let catalog = LabwareCatalog::builtin();
        let err = catalog.load("no_such_plate", "1", "plate").unwrap_err();
        assert!(err.to_string().contains("no_such_plate"));
    }

    #[test]
    fn test_load_generates_column_major_wells() {
        let catalog = LabwareCatalog::builtin();
        let plate = catalog.load("nunc_96_ubottom", "6", "plate_dil").unwrap();
        assert_eq!(plate.wells().len(), 96);
        assert_eq!(plate.wells()[0].address().to_string(), "A1");
        assert_eq!(plate.wells()[7].address().to_string(), "H1");
        assert_eq!(plate.wells()[8].address().to_string(), "A2");
        // One column apart, one pitch apart in x.
        let a1 = plate.wells()[0].bottom();
        let a2 = plate.wells()[8].bottom();
        assert!((a2.x - a1.x - 9.0).abs() < 1e-9);
        assert!((a2.y - a1.y).abs() < 1e-9);
    }

    #[test]
    fn test_pseudo_plates_interleave() {
        let catalog = LabwareCatalog::builtin();
        let a = catalog.load("nunc_24_pseudo_a", "1", "plate24_1A").unwrap();
        let b = catalog.load("nunc_24_pseudo_b", "1", "plate24_2B").unwrap();
        let ya = a.wells()[0].bottom().y;
        let yb = b.wells()[0].bottom().y;
        assert!((ya - yb - 9.65).abs() < 1e-9);
    }

    #[test]
    fn test_bad_slot_rejected() {
        let catalog = LabwareCatalog::builtin();
        assert!(catalog.load("nunc_96_ubottom", "12", "p").is_err());
        assert!(catalog.load("nunc_96_ubottom", "0", "p").is_err());
        assert!(catalog.load("nunc_96_ubottom", "left", "p").is_err());
    }

    #[test]
    fn test_merge_yaml_definition() {
        let mut catalog = LabwareCatalog::builtin();
        catalog
            .merge_yaml("custom_6_deepwell:\n  rows: 2\n  cols: 3\n  well_depth: 40.0\n")
            .unwrap();
        let plate = catalog.load("custom_6_deepwell", "2", "deep").unwrap();
        assert_eq!(plate.wells().len(), 6);
        assert_eq!(plate.rows(), 2);
    }

    #[test]
    fn test_merge_rejects_zero_rows() {
        let mut catalog = LabwareCatalog::new();
        let err = catalog
            .merge_yaml("bad:\n  rows: 0\n  cols: 3\n  well_depth: 10.0\n")
            .unwrap_err();
        assert!(err.to_string().contains("bad"));
    }
}
