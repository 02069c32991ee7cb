//! Categorical colors for satellite markers.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::render::canvas::Rgba;

/// d3 `schemeCategory10`.
pub const CATEGORY10: [Rgba; 10] = [
    Rgba::rgb(0x1f, 0x77, 0xb4),
    Rgba::rgb(0xff, 0x7f, 0x0e),
    Rgba::rgb(0x2c, 0xa0, 0x2c),
    Rgba::rgb(0xd6, 0x27, 0x28),
    Rgba::rgb(0x94, 0x67, 0xbd),
    Rgba::rgb(0x8c, 0x56, 0x4b),
    Rgba::rgb(0xe3, 0x77, 0xc2),
    Rgba::rgb(0x7f, 0x7f, 0x7f),
    Rgba::rgb(0xbc, 0xbd, 0x22),
    Rgba::rgb(0x17, 0xbe, 0xcf),
];

/// Ordinal color assignment keyed by satellite id.
///
/// Ids receive palette entries in order of first appearance and keep them for
/// the lifetime of the table, across animation sessions.
#[derive(Resource, Debug, Clone)]
pub struct ColorTable {
    palette: Vec<Rgba>,
    assigned: HashMap<u32, usize>,
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::new(CATEGORY10.to_vec())
    }
}

impl ColorTable {
    pub fn new(palette: Vec<Rgba>) -> Self {
        Self {
            palette,
            assigned: HashMap::new(),
        }
    }

    pub fn color_for(&mut self, satellite_id: u32) -> Rgba {
        if self.palette.is_empty() {
            return Rgba::BLACK;
        }
        let next = self.assigned.len() % self.palette.len();
        let slot = *self.assigned.entry(satellite_id).or_insert(next);
        self.palette[slot]
    }
}
