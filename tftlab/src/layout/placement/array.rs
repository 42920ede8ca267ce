//! Raster placement into a fixed-width array.

use tftgeom::bbox::BoundBox;
use tftgeom::{Corner, Point};

use super::align::AlignRect;
use crate::error::Result;
use crate::layout::group::Group;
use crate::layout::Draw;

/// Places tiles on a fixed pitch, left to right, wrapping to a new row
/// whenever the next tile would cross the right margin of the array.
///
/// Each tile's lower-left corner lands on its raster position; rows grow
/// upwards from `(margin, margin)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayPlacer {
    pub array_w: i64,
    pub margin: i64,
    pub pitch: i64,
}

impl ArrayPlacer {
    pub fn new(array_w: i64, margin: i64, pitch: i64) -> Self {
        Self {
            array_w,
            margin,
            pitch,
        }
    }

    /// The raster positions of the first `n` tiles.
    pub fn positions(&self, n: usize) -> Vec<Point> {
        let mut out = Vec::with_capacity(n);
        let (mut x, mut y) = (self.margin, self.margin);
        for _ in 0..n {
            if x + self.pitch > self.array_w - self.margin && x != self.margin {
                x = self.margin;
                y += self.pitch;
            }
            out.push(Point::new(x, y));
            x += self.pitch;
        }
        out
    }

    pub fn place(&self, tiles: impl IntoIterator<Item = impl Into<Group>>) -> Result<Group> {
        let tiles: Vec<Group> = tiles.into_iter().map(Into::into).collect();
        let positions = self.positions(tiles.len());
        let mut group = Group::new();
        for (tile, pos) in tiles.into_iter().zip(positions) {
            let mut tile = tile.draw()?;
            if tile.bbox().is_empty() {
                continue;
            }
            tile.align_corner(Corner::LowerLeft, pos);
            group.add_group(tile);
        }
        Ok(group)
    }
}
