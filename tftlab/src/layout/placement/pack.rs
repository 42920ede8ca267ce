//! Shelf packing of tiles into a roughly square area.

use itertools::Itertools;
use tftgeom::bbox::BoundBox;
use tftgeom::{Corner, Point};

use super::align::AlignRect;
use crate::error::{ErrorSource, Result};
use crate::layout::group::Group;
use crate::layout::{Draw, DrawRef};

/// Packs tiles onto shelves, largest first.
///
/// Tiles are sorted by decreasing bounding-box area and placed left to right,
/// starting a new shelf above the previous one once the row would exceed the
/// target width `sqrt(density * total area)`. A density of 1 aims for a square
/// result; larger values produce wider, flatter packings. Every tile keeps at
/// least `spacing` from its neighbors.
pub struct Packer {
    tiles: Vec<Group>,
    spacing: i64,
    density: f64,
}

impl Packer {
    pub fn new(
        tiles: impl IntoIterator<Item = impl Into<Group>>,
        spacing: i64,
        density: f64,
    ) -> Result<Self> {
        if density <= 0. || !density.is_finite() {
            return Err(ErrorSource::InvalidArgs(format!(
                "packing density must be positive, got {density}"
            ))
            .into());
        }
        Ok(Self {
            tiles: tiles
                .into_iter()
                .map(Into::into)
                .filter(|t: &Group| !t.bbox().is_empty())
                .collect(),
            spacing,
            density,
        })
    }

    /// The lower-left corner assigned to each tile, in input order.
    pub fn positions(&self) -> Vec<Point> {
        let padded = self
            .tiles
            .iter()
            .map(|t| {
                let bbox = t.bbox();
                (bbox.width() + self.spacing, bbox.height() + self.spacing)
            })
            .collect_vec();

        let total_area: f64 = padded.iter().map(|&(w, h)| w as f64 * h as f64).sum();
        let widest = padded.iter().map(|&(w, _)| w).max().unwrap_or_default();
        let target_w = ((self.density * total_area).sqrt().round() as i64).max(widest);

        let order = (0..padded.len())
            .sorted_by_key(|&k| std::cmp::Reverse(padded[k].0 as i128 * padded[k].1 as i128))
            .collect_vec();

        let mut positions = vec![Point::zero(); padded.len()];
        let (mut x, mut y, mut shelf_h) = (0, 0, 0);
        for k in order {
            let (w, h) = padded[k];
            if x > 0 && x + w > target_w {
                x = 0;
                y += shelf_h;
                shelf_h = 0;
            }
            positions[k] = Point::new(x, y);
            x += w;
            shelf_h = shelf_h.max(h);
        }
        positions
    }

    pub(crate) fn generate(&self) -> Result<Group> {
        let mut group = Group::new();
        for (tile, pos) in self.tiles.iter().zip(self.positions()) {
            let mut tile = tile.draw_ref()?;
            tile.align_corner(Corner::LowerLeft, pos);
            group.add_group(tile);
        }
        Ok(group)
    }
}

impl Draw for Packer {
    fn draw(self) -> Result<Group> {
        self.draw_ref()
    }
}

impl DrawRef for Packer {
    fn draw_ref(&self) -> Result<Group> {
        self.generate()
    }
}

/// Packs `tiles` with the given spacing and density.
///
/// See [`Packer`].
pub fn pack(
    tiles: impl IntoIterator<Item = impl Into<Group>>,
    spacing: i64,
    density: f64,
) -> Result<Group> {
    Packer::new(tiles, spacing, density)?.draw()
}

#[cfg(test)]
mod tests {
    use tftgeom::Rect;

    use super::*;
    use crate::layout::layers::GdsLayerSpec;

    const L1: GdsLayerSpec = GdsLayerSpec(1, 0);

    fn tile(w: i64, h: i64) -> Group {
        let mut group = Group::new();
        group.add_rect(L1, Rect::from_sides(0, 0, w, h));
        group
    }

    #[test]
    fn packed_tiles_keep_their_spacing() {
        let tiles = (1..=12).map(|k| tile(10 * k, 5 * k + 20)).collect_vec();
        let group = pack(tiles, 7, 1.).unwrap();
        let rects = group
            .elements()
            .filter_map(|e| e.inner.as_rect())
            .collect_vec();
        assert_eq!(rects.len(), 12);
        for (a, b) in rects.iter().tuple_combinations() {
            assert!(
                !a.expand(3).overlaps(&b.expand(3)),
                "{a:?} and {b:?} are closer than the spacing"
            );
        }
        assert_eq!(group.brect().corner(Corner::LowerLeft), Point::zero());
    }

    #[test]
    fn largest_tile_goes_first() {
        let packer = Packer::new([tile(10, 10), tile(50, 50), tile(20, 20)], 0, 1.).unwrap();
        let pos = packer.positions();
        assert_eq!(pos[1], Point::zero());
        // The second tile no longer fits beside the first one.
        assert_eq!(pos[2], Point::new(0, 50));
        assert_eq!(pos[0], Point::new(20, 50));
    }

    #[test]
    fn density_must_be_positive() {
        assert!(Packer::new([tile(10, 10)], 0, 0.).is_err());
    }
}
