use grid::Grid;
use serde::{Deserialize, Serialize};
use tftgeom::bbox::BoundBox;
use tftgeom::{Corner, Dims, Point, Rect};

use super::align::AlignRect;
use crate::error::Result;
use crate::layout::group::Group;
use crate::layout::{Draw, DrawRef};

/// How a tile is placed within its grid slot.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CellAlign {
    /// Centered in the slot.
    #[default]
    Center,
    /// Lower-left corner of the tile at the lower-left corner of the slot.
    LowerLeft,
}

/// Places tiles on a grid of rows and columns.
///
/// Each column is as wide as its widest tile and each row as tall as its
/// tallest tile. Row 0 is the top row. The lower-left corner of the grid
/// lies at the origin.
pub struct GridPlacer {
    tiles: Grid<Option<Group>>,
    spacing: Dims,
    align: CellAlign,

    /// The width of each column.
    ///
    /// `col_widths[0]` represents the width of the **left-most** column.
    col_widths: Vec<i64>,

    /// The height of each row.
    ///
    /// `row_heights[0]` represents the height of the **top-most** row.
    row_heights: Vec<i64>,
}

impl GridPlacer {
    pub fn new(tiles: Grid<Option<Group>>) -> Self {
        let rows = tiles.rows();
        let cols = tiles.cols();

        let mut row_heights = vec![0; rows];
        let mut col_widths = vec![0; cols];
        for (i, height) in row_heights.iter_mut().enumerate() {
            for (j, width) in col_widths.iter_mut().enumerate() {
                if let Some(Some(tile)) = tiles.get(i, j) {
                    let bbox = tile.bbox();
                    if !bbox.is_empty() {
                        *height = (*height).max(bbox.height());
                        *width = (*width).max(bbox.width());
                    }
                }
            }
        }

        Self {
            tiles,
            spacing: Dims::default(),
            align: CellAlign::default(),
            col_widths,
            row_heights,
        }
    }

    /// Fills a grid with `cols` columns row by row.
    ///
    /// The last row may be incomplete.
    pub fn from_tiles(tiles: impl IntoIterator<Item = impl Into<Group>>, cols: usize) -> Self {
        let tiles: Vec<Group> = tiles.into_iter().map(Into::into).collect();
        let cols = cols.max(1);
        let rows = (tiles.len() + cols - 1) / cols;
        let mut grid = Grid::<Option<Group>>::new(rows, cols);
        for (k, tile) in tiles.into_iter().enumerate() {
            if let Some(slot) = grid.get_mut(k / cols, k % cols) {
                *slot = Some(tile);
            }
        }
        Self::new(grid)
    }

    /// Sets the gap between neighboring columns (`w`) and rows (`h`).
    pub fn spacing(mut self, spacing: Dims) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn align(mut self, align: CellAlign) -> Self {
        self.align = align;
        self
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.tiles.rows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.tiles.cols()
    }

    /// The slot of the tile in row `i`, column `j`.
    ///
    /// # Panics
    ///
    /// This function panics if `i` or `j` are out of bounds.
    pub fn cell(&self, i: usize, j: usize) -> Rect {
        let x = self.col_widths[..j].iter().sum::<i64>() + j as i64 * self.spacing.w();
        let y = self.row_heights[i + 1..].iter().sum::<i64>()
            + (self.rows() - i - 1) as i64 * self.spacing.h();
        let p0 = Point::new(x, y);
        Rect::new(p0, p0 + Dims::new(self.col_widths[j], self.row_heights[i]))
    }

    pub(crate) fn generate(&self) -> Result<Group> {
        let mut group = Group::new();
        for i in 0..self.rows() {
            for j in 0..self.cols() {
                let Some(Some(tile)) = self.tiles.get(i, j) else {
                    continue;
                };
                let slot = self.cell(i, j);
                let mut tile = tile.draw_ref()?;
                match self.align {
                    CellAlign::Center => {
                        tile.set_center(slot.center());
                    }
                    CellAlign::LowerLeft => tile.align_corner(Corner::LowerLeft, slot.p0),
                }
                group.add_group(tile);
            }
        }
        Ok(group)
    }
}

impl Draw for GridPlacer {
    fn draw(self) -> Result<Group> {
        self.draw_ref()
    }
}

impl DrawRef for GridPlacer {
    fn draw_ref(&self) -> Result<Group> {
        self.generate()
    }
}

/// Sweeps a generator over two parameter lists.
///
/// Column `j` holds the tiles generated from `xs[j]` and row `i` those
/// generated from `ys[i]`, with the first row on top. Tiles are centered in
/// their slots.
pub fn gridsweep<X, Y, T, F>(xs: &[X], ys: &[Y], spacing: Dims, mut make: F) -> Result<Group>
where
    T: Into<Group>,
    F: FnMut(&X, &Y) -> Result<T>,
{
    let mut tiles = Grid::<Option<Group>>::new(ys.len(), xs.len());
    for (i, y) in ys.iter().enumerate() {
        for (j, x) in xs.iter().enumerate() {
            let tile = make(x, y)?.into();
            if let Some(slot) = tiles.get_mut(i, j) {
                *slot = Some(tile);
            }
        }
    }
    GridPlacer::new(tiles).spacing(spacing).draw()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::layers::GdsLayerSpec;

    const L1: GdsLayerSpec = GdsLayerSpec(1, 0);

    fn tile(w: i64, h: i64) -> Group {
        let mut group = Group::new();
        group.add_rect(L1, Rect::from_sides(0, 0, w, h));
        group
    }

    #[test]
    fn columns_and_rows_take_maximum_extent() {
        let placer = GridPlacer::from_tiles(
            [tile(10, 10), tile(30, 5), tile(20, 40), tile(5, 5)],
            2,
        )
        .spacing(Dims::new(2, 3));
        // Columns are 20 and 30 wide, rows 10 and 40 tall.
        assert_eq!(placer.cell(0, 0), Rect::from_sides(0, 43, 20, 53));
        assert_eq!(placer.cell(0, 1), Rect::from_sides(22, 43, 52, 53));
        assert_eq!(placer.cell(1, 0), Rect::from_sides(0, 0, 20, 40));

        let group = placer.draw().unwrap();
        assert_eq!(group.brect(), Rect::from_sides(0, 0, 52, 53));
    }

    #[test]
    fn incomplete_rows_leave_empty_slots() {
        let placer = GridPlacer::from_tiles([tile(10, 10), tile(10, 10), tile(10, 10)], 2)
            .align(CellAlign::LowerLeft);
        assert_eq!(placer.rows(), 2);
        let group = placer.draw().unwrap();
        assert_eq!(group.elements().count(), 3);
    }

    #[test]
    fn gridsweep_puts_first_row_on_top() {
        let group = gridsweep(&[10, 20], &[5, 50], Dims::new(0, 0), |&w, &h| {
            Ok::<_, crate::error::TftError>(tile(w, h))
        })
        .unwrap();
        let rects: Vec<Rect> = group
            .elements()
            .filter_map(|e| e.inner.as_rect())
            .collect();
        // The (10, 5) tile is centered in the top-left slot.
        assert_eq!(rects[0], Rect::from_sides(0, 50, 10, 55));
        assert_eq!(group.brect(), Rect::from_sides(0, 0, 30, 55));
    }
}
