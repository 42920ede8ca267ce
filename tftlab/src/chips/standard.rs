//! A 3x3 array of test chips.

use serde::{Deserialize, Serialize};
use tftgeom::bbox::BoundBox;
use tftgeom::transform::Translate;
use tftgeom::{um, Point};

use super::test_chip::{TestChip, TestChipParams};
use crate::component::Component;
use crate::config::StandardSweeps;
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::layout::context::LayoutCtx;
use crate::layout::elements::text::Text;
use crate::layout::layers::GATE;
use crate::layout::placement::align::AlignRect;

/// Distance between neighboring chips, in microns.
pub const CHIP_PITCH: f64 = 10000.;
/// Number of chips along each side of the array.
pub const ARRAY_SIZE: usize = 3;
const LABEL_SIZE: f64 = 400.;
/// Label position relative to the lower left corner of each chip.
const LABEL_OFFSET: (f64, f64) = (2300., 500.);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardTestStructuresParams {
    #[serde(default)]
    pub sweeps: StandardSweeps,
}

/// Test chips on a checkerboard of cover options.
///
/// Chip `(i, j)` (column, row from the bottom) covers its bottom electrodes
/// when `i + j` is odd and is labelled with a row letter counted from the
/// top and a column number, so the top left chip is `A1`.
pub struct StandardTestStructures {
    params: StandardTestStructuresParams,
}

/// The label of the chip in column `i` and row `j`, counting rows from the bottom.
pub fn chip_label(i: usize, j: usize) -> String {
    let row = (b'A' + (ARRAY_SIZE - 1 - j) as u8) as char;
    format!("{}{}", row, i + 1)
}

impl Component for StandardTestStructures {
    type Params = StandardTestStructuresParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("top")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let gate = ctx.layer(GATE)?;

        for j in 0..ARRAY_SIZE {
            for i in 0..ARRAY_SIZE {
                let cover_bottom = (i + j) % 2 == 1;
                let mut chip = ctx.instantiate::<TestChip>(&TestChipParams {
                    cover_bottom,
                    sweeps: self.params.sweeps.clone(),
                })?;
                chip.set_center(Point::zero());
                if cover_bottom {
                    chip.translate(Point::new(0, um(0.5)));
                }
                chip.translate(Point::new(
                    um(CHIP_PITCH * i as f64),
                    um(CHIP_PITCH * j as f64),
                ));

                let corner = chip.bbox().p0;
                ctx.text(
                    Text::new(chip_label(i, j), gate)
                        .with_size(um(LABEL_SIZE))
                        .with_loc(corner + Point::new(um(LABEL_OFFSET.0), um(LABEL_OFFSET.1))),
                )?;
                ctx.add_inst(chip);
            }
        }

        let center = ctx.brect().center();
        ctx.set_origin(center);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_count_rows_from_the_top() {
        assert_eq!(chip_label(0, 2), "A1");
        assert_eq!(chip_label(2, 2), "A3");
        assert_eq!(chip_label(1, 0), "C2");
    }
}
