//! Parametrized test devices.
//!
//! Every device takes its dimensions in microns. Labelled devices draw their
//! label on one layer and copy it onto the source/drain layer.

use tftgeom::{um, Dims};

use crate::error::Result;
use crate::layout::context::LayoutCtx;
use crate::layout::group::Group;
use crate::layout::layers::{GdsLayerSpec, SOURCEDRAIN};

pub mod back_gate;
pub mod caps;
pub mod pads;
pub mod resistor;
pub mod steps;
pub mod tlm;
pub mod transistor;
pub mod vdp;
pub mod via;

/// The default probe pad size, in microns.
pub const DEFAULT_PAD_SIZE: (f64, f64) = (100., 100.);

#[inline]
pub(crate) fn dims_um(size: (f64, f64)) -> Dims {
    Dims::from_um(size.0, size.1)
}

/// Half of a length, for centering.
#[inline]
pub(crate) fn half(value: f64) -> i64 {
    um(value / 2.)
}

/// Formats a number for use in a cell name.
pub(crate) fn name_num(value: f64) -> String {
    crate::layout::elements::text::fmt_num(value)
        .replace('.', "p")
        .replace('-', "m")
}

/// Draws `label`, then a copy of it on the source/drain layer.
pub(crate) fn draw_label(ctx: &mut LayoutCtx, label: Group) -> Result<()> {
    let sd = ctx.layer(SOURCEDRAIN)?;
    draw_label_on(ctx, label, sd)
}

/// Draws `label`, then a copy of it on `copy_layer`.
pub(crate) fn draw_label_on(
    ctx: &mut LayoutCtx,
    label: Group,
    copy_layer: GdsLayerSpec,
) -> Result<()> {
    let copy = label.with_layer(copy_layer);
    ctx.draw(label)?;
    ctx.draw(copy)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_name_numbers() {
        assert_eq!(name_num(10.), "10");
        assert_eq!(name_num(1.5), "1p5");
        assert_eq!(name_num(-45.), "m45");
    }
}
