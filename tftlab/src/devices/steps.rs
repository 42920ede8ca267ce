//! Profilometer targets for measuring film thicknesses.

use tftgeom::{um, Dims, Point, Rect};

use crate::component::{Component, NoParams};
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::layout::context::LayoutCtx;
use crate::layout::layers::{GATE, MESA, SOURCEDRAIN, VIA};

/// Side of each step target, in microns.
const STEP: f64 = 50.;
/// Center-to-center distance of neighboring targets, in microns.
const STEP_PITCH: f64 = 100.;

/// Isolated squares of each layer, plus a gate square under a larger via
/// opening.
///
/// The top row holds gate, via, and gate under via; the bottom row holds
/// source/drain and mesa.
pub struct StepHeights;

impl Component for StepHeights {
    type Params = NoParams;

    fn new(_params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self)
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("step_heights")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let gate = ctx.layer(GATE)?;
        let via = ctx.layer(VIA)?;
        let sd = ctx.layer(SOURCEDRAIN)?;
        let mesa = ctx.layer(MESA)?;

        let square = Dims::square(um(STEP));
        let pitch = um(STEP_PITCH);
        let origin = Rect::with_dims(square).center();
        let at = |i: i64, j: i64| Point::new(origin.x + i * pitch, origin.y - j * pitch);

        ctx.draw_rect(gate, Rect::centered(at(0, 0), square));
        ctx.draw_rect(via, Rect::centered(at(1, 0), square));
        ctx.draw_rect(gate, Rect::centered(at(2, 0), square));
        ctx.draw_rect(via, Rect::centered(at(2, 0), Dims::square(um(STEP + 10.))));
        ctx.draw_rect(sd, Rect::centered(at(0, 1), square));
        ctx.draw_rect(mesa, Rect::centered(at(1, 1), square));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tftgeom::bbox::BoundBox;

    use super::*;
    use crate::layout::layers::{GdsLayerSpec, LayerSet};

    #[test]
    fn step_heights_layout() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let inst = ctx.instantiate_layout::<StepHeights>(&NoParams).unwrap();
        assert_eq!(
            inst.bbox().into_rect(),
            Rect::from_sides(0, -um(100.), um(255.), um(55.))
        );
        let vias = inst.shapes_on(GdsLayerSpec(2, 0));
        assert_eq!(vias.len(), 2);
        assert_eq!(
            inst.shapes_on(GdsLayerSpec(4, 0))[0].as_rect(),
            Some(Rect::from_sides(um(100.), -um(100.), um(150.), -um(50.)))
        );
    }
}
