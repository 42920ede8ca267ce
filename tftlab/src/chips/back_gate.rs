//! The three-mask back-gate chip.

use serde::{Deserialize, Serialize};
use tftgeom::bbox::BoundBox;
use tftgeom::transform::Translate;
use tftgeom::{um, Point};

use crate::component::Component;
use crate::config::BackGateSweeps;
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::devices::back_gate::{BgMimCap, BgMimCapParams, BgTransistor, BgTransistorParams};
use crate::error::Result;
use crate::layout::context::LayoutCtx;
use crate::layout::elements::marks::{
    AlignmentMark, AlignmentMarkParams, ResolutionTest, ResolutionTestParams,
};
use crate::layout::layers::{MESA, W1, W2};
use crate::layout::placement::align::AlignRect;
use crate::layout::placement::array::ArrayPlacer;

/// Raster pitch of the transistor array, in microns.
const TRANSISTOR_PITCH: f64 = 300.;
/// Raster pitch of the capacitor array, in microns.
const MIM_PITCH: f64 = 400.;
/// Lower left corner of the transistor array, in microns.
const ARRAY_ORIGIN: (f64, f64) = (3000., 3000.);
/// Distance of the resolution tests from the sample edge next to their mark, in microns.
const RESOLUTION_INSET: f64 = 300.;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackGateChipParams {
    #[serde(default)]
    pub sweeps: BackGateSweeps,
}

/// Transistor and capacitor arrays in the middle of the sample, with an
/// alignment mark and rotated resolution tests in each corner.
pub struct BackGateChip {
    params: BackGateChipParams,
}

/// Rotation of the alignment group in corner `i`.
///
/// Corners are visited lower left, lower right, upper left, upper right.
fn corner_rotation(i: usize) -> f64 {
    let i = i as f64;
    if i < 2. {
        90. * i
    } else {
        90. - 90. * i
    }
}

impl Component for BackGateChip {
    type Params = BackGateChipParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("back_gate_chip")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let s = &self.params.sweeps;

        let mut transistors = Vec::new();
        for &lov in s.l_overlap.iter() {
            for &wc in s.w_contact.iter() {
                for &lg in s.l_gate.iter() {
                    let mut params = BgTransistorParams::sweep(lg, lov, wc);
                    params.pad_size = s.pad_size;
                    transistors.push(ctx.instantiate::<BgTransistor>(&params)?);
                }
            }
        }
        let mut transistors = ArrayPlacer::new(
            um(s.array_w),
            um(s.array_margin),
            um(TRANSISTOR_PITCH),
        )
        .place(transistors)?;
        transistors
            .set_xmin(um(ARRAY_ORIGIN.0))
            .set_ymin(um(ARRAY_ORIGIN.1));

        let mims = s
            .l_mim
            .iter()
            .map(|&l_overlap| {
                ctx.instantiate::<BgMimCap>(&BgMimCapParams {
                    l_overlap,
                    pad_size: s.pad_size,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let mut mims =
            ArrayPlacer::new(um(s.array_w), um(s.array_margin), um(MIM_PITCH)).place(mims)?;
        mims.set_xmin(transistors.bbox().p0.x)
            .set_ymin(transistors.bbox().p1.y + um(100.));

        ctx.draw(transistors)?;
        ctx.draw(mims)?;
        self.corner_marks(ctx)?;
        Ok(())
    }
}

impl BackGateChip {
    fn corner_marks(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let s = &self.params.sweeps;
        let layers = [W1, W2, MESA]
            .iter()
            .map(|name| ctx.layer(name))
            .collect::<Result<Vec<_>>>()?;
        let sample_w = s.sample_w;
        let offset = s.alignment_offset;

        let (mut x_off, mut y_off) = (offset, offset);
        for i in 0..4 {
            let rotation = corner_rotation(i);
            let sign = if i / 2 == 0 { 1. } else { -1. };

            for (li, &layer) in layers.iter().enumerate() {
                let li = li as f64;
                for inverted in [true, false] {
                    let mut test = ctx.instantiate::<ResolutionTest>(&ResolutionTestParams {
                        resolutions: s.resolutions.clone(),
                        inverted,
                        layer,
                    })?;
                    test.rotate(rotation);
                    test.translate(Point::new(um(x_off), um(y_off)));

                    // Inverted tests run towards the middle of the edge, normal ones away from it.
                    let along = if inverted {
                        sample_w / 2. + 1000. * li + 500. - offset
                    } else {
                        sample_w / 2. - 1000. * li - 500. - offset
                    };
                    let shift = if i == 0 || i == 3 {
                        Point::new(um(sign * along), um(-sign * RESOLUTION_INSET))
                    } else {
                        Point::new(um(sign * RESOLUTION_INSET), um(sign * along))
                    };
                    test.translate(shift);
                    ctx.add_inst(test);
                }
            }

            let mut mark = ctx.instantiate::<AlignmentMark>(&AlignmentMarkParams {
                layers: layers.clone(),
            })?;
            mark.rotate(rotation);
            mark.translate(Point::new(um(x_off), um(y_off)));
            ctx.add_inst(mark);

            if i % 2 == 0 {
                x_off = sample_w - offset;
            } else {
                y_off = sample_w - offset;
                x_off = offset;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::layers::LayerSet;

    #[test]
    fn corners_are_rotated_towards_the_center() {
        let angles = (0..4).map(corner_rotation).collect::<Vec<_>>();
        assert_eq!(angles, vec![0., 90., -90., -180.]);
    }

    #[test]
    fn arrays_sit_inside_the_sample() {
        let ctx = MaskCtx::new(LayerSet::back_gate());
        let params = BackGateChipParams {
            sweeps: BackGateSweeps {
                l_gate: vec![5.],
                l_overlap: vec![2., 5.],
                w_contact: vec![10.],
                l_mim: vec![50.],
                ..Default::default()
            },
        };
        let inst = ctx.instantiate_layout::<BackGateChip>(&params).unwrap();
        let cell = inst.cell();
        // Two transistors, one capacitor, four marks and 24 resolution tests.
        assert_eq!(cell.insts().count(), 2 + 1 + 4 + 24);
        let bbox = cell.bbox();
        assert!(bbox.p0.x > 0 && bbox.p0.y > 0);
        assert!(bbox.p1.x < um(10000.) && bbox.p1.y < um(10000.));
    }
}
