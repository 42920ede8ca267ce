//! Alignment marks and lithography resolution tests.

use serde::{Deserialize, Serialize};
use tftgeom::bbox::BoundBox;
use tftgeom::transform::Translate;
use tftgeom::{um, Point, Rect};

use super::shapes::Cross;
use super::text::{fmt_num, Text};
use crate::component::Component;
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::{ErrorSource, Result};
use crate::layout::context::LayoutCtx;
use crate::layout::group::Group;
use crate::layout::layers::GdsLayerSpec;
use crate::layout::placement::align::AlignRect;
use crate::layout::DrawRef;

/// Tip-to-tip length of an alignment cross, in microns.
const MARK_LENGTH: f64 = 200.;
/// Arm width of an alignment cross, in microns.
const MARK_ARM: f64 = 10.;
/// Clearance between the cross and the corner boxes, in microns.
const MARK_GAP: f64 = 2.;
/// Horizontal distance between neighboring marks, in microns.
const MARK_SPACING: f64 = 100.;
const MARK_LABEL_SIZE: f64 = 40.;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AlignmentMarkParams {
    /// Layers in exposure order. Every consecutive pair gets one mark.
    pub layers: Vec<GdsLayerSpec>,
}

/// A row of cross-in-boxes alignment marks.
///
/// For each consecutive pair of layers, the cross is drawn on the first layer
/// and four corner boxes on the second.
pub struct AlignmentMark {
    params: AlignmentMarkParams,
}

impl Component for AlignmentMark {
    type Params = AlignmentMarkParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        if params.layers.len() < 2 {
            return Err(ErrorSource::InvalidArgs(format!(
                "alignment marks need at least two layers, got {}",
                params.layers.len()
            ))
            .into());
        }
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        let layers = self
            .params
            .layers
            .iter()
            .map(|l| l.layer().to_string())
            .collect::<Vec<_>>()
            .join("_");
        arcstr::format!("alignment_mark_{}", layers)
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let pitch = um(MARK_LENGTH + MARK_SPACING);
        for (i, pair) in self.params.layers.windows(2).enumerate() {
            let mut mark = alignment_pair(pair[0], pair[1])?;
            mark.translate(Point::new(i as i64 * pitch, 0));
            ctx.draw(mark)?;
        }
        Ok(())
    }
}

fn alignment_pair(first: GdsLayerSpec, second: GdsLayerSpec) -> Result<Group> {
    let mut group = Group::new();
    let cross = Cross {
        length: um(MARK_LENGTH),
        width: um(MARK_ARM),
        layer: first,
    };
    group.add_group(cross.draw_ref()?);

    let inner = um(MARK_ARM / 2. + MARK_GAP);
    let outer = um(MARK_LENGTH / 2.);
    for (sx, sy) in [(1, 1), (-1, 1), (-1, -1), (1, -1)] {
        group.add_rect(
            second,
            Rect::new(
                Point::new(sx * inner, sy * inner),
                Point::new(sx * outer, sy * outer),
            ),
        );
    }

    let mut label = Text::new(second.layer().to_string(), second)
        .with_size(um(MARK_LABEL_SIZE))
        .draw_ref()?;
    label.set_center_x(0);
    label.set_ymax(-outer - um(20.));
    group.add_group(label);
    Ok(group)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolutionTestParams {
    /// Line widths in microns.
    pub resolutions: Vec<f64>,
    /// Draw the frame around the lines instead of the lines themselves.
    pub inverted: bool,
    pub layer: GdsLayerSpec,
}

/// Groups of five lines at each resolution, labelled with the line width.
pub struct ResolutionTest {
    params: ResolutionTestParams,
}

/// Number of lines per resolution.
const NUM_LINES: usize = 5;
/// Space between resolution groups, in microns.
const GROUP_SPACING: f64 = 20.;
/// Margin of the inverted frame, in microns.
const FRAME_MARGIN: f64 = 10.;

impl Component for ResolutionTest {
    type Params = ResolutionTestParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        if params.resolutions.iter().any(|r| *r <= 0.) {
            return Err(ErrorSource::InvalidArgs(
                "resolutions must be positive".to_string(),
            )
            .into());
        }
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        let res = self
            .params
            .resolutions
            .iter()
            .map(|r| fmt_num(*r))
            .collect::<Vec<_>>()
            .join("_");
        let tone = if self.params.inverted { "inv" } else { "pos" };
        arcstr::format!(
            "resolution_test_{}_{}_{}",
            self.params.layer.layer(),
            tone,
            res
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let layer = self.params.layer;
        let mut x = 0;
        for &res in self.params.resolutions.iter() {
            let mut group = Group::new();
            let w = um(res);
            for k in 0..NUM_LINES as i64 {
                group.add_rect(
                    layer,
                    Rect::from_sides(2 * k * w, 0, 2 * k * w + w, 20 * w),
                );
            }
            let lines = group.brect();
            let mut label = Text::new(fmt_num(res), layer).draw_ref()?;
            label.set_center_x(lines.center().x);
            label.set_ymin(lines.top() + um(5.));
            group.add_group(label);

            group.set_xmin(x);
            x = group.brect().right() + um(GROUP_SPACING);
            ctx.draw(group)?;
        }

        if self.params.inverted {
            let frame = ctx.brect().expand(um(FRAME_MARGIN));
            ctx.invert_layer(layer, frame);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::layout::layers::LayerSet;

    #[test]
    fn alignment_mark_needs_two_layers() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let params = AlignmentMarkParams {
            layers: vec![GdsLayerSpec(1, 0)],
        };
        assert!(ctx.instantiate_layout::<AlignmentMark>(&params).is_err());
    }

    #[test]
    fn alignment_mark_row_has_one_mark_per_pair() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let params = AlignmentMarkParams {
            layers: vec![GdsLayerSpec(1, 0), GdsLayerSpec(2, 0), GdsLayerSpec(3, 0)],
        };
        let inst = ctx.instantiate_layout::<AlignmentMark>(&params).unwrap();
        let cell = inst.cell();
        // One cross on layer 1 and one on layer 2.
        assert_eq!(cell.shapes_on(GdsLayerSpec(1, 0)).len(), 1);
        let bbox = cell.bbox();
        assert_eq!(bbox.p0.x, -um(MARK_LENGTH / 2.));
        assert_eq!(
            bbox.p1.x,
            um(MARK_LENGTH + MARK_SPACING) + um(MARK_LENGTH / 2.)
        );
    }

    #[test]
    fn inverted_resolution_test_is_frame_minus_lines() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let layer = GdsLayerSpec(2, 0);
        let normal = ResolutionTestParams {
            resolutions: vec![2.],
            inverted: false,
            layer,
        };
        let inverted = ResolutionTestParams {
            inverted: true,
            ..normal.clone()
        };
        let pos = ctx.instantiate_layout::<ResolutionTest>(&normal).unwrap();
        let neg = ctx.instantiate_layout::<ResolutionTest>(&inverted).unwrap();

        let drawn = pos.cell().layer_region(layer).area();
        let frame = pos.cell().brect().expand(um(FRAME_MARGIN)).area() as f64;
        let inv = neg.cell().layer_region(layer).area();
        assert_float_eq!(inv, frame - drawn, r2nd <= 1e-9);
    }
}
