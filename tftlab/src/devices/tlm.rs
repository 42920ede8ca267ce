//! Transfer length method structures.

use serde::{Deserialize, Serialize};
use tftgeom::bbox::BoundBox;
use tftgeom::boolean::Region;
use tftgeom::{um, Dims, Point, Rect, Shape};

use super::caps::COVER_MARGIN;
use super::{dims_um, name_num};
use crate::component::Component;
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::layout::context::LayoutCtx;
use crate::layout::elements::shapes::{Circle, FlagShape, Flagpole};
use crate::layout::elements::text::{fmt_num, Text};
use crate::layout::group::Group;
use crate::layout::layers::{GATE, MESA, SOURCEDRAIN, VIA};
use crate::layout::placement::align::AlignRect;
use crate::layout::placement::pack::pack;
use crate::layout::Draw;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RectTlmParams {
    /// Length of each metal contact on the semiconductor.
    pub contact_l: f64,
    /// Gap between the two contacts of each pair.
    pub spacings: Vec<f64>,
    /// Width of the contacts and the semiconductor strip.
    pub contact_w: f64,
    pub via_layer: String,
    pub finger_layer: String,
    pub pad_layer: String,
    pub mesa_layer: String,
    /// Layer of the optional back gate.
    pub gate_layer: Option<String>,
    pub cover_bottom: bool,
    pub pad_size: (f64, f64),
}

impl Default for RectTlmParams {
    fn default() -> Self {
        Self {
            contact_l: 10.,
            spacings: vec![10., 10., 20., 50., 80., 100., 200.],
            contact_w: 100.,
            via_layer: VIA.to_string(),
            finger_layer: SOURCEDRAIN.to_string(),
            pad_layer: SOURCEDRAIN.to_string(),
            mesa_layer: MESA.to_string(),
            gate_layer: Some(GATE.to_string()),
            cover_bottom: true,
            pad_size: (80., 80.),
        }
    }
}

/// Pairs of flag-shaped contacts on a common semiconductor strip.
///
/// A gated structure whose gate shares the finger layer cannot be built and
/// comes out empty.
pub struct RectTlm {
    params: RectTlmParams,
}

impl Component for RectTlm {
    type Params = RectTlmParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        let p = &self.params;
        arcstr::format!(
            "rect_tlm_{}_{}_{}_{}{}",
            name_num(p.contact_l),
            name_num(p.contact_w),
            p.finger_layer,
            p.mesa_layer,
            p.gate_layer
                .as_ref()
                .map(|g| format!("_{g}"))
                .unwrap_or_default()
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        if p.gate_layer.as_deref() == Some(p.finger_layer.as_str()) {
            return Ok(());
        }
        let via = ctx.layer(&p.via_layer)?;
        let finger = ctx.layer(&p.finger_layer)?;
        let pad_layer = ctx.layer(&p.pad_layer)?;
        let mesa_layer = ctx.layer(&p.mesa_layer)?;
        let gate_layer = p.gate_layer.as_deref().map(|g| ctx.layer(g)).transpose()?;

        let pad = dims_um(p.pad_size);
        let cl = um(p.contact_l);
        let cw = um(p.contact_w);
        // Fingers on a metal below the vias need openings to be probed.
        let finger_below = finger.layer() < via.layer();

        let mut xoff = 0;
        for &space in &p.spacings {
            let fp_w = um(space) + 2 * cl;
            let stub_h = um(p.contact_w * 1.2 + 10.);
            for shape in [FlagShape::P, FlagShape::D] {
                let mut fp = Flagpole {
                    size: Dims::new(fp_w, pad.h()),
                    stub_size: Dims::new(cl, stub_h),
                    shape,
                    layer: finger,
                }
                .draw()?;
                match shape {
                    FlagShape::P => {
                        fp.set_ymin(-cw / 2 - um(5.)).set_xmin(xoff + um(50.));
                    }
                    FlagShape::D => {
                        fp.set_ymax(cw / 2 + um(5.)).set_xmax(xoff);
                    }
                }
                let fr = fp.brect();
                xoff = fr.right();
                ctx.draw(fp)?;

                if finger_below {
                    let via_x = match shape {
                        FlagShape::P => fr.left() + cl / 2,
                        FlagShape::D => fr.right() - cl / 2,
                    };
                    ctx.draw_rect(
                        via,
                        Rect::centered(Point::new(via_x, 0), Dims::new(cl, cw + um(10.))),
                    );
                    if p.pad_layer != p.finger_layer {
                        let mut pad_via = Rect::with_dims(Dims::new(fp_w, pad.h()));
                        pad_via.set_xmax(fr.right());
                        match shape {
                            FlagShape::P => pad_via.set_ymax(fr.top()),
                            FlagShape::D => pad_via.set_ymin(fr.bottom()),
                        };
                        ctx.draw_rect(via, pad_via);
                        if p.cover_bottom {
                            ctx.draw_rect(pad_layer, pad_via.expand(um(COVER_MARGIN / 2.)));
                        }
                    }
                }
            }

            let mut label = Text::new(fmt_num(space), finger).draw()?;
            label
                .set_xmin(xoff + um(5.))
                .set_ymin(-stub_h / 2 - pad.h() + um(10.));
            if let Some(gate) = gate_layer {
                ctx.draw(label.with_layer(gate))?;
            }
            ctx.draw(label)?;
        }

        let tlm = ctx.brect();
        let mut mesa = Rect::with_dims(Dims::new(tlm.width() + um(50.), cw));
        mesa.set_center(Point::new(tlm.center().x, 0));

        if let Some(gate) = gate_layer {
            let mut gate_rect = Rect::with_dims(Dims::new(mesa.width() + um(10.), cw + um(10.)));
            gate_rect.set_xmin(mesa.left() - um(5.)).set_center_y(0);
            let mut gate_pad = Rect::with_dims(Dims::new(tlm.width(), pad.h()));
            gate_pad
                .set_center_x(tlm.center().x)
                .set_ymin(tlm.top() + um(10.));
            let first = p.spacings.first().copied().unwrap_or_default();
            let mut gate_wire = Rect::with_dims(Dims::new(um(40.), tlm.height() / 2));
            gate_wire
                .set_xmin(tlm.left() + 2 * cl + um(first) + um(5.))
                .set_ymin(gate_rect.top() - um(10.));

            ctx.draw_rect(gate, gate_rect);
            ctx.draw_rect(gate, gate_pad);
            ctx.draw_rect(gate, gate_wire);
            ctx.draw_rect(via, gate_pad);
            if p.cover_bottom {
                ctx.draw_rect(pad_layer, gate_pad.expand(um(COVER_MARGIN / 2.)));
            }
        }

        ctx.draw_rect(mesa_layer, mesa);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircTlmParams {
    pub pad_radius: f64,
    /// Gap between the inner pad and the surrounding contact.
    pub spacings: Vec<f64>,
    pub pad_layer: String,
    pub mesa_layer: String,
}

impl Default for CircTlmParams {
    fn default() -> Self {
        Self {
            pad_radius: 40.,
            spacings: vec![1., 2., 3., 5., 10., 15., 20., 30., 50., 80., 100., 200.],
            pad_layer: SOURCEDRAIN.to_string(),
            mesa_layer: MESA.to_string(),
        }
    }
}

/// Circular TLM: round pads inside a common contact plane.
///
/// The contact plane covers a rectangle around all pads except an annulus
/// of width `spacing` around each pad.
pub struct CircTlm {
    params: CircTlmParams,
}

impl Component for CircTlm {
    type Params = CircTlmParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("circ_tlm_{}", name_num(self.params.pad_radius))
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let pad_layer = ctx.layer(&p.pad_layer)?;
        let mesa_layer = ctx.layer(&p.mesa_layer)?;

        let rings = p
            .spacings
            .iter()
            .map(|&space| {
                let outer = p.pad_radius + space;
                let mut ring = Circle {
                    radius: um(outer),
                    layer: mesa_layer,
                }
                .draw()?;
                ring.add_group(
                    Circle {
                        radius: um(p.pad_radius),
                        layer: pad_layer,
                    }
                    .draw()?,
                );
                let mut label = Text::new(
                    format!("R={},{}", fmt_num(outer), fmt_num(p.pad_radius)),
                    mesa_layer,
                )
                .draw()?;
                label.set_center_x(0).set_ymax(-um(outer) - um(10.));
                ring.add_group(label);
                Ok(ring)
            })
            .collect::<Result<Vec<Group>>>()?;

        let cuts = pack(rings, um(50.), 2.)?;
        let frame = cuts.brect().expand(um(50.));

        let cut_shapes: Vec<Shape> = cuts.elements().map(|e| e.inner).collect();
        let inner = Region::from_shapes(cuts.shapes_on(pad_layer).iter());
        let contact = Region::from_rect(frame)
            .difference(&Region::from_shapes(cut_shapes.iter()))
            .union(&inner);

        ctx.draw_rect(mesa_layer, frame);
        ctx.draw_region(pad_layer, &contact);
        Ok(())
    }
}
