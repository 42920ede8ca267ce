//! Bottom-gate thin-film transistors and gateless ITO resistors.

use serde::{Deserialize, Serialize};
use tftgeom::{um, Dims, Point, Rect};

use super::caps::COVER_MARGIN;
use super::{dims_um, draw_label, name_num, DEFAULT_PAD_SIZE};
use crate::component::Component;
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::layout::context::LayoutCtx;
use crate::layout::elements::text::{fmt_num, Text};
use crate::layout::layers::{GATE, MESA, SOURCEDRAIN, VIA};
use crate::layout::placement::align::AlignRect;
use crate::layout::Draw;

/// Rectangles making up a transistor and its three pads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransistorCore {
    pub(crate) mesa: Rect,
    pub(crate) gate: Rect,
    pub(crate) source: Rect,
    pub(crate) drain: Rect,
    pub(crate) gate_pad: Rect,
    pub(crate) source_pad: Rect,
    pub(crate) drain_pad: Rect,
}

impl TransistorCore {
    /// Lays out the core around a mesa centered on the origin.
    ///
    /// The gate is `gate_extension` wider than the mesa. A gate length of
    /// zero yields a placeholder gate spanning the whole mesa, which only
    /// serves as a reference for the source and drain.
    pub(crate) fn new(
        l_mesa: f64,
        l_gate: f64,
        l_overlap: f64,
        w_mesa: f64,
        w_contact: f64,
        gate_extension: f64,
        pad: Dims,
    ) -> Self {
        let lov = um(l_overlap);
        let mesa = Rect::centered(Point::zero(), Dims::from_um(l_mesa, w_mesa));
        let gate_l = if l_gate != 0. {
            l_gate + 2. * l_overlap
        } else {
            l_mesa
        };
        let gate = Rect::centered(
            Point::zero(),
            Dims::from_um(gate_l, w_mesa + gate_extension),
        );

        let contact = Dims::from_um((l_mesa - l_gate) / 2. + 5., w_contact);
        let mut source = Rect::with_dims(contact);
        source
            .set_xmax(gate.left() + lov)
            .set_center_y(gate.center().y);
        let mut drain = Rect::with_dims(contact);
        drain
            .set_xmin(gate.right() - lov)
            .set_center_y(gate.center().y);

        let mut gate_pad = Rect::with_dims(pad);
        gate_pad.set_xmax(gate.right()).set_ymin(gate.top());
        let mut source_pad = Rect::with_dims(pad);
        source_pad.set_xmax(source.left()).set_ymax(source.top());
        let mut drain_pad = Rect::with_dims(pad);
        drain_pad.set_xmin(drain.right()).set_ymax(drain.top());

        Self {
            mesa,
            gate,
            source,
            drain,
            gate_pad,
            source_pad,
            drain_pad,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransistorParams {
    pub l_mesa: f64,
    /// Gate length. Zero draws no gate, leaving a two-terminal resistor.
    pub l_gate: f64,
    /// Overlap of the gate with the source and drain.
    pub l_overlap: f64,
    pub w_mesa: f64,
    pub w_contact: f64,
    pub cover_bottom: bool,
    pub pad_size: (f64, f64),
}

impl Default for TransistorParams {
    fn default() -> Self {
        Self {
            l_mesa: 8.,
            l_gate: 2.,
            l_overlap: 2.,
            w_mesa: 12.,
            w_contact: 10.,
            cover_bottom: true,
            pad_size: DEFAULT_PAD_SIZE,
        }
    }
}

impl TransistorParams {
    /// A sweep transistor: the mesa stops 0.5 um short of each gate edge
    /// and the contacts are 4 um wider than the mesa.
    pub fn sweep(l_gate: f64, l_overlap: f64, w: f64, cover_bottom: bool) -> Self {
        Self {
            l_mesa: 2. * l_overlap + l_gate - 1.,
            l_gate,
            l_overlap,
            w_mesa: w,
            w_contact: w + 4.,
            cover_bottom,
            pad_size: DEFAULT_PAD_SIZE,
        }
    }

    /// A gateless ITO resistor of channel length `l` and width `w`.
    pub fn ito_resistor(l: f64, w: f64) -> Self {
        Self {
            l_mesa: l + 100.,
            l_gate: 0.,
            l_overlap: 50.,
            w_mesa: w,
            w_contact: w + 2.,
            cover_bottom: false,
            pad_size: DEFAULT_PAD_SIZE,
        }
    }

    #[inline]
    pub fn is_gated(&self) -> bool {
        self.l_gate != 0.
    }
}

/// A bottom-gate transistor with gate, source, and drain pads.
pub struct Transistor {
    params: TransistorParams,
}

impl Component for Transistor {
    type Params = TransistorParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        let p = &self.params;
        arcstr::format!(
            "transistor_{}_{}_{}_{}_{}",
            name_num(p.l_mesa),
            name_num(p.l_gate),
            name_num(p.l_overlap),
            name_num(p.w_mesa),
            name_num(p.w_contact)
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let gate_layer = ctx.layer(GATE)?;
        let via = ctx.layer(VIA)?;
        let sd = ctx.layer(SOURCEDRAIN)?;
        let mesa = ctx.layer(MESA)?;

        let core = TransistorCore::new(
            p.l_mesa,
            p.l_gate,
            p.l_overlap,
            p.w_mesa,
            p.w_contact,
            20.,
            dims_um(p.pad_size),
        );

        if p.is_gated() {
            ctx.draw_rect(gate_layer, core.gate);
        }
        ctx.draw_rect(sd, core.source);
        ctx.draw_rect(sd, core.drain);
        ctx.draw_rect(mesa, core.mesa);

        if p.is_gated() {
            ctx.draw_rect(gate_layer, core.gate_pad);
            ctx.draw_rect(via, core.gate_pad);
            if p.cover_bottom {
                ctx.draw_rect(sd, core.gate_pad.expand(um(COVER_MARGIN / 2.)));
                let mut conn = Rect::with_dims(Dims::from_um(
                    p.l_gate + 2. * p.l_overlap + COVER_MARGIN,
                    COVER_MARGIN,
                ));
                conn.set_center_x(core.gate.center().x)
                    .set_ymax(core.gate.top());
                ctx.draw_rect(sd, conn);
            }
        }
        ctx.draw_rect(sd, core.source_pad);
        ctx.draw_rect(sd, core.drain_pad);

        let label = if p.is_gated() {
            let mut label = Text::new(
                format!(
                    "W/Lg/Lov\n{}/{}/{}",
                    fmt_num(p.w_mesa),
                    fmt_num(p.l_gate),
                    fmt_num(p.l_overlap)
                ),
                gate_layer,
            )
            .draw()?;
            label.set_center(Point::new(
                core.drain_pad.center().x,
                core.gate_pad.center().y,
            ));
            label
        } else {
            let mut label = Text::new(
                format!(
                    "W/L\n{}/{}",
                    fmt_num(p.w_mesa),
                    fmt_num(p.l_mesa - 2. * p.l_overlap)
                ),
                gate_layer,
            )
            .draw()?;
            label
                .set_center_x(core.mesa.center().x)
                .set_ymin(core.drain_pad.top() + um(10.));
            label
        };
        draw_label(ctx, label)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tftgeom::bbox::BoundBox;

    use super::*;
    use crate::layout::layers::{GdsLayerSpec, LayerSet};

    #[test]
    fn core_contacts_overlap_gate() {
        let core = TransistorCore::new(8., 2., 2., 12., 10., 20., Dims::from_um(100., 100.));
        assert_eq!(core.gate, Rect::from_sides(-um(3.), -um(16.), um(3.), um(16.)));
        // Each contact reaches `l_overlap` past the gate edge.
        assert_eq!(core.source.right(), -um(1.));
        assert_eq!(core.drain.left(), um(1.));
        assert_eq!(core.source.width(), um(8.));
        assert_eq!(core.gate_pad.right(), core.gate.right());
        assert_eq!(core.gate_pad.bottom(), core.gate.top());
        assert_eq!(core.source_pad.right(), core.source.left());
        assert_eq!(core.drain_pad.top(), core.drain.top());
    }

    #[test]
    fn ito_resistor_has_no_gate() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let params = TransistorParams::ito_resistor(10., 5.);
        let inst = ctx.instantiate_layout::<Transistor>(&params).unwrap();
        let via = inst.shapes_on(GdsLayerSpec(2, 0));
        assert!(via.is_empty());
        // Only the label is on the gate layer.
        let gate_bbox = inst
            .shapes_on(GdsLayerSpec(1, 0))
            .iter()
            .fold(tftgeom::bbox::Bbox::empty(), |acc, s| acc.union(s.bbox()));
        assert!(gate_bbox.height() < um(30.));
    }

    #[test]
    fn sweep_transistor_draws_gate_pad_and_cover() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let params = TransistorParams::sweep(2., 1., 10., true);
        assert_eq!(params.l_mesa, 3.);
        let inst = ctx.instantiate_layout::<Transistor>(&params).unwrap();
        let vias = inst.shapes_on(GdsLayerSpec(2, 0));
        assert_eq!(vias.len(), 1);
        let cover = inst
            .shapes_on(GdsLayerSpec(3, 0))
            .into_iter()
            .filter_map(|s| s.as_rect())
            .any(|r| r.dims() == Dims::from_um(102., 102.));
        assert!(cover);
    }
}
