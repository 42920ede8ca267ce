//! Devices for the three-mask back-gate process.
//!
//! The process has no via layer: the gate metal `w1` is probed directly and
//! `w2` forms the source and drain. Layers with an even GDS number are
//! written in positive tone, so within each device area their drawn shapes
//! are replaced by the area around them.

use serde::{Deserialize, Serialize};
use tftgeom::{um, Dims, Point, Rect};

use super::transistor::TransistorCore;
use super::{dims_um, draw_label_on, name_num, DEFAULT_PAD_SIZE};
use crate::component::Component;
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::layout::context::LayoutCtx;
use crate::layout::elements::text::{fmt_num, Text};
use crate::layout::layers::{GdsLayerSpec, Tone, MESA, W1, W2};
use crate::layout::placement::align::AlignRect;
use crate::layout::Draw;

/// Margin of the device area around the drawn shapes, in microns.
pub const DEVICE_MARGIN: f64 = 5.;

/// Inverts every positive-tone layer in `layers` within the device area.
pub(crate) fn apply_tone(ctx: &mut LayoutCtx, layers: &[GdsLayerSpec]) {
    let area = ctx.brect().expand(um(DEVICE_MARGIN));
    for &layer in layers {
        if layer.tone() == Tone::Positive {
            ctx.invert_layer(layer, area);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BgTransistorParams {
    pub l_mesa: f64,
    pub l_gate: f64,
    pub l_overlap: f64,
    pub w_mesa: f64,
    pub w_contact: f64,
    pub pad_size: (f64, f64),
}

impl Default for BgTransistorParams {
    fn default() -> Self {
        Self {
            l_mesa: 8.,
            l_gate: 2.,
            l_overlap: 2.,
            w_mesa: 12.,
            w_contact: 10.,
            pad_size: DEFAULT_PAD_SIZE,
        }
    }
}

impl BgTransistorParams {
    /// An array transistor: the mesa extends 1 um past each gate overlap
    /// and is 2 um wider than the contacts.
    pub fn sweep(l_gate: f64, l_overlap: f64, w_contact: f64) -> Self {
        Self {
            l_mesa: 2. * l_overlap + l_gate + 2.,
            l_gate,
            l_overlap,
            w_mesa: w_contact + 2.,
            w_contact,
            pad_size: DEFAULT_PAD_SIZE,
        }
    }
}

/// A back-gated transistor drawn on `w1`, `w2`, and `mesa`.
pub struct BgTransistor {
    params: BgTransistorParams,
}

impl Component for BgTransistor {
    type Params = BgTransistorParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        let p = &self.params;
        arcstr::format!(
            "bg_transistor_{}_{}_{}_{}_{}",
            name_num(p.l_mesa),
            name_num(p.l_gate),
            name_num(p.l_overlap),
            name_num(p.w_mesa),
            name_num(p.w_contact)
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let w1 = ctx.layer(W1)?;
        let w2 = ctx.layer(W2)?;
        let mesa = ctx.layer(MESA)?;

        let core = TransistorCore::new(
            p.l_mesa,
            p.l_gate,
            p.l_overlap,
            p.w_mesa,
            p.w_contact,
            10.,
            dims_um(p.pad_size),
        );
        ctx.draw_rect(w1, core.gate);
        ctx.draw_rect(w1, core.gate_pad);
        for rect in [core.source, core.drain, core.source_pad, core.drain_pad] {
            ctx.draw_rect(w2, rect);
        }
        ctx.draw_rect(mesa, core.mesa);

        let mut label = Text::new(
            format!(
                "W/Lg/Lov\n{}/{}/{}",
                fmt_num(p.w_contact),
                fmt_num(p.l_gate),
                fmt_num(p.l_overlap)
            ),
            w1,
        )
        .draw()?;
        label.set_center(Point::new(
            core.drain_pad.center().x,
            core.gate_pad.center().y,
        ));
        draw_label_on(ctx, label, w2)?;

        apply_tone(ctx, &[w1, w2, mesa]);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BgMimCapParams {
    pub l_overlap: f64,
    pub pad_size: (f64, f64),
}

impl Default for BgMimCapParams {
    fn default() -> Self {
        Self {
            l_overlap: 100.,
            pad_size: DEFAULT_PAD_SIZE,
        }
    }
}

/// Two pads on `w1` and `w2`, each extended by the overlap length so that
/// they overlap over a full pad height.
pub struct BgMimCap {
    params: BgMimCapParams,
}

impl Component for BgMimCap {
    type Params = BgMimCapParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!(
            "bg_mim_cap_{}_{}",
            name_num(self.params.l_overlap),
            name_num(self.params.pad_size.1)
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let w1 = ctx.layer(W1)?;
        let w2 = ctx.layer(W2)?;
        let pad = dims_um(p.pad_size);
        let electrode = Rect::with_dims(Dims::new(pad.w() + um(p.l_overlap), pad.h()));

        ctx.draw_rect(w1, electrode);
        let mut top = electrode;
        top.set_xmin(pad.w());
        ctx.draw_rect(w2, top);

        apply_tone(ctx, &[w1, w2]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tftgeom::bbox::BoundBox;

    use super::*;
    use crate::layout::layers::LayerSet;

    #[test]
    fn array_transistor_dimensions() {
        let p = BgTransistorParams::sweep(5., 2., 10.);
        assert_eq!(p.l_mesa, 11.);
        assert_eq!(p.w_mesa, 12.);
    }

    #[test]
    fn odd_layers_are_drawn_as_is() {
        let ctx = MaskCtx::new(LayerSet::back_gate());
        let inst = ctx
            .instantiate_layout::<BgTransistor>(&BgTransistorParams::default())
            .unwrap();
        let mesa = inst.shapes_on(GdsLayerSpec(5, 0));
        assert_eq!(mesa.len(), 1);
        assert_eq!(mesa[0].bbox().width(), um(8.));
    }

    #[test]
    fn even_layers_are_inverted() {
        let mut layers = LayerSet::new();
        layers.add(W1, GdsLayerSpec(1, 0), "gate");
        layers.add(W2, GdsLayerSpec(3, 0), "source/drain");
        layers.add(MESA, GdsLayerSpec(6, 0), "mesa");
        let ctx = MaskCtx::new(layers);
        let inst = ctx
            .instantiate_layout::<BgTransistor>(&BgTransistorParams::default())
            .unwrap();

        let region = inst.cell().layer_region(GdsLayerSpec(6, 0));
        let area = inst.bbox().into_rect();
        // The mesa is now a hole in the device area.
        let expected = area.area() as f64 - (um(8.) * um(12.)) as f64;
        assert!((region.area() - expected).abs() < 1.);
    }

    #[test]
    fn mim_cap_overlap() {
        let ctx = MaskCtx::new(LayerSet::back_gate());
        let params = BgMimCapParams {
            l_overlap: 50.,
            ..Default::default()
        };
        let inst = ctx.instantiate_layout::<BgMimCap>(&params).unwrap();
        let bot = inst.shapes_on(GdsLayerSpec(1, 0))[0].as_rect().unwrap();
        let top = inst.shapes_on(GdsLayerSpec(3, 0))[0].as_rect().unwrap();
        assert_eq!(bot.right() - top.left(), um(50.));
    }
}
