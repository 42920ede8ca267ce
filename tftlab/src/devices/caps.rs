//! MOS and MIM capacitors.

use serde::{Deserialize, Serialize};
use tftgeom::bbox::BoundBox;
use tftgeom::transform::Translate;
use tftgeom::{um, Dims, Rect};

use super::{dims_um, draw_label, name_num, DEFAULT_PAD_SIZE};
use crate::component::Component;
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::layout::context::LayoutCtx;
use crate::layout::elements::text::{fmt_num, Text};
use crate::layout::group::Group;
use crate::layout::layers::{GdsLayerSpec, GATE, MESA, SOURCEDRAIN, VIA};
use crate::layout::placement::align::AlignRect;
use crate::layout::Draw;

/// Extra width of the cover ring around a bottom pad, in microns.
pub(crate) const COVER_MARGIN: f64 = 2.;

/// Layers shared by the capacitor layouts.
struct CapLayers {
    gate: GdsLayerSpec,
    via: GdsLayerSpec,
    sd: GdsLayerSpec,
    mesa: GdsLayerSpec,
}

impl CapLayers {
    fn new(ctx: &LayoutCtx) -> Result<Self> {
        Ok(Self {
            gate: ctx.layer(GATE)?,
            via: ctx.layer(VIA)?,
            sd: ctx.layer(SOURCEDRAIN)?,
            mesa: ctx.layer(MESA)?,
        })
    }
}

/// The bottom electrode: a gate pad with a via, a strip of `strip` dims whose
/// left edge sits at `strip_x`, and an optional cover with a connector.
fn bottom_electrode(
    layers: &CapLayers,
    pad: Dims,
    strip_x: i64,
    strip: Dims,
    w: i64,
    cover: bool,
) -> Group {
    let mut bot = Group::new();
    let pad_rect = Rect::with_dims(pad);
    bot.add_rect(layers.gate, pad_rect);
    let mut strip_rect = Rect::with_dims(strip);
    strip_rect.set_xmin(strip_x).set_center_y(pad.h() / 2);
    bot.add_rect(layers.gate, strip_rect);
    bot.add_rect(layers.via, pad_rect);
    if cover {
        bot.add_rect(layers.sd, pad_rect.expand(um(COVER_MARGIN / 2.)));
        let mut conn = Rect::with_dims(Dims::new(um(COVER_MARGIN), w + um(12.)));
        conn.set_xmin(pad.w()).set_center_y(pad.h() / 2);
        bot.add_rect(layers.sd, conn);
    }
    // The bottom electrode's lower-left corner sits at the origin.
    let p0 = bot.bbox().p0;
    bot.translate(-p0);
    bot
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MosCapParams {
    /// Gate/mesa overlap length.
    pub l_overlap: f64,
    /// Mesa/top contact overlap length.
    pub l_contact: f64,
    pub w: f64,
    /// Cover the bottom pad with the source/drain layer.
    pub cover_bottom: bool,
    pub pad_size: (f64, f64),
}

impl Default for MosCapParams {
    fn default() -> Self {
        Self {
            l_overlap: 100.,
            l_contact: 10.,
            w: 100.,
            cover_bottom: true,
            pad_size: DEFAULT_PAD_SIZE,
        }
    }
}

/// A gate / semiconductor / source-drain stack between two probe pads.
pub struct MosCap {
    params: MosCapParams,
}

impl Component for MosCap {
    type Params = MosCapParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!(
            "mos_cap_{}_{}_{}{}",
            name_num(self.params.l_overlap),
            name_num(self.params.l_contact),
            name_num(self.params.w),
            if self.params.cover_bottom { "_cov" } else { "" }
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let layers = CapLayers::new(ctx)?;
        let pad = dims_um(p.pad_size);
        let (l, lc, w) = (um(p.l_overlap), um(p.l_contact), um(p.w));

        let bot = bottom_electrode(
            &layers,
            pad,
            pad.w() - um(5.),
            Dims::new(l + um(15.), w + um(10.)),
            w,
            p.cover_bottom,
        );
        let b = bot.brect();

        let mut mesa = Rect::with_dims(Dims::new(l + lc, w));
        mesa.set_xmin(b.right() - l).set_center_y(b.center().y);

        let mut top = Group::new();
        top.add_rect(layers.sd, Rect::with_dims(Dims::new(pad.w() + lc, pad.h())));
        let mut strip = Rect::with_dims(Dims::new(um(10.), w + um(10.)));
        strip.set_xmin(0).set_center_y(pad.h() / 2);
        top.add_rect(layers.sd, strip);
        top.set_xmin(mesa.right() - um(5.))
            .set_center_y(b.center().y);
        let t = top.brect();

        let mut label = Text::new(
            format!("W/L\n{}/{}", fmt_num(p.w), fmt_num(p.l_overlap)),
            layers.gate,
        )
        .draw()?;
        label
            .set_center_x(t.center().x)
            .set_ymin(t.center().y + pad.h() / 2 + um(10.));

        ctx.draw(bot)?;
        ctx.draw_rect(layers.mesa, mesa);
        ctx.draw(top)?;
        draw_label(ctx, label)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MimCapParams {
    /// Overlap length of the two electrodes.
    pub l: f64,
    pub w: f64,
    pub cover_bottom: bool,
    pub pad_size: (f64, f64),
}

impl Default for MimCapParams {
    fn default() -> Self {
        Self {
            l: 100.,
            w: 100.,
            cover_bottom: true,
            pad_size: DEFAULT_PAD_SIZE,
        }
    }
}

/// Two overlapping metal electrodes separated by the gate dielectric.
pub struct MimCap {
    params: MimCapParams,
}

impl Component for MimCap {
    type Params = MimCapParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!(
            "mim_cap_{}_{}{}",
            name_num(self.params.l),
            name_num(self.params.w),
            if self.params.cover_bottom { "_cov" } else { "" }
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let layers = CapLayers::new(ctx)?;
        let pad = dims_um(p.pad_size);
        let (l, w) = (um(p.l), um(p.w));

        let bot = bottom_electrode(
            &layers,
            pad,
            pad.w(),
            Dims::new(l + um(10.), w + um(10.)),
            w,
            p.cover_bottom,
        );
        let b = bot.brect();

        let mut top = Group::new();
        top.add_rect(layers.sd, Rect::with_dims(pad));
        let mut strip = Rect::with_dims(Dims::new(l + um(10.), w));
        strip.set_xmax(0).set_center_y(pad.h() / 2);
        top.add_rect(layers.sd, strip);
        top.set_xmin(b.right() - l).set_center_y(b.center().y);
        let t = top.brect();

        let mut label = Text::new(
            format!("W/L\n{}/{}", fmt_num(p.w), fmt_num(p.l)),
            layers.gate,
        )
        .draw()?;
        label
            .set_center_x(t.right() - pad.w() / 2)
            .set_ymin(t.center().y + pad.h() / 2 + um(10.));

        ctx.draw(bot)?;
        ctx.draw(top)?;
        draw_label(ctx, label)?;
        Ok(())
    }
}

/// The electrode overlap area of a capacitor, in square microns.
pub fn overlap_area(l: f64, w: f64) -> f64 {
    l * w
}
