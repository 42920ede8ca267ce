//! Meandered metal sheet resistors.

use serde::{Deserialize, Serialize};
use tftgeom::bbox::BoundBox;
use tftgeom::{um, Dims, Point, Rect};

use super::caps::COVER_MARGIN;
use super::pads::{ContactPad, ContactPadParams, PAD_PORT};
use super::{dims_um, draw_label_on, name_num, DEFAULT_PAD_SIZE};
use crate::component::Component;
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::{ErrorSource, Result};
use crate::layout::cell::Port;
use crate::layout::context::LayoutCtx;
use crate::layout::elements::text::{fmt_num, Text};
use crate::layout::layers::{GdsLayerSpec, GATE, SOURCEDRAIN, VIA};
use crate::layout::placement::align::AlignRect;
use crate::layout::Draw;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeanderParams {
    pub width: f64,
    /// Center-to-center distance of neighboring legs.
    pub pitch: f64,
    pub squares: f64,
    /// Longest allowed leg.
    pub max_length: f64,
    pub layer: GdsLayerSpec,
}

impl MeanderParams {
    /// Number of legs and the length of each leg, in microns.
    ///
    /// The leg count is always odd so the two ends sit on opposite sides.
    pub fn legs(&self) -> Result<(usize, f64)> {
        if self.width <= 0. || self.squares <= 0. || self.max_length <= 0. {
            return Err(ErrorSource::InvalidArgs(format!(
                "meander needs positive width, squares, and length; got {self:?}"
            ))
            .into());
        }
        let total = self.squares * self.width;
        let mut n = ((total / self.max_length).round() as usize).max(1);
        if n % 2 == 0 {
            n += 1;
        }
        let leg = (total - (n - 1) as f64 * self.pitch) / n as f64;
        if leg < self.width {
            return Err(ErrorSource::InvalidArgs(format!(
                "{} squares of width {} do not fit in {} legs",
                self.squares, self.width, n
            ))
            .into());
        }
        Ok((n, leg))
    }
}

/// A serpentine wire with ports `1` at its lower-left end and `2` at its upper-right end.
pub struct Meander {
    params: MeanderParams,
}

impl Component for Meander {
    type Params = MeanderParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        params.legs()?;
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!(
            "meander_{}_{}",
            name_num(self.params.width),
            name_num(self.params.squares)
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let (n, leg) = p.legs()?;
        let (w, pitch, leg) = (um(p.width), um(p.pitch), um(leg));

        for i in 0..n as i64 {
            let y = i * pitch;
            ctx.draw_rect(p.layer, Rect::from_sides(0, y, leg, y + w));
            if i + 1 < n as i64 {
                let (x0, x1) = if i % 2 == 0 { (leg - w, leg) } else { (0, w) };
                ctx.draw_rect(p.layer, Rect::from_sides(x0, y + w, x1, y + pitch));
            }
        }

        ctx.add_port("1", Port::new(Point::new(0, w / 2), 180.));
        ctx.add_port(
            "2",
            Port::new(Point::new(leg, (n as i64 - 1) * pitch + w / 2), 0.),
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetalResistorParams {
    pub width: f64,
    pub squares: f64,
    /// Name of the metal layer.
    pub layer: String,
    pub cover_bottom: bool,
    pub pad_size: (f64, f64),
}

impl Default for MetalResistorParams {
    fn default() -> Self {
        Self {
            width: 5.,
            squares: 50.,
            layer: GATE.to_string(),
            cover_bottom: true,
            pad_size: DEFAULT_PAD_SIZE,
        }
    }
}

/// A meander between two pads, standing upright.
pub struct MetalResistor {
    params: MetalResistorParams,
}

impl Component for MetalResistor {
    type Params = MetalResistorParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        let p = &self.params;
        arcstr::format!(
            "metal_resistor_{}_{}_{}",
            p.layer,
            name_num(p.width),
            name_num(p.squares)
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let pad = dims_um(p.pad_size);
        let layer = ctx.layer(&p.layer)?;
        let sd = ctx.layer(SOURCEDRAIN)?;
        let via = ctx.layer(VIA)?;

        // Legs no longer than a pad is tall, rounded to whole pitches.
        let pitch = 2. * p.width;
        let max_length = (p.squares / (p.pad_size.1 / p.width)).ceil() * pitch;
        let meander = ctx.instantiate::<Meander>(&MeanderParams {
            width: p.width,
            pitch,
            squares: p.squares,
            max_length,
            layer,
        })?;

        let contact = ContactPadParams {
            pad_size: p.pad_size,
            contact: None,
            port_inset: 0.,
            layer,
            via: None,
            via_over_contact: false,
        };
        for (i, port) in ["1", "2"].into_iter().enumerate() {
            let mut pad_inst = ctx.instantiate::<ContactPad>(&contact)?;
            pad_inst.connect(PAD_PORT, meander.port(port)?, 0)?;
            let center = pad_inst.brect().center();
            ctx.add_inst(pad_inst);

            if p.layer == GATE {
                let via_rect = Rect::centered(center, pad);
                ctx.draw_rect(via, via_rect);
                if p.cover_bottom {
                    ctx.draw_rect(sd, via_rect.expand(um(COVER_MARGIN / 2.)));
                    let sign = if i == 0 { 1 } else { -1 };
                    let conn_y = center.y + sign * (-um(COVER_MARGIN / 2.) - pad.h() / 2);
                    ctx.draw_rect(
                        sd,
                        Rect::centered(
                            Point::new(center.x, conn_y),
                            Dims::new(um(p.width + COVER_MARGIN), um(COVER_MARGIN)),
                        ),
                    );
                }
            }
        }
        ctx.add_inst(meander);
        ctx.rotate(90.);

        let bbox = ctx.brect();
        let mut label = Text::new(
            format!("W/sq\n{}/{}", fmt_num(p.width), fmt_num(p.squares.round())),
            layer,
        )
        .draw()?;
        label
            .set_center_x(bbox.left() + pad.h() / 2)
            .set_ymin(bbox.top() + um(5.));
        draw_label_on(ctx, label, sd)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::layout::layers::LayerSet;

    fn meander(squares: f64) -> MeanderParams {
        let width = 5.;
        let pitch = 2. * width;
        MeanderParams {
            width,
            pitch,
            squares,
            max_length: (squares / (100. / width)).ceil() * pitch,
            layer: GdsLayerSpec(1, 0),
        }
    }

    #[test]
    fn meander_leg_count_is_odd() {
        let (n, leg) = meander(49.).legs().unwrap();
        assert_eq!(n, 9);
        assert_float_eq!(leg, 165. / 9., abs <= 1e-9);

        let (n, leg) = meander(2000.).legs().unwrap();
        assert_eq!(n, 11);
        assert_float_eq!(leg, 900., abs <= 1e-9);
    }

    #[test]
    fn meander_too_short_is_rejected() {
        let params = MeanderParams {
            width: 5.,
            pitch: 10.,
            squares: 2.,
            max_length: 1.,
            layer: GdsLayerSpec(1, 0),
        };
        assert!(params.legs().is_err());
    }

    #[test]
    fn gate_resistor_stands_upright_with_vias() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let params = MetalResistorParams {
            squares: 99.,
            ..Default::default()
        };
        let inst = ctx.instantiate_layout::<MetalResistor>(&params).unwrap();
        assert_eq!(inst.shapes_on(GdsLayerSpec(2, 0)).len(), 2);
        let bbox = inst.brect();
        assert!(bbox.height() > bbox.width());
    }

    #[test]
    fn sd_resistor_has_no_vias() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let params = MetalResistorParams {
            layer: SOURCEDRAIN.to_string(),
            squares: 200.,
            ..Default::default()
        };
        let inst = ctx.instantiate_layout::<MetalResistor>(&params).unwrap();
        assert!(inst.shapes_on(GdsLayerSpec(2, 0)).is_empty());
    }
}
