//! Via chains for measuring contact resistance between the two metals.

use serde::{Deserialize, Serialize};
use tftgeom::bbox::BoundBox;
use tftgeom::{um, Dims, Point, Rect};

use super::{dims_um, name_num, DEFAULT_PAD_SIZE};
use crate::component::Component;
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::{ErrorSource, Result};
use crate::layout::cell::{Instance, Port};
use crate::layout::context::LayoutCtx;
use crate::layout::elements::shapes::compass;
use crate::layout::elements::text::Text;
use crate::layout::layers::{GdsLayerSpec, GATE, SOURCEDRAIN, VIA};
use crate::layout::placement::align::AlignRect;
use crate::layout::placement::grid::gridsweep;
use crate::layout::Draw;

/// Unit vector, in database units, pointing along a port facing `angle` degrees.
fn direction(angle: f64) -> Result<Point> {
    match (angle.round() as i64).rem_euclid(360) {
        0 => Ok(Point::new(1, 0)),
        90 => Ok(Point::new(0, 1)),
        180 => Ok(Point::new(-1, 0)),
        270 => Ok(Point::new(0, -1)),
        _ => Err(ErrorSource::InvalidArgs(format!(
            "wires can only leave ports at multiples of 90 degrees, got {angle}"
        ))
        .into()),
    }
}

/// A straight wire of the given length leaving `port`, reaching `overlap` back into it.
fn wire_from(port: Port, overlap: i64, length: i64, width: i64) -> Result<Rect> {
    let d = direction(port.angle)?;
    let reach = length / 2 - overlap;
    let center = Point::new(port.loc.x + d.x * reach, port.loc.y + d.y * reach);
    let dims = if d.y == 0 {
        Dims::new(length, width)
    } else {
        Dims::new(width, length)
    };
    Ok(Rect::centered(center, dims))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViaLinkParams {
    pub via_spacing: f64,
    pub wire_width: f64,
    pub via_width: f64,
    /// Top wiring.
    pub wiring1: GdsLayerSpec,
    /// Bottom wiring.
    pub wiring2: GdsLayerSpec,
    pub via: GdsLayerSpec,
}

/// Two vias joined by a bottom wire, with a top wire leading in.
///
/// Ports `W` and `E` continue the chain straight on; `S` and `N` are used
/// to turn at the ends of a column.
pub struct ViaLink {
    params: ViaLinkParams,
}

impl Component for ViaLink {
    type Params = ViaLinkParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!(
            "via_link_{}_{}_{}",
            name_num(self.params.via_spacing),
            name_num(self.params.wire_width),
            name_num(self.params.via_width)
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let (vs, ww, vw) = (um(p.via_spacing), um(p.wire_width), um(p.via_width));

        let mut wire1 = compass(Dims::new(vs, ww));
        wire1.set_center(Point::new(-vs + ww, 0));
        let wire2 = compass(Dims::new(vs, ww));
        ctx.draw_rect(p.wiring1, wire1);
        ctx.draw_rect(p.wiring2, wire2);

        let via = Dims::square(vw);
        ctx.draw_rect(p.via, Rect::centered(Point::new(-vs / 2 + ww / 2, 0), via));
        ctx.draw_rect(p.via, Rect::centered(Point::new(vs / 2 - ww / 2, 0), via));

        let wide = Dims::new(vs + um(2.), ww + um(2.));
        ctx.draw_rect(p.wiring1, Rect::centered(wire1.center(), wide));

        ctx.add_port("W", Port::new(Point::new(wire1.left(), 0), 180.));
        ctx.add_port("E", Port::new(Point::new(wire2.right(), 0), 0.));
        ctx.add_port("S", Port::new(Point::new(ww + ww / 2, -ww / 2), 270.));
        ctx.add_port("N", Port::new(Point::new(ww + ww / 2, ww / 2), 90.));
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViaChainParams {
    /// Number of vias; rounded down to an even number.
    pub num_vias: usize,
    pub wire_width: f64,
    pub via_width: f64,
    pub via_spacing: f64,
    pub pad_size: (f64, f64),
    /// Minimum distance between the two pads.
    pub min_pad_spacing: f64,
    pub pad_layer: GdsLayerSpec,
    pub wiring1: GdsLayerSpec,
    pub wiring2: GdsLayerSpec,
    pub via: GdsLayerSpec,
}

impl ViaChainParams {
    /// A chain with square vias as wide as the wire, spaced four wire widths
    /// apart, using the pads and wiring of the standard layer set.
    pub fn standard(ctx: &MaskCtx, num_vias: usize, wire_width: f64) -> Result<Self> {
        let layers = ctx.layers();
        let sd = layers.get(SOURCEDRAIN)?;
        Ok(Self {
            num_vias,
            wire_width,
            via_width: wire_width,
            via_spacing: 4. * wire_width,
            pad_size: DEFAULT_PAD_SIZE,
            min_pad_spacing: 0.,
            pad_layer: sd,
            wiring1: sd,
            wiring2: layers.get(GATE)?,
            via: layers.get(VIA)?,
        })
    }
}

/// Ports of the last element of the chain.
#[derive(Clone, Copy)]
struct ChainEnd {
    s: Port,
    n: Port,
    e: Port,
}

impl ChainEnd {
    fn of(inst: &Instance) -> Result<Self> {
        Ok(Self {
            s: inst.port("S")?,
            n: inst.port("N")?,
            e: inst.port("E")?,
        })
    }
}

/// A serpentine chain of [`ViaLink`]s between two pads.
///
/// The chain starts below the top edge of the first pad, snakes down and up
/// within the pad height, and ends in a tail leading to the second pad.
pub struct ViaChain {
    params: ViaChainParams,
}

impl Component for ViaChain {
    type Params = ViaChainParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!(
            "via_chain_{}_{}",
            self.params.num_vias,
            name_num(self.params.wire_width)
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let pad = dims_um(p.pad_size);
        let ww = um(p.wire_width);

        let pad1 = Rect::with_dims(pad);
        ctx.draw_rect(p.pad_layer, pad1);
        ctx.draw_rect(p.wiring1, pad1);

        let nub = Rect::from_sides(
            pad1.right(),
            pad1.top() - um(5.) - ww,
            pad1.right() + 3 * ww,
            pad1.top() - um(5.),
        );
        let head = Rect::from_sides(nub.right(), nub.bottom(), nub.right() + ww, nub.top());
        for rect in [nub, head] {
            ctx.draw_rect(p.pad_layer, rect);
            ctx.draw_rect(p.wiring1, rect);
        }
        let head_x = head.center().x;
        let mut end = ChainEnd {
            s: Port::new(Point::new(head_x, head.bottom()), 270.),
            n: Port::new(Point::new(head_x, head.top()), 90.),
            e: Port::new(Point::new(head.right(), head.center().y), 0.),
        };

        let link = ViaLinkParams {
            via_spacing: p.via_spacing,
            wire_width: p.wire_width,
            via_width: p.via_width,
            wiring1: p.wiring1,
            wiring2: p.wiring2,
            via: p.via,
        };
        let turn_width = 2 * um(p.via_spacing) - 2 * ww;
        let mut current_width = 4 * ww;
        let mut old_port = end.s;
        let (mut up, mut down, mut edge) = (false, true, true);
        let mut count = 0;

        while count + 2 <= p.num_vias {
            let mut obj = ctx.instantiate::<ViaLink>(&link)?;
            obj.connect("W", old_port, ww)?;
            old_port = obj.port("E")?;
            edge = false;
            let bbox = obj.bbox();
            if bbox.p1.y > pad1.top() {
                // Overshot the top: turn right, then head down.
                obj.connect("W", end.s, ww)?;
                old_port = obj.port("S")?;
                current_width += turn_width;
                (up, down, edge) = (false, true, true);
            } else if bbox.p0.y < pad1.bottom() {
                obj.connect("W", end.n, ww)?;
                old_port = obj.port("N")?;
                current_width += turn_width;
                (up, down, edge) = (true, false, true);
            }
            count += 2;
            end = ChainEnd::of(&obj)?;
            ctx.add_inst(obj);
        }

        let min_spacing = um(p.min_pad_spacing);
        let long_tail = current_width < min_spacing && min_spacing - current_width > 3 * ww;
        let tail_len = if long_tail {
            min_spacing - current_width + ww
        } else {
            3 * ww
        };
        let tail_port = if up && !edge {
            end.s
        } else if down && !edge {
            end.n
        } else {
            end.e
        };
        let tail = wire_from(tail_port, ww, tail_len, ww)?;
        ctx.draw_rect(p.wiring1, tail);
        if long_tail {
            ctx.draw_rect(p.pad_layer, tail);
        }
        ctx.draw_rect(
            p.wiring1,
            Rect::centered(tail.center(), Dims::new(tail_len + um(4.), ww + um(4.))),
        );

        let pad2 = Rect::from_sides(tail.right(), 0, tail.right() + pad.w(), pad.h());
        ctx.draw_rect(p.pad_layer, pad2);
        ctx.draw_rect(p.wiring1, pad2);

        let mut label = Text::new(p.num_vias.to_string(), p.pad_layer).draw()?;
        label
            .set_xmax(pad2.left() - um(5.))
            .set_ymin(pad2.bottom());
        ctx.draw(label)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViaTestsParams {
    pub counts: Vec<usize>,
    pub wire_width: f64,
}

impl Default for ViaTestsParams {
    fn default() -> Self {
        Self {
            counts: vec![2, 4, 8, 10, 20, 50, 100, 250],
            wire_width: 8.,
        }
    }
}

/// A row of via chains, one per via count.
pub struct ViaTests {
    params: ViaTestsParams,
}

impl Component for ViaTests {
    type Params = ViaTestsParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!("via_tests_{}", name_num(self.params.wire_width))
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let mask = ctx.inner().clone();
        let row = gridsweep(&p.counts, &[()], Dims::from_um(50., 50.), |&n, _| {
            ctx.instantiate::<ViaChain>(&ViaChainParams::standard(&mask, n, p.wire_width)?)
        })?;
        ctx.draw(row)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::layers::LayerSet;

    #[test]
    fn wire_leaves_port_outward() {
        let port = Port::new(Point::new(0, 0), 270.);
        let wire = wire_from(port, 8, 24, 8).unwrap();
        assert_eq!(wire, Rect::from_sides(-4, -16, 4, 8));
        assert!(direction(45.).is_err());
    }

    #[test]
    fn link_ports() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let params = ViaChainParams::standard(&ctx, 2, 8.).unwrap();
        let link = ctx
            .instantiate_layout::<ViaLink>(&ViaLinkParams {
                via_spacing: params.via_spacing,
                wire_width: params.wire_width,
                via_width: params.via_width,
                wiring1: params.wiring1,
                wiring2: params.wiring2,
                via: params.via,
            })
            .unwrap();
        assert_eq!(link.port("W").unwrap().loc, Point::new(-um(40.), 0));
        assert_eq!(link.port("E").unwrap().loc, Point::new(um(16.), 0));
        assert_eq!(link.port("S").unwrap().loc, Point::new(um(12.), -um(4.)));
        assert_eq!(link.shapes_on(GdsLayerSpec(2, 0)).len(), 2);
    }

    #[test]
    fn chain_has_requested_vias() {
        let ctx = MaskCtx::new(LayerSet::standard());
        for n in [0, 2, 10, 50] {
            let params = ViaChainParams::standard(&ctx, n, 8.).unwrap();
            let chain = ctx.instantiate_layout::<ViaChain>(&params).unwrap();
            assert_eq!(chain.shapes_on(GdsLayerSpec(2, 0)).len(), n);
            // The chain never leaves the pad height.
            let bbox = chain.bbox();
            assert!(bbox.p0.y >= -um(10.));
            assert!(bbox.p1.y <= um(110.));
        }
    }

    #[test]
    fn long_chains_push_the_second_pad_out() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let short = ctx
            .instantiate_layout::<ViaChain>(&ViaChainParams::standard(&ctx, 2, 8.).unwrap())
            .unwrap();
        let long = ctx
            .instantiate_layout::<ViaChain>(&ViaChainParams::standard(&ctx, 100, 8.).unwrap())
            .unwrap();
        assert!(long.bbox().width() > short.bbox().width());
    }
}
