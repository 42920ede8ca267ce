//! Van der Pauw sheet resistance structures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tftgeom::bbox::BoundBox;
use tftgeom::transform::{Transform, Transformation};
use tftgeom::{um, Point, Polygon, Rect, ShapeTrait};

use super::caps::COVER_MARGIN;
use super::pads::{ContactPad, ContactPadParams, PAD_PORT};
use super::{dims_um, name_num, DEFAULT_PAD_SIZE};
use crate::component::Component;
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::layout::cell::{Instance, Port};
use crate::layout::context::LayoutCtx;
use crate::layout::group::Group;
use crate::layout::layers::{GdsLayerSpec, GATE, MESA, SOURCEDRAIN, VIA};
use crate::layout::placement::align::AlignRect;

/// A symmetric cross-shaped sheet with four arms of width `w` reaching
/// `l / 2` from the center, chamfered between the arms.
pub fn vdp_polygon(l: i64, w: i64) -> Polygon {
    let (a, b) = (l / 2, w / 2);
    Polygon::new(vec![
        Point::new(a, -b),
        Point::new(a, b),
        Point::new(b, a),
        Point::new(-b, a),
        Point::new(-a, b),
        Point::new(-a, -b),
        Point::new(-b, -a),
        Point::new(b, -a),
    ])
}

/// The outward-facing ports at the tips of the arms of a [`vdp_polygon`].
pub fn vdp_ports(l: i64) -> [(&'static str, Port); 4] {
    let a = l / 2;
    [
        ("E1", Port::new(Point::new(a, 0), 0.)),
        ("N1", Port::new(Point::new(0, a), 90.)),
        ("W1", Port::new(Point::new(-a, 0), 180.)),
        ("S1", Port::new(Point::new(0, -a), 270.)),
    ]
}

/// Connects a pad to every arm of a VDP sheet of arm length `l / 2`.
fn connect_pads(
    ctx: &mut LayoutCtx,
    l: i64,
    pad: &ContactPadParams,
) -> Result<HashMap<&'static str, Instance>> {
    let mut pads = HashMap::new();
    for (name, port) in vdp_ports(l) {
        let mut inst = ctx.instantiate::<ContactPad>(pad)?;
        inst.connect(PAD_PORT, port, 0)?;
        ctx.add_inst(inst.clone());
        pads.insert(name, inst);
    }
    Ok(pads)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VdpItoParams {
    /// Include a back gate under the sheet.
    pub gated: bool,
    /// Counter-clockwise rotation of the whole structure, in degrees.
    pub rotation: f64,
    /// Arm width and contact depth.
    pub contact_size: (f64, f64),
    pub pad_size: (f64, f64),
    /// Name of the layer the pads are drawn on.
    ///
    /// Pads on the gate layer get a via opening.
    pub pad_layer: String,
    pub cover_bottom: bool,
}

impl Default for VdpItoParams {
    fn default() -> Self {
        Self {
            gated: true,
            rotation: 0.,
            contact_size: (5., 10.),
            pad_size: DEFAULT_PAD_SIZE,
            pad_layer: SOURCEDRAIN.to_string(),
            cover_bottom: true,
        }
    }
}

/// A Van der Pauw cross on the mesa layer, optionally back-gated.
pub struct VdpIto {
    params: VdpItoParams,
}

impl Component for VdpIto {
    type Params = VdpItoParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        let p = &self.params;
        arcstr::format!(
            "vdp_ito_{}_{}_{}_{}",
            if p.gated { "gated" } else { "ungated" },
            name_num(p.rotation),
            name_num(p.contact_size.0),
            p.pad_layer
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let pad = dims_um(p.pad_size);
        let (cs_w, cs_l) = p.contact_size;
        let l = 2 * pad.max_dim();
        let w = um(cs_w);

        let mesa = ctx.layer(MESA)?;
        ctx.draw_shape(mesa, vdp_polygon(l, w));

        let pad_layer = ctx.layer(&p.pad_layer)?;
        let via = ctx.layer(VIA)?;
        let pad_params = ContactPadParams {
            pad_size: p.pad_size,
            contact: Some((2. * cs_l, cs_w)),
            port_inset: cs_l,
            layer: pad_layer,
            via: (p.pad_layer == GATE).then_some(via),
            via_over_contact: true,
        };
        let pads = connect_pads(ctx, l, &pad_params)?;

        if p.gated {
            let gate = ctx.layer(GATE)?;
            ctx.draw_shape(gate, vdp_polygon(l + um(10.), w + um(5.)));

            let mut gate_pad = Rect::with_dims(pad);
            gate_pad
                .set_xmax(pads["E1"].bbox().p1.x)
                .set_ymin(pads["S1"].bbox().p0.y);
            ctx.draw_rect(gate, gate_pad);
            ctx.draw_rect(via, gate_pad);
            if p.cover_bottom {
                let sd = ctx.layer(SOURCEDRAIN)?;
                ctx.draw_rect(sd, gate_pad.expand(um(COVER_MARGIN / 2.)));
            }

            // A diagonal strip from the gate pad to the center of the cross.
            let len = (ctx.bbox().width() - pad.max_dim()) as f64 / std::f64::consts::SQRT_2;
            let strip = Rect::from_sides(0, 0, len.round() as i64, um(10.))
                .to_poly()
                .transform(Transformation::builder().angle(-45.).build());
            let mut contact = Group::new();
            contact.add_shape(gate, strip);
            contact
                .set_xmax(gate_pad.center().x)
                .set_ymin(gate_pad.center().y);
            ctx.draw(contact)?;
        }

        ctx.rotate(p.rotation);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VdpMetalParams {
    /// Name of the metal layer.
    pub layer: String,
    pub rotation: f64,
    pub pad_size: (f64, f64),
}

impl Default for VdpMetalParams {
    fn default() -> Self {
        Self {
            layer: SOURCEDRAIN.to_string(),
            rotation: 0.,
            pad_size: DEFAULT_PAD_SIZE,
        }
    }
}

/// A Van der Pauw cross patterned in one of the metal layers.
pub struct VdpMetal {
    params: VdpMetalParams,
}

impl Component for VdpMetal {
    type Params = VdpMetalParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::format!(
            "vdp_metal_{}_{}",
            self.params.layer,
            name_num(self.params.rotation)
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let metal: GdsLayerSpec = ctx.layer(&p.layer)?;
        let l = 2 * dims_um(p.pad_size).max_dim();
        ctx.draw_shape(metal, vdp_polygon(l, um(10.)));

        let via = ctx.layer(VIA)?;
        let pad_params = ContactPadParams {
            pad_size: p.pad_size,
            contact: Some((20., 10.)),
            port_inset: 5.,
            layer: metal,
            via: (p.layer == GATE).then_some(via),
            via_over_contact: false,
        };
        connect_pads(ctx, l, &pad_params)?;

        ctx.rotate(p.rotation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::layers::LayerSet;

    #[test]
    fn vdp_ports_sit_on_arm_tips() {
        let poly = vdp_polygon(um(200.), um(10.));
        assert_eq!(poly.bbox().width(), um(200.));
        for (_, port) in vdp_ports(um(200.)) {
            assert!(poly.bbox().contains(port.loc));
        }
    }

    #[test]
    fn gated_vdp_has_gate_pad_in_lower_right() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let params = VdpItoParams {
            contact_size: (20., 10.),
            ..Default::default()
        };
        let inst = ctx.instantiate_layout::<VdpIto>(&params).unwrap();
        let gate_pad = inst
            .shapes_on(GdsLayerSpec(1, 0))
            .into_iter()
            .filter_map(|s| s.as_rect())
            .find(|r| r.width() == um(100.) && r.height() == um(100.))
            .unwrap();
        assert_eq!(gate_pad.right(), um(210.));
        assert_eq!(gate_pad.bottom(), -um(210.));
        // Four pads on source/drain plus the cover ring.
        let sd = inst.shapes_on(GdsLayerSpec(3, 0));
        assert!(sd.len() >= 9);
    }

    #[test]
    fn metal_vdp_on_gate_gets_vias() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let params = VdpMetalParams {
            layer: GATE.to_string(),
            rotation: 45.,
            ..Default::default()
        };
        let inst = ctx.instantiate_layout::<VdpMetal>(&params).unwrap();
        let vias = inst.shapes_on(GdsLayerSpec(2, 0));
        assert_eq!(vias.len(), 4);
        // Rotated by 45 degrees, the pads become diamonds.
        assert!(vias.iter().all(|s| s.as_rect().is_none()));
        assert!(vias[0].to_poly().area() > 0.);
    }
}
