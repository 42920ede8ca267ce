//! Probe pads with a contact tab.

use serde::{Deserialize, Serialize};
use tftgeom::{um, Point, Rect};

use super::{dims_um, half, name_num};
use crate::component::Component;
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::layout::cell::Port;
use crate::layout::context::LayoutCtx;
use crate::layout::layers::GdsLayerSpec;

/// Port through which pads are connected.
pub const PAD_PORT: &str = "1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactPadParams {
    pub pad_size: (f64, f64),
    /// Length and width of the contact tab on the pad's left edge.
    ///
    /// Without a tab, the port sits on the pad's left edge.
    pub contact: Option<(f64, f64)>,
    /// Distance of the port from the tip of the contact tab.
    pub port_inset: f64,
    pub layer: GdsLayerSpec,
    /// Layer of the via opening over the pad, if any.
    pub via: Option<GdsLayerSpec>,
    /// Extend the via opening over the contact tab.
    pub via_over_contact: bool,
}

/// A rectangular pad, vertically centered on the x-axis with its left edge at
/// `x = 0`, with an optional contact tab sticking out to the left.
///
/// The pad's port faces left.
pub struct ContactPad {
    params: ContactPadParams,
}

impl Component for ContactPad {
    type Params = ContactPadParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        let (l, w) = self.params.contact.unwrap_or_default();
        arcstr::format!(
            "contact_pad_{}_{}_{}",
            self.params.layer.layer(),
            name_num(l),
            name_num(w)
        )
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let p = &self.params;
        let dims = dims_um(p.pad_size);
        let pad = Rect::from_sides(0, -dims.h() / 2, dims.w(), dims.h() - dims.h() / 2);
        ctx.draw_rect(p.layer, pad);

        let contact = p
            .contact
            .map(|(l, w)| Rect::from_sides(-um(l), -half(w), 0, um(w) - half(w)));
        if let Some(contact) = contact {
            ctx.draw_rect(p.layer, contact);
        }

        if let Some(via) = p.via {
            ctx.draw_rect(via, pad);
            if let (Some(contact), true) = (contact, p.via_over_contact) {
                ctx.draw_rect(via, contact);
            }
        }

        let tip = contact.map(|c| c.left()).unwrap_or_default();
        ctx.add_port(PAD_PORT, Port::new(Point::new(tip + um(p.port_inset), 0), 180.));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tftgeom::bbox::BoundBox;

    use super::*;
    use crate::layout::layers::LayerSet;

    #[test]
    fn connected_pad_faces_the_port() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let params = ContactPadParams {
            pad_size: (100., 100.),
            contact: Some((20., 10.)),
            port_inset: 5.,
            layer: GdsLayerSpec(3, 0),
            via: None,
            via_over_contact: false,
        };
        let mut pad = ctx.instantiate_layout::<ContactPad>(&params).unwrap();
        // A port on the top edge of something, facing up.
        pad.connect(PAD_PORT, Port::new(Point::new(0, um(50.)), 90.), 0)
            .unwrap();
        let bbox = pad.bbox();
        assert_eq!(bbox.p0, Point::new(-um(50.), um(45.)));
        assert_eq!(bbox.p1, Point::new(um(50.), um(165.)));
    }
}
