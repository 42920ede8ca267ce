//! The standard four-layer test chip.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tftgeom::bbox::BoundBox;
use tftgeom::transform::Translate;
use tftgeom::{um, Dims, Point};

use super::ceil10;
use crate::component::{Component, NoParams};
use crate::config::StandardSweeps;
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::devices::caps::{MimCap, MimCapParams, MosCap, MosCapParams};
use crate::devices::resistor::{MetalResistor, MetalResistorParams};
use crate::devices::steps::StepHeights;
use crate::devices::tlm::{CircTlm, CircTlmParams, RectTlm, RectTlmParams};
use crate::devices::transistor::{Transistor, TransistorParams};
use crate::devices::vdp::{VdpIto, VdpItoParams, VdpMetal, VdpMetalParams};
use crate::devices::via::{ViaTests, ViaTestsParams};
use crate::error::Result;
use crate::layout::context::LayoutCtx;
use crate::layout::elements::marks::{
    AlignmentMark, AlignmentMarkParams, ResolutionTest, ResolutionTestParams,
};
use crate::layout::group::Group;
use crate::layout::layers::{GATE, MESA, SOURCEDRAIN, VIA};
use crate::layout::placement::align::AlignRect;
use crate::layout::placement::grid::gridsweep;

/// Layers in exposure order.
const LAYER_ORDER: [&str; 4] = [GATE, VIA, SOURCEDRAIN, MESA];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestChipParams {
    /// Extend the source/drain layer over the bottom electrodes.
    pub cover_bottom: bool,
    #[serde(default)]
    pub sweeps: StandardSweeps,
}

/// A square sample carrying every test structure of the four-layer process.
///
/// The lithography tests and step heights sit in the lower left corner, the
/// capacitor grids in the lower right. Transistors, resistors, TLMs and Van
/// der Pauw crosses fill the area above them.
pub struct TestChip {
    params: TestChipParams,
}

impl Component for TestChip {
    type Params = TestChipParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        if self.params.cover_bottom {
            arcstr::literal!("T2")
        } else {
            arcstr::literal!("T1")
        }
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let s = &self.params.sweeps;
        let cover = self.params.cover_bottom;
        let mask = ctx.inner().clone();
        let sample_w = um(s.sample_w);

        let litho = self.lithography(ctx)?;

        let mut circ_tlm = ctx.instantiate::<CircTlm>(&CircTlmParams {
            pad_radius: s.circ_tlm_radius,
            spacings: s.circ_tlm_spacings.clone(),
            pad_layer: SOURCEDRAIN.to_string(),
            mesa_layer: MESA.to_string(),
        })?;
        circ_tlm
            .set_xmax(litho.bbox().p1.x)
            .set_ymax(litho.bbox().p1.y);

        // Capacitors
        let cap_spacing = if cover {
            Dims::from_um(70., 50.)
        } else {
            Dims::from_um(71., 51.)
        };
        let mut mos = gridsweep(&s.l_cap, &s.w_cap, cap_spacing, |&l, &w| {
            mask.instantiate_layout::<MosCap>(&MosCapParams {
                l_overlap: l,
                w,
                cover_bottom: cover,
                pad_size: s.pad_size,
                ..Default::default()
            })
        })?;
        mos.set_xmax(sample_w).set_ymin(0);
        let mut mim = gridsweep(&s.l_cap, &s.w_cap, cap_spacing, |&l, &w| {
            mask.instantiate_layout::<MimCap>(&MimCapParams {
                l,
                w,
                cover_bottom: cover,
                pad_size: s.pad_size,
            })
        })?;
        mim.set_xmax(mos.bbox().p0.x - um(50.)).set_ymin(0);
        if !cover {
            let shift = Point::new(um(1.), um(1.));
            mos.translate(shift);
            mim.translate(shift);
        }

        // Metal resistors, both layers for every length
        let metal_layers = [GATE, SOURCEDRAIN];
        let resistors = s
            .sq_resistor
            .iter()
            .cartesian_product(metal_layers.iter())
            .collect::<Vec<_>>();
        let mut metal_res = gridsweep(
            &resistors,
            &[()],
            Dims::from_um(50., 50.),
            |(sq, layer), _| {
                mask.instantiate_layout::<MetalResistor>(&MetalResistorParams {
                    width: s.w_metal_resistor,
                    squares: **sq,
                    layer: layer.to_string(),
                    cover_bottom: cover,
                    pad_size: s.pad_size,
                })
            },
        )?;
        metal_res
            .set_xmax(sample_w)
            .set_ymin(mim.bbox().p1.y + um(50.));

        let mut via_tests = ctx.instantiate::<ViaTests>(&ViaTestsParams {
            counts: s.via_counts.clone(),
            wire_width: s.via_wire_w,
        })?;
        via_tests
            .set_xmax(metal_res.bbox().p1.x)
            .set_ymin(metal_res.bbox().p1.y + um(50.));

        // Transistors: one column per overlap and width, one row per gate length
        let columns = s
            .l_overlap
            .iter()
            .cartesian_product(s.w_channel.iter())
            .collect::<Vec<_>>();
        let trans_spacing = if cover {
            Dims::from_um(55., 30.)
        } else {
            Dims::from_um(55., 31.)
        };
        let mut trans = gridsweep(&columns, &s.l_gate, trans_spacing, |(lov, w), &lg| {
            let mut params = TransistorParams::sweep(lg, **lov, **w, cover);
            params.pad_size = s.pad_size;
            mask.instantiate_layout::<Transistor>(&params)
        })?;
        trans
            .set_center_x(sample_w / 2)
            .set_ymin(via_tests.bbox().p1.y + um(50.));
        let trans_ymax = trans.bbox().p1.y;

        let mut ito_res = gridsweep(
            &s.l_resistor,
            &s.w_resistor,
            Dims::from_um(50., 20.),
            |&l, &w| {
                let mut params = TransistorParams::ito_resistor(l, w);
                params.pad_size = s.pad_size;
                mask.instantiate_layout::<Transistor>(&params)
            },
        )?;
        ito_res
            .set_xmin(trans.bbox().p0.x)
            .set_ymin(trans_ymax + um(50.));

        // TLMs: gated, bottom contact and plain
        let variants = [(true, false), (false, true), (false, false)];
        let mut tlm = gridsweep(
            &[()],
            &variants,
            Dims::from_um(50., 50.),
            |_, &(gated, bottom)| {
                let finger = if bottom { GATE } else { SOURCEDRAIN };
                mask.instantiate_layout::<RectTlm>(&RectTlmParams {
                    contact_l: s.tlm_contact_l,
                    spacings: s.tlm_spacings.clone(),
                    contact_w: s.tlm_contact_w,
                    via_layer: VIA.to_string(),
                    finger_layer: finger.to_string(),
                    pad_layer: SOURCEDRAIN.to_string(),
                    mesa_layer: MESA.to_string(),
                    gate_layer: gated.then(|| GATE.to_string()),
                    cover_bottom: cover,
                    pad_size: s.tlm_pad_size,
                })
            },
        )?;
        tlm.set_xmin(ito_res.bbox().p1.x + um(20.))
            .set_ymin(trans_ymax + um(50.));

        // Metal TLM with the gate layer standing in for the mesa
        let mut w_tlm = ctx.instantiate::<RectTlm>(&RectTlmParams {
            contact_l: s.tlm_contact_l,
            spacings: s.tlm_spacings.clone(),
            contact_w: s.tlm_contact_w,
            via_layer: VIA.to_string(),
            finger_layer: SOURCEDRAIN.to_string(),
            pad_layer: SOURCEDRAIN.to_string(),
            mesa_layer: GATE.to_string(),
            gate_layer: None,
            cover_bottom: false,
            pad_size: s.tlm_pad_size,
        })?;
        w_tlm
            .set_xmin(tlm.bbox().p0.x)
            .set_ymin(tlm.bbox().p1.y + um(50.));
        let tlm_xmax = ceil10(tlm.bbox().p1.x.max(w_tlm.bbox().p1.x));

        // Van der Pauw crosses
        let vdp_params = |gated: bool, rotation: f64, contact_size: (f64, f64)| VdpItoParams {
            gated,
            rotation,
            contact_size,
            pad_size: s.pad_size,
            pad_layer: SOURCEDRAIN.to_string(),
            cover_bottom: cover,
        };
        let mut vdp = gridsweep(
            &[true, false],
            &[0., 45.],
            Dims::from_um(50., 50.),
            |&gated, &rotation| {
                mask.instantiate_layout::<VdpIto>(&vdp_params(gated, rotation, (20., 10.)))
            },
        )?;
        vdp.set_xmin(tlm_xmax + um(50.))
            .set_ymin(trans_ymax + um(50.));
        let vdp_xmax = ceil10(vdp.bbox().p1.x);
        let vdp_ymax = ceil10(vdp.bbox().p1.y);

        let mut vdp_metal = gridsweep(
            &[()],
            &[SOURCEDRAIN, GATE],
            Dims::from_um(50., 50.),
            |_, layer| {
                mask.instantiate_layout::<VdpMetal>(&VdpMetalParams {
                    layer: layer.to_string(),
                    rotation: 45.,
                    pad_size: s.pad_size,
                })
            },
        )?;
        vdp_metal
            .set_xmin(vdp_xmax + um(50.))
            .set_ymin(vdp.bbox().p0.y);

        let mut vdp_fat = gridsweep(&[0., 45.], &[()], Dims::from_um(50., 50.), |&rotation, _| {
            mask.instantiate_layout::<VdpIto>(&vdp_params(true, rotation, (50., 20.)))
        })?;
        vdp_fat
            .set_xmin(tlm_xmax + um(50.))
            .set_ymin(vdp_ymax + um(50.));

        let mut vdp_w = ctx.instantiate::<VdpIto>(&VdpItoParams {
            gated: false,
            rotation: 45.,
            contact_size: (20., 10.),
            pad_size: s.pad_size,
            pad_layer: GATE.to_string(),
            cover_bottom: false,
        })?;
        vdp_w
            .set_xmin(vdp_xmax + um(50.))
            .set_ymin(vdp_ymax + um(50.));

        ctx.draw(litho)?;
        ctx.add_inst(circ_tlm);
        ctx.draw_all([mos, mim, metal_res])?;
        ctx.add_inst(via_tests);
        ctx.draw_all([trans, ito_res, tlm])?;
        ctx.add_inst(w_tlm);
        ctx.draw_all([vdp, vdp_metal, vdp_fat])?;
        ctx.add_inst(vdp_w);

        Ok(())
    }
}

impl TestChip {
    /// Alignment marks, normal and inverted resolution tests for every
    /// layer, and the step height bars.
    fn lithography(&self, ctx: &mut LayoutCtx) -> Result<Group> {
        let s = &self.params.sweeps;
        let layers = LAYER_ORDER
            .iter()
            .map(|name| ctx.layer(name))
            .collect::<Result<Vec<_>>>()?;

        let mut group = Group::new();
        let mut marks = ctx.instantiate::<AlignmentMark>(&AlignmentMarkParams {
            layers: layers.clone(),
        })?;
        marks.set_xmin(0).set_ymin(0);
        group.add_instance(marks);

        // A single mark sets the pitch of the resolution test grid.
        let single = ctx
            .instantiate::<AlignmentMark>(&AlignmentMarkParams {
                layers: layers[..2].to_vec(),
            })?
            .bbox();
        let (mark_w, mark_h) = (single.width(), single.height());

        for (n, &layer) in layers.iter().enumerate() {
            let n = n as i64;
            for i in 0..2i64 {
                let mut test = ctx.instantiate::<ResolutionTest>(&ResolutionTestParams {
                    resolutions: s.resolutions.clone(),
                    inverted: i == 1,
                    layer,
                })?;
                let w = test.bbox().width();
                test.set_xmin(i * (w + um(50.)) + n * (mark_w - um(50.)) + um(150.))
                    .set_ymin(3 * (mark_h + um(25.)) + um(100.) - n * (mark_h + um(40.)));
                group.add_instance(test);
            }
        }

        let mut steps = ctx.instantiate::<StepHeights>(&NoParams)?;
        steps.rotate(90.);
        steps
            .set_xmin(um(1200.))
            .set_ymin(3 * (mark_h + um(25.)) - um(50.));
        group.add_instance(steps);

        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::layers::LayerSet;

    fn small_sweeps() -> StandardSweeps {
        StandardSweeps {
            l_gate: vec![2., 5.],
            l_overlap: vec![2.],
            w_channel: vec![10., 20.],
            l_cap: vec![10., 50.],
            w_cap: vec![10.],
            l_resistor: vec![5.],
            w_resistor: vec![5.],
            sq_resistor: vec![49.],
            via_counts: vec![2, 4],
            tlm_spacings: vec![10., 20.],
            circ_tlm_spacings: vec![5., 10.],
            ..Default::default()
        }
    }

    #[test]
    fn chips_are_named_by_cover() {
        let ctx = MaskCtx::new(LayerSet::standard());
        for (cover, name) in [(false, "T1"), (true, "T2")] {
            let chip = TestChip::new(
                &TestChipParams {
                    cover_bottom: cover,
                    sweeps: small_sweeps(),
                },
                &ctx,
            )
            .unwrap();
            assert_eq!(chip.name(), name);
        }
    }

    #[test]
    fn capacitors_fill_the_lower_right_corner() {
        let ctx = MaskCtx::new(LayerSet::standard());
        let params = TestChipParams {
            cover_bottom: true,
            sweeps: small_sweeps(),
        };
        let inst = ctx.instantiate_layout::<TestChip>(&params).unwrap();
        let bbox = inst.bbox();
        assert!(bbox.p1.x >= um(7800.));
        assert!(bbox.p0.y <= 0);
        assert!(bbox.p0.x >= 0);
    }
}
