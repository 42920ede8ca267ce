use tftlab::chips::{
    merge_gds, BackGateChip, BackGateChipParams, StandardTestStructures,
    StandardTestStructuresParams, TestChip, TestChipParams, Wafer, WaferParams,
};
use tftlab::config::DesignRef;
use tftlab::data::MaskCtx;
use tftlab::error::ErrorSource;
use tftlab::layout::layers::LayerSet;

mod common;
use common::{out_dir, out_path, small_back_gate_sweeps, small_sweeps};

#[test]
fn standard_chips_are_written() {
    let dir = out_dir("standard_chips");
    let path = out_path(&dir, "build/standard.gds");
    let ctx = MaskCtx::new(LayerSet::standard());
    ctx.write_layout::<StandardTestStructures>(
        &StandardTestStructuresParams {
            sweeps: small_sweeps(),
        },
        &path,
    )
    .expect("failed to write standard chips");

    let cells = MaskCtx::new(LayerSet::standard()).from_gds(&path).unwrap();
    assert!(cells.contains_key("top"));
    assert!(cells.contains_key("T1"));
    assert!(cells.contains_key("T2"));
}

#[test]
fn back_gate_chip_fits_the_sample() {
    let dir = out_dir("back_gate_chip");
    let path = out_path(&dir, "back_gate.gds");
    let ctx = MaskCtx::new(LayerSet::back_gate());
    let params = BackGateChipParams {
        sweeps: small_back_gate_sweeps(),
    };
    ctx.write_layout::<BackGateChip>(&params, &path)
        .expect("failed to write back-gate chip");

    let inst = ctx.instantiate_layout::<BackGateChip>(&params).unwrap();
    let bbox = inst.cell().bbox();
    assert!(bbox.p0.x >= 0 && bbox.p0.y >= 0);
    assert!(bbox.p1.x <= tftgeom::um(params.sweeps.sample_w));
    assert!(bbox.p1.y <= tftgeom::um(params.sweeps.sample_w));
}

#[test]
fn wafer_consolidates_written_chips() {
    let dir = out_dir("wafer");
    let chip_a = out_path(&dir, "chip_a.gds");
    let chip_b = out_path(&dir, "chip_b.gds");
    for (path, cover_bottom) in [(&chip_a, false), (&chip_b, true)] {
        MaskCtx::new(LayerSet::standard())
            .write_layout::<TestChip>(
                &TestChipParams {
                    cover_bottom,
                    sweeps: small_sweeps(),
                },
                path,
            )
            .unwrap();
    }

    let params = WaferParams {
        designs: vec![
            DesignRef {
                path: chip_a,
                cell: "T1".to_string(),
            },
            DesignRef {
                path: chip_b,
                cell: "T2".to_string(),
            },
        ],
    };
    let ctx = MaskCtx::new(LayerSet::standard());
    let wafer = ctx.instantiate_layout::<Wafer>(&params).unwrap();
    // Two copies of each design in the main grid and one in each offset row.
    let designs = wafer
        .cell()
        .insts()
        .filter(|inst| inst.cell().name().starts_with("chip_"))
        .count();
    assert_eq!(designs, 8);

    let path = out_path(&dir, "wafer.gds");
    ctx.write_layout::<Wafer>(&params, &path).unwrap();
    assert!(path.exists());
}

#[test]
fn wafer_reports_missing_cells() {
    let dir = out_dir("wafer_missing_cell");
    let chip = out_path(&dir, "chip.gds");
    MaskCtx::new(LayerSet::standard())
        .write_layout::<TestChip>(
            &TestChipParams {
                cover_bottom: false,
                sweeps: small_sweeps(),
            },
            &chip,
        )
        .unwrap();

    let params = WaferParams {
        designs: vec![DesignRef {
            path: chip,
            cell: "nonexistent".to_string(),
        }],
    };
    let err = MaskCtx::new(LayerSet::standard())
        .instantiate_layout::<Wafer>(&params)
        .unwrap_err();
    assert!(format!("{err}").contains("nonexistent"));
}

#[test]
fn merged_chips_keep_every_cell() {
    let dir = out_dir("merge_chips");
    let a = out_path(&dir, "a.gds");
    let b = out_path(&dir, "b.gds");
    for path in [&a, &b] {
        MaskCtx::new(LayerSet::back_gate())
            .write_layout::<BackGateChip>(
                &BackGateChipParams {
                    sweeps: small_back_gate_sweeps(),
                },
                path,
            )
            .unwrap();
    }
    let out = out_path(&dir, "merged.gds");
    merge_gds(&out, [&a, &b]).unwrap();

    let single = MaskCtx::new(LayerSet::new()).from_gds(&a).unwrap().len();
    let merged = MaskCtx::new(LayerSet::new()).from_gds(&out).unwrap().len();
    assert_eq!(merged, 2 * single);
}

#[test]
fn failed_generation_reports_the_same_error_again() {
    let ctx = MaskCtx::new(LayerSet::standard());
    for _ in 0..2 {
        let err = ctx
            .instantiate_layout::<Wafer>(&WaferParams::default())
            .unwrap_err();
        assert!(
            matches!(err.source(), ErrorSource::InvalidArgs(_)),
            "unexpected error: {err}"
        );
    }
}
