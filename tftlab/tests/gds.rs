use float_eq::assert_float_eq;
use tftlab::data::MaskCtx;
use tftlab::devices::transistor::{Transistor, TransistorParams};
use tftlab::layout::layers::{LayerSet, GATE, SOURCEDRAIN};

mod common;
use common::{out_dir, out_path};

#[test]
fn transistor_round_trips_through_gds() {
    let dir = out_dir("gds_round_trip");
    let path = out_path(&dir, "transistor.gds");
    let params = TransistorParams::sweep(5., 2., 20., true);

    let ctx = MaskCtx::new(LayerSet::standard());
    ctx.write_layout::<Transistor>(&params, &path)
        .expect("failed to write transistor");
    let generated = ctx.instantiate_layout::<Transistor>(&params).unwrap();

    let imported = MaskCtx::new(LayerSet::standard());
    let cells = imported
        .from_gds(&path)
        .expect("GDS library should be imported successfully");
    let cell = cells
        .get(generated.cell().name())
        .expect("top cell should keep its name");

    assert_eq!(cell.bbox(), generated.cell().bbox());
    for name in [GATE, SOURCEDRAIN] {
        let layer = ctx.layers().get(name).unwrap();
        assert_float_eq!(
            cell.layer_region(layer).area(),
            generated.cell().layer_region(layer).area(),
            rmax <= 1e-9
        );
    }
}

#[test]
fn importing_a_missing_file_fails() {
    let dir = out_dir("gds_missing");
    let ctx = MaskCtx::new(LayerSet::standard());
    assert!(ctx.from_gds(out_path(&dir, "missing.gds")).is_err());
}
