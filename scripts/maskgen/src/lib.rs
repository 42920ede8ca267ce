use std::path::{Path, PathBuf};

use tftlab::chips::{
    merge_gds, BackGateChip, BackGateChipParams, StandardTestStructures,
    StandardTestStructuresParams, TestChip, TestChipParams, Wafer, WaferParams,
};
use tftlab::config::{load_toml, BackGateSweeps, StandardSweeps, WaferConfig};
use tftlab::data::MaskCtx;
use tftlab::layout::layers::LayerSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_logger(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

fn layers_or(path: Option<&Path>, default: fn() -> LayerSet) -> tftlab::error::Result<LayerSet> {
    match path {
        Some(path) => LayerSet::from_csv_file(path),
        None => Ok(default()),
    }
}

fn sweeps_or_default<T>(path: Option<&Path>) -> tftlab::error::Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    match path {
        Some(path) => load_toml(path),
        None => Ok(T::default()),
    }
}

/// Inputs shared by the chip generators.
#[derive(Debug, Clone, Default)]
pub struct ChipInputs {
    /// TOML file overriding the default sweeps.
    pub sweeps: Option<PathBuf>,
    /// CSV file overriding the default layers.
    pub layers: Option<PathBuf>,
    pub output: PathBuf,
}

pub fn write_standard(inputs: &ChipInputs) -> tftlab::error::Result<()> {
    let layers = layers_or(inputs.layers.as_deref(), LayerSet::standard)?;
    let sweeps: StandardSweeps = sweeps_or_default(inputs.sweeps.as_deref())?;
    let ctx = MaskCtx::new(layers);
    ctx.write_layout::<StandardTestStructures>(
        &StandardTestStructuresParams { sweeps },
        &inputs.output,
    )
}

pub fn write_test_chip(inputs: &ChipInputs, cover_bottom: bool) -> tftlab::error::Result<()> {
    let layers = layers_or(inputs.layers.as_deref(), LayerSet::standard)?;
    let sweeps: StandardSweeps = sweeps_or_default(inputs.sweeps.as_deref())?;
    let ctx = MaskCtx::new(layers);
    ctx.write_layout::<TestChip>(
        &TestChipParams {
            cover_bottom,
            sweeps,
        },
        &inputs.output,
    )
}

pub fn write_back_gate(inputs: &ChipInputs) -> tftlab::error::Result<()> {
    let layers = layers_or(inputs.layers.as_deref(), LayerSet::back_gate)?;
    let sweeps: BackGateSweeps = sweeps_or_default(inputs.sweeps.as_deref())?;
    let ctx = MaskCtx::new(layers);
    ctx.write_layout::<BackGateChip>(&BackGateChipParams { sweeps }, &inputs.output)
}

/// Places the designs listed in `config` on a wafer.
pub fn write_wafer(config: impl AsRef<Path>, output: impl AsRef<Path>) -> tftlab::error::Result<()> {
    let config: WaferConfig = load_toml(config)?;
    let ctx = MaskCtx::new(LayerSet::standard());
    ctx.write_layout::<Wafer>(&WaferParams::from(config), output)
}

pub fn merge<T: AsRef<Path>>(
    output: impl AsRef<Path>,
    inputs: impl IntoIterator<Item = T>,
) -> tftlab::error::Result<()> {
    merge_gds(output, inputs)
}
