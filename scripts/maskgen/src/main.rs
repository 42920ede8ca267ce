use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use maskgen::{init_logger, ChipInputs};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Generate thin-film transistor test chips and wafer layouts as GDS files"
)]
pub struct Cli {
    /// Log at debug level unless `RUST_LOG` is set.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// A 3x3 array of four-layer test chips with alternating cover options.
    Standard(ChipArgs),
    /// A single four-layer test chip.
    TestChip {
        #[command(flatten)]
        chip: ChipArgs,
        /// Extend the source/drain layer over the bottom electrodes.
        #[arg(long)]
        cover_bottom: bool,
    },
    /// The three-layer back-gate chip.
    BackGate(ChipArgs),
    /// Consolidate finished designs onto a wafer.
    Wafer {
        /// TOML file listing the designs.
        config: PathBuf,
        /// The output GDS file.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Merge GDS files with automatic renaming of duplicate cells.
    Merge {
        /// The output GDS file.
        #[arg(short, long)]
        output: PathBuf,
        /// The input GDS files.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct ChipArgs {
    /// TOML file overriding the default parameter sweeps.
    #[arg(short, long)]
    sweeps: Option<PathBuf>,
    /// CSV file of `name,layer,datatype,description` rows overriding the default layers.
    #[arg(short, long)]
    layers: Option<PathBuf>,
    /// The output GDS file.
    #[arg(short, long)]
    output: PathBuf,
}

impl From<ChipArgs> for ChipInputs {
    fn from(args: ChipArgs) -> Self {
        Self {
            sweeps: args.sweeps,
            layers: args.layers,
            output: args.output,
        }
    }
}

pub fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Command::Standard(chip) => {
            maskgen::write_standard(&chip.into()).context("failed to write standard chips")?
        }
        Command::TestChip { chip, cover_bottom } => {
            maskgen::write_test_chip(&chip.into(), cover_bottom)
                .context("failed to write test chip")?
        }
        Command::BackGate(chip) => {
            maskgen::write_back_gate(&chip.into()).context("failed to write back-gate chip")?
        }
        Command::Wafer { config, output } => {
            maskgen::write_wafer(config, output).context("failed to write wafer")?
        }
        Command::Merge { output, inputs } => {
            maskgen::merge(output, inputs).context("failed to merge GDS files")?
        }
    }
    Ok(())
}
