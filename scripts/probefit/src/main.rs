use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use probefit::init_logger;
use tftlab::probe::report::{sibling_path, write_csv};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Fit probe-station measurements of thin-film test structures"
)]
pub struct Cli {
    /// Log at debug level unless `RUST_LOG` is set.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Write the per-device results to this CSV file.
    ///
    /// Fitted parameters of the whole set go to a `_summary` file beside it,
    /// and transistor output curves to an `_output` file.
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Contact and sheet resistance from TLM files named `…_TLM_<L>.dat`.
    Tlm {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Contact width in microns.
        #[arg(long)]
        width: Option<f64>,
    },
    /// Contact and sheet resistance from ITO resistors named `…_itores_<W>_<L>.dat`.
    Ito {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Read the three-terminal source sweep instead of the two-terminal block.
        #[arg(long)]
        source_sweep: bool,
    },
    /// Sheet resistance and resistivity of metal lines from Keysight exports.
    Metal {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Length of the line in squares.
        #[arg(long)]
        squares: f64,
        /// Film thickness in meters.
        #[arg(long)]
        thickness: f64,
    },
    /// Sheet resistance over the wafer from four-probe files named `wafer_<id>_<cell>_….dat`.
    Vdp {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Mean and spread of a wafer map file of `cell,value` lines.
    Map { file: PathBuf },
    /// Threshold voltage, subthreshold slope and on/off ratio of transistors.
    Transistor {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Low-bias leakage of capacitors from Keysight exports.
    CapLeakage {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

pub fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    let output = cli.output;

    macro_rules! report {
        ($suffix:literal, $records:expr) => {
            if let Some(path) = &output {
                let path = sibling_path(path, $suffix);
                write_csv(&path, &$records)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
        };
        ($records:expr) => {
            if let Some(path) = &output {
                write_csv(path, &$records)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
        };
    }

    match cli.command {
        Command::Tlm { files, width } => {
            let (records, result) = probefit::tlm(&files, width).context("TLM fit failed")?;
            report!(records);
            report!("summary", [result]);
        }
        Command::Ito {
            files,
            source_sweep,
        } => {
            let (records, result) =
                probefit::ito(&files, source_sweep).context("ITO resistor fit failed")?;
            report!(records);
            report!("summary", [result]);
        }
        Command::Metal {
            files,
            squares,
            thickness,
        } => {
            let results =
                probefit::metal(&files, squares, thickness).context("metal resistor fit failed")?;
            report!(results);
        }
        Command::Vdp { files } => {
            let (records, summary) = probefit::vdp(&files).context("four-probe fit failed")?;
            report!(records);
            report!("summary", Vec::from_iter(summary));
        }
        Command::Map { file } => {
            let (records, summary) =
                probefit::wafer_map(&file).context("failed to read wafer map")?;
            report!(records);
            report!("summary", Vec::from_iter(summary));
        }
        Command::Transistor { files } => {
            let (records, outputs) =
                probefit::transistor(&files).context("transistor analysis failed")?;
            report!(records);
            if !outputs.is_empty() {
                report!("output", outputs);
            }
        }
        Command::CapLeakage { files } => {
            let records = probefit::cap_leakage(&files).context("leakage analysis failed")?;
            report!(records);
        }
    }
    Ok(())
}
