//! CSV summaries of analyzed measurements.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::extract::{CapLeakage, OutputResult, Resistance, TransferResult};
use super::names::WaferCell;
use crate::error::{with_err_context, ErrorContext, Result};
use crate::io::{create_file, create_parent_dir};
use crate::log;

/// The resistance of one measured device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResistanceRecord {
    pub file: String,
    /// Device width in microns, when the file name encodes one.
    pub w: Option<f64>,
    /// Device length in microns.
    pub l: Option<f64>,
    pub r: f64,
    pub r2: f64,
}

impl ResistanceRecord {
    pub fn new(file: impl AsRef<Path>, w: Option<f64>, l: Option<f64>, res: Resistance) -> Self {
        Self {
            file: file_name(file),
            w,
            l,
            r: res.r,
            r2: res.r2,
        }
    }
}

/// The sheet resistance of one wafer cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellRecord {
    pub cell: WaferCell,
    pub rsheet: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRecord {
    pub file: String,
    pub w: f64,
    pub l: f64,
    pub vd: f64,
    pub gm_max: f64,
    pub vth: f64,
    pub ss: Option<f64>,
    pub on_off: f64,
    pub ig_max: f64,
}

impl TransferRecord {
    pub fn new(file: impl AsRef<Path>, w: f64, l: f64, res: TransferResult) -> Self {
        Self {
            file: file_name(file),
            w,
            l,
            vd: res.vd,
            gm_max: res.gm_max,
            vth: res.vth,
            ss: res.ss,
            on_off: res.on_off,
            ig_max: res.ig_max,
        }
    }
}

/// One output curve of a transistor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub file: String,
    pub w: f64,
    pub l: f64,
    pub vg: f64,
    pub id_max: f64,
    pub g_lin: f64,
    pub ig_max: f64,
}

impl OutputRecord {
    pub fn new(file: impl AsRef<Path>, w: f64, l: f64, res: OutputResult) -> Self {
        Self {
            file: file_name(file),
            w,
            l,
            vg: res.vg,
            id_max: res.id_max,
            g_lin: res.g_lin,
            ig_max: res.ig_max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakageRecord {
    pub file: String,
    pub kind: String,
    pub w: f64,
    pub l: f64,
    pub i_max: f64,
    pub per_area: f64,
    pub per_perimeter: f64,
}

impl LeakageRecord {
    pub fn new(
        file: impl AsRef<Path>,
        kind: impl Into<String>,
        w: f64,
        l: f64,
        res: CapLeakage,
    ) -> Self {
        Self {
            file: file_name(file),
            kind: kind.into(),
            w,
            l,
            i_max: res.i_max,
            per_area: res.per_area,
            per_perimeter: res.per_perimeter,
        }
    }
}

fn file_name(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// The path next to `path` with `_{suffix}` appended to its file stem.
///
/// `out/tlm.csv` with suffix `summary` becomes `out/tlm_summary.csv`.
pub fn sibling_path(path: impl AsRef<Path>, suffix: &str) -> PathBuf {
    let path = path.as_ref();
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{suffix}"),
    };
    path.with_file_name(name)
}

/// Writes `records` to `path` as CSV with a header row.
pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, records: &[T]) -> Result<()> {
    let path = path.as_ref();
    create_parent_dir(path)?;
    let file = create_file(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for record in records {
        with_err_context(writer.serialize(record), || {
            ErrorContext::CreateFile(path.to_path_buf())
        })?;
    }
    with_err_context(writer.flush(), || ErrorContext::CreateFile(path.to_path_buf()))?;
    log::info!("wrote {} records to {:?}", records.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn records_are_written_with_headers() {
        let dir = TempDir::new("tftlab-report").unwrap();
        let path = dir.path().join("out/tlm.csv");
        let records = [
            ResistanceRecord::new(
                "data/wafer_O_D4_TLM_100.dat",
                Some(50.),
                Some(100.),
                Resistance { r: 1e3, r2: 1. },
            ),
            ResistanceRecord::new("wafer_O_D4_TLM_x.dat", None, None, Resistance { r: 2., r2: 0.5 }),
        ];
        write_csv(&path, &records).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "file,w,l,r,r2");
        assert_eq!(lines[1], "wafer_O_D4_TLM_100.dat,50.0,100.0,1000.0,1.0");
        assert_eq!(lines[2], "wafer_O_D4_TLM_x.dat,,,2.0,0.5");
    }

    #[test]
    fn sibling_paths_keep_the_extension() {
        assert_eq!(
            sibling_path("out/tlm.csv", "summary"),
            PathBuf::from("out/tlm_summary.csv")
        );
        assert_eq!(sibling_path("tlm", "output"), PathBuf::from("tlm_output"));
    }

    #[test]
    fn cells_are_written_by_name() {
        let dir = TempDir::new("tftlab-report").unwrap();
        let path = dir.path().join("vdp.csv");
        write_csv(
            &path,
            &[CellRecord {
                cell: "B7".parse().unwrap(),
                rsheet: 10.,
            }],
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "cell,rsheet\nB7,10.0\n");
    }
}
