use std::path::{Path, PathBuf};

use log::{info, warn};
use tftlab::error::Result;
use tftlab::io::read_to_string;
use tftlab::probe::dat::{read_cell_values, DatFile};
use tftlab::probe::extract::{
    self, MapSummary, MetalResult, SquaresResult, TlmResult, WaferMap,
};
use tftlab::probe::fit::fit_xy;
use tftlab::probe::names::{
    ito_resistor_size, tlm_length, transistor_size, vdp_cell, DeviceName, TLM_WIDTH,
};
use tftlab::probe::report::{
    CellRecord, LeakageRecord, OutputRecord, ResistanceRecord, TransferRecord,
};
use tftlab::probe::{IvCurve, KeysightFile, ProbeError, TransferCurves};
use tftlab::Log;
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

fn is_keysight(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn first_sweep(path: &Path) -> Result<IvCurve> {
    let file = KeysightFile::load(path)?;
    let sweep = file
        .first()
        .ok_or_else(|| ProbeError::MissingHeader("DataName".to_string()))?;
    Ok(sweep.iv())
}

/// Fits the two-terminal resistance of each TLM file, then the TLM model.
pub fn tlm(files: &[PathBuf], width: Option<f64>) -> Result<(Vec<ResistanceRecord>, TlmResult)> {
    let width = width.unwrap_or(TLM_WIDTH);
    let mut records = Vec::new();
    for path in files {
        let l = tlm_length(path)?;
        let res = extract::resistance(&DatFile::load(path)?.two_terminal()?)?;
        info!("{}: L = {l} um", path.display());
        res.log();
        records.push(ResistanceRecord::new(path, Some(width), Some(l), res));
    }

    let points: Vec<(f64, f64)> = records
        .iter()
        .filter_map(|rec| rec.l.map(|l| (l, rec.r)))
        .collect();
    let result = extract::tlm(&points, width)?;
    result.log();
    Ok((records, result))
}

/// Fits each ITO resistor, then resistance against squares.
///
/// With `source_sweep`, the current is read from the three-terminal block.
pub fn ito(files: &[PathBuf], source_sweep: bool) -> Result<(Vec<ResistanceRecord>, SquaresResult)> {
    let mut records = Vec::new();
    for path in files {
        let (w, l) = ito_resistor_size(path)?;
        let dat = DatFile::load(path)?;
        let curve = if source_sweep {
            dat.source_sweep()?
        } else {
            dat.two_terminal()?
        };
        let res = extract::resistance(&curve)?;
        info!("{}: W = {w} um, L = {l} um", path.display());
        res.log();
        records.push(ResistanceRecord::new(path, Some(w), Some(l), res));
    }

    let resistors: Vec<(f64, f64, f64)> = records
        .iter()
        .filter_map(|rec| Some((rec.w?, rec.l?, rec.r)))
        .collect();
    let result = extract::ito_resistors(&resistors)?;
    result.log();
    Ok((records, result))
}

/// Fits a metal line measured on the Keysight analyzer over its full sweep.
///
/// `thickness` is in meters.
pub fn metal(files: &[PathBuf], squares: f64, thickness: f64) -> Result<Vec<MetalResult>> {
    let mut results = Vec::new();
    for path in files {
        let curve = first_sweep(path)?;
        let fit = fit_xy(&curve.i, &curve.v)?;
        let res = extract::metal_resistor(fit.slope, squares, thickness);
        info!("{}: r^2 = {:.4}", path.display(), fit.r2);
        res.log();
        results.push(res);
    }
    Ok(results)
}

/// Fits each four-probe file and places the sheet resistance on a wafer map.
pub fn vdp(files: &[PathBuf]) -> Result<(Vec<CellRecord>, Option<MapSummary>)> {
    let mut map = WaferMap::new();
    for path in files {
        let cell = vdp_cell(path)?;
        let res = extract::four_probe(&DatFile::load(path)?.four_probe()?)?;
        info!("{}: cell {cell}", path.display());
        res.log();
        map.set(cell, res.r);
    }
    let summary = map.summary();
    if let Some(summary) = &summary {
        summary.log();
    }
    let records = map
        .cells()
        .map(|(cell, rsheet)| CellRecord { cell, rsheet })
        .collect();
    Ok((records, summary))
}

/// Summarizes a wafer map file of `cell,value` lines.
pub fn wafer_map(path: impl AsRef<Path>) -> Result<(Vec<CellRecord>, Option<MapSummary>)> {
    let mut map = WaferMap::new();
    for (name, value) in read_cell_values(&read_to_string(path)?)? {
        match name.parse() {
            Ok(cell) => map.set(cell, value),
            Err(err) => warn!("skipping row: {err}"),
        }
    }
    let summary = map.summary();
    if let Some(summary) = &summary {
        summary.log();
    }
    let records = map
        .cells()
        .map(|(cell, rsheet)| CellRecord { cell, rsheet })
        .collect();
    Ok((records, summary))
}

fn keysight_transfer(path: &Path) -> Result<TransferCurves> {
    let file = KeysightFile::load(path)?;
    let mut curves = TransferCurves::default();
    for sweep in &file.sweeps {
        let iv = sweep.iv();
        if curves.vg.is_empty() {
            curves.vg = iv.v;
        }
        curves.vd.push(sweep.column(2).first().copied().unwrap_or(f64::NAN));
        curves.id.push(iv.i);
        curves.ig.push(sweep.gate_current().unwrap_or_default());
    }
    Ok(curves)
}

/// Analyzes transfer curves from `.dat` files or Keysight `.csv` exports.
///
/// Output sweeps that follow a transfer sweep in a `.dat` file are summarized too.
pub fn transistor(files: &[PathBuf]) -> Result<(Vec<TransferRecord>, Vec<OutputRecord>)> {
    let mut records = Vec::new();
    let mut outputs = Vec::new();
    for path in files {
        let (w, l, curves) = if is_keysight(path) {
            let name = DeviceName::from_keysight(path)?;
            let (w, l) = (name.w().unwrap_or(f64::NAN), name.l().unwrap_or(f64::NAN));
            (w, l, keysight_transfer(path)?)
        } else {
            let (w, l) = transistor_size(path)?;
            let sweeps = DatFile::load(path)?.transistor()?;
            if let Some(output) = &sweeps.output {
                for res in extract::output_curves(output)? {
                    res.log();
                    outputs.push(OutputRecord::new(path, w, l, res));
                }
            }
            (w, l, sweeps.transfer)
        };
        info!("{}: W = {w} um, L = {l} um", path.display());
        for res in extract::transfer_curves(&curves)? {
            res.log();
            records.push(TransferRecord::new(path, w, l, res));
        }
    }
    Ok((records, outputs))
}

/// Reads the low-bias leakage of Keysight capacitor sweeps.
pub fn cap_leakage(files: &[PathBuf]) -> Result<Vec<LeakageRecord>> {
    let mut records = Vec::new();
    for path in files {
        let name = DeviceName::from_keysight(path)?;
        let (Some(w), Some(l)) = (name.w(), name.l()) else {
            warn!("{}: no device size in file name, skipping", path.display());
            continue;
        };
        let file = KeysightFile::load(path)?;
        for sweep in &file.sweeps {
            let res = extract::cap_leakage(&sweep.iv(), w, l)?;
            info!("{}: {} {w} x {l} um", path.display(), name.kind);
            res.log();
            records.push(LeakageRecord::new(path, name.kind.clone(), w, l, res));
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use tempdir::TempDir;

    use super::*;

    fn two_terminal(r: f64) -> String {
        let mut text = String::from("TEST,res\nIA,V,I,T\n");
        for n in 0..=10 {
            let v = n as f64 / 10.;
            text.push_str(&format!("{n},{v},{},{n}\n", v / r));
        }
        text
    }

    #[test]
    fn tlm_fit_over_files() {
        let dir = TempDir::new("probefit").unwrap();
        // Rsheet = 1e4 Ohm/sq, Rc W = 1e-3 Ohm m over 50 um wide contacts.
        let files: Vec<PathBuf> = [10., 50., 100.]
            .iter()
            .map(|l| {
                let path = dir.path().join(format!("wafer_O_D4_TLM_{l}.dat"));
                let r = (1e4 * l * 1e-6 + 2e-3) / 50e-6;
                std::fs::write(&path, two_terminal(r)).unwrap();
                path
            })
            .collect();

        let (records, result) = tlm(&files, None).unwrap();
        assert_eq!(records.len(), 3);
        assert_float_eq!(result.rsheet, 1e4, rmax <= 1e-6);
        assert_float_eq!(result.rc, 1e-3, rmax <= 1e-6);
    }

    #[test]
    fn bad_file_names_are_reported() {
        let dir = TempDir::new("probefit").unwrap();
        let path = dir.path().join("tlm.dat");
        std::fs::write(&path, two_terminal(1.)).unwrap();
        assert!(tlm(&[path], None).is_err());
    }

    #[test]
    fn leakage_from_keysight_names() {
        let dir = TempDir::new("probefit").unwrap();
        let path = dir
            .path()
            .join("2_4_2025 11_27_09 AM;mim_50_20_A1;I_V Sweep(1);.csv");
        std::fs::write(
            &path,
            "DataName, V, V2, I, I2\nDataValue, 0, 0, 1e-12, 0\nDataValue, 1, 0, 1e-9, 0\n",
        )
        .unwrap();
        let records = cap_leakage(&[path]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, "mim");
        assert_float_eq!(records[0].per_area, 1e-12, rmax <= 1e-9);
    }

    #[test]
    fn transistor_output_sweeps_are_recorded() {
        let dir = TempDir::new("probefit").unwrap();
        let path = dir.path().join("wafer_O_tft_10_5_1.dat");
        std::fs::write(
            &path,
            "ID:,G\nSTART:,-1\nSTOP:,1\nPNTS:,3\n\nID:,D\nSTART:,0.5\nSTOP:,5\nPNTS:,2\n\n\
             DATA:\nIS,a,b,c,d,e,f,g,h,i\n\
             x,x,x,x,1e-9,2e-9,-1,1e-12,2e-12\n\
             x,x,x,x,1e-7,2e-7,0,1e-12,2e-12\n\
             x,x,x,x,1e-5,2e-5,1,1e-12,2e-12\n\
             TEST,output\nID:,G\nSTART:,0\nSTOP:,2\nPNTS:,2\n\nDATA:\nIS\n\
             a,b,0.0,1e-9,2e-9,x,x,1e-12,1e-12\n\
             a,b,1.0,1e-6,2e-6,x,x,1e-12,1e-12\nTEST\n",
        )
        .unwrap();

        let (transfer, output) = transistor(&[path]).unwrap();
        assert_eq!(transfer.len(), 2);
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].file, "wafer_O_tft_10_5_1.dat");
        assert_float_eq!(output[0].w, 10., abs <= 1e-12);
        assert_float_eq!(output[1].vg, 2., abs <= 1e-12);
        assert_float_eq!(output[1].id_max, 2e-6, rmax <= 1e-12);
    }

    #[test]
    fn wafer_map_files() {
        let dir = TempDir::new("probefit").unwrap();
        let path = dir.path().join("resistivity.dat");
        std::fs::write(&path, "A1,100\nB2,300\nZ9,5\n").unwrap();
        let (records, summary) = wafer_map(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_float_eq!(summary.unwrap().mean, 200., abs <= 1e-9);
    }
}
