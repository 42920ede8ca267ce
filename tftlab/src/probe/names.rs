//! Device parameters encoded in measurement file names.
//!
//! Files from the 4155 parameter analyzer are named with `_`-separated
//! fields such as `wafer_O_D4_TLM_100.dat`. Keysight exports separate a
//! timestamp, the device, the test and a note with `;`, and name the device
//! `kind_W_L_cell`, for example `mos_50_80_A5`.

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};

use super::error::ProbeError;

/// Width of the TLM contacts, in microns.
pub const TLM_WIDTH: f64 = 50.;
/// Number of rows and columns of chips on a wafer.
pub const WAFER_CELLS: usize = 8;

lazy_static! {
    static ref CELL_RE: Regex = Regex::new(r"^([A-Ha-h])([1-8])$").unwrap();
}

/// A chip position on the wafer, such as `A1`.
///
/// Rows are lettered `A` to `H` from the top, columns numbered 1 to 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaferCell {
    pub row: usize,
    pub col: usize,
}

impl FromStr for WaferCell {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = CELL_RE
            .captures(s.trim())
            .ok_or_else(|| ProbeError::BadFileName(s.to_string()))?;
        let row = caps[1].to_ascii_uppercase().as_bytes()[0] - b'A';
        let col = caps[2].as_bytes()[0] - b'1';
        Ok(Self {
            row: row as usize,
            col: col as usize,
        })
    }
}

impl Display for WaferCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", (b'A' + self.row as u8) as char, self.col + 1)
    }
}

impl Serialize for WaferCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The `_`-separated fields of the file stem.
fn stem_fields(path: &Path) -> Result<Vec<String>, ProbeError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ProbeError::BadFileName(path.display().to_string()))?;
    Ok(stem.split('_').map(str::to_string).collect())
}

fn number_at(path: &Path, fields: &[String], idx: Option<usize>) -> Result<f64, ProbeError> {
    idx.and_then(|i| fields.get(i))
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| ProbeError::BadFileName(path.display().to_string()))
}

/// The contact spacing of a TLM file `…_TLM_<L>…`, in microns.
pub fn tlm_length(path: impl AsRef<Path>) -> Result<f64, ProbeError> {
    let path = path.as_ref();
    let fields = stem_fields(path)?;
    number_at(path, &fields, Some(4))
}

/// Width and length of an ITO resistor file `…_itores_<W>_<L>…`, in microns.
pub fn ito_resistor_size(path: impl AsRef<Path>) -> Result<(f64, f64), ProbeError> {
    let path = path.as_ref();
    let fields = stem_fields(path)?;
    Ok((
        number_at(path, &fields, Some(4))?,
        number_at(path, &fields, Some(5))?,
    ))
}

/// Width and gate length of a transistor file `…_<W>_<L>_<Lov>`, in microns.
pub fn transistor_size(path: impl AsRef<Path>) -> Result<(f64, f64), ProbeError> {
    let path = path.as_ref();
    let fields = stem_fields(path)?;
    let n = fields.len();
    Ok((
        number_at(path, &fields, n.checked_sub(3))?,
        number_at(path, &fields, n.checked_sub(2))?,
    ))
}

/// The wafer cell of a four-probe file `wafer_<id>_<cell>_…`.
pub fn vdp_cell(path: impl AsRef<Path>) -> Result<WaferCell, ProbeError> {
    let path = path.as_ref();
    let fields = stem_fields(path)?;
    fields
        .get(2)
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| ProbeError::BadFileName(path.display().to_string()))
}

/// A device named in a Keysight export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceName {
    /// Device kind, such as `mos`, `mim` or `W2`.
    pub kind: String,
    /// Numeric dimensions following the kind, in microns.
    pub dims: Vec<f64>,
    pub cell: Option<WaferCell>,
    /// The free-form note of the export.
    pub note: String,
}

impl DeviceName {
    /// Parses the device from a Keysight file name such as
    /// `2_4_2025 11_27_09 AM;mim_50_20_A1;I_V Sweep(1);.csv`.
    pub fn from_keysight(path: impl AsRef<Path>) -> Result<Self, ProbeError> {
        let path = path.as_ref();
        let bad = || ProbeError::BadFileName(path.display().to_string());
        let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(bad)?;
        let mut parts = stem.split(';');
        let device = parts.nth(1).ok_or_else(bad)?;
        let note = parts.nth(1).unwrap_or_default().to_string();

        let mut fields = device.split('_');
        let kind = fields.next().filter(|k| !k.is_empty()).ok_or_else(bad)?;
        let mut dims = Vec::new();
        let mut cell = None;
        for field in fields {
            if let Ok(value) = field.parse::<f64>() {
                dims.push(value);
            } else {
                cell = Some(field.parse::<WaferCell>().map_err(|_| bad())?);
            }
        }
        Ok(Self {
            kind: kind.to_string(),
            dims,
            cell,
            note,
        })
    }

    pub fn w(&self) -> Option<f64> {
        self.dims.first().copied()
    }

    pub fn l(&self) -> Option<f64> {
        self.dims.get(1).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wafer_cells() {
        let cell: WaferCell = "C5".parse().unwrap();
        assert_eq!(cell, WaferCell { row: 2, col: 4 });
        assert_eq!(cell.to_string(), "C5");
        assert!("I1".parse::<WaferCell>().is_err());
        assert!("A9".parse::<WaferCell>().is_err());
    }

    #[test]
    fn analyzer_file_names() {
        assert_eq!(tlm_length("wafer_O/wafer_O_D4_TLM_100.dat").unwrap(), 100.);
        assert_eq!(
            ito_resistor_size("wafer_O_D4_itores_100_2.dat").unwrap(),
            (100., 2.)
        );
        assert_eq!(
            transistor_size("wafer_V/wafer_V_G8_transistor_100_5_10.dat").unwrap(),
            (100., 5.)
        );
        assert_eq!(
            vdp_cell("wafer_M/wafer_M_B7_4probe.dat").unwrap(),
            WaferCell { row: 1, col: 6 }
        );
        assert!(tlm_length("wafer_O_D4_TLM.dat").is_err());
    }

    #[test]
    fn keysight_device_names() {
        let name = DeviceName::from_keysight(
            "2_4_2025 12_01_57 PM;mos_50_80_A5;I_V Sweep(66);leakage goes down.csv",
        )
        .unwrap();
        assert_eq!(name.kind, "mos");
        assert_eq!(name.w(), Some(50.));
        assert_eq!(name.l(), Some(80.));
        assert_eq!(name.cell, Some(WaferCell { row: 0, col: 4 }));
        assert_eq!(name.note, "leakage goes down");

        let wire = DeviceName::from_keysight("1_30_2025 2_59_37 PM;W2_100;I_V Sweep(2);.csv")
            .unwrap();
        assert_eq!(wire.kind, "W2");
        assert_eq!(wire.dims, vec![100.]);
        assert_eq!(wire.cell, None);
    }
}
