//! CSV exports of the Keysight parameter analyzer.
//!
//! Every sweep is a `DataName` row naming the columns followed by
//! `DataValue` rows. Other rows (metadata, `AnalysisSetup`, ...) end a sweep.

use std::path::Path;

use csv::ReaderBuilder;

use super::dat::field;
use super::IvCurve;
use crate::error::{with_err_context, ErrorContext, Result};
use crate::io::read_to_string;

const NAME_TAG: &str = "DataName";
const VALUE_TAG: &str = "DataValue";

/// Column of the swept voltage (`V` or `Vg`).
pub const V_COL: usize = 1;
/// Column of the measured current (`I` or `Id`).
pub const I_COL: usize = 3;
/// Column of the gate current, in three-terminal sweeps.
pub const IG_COL: usize = 5;

/// One sweep of a Keysight export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sweep {
    /// Column names, starting with the `DataName` tag.
    pub names: Vec<String>,
    /// Values by row; column 0 holds the `DataValue` tag and is NaN.
    pub rows: Vec<Vec<f64>>,
}

impl Sweep {
    /// The values of column `col`, skipping rows too short to hold it.
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(col).copied())
            .collect()
    }

    /// Voltage against current.
    pub fn iv(&self) -> IvCurve {
        IvCurve {
            v: self.column(V_COL),
            i: self.column(I_COL),
        }
    }

    /// The gate current, if the sweep measured one.
    pub fn gate_current(&self) -> Option<Vec<f64>> {
        (self.names.len() > IG_COL).then(|| self.column(IG_COL))
    }
}

/// A Keysight export holding one or more sweeps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeysightFile {
    pub sweeps: Vec<Sweep>,
}

impl KeysightFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = read_to_string(path)?;
        with_err_context(Self::parse(&text), || {
            ErrorContext::ParseFile(path.to_path_buf())
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut sweeps = Vec::new();
        let mut current: Option<Sweep> = None;
        for (n, record) in reader.records().enumerate() {
            let cells = record?
                .iter()
                .map(|f| f.trim().to_string())
                .collect::<Vec<_>>();
            match cells.first().map(String::as_str) {
                Some(NAME_TAG) => {
                    sweeps.extend(current.take());
                    current = Some(Sweep {
                        names: cells,
                        rows: Vec::new(),
                    });
                }
                Some(VALUE_TAG) => {
                    if let Some(sweep) = current.as_mut() {
                        let mut values = vec![f64::NAN];
                        for idx in 1..cells.len() {
                            values.push(field(&cells, n, idx)?);
                        }
                        sweep.rows.push(values);
                    }
                }
                _ => sweeps.extend(current.take()),
            }
        }
        sweeps.extend(current.take());
        Ok(Self { sweeps })
    }

    /// The first sweep, if any.
    pub fn first(&self) -> Option<&Sweep> {
        self.sweeps.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
SetupTitle,I/V Sweep
DataName, V, V2, I, I2
DataValue, -1, 0, -2e-9, 0
DataValue, 0, 0, 0, 0
DataValue, 1, 0, 2e-9, 0
AnalysisSetup, x
DataName, Vg, Vd, Id, Is, Ig
DataValue, 0, 1, 1e-9, -1e-9, 1e-12
DataValue, 1, 1, 1e-6, -1e-6, 2e-12
";

    #[test]
    fn sweeps_are_split_on_names() {
        let file = KeysightFile::parse(EXPORT).unwrap();
        assert_eq!(file.sweeps.len(), 2);

        let iv = file.sweeps[0].iv();
        assert_eq!(iv.v, vec![-1., 0., 1.]);
        assert_eq!(iv.i, vec![-2e-9, 0., 2e-9]);
        assert_eq!(file.sweeps[0].gate_current(), None);

        let transfer = &file.sweeps[1];
        assert_eq!(transfer.names[1], "Vg");
        assert_eq!(transfer.gate_current(), Some(vec![1e-12, 2e-12]));
    }

    #[test]
    fn bad_values_are_errors() {
        let err = KeysightFile::parse("DataName, V, I\nDataValue, 1, oops\n").unwrap_err();
        assert!(format!("{err}").contains("oops"));
    }
}
