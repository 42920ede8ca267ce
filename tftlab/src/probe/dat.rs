//! Exports of the Agilent 4155 parameter analyzer.
//!
//! A `.dat` file is a comma separated dump of the measurement setup followed
//! by one or more data blocks. Blocks are found by the name of their first
//! column and read positionally.

use std::collections::HashMap;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use super::error::ProbeError;
use super::fit::linspace;
use super::IvCurve;
use crate::error::{with_err_context, ErrorContext, Result};
use crate::io::read_to_string;

/// Header of two-terminal sweeps.
pub const TWO_TERMINAL_HEADER: &str = "IA";
/// Header of four-probe sweeps.
pub const FOUR_PROBE_HEADER: &str = "IF2P";
/// Header of the transistor data rows and of three-terminal resistor sweeps.
pub const SOURCE_HEADER: &str = "IS";
const DATA_MARKER: &str = "DATA:";
const TEST_MARKER: &str = "TEST";

/// The rows of a `.dat` file.
///
/// Blank lines are kept as empty rows since they terminate setup blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatFile {
    rows: Vec<Vec<String>>,
}

/// Sweeps of one source, keyed by the source `ID:`.
pub type Setups = HashMap<String, Vec<f64>>;

/// Drain current and gate current against gate voltage, one curve per drain voltage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferCurves {
    pub vg: Vec<f64>,
    pub vd: Vec<f64>,
    /// `id[k][n]` is the drain current at `vd[k]` and `vg[n]`.
    pub id: Vec<Vec<f64>>,
    pub ig: Vec<Vec<f64>>,
}

/// Drain current and gate current against drain voltage, one curve per gate voltage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputCurves {
    pub vd: Vec<f64>,
    pub vg: Vec<f64>,
    /// `id[k][n]` is the drain current at `vg[k]` and `vd[n]`.
    pub id: Vec<Vec<f64>>,
    pub ig: Vec<Vec<f64>>,
}

/// A transistor measurement: a transfer sweep, optionally followed by an output sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct TransistorSweeps {
    pub transfer: TransferCurves,
    pub output: Option<OutputCurves>,
}

fn parse_line(line: &str) -> std::result::Result<Vec<String>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let record = reader.records().next().transpose()?.unwrap_or_default();
    Ok(record_fields(&record))
}

fn record_fields(record: &StringRecord) -> Vec<String> {
    record.iter().map(|f| f.trim().to_string()).collect()
}

/// Parses field `idx` of `cells`, the fields of row `row`, as a number.
pub(crate) fn field(cells: &[String], row: usize, idx: usize) -> Result<f64> {
    let cell = cells.get(idx).ok_or(ProbeError::ShortRow {
        row,
        len: cells.len(),
        field: idx,
    })?;
    let value = cell.parse::<f64>().map_err(|_| ProbeError::NonNumeric {
        row,
        field: cell.clone(),
    })?;
    Ok(value)
}

impl DatFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = read_to_string(path)?;
        with_err_context(Self::parse(&text), || {
            ErrorContext::ParseFile(path.to_path_buf())
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        let rows = text
            .lines()
            .map(|line| {
                if line.trim().is_empty() {
                    Ok(Vec::new())
                } else {
                    parse_line(line)
                }
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[inline]
    fn field(&self, row: usize, idx: usize) -> Result<f64> {
        field(&self.rows[row], row, idx)
    }

    /// Index of the first row at or after `from` starting with `header` and
    /// holding at least `min_len` fields.
    fn find_header(&self, from: usize, header: &str, min_len: usize) -> Option<usize> {
        (from..self.rows.len()).find(|&n| {
            let row = &self.rows[n];
            row.len() >= min_len && row.first().map(String::as_str) == Some(header)
        })
    }

    /// The rows after the header row `header_row` up to the first row shorter
    /// than `min_len` or starting with the same header.
    fn block_at(&self, header_row: usize, min_len: usize) -> std::ops::Range<usize> {
        let header = self.rows[header_row].first();
        let start = header_row + 1;
        let end = (start..self.rows.len())
            .find(|&n| self.rows[n].len() < min_len || self.rows[n].first() == header)
            .unwrap_or(self.rows.len());
        start..end
    }

    /// The first block under `header`.
    fn block(&self, header: &str, min_len: usize) -> Result<std::ops::Range<usize>> {
        let header_row = self
            .find_header(0, header, min_len)
            .ok_or_else(|| ProbeError::MissingHeader(header.to_string()))?;
        Ok(self.block_at(header_row, min_len))
    }

    /// A two-terminal sweep: voltage in column 1, current in column 2.
    ///
    /// Each block ends at the first row shorter than its header. Every `IA`
    /// block in the file is read, so forward and reverse sweeps are appended
    /// in file order.
    pub fn two_terminal(&self) -> Result<IvCurve> {
        let mut curve = IvCurve::default();
        let mut found = false;
        let mut from = 0;
        while let Some(header) = self.find_header(from, TWO_TERMINAL_HEADER, 1) {
            found = true;
            let rows = self.block_at(header, self.rows[header].len());
            from = rows.end;
            for n in rows {
                curve.v.push(self.field(n, 1)?);
                curve.i.push(self.field(n, 2)?);
            }
        }
        if !found {
            return Err(ProbeError::MissingHeader(TWO_TERMINAL_HEADER.to_string()).into());
        }
        Ok(curve)
    }

    /// A four-probe sweep: current in column 0, voltage between the sense
    /// probes in columns 2 and 3.
    pub fn four_probe(&self) -> Result<IvCurve> {
        let rows = self.block(FOUR_PROBE_HEADER, 4)?;
        let mut curve = IvCurve::default();
        for n in rows {
            let sense = self.field(n, 2)? - self.field(n, 3)?;
            curve.v.push(sense);
            curve.i.push(self.field(n, 0)?);
        }
        Ok(curve)
    }

    /// A three-terminal resistor sweep: voltage in column 3, current in column 6.
    pub fn source_sweep(&self) -> Result<IvCurve> {
        let rows = self.block(SOURCE_HEADER, 8)?;
        let mut curve = IvCurve::default();
        for n in rows {
            curve.v.push(self.field(n, 3)?);
            curve.i.push(self.field(n, 6)?);
        }
        Ok(curve)
    }

    /// Reads sweep setups from row `from` up to the next `DATA:` marker.
    ///
    /// A setup starts at an `ID:` row and runs until the next empty row or
    /// `ID:` row. Returns the setups and the row after the marker.
    /// `START:`, `STOP:` and `PNTS:` values must be numbers.
    pub fn setups(&self, from: usize) -> Result<(Setups, usize)> {
        let mut setups = Setups::new();
        let mut current: Option<String> = None;
        let (mut start, mut stop, mut points) = (0., 0., 0usize);

        let mut finish = |id: &mut Option<String>, start: f64, stop: f64, points: usize| {
            if let Some(id) = id.take() {
                setups.insert(id, linspace(start, stop, points));
            }
        };

        let mut n = from;
        while n < self.rows.len() {
            let row = &self.rows[n];
            n += 1;
            let key = row.first().map(String::as_str);
            let value = row.get(1).map(String::as_str).unwrap_or_default();
            match key {
                Some(DATA_MARKER) => break,
                None => finish(&mut current, start, stop, points),
                Some("ID:") => {
                    finish(&mut current, start, stop, points);
                    current = Some(value.to_string());
                    (start, stop, points) = (0., 0., 0);
                }
                Some("START:") if current.is_some() => start = field(row, n - 1, 1)?,
                Some("STOP:") if current.is_some() => stop = field(row, n - 1, 1)?,
                Some("PNTS:") if current.is_some() => {
                    points = value.parse().map_err(|_| ProbeError::NonNumeric {
                        row: n - 1,
                        field: value.to_string(),
                    })?
                }
                _ => {}
            }
        }
        finish(&mut current, start, stop, points);
        Ok((setups, n))
    }

    /// Data rows from `from` until a `TEST` row, skipping empty and `IS` rows.
    /// Returns the row indices and the row after the block.
    fn data_rows(&self, from: usize) -> (Vec<usize>, usize) {
        let mut out = Vec::new();
        let mut n = from;
        while n < self.rows.len() {
            let row = &self.rows[n];
            n += 1;
            match row.first().map(String::as_str) {
                None => continue,
                Some(TEST_MARKER) => break,
                Some(SOURCE_HEADER) => continue,
                Some(_) => out.push(n - 1),
            }
        }
        (out, n)
    }

    /// Reads a transfer sweep and, if present, the output sweep after it.
    ///
    /// In transfer rows, with `m` drain voltages, the drain currents occupy
    /// columns `2m..3m`, the gate voltage column `3m` and the gate currents
    /// columns `3m + 1..4m + 1`. In output rows, with `m` gate voltages, the
    /// drain voltage is in column `m`, drain currents in `m + 1..2m + 1` and
    /// gate currents in `3m + 1..4m + 1`.
    pub fn transistor(&self) -> Result<TransistorSweeps> {
        let (setups, next) = self.setups(0)?;
        let vd = setups
            .get("D")
            .ok_or_else(|| ProbeError::MissingSetup("D".to_string()))?
            .clone();
        if !setups.contains_key("G") {
            return Err(ProbeError::MissingSetup("G".to_string()).into());
        }
        let m = vd.len();
        let (rows, next) = self.data_rows(next);
        let mut transfer = TransferCurves {
            vg: Vec::with_capacity(rows.len()),
            id: vec![Vec::with_capacity(rows.len()); m],
            ig: vec![Vec::with_capacity(rows.len()); m],
            vd,
        };
        for n in rows {
            transfer.vg.push(self.field(n, 3 * m)?);
            for k in 0..m {
                transfer.id[k].push(self.field(n, 2 * m + k)?);
                transfer.ig[k].push(self.field(n, 3 * m + 1 + k)?);
            }
        }

        let output = if self.find_header(next, "ID:", 2).is_some() {
            let (setups, next) = self.setups(next)?;
            let vg = setups
                .get("G")
                .ok_or_else(|| ProbeError::MissingSetup("G".to_string()))?
                .clone();
            let m = vg.len();
            let (rows, _) = self.data_rows(next);
            let mut output = OutputCurves {
                vd: Vec::with_capacity(rows.len()),
                id: vec![Vec::with_capacity(rows.len()); m],
                ig: vec![Vec::with_capacity(rows.len()); m],
                vg,
            };
            for n in rows {
                output.vd.push(self.field(n, m)?);
                for k in 0..m {
                    output.id[k].push(self.field(n, m + 1 + k)?);
                    output.ig[k].push(self.field(n, 3 * m + 1 + k)?);
                }
            }
            Some(output)
        } else {
            None
        };

        Ok(TransistorSweeps { transfer, output })
    }
}

/// Reads a wafer map file of `cell,value` lines, such as `A1,1520.3`.
pub fn read_cell_values(text: &str) -> Result<Vec<(String, f64)>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut out = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let fields = record_fields(&record?);
        let value = field(&fields, row, 1)?;
        out.push((fields[0].clone(), value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TERMINAL: &str = "\
TEST,res
IA,V,I,T
1,0.0,0.0,0
2,1.0,2e-6,1
3,2.0,4e-6,2
END
";

    const TRANSFER: &str = "\
ID:,G
START:,-1
STOP:,1
PNTS:,3

ID:,D
START:,0.5
STOP:,5
PNTS:,2

DATA:
IS,a,b,c,d,e,f,g,h,i
x,x,x,x,1e-9,2e-9,-1,1e-12,2e-12
x,x,x,x,1e-7,2e-7,0,1e-12,2e-12
x,x,x,x,1e-5,2e-5,1,1e-12,2e-12
TEST,output
ID:,G
START:,0
STOP:,2
PNTS:,2

DATA:
IS
a,b,0.0,1e-9,2e-9,x,x,1e-12,1e-12
a,b,1.0,1e-6,2e-6,x,x,1e-12,1e-12
TEST
";

    #[test]
    fn two_terminal_block_stops_at_short_row() {
        let dat = DatFile::parse(TWO_TERMINAL).unwrap();
        let curve = dat.two_terminal().unwrap();
        assert_eq!(curve.v, vec![0., 1., 2.]);
        assert_eq!(curve.i, vec![0., 2e-6, 4e-6]);
    }

    #[test]
    fn every_two_terminal_block_is_read() {
        let dat = DatFile::parse(
            "TEST,forward\nIA,V,I,T\n1,1.0,1e-6,0\n2,2.0,2e-6,1\n\
             TEST,reverse\nIA,V,I,T\n1,2.0,2e-6,0\n2,1.0,1e-6,1\nEND\n",
        )
        .unwrap();
        let curve = dat.two_terminal().unwrap();
        assert_eq!(curve.v, vec![1., 2., 2., 1.]);
        assert_eq!(curve.i, vec![1e-6, 2e-6, 2e-6, 1e-6]);

        let dat = DatFile::parse("IA,V,I\n1,1.0,1e-6\nIA,V,I\n1,3.0,3e-6\n").unwrap();
        assert_eq!(dat.two_terminal().unwrap().v, vec![1., 3.]);
        assert!(DatFile::parse("TEST,res\n").unwrap().two_terminal().is_err());
    }

    #[test]
    fn missing_block_is_reported() {
        let dat = DatFile::parse("TEST,res\n").unwrap();
        let err = dat.four_probe().unwrap_err();
        assert!(matches!(
            err.source(),
            crate::error::ErrorSource::Probe(ProbeError::MissingHeader(h)) if h == "IF2P"
        ));
    }

    #[test]
    fn four_probe_voltage_is_a_difference() {
        let dat = DatFile::parse("IF2P,V1,V2,V3\n1e-6,0,0.5,0.25\n2e-6,0,1.0,0.5\n").unwrap();
        let curve = dat.four_probe().unwrap();
        assert_eq!(curve.v, vec![0.25, 0.5]);
        assert_eq!(curve.i, vec![1e-6, 2e-6]);
    }

    #[test]
    fn setups_are_linspaced() {
        let dat = DatFile::parse(TRANSFER).unwrap();
        let (setups, next) = dat.setups(0).unwrap();
        assert_eq!(setups["G"], vec![-1., 0., 1.]);
        assert_eq!(setups["D"], vec![0.5, 5.]);
        assert_eq!(dat.rows()[next][0], "IS");
    }

    #[test]
    fn malformed_setups_are_errors() {
        let dat = DatFile::parse(&TRANSFER.replacen("START:,0.5", "START:,oops", 1)).unwrap();
        let err = dat.transistor().unwrap_err();
        assert!(matches!(
            err.source(),
            crate::error::ErrorSource::Probe(ProbeError::NonNumeric { row: 6, field }) if field == "oops"
        ));

        let dat = DatFile::parse(&TRANSFER.replacen("PNTS:,3", "PNTS:,3.5", 1)).unwrap();
        assert!(dat.setups(0).is_err());
    }

    #[test]
    fn transfer_and_output_columns() {
        let dat = DatFile::parse(TRANSFER).unwrap();
        let sweeps = dat.transistor().unwrap();
        let transfer = sweeps.transfer;
        assert_eq!(transfer.vg, vec![-1., 0., 1.]);
        assert_eq!(transfer.id[1], vec![2e-9, 2e-7, 2e-5]);
        assert_eq!(transfer.ig[0], vec![1e-12; 3]);

        let output = sweeps.output.unwrap();
        assert_eq!(output.vg, vec![0., 2.]);
        assert_eq!(output.vd, vec![0., 1.]);
        assert_eq!(output.id[0], vec![1e-9, 1e-6]);
        assert_eq!(output.id[1], vec![2e-9, 2e-6]);
    }

    #[test]
    fn non_numeric_fields_are_errors() {
        let dat = DatFile::parse("IA,V,I\n1,abc,2\n").unwrap();
        let err = dat.two_terminal().unwrap_err();
        assert!(matches!(
            err.source(),
            crate::error::ErrorSource::Probe(ProbeError::NonNumeric { row: 1, .. })
        ));
    }

    #[test]
    fn cell_values() {
        let values = read_cell_values("A1,100\nB2, 200.5\n").unwrap();
        assert_eq!(values, vec![("A1".to_string(), 100.), ("B2".to_string(), 200.5)]);
        assert!(read_cell_values("A1\n").is_err());
    }
}
