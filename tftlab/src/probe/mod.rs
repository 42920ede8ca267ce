//! Probe-station data: instrument readers, least-squares fits and extracted device parameters.
//!
//! Each analysis follows the same path: read a file into curves, fit, then
//! log or tabulate the result.

pub mod dat;
pub mod error;
pub mod extract;
pub mod fit;
pub mod keysight;
pub mod names;
pub mod report;

pub use dat::{DatFile, OutputCurves, TransferCurves, TransistorSweeps};
pub use error::ProbeError;
pub use extract::WaferMap;
pub use fit::{fit_xy, LinearFit};
pub use keysight::KeysightFile;

/// Current against voltage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IvCurve {
    pub v: Vec<f64>,
    pub i: Vec<f64>,
}

impl IvCurve {
    pub fn len(&self) -> usize {
        self.v.len().min(self.i.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
