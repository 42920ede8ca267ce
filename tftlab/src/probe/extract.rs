//! Device parameters extracted from fitted probe data.

use grid::Grid;
use serde::Serialize;

use super::dat::{OutputCurves, TransferCurves};
use super::error::ProbeError;
use super::fit::{diff_quotient, fit_middle, fit_xy, format_si, nan_mean, nan_std};
use super::names::{WaferCell, WAFER_CELLS};
use super::IvCurve;
use crate::log::{self, Log};

/// Fraction of a four-probe sweep used by the middle-window fit.
pub const FOUR_PROBE_FRACTION: usize = 16;
/// Number of points in the sliding window of the subthreshold fit.
pub const SS_WINDOW: usize = 5;
/// Largest bias at which capacitor leakage is read, in volts.
pub const LEAKAGE_BIAS: f64 = 1.;

/// A resistance fitted to a two-terminal sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resistance {
    /// Ohms.
    pub r: f64,
    pub r2: f64,
}

impl Log for Resistance {
    fn log(&self) {
        log::info!("R = {}, r^2 = {:.4}", format_si(self.r, "Ohm"), self.r2);
    }
}

/// Fits `V` against `I` over the points with positive voltage.
pub fn resistance(curve: &IvCurve) -> Result<Resistance, ProbeError> {
    let (i, v): (Vec<f64>, Vec<f64>) = curve
        .i
        .iter()
        .zip(&curve.v)
        .filter(|(_, v)| **v > 0.)
        .unzip();
    let fit = fit_xy(&i, &v)?;
    Ok(Resistance {
        r: fit.slope,
        r2: fit.r2,
    })
}

/// Fits `V` against `I` over the middle of a four-probe sweep.
pub fn four_probe(curve: &IvCurve) -> Result<Resistance, ProbeError> {
    let fit = fit_middle(&curve.i, &curve.v, FOUR_PROBE_FRACTION)?;
    Ok(Resistance {
        r: fit.slope,
        r2: fit.r2,
    })
}

/// Transfer-length-method parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TlmResult {
    /// Contact resistance, Ω·m.
    pub rc: f64,
    /// Transfer length, m.
    pub lt: f64,
    /// Sheet resistance, Ω/sq.
    pub rsheet: f64,
    /// Specific contact resistivity, Ω·m².
    pub rho_c: f64,
    pub r2: f64,
}

impl Log for TlmResult {
    fn log(&self) {
        log::info!(
            "Rc = {} m, Lt = {:.3} um, Rsheet = {}/sq, rho_c = {:.3e} Ohm m^2, r^2 = {:.4}",
            format_si(self.rc, "Ohm"),
            self.lt * 1e6,
            format_si(self.rsheet, "Ohm"),
            self.rho_c,
            self.r2
        );
    }
}

/// Fits width-normalized resistance against contact spacing.
///
/// `points` are `(L, R)` pairs with `L` in microns and `R` in ohms. `width` is
/// the contact width in microns.
pub fn tlm(points: &[(f64, f64)], width: f64) -> Result<TlmResult, ProbeError> {
    let l: Vec<f64> = points.iter().map(|(l, _)| l * 1e-6).collect();
    let rw: Vec<f64> = points.iter().map(|(_, r)| r * width * 1e-6).collect();
    let fit = fit_xy(&l, &rw)?;
    let rsheet = fit.slope;
    let lt = fit.intercept / fit.slope / 2.;
    Ok(TlmResult {
        rc: fit.intercept / 2.,
        lt,
        rsheet,
        rho_c: rsheet * lt * lt,
        r2: fit.r2,
    })
}

/// Contact and sheet resistance of a set of resistors of varying aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SquaresResult {
    /// Resistance of one contact, Ω.
    pub rc: f64,
    /// Ω/sq.
    pub rsheet: f64,
    pub r2: f64,
}

impl Log for SquaresResult {
    fn log(&self) {
        log::info!(
            "Rc = {}, Rsheet = {}/sq, r^2 = {:.4}",
            format_si(self.rc, "Ohm"),
            format_si(self.rsheet, "Ohm"),
            self.r2
        );
    }
}

/// Fits resistance against the number of squares `L / W`.
///
/// `resistors` are `(W, L, R)` triples.
pub fn ito_resistors(resistors: &[(f64, f64, f64)]) -> Result<SquaresResult, ProbeError> {
    let squares: Vec<f64> = resistors.iter().map(|(w, l, _)| l / w).collect();
    let r: Vec<f64> = resistors.iter().map(|(_, _, r)| *r).collect();
    let fit = fit_xy(&squares, &r)?;
    Ok(SquaresResult {
        rc: fit.intercept / 2.,
        rsheet: fit.slope,
        r2: fit.r2,
    })
}

/// Sheet resistance and resistivity of a metal line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetalResult {
    /// Ω.
    pub r: f64,
    /// Ω/sq.
    pub rsheet: f64,
    /// Ω·m.
    pub rho: f64,
}

impl Log for MetalResult {
    fn log(&self) {
        log::info!(
            "R = {}, Rsheet = {}/sq, rho = {:.3e} Ohm m",
            format_si(self.r, "Ohm"),
            format_si(self.rsheet, "Ohm"),
            self.rho
        );
    }
}

/// `thickness` is in meters.
pub fn metal_resistor(r: f64, squares: f64, thickness: f64) -> MetalResult {
    let rsheet = r / squares;
    MetalResult {
        r,
        rsheet,
        rho: rsheet * thickness,
    }
}

/// Values over the 8×8 chips of a wafer. Missing chips are NaN.
#[derive(Debug, Clone)]
pub struct WaferMap {
    values: Grid<f64>,
}

impl Default for WaferMap {
    fn default() -> Self {
        Self::new()
    }
}

impl WaferMap {
    pub fn new() -> Self {
        Self {
            values: Grid::init(WAFER_CELLS, WAFER_CELLS, f64::NAN),
        }
    }

    pub fn from_cells(cells: impl IntoIterator<Item = (WaferCell, f64)>) -> Self {
        let mut map = Self::new();
        for (cell, value) in cells {
            map.set(cell, value);
        }
        map
    }

    pub fn set(&mut self, cell: WaferCell, value: f64) {
        if let Some(slot) = self.values.get_mut(cell.row, cell.col) {
            *slot = value;
        }
    }

    /// The value at `cell`, if one was measured.
    pub fn get(&self, cell: WaferCell) -> Option<f64> {
        self.values
            .get(cell.row, cell.col)
            .copied()
            .filter(|v| !v.is_nan())
    }

    /// Measured cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (WaferCell, f64)> + '_ {
        (0..WAFER_CELLS)
            .flat_map(|row| (0..WAFER_CELLS).map(move |col| WaferCell { row, col }))
            .filter_map(|cell| self.get(cell).map(|v| (cell, v)))
    }

    pub fn summary(&self) -> Option<MapSummary> {
        let values: Vec<f64> = self.values.iter().copied().collect();
        Some(MapSummary {
            mean: nan_mean(&values)?,
            std: nan_std(&values)?,
            count: values.iter().filter(|v| !v.is_nan()).count(),
        })
    }
}

/// Mean and population standard deviation of the measured cells of a [`WaferMap`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapSummary {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

impl Log for MapSummary {
    fn log(&self) {
        log::info!(
            "{} ± {} over {} cells",
            format_si(self.mean, "Ohm"),
            format_si(self.std, "Ohm"),
            self.count
        );
    }
}

/// Figures of merit of one transfer curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransferResult {
    pub vd: f64,
    /// Maximum transconductance, S.
    pub gm_max: f64,
    /// Threshold voltage by linear extrapolation at `gm_max`, V.
    pub vth: f64,
    /// Subthreshold slope, mV/dec. `None` when the current never rises.
    pub ss: Option<f64>,
    pub on_off: f64,
    /// Largest gate leakage, A.
    pub ig_max: f64,
}

impl Log for TransferResult {
    fn log(&self) {
        let ss = self
            .ss
            .map(|ss| format!("{ss:.1} mV/dec"))
            .unwrap_or_else(|| "-".to_string());
        log::info!(
            "Vd = {} V: gm = {:.3e} S, Vth = {:.3} V, SS = {}, on/off = {:.2e}, Ig = {:.2e} A",
            self.vd,
            self.gm_max,
            self.vth,
            ss,
            self.on_off,
            self.ig_max
        );
    }
}

/// Subthreshold slope in mV/dec from the steepest window of `log10 |Id|`.
///
/// Windows containing a zero current are skipped.
pub fn subthreshold_slope(vg: &[f64], id: &[f64], window: usize) -> Option<f64> {
    let log_id: Vec<f64> = id.iter().map(|i| i.abs().log10()).collect();
    let n = vg.len().min(log_id.len());
    if window < 2 || n < window {
        return None;
    }
    (0..=n - window)
        .filter(|&s| log_id[s..s + window].iter().all(|v| v.is_finite()))
        .filter_map(|s| fit_xy(&vg[s..s + window], &log_id[s..s + window]).ok())
        .map(|fit| fit.slope)
        .filter(|slope| *slope > 0.)
        .fold(None, |max: Option<f64>, slope| Some(max.map_or(slope, |m| m.max(slope))))
        .map(|slope| 1000. / slope)
}

/// Analyzes one transfer curve `id(vg)` measured at drain voltage `vd`.
pub fn transfer(vg: &[f64], id: &[f64], ig: &[f64], vd: f64) -> Result<TransferResult, ProbeError> {
    if vg.len() != id.len() {
        return Err(ProbeError::LengthMismatch {
            x: vg.len(),
            y: id.len(),
        });
    }
    if vg.len() < 2 {
        return Err(ProbeError::TooFewPoints {
            needed: 2,
            got: vg.len(),
        });
    }

    let gm = diff_quotient(vg, id);
    let (k, gm_max) = gm
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, g)| g.is_finite())
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or(ProbeError::Singular)?;
    if gm_max == 0. {
        return Err(ProbeError::Singular);
    }
    let vth = vg[k + 1] - id[k + 1] / gm_max;

    let on = id.iter().map(|i| i.abs()).fold(0., f64::max);
    let off = id
        .iter()
        .map(|i| i.abs())
        .filter(|i| *i > 0.)
        .fold(f64::INFINITY, f64::min);
    let on_off = if off.is_finite() { on / off } else { f64::NAN };

    Ok(TransferResult {
        vd,
        gm_max,
        vth,
        ss: subthreshold_slope(vg, id, SS_WINDOW),
        on_off,
        ig_max: ig.iter().map(|i| i.abs()).fold(0., f64::max),
    })
}

/// Analyzes every drain voltage of a transfer sweep.
pub fn transfer_curves(curves: &TransferCurves) -> Result<Vec<TransferResult>, ProbeError> {
    curves
        .vd
        .iter()
        .zip(&curves.id)
        .enumerate()
        .map(|(k, (vd, id))| {
            let ig = curves.ig.get(k).map(Vec::as_slice).unwrap_or_default();
            transfer(&curves.vg, id, ig, *vd)
        })
        .collect()
}

/// Summary of one output curve `id(vd)` at gate voltage `vg`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutputResult {
    pub vg: f64,
    /// Drain current at the largest drain voltage, A.
    pub id_max: f64,
    /// Output conductance at low drain bias, S.
    pub g_lin: f64,
    pub ig_max: f64,
}

impl Log for OutputResult {
    fn log(&self) {
        log::info!(
            "Vg = {} V: Id = {:.3e} A, g = {:.3e} S, Ig = {:.2e} A",
            self.vg,
            self.id_max,
            self.g_lin,
            self.ig_max
        );
    }
}

/// Summarizes every gate voltage of an output sweep.
///
/// The low-bias conductance is the slope of the first two points.
pub fn output_curves(curves: &OutputCurves) -> Result<Vec<OutputResult>, ProbeError> {
    if curves.vd.len() < 2 {
        return Err(ProbeError::TooFewPoints {
            needed: 2,
            got: curves.vd.len(),
        });
    }
    curves
        .vg
        .iter()
        .zip(&curves.id)
        .enumerate()
        .map(|(k, (vg, id))| {
            let (_, last) = curves
                .vd
                .iter()
                .zip(id)
                .max_by(|a, b| a.0.total_cmp(b.0))
                .ok_or(ProbeError::TooFewPoints { needed: 2, got: 0 })?;
            let g_lin = diff_quotient(&curves.vd, id)
                .first()
                .copied()
                .ok_or(ProbeError::TooFewPoints {
                    needed: 2,
                    got: id.len(),
                })?;
            let ig_max = curves
                .ig
                .get(k)
                .map(|ig| ig.iter().map(|i| i.abs()).fold(0., f64::max))
                .unwrap_or(0.);
            Ok(OutputResult {
                vg: *vg,
                id_max: *last,
                g_lin,
                ig_max,
            })
        })
        .collect()
}

/// Leakage of a `W × L` capacitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapLeakage {
    /// Largest current with `|V| <= 1 V`, A.
    pub i_max: f64,
    /// A/µm².
    pub per_area: f64,
    /// A/µm.
    pub per_perimeter: f64,
}

impl Log for CapLeakage {
    fn log(&self) {
        log::info!(
            "I = {:.3e} A, {:.3e} A/um^2, {:.3e} A/um",
            self.i_max,
            self.per_area,
            self.per_perimeter
        );
    }
}

/// `w` and `l` are in microns.
pub fn cap_leakage(curve: &IvCurve, w: f64, l: f64) -> Result<CapLeakage, ProbeError> {
    let currents: Vec<f64> = curve
        .v
        .iter()
        .zip(&curve.i)
        .filter(|(v, _)| v.abs() <= LEAKAGE_BIAS)
        .map(|(_, i)| i.abs())
        .collect();
    if currents.is_empty() {
        return Err(ProbeError::TooFewPoints { needed: 1, got: 0 });
    }
    let i_max = currents.into_iter().fold(0., f64::max);
    Ok(CapLeakage {
        i_max,
        per_area: i_max / (w * l),
        per_perimeter: i_max / (2. * (w + l)),
    })
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::probe::fit::linspace;

    #[test]
    fn resistance_ignores_negative_bias() {
        let v = linspace(-1., 1., 21);
        let i = v
            .iter()
            .map(|v| if *v > 0. { v / 1e3 } else { v / 1e6 })
            .collect();
        let r = resistance(&IvCurve { v, i }).unwrap();
        assert_float_eq!(r.r, 1e3, rmax <= 1e-9);
        assert_float_eq!(r.r2, 1., abs <= 1e-9);
    }

    #[test]
    fn four_probe_uses_the_middle() {
        let i = linspace(-1e-6, 1e-6, 64);
        let v = i
            .iter()
            .enumerate()
            .map(|(n, i)| if (28..36).contains(&n) { i * 500. } else { 0. })
            .collect();
        let r = four_probe(&IvCurve { v, i }).unwrap();
        assert_float_eq!(r.r, 500., rmax <= 1e-9);
    }

    #[test]
    fn tlm_extraction() {
        // Rsheet = 1e4 Ohm/sq, Rc W = 2e-3 Ohm m, W = 50 um.
        let points: Vec<(f64, f64)> = [10., 20., 50., 100.]
            .iter()
            .map(|l| (*l, (1e4 * l * 1e-6 + 4e-3) / 50e-6))
            .collect();
        let res = tlm(&points, 50.).unwrap();
        assert_float_eq!(res.rsheet, 1e4, rmax <= 1e-6);
        assert_float_eq!(res.rc, 2e-3, rmax <= 1e-6);
        assert_float_eq!(res.lt, 2e-7, rmax <= 1e-6);
        assert_float_eq!(res.rho_c, 1e4 * 4e-14, rmax <= 1e-6);
    }

    #[test]
    fn ito_resistor_squares() {
        let resistors = [(100., 2., 60.), (100., 10., 140.), (10., 10., 1040.)];
        let res = ito_resistors(&resistors).unwrap();
        assert_float_eq!(res.rsheet, 1000., rmax <= 1e-9);
        assert_float_eq!(res.rc, 20., rmax <= 1e-9);
    }

    #[test]
    fn metal_resistivity() {
        let res = metal_resistor(101., 101., 100e-9);
        assert_float_eq!(res.rsheet, 1., abs <= 1e-12);
        assert_float_eq!(res.rho, 1e-7, rmax <= 1e-12);
    }

    #[test]
    fn wafer_map_statistics() {
        let map = WaferMap::from_cells([
            ("A1".parse().unwrap(), 1.),
            ("H8".parse().unwrap(), 3.),
        ]);
        assert_eq!(map.get("A1".parse().unwrap()), Some(1.));
        assert_eq!(map.get("B1".parse().unwrap()), None);
        assert_eq!(map.cells().count(), 2);
        let summary = map.summary().unwrap();
        assert_float_eq!(summary.mean, 2., abs <= 1e-12);
        assert_float_eq!(summary.std, 1., abs <= 1e-12);
        assert_eq!(summary.count, 2);
        assert!(WaferMap::new().summary().is_none());
    }

    #[test]
    fn transfer_figures_of_merit() {
        // 100 mV/dec below 0 V, linear above with Vth = 0.
        let vg = linspace(-0.5, 1., 16);
        let id: Vec<f64> = vg
            .iter()
            .map(|v| {
                if *v <= 0. {
                    1e-7 * 10f64.powf(v / 0.1)
                } else {
                    1e-7 + 1e-6 * v
                }
            })
            .collect();
        let ig = vec![1e-12; vg.len()];
        let res = transfer(&vg, &id, &ig, 1.).unwrap();
        assert_float_eq!(res.ss.unwrap(), 100., rmax <= 1e-6);
        assert_float_eq!(res.gm_max, 1e-6, rmax <= 1e-6);
        assert_float_eq!(res.vth, -0.1, abs <= 1e-6);
        assert_float_eq!(res.on_off, 1.1e-6 / 1e-12, rmax <= 1e-6);
        assert_float_eq!(res.ig_max, 1e-12, rmax <= 1e-12);
    }

    #[test]
    fn flat_current_has_no_subthreshold_slope() {
        assert_eq!(subthreshold_slope(&[0., 1., 2.], &[0., 0., 0.], 2), None);
        assert_eq!(subthreshold_slope(&[0., 1.], &[1., 2.], 5), None);
    }

    #[test]
    fn output_summary() {
        let curves = OutputCurves {
            vd: vec![0., 1., 2.],
            vg: vec![1., 2.],
            id: vec![vec![0., 1e-6, 1.5e-6], vec![0., 2e-6, 3e-6]],
            ig: vec![vec![1e-12, -2e-12, 0.], vec![0., 0., 0.]],
        };
        let res = output_curves(&curves).unwrap();
        assert_eq!(res.len(), 2);
        assert_float_eq!(res[0].g_lin, 1e-6, rmax <= 1e-9);
        assert_float_eq!(res[1].id_max, 3e-6, rmax <= 1e-9);
        assert_float_eq!(res[0].ig_max, 2e-12, rmax <= 1e-9);
    }

    #[test]
    fn leakage_is_normalized() {
        let curve = IvCurve {
            v: vec![-2., -1., 0., 1., 2.],
            i: vec![-1e-6, -2e-9, 0., 1e-9, 1e-6],
        };
        let res = cap_leakage(&curve, 50., 20.).unwrap();
        assert_float_eq!(res.i_max, 2e-9, rmax <= 1e-12);
        assert_float_eq!(res.per_area, 2e-12, rmax <= 1e-9);
        assert_float_eq!(res.per_perimeter, 2e-9 / 140., rmax <= 1e-9);
    }
}
