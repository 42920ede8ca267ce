//! Least-squares fits and small numeric helpers.

use std::fmt::Display;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::error::ProbeError;

/// A straight line `y = intercept + slope * x` with its coefficient of determination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
    pub r2: f64,
}

impl LinearFit {
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// The x-axis intercept of the line.
    pub fn x_intercept(&self) -> f64 {
        -self.intercept / self.slope
    }
}

/// Fits a line to `(x, y)` by solving the normal equations.
///
/// `r2` is zero when all `y` are equal.
pub fn fit_xy(x: &[f64], y: &[f64]) -> Result<LinearFit, ProbeError> {
    if x.len() != y.len() {
        return Err(ProbeError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    let n = x.len();
    if n < 2 {
        return Err(ProbeError::TooFewPoints { needed: 2, got: n });
    }

    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1. } else { x[i] });
    let rhs = DVector::from_column_slice(y);
    let xt = design.transpose();
    let normal = &xt * &design;
    let b = normal
        .lu()
        .solve(&(&xt * &rhs))
        .ok_or(ProbeError::Singular)?;
    let (intercept, slope) = (b[0], b[1]);
    if !intercept.is_finite() || !slope.is_finite() {
        return Err(ProbeError::Singular);
    }

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = y.iter().map(|yi| (yi - y_mean).powi(2)).sum();
    let r2 = if ss_tot == 0. {
        0.
    } else {
        let ss_res: f64 = x
            .iter()
            .zip(y)
            .map(|(xi, yi)| (intercept + slope * xi - yi).powi(2))
            .sum();
        1. - ss_res / ss_tot
    };

    Ok(LinearFit {
        intercept,
        slope,
        r2,
    })
}

/// The centered window used by [`fit_middle`].
///
/// The window holds `2 * (n / fraction)` points around `n / 2`, clipped to the data.
pub fn middle_window(n: usize, fraction: usize) -> std::ops::Range<usize> {
    let middle = n / 2;
    let half = (n / fraction.max(1)).min(middle);
    (middle - half)..(middle + half)
}

/// Fits a line over the middle of the data.
pub fn fit_middle(x: &[f64], y: &[f64], fraction: usize) -> Result<LinearFit, ProbeError> {
    if x.len() != y.len() {
        return Err(ProbeError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    let window = middle_window(x.len(), fraction);
    fit_xy(&x[window.clone()], &y[window])
}

/// The mean of the values that are not NaN.
pub fn nan_mean(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0., 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// The population standard deviation of the values that are not NaN.
pub fn nan_std(values: &[f64]) -> Option<f64> {
    let mean = nan_mean(values)?;
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0., 0usize), |(s, c), v| (s + (v - mean).powi(2), c + 1));
    Some((sum / count as f64).sqrt())
}

/// Finite differences `diff(y) / diff(x)`, one shorter than the inputs.
pub fn diff_quotient(x: &[f64], y: &[f64]) -> Vec<f64> {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xw, yw)| (yw[1] - yw[0]) / (xw[1] - xw[0]))
        .collect()
}

/// Evenly spaced values from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// An SI prefix used to scale reported values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiPrefix {
    Giga,
    Mega,
    Kilo,
    None,
}

impl SiPrefix {
    pub fn for_magnitude(value: f64) -> Self {
        if value > 1e9 {
            Self::Giga
        } else if value > 1e6 {
            Self::Mega
        } else if value > 1e3 {
            Self::Kilo
        } else {
            Self::None
        }
    }

    pub fn scale(&self) -> f64 {
        match self {
            Self::Giga => 1e9,
            Self::Mega => 1e6,
            Self::Kilo => 1e3,
            Self::None => 1.,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Giga => "G",
            Self::Mega => "M",
            Self::Kilo => "k",
            Self::None => "",
        }
    }
}

impl Display for SiPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Formats `value` with a prefix chosen by its magnitude, e.g. `12.3 kOhm`.
pub fn format_si(value: f64, unit: &str) -> String {
    let prefix = SiPrefix::for_magnitude(value);
    format!("{:.3} {}{}", value / prefix.scale(), prefix, unit)
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn exact_line() {
        let x = [0., 1., 2., 3.];
        let y = [1., 3., 5., 7.];
        let fit = fit_xy(&x, &y).unwrap();
        assert_float_eq!(fit.intercept, 1., abs <= 1e-12);
        assert_float_eq!(fit.slope, 2., abs <= 1e-12);
        assert_float_eq!(fit.r2, 1., abs <= 1e-12);
        assert_float_eq!(fit.x_intercept(), -0.5, abs <= 1e-12);
    }

    #[test]
    fn noisy_line_has_r2_below_one() {
        let x = [0., 1., 2., 3., 4.];
        let y = [0.1, 0.9, 2.2, 2.8, 4.1];
        let fit = fit_xy(&x, &y).unwrap();
        assert_float_eq!(fit.slope, 0.99, abs <= 1e-9);
        assert!(fit.r2 > 0.98 && fit.r2 < 1.);
    }

    #[test]
    fn constant_y_has_zero_r2() {
        let fit = fit_xy(&[1., 2., 3.], &[5., 5., 5.]).unwrap();
        assert_eq!(fit.r2, 0.);
        assert_float_eq!(fit.slope, 0., abs <= 1e-12);
    }

    #[test]
    fn degenerate_inputs_are_errors() {
        assert_eq!(
            fit_xy(&[1.], &[1.]),
            Err(ProbeError::TooFewPoints { needed: 2, got: 1 })
        );
        assert_eq!(fit_xy(&[1., 1., 1.], &[1., 2., 3.]), Err(ProbeError::Singular));
        assert!(matches!(
            fit_xy(&[1., 2.], &[1.]),
            Err(ProbeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn middle_window_of_64_points() {
        assert_eq!(middle_window(64, 16), 28..36);
        assert_eq!(middle_window(10, 16), 5..5);
    }

    #[test]
    fn whole_range_window_fits_all_points() {
        assert_eq!(middle_window(10, 1), 0..10);
        assert_eq!(middle_window(11, 2), 0..10);
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|x| 3. * x - 1.).collect();
        let fit = fit_middle(&x, &y, 1).unwrap();
        assert_float_eq!(fit.slope, 3., abs <= 1e-9);
        assert_float_eq!(fit.intercept, -1., abs <= 1e-9);
    }

    #[test]
    fn nan_statistics() {
        let v = [1., f64::NAN, 3.];
        assert_float_eq!(nan_mean(&v).unwrap(), 2., abs <= 1e-12);
        assert_float_eq!(nan_std(&v).unwrap(), 1., abs <= 1e-12);
        assert_eq!(nan_mean(&[f64::NAN]), None);
    }

    #[test]
    fn prefixes() {
        assert_eq!(SiPrefix::for_magnitude(2e9), SiPrefix::Giga);
        assert_eq!(SiPrefix::for_magnitude(1e6), SiPrefix::Kilo);
        assert_eq!(SiPrefix::for_magnitude(999.), SiPrefix::None);
        assert_eq!(format_si(12_300., "Ohm"), "12.300 kOhm");
    }

    #[test]
    fn linspace_includes_endpoints() {
        assert_eq!(linspace(0., 1., 5), vec![0., 0.25, 0.5, 0.75, 1.]);
        assert_eq!(diff_quotient(&[0., 1., 3.], &[0., 2., 4.]), vec![2., 1.]);
    }
}
