//! Sweep and wafer configuration, loadable from TOML.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{with_err_context, ErrorContext, Result};
use crate::io::read_to_string;

/// Parameter sweeps of the standard four-layer test chip.
///
/// All lengths are in microns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardSweeps {
    /// Transistor gate lengths, one row each.
    pub l_gate: Vec<f64>,
    /// Gate to source/drain overlaps.
    pub l_overlap: Vec<f64>,
    /// Transistor channel widths.
    pub w_channel: Vec<f64>,
    /// Capacitor overlap lengths, one column each.
    pub l_cap: Vec<f64>,
    /// Capacitor widths, one row each.
    pub w_cap: Vec<f64>,
    /// ITO resistor lengths.
    pub l_resistor: Vec<f64>,
    /// ITO resistor widths.
    pub w_resistor: Vec<f64>,
    /// Metal resistor lengths in squares.
    pub sq_resistor: Vec<f64>,
    /// Metal resistor wire width.
    pub w_metal_resistor: f64,
    /// Number of vias in each via chain.
    pub via_counts: Vec<usize>,
    /// Wire width of the via chains.
    pub via_wire_w: f64,
    pub tlm_contact_l: f64,
    pub tlm_contact_w: f64,
    pub tlm_spacings: Vec<f64>,
    pub tlm_pad_size: (f64, f64),
    pub circ_tlm_spacings: Vec<f64>,
    pub circ_tlm_radius: f64,
    /// Resolutions of the lithography tests.
    pub resolutions: Vec<f64>,
    /// Edge length of the square sample.
    pub sample_w: f64,
    pub pad_size: (f64, f64),
}

impl Default for StandardSweeps {
    fn default() -> Self {
        Self {
            l_gate: vec![
                1., 1., 1.5, 1.5, 2., 2., 3., 3., 5., 5., 10., 10., 20., 20., 50., 50.,
            ],
            l_overlap: vec![1., 2., 5., 10.],
            w_channel: vec![2., 5., 10., 20., 50., 100.],
            l_cap: vec![2., 5., 10., 20., 50., 100., 200.],
            w_cap: vec![2., 2., 5., 5., 10., 10., 20., 20., 50., 100., 200.],
            l_resistor: vec![1., 2., 5., 10., 15., 20., 50., 100.],
            w_resistor: vec![1., 2., 5., 10., 20., 50., 100., 200.],
            sq_resistor: vec![49., 99., 200., 500., 1000., 2000.],
            w_metal_resistor: 5.,
            via_counts: vec![2, 4, 8, 10, 20, 50, 100, 250],
            via_wire_w: 8.,
            tlm_contact_l: 50.,
            tlm_contact_w: 50.,
            tlm_spacings: vec![10., 20., 50., 100., 200., 500., 1000.],
            tlm_pad_size: (100., 100.),
            circ_tlm_spacings: vec![
                1., 2., 3., 5., 10., 15., 20., 30., 50., 80., 100., 200.,
            ],
            circ_tlm_radius: 40.,
            resolutions: vec![1., 1.5, 2.],
            sample_w: 7800.,
            pad_size: (100., 100.),
        }
    }
}

/// Parameter sweeps of the three-layer back-gate chip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackGateSweeps {
    pub l_gate: Vec<f64>,
    pub l_overlap: Vec<f64>,
    pub w_contact: Vec<f64>,
    pub l_mim: Vec<f64>,
    pub resolutions: Vec<f64>,
    pub sample_w: f64,
    /// Width of the transistor and capacitor arrays.
    pub array_w: f64,
    pub array_margin: f64,
    /// Distance of the alignment groups from the sample corners.
    pub alignment_offset: f64,
    pub pad_size: (f64, f64),
}

impl Default for BackGateSweeps {
    fn default() -> Self {
        Self {
            l_gate: vec![2., 3., 5., 10., 15., 25.],
            l_overlap: vec![2., 3., 5., 10.],
            w_contact: vec![5., 10., 20., 50.],
            l_mim: vec![50., 100., 200.],
            resolutions: vec![1., 2., 3., 5.],
            sample_w: 10000.,
            array_w: 4000.,
            array_margin: 100.,
            alignment_offset: 700.,
            pad_size: (100., 100.),
        }
    }
}

/// A design to place on the wafer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignRef {
    /// Path to the GDS file.
    pub path: PathBuf,
    /// Name of the top cell to import.
    pub cell: String,
}

/// Designs consolidated onto a wafer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaferConfig {
    pub designs: Vec<DesignRef>,
}

/// Reads a TOML file into `T`.
pub fn load_toml<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let data = read_to_string(path)?;
    let value = with_err_context(toml::from_str(&data), || {
        ErrorContext::ParseFile(path.to_path_buf())
    })?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let sweeps: StandardSweeps = toml::from_str(
            r#"
            l_overlap = [3.0]
            sample_w = 5000.0
            "#,
        )
        .unwrap();
        assert_eq!(sweeps.l_overlap, vec![3.]);
        assert_eq!(sweeps.sample_w, 5000.);
        assert_eq!(sweeps.w_channel, StandardSweeps::default().w_channel);
    }

    #[test]
    fn wafer_config_lists_designs() {
        let config: WaferConfig = toml::from_str(
            r#"
            [[designs]]
            path = "standard_test_structures.gds"
            cell = "top"
            "#,
        )
        .unwrap();
        assert_eq!(config.designs.len(), 1);
        assert_eq!(config.designs[0].cell, "top");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_toml::<WaferConfig>("/nonexistent/wafer.toml").unwrap_err();
        assert!(format!("{err}").contains("wafer.toml"));
    }
}
