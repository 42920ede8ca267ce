#![allow(dead_code)]

use std::path::PathBuf;

use tempdir::TempDir;
use tftlab::config::{BackGateSweeps, StandardSweeps};

/// A temporary directory removed when the returned guard is dropped.
pub fn out_dir(test_name: &str) -> TempDir {
    TempDir::new(test_name).unwrap()
}

pub fn out_path(dir: &TempDir, file_name: &str) -> PathBuf {
    dir.path().join(file_name)
}

/// Standard sweeps small enough to generate a chip quickly.
pub fn small_sweeps() -> StandardSweeps {
    StandardSweeps {
        l_gate: vec![2., 5.],
        l_overlap: vec![2.],
        w_channel: vec![10., 20.],
        l_cap: vec![10., 50.],
        w_cap: vec![10.],
        l_resistor: vec![5.],
        w_resistor: vec![5.],
        sq_resistor: vec![49.],
        via_counts: vec![2, 4],
        tlm_spacings: vec![10., 20.],
        circ_tlm_spacings: vec![5., 10.],
        ..Default::default()
    }
}

pub fn small_back_gate_sweeps() -> BackGateSweeps {
    BackGateSweeps {
        l_gate: vec![5.],
        l_overlap: vec![5.],
        w_contact: vec![10.],
        l_mim: vec![50.],
        ..Default::default()
    }
}
