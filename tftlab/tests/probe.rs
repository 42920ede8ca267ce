use float_eq::assert_float_eq;
use tftlab::error::ErrorSource;
use tftlab::probe::dat::DatFile;
use tftlab::probe::extract::{self, WaferMap};
use tftlab::probe::names::{transistor_size, vdp_cell};
use tftlab::probe::report::{write_csv, TransferRecord};
use tftlab::probe::{KeysightFile, ProbeError};

mod common;
use common::{out_dir, out_path};

/// A transfer sweep at two drain voltages with an exponential subthreshold
/// region of 200 mV/dec below 0 V and a linear region above it.
fn transfer_dat() -> String {
    let mut text = String::from(
        "TEST,transfer\nID:,G\nSTART:,-1\nSTOP:,1\nPNTS:,21\n\nID:,D\nSTART:,0.1\nSTOP:,1\nPNTS:,2\n\nDATA:\nIS,IS1,IS2,VD,ID1,ID2,VG,IG1,IG2\n",
    );
    for n in 0..21 {
        let vg = -1. + 0.1 * n as f64;
        let id = |scale: f64| {
            if vg <= 0. {
                scale * 1e-8 * 10f64.powf(vg / 0.2)
            } else {
                scale * (1e-8 + 1e-7 * vg)
            }
        };
        text.push_str(&format!(
            "0,0,0,0,{},{},{vg},1e-12,1e-12\n",
            id(1.),
            id(2.)
        ));
    }
    text.push_str("TEST,end\n");
    text
}

#[test]
fn transistor_file_to_report() {
    let dir = out_dir("probe_transistor");
    let path = out_path(&dir, "wafer_V_G8_transistor_100_5_10.dat");
    std::fs::write(&path, transfer_dat()).unwrap();

    let (w, l) = transistor_size(&path).unwrap();
    assert_eq!((w, l), (100., 5.));

    let sweeps = DatFile::load(&path).unwrap().transistor().unwrap();
    assert!(sweeps.output.is_none());
    assert_eq!(sweeps.transfer.vd, vec![0.1, 1.]);

    let results = extract::transfer_curves(&sweeps.transfer).unwrap();
    assert_eq!(results.len(), 2);
    for (res, scale) in results.iter().zip([1., 2.]) {
        assert_float_eq!(res.ss.unwrap(), 200., rmax <= 1e-3);
        assert_float_eq!(res.gm_max, scale * 1e-7, rmax <= 1e-3);
        assert_float_eq!(res.vth, -0.1, abs <= 1e-3);
    }

    let records: Vec<TransferRecord> = results
        .into_iter()
        .map(|res| TransferRecord::new(&path, w, l, res))
        .collect();
    let csv_path = out_path(&dir, "reports/transfer.csv");
    write_csv(&csv_path, &records).unwrap();
    let text = std::fs::read_to_string(&csv_path).unwrap();
    assert!(text.starts_with("file,w,l,vd,gm_max,vth,ss,on_off,ig_max\n"));
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn four_probe_files_fill_a_wafer_map() {
    let dir = out_dir("probe_vdp");
    let mut map = WaferMap::new();
    for (cell, r) in [("A1", 100.), ("D4", 200.), ("H8", 300.)] {
        let path = out_path(&dir, &format!("wafer_M_{cell}_vdp_ungated.dat"));
        let mut text = String::from("IF2P,V1,V2,V3\n");
        for n in 0..64 {
            let i = (n as f64 - 32.) * 1e-8;
            text.push_str(&format!("{i},0,{},0\n", i * r));
        }
        text.push_str("END\n");
        std::fs::write(&path, text).unwrap();

        let curve = DatFile::load(&path).unwrap().four_probe().unwrap();
        let res = extract::four_probe(&curve).unwrap();
        assert_float_eq!(res.r, r, rmax <= 1e-6);
        map.set(vdp_cell(&path).unwrap(), res.r);
    }

    let summary = map.summary().unwrap();
    assert_eq!(summary.count, 3);
    assert_float_eq!(summary.mean, 200., rmax <= 1e-6);
    let d4 = map
        .get("D4".parse().unwrap())
        .expect("D4 should be on the map");
    assert_float_eq!(d4, 200., rmax <= 1e-9);
}

#[test]
fn keysight_leakage() {
    let dir = out_dir("probe_keysight");
    let path = out_path(&dir, "2_4_2025 11_27_09 AM;mim_50_20_A1;I_V Sweep(1);.csv");
    std::fs::write(
        &path,
        "SetupTitle,I/V Sweep\nDataName, V, V2, I, I2\nDataValue, -2, 0, -1e-6, 0\nDataValue, -1, 0, -3e-10, 0\nDataValue, 0, 0, 1e-13, 0\nDataValue, 1, 0, 2e-10, 0\nDataValue, 2, 0, 1e-6, 0\n",
    )
    .unwrap();

    let file = KeysightFile::load(&path).unwrap();
    let res = extract::cap_leakage(&file.sweeps[0].iv(), 50., 20.).unwrap();
    assert_float_eq!(res.i_max, 3e-10, rmax <= 1e-12);
    assert_float_eq!(res.per_area, 3e-13, rmax <= 1e-9);
}

#[test]
fn unreadable_files_report_their_path() {
    let dir = out_dir("probe_errors");
    let path = out_path(&dir, "empty.dat");
    std::fs::write(&path, "TEST,nothing\n").unwrap();

    let err = DatFile::load(&path).unwrap().two_terminal().unwrap_err();
    assert!(matches!(
        err.source(),
        ErrorSource::Probe(ProbeError::MissingHeader(_))
    ));

    let missing = out_path(&dir, "missing.dat");
    let err = DatFile::load(&missing).unwrap_err();
    assert!(format!("{err}").contains("missing.dat"));
}
