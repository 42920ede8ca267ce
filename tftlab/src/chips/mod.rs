//! Complete chips and wafers assembled from the test devices.

use tftgeom::{to_um, um};

pub mod back_gate;
pub mod merge;
pub mod standard;
pub mod test_chip;
pub mod wafer;

pub use back_gate::{BackGateChip, BackGateChipParams};
pub use merge::merge_gds;
pub use standard::{StandardTestStructures, StandardTestStructuresParams};
pub use test_chip::{TestChip, TestChipParams};
pub use wafer::{ImportedDesign, Wafer, WaferParams};

/// Rounds a coordinate up to the next multiple of 10 um.
pub(crate) fn ceil10(value: i64) -> i64 {
    um(10. * (to_um(value) / 10.).ceil())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil10_rounds_up_in_microns() {
        assert_eq!(ceil10(um(1231.5)), um(1240.));
        assert_eq!(ceil10(um(1240.)), um(1240.));
        assert_eq!(ceil10(um(-15.)), um(-10.));
    }
}
