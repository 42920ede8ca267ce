//! Merging several GDS libraries into one.

use std::path::Path;

use crate::data::MaskCtx;
use crate::error::{with_err_context, ErrorContext, Result};
use crate::io::create_parent_dir;
use crate::layout::layers::LayerSet;
use crate::log;

/// Loads every cell of each input library and writes them all to `output`.
///
/// Cells whose names clash across inputs are renamed on export.
pub fn merge_gds<P>(output: impl AsRef<Path>, inputs: impl IntoIterator<Item = P>) -> Result<()>
where
    P: AsRef<Path>,
{
    let output = output.as_ref();
    let ctx = MaskCtx::new(LayerSet::new());
    let mut count = 0;
    for input in inputs {
        let cells = ctx.from_gds(input.as_ref())?;
        log::debug!("loaded {} cells from {:?}", cells.len(), input.as_ref());
        count += 1;
    }

    let inner = || -> Result<()> {
        create_parent_dir(output)?;
        ctx.to_gds(output)
    };
    with_err_context(inner(), || {
        ErrorContext::Task(arcstr::format!("merging GDS files into {:?}", output))
    })?;
    log::info!("merged {} libraries into {:?}", count, output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;
    use crate::layout::elements::marks::{ResolutionTest, ResolutionTestParams};
    use crate::layout::layers::GdsLayerSpec;

    #[test]
    fn duplicate_cells_are_renamed() {
        let dir = TempDir::new("merge").unwrap();
        let a = dir.path().join("a.gds");
        let b = dir.path().join("b.gds");
        let params = ResolutionTestParams {
            resolutions: vec![2.],
            inverted: false,
            layer: GdsLayerSpec(1, 0),
        };
        for path in [&a, &b] {
            let ctx = MaskCtx::new(LayerSet::standard());
            ctx.write_layout::<ResolutionTest>(&params, path).unwrap();
        }

        let out = dir.path().join("merged.gds");
        merge_gds(&out, [&a, &b]).unwrap();

        let lib = gds21::GdsLibrary::load(&out).unwrap();
        let mut names = lib
            .structs
            .iter()
            .map(|s| s.name.clone())
            .collect::<Vec<_>>();
        names.sort();
        assert_eq!(
            names,
            vec![
                "resolution_test_1_pos_2".to_string(),
                "resolution_test_1_pos_2_1".to_string()
            ]
        );
    }
}
