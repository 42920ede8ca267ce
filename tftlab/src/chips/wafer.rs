//! Consolidation of finished designs onto a 150 mm wafer.

use serde::{Deserialize, Serialize};
use tftgeom::bbox::BoundBox;
use tftgeom::boolean::Region;
use tftgeom::transform::Translate;
use tftgeom::{um, Dims, Point, Polygon, Rect, Shape};

use crate::component::Component;
use crate::config::{DesignRef, WaferConfig};
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::{ErrorSource, Result};
use crate::layout::cell::Instance;
use crate::layout::context::LayoutCtx;
use crate::layout::elements::shapes::Cross;
use crate::layout::group::Group;
use crate::layout::layers::{GdsLayerSpec, OUTLINE_LAYER};
use crate::layout::placement::align::AlignRect;
use crate::layout::placement::grid::{CellAlign, GridPlacer};
use crate::layout::Draw;

/// Wafer radius, in microns.
pub const WAFER_RADIUS: f64 = 75_000.;
/// Length of the wafer flat, in microns.
pub const FLAT_LENGTH: f64 = 57_500.;
/// Edge length of the frame drawn around each design, in microns.
pub const DIE_SIZE: f64 = 29_499.;
/// Number of vertices of the wafer circle.
const WAFER_POINTS: usize = 720;
/// Position of the wafer alignment crosses, in microns from the center.
const CROSS_OFFSET: f64 = 40_000.;
/// Layer of the fine alignment crosses.
const CROSS_LAYER: GdsLayerSpec = GdsLayerSpec(1, 0);

/// The wafer circle with its flat at the bottom.
pub fn wafer_region() -> Region {
    let r = WAFER_RADIUS;
    let flat_height = r - (r * r - (FLAT_LENGTH / 2.).powi(2)).sqrt();
    let circle = Polygon::circle(Point::zero(), um(r), WAFER_POINTS);
    let flat = Rect::from_sides(
        -um(FLAT_LENGTH / 2.),
        -um(r),
        um(FLAT_LENGTH / 2.),
        um(flat_height - r),
    );
    Region::from_polygon(&circle).difference(&Region::from_rect(flat))
}

/// A design imported from a GDS file, flattened and centered at the origin
/// inside a square frame on the outline layer.
pub struct ImportedDesign {
    params: DesignRef,
}

impl Component for ImportedDesign {
    type Params = DesignRef;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        let stem = self
            .params
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        arcstr::format!("{}_{}", stem, self.params.cell)
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let cells = ctx.inner().from_gds(&self.params.path)?;
        let cell = cells
            .get(self.params.cell.as_str())
            .cloned()
            .ok_or_else(|| ErrorSource::CellNotFound(self.params.cell.as_str().into()))?;
        ctx.add_inst(Instance::new(cell));
        ctx.flatten();

        if let Some(rect) = ctx.bbox().into_rect_opt() {
            ctx.set_origin(rect.center());
        }

        let frame = Rect::centered(Point::zero(), Dims::square(um(DIE_SIZE)));
        let outline = Region::from_rect(frame).outline(um(1.));
        ctx.draw_region(OUTLINE_LAYER, &outline);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaferParams {
    pub designs: Vec<DesignRef>,
}

impl From<WaferConfig> for WaferParams {
    fn from(value: WaferConfig) -> Self {
        Self {
            designs: value.designs,
        }
    }
}

/// A wafer carrying every design twice on a 3x2 grid, with two offset rows
/// of the first designs above and below it.
pub struct Wafer {
    params: WaferParams,
}

impl Component for Wafer {
    type Params = WaferParams;

    fn new(params: &Self::Params, _ctx: &MaskCtx) -> Result<Self> {
        if params.designs.is_empty() {
            return Err(ErrorSource::InvalidArgs(
                "a wafer needs at least one design".to_string(),
            )
            .into());
        }
        Ok(Self {
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        arcstr::literal!("top")
    }

    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
        let mut outline = Group::new();
        for poly in wafer_region().outline(1).to_polygons() {
            outline.add_shape(OUTLINE_LAYER, Shape::Polygon(poly));
        }
        outline.set_center(Point::zero());
        ctx.draw(outline)?;

        let designs = self
            .params
            .designs
            .iter()
            .map(|design| ctx.instantiate::<ImportedDesign>(design))
            .collect::<Result<Vec<_>>>()?;

        let tiles = designs.iter().chain(designs.iter().rev()).cloned();
        let mut main = GridPlacer::from_tiles(tiles, 3)
            .align(CellAlign::LowerLeft)
            .draw()?;
        main.set_center(Point::zero());
        let main_bbox = main.bbox();
        ctx.draw(main)?;

        // Offset rows stagger the first two designs by a sixth of a die.
        let stagger = designs[0].bbox().width() / 6;
        for i in 0..2 {
            let row: Vec<Instance> = if i == 0 {
                designs.iter().take(2).cloned().collect()
            } else {
                designs.iter().take(2).rev().cloned().collect()
            };
            let mut row = GridPlacer::from_tiles(row, 2)
                .align(CellAlign::LowerLeft)
                .draw()?;
            row.set_center(Point::zero());
            if i == 0 {
                row.translate(Point::new(stagger, 0));
                row.set_ymin(main_bbox.p1.y);
            } else {
                row.translate(Point::new(-stagger, 0));
                row.set_ymax(main_bbox.p0.y);
            }
            ctx.draw(row)?;
        }

        for (sx, sy) in [(1., 1.), (-1., 1.), (-1., -1.), (1., -1.)] {
            let center = Point::new(um(sx * CROSS_OFFSET), um(sy * CROSS_OFFSET));
            for cross in [
                Cross {
                    length: um(100.),
                    width: um(2.),
                    layer: CROSS_LAYER,
                },
                Cross {
                    length: um(1000.),
                    width: um(100.),
                    layer: OUTLINE_LAYER,
                },
            ] {
                let mut group = cross.draw()?;
                group.translate(center);
                ctx.draw(group)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;

    #[test]
    fn flat_cuts_the_bottom_of_the_wafer() {
        let region = wafer_region();
        let bbox = region.bbox();
        let flat_height = WAFER_RADIUS
            - (WAFER_RADIUS.powi(2) - (FLAT_LENGTH / 2.).powi(2)).sqrt();
        assert_eq!(bbox.p1.y, um(WAFER_RADIUS));
        assert!((bbox.p0.y - um(flat_height - WAFER_RADIUS)).abs() <= 1);
        let full = std::f64::consts::PI * (um(WAFER_RADIUS) as f64).powi(2);
        assert_float_eq!(region.area() / full, 0.98, abs <= 0.02);
    }

    #[test]
    fn wafer_needs_designs() {
        let ctx = MaskCtx::new(crate::layout::layers::LayerSet::standard());
        assert!(ctx
            .instantiate_layout::<Wafer>(&WaferParams::default())
            .is_err());
    }
}
