//! The drawing context handed to components.

use std::sync::Arc;

use tftgeom::bbox::{Bbox, BoundBox};
use tftgeom::boolean::Region;
use tftgeom::transform::Transformation;
use tftgeom::{Point, Rect, Shape};

use super::cell::{Cell, CellKey, Element, Flatten, Instance, Port, TextElement};
use super::elements::text::Text;
use super::group::Group;
use super::layers::{GdsLayerSpec, LayerSet};
use super::{Draw, DrawRef};
use crate::component::Component;
use crate::data::MaskCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result;
use crate::generation::{GeneratedCheck, GenerationMap, ParamKey};

/// Draws one [`Component`] into its cell.
pub struct LayoutCtx {
    pub(crate) inner: MaskCtx,
    pub(crate) cell: Cell,
}

/// Every cell generated or imported for a mask.
#[derive(Debug, Default)]
pub(crate) struct LayoutData {
    cells: GenerationMap<ParamKey, CellKey, Cell>,
}

impl LayoutData {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the cell generated earlier with the same parameters, or an ID to generate it under.
    pub(crate) fn get_generated_cell<T>(
        &mut self,
        params: &T::Params,
    ) -> Result<GeneratedCheck<Arc<Cell>, CellKey>>
    where
        T: Component,
    {
        self.cells.get(ParamKey::from_params::<T>(params)?)
    }

    pub(crate) fn set_cell(&mut self, cell: Cell) -> Arc<Cell> {
        self.cells.set(cell.id(), cell.name().clone(), cell)
    }

    /// Forgets a cell whose generation failed.
    pub(crate) fn abandon_cell(&mut self, id: CellKey) {
        self.cells.abandon(id);
    }

    pub(crate) fn gen_id(&mut self) -> CellKey {
        self.cells.gen_id()
    }

    /// Allocates an unused name derived from the given base name.
    pub(crate) fn alloc_name(&self, base_name: impl Into<ArcStr>) -> ArcStr {
        self.cells.alloc_name(base_name)
    }

    /// Cells in the order they were created.
    pub(crate) fn cells(&self) -> impl Iterator<Item = &Arc<Cell>> {
        self.cells.values()
    }
}

impl LayoutCtx {
    #[inline]
    pub fn inner(&self) -> &MaskCtx {
        &self.inner
    }

    #[inline]
    pub fn layers(&self) -> Arc<LayerSet> {
        self.inner.layers()
    }

    /// Looks up a layer of the mask by name.
    pub fn layer(&self, name: &str) -> Result<GdsLayerSpec> {
        self.inner.layers().get(name)
    }

    /// Generates component `T`, or reuses an identical earlier one, and returns an unplaced instance.
    #[inline]
    pub fn instantiate<T>(&mut self, params: &T::Params) -> Result<Instance>
    where
        T: Component,
    {
        self.inner.instantiate_layout::<T>(params)
    }

    pub fn draw_rect(&mut self, layer: GdsLayerSpec, rect: Rect) {
        self.cell.draw_rect(layer, rect)
    }

    pub fn draw_shape(&mut self, layer: GdsLayerSpec, shape: impl Into<Shape>) {
        self.cell.add(Element::new(layer, shape));
    }

    pub fn add_inst(&mut self, inst: impl Into<Instance>) {
        self.cell.add_inst(inst);
    }

    pub fn bbox(&self) -> Bbox {
        self.cell.bbox()
    }

    /// The bounding rectangle of everything drawn so far.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if nothing has been drawn.
    pub fn brect(&self) -> Rect {
        self.cell.brect()
    }

    pub fn draw<T>(&mut self, value: T) -> Result<()>
    where
        T: Draw,
    {
        let group = value.draw()?;
        self.add_group(group);
        Ok(())
    }

    pub fn draw_ref<T>(&mut self, value: &T) -> Result<()>
    where
        T: DrawRef,
    {
        let group = value.draw_ref()?;
        self.add_group(group);
        Ok(())
    }

    /// Draws `text` and returns the bounding box of the drawn glyphs.
    pub fn text(&mut self, text: Text) -> Result<Bbox> {
        let group = text.draw()?;
        let bbox = group.bbox();
        self.add_group(group);
        Ok(bbox)
    }

    pub fn draw_all<T>(&mut self, values: impl IntoIterator<Item = T>) -> Result<()>
    where
        T: Draw,
    {
        for value in values.into_iter() {
            self.draw(value)?;
        }
        Ok(())
    }

    pub(crate) fn add_group(&mut self, group: Group) {
        self.add_elements(group.elements());
        self.add_instances(group.instances());
        self.add_annotations(group.annotations());
    }

    #[inline]
    pub fn flatten(&mut self) {
        self.cell.flatten();
    }

    /// Moves everything drawn so far so that `origin` becomes (0, 0).
    #[inline]
    pub fn set_origin(&mut self, origin: Point) {
        self.cell.set_origin(origin);
    }

    /// Applies `trans` to everything drawn so far.
    #[inline]
    pub fn transform(&mut self, trans: Transformation) {
        self.cell.transform_contents(trans);
    }

    /// Rotates everything drawn so far counter-clockwise by `angle` degrees about the origin.
    pub fn rotate(&mut self, angle: f64) {
        self.transform(Transformation::builder().angle(angle).build());
    }

    pub(crate) fn add_elements(&mut self, elements: impl IntoIterator<Item = Element>) {
        self.cell.add_elements(elements);
    }

    pub(crate) fn add_instances(&mut self, instances: impl IntoIterator<Item = Instance>) {
        self.cell.add_instances(instances);
    }

    pub(crate) fn add_annotations(&mut self, annotations: impl IntoIterator<Item = TextElement>) {
        self.cell.add_annotations(annotations);
    }

    pub fn add_port(&mut self, name: impl Into<ArcStr>, port: Port) {
        self.cell.add_port(name, port);
    }

    /// Draws every polygon of `region` on `layer`.
    pub fn draw_region(&mut self, layer: GdsLayerSpec, region: &Region) {
        let elems = region
            .to_polygons()
            .into_iter()
            .map(|poly| Element::new(layer, poly));
        self.cell.add_elements(elems);
    }

    /// Draws `layer` in inverted tone within `area`.
    ///
    /// The cell's own shapes on `layer` are replaced by `area` minus their union.
    pub fn invert_layer(&mut self, layer: GdsLayerSpec, area: Rect) {
        let drawn = self.take_layer(layer);
        let inverted = Region::from_rect(area).difference(&drawn);
        self.draw_region(layer, &inverted);
    }

    /// Removes the cell's own shapes on `layer`, returning their union.
    fn take_layer(&mut self, layer: GdsLayerSpec) -> Region {
        let (taken, kept): (Vec<Element>, Vec<Element>) =
            self.cell.elems().cloned().partition(|e| e.layer == layer);
        self.cell.set_elems(kept);
        Region::from_shapes(taken.iter().map(|e| &e.inner))
    }
}
