//! Cells: frozen, named collections of shapes, labels, ports and instances.
//!
//! Components draw into a fresh [`Cell`]. Once generated the cell is frozen,
//! shared behind an [`Arc`] and placed through [`Instance`]s.

use std::collections::HashMap;
use std::sync::Arc;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use tftgeom::bbox::{Bbox, BoundBox};
use tftgeom::boolean::Region;
use tftgeom::orientation::{wrap_angle, Orientation};
use tftgeom::transform::{Transform, Transformation, Translate};
use tftgeom::{Point, Rect, Shape};

use super::group::Group;
use super::layers::GdsLayerSpec;
use super::placement::align::AlignRect;
use super::{Draw, DrawRef};
use crate::deps::arcstr::ArcStr;
use crate::error::{ErrorSource, Result};

/// A mask cell.
#[derive(Debug, Default)]
pub struct Cell {
    id: CellKey,
    name: ArcStr,
    insts: Vec<Instance>,
    elems: Vec<Element>,
    annotations: Vec<TextElement>,
    ports: HashMap<ArcStr, Port>,
    /// Set when the cell is frozen; a frozen cell is never modified again.
    frozen: Option<Frozen>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub(crate) struct Frozen {
    bbox: Bbox,
}

new_key_type! {
    /// A unique identifier for cells.
    pub struct CellKey;
}

/// A placement of a cell inside another cell.
///
/// The cell is reflected and rotated by `orientation` about its own origin,
/// then moved so that its origin lands on `loc`.
#[derive(Debug, Clone, Builder)]
pub struct Instance {
    #[builder(default)]
    pub(crate) name: ArcStr,
    pub(crate) cell: Arc<Cell>,
    #[builder(default)]
    pub(crate) loc: Point,
    #[builder(default)]
    pub(crate) orientation: Orientation,
}

impl DrawRef for Instance {
    fn draw_ref(&self) -> Result<Group> {
        Ok(self.clone().into())
    }
}

impl Draw for Instance {
    fn draw(self) -> Result<Group> {
        Ok(self.into())
    }
}

/// A primitive geometric element: a [`Shape`] on a mask layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Element {
    /// The layer on which the element is drawn.
    pub layer: GdsLayerSpec,
    /// The element's shape.
    pub inner: Shape,
}

impl Element {
    pub fn new(layer: GdsLayerSpec, shape: impl Into<Shape>) -> Self {
        Self {
            layer,
            inner: shape.into(),
        }
    }

    /// Returns a copy of this element moved to another layer.
    pub fn with_layer(&self, layer: GdsLayerSpec) -> Self {
        Self {
            layer,
            inner: self.inner.clone(),
        }
    }

    /// Discards the layer.
    pub fn into_inner(self) -> Shape {
        self.inner
    }
}

impl BoundBox for Element {
    #[inline]
    fn bbox(&self) -> Bbox {
        self.inner.bbox()
    }
}

impl Draw for Element {
    fn draw(self) -> Result<Group> {
        Ok(self.into())
    }
}

impl DrawRef for Element {
    fn draw_ref(&self) -> Result<Group> {
        Ok(self.clone().into())
    }
}

impl Transform for Element {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            layer: self.layer,
            inner: self.inner.transform(trans),
        }
    }
}

impl Translate for Element {
    fn translate(&mut self, p: Point) {
        self.inner.translate(p);
    }
}

/// A GDS text label.
///
/// Labels name structures in a layout viewer and are never printed on the mask;
/// printed text is drawn as polygons by [`Text`](super::elements::text::Text).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextElement {
    pub string: ArcStr,
    pub loc: Point,
    pub layer: GdsLayerSpec,
}

impl Translate for TextElement {
    fn translate(&mut self, p: Point) {
        self.loc.translate(p);
    }
}

impl Transform for TextElement {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            loc: self.loc.transform(trans),
            ..self.clone()
        }
    }
}

/// A connection point with an outward-facing direction.
///
/// Placing one cell against another is done by joining a port of the first
/// to a port of the second so that the two face each other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// The location of the port.
    pub loc: Point,
    /// The direction the port faces, in degrees counter-clockwise from the positive x-axis.
    pub angle: f64,
}

impl Port {
    pub fn new(loc: Point, angle: f64) -> Self {
        Self {
            loc,
            angle: wrap_angle(angle),
        }
    }
}

impl Transform for Port {
    fn transform(&self, trans: Transformation) -> Self {
        let o = trans.orientation();
        let angle = if o.is_reflected() {
            o.angle() - self.angle
        } else {
            o.angle() + self.angle
        };
        Self::new(self.loc.transform(trans), angle)
    }
}

impl Translate for Port {
    fn translate(&mut self, p: Point) {
        self.loc.translate(p);
    }
}

impl Cell {
    pub fn new(id: CellKey) -> Self {
        Self {
            id,
            name: arcstr::literal!("unnamed"),
            ..Default::default()
        }
    }

    #[inline]
    pub fn id(&self) -> CellKey {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn set_name(&mut self, name: impl Into<ArcStr>) {
        self.name = name.into();
    }

    #[inline]
    pub fn insts(&self) -> impl Iterator<Item = &Instance> {
        self.insts.iter()
    }

    pub fn add_inst(&mut self, inst: impl Into<Instance>) {
        debug_assert!(!self.is_frozen());
        self.insts.push(inst.into());
    }

    #[inline]
    pub fn elems(&self) -> impl Iterator<Item = &Element> {
        self.elems.iter()
    }

    /// Replaces every element of the cell.
    #[inline]
    pub fn set_elems(&mut self, elems: Vec<Element>) {
        debug_assert!(!self.is_frozen());
        self.elems = elems;
    }

    pub fn add<T>(&mut self, elem: T)
    where
        T: Into<Element>,
    {
        debug_assert!(!self.is_frozen());
        self.elems.push(elem.into());
    }

    pub fn add_elements(&mut self, elems: impl IntoIterator<Item = Element>) {
        debug_assert!(!self.is_frozen());
        self.elems.extend(elems);
    }

    pub fn add_instances(&mut self, insts: impl IntoIterator<Item = Instance>) {
        debug_assert!(!self.is_frozen());
        self.insts.extend(insts);
    }

    pub fn add_annotations(&mut self, annotations: impl IntoIterator<Item = TextElement>) {
        debug_assert!(!self.is_frozen());
        self.annotations.extend(annotations);
    }

    pub fn draw_rect(&mut self, layer: GdsLayerSpec, rect: Rect) {
        self.add(Element::new(layer, rect));
    }

    #[inline]
    pub fn annotations(&self) -> impl Iterator<Item = &TextElement> {
        self.annotations.iter()
    }

    #[inline]
    pub fn add_annotation(&mut self, text_elem: impl Into<TextElement>) {
        debug_assert!(!self.is_frozen());
        self.annotations.push(text_elem.into());
    }

    /// Adds a named port, replacing any port with the same name.
    pub fn add_port(&mut self, name: impl Into<ArcStr>, port: Port) {
        debug_assert!(!self.is_frozen());
        self.ports.insert(name.into(), port);
    }

    /// Retrieves the port named `name`.
    pub fn port(&self, name: &str) -> Result<&Port> {
        self.ports
            .get(name)
            .ok_or_else(|| ErrorSource::PortNotFound(ArcStr::from(name)).into())
    }

    /// The bounding box of every shape in the cell and its instances.
    ///
    /// Labels and ports do not count.
    pub fn bbox(&self) -> Bbox {
        if let Some(frozen) = &self.frozen {
            return frozen.bbox;
        }
        let mut bbox = Bbox::empty();
        for elem in &self.elems {
            bbox = elem.inner.union(bbox);
        }
        for inst in &self.insts {
            bbox = inst.bbox().union(bbox);
        }
        bbox
    }

    /// The exact bounding box of the cell's contents under `trans`.
    ///
    /// Unlike transforming [`Cell::bbox`], this stays tight for rotations by
    /// angles other than multiples of 90 degrees.
    pub fn transformed_bbox(&self, trans: Transformation) -> Bbox {
        if trans.is_rectilinear() {
            return self.bbox().transform(trans);
        }
        let mut bbox = Bbox::empty();
        for elem in &self.elems {
            bbox = elem.inner.transform(trans).union(bbox);
        }
        for inst in &self.insts {
            let tf = Transformation::cascade(trans, inst.transformation());
            bbox = inst.cell.transformed_bbox(tf).union(bbox);
        }
        bbox
    }

    /// Moves the contents so that `origin` becomes (0, 0).
    pub fn set_origin(&mut self, origin: Point) {
        let translation = Point::zero() - origin;
        self.translate(translation);
    }

    /// Applies `trans` to every object in the cell, about the cell's origin.
    pub fn transform_contents(&mut self, trans: Transformation) {
        debug_assert!(!self.is_frozen());
        for inst in self.insts.iter_mut() {
            *inst = inst.transform(trans);
        }
        for elem in self.elems.iter_mut() {
            *elem = elem.transform(trans);
        }
        for ann in self.annotations.iter_mut() {
            *ann = ann.transform(trans);
        }
        for port in self.ports.values_mut() {
            *port = port.transform(trans);
        }
    }

    /// Returns every shape on `layer`, including those inside instances, in cell coordinates.
    pub fn shapes_on(&self, layer: GdsLayerSpec) -> Vec<Shape> {
        let mut shapes = Vec::new();
        shapes_on_recur(&mut shapes, layer, Transformation::identity(), self);
        shapes
    }

    /// The merged area covered by `layer`, including instance contents.
    pub fn layer_region(&self, layer: GdsLayerSpec) -> Region {
        Region::from_shapes(self.shapes_on(layer).iter())
    }

    /// Returns the set of layers drawn anywhere in the cell hierarchy, in first-use order.
    pub fn layers(&self) -> Vec<GdsLayerSpec> {
        let mut layers = Vec::new();
        layers_recur(&mut layers, self);
        layers
    }

    /// Marks the cell as finished and records its bounding box.
    pub(crate) fn freeze(&mut self) {
        self.frozen = Some(Frozen { bbox: self.bbox() });
    }

    #[inline]
    fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }
}

fn shapes_on_recur(out: &mut Vec<Shape>, layer: GdsLayerSpec, tx: Transformation, cell: &Cell) {
    for elem in cell.elems().filter(|e| e.layer == layer) {
        out.push(elem.inner.transform(tx));
    }
    for inst in cell.insts() {
        let tx = Transformation::cascade(tx, inst.transformation());
        shapes_on_recur(out, layer, tx, &inst.cell);
    }
}

fn layers_recur(out: &mut Vec<GdsLayerSpec>, cell: &Cell) {
    for elem in cell.elems() {
        if !out.contains(&elem.layer) {
            out.push(elem.layer);
        }
    }
    for inst in cell.insts() {
        layers_recur(out, &inst.cell);
    }
}

impl Translate for Cell {
    fn translate(&mut self, p: Point) {
        debug_assert!(!self.is_frozen());

        for inst in self.insts.iter_mut() {
            inst.translate(p);
        }
        for elem in self.elems.iter_mut() {
            elem.translate(p);
        }
        for ann in self.annotations.iter_mut() {
            ann.translate(p);
        }
        for port in self.ports.values_mut() {
            port.translate(p);
        }
    }
}

impl Flatten for Cell {
    fn flatten(&mut self) {
        flatten_recur(
            &mut self.elems,
            &mut self.annotations,
            Transformation::identity(),
            &self.insts,
        );
        self.insts.clear();
    }
}

impl BoundBox for Cell {
    fn bbox(&self) -> Bbox {
        Cell::bbox(self)
    }
}

impl Instance {
    /// Places `cell` at the origin, named after the cell.
    pub fn new(cell: impl Into<Arc<Cell>>) -> Self {
        let cell = cell.into();
        Self {
            name: cell.name.clone(),
            cell,
            loc: Point::new(0, 0),
            orientation: Orientation::default(),
        }
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn cell(&self) -> &Arc<Cell> {
        &self.cell
    }

    #[inline]
    pub fn builder() -> InstanceBuilder {
        InstanceBuilder::default()
    }

    /// Maps cell coordinates to the parent's coordinates.
    #[inline]
    pub fn transformation(&self) -> Transformation {
        Transformation::with_loc_and_orientation(self.loc, self.orientation)
    }

    #[inline]
    pub fn loc(&self) -> Point {
        self.loc
    }

    #[inline]
    pub fn set_loc(&mut self, p: impl Into<Point>) {
        self.loc = p.into();
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[inline]
    pub fn set_orientation(&mut self, o: impl Into<Orientation>) {
        self.orientation = o.into();
    }

    /// Rotates the instance counter-clockwise by `angle` degrees about the parent's origin.
    pub fn rotate(&mut self, angle: f64) -> &mut Self {
        let rot = Transformation::builder().angle(angle).build();
        self.loc = self.loc.transform(rot);
        self.orientation.rotate(angle);
        self
    }

    /// Returns the port named `name` in the parent's coordinates.
    pub fn port(&self, name: &str) -> Result<Port> {
        Ok(self.cell.port(name)?.transform(self.transformation()))
    }

    /// Places the instance so that its port `name` faces `dest`.
    ///
    /// The two ports end up at the same location, pointing in opposite directions,
    /// after which the instance is pushed `overlap` into the destination.
    pub fn connect(&mut self, name: &str, dest: Port, overlap: i64) -> Result<&mut Self> {
        let local = *self.cell.port(name)?;
        self.orientation = Orientation::from_angle(dest.angle - local.angle + 180.);
        let placed = local.loc.transform(Transformation::from(self.orientation));
        let push = Point::new(overlap, 0).transform(Transformation::builder().angle(dest.angle).build());
        self.loc = dest.loc - push - placed;
        Ok(self)
    }

    /// Returns the shapes on `layer` inside the instance, in the parent's coordinates.
    pub fn shapes_on(&self, layer: GdsLayerSpec) -> Vec<Shape> {
        let tf = self.transformation();
        self.cell
            .shapes_on(layer)
            .into_iter()
            .map(|s| s.transform(tf))
            .collect()
    }
}

impl BoundBox for Instance {
    fn bbox(&self) -> Bbox {
        self.cell.transformed_bbox(self.transformation())
    }
}

impl Translate for Instance {
    fn translate(&mut self, p: Point) {
        self.loc.translate(p);
    }
}

impl Transform for Instance {
    fn transform(&self, trans: Transformation) -> Self {
        let mut value = self.clone();
        let trans = Transformation::cascade(trans, self.transformation());
        value.orientation = trans.orientation();
        value.loc = trans.offset_point();
        value
    }
}

impl AlignRect for Instance {}

/// Replaces instances with copies of their shapes and labels.
pub trait Flatten {
    fn flatten(&mut self);
}

/// Appends the transformed contents of `insts`, all the way down, to `elts` and `annotations`.
pub(crate) fn flatten_recur(
    elts: &mut Vec<Element>,
    annotations: &mut Vec<TextElement>,
    tx: Transformation,
    insts: &[Instance],
) {
    for inst in insts {
        let tx = Transformation::cascade(tx, inst.transformation());
        for elem in inst.cell.elems() {
            elts.push(elem.transform(tx));
        }
        for elem in inst.cell.annotations() {
            annotations.push(elem.transform(tx));
        }
        flatten_recur(elts, annotations, tx, &inst.cell.insts);
    }
}

impl From<&Instance> for Instance {
    fn from(value: &Instance) -> Self {
        value.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;

    fn key() -> CellKey {
        let mut map: SlotMap<CellKey, ()> = SlotMap::with_key();
        map.insert(())
    }

    const L1: GdsLayerSpec = GdsLayerSpec(1, 0);

    fn square_cell() -> Arc<Cell> {
        let mut cell = Cell::new(key());
        cell.draw_rect(L1, Rect::from_sides(0, 0, 100, 100));
        cell.add_port("e", Port::new(Point::new(100, 50), 0.));
        cell.freeze();
        Arc::new(cell)
    }

    #[test]
    fn freezing_records_bbox() {
        let mut cell = Cell::new(key());
        cell.draw_rect(L1, Rect::from_sides(-20, 0, 30, 40));
        assert!(!cell.is_frozen());

        cell.freeze();
        assert_eq!(
            cell.frozen,
            Some(Frozen {
                bbox: Bbox::new(Point::new(-20, 0), Point::new(30, 40)),
            })
        );
    }

    #[test]
    fn rotated_instance_bbox_is_tight() {
        let mut inst = Instance::new(square_cell());
        inst.rotate(45.);
        let bbox = inst.bbox();
        // Corners land on (+-71, 71) and (0, 141) after rounding.
        assert_eq!(bbox.width(), 142);
        assert_eq!(bbox.height(), 141);
        assert_eq!(bbox.p0.y, 0);
    }

    #[test]
    fn rotate_moves_location_about_origin() {
        let mut inst = Instance::new(square_cell());
        inst.set_loc(Point::new(200, 0));
        inst.rotate(90.);
        assert_eq!(inst.loc(), Point::new(0, 200));
        assert_eq!(inst.bbox(), Bbox::new(Point::new(-100, 200), Point::new(0, 300)));
        let port = inst.port("e").unwrap();
        assert_eq!(port.loc, Point::new(-50, 300));
        assert_eq!(port.angle, 90.);
    }

    #[test]
    fn connect_faces_ports() {
        let mut inst = Instance::new(square_cell());
        // Attach the east port to a port facing down at the origin.
        inst.connect("e", Port::new(Point::new(0, 0), 270.), 10).unwrap();
        let port = inst.port("e").unwrap();
        assert_eq!(port.angle, 90.);
        assert_eq!(port.loc, Point::new(0, 10));
        assert_eq!(inst.bbox(), Bbox::new(Point::new(-50, -90), Point::new(50, 10)));
    }

    #[test]
    fn flatten_and_layer_region() {
        let sq = square_cell();
        let mut cell = Cell::new(key());
        let mut inst = Instance::new(sq.clone());
        inst.set_loc(Point::new(50, 0));
        cell.add_inst(inst);
        cell.draw_rect(L1, Rect::from_sides(0, 0, 100, 100));
        let region = cell.layer_region(L1);
        assert_eq!(region.area(), 150. * 100.);
        assert_eq!(cell.layers(), vec![L1]);

        cell.flatten();
        assert_eq!(cell.insts().count(), 0);
        assert_eq!(cell.elems().count(), 2);
        assert_eq!(cell.bbox(), Bbox::new(Point::new(0, 0), Point::new(150, 100)));
    }
}
