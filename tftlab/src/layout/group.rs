//! Loose collections of shapes and instances that move together.
//!
//! Marks, labels and placement helpers build [`Group`]s; drawing a group
//! into a cell bakes in its location and orientation.

use tftgeom::bbox::{Bbox, BoundBox};
use tftgeom::orientation::Orientation;
use tftgeom::transform::{Transform, Transformation, Translate};
use tftgeom::{Point, Rect, Shape};

use super::cell::{flatten_recur, Element, Flatten, Instance, TextElement};
use super::layers::GdsLayerSpec;
use super::placement::align::AlignRect;
use super::{Draw, DrawRef};

/// Shapes, instances and labels sharing one location and orientation.
///
/// Contents are stored in group coordinates; the accessors return them
/// transformed into the parent's coordinates.
#[derive(Clone, Default, Debug)]
pub struct Group {
    loc: Point,
    orientation: Orientation,
    elems: Vec<Element>,
    insts: Vec<Instance>,
    annotations: Vec<TextElement>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

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

    /// Rotates the whole group counter-clockwise by `angle` degrees about the origin.
    pub fn rotate(&mut self, angle: f64) -> &mut Self {
        let rot = Transformation::builder().angle(angle).build();
        self.loc = self.loc.transform(rot);
        self.orientation.rotate(angle);
        self
    }

    pub fn add_rect(&mut self, layer: GdsLayerSpec, rect: impl Into<Rect>) {
        self.elems.push(Element::new(layer, rect.into()));
    }

    pub fn add_shape(&mut self, layer: GdsLayerSpec, shape: impl Into<Shape>) {
        self.elems.push(Element::new(layer, shape));
    }

    /// The group's shapes in the parent's coordinates.
    pub fn elements(&self) -> impl Iterator<Item = Element> + '_ {
        let transformation = self.transformation();
        self.elems.iter().map(move |e| e.transform(transformation))
    }

    #[inline]
    pub fn add_instance(&mut self, elt: impl Into<Instance>) {
        self.insts.push(elt.into());
    }

    pub fn instances(&self) -> impl Iterator<Item = Instance> + '_ {
        let tf = self.transformation();
        self.insts.iter().map(move |i| i.transform(tf))
    }

    #[inline]
    pub fn add_annotation(&mut self, text: TextElement) {
        self.annotations.push(text);
    }

    pub fn annotations(&self) -> impl Iterator<Item = TextElement> + '_ {
        let tf = self.transformation();
        self.annotations.iter().map(move |i| i.transform(tf))
    }

    /// Merges `other` into this group, keeping every object where it was drawn.
    pub fn add_group(&mut self, other: Group) {
        let tf = self.transformation();
        // A transformed group bakes its transformation into its contents first.
        if tf == Transformation::identity() {
            self.elems.extend(other.elements());
            self.insts.extend(other.instances());
            self.annotations.extend(other.annotations());
        } else {
            let mut local = Group::new();
            local.elems = self.elements().collect();
            local.insts = self.instances().collect();
            local.annotations = self.annotations().collect();
            local.elems.extend(other.elements());
            local.insts.extend(other.instances());
            local.annotations.extend(other.annotations());
            *self = local;
        }
    }

    /// Returns a copy of this group's own elements placed on `layer`.
    ///
    /// Instances are not copied.
    pub fn with_layer(&self, layer: GdsLayerSpec) -> Group {
        Group {
            loc: self.loc,
            orientation: self.orientation,
            elems: self.elems.iter().map(|e| e.with_layer(layer)).collect(),
            ..Default::default()
        }
    }

    /// Returns true if the group holds no objects.
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty() && self.insts.is_empty() && self.annotations.is_empty()
    }

    /// Returns every shape on `layer` in the group, after transformation.
    pub fn shapes_on(&self, layer: GdsLayerSpec) -> Vec<Shape> {
        let mut shapes: Vec<Shape> = self
            .elements()
            .filter(|e| e.layer == layer)
            .map(Element::into_inner)
            .collect();
        for inst in self.instances() {
            shapes.extend(inst.shapes_on(layer));
        }
        shapes
    }
}

impl BoundBox for Group {
    fn bbox(&self) -> Bbox {
        let mut bbox = Bbox::empty();
        for elem in self.elements() {
            bbox = elem.inner.union(bbox);
        }
        for inst in self.instances() {
            bbox = inst.bbox().union(bbox);
        }
        bbox
    }
}

impl Translate for Group {
    #[inline]
    fn translate(&mut self, p: Point) {
        self.loc.translate(p);
    }
}

impl AlignRect for Group {}

impl Draw for Group {
    fn draw(self) -> crate::error::Result<Group> {
        Ok(self)
    }
}

impl DrawRef for Group {
    fn draw_ref(&self) -> crate::error::Result<Group> {
        Ok(self.clone())
    }
}

impl From<Instance> for Group {
    fn from(value: Instance) -> Self {
        let mut group = Group::new();
        group.add_instance(value);
        group
    }
}

impl From<Element> for Group {
    fn from(value: Element) -> Self {
        Self {
            elems: vec![value],
            ..Default::default()
        }
    }
}

impl Flatten for Group {
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

#[cfg(test)]
mod tests {
    use super::*;

    const L1: GdsLayerSpec = GdsLayerSpec(1, 0);
    const L2: GdsLayerSpec = GdsLayerSpec(2, 0);

    #[test]
    fn rotated_group_transforms_elements() {
        let mut group = Group::new();
        group.add_rect(L1, Rect::from_sides(0, 0, 10, 20));
        group.translate(Point::new(100, 0));
        group.rotate(90.);
        let elems: Vec<Element> = group.elements().collect();
        assert_eq!(elems.len(), 1);
        assert_eq!(elems[0].bbox(), Bbox::new(Point::new(-20, 100), Point::new(0, 110)));
    }

    #[test]
    fn add_group_keeps_absolute_positions() {
        let mut a = Group::new();
        a.add_rect(L1, Rect::from_sides(0, 0, 10, 10));
        a.translate(Point::new(5, 5));
        let mut b = Group::new();
        b.add_rect(L2, Rect::from_sides(0, 0, 10, 10));
        a.add_group(b);
        assert_eq!(a.bbox(), Bbox::new(Point::new(0, 0), Point::new(15, 15)));
        assert_eq!(a.shapes_on(L2).len(), 1);
        assert_eq!(a.with_layer(L2).shapes_on(L2).len(), 2);
    }
}
