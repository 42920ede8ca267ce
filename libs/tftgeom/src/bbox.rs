//! Rectangular bounding boxes and associated trait implementations.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use super::transform::{Transform, Transformation};
use super::{Point, Polygon, Rect, Shape};

/// An axis-aligned rectangular bounding box.
///
/// Points `p0` and `p1` represent opposite corners of a bounding rectangle.
/// `p0` is always closest to negative-infinity, in both x and y,
/// and `p1` is always closest to positive-infinity.
///
/// This differs from [`Rect`] in that it could be empty, meaning that `p0`
/// is to the upper right of `p1`.
#[derive(Debug, Copy, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Bbox {
    pub p0: Point,
    pub p1: Point,
}

impl Default for Bbox {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bbox {
    /// Create a new [`Bbox`] from two [`Point`]s.
    #[inline]
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }
    /// Finds the width of the bounding box in the x-direction.
    #[inline]
    pub fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }
    /// Finds the height of the bounding box in the y-direction.
    #[inline]
    pub fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }
    /// Creates a new [`Bbox`] from a single [`Point`].
    pub fn from_point(pt: Point) -> Self {
        Self { p0: pt, p1: pt }
    }
    /// Creates an empty, otherwise invalid bounding box.
    pub fn empty() -> Self {
        Self {
            p0: Point::new(i64::MAX, i64::MAX),
            p1: Point::new(i64::MIN, i64::MIN),
        }
    }
    /// Returns `true` if the bounding box is empty.
    pub fn is_empty(&self) -> bool {
        self.p0.x > self.p1.x || self.p0.y > self.p1.y
    }
    /// Returns true if [`Point`] `pt` lies inside the bounding box.
    pub fn contains(&self, pt: Point) -> bool {
        self.p0.x <= pt.x && self.p1.x >= pt.x && self.p0.y <= pt.y && self.p1.y >= pt.y
    }
    /// Expands an existing [`Bbox`] in all directions by `delta`.
    pub fn expand(&mut self, delta: i64) {
        self.p0.x -= delta;
        self.p0.y -= delta;
        self.p1.x += delta;
        self.p1.y += delta;
    }
    /// Returns the bounding box's center.
    pub fn center(&self) -> Point {
        self.into_rect().center()
    }
    /// Returns the bounding box of this box's four corners under `trans`.
    pub fn transform(&self, trans: Transformation) -> Bbox {
        if self.is_empty() {
            return *self;
        }
        let corners = [
            self.p0,
            Point::new(self.p1.x, self.p0.y),
            self.p1,
            Point::new(self.p0.x, self.p1.y),
        ];
        corners
            .iter()
            .fold(Bbox::empty(), |acc, p| acc.union(p.transform(trans).bbox()))
    }

    /// Converts a bounding box into a [`Rect`].
    #[inline]
    pub fn into_rect(self) -> Rect {
        Rect::from(self)
    }

    /// Converts a bounding box into a [`Rect`], returning [`None`] if it is empty.
    #[inline]
    pub fn into_rect_opt(self) -> Option<Rect> {
        if self.is_empty() {
            None
        } else {
            Some(self.into_rect())
        }
    }
}

impl From<Rect> for Bbox {
    fn from(r: Rect) -> Self {
        Self { p0: r.p0, p1: r.p1 }
    }
}

/// A trait representing functions available for objects with a bounding box.
#[enum_dispatch]
pub trait BoundBox {
    /// Compute a rectangular bounding box around the implementing type.
    fn bbox(&self) -> Bbox;
    /// Computes the rectangular bounding box and converts it to a [`Rect`].
    ///
    /// # Panics
    ///
    /// This function may panic if the bounding box is empty.
    fn brect(&self) -> Rect {
        self.bbox().into_rect()
    }
    /// Computes the intersection with rectangular bounding box `bbox`.
    fn intersection(&self, bbox: Bbox) -> Bbox {
        self.bbox().intersection(bbox)
    }
    /// Computes the union with rectangular bounding box `bbox`.
    fn union(&self, bbox: Bbox) -> Bbox {
        self.bbox().union(bbox)
    }
}

impl<T> BoundBox for &T
where
    T: BoundBox,
{
    fn bbox(&self) -> Bbox {
        T::bbox(*self)
    }
}

impl BoundBox for Bbox {
    fn bbox(&self) -> Bbox {
        *self
    }
    fn intersection(&self, bbox: Bbox) -> Bbox {
        let pmin = Point::new(self.p0.x.max(bbox.p0.x), self.p0.y.max(bbox.p0.y));
        let pmax = Point::new(self.p1.x.min(bbox.p1.x), self.p1.y.min(bbox.p1.y));
        if pmin.x > pmax.x || pmin.y > pmax.y {
            return Bbox::empty();
        }
        Bbox::new(pmin, pmax)
    }
    fn union(&self, bbox: Bbox) -> Bbox {
        if bbox.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return bbox;
        }
        Bbox::new(
            Point::new(self.p0.x.min(bbox.p0.x), self.p0.y.min(bbox.p0.y)),
            Point::new(self.p1.x.max(bbox.p1.x), self.p1.y.max(bbox.p1.y)),
        )
    }
}

impl BoundBox for Point {
    fn bbox(&self) -> Bbox {
        Bbox::from_point(*self)
    }
}

impl BoundBox for Shape {
    fn bbox(&self) -> Bbox {
        match self {
            Shape::Rect(r) => r.bbox(),
            Shape::Polygon(p) => p.bbox(),
        }
    }
}

impl BoundBox for Rect {
    fn bbox(&self) -> Bbox {
        Bbox {
            p0: self.p0,
            p1: self.p1,
        }
    }
}

impl BoundBox for Polygon {
    fn bbox(&self) -> Bbox {
        self.points.bbox()
    }
}

impl BoundBox for Vec<Point> {
    fn bbox(&self) -> Bbox {
        self.iter()
            .fold(Bbox::empty(), |bbox, pt| bbox.union(pt.bbox()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_ignores_empty_boxes() {
        let a = Bbox::new(Point::new(0, 0), Point::new(10, 10));
        assert_eq!(a.union(Bbox::empty()), a);
        assert_eq!(Bbox::empty().union(a), a);
        let b = Bbox::new(Point::new(-5, 3), Point::new(2, 20));
        assert_eq!(
            a.union(b),
            Bbox::new(Point::new(-5, 0), Point::new(10, 20))
        );
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let a = Bbox::new(Point::new(0, 0), Point::new(10, 10));
        let b = Bbox::new(Point::new(20, 20), Point::new(30, 30));
        assert!(a.intersection(b).is_empty());
        assert!(a.intersection(b).into_rect_opt().is_none());
    }

    #[test]
    fn transformed_bbox_covers_rotated_corners() {
        let a = Bbox::new(Point::new(0, 0), Point::new(10, 20));
        let rotated = a.transform(Transformation::rotate(90.));
        assert_eq!(rotated, Bbox::new(Point::new(-20, 0), Point::new(0, 10)));
    }
}
