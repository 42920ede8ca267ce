//! Core geometric types and their operations/attributes.
//!
//! All coordinates are integer database units of one nanometer.

use std::cmp::Ordering;

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use transform::{Transform, Transformation, Translate};

use self::bbox::{Bbox, BoundBox};

pub mod bbox;
pub mod boolean;
pub mod orientation;
pub mod transform;

/// Database units per micron.
pub const UM: i64 = 1000;

/// Converts a length in microns to database units, rounding to the nearest nanometer.
#[inline]
pub fn um(value: f64) -> i64 {
    (value * UM as f64).round() as i64
}

/// Converts a length in database units to microns.
#[inline]
pub fn to_um(value: i64) -> f64 {
    value as f64 / UM as f64
}

/// A point in two-dimensional layout-space.
#[derive(
    Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    /// Creates a new [`Point`] from (x,y) coordinates.
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Creates a new [`Point`] from coordinates given in microns.
    pub fn from_um(x: f64, y: f64) -> Self {
        Self::new(um(x), um(y))
    }

    /// Returns the origin, (0, 0).
    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }
}

impl std::ops::Add<Point> for Point {
    type Output = Self;
    fn add(self, rhs: Point) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Add<Dims> for Point {
    type Output = Self;
    fn add(self, rhs: Dims) -> Self::Output {
        Self::new(self.x + rhs.w, self.y + rhs.h)
    }
}

impl std::ops::AddAssign<Point> for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub<Point> for Point {
    type Output = Self;
    fn sub(self, rhs: Point) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::SubAssign<Point> for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl std::ops::Neg for Point {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

impl From<(i64, i64)> for Point {
    fn from(value: (i64, i64)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

/// An enumeration of the corners of an axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum Corner {
    /// The lower-left corner.
    LowerLeft,
    /// The lower-right corner.
    LowerRight,
    /// The upper-left corner.
    UpperLeft,
    /// The upper-right corner.
    UpperRight,
}

/// A closed n-sided polygon with arbitrary number of vertices.
///
/// Closure from the last point back to the first is implied;
/// the initial point need not be repeated at the end.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon from its vertices.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Approximates a circle of the given `radius` with `n` vertices.
    ///
    /// The first vertex lies on the positive x-axis; vertices proceed counter-clockwise.
    pub fn circle(center: Point, radius: i64, n: usize) -> Self {
        let r = radius as f64;
        let points = (0..n)
            .map(|i| {
                let theta = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
                Point::new(
                    center.x + (r * theta.cos()).round() as i64,
                    center.y + (r * theta.sin()).round() as i64,
                )
            })
            .collect();
        Self { points }
    }

    /// Twice the signed area enclosed by the polygon.
    ///
    /// Positive for counter-clockwise vertex order.
    pub fn signed_area2(&self) -> i128 {
        let n = self.points.len();
        (0..n)
            .map(|i| {
                let (a, b) = (self.points[i], self.points[(i + 1) % n]);
                a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128
            })
            .sum()
    }

    /// The unsigned area of the polygon, in square database units.
    pub fn area(&self) -> f64 {
        (self.signed_area2() as f64 / 2.0).abs()
    }
}

impl Translate for Polygon {
    fn translate(&mut self, p: Point) {
        for pt in self.points.iter_mut() {
            pt.translate(p);
        }
    }
}

/// An axis-aligned rectangle, specified by lower-left and upper-right corners.
#[derive(
    Debug, Default, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Rect {
    /// The lower-left corner.
    pub p0: Point,
    /// The upper-right corner.
    pub p1: Point,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates a rectangle with points `(0, 0), (dims.w(), dims.h())`.
    pub fn with_dims(dims: Dims) -> Self {
        Self::new(Point::zero(), Point::new(dims.w(), dims.h()))
    }

    /// Creates a rectangle of the given dimensions centered on `center`.
    ///
    /// Odd dimensions place the extra database unit on the upper-right side.
    pub fn centered(center: Point, dims: Dims) -> Self {
        let p0 = Point::new(center.x - dims.w() / 2, center.y - dims.h() / 2);
        Self::new(p0, p0 + dims)
    }

    /// Creates a rectangle from its four edge coordinates.
    pub fn from_sides(left: i64, bot: i64, right: i64, top: i64) -> Self {
        Self::new(Point::new(left, bot), Point::new(right, top))
    }

    /// Returns the center point of the rectangle.
    pub fn center(&self) -> Point {
        Point::new(
            (self.p0.x + self.p1.x).div_euclid(2),
            (self.p0.y + self.p1.y).div_euclid(2),
        )
    }

    /// Returns the bottom y-coordinate of the rectangle.
    #[inline]
    pub fn bottom(&self) -> i64 {
        self.p0.y
    }

    /// Returns the top y-coordinate of the rectangle.
    #[inline]
    pub fn top(&self) -> i64 {
        self.p1.y
    }

    /// Returns the left x-coordinate of the rectangle.
    #[inline]
    pub fn left(&self) -> i64 {
        self.p0.x
    }

    /// Returns the right x-coordinate of the rectangle.
    #[inline]
    pub fn right(&self) -> i64 {
        self.p1.x
    }

    /// Returns the horizontal width of the rectangle.
    #[inline]
    pub fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }

    /// Returns the vertical height of the rectangle.
    #[inline]
    pub fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }

    /// Returns the area of the rectangle.
    #[inline]
    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Returns the dimensions of the rectangle as [`Dims`].
    #[inline]
    pub fn dims(&self) -> Dims {
        Dims::new(self.width(), self.height())
    }

    /// Returns the desired corner of the rectangle.
    pub fn corner(&self, corner: Corner) -> Point {
        match corner {
            Corner::LowerLeft => self.p0,
            Corner::LowerRight => Point::new(self.p1.x, self.p0.y),
            Corner::UpperLeft => Point::new(self.p0.x, self.p1.y),
            Corner::UpperRight => self.p1,
        }
    }

    /// Expands the rectangle by `amount` on all sides.
    #[inline]
    pub fn expand(&self, amount: i64) -> Self {
        Self::new(
            Point::new(self.p0.x - amount, self.p0.y - amount),
            Point::new(self.p1.x + amount, self.p1.y + amount),
        )
    }

    /// Returns `true` if the two rectangles share any area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.bottom() < other.top()
            && other.bottom() < self.top()
    }
}

impl From<Bbox> for Rect {
    fn from(r: Bbox) -> Self {
        debug_assert!(!r.is_empty());
        Self { p0: r.p0, p1: r.p1 }
    }
}

/// The primary geometric primitive comprising raw layout.
///
/// Variants include [`Rect`] and [`Polygon`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[enum_dispatch(ShapeTrait)]
pub enum Shape {
    Rect(Rect),
    Polygon(Polygon),
}

impl Transform for Shape {
    fn transform(&self, trans: Transformation) -> Self {
        match self {
            Self::Rect(s) if trans.is_rectilinear() => Self::Rect(s.transform(trans)),
            Self::Rect(s) => Self::Polygon(s.to_poly().transform(trans)),
            Self::Polygon(s) => Self::Polygon(s.transform(trans)),
        }
    }
}

impl Translate for Shape {
    fn translate(&mut self, p: Point) {
        match self {
            Self::Rect(s) => s.translate(p),
            Self::Polygon(s) => s.translate(p),
        }
    }
}

impl Shape {
    pub fn as_rect(&self) -> Option<Rect> {
        if let Shape::Rect(rect) = self {
            Some(*rect)
        } else {
            None
        }
    }
}

/// Common shape operations, dispatched from the [`Shape`] enum to its variants by [mod@enum_dispatch].
#[enum_dispatch]
pub trait ShapeTrait {
    /// Returns our "origin", an arbitrary [`Point`] on the shape.
    fn point0(&self) -> Point;
    /// Returns `true` if the [`Shape`] contains [`Point`] `pt`.
    ///
    /// Containment is *inclusive* for all [`Shape`] types.
    fn contains(&self, pt: Point) -> bool;
    /// Converts the shape to a [`Polygon`], the most general of shapes.
    fn to_poly(&self) -> Polygon;
}

impl ShapeTrait for Rect {
    fn point0(&self) -> Point {
        self.p0
    }
    fn contains(&self, pt: Point) -> bool {
        self.p0.x <= pt.x && self.p1.x >= pt.x && self.p0.y <= pt.y && self.p1.y >= pt.y
    }
    fn to_poly(&self) -> Polygon {
        Polygon {
            points: vec![
                self.p0,
                Point::new(self.p1.x, self.p0.y),
                self.p1,
                Point::new(self.p0.x, self.p1.y),
            ],
        }
    }
}

impl ShapeTrait for Polygon {
    fn point0(&self) -> Point {
        self.points[0]
    }
    fn contains(&self, pt: Point) -> bool {
        if !self.points.bbox().contains(pt) {
            return false;
        }

        // Winding number; points on the boundary count as inside.
        let mut winding_num: isize = 0;
        for idx in 0..self.points.len() {
            let (past, next) = (
                &self.points[idx],
                &self.points[(idx + 1) % self.points.len()],
            );

            if past.y.min(next.y) <= pt.y && past.y.max(next.y) >= pt.y {
                if next.y == past.y {
                    if past.x.min(next.x) <= pt.x && past.x.max(next.x) >= pt.x {
                        return true;
                    }
                } else {
                    let xsolve = (next.x - past.x) * (pt.y - past.y) / (next.y - past.y) + past.x;

                    match xsolve.cmp(&pt.x) {
                        Ordering::Equal => return true,
                        Ordering::Greater => {
                            if next.y > past.y {
                                winding_num += 1;
                            } else {
                                winding_num -= 1;
                            }
                        }
                        Ordering::Less => (),
                    }
                }
            }
        }
        winding_num != 0
    }
    fn to_poly(&self) -> Polygon {
        self.clone()
    }
}

/// A horizontal and vertical rectangular dimension with no specified location.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize,
)]
pub struct Dims {
    /// The width dimension.
    w: i64,
    /// The height dimension.
    h: i64,
}

impl Dims {
    /// Creates a new [`Dims`] from a width and height.
    pub const fn new(w: i64, h: i64) -> Self {
        Self { w, h }
    }
    /// Creates a new [`Dims`] from a width and height in microns.
    pub fn from_um(w: f64, h: f64) -> Self {
        Self::new(um(w), um(h))
    }
    /// Creates a new [`Dims`] with width and height equal to `value`.
    pub const fn square(value: i64) -> Self {
        Self { w: value, h: value }
    }

    /// Returns the larger of the two dimensions.
    pub fn max_dim(&self) -> i64 {
        self.w.max(self.h)
    }

    /// Returns the width (ie. the horizontal dimension).
    #[inline]
    pub fn width(&self) -> i64 {
        self.w
    }

    /// Returns the height (ie. the vertical dimension).
    #[inline]
    pub fn height(&self) -> i64 {
        self.h
    }

    /// A shorthand for [`Dims::width`].
    #[inline]
    pub fn w(&self) -> i64 {
        self.width()
    }

    /// A shorthand for [`Dims::height`].
    #[inline]
    pub fn h(&self) -> i64 {
        self.height()
    }

    /// Converts this dimension object into a [`Rect`].
    ///
    /// See [`Rect::with_dims`] for more information.
    #[inline]
    pub fn into_rect(self) -> Rect {
        Rect::with_dims(self)
    }
}

impl std::ops::Add<Dims> for Dims {
    type Output = Self;
    fn add(self, rhs: Dims) -> Self::Output {
        Self {
            w: self.w + rhs.w,
            h: self.h + rhs.h,
        }
    }
}

impl std::ops::Sub<Dims> for Dims {
    type Output = Self;
    fn sub(self, rhs: Dims) -> Self::Output {
        Self {
            w: self.w - rhs.w,
            h: self.h - rhs.h,
        }
    }
}

impl std::ops::Mul<i64> for Dims {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self::Output {
        Self {
            w: self.w * rhs,
            h: self.h * rhs,
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn transform_identity() {
        let shape1 = Shape::Rect(Rect {
            p0: Point::new(0, 0),
            p1: Point::new(1, 1),
        });
        let trans = Transformation::identity();
        let shape2 = shape1.transform(trans);
        assert_eq!(shape2, shape1);
    }

    #[test]
    fn transform_rotate() {
        let shape1 = Shape::Rect(Rect {
            p0: Point::new(0, 0),
            p1: Point::new(1, 1),
        });
        let trans = Transformation::rotate(90.);
        let shape2 = shape1.transform(trans);
        assert_eq!(
            shape2,
            Shape::Rect(Rect {
                p0: Point::new(-1, 0),
                p1: Point::new(0, 1),
            })
        );
        let shape3 = shape2.transform(trans);
        let shape4 = shape3.transform(trans);
        let shape0 = shape4.transform(trans);
        assert_eq!(shape0, shape1);
    }

    #[test]
    fn diagonal_rotation_makes_polygon() {
        let rect = Shape::Rect(Rect::new(Point::new(-1000, -1000), Point::new(1000, 1000)));
        let rotated = rect.transform(Transformation::rotate(45.));
        let Shape::Polygon(poly) = rotated else {
            panic!("expected a polygon after a 45 degree rotation");
        };
        assert_eq!(poly.points.len(), 4);
        assert_eq!(poly.points[0], Point::new(0, -1414));
        assert_eq!(poly.bbox(), Bbox::new(Point::new(-1414, -1414), Point::new(1414, 1414)));
    }

    #[test]
    fn test_polygon_contains() {
        let triangle = Polygon {
            points: vec![Point::new(0, 0), Point::new(2, 0), Point::new(0, 2)],
        };
        assert!(triangle.contains(Point::new(0, 0)));
        assert!(triangle.contains(Point::new(1, 0)));
        assert!(triangle.contains(Point::new(1, 1)));
        assert!(!triangle.contains(Point::new(2, 2)));

        // U-shaped polygon inside a 10x10 square
        let u = Polygon {
            points: vec![
                Point::new(0, 0),
                Point::new(0, 10),
                Point::new(2, 10),
                Point::new(2, 2),
                Point::new(8, 2),
                Point::new(8, 10),
                Point::new(10, 10),
                Point::new(10, 0),
            ],
        };
        for pt in &u.points {
            assert!(u.contains(*pt));
        }
        assert!(u.contains(Point::new(1, 9)));
        assert!(u.contains(Point::new(9, 1)));
        assert!(!u.contains(Point::new(3, 3)));
        assert!(!u.contains(Point::new(7, 9)));
    }

    #[test]
    fn circle_area_approaches_pi_r_squared() {
        let circle = Polygon::circle(Point::zero(), 40 * UM, 144);
        let exact = std::f64::consts::PI * (40.0 * UM as f64).powi(2);
        assert!((circle.area() - exact).abs() / exact < 1e-3);
        assert!(circle.signed_area2() > 0);
    }

    #[test]
    fn centered_rect_and_um_conversion() {
        let r = Rect::centered(Point::zero(), Dims::from_um(1.5, 3.));
        assert_eq!(r.left(), -750);
        assert_eq!(r.right(), 750);
        assert_eq!(r.height(), 3000);
        assert_eq!(um(0.0015), 2);
        assert_eq!(to_um(2500), 2.5);
    }

    #[test]
    fn dims_max_dim_and_ordering() {
        let pad = Dims::new(100, 250);
        assert_eq!(pad.max_dim(), 250);
        assert_eq!(2 * pad.max_dim(), 500);
        assert_eq!(std::cmp::max(pad, Dims::new(100, 50)), pad);
    }
}
