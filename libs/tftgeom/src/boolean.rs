//! Polygon boolean operations.
//!
//! Clipping is delegated to [`geo`]; this module converts between integer layout shapes and
//! `geo` multipolygons, and turns polygons with holes back into simple boundaries that GDS can
//! represent.

use std::cmp::Reverse;

use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon};

use crate::bbox::{Bbox, BoundBox};
use crate::{Point, Polygon, Rect, Shape, ShapeTrait};

/// A set of (possibly holed) polygons on a single layer.
#[derive(Debug, Clone)]
pub struct Region {
    inner: MultiPolygon<f64>,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            inner: MultiPolygon::new(Vec::new()),
        }
    }
}

/// The boolean operations supported on [`Region`]s.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BoolOp {
    /// A OR B.
    Union,
    /// A AND NOT B.
    Difference,
    /// A AND B.
    Intersection,
    /// A XOR B.
    Xor,
}

impl Region {
    /// Creates an empty region.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a region covering a single shape.
    pub fn from_shape(shape: &Shape) -> Self {
        match shape {
            Shape::Rect(r) => Self::from_rect(*r),
            Shape::Polygon(p) => Self::from_polygon(p),
        }
    }

    /// Creates a region covering a rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self::from_polygon(&rect.to_poly())
    }

    /// Creates a region covering a polygon.
    ///
    /// Polygons with fewer than three vertices produce an empty region.
    pub fn from_polygon(poly: &Polygon) -> Self {
        if poly.points.len() < 3 {
            return Self::new();
        }
        let exterior = LineString::from(
            poly.points
                .iter()
                .map(|p| Coord {
                    x: p.x as f64,
                    y: p.y as f64,
                })
                .collect::<Vec<_>>(),
        );
        Self {
            inner: MultiPolygon::new(vec![geo::Polygon::new(exterior, Vec::new())]),
        }
    }

    /// Creates a region covering the union of all given shapes.
    pub fn from_shapes<'a>(shapes: impl IntoIterator<Item = &'a Shape>) -> Self {
        shapes
            .into_iter()
            .fold(Self::new(), |acc, shape| acc.union(&Self::from_shape(shape)))
    }

    /// Returns `true` if the region covers no area.
    pub fn is_empty(&self) -> bool {
        self.inner.0.is_empty() || self.area() == 0.
    }

    /// The covered area in square database units.
    pub fn area(&self) -> f64 {
        self.inner.unsigned_area()
    }

    /// Applies the boolean operation `op` with `self` as the A operand.
    pub fn boolean(&self, other: &Region, op: BoolOp) -> Region {
        if other.inner.0.is_empty() {
            return match op {
                BoolOp::Union | BoolOp::Difference | BoolOp::Xor => self.clone(),
                BoolOp::Intersection => Region::new(),
            };
        }
        if self.inner.0.is_empty() {
            return match op {
                BoolOp::Union | BoolOp::Xor => other.clone(),
                BoolOp::Difference | BoolOp::Intersection => Region::new(),
            };
        }
        let inner = match op {
            BoolOp::Union => self.inner.union(&other.inner),
            BoolOp::Difference => self.inner.difference(&other.inner),
            BoolOp::Intersection => self.inner.intersection(&other.inner),
            BoolOp::Xor => self.inner.xor(&other.inner),
        };
        Region { inner }
    }

    #[inline]
    pub fn union(&self, other: &Region) -> Region {
        self.boolean(other, BoolOp::Union)
    }

    #[inline]
    pub fn difference(&self, other: &Region) -> Region {
        self.boolean(other, BoolOp::Difference)
    }

    #[inline]
    pub fn intersection(&self, other: &Region) -> Region {
        self.boolean(other, BoolOp::Intersection)
    }

    #[inline]
    pub fn xor(&self, other: &Region) -> Region {
        self.boolean(other, BoolOp::Xor)
    }

    /// Returns the number of disjoint polygons (each possibly holed) in the region.
    pub fn num_polygons(&self) -> usize {
        self.inner.0.len()
    }

    /// Returns the total number of holes across all polygons.
    pub fn num_holes(&self) -> usize {
        self.inner.0.iter().map(|p| p.interiors().len()).sum()
    }

    /// Builds a ring of width `distance` hugging the outside of each polygon's outer boundary.
    ///
    /// Outer rings are offset along mitred vertex normals, so the result is exact for convex
    /// outlines such as wafers and frames.
    pub fn outline(&self, distance: i64) -> Region {
        let d = distance as f64;
        let grown = self
            .inner
            .0
            .iter()
            .map(|poly| {
                let ring = ccw_ring(open_ring(poly.exterior()));
                geo::Polygon::new(LineString::from(offset_ring(&ring, d)), Vec::new())
            })
            .collect::<Vec<_>>();
        let filled = Region {
            inner: MultiPolygon::new(
                self.inner
                    .0
                    .iter()
                    .map(|p| geo::Polygon::new(p.exterior().clone(), Vec::new()))
                    .collect(),
            ),
        };
        Region {
            inner: MultiPolygon::new(grown),
        }
        .difference(&filled)
    }

    /// Converts the region into hole-free integer polygons.
    ///
    /// Each hole is spliced into its outer ring through a zero-width cut, giving a single
    /// boundary per polygon as required by GDS.
    pub fn to_polygons(&self) -> Vec<Polygon> {
        self.inner
            .0
            .iter()
            .filter_map(|poly| {
                let exterior = ccw_ring(round_ring(open_ring(poly.exterior())));
                if exterior.len() < 3 {
                    return None;
                }
                let holes = poly
                    .interiors()
                    .iter()
                    .map(|h| cw_ring(round_ring(open_ring(h))))
                    .filter(|h| h.len() >= 3)
                    .collect::<Vec<_>>();
                Some(Polygon::new(keyhole(exterior, holes)))
            })
            .collect()
    }
}

impl BoundBox for Region {
    fn bbox(&self) -> Bbox {
        self.inner
            .0
            .iter()
            .flat_map(|p| p.exterior().coords())
            .fold(Bbox::empty(), |acc, c| {
                acc.union(Point::new(c.x.floor() as i64, c.y.floor() as i64).bbox())
                    .union(Point::new(c.x.ceil() as i64, c.y.ceil() as i64).bbox())
            })
    }
}

/// Drops the closing coordinate that `geo` repeats at the end of each ring.
fn open_ring(ring: &LineString<f64>) -> Vec<(f64, f64)> {
    let mut coords: Vec<(f64, f64)> = ring.coords().map(|c| (c.x, c.y)).collect();
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    coords
}

fn round_ring(ring: Vec<(f64, f64)>) -> Vec<Point> {
    let mut points: Vec<Point> = ring
        .into_iter()
        .map(|(x, y)| Point::new(x.round() as i64, y.round() as i64))
        .collect();
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

fn signed_area2_f(ring: &[(f64, f64)]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            a.0 * b.1 - b.0 * a.1
        })
        .sum()
}

fn ccw_ring<T: RingOrder>(mut ring: Vec<T>) -> Vec<T> {
    if T::signed_area2(&ring) < 0. {
        ring.reverse();
    }
    ring
}

fn cw_ring(mut ring: Vec<Point>) -> Vec<Point> {
    if Point::signed_area2(&ring) > 0. {
        ring.reverse();
    }
    ring
}

trait RingOrder: Sized {
    fn signed_area2(ring: &[Self]) -> f64;
}

impl RingOrder for (f64, f64) {
    fn signed_area2(ring: &[Self]) -> f64 {
        signed_area2_f(ring)
    }
}

impl RingOrder for Point {
    fn signed_area2(ring: &[Self]) -> f64 {
        Polygon::new(ring.to_vec()).signed_area2() as f64
    }
}

/// Offsets a counter-clockwise ring outward by `d` along mitred vertex normals.
fn offset_ring(ring: &[(f64, f64)], d: f64) -> Vec<Coord<f64>> {
    let n = ring.len();
    let normal = |a: (f64, f64), b: (f64, f64)| {
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let len = (dx * dx + dy * dy).sqrt();
        (dy / len, -dx / len)
    };
    (0..n)
        .map(|i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let n0 = normal(prev, cur);
            let n1 = normal(cur, next);
            let (mx, my) = (n0.0 + n1.0, n0.1 + n1.1);
            let dot = 1. + n0.0 * n1.0 + n0.1 * n1.1;
            let scale = if dot.abs() < 1e-12 { d } else { 2. * d / dot };
            Coord {
                x: cur.0 + mx * scale / 2.,
                y: cur.1 + my * scale / 2.,
            }
        })
        .collect()
}

fn cross(o: Point, a: Point, b: Point) -> i128 {
    (a.x - o.x) as i128 * (b.y - o.y) as i128 - (a.y - o.y) as i128 * (b.x - o.x) as i128
}

/// Returns `true` if segments `ab` and `cd` cross at a point interior to both.
fn segments_cross(a: Point, b: Point, c: Point, d: Point) -> bool {
    if a == c || a == d || b == c || b == d {
        return false;
    }
    let d1 = cross(c, d, a).signum();
    let d2 = cross(c, d, b).signum();
    let d3 = cross(a, b, c).signum();
    let d4 = cross(a, b, d).signum();
    d1 * d2 < 0 && d3 * d4 < 0
}

fn ring_blocks(ring: &[Point], a: Point, b: Point) -> bool {
    let n = ring.len();
    (0..n).any(|i| segments_cross(a, b, ring[i], ring[(i + 1) % n]))
}

fn dist2(a: Point, b: Point) -> i128 {
    let dx = (a.x - b.x) as i128;
    let dy = (a.y - b.y) as i128;
    dx * dx + dy * dy
}

/// Splices each hole into `exterior` through a bridge to the nearest visible vertex.
fn keyhole(exterior: Vec<Point>, mut holes: Vec<Vec<Point>>) -> Vec<Point> {
    holes.sort_by_key(|h| Reverse(h.iter().map(|p| p.x).max().unwrap_or(i64::MIN)));
    let mut ring = exterior;
    for (k, hole) in holes.iter().enumerate() {
        let Some((hi, &hp)) = hole.iter().enumerate().max_by_key(|(_, p)| (p.x, p.y)) else {
            continue;
        };
        let mut candidates: Vec<usize> = (0..ring.len()).collect();
        candidates.sort_by_key(|&i| dist2(ring[i], hp));
        let ri = candidates
            .iter()
            .copied()
            .find(|&i| {
                let rp = ring[i];
                !ring_blocks(&ring, hp, rp)
                    && !holes[k..].iter().any(|h| ring_blocks(h, hp, rp))
            })
            .unwrap_or(candidates[0]);

        let mut spliced = Vec::with_capacity(ring.len() + hole.len() + 2);
        spliced.extend_from_slice(&ring[..=ri]);
        spliced.extend(hole[hi..].iter().chain(hole[..hi].iter()).copied());
        spliced.push(hp);
        spliced.push(ring[ri]);
        spliced.extend_from_slice(&ring[ri + 1..]);
        ring = spliced;
    }
    ring
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::Dims;

    fn square(x: i64, y: i64, size: i64) -> Rect {
        Rect::new(Point::new(x, y), Point::new(x + size, y + size))
    }

    #[test]
    fn union_of_overlapping_squares() {
        let a = Region::from_rect(square(0, 0, 10));
        let b = Region::from_rect(square(5, 5, 10));
        let u = a.union(&b);
        assert_eq!(u.num_polygons(), 1);
        assert_float_eq!(u.area(), 175., abs <= 1e-9);
        assert_eq!(u.bbox(), Bbox::new(Point::new(0, 0), Point::new(15, 15)));
    }

    #[test]
    fn difference_makes_a_hole_and_keyholes_it() {
        let outer = Region::from_rect(square(0, 0, 100));
        let inner = Region::from_rect(square(40, 40, 20));
        let ring = outer.difference(&inner);
        assert_eq!(ring.num_holes(), 1);
        assert_float_eq!(ring.area(), 9600., abs <= 1e-9);

        let polys = ring.to_polygons();
        assert_eq!(polys.len(), 1);
        // 4 outer + 4 hole vertices, plus the two repeated bridge endpoints.
        assert_eq!(polys[0].points.len(), 10);
        assert_float_eq!(polys[0].area(), 9600., abs <= 1e-9);
        assert!(!polys[0].contains(Point::new(50, 50)));
        assert!(polys[0].contains(Point::new(10, 10)));
    }

    #[test]
    fn empty_operands() {
        let a = Region::from_rect(Rect::with_dims(Dims::new(10, 20)));
        let empty = Region::new();
        assert_float_eq!(a.union(&empty).area(), 200., abs <= 1e-9);
        assert!(a.intersection(&empty).is_empty());
        assert!(empty.difference(&a).is_empty());
        assert_float_eq!(empty.xor(&a).area(), 200., abs <= 1e-9);
    }

    #[test]
    fn default_region_is_empty() {
        let region = Region::default();
        assert!(region.is_empty());
        assert_eq!(region.num_polygons(), 0);
        assert!(region.to_polygons().is_empty());
    }

    #[test]
    fn outline_of_square_is_a_frame() {
        let frame = Region::from_rect(square(0, 0, 100)).outline(1);
        assert_float_eq!(frame.area(), 102. * 102. - 100. * 100., abs <= 1e-6);
        assert_eq!(frame.bbox(), Bbox::new(Point::new(-1, -1), Point::new(101, 101)));
    }
}
