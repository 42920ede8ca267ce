//! Transformation types and traits.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use super::orientation::Orientation;
use super::{Point, Polygon, Rect};
use crate::orientation::wrap_angle;

/// Tolerance used when classifying matrix entries as zero.
const EPSILON: f64 = 1e-9;

/// An affine map of layout space: a 2x2 matrix followed by a translation.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Transformation {
    /// The transformation matrix represented in row-major order.
    pub a: [[f64; 2]; 2],
    /// The x-y translation applied after the transformation.
    pub b: [f64; 2],
}

impl Transformation {
    /// Returns the identity transform, leaving any transformed object unmodified.
    pub fn identity() -> Self {
        Self {
            a: [[1., 0.], [0., 1.]],
            b: [0., 0.],
        }
    }
    /// Returns a translation by `(x,y)`.
    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            a: [[1., 0.], [0., 1.]],
            b: [x, y],
        }
    }
    /// Returns a rotation by `angle` degrees.
    pub fn rotate(angle: f64) -> Self {
        let sin = angle.to_radians().sin();
        let cos = angle.to_radians().cos();
        Self {
            a: [[cos, -sin], [sin, cos]],
            b: [0., 0.],
        }
    }
    /// Returns a reflection about the x-axis.
    pub fn reflect_vert() -> Self {
        Self {
            a: [[1., 0.], [0., -1.]],
            b: [0., 0.],
        }
    }

    /// Returns a new [`TransformationBuilder`].
    #[inline]
    pub fn builder() -> TransformationBuilder {
        TransformationBuilder::default()
    }

    /// Creates a transform from a location and [`Orientation`].
    pub fn with_loc_and_orientation(loc: Point, orientation: impl Into<Orientation>) -> Self {
        Self::builder()
            .point(loc)
            .orientation(orientation.into())
            .build()
    }

    /// Composes an instance transform `child` inside its parent's transform.
    ///
    /// Not commutative: with `parent` a reflection and `child` a shift by (1, 1),
    /// the point (1, 1) lands at (2, -2); swapping the two lands it at (2, 0).
    pub fn cascade(parent: Transformation, child: Transformation) -> Transformation {
        let mut b = matvec(&parent.a, &child.b);
        b[0] += parent.b[0];
        b[1] += parent.b[1];
        let a = matmul(&parent.a, &child.a);
        Self { a, b }
    }

    pub fn offset_point(&self) -> Point {
        Point {
            x: self.b[0].round() as i64,
            y: self.b[1].round() as i64,
        }
    }

    /// Returns `true` if the transformation maps axis-aligned rectangles onto axis-aligned rectangles.
    pub fn is_rectilinear(&self) -> bool {
        (self.a[0][1].abs() < EPSILON && self.a[1][0].abs() < EPSILON)
            || (self.a[0][0].abs() < EPSILON && self.a[1][1].abs() < EPSILON)
    }

    pub fn orientation(&self) -> Orientation {
        let reflect_vert = (self.a[0][0] * self.a[1][1] - self.a[0][1] * self.a[1][0]) < 0.;
        let sin = self.a[1][0];
        let cos = self.a[0][0];
        // Rounded to a nano-degree so that round trips through the matrix compare equal.
        let angle = wrap_angle((sin.atan2(cos).to_degrees() * 1e9).round() / 1e9);
        Orientation {
            reflect_vert,
            angle,
        }
    }
}

impl<T> From<T> for Transformation
where
    T: Into<Orientation>,
{
    fn from(value: T) -> Self {
        Self::builder().orientation(value).build()
    }
}

/// A builder for creating transformations from translations and [`Orientation`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationBuilder {
    x: f64,
    y: f64,
    reflect_vert: bool,
    angle: f64,
}

impl TransformationBuilder {
    /// Specifies the x-y translation encoded by the transformation.
    pub fn point(&mut self, point: impl Into<Point>) -> &mut Self {
        let point = point.into();
        self.x = point.x as f64;
        self.y = point.y as f64;
        self
    }

    /// Specifies the [`Orientation`] applied by this transformation.
    pub fn orientation(&mut self, o: impl Into<Orientation>) -> &mut Self {
        let o = o.into();
        self.reflect_vert = o.reflect_vert;
        self.angle = o.angle;
        self
    }

    /// Specifies the angle of rotation encoded by this transformation.
    pub fn angle(&mut self, angle: f64) -> &mut Self {
        self.angle = angle;
        self
    }

    /// Specifies whether the transformation results in a vertical reflection.
    pub fn reflect_vert(&mut self, reflect_vert: bool) -> &mut Self {
        self.reflect_vert = reflect_vert;
        self
    }

    /// Builds a [`Transformation`] from the specified parameters.
    pub fn build(&mut self) -> Transformation {
        let b = [self.x, self.y];
        let (sin, cos) = exact_sin_cos(self.angle);
        let sin_refl = if self.reflect_vert { sin } else { -sin };
        let cos_refl = if self.reflect_vert { -cos } else { cos };
        let a = [[cos, sin_refl], [sin, cos_refl]];
        Transformation { a, b }
    }
}

/// Sine and cosine of `angle` degrees, exact at multiples of 90 degrees.
fn exact_sin_cos(angle: f64) -> (f64, f64) {
    let wrapped = wrap_angle(angle);
    if wrapped == 0. {
        (0., 1.)
    } else if wrapped == 90. {
        (1., 0.)
    } else if wrapped == 180. {
        (0., -1.)
    } else if wrapped == 270. {
        (-1., 0.)
    } else {
        let rad = wrapped.to_radians();
        (rad.sin(), rad.cos())
    }
}

fn matmul(a: &[[f64; 2]; 2], b: &[[f64; 2]; 2]) -> [[f64; 2]; 2] {
    [
        [
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
        ],
        [
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        ],
    ]
}
fn matvec(a: &[[f64; 2]; 2], b: &[f64; 2]) -> [f64; 2] {
    [
        a[0][0] * b[0] + a[0][1] * b[1],
        a[1][0] * b[0] + a[1][1] * b[1],
    ]
}

/// A trait for specifying how an object is changed by a transformation.
#[enum_dispatch]
pub trait Transform {
    /// Applies matrix-vector [`Transformation`] `trans`.
    ///
    /// Creates a new shape at a location equal to the transformation of our own.
    fn transform(&self, trans: Transformation) -> Self;
}

impl Transform for Point {
    fn transform(&self, trans: Transformation) -> Self {
        let xf = self.x as f64;
        let yf = self.y as f64;
        let x = trans.a[0][0] * xf + trans.a[0][1] * yf + trans.b[0];
        let y = trans.a[1][0] * xf + trans.a[1][1] * yf + trans.b[1];
        Self {
            x: x.round() as i64,
            y: y.round() as i64,
        }
    }
}

/// Transforms the corners of a rectangle.
///
/// Only meaningful for rectilinear transformations; see [`Transformation::is_rectilinear`].
impl Transform for Rect {
    fn transform(&self, trans: Transformation) -> Self {
        let p0p = self.p0.transform(trans);
        let p1p = self.p1.transform(trans);
        Rect::new(p0p, p1p)
    }
}

impl Transform for Polygon {
    fn transform(&self, trans: Transformation) -> Self {
        let mut points: Vec<Point> = self.points.iter().map(|p| p.transform(trans)).collect();
        // Reflections reverse the winding direction.
        if trans.orientation().reflect_vert {
            points.reverse();
        }
        Polygon { points }
    }
}

/// A trait for specifying how a shape is translated by a [`Point`].
#[enum_dispatch]
pub trait Translate {
    /// Translates the shape by a [`Point`] through mutation.
    fn translate(&mut self, p: Point);
}

impl Translate for Point {
    fn translate(&mut self, p: Point) {
        self.x += p.x;
        self.y += p.y;
    }
}

impl Translate for Rect {
    fn translate(&mut self, p: Point) {
        self.p0.translate(p);
        self.p1.translate(p);
    }
}
