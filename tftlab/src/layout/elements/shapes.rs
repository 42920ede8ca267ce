//! Parametrized shapes used by test structures.

use serde::{Deserialize, Serialize};
use tftgeom::{Dims, Point, Polygon, Rect};

use crate::error::Result;
use crate::layout::group::Group;
use crate::layout::layers::GdsLayerSpec;
use crate::layout::{Draw, DrawRef};

/// The number of vertices used to approximate circles.
pub const CIRCLE_POINTS: usize = 144;

/// Which way a [`Flagpole`] points.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FlagShape {
    /// Flag up and to the right of the pole.
    #[default]
    P,
    /// Flag down and to the left of the pole.
    D,
}

/// A rectangular flag with a narrower stub hanging off one corner.
///
/// With [`FlagShape::P`] the flag spans `(0, 0)` to `size` and the stub
/// hangs below its lower-left corner; [`FlagShape::D`] mirrors both axes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Flagpole {
    pub size: Dims,
    pub stub_size: Dims,
    pub shape: FlagShape,
    pub layer: GdsLayerSpec,
}

impl Flagpole {
    pub fn polygon(&self) -> Polygon {
        let sign = match self.shape {
            FlagShape::P => 1,
            FlagShape::D => -1,
        };
        let (fw, fh) = (sign * self.size.w(), sign * self.size.h());
        let (pw, ph) = (sign * self.stub_size.w(), sign * self.stub_size.h());
        Polygon::new(vec![
            Point::new(0, 0),
            Point::new(0, fh),
            Point::new(fw, fh),
            Point::new(fw, 0),
            Point::new(pw, 0),
            Point::new(pw, -ph),
            Point::new(0, -ph),
        ])
    }
}

impl Draw for Flagpole {
    fn draw(self) -> Result<Group> {
        self.draw_ref()
    }
}

impl DrawRef for Flagpole {
    fn draw_ref(&self) -> Result<Group> {
        let mut group = Group::new();
        group.add_shape(self.layer, self.polygon());
        Ok(group)
    }
}

/// A plus-shaped cross centered at the origin.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Cross {
    /// Tip-to-tip length of each arm pair.
    pub length: i64,
    /// Width of each arm.
    pub width: i64,
    pub layer: GdsLayerSpec,
}

impl Cross {
    pub fn polygon(&self) -> Polygon {
        let l = self.length / 2;
        let w = self.width / 2;
        Polygon::new(vec![
            Point::new(w, -l),
            Point::new(w, -w),
            Point::new(l, -w),
            Point::new(l, w),
            Point::new(w, w),
            Point::new(w, l),
            Point::new(-w, l),
            Point::new(-w, w),
            Point::new(-l, w),
            Point::new(-l, -w),
            Point::new(-w, -w),
            Point::new(-w, -l),
        ])
    }
}

impl Draw for Cross {
    fn draw(self) -> Result<Group> {
        self.draw_ref()
    }
}

impl DrawRef for Cross {
    fn draw_ref(&self) -> Result<Group> {
        let mut group = Group::new();
        group.add_shape(self.layer, self.polygon());
        Ok(group)
    }
}

/// A circle centered at the origin.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Circle {
    pub radius: i64,
    pub layer: GdsLayerSpec,
}

impl Circle {
    pub fn polygon(&self) -> Polygon {
        Polygon::circle(Point::zero(), self.radius, CIRCLE_POINTS)
    }
}

impl Draw for Circle {
    fn draw(self) -> Result<Group> {
        self.draw_ref()
    }
}

impl DrawRef for Circle {
    fn draw_ref(&self) -> Result<Group> {
        let mut group = Group::new();
        group.add_shape(self.layer, self.polygon());
        Ok(group)
    }
}

/// A rectangle of the given dimensions centered at the origin.
pub fn compass(dims: Dims) -> Rect {
    Rect::centered(Point::zero(), dims)
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use tftgeom::bbox::BoundBox;
    use tftgeom::ShapeTrait;

    use super::*;

    const L1: GdsLayerSpec = GdsLayerSpec(1, 0);

    #[test]
    fn flagpole_area_is_flag_plus_stub() {
        let flag = Flagpole {
            size: Dims::new(30, 20),
            stub_size: Dims::new(10, 40),
            shape: FlagShape::P,
            layer: L1,
        };
        let poly = flag.polygon();
        assert_float_eq!(poly.area(), (30. * 20.) + (10. * 40.), abs <= 1e-9);
        assert!(poly.contains(Point::new(5, -30)));
        assert!(!poly.contains(Point::new(20, -30)));
    }

    #[test]
    fn d_flagpole_mirrors_both_axes() {
        let mut flag = Flagpole {
            size: Dims::new(30, 20),
            stub_size: Dims::new(10, 40),
            shape: FlagShape::P,
            layer: L1,
        };
        let p = flag.polygon().bbox();
        flag.shape = FlagShape::D;
        let d = flag.polygon().bbox();
        assert_eq!(d.p0, -p.p1);
        assert_eq!(d.p1, -p.p0);
    }

    #[test]
    fn cross_has_twelve_vertices() {
        let cross = Cross {
            length: 100,
            width: 10,
            layer: L1,
        };
        let poly = cross.polygon();
        assert_eq!(poly.points.len(), 12);
        assert_float_eq!(poly.area(), 2. * 100. * 10. - 100., abs <= 1e-9);
        assert_eq!(poly.bbox().width(), 100);
    }

    #[test]
    fn compass_is_centered() {
        let r = compass(Dims::new(40, 20));
        assert_eq!(r.center(), Point::zero());
        assert_eq!(r.width(), 40);
    }
}
