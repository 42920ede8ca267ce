//! Utilities and types for orienting layout objects.

use serde::{Deserialize, Serialize};

/// A named orientation.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Named {
    /// No rotations or reflections.
    #[default]
    Default,
    /// Reflect vertically (ie. about the x-axis).
    ReflectVert,
    /// Reflect horizontally (ie. about the y-axis).
    ReflectHoriz,
    /// Rotate 90 degrees counter-clockwise.
    R90,
    /// Rotate 180 degrees counter-clockwise.
    R180,
    /// Rotate 270 degrees counter-clockwise.
    R270,
    /// Flip across the line y = x.
    FlipYx,
    /// Flip across the line y = -x.
    FlipMinusYx,
}

/// An orientation of a cell instance.
#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Orientation {
    /// Reflect vertically.
    ///
    /// Applied before rotation.
    pub(crate) reflect_vert: bool,
    /// Counter-clockwise angle in degrees.
    ///
    /// Applied after reflecting vertically.
    pub(crate) angle: f64,
}

impl Named {
    /// Returns a slice of all 8 possible named rectangular orientations.
    pub fn all_rectangular() -> [Self; 8] {
        [
            Self::Default,
            Self::ReflectVert,
            Self::ReflectHoriz,
            Self::R90,
            Self::R180,
            Self::R270,
            Self::FlipYx,
            Self::FlipMinusYx,
        ]
    }
}

impl From<Named> for Orientation {
    fn from(value: Named) -> Self {
        use Named::*;
        let (reflect_vert, angle) = match value {
            Default => (false, 0.),
            R90 => (false, 90.),
            R180 => (false, 180.),
            R270 => (false, 270.),
            ReflectVert => (true, 0.),
            FlipYx => (true, 90.),
            ReflectHoriz => (true, 180.),
            FlipMinusYx => (true, 270.),
        };
        Self {
            reflect_vert,
            angle,
        }
    }
}

impl Orientation {
    /// Returns the identity orientation with `reflect_vert = false` and `angle = 0.`.
    pub fn identity() -> Self {
        Self::default()
    }

    /// A pure counter-clockwise rotation by `angle` degrees.
    pub fn from_angle(angle: f64) -> Self {
        Self {
            reflect_vert: false,
            angle: wrap_angle(angle),
        }
    }

    /// Applies the reflection and rotation specified in
    /// [`Orientation`] `o` to this orientation.
    pub fn apply(&mut self, o: impl Into<Orientation>) {
        let o = o.into();
        match (self.reflect_vert, o.reflect_vert) {
            (false, false) | (true, false) => {
                self.angle += o.angle;
            }
            (false, true) => {
                self.reflect_vert = true;
                self.angle = o.angle - self.angle;
            }
            (true, true) => {
                self.reflect_vert = false;
                self.angle = o.angle - self.angle;
            }
        }
        self.angle = wrap_angle(self.angle);
    }

    /// Rotates the orientation counter-clockwise by `angle` degrees.
    #[inline]
    pub fn rotate(&mut self, angle: f64) {
        self.apply(Self::from_angle(angle));
    }

    /// Reflects the orientation vertically.
    #[inline]
    pub fn reflect_vert(&mut self) {
        self.apply(Named::ReflectVert);
    }

    /// Returns the angle associated with this orientation.
    #[inline]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Returns `true` if this orientation includes a vertical reflection.
    #[inline]
    pub fn is_reflected(&self) -> bool {
        self.reflect_vert
    }

    /// Returns `true` for the identity orientation.
    pub fn is_identity(&self) -> bool {
        !self.reflect_vert && self.angle == 0.
    }
}

/// Wraps the given angle to the interval `[0, 360)` degrees.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = ((angle % 360.) + 360.) % 360.;
    // Avoid returning negative zero.
    wrapped + 0.
}

impl From<Orientation> for Option<gds21::GdsStrans> {
    fn from(value: Orientation) -> Self {
        if value.is_identity() {
            return None;
        }
        Some(gds21::GdsStrans {
            reflected: value.reflect_vert,
            angle: if value.angle == 0. {
                None
            } else {
                Some(value.angle)
            },
            ..Default::default()
        })
    }
}

impl From<&gds21::GdsStrans> for Orientation {
    fn from(value: &gds21::GdsStrans) -> Self {
        Self {
            reflect_vert: value.reflected,
            angle: wrap_angle(value.angle.unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_angle() {
        assert_eq!(wrap_angle(10.), 10.);
        assert_eq!(wrap_angle(-10.), 350.);
        assert_eq!(wrap_angle(-740.), 340.);
        assert_eq!(wrap_angle(725.), 5.);
        assert_eq!(wrap_angle(360.), 0.);
        assert_eq!(wrap_angle(-360.), 0.);
    }

    #[test]
    fn apply_composes_rotations() {
        let mut o = Orientation::from_angle(45.);
        o.rotate(90.);
        assert_eq!(o.angle(), 135.);
        o.reflect_vert();
        assert!(o.is_reflected());
        assert_eq!(o.angle(), 225.);
    }

    #[test]
    fn gds_strans_round_trip() {
        assert_eq!(Option::<gds21::GdsStrans>::from(Orientation::identity()), None);

        let o = Orientation::from(Named::FlipYx);
        let strans = Option::<gds21::GdsStrans>::from(o).unwrap();
        assert!(strans.reflected);
        assert_eq!(strans.angle, Some(90.));
        assert_eq!(Orientation::from(&strans), o);
    }
}
