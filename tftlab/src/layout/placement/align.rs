//! Alignment APIs.

use serde::{Deserialize, Serialize};
use tftgeom::bbox::BoundBox;
use tftgeom::transform::Translate;
use tftgeom::{Corner, Point, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlignMode {
    Left,
    Right,
    Bottom,
    Top,
    CenterHorizontal,
    CenterVertical,
    ToTheRight,
    ToTheLeft,
    Beneath,
    Above,
}

/// Alignment of objects by their bounding boxes.
///
/// Objects with an empty bounding box are never moved, and aligning
/// against an empty bounding box is a no-op.
pub trait AlignRect: Translate + BoundBox {
    fn align(&mut self, mode: AlignMode, obox: impl BoundBox, space: i64) -> &mut Self {
        let obox = obox.bbox();
        let sbox = self.bbox();
        if obox.is_empty() || sbox.is_empty() {
            return self;
        }

        match mode {
            AlignMode::Left => {
                self.translate(Point::new(obox.p0.x - sbox.p0.x + space, 0));
            }
            AlignMode::Right => {
                self.translate(Point::new(obox.p1.x - sbox.p1.x + space, 0));
            }
            AlignMode::Bottom => {
                self.translate(Point::new(0, obox.p0.y - sbox.p0.y + space));
            }
            AlignMode::Top => {
                self.translate(Point::new(0, obox.p1.y - sbox.p1.y + space));
            }
            AlignMode::ToTheRight => {
                self.translate(Point::new(obox.p1.x - sbox.p0.x + space, 0));
            }
            AlignMode::ToTheLeft => {
                self.translate(Point::new(obox.p0.x - sbox.p1.x - space, 0));
            }
            AlignMode::CenterHorizontal => {
                self.translate(Point::new(
                    ((obox.p0.x + obox.p1.x) - (sbox.p0.x + sbox.p1.x)) / 2 + space,
                    0,
                ));
            }
            AlignMode::CenterVertical => {
                self.translate(Point::new(
                    0,
                    ((obox.p0.y + obox.p1.y) - (sbox.p0.y + sbox.p1.y)) / 2 + space,
                ));
            }
            AlignMode::Beneath => {
                self.translate(Point::new(0, obox.p0.y - sbox.p1.y - space));
            }
            AlignMode::Above => {
                self.translate(Point::new(0, obox.p1.y - sbox.p0.y + space));
            }
        }

        self
    }

    fn align_left(&mut self, other: impl BoundBox) {
        self.align(AlignMode::Left, other, 0);
    }

    fn align_right(&mut self, other: impl BoundBox) {
        self.align(AlignMode::Right, other, 0);
    }

    fn align_bottom(&mut self, other: impl BoundBox) {
        self.align(AlignMode::Bottom, other, 0);
    }

    fn align_top(&mut self, other: impl BoundBox) {
        self.align(AlignMode::Top, other, 0);
    }

    fn align_to_the_right_of(&mut self, other: impl BoundBox, space: i64) {
        self.align(AlignMode::ToTheRight, other, space);
    }

    fn align_to_the_left_of(&mut self, other: impl BoundBox, space: i64) {
        self.align(AlignMode::ToTheLeft, other, space);
    }

    fn align_centers_horizontally(&mut self, other: impl BoundBox) {
        self.align(AlignMode::CenterHorizontal, other, 0);
    }

    fn align_centers_vertically(&mut self, other: impl BoundBox) {
        self.align(AlignMode::CenterVertical, other, 0);
    }

    fn align_centers(&mut self, other: impl BoundBox) {
        self.align_centers_horizontally(&other);
        self.align_centers_vertically(&other);
    }

    fn align_beneath(&mut self, other: impl BoundBox, space: i64) {
        self.align(AlignMode::Beneath, other, space);
    }

    fn align_above(&mut self, other: impl BoundBox, space: i64) {
        self.align(AlignMode::Above, other, space);
    }

    /// Aligns the given corner of this object's bounding box
    /// to the given target point.
    fn align_corner(&mut self, corner: Corner, target: Point) {
        let Some(rect) = self.bbox().into_rect_opt() else {
            return;
        };
        let ofs = target - rect.corner(corner);
        self.translate(ofs);
    }

    /// Moves the object so that the left edge of its bounding box lies at `x`.
    fn set_xmin(&mut self, x: i64) -> &mut Self {
        let bbox = self.bbox();
        if !bbox.is_empty() {
            self.translate(Point::new(x - bbox.p0.x, 0));
        }
        self
    }

    /// Moves the object so that the right edge of its bounding box lies at `x`.
    fn set_xmax(&mut self, x: i64) -> &mut Self {
        let bbox = self.bbox();
        if !bbox.is_empty() {
            self.translate(Point::new(x - bbox.p1.x, 0));
        }
        self
    }

    /// Moves the object so that the bottom edge of its bounding box lies at `y`.
    fn set_ymin(&mut self, y: i64) -> &mut Self {
        let bbox = self.bbox();
        if !bbox.is_empty() {
            self.translate(Point::new(0, y - bbox.p0.y));
        }
        self
    }

    /// Moves the object so that the top edge of its bounding box lies at `y`.
    fn set_ymax(&mut self, y: i64) -> &mut Self {
        let bbox = self.bbox();
        if !bbox.is_empty() {
            self.translate(Point::new(0, y - bbox.p1.y));
        }
        self
    }

    /// Moves the object so that its bounding box is centered on `center`.
    fn set_center(&mut self, center: Point) -> &mut Self {
        let bbox = self.bbox();
        if !bbox.is_empty() {
            self.translate(center - bbox.center());
        }
        self
    }

    fn set_center_x(&mut self, x: i64) -> &mut Self {
        let bbox = self.bbox();
        if !bbox.is_empty() {
            self.translate(Point::new(x - bbox.center().x, 0));
        }
        self
    }

    fn set_center_y(&mut self, y: i64) -> &mut Self {
        let bbox = self.bbox();
        if !bbox.is_empty() {
            self.translate(Point::new(0, y - bbox.center().y));
        }
        self
    }
}

impl AlignRect for Rect {}
