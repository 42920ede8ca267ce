//! Block-font text drawn as mask geometry.

use tftgeom::transform::Translate;
use tftgeom::{um, Point, Rect};

use crate::deps::arcstr::ArcStr;
use crate::error::{ErrorSource, Result};
use crate::layout::group::Group;
use crate::layout::layers::GdsLayerSpec;
use crate::layout::{Draw, DrawRef};

/// The default text height, in microns.
pub const DEFAULT_SIZE_UM: f64 = 10.;

/// Glyph rows per character.
const ROWS: i64 = 7;
/// Horizontal advance per character, in pixels.
const ADVANCE: i64 = 6;
/// Vertical distance between lines, in pixels.
const LINE_PITCH: i64 = 9;

/// Text drawn with a 5x7 block font.
///
/// Lowercase letters are drawn with their uppercase glyphs. Lines are
/// separated by `\n` and stack downwards; the first line sits on the x-axis
/// with its lower-left corner at `loc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub string: ArcStr,
    /// Height of a capital letter, in database units.
    pub size: i64,
    pub layer: GdsLayerSpec,
    pub loc: Point,
}

impl Text {
    pub fn new(string: impl Into<ArcStr>, layer: GdsLayerSpec) -> Self {
        Self {
            string: string.into(),
            size: um(DEFAULT_SIZE_UM),
            layer,
            loc: Point::zero(),
        }
    }

    pub fn with_size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }

    pub fn with_loc(mut self, loc: impl Into<Point>) -> Self {
        self.loc = loc.into();
        self
    }

    /// The rectangles making up the text.
    pub fn rects(&self) -> Result<Vec<Rect>> {
        let px = (self.size / ROWS).max(1);
        let mut rects = Vec::new();
        for (line_idx, line) in self.string.split('\n').enumerate() {
            let line_y = -(line_idx as i64) * LINE_PITCH * px;
            for (char_idx, c) in line.chars().enumerate() {
                let bitmap = glyph(c)?;
                let char_x = char_idx as i64 * ADVANCE * px;
                for (row, bits) in bitmap.iter().enumerate() {
                    let y0 = line_y + (ROWS - 1 - row as i64) * px;
                    for (start, end) in runs(*bits) {
                        rects.push(Rect::from_sides(
                            char_x + start * px,
                            y0,
                            char_x + end * px,
                            y0 + px,
                        ));
                    }
                }
            }
        }
        for rect in rects.iter_mut() {
            rect.translate(self.loc);
        }
        Ok(rects)
    }
}

impl Draw for Text {
    fn draw(self) -> Result<Group> {
        self.draw_ref()
    }
}

impl DrawRef for Text {
    fn draw_ref(&self) -> Result<Group> {
        let mut group = Group::new();
        for rect in self.rects()? {
            group.add_rect(self.layer, rect);
        }
        Ok(group)
    }
}

/// Formats a number the way it appears in device labels.
///
/// Integral values are printed without a fractional part.
pub fn fmt_num(value: f64) -> String {
    if value.fract() == 0. && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Returns the `[start, end)` column ranges of set pixels in a 5-pixel row.
fn runs(bits: u8) -> Vec<(i64, i64)> {
    let mut out = Vec::new();
    let mut start = None;
    for col in 0..=5 {
        let set = col < 5 && (bits >> (4 - col)) & 1 == 1;
        match (set, start) {
            (true, None) => start = Some(col),
            (false, Some(s)) => {
                out.push((s, col));
                start = None;
            }
            _ => {}
        }
    }
    out
}

fn glyph(c: char) -> Result<[u8; 7]> {
    let bitmap = match c.to_ascii_uppercase() {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '/' => [0b00000, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ',' => [0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b00100, 0b01000],
        '=' => [0b00000, 0b00000, 0b11111, 0b00000, 0b11111, 0b00000, 0b00000],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '_' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b11111],
        ' ' => [0; 7],
        other => {
            return Err(ErrorSource::InvalidArgs(format!(
                "character {other:?} has no glyph in the block font"
            ))
            .into())
        }
    };
    Ok(bitmap)
}

#[cfg(test)]
mod tests {
    use tftgeom::bbox::BoundBox;

    use super::*;

    const L1: GdsLayerSpec = GdsLayerSpec(1, 0);

    #[test]
    fn runs_merge_adjacent_pixels() {
        assert_eq!(runs(0b11111), vec![(0, 5)]);
        assert_eq!(runs(0b10001), vec![(0, 1), (4, 5)]);
        assert_eq!(runs(0b01110), vec![(1, 4)]);
        assert!(runs(0).is_empty());
    }

    #[test]
    fn text_extent_follows_font_metrics() {
        let text = Text::new("W/L", L1).with_size(7_000);
        let group = text.draw_ref().unwrap();
        let bbox = group.bbox();
        // Three characters, each 5 pixels wide on a 6 pixel advance.
        assert_eq!(bbox.width(), (2 * 6 + 5) * 1000);
        assert_eq!(bbox.p0.y, 0);
        assert_eq!(bbox.p1.y, 7_000);
    }

    #[test]
    fn lines_stack_downwards() {
        let text = Text::new("1\n2", L1).with_size(7_000);
        let bbox = text.draw_ref().unwrap().bbox();
        assert_eq!(bbox.p1.y, 7_000);
        assert_eq!(bbox.p0.y, -9_000);
    }

    #[test]
    fn lowercase_uses_uppercase_glyphs() {
        let lower = Text::new("abc", L1).rects().unwrap();
        let upper = Text::new("ABC", L1).rects().unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn unknown_characters_are_rejected() {
        assert!(Text::new("50%", L1).rects().is_err());
    }

    #[test]
    fn formats_integral_numbers_without_fraction() {
        assert_eq!(fmt_num(10.), "10");
        assert_eq!(fmt_num(1.5), "1.5");
        assert_eq!(fmt_num(-3.), "-3");
    }
}
