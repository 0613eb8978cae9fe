//! Letter outlines for the rim text.
//!
//! A [`GlyphSource`] turns a character into a planar region centered on
//! the origin, Y up. [`BlockFont`] is a built-in 5x7 block face;
//! [`OutlineFont`] flattens TrueType/OpenType outlines through `rusttype`.

use std::path::Path;

use geo::{Area, BoundingRect, Translate};
use geo_types::{Coord, LineString, MultiPolygon, Polygon, Rect};
use rusttype::{Font, OutlineBuilder, Scale, point};

use crate::{
    error::{Result, SolidError},
    solid::{difference_footprints, union_footprints},
};

/// Source of letter shapes
pub trait GlyphSource: Send + Sync {
    /// Region covered by `letter` at `size` (the em height), centered on
    /// its bounding box; `None` when the face has no such letter
    fn glyph(&self, letter: char, size: f64) -> Option<MultiPolygon<f64>>;
}

fn centered(region: MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    let center = region.bounding_rect()?.center();
    Some(region.translate(-center.x, -center.y))
}

/// Rows of the 5x7 block face, top row first, most significant of the
/// low five bits leftmost
fn block_rows(letter: char) -> Option<[u8; 7]> {
    let rows = match letter.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
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
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        _ => return None,
    };
    Some(rows)
}

/// Built-in block capitals, digits and hyphen. Lowercase letters are drawn
/// as capitals. The cap height is 7/10 of the size.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockFont;

impl BlockFont {
    pub const COLUMNS: u32 = 5;
    pub const ROWS: u32 = 7;

    /// Side of one block at `size`
    pub fn pixel(size: f64) -> f64 {
        size / 10.0
    }
}

impl GlyphSource for BlockFont {
    fn glyph(&self, letter: char, size: f64) -> Option<MultiPolygon<f64>> {
        let rows = block_rows(letter)?;
        let px = Self::pixel(size);

        let mut region = MultiPolygon(Vec::new());
        for (r, bits) in rows.iter().enumerate() {
            let top = f64::from(Self::ROWS - r as u32) * px;
            let mut column = 0;
            while column < Self::COLUMNS {
                let lit = |c: u32| bits & (1 << (Self::COLUMNS - 1 - c)) != 0;
                if !lit(column) {
                    column += 1;
                    continue;
                }
                let start = column;
                while column < Self::COLUMNS && lit(column) {
                    column += 1;
                }
                let run = Rect::new(
                    Coord { x: f64::from(start) * px, y: top - px },
                    Coord { x: f64::from(column) * px, y: top },
                );
                region = union_footprints(&region, &MultiPolygon(vec![run.to_polygon()]));
            }
        }
        if region.0.is_empty() {
            return None;
        }
        centered(region)
    }
}

/// Segments per flattened Bézier curve
const CURVE_STEPS: u32 = 8;

/// Collects glyph outlines as closed rings, flipping rusttype's Y-down
/// frame to Y up
#[derive(Debug, Default)]
struct OutlineCollector {
    rings: Vec<Vec<Coord<f64>>>,
    current: Vec<Coord<f64>>,
}

impl OutlineCollector {
    fn at(x: f32, y: f32) -> Coord<f64> {
        Coord { x: f64::from(x), y: -f64::from(y) }
    }

    fn pen(&self) -> Coord<f64> {
        self.current.last().copied().unwrap_or_default()
    }

    fn finish_ring(&mut self) {
        let ring = std::mem::take(&mut self.current);
        if ring.len() >= 3 {
            self.rings.push(ring);
        }
    }

    /// Filled region under the non-zero rule: rings winding like the
    /// largest one add area, rings winding the other way cut it out
    fn into_region(mut self) -> MultiPolygon<f64> {
        self.finish_ring();
        let rings: Vec<(f64, Polygon<f64>)> = self
            .rings
            .into_iter()
            .map(|ring| {
                let polygon = Polygon::new(LineString::new(ring), vec![]);
                (polygon.signed_area(), polygon)
            })
            .filter(|(area, _)| *area != 0.0)
            .collect();
        let Some(outer_sign) = rings
            .iter()
            .max_by(|a, b| a.0.abs().total_cmp(&b.0.abs()))
            .map(|(area, _)| area.signum())
        else {
            return MultiPolygon(Vec::new());
        };

        let mut filled = MultiPolygon(Vec::new());
        let mut cut = MultiPolygon(Vec::new());
        for (area, polygon) in rings {
            let target = if area.signum() == outer_sign { &mut filled } else { &mut cut };
            *target = union_footprints(target, &MultiPolygon(vec![polygon]));
        }
        difference_footprints(&filled, &cut)
    }
}

impl OutlineBuilder for OutlineCollector {
    fn move_to(&mut self, x: f32, y: f32) {
        self.finish_ring();
        self.current.push(Self::at(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.current.push(Self::at(x, y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (p0, c, p1) = (self.pen(), Self::at(x1, y1), Self::at(x, y));
        for i in 1..=CURVE_STEPS {
            let t = f64::from(i) / f64::from(CURVE_STEPS);
            let u = 1.0 - t;
            self.current.push(Coord {
                x: u * u * p0.x + 2.0 * u * t * c.x + t * t * p1.x,
                y: u * u * p0.y + 2.0 * u * t * c.y + t * t * p1.y,
            });
        }
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (p0, c1, c2, p1) = (self.pen(), Self::at(x1, y1), Self::at(x2, y2), Self::at(x, y));
        for i in 1..=CURVE_STEPS {
            let t = f64::from(i) / f64::from(CURVE_STEPS);
            let u = 1.0 - t;
            let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            self.current.push(Coord {
                x: a * p0.x + b * c1.x + c * c2.x + d * p1.x,
                y: a * p0.y + b * c1.y + c * c2.y + d * p1.y,
            });
        }
    }

    fn close(&mut self) {
        self.finish_ring();
    }
}

/// TrueType or OpenType face loaded from disk
pub struct OutlineFont {
    font: Font<'static>,
}

impl std::fmt::Debug for OutlineFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineFont").field("glyphs", &self.font.glyph_count()).finish()
    }
}

impl OutlineFont {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let font = Font::try_from_vec(data).ok_or_else(|| {
            SolidError::InvalidParameter("font data is not a TrueType or OpenType face".to_string())
        })?;
        Ok(Self { font })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|source| SolidError::IoRead { path: path.to_path_buf(), source })?;
        Self::from_bytes(data)
    }
}

impl GlyphSource for OutlineFont {
    fn glyph(&self, letter: char, size: f64) -> Option<MultiPolygon<f64>> {
        let glyph = self.font.glyph(letter);
        // id 0 is .notdef
        if glyph.id().0 == 0 {
            return None;
        }
        let positioned = glyph.scaled(Scale::uniform(size as f32)).positioned(point(0.0, 0.0));
        let mut outline = OutlineCollector::default();
        if !positioned.build_outline(&mut outline) {
            return None;
        }
        let region = outline.into_region();
        if region.0.is_empty() {
            return None;
        }
        centered(region)
    }
}
