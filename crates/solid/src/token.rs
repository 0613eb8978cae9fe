use std::path::PathBuf;

use geo::{Rotate, Translate};
use geo_types::Point;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use silhouette::{CanonicalImage, Contour};
use tracing::{debug, info};

use crate::{
    builder::{SlabPlacement, SolidBuilder},
    error::{Result, SolidError},
    export::MeshFormat,
    primitives::{disc, ring},
    solid::Solid,
    text::{BlockFont, GlyphSource, OutlineFont},
};

/// Rim arc reserved for each letter, in degrees
pub const ARC_PER_LETTER_DEG: f64 = 18.0;

/// Longest arc one word may take, in degrees
pub const MAX_WORD_ARC_DEG: f64 = 180.0;

/// Angular distance between neighbouring letters
const LETTER_STEP_DEG: f64 = ARC_PER_LETTER_DEG / 2.0;

/// Shift of every letter from its slot start
const LETTER_OFFSET_DEG: f64 = 2.5;

/// Where the first word is centered; the second goes opposite
const FIRST_WORD_CENTER_DEG: f64 = 90.0;
const SECOND_WORD_CENTER_DEG: f64 = -90.0;

/// Token dimensions in millimetres
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct TokenConfig {
    pub base_diameter: f64,
    pub base_height: f64,
    pub ring_outer_diameter: f64,
    pub ring_inner_diameter: f64,
    pub ring_height: f64,
    /// Thickness of the extruded picture
    pub image_height: f64,
    /// Gap between the picture and the inside of the ring
    pub image_padding: f64,
    pub circle_segments: usize,
    /// Height of the letters standing on the ring
    pub text_height: f64,
    /// Em height of the rim letters
    pub font_size: f64,
    /// TrueType/OpenType face for the rim text; the built-in block face
    /// when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            base_diameter: 40.0,
            base_height: 4.0,
            ring_outer_diameter: 40.0,
            ring_inner_diameter: 30.0,
            ring_height: 2.0,
            image_height: 2.0,
            image_padding: 2.0,
            circle_segments: 128,
            text_height: 3.0,
            font_size: 4.0,
            font: None,
        }
    }
}

impl TokenConfig {
    /// Longest side the picture may take inside the ring
    pub fn max_image_size(&self) -> f64 {
        self.ring_inner_diameter - 2.0 * self.image_padding
    }

    /// Picture sits on top of the base, inside the ring
    pub fn image_placement(&self) -> SlabPlacement {
        SlabPlacement {
            max_physical_size: self.max_image_size(),
            z_offset: self.base_height,
            extrude_height: self.image_height,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("base_diameter", self.base_diameter),
            ("base_height", self.base_height),
            ("ring_height", self.ring_height),
            ("image_height", self.image_height),
            ("text_height", self.text_height),
            ("font_size", self.font_size),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SolidError::InvalidParameter(format!("{field} must be positive, got {value}")));
            }
        }
        if !(self.ring_inner_diameter > 0.0 && self.ring_inner_diameter < self.ring_outer_diameter) {
            return Err(SolidError::InvalidParameter(format!(
                "ring needs 0 < inner diameter < outer diameter, got {} and {}",
                self.ring_inner_diameter, self.ring_outer_diameter
            )));
        }
        if !(self.image_padding >= 0.0 && self.max_image_size() > 0.0) {
            return Err(SolidError::InvalidParameter(format!(
                "image padding {} leaves no room inside the ring",
                self.image_padding
            )));
        }
        if self.circle_segments < 3 {
            return Err(SolidError::InvalidParameter(format!(
                "circle_segments must be at least 3, got {}",
                self.circle_segments
            )));
        }
        Ok(())
    }

    /// Distance from the center to the middle of the ring
    pub fn rim_radius(&self) -> f64 {
        (self.ring_outer_diameter + self.ring_inner_diameter) / 4.0
    }

    /// Letters stand on top of the ring
    pub fn text_base(&self) -> f64 {
        self.base_height + self.ring_height
    }

    /// Face the rim text is drawn with
    pub fn glyph_source(&self) -> Result<Box<dyn GlyphSource>> {
        Ok(match &self.font {
            Some(path) => Box::new(OutlineFont::from_file(path)?),
            None => Box::new(BlockFont),
        })
    }
}

/// One rim letter: its angular position and how far it is turned from
/// upright
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterPlacement {
    pub letter: char,
    /// Polar angle of the letter center, degrees counter-clockwise from +X
    pub angle: f64,
    /// Rotation of the letter about its own center, degrees
    pub tilt: f64,
}

fn place_word(letters: impl Iterator<Item = char>, count: usize, center: f64) -> Vec<LetterPlacement> {
    let start = center - count as f64 * ARC_PER_LETTER_DEG / 4.0;
    letters
        .enumerate()
        .map(|(i, letter)| {
            let angle = start + i as f64 * LETTER_STEP_DEG + LETTER_OFFSET_DEG;
            LetterPlacement { letter, angle, tilt: angle - center }
        })
        .collect()
}

/// Letter positions for a one- or two-word name. The first word is
/// centered on the top of the rim and the second on the bottom, both
/// reading left to right from outside the token.
pub fn rim_layout(name: &str) -> Result<Vec<LetterPlacement>> {
    let words = validate_name(name)?;
    let mut placements = Vec::new();
    for (index, word) in words.iter().enumerate() {
        let count = word.chars().count();
        if count as f64 * ARC_PER_LETTER_DEG > MAX_WORD_ARC_DEG {
            return Err(SolidError::InvalidName {
                name: name.to_string(),
                reason: format!("'{word}' is too long for the rim ({count} letters)"),
            });
        }
        // counter-clockwise runs right to left along the top
        if index == 0 {
            placements.extend(place_word(word.chars().rev(), count, FIRST_WORD_CENTER_DEG));
        } else {
            placements.extend(place_word(word.chars(), count, SECOND_WORD_CENTER_DEG));
        }
    }
    Ok(placements)
}

/// Raised letters of `name` around the rim, drawn with `glyphs`
pub fn rim_text_with(config: &TokenConfig, name: &str, glyphs: &dyn GlyphSource) -> Result<Solid> {
    config.validate()?;
    let radius = config.rim_radius();
    let origin = Point::new(0.0, 0.0);

    let mut letters = Vec::new();
    for placement in rim_layout(name)? {
        let outline = glyphs.glyph(placement.letter, config.font_size).ok_or_else(|| {
            SolidError::InvalidName {
                name: name.to_string(),
                reason: format!("the font has no glyph for '{}'", placement.letter),
            }
        })?;
        let theta = placement.angle.to_radians();
        let footprint = outline
            .rotate_around_point(placement.tilt, origin)
            .translate(radius * theta.cos(), radius * theta.sin());
        letters.push(Solid::slab(footprint, config.text_base(), config.text_height)?);
    }

    let text = Solid::union_all(letters).ok_or_else(|| SolidError::InvalidName {
        name: name.to_string(),
        reason: "name is empty".to_string(),
    })?;
    debug!(name, volume = text.volume(), "laid out rim text");
    Ok(text)
}

/// Raised letters of `name` around the rim, drawn with the configured face
pub fn rim_text(config: &TokenConfig, name: &str) -> Result<Solid> {
    let glyphs = config.glyph_source()?;
    rim_text_with(config, name, glyphs.as_ref())
}

/// Split a token name into its words; one or two words are accepted
pub fn validate_name(name: &str) -> Result<Vec<&str>> {
    let words: Vec<&str> = name.split_whitespace().collect();
    let reason = match words.len() {
        0 => "name is empty",
        1 | 2 => return Ok(words),
        _ => "name has more than two words",
    };
    Err(SolidError::InvalidName { name: name.to_string(), reason: reason.to_string() })
}

/// File name for an exported token, e.g. `Fortune Teller` -> `Fortune_Teller.stl`
pub fn output_file_name(name: &str, format: MeshFormat) -> String {
    format!("{}.{}", name.trim().replace(char::is_whitespace, "_"), format.extension())
}

/// Base disc with the raised ring on top
pub fn base_solid(config: &TokenConfig) -> Result<Solid> {
    config.validate()?;
    let base = disc(config.base_diameter / 2.0, 0.0, config.base_height, config.circle_segments)?;
    let rim = ring(
        config.ring_outer_diameter / 2.0,
        config.ring_inner_diameter / 2.0,
        config.base_height,
        config.ring_height,
        config.circle_segments,
    )?;
    Ok(base.union(&rim))
}

/// Complete token from traced picture contours: base, ring, picture and
/// rim text
pub fn assemble_token_from_contours<I>(
    config: &TokenConfig,
    name: &str,
    contours: I,
    width: u32,
    height: u32,
) -> Result<Solid>
where
    I: IntoIterator<Item = Contour>,
{
    let text = rim_text(config, name)?;
    let base = base_solid(config)?;
    let picture = SolidBuilder::new(config.image_placement()).build(contours, width, height)?;
    debug!(picture_volume = picture.volume(), "extruded picture");
    finish(name, base, picture, text)
}

/// Complete token from a canonical picture
pub fn assemble_token(config: &TokenConfig, name: &str, canonical: &CanonicalImage) -> Result<Solid> {
    let text = rim_text(config, name)?;
    let base = base_solid(config)?;
    let picture = SolidBuilder::new(config.image_placement()).build_from_canonical(canonical)?;
    finish(name, base, picture, text)
}

fn finish(name: &str, base: Solid, picture: Solid, text: Solid) -> Result<Solid> {
    let token = base.union(&picture).union(&text);
    info!(name, layers = token.layers().len(), volume = token.volume(), "assembled token");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_dimensions() {
        let config = TokenConfig::default();
        assert_eq!(config.max_image_size(), 26.0);
        let placement = config.image_placement();
        assert_eq!(placement.z_offset, 4.0);
        assert_eq!(placement.extrude_height, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("Chef").expect("One word"), vec!["Chef"]);
        assert_eq!(validate_name("Fortune Teller").expect("Two words"), vec!["Fortune", "Teller"]);
        assert!(matches!(validate_name("Very Long Name"), Err(SolidError::InvalidName { .. })));
        assert!(matches!(validate_name("   "), Err(SolidError::InvalidName { .. })));
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("Fortune Teller", MeshFormat::Stl), "Fortune_Teller.stl");
        assert_eq!(output_file_name("Imp", MeshFormat::Obj), "Imp.obj");
    }

    #[test]
    fn test_invalid_config() {
        let config = TokenConfig { ring_inner_diameter: 45.0, ..TokenConfig::default() };
        assert!(matches!(config.validate(), Err(SolidError::InvalidParameter(_))));

        let config = TokenConfig { image_padding: 20.0, ..TokenConfig::default() };
        assert!(matches!(base_solid(&config), Err(SolidError::InvalidParameter(_))));
    }

    #[test]
    fn test_base_solid_spans_base_and_ring() {
        let config = TokenConfig::default();
        let base = base_solid(&config).expect("Valid base");
        let bounds = base.bounds().expect("Non-empty");
        assert_eq!(bounds.min[2], 0.0);
        assert_eq!(bounds.max[2], 6.0);
        let expected = disc(20.0, 0.0, 4.0, 128).expect("Disc").volume()
            + ring(20.0, 15.0, 4.0, 2.0, 128).expect("Ring").volume();
        assert_relative_eq!(base.volume(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_picture_inside_ring_adds_its_volume() {
        let config = TokenConfig::default();
        // 2x2 square in the middle of a 10x10 image: 2 * 2.6 mm per side
        let contour = Contour::new(vec![[4, 4], [6, 4], [6, 6], [4, 6]]);
        let token = assemble_token_from_contours(&config, "Imp", vec![contour], 10, 10).expect("Should assemble");

        let base = base_solid(&config).expect("Valid base");
        let text = rim_text(&config, "Imp").expect("Valid text");
        let picture = 5.2 * 5.2 * 2.0;
        assert_relative_eq!(token.volume(), base.volume() + picture + text.volume(), epsilon = 1e-6);
        assert_relative_eq!(token.bounds().expect("Non-empty").max[2], 9.0);
    }

    #[test]
    fn test_two_letter_word_is_centered_on_top() {
        let layout = rim_layout("AB").expect("Fits");
        // reversed so the word reads left to right
        assert_eq!(layout.iter().map(|p| p.letter).collect::<String>(), "BA");
        assert_relative_eq!(layout[0].angle, 83.5);
        assert_relative_eq!(layout[1].angle, 92.5);
        assert_relative_eq!(layout[0].tilt, -6.5);
        assert_relative_eq!(layout[1].tilt, 2.5);
    }

    #[test]
    fn test_second_word_goes_on_the_bottom() {
        let layout = rim_layout("Ab Cd").expect("Fits");
        assert_eq!(layout.iter().map(|p| p.letter).collect::<String>(), "bACd");
        assert_relative_eq!(layout[2].angle, -96.5);
        assert_relative_eq!(layout[3].angle, -87.5);
        assert_relative_eq!(layout[3].tilt, 2.5);
    }

    #[test]
    fn test_word_length_limit() {
        assert_eq!(rim_layout("Abcdefghij").expect("Ten letters fit").len(), 10);
        assert!(matches!(rim_layout("Abcdefghijk"), Err(SolidError::InvalidName { .. })));
        assert!(matches!(rim_layout("Imp Abcdefghijk"), Err(SolidError::InvalidName { .. })));
    }

    #[test]
    fn test_rim_letters_stand_on_the_ring() {
        let config = TokenConfig::default();
        let text = rim_text_with(&config, "O", &BlockFont).expect("Valid text");

        let px = BlockFont::pixel(config.font_size);
        assert_relative_eq!(text.volume(), 16.0 * px * px * 3.0, epsilon = 1e-9);

        // a lone letter sits at 90 - 4.5 + 2.5 degrees; O is symmetric, so its
        // box is centered on that rim point
        let bounds = text.bounds().expect("Non-empty");
        let center = bounds.center();
        let theta = 88.0_f64.to_radians();
        assert_relative_eq!(center[0], 17.5 * theta.cos(), epsilon = 1e-9);
        assert_relative_eq!(center[1], 17.5 * theta.sin(), epsilon = 1e-9);
        assert_eq!(bounds.min[2], 6.0);
        assert_eq!(bounds.max[2], 9.0);
    }

    #[test]
    fn test_missing_glyph_is_rejected() {
        let result = rim_text_with(&TokenConfig::default(), "Imp&Co", &BlockFont);
        assert!(matches!(result, Err(SolidError::InvalidName { .. })));
    }

    #[test]
    fn test_missing_font_file_is_reported() {
        let config = TokenConfig { font: Some(PathBuf::from("/nonexistent/face.ttf")), ..TokenConfig::default() };
        assert!(matches!(rim_text(&config, "Imp"), Err(SolidError::IoRead { .. })));
    }

    #[test]
    fn test_config_from_toml_with_defaults() {
        let config: TokenConfig = toml::from_str("base_height = 5.0\ncircle_segments = 64").expect("Valid TOML");
        assert_eq!(config.base_height, 5.0);
        assert_eq!(config.circle_segments, 64);
        assert_eq!(config.ring_inner_diameter, 30.0);

        let config: TokenConfig = serde_json::from_str(r#"{"image_padding": 1.0}"#).expect("Valid JSON");
        assert_eq!(config.max_image_size(), 28.0);
        assert_eq!(config.text_height, 3.0);
        assert_eq!(config.font, None);

        let config: TokenConfig = toml::from_str("font = \"fonts/Chewy.ttf\"").expect("Valid TOML");
        assert_eq!(config.font, Some(PathBuf::from("fonts/Chewy.ttf")));
    }
}
