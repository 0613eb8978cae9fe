use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ALPHA_THRESHOLD: u8 = 10;
pub const DEFAULT_WHITE_THRESHOLD: u8 = 190;

/// Thresholds and padding used to turn a raster image into a canonical silhouette
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct SilhouetteConfig {
    /// Pixels with alpha at or below this value are background
    pub alpha_threshold: u8,
    /// Pixels whose red, green and blue all exceed this value are background
    pub white_threshold: u8,
    /// Background border added around the cropped content before squaring
    pub padding_px: u32,
}

impl Default for SilhouetteConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            white_threshold: DEFAULT_WHITE_THRESHOLD,
            padding_px: 0,
        }
    }
}
