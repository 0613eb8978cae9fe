pub mod geojson;
pub mod image_files;

pub use self::geojson::ContourSet;
pub use image_files::*;
