//! # Solid Construction Library
//!
//! Extrudes traced silhouettes into layered prismatic solids, assembles
//! them onto a base disc and ring, and writes the result as a mesh.
//!
//! ```rust,no_run
//! use silhouette::{Pipeline, load_rgba};
//! use solid::{MeshFormat, TokenConfig, assemble_token, save_mesh};
//!
//! let canonical = Pipeline::builder().build().normalize(&load_rgba("chef.webp")?)?;
//! let token = assemble_token(&TokenConfig::default(), "Chef", &canonical)?;
//! save_mesh(&token.to_mesh()?, "output/Chef.stl".as_ref(), MeshFormat::Stl)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod solid;
pub mod primitives;
pub mod builder;
pub mod mesh;
pub mod export;
pub mod text;
pub mod token;

pub use error::{Result, SolidError};
pub use solid::{Aabb, Layer, Solid};
pub use primitives::{annulus, circle, disc, ring};
pub use builder::{FRAME_ROTATION_DEG, SlabPlacement, SolidBuilder, Z_EPSILON, build_solid, map_point};
pub use mesh::{Triangle, TriangleMesh, Vertex};
pub use export::{MeshFormat, save_mesh, save_obj, save_stl};
pub use text::{BlockFont, GlyphSource, OutlineFont};
pub use token::{
    LetterPlacement, TokenConfig, assemble_token, assemble_token_from_contours, base_solid,
    output_file_name, rim_layout, rim_text, rim_text_with, validate_name,
};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{GrayImage, Luma};
    use silhouette::CanonicalImage;

    #[test]
    fn test_canonical_square_to_mesh() {
        let mut gray = GrayImage::new(4, 4);
        for y in 1..3 {
            for x in 1..3 {
                gray.put_pixel(x, y, Luma([255]));
            }
        }
        let canonical = CanonicalImage::from_gray(gray).expect("Square image");
        let placement = SlabPlacement { max_physical_size: 8.0, z_offset: 0.0, extrude_height: 1.0 };

        let solid = SolidBuilder::new(placement).build_from_canonical(&canonical).expect("Should build");
        // corners (1,1)..(2,2) at 2 units per pixel
        assert_relative_eq!(solid.volume(), 4.0, epsilon = 1e-9);

        let mesh = solid.to_mesh().expect("Should triangulate");
        assert_relative_eq!(mesh.signed_volume(), solid.volume(), epsilon = 1e-9);
    }

    #[test]
    fn test_blank_canonical_fails_with_no_contours() {
        let canonical = CanonicalImage::from_gray(GrayImage::new(3, 3)).expect("Square image");
        let placement = SlabPlacement { max_physical_size: 8.0, z_offset: 0.0, extrude_height: 1.0 };
        let result = SolidBuilder::new(placement).build_from_canonical(&canonical);
        assert!(matches!(
            result,
            Err(SolidError::Silhouette(silhouette::SilhouetteError::NoContours))
        ));
    }
}
