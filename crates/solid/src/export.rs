use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::info;

use crate::{
    error::{Result, SolidError},
    mesh::{TriangleMesh, triangle_normal},
};

/// Supported mesh file formats
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MeshFormat {
    /// Binary STL
    #[default]
    Stl,
    /// Wavefront OBJ
    Obj,
}

impl MeshFormat {
    pub fn extension(&self) -> &'static str {
        self.into()
    }

    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SolidError + '_ {
    move |source| SolidError::IoWrite { path: path.to_path_buf(), source }
}

fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error(path))?;
    }
    let file = File::create(path).map_err(io_error(path))?;
    Ok(BufWriter::new(file))
}

/// Save mesh to STL file (binary format)
pub fn save_stl(mesh: &TriangleMesh, path: &Path) -> Result<()> {
    let mut writer = create_writer(path)?;

    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles
        .iter()
        .map(|t| {
            let n = triangle_normal(t);
            stl_io::Triangle {
                normal: stl_io::Normal::new([n[0] as f32, n[1] as f32, n[2] as f32]),
                vertices: [
                    stl_io::Vertex::new([t[0][0] as f32, t[0][1] as f32, t[0][2] as f32]),
                    stl_io::Vertex::new([t[1][0] as f32, t[1][1] as f32, t[1][2] as f32]),
                    stl_io::Vertex::new([t[2][0] as f32, t[2][1] as f32, t[2][2] as f32]),
                ],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter()).map_err(io_error(path))?;
    writer.flush().map_err(io_error(path))?;
    Ok(())
}

/// Save mesh to OBJ file, one vertex per triangle corner
pub fn save_obj(mesh: &TriangleMesh, path: &Path) -> Result<()> {
    let mut writer = create_writer(path)?;

    let mut write_all = || -> std::io::Result<()> {
        writeln!(writer, "# Triangles: {}", mesh.len())?;
        for t in &mesh.triangles {
            for v in t {
                writeln!(writer, "v {:.6} {:.6} {:.6}", v[0], v[1], v[2])?;
            }
        }
        for i in 0..mesh.len() {
            let base = 3 * i + 1;
            writeln!(writer, "f {} {} {}", base, base + 1, base + 2)?;
        }
        writer.flush()
    };
    write_all().map_err(io_error(path))
}

/// Save mesh in the given format
pub fn save_mesh(mesh: &TriangleMesh, path: &Path, format: MeshFormat) -> Result<()> {
    match format {
        MeshFormat::Stl => save_stl(mesh, path)?,
        MeshFormat::Obj => save_obj(mesh, path)?,
    }
    info!("Saved {} triangles to {}", mesh.len(), path.display());
    Ok(())
}
