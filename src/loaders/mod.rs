pub mod gltf;
pub mod obj;

use std::path::Path;

use crate::error::LoadError;
use crate::types::Mesh;

pub use self::gltf::load_gltf_mesh;
pub use self::obj::load_obj_mesh;

/// Load a mesh, choosing the parser from the file extension
pub fn load_mesh(path: impl AsRef<Path>) -> Result<Mesh, LoadError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let mesh = match extension.as_str() {
        "obj" => load_obj_mesh(path)?,
        "gltf" | "glb" => load_gltf_mesh(path)?,
        _ => {
            return Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            })
        }
    };

    if mesh.is_empty() {
        return Err(LoadError::EmptyMesh(path.to_path_buf()));
    }

    log::info!(
        "Loaded {} triangles, {} materials from {}",
        mesh.triangles().len(),
        mesh.materials().len(),
        path.display()
    );
    Ok(mesh)
}
