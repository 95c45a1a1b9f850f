use glam::Vec3;
use std::path::Path;

use crate::error::LoadError;
use crate::types::{Material, Mesh, Triangle};

/// Loads a Wavefront OBJ file, using MTL diffuse colors when available
pub fn load_obj_mesh(path: &Path) -> Result<Mesh, LoadError> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| LoadError::Obj {
        path: path.to_path_buf(),
        source,
    })?;

    let mut materials: Vec<Material> = match materials {
        Ok(materials) => materials
            .iter()
            .map(|m| m.diffuse.map(Material::new_color).unwrap_or_default())
            .collect(),
        Err(e) => {
            log::warn!("Ignoring materials for {}: {}", path.display(), e);
            Vec::new()
        }
    };

    // Models without a material share a trailing default entry
    let default_id = materials.len() as u32;
    let mut needs_default = false;
    let mut triangles = Vec::new();

    for model in &models {
        let mesh = &model.mesh;
        let material_id = match mesh.material_id {
            Some(id) if id < materials.len() => id as u32,
            _ => {
                needs_default = true;
                default_id
            }
        };

        let vertex = |i: u32| {
            let i = i as usize * 3;
            Vec3::new(mesh.positions[i], mesh.positions[i + 1], mesh.positions[i + 2])
        };

        log::debug!(
            "  OBJ model {:?}: {} indices",
            model.name,
            mesh.indices.len()
        );

        triangles.extend(
            mesh.indices
                .chunks_exact(3)
                .map(|tri| Triangle::new(vertex(tri[0]), vertex(tri[1]), vertex(tri[2]), material_id))
                .filter(|t| !t.is_degenerate()),
        );
    }

    if needs_default {
        materials.push(Material::default());
    }

    Ok(Mesh::new(triangles, materials))
}
