use glam::{Mat4, Vec3};
use std::path::Path;

use crate::error::LoadError;
use crate::types::{Material, Mesh, Triangle};

/// Loads every mesh primitive reachable from the glTF scenes, flattened with node transforms
pub fn load_gltf_mesh(path: &Path) -> Result<Mesh, LoadError> {
    let (document, buffers, _images) = gltf::import(path).map_err(|source| LoadError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;

    log::debug!(
        "glTF {}: {} scenes, {} nodes, {} meshes, {} materials",
        path.display(),
        document.scenes().count(),
        document.nodes().count(),
        document.meshes().count(),
        document.materials().count()
    );

    let mut materials: Vec<Material> = document
        .materials()
        .map(|material| {
            let [r, g, b, _] = material.pbr_metallic_roughness().base_color_factor();
            Material::new_color([r, g, b])
        })
        .collect();

    // Primitives without a material use glTF's default, appended last
    let default_id = materials.len() as u32;
    materials.push(Material::default());

    let mut triangles = Vec::new();
    for scene in document.scenes() {
        for node in scene.nodes() {
            process_node(&node, &buffers, &Mat4::IDENTITY, default_id, &mut triangles);
        }
    }

    Ok(Mesh::new(triangles, materials))
}

fn process_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
    parent_transform: &Mat4,
    default_material: u32,
    triangles: &mut Vec<Triangle>,
) {
    let local_transform = Mat4::from_cols_array_2d(&node.transform().matrix());
    let global_transform = *parent_transform * local_transform;

    if let Some(mesh) = node.mesh() {
        process_mesh(&mesh, buffers, &global_transform, default_material, triangles);
    }

    for child in node.children() {
        process_node(&child, buffers, &global_transform, default_material, triangles);
    }
}

fn process_mesh(
    mesh: &gltf::Mesh,
    buffers: &[gltf::buffer::Data],
    transform: &Mat4,
    default_material: u32,
    triangles: &mut Vec<Triangle>,
) {
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Skipping {:?} primitive in mesh {:?}",
                primitive.mode(),
                mesh.name()
            );
            continue;
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
        let Some(positions) = reader.read_positions() else {
            log::warn!("Mesh {:?} primitive has no positions", mesh.name());
            continue;
        };

        let vertices: Vec<Vec3> = positions
            .map(|p| transform.transform_point3(Vec3::from_array(p)))
            .collect();

        let material_id = primitive
            .material()
            .index()
            .map(|i| i as u32)
            .unwrap_or(default_material);

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertices.len() as u32).collect(),
        };

        triangles.extend(
            indices
                .chunks_exact(3)
                .filter(|tri| tri.iter().all(|&i| (i as usize) < vertices.len()))
                .map(|tri| {
                    Triangle::new(
                        vertices[tri[0] as usize],
                        vertices[tri[1] as usize],
                        vertices[tri[2] as usize],
                        material_id,
                    )
                })
                .filter(|t| !t.is_degenerate()),
        );
    }
}
