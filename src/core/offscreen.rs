use glam::{Mat3, Mat4, Vec3};
use image::{Rgb, RgbImage};

use super::bvh::BVHNode;
use super::triangle_intersection::intersect_triangle;
use crate::error::RenderError;
use crate::scene::{DirectionalLight, NodeId, NodeKind, Scene};
use crate::types::Mesh;

/// A mesh at one pose. Rays are moved into mesh space so the mesh's own BVH
/// serves every pose.
struct MeshInstance<'a> {
    mesh: &'a Mesh,
    bvh: &'a BVHNode,
    world_to_mesh: Mat4,
    normal_to_world: Mat3,
}

/// Nearest surface point seen along a ray
struct SurfaceHit {
    t: f32,
    normal: Vec3,
    albedo: Vec3,
}

/// Meshes and lights gathered from a scene, ready for ray casting
struct PreparedScene<'a> {
    instances: Vec<MeshInstance<'a>>,
    lights: Vec<(Vec3, Vec3)>, // (travel direction, color * intensity)
    ambient: Vec3,
}

impl<'a> PreparedScene<'a> {
    fn new(scene: &'a Scene, extra_lights: &[(Mat4, DirectionalLight)]) -> Result<Self, RenderError> {
        let mut instances = Vec::new();
        let mut lights = Vec::new();
        let mut add_light = |light: &DirectionalLight, pose: &Mat4| {
            let radiance = Vec3::from_array(light.color) * light.intensity as f32;
            lights.push((DirectionalLight::direction(pose), radiance));
        };

        for (id, node) in scene.nodes() {
            match &node.kind {
                NodeKind::Mesh(mesh) => {
                    let Some(bvh) = mesh.bvh() else { continue };
                    if node.pose.determinant().abs() <= f32::EPSILON {
                        log::warn!("Mesh node {} has a singular pose and is skipped", id.index());
                        continue;
                    }
                    let world_to_mesh = node.pose.inverse();
                    instances.push(MeshInstance {
                        mesh: mesh.as_ref(),
                        bvh,
                        world_to_mesh,
                        normal_to_world: Mat3::from_mat4(world_to_mesh).transpose(),
                    });
                }
                NodeKind::Light(light) => add_light(light, &node.pose),
                NodeKind::Camera(_) => {}
            }
        }
        for (pose, light) in extra_lights {
            add_light(light, pose);
        }

        if instances.is_empty() {
            return Err(RenderError::EmptyGeometry);
        }
        Ok(Self {
            instances,
            lights,
            ambient: Vec3::from_array(scene.ambient_light()),
        })
    }

    fn nearest_hit(&self, origin: Vec3, dir: Vec3) -> Option<SurfaceHit> {
        let mut nearest: Option<SurfaceHit> = None;
        for instance in &self.instances {
            // The direction is left unnormalized so `t` means the same in both spaces
            let local_origin = instance.world_to_mesh.transform_point3(origin);
            let local_dir = instance.world_to_mesh.transform_vector3(dir);
            let triangles = instance.mesh.triangles();

            let hit = instance.bvh.closest_hit(local_origin, local_dir, |idx| {
                intersect_triangle(local_origin, local_dir, &triangles[idx as usize]).map(|h| (h.t, (idx, h)))
            });
            let Some((t, (idx, hit))) = hit else { continue };
            if nearest.as_ref().is_some_and(|n| n.t <= t) {
                continue;
            }

            let material = instance.mesh.material(triangles[idx as usize].material_id);
            nearest = Some(SurfaceHit {
                t,
                normal: (instance.normal_to_world * hit.facing_normal(local_dir)).normalize(),
                albedo: Vec3::from_array(material.base_color),
            });
        }
        nearest
    }

    fn trace(&self, origin: Vec3, dir: Vec3) -> Vec3 {
        let Some(hit) = self.nearest_hit(origin, dir) else {
            return Vec3::ZERO;
        };

        let direct: Vec3 = self
            .lights
            .iter()
            .map(|(light_dir, radiance)| {
                let n_dot_l = hit.normal.dot(-*light_dir).max(0.0);
                *radiance * n_dot_l * std::f32::consts::FRAC_1_PI
            })
            .sum();

        hit.albedo * (self.ambient + direct)
    }
}

/// CPU ray caster producing 8-bit RGB frames at a fixed resolution
#[derive(Debug, Clone, Copy)]
pub struct OffscreenRenderer {
    width: u32,
    height: u32,
}

impl OffscreenRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyTarget { width, height });
        }
        Ok(Self { width, height })
    }

    /// Render from the scene's main camera
    pub fn render(&self, scene: &Scene) -> Result<RgbImage, RenderError> {
        let camera = scene.main_camera().ok_or(RenderError::NoCamera)?;
        self.render_from(scene, camera)
    }

    /// Render from a specific camera node
    pub fn render_from(&self, scene: &Scene, camera_node: NodeId) -> Result<RgbImage, RenderError> {
        self.render_lit(scene, camera_node, &[])
    }

    /// Render from `camera_node` with `extra_lights` added for this frame only.
    /// Each light is given with its world pose.
    pub fn render_lit(
        &self,
        scene: &Scene,
        camera_node: NodeId,
        extra_lights: &[(Mat4, DirectionalLight)],
    ) -> Result<RgbImage, RenderError> {
        let node = scene
            .node(camera_node)
            .ok_or(RenderError::UnknownNode(camera_node.index()))?;
        let NodeKind::Camera(camera) = node.kind else {
            return Err(RenderError::NotACamera(camera_node.index()));
        };

        let prepared = PreparedScene::new(scene, extra_lights)?;
        let pose: Mat4 = node.pose;
        let origin = pose.w_axis.truncate();

        let aspect = self.width as f32 / self.height as f32;
        let tan_half = (camera.yfov * 0.5).tan();

        let mut image = RgbImage::new(self.width, self.height);
        for (px, py, pixel) in image.enumerate_pixels_mut() {
            let sx = (2.0 * (px as f32 + 0.5) / self.width as f32 - 1.0) * aspect * tan_half;
            let sy = (1.0 - 2.0 * (py as f32 + 0.5) / self.height as f32) * tan_half;
            let dir = pose.transform_vector3(Vec3::new(sx, sy, -1.0)).normalize();

            *pixel = to_rgb8(prepared.trace(origin, dir));
        }

        Ok(image)
    }
}

fn to_rgb8(color: Vec3) -> Rgb<u8> {
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    Rgb([c.x as u8, c.y as u8, c.z as u8])
}
