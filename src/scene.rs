use glam::{Mat4, Vec3};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{LoadError, RenderError, ViewerError};
use crate::loaders::load_mesh;
use crate::math::AABB;
use crate::types::Mesh;

/// Vertical field of view used for every perspective camera (60 degrees)
pub const DEFAULT_YFOV: f32 = std::f32::consts::FRAC_PI_3;

/// Scene shared between the main thread and the viewer thread.
/// The mutex is the render lock.
pub type SharedScene = Arc<Mutex<Scene>>;

pub fn lock_scene(scene: &SharedScene) -> Result<MutexGuard<'_, Scene>, ViewerError> {
    scene.lock().map_err(|_| ViewerError::LockPoisoned)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Pinhole camera looking down its local -Z axis, +Y up. The aspect ratio
/// always follows the render target.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PerspectiveCamera {
    pub yfov: f32,
}

impl PerspectiveCamera {
    pub fn new(yfov: f32) -> Self {
        Self { yfov }
    }
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new(DEFAULT_YFOV)
    }
}

/// Light arriving along the local -Z axis of its pose
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f64,
}

impl DirectionalLight {
    pub fn new(color: [f32; 3], intensity: f64) -> Self {
        Self { color, intensity }
    }

    /// Unit direction the light travels in, world space
    pub fn direction(pose: &Mat4) -> Vec3 {
        pose.transform_vector3(Vec3::NEG_Z).normalize_or_zero()
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Mesh(Arc<Mesh>),
    Camera(PerspectiveCamera),
    Light(DirectionalLight),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub pose: Mat4,
}

/// Flat scene graph: every node carries its own world pose
#[derive(Clone, Debug, Default)]
pub struct Scene {
    nodes: Vec<Node>,
    ambient_light: [f32; 3],
    revision: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: NodeKind, pose: Mat4) -> NodeId {
        self.nodes.push(Node { kind, pose });
        self.touch();
        NodeId(self.nodes.len() - 1)
    }

    pub fn add_mesh(&mut self, mesh: Arc<Mesh>) -> NodeId {
        self.add(NodeKind::Mesh(mesh), Mat4::IDENTITY)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn pose(&self, id: NodeId) -> Option<Mat4> {
        self.node(id).map(|n| n.pose)
    }

    pub fn set_pose(&mut self, id: NodeId, pose: Mat4) -> Result<(), RenderError> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or(RenderError::UnknownNode(id.0))?;
        node.pose = pose;
        self.touch();
        Ok(())
    }

    /// Perspective camera nodes in insertion order
    pub fn camera_nodes(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Camera(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// First camera added, the one offscreen rendering uses
    pub fn main_camera(&self) -> Option<NodeId> {
        self.camera_nodes().first().copied()
    }

    pub fn light_nodes(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Light(_)))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn set_light_intensity(&mut self, id: NodeId, intensity: f64) -> Result<(), RenderError> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or(RenderError::UnknownNode(id.0))?;
        match &mut node.kind {
            NodeKind::Light(light) => light.intensity = intensity,
            _ => return Err(RenderError::NotALight(id.0)),
        }
        self.touch();
        Ok(())
    }

    pub fn ambient_light(&self) -> [f32; 3] {
        self.ambient_light
    }

    pub fn set_ambient_light(&mut self, ambient: [f32; 3]) {
        self.ambient_light = ambient;
        self.touch();
    }

    /// World-space bounds of all posed meshes
    pub fn mesh_bounds(&self) -> Option<AABB> {
        self.nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Mesh(mesh) => mesh.bounds().map(|b| b.transformed(&n.pose)),
                _ => None,
            })
            .reduce(|a, b| a.union(&b))
    }

    /// Bumped on every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

/// Load `path` and build a scene holding it as a single mesh node at the identity pose
pub fn build_scene(path: impl AsRef<Path>) -> Result<(Scene, NodeId), LoadError> {
    let mesh = load_mesh(path)?;
    let mut scene = Scene::new();
    let mesh_node = scene.add_mesh(Arc::new(mesh));
    Ok((scene, mesh_node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_BASE_COLOR;

    fn cube_scene() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(Arc::new(Mesh::cube(2.0, DEFAULT_BASE_COLOR)));
        (scene, mesh)
    }

    #[test]
    fn mesh_node_starts_at_identity() {
        let (scene, mesh) = cube_scene();
        assert_eq!(scene.pose(mesh), Some(Mat4::IDENTITY));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn camera_nodes_keep_insertion_order() {
        let (mut scene, _) = cube_scene();
        let first = scene.add(
            NodeKind::Camera(PerspectiveCamera::default()),
            Mat4::from_translation(Vec3::Z),
        );
        scene.add(
            NodeKind::Light(DirectionalLight::new([1.0; 3], 3.0)),
            Mat4::IDENTITY,
        );
        let second = scene.add(NodeKind::Camera(PerspectiveCamera::default()), Mat4::IDENTITY);

        assert_eq!(scene.camera_nodes(), vec![first, second]);
        assert_eq!(scene.main_camera(), Some(first));
        assert_eq!(scene.light_nodes().len(), 1);
    }

    #[test]
    fn mutations_bump_revision() {
        let (mut scene, mesh) = cube_scene();
        let before = scene.revision();
        scene.set_pose(mesh, Mat4::from_rotation_y(0.5)).unwrap();
        assert!(scene.revision() > before);
    }

    #[test]
    fn set_pose_unknown_node_fails() {
        let (mut scene, _) = cube_scene();
        let err = scene.set_pose(NodeId(42), Mat4::IDENTITY).unwrap_err();
        assert_eq!(err, RenderError::UnknownNode(42));
    }

    #[test]
    fn light_intensity_only_applies_to_lights() {
        let (mut scene, mesh) = cube_scene();
        let light = scene.add(
            NodeKind::Light(DirectionalLight::new([1.0; 3], 3.0)),
            Mat4::IDENTITY,
        );

        scene.set_light_intensity(light, 5.5).unwrap();
        match scene.node(light).unwrap().kind {
            NodeKind::Light(l) => assert_eq!(l.intensity, 5.5),
            _ => panic!("expected light"),
        }
        assert_eq!(
            scene.set_light_intensity(mesh, 1.0),
            Err(RenderError::NotALight(mesh.index()))
        );
    }

    #[test]
    fn mesh_bounds_follow_pose() {
        let (mut scene, mesh) = cube_scene();
        scene
            .set_pose(mesh, Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)))
            .unwrap();
        let bounds = scene.mesh_bounds().unwrap();
        assert_eq!(bounds.center(), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn light_direction_is_negative_z_of_pose() {
        let dir = DirectionalLight::direction(&Mat4::IDENTITY);
        assert_eq!(dir, Vec3::NEG_Z);
    }
}
