mod common;

use glam::Mat4;
use mesh_turntable::error::LoadError;
use mesh_turntable::scene::{build_scene, NodeKind};

#[cfg(test)]
mod scene_tests {
    use super::*;

    #[test]
    fn test_build_scene_holds_one_mesh_at_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = common::write_cube(dir.path());

        let (scene, mesh_node) = build_scene(&path).unwrap();

        assert_eq!(scene.len(), 1);
        assert_eq!(scene.pose(mesh_node), Some(Mat4::IDENTITY));
        assert!(scene.camera_nodes().is_empty());
        assert!(scene.light_nodes().is_empty());
        match &scene.node(mesh_node).unwrap().kind {
            NodeKind::Mesh(mesh) => assert_eq!(mesh.triangles().len(), 12),
            other => panic!("expected mesh node, got {:?}", other),
        }
    }

    #[test]
    fn test_build_scene_twice_is_independent() {
        let dir = tempfile::tempdir().unwrap();
        let path = common::write_cube(dir.path());

        let (mut first, node) = build_scene(&path).unwrap();
        let (second, _) = build_scene(&path).unwrap();
        first.set_pose(node, Mat4::from_rotation_y(1.0)).unwrap();

        assert_eq!(second.pose(node), Some(Mat4::IDENTITY));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = build_scene(dir.path().join("absent.obj"));
        assert!(matches!(missing, Err(LoadError::NotFound(_))));

        let ply = dir.path().join("mesh.ply");
        std::fs::write(&ply, "ply\n").unwrap();
        assert!(matches!(build_scene(&ply), Err(LoadError::UnsupportedFormat { .. })));

        let empty = dir.path().join("empty.obj");
        std::fs::write(&empty, "v 0 0 0\n").unwrap();
        assert!(matches!(build_scene(&empty), Err(LoadError::EmptyMesh(_))));
    }
}
