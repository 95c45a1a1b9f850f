use glam::Mat4;
use image::{ImageFormat, RgbImage};
use log::{debug, info};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::core::OffscreenRenderer;
use crate::error::{OutputError, Result};
use crate::picker::PickedParameters;
use crate::saturation::adjust_saturation;
use crate::scene::{DirectionalLight, NodeId, NodeKind, PerspectiveCamera, Scene};

/// The batch light is always white; only its intensity is picked
pub const RENDER_LIGHT_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// `frame_000.png`, `frame_001.png`, ...
pub fn frame_file_name(index: u32) -> String {
    format!("frame_{:03}.png", index)
}

pub fn frame_path(frames_dir: &Path, index: u32) -> PathBuf {
    frames_dir.join(frame_file_name(index))
}

/// Clockwise step: frame `i` of `n` sits at `-i * 360 / n` degrees
pub fn rotation_angle_degrees(index: u32, num_frames: u32) -> f32 {
    -(index as f32) * (360.0 / num_frames as f32)
}

/// Mesh pose for one frame, a rotation about the vertical axis
pub fn turntable_rotation(index: u32, num_frames: u32) -> Mat4 {
    Mat4::from_rotation_y(rotation_angle_degrees(index, num_frames).to_radians())
}

/// Encode `frame` as PNG and write it in one call so I/O errors surface here
pub fn write_frame(frame: &RgbImage, path: &Path) -> std::result::Result<(), OutputError> {
    let mut png = Vec::new();
    frame
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|source| OutputError::Image {
            path: path.to_path_buf(),
            source,
        })?;
    fs::write(path, png).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Spins the mesh in front of a fixed camera and light, one PNG per step
#[derive(Debug, Clone)]
pub struct TurntableRenderer {
    width: u32,
    height: u32,
    num_frames: u32,
    saturation: f32,
    frames_dir: PathBuf,
}

impl TurntableRenderer {
    pub fn new(width: u32, height: u32, num_frames: u32, saturation: f32, frames_dir: impl Into<PathBuf>) -> Self {
        Self {
            width,
            height,
            num_frames,
            saturation,
            frames_dir: frames_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.width,
            config.height,
            config.num_frames,
            config.saturation,
            config.frames_dir.clone(),
        )
    }

    /// Render every frame into the frames directory, returning the written paths in order.
    ///
    /// Existing frames with the same names are overwritten. The first failure aborts
    /// the remaining frames.
    pub fn render(&self, mut scene: Scene, mesh_node: NodeId, picked: &PickedParameters) -> Result<Vec<PathBuf>> {
        scene.add(NodeKind::Camera(PerspectiveCamera::default()), picked.camera_pose);
        scene.add(
            NodeKind::Light(DirectionalLight::new(RENDER_LIGHT_COLOR, picked.light_intensity)),
            picked.camera_pose,
        );

        let renderer = OffscreenRenderer::new(self.width, self.height)?;
        fs::create_dir_all(&self.frames_dir).map_err(|source| OutputError::Write {
            path: self.frames_dir.clone(),
            source,
        })?;

        let mut written = Vec::with_capacity(self.num_frames as usize);
        for index in 0..self.num_frames {
            scene.set_pose(mesh_node, turntable_rotation(index, self.num_frames))?;

            let color = renderer.render(&scene)?;
            let frame = adjust_saturation(&color, self.saturation);

            let path = frame_path(&self.frames_dir, index);
            write_frame(&frame, &path)?;
            debug!(
                "Frame {} at {:.1} degrees -> {}",
                index,
                rotation_angle_degrees(index, self.num_frames),
                path.display()
            );
            written.push(path);
        }

        info!("Rendered {} frames into {}", written.len(), self.frames_dir.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Mesh, DEFAULT_BASE_COLOR};
    use glam::Vec3;
    use std::sync::Arc;

    #[test]
    fn test_frame_names_are_zero_padded() {
        assert_eq!(frame_file_name(0), "frame_000.png");
        assert_eq!(frame_file_name(7), "frame_007.png");
        assert_eq!(frame_file_name(123), "frame_123.png");
        assert_eq!(frame_file_name(1000), "frame_1000.png");
        assert_eq!(frame_path(Path::new("out"), 3), Path::new("out").join("frame_003.png"));
    }

    #[test]
    fn test_angles_are_evenly_spaced_clockwise() {
        let n = 36;
        assert_eq!(rotation_angle_degrees(0, n), 0.0);
        for i in 1..n {
            let step = rotation_angle_degrees(i, n) - rotation_angle_degrees(i - 1, n);
            assert!((step + 10.0).abs() < 1e-3, "step {} is {}", i, step);
        }
    }

    #[test]
    fn test_single_frame_has_no_rotation() {
        assert_eq!(turntable_rotation(0, 1), Mat4::IDENTITY);
    }

    #[test]
    fn test_rotation_turns_about_vertical_axis() {
        // A quarter turn clockwise seen from above moves +X to +Z
        let r = turntable_rotation(1, 4);
        assert!(r.transform_point3(Vec3::X).abs_diff_eq(Vec3::Z, 1e-6));
        assert!(r.transform_point3(Vec3::Y).abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn test_render_writes_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let frames_dir = dir.path().join("nested").join("frames");

        let mut scene = Scene::new();
        let mesh = scene.add_mesh(Arc::new(Mesh::cube(1.0, DEFAULT_BASE_COLOR)));
        let picked = PickedParameters {
            camera_pose: Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0)),
            light_intensity: 3.0,
        };

        let renderer = TurntableRenderer::new(16, 12, 3, 1.0, &frames_dir);
        let written = renderer.render(scene, mesh, &picked).unwrap();

        assert_eq!(written.len(), 3);
        for (i, path) in written.iter().enumerate() {
            assert_eq!(path, &frame_path(&frames_dir, i as u32));
            let img = image::open(path).unwrap().to_rgb8();
            assert_eq!(img.dimensions(), (16, 12));
        }
    }

    #[test]
    fn test_write_frame_round_trips_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(frame_file_name(0));
        let frame = RgbImage::from_fn(5, 4, |x, y| image::Rgb([x as u8 * 50, y as u8 * 60, 7]));

        write_frame(&frame, &path).unwrap();
        assert_eq!(image::open(&path).unwrap().to_rgb8(), frame);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_frame_reports_full_disk() {
        let frame = RgbImage::from_pixel(64, 64, image::Rgb([200, 10, 10]));
        let err = write_frame(&frame, Path::new("/dev/full")).unwrap_err();
        assert!(matches!(err, OutputError::Write { .. }), "got {err:?}");
    }
}
