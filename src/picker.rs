use glam::Mat4;
use log::{debug, info, warn};
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::error::{InputError, PickError, Result};
use crate::scene::{DirectionalLight, NodeId, NodeKind, PerspectiveCamera, Scene};
use crate::viewer::{LiveViewer, ViewerLauncher};

/// Summed entry difference under which a camera counts as still at the seeded pose
pub const POSE_TOLERANCE: f32 = 1e-6;

const POSE_PROMPT: &str = "Adjust the camera in the viewer, then press Enter to get the camera pose...";
const INTENSITY_PROMPT: &str = "Enter new light intensity number (>0) or 'q' to quit: ";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickedParameters {
    pub camera_pose: Mat4,
    pub light_intensity: f64,
}

/// Where the turntable gets its camera pose and light intensity from
pub trait PoseAndLightSource {
    fn pick(&mut self, scene: Scene, config: &Config) -> Result<PickedParameters>;
}

/// Fixed answers, for batch runs and tests
#[derive(Debug, Clone, Copy)]
pub struct ScriptedPicker {
    picked: PickedParameters,
}

impl ScriptedPicker {
    pub fn new(camera_pose: Mat4, light_intensity: f64) -> Self {
        Self {
            picked: PickedParameters {
                camera_pose,
                light_intensity,
            },
        }
    }
}

impl PoseAndLightSource for ScriptedPicker {
    fn pick(&mut self, _scene: Scene, _config: &Config) -> Result<PickedParameters> {
        debug!("Using scripted pose and light intensity {}", self.picked.light_intensity);
        Ok(self.picked)
    }
}

/// Σ | |c_ij| - |p_ij| | over all 16 entries
pub fn pose_difference(candidate: &Mat4, initial: &Mat4) -> f32 {
    candidate
        .to_cols_array()
        .iter()
        .zip(initial.to_cols_array().iter())
        .map(|(c, p)| (c.abs() - p.abs()).abs())
        .sum()
}

/// Choose the camera the operator adjusted.
///
/// With a seeded pose the first camera wins only if it moved away from that
/// pose, otherwise the second camera is taken. This cannot tell an operator
/// who left the viewer at the seeded pose apart from one who never touched it;
/// both resolve to the second camera.
pub fn resolve_camera_pose(scene: &Scene, initial_pose: Option<&Mat4>) -> std::result::Result<Mat4, PickError> {
    let candidates: Vec<Mat4> = scene
        .camera_nodes()
        .into_iter()
        .filter_map(|id| scene.pose(id))
        .collect();
    let first = candidates.first().copied().ok_or(PickError::NoCamera)?;

    match initial_pose {
        None => {
            info!("Camera candidates: {:?}", candidates);
            Ok(first)
        }
        Some(initial) if pose_difference(&first, initial) > POSE_TOLERANCE => Ok(first),
        Some(_) => candidates.get(1).copied().ok_or(PickError::NoAdjustedCamera),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntensityCommand {
    Quit,
    Set(f64),
}

/// Interpret one line of refinement input
pub fn parse_intensity(line: &str) -> std::result::Result<IntensityCommand, InputError> {
    let text = line.trim();
    if text.eq_ignore_ascii_case("q") {
        return Ok(IntensityCommand::Quit);
    }
    let value: f64 = text
        .parse()
        .map_err(|_| InputError::NotANumber(text.to_string()))?;
    if !(value.is_finite() && value > 0.0) {
        return Err(InputError::NotPositive(value));
    }
    Ok(IntensityCommand::Set(value))
}

/// Row-major bracketed literal with 6 decimals, accepted back by `--camera_pose`
pub fn format_matrix(matrix: &Mat4) -> String {
    let rows: Vec<String> = (0..4)
        .map(|i| {
            let row = matrix.row(i);
            format!("[{:.6}, {:.6}, {:.6}, {:.6}]", row.x, row.y, row.z, row.w)
        })
        .collect();
    format!("[{}]", rows.join(",\n "))
}

/// Console-driven picker backed by a live viewer window
pub struct InteractivePicker<L, R, W> {
    launcher: L,
    input: R,
    output: W,
}

impl<L, R, W> InteractivePicker<L, R, W>
where
    L: ViewerLauncher,
    R: BufRead,
    W: Write,
{
    pub fn new(launcher: L, input: R, output: W) -> Self {
        Self {
            launcher,
            input,
            output,
        }
    }

    pub fn into_parts(self) -> (L, R, W) {
        (self.launcher, self.input, self.output)
    }

    fn run_session(&mut self, viewer: &L::Viewer, light_node: NodeId, config: &Config) -> Result<PickedParameters> {
        write!(self.output, "{}", POSE_PROMPT)?;
        self.output.flush()?;
        if self.read_line()?.is_none() {
            debug!("Console closed at pose prompt");
        }

        let camera_pose = {
            let scene = viewer.render_lock()?;
            resolve_camera_pose(&scene, config.initial_camera_pose.as_ref())?
        };
        writeln!(self.output, "Chosen camera pose Matrix:")?;
        writeln!(self.output, "{}", format_matrix(&camera_pose))?;

        let light_intensity = self
            .refine_light(viewer, light_node, &camera_pose)?
            .unwrap_or(config.light_intensity);
        writeln!(self.output, "Chosen light intensity:")?;
        writeln!(self.output, "{}", light_intensity)?;

        Ok(PickedParameters {
            camera_pose,
            light_intensity,
        })
    }

    /// Last intensity the operator applied, `None` if they never entered one
    fn refine_light(&mut self, viewer: &L::Viewer, light_node: NodeId, pose: &Mat4) -> Result<Option<f64>> {
        let mut chosen = None;
        loop {
            write!(self.output, "{}", INTENSITY_PROMPT)?;
            self.output.flush()?;
            let Some(line) = self.read_line()? else {
                debug!("Console closed during light refinement");
                break;
            };

            match parse_intensity(&line) {
                Ok(IntensityCommand::Quit) => break,
                Ok(IntensityCommand::Set(intensity)) => {
                    apply_light(viewer, light_node, pose, intensity)?;
                    debug!("Light intensity set to {}", intensity);
                    chosen = Some(intensity);
                }
                Err(e) => {
                    warn!("Rejected light intensity input: {}", e);
                    writeln!(self.output, "Invalid input ({}). Please enter a valid number or 'q' to quit.", e)?;
                }
            }
        }
        Ok(chosen)
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Update the live light under the render lock. The guard drops on every path.
fn apply_light<V: LiveViewer>(viewer: &V, light_node: NodeId, pose: &Mat4, intensity: f64) -> Result<()> {
    let mut scene = viewer.render_lock()?;
    scene.set_light_intensity(light_node, intensity)?;
    scene.set_pose(light_node, *pose)?;
    Ok(())
}

impl<L, R, W> PoseAndLightSource for InteractivePicker<L, R, W>
where
    L: ViewerLauncher,
    R: BufRead,
    W: Write,
{
    fn pick(&mut self, mut scene: Scene, config: &Config) -> Result<PickedParameters> {
        if let Some(pose) = config.initial_camera_pose {
            scene.add(NodeKind::Camera(PerspectiveCamera::default()), pose);
        }
        let light = DirectionalLight::new(config.light_color, config.light_intensity);
        let light_pose = config.initial_camera_pose.unwrap_or(Mat4::IDENTITY);
        let light_node = scene.add(NodeKind::Light(light), light_pose);

        let shared = Arc::new(Mutex::new(scene));
        let viewer = self
            .launcher
            .launch(Arc::clone(&shared), (config.width, config.height))?;

        let session = self.run_session(&viewer, light_node, config);
        // A viewer that died mid-session explains the session failure better than the session does
        let picked = match (session, viewer.close()) {
            (Ok(picked), Ok(())) => picked,
            (Err(e), Ok(())) => return Err(e),
            (Ok(_), Err(viewer_error)) => return Err(viewer_error.into()),
            (Err(e), Err(viewer_error)) => {
                warn!("Picking failed after the viewer stopped: {}", e);
                return Err(viewer_error.into());
            }
        };

        info!(
            "Picked light intensity {} and camera pose {:?}",
            picked.light_intensity, picked.camera_pose
        );
        Ok(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RenderError, TurntableError, ViewerError};
    use crate::scene::{lock_scene, SharedScene};
    use crate::types::{Mesh, DEFAULT_BASE_COLOR};
    use glam::Vec3;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeViewer {
        scene: SharedScene,
        closed: Arc<AtomicBool>,
        failure: Option<String>,
    }

    impl LiveViewer for FakeViewer {
        fn scene(&self) -> &SharedScene {
            &self.scene
        }

        fn close(self) -> std::result::Result<(), ViewerError> {
            self.closed.store(true, Ordering::SeqCst);
            match self.failure {
                Some(reason) => Err(ViewerError::Surface(reason)),
                None => Ok(()),
            }
        }
    }

    /// Adds a viewer camera at `operator_pose`, or at the seeded pose when the operator never moves
    struct FakeLauncher {
        operator_pose: Option<Mat4>,
        closed: Arc<AtomicBool>,
        scene: Option<SharedScene>,
        viewport: Option<(u32, u32)>,
    }

    impl FakeLauncher {
        fn new(operator_pose: Option<Mat4>) -> Self {
            Self {
                operator_pose,
                closed: Arc::new(AtomicBool::new(false)),
                scene: None,
                viewport: None,
            }
        }
    }

    impl ViewerLauncher for FakeLauncher {
        type Viewer = FakeViewer;

        fn launch(&mut self, scene: SharedScene, viewport: (u32, u32)) -> std::result::Result<FakeViewer, ViewerError> {
            {
                let mut guard = lock_scene(&scene)?;
                let start = guard
                    .main_camera()
                    .and_then(|id| guard.pose(id))
                    .unwrap_or(Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0)));
                guard.add(
                    NodeKind::Camera(PerspectiveCamera::default()),
                    self.operator_pose.unwrap_or(start),
                );
            }
            self.scene = Some(Arc::clone(&scene));
            self.viewport = Some(viewport);
            Ok(FakeViewer {
                scene,
                closed: Arc::clone(&self.closed),
                failure: None,
            })
        }
    }

    fn mesh_scene() -> Scene {
        let mut scene = Scene::new();
        scene.add_mesh(Arc::new(Mesh::cube(1.0, DEFAULT_BASE_COLOR)));
        scene
    }

    fn config() -> Config {
        let mut config = Config::new("cube.obj", "cube.gif", "frames");
        config.width = 32;
        config.height = 24;
        config
    }

    fn seeded_pose() -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 1.0, 5.0))
    }

    fn moved_pose() -> Mat4 {
        Mat4::from_rotation_y(0.4) * Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0))
    }

    fn run(
        launcher: FakeLauncher,
        config: &Config,
        input: &str,
    ) -> (Result<PickedParameters>, FakeLauncher, String) {
        let mut picker = InteractivePicker::new(launcher, input.as_bytes(), Vec::new());
        let result = picker.pick(mesh_scene(), config);
        let (launcher, _, output) = picker.into_parts();
        (result, launcher, String::from_utf8(output).unwrap())
    }

    fn scene_with_cameras(poses: &[Mat4]) -> Scene {
        let mut scene = mesh_scene();
        for pose in poses {
            scene.add(NodeKind::Camera(PerspectiveCamera::default()), *pose);
        }
        scene
    }

    #[test]
    fn test_pose_difference_ignores_sign() {
        let p = seeded_pose();
        assert_eq!(pose_difference(&p, &p), 0.0);
        assert_eq!(pose_difference(&(-p), &p), 0.0);
        assert!(pose_difference(&moved_pose(), &p) > POSE_TOLERANCE);
    }

    #[test]
    fn test_no_initial_pose_takes_first_camera() {
        let scene = scene_with_cameras(&[moved_pose(), seeded_pose()]);
        assert_eq!(resolve_camera_pose(&scene, None), Ok(moved_pose()));
    }

    #[test]
    fn test_unchanged_first_camera_selects_second() {
        let scene = scene_with_cameras(&[seeded_pose(), moved_pose()]);
        assert_eq!(resolve_camera_pose(&scene, Some(&seeded_pose())), Ok(moved_pose()));
    }

    #[test]
    fn test_moved_first_camera_is_selected() {
        let scene = scene_with_cameras(&[moved_pose(), seeded_pose()]);
        assert_eq!(resolve_camera_pose(&scene, Some(&seeded_pose())), Ok(moved_pose()));
    }

    #[test]
    fn test_within_tolerance_counts_as_unchanged() {
        let mut nudged = seeded_pose();
        nudged.w_axis.x += 1e-7;
        let scene = scene_with_cameras(&[nudged, moved_pose()]);
        assert_eq!(resolve_camera_pose(&scene, Some(&seeded_pose())), Ok(moved_pose()));
    }

    #[test]
    fn test_operator_left_seeded_pose_is_ambiguous() {
        // Both cameras sit at the seeded pose, the second one is reported
        let scene = scene_with_cameras(&[seeded_pose(), seeded_pose()]);
        assert_eq!(resolve_camera_pose(&scene, Some(&seeded_pose())), Ok(seeded_pose()));
    }

    #[test]
    fn test_camera_errors() {
        assert_eq!(resolve_camera_pose(&mesh_scene(), None), Err(PickError::NoCamera));
        let only_seeded = scene_with_cameras(&[seeded_pose()]);
        assert_eq!(
            resolve_camera_pose(&only_seeded, Some(&seeded_pose())),
            Err(PickError::NoAdjustedCamera)
        );
    }

    #[test]
    fn test_parse_intensity() {
        assert_eq!(parse_intensity("q\n"), Ok(IntensityCommand::Quit));
        assert_eq!(parse_intensity("  Q  "), Ok(IntensityCommand::Quit));
        assert_eq!(parse_intensity("2.5\n"), Ok(IntensityCommand::Set(2.5)));
        assert_eq!(parse_intensity("1e1"), Ok(IntensityCommand::Set(10.0)));
        assert_eq!(parse_intensity("bright"), Err(InputError::NotANumber("bright".into())));
        assert_eq!(parse_intensity(""), Err(InputError::NotANumber(String::new())));
        assert_eq!(parse_intensity("0"), Err(InputError::NotPositive(0.0)));
        assert_eq!(parse_intensity("-3"), Err(InputError::NotPositive(-3.0)));
        assert!(matches!(parse_intensity("inf"), Err(InputError::NotPositive(_))));
    }

    #[test]
    fn test_format_matrix_round_trips_through_pose_flag() {
        let pose = moved_pose();
        let text = format_matrix(&pose);
        assert!(text.starts_with("[["));
        assert!(text.ends_with("[0.000000, 0.000000, 0.000000, 1.000000]]"));
        let parsed = crate::config::parse_matrix_literal(&text).unwrap();
        assert!(parsed.abs_diff_eq(pose, 1e-5));
    }

    #[test]
    fn test_interactive_pick_with_seeded_pose() {
        let mut config = config();
        config.initial_camera_pose = Some(seeded_pose());

        let (result, launcher, output) = run(FakeLauncher::new(Some(moved_pose())), &config, "\n5\nq\n");
        let picked = result.unwrap();

        assert_eq!(picked.camera_pose, moved_pose());
        assert_eq!(picked.light_intensity, 5.0);
        assert_eq!(launcher.viewport, Some((32, 24)));
        assert!(launcher.closed.load(Ordering::SeqCst));
        assert!(output.contains("Chosen camera pose Matrix:"));
        assert!(output.contains("Chosen light intensity:\n5\n"));
    }

    #[test]
    fn test_seeded_pose_left_unchanged_picks_viewer_camera() {
        let mut config = config();
        config.initial_camera_pose = Some(seeded_pose());

        let (result, _, _) = run(FakeLauncher::new(None), &config, "\nq\n");
        assert_eq!(result.unwrap().camera_pose, seeded_pose());
    }

    #[test]
    fn test_light_updates_live_scene() {
        let (result, launcher, _) = run(FakeLauncher::new(Some(moved_pose())), &config(), "\n2\n7.5\nq\n");
        assert_eq!(result.unwrap().light_intensity, 7.5);

        let shared = launcher.scene.unwrap();
        let scene = lock_scene(&shared).unwrap();
        let light = scene.light_nodes()[0];
        let node = scene.node(light).unwrap();
        match &node.kind {
            NodeKind::Light(l) => assert_eq!(l.intensity, 7.5),
            other => panic!("expected light, got {:?}", other),
        }
        assert_eq!(node.pose, moved_pose());
    }

    #[test]
    fn test_invalid_input_reprompts() {
        let (result, _, output) = run(FakeLauncher::new(Some(moved_pose())), &config(), "\nabc\n-1\n4\nq\n");
        assert_eq!(result.unwrap().light_intensity, 4.0);
        assert_eq!(output.matches("Invalid input").count(), 2);
        assert_eq!(output.matches(INTENSITY_PROMPT).count(), 4);
    }

    #[test]
    fn test_quit_without_value_keeps_default() {
        let (result, _, _) = run(FakeLauncher::new(Some(moved_pose())), &config(), "\nnope\nq\n");
        assert_eq!(result.unwrap().light_intensity, 3.0);
    }

    #[test]
    fn test_eof_ends_refinement() {
        let (result, _, _) = run(FakeLauncher::new(Some(moved_pose())), &config(), "\n6\n");
        assert_eq!(result.unwrap().light_intensity, 6.0);

        let (result, _, _) = run(FakeLauncher::new(Some(moved_pose())), &config(), "");
        assert_eq!(result.unwrap().light_intensity, 3.0);
    }

    #[test]
    fn test_missing_viewer_camera_is_fatal_and_closes_viewer() {
        struct NoCameraLauncher(Arc<AtomicBool>);
        impl ViewerLauncher for NoCameraLauncher {
            type Viewer = FakeViewer;
            fn launch(&mut self, scene: SharedScene, _: (u32, u32)) -> std::result::Result<FakeViewer, ViewerError> {
                Ok(FakeViewer {
                    scene,
                    closed: Arc::clone(&self.0),
                    failure: None,
                })
            }
        }

        let closed = Arc::new(AtomicBool::new(false));
        let mut picker = InteractivePicker::new(NoCameraLauncher(Arc::clone(&closed)), "\n".as_bytes(), Vec::new());
        let err = picker.pick(mesh_scene(), &config()).unwrap_err();

        assert!(matches!(err, TurntableError::Pick(PickError::NoCamera)));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_viewer_failure_outranks_missing_camera() {
        // The window never came up, so no viewer camera was added either
        struct BrokenLauncher(Arc<AtomicBool>);
        impl ViewerLauncher for BrokenLauncher {
            type Viewer = FakeViewer;
            fn launch(&mut self, scene: SharedScene, _: (u32, u32)) -> std::result::Result<FakeViewer, ViewerError> {
                Ok(FakeViewer {
                    scene,
                    closed: Arc::clone(&self.0),
                    failure: Some("no adapter".into()),
                })
            }
        }

        let closed = Arc::new(AtomicBool::new(false));
        let mut picker = InteractivePicker::new(BrokenLauncher(Arc::clone(&closed)), "\n".as_bytes(), Vec::new());
        let err = picker.pick(mesh_scene(), &config()).unwrap_err();

        assert!(
            matches!(err, TurntableError::Viewer(ViewerError::Surface(ref reason)) if reason == "no adapter"),
            "got {err:?}"
        );
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_failed_light_update_releases_render_lock() {
        // The viewer shows a scene where the picker's light node is a camera
        struct MismatchedLauncher {
            shown: Option<SharedScene>,
        }
        impl ViewerLauncher for MismatchedLauncher {
            type Viewer = FakeViewer;
            fn launch(&mut self, _: SharedScene, _: (u32, u32)) -> std::result::Result<FakeViewer, ViewerError> {
                let mut shown = mesh_scene();
                shown.add(NodeKind::Camera(PerspectiveCamera::default()), moved_pose());
                let shown = Arc::new(Mutex::new(shown));
                self.shown = Some(Arc::clone(&shown));
                Ok(FakeViewer {
                    scene: shown,
                    closed: Arc::new(AtomicBool::new(false)),
                    failure: None,
                })
            }
        }

        let mut picker = InteractivePicker::new(MismatchedLauncher { shown: None }, "\n2\nq\n".as_bytes(), Vec::new());
        let err = picker.pick(mesh_scene(), &config()).unwrap_err();
        assert!(
            matches!(err, TurntableError::Render(RenderError::NotALight(1))),
            "got {err:?}"
        );

        let (launcher, _, _) = picker.into_parts();
        let shown = launcher.shown.unwrap();
        assert!(shown.try_lock().is_ok());
    }

    #[test]
    fn test_rejected_input_leaves_live_light_alone() {
        let (result, launcher, _) = run(FakeLauncher::new(Some(moved_pose())), &config(), "\nabc\n-2\n0\nq\n");
        assert_eq!(result.unwrap().light_intensity, 3.0);

        let shared = launcher.scene.unwrap();
        let scene = shared.try_lock().unwrap();
        let light = scene.light_nodes()[0];
        let node = scene.node(light).unwrap();
        match &node.kind {
            NodeKind::Light(l) => assert_eq!(l.intensity, 3.0),
            other => panic!("expected light, got {:?}", other),
        }
        assert_eq!(node.pose, Mat4::IDENTITY);
    }

    #[test]
    fn test_scripted_picker() {
        let mut picker = ScriptedPicker::new(seeded_pose(), 1.5);
        let picked = picker.pick(mesh_scene(), &config()).unwrap();
        assert_eq!(picked.camera_pose, seeded_pose());
        assert_eq!(picked.light_intensity, 1.5);
    }
}
