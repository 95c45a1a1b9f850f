use glam::Mat4;
use log::info;
use std::fmt;
use std::path::PathBuf;

use crate::config::Config;
use crate::encoder::AnimationEncoder;
use crate::error::Result;
use crate::picker::PoseAndLightSource;
use crate::scene::build_scene;
use crate::turntable::TurntableRenderer;

/// Whole-run progress. Stages only move forward and any failure ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    InteractiveSceneBuilt,
    PoseAndLightResolved,
    RenderSceneBuilt,
    Rendering,
    Encoding,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::InteractiveSceneBuilt => "scene built (interactive)",
            Stage::PoseAndLightResolved => "pose and light resolved",
            Stage::RenderSceneBuilt => "scene built (render)",
            Stage::Rendering => "rendering",
            Stage::Encoding => "encoding",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub camera_pose: Mat4,
    pub light_intensity: f64,
    pub frames: Vec<PathBuf>,
    pub gif_path: PathBuf,
}

fn enter(stage: Stage) {
    info!("Stage: {}", stage);
}

/// Load, pick, render the turntable and encode the GIF
pub fn run(config: &Config, source: &mut dyn PoseAndLightSource) -> Result<RunSummary> {
    enter(Stage::Init);

    // Each phase gets its own scene from the same mesh
    let (interactive_scene, _) = build_scene(&config.mesh_path)?;
    enter(Stage::InteractiveSceneBuilt);

    let picked = source.pick(interactive_scene, config)?;
    enter(Stage::PoseAndLightResolved);

    let (render_scene, mesh_node) = build_scene(&config.mesh_path)?;
    enter(Stage::RenderSceneBuilt);

    enter(Stage::Rendering);
    let frames = TurntableRenderer::from_config(config).render(render_scene, mesh_node, &picked)?;

    enter(Stage::Encoding);
    AnimationEncoder::from_config(config).encode_directory(&config.frames_dir, config.num_frames, &config.gif_path)?;

    enter(Stage::Done);
    Ok(RunSummary {
        camera_pose: picked.camera_pose,
        light_intensity: picked.light_intensity,
        frames,
        gif_path: config.gif_path.clone(),
    })
}
