// cli.rs - Command-line interface configuration
use clap::Parser;
use std::path::PathBuf;

pub const IDENTITY_POSE_LITERAL: &str =
    "[[1.0,0.0,0.0,0.0],[0.0,1.0,0.0,0.0],[0.0,0.0,1.0,0.0],[0.0,0.0,0.0,1.0]]";

#[derive(Parser, Debug, Clone)]
#[command(name = "mesh-turntable")]
#[command(about = "Render a spinning mesh into a looping GIF", long_about = None)]
pub struct Cli {
    /// Source mesh file (.obj, .gltf or .glb)
    #[arg(long = "obj_path")]
    pub obj_path: PathBuf,

    /// Output animated GIF path
    #[arg(long = "gif_path")]
    pub gif_path: PathBuf,

    /// Directory the rendered frames are written to
    #[arg(long = "frames_folder_path")]
    pub frames_folder_path: PathBuf,

    #[arg(long = "image_width", default_value_t = 640)]
    pub image_width: u32,

    #[arg(long = "image_height", default_value_t = 640)]
    pub image_height: u32,

    /// Number of rendered images in the GIF
    #[arg(long = "num_frames", default_value_t = 36)]
    pub num_frames: u32,

    /// Seconds each image is shown in the GIF
    #[arg(long = "image_duration", default_value_t = 0.1, allow_negative_numbers = true)]
    pub image_duration: f64,

    /// Number of loops in the GIF, 0 loops forever
    #[arg(long = "image_loops", default_value_t = 0)]
    pub image_loops: u16,

    /// Seed a camera at --camera_pose before interactive adjustment
    #[arg(
        long = "set_initial_camera_pose",
        default_value_t = false,
        num_args = 0..=1,
        default_missing_value = "true",
        action = clap::ArgAction::Set
    )]
    pub set_initial_camera_pose: bool,

    /// Camera pose (4x4 row-major matrix) for the first image in the GIF
    #[arg(long = "camera_pose", default_value = IDENTITY_POSE_LITERAL)]
    pub camera_pose: String,

    /// Brightness of the light
    #[arg(long = "light_intensity", default_value_t = 3.0, allow_negative_numbers = true)]
    pub light_intensity: f64,

    /// RGB light color in linear space, components in [0, 1]
    #[arg(long = "light_color", default_value = "[1.0,1.0,1.0]")]
    pub light_color: String,

    /// Saturation factor applied to every rendered frame
    #[arg(long = "image_saturation", default_value_t = 1.0, allow_negative_numbers = true)]
    pub image_saturation: f32,
}
