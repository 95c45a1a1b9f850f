pub mod camera;
pub mod cli;
pub mod config;
pub mod core;
pub mod encoder;
pub mod error;
pub mod loaders;
pub mod math;
pub mod picker;
pub mod pipeline;
pub mod saturation;
pub mod scene;
pub mod turntable;
pub mod types;
pub mod viewer;

pub use config::Config;
pub use error::{Result, TurntableError};
pub use picker::{PickedParameters, PoseAndLightSource, ScriptedPicker};
pub use pipeline::{run, RunSummary};
