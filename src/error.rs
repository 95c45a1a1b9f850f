use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, TurntableError>;

/// Malformed command-line configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("malformed matrix literal {literal:?}: {reason}")]
    MalformedMatrix { literal: String, reason: String },

    #[error("malformed color literal {literal:?}: {reason}")]
    MalformedColor { literal: String, reason: String },

    #[error("invalid value for --{flag}: {reason}")]
    InvalidValue { flag: &'static str, reason: String },
}

/// Mesh asset could not be turned into a scene.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("mesh file not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported mesh format {extension:?} for {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("failed to parse OBJ {path}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("failed to parse glTF {path}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("mesh {0} contains no triangles")]
    EmptyMesh(PathBuf),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("scene has no camera to render from")]
    NoCamera,

    #[error("node {0} is not a camera")]
    NotACamera(usize),

    #[error("node {0} does not exist")]
    UnknownNode(usize),

    #[error("node {0} is not a light")]
    NotALight(usize),

    #[error("render target {width}x{height} is empty")]
    EmptyTarget { width: u32, height: u32 },

    #[error("scene geometry has no triangles")]
    EmptyGeometry,
}

#[derive(thiserror::Error, Debug)]
pub enum ViewerError {
    #[error("viewer is not supported on this platform")]
    UnsupportedPlatform,

    #[error("failed to start viewer event loop: {0}")]
    EventLoop(String),

    #[error("viewer thread panicked")]
    ThreadPanicked,

    #[error("render lock poisoned by a panicking viewer thread")]
    LockPoisoned,

    #[error("viewer surface error: {0}")]
    Surface(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Fatal camera-selection failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PickError {
    #[error("no perspective camera node found in the scene")]
    NoCamera,

    #[error("only the seeded camera was found; no viewer camera to choose")]
    NoAdjustedCamera,
}

/// Rejected console entry during light refinement. Recovered by re-prompting.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("{0:?} is not a number")]
    NotANumber(String),

    #[error("light intensity must be a finite value greater than 0, got {0}")]
    NotPositive(f64),
}

/// Frame or animation files could not be written or read back.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    #[error("frame {index} missing at {path}")]
    MissingFrame { index: u32, path: PathBuf },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error for {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum TurntableError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Viewer(#[from] ViewerError),

    #[error(transparent)]
    Pick(#[from] PickError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("console i/o failed: {0}")]
    Console(#[from] std::io::Error),
}
