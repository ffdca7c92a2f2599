//! Error types for the viewer
//!
//! One enum per failure domain. Anything the user should see is turned into
//! an alert through its `Display` text, so messages are written for humans.

use std::path::PathBuf;

/// A raw mesh buffer broke one of its structural invariants
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("face {face} references vertex {index} but the mesh only has {nb_vertices} vertices")]
    IndexOutOfRange {
        face: usize,
        index: u32,
        nb_vertices: usize,
    },

    #[error("expected {expected} vertex colors, found {found}")]
    ColorCountMismatch { expected: usize, found: usize },

    #[error("expected {expected} face material ids, found {found}")]
    MaterialCountMismatch { expected: usize, found: usize },
}

/// Reading or writing a PLY file failed
#[derive(thiserror::Error, Debug)]
pub enum PlyError {
    #[error("failed to open '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed PLY data: {0}")]
    Malformed(String),

    #[error("missing element '{0}'")]
    MissingElement(&'static str),

    #[error("element '{element}' has no property '{property}'")]
    MissingProperty {
        element: &'static str,
        property: &'static str,
    },

    #[error("property '{property}' of element '{element}' #{index} has an unsupported type")]
    InvalidProperty {
        element: &'static str,
        property: &'static str,
        index: usize,
    },

    #[error("face {face} has {arity} vertices, only triangles are supported")]
    NonTriangularFace { face: usize, arity: usize },

    #[error("face {face} has material id {value}, ids must fit in 0..=255")]
    InvalidMaterialId { face: usize, value: i64 },

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error("failed to write '{path}': {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pipeline stage a shader source belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Loading, compiling or linking a shader program failed
#[derive(thiserror::Error, Debug)]
pub enum ShaderError {
    #[error("failed to load file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load file '{path}': file is empty")]
    EmptySource { path: PathBuf },

    #[error("failed to compile {stage} shader '{path}':\n{log}")]
    Compile {
        stage: ShaderStage,
        path: PathBuf,
        log: String,
    },

    #[error("failed to link shaders: {log}")]
    Link { log: String },
}

impl ShaderError {
    pub fn link<T: ToString>(log: T) -> Self {
        ShaderError::Link {
            log: log.to_string(),
        }
    }
}

/// GPU side failures
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("device error: {0}")]
    Device(String),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error(transparent)]
    Shader(#[from] ShaderError),
}

impl RenderError {
    pub fn device<T: ToString>(msg: T) -> Self {
        RenderError::Device(msg.to_string())
    }
}

/// Configuration could not be loaded or holds bad values
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax error in configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("bad value for field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid<T: ToString>(field: &'static str, reason: T) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.to_string(),
        }
    }
}

pub type PlyResult<T> = Result<T, PlyError>;
pub type ShaderResult<T> = Result<T, ShaderError>;
pub type RenderResult<T> = Result<T, RenderError>;
