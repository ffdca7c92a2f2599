//! Viewer configuration
//!
//! Settings come from three places, highest priority first:
//! 1. CLI arguments ([`ViewerArgs`])
//! 2. A TOML file given with `--config` ([`ConfigFile`])
//! 3. Built-in defaults
//!
//! # Example TOML
//!
//! ```toml
//! [window]
//! title = "Bunny"
//! width = 1600
//! height = 900
//!
//! [viewer]
//! renderer = "simple"
//! per_material = true
//! clear_color = [0.0, 0.0, 0.0, 1.0]
//!
//! [materials]
//! default = "shaders/materials/default.wgsl"
//! first = 1
//! paths = ["shaders/materials/gold.wgsl", "shaders/materials/stripes.wgsl"]
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, gfx::RendererKind, gfx::resources::MaterialList};

pub const DEFAULT_TITLE: &str = "3D Viewer";
pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 800;
pub const DEFAULT_CLEAR_COLOR: [f64; 4] = [0.1, 0.1, 0.1, 1.0];
pub const DEFAULT_VERTEX_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// Command line arguments
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "plyviewer")]
#[command(author, version, about = "Interactive viewer for PLY triangle meshes")]
pub struct ViewerArgs {
    /// PLY file to open on startup
    #[arg(conflicts_with = "input")]
    pub file: Option<PathBuf>,

    /// PLY file to open on startup (same as the positional argument)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding `shaders/` and relative material paths
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Renderer to start with: simple or forward
    #[arg(long)]
    pub renderer: Option<RendererKind>,

    /// Render with one shader program per material
    #[arg(long)]
    pub per_material: bool,

    /// Keep faces in file order instead of grouping them by material
    #[arg(long)]
    pub force_unsorted: bool,

    /// Window width
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: Option<u32>,

    /// Window height
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: Option<u32>,

    /// Window title
    #[arg(short, long)]
    pub title: Option<String>,

    /// Random point lights added on startup
    #[arg(long = "pl", default_value_t = 0)]
    pub point_lights: usize,
}

impl ViewerArgs {
    pub fn mesh_path(&self) -> Option<&Path> {
        self.file.as_deref().or(self.input.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    pub title: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerSection {
    pub renderer: Option<String>,
    pub per_material: Option<bool>,
    pub force_unsorted: Option<bool>,
    pub data_dir: Option<PathBuf>,
    pub clear_color: Option<[f64; 4]>,
    pub default_color: Option<[f32; 3]>,
    pub point_lights: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaterialsSection {
    pub default: Option<PathBuf>,
    pub first: Option<u8>,
    pub paths: Vec<PathBuf>,
}

/// Configuration file contents, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub window: WindowSection,
    pub viewer: ViewerSection,
    pub materials: MaterialsSection,
}

impl ConfigFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub mesh_path: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub renderer: RendererKind,
    pub per_material: bool,
    pub force_unsorted: bool,
    pub clear_color: [f64; 4],
    pub default_color: [f32; 3],
    pub point_lights: usize,
    pub materials: MaterialList,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            title: DEFAULT_TITLE.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            mesh_path: None,
            materials: MaterialList::new(default_material_path(&data_dir)),
            data_dir,
            renderer: RendererKind::default(),
            per_material: false,
            force_unsorted: false,
            clear_color: DEFAULT_CLEAR_COLOR,
            default_color: DEFAULT_VERTEX_COLOR,
            point_lights: 0,
        }
    }
}

impl ViewerConfig {
    /// Loads the file named by `--config`, if any, and merges it with `args`
    pub fn resolve(args: &ViewerArgs) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        Self::merge(args, file)
    }

    pub fn merge(args: &ViewerArgs, file: ConfigFile) -> Result<Self, ConfigError> {
        let ConfigFile {
            window,
            viewer,
            materials,
        } = file;

        let title = args
            .title
            .clone()
            .or(window.title)
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        if title.trim().is_empty() {
            return Err(ConfigError::invalid("window.title", "title is empty"));
        }

        let width = args.width.or(window.width).unwrap_or(DEFAULT_WIDTH);
        if width == 0 {
            return Err(ConfigError::invalid("window.width", "width must be positive"));
        }
        let height = args.height.or(window.height).unwrap_or(DEFAULT_HEIGHT);
        if height == 0 {
            return Err(ConfigError::invalid("window.height", "height must be positive"));
        }

        let renderer = match (args.renderer, viewer.renderer) {
            (Some(kind), _) => kind,
            (None, Some(name)) => name
                .parse::<RendererKind>()
                .map_err(|reason| ConfigError::invalid("viewer.renderer", reason))?,
            (None, None) => RendererKind::default(),
        };

        let clear_color = viewer.clear_color.unwrap_or(DEFAULT_CLEAR_COLOR);
        if clear_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::invalid(
                "viewer.clear_color",
                format!("{clear_color:?} has components outside [0, 1]"),
            ));
        }

        let default_color = viewer.default_color.unwrap_or(DEFAULT_VERTEX_COLOR);
        if default_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::invalid(
                "viewer.default_color",
                format!("{default_color:?} has components outside [0, 1]"),
            ));
        }

        let data_dir = args
            .data_dir
            .clone()
            .or(viewer.data_dir)
            .unwrap_or_else(default_data_dir);

        let default_material = materials
            .default
            .map(|p| resolve_path(&data_dir, p))
            .unwrap_or_else(|| default_material_path(&data_dir));
        let paths = materials
            .paths
            .into_iter()
            .map(|p| resolve_path(&data_dir, p))
            .collect();
        let materials =
            MaterialList::with_paths(default_material, materials.first.unwrap_or(0), paths);

        Ok(Self {
            title,
            width,
            height,
            mesh_path: args.mesh_path().map(Path::to_path_buf),
            renderer,
            per_material: args.per_material || viewer.per_material.unwrap_or(false),
            force_unsorted: args.force_unsorted || viewer.force_unsorted.unwrap_or(false),
            clear_color,
            default_color,
            point_lights: args.point_lights + viewer.point_lights.unwrap_or(0),
            materials,
            data_dir,
        })
    }

    pub fn shader_dir(&self) -> PathBuf {
        self.data_dir.join("shaders")
    }

    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color { r, g, b, a }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

fn default_material_path(data_dir: &Path) -> PathBuf {
    data_dir.join("shaders").join("materials").join("default.wgsl")
}

fn resolve_path(data_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        data_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ViewerArgs {
        ViewerArgs::try_parse_from(std::iter::once("plyviewer").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults_without_file() {
        let config = ViewerConfig::merge(&parse(&[]), ConfigFile::default()).unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.title, "3D Viewer");
        assert_eq!(config.renderer, RendererKind::Forward);
        assert!(config.shader_dir().ends_with("data/shaders"));
        assert!(config
            .materials
            .default_path()
            .ends_with("shaders/materials/default.wgsl"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = ConfigFile::from_toml(
            r#"
            [window]
            title = "From file"
            width = 640

            [viewer]
            renderer = "forward"
            "#,
        )
        .unwrap();
        let args = parse(&["--renderer", "simple", "--title", "From CLI", "mesh.ply"]);
        let config = ViewerConfig::merge(&args, file).unwrap();

        assert_eq!(config.title, "From CLI");
        assert_eq!(config.width, 640);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.renderer, RendererKind::Simple);
        assert_eq!(config.mesh_path, Some(PathBuf::from("mesh.ply")));
    }

    #[test]
    fn test_input_flag_and_positional_conflict() {
        assert_eq!(parse(&["-i", "a.ply"]).mesh_path(), Some(Path::new("a.ply")));
        let args = ["plyviewer", "-i", "a.ply", "b.ply"];
        assert!(ViewerArgs::try_parse_from(args).is_err());
    }

    #[test]
    fn test_zero_width_is_rejected() {
        assert!(ViewerArgs::try_parse_from(["plyviewer", "--width", "0"]).is_err());

        let file = ConfigFile::from_toml("[window]\nwidth = 0\n").unwrap();
        let err = ViewerConfig::merge(&parse(&[]), file).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "window.width",
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_renderer_is_rejected() {
        let file = ConfigFile::from_toml("[viewer]\nrenderer = \"deferred\"\n").unwrap();
        let err = ViewerConfig::merge(&parse(&[]), file).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "viewer.renderer",
                ..
            }
        ));
        assert!(ViewerArgs::try_parse_from(["plyviewer", "--renderer", "deferred"]).is_err());
    }

    #[test]
    fn test_unknown_key_is_a_parse_error() {
        let err = ConfigFile::from_toml("[window]\ncolour = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_clear_color_out_of_range() {
        let file = ConfigFile::from_toml("[viewer]\nclear_color = [0.0, 2.0, 0.0, 1.0]\n").unwrap();
        assert!(ViewerConfig::merge(&parse(&[]), file).is_err());
    }

    #[test]
    fn test_material_paths_resolve_against_data_dir() {
        let file = ConfigFile::from_toml(
            r#"
            [viewer]
            data_dir = "/opt/viewer"

            [materials]
            first = 2
            paths = ["gold.wgsl", "/abs/stripes.wgsl"]
            "#,
        )
        .unwrap();
        let config = ViewerConfig::merge(&parse(&[]), file).unwrap();

        assert_eq!(config.materials.first_material(), 2);
        assert_eq!(config.materials.material_path(2), Path::new("/opt/viewer/gold.wgsl"));
        assert_eq!(config.materials.material_path(3), Path::new("/abs/stripes.wgsl"));
        assert_eq!(
            config.materials.material_path(7),
            Path::new("/opt/viewer/shaders/materials/default.wgsl")
        );
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/viewer.toml");
        let args = parse(&["--config", path.to_str().unwrap()]);
        let config = ViewerConfig::resolve(&args).unwrap();

        assert_eq!(config.materials.first_material(), 1);
        assert_eq!(config.materials.nb_materials(), 3);
        assert!(config.materials.material_path(1).ends_with("gold.wgsl"));
        assert!(config.materials.material_path(1).exists());
    }

    #[test]
    fn test_missing_config_file() {
        let args = parse(&["--config", "/nonexistent/plyviewer.toml"]);
        assert!(matches!(
            ViewerConfig::resolve(&args),
            Err(ConfigError::Io { .. })
        ));
    }
}
