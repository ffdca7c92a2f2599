//! PLY mesh viewer
//!
//! Loads triangle meshes from PLY files and draws them with wgpu, shading
//! each face with the WGSL material its id selects.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod mesh;
pub mod notifier;
pub mod ui;
pub mod viewer;
pub mod wgpu_utils;

pub use app::ViewerApp;
pub use config::{ViewerArgs, ViewerConfig};
pub use viewer::Viewer;
