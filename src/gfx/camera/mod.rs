#[allow(clippy::module_inception)]
pub mod camera;
pub mod camera_controller;

// Re-export main types
pub use camera::{Camera, OPENGL_TO_WGPU_MATRIX};
pub use camera_controller::CameraController;
