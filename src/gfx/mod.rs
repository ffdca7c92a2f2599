//! # Graphics
//!
//! - **Camera** ([`camera`]) - orbital and free-fly navigation
//! - **Rendering** ([`rendering`]) - shader programs and renderers
//! - **Scene** ([`scene`]) - mesh, lights and GPU buffers
//! - **Resources** ([`resources`]) - material lists
//!
//! ```no_run
//! use std::sync::Arc;
//! use plyviewer::gfx::{rendering::{Renderer, RendererKind}, scene::Scene};
//! use plyviewer::notifier::LogNotifier;
//!
//! let scene = Scene::new();
//! let mut renderer = Renderer::new(RendererKind::Forward, "data/shaders", Arc::new(LogNotifier));
//! renderer.prepare(&scene);
//! ```

pub mod camera;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::Camera;
pub use rendering::{Renderer, RendererKind};
pub use scene::Scene;
