//! # Scene
//!
//! What gets drawn each frame:
//!
//! - [`Scene`] - the mesh, its GPU buffers, the camera and the lights
//! - [`DirectionalLight`] / [`PointLight`] - light sources and their GPU layouts
//! - [`Vertex`] - per-vertex data shared by the mesh and the shaders
//!
//! ```no_run
//! use plyviewer::gfx::scene::{DirectionalLight, Scene};
//! use plyviewer::mesh::{load_mesh, MeshProcessor};
//!
//! let mesh = load_mesh("data/models/cube.ply", &MeshProcessor::default())?;
//! let mut scene = Scene::with_mesh(mesh);
//! scene.add_directional_light(DirectionalLight::default());
//! # Ok::<(), plyviewer::error::PlyError>(())
//! ```

pub mod light;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod vertex;

// Re-export main types
pub use light::{DirectionalLight, DirectionalLightRaw, PointLight, PointLightRaw};
pub use scene::{MeshBuffers, Scene};
pub use vertex::{Vertex, VertexAttribute};
