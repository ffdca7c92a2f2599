//! # Mesh Module
//!
//! File-side half of the viewer: PLY decoding into a raw [`MeshBuffer`],
//! processing into a render-ready [`Mesh`] and ASCII PLY export.
//!
//! ```no_run
//! use plyviewer::mesh::{load_mesh, MeshProcessor};
//!
//! let mesh = load_mesh("data/models/cube_m.ply", &MeshProcessor::default())?;
//! mesh.export_ply("/tmp/cube_m.ply")?;
//! # Ok::<(), plyviewer::error::PlyError>(())
//! ```

pub mod bounds;
pub mod buffer;
pub mod export;
#[allow(clippy::module_inception)]
pub mod mesh;
pub mod ply_reader;
pub mod processor;

pub use bounds::{Aabb3, Viewport};
pub use buffer::MeshBuffer;
pub use mesh::{MaterialRange, Mesh};
pub use ply_reader::{load_mesh, read_mesh_buffer, read_mesh_buffer_from};
pub use processor::MeshProcessor;
