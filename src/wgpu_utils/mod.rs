//! Small wrappers around common wgpu buffer and binding boilerplate

pub mod binding_types;
pub mod uniform_buffer;

// Re-export main types
pub use binding_types::*;
pub use uniform_buffer::{ArrayBuffer, UniformBuffer};
