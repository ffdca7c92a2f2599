//! Rendering: shader programs, renderers and the GPU context they draw with

pub mod gpu_context;
pub mod preprocessor;
pub mod render_target;
pub mod renderer;
pub mod shader_program;
pub mod uniforms;

// Re-export main types
pub use gpu_context::GpuContext;
pub use render_target::RenderTarget;
pub use renderer::{Renderer, RendererKind};
pub use shader_program::{MaterialBinding, ShaderProgram};
pub use uniforms::FrameUniforms;
