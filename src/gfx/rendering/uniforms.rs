use cgmath::Matrix4;

use crate::gfx::{camera::OPENGL_TO_WGPU_MATRIX, scene::Scene};

/// Per-program uniform block, binding 0 of group 0.
///
/// Matches the WGSL struct
/// `{ projection, view, model: mat4x4<f32>, normal: mat3x3<f32>, ambient: vec4<f32>, material_id: u32 }`
/// whose `mat3x3` columns are padded to 16 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub ambient: [f32; 4],
    pub material_id: u32,
    pub _padding: [u32; 3],
}

impl FrameUniforms {
    /// Matrices of the scene's current camera mode, projection converted to
    /// wgpu clip space
    pub fn new(scene: &Scene, material_id: u8) -> Self {
        let projection: Matrix4<f32> = OPENGL_TO_WGPU_MATRIX * scene.projection_matrix();
        let normal = scene.normal_matrix();

        Self {
            projection: projection.into(),
            view: scene.view_matrix().into(),
            model: scene.model_matrix.into(),
            normal: [
                normal.x.extend(0.0).into(),
                normal.y.extend(0.0).into(),
                normal.z.extend(0.0).into(),
            ],
            ambient: scene.ambient_color.extend(1.0).into(),
            material_id: material_id as u32,
            _padding: [0; 3],
        }
    }
}
