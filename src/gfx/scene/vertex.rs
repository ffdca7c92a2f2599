//! # Vertex Data Structures
//!
//! GPU-compatible vertex format shared by the mesh processor and the renderers.

use std::mem;

/// A mesh vertex with position, color and normal.
///
/// # Memory Layout
///
/// The `#[repr(C)]` attribute ensures the struct has a C-compatible memory
/// layout, which is required for GPU buffer operations. Each attribute is three
/// packed `f32`s, so the stride is 36 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// 3D position coordinates [x, y, z]
    pub position: [f32; 3],
    /// Normalized RGB color
    pub color: [f32; 3],
    /// Unit normal, the normalized sum of the adjacent face normals
    pub normal: [f32; 3],
}

/// Vertex attributes a shader may consume, with the input name it has to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexAttribute {
    Position,
    Color,
    Normal,
}

impl VertexAttribute {
    pub const ALL: [VertexAttribute; 3] = [
        VertexAttribute::Position,
        VertexAttribute::Color,
        VertexAttribute::Normal,
    ];

    /// Name of the vertex entry point parameter (or input struct member)
    /// bound to this attribute
    pub fn shader_name(self) -> &'static str {
        match self {
            VertexAttribute::Position => "vtx_position",
            VertexAttribute::Color => "vtx_color",
            VertexAttribute::Normal => "vtx_normal",
        }
    }

    /// Byte offset of the attribute inside [`Vertex`]
    pub fn offset(self) -> wgpu::BufferAddress {
        let size = mem::size_of::<[f32; 3]>() as wgpu::BufferAddress;
        match self {
            VertexAttribute::Position => 0,
            VertexAttribute::Color => size,
            VertexAttribute::Normal => 2 * size,
        }
    }
}

impl Vertex {
    pub const STRIDE: wgpu::BufferAddress = mem::size_of::<Vertex>() as wgpu::BufferAddress;

    /// Builds the attribute list for the locations a shader actually declares.
    ///
    /// Attributes the shader does not consume are simply left out of the layout.
    pub fn attributes<F>(location_of: F) -> Vec<wgpu::VertexAttribute>
    where
        F: Fn(VertexAttribute) -> Option<u32>,
    {
        VertexAttribute::ALL
            .iter()
            .filter_map(|&attribute| {
                location_of(attribute).map(|shader_location| wgpu::VertexAttribute {
                    offset: attribute.offset(),
                    shader_location,
                    format: wgpu::VertexFormat::Float32x3,
                })
            })
            .collect()
    }

    /// Returns the vertex buffer layout over the given attributes
    pub fn desc(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: Self::STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_stride() {
        assert_eq!(Vertex::STRIDE, 36);
    }

    #[test]
    fn test_attributes_follow_declared_locations() {
        let attributes = Vertex::attributes(|attribute| match attribute {
            VertexAttribute::Position => Some(0),
            VertexAttribute::Normal => Some(3),
            VertexAttribute::Color => None,
        });

        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].shader_location, 0);
        assert_eq!(attributes[0].offset, 0);
        assert_eq!(attributes[1].shader_location, 3);
        assert_eq!(attributes[1].offset, 24);
    }
}
