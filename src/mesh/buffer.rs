//! Raw mesh data as decoded from a file, before any processing

use crate::error::MeshError;

/// Flat, unprocessed mesh data.
///
/// Vertex colors and face material ids are optional. When present they are
/// parallel to `positions` and `faces` respectively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffer {
    pub positions: Vec<[f32; 3]>,
    pub colors: Option<Vec<[f32; 3]>>,
    pub faces: Vec<[u32; 3]>,
    pub face_materials: Option<Vec<u8>>,
}

impl MeshBuffer {
    pub fn nb_vertices(&self) -> usize {
        self.positions.len()
    }

    pub fn nb_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    pub fn has_materials(&self) -> bool {
        self.face_materials.is_some()
    }

    /// Checks array lengths and that every face index names an existing vertex
    pub fn validate(&self) -> Result<(), MeshError> {
        let nb_vertices = self.nb_vertices();

        if let Some(colors) = &self.colors {
            if colors.len() != nb_vertices {
                return Err(MeshError::ColorCountMismatch {
                    expected: nb_vertices,
                    found: colors.len(),
                });
            }
        }

        if let Some(materials) = &self.face_materials {
            if materials.len() != self.nb_faces() {
                return Err(MeshError::MaterialCountMismatch {
                    expected: self.nb_faces(),
                    found: materials.len(),
                });
            }
        }

        for (face, indices) in self.faces.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= nb_vertices) {
                return Err(MeshError::IndexOutOfRange {
                    face,
                    index,
                    nb_vertices,
                });
            }
        }

        Ok(())
    }
}
