//! Render-ready mesh produced by the [`MeshProcessor`](super::MeshProcessor)

use std::ops::Range;

use cgmath::Vector3;

use super::bounds::Aabb3;
use crate::gfx::scene::vertex::Vertex;

/// Inclusive range of material ids present in a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialRange {
    pub min: u8,
    pub max: u8,
}

impl MaterialRange {
    pub fn new(min: u8, max: u8) -> Self {
        debug_assert!(min <= max);
        Self { min, max }
    }

    /// Number of ids in the range, `max - min + 1`
    pub fn count(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    pub fn contains(&self, id: u8) -> bool {
        (self.min..=self.max).contains(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u8> {
        self.min..=self.max
    }
}

impl Default for MaterialRange {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Triangle mesh with no unused vertices, normalized colors and per-vertex
/// normals.
///
/// When [`is_sorted`](Mesh::is_sorted) holds, faces are grouped contiguously
/// by ascending material id and `faces_per_material[k]` counts the faces of
/// material `material_range.min + k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub(super) vertices: Vec<Vertex>,
    pub(super) faces: Vec<[u32; 3]>,
    pub(super) face_materials: Vec<u8>,
    pub(super) faces_per_material: Vec<u32>,
    pub(super) material_range: MaterialRange,
    pub(super) bounding_box: Aabb3,
    pub(super) has_colors: bool,
    pub(super) has_materials: bool,
    pub(super) is_sorted: bool,
}

impl Mesh {
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Flat triangle list, three indices per face
    pub fn indices(&self) -> &[u32] {
        bytemuck::cast_slice(&self.faces)
    }

    pub fn face_materials(&self) -> &[u8] {
        &self.face_materials
    }

    pub fn faces_per_material(&self) -> &[u32] {
        &self.faces_per_material
    }

    pub fn material_range(&self) -> MaterialRange {
        self.material_range
    }

    pub fn bounding_box(&self) -> Aabb3 {
        self.bounding_box
    }

    pub fn nb_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn nb_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn nb_materials(&self) -> usize {
        self.material_range.count()
    }

    pub fn has_colors(&self) -> bool {
        self.has_colors
    }

    pub fn has_materials(&self) -> bool {
        self.has_materials
    }

    pub fn is_sorted(&self) -> bool {
        self.is_sorted
    }

    /// Material id of the `index`-th material of the range
    pub fn material_id(&self, index: usize) -> u8 {
        self.material_range.min + index as u8
    }

    /// Index-buffer range holding the faces of the `index`-th material.
    ///
    /// Only meaningful on a sorted mesh. Out of range indices give an empty
    /// range at the end of the buffer.
    pub fn index_range(&self, index: usize) -> Range<u32> {
        let first: u32 = self.faces_per_material.iter().take(index).sum();
        let count = self.faces_per_material.get(index).copied().unwrap_or(0);
        (3 * first)..(3 * (first + count))
    }

    /// Paints every vertex with `color`. Ignored when the file carried colors.
    pub fn change_default_color(&mut self, color: Vector3<f32>) {
        if self.has_colors {
            return;
        }
        for vertex in &mut self.vertices {
            vertex.color = color.into();
        }
    }

    /// Assigns `material` to every face. Ignored when the file carried
    /// material ids.
    pub fn change_default_material(&mut self, material: u8) {
        if self.has_materials {
            return;
        }
        self.face_materials.fill(material);
        self.material_range = MaterialRange::new(material, material);
        self.faces_per_material = vec![self.faces.len() as u32];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MeshBuffer, MeshProcessor};

    fn quad(face_materials: Option<Vec<u8>>) -> Mesh {
        let buffer = MeshBuffer {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            colors: None,
            faces: vec![[0, 1, 2], [0, 2, 3]],
            face_materials,
        };
        MeshProcessor::default()
            .process(buffer)
            .expect("valid buffer")
    }

    #[test]
    fn test_material_range_count() {
        assert_eq!(MaterialRange::new(1, 6).count(), 6);
        assert_eq!(MaterialRange::default().count(), 1);
        assert!(MaterialRange::new(2, 4).contains(3));
        assert!(!MaterialRange::new(2, 4).contains(5));
    }

    #[test]
    fn test_index_range_uses_prefix_sums() {
        let mesh = quad(Some(vec![3, 5]));
        assert_eq!(mesh.nb_materials(), 3);
        assert_eq!(mesh.faces_per_material(), &[1, 0, 1]);
        assert_eq!(mesh.index_range(0), 0..3);
        assert_eq!(mesh.index_range(1), 3..3);
        assert_eq!(mesh.index_range(2), 3..6);
        assert_eq!(mesh.material_id(2), 5);
    }

    #[test]
    fn test_change_default_color_applies_to_every_vertex() {
        let mut mesh = quad(None);
        mesh.change_default_color(Vector3::new(0.5, 0.25, 1.0));
        assert!(mesh
            .vertices()
            .iter()
            .all(|v| v.color == [0.5, 0.25, 1.0]));
    }

    #[test]
    fn test_change_default_material_only_without_materials() {
        let mut mesh = quad(None);
        mesh.change_default_material(7);
        assert_eq!(mesh.face_materials(), &[7, 7]);
        assert_eq!(mesh.material_range(), MaterialRange::new(7, 7));

        let mut mesh = quad(Some(vec![1, 2]));
        mesh.change_default_material(7);
        assert_eq!(mesh.face_materials(), &[1, 2]);
    }
}
