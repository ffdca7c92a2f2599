//! Turns a raw [`MeshBuffer`] into a render-ready [`Mesh`]
//!
//! Processing runs in a fixed order:
//! 1. drop vertices no face references and re-index the faces,
//! 2. normalize colors by the brightest channel,
//! 3. detect the material range and whether faces are grouped by material,
//! 4. regroup faces by material unless told not to,
//! 5. compute vertex normals from the face normals, then the bounding box.

use cgmath::{InnerSpace, Vector3};
use log::{debug, info};

use super::{
    bounds::Aabb3,
    buffer::MeshBuffer,
    mesh::{MaterialRange, Mesh},
};
use crate::{error::MeshError, gfx::scene::vertex::Vertex};

/// Color values are divided by the brightest channel, capped at this value
pub const MAX_COLOR_INTENSITY: f32 = 131072.0;

/// Mesh processing options
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshProcessor {
    /// Keep faces in file order even when they are not grouped by material
    pub force_unsorted: bool,
}

impl MeshProcessor {
    pub fn new(force_unsorted: bool) -> Self {
        Self { force_unsorted }
    }

    pub fn process(&self, buffer: MeshBuffer) -> Result<Mesh, MeshError> {
        buffer.validate()?;

        let unused = unused_vertices(&buffer);
        let remap = reindex_map(buffer.nb_vertices(), &unused);
        if !unused.is_empty() {
            debug!("Dropping {} unused vertices", unused.len());
        }

        let has_colors = buffer.has_colors();
        let has_materials = buffer.has_materials();
        let intensity = max_color_intensity(&buffer);

        let mut vertices = Vec::with_capacity(buffer.nb_vertices() - unused.len());
        for (i, position) in buffer.positions.iter().enumerate() {
            if remap[i].is_none() {
                continue;
            }
            let color = match &buffer.colors {
                Some(colors) => colors[i].map(|c| c / intensity),
                None => [0.0; 3],
            };
            vertices.push(Vertex {
                position: *position,
                color,
                normal: [0.0; 3],
            });
        }

        // Every face index is a used vertex, so the remap always resolves.
        let mut faces: Vec<[u32; 3]> = buffer
            .faces
            .iter()
            .map(|face| face.map(|i| remap[i as usize].unwrap_or(0)))
            .collect();

        let nb_faces = faces.len();
        let mut face_materials = buffer.face_materials.unwrap_or_else(|| vec![0; nb_faces]);

        let layout = material_layout(&face_materials);
        let is_sorted = if layout.is_sorted || self.force_unsorted {
            layout.is_sorted
        } else {
            sort_faces_by_material(&mut faces, &mut face_materials);
            true
        };

        compute_normals(&mut vertices, &faces);
        let bounding_box = Aabb3::from_positions(vertices.iter().map(|v| &v.position));

        info!(
            "Processed mesh: {} vertices, {} faces, materials {}..={}{}",
            vertices.len(),
            faces.len(),
            layout.range.min,
            layout.range.max,
            if is_sorted { "" } else { " (unsorted)" }
        );

        Ok(Mesh {
            vertices,
            faces,
            face_materials,
            faces_per_material: layout.faces_per_material,
            material_range: layout.range,
            bounding_box,
            has_colors,
            has_materials,
            is_sorted,
        })
    }
}

/// Indices, in ascending order, of the vertices no face references
pub fn unused_vertices(buffer: &MeshBuffer) -> Vec<u32> {
    let mut used = vec![false; buffer.nb_vertices()];
    for &i in buffer.faces.iter().flatten() {
        used[i as usize] = true;
    }

    used.iter()
        .enumerate()
        .filter(|(_, &u)| !u)
        .map(|(i, _)| i as u32)
        .collect()
}

/// Maps each old vertex index to its new index, or `None` when dropped
pub fn reindex_map(nb_vertices: usize, unused: &[u32]) -> Vec<Option<u32>> {
    let mut map = Vec::with_capacity(nb_vertices);
    let mut unused = unused.iter().peekable();
    let mut next = 0u32;

    for i in 0..nb_vertices as u32 {
        if unused.peek() == Some(&&i) {
            unused.next();
            map.push(None);
        } else {
            map.push(Some(next));
            next += 1;
        }
    }

    map
}

/// Divisor used to bring colors into `[0, 1]`.
///
/// `1.0` when the buffer has no colors or only black ones.
pub fn max_color_intensity(buffer: &MeshBuffer) -> f32 {
    let Some(colors) = &buffer.colors else {
        return 1.0;
    };

    let max = colors
        .iter()
        .flatten()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);

    if max > 0.0 {
        max.min(MAX_COLOR_INTENSITY)
    } else {
        1.0
    }
}

/// Material statistics over the face material ids
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialLayout {
    pub range: MaterialRange,
    pub faces_per_material: Vec<u32>,
    pub is_sorted: bool,
}

pub fn material_layout(face_materials: &[u8]) -> MaterialLayout {
    let (Some(&min), Some(&max)) = (face_materials.iter().min(), face_materials.iter().max())
    else {
        return MaterialLayout {
            range: MaterialRange::default(),
            faces_per_material: vec![0],
            is_sorted: true,
        };
    };

    let range = MaterialRange::new(min, max);
    let mut faces_per_material = vec![0u32; range.count()];
    for &id in face_materials {
        faces_per_material[(id - min) as usize] += 1;
    }

    MaterialLayout {
        range,
        faces_per_material,
        is_sorted: face_materials.windows(2).all(|w| w[0] <= w[1]),
    }
}

/// Stable regroup of faces by ascending material id
pub fn sort_faces_by_material(faces: &mut Vec<[u32; 3]>, face_materials: &mut [u8]) {
    let mut order: Vec<usize> = (0..faces.len()).collect();
    order.sort_by_key(|&i| face_materials[i]);

    *faces = order.iter().map(|&i| faces[i]).collect();
    face_materials.sort();
}

/// Adds each face's `(v2 - v1) × (v3 - v1)` to its three vertices, then
/// normalizes. Vertices only touched by zero-area faces get a zero normal.
pub fn compute_normals(vertices: &mut [Vertex], faces: &[[u32; 3]]) {
    for vertex in vertices.iter_mut() {
        vertex.normal = [0.0; 3];
    }

    for face in faces {
        let [a, b, c] = face.map(|i| Vector3::from(vertices[i as usize].position));
        let normal = (b - a).cross(c - a);

        for &i in face {
            let n = &mut vertices[i as usize].normal;
            *n = (Vector3::from(*n) + normal).into();
        }
    }

    for vertex in vertices.iter_mut() {
        vertex.normal = match unit_normal(vertex) {
            Some(n) => n.into(),
            None => [0.0; 3],
        };
    }
}

/// Normalized vertex normal, or `None` when the sum is exactly zero.
/// Tiny sums from small faces are still normalized.
pub fn unit_normal(vertex: &Vertex) -> Option<Vector3<f32>> {
    let n = Vector3::from(vertex.normal);
    let length = n.magnitude();
    (length > 0.0 && length.is_finite()).then(|| n / length)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with_unused() -> MeshBuffer {
        MeshBuffer {
            positions: vec![
                [9.0, 9.0, 9.0],
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [7.0, 7.0, 7.0],
                [0.0, 1.0, 0.0],
            ],
            colors: Some(vec![
                [255.0, 0.0, 0.0],
                [0.0, 255.0, 0.0],
                [0.0, 0.0, 51.0],
                [255.0, 255.0, 255.0],
                [102.0, 102.0, 102.0],
            ]),
            faces: vec![[1, 2, 4]],
            face_materials: None,
        }
    }

    #[test]
    fn test_unused_vertices_and_reindex() {
        let buffer = buffer_with_unused();
        let unused = unused_vertices(&buffer);
        assert_eq!(unused, vec![0, 3]);
        assert_eq!(
            reindex_map(5, &unused),
            vec![None, Some(0), Some(1), None, Some(2)]
        );
    }

    #[test]
    fn test_process_drops_unused_vertices() {
        let mesh = MeshProcessor::default()
            .process(buffer_with_unused())
            .unwrap();

        assert_eq!(mesh.nb_vertices(), 3);
        assert_eq!(mesh.faces(), &[[0, 1, 2]]);
        assert_eq!(mesh.vertices()[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices()[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_colors_normalized_by_max_channel() {
        let mesh = MeshProcessor::default()
            .process(buffer_with_unused())
            .unwrap();

        assert!(mesh.has_colors());
        assert_eq!(mesh.vertices()[0].color, [0.0, 1.0, 0.0]);
        assert_eq!(mesh.vertices()[1].color, [0.0, 0.0, 0.2]);
        assert_eq!(mesh.vertices()[2].color, [0.4, 0.4, 0.4]);
    }

    #[test]
    fn test_max_color_intensity_is_capped() {
        let mut buffer = buffer_with_unused();
        buffer.colors.as_mut().unwrap()[0] = [1.0e6, 0.0, 0.0];
        assert_eq!(max_color_intensity(&buffer), MAX_COLOR_INTENSITY);

        buffer.colors = Some(vec![[0.0; 3]; 5]);
        assert_eq!(max_color_intensity(&buffer), 1.0);

        buffer.colors = None;
        assert_eq!(max_color_intensity(&buffer), 1.0);
    }

    #[test]
    fn test_material_layout() {
        let layout = material_layout(&[2, 2, 3, 5]);
        assert_eq!(layout.range, MaterialRange::new(2, 5));
        assert_eq!(layout.faces_per_material, vec![2, 1, 0, 1]);
        assert!(layout.is_sorted);

        assert!(!material_layout(&[1, 3, 2]).is_sorted);

        let empty = material_layout(&[]);
        assert_eq!(empty.range, MaterialRange::default());
        assert_eq!(empty.faces_per_material, vec![0]);
    }

    fn strip(face_materials: Vec<u8>) -> MeshBuffer {
        let nb_faces = face_materials.len();
        let mut positions = Vec::new();
        for i in 0..nb_faces + 2 {
            positions.push([i as f32, (i % 2) as f32, 0.0]);
        }
        MeshBuffer {
            positions,
            colors: None,
            faces: (0..nb_faces as u32).map(|i| [i, i + 1, i + 2]).collect(),
            face_materials: Some(face_materials),
        }
    }

    #[test]
    fn test_unsorted_faces_are_regrouped() {
        let buffer = strip(vec![3, 1, 2, 1]);
        let original_faces = buffer.faces.clone();
        let mesh = MeshProcessor::default().process(buffer).unwrap();

        assert!(mesh.is_sorted());
        assert_eq!(mesh.face_materials(), &[1, 1, 2, 3]);
        assert_eq!(mesh.faces_per_material(), &[2, 1, 1]);
        // stable: the two material-1 faces keep their relative order
        assert_eq!(mesh.faces()[0], original_faces[1]);
        assert_eq!(mesh.faces()[1], original_faces[3]);
        assert_eq!(mesh.faces()[3], original_faces[0]);
    }

    #[test]
    fn test_force_unsorted_keeps_file_order() {
        let buffer = strip(vec![3, 1, 2, 1]);
        let original_faces = buffer.faces.clone();
        let mesh = MeshProcessor::new(true).process(buffer).unwrap();

        assert!(!mesh.is_sorted());
        assert_eq!(mesh.face_materials(), &[3, 1, 2, 1]);
        assert_eq!(mesh.faces(), original_faces.as_slice());
    }

    #[test]
    fn test_no_materials_defaults() {
        let mut buffer = strip(vec![0, 0, 0]);
        buffer.face_materials = None;
        let mesh = MeshProcessor::default().process(buffer).unwrap();

        assert!(!mesh.has_materials());
        assert!(mesh.is_sorted());
        assert_eq!(mesh.nb_materials(), 1);
        assert_eq!(mesh.material_range(), MaterialRange::new(0, 0));
        assert_eq!(mesh.faces_per_material(), &[3]);
        assert_eq!(mesh.face_materials(), &[0, 0, 0]);
    }

    #[test]
    fn test_normals_are_normalized_face_sums() {
        let mesh = MeshProcessor::default()
            .process(buffer_with_unused())
            .unwrap();

        for vertex in mesh.vertices() {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_millimetre_faces_get_unit_normals() {
        let buffer = MeshBuffer {
            positions: vec![[0.0, 0.0, 0.0], [1e-3, 0.0, 0.0], [0.0, 1e-3, 0.0]],
            faces: vec![[0, 1, 2]],
            ..MeshBuffer::default()
        };
        let mesh = MeshProcessor::default().process(buffer).unwrap();

        for vertex in mesh.vertices() {
            let n = Vector3::from(vertex.normal);
            assert!((n.magnitude() - 1.0).abs() < 1e-5, "{:?}", vertex.normal);
            assert!((n.z - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_zero_area_face_gives_zero_normals() {
        let mut vertices = vec![Vertex::default(); 3];
        vertices[0].normal = [5.0, 5.0, 5.0];
        vertices[1].position = [1.0, 0.0, 0.0];
        vertices[2].position = [2.0, 0.0, 0.0];

        compute_normals(&mut vertices, &[[0, 1, 2]]);
        for vertex in &vertices {
            assert_eq!(vertex.normal, [0.0; 3]);
        }
    }

    #[test]
    fn test_unit_normal_of_degenerate_vertex() {
        let vertex = Vertex::default();
        assert!(unit_normal(&vertex).is_none());
    }

    #[test]
    fn test_empty_mesh_accepted() {
        let mesh = MeshProcessor::default()
            .process(MeshBuffer::default())
            .unwrap();
        assert_eq!(mesh.nb_vertices(), 0);
        assert_eq!(mesh.nb_faces(), 0);
        assert_eq!(mesh.nb_materials(), 1);
    }

    #[test]
    fn test_invalid_buffer_rejected() {
        let mut buffer = buffer_with_unused();
        buffer.faces.push([0, 1, 42]);
        assert!(matches!(
            MeshProcessor::default().process(buffer),
            Err(MeshError::IndexOutOfRange { index: 42, .. })
        ));
    }
}
