//! PLY decoding into a [`MeshBuffer`]
//!
//! Accepts ASCII and binary PLY. The `vertex` element must carry `x`, `y`, `z`;
//! `red`/`green`/`blue` (or `r`/`g`/`b`) are picked up as colors. The `face`
//! element must carry a `vertex_indices` (or `vertex_index`) list of exactly
//! three entries and may carry an integer `id` with the face material.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use log::{debug, info};
use ply_rs_bw::{
    parser::Parser,
    ply::{DefaultElement, Ply, Property},
};

use super::{buffer::MeshBuffer, mesh::Mesh, processor::MeshProcessor};
use crate::error::{PlyError, PlyResult};

const VERTEX: &str = "vertex";
const FACE: &str = "face";
const POSITION_PROPERTIES: [&str; 3] = ["x", "y", "z"];
const COLOR_PROPERTIES: [[&str; 3]; 2] = [["red", "green", "blue"], ["r", "g", "b"]];
const INDEX_PROPERTIES: [&str; 2] = ["vertex_indices", "vertex_index"];
const MATERIAL_PROPERTY: &str = "id";

/// Reads a PLY file into a raw buffer
pub fn read_mesh_buffer(path: impl AsRef<Path>) -> PlyResult<MeshBuffer> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| PlyError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Decoding PLY file '{}'", path.display());
    read_mesh_buffer_from(&mut BufReader::new(file))
}

/// Reads PLY data from any byte source
pub fn read_mesh_buffer_from<R: Read>(source: &mut R) -> PlyResult<MeshBuffer> {
    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(source)
        .map_err(|e| PlyError::Malformed(e.to_string()))?;

    let buffer = decode(&ply)?;
    buffer.validate()?;
    Ok(buffer)
}

/// Reads and processes a PLY file in one go
pub fn load_mesh(path: impl AsRef<Path>, processor: &MeshProcessor) -> PlyResult<Mesh> {
    let path = path.as_ref();
    let buffer = read_mesh_buffer(path)?;
    let mesh = processor.process(buffer)?;
    info!(
        "Loaded '{}': {} vertices, {} faces",
        path.display(),
        mesh.nb_vertices(),
        mesh.nb_faces()
    );
    Ok(mesh)
}

fn decode(ply: &Ply<DefaultElement>) -> PlyResult<MeshBuffer> {
    let vertex_def = ply
        .header
        .elements
        .get(VERTEX)
        .ok_or(PlyError::MissingElement(VERTEX))?;

    for property in POSITION_PROPERTIES {
        if !vertex_def.properties.contains_key(property) {
            return Err(PlyError::MissingProperty {
                element: VERTEX,
                property,
            });
        }
    }

    let color_names = COLOR_PROPERTIES
        .iter()
        .find(|names| names.iter().all(|n| vertex_def.properties.contains_key(*n)));

    let empty = Vec::new();
    let vertices = ply.payload.get(VERTEX).unwrap_or(&empty);

    let mut positions = Vec::with_capacity(vertices.len());
    let mut colors = color_names.map(|_| Vec::with_capacity(vertices.len()));

    for (index, vertex) in vertices.iter().enumerate() {
        positions.push(read_vec3(vertex, &POSITION_PROPERTIES, index)?);
        if let (Some(names), Some(colors)) = (color_names, colors.as_mut()) {
            colors.push(read_vec3(vertex, names, index)?);
        }
    }

    let mut faces = Vec::new();
    let mut face_materials = None;

    if let Some(face_def) = ply.header.elements.get(FACE) {
        let index_name = INDEX_PROPERTIES
            .iter()
            .copied()
            .find(|n| face_def.properties.contains_key(*n))
            .ok_or(PlyError::MissingProperty {
                element: FACE,
                property: INDEX_PROPERTIES[0],
            })?;

        let has_materials = face_def.properties.contains_key(MATERIAL_PROPERTY);
        let rows = ply.payload.get(FACE).unwrap_or(&empty);
        faces.reserve(rows.len());
        let mut materials = Vec::with_capacity(if has_materials { rows.len() } else { 0 });

        for (index, face) in rows.iter().enumerate() {
            faces.push(read_triangle(face, index_name, index)?);
            if has_materials {
                materials.push(read_material(face, index)?);
            }
        }

        if has_materials {
            face_materials = Some(materials);
        }
    }

    Ok(MeshBuffer {
        positions,
        colors,
        faces,
        face_materials,
    })
}

fn read_vec3(
    element: &DefaultElement,
    names: &[&'static str; 3],
    index: usize,
) -> PlyResult<[f32; 3]> {
    let mut out = [0.0; 3];
    for (value, &name) in out.iter_mut().zip(names) {
        *value = element
            .get(name)
            .and_then(scalar)
            .ok_or(PlyError::InvalidProperty {
                element: VERTEX,
                property: name,
                index,
            })? as f32;
    }
    Ok(out)
}

fn read_triangle(
    element: &DefaultElement,
    name: &'static str,
    index: usize,
) -> PlyResult<[u32; 3]> {
    let invalid = || PlyError::InvalidProperty {
        element: FACE,
        property: name,
        index,
    };

    let list = element.get(name).and_then(integer_list).ok_or_else(invalid)?;
    if list.len() != 3 {
        return Err(PlyError::NonTriangularFace {
            face: index,
            arity: list.len(),
        });
    }

    let mut triangle = [0u32; 3];
    for (slot, &value) in triangle.iter_mut().zip(&list) {
        *slot = u32::try_from(value).map_err(|_| invalid())?;
    }
    Ok(triangle)
}

/// Float-typed ids are accepted only when they hold a whole number
fn read_material(element: &DefaultElement, index: usize) -> PlyResult<u8> {
    let value = element
        .get(MATERIAL_PROPERTY)
        .and_then(scalar)
        .filter(|v| v.fract() == 0.0)
        .ok_or(PlyError::InvalidProperty {
            element: FACE,
            property: MATERIAL_PROPERTY,
            index,
        })? as i64;

    u8::try_from(value).map_err(|_| PlyError::InvalidMaterialId { face: index, value })
}

fn scalar(property: &Property) -> Option<f64> {
    match *property {
        Property::Char(v) => Some(v as f64),
        Property::UChar(v) => Some(v as f64),
        Property::Short(v) => Some(v as f64),
        Property::UShort(v) => Some(v as f64),
        Property::Int(v) => Some(v as f64),
        Property::UInt(v) => Some(v as f64),
        Property::Float(v) => Some(v as f64),
        Property::Double(v) => Some(v),
        _ => None,
    }
}

fn integer_list(property: &Property) -> Option<Vec<i64>> {
    fn widen<T: Copy + Into<i64>>(values: &[T]) -> Vec<i64> {
        values.iter().map(|&v| v.into()).collect()
    }

    match property {
        Property::ListChar(v) => Some(widen(v)),
        Property::ListUChar(v) => Some(widen(v)),
        Property::ListShort(v) => Some(widen(v)),
        Property::ListUShort(v) => Some(widen(v)),
        Property::ListInt(v) => Some(widen(v)),
        Property::ListUInt(v) => Some(widen(v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> PlyResult<MeshBuffer> {
        read_mesh_buffer_from(&mut text.as_bytes())
    }

    const TRIANGLE: &str = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
3 0 1 2
";

    #[test]
    fn test_parse_plain_triangle() {
        let buffer = parse(TRIANGLE).unwrap();
        assert_eq!(buffer.nb_vertices(), 3);
        assert_eq!(buffer.faces, vec![[0, 1, 2]]);
        assert!(!buffer.has_colors());
        assert!(!buffer.has_materials());
    }

    #[test]
    fn test_parse_colors_and_materials() {
        let text = "ply
format ascii 1.0
element vertex 3
property double x
property double y
property double z
property uchar red
property uchar green
property uchar blue
element face 1
property list uchar uint vertex_index
property int id
end_header
0 0 0 255 0 0
1 0 0 0 255 0
0 1 0 0 0 255
3 0 1 2 4
";
        let buffer = parse(text).unwrap();
        assert_eq!(
            buffer.colors,
            Some(vec![[255.0, 0.0, 0.0], [0.0, 255.0, 0.0], [0.0, 0.0, 255.0]])
        );
        assert_eq!(buffer.face_materials, Some(vec![4]));
    }

    #[test]
    fn test_reject_quads() {
        let text = TRIANGLE
            .replace("element vertex 3", "element vertex 4")
            .replace("0 1 0\n3 0 1 2", "0 1 0\n1 1 0\n4 0 1 3 2");
        assert!(matches!(
            parse(&text),
            Err(PlyError::NonTriangularFace { face: 0, arity: 4 })
        ));
    }

    #[test]
    fn test_reject_out_of_range_index() {
        let text = TRIANGLE.replace("3 0 1 2", "3 0 1 5");
        assert!(matches!(parse(&text), Err(PlyError::Mesh(_))));
    }

    #[test]
    fn test_reject_large_material_id() {
        let text = TRIANGLE
            .replace(
                "property list uchar int vertex_indices",
                "property list uchar int vertex_indices\nproperty int id",
            )
            .replace("3 0 1 2", "3 0 1 2 300");
        assert!(matches!(
            parse(&text),
            Err(PlyError::InvalidMaterialId {
                face: 0,
                value: 300
            })
        ));
    }

    #[test]
    fn test_float_material_ids() {
        let with_float_id = |id: &str| {
            TRIANGLE
                .replace(
                    "property list uchar int vertex_indices",
                    "property list uchar int vertex_indices\nproperty float id",
                )
                .replace("3 0 1 2", &format!("3 0 1 2 {id}"))
        };

        let buffer = parse(&with_float_id("3.0")).unwrap();
        assert_eq!(buffer.face_materials, Some(vec![3]));

        assert!(matches!(
            parse(&with_float_id("2.7")),
            Err(PlyError::InvalidProperty {
                element: "face",
                property: "id",
                index: 0
            })
        ));
    }

    #[test]
    fn test_missing_vertex_element() {
        let text = "ply\nformat ascii 1.0\nelement face 0\nproperty list uchar int vertex_indices\nend_header\n";
        assert!(matches!(
            parse(text),
            Err(PlyError::MissingElement("vertex"))
        ));
    }

    #[test]
    fn test_missing_position_property() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nend_header\n0 0\n";
        assert!(matches!(
            parse(text),
            Err(PlyError::MissingProperty {
                element: "vertex",
                property: "z"
            })
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            parse("not a ply file"),
            Err(PlyError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            read_mesh_buffer("/nonexistent/mesh.ply"),
            Err(PlyError::Io { .. })
        ));
    }
}
