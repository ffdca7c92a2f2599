//! ASCII PLY export of a processed mesh

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::info;

use super::mesh::Mesh;
use crate::error::{PlyError, PlyResult};

impl Mesh {
    /// Writes the mesh as ASCII PLY.
    ///
    /// Colors are written as normalized floats, so reading the file back
    /// keeps them unchanged. Faces are written in their current order.
    pub fn write_ply<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "ply")?;
        writeln!(out, "format ascii 1.0")?;
        writeln!(out, "element vertex {}", self.nb_vertices())?;
        writeln!(out, "property float x")?;
        writeln!(out, "property float y")?;
        writeln!(out, "property float z")?;
        if self.has_colors() {
            writeln!(out, "property float red")?;
            writeln!(out, "property float green")?;
            writeln!(out, "property float blue")?;
        }
        writeln!(out, "element face {}", self.nb_faces())?;
        writeln!(out, "property list uchar uint vertex_index")?;
        if self.has_materials() {
            writeln!(out, "property int id")?;
        }
        writeln!(out, "end_header")?;

        for vertex in self.vertices() {
            let [x, y, z] = vertex.position;
            if self.has_colors() {
                let [r, g, b] = vertex.color;
                writeln!(out, "{x} {y} {z} {r} {g} {b}")?;
            } else {
                writeln!(out, "{x} {y} {z}")?;
            }
        }

        for (face, material) in self.faces().iter().zip(self.face_materials()) {
            let [a, b, c] = *face;
            if self.has_materials() {
                writeln!(out, "3 {a} {b} {c} {material}")?;
            } else {
                writeln!(out, "3 {a} {b} {c}")?;
            }
        }

        out.flush()
    }

    /// Exports the mesh to `path`, overwriting any existing file
    pub fn export_ply(&self, path: impl AsRef<Path>) -> PlyResult<()> {
        let path = path.as_ref();
        let export_error = |source| PlyError::Export {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(export_error)?;
        self.write_ply(&mut BufWriter::new(file))
            .map_err(export_error)?;

        info!("Exported mesh to '{}'", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::mesh::{MeshBuffer, MeshProcessor};

    fn export(buffer: MeshBuffer) -> String {
        let mesh = MeshProcessor::default().process(buffer).unwrap();
        let mut out = Vec::new();
        mesh.write_ply(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn triangle() -> MeshBuffer {
        MeshBuffer {
            positions: vec![[0.0, 0.0, 0.0], [1.5, 0.0, 0.0], [0.0, -2.0, 0.25]],
            colors: None,
            faces: vec![[0, 1, 2]],
            face_materials: None,
        }
    }

    #[test]
    fn test_export_plain_mesh() {
        let text = export(triangle());
        assert_eq!(
            text,
            "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar uint vertex_index
end_header
0 0 0
1.5 0 0
0 -2 0.25
3 0 1 2
"
        );
    }

    #[test]
    fn test_export_colors_and_materials() {
        let mut buffer = triangle();
        buffer.colors = Some(vec![[2.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.5]]);
        buffer.face_materials = Some(vec![9]);

        let text = export(buffer);
        assert!(text.contains("property float red\nproperty float green\nproperty float blue\n"));
        assert!(text.contains("property list uchar uint vertex_index\nproperty int id\nend_header\n"));
        assert!(text.contains("\n1.5 0 0 0 0.5 0\n"));
        assert!(text.ends_with("\n3 0 1 2 9\n"));
    }
}
