use std::path::PathBuf;

use cgmath::{InnerSpace, Vector3};
use plyviewer::{
    error::PlyError,
    mesh::{load_mesh, read_mesh_buffer_from, Mesh, MeshProcessor},
};

fn model(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data/models")
        .join(name)
}

fn temp_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("plyviewer_{}_{name}", std::process::id()))
}

fn assert_unit_normals(mesh: &Mesh) {
    for (i, vertex) in mesh.vertices().iter().enumerate() {
        let length = Vector3::from(vertex.normal).magnitude();
        assert!((length - 1.0).abs() < 1e-5, "vertex {i} normal has length {length}");
    }
}

#[test]
fn test_plain_cube_end_to_end() {
    let mesh = load_mesh(model("cube.ply"), &MeshProcessor::default()).unwrap();

    assert_eq!(mesh.nb_vertices(), 8);
    assert_eq!(mesh.nb_faces(), 12);
    assert!(!mesh.has_colors());
    assert!(!mesh.has_materials());

    let bounds = mesh.bounding_box();
    assert_eq!(bounds.min, Vector3::new(0.0, 0.0, 0.0));
    assert_eq!(bounds.max, Vector3::new(1.0, 1.0, 1.0));
    assert_unit_normals(&mesh);
}

#[test]
fn test_cube_normals_point_outwards() {
    let mesh = load_mesh(model("cube.ply"), &MeshProcessor::default()).unwrap();
    let center = mesh.bounding_box().center();

    for vertex in mesh.vertices() {
        let outwards = Vector3::from(vertex.position) - center;
        assert!(Vector3::from(vertex.normal).dot(outwards) > 0.0);
    }
}

#[test]
fn test_export_round_trip_keeps_everything() {
    for name in ["cube.ply", "cube_rgb.ply", "cube_m.ply", "cube_rgbm.ply"] {
        let original = load_mesh(model(name), &MeshProcessor::default()).unwrap();
        let path = temp_file(name);
        original.export_ply(&path).unwrap();
        let reloaded = load_mesh(&path, &MeshProcessor::default()).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(reloaded.nb_vertices(), original.nb_vertices(), "{name}");
        assert_eq!(reloaded.nb_faces(), original.nb_faces(), "{name}");
        assert_eq!(reloaded.faces(), original.faces(), "{name}");
        assert_eq!(reloaded.has_colors(), original.has_colors(), "{name}");
        assert_eq!(reloaded.has_materials(), original.has_materials(), "{name}");
        assert_eq!(reloaded.face_materials(), original.face_materials(), "{name}");

        for (a, b) in original.vertices().iter().zip(reloaded.vertices()) {
            let distance = (Vector3::from(a.position) - Vector3::from(b.position)).magnitude();
            assert!(distance < 1e-6, "{name}");
            if original.has_colors() {
                let distance = (Vector3::from(a.color) - Vector3::from(b.color)).magnitude();
                assert!(distance < 1e-6, "{name}");
            }
        }
    }
}

#[test]
fn test_material_cube_is_sorted() {
    let mesh = load_mesh(model("cube_m.ply"), &MeshProcessor::default()).unwrap();

    assert!(mesh.is_sorted());
    assert!(mesh.face_materials().windows(2).all(|w| w[0] <= w[1]));
    let total: u32 = mesh.faces_per_material().iter().sum();
    assert_eq!(total as usize, mesh.nb_faces());
    assert_eq!(mesh.nb_materials(), mesh.material_range().count());
}

#[test]
fn test_force_unsorted_keeps_file_order() {
    let mesh = load_mesh(model("cube_m.ply"), &MeshProcessor::new(true)).unwrap();

    assert!(!mesh.is_sorted());
    assert_eq!(&mesh.face_materials()[..3], &[1, 2, 3]);
}

#[test]
fn test_unused_vertex_is_dropped() {
    let ply = "ply\n\
        format ascii 1.0\n\
        element vertex 5\n\
        property float x\n\
        property float y\n\
        property float z\n\
        element face 2\n\
        property list uchar int vertex_indices\n\
        end_header\n\
        0 0 0\n\
        1 0 0\n\
        5 5 5\n\
        1 1 0\n\
        0 1 0\n\
        3 0 1 3\n\
        3 0 3 4\n";

    let buffer = read_mesh_buffer_from(&mut ply.as_bytes()).unwrap();
    let mesh = MeshProcessor::default().process(buffer).unwrap();

    assert_eq!(mesh.nb_vertices(), 4);
    assert_eq!(mesh.faces(), &[[0, 1, 2], [0, 2, 3]]);
    assert!(mesh
        .vertices()
        .iter()
        .all(|v| v.position != [5.0, 5.0, 5.0]));
    assert_unit_normals(&mesh);
}

#[test]
fn test_bad_index_is_a_load_failure() {
    let ply = "ply\n\
        format ascii 1.0\n\
        element vertex 3\n\
        property float x\n\
        property float y\n\
        property float z\n\
        element face 1\n\
        property list uchar int vertex_indices\n\
        end_header\n\
        0 0 0\n\
        1 0 0\n\
        0 1 0\n\
        3 0 1 7\n";

    let err = read_mesh_buffer_from(&mut ply.as_bytes()).unwrap_err();
    assert!(matches!(err, PlyError::Mesh(_)));
}

#[test]
fn test_missing_file_reports_path() {
    let err = load_mesh(model("does_not_exist.ply"), &MeshProcessor::default()).unwrap_err();
    assert!(matches!(err, PlyError::Io { .. }));
    assert!(err.to_string().contains("does_not_exist.ply"));
}
