use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix, Vector3};
use log::debug;
use rand::Rng;
use wgpu::{util::DeviceExt, Device};

use super::light::{DirectionalLight, PointLight};
use crate::{
    gfx::{camera::Camera, resources::material::MaterialList},
    mesh::{Mesh, Viewport},
};

/// GPU copies of the mesh data
pub struct MeshBuffers {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    /// One `u32` material id per face, read by fragment shaders through
    /// `primitive_index`
    pub face_material_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffers {
    fn new(device: &Device, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(mesh.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        let face_materials: Vec<u32> = mesh.face_materials().iter().map(|&m| m as u32).collect();
        let face_material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Face Material Buffer"),
            contents: bytemuck::cast_slice(&face_materials),
            usage: wgpu::BufferUsages::STORAGE,
        });

        Self {
            vertex_buffer,
            index_buffer,
            face_material_buffer,
            index_count: mesh.indices().len() as u32,
        }
    }
}

/// Everything that gets drawn: the mesh, the camera looking at it and the
/// lights shading it.
///
/// The scene keeps revision counters for its lights and its mesh/material
/// setup. Renderers compare them against the last values they saw to know
/// when shaders need to be regenerated.
pub struct Scene {
    mesh: Option<Mesh>,
    camera: Camera,
    /// Use the free-fly camera instead of the orbital one
    pub navigate_3d: bool,
    directional_lights: Vec<DirectionalLight>,
    point_lights: Vec<PointLight>,
    pub ambient_color: Vector3<f32>,
    pub model_matrix: Matrix4<f32>,
    materials: Option<MaterialList>,
    lights_revision: u64,
    setup_revision: u64,
    buffers: Option<MeshBuffers>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene lit by one directional and one point light
    pub fn new() -> Self {
        Self {
            mesh: None,
            camera: Camera::default(),
            navigate_3d: false,
            directional_lights: vec![DirectionalLight::default()],
            point_lights: vec![PointLight::default()],
            ambient_color: Vector3::new(0.1, 0.1, 0.1),
            model_matrix: Matrix4::identity(),
            materials: None,
            lights_revision: 0,
            setup_revision: 0,
            buffers: None,
        }
    }

    pub fn with_mesh(mesh: Mesh) -> Self {
        let mut scene = Self::new();
        scene.set_mesh(mesh);
        scene
    }

    /// Replaces the mesh and frames the camera on it. GPU buffers are
    /// rebuilt on the next [`upload`](Self::upload).
    pub fn set_mesh(&mut self, mesh: Mesh) {
        self.camera.frame(&mesh.bounding_box());
        self.mesh = Some(mesh);
        self.buffers = None;
        self.setup_revision += 1;
    }

    pub fn take_mesh(&mut self) -> Option<Mesh> {
        self.buffers = None;
        self.setup_revision += 1;
        self.mesh.take()
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn material_list(&self) -> Option<&MaterialList> {
        self.materials.as_ref()
    }

    pub fn set_material_list(&mut self, materials: Option<MaterialList>) {
        self.materials = materials;
        self.setup_revision += 1;
    }

    /// Bumped whenever the mesh or the material list changes
    pub fn setup_revision(&self) -> u64 {
        self.setup_revision
    }

    pub fn directional_lights(&self) -> &[DirectionalLight] {
        &self.directional_lights
    }

    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    /// Bumped whenever a light is added or removed
    pub fn lights_revision(&self) -> u64 {
        self.lights_revision
    }

    pub fn add_directional_light(&mut self, light: DirectionalLight) {
        self.directional_lights.push(light);
        self.lights_revision += 1;
    }

    pub fn add_point_light(&mut self, light: PointLight) {
        self.point_lights.push(light);
        self.lights_revision += 1;
    }

    /// Adds a white point light somewhere on a sphere around the origin
    pub fn add_random_point_light<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let light = PointLight::random(rng, Vector3::new(1.0, 1.0, 1.0));
        debug!("Adding point light at {:?}", light.position);
        self.add_point_light(light);
    }

    pub fn remove_directional_light(&mut self, index: usize) -> Option<DirectionalLight> {
        (index < self.directional_lights.len()).then(|| {
            self.lights_revision += 1;
            self.directional_lights.remove(index)
        })
    }

    pub fn remove_point_light(&mut self, index: usize) -> Option<PointLight> {
        (index < self.point_lights.len()).then(|| {
            self.lights_revision += 1;
            self.point_lights.remove(index)
        })
    }

    pub fn update_camera_viewport(&mut self, width: u32, height: u32) {
        self.camera.viewport = Viewport::from_size(width as f32, height as f32);
    }

    /// View matrix of whichever camera mode is active
    pub fn view_matrix(&self) -> Matrix4<f32> {
        if self.navigate_3d {
            self.camera.compute_free_fly_view_matrix()
        } else {
            self.camera.compute_view_matrix()
        }
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.camera.compute_projection_matrix()
    }

    /// `transpose(inverse(upper3x3(view * model)))`, identity when singular
    pub fn normal_matrix(&self) -> Matrix3<f32> {
        let model_view = self.view_matrix() * self.model_matrix;
        let upper = Matrix3::from_cols(
            model_view.x.truncate(),
            model_view.y.truncate(),
            model_view.z.truncate(),
        );
        upper
            .invert()
            .map_or_else(Matrix3::identity, |inverse| inverse.transpose())
    }

    /// Creates the GPU buffers if the mesh has not been uploaded yet.
    /// A mesh without faces is never uploaded.
    pub fn upload(&mut self, device: &Device) {
        if self.buffers.is_some() {
            return;
        }
        let Some(mesh) = self.mesh.as_ref().filter(|m| m.nb_faces() > 0) else {
            return;
        };

        debug!(
            "Uploading mesh: {} vertices, {} faces",
            mesh.nb_vertices(),
            mesh.nb_faces()
        );
        self.buffers = Some(MeshBuffers::new(device, mesh));
    }

    pub fn buffers(&self) -> Option<&MeshBuffers> {
        self.buffers.as_ref()
    }

    /// Draws the mesh with the pipeline currently bound on `pass`.
    ///
    /// `material` selects the faces of one material of a sorted mesh, `None`
    /// draws every face. Returns false when there was nothing to draw.
    pub fn render_mesh(&self, pass: &mut wgpu::RenderPass<'_>, material: Option<usize>) -> bool {
        let (Some(mesh), Some(buffers)) = (self.mesh.as_ref(), self.buffers.as_ref()) else {
            return false;
        };

        let range = match material {
            Some(index) => mesh.index_range(index),
            None => 0..buffers.index_count,
        };
        if range.is_empty() {
            return false;
        }

        pass.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
        pass.set_index_buffer(buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(range, 0, 0..1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MeshBuffer, MeshProcessor};
    use cgmath::{Deg, InnerSpace};
    use rand::{rngs::StdRng, SeedableRng};

    fn triangle_mesh() -> Mesh {
        MeshProcessor::default()
            .process(MeshBuffer {
                positions: vec![[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                colors: None,
                faces: vec![[0, 1, 2]],
                face_materials: None,
            })
            .unwrap()
    }

    #[test]
    fn test_new_scene_has_default_lights() {
        let scene = Scene::new();
        assert_eq!(scene.directional_lights().len(), 1);
        assert_eq!(scene.point_lights().len(), 1);
        assert_eq!(scene.ambient_color, Vector3::new(0.1, 0.1, 0.1));
        assert!(scene.mesh().is_none());
    }

    #[test]
    fn test_light_changes_bump_revision() {
        let mut scene = Scene::new();
        let start = scene.lights_revision();

        scene.add_directional_light(DirectionalLight::default());
        scene.add_random_point_light(&mut StdRng::seed_from_u64(1));
        assert_eq!(scene.lights_revision(), start + 2);
        assert_eq!(scene.directional_lights().len(), 2);
        assert_eq!(scene.point_lights().len(), 2);

        assert!(scene.remove_point_light(5).is_none());
        assert_eq!(scene.lights_revision(), start + 2);
        assert!(scene.remove_point_light(0).is_some());
        assert_eq!(scene.lights_revision(), start + 3);
    }

    #[test]
    fn test_set_mesh_frames_camera() {
        let mut scene = Scene::new();
        let revision = scene.setup_revision();
        scene.set_mesh(triangle_mesh());

        let camera = scene.camera();
        assert_eq!(camera.scene_center, Vector3::new(1.0, 0.5, 0.0));
        assert_eq!(camera.scene_radius, 2.0);
        assert_eq!(camera.scene_distance, 6.0);
        assert!(scene.setup_revision() > revision);
        assert!(scene.buffers().is_none());
    }

    #[test]
    fn test_update_camera_viewport() {
        let mut scene = Scene::new();
        scene.update_camera_viewport(640, 480);
        assert_eq!(scene.camera().viewport, Viewport::from_size(640.0, 480.0));
    }

    #[test]
    fn test_normal_matrix_of_rotation_is_rotation() {
        let mut scene = Scene::with_mesh(triangle_mesh());
        scene.model_matrix = Matrix4::from_angle_y(Deg(30.0));

        let normal = scene.normal_matrix();
        let model_view = scene.view_matrix() * scene.model_matrix;
        let expected = Matrix3::from_cols(
            model_view.x.truncate(),
            model_view.y.truncate(),
            model_view.z.truncate(),
        );
        for c in 0..3 {
            assert!((normal[c] - expected[c]).magnitude() < 1e-5);
        }
    }

    #[test]
    fn test_normal_matrix_undoes_non_uniform_scale() {
        let mut scene = Scene::new();
        scene.navigate_3d = true;
        scene.camera_mut().position = Vector3::new(0.0, 0.0, 5.0);
        scene.camera_mut().front = Vector3::new(0.0, 0.0, -1.0);
        scene.model_matrix = Matrix4::from_nonuniform_scale(2.0, 1.0, 1.0);

        let normal = scene.normal_matrix();
        assert!((normal.x.x - 0.5).abs() < 1e-6);
        assert!((normal.y.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_view_matrix_follows_navigation_mode() {
        let mut scene = Scene::with_mesh(triangle_mesh());
        let orbital = scene.view_matrix();
        scene.navigate_3d = true;
        assert_ne!(orbital, scene.view_matrix());
        assert_eq!(scene.view_matrix(), scene.camera().compute_free_fly_view_matrix());
    }
}
