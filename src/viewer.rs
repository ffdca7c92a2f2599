//! Viewer context: the scene, its renderer and the file operations the UI
//! triggers on them.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use cgmath::Vector3;
use log::{info, warn};

use crate::{
    config::ViewerConfig,
    gfx::{
        rendering::{GpuContext, RenderTarget},
        scene::DirectionalLight,
        Renderer, RendererKind, Scene,
    },
    mesh::{load_mesh, Aabb3, MeshProcessor},
    notifier::Notifier,
};

/// Figures shown in the statistics panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshStats {
    pub nb_vertices: usize,
    pub nb_faces: usize,
    pub nb_materials: usize,
    pub has_colors: bool,
    pub has_materials: bool,
    pub sorted: bool,
    pub bounds: Aabb3,
}

pub struct Viewer {
    pub scene: Scene,
    pub renderer: Renderer,
    processor: MeshProcessor,
    notifier: Arc<dyn Notifier>,
    default_color: Vector3<f32>,
    mesh_path: Option<PathBuf>,
}

impl Viewer {
    pub fn new(config: &ViewerConfig, notifier: Arc<dyn Notifier>) -> Self {
        let mut scene = Scene::new();
        scene.set_material_list(Some(config.materials.clone()));

        let mut rng = rand::rng();
        for _ in 0..config.point_lights {
            scene.add_random_point_light(&mut rng);
        }

        let mut renderer = Renderer::new(config.renderer, config.shader_dir(), notifier.clone());
        renderer.clear_color = config.clear_color();
        if config.per_material {
            renderer.set_rendering_per_material(true, &scene);
        }

        let mut viewer = Self {
            scene,
            renderer,
            processor: MeshProcessor::new(config.force_unsorted),
            notifier,
            default_color: config.default_color.into(),
            mesh_path: None,
        };
        if let Some(path) = &config.mesh_path {
            viewer.load_file(path);
        }
        viewer
    }

    /// Replaces the current mesh with the file at `path`. On failure an
    /// alert is posted and the previous mesh stays.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match load_mesh(path, &self.processor) {
            Ok(mut mesh) => {
                mesh.change_default_color(self.default_color);
                self.scene.set_mesh(mesh);
                self.mesh_path = Some(path.to_path_buf());
                self.notifier.request_redraw();
                true
            }
            Err(e) => {
                warn!("Failed to load '{}': {e}", path.display());
                self.notifier.post_alert(&e.to_string());
                false
            }
        }
    }

    pub fn export_mesh(&self, path: impl AsRef<Path>) -> bool {
        let Some(mesh) = self.scene.mesh() else {
            self.notifier.post_alert("No mesh to export");
            return false;
        };
        match mesh.export_ply(path) {
            Ok(()) => true,
            Err(e) => {
                self.notifier.post_alert(&e.to_string());
                false
            }
        }
    }

    pub fn switch_renderer(&mut self, kind: RendererKind) {
        self.renderer.switch_kind(kind);
        self.notifier.request_redraw();
    }

    pub fn set_rendering_per_material(&mut self, enabled: bool) -> bool {
        self.renderer.set_rendering_per_material(enabled, &self.scene)
    }

    pub fn reload_shaders(&mut self) -> bool {
        info!("Reloading shaders");
        // Light or mesh changes since the last frame must be picked up first
        self.renderer.prepare(&self.scene);
        self.renderer.reload_shaders()
    }

    pub fn add_directional_light(&mut self) {
        self.scene.add_directional_light(DirectionalLight::default());
        self.notifier.request_redraw();
    }

    pub fn add_random_point_light(&mut self) {
        self.scene.add_random_point_light(&mut rand::rng());
        self.notifier.request_redraw();
    }

    /// Applies to the next loaded file
    pub fn set_force_unsorted(&mut self, force_unsorted: bool) {
        self.processor.force_unsorted = force_unsorted;
    }

    pub fn force_unsorted(&self) -> bool {
        self.processor.force_unsorted
    }

    pub fn mesh_path(&self) -> Option<&Path> {
        self.mesh_path.as_deref()
    }

    pub fn stats(&self) -> Option<MeshStats> {
        self.scene.mesh().map(|mesh| MeshStats {
            nb_vertices: mesh.nb_vertices(),
            nb_faces: mesh.nb_faces(),
            nb_materials: mesh.nb_materials(),
            has_colors: mesh.has_colors(),
            has_materials: mesh.has_materials(),
            sorted: mesh.is_sorted(),
            bounds: mesh.bounding_box(),
        })
    }

    pub fn render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
    ) -> &RenderTarget {
        self.renderer.render(gpu, encoder, &mut self.scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mesh::Mesh, notifier::AlertQueue};

    fn models() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/models")
    }

    fn viewer(config: ViewerConfig) -> (Viewer, Arc<AlertQueue>) {
        let alerts = Arc::new(AlertQueue::new());
        (Viewer::new(&config, alerts.clone()), alerts)
    }

    #[test]
    fn test_load_cube_from_config() {
        let config = ViewerConfig {
            mesh_path: Some(models().join("cube.ply")),
            default_color: [0.5, 0.25, 1.0],
            ..ViewerConfig::default()
        };
        let (viewer, alerts) = viewer(config);

        assert!(alerts.is_empty());
        let stats = viewer.stats().unwrap();
        assert_eq!(stats.nb_vertices, 8);
        assert_eq!(stats.nb_faces, 12);
        assert!(!stats.has_colors);

        let mesh = viewer.scene.mesh().unwrap();
        assert!(mesh.vertices().iter().all(|v| v.color == [0.5, 0.25, 1.0]));
    }

    #[test]
    fn test_failed_load_keeps_previous_mesh() {
        let (mut viewer, alerts) = viewer(ViewerConfig::default());
        assert!(viewer.load_file(models().join("cube_m.ply")));
        let revision = viewer.scene.setup_revision();

        assert!(!viewer.load_file(models().join("missing.ply")));
        assert_eq!(alerts.drain().len(), 1);
        assert_eq!(viewer.scene.setup_revision(), revision);
        assert_eq!(viewer.scene.mesh().map(Mesh::nb_faces), Some(12));
        assert!(viewer.mesh_path().unwrap().ends_with("cube_m.ply"));
    }

    #[test]
    fn test_export_round_trip() {
        let (mut viewer, alerts) = viewer(ViewerConfig::default());
        assert!(!viewer.export_mesh(std::env::temp_dir().join("plyviewer_empty.ply")));
        assert_eq!(alerts.drain(), vec!["No mesh to export".to_string()]);

        assert!(viewer.load_file(models().join("cube_rgbm.ply")));
        let path = std::env::temp_dir().join("plyviewer_viewer_export.ply");
        assert!(viewer.export_mesh(&path));

        let original = viewer.stats().unwrap();
        assert!(viewer.load_file(&path));
        let reloaded = viewer.stats().unwrap();
        assert_eq!(original.nb_faces, reloaded.nb_faces);
        assert_eq!(original.nb_materials, reloaded.nb_materials);
        assert!(reloaded.has_colors && reloaded.has_materials);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_lights_bump_revision() {
        let config = ViewerConfig {
            point_lights: 3,
            ..ViewerConfig::default()
        };
        let (mut viewer, alerts) = viewer(config);
        assert_eq!(viewer.scene.point_lights().len(), 4);

        let revision = viewer.scene.lights_revision();
        viewer.add_directional_light();
        viewer.add_random_point_light();
        assert_eq!(viewer.scene.directional_lights().len(), 2);
        assert_eq!(viewer.scene.point_lights().len(), 5);
        assert!(viewer.scene.lights_revision() > revision);
        assert!(alerts.take_redraw_request());
    }

    #[test]
    fn test_switch_renderer_keeps_clear_color() {
        let config = ViewerConfig {
            clear_color: [0.0, 0.5, 0.0, 1.0],
            ..ViewerConfig::default()
        };
        let (mut viewer, _) = viewer(config);
        viewer.switch_renderer(RendererKind::Simple);
        assert_eq!(viewer.renderer.kind(), RendererKind::Simple);
        assert_eq!(viewer.renderer.clear_color.g, 0.5);
    }
}
