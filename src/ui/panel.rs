//! Viewer panels: main menu, mesh statistics, shader sources, alerts and
//! frame rate.

use std::path::{Path, PathBuf};

use imgui::{Condition, TreeNodeFlags};

use crate::{gfx::RendererKind, viewer::Viewer};

/// Hands out identifiers for windows that can exist several times
#[derive(Debug, Default)]
pub struct PanelIds {
    next: usize,
}

impl PanelIds {
    pub fn next_id(&mut self) -> usize {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub id: usize,
    pub message: String,
}

/// GUI-only state, kept across frames
#[derive(Debug)]
pub struct UiState {
    ids: PanelIds,
    alerts: Vec<Alert>,
    pub show_stats: bool,
    pub show_shaders: bool,
    pub show_fps: bool,
    pub show_open: bool,
    pub show_export: bool,
    pub open_path: String,
    pub export_path: String,
    pub shader_export_dir: String,
    pub quit_requested: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            ids: PanelIds::default(),
            alerts: Vec::new(),
            show_stats: true,
            show_shaders: false,
            show_fps: true,
            show_open: false,
            show_export: false,
            open_path: String::new(),
            export_path: String::from("export.ply"),
            shader_export_dir: std::env::temp_dir().display().to_string(),
            quit_requested: false,
        }
    }
}

impl UiState {
    pub fn push_alert(&mut self, message: impl Into<String>) {
        let id = self.ids.next_id();
        self.alerts.push(Alert {
            id,
            message: message.into(),
        });
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn dismiss_alert(&mut self, id: usize) {
        self.alerts.retain(|alert| alert.id != id);
    }
}

/// Builds every panel for this frame
pub fn draw(ui: &imgui::Ui, state: &mut UiState, viewer: &mut Viewer) {
    let display_size = ui.io().display_size;
    if display_size[0] <= 0.0 || display_size[1] <= 0.0 {
        return;
    }

    main_menu(ui, state, viewer);
    if state.show_open {
        open_window(ui, state, viewer);
    }
    if state.show_export {
        export_window(ui, state, viewer);
    }
    if state.show_stats {
        stats_window(ui, state, viewer);
    }
    if state.show_shaders {
        shaders_window(ui, state, viewer);
    }
    if state.show_fps {
        fps_overlay(ui, display_size);
    }
    alert_windows(ui, state);
}

fn main_menu(ui: &imgui::Ui, state: &mut UiState, viewer: &mut Viewer) {
    ui.main_menu_bar(|| {
        ui.menu("File", || {
            if ui.menu_item("Open...") {
                if let Some(path) = viewer.mesh_path() {
                    state.open_path = path.display().to_string();
                }
                state.show_open = true;
            }
            if ui
                .menu_item_config("Export...")
                .enabled(viewer.scene.mesh().is_some())
                .build()
            {
                state.show_export = true;
            }
            ui.separator();
            if ui.menu_item_config("Quit").shortcut("Ctrl+Q").build() {
                state.quit_requested = true;
            }
        });

        ui.menu("Renderer", || {
            for kind in RendererKind::ALL {
                if ui
                    .menu_item_config(kind.name())
                    .selected(viewer.renderer.kind() == kind)
                    .build()
                {
                    viewer.switch_renderer(kind);
                }
            }
            ui.separator();
            let per_material = viewer.renderer.is_rendering_per_material();
            if ui
                .menu_item_config("Render per material")
                .selected(per_material)
                .build()
            {
                viewer.set_rendering_per_material(!per_material);
            }
            let force_unsorted = viewer.force_unsorted();
            if ui
                .menu_item_config("Keep file face order")
                .selected(force_unsorted)
                .build()
            {
                viewer.set_force_unsorted(!force_unsorted);
            }
            if ui.menu_item_config("Reload shaders").shortcut("R").build() {
                viewer.reload_shaders();
            }
        });

        ui.menu("Lights", || {
            if ui
                .menu_item_config("Add directional light")
                .shortcut("L")
                .build()
            {
                viewer.add_directional_light();
            }
            if ui
                .menu_item_config("Add random point light")
                .shortcut("Y")
                .build()
            {
                viewer.add_random_point_light();
            }
            ui.separator();
            let nb_directional = viewer.scene.directional_lights().len();
            if ui
                .menu_item_config("Remove directional light")
                .enabled(nb_directional > 0)
                .build()
            {
                viewer.scene.remove_directional_light(nb_directional - 1);
            }
            let nb_point = viewer.scene.point_lights().len();
            if ui
                .menu_item_config("Remove point light")
                .enabled(nb_point > 0)
                .build()
            {
                viewer.scene.remove_point_light(nb_point - 1);
            }
        });

        ui.menu("View", || {
            ui.menu_item_config("Statistics")
                .build_with_ref(&mut state.show_stats);
            ui.menu_item_config("Shaders")
                .build_with_ref(&mut state.show_shaders);
            ui.menu_item_config("FPS").build_with_ref(&mut state.show_fps);
            ui.separator();
            ui.menu_item_config("Free-fly camera")
                .build_with_ref(&mut viewer.scene.navigate_3d);
        });
    });
}

fn open_window(ui: &imgui::Ui, state: &mut UiState, viewer: &mut Viewer) {
    let mut opened = true;
    let mut load = false;
    ui.window("Open mesh")
        .opened(&mut opened)
        .size([520.0, 0.0], Condition::FirstUseEver)
        .build(|| {
            load |= ui
                .input_text("PLY file", &mut state.open_path)
                .enter_returns_true(true)
                .build();
            load |= ui.button("Open");
        });

    if load && viewer.load_file(PathBuf::from(state.open_path.trim())) {
        opened = false;
    }
    state.show_open = opened;
}

fn export_window(ui: &imgui::Ui, state: &mut UiState, viewer: &mut Viewer) {
    let mut opened = true;
    let mut export = false;
    ui.window("Export mesh")
        .opened(&mut opened)
        .size([520.0, 0.0], Condition::FirstUseEver)
        .build(|| {
            export |= ui
                .input_text("Destination", &mut state.export_path)
                .enter_returns_true(true)
                .build();
            export |= ui.button("Export");
        });

    if export && viewer.export_mesh(Path::new(state.export_path.trim())) {
        state.push_alert(format!("Mesh exported to '{}'", state.export_path.trim()));
        opened = false;
    }
    state.show_export = opened;
}

fn stats_window(ui: &imgui::Ui, state: &mut UiState, viewer: &Viewer) {
    ui.window("Mesh")
        .opened(&mut state.show_stats)
        .position([10.0, 30.0], Condition::FirstUseEver)
        .size([320.0, 0.0], Condition::FirstUseEver)
        .build(|| {
            let Some(stats) = viewer.stats() else {
                ui.text_disabled("No mesh loaded");
                return;
            };
            if let Some(path) = viewer.mesh_path() {
                let name = path.file_name().unwrap_or(path.as_os_str());
                ui.text(name.to_string_lossy());
            }
            ui.separator();
            ui.text(format!("Vertices: {}", stats.nb_vertices));
            ui.text(format!("Faces: {}", stats.nb_faces));
            ui.text(format!("Materials: {}", stats.nb_materials));
            ui.text(format!("Colors: {}", yes_no(stats.has_colors)));
            ui.text(format!("Material ids: {}", yes_no(stats.has_materials)));
            ui.text(format!("Sorted by material: {}", yes_no(stats.sorted)));

            let sizes = stats.bounds.sizes();
            ui.text(format!(
                "Size: {:.3} x {:.3} x {:.3}",
                sizes.x, sizes.y, sizes.z
            ));

            ui.separator();
            ui.text(format!("Renderer: {}", viewer.renderer.kind()));
            ui.text(format!(
                "Lights: {} directional, {} point",
                viewer.scene.directional_lights().len(),
                viewer.scene.point_lights().len()
            ));
            ui.text(format!(
                "Camera: {}",
                if viewer.scene.navigate_3d {
                    "free-fly"
                } else {
                    "orbital"
                }
            ));
        });
}

fn shaders_window(ui: &imgui::Ui, state: &mut UiState, viewer: &Viewer) {
    let mut opened = state.show_shaders;
    let mut export_failures = Vec::new();
    ui.window("Shaders")
        .opened(&mut opened)
        .size([640.0, 480.0], Condition::FirstUseEver)
        .build(|| {
            ui.input_text("Export directory", &mut state.shader_export_dir)
                .build();
            let export = ui.button("Export processed sources");
            let export_dir = PathBuf::from(state.shader_export_dir.trim());

            for (k, pass) in viewer.renderer.passes().iter().enumerate() {
                let program = pass.program();
                let label = match pass.material_index() {
                    Some(_) => format!("Pass {k} (material {})", pass.material_id()),
                    None => format!("Pass {k}"),
                };
                if export {
                    let vertex = export_dir.join(format!("pass{k}.vert.wgsl"));
                    let fragment = export_dir.join(format!("pass{k}.frag.wgsl"));
                    if let Err(e) = program.export_sources(&vertex, &fragment) {
                        export_failures.push(e.to_string());
                    }
                }
                if !ui.collapsing_header(&label, TreeNodeFlags::empty()) {
                    continue;
                }
                let _id = ui.push_id_usize(k);
                source_section(ui, "Vertex", program.vertex_path(), program.vertex_source());
                source_section(
                    ui,
                    "Fragment",
                    program.fragment_path(),
                    program.fragment_source(),
                );
            }
        });
    state.show_shaders = opened;
    for failure in export_failures {
        state.push_alert(failure);
    }
}

fn source_section(ui: &imgui::Ui, stage: &str, path: &Path, source: Option<&str>) {
    ui.text(format!("{stage}: {}", path.display()));
    match source {
        Some(source) => {
            ui.child_window(stage)
                .size([0.0, 200.0])
                .border(true)
                .horizontal_scrollbar(true)
                .build(|| ui.text(source));
        }
        None => ui.text_disabled("not loaded"),
    }
}

fn fps_overlay(ui: &imgui::Ui, display_size: [f32; 2]) {
    ui.window("##fps")
        .position([display_size[0] - 110.0, 30.0], Condition::Always)
        .size([100.0, 0.0], Condition::Always)
        .no_decoration()
        .no_inputs()
        .bg_alpha(0.35)
        .build(|| {
            ui.text(format!("{:.0} FPS", ui.io().framerate));
        });
}

fn alert_windows(ui: &imgui::Ui, state: &mut UiState) {
    let mut dismissed = Vec::new();
    for (k, alert) in state.alerts.iter().enumerate() {
        let mut opened = true;
        let offset = 20.0 * (k % 8) as f32;
        ui.window(format!("Alert##{}", alert.id))
            .opened(&mut opened)
            .position([200.0 + offset, 120.0 + offset], Condition::FirstUseEver)
            .size([420.0, 0.0], Condition::FirstUseEver)
            .collapsible(false)
            .build(|| {
                ui.text_wrapped(&alert.message);
                if ui.button("OK") {
                    dismissed.push(alert.id);
                }
            });
        if !opened {
            dismissed.push(alert.id);
        }
    }
    for id in dismissed {
        state.dismiss_alert(id);
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
