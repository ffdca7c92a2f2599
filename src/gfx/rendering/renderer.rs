//! Scene renderers
//!
//! A [`Renderer`] owns a set of shader programs and draws the [`Scene`] into
//! an off-screen [`RenderTarget`]. Two kinds exist:
//!
//! - [`RendererKind::Simple`] shades with the surface color only
//! - [`RendererKind::Forward`] adds Lambert lighting from every scene light,
//!   with the light counts compiled into the shaders as `NB_DIR_LIGHTS` and
//!   `NB_PT_LIGHTS`
//!
//! Both render either the whole mesh with one program, or one program per
//! material when rendering per material.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use log::{debug, info, warn};

use super::{
    gpu_context::GpuContext,
    render_target::{RenderTarget, DEPTH_FORMAT},
    shader_program::{MaterialBinding, ShaderProgram, FRAGMENT_ENTRY_POINT, VERTEX_ENTRY_POINT},
    uniforms::FrameUniforms,
};
use crate::{
    error::{RenderError, RenderResult},
    gfx::scene::{DirectionalLightRaw, PointLightRaw, Scene, Vertex},
    notifier::Notifier,
    wgpu_utils::{storage_buffer_read_only, uniform, ArrayBuffer, UniformBuffer},
};

pub const NB_DIR_LIGHTS_MACRO: &str = "NB_DIR_LIGHTS";
pub const NB_PT_LIGHTS_MACRO: &str = "NB_PT_LIGHTS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RendererKind {
    Simple,
    #[default]
    Forward,
}

impl RendererKind {
    pub const ALL: [RendererKind; 2] = [RendererKind::Simple, RendererKind::Forward];

    pub fn name(self) -> &'static str {
        match self {
            RendererKind::Simple => "simple",
            RendererKind::Forward => "forward",
        }
    }

    /// Whether the shaders read the scene lights
    pub fn uses_lights(self) -> bool {
        self == RendererKind::Forward
    }

    /// `<dir>/<name>.vert.wgsl` and `<dir>/<name>.frag.wgsl`
    pub fn shader_paths(self, shader_dir: &Path) -> (PathBuf, PathBuf) {
        (
            shader_dir.join(format!("{}.vert.wgsl", self.name())),
            shader_dir.join(format!("{}.frag.wgsl", self.name())),
        )
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RendererKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RendererKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown renderer '{s}', expected 'simple' or 'forward'"))
    }
}

/// One program and the GPU objects drawing with it
pub struct ShaderPass {
    program: ShaderProgram,
    material_id: u8,
    /// Material index whose faces this pass draws, `None` for every face
    material_index: Option<usize>,
    pipeline: Option<wgpu::RenderPipeline>,
    pipeline_generation: u64,
    uniforms: Option<UniformBuffer<FrameUniforms>>,
    bind_group: Option<wgpu::BindGroup>,
}

impl ShaderPass {
    fn new(program: ShaderProgram, material_id: u8, material_index: Option<usize>) -> Self {
        Self {
            program,
            material_id,
            material_index,
            pipeline: None,
            pipeline_generation: 0,
            uniforms: None,
            bind_group: None,
        }
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn material_id(&self) -> u8 {
        self.material_id
    }

    pub fn material_index(&self) -> Option<usize> {
        self.material_index
    }
}

struct GpuState {
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    directional_lights: ArrayBuffer<DirectionalLightRaw>,
    point_lights: ArrayBuffer<PointLightRaw>,
    target: RenderTarget,
    /// Scene setup the bind groups were built against
    bound_revision: Option<u64>,
}

impl GpuState {
    fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: uniform(),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: storage_buffer_read_only(),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: storage_buffer_read_only(),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: storage_buffer_read_only(),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let (width, height) = gpu.size();
        Self {
            bind_group_layout,
            pipeline_layout,
            directional_lights: ArrayBuffer::new(device, 4),
            point_lights: ArrayBuffer::new(device, 4),
            target: RenderTarget::new(device, gpu.format(), width, height),
            bound_revision: None,
        }
    }
}

pub struct Renderer {
    kind: RendererKind,
    shader_dir: PathBuf,
    per_material: bool,
    pub clear_color: wgpu::Color,
    notifier: Arc<dyn Notifier>,
    passes: Vec<ShaderPass>,
    synced_setup: Option<u64>,
    synced_lights: Option<u64>,
    gpu: Option<GpuState>,
}

impl Renderer {
    /// Renderer loading its shaders from `shader_dir`. Shaders are built on
    /// the first [`prepare`](Self::prepare) against a scene.
    pub fn new(kind: RendererKind, shader_dir: impl Into<PathBuf>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            kind,
            shader_dir: shader_dir.into(),
            per_material: false,
            clear_color: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
            notifier,
            passes: Vec::new(),
            synced_setup: None,
            synced_lights: None,
            gpu: None,
        }
    }

    pub fn kind(&self) -> RendererKind {
        self.kind
    }

    pub fn shader_dir(&self) -> &Path {
        &self.shader_dir
    }

    pub fn is_rendering_per_material(&self) -> bool {
        self.per_material
    }

    pub fn passes(&self) -> &[ShaderPass] {
        &self.passes
    }

    pub fn render_target(&self) -> Option<&RenderTarget> {
        self.gpu.as_ref().map(|gpu| &gpu.target)
    }

    /// Changes the renderer kind, keeping the clear color and the
    /// per-material mode. Shaders are rebuilt on the next prepare.
    pub fn switch_kind(&mut self, kind: RendererKind) {
        if kind == self.kind {
            return;
        }
        info!("Switching to {kind} renderer");
        self.kind = kind;
        self.passes.clear();
        self.synced_setup = None;
        self.synced_lights = None;
    }

    /// Toggles one program per material. Refused, with an alert, when the
    /// mesh faces are not sorted by material. Returns the resulting mode.
    pub fn set_rendering_per_material(&mut self, enabled: bool, scene: &Scene) -> bool {
        if enabled == self.per_material {
            return self.per_material;
        }
        if enabled && !Self::can_render_per_material(scene) {
            self.notifier
                .post_alert("Rendering per material needs a mesh whose faces are sorted by material");
            return false;
        }
        self.per_material = enabled;
        self.init_shaders(scene);
        self.per_material
    }

    fn can_render_per_material(scene: &Scene) -> bool {
        scene.mesh().is_none_or(|mesh| mesh.is_sorted())
    }

    /// Rebuilds the program set for the scene's mesh and materials
    pub fn init_shaders(&mut self, scene: &Scene) {
        if self.per_material && !Self::can_render_per_material(scene) {
            warn!("Mesh faces are not sorted by material, rendering in one pass");
            self.notifier
                .post_alert("Mesh faces are not sorted by material, rendering in one pass");
            self.per_material = false;
        }

        let (vertex_path, fragment_path) = self.kind.shader_paths(&self.shader_dir);
        let (range, nb_materials) = scene
            .mesh()
            .map_or((Default::default(), 1), |m| (m.material_range(), m.nb_materials()));
        let materials = scene.material_list();

        self.passes = if self.per_material {
            (0..nb_materials)
                .map(|k| {
                    let id = range.min + k as u8;
                    let mut program = ShaderProgram::new(&vertex_path, &fragment_path);
                    if let Some(list) = materials {
                        program.set_materials(MaterialBinding::Single(
                            list.material_path(id).to_path_buf(),
                        ));
                    }
                    ShaderPass::new(program, id, Some(k))
                })
                .collect()
        } else {
            let mut program = ShaderProgram::new(&vertex_path, &fragment_path);
            if let Some(list) = materials {
                program.set_materials(MaterialBinding::Chain {
                    materials: list.clone(),
                    ids: range.ids().collect(),
                });
            }
            vec![ShaderPass::new(program, range.min, None)]
        };

        if self.kind.uses_lights() {
            for pass in &mut self.passes {
                set_light_macros(&mut pass.program, scene);
            }
        }

        debug!(
            "Initialised {} {} shader program(s)",
            self.passes.len(),
            self.kind
        );
        self.reload_shaders();
        self.synced_setup = Some(scene.setup_revision());
        self.synced_lights = Some(scene.lights_revision());
    }

    /// Reloads every program from its files. Programs failing to load keep
    /// their previous version. Returns true when all succeeded.
    pub fn reload_shaders(&mut self) -> bool {
        let mut all_loaded = true;
        for pass in &mut self.passes {
            if let Err(e) = pass.program.load() {
                warn!("Shader reload failed: {e}");
                self.notifier.post_alert(&e.to_string());
                all_loaded = false;
            }
        }
        self.notifier.request_redraw();
        all_loaded
    }

    /// Recompiles the programs whose light counts changed
    pub fn sync_lights(&mut self, scene: &Scene) {
        self.synced_lights = Some(scene.lights_revision());
        if !self.kind.uses_lights() {
            return;
        }

        for pass in &mut self.passes {
            if set_light_macros(&mut pass.program, scene) {
                if let Err(e) = pass.program.load() {
                    warn!("Shader reload after light change failed: {e}");
                    self.notifier.post_alert(&e.to_string());
                }
            }
        }
    }

    /// Brings the programs up to date with the scene
    pub fn prepare(&mut self, scene: &Scene) {
        if self.synced_setup != Some(scene.setup_revision()) {
            self.init_shaders(scene);
        } else if self.synced_lights != Some(scene.lights_revision()) {
            self.sync_lights(scene);
        }
    }

    /// Draws the scene into the render target, resized to the surface.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        scene: &mut Scene,
    ) -> &RenderTarget {
        self.prepare(scene);

        let (width, height) = gpu.size();
        scene.update_camera_viewport(width, height);
        scene.upload(&gpu.device);

        let state = self.gpu.get_or_insert_with(|| GpuState::new(gpu));
        state.target.resize(&gpu.device, width, height);

        let mut rebind = state.bound_revision != Some(scene.setup_revision());
        if self.kind.uses_lights() {
            let directional: Vec<DirectionalLightRaw> =
                scene.directional_lights().iter().map(|l| l.to_raw()).collect();
            let points: Vec<PointLightRaw> = scene.point_lights().iter().map(|l| l.to_raw()).collect();
            rebind |= state
                .directional_lights
                .update_data(&gpu.device, &gpu.queue, &directional);
            rebind |= state.point_lights.update_data(&gpu.device, &gpu.queue, &points);
        }
        state.bound_revision = Some(scene.setup_revision());

        for pass in &mut self.passes {
            if pass.program.is_loaded() && pass.pipeline_generation != pass.program.generation() {
                pass.pipeline_generation = pass.program.generation();
                match create_pipeline(gpu, &state.pipeline_layout, &pass.program) {
                    Ok(pipeline) => pass.pipeline = Some(pipeline),
                    Err(e) => {
                        warn!("Keeping previous pipeline: {e}");
                        self.notifier.post_alert(&e.to_string());
                    }
                }
            }

            let uniforms = pass
                .uniforms
                .get_or_insert_with(|| UniformBuffer::new(&gpu.device));
            uniforms.update_content(&gpu.queue, FrameUniforms::new(scene, pass.material_id));

            if rebind {
                pass.bind_group = None;
            }
            if pass.bind_group.is_none() {
                if let Some(buffers) = scene.buffers() {
                    pass.bind_group = Some(gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("Scene Bind Group"),
                        layout: &state.bind_group_layout,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: uniforms.binding_resource(),
                            },
                            wgpu::BindGroupEntry {
                                binding: 1,
                                resource: state.directional_lights.binding_resource(),
                            },
                            wgpu::BindGroupEntry {
                                binding: 2,
                                resource: state.point_lights.binding_resource(),
                            },
                            wgpu::BindGroupEntry {
                                binding: 3,
                                resource: buffers.face_material_buffer.as_entire_binding(),
                            },
                        ],
                    }));
                }
            }
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &state.target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &state.target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for pass in &self.passes {
                let (Some(pipeline), Some(bind_group)) = (&pass.pipeline, &pass.bind_group) else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, bind_group, &[]);
                scene.render_mesh(&mut render_pass, pass.material_index);
            }
        }

        &state.target
    }
}

/// Sets the light count macros from the scene. Returns true if one changed.
fn set_light_macros(program: &mut ShaderProgram, scene: &Scene) -> bool {
    let directional = program.set_macro(NB_DIR_LIGHTS_MACRO, scene.directional_lights().len() as u32);
    let points = program.set_macro(NB_PT_LIGHTS_MACRO, scene.point_lights().len() as u32);
    directional || points
}

/// Builds the pipeline of a loaded program. wgpu validation errors are
/// caught and returned instead of being raised on the device.
fn create_pipeline(
    gpu: &GpuContext,
    layout: &wgpu::PipelineLayout,
    program: &ShaderProgram,
) -> RenderResult<wgpu::RenderPipeline> {
    let compiled = program
        .program()
        .ok_or_else(|| RenderError::device("shader program is not loaded"))?;
    let device = &gpu.device;

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Vertex Shader"),
        source: wgpu::ShaderSource::Wgsl(compiled.vertex_source().into()),
    });
    let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Fragment Shader"),
        source: wgpu::ShaderSource::Wgsl(compiled.fragment_source().into()),
    });

    let attributes = Vertex::attributes(|attribute| program.attribute_location(attribute));
    let label = format!("{} Pipeline", program.fragment_path().display());

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &vertex_module,
            entry_point: Some(VERTEX_ENTRY_POINT),
            buffers: &[Vertex::desc(&attributes)],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some(FRAGMENT_ENTRY_POINT),
            targets: &[Some(wgpu::ColorTargetState {
                format: gpu.format(),
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(RenderError::device(error)),
        None => Ok(pipeline),
    }
}
