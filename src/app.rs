use std::sync::Arc;

use anyhow::Context as _;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    config::ViewerConfig,
    error::{RenderError, RenderResult},
    gfx::{camera::CameraController, rendering::GpuContext},
    notifier::AlertQueue,
    ui::{panel, UiManager, UiState},
    viewer::Viewer,
};

/// Windowed viewer: owns the event loop and everything drawn in it
pub struct ViewerApp {
    event_loop: EventLoop<()>,
    app_state: AppState,
}

struct AppState {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    ui_manager: Option<UiManager>,
    ui_state: UiState,
    viewer: Viewer,
    controller: CameraController,
    alerts: Arc<AlertQueue>,
    modifiers: ModifiersState,
    fatal: Option<anyhow::Error>,
}

impl ViewerApp {
    pub fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("failed to create the event loop")?;
        let alerts = Arc::new(AlertQueue::new());
        let viewer = Viewer::new(&config, alerts.clone());

        Ok(Self {
            event_loop,
            app_state: AppState {
                config,
                window: None,
                gpu: None,
                ui_manager: None,
                ui_state: UiState::default(),
                viewer,
                controller: CameraController::default(),
                alerts,
                modifiers: ModifiersState::empty(),
                fatal: None,
            },
        })
    }

    /// Runs until the window is closed
    pub fn run(mut self) -> anyhow::Result<()> {
        // Frames are drawn on demand
        self.event_loop.set_control_flow(ControlFlow::Wait);
        self.event_loop
            .run_app(&mut self.app_state)
            .context("event loop failed")?;

        match self.app_state.fatal.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn request_redraw(&self) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    /// Shortcuts that act on the viewer rather than the camera
    fn handle_shortcut(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) -> bool {
        if event.state != ElementState::Pressed || event.repeat {
            return false;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return false;
        };

        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyQ if self.modifiers.control_key() => event_loop.exit(),
            KeyCode::KeyL => self.viewer.add_directional_light(),
            KeyCode::KeyY => self.viewer.add_random_point_light(),
            KeyCode::KeyR => {
                self.viewer.reload_shaders();
            }
            _ => return false,
        }
        true
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> RenderResult<()> {
        let (Some(window), Some(gpu), Some(ui_manager)) = (
            self.window.as_ref(),
            self.gpu.as_mut(),
            self.ui_manager.as_mut(),
        ) else {
            return Ok(());
        };

        for alert in self.alerts.drain() {
            self.ui_state.push_alert(alert);
        }

        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (width, height) = gpu.size();
                gpu.resize(width, height);
                window.request_redraw();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timed out waiting for the surface texture");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let ui_state = &mut self.ui_state;
        let viewer = &mut self.viewer;
        ui_manager.build_frame(window, |ui| panel::draw(ui, ui_state, viewer))?;
        if ui_state.quit_requested {
            event_loop.exit();
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let target = viewer.render(gpu, &mut encoder);
        let (width, height) = target.size();
        encoder.copy_texture_to_texture(
            target.color.as_image_copy(),
            frame.texture.as_image_copy(),
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        ui_manager.draw_overlay(gpu, &mut encoder, &view)?;

        gpu.queue.submit(std::iter::once(encoder.finish()));
        window.pre_present_notify();
        frame.present();

        if self.alerts.take_redraw_request() {
            window.request_redraw();
        }
        Ok(())
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {e}");
                self.fatal = Some(anyhow::anyhow!("failed to create window: {e}"));
                event_loop.exit();
                return;
            }
        };

        let (width, height) = window.inner_size().into();
        let gpu = match pollster::block_on(GpuContext::new(window.clone(), width, height)) {
            Ok(gpu) => gpu,
            Err(e) => {
                error!("Failed to initialise the GPU: {e}");
                self.fatal = Some(e.into());
                event_loop.exit();
                return;
            }
        };

        let ui_manager = UiManager::new(&gpu, &window);
        info!("Window ready ({width}x{height})");

        self.ui_manager = Some(ui_manager);
        self.gpu = Some(gpu);
        self.window = Some(window);
        self.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };

        if let Some(ui_manager) = self.ui_manager.as_mut() {
            if ui_manager.handle_input(&window, window_id, &event) {
                window.request_redraw();
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(width, height);
                }
                window.request_redraw();
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let moved = self
                    .controller
                    .process_keyed_events(&event, &mut self.viewer.scene);
                if moved || self.handle_shortcut(event_loop, &event) {
                    window.request_redraw();
                }
            }
            WindowEvent::CursorMoved { .. } | WindowEvent::MouseInput { .. } => {
                // Keeps hover feedback in the GUI current
                window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw(event_loop) {
                    match e {
                        RenderError::Surface(wgpu::SurfaceError::OutOfMemory) => {
                            error!("Out of GPU memory");
                            self.fatal = Some(e.into());
                            event_loop.exit();
                        }
                        e => error!("Frame failed: {e}"),
                    }
                }
            }
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if self
            .ui_manager
            .as_ref()
            .is_some_and(|ui_manager| ui_manager.wants_mouse())
        {
            return;
        }

        if self
            .controller
            .process_events(&event, &mut self.viewer.scene)
        {
            self.request_redraw();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.alerts.take_redraw_request() {
            self.request_redraw();
        }
    }
}
