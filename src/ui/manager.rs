//! ImGui integration
//!
//! Owns the imgui context, the winit platform glue and the wgpu renderer
//! drawing the GUI over the scene.

use std::time::Instant;

use imgui::{FontConfig, FontSource, MouseCursor};
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use winit::{
    event::{Event, WindowEvent},
    window::{Window, WindowId},
};

use crate::{
    error::{RenderError, RenderResult},
    gfx::rendering::GpuContext,
};

pub const FONT_SIZE: f32 = 18.0;

pub struct UiManager {
    imgui: imgui::Context,
    platform: WinitPlatform,
    renderer: imgui_wgpu::Renderer,
    frame_start: Instant,
    cursor: Option<MouseCursor>,
}

impl UiManager {
    /// GUI drawing into the surface format of `gpu`. DPI is locked to 1.0 so
    /// GUI coordinates match surface pixels.
    pub fn new(gpu: &GpuContext, window: &Window) -> Self {
        let mut imgui = imgui::Context::create();
        imgui.set_ini_filename(None);

        let mut platform = WinitPlatform::new(&mut imgui);
        platform.attach_window(imgui.io_mut(), window, HiDpiMode::Locked(1.0));

        imgui.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                size_pixels: FONT_SIZE,
                oversample_h: 1,
                pixel_snap_h: true,
                ..FontConfig::default()
            }),
        }]);

        let renderer = imgui_wgpu::Renderer::new(
            &mut imgui,
            &gpu.device,
            &gpu.queue,
            imgui_wgpu::RendererConfig {
                texture_format: gpu.format(),
                ..imgui_wgpu::RendererConfig::default()
            },
        );

        Self {
            imgui,
            platform,
            renderer,
            frame_start: Instant::now(),
            cursor: None,
        }
    }

    /// Feeds a window event to imgui. Returns true when the GUI keeps the
    /// input for itself, in which case the camera must not see it.
    pub fn handle_input(&mut self, window: &Window, window_id: WindowId, event: &WindowEvent) -> bool {
        let wrapped: Event<()> = Event::WindowEvent {
            window_id,
            event: event.clone(),
        };
        self.platform.handle_event(self.imgui.io_mut(), window, &wrapped);

        match event {
            WindowEvent::KeyboardInput { .. } => self.wants_keyboard(),
            WindowEvent::CursorMoved { .. }
            | WindowEvent::MouseInput { .. }
            | WindowEvent::MouseWheel { .. } => self.wants_mouse(),
            _ => false,
        }
    }

    pub fn wants_mouse(&self) -> bool {
        self.imgui.io().want_capture_mouse
    }

    pub fn wants_keyboard(&self) -> bool {
        self.imgui.io().want_capture_keyboard
    }

    /// Starts a GUI frame and fills it with `build`
    pub fn build_frame<F>(&mut self, window: &Window, build: F) -> RenderResult<()>
    where
        F: FnOnce(&imgui::Ui),
    {
        let now = Instant::now();
        self.imgui
            .io_mut()
            .update_delta_time(now.duration_since(self.frame_start));
        self.frame_start = now;

        self.platform
            .prepare_frame(self.imgui.io_mut(), window)
            .map_err(RenderError::device)?;

        let ui = self.imgui.frame();
        build(ui);

        let cursor = ui.mouse_cursor();
        if cursor != self.cursor {
            self.cursor = cursor;
            self.platform.prepare_render(ui, window);
        }
        Ok(())
    }

    /// Draws the frame built by [`build_frame`](Self::build_frame) on top of
    /// whatever `target` already holds.
    pub fn draw_overlay(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
    ) -> RenderResult<()> {
        let draw_data = self.imgui.render();
        let [width, height] = draw_data.display_size;
        if width <= 0.0 || height <= 0.0 {
            return Ok(());
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GUI Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.renderer
            .render(draw_data, &gpu.queue, &gpu.device, &mut pass)
            .map_err(RenderError::device)
    }
}
