//! # User Interface
//!
//! Dear ImGui overlay drawn on top of the rendered scene.
//!
//! - [`UiManager`] - imgui context, winit glue and wgpu drawing
//! - [`panel`] - menu bar, statistics, shader sources, alerts and FPS
//!
//! Panels act on the [`Viewer`](crate::viewer::Viewer) directly. Alerts
//! posted by the core through an [`AlertQueue`](crate::notifier::AlertQueue)
//! are moved into [`UiState`] once per frame and stay on screen until
//! dismissed.

pub mod manager;
pub mod panel;

pub use manager::UiManager;
pub use panel::{PanelIds, UiState};
