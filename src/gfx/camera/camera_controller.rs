use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
};

use cgmath::Vector2;

use crate::gfx::scene::Scene;

/// Keyboard step for both orbit and free-fly moves
pub const MOVEMENT_SPEED: f32 = 0.1;
/// Multiplier applied while Shift is held
pub const FAST_FACTOR: f32 = 5.0;
/// Degrees of yaw/pitch per pixel of mouse motion
pub const MOUSE_SPEED: f32 = 0.1;

/// Maps raw input onto the scene camera.
///
/// Arrows orbit, O/P zoom, WASD fly, and dragging with the left button turns
/// the free-fly camera. Orbit and zoom switch the scene back to orbital
/// navigation, flying and dragging switch it to free-fly.
pub struct CameraController {
    pub movement_speed: f32,
    pub mouse_speed: f32,
    pub scroll_speed: f32,
    is_shift_held: bool,
    is_mouse_pressed: bool,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(MOVEMENT_SPEED, MOUSE_SPEED)
    }
}

impl CameraController {
    pub fn new(movement_speed: f32, mouse_speed: f32) -> Self {
        Self {
            movement_speed,
            mouse_speed,
            scroll_speed: 0.02,
            is_shift_held: false,
            is_mouse_pressed: false,
        }
    }

    fn step(&self) -> f32 {
        if self.is_shift_held {
            self.movement_speed * FAST_FACTOR
        } else {
            self.movement_speed
        }
    }

    /// Returns true when the event moved the camera
    pub fn process_events(&mut self, event: &DeviceEvent, scene: &mut Scene) -> bool {
        match event {
            DeviceEvent::Button {
                button: 0, // Left Mouse Button
                state,
            } => {
                self.is_mouse_pressed = *state == ElementState::Pressed;
                false
            }
            DeviceEvent::MouseWheel { delta } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => {
                        *y as f32 * self.scroll_speed
                    }
                };
                scene.camera_mut().zoom_polar(-scroll * self.movement_speed);
                true
            }
            DeviceEvent::MouseMotion { delta } if self.is_mouse_pressed => {
                scene.navigate_3d = true;
                let camera = scene.camera_mut();
                camera.move_yaw(delta.0 as f32 * self.mouse_speed);
                camera.move_pitch(-delta.1 as f32 * self.mouse_speed);
                true
            }
            _ => false,
        }
    }

    /// Returns true when the key moved the camera
    pub fn process_keyed_events(&mut self, event: &KeyEvent, scene: &mut Scene) -> bool {
        let PhysicalKey::Code(code) = event.physical_key else {
            return false;
        };

        if matches!(code, KeyCode::ShiftLeft | KeyCode::ShiftRight) {
            self.is_shift_held = event.state == ElementState::Pressed;
            return false;
        }

        if event.state != ElementState::Pressed {
            return false;
        }

        let step = self.step();
        match code {
            KeyCode::ArrowLeft => self.orbit(scene, Vector2::new(step, 0.0)),
            KeyCode::ArrowRight => self.orbit(scene, Vector2::new(-step, 0.0)),
            KeyCode::ArrowUp => self.orbit(scene, Vector2::new(0.0, step)),
            KeyCode::ArrowDown => self.orbit(scene, Vector2::new(0.0, -step)),
            KeyCode::KeyO => self.zoom(scene, step),
            KeyCode::KeyP => self.zoom(scene, -step),
            KeyCode::KeyW => self.fly(scene, |c| c.move_forward(step)),
            KeyCode::KeyS => self.fly(scene, |c| c.move_forward(-step)),
            KeyCode::KeyA => self.fly(scene, |c| c.strafe(-step)),
            KeyCode::KeyD => self.fly(scene, |c| c.strafe(step)),
            _ => return false,
        }
        true
    }

    fn orbit(&self, scene: &mut Scene, delta: Vector2<f32>) {
        scene.navigate_3d = false;
        scene.camera_mut().move_polar(delta);
    }

    fn zoom(&self, scene: &mut Scene, delta: f32) {
        scene.navigate_3d = false;
        scene.camera_mut().zoom_polar(delta);
    }

    fn fly<F>(&self, scene: &mut Scene, movement: F)
    where
        F: FnOnce(&mut super::Camera),
    {
        scene.navigate_3d = true;
        movement(scene.camera_mut());
    }

    pub fn is_shift_held(&self) -> bool {
        self.is_shift_held
    }
}
