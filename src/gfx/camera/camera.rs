//! Orbital and free-fly camera
//!
//! The orbital camera sits on a sphere of radius `scene_distance` around
//! `scene_center`, addressed by polar coordinates (azimuth, elevation). The
//! apparent size of the scene is driven by `scene_radius`: zooming shrinks or
//! grows the radius, and once the distance is more than a hundred radii the
//! projection switches to orthographic.
//!
//! The free-fly camera is independent: a position, a `front` direction derived
//! from yaw/pitch in degrees, and the shared `up` vector.
//!
//! Matrices follow the OpenGL clip-space convention (z in [-1, 1]); apply
//! [`OPENGL_TO_WGPU_MATRIX`] before handing a projection to wgpu.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Vector2, Vector3, Vector4, Zero};

use crate::mesh::{Aabb3, Viewport};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Distance-to-radius ratio above which the projection is orthographic
pub const ORTHO_THRESHOLD: f32 = 1.0e2;

/// Elevation limit, just short of the poles
pub const MAX_ELEVATION: f32 = PI / 2.0 - 1.2e-3;

/// Smallest scene radius a zoom step may leave behind
pub const MIN_SCENE_RADIUS: f32 = 1.0e-4;

/// Free-fly pitch limit in degrees
pub const MAX_PITCH: f32 = 89.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Orbital position: x = azimuth, y = elevation, both in radians
    pub polar: Vector2<f32>,
    /// Free-fly eye position
    pub position: Vector3<f32>,
    /// Free-fly viewing direction, unit length
    pub front: Vector3<f32>,
    pub up: Vector3<f32>,
    /// Free-fly yaw in degrees
    pub yaw: f32,
    /// Free-fly pitch in degrees
    pub pitch: f32,

    pub scene_center: Vector3<f32>,
    pub scene_distance: f32,
    pub scene_radius: f32,
    pub min_near: f32,
    pub near_offset: f32,
    pub far_offset: f32,
    pub viewport: Viewport,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            polar: Vector2::zero(),
            position: Vector3::new(0.5, 0.5, 3.5),
            front: Vector3::new(0.0, 0.0, -1.0),
            up: Vector3::unit_y(),
            yaw: -90.0,
            pitch: 0.0,
            scene_center: Vector3::zero(),
            scene_distance: 3.0,
            scene_radius: 1.0,
            min_near: 0.1,
            near_offset: -100.0,
            far_offset: 100.0,
            viewport: Viewport::default(),
        }
    }
}

impl Camera {
    /// Frames a bounding box: centered on it, radius = largest extent,
    /// standing three radii away.
    pub fn frame(&mut self, bounds: &Aabb3) {
        let radius = bounds.max_size().max(MIN_SCENE_RADIUS);
        self.scene_center = bounds.center();
        self.scene_radius = radius;
        self.scene_distance = 3.0 * radius;
        self.min_near = 0.1;
        self.near_offset = -100.0 * radius;
        self.far_offset = 100.0 * radius;
    }

    /// Eye position of the orbital camera
    pub fn orbital_position(&self) -> Vector3<f32> {
        polar_to_cartesian(self.polar, self.scene_center, self.scene_distance)
    }

    pub fn compute_view_matrix(&self) -> Matrix4<f32> {
        look_at(self.orbital_position(), self.scene_center, self.up)
    }

    pub fn compute_free_fly_view_matrix(&self) -> Matrix4<f32> {
        look_at(self.position, self.position + self.front, self.up)
    }

    pub fn compute_projection_matrix(&self) -> Matrix4<f32> {
        let sizes = self.viewport.sizes();
        let min_size = match self.viewport.min_size() {
            s if s > 0.0 => s,
            _ => 1.0,
        };

        let mut r = self.scene_radius * sizes.x / min_size;
        let mut t = self.scene_radius * sizes.y / min_size;

        if self.is_perspective() {
            r /= self.scene_distance;
            t /= self.scene_distance;
            perspective_projection(
                -r,
                r,
                -t,
                t,
                self.min_near.max(self.scene_distance + self.near_offset),
                self.scene_distance + self.far_offset,
            )
        } else {
            orthographic_projection(-r, r, -t, t, self.near_offset, self.far_offset)
        }
    }

    pub fn is_orthographic(&self) -> bool {
        self.scene_distance / self.scene_radius > ORTHO_THRESHOLD
    }

    pub fn is_perspective(&self) -> bool {
        !self.is_orthographic()
    }

    /// Rotates around the scene. Azimuth wraps into [-π, π], elevation is
    /// clamped just short of the poles.
    pub fn move_polar(&mut self, delta: Vector2<f32>) {
        self.polar += delta;

        if self.polar.x > PI {
            self.polar.x -= 2.0 * PI;
        } else if self.polar.x < -PI {
            self.polar.x += 2.0 * PI;
        }

        self.polar.y = self.polar.y.clamp(-MAX_ELEVATION, MAX_ELEVATION);
    }

    /// Grows the scene radius by `delta`. A step that would bring the radius
    /// under [`MIN_SCENE_RADIUS`] is undone.
    pub fn zoom_polar(&mut self, delta: f32) {
        self.scene_radius += delta;
        if self.scene_radius < MIN_SCENE_RADIUS {
            self.scene_radius -= delta;
        }
    }

    pub fn move_yaw(&mut self, degrees: f32) {
        self.yaw += degrees;
        self.update_front();
    }

    pub fn move_pitch(&mut self, degrees: f32) {
        self.pitch = (self.pitch + degrees).clamp(-MAX_PITCH, MAX_PITCH);
        self.update_front();
    }

    pub fn move_forward(&mut self, amount: f32) {
        self.position += self.front * amount;
    }

    /// Sideways move, positive to the right of `front`
    pub fn strafe(&mut self, amount: f32) {
        let right = self.front.cross(self.up);
        if right.magnitude2() > 0.0 {
            self.position += right.normalize() * amount;
        }
    }

    fn update_front(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vector3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
    }
}

/// Point at `distance` from `center` in direction (azimuth, elevation)
pub fn polar_to_cartesian(polar: Vector2<f32>, center: Vector3<f32>, distance: f32) -> Vector3<f32> {
    let (azimuth, elevation) = (polar.x, polar.y);
    center
        + Vector3::new(
            distance * azimuth.cos() * elevation.cos(),
            distance * elevation.sin(),
            distance * azimuth.sin() * elevation.cos(),
        )
}

/// Right-handed view matrix looking from `eye` toward `target`.
///
/// The basis is `z = normalize(eye - target)`, `x = normalize(up × z)`,
/// `y = z × x`; the matrix is the transposed basis with translation
/// `-Rᵀ·eye`.
pub fn look_at(eye: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    let z = (eye - target).normalize();
    let x = up.cross(z).normalize();
    let y = z.cross(x);

    Matrix4::from_cols(
        Vector4::new(x.x, y.x, z.x, 0.0),
        Vector4::new(x.y, y.y, z.y, 0.0),
        Vector4::new(x.z, y.z, z.z, 0.0),
        Vector4::new(-x.dot(eye), -y.dot(eye), -z.dot(eye), 1.0),
    )
}

/// Off-center perspective frustum.
///
/// The extents are used as slopes rather than near-plane coordinates, so the
/// field of view does not depend on `near`.
pub fn perspective_projection(l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) -> Matrix4<f32> {
    let (rml, tmb, fmn) = (r - l, t - b, f - n);
    let (rpl, tpb, fpn) = (r + l, t + b, f + n);

    Matrix4::from_cols(
        Vector4::new(2.0 / rml, 0.0, 0.0, 0.0),
        Vector4::new(0.0, 2.0 / tmb, 0.0, 0.0),
        Vector4::new(rpl / rml, tpb / tmb, -fpn / fmn, -1.0),
        Vector4::new(0.0, 0.0, -2.0 * f * n / fmn, 0.0),
    )
}

pub fn orthographic_projection(l: f32, r: f32, b: f32, t: f32, n: f32, f: f32) -> Matrix4<f32> {
    let (rml, tmb, fmn) = (r - l, t - b, f - n);
    let (rpl, tpb, fpn) = (r + l, t + b, f + n);

    Matrix4::from_cols(
        Vector4::new(2.0 / rml, 0.0, 0.0, 0.0),
        Vector4::new(0.0, 2.0 / tmb, 0.0, 0.0),
        Vector4::new(0.0, 0.0, -2.0 / fmn, 0.0),
        Vector4::new(-rpl / rml, -tpb / tmb, -fpn / fmn, 1.0),
    )
}
