//! Scene lights and their GPU layouts

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3};
use rand::Rng;

/// Radius of the sphere random point lights are placed on
pub const RANDOM_LIGHT_DISTANCE: f32 = 20.0;

/// Light coming from infinitely far away along `direction`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub intensity: Vector3<f32>,
    direction: Vector3<f32>,
}

impl DirectionalLight {
    pub fn new(intensity: Vector3<f32>, direction: Vector3<f32>) -> Self {
        let mut light = Self {
            intensity,
            direction: Vector3::unit_z(),
        };
        light.set_direction(direction);
        light
    }

    /// Unit direction the light travels along
    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    /// Stores `direction` normalized. A zero vector keeps the previous one.
    pub fn set_direction(&mut self, direction: Vector3<f32>) {
        if direction.magnitude2() > 0.0 {
            self.direction = direction.normalize();
        }
    }

    pub fn to_raw(&self) -> DirectionalLightRaw {
        DirectionalLightRaw {
            direction: self.direction.extend(0.0).into(),
            intensity: self.intensity.extend(0.0).into(),
        }
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vector3::new(0.2, 0.2, 0.2), Vector3::new(1.0, 1.0, 0.0))
    }
}

/// Omnidirectional light at `position`, tinted by `color`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub intensity: Vector3<f32>,
    pub position: Vector3<f32>,
    pub color: Vector3<f32>,
}

impl PointLight {
    pub fn new(intensity: Vector3<f32>, position: Vector3<f32>) -> Self {
        Self {
            intensity,
            position,
            color: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Point light at a uniformly distributed spot on the sphere of radius
    /// [`RANDOM_LIGHT_DISTANCE`] around the origin
    pub fn random<R: Rng + ?Sized>(rng: &mut R, intensity: Vector3<f32>) -> Self {
        let latitude = (2.0 * rng.random::<f32>() - 1.0).acos() - PI / 2.0;
        let longitude = 2.0 * PI * rng.random::<f32>();

        let position = RANDOM_LIGHT_DISTANCE
            * Vector3::new(
                latitude.cos() * longitude.cos(),
                latitude.cos() * longitude.sin(),
                latitude.sin(),
            );

        Self::new(intensity, position)
    }

    pub fn to_raw(&self) -> PointLightRaw {
        PointLightRaw {
            position: self.position.extend(1.0).into(),
            intensity: Vector3::new(
                self.intensity.x * self.color.x,
                self.intensity.y * self.color.y,
                self.intensity.z * self.color.z,
            )
            .extend(0.0)
            .into(),
        }
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self::new(Vector3::new(1.0, 1.0, 1.0), Vector3::new(16.0, 9.0, 8.0))
    }
}

/// `DirectionalLight` as laid out in the shaders' storage buffer
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectionalLightRaw {
    pub direction: [f32; 4],
    pub intensity: [f32; 4],
}

/// `PointLight` as laid out in the shaders' storage buffer. The intensity is
/// pre-multiplied by the light color.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightRaw {
    pub position: [f32; 4],
    pub intensity: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_directional_light_is_normalized() {
        let light = DirectionalLight::new(Vector3::new(1.0, 1.0, 1.0), Vector3::new(3.0, 0.0, 4.0));
        assert!((light.direction() - Vector3::new(0.6, 0.0, 0.8)).magnitude() < 1e-6);

        let mut light = light;
        light.set_direction(Vector3::new(0.0, 0.0, 0.0));
        assert!((light.direction().magnitude() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_random_point_lights_lie_on_sphere() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..64 {
            let light = PointLight::random(&mut rng, Vector3::new(1.0, 1.0, 1.0));
            assert!((light.position.magnitude() - RANDOM_LIGHT_DISTANCE).abs() < 1e-3);
        }
    }

    #[test]
    fn test_point_light_raw_premultiplies_color() {
        let mut light = PointLight::new(Vector3::new(2.0, 2.0, 2.0), Vector3::new(1.0, 2.0, 3.0));
        light.color = Vector3::new(0.5, 1.0, 0.0);

        let raw = light.to_raw();
        assert_eq!(raw.position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(raw.intensity, [1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_default_lights() {
        let directional = DirectionalLight::default();
        let s = 1.0 / 2f32.sqrt();
        assert!((directional.direction() - Vector3::new(s, s, 0.0)).magnitude() < 1e-6);
        assert_eq!(PointLight::default().position, Vector3::new(16.0, 9.0, 8.0));
    }
}
