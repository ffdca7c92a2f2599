//! Axis-aligned boxes used for mesh bounds and screen viewports

use cgmath::{Vector2, Vector3, Zero};

/// Axis-aligned bounding box in model space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner of the bounding box
    pub min: Vector3<f32>,
    /// Maximum corner of the bounding box
    pub max: Vector3<f32>,
}

impl Aabb3 {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing every position. An empty slice gives a
    /// degenerate box at the origin.
    pub fn from_positions<'a, I>(positions: I) -> Self
    where
        I: IntoIterator<Item = &'a [f32; 3]>,
    {
        let mut iter = positions.into_iter();
        let Some(first) = iter.next() else {
            return Self::new(Vector3::zero(), Vector3::zero());
        };

        let mut min = Vector3::from(*first);
        let mut max = min;

        for p in iter {
            min.x = min.x.min(p[0]);
            min.y = min.y.min(p[1]);
            min.z = min.z.min(p[2]);
            max.x = max.x.max(p[0]);
            max.y = max.y.max(p[1]);
            max.z = max.z.max(p[2]);
        }

        Self::new(min, max)
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// Extent along each axis
    pub fn sizes(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Largest extent, used as the scene radius when framing the mesh
    pub fn max_size(&self) -> f32 {
        let s = self.sizes();
        s.x.max(s.y).max(s.z)
    }

    pub fn contains(&self, p: Vector3<f32>) -> bool {
        p.x >= self.min.x
            && p.y >= self.min.y
            && p.z >= self.min.z
            && p.x <= self.max.x
            && p.y <= self.max.y
            && p.z <= self.max.z
    }
}

/// Screen rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub min: Vector2<f32>,
    pub max: Vector2<f32>,
}

impl Viewport {
    pub fn new(min: Vector2<f32>, max: Vector2<f32>) -> Self {
        Self { min, max }
    }

    /// Viewport anchored at the origin
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(Vector2::zero(), Vector2::new(width, height))
    }

    pub fn sizes(&self) -> Vector2<f32> {
        self.max - self.min
    }

    pub fn min_size(&self) -> f32 {
        let s = self.sizes();
        s.x.min(s.y)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::from_size(1.0, 1.0)
    }
}
