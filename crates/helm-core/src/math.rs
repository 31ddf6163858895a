//! Math utilities
//!
//! 2D re-exports from glam and the rigid-body math the physics layer needs.
//! All simulation math runs in double precision.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

pub use glam::DVec2 as Vec2;

/// Scalar cross product of two 2D vectors (the z component of the 3D cross)
pub fn cross(a: Vec2, b: Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Cross product of a scalar angular quantity with a vector (`w × v`)
pub fn cross_scalar(w: f64, v: Vec2) -> Vec2 {
    Vec2::new(-w * v.y, w * v.x)
}

/// Check whether every component of a vector is finite
pub fn is_finite(v: Vec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}

/// Check whether a vector is (numerically) the zero vector
pub fn is_zero(v: Vec2) -> bool {
    v.length_squared() <= crate::EPSILON * crate::EPSILON
}

/// Normalize an angle in radians into the range `(-π, π]`
pub fn normalize_angle(angle: f64) -> f64 {
    let mut wrapped = angle % TAU;
    if wrapped <= -PI {
        wrapped += TAU;
    } else if wrapped > PI {
        wrapped -= TAU;
    }
    wrapped
}

/// Rigid 2D transform: rotation followed by translation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2 {
    /// World-space translation
    pub translation: Vec2,
    /// Rotation in radians, normalized into `(-π, π]`
    rotation: f64,
}

impl Transform2 {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        translation: Vec2::ZERO,
        rotation: 0.0,
    };

    /// Create a new transform from a translation and a rotation angle
    pub fn new(translation: Vec2, rotation: f64) -> Self {
        Self {
            translation,
            rotation: normalize_angle(rotation),
        }
    }

    /// Create a pure translation
    pub fn from_translation(translation: Vec2) -> Self {
        Self::new(translation, 0.0)
    }

    /// Create a pure rotation about the origin
    pub fn from_rotation(rotation: f64) -> Self {
        Self::new(Vec2::ZERO, rotation)
    }

    /// Rotation angle in radians
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Set the rotation angle (normalized)
    pub fn set_rotation(&mut self, rotation: f64) {
        self.rotation = normalize_angle(rotation);
    }

    /// Unit vector of the rotation (`cos`, `sin`)
    pub fn rotation_vector(&self) -> Vec2 {
        Vec2::from_angle(self.rotation)
    }

    /// Transform a local point into the parent frame
    pub fn transform_point(&self, point: Vec2) -> Vec2 {
        self.rotation_vector().rotate(point) + self.translation
    }

    /// Transform a parent-frame point into the local frame
    pub fn inverse_transform_point(&self, point: Vec2) -> Vec2 {
        let r = self.rotation_vector();
        Vec2::new(r.x, -r.y).rotate(point - self.translation)
    }

    /// Rotate a local vector into the parent frame (translation is ignored)
    pub fn transform_vector(&self, vector: Vec2) -> Vec2 {
        self.rotation_vector().rotate(vector)
    }

    /// Rotate a parent-frame vector into the local frame
    pub fn inverse_transform_vector(&self, vector: Vec2) -> Vec2 {
        let r = self.rotation_vector();
        Vec2::new(r.x, -r.y).rotate(vector)
    }

    /// Translate the transform
    pub fn translate(&mut self, delta: Vec2) {
        self.translation += delta;
    }

    /// Rotate the transform by `angle` about a point given in the parent frame
    pub fn rotate_about(&mut self, angle: f64, point: Vec2) {
        let r = Vec2::from_angle(angle);
        self.translation = point + r.rotate(self.translation - point);
        self.rotation = normalize_angle(self.rotation + angle);
    }
}

impl Default for Transform2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Axis-aligned bounding box in 2D
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb2 {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Aabb2 {
    /// Create an empty AABB
    pub const EMPTY: Self = Self {
        min: Vec2::splat(f64::INFINITY),
        max: Vec2::splat(f64::NEG_INFINITY),
    };

    /// Create an AABB from min and max corners
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Smallest AABB containing every point
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut result = Self::EMPTY;
        for point in points {
            result.expand_to_include(point);
        }
        result
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Get the full size of the AABB
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Check if the AABB is empty
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Check if a point is inside the AABB
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Check if this AABB intersects another
    pub fn intersects(&self, other: &Aabb2) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Expand the AABB to include a point
    pub fn expand_to_include(&mut self, point: Vec2) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Merge with another AABB
    pub fn merge(&self, other: &Aabb2) -> Aabb2 {
        Aabb2 {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl Default for Aabb2 {
    fn default() -> Self {
        Self::EMPTY
    }
}
