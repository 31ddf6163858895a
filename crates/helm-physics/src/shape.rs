//! Convex collision shapes
//!
//! Only what the entity layer needs from geometry: construction, mass
//! properties and bounds. Hull construction and contact generation belong to
//! the engine.

use std::f64::consts::PI;

use helm_core::math::{self, cross};
use helm_core::{Aabb2, Transform2, Vec2};
use smallvec::SmallVec;

use crate::body::MassData;
use crate::{PhysicsError, PhysicsResult};

/// Vertex storage; most game polygons are small
pub type Vertices = SmallVec<[Vec2; 8]>;

/// A convex shape in the local frame of its body
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle { center: Vec2, radius: f64 },
    /// Counter-clockwise vertex loop
    Polygon { vertices: Vertices },
}

impl Shape {
    /// Circle centered on the local origin
    pub fn circle(radius: f64) -> PhysicsResult<Self> {
        Self::circle_at(Vec2::ZERO, radius)
    }

    /// Circle centered on `center`
    pub fn circle_at(center: Vec2, radius: f64) -> PhysicsResult<Self> {
        if !math::is_finite(center) {
            return Err(PhysicsError::InvalidArgument(format!(
                "circle center must be finite, was {center}"
            )));
        }
        if !(radius.is_finite() && radius > 0.0) {
            return Err(PhysicsError::InvalidArgument(format!(
                "circle radius must be finite and strictly positive, was {radius}"
            )));
        }
        Ok(Shape::Circle { center, radius })
    }

    /// Axis-aligned rectangle centered on the local origin
    pub fn rectangle(width: f64, height: f64) -> PhysicsResult<Self> {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Self::polygon([
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ])
    }

    /// Convex polygon from its vertices.
    ///
    /// Clockwise input is reversed. Convexity itself is not checked.
    pub fn polygon(vertices: impl IntoIterator<Item = Vec2>) -> PhysicsResult<Self> {
        let mut vertices: Vertices = vertices.into_iter().collect();
        if vertices.len() < 3 {
            return Err(PhysicsError::InvalidArgument(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        if vertices.iter().any(|v| !math::is_finite(*v)) {
            return Err(PhysicsError::InvalidArgument(
                "polygon vertices must be finite".to_string(),
            ));
        }

        let signed_area = signed_area(&vertices);
        if signed_area.abs() <= helm_core::EPSILON {
            return Err(PhysicsError::InvalidArgument(
                "polygon is degenerate (zero area)".to_string(),
            ));
        }
        if signed_area < 0.0 {
            vertices.reverse();
        }
        Ok(Shape::Polygon { vertices })
    }

    /// Area of the shape
    pub fn area(&self) -> f64 {
        match self {
            Shape::Circle { radius, .. } => PI * radius * radius,
            Shape::Polygon { vertices } => signed_area(vertices),
        }
    }

    /// Geometric center of the shape
    pub fn centroid(&self) -> Vec2 {
        match self {
            Shape::Circle { center, .. } => *center,
            Shape::Polygon { .. } => self.mass_properties(1.0).center,
        }
    }

    /// Mass, center of mass and rotational inertia (about the center of mass)
    /// for the given density.
    pub fn mass_properties(&self, density: f64) -> MassData {
        match self {
            Shape::Circle { center, radius } => {
                let mass = density * PI * radius * radius;
                MassData::new(*center, mass, 0.5 * mass * radius * radius)
            }
            Shape::Polygon { vertices } => polygon_mass(vertices, density),
        }
    }

    /// World-space bounds under the given transform
    pub fn aabb(&self, transform: &Transform2) -> Aabb2 {
        match self {
            Shape::Circle { center, radius } => {
                let c = transform.transform_point(*center);
                Aabb2::new(c - Vec2::splat(*radius), c + Vec2::splat(*radius))
            }
            Shape::Polygon { vertices } => {
                Aabb2::from_points(vertices.iter().map(|v| transform.transform_point(*v)))
            }
        }
    }

    /// Radius of the smallest origin-centered circle enclosing the shape
    pub fn radius(&self) -> f64 {
        match self {
            Shape::Circle { center, radius } => center.length() + radius,
            Shape::Polygon { vertices } => vertices.iter().map(|v| v.length()).fold(0.0, f64::max),
        }
    }
}

fn signed_area(vertices: &[Vec2]) -> f64 {
    let n = vertices.len();
    (0..n)
        .map(|i| cross(vertices[i], vertices[(i + 1) % n]))
        .sum::<f64>()
        * 0.5
}

fn polygon_mass(vertices: &[Vec2], density: f64) -> MassData {
    // Triangle fan around the first vertex keeps the numbers small.
    let origin = vertices[0];
    let mut area = 0.0;
    let mut center = Vec2::ZERO;
    let mut inertia = 0.0;

    for i in 1..vertices.len() - 1 {
        let e1 = vertices[i] - origin;
        let e2 = vertices[i + 1] - origin;
        let d = cross(e1, e2);
        let triangle_area = 0.5 * d;
        area += triangle_area;
        center += (e1 + e2) * (triangle_area / 3.0);

        let int_x2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
        let int_y2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
        inertia += (0.25 / 3.0) * d * (int_x2 + int_y2);
    }

    center /= area;
    let mass = density * area;
    // parallel axis: shift the fan-origin inertia to the centroid
    let inertia = density * inertia - mass * center.length_squared();
    MassData::new(center + origin, mass, inertia)
}
