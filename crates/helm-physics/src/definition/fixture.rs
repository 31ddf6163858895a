use helm_core::Lockable;

use crate::shape::Shape;
use crate::{PhysicsResult, validate};

/// One convex collision shape of an entity together with its material.
///
/// Defaults: density coefficient 1, friction 0.2, restitution 0, not a
/// sensor, no identifier. The density coefficient only controls the mass
/// distribution; the absolute mass comes from the entity definition.
#[derive(Debug)]
pub struct FixtureDefinition {
    shape: Shape,
    density: f64,
    friction: f64,
    restitution: f64,
    sensor: bool,
    id: Option<String>,
    locked: bool,
}

impl FixtureDefinition {
    /// Default friction coefficient
    pub const DEFAULT_FRICTION: f64 = 0.2;

    /// Create a fixture definition for a shape with default material
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            density: 1.0,
            friction: Self::DEFAULT_FRICTION,
            restitution: 0.0,
            sensor: false,
            id: None,
            locked: false,
        }
    }

    /// Create a fixture definition with an identifier
    pub fn with_identifier(shape: Shape, id: &str) -> PhysicsResult<Self> {
        let mut def = Self::new(shape);
        def.set_identifier(Some(id))?;
        Ok(def)
    }

    pub fn set_shape(&mut self, shape: Shape) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.shape = shape;
        Ok(self)
    }

    /// Set the density coefficient (finite, non-negative)
    pub fn set_density(&mut self, density: f64) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.density = validate::non_negative("density coefficient", density)?;
        Ok(self)
    }

    /// Set the friction coefficient (finite, non-negative)
    pub fn set_friction(&mut self, friction: f64) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.friction = validate::non_negative("friction coefficient", friction)?;
        Ok(self)
    }

    /// Set the restitution coefficient (in `[0, 1]`)
    pub fn set_restitution(&mut self, restitution: f64) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.restitution = validate::unit_interval("restitution coefficient", restitution)?;
        Ok(self)
    }

    pub fn set_sensor(&mut self, sensor: bool) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.sensor = sensor;
        Ok(self)
    }

    /// Set or clear the identifier. A present identifier may not be empty.
    pub fn set_identifier(&mut self, id: Option<&str>) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.id = match id {
            Some(id) => Some(validate::identifier("fixture identifier", id)?.to_string()),
            None => None,
        };
        Ok(self)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn friction(&self) -> f64 {
        self.friction
    }

    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    pub fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl Lockable for FixtureDefinition {
    fn lock(&mut self) {
        self.locked = true;
    }

    fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Copies are always unlocked.
impl Clone for FixtureDefinition {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape.clone(),
            density: self.density,
            friction: self.friction,
            restitution: self.restitution,
            sensor: self.sensor,
            id: self.id.clone(),
            locked: false,
        }
    }
}

/// Content equality; the lock state is ignored.
impl PartialEq for FixtureDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.density == other.density
            && self.friction == other.friction
            && self.restitution == other.restitution
            && self.sensor == other.sensor
            && self.id == other.id
    }
}
