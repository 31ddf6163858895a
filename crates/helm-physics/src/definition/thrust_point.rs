use helm_core::{Lockable, Vec2};

use crate::{PhysicsResult, validate};

/// A fixed point on an entity where a force in a fixed direction can be applied.
///
/// Positions are given in the local frame relative to the shape origin, not
/// to the center of mass; the entity corrects for its center of mass
/// internally. The direction is stored normalized. The identifier is
/// mandatory and must be unique within an entity.
#[derive(Debug)]
pub struct ThrustPointDefinition {
    position: Vec2,
    direction: Vec2,
    id: String,
    locked: bool,
}

impl ThrustPointDefinition {
    /// Create a thrust point definition
    pub fn new(position: Vec2, direction: Vec2, id: &str) -> PhysicsResult<Self> {
        Ok(Self {
            position: validate::finite_vector("thrust point position", position)?,
            direction: normalized(direction)?,
            id: validate::identifier("thrust point identifier", id)?.to_string(),
            locked: false,
        })
    }

    pub fn set_position(&mut self, position: Vec2) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.position = validate::finite_vector("thrust point position", position)?;
        Ok(self)
    }

    /// Set the thrust direction. Any non-zero vector is accepted and normalized.
    pub fn set_direction(&mut self, direction: Vec2) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.direction = normalized(direction)?;
        Ok(self)
    }

    pub fn set_identifier(&mut self, id: &str) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.id = validate::identifier("thrust point identifier", id)?.to_string();
        Ok(self)
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Unit thrust direction
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn identifier(&self) -> &str {
        &self.id
    }
}

fn normalized(direction: Vec2) -> PhysicsResult<Vec2> {
    let direction = validate::non_zero_vector("thrust direction", direction)?;
    Ok(direction / direction.length())
}

impl Lockable for ThrustPointDefinition {
    fn lock(&mut self) {
        self.locked = true;
    }

    fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Copies are always unlocked.
impl Clone for ThrustPointDefinition {
    fn clone(&self) -> Self {
        Self {
            position: self.position,
            direction: self.direction,
            id: self.id.clone(),
            locked: false,
        }
    }
}

/// Content equality; the lock state is ignored.
impl PartialEq for ThrustPointDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position && self.direction == other.direction && self.id == other.id
    }
}
