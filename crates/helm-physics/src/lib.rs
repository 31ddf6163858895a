//! # Helm Physics
//!
//! Entity-definition and force-bookkeeping layer between game logic and a
//! rigid-body engine.
//!
//! ## Features
//! - Lockable, builder-style definitions for fixtures, thrust points and entities
//! - Thruster systems caching net force and torque per entity
//! - Live entities bound 1:1 to engine bodies
//! - Collision, time-of-impact and update event relays with per-entity fan-out
//! - A physics manager owning the world lifecycle and stepping
//!
//! Game code never touches engine bodies directly: it builds (and usually
//! locks) a [`PhysicsEntityDefinition`], asks the [`PhysicsManager`] to create
//! an [`Entity`] from it, spawns that entity and then drives the simulation
//! with [`PhysicsManager::step_world`].

pub mod body;
pub mod definition;
pub mod engine;
pub mod entity;
pub mod listener;
pub mod manager;
pub mod sandbox;
pub mod shape;
pub mod thruster;

pub use body::{Body, BodyFixture, MassData, MassType};
pub use definition::{FixtureDefinition, PhysicsEntityDefinition, ThrustPointDefinition};
pub use engine::{BodyEntry, NoEvents, RigidBodyEngine, StepEvents};
pub use entity::{Entity, EntityHandle, EntityId};
pub use listener::{
    CollisionFilter, CollisionListener, CollisionPoint, FixturePair, Listenable, ListenerRelay,
    Participants, TimeOfImpact, TimeOfImpactListener, UpdateListener,
};
pub use manager::{PhysicsManager, SpawnedEntities, StepStats};
pub use sandbox::SandboxEngine;
pub use shape::Shape;
pub use thruster::{Thruster, ThrusterSystem};

pub use helm_core::{LockError, Lockable, Transform2, Vec2};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Physics errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Duplicate {kind} identifier: [{id}] already in use")]
    DuplicateIdentifier { kind: &'static str, id: String },

    #[error(transparent)]
    Locked(#[from] LockError),

    #[error("World must be initialised first")]
    WorldUninitialised,

    #[error("World already initialised")]
    WorldAlreadyInitialised,

    #[error("Entity {0} is already spawned")]
    EntityAlreadySpawned(EntityId),

    #[error("Entity {0} is not spawned")]
    EntityNotSpawned(EntityId),

    #[error("Invalid entity definition: {0}")]
    InvalidDefinition(String),

    #[error("Fixture not found for id [{0}]")]
    UnknownFixture(String),

    #[error("Thrust point not found for id [{0}]")]
    UnknownThrustPoint(String),
}

impl PhysicsError {
    /// Whether this error stems from the world lifecycle (initialisation, spawning)
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            PhysicsError::WorldUninitialised
                | PhysicsError::WorldAlreadyInitialised
                | PhysicsError::EntityAlreadySpawned(_)
                | PhysicsError::EntityNotSpawned(_)
        )
    }
}

impl From<helm_core::TimeError> for PhysicsError {
    fn from(err: helm_core::TimeError) -> Self {
        PhysicsError::InvalidArgument(err.to_string())
    }
}

/// Result type for physics operations
pub type PhysicsResult<T> = Result<T, PhysicsError>;

/// Simulation treatment of an entity, fixed for the entity's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Finite positive mass, discrete collision detection
    #[default]
    Default,
    /// Finite positive mass, continuous collision detection for fast movers
    Bullet,
    /// Immovable obstacle. Infinite mass, excluded from force application
    Static,
}

impl EntityType {
    /// Whether entities of this type respond to forces
    pub fn is_movable(&self) -> bool {
        !matches!(self, EntityType::Static)
    }
}

/// Physics world configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: Vec2,
    pub fixed_timestep: f64,
    pub substeps: u32,
    /// Bodies slower than this (linear) may fall asleep
    pub sleep_linear_threshold: f64,
    /// Bodies slower than this (angular) may fall asleep
    pub sleep_angular_threshold: f64,
    /// Seconds a body must stay below both thresholds before sleeping
    pub sleep_time: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.81),
            fixed_timestep: 1.0 / 60.0,
            substeps: 1,
            sleep_linear_threshold: 0.01,
            sleep_angular_threshold: 2.0_f64.to_radians(),
            sleep_time: 0.5,
        }
    }
}

impl WorldConfig {
    /// Default configuration with the given gravity
    pub fn with_gravity(gravity: Vec2) -> Self {
        Self {
            gravity,
            ..Self::default()
        }
    }
}

/// Argument checks shared by definitions, entities and the manager
pub(crate) mod validate {
    use super::{PhysicsError, PhysicsResult, Vec2};

    pub fn finite(name: &str, value: f64) -> PhysicsResult<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(PhysicsError::InvalidArgument(format!("{name} must be finite, was {value}")))
        }
    }

    pub fn non_negative(name: &str, value: f64) -> PhysicsResult<f64> {
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(PhysicsError::InvalidArgument(format!(
                "{name} must be finite and non-negative, was {value}"
            )))
        }
    }

    pub fn unit_interval(name: &str, value: f64) -> PhysicsResult<f64> {
        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(PhysicsError::InvalidArgument(format!("{name} must be in [0, 1], was {value}")))
        }
    }

    pub fn finite_vector(name: &str, value: Vec2) -> PhysicsResult<Vec2> {
        if helm_core::math::is_finite(value) {
            Ok(value)
        } else {
            Err(PhysicsError::InvalidArgument(format!("{name} must be finite, was {value}")))
        }
    }

    pub fn non_zero_vector(name: &str, value: Vec2) -> PhysicsResult<Vec2> {
        let value = finite_vector(name, value)?;
        if helm_core::math::is_zero(value) {
            Err(PhysicsError::InvalidArgument(format!("{name} may not be the zero vector")))
        } else {
            Ok(value)
        }
    }

    pub fn identifier<'a>(name: &str, id: &'a str) -> PhysicsResult<&'a str> {
        if id.is_empty() {
            Err(PhysicsError::InvalidArgument(format!("{name} may not be empty")))
        } else {
            Ok(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_config_default() {
        let config = WorldConfig::default();
        assert_eq!(config.gravity.y, -9.81);
        assert_eq!(config.substeps, 1);
    }

    #[test]
    fn test_entity_type_movable() {
        assert!(EntityType::Default.is_movable());
        assert!(EntityType::Bullet.is_movable());
        assert!(!EntityType::Static.is_movable());
        assert_eq!(EntityType::default(), EntityType::Default);
    }

    #[test]
    fn test_lifecycle_classification() {
        assert!(PhysicsError::WorldUninitialised.is_lifecycle());
        assert!(PhysicsError::WorldAlreadyInitialised.is_lifecycle());
        assert!(!PhysicsError::InvalidArgument("x".into()).is_lifecycle());
        assert!(!PhysicsError::from(LockError::new("T")).is_lifecycle());
    }

    #[test]
    fn test_validation_helpers() {
        assert!(validate::non_negative("density", 0.0).is_ok());
        assert!(validate::non_negative("density", -0.1).is_err());
        assert!(validate::non_negative("density", f64::INFINITY).is_err());
        assert!(validate::unit_interval("restitution", 1.0).is_ok());
        assert!(validate::unit_interval("restitution", 1.5).is_err());
        assert!(validate::unit_interval("restitution", f64::NAN).is_err());
        assert!(validate::non_zero_vector("direction", Vec2::ZERO).is_err());
        assert!(validate::identifier("id", "").is_err());
    }
}
