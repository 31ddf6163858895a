//! Rigid-body engine seam
//!
//! The manager never integrates bodies itself. It hands every spawned body to
//! a [`RigidBodyEngine`] once per step, together with a [`StepEvents`] sink
//! that applies the listener fan-out. Swapping the engine (or scripting one
//! in tests) leaves definitions, entities and dispatch untouched.

use helm_core::Vec2;

use crate::WorldConfig;
use crate::body::Body;
use crate::entity::EntityId;
use crate::listener::{CollisionPoint, FixturePair, TimeOfImpact};

/// A spawned body lent to the engine for one step
#[derive(Debug)]
pub struct BodyEntry<'a> {
    pub id: EntityId,
    pub body: &'a mut Body,
}

/// Event sink handed to [`RigidBodyEngine::step`]
pub trait StepEvents {
    /// Broad-phase filter. `false` drops the pair for this step.
    fn filter(&mut self, pair: &FixturePair) -> bool;

    /// Continuous-collision filter. `false` leaves the impact unresolved.
    fn time_of_impact(&mut self, toi: &TimeOfImpact) -> bool;

    /// A resolved discrete collision
    fn collision(&mut self, point: &CollisionPoint);
}

/// Sink that accepts everything and records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl StepEvents for NoEvents {
    fn filter(&mut self, _pair: &FixturePair) -> bool {
        true
    }

    fn time_of_impact(&mut self, _toi: &TimeOfImpact) -> bool {
        true
    }

    fn collision(&mut self, _point: &CollisionPoint) {}
}

/// Simulation backend driven by the manager
pub trait RigidBodyEngine: Send {
    fn gravity(&self) -> Vec2;

    fn set_gravity(&mut self, gravity: Vec2);

    /// Apply world settings on initialisation
    fn configure(&mut self, config: &WorldConfig) {
        self.set_gravity(config.gravity);
    }

    /// A body joined the world
    fn insert_body(&mut self, _id: EntityId, _body: &mut Body) {}

    /// A body left the world
    fn remove_body(&mut self, _id: EntityId) {}

    /// Advance every body by `dt` seconds, reporting events to `events`.
    ///
    /// `dt` is finite and positive. Bodies arrive in spawn order.
    fn step(&mut self, dt: f64, bodies: &mut [BodyEntry<'_>], events: &mut dyn StepEvents);
}
