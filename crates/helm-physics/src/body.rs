//! Engine-native body state
//!
//! A [`Body`] is what the rigid-body engine integrates: fixtures, mass
//! distribution, transform, velocities and the loads applied for the next
//! step. Each live entity owns exactly one body.

use bitflags::bitflags;
use helm_core::math::cross;
use helm_core::{Aabb2, Transform2, Vec2};

use crate::shape::Shape;

/// Mass distribution of a body or shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassData {
    /// Center of mass in the local frame
    pub center: Vec2,
    /// Total mass
    pub mass: f64,
    /// Rotational inertia about the center of mass
    pub inertia: f64,
}

impl MassData {
    /// Mass of an immovable body
    pub const INFINITE: Self = Self {
        center: Vec2::ZERO,
        mass: 0.0,
        inertia: 0.0,
    };

    /// Create mass data from its parts
    pub fn new(center: Vec2, mass: f64, inertia: f64) -> Self {
        Self { center, mass, inertia }
    }

    /// Combine the mass data of several parts into one distribution
    pub fn combine(parts: &[MassData]) -> MassData {
        match parts {
            [] => MassData::INFINITE,
            [single] => *single,
            _ => {
                let mass: f64 = parts.iter().map(|p| p.mass).sum();
                let center = if mass > 0.0 {
                    parts.iter().map(|p| p.center * p.mass).sum::<Vec2>() / mass
                } else {
                    parts.iter().map(|p| p.center).sum::<Vec2>() / parts.len() as f64
                };
                let inertia = parts
                    .iter()
                    .map(|p| p.inertia + p.mass * (p.center - center).length_squared())
                    .sum();
                MassData::new(center, mass, inertia)
            }
        }
    }
}

impl Default for MassData {
    fn default() -> Self {
        Self::INFINITE
    }
}

/// How the engine treats a body's mass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MassType {
    /// Finite mass derived from the fixtures
    #[default]
    Normal,
    /// Immovable, unaffected by forces and impulses
    Infinite,
}

bitflags! {
    /// Per-body simulation flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BodyFlags: u8 {
        /// Use continuous collision detection
        const BULLET = 1 << 0;
        /// Body is asleep and skipped by the integrator
        const ASLEEP = 1 << 1;
        /// Body may fall asleep when at rest
        const AUTO_SLEEP = 1 << 2;
    }
}

/// A shape attached to a body together with its material
#[derive(Debug, Clone, PartialEq)]
pub struct BodyFixture {
    pub shape: Shape,
    pub density: f64,
    pub friction: f64,
    pub restitution: f64,
    pub sensor: bool,
    /// Identifier used to find the fixture later, reported in collision events
    pub id: Option<String>,
}

impl BodyFixture {
    /// Create a fixture with unit density and no material
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            density: 1.0,
            friction: 0.0,
            restitution: 0.0,
            sensor: false,
            id: None,
        }
    }

    /// Whether this fixture carries the given identifier
    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }
}

/// A force (and torque) applied for a limited duration
#[derive(Debug, Clone, Copy, PartialEq)]
struct TimedLoad {
    force: Vec2,
    torque: f64,
    remaining: f64,
}

/// Rigid body state integrated by the engine
#[derive(Debug, Clone)]
pub struct Body {
    fixtures: Vec<BodyFixture>,
    mass: MassData,
    mass_type: MassType,
    inv_mass: f64,
    inv_inertia: f64,
    transform: Transform2,
    linear_velocity: Vec2,
    angular_velocity: f64,
    linear_damping: f64,
    angular_damping: f64,
    force: Vec2,
    torque: f64,
    timed: Vec<TimedLoad>,
    flags: BodyFlags,
    sleep_time: f64,
}

impl Body {
    /// Create an empty body with room for `capacity` fixtures
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fixtures: Vec::with_capacity(capacity),
            mass: MassData::INFINITE,
            mass_type: MassType::Infinite,
            inv_mass: 0.0,
            inv_inertia: 0.0,
            transform: Transform2::IDENTITY,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.01,
            force: Vec2::ZERO,
            torque: 0.0,
            timed: Vec::new(),
            flags: BodyFlags::AUTO_SLEEP,
            sleep_time: 0.0,
        }
    }

    // --- fixtures ---

    /// Attach a fixture. Mass is not recomputed.
    pub fn add_fixture(&mut self, fixture: BodyFixture) {
        self.fixtures.push(fixture);
    }

    /// Detach the fixture with the given identifier. Mass is not recomputed.
    pub fn remove_fixture(&mut self, id: &str) -> Option<BodyFixture> {
        let index = self.fixtures.iter().position(|f| f.has_id(id))?;
        Some(self.fixtures.remove(index))
    }

    /// All fixtures in attachment order
    pub fn fixtures(&self) -> &[BodyFixture] {
        &self.fixtures
    }

    /// Fixture with the given identifier
    pub fn fixture(&self, id: &str) -> Option<&BodyFixture> {
        self.fixtures.iter().find(|f| f.has_id(id))
    }

    /// Mutable fixture with the given identifier
    pub fn fixture_mut(&mut self, id: &str) -> Option<&mut BodyFixture> {
        self.fixtures.iter_mut().find(|f| f.has_id(id))
    }

    /// Fixture by attachment index
    pub fn fixture_at(&self, index: usize) -> Option<&BodyFixture> {
        self.fixtures.get(index)
    }

    /// Number of attached fixtures
    pub fn fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    /// Shapes of all fixtures
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.fixtures.iter().map(|f| &f.shape)
    }

    // --- mass ---

    /// Recompute the mass distribution from the fixtures (O(fixtures))
    pub fn update_mass(&mut self, mass_type: MassType) {
        let parts: Vec<MassData> = self
            .fixtures
            .iter()
            .map(|f| f.shape.mass_properties(f.density))
            .collect();
        let mut mass = MassData::combine(&parts);
        if mass_type == MassType::Infinite {
            mass.mass = 0.0;
            mass.inertia = 0.0;
        }
        self.mass_type = mass_type;
        self.assign_mass(mass);
    }

    /// Replace the mass distribution of a normal body
    pub fn set_mass(&mut self, mass: MassData) {
        self.mass_type = MassType::Normal;
        self.assign_mass(mass);
    }

    fn assign_mass(&mut self, mass: MassData) {
        self.mass = mass;
        let movable = self.mass_type == MassType::Normal;
        self.inv_mass = if movable && mass.mass > 0.0 { 1.0 / mass.mass } else { 0.0 };
        self.inv_inertia = if movable && mass.inertia > 0.0 { 1.0 / mass.inertia } else { 0.0 };
    }

    /// Current mass distribution
    pub fn mass(&self) -> &MassData {
        &self.mass
    }

    /// Current mass type
    pub fn mass_type(&self) -> MassType {
        self.mass_type
    }

    /// Inverse mass, zero for immovable bodies
    pub fn inverse_mass(&self) -> f64 {
        self.inv_mass
    }

    /// Inverse rotational inertia, zero for immovable bodies
    pub fn inverse_inertia(&self) -> f64 {
        self.inv_inertia
    }

    // --- transform ---

    /// Local-to-world transform
    pub fn transform(&self) -> &Transform2 {
        &self.transform
    }

    /// Replace the local-to-world transform
    pub fn set_transform(&mut self, transform: Transform2) {
        self.transform = transform;
    }

    /// Translate the body in world space
    pub fn translate(&mut self, delta: Vec2) {
        self.transform.translate(delta);
    }

    /// Move the body origin back to the world origin, keeping its rotation
    pub fn translate_to_origin(&mut self) {
        self.transform.translation = Vec2::ZERO;
    }

    /// Rotate about the world origin
    pub fn rotate(&mut self, angle: f64) {
        self.transform.rotate_about(angle, Vec2::ZERO);
    }

    /// Rotate about the world-space center of mass
    pub fn rotate_about_center(&mut self, angle: f64) {
        let center = self.world_center();
        self.transform.rotate_about(angle, center);
    }

    /// Center of mass in the local frame
    pub fn local_center(&self) -> Vec2 {
        self.mass.center
    }

    /// Center of mass in world space
    pub fn world_center(&self) -> Vec2 {
        self.transform.transform_point(self.mass.center)
    }

    /// World-space bounds over all fixtures
    pub fn aabb(&self) -> Aabb2 {
        self.fixtures
            .iter()
            .map(|f| f.shape.aabb(&self.transform))
            .fold(Aabb2::EMPTY, |acc, b| acc.merge(&b))
    }

    // --- velocity ---

    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec2) {
        self.linear_velocity = velocity;
    }

    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    pub fn set_angular_velocity(&mut self, velocity: f64) {
        self.angular_velocity = velocity;
    }

    pub fn linear_damping(&self) -> f64 {
        self.linear_damping
    }

    pub fn set_linear_damping(&mut self, damping: f64) {
        self.linear_damping = damping;
    }

    pub fn angular_damping(&self) -> f64 {
        self.angular_damping
    }

    pub fn set_angular_damping(&mut self, damping: f64) {
        self.angular_damping = damping;
    }

    // --- loads ---

    /// Apply a force at the center of mass for the next step
    pub fn apply_force(&mut self, force: Vec2) {
        self.force += force;
        self.wake_up();
    }

    /// Apply a torque for the next step
    pub fn apply_torque(&mut self, torque: f64) {
        self.torque += torque;
        self.wake_up();
    }

    /// Apply a force at a world-space point for the next step
    pub fn apply_force_at(&mut self, force: Vec2, point: Vec2) {
        self.force += force;
        self.torque += cross(point - self.world_center(), force);
        self.wake_up();
    }

    /// Apply a force at a world-space point, repeated every step for `duration` seconds
    pub fn apply_timed_force_at(&mut self, force: Vec2, point: Vec2, duration: f64) {
        self.timed.push(TimedLoad {
            force,
            torque: cross(point - self.world_center(), force),
            remaining: duration,
        });
        self.wake_up();
    }

    /// Apply an impulse at a world-space point, changing velocity immediately
    pub fn apply_impulse_at(&mut self, impulse: Vec2, point: Vec2) {
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia * cross(point - self.world_center(), impulse);
        self.wake_up();
    }

    /// Force accumulated for the next step (excluding timed loads)
    pub fn accumulated_force(&self) -> Vec2 {
        self.force
    }

    /// Torque accumulated for the next step (excluding timed loads)
    pub fn accumulated_torque(&self) -> f64 {
        self.torque
    }

    /// Number of timed loads still active
    pub fn timed_load_count(&self) -> usize {
        self.timed.len()
    }

    /// Drain the loads for a step of length `dt`.
    ///
    /// Returns the net force and torque, clears the accumulators and retires
    /// timed loads whose duration has run out.
    pub fn take_loads(&mut self, dt: f64) -> (Vec2, f64) {
        let mut force = std::mem::take(&mut self.force);
        let mut torque = std::mem::take(&mut self.torque);
        for load in &mut self.timed {
            force += load.force;
            torque += load.torque;
            load.remaining -= dt;
        }
        self.timed.retain(|load| load.remaining >= helm_core::EPSILON);
        (force, torque)
    }

    // --- flags ---

    pub fn flags(&self) -> BodyFlags {
        self.flags
    }

    pub fn is_bullet(&self) -> bool {
        self.flags.contains(BodyFlags::BULLET)
    }

    pub fn set_bullet(&mut self, bullet: bool) {
        self.flags.set(BodyFlags::BULLET, bullet);
    }

    pub fn is_asleep(&self) -> bool {
        self.flags.contains(BodyFlags::ASLEEP)
    }

    /// Put the body to sleep, clearing velocities and pending loads
    pub fn sleep(&mut self) {
        self.flags.insert(BodyFlags::ASLEEP);
        self.linear_velocity = Vec2::ZERO;
        self.angular_velocity = 0.0;
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }

    /// Wake the body up
    pub fn wake_up(&mut self) {
        self.flags.remove(BodyFlags::ASLEEP);
        self.sleep_time = 0.0;
    }

    pub fn set_auto_sleep(&mut self, auto_sleep: bool) {
        self.flags.set(BodyFlags::AUTO_SLEEP, auto_sleep);
    }

    /// Accumulate rest time; returns the total time spent at rest
    pub fn accumulate_rest(&mut self, dt: f64) -> f64 {
        self.sleep_time += dt;
        self.sleep_time
    }

    /// Reset the rest timer
    pub fn reset_rest(&mut self) {
        self.sleep_time = 0.0;
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}
