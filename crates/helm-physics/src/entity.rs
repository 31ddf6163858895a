//! Live entities
//!
//! An [`Entity`] is realized from a [`PhysicsEntityDefinition`] and owns the
//! engine-native [`Body`], its [`ThrusterSystem`] and its own
//! [`ListenerRelay`]. Entities are shared through [`EntityHandle`]s, which pair
//! a stable [`EntityId`] with the lock guarding the entity.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use helm_core::{Aabb2, EPSILON, Transform2, Vec2};
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::body::{Body, BodyFixture, MassData, MassType};
use crate::definition::{FixtureDefinition, PhysicsEntityDefinition, ThrustPointDefinition};
use crate::listener::{Listenable, ListenerRelay};
use crate::shape::Shape;
use crate::thruster::ThrusterSystem;
use crate::{EntityType, PhysicsError, PhysicsResult, validate};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw id, for engines and tests that fabricate events
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

type Callback = Box<dyn FnMut() + Send>;

/// A simulated object bound to one engine body
pub struct Entity {
    id: EntityId,
    entity_type: EntityType,
    body: Body,
    thrusters: ThrusterSystem,
    listeners: RwLock<ListenerRelay>,
    callback: Callback,
    user_data: Option<Box<dyn Any + Send + Sync>>,
}

impl Entity {
    /// Realize an entity from its definition.
    ///
    /// The definition is validated first; it need not be locked.
    pub fn new(def: &PhysicsEntityDefinition) -> PhysicsResult<Self> {
        def.validate()?;

        let mut body = Body::with_capacity(def.fixtures().len());
        body.rotate(def.orientation());
        body.translate(def.position());
        for fixture in def.fixtures() {
            body.add_fixture(build_fixture(fixture));
        }
        body.update_mass(MassType::Normal);

        let mut entity = Self {
            id: EntityId::next(),
            entity_type: def.entity_type(),
            body,
            thrusters: ThrusterSystem::with_capacity(def.thrust_points().len()),
            listeners: RwLock::new(ListenerRelay::new()),
            callback: Box::new(|| {}),
            user_data: None,
        };
        entity.recalculate_center_of_mass();
        entity.assign_mass(def.mass());
        entity.body.set_linear_damping(def.linear_damping());
        entity.body.set_angular_damping(def.angular_damping());
        for thrust_point in def.thrust_points() {
            entity.thrusters.add_thruster(thrust_point)?;
        }

        log::debug!(
            "Created {} ({:?}, {} fixtures, {} thrust points)",
            entity.id,
            entity.entity_type,
            entity.body.fixture_count(),
            entity.thrusters.thruster_count()
        );
        Ok(entity)
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Engine-native state, read-only
    pub fn body(&self) -> &Body {
        &self.body
    }

    // --- fixtures ---

    pub fn fixture_count(&self) -> usize {
        self.body.fixture_count()
    }

    pub fn has_fixture(&self, id: &str) -> bool {
        self.body.fixture(id).is_some()
    }

    pub fn fixture(&self, id: &str) -> Option<&BodyFixture> {
        self.body.fixture(id)
    }

    /// Shapes of all fixtures in the local frame
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.body.shapes()
    }

    /// Attach a new fixture and recompute the mass distribution.
    ///
    /// Expensive: O(fixtures). Keep it off hot paths.
    pub fn add_fixture(&mut self, fixture: &FixtureDefinition) -> PhysicsResult<()> {
        if let Some(id) = fixture.identifier() {
            if self.has_fixture(id) {
                return Err(PhysicsError::DuplicateIdentifier {
                    kind: "fixture",
                    id: id.to_string(),
                });
            }
        }
        self.body.add_fixture(build_fixture(fixture));
        self.recalculate_center_of_mass();
        self.notify();
        Ok(())
    }

    /// Detach a fixture and recompute the mass distribution. Unknown
    /// identifiers are ignored.
    ///
    /// Expensive: O(fixtures). Keep it off hot paths.
    pub fn remove_fixture(&mut self, id: &str) -> PhysicsResult<()> {
        validate::identifier("fixture identifier", id)?;
        if self.body.remove_fixture(id).is_some() {
            self.recalculate_center_of_mass();
            self.notify();
        }
        Ok(())
    }

    pub fn is_sensor(&self, id: &str) -> PhysicsResult<bool> {
        validate::identifier("fixture identifier", id)?;
        self.body
            .fixture(id)
            .map(|f| f.sensor)
            .ok_or_else(|| PhysicsError::UnknownFixture(id.to_string()))
    }

    pub fn set_sensor(&mut self, id: &str, sensor: bool) -> PhysicsResult<()> {
        validate::identifier("fixture identifier", id)?;
        let fixture = self
            .body
            .fixture_mut(id)
            .ok_or_else(|| PhysicsError::UnknownFixture(id.to_string()))?;
        fixture.sensor = sensor;
        self.notify();
        Ok(())
    }

    // --- mass ---

    /// Center of mass in the local frame
    pub fn center_of_mass(&self) -> Vec2 {
        self.body.local_center()
    }

    /// Center of mass in world space
    pub fn world_center(&self) -> Vec2 {
        self.body.world_center()
    }

    pub fn mass(&self) -> f64 {
        self.body.mass().mass
    }

    /// Set the total mass, keeping the center of mass and scaling the
    /// inertia. Ignored for static entities.
    pub fn set_mass(&mut self, mass: f64) -> PhysicsResult<()> {
        let mass = validate::non_negative("mass", mass)?;
        if self.entity_type.is_movable() {
            self.assign_mass(mass);
            self.notify();
        }
        Ok(())
    }

    fn assign_mass(&mut self, mass: f64) {
        if !self.entity_type.is_movable() {
            return;
        }
        let mut old = *self.body.mass();
        if old.mass <= 0.0 || old.inertia <= 0.0 {
            // A massless body keeps no distribution to scale; rebuild it from the fixtures.
            self.body.update_mass(MassType::Normal);
            old = *self.body.mass();
        }
        let inertia = if old.mass > 0.0 { old.inertia * mass / old.mass } else { 0.0 };
        self.body.set_mass(MassData::new(old.center, mass, inertia));
        self.thrusters.update(old.center);
    }

    /// Recompute the mass distribution from the fixtures, keeping the total mass
    fn recalculate_center_of_mass(&mut self) {
        let mass = self.body.mass().mass;
        match self.entity_type {
            EntityType::Static => {
                self.body.update_mass(MassType::Infinite);
                return;
            }
            EntityType::Bullet => {
                self.body.set_bullet(true);
                self.body.update_mass(MassType::Normal);
            }
            EntityType::Default => self.body.update_mass(MassType::Normal),
        }
        self.assign_mass(mass);
    }

    // --- transform ---

    /// World position of the local origin
    pub fn position(&self) -> Vec2 {
        self.body.transform().translation
    }

    pub fn set_position(&mut self, position: Vec2) -> PhysicsResult<()> {
        let position = validate::finite_vector("position", position)?;
        self.body.translate_to_origin();
        self.body.translate(position);
        self.notify();
        Ok(())
    }

    /// Orientation in radians, in `(-π, π]`
    pub fn orientation(&self) -> f64 {
        self.body.transform().rotation()
    }

    /// Rotate about the center of mass to the given orientation
    pub fn set_orientation(&mut self, orientation: f64) -> PhysicsResult<()> {
        let orientation = validate::finite("orientation", orientation)?;
        self.body.rotate_about_center(orientation - self.orientation());
        self.notify();
        Ok(())
    }

    pub fn transform(&self) -> &Transform2 {
        self.body.transform()
    }

    /// World-space bounds over all fixtures
    pub fn bounds(&self) -> Aabb2 {
        self.body.aabb()
    }

    // --- velocity ---

    pub fn linear_velocity(&self) -> Vec2 {
        self.body.linear_velocity()
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec2) -> PhysicsResult<()> {
        self.body.set_linear_velocity(validate::finite_vector("velocity", velocity)?);
        Ok(())
    }

    pub fn angular_velocity(&self) -> f64 {
        self.body.angular_velocity()
    }

    pub fn set_angular_velocity(&mut self, velocity: f64) -> PhysicsResult<()> {
        self.body.set_angular_velocity(validate::finite("angular velocity", velocity)?);
        Ok(())
    }

    // --- loads ---

    /// Apply `force` at the world-space `point` during the next `duration` seconds
    pub fn apply_force(&mut self, point: Vec2, force: Vec2, duration: f64) -> PhysicsResult<()> {
        let point = validate::finite_vector("point", point)?;
        let force = validate::non_zero_vector("force", force)?;
        let duration = validate::non_negative("duration", duration)?;
        self.body.apply_timed_force_at(force, point, duration);
        Ok(())
    }

    /// Apply an impulse at the world-space `point`
    pub fn apply_impulse(&mut self, point: Vec2, impulse: Vec2) -> PhysicsResult<()> {
        let point = validate::finite_vector("point", point)?;
        let impulse = validate::non_zero_vector("impulse", impulse)?;
        self.body.apply_impulse_at(impulse, point);
        Ok(())
    }

    /// Queue the current thruster output for the next step. Static entities
    /// never receive thrust.
    pub(crate) fn apply_thrust(&mut self) {
        if !self.entity_type.is_movable() || self.thrusters.is_idle() {
            return;
        }
        let torque = self.thrusters.torque();
        if torque.abs() > EPSILON {
            self.body.apply_torque(torque);
        }
        let force = self.thrusters.force(self.body.transform());
        if force != Vec2::ZERO {
            self.body.apply_force(force);
        }
    }

    // --- thrust points ---

    pub fn set_thrust(&mut self, id: &str, thrust: f64) -> PhysicsResult<()> {
        self.thrusters.set_thrust(id, thrust)
    }

    pub fn thrust(&self, id: &str) -> PhysicsResult<f64> {
        self.thrusters.thrust(id)
    }

    pub fn add_thrust_point(&mut self, thrust_point: &ThrustPointDefinition) -> PhysicsResult<()> {
        self.thrusters.add_thruster(thrust_point)
    }

    /// Unknown identifiers are ignored
    pub fn remove_thrust_point(&mut self, id: &str) -> PhysicsResult<()> {
        self.thrusters.remove_thruster(id)
    }

    pub fn thrust_point_count(&self) -> usize {
        self.thrusters.thruster_count()
    }

    pub fn thrusters(&self) -> &ThrusterSystem {
        &self.thrusters
    }

    // --- sleep ---

    pub fn wake_up(&mut self) {
        self.body.wake_up();
    }

    pub fn is_asleep(&self) -> bool {
        self.body.is_asleep()
    }

    // --- user data and callback ---

    pub fn user_data(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.user_data.as_deref()
    }

    /// User data downcast to `T`
    pub fn user_data_as<T: Any>(&self) -> Option<&T> {
        self.user_data.as_deref().and_then(|data| data.downcast_ref::<T>())
    }

    /// Replace the user data, returning the previous value
    pub fn set_user_data<T: Any + Send + Sync>(
        &mut self,
        data: T,
    ) -> Option<Box<dyn Any + Send + Sync>> {
        self.user_data.replace(Box::new(data))
    }

    pub fn take_user_data(&mut self) -> Option<Box<dyn Any + Send + Sync>> {
        self.user_data.take()
    }

    /// Install the hook run after every change to geometry, mass or transform
    pub fn set_callback(&mut self, callback: impl FnMut() + Send + 'static) {
        self.callback = Box::new(callback);
    }

    /// Restore the no-op hook
    pub fn clear_callback(&mut self) {
        self.callback = Box::new(|| {});
    }

    fn notify(&mut self) {
        (self.callback)();
    }

    // --- stepping ---

    pub(crate) fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Body and relay borrowed together for one engine step
    pub(crate) fn step_parts(&mut self) -> (&mut Body, &ListenerRelay) {
        (&mut self.body, self.listeners.get_mut())
    }

    /// Copy of the relay for dispatching without holding any lock
    pub(crate) fn relay_snapshot(&self) -> ListenerRelay {
        self.listeners.read().clone()
    }
}

impl Listenable for Entity {
    fn listeners(&self) -> &RwLock<ListenerRelay> {
        &self.listeners
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("entity_type", &self.entity_type)
            .field("position", &self.position())
            .field("orientation", &self.orientation())
            .field("mass", &self.mass())
            .field("fixtures", &self.fixture_count())
            .field("thrust_points", &self.thrust_point_count())
            .field("listeners", &*self.listeners.read())
            .finish_non_exhaustive()
    }
}

fn build_fixture(def: &FixtureDefinition) -> BodyFixture {
    let mut fixture = BodyFixture::new(def.shape().clone());
    fixture.density = def.density();
    fixture.friction = def.friction();
    fixture.restitution = def.restitution();
    fixture.sensor = def.is_sensor();
    fixture.id = def.identifier().map(str::to_string);
    fixture
}

/// Shared reference to a live entity
#[derive(Clone)]
pub struct EntityHandle {
    id: EntityId,
    inner: Arc<Mutex<Entity>>,
}

impl EntityHandle {
    pub fn new(entity: Entity) -> Self {
        Self {
            id: entity.id(),
            inner: Arc::new(Mutex::new(entity)),
        }
    }

    /// Identifier, readable without locking
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Lock the entity.
    ///
    /// Spawned entities are locked by the manager for the duration of a world
    /// step, so filters and collision listeners must not call this.
    pub fn lock(&self) -> MutexGuard<'_, Entity> {
        self.inner.lock()
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, Entity>> {
        self.inner.try_lock()
    }

    /// Whether both handles refer to the same entity
    pub fn ptr_eq(&self, other: &EntityHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityHandle").field(&self.id).finish()
    }
}

impl PartialEq for EntityHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for EntityHandle {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;
    use std::sync::atomic::AtomicUsize;

    const EPS: f64 = 1.0e-9;

    fn square(id: &str, size: f64) -> FixtureDefinition {
        FixtureDefinition::with_identifier(Shape::rectangle(size, size).unwrap(), id).unwrap()
    }

    fn ship(entity_type: EntityType) -> PhysicsEntityDefinition {
        let mut def = PhysicsEntityDefinition::new(entity_type);
        def.set_mass(4.0)
            .unwrap()
            .add_fixture(square("hull", 2.0))
            .unwrap()
            .add_thrust_point(
                ThrustPointDefinition::new(Vec2::new(1.0, 0.0), Vec2::Y, "right").unwrap(),
            )
            .unwrap();
        def
    }

    #[test]
    fn test_entity_ids_are_unique() {
        let a = Entity::new(&ship(EntityType::Default)).unwrap();
        let b = Entity::new(&ship(EntityType::Default)).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_construction_from_definition() {
        let mut def = ship(EntityType::Bullet);
        def.set_position(Vec2::new(3.0, 4.0)).unwrap().set_orientation(FRAC_PI_2).unwrap();
        def.set_linear_damping(0.5).unwrap();
        let entity = Entity::new(&def).unwrap();

        assert_eq!(entity.entity_type(), EntityType::Bullet);
        assert!(entity.body().is_bullet());
        assert_eq!(entity.fixture_count(), 1);
        assert!(entity.has_fixture("hull"));
        assert_eq!(entity.thrust_point_count(), 1);
        assert!((entity.mass() - 4.0).abs() < EPS);
        assert!((entity.position() - Vec2::new(3.0, 4.0)).length() < EPS);
        assert!((entity.orientation() - FRAC_PI_2).abs() < EPS);
        assert!((entity.world_center() - Vec2::new(3.0, 4.0)).length() < EPS);
        assert_eq!(entity.body().linear_damping(), 0.5);
        assert_eq!(
            entity.body().angular_damping(),
            PhysicsEntityDefinition::DEFAULT_ANGULAR_DAMPING
        );
    }

    #[test]
    fn test_invalid_definition_is_rejected() {
        let def = PhysicsEntityDefinition::new(EntityType::Default);
        assert!(matches!(Entity::new(&def), Err(PhysicsError::InvalidDefinition(_))));
        let floor = PhysicsEntityDefinition::new(EntityType::Static);
        assert!(Entity::new(&floor).is_ok());
    }

    #[test]
    fn test_static_entity_has_infinite_mass() {
        let mut entity = Entity::new(&ship(EntityType::Static)).unwrap();
        assert_eq!(entity.mass(), 0.0);
        assert_eq!(entity.body().mass_type(), MassType::Infinite);
        entity.set_mass(10.0).unwrap();
        assert_eq!(entity.mass(), 0.0);
        entity.set_thrust("right", 5.0).unwrap();
        entity.apply_thrust();
        assert_eq!(entity.body().accumulated_force(), Vec2::ZERO);
    }

    #[test]
    fn test_set_mass_scales_inertia() {
        let mut entity = Entity::new(&ship(EntityType::Default)).unwrap();
        let inertia = entity.body().mass().inertia;
        entity.set_mass(8.0).unwrap();
        assert!((entity.body().mass().inertia - inertia * 2.0).abs() < EPS);
        assert!(entity.set_mass(-1.0).is_err());
    }

    #[test]
    fn test_set_mass_recovers_from_zero_mass() {
        let reference = Entity::new(&ship(EntityType::Default)).unwrap();
        let mut def = ship(EntityType::Default);
        def.set_mass(0.0).unwrap();
        let mut entity = Entity::new(&def).unwrap();
        assert_eq!(entity.mass(), 0.0);

        entity.set_mass(4.0).unwrap();
        assert!((entity.mass() - 4.0).abs() < EPS);
        let inertia = entity.body().mass().inertia;
        assert!(inertia > 0.0);
        assert!((inertia - reference.body().mass().inertia).abs() < EPS);
        assert!(entity.body().inverse_inertia() > 0.0);

        entity.set_thrust("right", 1.0).unwrap();
        entity.apply_thrust();
        assert!(entity.body().accumulated_torque() > 0.0);
    }

    #[test]
    fn test_fixture_management_moves_center_of_mass() {
        let mut entity = Entity::new(&ship(EntityType::Default)).unwrap();
        let mut offset = square("pod", 2.0);
        offset.set_shape(Shape::circle_at(Vec2::new(4.0, 0.0), 0.5).unwrap()).unwrap();
        entity.add_fixture(&offset).unwrap();
        assert!(entity.center_of_mass().x > 0.0);
        assert!((entity.mass() - 4.0).abs() < EPS);
        assert!(matches!(
            entity.add_fixture(&offset),
            Err(PhysicsError::DuplicateIdentifier { .. })
        ));

        entity.remove_fixture("pod").unwrap();
        assert!(entity.center_of_mass().length() < EPS);
        assert_eq!(entity.fixture_count(), 1);

        entity.remove_fixture("unknown").unwrap();
        assert_eq!(entity.fixture_count(), 1);
        assert!(entity.remove_fixture("").is_err());
    }

    #[test]
    fn test_sensor_lookup() {
        let mut entity = Entity::new(&ship(EntityType::Default)).unwrap();
        assert_eq!(entity.is_sensor("hull"), Ok(false));
        entity.set_sensor("hull", true).unwrap();
        assert_eq!(entity.is_sensor("hull"), Ok(true));
        assert_eq!(entity.is_sensor("wing"), Err(PhysicsError::UnknownFixture("wing".into())));
        assert!(entity.set_sensor("wing", true).is_err());
    }

    #[test]
    fn test_callback_fires_on_mutation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut entity = Entity::new(&ship(EntityType::Default)).unwrap();
        let counter = calls.clone();
        entity.set_callback(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        entity.set_position(Vec2::new(1.0, 1.0)).unwrap();
        entity.set_orientation(0.3).unwrap();
        entity.set_mass(2.0).unwrap();
        entity.set_sensor("hull", true).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        entity.add_fixture(&square("pod", 1.0)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        entity.remove_fixture("pod").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        entity.remove_fixture("pod").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 6);

        entity.set_linear_velocity(Vec2::X).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 6);

        entity.clear_callback();
        entity.set_position(Vec2::ZERO).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_set_orientation_rotates_about_center() {
        let mut entity = Entity::new(&ship(EntityType::Default)).unwrap();
        entity.set_position(Vec2::new(2.0, 0.0)).unwrap();
        entity.set_orientation(1.0).unwrap();
        assert!((entity.orientation() - 1.0).abs() < EPS);
        assert!((entity.world_center() - Vec2::new(2.0, 0.0)).length() < EPS);
    }

    #[test]
    fn test_force_and_impulse_validation() {
        let mut entity = Entity::new(&ship(EntityType::Default)).unwrap();
        assert!(entity.apply_force(Vec2::ZERO, Vec2::ZERO, 1.0).is_err());
        assert!(entity.apply_force(Vec2::ZERO, Vec2::X, -1.0).is_err());
        assert!(entity.apply_force(Vec2::ZERO, Vec2::X, f64::INFINITY).is_err());
        entity.apply_force(Vec2::ZERO, Vec2::X, 1.0).unwrap();
        assert_eq!(entity.body().timed_load_count(), 1);

        assert!(entity.apply_impulse(Vec2::ZERO, Vec2::ZERO).is_err());
        entity.apply_impulse(Vec2::ZERO, Vec2::new(4.0, 0.0)).unwrap();
        assert!((entity.linear_velocity() - Vec2::new(1.0, 0.0)).length() < EPS);
    }

    #[test]
    fn test_thrust_in_world_frame() {
        let mut def = ship(EntityType::Default);
        def.set_orientation(FRAC_PI_2).unwrap();
        let mut entity = Entity::new(&def).unwrap();
        entity.set_thrust("right", 2.0).unwrap();
        assert_eq!(entity.thrust("right"), Ok(2.0));
        entity.apply_thrust();
        assert!((entity.body().accumulated_force() - Vec2::new(-2.0, 0.0)).length() < EPS);
        assert!((entity.body().accumulated_torque() - 2.0).abs() < EPS);

        assert!(matches!(entity.set_thrust("left", 1.0), Err(PhysicsError::UnknownThrustPoint(_))));
        entity.remove_thrust_point("right").unwrap();
        entity.remove_thrust_point("right").unwrap();
        assert_eq!(entity.thrust_point_count(), 0);
    }

    #[test]
    fn test_user_data() {
        let mut entity = Entity::new(&ship(EntityType::Default)).unwrap();
        assert!(entity.user_data().is_none());
        entity.set_user_data(String::from("player"));
        assert_eq!(entity.user_data_as::<String>().map(String::as_str), Some("player"));
        assert!(entity.user_data_as::<u32>().is_none());
        assert!(entity.take_user_data().is_some());
        assert!(entity.user_data().is_none());
    }

    #[test]
    fn test_entity_relay_registration() {
        let entity = Entity::new(&ship(EntityType::Default)).unwrap();
        let listener: Arc<dyn crate::listener::UpdateListener> = Arc::new(|| {});
        entity.add_update_listener(listener.clone());
        entity.add_update_listener(listener.clone());
        assert_eq!(entity.relay_snapshot().update_listener_count(), 1);
        entity.remove_update_listener(&listener);
        assert!(entity.relay_snapshot().is_empty());
    }

    #[test]
    fn test_handle_identity() {
        let handle = EntityHandle::new(Entity::new(&ship(EntityType::Default)).unwrap());
        let copy = handle.clone();
        assert_eq!(handle, copy);
        assert_eq!(handle.id(), copy.lock().id());
        let other = EntityHandle::new(Entity::new(&ship(EntityType::Default)).unwrap());
        assert_ne!(handle, other);
    }
}
