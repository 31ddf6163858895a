//! Physics manager
//!
//! [`PhysicsManager`] owns the world lifecycle (uninitialised, then
//! initialised, never back), the set of spawned entities, the global listener
//! relay, and drives the [`RigidBodyEngine`].
//!
//! Every method takes `&self`; the manager is meant to be shared behind an
//! `Arc`. Lock order is world, then config, then spawned list, then
//! entities. The config lock is never held while listeners run, so the
//! read-only queries stay available to filters and collision listeners.
//! Update listeners run after all locks are released, so they may spawn,
//! despawn and mutate entities freely.

use std::ops::AddAssign;
use std::sync::Arc;

use helm_core::time::validate_step;
use helm_core::{FixedTimeStep, ScopedTimer, Vec2};
use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::definition::PhysicsEntityDefinition;
use crate::engine::{BodyEntry, RigidBodyEngine, StepEvents};
use crate::entity::{Entity, EntityHandle, EntityId};
use crate::listener::{CollisionPoint, FixturePair, Listenable, ListenerRelay, TimeOfImpact};
use crate::sandbox::SandboxEngine;
use crate::{PhysicsError, PhysicsResult, WorldConfig, validate};

type SpawnedMap = IndexMap<EntityId, EntityHandle>;

struct World<E> {
    engine: E,
}

/// Event counts for one or more steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Broad-phase pairs offered to the filters
    pub pairs: usize,
    /// Pairs vetoed by at least one filter
    pub vetoed_pairs: usize,
    /// Time-of-impact events offered to the listeners
    pub impacts: usize,
    /// Time-of-impact events vetoed by at least one listener
    pub vetoed_impacts: usize,
    /// Collisions delivered to listeners
    pub collisions: usize,
}

impl AddAssign for StepStats {
    fn add_assign(&mut self, other: Self) {
        self.pairs += other.pairs;
        self.vetoed_pairs += other.vetoed_pairs;
        self.impacts += other.impacts;
        self.vetoed_impacts += other.vetoed_impacts;
        self.collisions += other.collisions;
    }
}

/// Read-only live view of the spawned entities.
///
/// The view follows spawn and despawn calls made after it was obtained.
#[derive(Clone)]
pub struct SpawnedEntities {
    inner: Arc<RwLock<SpawnedMap>>,
}

impl SpawnedEntities {
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.inner.read().contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<EntityHandle> {
        self.inner.read().get(&id).cloned()
    }

    /// Identifiers in spawn order
    pub fn ids(&self) -> Vec<EntityId> {
        self.inner.read().keys().copied().collect()
    }

    /// Handles in spawn order, as of now
    pub fn handles(&self) -> Vec<EntityHandle> {
        self.inner.read().values().cloned().collect()
    }
}

impl std::fmt::Debug for SpawnedEntities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.inner.read().keys()).finish()
    }
}

/// Routes engine events to the global relay and the participants' relays
struct Dispatcher<'a> {
    global: &'a ListenerRelay,
    relays: &'a IndexMap<EntityId, &'a ListenerRelay>,
    stats: StepStats,
}

impl<'a> Dispatcher<'a> {
    fn participants(&self, a: EntityId, b: EntityId) -> [Option<&'a ListenerRelay>; 2] {
        let first = self.relays.get(&a).copied();
        let second = if a == b { None } else { self.relays.get(&b).copied() };
        [first, second]
    }
}

impl StepEvents for Dispatcher<'_> {
    fn filter(&mut self, pair: &FixturePair) -> bool {
        self.stats.pairs += 1;
        let mut accepted = self.global.filter(pair);
        for relay in self.participants(pair.entity0, pair.entity1).into_iter().flatten() {
            accepted &= relay.filter(pair);
        }
        if !accepted {
            self.stats.vetoed_pairs += 1;
        }
        accepted
    }

    fn time_of_impact(&mut self, toi: &TimeOfImpact) -> bool {
        self.stats.impacts += 1;
        let mut accepted = self.global.time_of_impact(toi);
        for relay in self.participants(toi.entity0, toi.entity1).into_iter().flatten() {
            accepted &= relay.time_of_impact(toi);
        }
        if !accepted {
            self.stats.vetoed_impacts += 1;
        }
        accepted
    }

    fn collision(&mut self, point: &CollisionPoint) {
        self.stats.collisions += 1;
        self.global.collision(point);
        for relay in self.participants(point.entity0, point.entity1).into_iter().flatten() {
            relay.collision(point);
        }
    }
}

/// World lifecycle, spawning, stepping and global listeners
pub struct PhysicsManager<E: RigidBodyEngine = SandboxEngine> {
    world: Mutex<World<E>>,
    config: RwLock<Option<WorldConfig>>,
    spawned: Arc<RwLock<SpawnedMap>>,
    listeners: RwLock<ListenerRelay>,
}

impl PhysicsManager<SandboxEngine> {
    /// Manager backed by the reference engine
    pub fn new() -> Self {
        Self::with_engine(SandboxEngine::default())
    }
}

impl Default for PhysicsManager<SandboxEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RigidBodyEngine> PhysicsManager<E> {
    /// Manager backed by `engine`. The world still needs initialising.
    pub fn with_engine(engine: E) -> Self {
        Self {
            world: Mutex::new(World { engine }),
            config: RwLock::new(None),
            spawned: Arc::new(RwLock::new(IndexMap::new())),
            listeners: RwLock::new(ListenerRelay::new()),
        }
    }

    /// Initialise the world with default settings and the given gravity
    pub fn initialise_world(&self, gravity: Vec2) -> PhysicsResult<()> {
        self.initialise_world_with(WorldConfig::with_gravity(gravity))
    }

    /// Initialise the world. Fails if it already is.
    pub fn initialise_world_with(&self, config: WorldConfig) -> PhysicsResult<()> {
        validate::finite_vector("gravity", config.gravity)?;
        validate_step(config.fixed_timestep)?;
        if config.substeps == 0 {
            return Err(PhysicsError::InvalidArgument("substeps must be at least 1".to_string()));
        }
        validate::non_negative("sleep linear threshold", config.sleep_linear_threshold)?;
        validate::non_negative("sleep angular threshold", config.sleep_angular_threshold)?;
        validate::non_negative("sleep time", config.sleep_time)?;

        let mut world = self.world.lock();
        let mut current = self.config.write();
        if current.is_some() {
            return Err(PhysicsError::WorldAlreadyInitialised);
        }
        world.engine.configure(&config);
        log::info!("Physics world initialised (gravity {})", config.gravity);
        *current = Some(config);
        Ok(())
    }

    /// Never blocks on a running step.
    pub fn is_initialised(&self) -> bool {
        self.config.read().is_some()
    }

    /// Settings the world was initialised with, gravity included
    pub fn config(&self) -> PhysicsResult<WorldConfig> {
        self.config.read().clone().ok_or(PhysicsError::WorldUninitialised)
    }

    /// Never blocks on a running step, so listeners may call it.
    pub fn gravity(&self) -> PhysicsResult<Vec2> {
        self.config
            .read()
            .as_ref()
            .map(|config| config.gravity)
            .ok_or(PhysicsError::WorldUninitialised)
    }

    /// Change the gravity. Waits for a running step, so listeners must not
    /// call it.
    pub fn set_gravity(&self, gravity: Vec2) -> PhysicsResult<()> {
        let gravity = validate::finite_vector("gravity", gravity)?;
        let mut world = self.initialised_world()?;
        world.engine.set_gravity(gravity);
        if let Some(config) = self.config.write().as_mut() {
            config.gravity = gravity;
        }
        log::debug!("Gravity set to {gravity}");
        Ok(())
    }

    fn initialised_world(&self) -> PhysicsResult<MutexGuard<'_, World<E>>> {
        let world = self.world.lock();
        if self.config.read().is_none() {
            return Err(PhysicsError::WorldUninitialised);
        }
        Ok(world)
    }

    /// Realize an entity from its definition without touching the world.
    ///
    /// Safe to call from many threads at once, e.g. to pre-warm entity pools.
    pub fn create_entity(&self, def: &PhysicsEntityDefinition) -> PhysicsResult<EntityHandle> {
        Entity::new(def).map(EntityHandle::new)
    }

    /// Insert an entity into the live world
    pub fn spawn_entity(&self, entity: &EntityHandle) -> PhysicsResult<()> {
        let mut world = self.initialised_world()?;
        let mut spawned = self.spawned.write();
        let id = entity.id();
        if spawned.contains_key(&id) {
            return Err(PhysicsError::EntityAlreadySpawned(id));
        }
        world.engine.insert_body(id, entity.lock().body_mut());
        spawned.insert(id, entity.clone());
        log::debug!("Spawned {id} ({} in world)", spawned.len());
        Ok(())
    }

    /// Remove an entity from the live world. The entity stays usable and can
    /// be spawned again.
    pub fn despawn_entity(&self, entity: &EntityHandle) -> PhysicsResult<()> {
        let mut world = self.initialised_world()?;
        let mut spawned = self.spawned.write();
        let id = entity.id();
        if spawned.shift_remove(&id).is_none() {
            return Err(PhysicsError::EntityNotSpawned(id));
        }
        world.engine.remove_body(id);
        log::debug!("Despawned {id} ({} in world)", spawned.len());
        Ok(())
    }

    pub fn is_spawned(&self, entity: &EntityHandle) -> bool {
        self.spawned.read().contains_key(&entity.id())
    }

    /// Live view of the spawned entities
    pub fn spawned_entities(&self) -> SpawnedEntities {
        SpawnedEntities {
            inner: Arc::clone(&self.spawned),
        }
    }

    /// Advance the world by `dt` seconds.
    ///
    /// Thrust is applied to every spawned movable entity, the engine steps
    /// while filters, time-of-impact listeners and collision listeners are
    /// fanned out, and then, with every lock released, the global update
    /// listeners run followed by each spawned entity's update listeners.
    pub fn step_world(&self, dt: f64) -> PhysicsResult<StepStats> {
        let globals = self.listeners.read().clone();
        let stats = {
            let mut world = self.initialised_world()?;
            let dt = validate_step(dt)?;
            let _timer = ScopedTimer::traced("physics.step");

            let handles: Vec<EntityHandle> = self.spawned.read().values().cloned().collect();
            let mut guards: Vec<MutexGuard<'_, Entity>> =
                handles.iter().map(EntityHandle::lock).collect();
            let mut entries = Vec::with_capacity(guards.len());
            let mut relays = IndexMap::with_capacity(guards.len());
            for guard in guards.iter_mut() {
                let id = guard.id();
                guard.apply_thrust();
                let (body, relay) = guard.step_parts();
                entries.push(BodyEntry { id, body });
                relays.insert(id, relay);
            }

            let mut dispatcher = Dispatcher {
                global: &globals,
                relays: &relays,
                stats: StepStats::default(),
            };
            world.engine.step(dt, &mut entries, &mut dispatcher);
            log::trace!("Stepped {} bodies by {dt}s: {:?}", entries.len(), dispatcher.stats);
            dispatcher.stats
        };

        globals.update();
        for handle in self.spawned_entities().handles() {
            let relay = handle.lock().relay_snapshot();
            relay.update();
        }
        Ok(stats)
    }

    /// Advance the world by `total` seconds in `substeps` equal steps
    pub fn step_world_substeps(&self, total: f64, substeps: u32) -> PhysicsResult<StepStats> {
        if !self.is_initialised() {
            return Err(PhysicsError::WorldUninitialised);
        }
        let dt = FixedTimeStep::split(total, substeps)?;
        let mut stats = StepStats::default();
        for _ in 0..substeps {
            stats += self.step_world(dt)?;
        }
        Ok(stats)
    }
}

impl<E: RigidBodyEngine> Listenable for PhysicsManager<E> {
    fn listeners(&self) -> &RwLock<ListenerRelay> {
        &self.listeners
    }
}

impl<E: RigidBodyEngine> std::fmt::Debug for PhysicsManager<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsManager")
            .field("initialised", &self.is_initialised())
            .field("spawned", &self.spawned.read().len())
            .field("listeners", &*self.listeners.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityType;
    use crate::definition::FixtureDefinition;
    use crate::shape::Shape;

    fn ball() -> PhysicsEntityDefinition {
        let mut def = PhysicsEntityDefinition::new(EntityType::Default);
        def.add_fixture(FixtureDefinition::new(Shape::circle(0.5).unwrap())).unwrap();
        def
    }

    #[test]
    fn test_lifecycle_guards() {
        let manager = PhysicsManager::new();
        let entity = manager.create_entity(&ball()).unwrap();
        assert!(!manager.is_initialised());
        assert_eq!(manager.spawn_entity(&entity), Err(PhysicsError::WorldUninitialised));
        assert_eq!(manager.despawn_entity(&entity), Err(PhysicsError::WorldUninitialised));
        assert_eq!(manager.set_gravity(Vec2::ZERO), Err(PhysicsError::WorldUninitialised));
        assert_eq!(manager.gravity(), Err(PhysicsError::WorldUninitialised));
        assert_eq!(manager.step_world(0.1), Err(PhysicsError::WorldUninitialised));
        assert_eq!(manager.step_world_substeps(0.1, 2), Err(PhysicsError::WorldUninitialised));

        manager.initialise_world(Vec2::new(0.0, -1.0)).unwrap();
        assert!(manager.is_initialised());
        assert_eq!(
            manager.initialise_world(Vec2::ZERO),
            Err(PhysicsError::WorldAlreadyInitialised)
        );
        assert_eq!(manager.gravity(), Ok(Vec2::new(0.0, -1.0)));
    }

    #[test]
    fn test_spawn_and_despawn() {
        let manager = PhysicsManager::new();
        manager.initialise_world(Vec2::ZERO).unwrap();
        let entity = manager.create_entity(&ball()).unwrap();
        let view = manager.spawned_entities();
        assert!(view.is_empty());

        manager.spawn_entity(&entity).unwrap();
        assert!(manager.is_spawned(&entity));
        assert_eq!(view.len(), 1);
        assert_eq!(
            manager.spawn_entity(&entity),
            Err(PhysicsError::EntityAlreadySpawned(entity.id()))
        );

        manager.despawn_entity(&entity).unwrap();
        assert!(view.is_empty());
        assert_eq!(
            manager.despawn_entity(&entity),
            Err(PhysicsError::EntityNotSpawned(entity.id()))
        );

        manager.spawn_entity(&entity).unwrap();
        assert_eq!(view.ids(), vec![entity.id()]);
    }

    #[test]
    fn test_step_validation() {
        let manager = PhysicsManager::new();
        manager.initialise_world(Vec2::ZERO).unwrap();
        assert!(matches!(manager.step_world(0.0), Err(PhysicsError::InvalidArgument(_))));
        assert!(matches!(manager.step_world(f64::NAN), Err(PhysicsError::InvalidArgument(_))));
        assert!(matches!(
            manager.step_world_substeps(1.0, 0),
            Err(PhysicsError::InvalidArgument(_))
        ));
        assert!(manager.step_world(0.1).is_ok());
    }

    #[test]
    fn test_invalid_world_config() {
        let manager = PhysicsManager::new();
        let config = WorldConfig {
            substeps: 0,
            ..WorldConfig::default()
        };
        assert!(manager.initialise_world_with(config).is_err());
        assert!(manager.initialise_world(Vec2::new(f64::NAN, 0.0)).is_err());
        assert!(!manager.is_initialised());
    }

    #[test]
    fn test_set_gravity() {
        let manager = PhysicsManager::new();
        manager.initialise_world(Vec2::ZERO).unwrap();
        manager.set_gravity(Vec2::new(1.0, 2.0)).unwrap();
        assert_eq!(manager.gravity(), Ok(Vec2::new(1.0, 2.0)));
        assert_eq!(manager.config().unwrap().gravity, Vec2::new(1.0, 2.0));
        assert!(manager.set_gravity(Vec2::new(f64::INFINITY, 0.0)).is_err());
    }

    #[test]
    fn test_thrust_is_applied_during_step() {
        let manager = PhysicsManager::new();
        manager.initialise_world(Vec2::ZERO).unwrap();
        let mut def = ball();
        def.add_thrust_point(
            crate::ThrustPointDefinition::new(Vec2::ZERO, Vec2::X, "main").unwrap(),
        )
        .unwrap();
        let entity = manager.create_entity(&def).unwrap();
        entity.lock().set_thrust("main", 1.0).unwrap();
        manager.spawn_entity(&entity).unwrap();

        manager.step_world(1.0).unwrap();
        let speed = entity.lock().linear_velocity().x;
        assert!(speed > 0.0);
        manager.step_world(1.0).unwrap();
        assert!(entity.lock().linear_velocity().x > speed);
    }

    #[test]
    fn test_collision_listener_reads_gravity_mid_step() {
        let manager = Arc::new(PhysicsManager::new());
        manager.initialise_world(Vec2::new(0.0, -2.0)).unwrap();
        for x in [0.0, 0.5] {
            let mut def = ball();
            def.set_position(Vec2::new(x, 0.0)).unwrap();
            let entity = manager.create_entity(&def).unwrap();
            manager.spawn_entity(&entity).unwrap();
        }
        let seen = Arc::new(Mutex::new(Vec::new()));
        let weak = Arc::downgrade(&manager);
        let sink = seen.clone();
        manager.add_collision_listener(Arc::new(move |_: &CollisionPoint| {
            if let Some(manager) = weak.upgrade() {
                sink.lock().push(manager.gravity());
            }
        }));

        let stats = manager.step_world(0.01).unwrap();
        assert_eq!(stats.collisions, 1);
        assert_eq!(*seen.lock(), vec![Ok(Vec2::new(0.0, -2.0))]);
    }
}
