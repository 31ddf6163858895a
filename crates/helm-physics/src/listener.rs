//! Event vocabulary and listener relays
//!
//! Three kinds of events come out of a world step:
//! - [`FixturePair`]: a candidate pair found by the broad phase, passed through
//!   every [`CollisionFilter`] before narrow-phase testing
//! - [`TimeOfImpact`]: a continuous-collision hit, passed through every
//!   [`TimeOfImpactListener`] before it is resolved
//! - [`CollisionPoint`]: a resolved discrete contact, delivered to every
//!   [`CollisionListener`]
//!
//! After the step, [`UpdateListener`]s run with the world unlocked.
//!
//! Both the manager and every entity own a [`ListenerRelay`]. Filters and
//! time-of-impact listeners are AND-aggregated: a pair proceeds only when
//! every entry accepts it, and every entry is consulted even after a veto.

use std::sync::Arc;

use helm_core::Vec2;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::entity::EntityId;

/// Broad-phase candidate pair
#[derive(Debug, Clone, PartialEq)]
pub struct FixturePair {
    pub entity0: EntityId,
    pub fixture0: Option<String>,
    pub entity1: EntityId,
    pub fixture1: Option<String>,
}

/// One resolved discrete collision
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionPoint {
    pub entity0: EntityId,
    pub fixture0: Option<String>,
    pub entity1: EntityId,
    pub fixture1: Option<String>,
    /// Contact point in world space
    pub point: Vec2,
    /// Unit contact normal pointing from entity0 to entity1
    pub normal: Vec2,
    /// Zero for sensor contacts
    pub normal_impulse: f64,
    /// Zero for sensor contacts
    pub tangent_impulse: f64,
}

/// One continuous-collision detection event
#[derive(Debug, Clone, PartialEq)]
pub struct TimeOfImpact {
    pub entity0: EntityId,
    pub fixture0: Option<String>,
    pub entity1: EntityId,
    pub fixture1: Option<String>,
    /// Fraction of the step, in `[0, 1]`, at which the bodies touch
    pub toi: f64,
}

/// Events that name two participating entities
pub trait Participants {
    fn participants(&self) -> (EntityId, EntityId);

    /// Whether `id` takes part in the event
    fn involves(&self, id: EntityId) -> bool {
        let (a, b) = self.participants();
        a == id || b == id
    }
}

impl Participants for FixturePair {
    fn participants(&self) -> (EntityId, EntityId) {
        (self.entity0, self.entity1)
    }
}

impl Participants for CollisionPoint {
    fn participants(&self) -> (EntityId, EntityId) {
        (self.entity0, self.entity1)
    }
}

impl Participants for TimeOfImpact {
    fn participants(&self) -> (EntityId, EntityId) {
        (self.entity0, self.entity1)
    }
}

/// Broad-phase veto. Returning `false` drops the pair for this step.
pub trait CollisionFilter: Send + Sync {
    fn filter(&self, pair: &FixturePair) -> bool;
}

/// Observer for resolved collisions
pub trait CollisionListener: Send + Sync {
    fn collision(&self, point: &CollisionPoint);
}

/// Continuous-collision veto. Returning `false` leaves the impact unresolved.
pub trait TimeOfImpactListener: Send + Sync {
    fn time_of_impact(&self, toi: &TimeOfImpact) -> bool;
}

/// Post-step hook. Runs with the world unlocked, so it may spawn and despawn.
pub trait UpdateListener: Send + Sync {
    fn update(&self);
}

impl<F> CollisionFilter for F
where
    F: Fn(&FixturePair) -> bool + Send + Sync,
{
    fn filter(&self, pair: &FixturePair) -> bool {
        self(pair)
    }
}

impl<F> CollisionListener for F
where
    F: Fn(&CollisionPoint) + Send + Sync,
{
    fn collision(&self, point: &CollisionPoint) {
        self(point)
    }
}

impl<F> TimeOfImpactListener for F
where
    F: Fn(&TimeOfImpact) -> bool + Send + Sync,
{
    fn time_of_impact(&self, toi: &TimeOfImpact) -> bool {
        self(toi)
    }
}

impl<F> UpdateListener for F
where
    F: Fn() + Send + Sync,
{
    fn update(&self) {
        self()
    }
}

type Entries<T> = SmallVec<[Arc<T>; 2]>;

/// Insert unless the same allocation is already registered
fn insert<T: ?Sized>(entries: &mut Entries<T>, entry: Arc<T>) -> bool {
    if entries.iter().any(|e| Arc::ptr_eq(e, &entry)) {
        return false;
    }
    entries.push(entry);
    true
}

fn remove<T: ?Sized>(entries: &mut Entries<T>, entry: &Arc<T>) -> bool {
    match entries.iter().position(|e| Arc::ptr_eq(e, entry)) {
        Some(index) => {
            entries.remove(index);
            true
        }
        None => false,
    }
}

/// Four independent listener collections with dispatch.
///
/// Registration is by identity: adding the same `Arc` twice is a no-op, as is
/// removing one that was never added. Cloning a relay clones the handles, so
/// a clone is a cheap snapshot for dispatching without holding a lock.
#[derive(Clone, Default)]
pub struct ListenerRelay {
    filters: Entries<dyn CollisionFilter>,
    collision_listeners: Entries<dyn CollisionListener>,
    toi_listeners: Entries<dyn TimeOfImpactListener>,
    update_listeners: Entries<dyn UpdateListener>,
}

impl ListenerRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the filter was already registered
    pub fn add_collision_filter(&mut self, filter: Arc<dyn CollisionFilter>) -> bool {
        insert(&mut self.filters, filter)
    }

    pub fn add_collision_listener(&mut self, listener: Arc<dyn CollisionListener>) -> bool {
        insert(&mut self.collision_listeners, listener)
    }

    pub fn add_time_of_impact_listener(&mut self, listener: Arc<dyn TimeOfImpactListener>) -> bool {
        insert(&mut self.toi_listeners, listener)
    }

    pub fn add_update_listener(&mut self, listener: Arc<dyn UpdateListener>) -> bool {
        insert(&mut self.update_listeners, listener)
    }

    /// Returns `false` when the filter was not registered
    pub fn remove_collision_filter(&mut self, filter: &Arc<dyn CollisionFilter>) -> bool {
        remove(&mut self.filters, filter)
    }

    pub fn remove_collision_listener(&mut self, listener: &Arc<dyn CollisionListener>) -> bool {
        remove(&mut self.collision_listeners, listener)
    }

    pub fn remove_time_of_impact_listener(
        &mut self,
        listener: &Arc<dyn TimeOfImpactListener>,
    ) -> bool {
        remove(&mut self.toi_listeners, listener)
    }

    pub fn remove_update_listener(&mut self, listener: &Arc<dyn UpdateListener>) -> bool {
        remove(&mut self.update_listeners, listener)
    }

    /// AND over every filter. All filters run, even after a veto.
    pub fn filter(&self, pair: &FixturePair) -> bool {
        let mut accepted = true;
        for filter in &self.filters {
            accepted &= filter.filter(pair);
        }
        accepted
    }

    /// AND over every time-of-impact listener. All listeners run, even after a veto.
    pub fn time_of_impact(&self, toi: &TimeOfImpact) -> bool {
        let mut accepted = true;
        for listener in &self.toi_listeners {
            accepted &= listener.time_of_impact(toi);
        }
        accepted
    }

    pub fn collision(&self, point: &CollisionPoint) {
        for listener in &self.collision_listeners {
            listener.collision(point);
        }
    }

    pub fn update(&self) {
        for listener in &self.update_listeners {
            listener.update();
        }
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub fn collision_listener_count(&self) -> usize {
        self.collision_listeners.len()
    }

    pub fn time_of_impact_listener_count(&self) -> usize {
        self.toi_listeners.len()
    }

    pub fn update_listener_count(&self) -> usize {
        self.update_listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
            && self.collision_listeners.is_empty()
            && self.toi_listeners.is_empty()
            && self.update_listeners.is_empty()
    }
}

impl std::fmt::Debug for ListenerRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRelay")
            .field("filters", &self.filters.len())
            .field("collision_listeners", &self.collision_listeners.len())
            .field("toi_listeners", &self.toi_listeners.len())
            .field("update_listeners", &self.update_listeners.len())
            .finish()
    }
}

/// Anything that accepts listener registrations.
///
/// Implementors only expose their relay; registration goes through its
/// write lock, so listeners can be added through a shared reference.
pub trait Listenable {
    fn listeners(&self) -> &RwLock<ListenerRelay>;

    fn add_collision_filter(&self, filter: Arc<dyn CollisionFilter>) {
        self.listeners().write().add_collision_filter(filter);
    }

    fn add_collision_listener(&self, listener: Arc<dyn CollisionListener>) {
        self.listeners().write().add_collision_listener(listener);
    }

    fn add_time_of_impact_listener(&self, listener: Arc<dyn TimeOfImpactListener>) {
        self.listeners().write().add_time_of_impact_listener(listener);
    }

    fn add_update_listener(&self, listener: Arc<dyn UpdateListener>) {
        self.listeners().write().add_update_listener(listener);
    }

    fn remove_collision_filter(&self, filter: &Arc<dyn CollisionFilter>) {
        self.listeners().write().remove_collision_filter(filter);
    }

    fn remove_collision_listener(&self, listener: &Arc<dyn CollisionListener>) {
        self.listeners().write().remove_collision_listener(listener);
    }

    fn remove_time_of_impact_listener(&self, listener: &Arc<dyn TimeOfImpactListener>) {
        self.listeners().write().remove_time_of_impact_listener(listener);
    }

    fn remove_update_listener(&self, listener: &Arc<dyn UpdateListener>) {
        self.listeners().write().remove_update_listener(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pair() -> FixturePair {
        FixturePair {
            entity0: EntityId::from_raw(1),
            fixture0: Some("a".to_string()),
            entity1: EntityId::from_raw(2),
            fixture1: None,
        }
    }

    fn counting_filter(result: bool, calls: &Arc<AtomicUsize>) -> Arc<dyn CollisionFilter> {
        let calls = calls.clone();
        Arc::new(move |_: &FixturePair| {
            calls.fetch_add(1, Ordering::SeqCst);
            result
        })
    }

    #[test]
    fn test_empty_relay_accepts() {
        let relay = ListenerRelay::new();
        assert!(relay.is_empty());
        assert!(relay.filter(&pair()));
        let toi = TimeOfImpact {
            entity0: EntityId::from_raw(1),
            fixture0: None,
            entity1: EntityId::from_raw(2),
            fixture1: None,
            toi: 0.5,
        };
        assert!(relay.time_of_impact(&toi));
    }

    #[test]
    fn test_filter_and_without_short_circuit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut relay = ListenerRelay::new();
        relay.add_collision_filter(counting_filter(false, &calls));
        relay.add_collision_filter(counting_filter(true, &calls));
        relay.add_collision_filter(counting_filter(true, &calls));
        assert!(!relay.filter(&pair()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_toi_and_aggregation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut relay = ListenerRelay::new();
        for result in [true, true, false] {
            let calls = calls.clone();
            relay.add_time_of_impact_listener(Arc::new(move |_: &TimeOfImpact| {
                calls.fetch_add(1, Ordering::SeqCst);
                result
            }));
        }
        let toi = TimeOfImpact {
            entity0: EntityId::from_raw(1),
            fixture0: None,
            entity1: EntityId::from_raw(2),
            fixture1: None,
            toi: 0.25,
        };
        assert!(!relay.time_of_impact(&toi));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_registration_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let listener: Arc<dyn UpdateListener> = {
            let calls = calls.clone();
            Arc::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };
        let mut relay = ListenerRelay::new();
        assert!(relay.add_update_listener(listener.clone()));
        assert!(!relay.add_update_listener(listener.clone()));
        assert_eq!(relay.update_listener_count(), 1);
        relay.update();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(relay.remove_update_listener(&listener));
        assert!(!relay.remove_update_listener(&listener));
        relay.update();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_removing_unknown_listener_is_noop() {
        let mut relay = ListenerRelay::new();
        let registered: Arc<dyn CollisionListener> = Arc::new(|_: &CollisionPoint| {});
        let stranger: Arc<dyn CollisionListener> = Arc::new(|_: &CollisionPoint| {});
        relay.add_collision_listener(registered);
        assert!(!relay.remove_collision_listener(&stranger));
        assert_eq!(relay.collision_listener_count(), 1);
    }

    #[test]
    fn test_collision_reaches_every_listener() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut relay = ListenerRelay::new();
        for _ in 0..3 {
            let calls = calls.clone();
            relay.add_collision_listener(Arc::new(move |_: &CollisionPoint| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }
        let point = CollisionPoint {
            entity0: EntityId::from_raw(1),
            fixture0: None,
            entity1: EntityId::from_raw(2),
            fixture1: None,
            point: Vec2::ZERO,
            normal: Vec2::Y,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
        };
        relay.collision(&point);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(point.involves(EntityId::from_raw(2)));
        assert!(!point.involves(EntityId::from_raw(3)));
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut relay = ListenerRelay::new();
        relay.add_collision_filter(Arc::new(|_: &FixturePair| false));
        let snapshot = relay.clone();
        relay.add_collision_filter(Arc::new(|_: &FixturePair| true));
        assert_eq!(snapshot.filter_count(), 1);
        assert_eq!(relay.filter_count(), 2);
    }
}
