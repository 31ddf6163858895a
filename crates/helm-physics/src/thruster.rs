//! Thrusters and per-entity thrust caching
//!
//! A [`Thruster`] is the live form of a [`ThrustPointDefinition`]: a fixed
//! point and direction in the entity's local frame with an adjustable thrust
//! magnitude. A [`ThrusterSystem`] holds all thrusters of one entity and
//! caches their summed force and torque, so applying thrust every step costs
//! nothing unless a thrust value or the center of mass changed.

use helm_core::math::cross;
use helm_core::{Transform2, Vec2};
use indexmap::IndexMap;

use crate::definition::ThrustPointDefinition;
use crate::{PhysicsError, PhysicsResult, validate};

/// Live thrust point
#[derive(Debug, Clone, PartialEq)]
pub struct Thruster {
    id: String,
    position: Vec2,
    direction: Vec2,
    thrust: f64,
    torque_factor: f64,
    force: Vec2,
    torque: f64,
}

impl Thruster {
    /// Create an idle thruster from its definition
    pub fn new(def: &ThrustPointDefinition) -> Self {
        Self {
            id: def.identifier().to_string(),
            position: def.position(),
            direction: def.direction(),
            thrust: 0.0,
            torque_factor: 0.0,
            force: Vec2::ZERO,
            torque: 0.0,
        }
    }

    /// Recompute the torque factor for a new center of mass
    pub fn update(&mut self, center_of_mass: Vec2) {
        self.torque_factor = cross(self.position - center_of_mass, self.direction);
        self.torque = self.torque_factor * self.thrust;
    }

    /// Set the thrust magnitude (newtons)
    pub fn set_thrust(&mut self, thrust: f64) {
        self.thrust = thrust;
        self.force = self.direction * thrust;
        self.torque = self.torque_factor * thrust;
    }

    pub fn identifier(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn thrust(&self) -> f64 {
        self.thrust
    }

    /// Torque produced per newton of thrust
    pub fn torque_factor(&self) -> f64 {
        self.torque_factor
    }

    /// Force in the local frame
    pub fn force(&self) -> Vec2 {
        self.force
    }

    pub fn torque(&self) -> f64 {
        self.torque
    }
}

/// All thrusters of one entity, with cached net force and torque
#[derive(Debug, Clone, Default)]
pub struct ThrusterSystem {
    thrusters: IndexMap<String, Thruster>,
    center_of_mass: Vec2,
    net_force: Vec2,
    net_torque: f64,
}

impl ThrusterSystem {
    /// Create an empty system with room for `capacity` thrusters
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            thrusters: IndexMap::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Add a thruster built from `def`.
    ///
    /// New thrusters start idle, so the cached totals stay valid.
    pub fn add_thruster(&mut self, def: &ThrustPointDefinition) -> PhysicsResult<()> {
        let id = def.identifier();
        if self.thrusters.contains_key(id) {
            return Err(PhysicsError::DuplicateIdentifier {
                kind: "thrust point",
                id: id.to_string(),
            });
        }
        let mut thruster = Thruster::new(def);
        thruster.update(self.center_of_mass);
        self.thrusters.insert(id.to_string(), thruster);
        Ok(())
    }

    /// Remove a thruster. Unknown identifiers are ignored.
    pub fn remove_thruster(&mut self, id: &str) -> PhysicsResult<()> {
        validate::identifier("thrust point identifier", id)?;
        if self.thrusters.shift_remove(id).is_some() {
            self.refresh();
        }
        Ok(())
    }

    /// Set the thrust of one thruster. The value persists until changed.
    pub fn set_thrust(&mut self, id: &str, thrust: f64) -> PhysicsResult<()> {
        validate::identifier("thrust point identifier", id)?;
        let thrust = validate::finite("thrust", thrust)?;
        let thruster = self
            .thrusters
            .get_mut(id)
            .ok_or_else(|| PhysicsError::UnknownThrustPoint(id.to_string()))?;
        thruster.set_thrust(thrust);
        self.refresh();
        Ok(())
    }

    /// Current thrust of one thruster
    pub fn thrust(&self, id: &str) -> PhysicsResult<f64> {
        self.thrusters
            .get(id)
            .map(Thruster::thrust)
            .ok_or_else(|| PhysicsError::UnknownThrustPoint(id.to_string()))
    }

    /// Thruster by identifier
    pub fn thruster(&self, id: &str) -> Option<&Thruster> {
        self.thrusters.get(id)
    }

    /// Thrusters in insertion order
    pub fn thrusters(&self) -> impl Iterator<Item = &Thruster> {
        self.thrusters.values()
    }

    /// Move the reference center of mass and recompute all torques
    pub fn update(&mut self, center_of_mass: Vec2) {
        self.center_of_mass = center_of_mass;
        for thruster in self.thrusters.values_mut() {
            thruster.update(center_of_mass);
        }
        self.refresh();
    }

    fn refresh(&mut self) {
        let (force, torque) = self
            .thrusters
            .values()
            .fold((Vec2::ZERO, 0.0), |(f, t), th| (f + th.force(), t + th.torque()));
        self.net_force = force;
        self.net_torque = torque;
    }

    /// Net force rotated into world space by `transform`
    pub fn force(&self, transform: &Transform2) -> Vec2 {
        transform.transform_vector(self.net_force)
    }

    /// Net force in the local frame
    pub fn local_force(&self) -> Vec2 {
        self.net_force
    }

    /// Net torque about the center of mass
    pub fn torque(&self) -> f64 {
        self.net_torque
    }

    pub fn center_of_mass(&self) -> Vec2 {
        self.center_of_mass
    }

    pub fn thruster_count(&self) -> usize {
        self.thrusters.len()
    }

    /// Whether applying the system would have no effect
    pub fn is_idle(&self) -> bool {
        self.net_force == Vec2::ZERO && self.net_torque == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1.0e-12;

    fn def(x: f64, id: &str) -> ThrustPointDefinition {
        ThrustPointDefinition::new(Vec2::new(x, 0.0), Vec2::new(0.0, 1.0), id).unwrap()
    }

    fn assert_outputs(system: &ThrusterSystem, force: Vec2, torque: f64) {
        assert!(
            (system.force(&Transform2::IDENTITY) - force).length() < EPS,
            "force {}",
            system.local_force()
        );
        assert!((system.torque() - torque).abs() < EPS, "torque {}", system.torque());
    }

    #[test]
    fn test_empty_system() {
        let system = ThrusterSystem::with_capacity(10);
        assert_eq!(system.thruster_count(), 0);
        assert!(system.is_idle());
        assert_outputs(&system, Vec2::ZERO, 0.0);
    }

    #[test]
    fn test_thruster_torque_factor() {
        let mut thruster = Thruster::new(&def(1.0, "t"));
        thruster.update(Vec2::ZERO);
        assert_eq!(thruster.torque_factor(), 1.0);
        thruster.set_thrust(3.0);
        assert_eq!(thruster.force(), Vec2::new(0.0, 3.0));
        assert_eq!(thruster.torque(), 3.0);
        thruster.update(Vec2::new(3.0, 0.0));
        assert_eq!(thruster.torque(), -6.0);
    }

    #[test]
    fn test_duplicate_thruster() {
        let mut system = ThrusterSystem::with_capacity(2);
        system.add_thruster(&def(0.0, "t")).unwrap();
        assert!(matches!(
            system.add_thruster(&def(0.0, "t")),
            Err(PhysicsError::DuplicateIdentifier { .. })
        ));
        assert_eq!(system.thruster_count(), 1);
    }

    #[test]
    fn test_member_management_updates_outputs() {
        let mut s = ThrusterSystem::with_capacity(10);
        s.add_thruster(&def(1.0, "t0")).unwrap();
        assert_outputs(&s, Vec2::ZERO, 0.0);
        s.set_thrust("t0", 1.0).unwrap();
        assert_outputs(&s, Vec2::new(0.0, 1.0), 1.0);
        s.add_thruster(&def(-1.0, "t1")).unwrap();
        assert_outputs(&s, Vec2::new(0.0, 1.0), 1.0);
        s.set_thrust("t1", 1.0).unwrap();
        assert_outputs(&s, Vec2::new(0.0, 2.0), 0.0);
        s.remove_thruster("t0").unwrap();
        assert_outputs(&s, Vec2::new(0.0, 1.0), -1.0);
        s.remove_thruster("t1").unwrap();
        assert_outputs(&s, Vec2::ZERO, 0.0);
    }

    #[test]
    fn test_removing_known_and_unknown() {
        let mut s = ThrusterSystem::with_capacity(10);
        s.add_thruster(&def(1.0, "t0")).unwrap();
        s.remove_thruster("duba").unwrap();
        assert_eq!(s.thruster_count(), 1);
        s.remove_thruster("t0").unwrap();
        assert_eq!(s.thruster_count(), 0);
        assert!(matches!(s.remove_thruster(""), Err(PhysicsError::InvalidArgument(_))));
    }

    #[test]
    fn test_changing_center_of_mass() {
        let mut s = ThrusterSystem::with_capacity(10);
        s.add_thruster(&def(1.0, "t0")).unwrap();
        s.set_thrust("t0", 1.0).unwrap();
        assert_outputs(&s, Vec2::new(0.0, 1.0), 1.0);
        s.update(Vec2::new(1.0, 0.0));
        assert_outputs(&s, Vec2::new(0.0, 1.0), 0.0);
        s.update(Vec2::new(-1.0, 0.0));
        assert_outputs(&s, Vec2::new(0.0, 1.0), 2.0);
        s.update(Vec2::new(2.0, 0.0));
        assert_outputs(&s, Vec2::new(0.0, 1.0), -1.0);
    }

    #[test]
    fn test_new_thruster_uses_current_center_of_mass() {
        let mut s = ThrusterSystem::with_capacity(1);
        s.update(Vec2::new(2.0, 0.0));
        s.add_thruster(&def(1.0, "t0")).unwrap();
        s.set_thrust("t0", 1.0).unwrap();
        assert_outputs(&s, Vec2::new(0.0, 1.0), -1.0);
    }

    #[test]
    fn test_set_thrust_validation() {
        let mut s = ThrusterSystem::with_capacity(1);
        s.add_thruster(&def(1.0, "t0")).unwrap();
        s.set_thrust("t0", 1.0).unwrap();
        assert_eq!(s.set_thrust("duba", 1.0), Err(PhysicsError::UnknownThrustPoint("duba".into())));
        assert!(matches!(s.set_thrust("", 1.0), Err(PhysicsError::InvalidArgument(_))));
        assert!(matches!(s.set_thrust("t0", f64::INFINITY), Err(PhysicsError::InvalidArgument(_))));
        assert_eq!(s.thrust("t0"), Ok(1.0));
    }

    #[test]
    fn test_force_is_rotated_copy() {
        let mut s = ThrusterSystem::with_capacity(1);
        s.add_thruster(&def(0.0, "t0")).unwrap();
        s.set_thrust("t0", 2.0).unwrap();
        let rotated = s.force(&Transform2::from_rotation(std::f64::consts::FRAC_PI_2));
        assert!((rotated - Vec2::new(-2.0, 0.0)).length() < EPS);
        assert_eq!(s.local_force(), Vec2::new(0.0, 2.0));
        assert!(!s.is_idle());
    }
}
