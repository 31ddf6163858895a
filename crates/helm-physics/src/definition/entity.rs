use std::sync::Arc;

use helm_core::math::normalize_angle;
use helm_core::{Lockable, Vec2};

use super::{FixtureDefinition, ThrustPointDefinition};
use crate::{EntityType, PhysicsError, PhysicsResult, validate};

/// Full blueprint for one entity.
///
/// Fixtures and thrust points added to a definition are locked and shared,
/// so copying a definition is cheap and copies never observe each other's
/// later changes.
#[derive(Debug)]
pub struct PhysicsEntityDefinition {
    entity_type: EntityType,
    mass: f64,
    position: Vec2,
    orientation: f64,
    linear_damping: f64,
    angular_damping: f64,
    fixtures: Vec<Arc<FixtureDefinition>>,
    thrust_points: Vec<Arc<ThrustPointDefinition>>,
    locked: bool,
}

impl PhysicsEntityDefinition {
    /// Default angular damping
    pub const DEFAULT_ANGULAR_DAMPING: f64 = 0.01;

    /// Create a definition with mass 1 at the origin and no fixtures
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            mass: 1.0,
            position: Vec2::ZERO,
            orientation: 0.0,
            linear_damping: 0.0,
            angular_damping: Self::DEFAULT_ANGULAR_DAMPING,
            fixtures: Vec::new(),
            thrust_points: Vec::new(),
            locked: false,
        }
    }

    pub fn set_entity_type(&mut self, entity_type: EntityType) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.entity_type = entity_type;
        Ok(self)
    }

    /// Set the initial mass (finite, non-negative). Ignored for static entities.
    pub fn set_mass(&mut self, mass: f64) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.mass = validate::non_negative("mass", mass)?;
        Ok(self)
    }

    pub fn set_position(&mut self, position: Vec2) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.position = validate::finite_vector("position", position)?;
        Ok(self)
    }

    /// Set the initial orientation in radians; stored normalized into `(-π, π]`
    pub fn set_orientation(&mut self, orientation: f64) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.orientation = normalize_angle(validate::finite("orientation", orientation)?);
        Ok(self)
    }

    pub fn set_linear_damping(&mut self, damping: f64) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.linear_damping = validate::non_negative("linear damping", damping)?;
        Ok(self)
    }

    pub fn set_angular_damping(&mut self, damping: f64) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        self.angular_damping = validate::non_negative("angular damping", damping)?;
        Ok(self)
    }

    /// Add a fixture. The fixture is locked and its identifier, if any, must
    /// not be used by another fixture of this definition.
    pub fn add_fixture(&mut self, mut fixture: FixtureDefinition) -> PhysicsResult<&mut Self> {
        fixture.lock();
        self.add_shared_fixture(Arc::new(fixture))
    }

    /// Add a fixture that is shared with other definitions
    pub fn add_shared_fixture(
        &mut self,
        fixture: Arc<FixtureDefinition>,
    ) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        if let Some(id) = fixture.identifier() {
            if self.fixture(id).is_some() {
                return Err(PhysicsError::DuplicateIdentifier {
                    kind: "fixture",
                    id: id.to_string(),
                });
            }
        }
        self.fixtures.push(fixture);
        Ok(self)
    }

    /// Add a thrust point. The thrust point is locked and its identifier must
    /// not be used by another thrust point of this definition.
    pub fn add_thrust_point(
        &mut self,
        mut thrust_point: ThrustPointDefinition,
    ) -> PhysicsResult<&mut Self> {
        thrust_point.lock();
        self.add_shared_thrust_point(Arc::new(thrust_point))
    }

    /// Add a thrust point that is shared with other definitions
    pub fn add_shared_thrust_point(
        &mut self,
        thrust_point: Arc<ThrustPointDefinition>,
    ) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        if self.thrust_point(thrust_point.identifier()).is_some() {
            return Err(PhysicsError::DuplicateIdentifier {
                kind: "thrust point",
                id: thrust_point.identifier().to_string(),
            });
        }
        self.thrust_points.push(thrust_point);
        Ok(self)
    }

    /// Remove the fixture with the given identifier. Unknown identifiers are ignored.
    pub fn remove_fixture(&mut self, id: &str) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        validate::identifier("fixture identifier", id)?;
        self.fixtures.retain(|f| f.identifier() != Some(id));
        Ok(self)
    }

    /// Remove the thrust point with the given identifier. Unknown identifiers are ignored.
    pub fn remove_thrust_point(&mut self, id: &str) -> PhysicsResult<&mut Self> {
        self.enforce_lock()?;
        validate::identifier("thrust point identifier", id)?;
        self.thrust_points.retain(|t| t.identifier() != id);
        Ok(self)
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    pub fn linear_damping(&self) -> f64 {
        self.linear_damping
    }

    pub fn angular_damping(&self) -> f64 {
        self.angular_damping
    }

    /// Fixtures in insertion order
    pub fn fixtures(&self) -> &[Arc<FixtureDefinition>] {
        &self.fixtures
    }

    /// Thrust points in insertion order
    pub fn thrust_points(&self) -> &[Arc<ThrustPointDefinition>] {
        &self.thrust_points
    }

    pub fn fixture(&self, id: &str) -> Option<&Arc<FixtureDefinition>> {
        self.fixtures.iter().find(|f| f.identifier() == Some(id))
    }

    pub fn thrust_point(&self, id: &str) -> Option<&Arc<ThrustPointDefinition>> {
        self.thrust_points.iter().find(|t| t.identifier() == id)
    }

    /// Check that an entity can be realized from this definition.
    ///
    /// Movable entities need at least one fixture and a non-zero density
    /// somewhere to derive their mass distribution from.
    pub fn validate(&self) -> PhysicsResult<()> {
        if !self.entity_type.is_movable() {
            return Ok(());
        }
        if self.fixtures.is_empty() {
            return Err(PhysicsError::InvalidDefinition(format!(
                "{:?} entities need at least one fixture",
                self.entity_type
            )));
        }
        let fixture_mass: f64 = self
            .fixtures
            .iter()
            .map(|f| f.shape().mass_properties(f.density()).mass)
            .sum();
        if fixture_mass <= 0.0 {
            return Err(PhysicsError::InvalidDefinition(
                "fixtures have zero total density, no mass distribution can be derived".to_string(),
            ));
        }
        Ok(())
    }
}

impl Lockable for PhysicsEntityDefinition {
    fn lock(&mut self) {
        self.locked = true;
    }

    fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Copy constructor: the copy is unlocked and shares the (immutable)
/// fixture and thrust point definitions.
impl Clone for PhysicsEntityDefinition {
    fn clone(&self) -> Self {
        Self {
            entity_type: self.entity_type,
            mass: self.mass,
            position: self.position,
            orientation: self.orientation,
            linear_damping: self.linear_damping,
            angular_damping: self.angular_damping,
            fixtures: self.fixtures.clone(),
            thrust_points: self.thrust_points.clone(),
            locked: false,
        }
    }
}

/// Deep content equality; the lock state is ignored.
impl PartialEq for PhysicsEntityDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type
            && self.mass == other.mass
            && self.position == other.position
            && self.orientation == other.orientation
            && self.linear_damping == other.linear_damping
            && self.angular_damping == other.angular_damping
            && self.fixtures == other.fixtures
            && self.thrust_points == other.thrust_points
    }
}
