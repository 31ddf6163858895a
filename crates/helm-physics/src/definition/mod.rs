//! Entity definitions
//!
//! Definitions are builder-style value objects describing static
//! configuration. Every setter checks the lock first and validates its
//! argument, so an instance is valid at every point of its life. Locking
//! freezes an instance for good; locked definitions can be reused for any
//! number of entities without copying. `Clone` always yields an unlocked,
//! independently mutable copy.

mod entity;
mod fixture;
mod thrust_point;

pub use entity::PhysicsEntityDefinition;
pub use fixture::FixtureDefinition;
pub use thrust_point::ThrustPointDefinition;
