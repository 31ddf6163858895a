//! # Helm Core
//!
//! Shared foundations for the Helm physics layer.
//!
//! This crate provides the building blocks the entity and physics crates rely on:
//! - **Lock**: The `Lockable` capability for freeze-once configuration objects
//! - **Math**: 2D vectors, rigid transforms and bounding boxes built on glam
//! - **Time**: Fixed-step scheduling and scoped timing helpers

pub mod lock;
pub mod math;
pub mod time;

pub use lock::{LockError, Lockable};
pub use math::{Aabb2, Transform2, Vec2};
pub use time::{DeltaTime, FixedTimeStep, ScopedTimer, StepAccumulator, TimeError};

/// Tolerance used for floating point comparisons throughout the engine
pub const EPSILON: f64 = 1.0e-9;
