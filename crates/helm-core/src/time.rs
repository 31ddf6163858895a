//! Time Management
//!
//! Fixed-step simulation support:
//! - Typed delta time
//! - Fixed step configuration and substep splitting
//! - Accumulator turning variable frame time into whole fixed steps
//! - Scoped timers reporting through tracing

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by step scheduling
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum TimeError {
    #[error("step duration must be finite and strictly positive, was {0}")]
    InvalidDuration(f64),

    #[error("substep count must be at least 1")]
    NoSubsteps,
}

/// Delta time wrapper for type safety
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct DeltaTime(pub f64);

impl DeltaTime {
    /// Create a new delta time from seconds
    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// Create a new delta time from milliseconds
    pub fn from_millis(millis: f64) -> Self {
        Self(millis / 1000.0)
    }

    /// Get the delta time in seconds
    pub fn as_secs(&self) -> f64 {
        self.0
    }

    /// Get the delta time in milliseconds
    pub fn as_millis(&self) -> f64 {
        self.0 * 1000.0
    }

    /// Whether this duration can drive a simulation step
    pub fn is_valid_step(&self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }
}

impl Default for DeltaTime {
    fn default() -> Self {
        Self(1.0 / 60.0)
    }
}

/// Check that a duration is usable as a simulation step
pub fn validate_step(duration: f64) -> Result<f64, TimeError> {
    if DeltaTime(duration).is_valid_step() {
        Ok(duration)
    } else {
        Err(TimeError::InvalidDuration(duration))
    }
}

/// Fixed time step configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedTimeStep {
    /// Fixed step size in seconds
    pub step: f64,
    /// Maximum number of fixed updates per frame
    pub max_updates: u32,
}

impl Default for FixedTimeStep {
    fn default() -> Self {
        Self {
            step: 1.0 / 60.0, // 60 Hz
            max_updates: 8,
        }
    }
}

impl FixedTimeStep {
    /// Create a new fixed time step with the given frequency
    pub fn from_hz(hz: f64) -> Self {
        Self {
            step: 1.0 / hz,
            max_updates: 8,
        }
    }

    /// Create a new fixed time step with the given step size
    pub fn from_step(step: f64) -> Self {
        Self {
            step,
            max_updates: 8,
        }
    }

    /// Set the maximum number of updates per frame
    pub fn with_max_updates(mut self, max: u32) -> Self {
        self.max_updates = max;
        self
    }

    /// Split `total` seconds into `substeps` equal steps, returning the length of one.
    pub fn split(total: f64, substeps: u32) -> Result<f64, TimeError> {
        let total = validate_step(total)?;
        if substeps == 0 {
            return Err(TimeError::NoSubsteps);
        }
        Ok(total / f64::from(substeps))
    }
}

/// Accumulates variable frame time and hands it out in whole fixed steps
#[derive(Debug, Clone)]
pub struct StepAccumulator {
    config: FixedTimeStep,
    accumulator: f64,
    total_steps: u64,
}

impl StepAccumulator {
    /// Create an accumulator for the given fixed step
    pub fn new(config: FixedTimeStep) -> Self {
        Self {
            config,
            accumulator: 0.0,
            total_steps: 0,
        }
    }

    /// Add frame time. Returns the number of fixed steps to run now,
    /// capped at `max_updates`; time beyond the cap is dropped.
    pub fn advance(&mut self, frame_time: f64) -> u32 {
        if frame_time.is_finite() && frame_time > 0.0 {
            self.accumulator += frame_time;
        }

        let mut steps = 0;
        while self.accumulator >= self.config.step && steps < self.config.max_updates {
            self.accumulator -= self.config.step;
            steps += 1;
        }
        if steps == self.config.max_updates && self.accumulator >= self.config.step {
            log::debug!(
                "dropping {:.4}s of simulation time after {} fixed updates",
                self.accumulator,
                steps
            );
            self.accumulator %= self.config.step;
        }

        self.total_steps += u64::from(steps);
        steps
    }

    /// Interpolation factor between the last and the next fixed step
    pub fn interpolation(&self) -> f64 {
        (self.accumulator / self.config.step).clamp(0.0, 1.0)
    }

    /// Number of fixed steps handed out so far
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// The fixed step configuration
    pub fn config(&self) -> &FixedTimeStep {
        &self.config
    }
}

/// Timer that reports its elapsed time when dropped
pub struct ScopedTimer<'a> {
    name: &'a str,
    start: Instant,
    callback: Option<Box<dyn FnMut(&str, Duration) + 'a>>,
}

impl<'a> ScopedTimer<'a> {
    /// Create a timer that logs through tracing on drop
    pub fn traced(name: &'a str) -> Self {
        Self {
            name,
            start: Instant::now(),
            callback: None,
        }
    }

    /// Create a timer that hands its measurement to a callback on drop
    pub fn with_callback(name: &'a str, callback: impl FnMut(&str, Duration) + 'a) -> Self {
        Self {
            name,
            start: Instant::now(),
            callback: Some(Box::new(callback)),
        }
    }

    /// Get elapsed time so far
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        if let Some(mut callback) = self.callback.take() {
            callback(self.name, duration);
        } else {
            tracing::debug!(
                target: "timing",
                name = self.name,
                duration_us = duration.as_micros() as u64,
                "Timer completed"
            );
        }
    }
}
