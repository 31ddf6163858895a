//! Reference engine
//!
//! [`SandboxEngine`] integrates bodies with semi-implicit Euler: gravity,
//! accumulated and timed loads, damping and sleeping. It does not resolve
//! contacts. Overlapping fixture bounds are reported as sensor-style
//! collisions (zero impulses) after passing the broad-phase filters, which
//! is enough to drive the listener fan-out headless.
//!
//! When either body of an overlapping pair is a bullet, a time-of-impact
//! event precedes the collision. Its `toi` is the fraction of the step at
//! which the swept fixture bounds first touched, ignoring rotation. A vetoed
//! impact suppresses the collision.

use helm_core::{Aabb2, Vec2};

use crate::WorldConfig;
use crate::body::{Body, BodyFlags};
use crate::engine::{BodyEntry, RigidBodyEngine, StepEvents};
use crate::listener::{CollisionPoint, FixturePair, TimeOfImpact};

/// Semi-implicit Euler integrator with overlap sensing
#[derive(Debug, Clone)]
pub struct SandboxEngine {
    gravity: Vec2,
    sleep_linear_threshold: f64,
    sleep_angular_threshold: f64,
    sleep_time: f64,
    overlap_events: bool,
}

impl Default for SandboxEngine {
    fn default() -> Self {
        Self::new(&WorldConfig::default())
    }
}

impl SandboxEngine {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            gravity: config.gravity,
            sleep_linear_threshold: config.sleep_linear_threshold,
            sleep_angular_threshold: config.sleep_angular_threshold,
            sleep_time: config.sleep_time,
            overlap_events: true,
        }
    }

    /// Enable or disable overlap reporting
    pub fn with_overlap_events(mut self, enabled: bool) -> Self {
        self.overlap_events = enabled;
        self
    }

    fn integrate(&self, dt: f64, body: &mut Body) {
        let (force, torque) = body.take_loads(dt);
        if body.is_asleep() {
            return;
        }
        let inv_mass = body.inverse_mass();
        let inv_inertia = body.inverse_inertia();
        if inv_mass == 0.0 && inv_inertia == 0.0 {
            return;
        }

        let mut velocity = body.linear_velocity();
        if inv_mass > 0.0 {
            velocity += (self.gravity + force * inv_mass) * dt;
        }
        velocity *= 1.0 / (1.0 + dt * body.linear_damping());
        let mut spin = body.angular_velocity() + torque * inv_inertia * dt;
        spin *= 1.0 / (1.0 + dt * body.angular_damping());

        body.set_linear_velocity(velocity);
        body.set_angular_velocity(spin);
        body.translate(velocity * dt);
        if spin != 0.0 {
            body.rotate_about_center(spin * dt);
        }

        self.update_sleep(dt, body);
    }

    fn update_sleep(&self, dt: f64, body: &mut Body) {
        let resting = body.linear_velocity().length() < self.sleep_linear_threshold
            && body.angular_velocity().abs() < self.sleep_angular_threshold
            && body.timed_load_count() == 0;
        if !body.flags().contains(BodyFlags::AUTO_SLEEP) || !resting {
            body.reset_rest();
            return;
        }
        if body.accumulate_rest(dt) >= self.sleep_time {
            body.sleep();
        }
    }

    fn sense_overlaps(dt: f64, bodies: &[BodyEntry<'_>], events: &mut dyn StepEvents) {
        for (i, a) in bodies.iter().enumerate() {
            for b in &bodies[i + 1..] {
                let dormant = |body: &Body| body.is_asleep() || body.inverse_mass() == 0.0;
                if dormant(&*a.body) && dormant(&*b.body) {
                    continue;
                }
                if !a.body.aabb().intersects(&b.body.aabb()) {
                    continue;
                }
                for fa in a.body.fixtures() {
                    let bounds_a = fa.shape.aabb(a.body.transform());
                    for fb in b.body.fixtures() {
                        let bounds_b = fb.shape.aabb(b.body.transform());
                        if !bounds_a.intersects(&bounds_b) {
                            continue;
                        }
                        let pair = FixturePair {
                            entity0: a.id,
                            fixture0: fa.id.clone(),
                            entity1: b.id,
                            fixture1: fb.id.clone(),
                        };
                        if !events.filter(&pair) {
                            continue;
                        }
                        if a.body.is_bullet() || b.body.is_bullet() {
                            let toi = TimeOfImpact {
                                entity0: a.id,
                                fixture0: pair.fixture0.clone(),
                                entity1: b.id,
                                fixture1: pair.fixture1.clone(),
                                toi: entry_time(
                                    &shifted(&bounds_a, -a.body.linear_velocity() * dt),
                                    &shifted(&bounds_b, -b.body.linear_velocity() * dt),
                                    (a.body.linear_velocity() - b.body.linear_velocity()) * dt,
                                ),
                            };
                            if !events.time_of_impact(&toi) {
                                continue;
                            }
                        }
                        events.collision(&CollisionPoint {
                            entity0: a.id,
                            fixture0: pair.fixture0,
                            entity1: b.id,
                            fixture1: pair.fixture1,
                            point: overlap_center(&bounds_a, &bounds_b),
                            normal: (bounds_b.center() - bounds_a.center()).normalize_or(Vec2::Y),
                            normal_impulse: 0.0,
                            tangent_impulse: 0.0,
                        });
                    }
                }
            }
        }
    }
}

fn shifted(bounds: &Aabb2, offset: Vec2) -> Aabb2 {
    Aabb2::new(bounds.min + offset, bounds.max + offset)
}

/// Fraction of the step at which `a`, moving by `motion` relative to `b`,
/// first touches it. Both bounds are taken at the start of the step.
fn entry_time(a: &Aabb2, b: &Aabb2, motion: Vec2) -> f64 {
    let mut enter = 0.0_f64;
    for axis in 0..2 {
        let m = motion[axis];
        if m > 0.0 && a.max[axis] < b.min[axis] {
            enter = enter.max((b.min[axis] - a.max[axis]) / m);
        } else if m < 0.0 && a.min[axis] > b.max[axis] {
            enter = enter.max((b.max[axis] - a.min[axis]) / m);
        }
    }
    enter.clamp(0.0, 1.0)
}

fn overlap_center(a: &Aabb2, b: &Aabb2) -> Vec2 {
    let min = a.min.max(b.min);
    let max = a.max.min(b.max);
    (min + max) * 0.5
}

impl RigidBodyEngine for SandboxEngine {
    fn gravity(&self) -> Vec2 {
        self.gravity
    }

    fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    fn configure(&mut self, config: &WorldConfig) {
        self.gravity = config.gravity;
        self.sleep_linear_threshold = config.sleep_linear_threshold;
        self.sleep_angular_threshold = config.sleep_angular_threshold;
        self.sleep_time = config.sleep_time;
    }

    fn step(&mut self, dt: f64, bodies: &mut [BodyEntry<'_>], events: &mut dyn StepEvents) {
        for entry in bodies.iter_mut() {
            self.integrate(dt, entry.body);
        }
        if self.overlap_events {
            Self::sense_overlaps(dt, bodies, events);
        }
    }
}
