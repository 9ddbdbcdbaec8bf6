//! Grapple hook: aim raycast, delayed attach, then an acceleration-limited
//! pull toward the anchor.

use physics_rapier::{layers, WorldQuery};
use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{normalize_or_zero, tick_down, BodyState};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrappleConfig {
    pub max_distance: Real,
    pub pull_speed: Real,
    /// Rate at which velocity converges on the pull velocity, per second.
    pub pull_acceleration: Real,
    pub cooldown: Real,
    /// The grapple releases once the anchor is closer than this.
    pub min_distance: Real,
    /// Fraction of velocity kept at the moment of attachment.
    pub velocity_retention: Real,
    /// Seconds between firing and attaching.
    pub attach_delay: Real,
}

impl Default for GrappleConfig {
    fn default() -> Self {
        Self {
            max_distance: 50.0,
            pull_speed: 20.0,
            pull_acceleration: 30.0,
            cooldown: 1.0,
            min_distance: 2.0,
            velocity_retention: 0.5,
            attach_delay: 0.3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GrapplePhase {
    Idle,
    /// Rope in flight; attaches when `remaining` reaches zero.
    Pending { remaining: Real },
    Attached,
}

#[derive(Clone, Debug)]
pub struct GrappleController {
    config: GrappleConfig,
    phase: GrapplePhase,
    aim: Option<Vector<Real>>,
    point: Option<Vector<Real>>,
    cooldown_timer: Real,
}

impl GrappleController {
    pub fn new(config: GrappleConfig) -> Self {
        Self {
            config,
            phase: GrapplePhase::Idle,
            aim: None,
            point: None,
            cooldown_timer: 0.0,
        }
    }

    pub fn config(&self) -> &GrappleConfig {
        &self.config
    }

    pub fn phase(&self) -> GrapplePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.phase, GrapplePhase::Idle)
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.phase, GrapplePhase::Attached)
    }

    pub fn grapple_point(&self) -> Option<Vector<Real>> {
        self.point
    }

    pub fn aim_target(&self) -> Option<Vector<Real>> {
        self.aim
    }

    pub fn cooldown_progress(&self) -> Real {
        if self.config.cooldown <= 0.0 {
            return 1.0;
        }
        1.0 - (self.cooldown_timer / self.config.cooldown).clamp(0.0, 1.0)
    }

    /// Cast from the eye along the look direction and cache the hit.
    pub fn refresh_aim<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        eye: Vector<Real>,
        forward: Vector<Real>,
    ) -> Option<Vector<Real>> {
        self.aim = world
            .cast_ray(eye, forward, self.config.max_distance, layers::GRAPPLE_SURFACE)
            .map(|hit| hit.point);
        self.aim
    }

    /// Fire at the cached aim target. Attachment happens after the delay.
    pub fn try_start_grapple(&mut self) -> bool {
        if self.is_active() || self.cooldown_timer > 0.0 {
            return false;
        }
        let Some(target) = self.aim else {
            return false;
        };
        self.point = Some(target);
        self.phase = GrapplePhase::Pending {
            remaining: self.config.attach_delay.max(0.0),
        };
        debug!(?target, "grapple fired");
        true
    }

    pub fn tick_timers(&mut self, dt: Real) {
        tick_down(&mut self.cooldown_timer, dt);
    }

    /// Advance attach delay and pull. Returns false once the grapple is idle.
    pub fn fixed_tick(&mut self, body: &mut BodyState, dt: Real) -> bool {
        let Some(point) = self.point else {
            self.phase = GrapplePhase::Idle;
            return false;
        };
        match self.phase {
            GrapplePhase::Idle => return false,
            GrapplePhase::Pending { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.phase = GrapplePhase::Pending { remaining };
                    return true;
                }
                self.phase = GrapplePhase::Attached;
                body.velocity *= self.config.velocity_retention.clamp(0.0, 1.0);
                debug!("grapple attached");
            }
            GrapplePhase::Attached => {}
        }

        let offset = point - body.position;
        if offset.norm() < self.config.min_distance {
            self.cancel();
            return false;
        }
        let target = normalize_or_zero(offset) * self.config.pull_speed;
        let blend = (self.config.pull_acceleration * dt).clamp(0.0, 1.0);
        body.velocity += (target - body.velocity) * blend;
        true
    }

    /// Release the rope. Always starts the cooldown when something was active.
    pub fn cancel(&mut self) {
        if !self.is_active() {
            return;
        }
        self.phase = GrapplePhase::Idle;
        self.point = None;
        self.cooldown_timer = self.config.cooldown;
        debug!("grapple released");
    }
}
