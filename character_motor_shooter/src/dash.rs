//! Charge-based dash with a shared cooldown and a curve-shaped speed profile.

use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{normalize_or_zero, tick_down, BodyState, EaseCurve, ViewAngles};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub dash_speed: Real,
    pub dash_duration: Real,
    /// Minimum time between two dash starts, independent of charges.
    pub cooldown: Real,
    pub max_charges: u32,
    pub charge_recovery_time: Real,
    /// Fraction of velocity kept when the dash ends.
    pub momentum_retention: Real,
    /// Residual gravity while dashing, as a fraction of normal gravity.
    pub gravity_scale: Real,
    pub curve: EaseCurve,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            dash_speed: 25.0,
            dash_duration: 0.2,
            cooldown: 1.0,
            max_charges: 2,
            charge_recovery_time: 2.0,
            momentum_retention: 0.5,
            gravity_scale: 0.0,
            curve: EaseCurve::EaseInOut,
        }
    }
}

/// Snapshot for HUD consumers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DashStatus {
    pub charges: u32,
    pub max_charges: u32,
    /// 0 right after a charge is spent, 1 when the next charge is back.
    pub recovery_progress: Real,
    /// 0 right after a dash starts, 1 when the cooldown has elapsed.
    pub cooldown_progress: Real,
    pub active: bool,
}

#[derive(Clone, Debug)]
pub struct DashController {
    config: DashConfig,
    charges: u32,
    recovery_timer: Real,
    recovering: bool,
    cooldown_timer: Real,
    active: bool,
    elapsed: Real,
    direction: Vector<Real>,
    saved_gravity: bool,
}

impl DashController {
    pub fn new(config: DashConfig) -> Self {
        Self {
            charges: config.max_charges,
            config,
            recovery_timer: 0.0,
            recovering: false,
            cooldown_timer: 0.0,
            active: false,
            elapsed: 0.0,
            direction: Vector::zeros(),
            saved_gravity: true,
        }
    }

    pub fn config(&self) -> &DashConfig {
        &self.config
    }

    pub fn charges(&self) -> u32 {
        self.charges
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn direction(&self) -> Vector<Real> {
        self.direction
    }

    pub fn can_dash(&self) -> bool {
        !self.active && self.charges > 0 && self.cooldown_timer <= 0.0
    }

    pub fn status(&self) -> DashStatus {
        let recovery_progress = if self.charges >= self.config.max_charges {
            1.0
        } else if self.config.charge_recovery_time > 0.0 {
            (self.recovery_timer / self.config.charge_recovery_time).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let cooldown_progress = if self.config.cooldown > 0.0 {
            1.0 - (self.cooldown_timer / self.config.cooldown).clamp(0.0, 1.0)
        } else {
            1.0
        };
        DashStatus {
            charges: self.charges,
            max_charges: self.config.max_charges,
            recovery_progress,
            cooldown_progress,
            active: self.active,
        }
    }

    pub fn refill_charges(&mut self) {
        self.charges = self.config.max_charges;
        self.recovering = false;
        self.recovery_timer = 0.0;
    }

    pub fn reset_cooldown(&mut self) {
        self.cooldown_timer = 0.0;
    }

    /// Advance cooldown and charge recovery. Runs every fixed tick, dashing
    /// or not.
    pub fn tick_timers(&mut self, dt: Real) {
        tick_down(&mut self.cooldown_timer, dt);
        if !self.recovering {
            return;
        }
        self.recovery_timer += dt;
        let period = self.config.charge_recovery_time.max(1.0e-3);
        while self.recovery_timer >= period && self.charges < self.config.max_charges {
            self.recovery_timer -= period;
            self.charges += 1;
        }
        if self.charges >= self.config.max_charges {
            self.recovering = false;
            self.recovery_timer = 0.0;
        }
    }

    /// Start a dash along the camera-relative `input` axis, or camera forward
    /// when the axis is idle.
    pub fn try_start_dash(
        &mut self,
        input: [Real; 2],
        view: &ViewAngles,
        body: &mut BodyState,
    ) -> bool {
        if !self.can_dash() {
            return false;
        }
        let magnitude = (input[0] * input[0] + input[1] * input[1]).sqrt();
        let direction = if magnitude < 0.1 {
            view.flat_forward()
        } else {
            normalize_or_zero(view.planar_direction(input))
        };

        self.charges -= 1;
        if !self.recovering {
            self.recovering = true;
            self.recovery_timer = 0.0;
        }
        self.cooldown_timer = self.config.cooldown;
        self.active = true;
        self.elapsed = 0.0;
        self.direction = direction;
        self.saved_gravity = body.gravity_enabled;
        body.gravity_enabled = false;
        body.velocity = direction * self.config.dash_speed;
        debug!(charges = self.charges, "dash started");
        true
    }

    /// Drive the dash velocity for one fixed tick. Returns false once the
    /// dash has ended.
    pub fn fixed_tick(&mut self, body: &mut BodyState, gravity: Real, dt: Real) -> bool {
        if !self.active {
            return false;
        }
        self.elapsed += dt;
        if self.elapsed >= self.config.dash_duration {
            self.end(body);
            return false;
        }
        let t = self.elapsed / self.config.dash_duration.max(1.0e-3);
        let speed = self.config.dash_speed * self.config.curve.evaluate(t);
        let vertical = body.velocity.y - gravity.abs() * self.config.gravity_scale.max(0.0) * dt;
        body.velocity = self.direction * speed;
        if self.config.gravity_scale > 0.0 {
            body.velocity.y = vertical;
        }
        true
    }

    /// Finish the dash: restore gravity and keep part of the velocity.
    /// No-op when not dashing.
    pub fn end(&mut self, body: &mut BodyState) {
        if !self.active {
            return;
        }
        self.active = false;
        body.gravity_enabled = self.saved_gravity;
        body.velocity *= self.config.momentum_retention.clamp(0.0, 1.0);
        debug!("dash ended");
    }

    pub fn cancel(&mut self, body: &mut BodyState) {
        self.end(body);
    }
}
