//! Jump with coyote time, input buffering, variable height, jump cut and a
//! heavier fall.

use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{lerp, tick_down};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    /// Apex height of a tapped jump, in meters.
    pub min_jump_height: Real,
    /// Apex height of a fully held jump, in meters.
    pub max_jump_height: Real,
    /// Seconds during which holding jump keeps raising the target height.
    pub rise_time: Real,
    /// Releases before this many seconds after takeoff are ignored.
    pub min_jump_time: Real,
    /// Upward velocity is divided by this on a jump cut.
    pub jump_cut_multiplier: Real,
    /// Gravity multiplier while rising after a cut.
    pub low_jump_multiplier: Real,
    /// Fall time as a fraction of rise time; smaller falls faster.
    pub fall_time_ratio: Real,
    pub coyote_time: Real,
    pub jump_buffer_time: Real,
    /// How quickly held-jump velocity converges on its target, per second.
    pub retarget_rate: Real,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            min_jump_height: 1.2,
            max_jump_height: 2.8,
            rise_time: 0.3,
            min_jump_time: 0.08,
            jump_cut_multiplier: 2.5,
            low_jump_multiplier: 3.0,
            fall_time_ratio: 0.6742,
            coyote_time: 0.12,
            jump_buffer_time: 0.15,
            retarget_rate: 8.0,
        }
    }
}

impl JumpConfig {
    /// Gravity multiplier applied while falling.
    pub fn fall_gravity_multiplier(&self) -> Real {
        let ratio = self.fall_time_ratio.max(0.05);
        1.0 / (ratio * ratio)
    }

    pub fn takeoff_speed(&self, gravity: Real, height: Real) -> Real {
        (2.0 * gravity.abs() * height.max(0.0)).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JumpPhase {
    Grounded,
    Rising,
    Cut,
    Falling,
}

/// Vertical velocity for this tick plus the takeoff speed when a jump fired.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VerticalStep {
    pub velocity: Real,
    pub jumped: Option<Real>,
}

#[derive(Clone, Debug)]
pub struct JumpController {
    config: JumpConfig,
    phase: JumpPhase,
    pending: bool,
    buffer_timer: Real,
    time_since_grounded: Real,
    held: bool,
    release_pending: bool,
    executed: bool,
    cut: bool,
    elapsed: Real,
    height_gained: Real,
}

impl JumpController {
    pub fn new(config: JumpConfig) -> Self {
        Self {
            config,
            phase: JumpPhase::Grounded,
            pending: false,
            buffer_timer: 0.0,
            time_since_grounded: 0.0,
            held: false,
            release_pending: false,
            executed: false,
            cut: false,
            elapsed: 0.0,
            height_gained: 0.0,
        }
    }

    pub fn config(&self) -> &JumpConfig {
        &self.config
    }

    pub fn phase(&self) -> JumpPhase {
        self.phase
    }

    pub fn is_buffered(&self) -> bool {
        self.buffer_timer > 0.0
    }

    pub fn has_pending_request(&self) -> bool {
        self.pending
    }

    pub fn time_since_grounded(&self) -> Real {
        self.time_since_grounded
    }

    pub fn is_charging(&self) -> bool {
        self.phase == JumpPhase::Rising && self.held && self.elapsed < self.config.rise_time
    }

    /// Queue a jump for the next vertical step.
    pub fn request_jump(&mut self) {
        self.pending = true;
    }

    pub fn set_jump_held(&mut self, held: bool) {
        if self.held && !held {
            self.release_pending = true;
        }
        self.held = held;
    }

    /// Drop any pending or buffered request.
    pub fn clear_request(&mut self) {
        self.pending = false;
        self.buffer_timer = 0.0;
    }

    /// Advance coyote/buffer clocks and detect landing.
    pub fn update_timers(&mut self, grounded: bool, vertical_velocity: Real, dt: Real) {
        tick_down(&mut self.buffer_timer, dt);
        if grounded {
            self.time_since_grounded = 0.0;
            if self.phase != JumpPhase::Grounded && vertical_velocity <= 0.0 {
                self.land();
            }
        } else {
            self.time_since_grounded += dt;
            if self.phase == JumpPhase::Grounded {
                self.phase = JumpPhase::Falling;
            }
        }
        if matches!(self.phase, JumpPhase::Rising | JumpPhase::Cut) {
            self.elapsed += dt;
        }
    }

    /// Integrate vertical velocity for one fixed tick.
    pub fn step_vertical(
        &mut self,
        vertical_velocity: Real,
        grounded: bool,
        gravity: Real,
        gravity_enabled: bool,
        dt: Real,
    ) -> VerticalStep {
        let gravity = gravity.abs();
        let mut vy = vertical_velocity;
        let mut jumped = None;

        let wants_jump = self.pending || (self.buffer_timer > 0.0 && grounded);
        if wants_jump {
            let coyote = self.time_since_grounded <= self.config.coyote_time && !self.executed;
            if grounded || coyote {
                let takeoff = self.config.takeoff_speed(gravity, self.config.min_jump_height);
                vy = takeoff;
                self.start_jump();
                jumped = Some(takeoff);
                debug!(takeoff, coyote = !grounded, "jump");
            } else if self.pending {
                self.buffer_timer = self.config.jump_buffer_time;
            }
            self.pending = false;
        }

        if self.release_pending {
            self.release_pending = false;
            if self.phase == JumpPhase::Rising
                && self.elapsed >= self.config.min_jump_time
                && vy > 0.1
            {
                vy /= self.config.jump_cut_multiplier.max(1.0);
                self.phase = JumpPhase::Cut;
                self.cut = true;
            }
        }

        if jumped.is_none() && grounded && self.phase == JumpPhase::Grounded {
            return VerticalStep {
                velocity: 0.0,
                jumped,
            };
        }

        if gravity_enabled && jumped.is_none() {
            vy -= gravity * dt;
            match self.phase {
                JumpPhase::Rising if self.held && self.elapsed < self.config.rise_time && vy > 0.0 => {
                    let progress = (self.elapsed / self.config.rise_time.max(1.0e-3)).clamp(0.0, 1.0);
                    let target_height =
                        lerp(self.config.min_jump_height, self.config.max_jump_height, progress);
                    let target = self.config.takeoff_speed(gravity, target_height - self.height_gained);
                    let blend = (self.config.retarget_rate * dt).clamp(0.0, 1.0);
                    vy = lerp(vy, target, blend);
                }
                JumpPhase::Cut => {
                    vy -= gravity * (self.config.low_jump_multiplier - 1.0).max(0.0) * dt;
                }
                JumpPhase::Falling => {
                    vy -= gravity * (self.config.fall_gravity_multiplier() - 1.0).max(0.0) * dt;
                }
                _ => {}
            }
        }

        if matches!(self.phase, JumpPhase::Rising | JumpPhase::Cut) {
            self.height_gained += vy.max(0.0) * dt;
            if vy <= 0.0 {
                self.phase = JumpPhase::Falling;
            }
        } else if !grounded && vy <= 0.0 {
            self.phase = JumpPhase::Falling;
        }

        VerticalStep {
            velocity: vy,
            jumped,
        }
    }

    fn start_jump(&mut self) {
        self.phase = JumpPhase::Rising;
        self.executed = true;
        self.cut = false;
        self.elapsed = 0.0;
        self.height_gained = 0.0;
        self.buffer_timer = 0.0;
        self.release_pending = false;
    }

    fn land(&mut self) {
        self.phase = JumpPhase::Grounded;
        self.executed = false;
        self.cut = false;
        self.elapsed = 0.0;
        self.height_gained = 0.0;
    }
}
