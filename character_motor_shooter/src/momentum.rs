//! Decaying momentum scalar fed by sprinting, sliding, downhill travel and
//! one-shot grants.

use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};

use crate::normalize_or_zero;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    pub max_momentum: Real,
    /// Seconds for unfuelled momentum to halve.
    pub half_life: Real,
    pub sprint_gain_per_sec: Real,
    pub slide_gain_per_sec: Real,
    pub slope_gain_per_sec: Real,
    /// Slope angle (radians) at which slope gain reaches its full rate.
    pub slope_reference_angle: Real,
    pub post_dash_boost: Real,
    pub slide_start_boost: Real,
    /// Minimum move-axis magnitude for sprinting to count as fuel.
    pub min_move_input: Real,
    pub epsilon: Real,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            max_momentum: 1.0,
            half_life: 1.5,
            sprint_gain_per_sec: 0.05,
            slide_gain_per_sec: 0.1,
            slope_gain_per_sec: 0.2,
            slope_reference_angle: 30.0_f32.to_radians(),
            post_dash_boost: 0.1,
            slide_start_boost: 0.05,
            min_move_input: 0.1,
            epsilon: 1.0e-4,
        }
    }
}

/// Per-tick fuel conditions gathered by the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MomentumFuel {
    pub grounded: bool,
    pub sprinting: bool,
    pub move_input: Real,
    /// Slide weight when a slide is active.
    pub sliding: Option<Real>,
    pub walkable_slope: bool,
    pub slope_angle: Real,
    /// Horizontal downhill direction of the ground under the player.
    pub downhill: Vector<Real>,
    pub horizontal_velocity: Vector<Real>,
}

#[derive(Clone, Debug)]
pub struct MomentumModel {
    config: MomentumConfig,
    value: Real,
}

impl MomentumModel {
    pub fn new(config: MomentumConfig) -> Self {
        Self { config, value: 0.0 }
    }

    pub fn config(&self) -> &MomentumConfig {
        &self.config
    }

    pub fn value(&self) -> Real {
        self.value
    }

    /// Momentum as a fraction of the configured maximum.
    pub fn normalized(&self) -> Real {
        if self.config.max_momentum <= 0.0 {
            return 0.0;
        }
        (self.value / self.config.max_momentum).clamp(0.0, 1.0)
    }

    /// Multiplier applied on top of base speed and the per-state multiplier.
    pub fn speed_factor(&self) -> Real {
        1.0 + self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }

    /// Add a one-shot amount (post-dash boost, slide start).
    pub fn grant(&mut self, amount: Real) {
        if amount > 0.0 {
            self.add(amount);
        }
    }

    /// Evaluate fuel for one fixed tick and decay when nothing fuelled.
    /// Returns true when at least one source fuelled this tick.
    pub fn accumulate(&mut self, fuel: &MomentumFuel, dt: Real) -> bool {
        let mut fuelled = false;
        if fuel.grounded {
            if fuel.sprinting && fuel.move_input > self.config.min_move_input {
                self.add(self.config.sprint_gain_per_sec * dt);
                fuelled = true;
            }

            if let Some(weight) = fuel.sliding {
                self.add(self.config.slide_gain_per_sec * weight.max(0.0) * dt);
                fuelled = true;
            }

            if fuel.walkable_slope {
                let along = normalize_or_zero(fuel.horizontal_velocity).dot(&fuel.downhill);
                if along > 0.0 {
                    let steepness = if self.config.slope_reference_angle > 0.0 {
                        (fuel.slope_angle / self.config.slope_reference_angle).clamp(0.0, 1.0)
                    } else {
                        1.0
                    };
                    self.add(self.config.slope_gain_per_sec * steepness * along * dt);
                    fuelled = true;
                }
            }
        }

        if !fuelled {
            self.decay(dt);
        }
        fuelled
    }

    fn decay(&mut self, dt: Real) {
        if self.config.half_life <= 0.0 {
            self.value = 0.0;
            return;
        }
        self.value *= (-std::f32::consts::LN_2 / self.config.half_life * dt).exp();
        if self.value < self.config.epsilon {
            self.value = 0.0;
        }
    }

    fn add(&mut self, amount: Real) {
        self.value = (self.value + amount.max(0.0)).clamp(0.0, self.config.max_momentum.max(0.0));
    }
}
