//! Collider height blending and the stand-up ceiling check.

use physics_rapier::{layers, WorldQuery};
use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};

use crate::{lerp, up, BodyState};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrouchConfig {
    /// Full capsule height while standing, in meters.
    pub stand_height: Real,
    pub radius: Real,
    pub crouch_height_multiplier: Real,
    /// Height blend rate per second.
    pub transition_speed: Real,
}

impl Default for CrouchConfig {
    fn default() -> Self {
        Self {
            stand_height: 1.8,
            radius: 0.4,
            crouch_height_multiplier: 0.5,
            transition_speed: 10.0,
        }
    }
}

impl CrouchConfig {
    pub fn crouch_height(&self) -> Real {
        self.stand_height * self.crouch_height_multiplier
    }
}

#[derive(Clone, Debug)]
pub struct CrouchController {
    config: CrouchConfig,
    crouching: bool,
    height: Real,
    ceiling_blocked: bool,
}

impl CrouchController {
    pub fn new(config: CrouchConfig) -> Self {
        Self {
            height: config.stand_height,
            config,
            crouching: false,
            ceiling_blocked: false,
        }
    }

    pub fn config(&self) -> &CrouchConfig {
        &self.config
    }

    pub fn is_crouching(&self) -> bool {
        self.crouching
    }

    /// Current full collider height.
    pub fn height(&self) -> Real {
        self.height
    }

    /// Distance from the collider center to the feet.
    pub fn half_height(&self) -> Real {
        self.height * 0.5
    }

    pub fn set_crouching(&mut self, crouching: bool) {
        self.crouching = crouching;
    }

    /// Overlap a sphere between the current head and the standing head
    /// against solid geometry.
    pub fn refresh_ceiling<W: WorldQuery + ?Sized>(&mut self, world: &W, body: &BodyState) {
        let gap = (self.config.stand_height - self.height).max(0.0);
        let center = body.position + up() * (self.half_height() + gap * 0.5);
        let radius = (self.config.radius * 0.9).max(gap * 0.5);
        self.ceiling_blocked = world.overlap_sphere(center, radius, layers::CEILING);
    }

    pub fn can_stand_up(&self) -> bool {
        !self.ceiling_blocked
    }

    /// Blend the collider height toward its target. Returns the new height.
    pub fn fixed_tick(&mut self, dt: Real) -> Real {
        let target = if self.crouching {
            self.config.crouch_height()
        } else {
            self.config.stand_height
        };
        let blend = (self.config.transition_speed * dt).clamp(0.0, 1.0);
        self.height = lerp(self.height, target, blend);
        if (self.height - target).abs() < 1.0e-3 {
            self.height = target;
        }
        self.height
    }
}
