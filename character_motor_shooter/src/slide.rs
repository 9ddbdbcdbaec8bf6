//! Speed-gated slide that decays over time and snowballs down slopes.

use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{move_towards_vector, normalize_or_zero, BodyState, GroundHit};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideConfig {
    pub slide_speed: Real,
    pub max_duration: Real,
    /// Horizontal deceleration on flat ground, m/s².
    pub deceleration: Real,
    /// Slide ends at or below this horizontal speed.
    pub min_speed: Real,
    /// Horizontal speed required to start sliding.
    pub start_speed_threshold: Real,
    /// Downhill acceleration on walkable slopes, m/s².
    pub slope_acceleration: Real,
    /// Linear drag applied to the body while sliding.
    pub slide_drag: Real,
    /// Weight passed to the momentum model while sliding.
    pub momentum_weight: Real,
}

impl Default for SlideConfig {
    fn default() -> Self {
        Self {
            slide_speed: 15.0,
            max_duration: 1.0,
            deceleration: 5.0,
            min_speed: 2.0,
            start_speed_threshold: 7.0,
            slope_acceleration: 12.0,
            slide_drag: 0.0,
            momentum_weight: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SlideController {
    config: SlideConfig,
    active: bool,
    elapsed: Real,
    direction: Vector<Real>,
    saved_drag: Real,
}

impl SlideController {
    pub fn new(config: SlideConfig) -> Self {
        Self {
            config,
            active: false,
            elapsed: 0.0,
            direction: Vector::zeros(),
            saved_drag: 0.0,
        }
    }

    pub fn config(&self) -> &SlideConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn elapsed(&self) -> Real {
        self.elapsed
    }

    pub fn momentum_weight(&self) -> Real {
        self.config.momentum_weight
    }

    pub fn can_slide(&self, body: &BodyState) -> bool {
        !self.active && body.horizontal_speed() >= self.config.start_speed_threshold
    }

    pub fn try_start_slide(&mut self, body: &mut BodyState) -> bool {
        if !self.can_slide(body) {
            return false;
        }
        self.direction = normalize_or_zero(body.horizontal_velocity());
        self.active = true;
        self.elapsed = 0.0;
        self.saved_drag = body.linear_drag;
        body.linear_drag = self.config.slide_drag;
        let speed = body.horizontal_speed().max(self.config.slide_speed);
        body.set_horizontal_velocity(self.direction * speed);
        debug!(speed, "slide started");
        true
    }

    /// Advance the slide for one fixed tick. Returns false once it has ended.
    pub fn fixed_tick(&mut self, body: &mut BodyState, ground: &GroundHit, dt: Real) -> bool {
        if !self.active {
            return false;
        }
        self.elapsed += dt;

        let mut planar = body.horizontal_velocity();
        if ground.grounded && ground.is_walkable_slope {
            planar += ground.downhill_horizontal() * self.config.slope_acceleration * dt;
        } else {
            let floor = normalize_or_zero(planar) * self.config.min_speed;
            planar = move_towards_vector(planar, floor, self.config.deceleration * dt);
        }
        let heading = normalize_or_zero(planar);
        if heading.norm_squared() > 0.0 {
            self.direction = heading;
        }
        body.set_horizontal_velocity(planar);

        if self.elapsed >= self.config.max_duration || planar.norm() <= self.config.min_speed {
            self.end(body);
            return false;
        }
        true
    }

    /// Stop sliding and restore drag. No-op when not sliding.
    pub fn end(&mut self, body: &mut BodyState) {
        if !self.active {
            return;
        }
        self.active = false;
        body.linear_drag = self.saved_drag;
        debug!(elapsed = self.elapsed, "slide ended");
    }

    pub fn cancel(&mut self, body: &mut BodyState) {
        self.end(body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::body_at;
    use crate::up;

    const DT: Real = 1.0 / 60.0;

    fn flat() -> GroundHit {
        GroundHit {
            grounded: true,
            ..GroundHit::airborne(Vector::zeros())
        }
    }

    fn slope(angle_deg: Real) -> GroundHit {
        let angle = angle_deg.to_radians();
        let normal = Vector::new(angle.sin(), angle.cos(), 0.0);
        GroundHit {
            grounded: true,
            normal,
            slope_angle: angle,
            slope_direction: crate::normalize_or_zero(crate::project_on_plane(-up(), normal)),
            is_on_slope: true,
            is_walkable_slope: true,
            ..GroundHit::airborne(Vector::zeros())
        }
    }

    #[test]
    fn slide_requires_speed() {
        let mut slide = SlideController::new(SlideConfig::default());
        let mut slow = body_at(Vector::zeros(), Vector::new(5.0, 0.0, 0.0));
        assert!(!slide.try_start_slide(&mut slow));

        let mut fast = body_at(Vector::zeros(), Vector::new(8.0, 0.0, 0.0));
        assert!(slide.try_start_slide(&mut fast));
        assert_eq!(fast.horizontal_velocity(), Vector::new(15.0, 0.0, 0.0));
        assert_eq!(fast.linear_drag, 0.0);
    }

    #[test]
    fn slide_ends_within_max_duration() {
        let config = SlideConfig {
            deceleration: 0.5,
            ..SlideConfig::default()
        };
        let mut slide = SlideController::new(config);
        let mut body = body_at(Vector::zeros(), Vector::new(10.0, 0.0, 0.0));
        slide.try_start_slide(&mut body);
        let mut ticks = 0;
        while slide.fixed_tick(&mut body, &flat(), DT) {
            ticks += 1;
        }
        assert!(ticks <= 60);
        assert!(!slide.is_active());
        assert_eq!(body.linear_drag, 4.0);
    }

    #[test]
    fn slide_ends_early_when_speed_drops() {
        let config = SlideConfig {
            slide_speed: 8.0,
            deceleration: 60.0,
            ..SlideConfig::default()
        };
        let mut slide = SlideController::new(config);
        let mut body = body_at(Vector::zeros(), Vector::new(8.0, 0.0, 0.0));
        slide.try_start_slide(&mut body);
        let mut ticks = 0;
        while slide.fixed_tick(&mut body, &flat(), DT) {
            ticks += 1;
        }
        assert!(ticks < 10);
        assert!(body.horizontal_speed() <= 2.0 + 1.0e-4);
    }

    #[test]
    fn slopes_accelerate_downhill() {
        let mut slide = SlideController::new(SlideConfig::default());
        let mut body = body_at(Vector::zeros(), Vector::new(8.0, 0.0, 0.0));
        slide.try_start_slide(&mut body);
        let before = body.horizontal_speed();
        assert!(slide.fixed_tick(&mut body, &slope(30.0), DT));
        assert!(body.horizontal_speed() > before);
    }

    #[test]
    fn end_is_idempotent_and_restores_drag() {
        let mut slide = SlideController::new(SlideConfig::default());
        let mut body = body_at(Vector::zeros(), Vector::new(9.0, 0.0, 0.0));
        slide.try_start_slide(&mut body);
        slide.cancel(&mut body);
        assert_eq!(body.linear_drag, 4.0);
        body.linear_drag = 7.0;
        slide.end(&mut body);
        assert_eq!(body.linear_drag, 7.0);
        assert!(!slide.fixed_tick(&mut body, &flat(), DT));
    }
}
