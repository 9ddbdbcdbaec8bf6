//! Combines planar intent, vertical velocity and inherited ground velocity
//! into the body velocity for one fixed tick.

use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};

use crate::{horizontal, move_towards_vector, project_on_plane, up, BodyState, GroundHit, ViewAngles};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub base_speed: Real,
    pub walk_multiplier: Real,
    pub sprint_multiplier: Real,
    pub crouch_multiplier: Real,
    pub slide_multiplier: Real,
    pub wall_run_multiplier: Real,
    /// Input smoothing time in seconds.
    pub movement_smoothing: Real,
    /// Smoothing time is multiplied by this while sliding.
    pub slide_smoothing_scale: Real,
    pub air_acceleration: Real,
    pub gravity: Real,
    /// Camera height above the collider center.
    pub eye_height: Real,
    /// Linear drag on the body outside of slides.
    pub ground_drag: Real,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            base_speed: 5.0,
            walk_multiplier: 1.0,
            sprint_multiplier: 2.0,
            crouch_multiplier: 0.5,
            slide_multiplier: 0.3,
            wall_run_multiplier: 1.2,
            movement_smoothing: 0.1,
            slide_smoothing_scale: 3.0,
            air_acceleration: 30.0,
            gravity: 9.81,
            eye_height: 0.7,
            ground_drag: 0.5,
        }
    }
}

impl MovementConfig {
    /// base speed × per-state multiplier × momentum factor.
    pub fn speed(&self, multiplier: Real, momentum_factor: Real) -> Real {
        self.base_speed * multiplier * momentum_factor
    }
}

/// What the active locomotion state wants from the integrator this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveRequest {
    pub move_axis: [Real; 2],
    pub speed: Real,
    pub smoothing_scale: Real,
    pub vertical: Real,
}

#[derive(Clone, Debug)]
pub struct PhysicsIntegrator {
    config: MovementConfig,
    smoothed: [Real; 2],
    smoothing_velocity: [Real; 2],
}

impl PhysicsIntegrator {
    pub fn new(config: MovementConfig) -> Self {
        Self {
            config,
            smoothed: [0.0; 2],
            smoothing_velocity: [0.0; 2],
        }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    pub fn smoothed_input(&self) -> [Real; 2] {
        self.smoothed
    }

    pub fn reset_smoothing(&mut self) {
        self.smoothed = [0.0; 2];
        self.smoothing_velocity = [0.0; 2];
    }

    /// Critically damped approach of the smoothed axis toward `raw`.
    pub fn smooth_input(&mut self, raw: [Real; 2], smoothing_scale: Real, dt: Real) -> [Real; 2] {
        let smooth_time = self.config.movement_smoothing * smoothing_scale.max(0.0);
        for axis in 0..2 {
            let (value, velocity) = smooth_damp(
                self.smoothed[axis],
                raw[axis],
                self.smoothing_velocity[axis],
                smooth_time,
                dt,
            );
            self.smoothed[axis] = value;
            self.smoothing_velocity[axis] = velocity;
        }
        self.smoothed
    }

    /// Full locomotion: planar intent along the ground plus vertical velocity
    /// plus the supporting body's velocity.
    pub fn integrate(
        &mut self,
        body: &mut BodyState,
        ground: &GroundHit,
        view: &ViewAngles,
        request: &MoveRequest,
        dt: Real,
    ) {
        let axis = self.smooth_input(request.move_axis, request.smoothing_scale, dt);
        let intent = view.planar_direction(axis) * request.speed;

        let planar = if ground.grounded {
            project_on_plane(intent, ground.normal)
        } else {
            let current = horizontal(body.velocity);
            move_towards_vector(current, intent, self.config.air_acceleration * dt)
        };
        let inherited = if ground.grounded {
            ground.ground_velocity
        } else {
            Vector::zeros()
        };
        body.velocity = planar + up() * request.vertical + inherited;
    }

    /// Vertical-only integration for states that own horizontal velocity.
    pub fn integrate_vertical(&mut self, body: &mut BodyState, request: &MoveRequest, dt: Real) {
        self.smooth_input(request.move_axis, request.smoothing_scale, dt);
        body.velocity.y = request.vertical;
    }
}

/// Critically damped spring toward `target`; returns the new value and rate.
fn smooth_damp(current: Real, target: Real, velocity: Real, smooth_time: Real, dt: Real) -> (Real, Real) {
    if dt <= 0.0 {
        return (current, velocity);
    }
    if smooth_time <= 1.0e-4 {
        return (target, 0.0);
    }
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    let change = current - target;
    let temp = (velocity + omega * change) * dt;
    let mut next_velocity = (velocity - omega * temp) * decay;
    let mut output = target + (change + temp) * decay;
    if (target - current > 0.0) == (output > target) {
        output = target;
        next_velocity = 0.0;
    }
    (output, next_velocity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::approx_eq;
    use physics_rapier::RigidBodyHandle;

    const DT: Real = 1.0 / 60.0;

    fn request(move_axis: [Real; 2], speed: Real, vertical: Real) -> MoveRequest {
        MoveRequest {
            move_axis,
            speed,
            smoothing_scale: 1.0,
            vertical,
        }
    }

    fn grounded() -> GroundHit {
        GroundHit {
            grounded: true,
            ..GroundHit::airborne(Vector::zeros())
        }
    }

    #[test]
    fn smoothing_converges_without_overshoot() {
        let mut integrator = PhysicsIntegrator::new(MovementConfig::default());
        let mut previous = 0.0;
        for _ in 0..120 {
            let value = integrator.smooth_input([0.0, 1.0], 1.0, DT)[1];
            assert!(value >= previous && value <= 1.0);
            previous = value;
        }
        assert!(approx_eq(previous, 1.0, 1.0e-3));
    }

    #[test]
    fn slide_smoothing_is_slower() {
        let mut normal = PhysicsIntegrator::new(MovementConfig::default());
        let mut sliding = PhysicsIntegrator::new(MovementConfig::default());
        for _ in 0..6 {
            normal.smooth_input([1.0, 0.0], 1.0, DT);
            sliding.smooth_input([1.0, 0.0], 3.0, DT);
        }
        assert!(sliding.smoothed_input()[0] < normal.smoothed_input()[0]);
    }

    #[test]
    fn grounded_velocity_reaches_speed_and_inherits_platform() {
        let config = MovementConfig {
            movement_smoothing: 0.0,
            ..MovementConfig::default()
        };
        let mut integrator = PhysicsIntegrator::new(config);
        let mut body = crate::test_support::body_at(Vector::zeros(), Vector::zeros());
        let ground = GroundHit {
            body: Some(RigidBodyHandle::from_raw_parts(1, 0)),
            ground_velocity: Vector::new(0.0, 0.0, 2.0),
            ..grounded()
        };
        integrator.integrate(&mut body, &ground, &ViewAngles::default(), &request([0.0, 1.0], 5.0, 0.0), DT);
        assert!(approx_eq(body.velocity.z, -5.0 + 2.0, 1.0e-4));
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn slopes_redirect_intent_along_surface() {
        let config = MovementConfig {
            movement_smoothing: 0.0,
            ..MovementConfig::default()
        };
        let mut integrator = PhysicsIntegrator::new(config);
        let mut body = crate::test_support::body_at(Vector::zeros(), Vector::zeros());
        let angle: Real = 20.0_f32.to_radians();
        let ground = GroundHit {
            normal: Vector::new(0.0, angle.cos(), angle.sin()),
            ..grounded()
        };
        integrator.integrate(&mut body, &ground, &ViewAngles::default(), &request([0.0, 1.0], 5.0, 0.0), DT);
        assert!(body.velocity.y > 0.0);
        assert!(body.velocity.dot(&ground.normal).abs() < 1.0e-4);
    }

    #[test]
    fn air_control_is_acceleration_limited() {
        let config = MovementConfig {
            movement_smoothing: 0.0,
            ..MovementConfig::default()
        };
        let mut integrator = PhysicsIntegrator::new(config);
        let mut body = crate::test_support::body_at(Vector::zeros(), Vector::zeros());
        let air = GroundHit::airborne(Vector::zeros());
        integrator.integrate(&mut body, &air, &ViewAngles::default(), &request([1.0, 0.0], 10.0, -2.0), DT);
        assert!(approx_eq(body.velocity.x, 30.0 * DT, 1.0e-4));
        assert_eq!(body.velocity.y, -2.0);
    }

    #[test]
    fn vertical_only_keeps_horizontal() {
        let mut integrator = PhysicsIntegrator::new(MovementConfig::default());
        let mut body = crate::test_support::body_at(Vector::zeros(), Vector::new(9.0, 1.0, 0.0));
        integrator.integrate_vertical(&mut body, &request([0.0, 1.0], 5.0, -0.5), DT);
        assert_eq!(body.velocity, Vector::new(9.0, -0.5, 0.0));
    }

    #[test]
    fn speed_combines_multiplier_and_momentum() {
        let config = MovementConfig::default();
        assert!(approx_eq(config.speed(config.sprint_multiplier, 1.05), 10.5, 1.0e-4));
    }
}
