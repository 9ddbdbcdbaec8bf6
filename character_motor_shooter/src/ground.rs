//! Downward ground ray with slope classification and edge notifications.

use physics_rapier::{layers, RigidBodyHandle, WorldQuery};
use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{normalize_or_zero, project_on_plane, up, BodyState};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundConfig {
    /// Extra ray length below the feet, in meters.
    pub check_distance: Real,
    /// Angle (radians) from which a surface counts as a slope.
    pub min_slope_angle: Real,
    /// Steepest walkable angle (radians).
    pub max_slope_angle: Real,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            check_distance: 0.1,
            min_slope_angle: 5.0_f32.to_radians(),
            max_slope_angle: 45.0_f32.to_radians(),
        }
    }
}

/// Result of one ground check. Rebuilt every fixed tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundHit {
    pub grounded: bool,
    pub point: Vector<Real>,
    pub normal: Vector<Real>,
    /// Angle in radians between the surface normal and world-up.
    pub slope_angle: Real,
    /// Normalized downhill direction along the surface; zero on flat ground.
    pub slope_direction: Vector<Real>,
    pub is_on_slope: bool,
    pub is_walkable_slope: bool,
    pub body: Option<RigidBodyHandle>,
    /// Velocity of the supporting body at the contact point.
    pub ground_velocity: Vector<Real>,
}

impl GroundHit {
    pub fn airborne(position: Vector<Real>) -> Self {
        Self {
            grounded: false,
            point: position,
            normal: up(),
            slope_angle: 0.0,
            slope_direction: Vector::zeros(),
            is_on_slope: false,
            is_walkable_slope: false,
            body: None,
            ground_velocity: Vector::zeros(),
        }
    }

    /// Horizontal part of the downhill direction, normalized.
    pub fn downhill_horizontal(&self) -> Vector<Real> {
        normalize_or_zero(Vector::new(self.slope_direction.x, 0.0, self.slope_direction.z))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandingImpact {
    /// Absolute vertical speed just before touching down.
    pub fall_speed: Real,
    pub point: Vector<Real>,
    pub normal: Vector<Real>,
}

/// Transitions observed between the previous and the current check.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroundEdges {
    pub landed: Option<LandingImpact>,
    pub left_ground: bool,
    pub entered_slope: bool,
    pub exited_slope: bool,
}

/// Speed away from the surface above which the body is left to fly free.
const SNAP_SEPARATION_SPEED: Real = 0.05;

pub struct GroundSensor {
    config: GroundConfig,
    hit: GroundHit,
    last_air_vertical_velocity: Real,
    /// False until the first check, which seeds the state without edges.
    primed: bool,
}

impl GroundSensor {
    pub fn new(config: GroundConfig) -> Self {
        Self {
            config,
            hit: GroundHit::airborne(Vector::zeros()),
            last_air_vertical_velocity: 0.0,
            primed: false,
        }
    }

    pub fn config(&self) -> GroundConfig {
        self.config
    }

    pub fn hit(&self) -> &GroundHit {
        &self.hit
    }

    pub fn is_grounded(&self) -> bool {
        self.hit.grounded
    }

    pub fn last_air_vertical_velocity(&self) -> Real {
        self.last_air_vertical_velocity
    }

    /// Cast from the collider center straight down past the feet.
    ///
    /// `half_height` is the distance from the collider center to the feet.
    pub fn evaluate<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        body: &BodyState,
        half_height: Real,
    ) -> GroundEdges {
        let previous = self.hit;
        if !previous.grounded {
            self.last_air_vertical_velocity = body.velocity.y;
        }

        let max_distance = half_height.max(0.0) + self.config.check_distance.max(0.0);
        let down = -up();
        self.hit = match world.cast_ray(body.position, down, max_distance, layers::GROUND) {
            Some(hit) => {
                let normal = normalize_or_zero(hit.normal);
                let normal = if normal.norm_squared() > 0.0 { normal } else { up() };
                let slope_angle = normal.dot(&up()).clamp(-1.0, 1.0).acos();
                let is_on_slope = slope_angle >= self.config.min_slope_angle;
                let is_walkable_slope = is_on_slope && slope_angle <= self.config.max_slope_angle;
                let slope_direction = if is_on_slope {
                    normalize_or_zero(project_on_plane(down, normal))
                } else {
                    Vector::zeros()
                };
                let ground_velocity = hit
                    .body
                    .map(|handle| world.point_velocity(handle, hit.point))
                    .unwrap_or_else(Vector::zeros);
                GroundHit {
                    grounded: true,
                    point: hit.point,
                    normal,
                    slope_angle,
                    slope_direction,
                    is_on_slope,
                    is_walkable_slope,
                    body: hit.body,
                    ground_velocity,
                }
            }
            None => GroundHit::airborne(body.position),
        };

        let mut edges = GroundEdges::default();
        if !self.primed {
            self.primed = true;
            return edges;
        }
        if self.hit.grounded && !previous.grounded {
            edges.landed = Some(LandingImpact {
                fall_speed: self.last_air_vertical_velocity.abs(),
                point: self.hit.point,
                normal: self.hit.normal,
            });
            trace!(fall_speed = self.last_air_vertical_velocity.abs(), "landed");
        }
        if !self.hit.grounded && previous.grounded {
            edges.left_ground = true;
            trace!("left ground");
        }
        if self.hit.is_on_slope && !previous.is_on_slope {
            edges.entered_slope = true;
        }
        if !self.hit.is_on_slope && previous.is_on_slope {
            edges.exited_slope = true;
        }
        edges
    }

    /// Put the feet back on the surface under them while the body moves along or
    /// into it. Returns true when the position changed.
    pub fn snap_to_ground(&self, body: &mut BodyState, half_height: Real) -> bool {
        if !self.hit.grounded {
            return false;
        }
        let relative = body.velocity - self.hit.ground_velocity;
        if relative.dot(&self.hit.normal) > SNAP_SEPARATION_SPEED {
            return false;
        }
        let target = self.hit.point.y + half_height.max(0.0);
        if (body.position.y - target).abs() <= 1.0e-5 {
            return false;
        }
        body.position.y = target;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{approx_eq, body_at, PlaneWorld};

    fn sensor() -> GroundSensor {
        GroundSensor::new(GroundConfig::default())
    }

    fn slope_normal(angle_deg: Real) -> Vector<Real> {
        let angle = angle_deg.to_radians();
        // Rising toward -x: downhill points to +x.
        Vector::new(angle.sin(), angle.cos(), 0.0)
    }

    #[test]
    fn flat_ground_is_grounded_without_slope() {
        let world = PlaneWorld::default().with_plane(Vector::zeros(), up(), layers::GROUND);
        let mut sensor = sensor();
        let body = body_at(Vector::new(0.0, 0.9, 0.0), Vector::zeros());
        let edges = sensor.evaluate(&world, &body, 0.9);

        let hit = sensor.hit();
        assert!(hit.grounded);
        assert!(approx_eq(hit.point.y, 0.0, 1.0e-5));
        assert!(!hit.is_on_slope);
        assert_eq!(hit.slope_direction, Vector::zeros());
        assert!(hit.body.is_none());
        assert_eq!(edges, GroundEdges::default());
    }

    #[test]
    fn spawning_on_ground_reports_no_landing() {
        let world = PlaneWorld::default().with_plane(Vector::zeros(), up(), layers::GROUND);
        let mut sensor = sensor();
        let body = body_at(Vector::new(0.0, 0.9, 0.0), Vector::zeros());
        assert!(sensor.evaluate(&world, &body, 0.9).landed.is_none());
        assert!(sensor.evaluate(&world, &body, 0.9).landed.is_none());

        let air = body_at(Vector::new(0.0, 3.0, 0.0), Vector::zeros());
        assert!(sensor.evaluate(&world, &air, 0.9).left_ground);
        let touchdown = body_at(Vector::new(0.0, 0.9, 0.0), Vector::new(0.0, -4.0, 0.0));
        let landing = sensor.evaluate(&world, &touchdown, 0.9).landed.expect("landing");
        assert!(approx_eq(landing.fall_speed, 4.0, 1.0e-5));
    }

    #[test]
    fn snap_follows_the_surface_but_not_takeoff() {
        let world = PlaneWorld::default().with_plane(Vector::zeros(), slope_normal(30.0), layers::GROUND);
        let mut sensor = sensor();
        let mut body = body_at(Vector::new(0.0, 0.95, 0.0), Vector::zeros());
        sensor.evaluate(&world, &body, 0.9);
        assert!(sensor.is_grounded());

        body.velocity = crate::along_surface(Vector::new(5.0, 0.0, 0.0), sensor.hit().normal);
        assert!(sensor.snap_to_ground(&mut body, 0.9));
        assert!(approx_eq(body.position.y, 0.9, 1.0e-5));
        assert!(!sensor.snap_to_ground(&mut body, 0.9));

        body.position.y = 0.95;
        body.velocity = Vector::new(0.0, 4.0, 0.0);
        assert!(!sensor.snap_to_ground(&mut body, 0.9));
        assert!(approx_eq(body.position.y, 0.95, 1.0e-6));

        // A shorter capsule is re-centered on the same surface point.
        body.velocity = Vector::zeros();
        assert!(sensor.snap_to_ground(&mut body, 0.45));
        assert!(approx_eq(body.position.y, 0.45, 1.0e-5));
    }

    #[test]
    fn miss_defaults_to_position_and_up() {
        let world = PlaneWorld::default().with_plane(Vector::zeros(), up(), layers::GROUND);
        let mut sensor = sensor();
        let body = body_at(Vector::new(0.0, 3.0, 0.0), Vector::zeros());
        sensor.evaluate(&world, &body, 0.9);

        let hit = sensor.hit();
        assert!(!hit.grounded);
        assert_eq!(hit.point, body.position);
        assert_eq!(hit.normal, up());
        assert!(hit.body.is_none());
    }

    #[test]
    fn other_layers_are_not_ground() {
        let world = PlaneWorld::default().with_plane(Vector::zeros(), up(), layers::WALL);
        let mut sensor = sensor();
        sensor.evaluate(&world, &body_at(Vector::new(0.0, 0.9, 0.0), Vector::zeros()), 0.9);
        assert!(!sensor.is_grounded());
    }

    #[test]
    fn slopes_are_classified_by_angle() {
        let mut sensor = sensor();
        let body = body_at(Vector::new(0.0, 0.9, 0.0), Vector::zeros());

        let walkable = PlaneWorld::default().with_plane(Vector::zeros(), slope_normal(30.0), layers::GROUND);
        sensor.evaluate(&walkable, &body, 0.9);
        let hit = *sensor.hit();
        assert!(approx_eq(hit.slope_angle, 30.0_f32.to_radians(), 1.0e-4));
        assert!(hit.is_on_slope && hit.is_walkable_slope);
        assert!(hit.slope_direction.x > 0.0 && hit.slope_direction.y < 0.0);
        assert!(approx_eq(hit.downhill_horizontal().x, 1.0, 1.0e-5));

        let steep = PlaneWorld::default().with_plane(Vector::zeros(), slope_normal(60.0), layers::GROUND);
        sensor.evaluate(&steep, &body, 0.9);
        let hit = *sensor.hit();
        assert!(hit.grounded && hit.is_on_slope);
        assert!(!hit.is_walkable_slope);
    }

    #[test]
    fn edges_fire_once_per_transition() {
        let world = PlaneWorld::default().with_plane(Vector::zeros(), up(), layers::GROUND);
        let mut sensor = sensor();
        let air = body_at(Vector::new(0.0, 3.0, 0.0), Vector::new(0.0, -7.5, 0.0));
        let ground = body_at(Vector::new(0.0, 0.9, 0.0), Vector::new(0.0, -8.0, 0.0));

        assert_eq!(sensor.evaluate(&world, &air, 0.9), GroundEdges::default());
        let edges = sensor.evaluate(&world, &ground, 0.9);
        let landing = edges.landed.expect("landing");
        assert!(approx_eq(landing.fall_speed, 8.0, 1.0e-5));
        assert!(sensor.evaluate(&world, &ground, 0.9).landed.is_none());

        let edges = sensor.evaluate(&world, &air, 0.9);
        assert!(edges.left_ground);
        assert!(!sensor.evaluate(&world, &air, 0.9).left_ground);
    }

    #[test]
    fn slope_edges_fire_on_enter_and_exit() {
        let flat = PlaneWorld::default().with_plane(Vector::zeros(), up(), layers::GROUND);
        let slope = PlaneWorld::default().with_plane(Vector::zeros(), slope_normal(20.0), layers::GROUND);
        let mut sensor = sensor();
        let body = body_at(Vector::new(0.0, 0.9, 0.0), Vector::zeros());

        sensor.evaluate(&flat, &body, 0.9);
        assert!(sensor.evaluate(&slope, &body, 0.9).entered_slope);
        assert!(!sensor.evaluate(&slope, &body, 0.9).entered_slope);
        assert!(sensor.evaluate(&flat, &body, 0.9).exited_slope);
    }

    #[test]
    fn moving_platform_velocity_is_inherited() {
        let handle = RigidBodyHandle::from_raw_parts(3, 0);
        let world = PlaneWorld::default().with_moving_plane(
            Vector::zeros(),
            up(),
            layers::GROUND,
            handle,
            Vector::new(1.5, 0.0, 0.0),
        );
        let mut sensor = sensor();
        sensor.evaluate(&world, &body_at(Vector::new(0.0, 0.9, 0.0), Vector::zeros()), 0.9);
        assert_eq!(sensor.hit().body, Some(handle));
        assert_eq!(sensor.hit().ground_velocity, Vector::new(1.5, 0.0, 0.0));
    }
}
