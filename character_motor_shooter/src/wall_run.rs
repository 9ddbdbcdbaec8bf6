//! Wall-running along near-vertical surfaces, with a wall jump.

use physics_rapier::{layers, WorldQuery};
use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{horizontal, lerp_vector, move_towards, normalize_or_zero, tick_down, up, BodyState, ViewAngles};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallRunConfig {
    pub wall_run_speed: Real,
    pub acceleration: Real,
    pub max_time: Real,
    /// Velocity change per second pushing the body into the wall.
    pub stick_force: Real,
    /// Rate at which vertical velocity is pulled toward `sink_trickle`.
    pub gravity_counter: Real,
    pub wall_jump_up: Real,
    pub wall_jump_side: Real,
    pub wall_jump_forward: Real,
    pub check_distance: Real,
    /// Required clear drop below the feet before a wall-run may start.
    pub min_jump_height: Real,
    pub min_speed: Real,
    pub cooldown: Real,
    /// Height of the side rays above the collider center.
    pub chest_offset: Real,
    /// Largest |normal · up| still treated as a wall.
    pub verticality_tolerance: Real,
    /// Vertical velocity floor applied on start.
    pub start_vertical_speed: Real,
    /// Vertical velocity the run settles toward.
    pub sink_trickle: Real,
    /// Falling faster than this ends the run.
    pub max_sink_speed: Real,
    /// Outward push applied when the run ends without a wall jump.
    pub exit_impulse: Real,
    /// Per-tick blend of horizontal velocity toward the wall-run velocity.
    pub horizontal_blend: Real,
}

impl Default for WallRunConfig {
    fn default() -> Self {
        Self {
            wall_run_speed: 12.0,
            acceleration: 10.0,
            max_time: 2.0,
            stick_force: 15.0,
            gravity_counter: 15.0,
            wall_jump_up: 10.0,
            wall_jump_side: 15.0,
            wall_jump_forward: 5.0,
            check_distance: 0.8,
            min_jump_height: 1.0,
            min_speed: 3.0,
            cooldown: 0.3,
            chest_offset: 0.4,
            verticality_tolerance: 0.1,
            start_vertical_speed: 2.0,
            sink_trickle: -1.0,
            max_sink_speed: 6.0,
            exit_impulse: 1.0,
            horizontal_blend: 0.3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WallSide {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallContact {
    pub side: WallSide,
    pub normal: Vector<Real>,
    pub point: Vector<Real>,
    pub distance: Real,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WallRunEnd {
    LostWall,
    Grounded,
    TimedOut,
    TooSlow,
    Sinking,
    WallJump,
    /// Sprint released or crouch pressed.
    Released,
}

#[derive(Clone, Debug)]
pub struct WallRunController {
    config: WallRunConfig,
    wall: Option<WallContact>,
    floor_near: bool,
    active: bool,
    elapsed: Real,
    speed: Real,
    cooldown_timer: Real,
    saved_gravity: bool,
}

impl WallRunController {
    pub fn new(config: WallRunConfig) -> Self {
        Self {
            config,
            wall: None,
            floor_near: false,
            active: false,
            elapsed: 0.0,
            speed: 0.0,
            cooldown_timer: 0.0,
            saved_gravity: true,
        }
    }

    pub fn config(&self) -> &WallRunConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn wall(&self) -> Option<WallContact> {
        self.wall
    }

    pub fn has_wall(&self) -> bool {
        self.wall.is_some()
    }

    pub fn floor_near(&self) -> bool {
        self.floor_near
    }

    pub fn elapsed(&self) -> Real {
        self.elapsed
    }

    pub fn speed(&self) -> Real {
        self.speed
    }

    /// Re-run the side and floor-clearance casts. `half_height` is the
    /// distance from the collider center to the feet.
    pub fn refresh<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        body: &BodyState,
        view: &ViewAngles,
        half_height: Real,
    ) {
        let chest = body.position + up() * self.config.chest_offset;
        let right = view.right();
        self.wall = self
            .cast_side(world, chest, right, WallSide::Right)
            .or_else(|| self.cast_side(world, chest, -right, WallSide::Left));

        let clearance = half_height.max(0.0) + self.config.min_jump_height;
        self.floor_near = world
            .cast_ray(body.position, -up(), clearance, layers::GROUND)
            .is_some();
    }

    fn cast_side<W: WorldQuery + ?Sized>(
        &self,
        world: &W,
        origin: Vector<Real>,
        direction: Vector<Real>,
        side: WallSide,
    ) -> Option<WallContact> {
        let hit = world.cast_ray(origin, direction, self.config.check_distance, layers::WALL)?;
        if hit.normal.dot(&up()).abs() > self.config.verticality_tolerance {
            return None;
        }
        Some(WallContact {
            side,
            normal: normalize_or_zero(hit.normal),
            point: hit.point,
            distance: hit.distance,
        })
    }

    pub fn can_wall_run(&self, grounded: bool, horizontal_speed: Real) -> bool {
        !self.active
            && !grounded
            && horizontal_speed >= self.config.min_speed
            && self.wall.is_some()
            && !self.floor_near
            && self.cooldown_timer <= 0.0
    }

    pub fn tick_timers(&mut self, dt: Real) {
        tick_down(&mut self.cooldown_timer, dt);
    }

    pub fn start(&mut self, body: &mut BodyState) {
        if self.active {
            return;
        }
        self.active = true;
        self.elapsed = 0.0;
        self.speed = body.horizontal_speed().max(self.config.wall_run_speed * 0.7);
        body.velocity.y = body.velocity.y.max(self.config.start_vertical_speed);
        self.saved_gravity = body.gravity_enabled;
        body.gravity_enabled = false;
        debug!(speed = self.speed, side = ?self.wall.map(|wall| wall.side), "wall-run started");
    }

    /// Direction along the wall that best matches the camera.
    fn wall_forward(normal: Vector<Real>, view: &ViewAngles) -> Vector<Real> {
        let forward = normalize_or_zero(normal.cross(&up()));
        if forward.dot(&view.forward()) < 0.0 {
            -forward
        } else {
            forward
        }
    }

    /// Drive the run for one fixed tick. Returns the reason when it ended.
    pub fn fixed_tick(
        &mut self,
        body: &mut BodyState,
        view: &ViewAngles,
        grounded: bool,
        dt: Real,
    ) -> Option<WallRunEnd> {
        if !self.active {
            return None;
        }
        self.elapsed += dt;

        let end = match self.wall {
            None => Some(WallRunEnd::LostWall),
            Some(_) if grounded => Some(WallRunEnd::Grounded),
            Some(_) if self.elapsed >= self.config.max_time => Some(WallRunEnd::TimedOut),
            Some(_) if body.horizontal_speed() < self.config.min_speed => Some(WallRunEnd::TooSlow),
            Some(_) if body.velocity.y < -self.config.max_sink_speed => Some(WallRunEnd::Sinking),
            Some(_) => None,
        };
        if let Some(reason) = end {
            self.stop(body, reason);
            return Some(reason);
        }
        let Some(wall) = self.wall else {
            return None;
        };

        let forward = Self::wall_forward(wall.normal, view);
        self.speed = move_towards(self.speed, self.config.wall_run_speed, self.config.acceleration * dt);
        let target = forward * self.speed;
        let blend = self.config.horizontal_blend.clamp(0.0, 1.0);
        let planar = lerp_vector(body.horizontal_velocity(), target, blend);
        let vertical = move_towards(body.velocity.y, self.config.sink_trickle, self.config.gravity_counter * dt);
        let stick = horizontal(-wall.normal) * self.config.stick_force * dt;

        body.velocity = planar + stick + up() * vertical;
        None
    }

    /// End the run. No-op when not running.
    pub fn stop(&mut self, body: &mut BodyState, reason: WallRunEnd) {
        if !self.active {
            return;
        }
        self.active = false;
        self.cooldown_timer = self.config.cooldown;
        body.gravity_enabled = self.saved_gravity;
        if reason != WallRunEnd::WallJump {
            if let Some(wall) = self.wall {
                body.velocity += wall.normal * self.config.exit_impulse;
            }
        }
        debug!(?reason, elapsed = self.elapsed, "wall-run stopped");
    }

    pub fn cancel(&mut self, body: &mut BodyState) {
        self.stop(body, WallRunEnd::Released);
    }

    /// Launch up, away from the wall and forward, then stop the run.
    pub fn wall_jump(&mut self, body: &mut BodyState, view: &ViewAngles) -> bool {
        if !self.active {
            return false;
        }
        let Some(wall) = self.wall else {
            self.stop(body, WallRunEnd::LostWall);
            return false;
        };
        let forward = Self::wall_forward(wall.normal, view);
        let direction = normalize_or_zero(
            up() * self.config.wall_jump_up
                + wall.normal * self.config.wall_jump_side
                + forward * self.config.wall_jump_forward,
        );
        let magnitude = (self.config.wall_jump_up
            + self.config.wall_jump_side
            + self.config.wall_jump_forward)
            .max(self.speed * 1.2);
        body.velocity = direction * magnitude;
        self.stop(body, WallRunEnd::WallJump);
        debug!(magnitude, "wall jump");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{approx_eq, body_at, PlaneWorld};

    const DT: Real = 0.01;
    const HALF_HEIGHT: Real = 0.9;

    /// Wall at x = 0.5 facing -x, floor at y = 0.
    fn world() -> PlaneWorld {
        PlaneWorld::default()
            .with_plane(Vector::new(0.5, 0.0, 0.0), Vector::new(-1.0, 0.0, 0.0), layers::WALL)
            .with_plane(Vector::zeros(), up(), layers::GROUND)
    }

    fn airborne_runner() -> BodyState {
        body_at(Vector::new(0.0, 4.0, 0.0), Vector::new(0.0, 0.0, -8.0))
    }

    fn ready(world: &PlaneWorld, body: &BodyState) -> WallRunController {
        let mut wall_run = WallRunController::new(WallRunConfig::default());
        wall_run.refresh(world, body, &ViewAngles::default(), HALF_HEIGHT);
        wall_run
    }

    #[test]
    fn detects_wall_on_the_right() {
        let body = airborne_runner();
        let wall_run = ready(&world(), &body);
        let contact = wall_run.wall().expect("wall");
        assert_eq!(contact.side, WallSide::Right);
        assert_eq!(contact.normal, Vector::new(-1.0, 0.0, 0.0));
        assert!(!wall_run.floor_near());
        assert!(wall_run.can_wall_run(false, 8.0));
    }

    #[test]
    fn sloped_surfaces_are_not_walls() {
        let world = PlaneWorld::default().with_plane(
            Vector::new(0.5, 0.0, 0.0),
            Vector::new(-1.0, 0.5, 0.0),
            layers::WALL,
        );
        let wall_run = ready(&world, &airborne_runner());
        assert!(!wall_run.has_wall());
    }

    #[test]
    fn can_wall_run_checks_each_condition() {
        let world = world();
        let body = airborne_runner();
        let wall_run = ready(&world, &body);
        assert!(wall_run.can_wall_run(false, 8.0));
        assert!(!wall_run.can_wall_run(true, 8.0));
        assert!(!wall_run.can_wall_run(false, 2.0));

        let low = body_at(Vector::new(0.0, 1.5, 0.0), Vector::new(0.0, 0.0, -8.0));
        let near_floor = ready(&world, &low);
        assert!(near_floor.floor_near());
        assert!(!near_floor.can_wall_run(false, 8.0));

        let mut cooling = ready(&world, &body);
        let mut runner = body;
        cooling.start(&mut runner);
        cooling.stop(&mut runner, WallRunEnd::Released);
        assert!(!cooling.can_wall_run(false, 8.0));
        for _ in 0..31 {
            cooling.tick_timers(DT);
        }
        assert!(cooling.can_wall_run(false, 8.0));
    }

    #[test]
    fn start_floors_vertical_speed_and_disables_gravity() {
        let mut body = airborne_runner();
        body.velocity.y = -3.0;
        let mut wall_run = ready(&world(), &body);
        wall_run.start(&mut body);
        assert!(wall_run.is_active());
        assert_eq!(body.velocity.y, 2.0);
        assert!(!body.gravity_enabled);
        assert!(approx_eq(wall_run.speed(), 8.4, 1.0e-4));
    }

    #[test]
    fn running_follows_wall_and_counters_gravity() {
        let world = world();
        let mut body = airborne_runner();
        let view = ViewAngles::default();
        let mut wall_run = ready(&world, &body);
        wall_run.start(&mut body);
        for _ in 0..50 {
            assert_eq!(wall_run.fixed_tick(&mut body, &view, false, DT), None);
        }
        assert!(body.velocity.z < -8.0);
        assert!(body.velocity.x > 0.0);
        assert!(body.velocity.y < 2.0 && body.velocity.y >= -1.0);
    }

    #[test]
    fn run_times_out() {
        let world = world();
        let mut body = airborne_runner();
        let view = ViewAngles::default();
        let mut wall_run = ready(&world, &body);
        wall_run.start(&mut body);
        let mut reason = None;
        for _ in 0..300 {
            reason = wall_run.fixed_tick(&mut body, &view, false, DT);
            if reason.is_some() {
                break;
            }
        }
        assert_eq!(reason, Some(WallRunEnd::TimedOut));
        assert!(body.gravity_enabled);
    }

    #[test]
    fn losing_wall_or_landing_ends_run() {
        let mut body = airborne_runner();
        let view = ViewAngles::default();
        let mut wall_run = ready(&world(), &body);
        wall_run.start(&mut body);
        assert_eq!(
            wall_run.fixed_tick(&mut body, &view, true, DT),
            Some(WallRunEnd::Grounded)
        );

        let mut wall_run = ready(&world(), &body);
        wall_run.start(&mut body);
        wall_run.refresh(&PlaneWorld::default(), &body, &view, HALF_HEIGHT);
        assert_eq!(
            wall_run.fixed_tick(&mut body, &view, false, DT),
            Some(WallRunEnd::LostWall)
        );
    }

    #[test]
    fn wall_jump_launches_away_and_up() {
        let mut body = airborne_runner();
        let view = ViewAngles::default();
        let mut wall_run = ready(&world(), &body);
        wall_run.start(&mut body);
        assert!(wall_run.wall_jump(&mut body, &view));
        assert!(!wall_run.is_active());
        assert!(body.velocity.y > 0.0);
        assert!(body.velocity.x < 0.0);
        assert!(body.velocity.z < 0.0);
        assert!((body.velocity.norm() - 30.0).abs() < 1.0e-3);
        assert!(!wall_run.wall_jump(&mut body, &view));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut body = airborne_runner();
        let mut wall_run = ready(&world(), &body);
        wall_run.start(&mut body);
        wall_run.cancel(&mut body);
        let after = body;
        wall_run.cancel(&mut body);
        wall_run.stop(&mut body, WallRunEnd::TooSlow);
        assert_eq!(body, after);
    }
}
