//! One state per locomotion mechanic. States own no data; everything lives
//! in the [`MovementContext`].

use character_motor_shooter::{along_surface, JumpPhase, WallRunEnd};
use state_machine::{State, StateMachine};

use crate::{MovementContext, MovementEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocomotionState {
    Walking,
    Sprinting,
    Crouching,
    Sliding,
    Dashing,
    Grappling,
    WallRunning,
}

impl LocomotionState {
    pub const ALL: [LocomotionState; 7] = [
        LocomotionState::Walking,
        LocomotionState::Sprinting,
        LocomotionState::Crouching,
        LocomotionState::Sliding,
        LocomotionState::Dashing,
        LocomotionState::Grappling,
        LocomotionState::WallRunning,
    ];
}

pub type LocomotionMachine = StateMachine<LocomotionState, MovementContext>;

/// Register every locomotion state.
pub fn register_all(machine: &mut LocomotionMachine) {
    machine.register_state(LocomotionState::Walking, Box::new(Walking));
    machine.register_state(LocomotionState::Sprinting, Box::new(Sprinting));
    machine.register_state(LocomotionState::Crouching, Box::new(Crouching));
    machine.register_state(LocomotionState::Sliding, Box::new(Sliding));
    machine.register_state(LocomotionState::Dashing, Box::new(Dashing));
    machine.register_state(LocomotionState::Grappling, Box::new(Grappling));
    machine.register_state(LocomotionState::WallRunning, Box::new(WallRunning));
}

fn try_dash(ctx: &mut MovementContext) -> Option<LocomotionState> {
    if !ctx.intents.wants_dash {
        return None;
    }
    let direction = ctx.intents.dash_direction;
    let view = ctx.view;
    ctx.dash
        .try_start_dash(direction, &view, &mut ctx.body)
        .then_some(LocomotionState::Dashing)
}

fn try_grapple(ctx: &mut MovementContext) -> Option<LocomotionState> {
    if !ctx.intents.wants_grapple {
        return None;
    }
    ctx.grapple
        .try_start_grapple()
        .then_some(LocomotionState::Grappling)
}

fn try_wall_run(ctx: &mut MovementContext) -> Option<LocomotionState> {
    let speed = ctx.body.horizontal_speed();
    ctx.wall_run
        .can_wall_run(ctx.grounded(), speed)
        .then_some(LocomotionState::WallRunning)
}

pub struct Walking;

impl State<LocomotionState, MovementContext> for Walking {
    fn on_update(&mut self, ctx: &mut MovementContext) -> Option<LocomotionState> {
        ctx.route_jump();
        if let Some(next) = try_dash(ctx).or_else(|| try_grapple(ctx)) {
            return Some(next);
        }
        if ctx.intents.wants_crouch {
            return Some(LocomotionState::Crouching);
        }
        if ctx.intents.wants_sprint {
            return Some(LocomotionState::Sprinting);
        }
        None
    }

    fn on_fixed_update(&mut self, ctx: &mut MovementContext) {
        ctx.locomote();
    }
}

pub struct Sprinting;

impl State<LocomotionState, MovementContext> for Sprinting {
    fn on_update(&mut self, ctx: &mut MovementContext) -> Option<LocomotionState> {
        ctx.route_jump();
        if let Some(next) = try_dash(ctx).or_else(|| try_grapple(ctx)) {
            return Some(next);
        }
        if ctx.intents.wants_crouch {
            if ctx.grounded() && ctx.slide.try_start_slide(&mut ctx.body) {
                return Some(LocomotionState::Sliding);
            }
            return Some(LocomotionState::Crouching);
        }
        if !ctx.grounded() {
            if let Some(next) = try_wall_run(ctx) {
                return Some(next);
            }
        }
        if !ctx.intents.wants_sprint {
            return Some(LocomotionState::Walking);
        }
        None
    }

    fn on_fixed_update(&mut self, ctx: &mut MovementContext) {
        ctx.locomote();
    }
}

pub struct Crouching;

impl State<LocomotionState, MovementContext> for Crouching {
    fn on_enter(&mut self, ctx: &mut MovementContext) {
        ctx.crouch.set_crouching(true);
    }

    fn on_update(&mut self, ctx: &mut MovementContext) -> Option<LocomotionState> {
        ctx.route_jump();
        if let Some(next) = try_grapple(ctx) {
            return Some(next);
        }
        if ctx.intents.wants_crouch || !ctx.crouch.can_stand_up() {
            return None;
        }
        if ctx.intents.wants_sprint {
            Some(LocomotionState::Sprinting)
        } else {
            Some(LocomotionState::Walking)
        }
    }

    fn on_fixed_update(&mut self, ctx: &mut MovementContext) {
        ctx.locomote();
    }

    fn on_exit(&mut self, ctx: &mut MovementContext) {
        ctx.crouch.set_crouching(false);
    }
}

pub struct Sliding;

impl State<LocomotionState, MovementContext> for Sliding {
    fn on_enter(&mut self, ctx: &mut MovementContext) {
        ctx.crouch.set_crouching(true);
        let boost = ctx.momentum.config().slide_start_boost;
        ctx.momentum.grant(boost);
        ctx.emit(MovementEvent::SlideStarted);
    }

    fn on_update(&mut self, ctx: &mut MovementContext) -> Option<LocomotionState> {
        if ctx.intents.wants_jump {
            ctx.route_jump();
            return Some(if ctx.intents.wants_sprint {
                LocomotionState::Sprinting
            } else {
                LocomotionState::Walking
            });
        }
        if !ctx.intents.wants_crouch {
            return Some(ctx.resume_state());
        }
        if !ctx.slide.is_active() {
            return Some(ctx.resume_state());
        }
        None
    }

    fn on_fixed_update(&mut self, ctx: &mut MovementContext) {
        let ground = *ctx.ground.hit();
        let dt = ctx.dt;
        ctx.slide.fixed_tick(&mut ctx.body, &ground, dt);
        let scale = ctx.integrator.config().slide_smoothing_scale;
        ctx.locomote_vertical(scale);
        if ground.grounded && ctx.jump.phase() == JumpPhase::Grounded {
            ctx.body.velocity = along_surface(ctx.body.horizontal_velocity(), ground.normal);
        }
    }

    fn on_exit(&mut self, ctx: &mut MovementContext) {
        ctx.slide.cancel(&mut ctx.body);
        ctx.crouch.set_crouching(false);
        ctx.emit(MovementEvent::SlideEnded);
    }
}

pub struct Dashing;

impl State<LocomotionState, MovementContext> for Dashing {
    fn on_enter(&mut self, ctx: &mut MovementContext) {
        let charges_left = ctx.dash.charges();
        ctx.emit(MovementEvent::DashStarted { charges_left });
    }

    fn on_update(&mut self, ctx: &mut MovementContext) -> Option<LocomotionState> {
        if ctx.dash.is_active() {
            return None;
        }
        Some(ctx.resume_state())
    }

    fn on_fixed_update(&mut self, ctx: &mut MovementContext) {
        let gravity = ctx.integrator.config().gravity;
        let dt = ctx.dt;
        ctx.dash.fixed_tick(&mut ctx.body, gravity, dt);
    }

    fn on_exit(&mut self, ctx: &mut MovementContext) {
        ctx.dash.cancel(&mut ctx.body);
        let boost = ctx.momentum.config().post_dash_boost;
        ctx.momentum.grant(boost);
        ctx.emit(MovementEvent::DashEnded);
    }
}

pub struct Grappling;

impl State<LocomotionState, MovementContext> for Grappling {
    fn on_enter(&mut self, ctx: &mut MovementContext) {
        if let Some(point) = ctx.grapple.grapple_point() {
            ctx.emit(MovementEvent::GrappleFired { point });
        }
    }

    fn on_update(&mut self, ctx: &mut MovementContext) -> Option<LocomotionState> {
        if ctx.intents.wants_jump {
            ctx.route_jump();
            return Some(ctx.resume_state());
        }
        if ctx.intents.wants_grapple || !ctx.grapple.is_active() {
            return Some(ctx.resume_state());
        }
        None
    }

    fn on_fixed_update(&mut self, ctx: &mut MovementContext) {
        let was_attached = ctx.grapple.is_attached();
        let dt = ctx.dt;
        ctx.grapple.fixed_tick(&mut ctx.body, dt);
        if ctx.grapple.is_attached() {
            if !was_attached {
                ctx.emit(MovementEvent::GrappleAttached);
            }
        } else {
            // Rope in flight or released: regular air control.
            ctx.locomote();
        }
    }

    fn on_exit(&mut self, ctx: &mut MovementContext) {
        ctx.grapple.cancel();
        ctx.emit(MovementEvent::GrappleReleased);
    }
}

pub struct WallRunning;

impl State<LocomotionState, MovementContext> for WallRunning {
    fn on_enter(&mut self, ctx: &mut MovementContext) {
        ctx.wall_run_end = None;
        ctx.wall_run.start(&mut ctx.body);
        let side = ctx.wall_run.wall().map(|wall| wall.side);
        ctx.emit(MovementEvent::WallRunStarted { side });
    }

    fn on_update(&mut self, ctx: &mut MovementContext) -> Option<LocomotionState> {
        if ctx.intents.wants_jump {
            let view = ctx.view;
            if ctx.wall_run.wall_jump(&mut ctx.body, &view) {
                ctx.wall_run_end = Some(WallRunEnd::WallJump);
                ctx.emit(MovementEvent::WallJumped);
            }
            return Some(ctx.resume_state());
        }
        if !ctx.intents.wants_sprint || ctx.intents.wants_crouch {
            return Some(ctx.resume_state());
        }
        if !ctx.wall_run.is_active() {
            return Some(ctx.resume_state());
        }
        None
    }

    fn on_fixed_update(&mut self, ctx: &mut MovementContext) {
        let view = ctx.view;
        let grounded = ctx.grounded();
        let dt = ctx.dt;
        if let Some(reason) = ctx.wall_run.fixed_tick(&mut ctx.body, &view, grounded, dt) {
            ctx.wall_run_end = Some(reason);
        }
    }

    fn on_exit(&mut self, ctx: &mut MovementContext) {
        let reason = ctx
            .wall_run_end
            .take()
            .unwrap_or(WallRunEnd::Released);
        ctx.wall_run.stop(&mut ctx.body, reason);
        ctx.emit(MovementEvent::WallRunEnded { reason });
    }
}
