//! Frame and fixed tick driver for the locomotion state machine.

use character_motor_shooter::{up, BodyState, DashStatus, GroundEdges, MomentumFuel, ViewAngles};
use physics_rapier::WorldQuery;
use rapier3d::prelude::Real;
use state_machine::Transition;
use tracing::warn;

use crate::states::{register_all, LocomotionMachine};
use crate::{LocomotionConfig, LocomotionState, MovementContext, MovementEvent, MovementIntents};

/// Everything collaborators need from one fixed tick.
#[derive(Clone, Debug)]
pub struct TickReport {
    pub state: LocomotionState,
    pub events: Vec<MovementEvent>,
    pub grounded: bool,
    /// Momentum as a fraction of its maximum.
    pub momentum: Real,
    pub dash: DashStatus,
    pub collider_height: Real,
    /// Locomotion speed of the current state including momentum.
    pub target_speed: Real,
}

pub struct LocomotionController {
    machine: LocomotionMachine,
    ctx: MovementContext,
    velocity_dirty: bool,
}

impl LocomotionController {
    pub fn new(config: LocomotionConfig, body: BodyState) -> Self {
        let validation = config.validate();
        for error in &validation.errors {
            warn!(%error, "locomotion config");
        }
        let mut body = body;
        body.linear_drag = config.movement.ground_drag;
        let mut ctx = MovementContext::new(&config, body);
        let mut machine = LocomotionMachine::new();
        register_all(&mut machine);
        machine.initialize(LocomotionState::Walking, &mut ctx);
        Self {
            machine,
            ctx,
            velocity_dirty: false,
        }
    }

    pub fn state(&self) -> LocomotionState {
        self.ctx.current_state
    }

    pub fn is_in_state(&self, state: LocomotionState) -> bool {
        self.machine.is_in_state(state)
    }

    pub fn context(&self) -> &MovementContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut MovementContext {
        &mut self.ctx
    }

    pub fn body(&self) -> &BodyState {
        &self.ctx.body
    }

    pub fn momentum(&self) -> Real {
        self.ctx.momentum.normalized()
    }

    pub fn dash_status(&self) -> DashStatus {
        self.ctx.dash.status()
    }

    pub fn collider_height(&self) -> Real {
        self.ctx.crouch.height()
    }

    /// Force a transition, bypassing the active state's rules.
    pub fn change_state(&mut self, state: LocomotionState) -> Option<Transition<LocomotionState>> {
        let transition = self.machine.change_state(state, &mut self.ctx)?;
        self.record_transition(transition);
        Some(transition)
    }

    /// Frame tick: sample intents, refresh wall and ceiling casts and evaluate transitions.
    pub fn update<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        intents: MovementIntents,
        view: ViewAngles,
    ) -> Option<Transition<LocomotionState>> {
        let ctx = &mut self.ctx;
        ctx.intents = intents;
        ctx.view = view;
        ctx.jump.set_jump_held(intents.jump_held);

        let half_height = ctx.crouch.half_height();
        ctx.wall_run.refresh(world, &ctx.body, &view, half_height);
        ctx.crouch.refresh_ceiling(world, &ctx.body);
        if intents.wants_grapple && !ctx.grapple.is_active() {
            let eye = ctx.body.position + up() * ctx.integrator.config().eye_height;
            ctx.grapple.refresh_aim(world, eye, view.forward());
        }

        let velocity_before = ctx.body.velocity;
        let transition = self.machine.update(&mut self.ctx);
        if let Some(transition) = transition {
            self.record_transition(transition);
        }
        if self.ctx.body.velocity != velocity_before {
            self.velocity_dirty = true;
        }
        self.ctx.intents.clear_edges();
        transition
    }

    /// Fixed tick: ground check, mechanic timers, momentum, then the active
    /// state's physics, the crouch blend and the ground snap. `body` carries
    /// the simulated kinematics in and the commanded kinematics out.
    pub fn fixed_update<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        body: &mut BodyState,
        dt: Real,
    ) -> TickReport {
        self.sync_body(body);
        let ctx = &mut self.ctx;
        ctx.dt = dt;

        let half_height = ctx.crouch.half_height();
        let edges = ctx.ground.evaluate(world, &ctx.body, half_height);
        Self::emit_ground_edges(ctx, edges);

        let grounded = ctx.ground.is_grounded();
        ctx.jump.update_timers(grounded, ctx.body.velocity.y, dt);
        ctx.dash.tick_timers(dt);
        ctx.grapple.tick_timers(dt);
        ctx.wall_run.tick_timers(dt);

        let hit = *ctx.ground.hit();
        let fuel = MomentumFuel {
            grounded,
            sprinting: ctx.current_state == LocomotionState::Sprinting,
            move_input: ctx.intents.move_magnitude(),
            sliding: ctx.slide.is_active().then(|| ctx.slide.momentum_weight()),
            walkable_slope: hit.is_walkable_slope,
            slope_angle: hit.slope_angle,
            downhill: hit.downhill_horizontal(),
            horizontal_velocity: ctx.body.horizontal_velocity(),
        };
        ctx.momentum.accumulate(&fuel, dt);

        self.machine.fixed_update(&mut self.ctx);

        let ctx = &mut self.ctx;
        ctx.crouch.fixed_tick(dt);
        let half_height = ctx.crouch.half_height();
        ctx.ground.snap_to_ground(&mut ctx.body, half_height);
        if !ctx.slide.is_active() {
            ctx.body.linear_drag = ctx.integrator.config().ground_drag;
        }
        *body = ctx.body;

        TickReport {
            state: ctx.current_state,
            events: ctx.drain_events(),
            grounded,
            momentum: ctx.momentum.normalized(),
            dash: ctx.dash.status(),
            collider_height: ctx.crouch.height(),
            target_speed: ctx.speed_for(ctx.current_state),
        }
    }

    /// Position always comes from the simulation. Velocity does too, unless a
    /// frame-time mechanic start overrode it since the last fixed tick.
    fn sync_body(&mut self, body: &BodyState) {
        self.ctx.body.position = body.position;
        if !self.velocity_dirty {
            self.ctx.body.velocity = body.velocity;
        }
        self.velocity_dirty = false;
    }

    fn record_transition(&mut self, transition: Transition<LocomotionState>) {
        self.ctx.current_state = transition.to;
        self.ctx.emit(MovementEvent::StateChanged {
            from: transition.from,
            to: transition.to,
        });
    }

    fn emit_ground_edges(ctx: &mut MovementContext, edges: GroundEdges) {
        if let Some(impact) = edges.landed {
            ctx.emit(MovementEvent::Landed(impact));
        }
        if edges.left_ground {
            ctx.emit(MovementEvent::LeftGround);
        }
        if edges.entered_slope {
            ctx.emit(MovementEvent::EnteredSlope);
        }
        if edges.exited_slope {
            ctx.emit(MovementEvent::ExitedSlope);
        }
    }
}
