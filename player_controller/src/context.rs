//! Shared blackboard read and written by the locomotion states.

use character_motor_shooter::{
    BodyState, CrouchController, DashController, GrappleController, GroundSensor, JumpController,
    MomentumModel, MoveRequest, PhysicsIntegrator, SlideController, ViewAngles, WallRunController,
    WallRunEnd,
};
use rapier3d::prelude::Real;

use crate::{LocomotionConfig, LocomotionState, MovementEvent, MovementIntents};

pub struct MovementContext {
    pub intents: MovementIntents,
    pub view: ViewAngles,
    pub body: BodyState,
    pub ground: GroundSensor,
    pub momentum: MomentumModel,
    pub jump: JumpController,
    pub dash: DashController,
    pub slide: SlideController,
    pub grapple: GrappleController,
    pub wall_run: WallRunController,
    pub crouch: CrouchController,
    pub integrator: PhysicsIntegrator,
    pub current_state: LocomotionState,
    /// Fixed step of the tick currently being simulated.
    pub dt: Real,
    /// Why the last wall-run ended, consumed when leaving WallRunning.
    pub wall_run_end: Option<WallRunEnd>,
    events: Vec<MovementEvent>,
}

impl MovementContext {
    pub fn new(config: &LocomotionConfig, body: BodyState) -> Self {
        Self {
            intents: MovementIntents::default(),
            view: ViewAngles::default(),
            body,
            ground: GroundSensor::new(config.ground),
            momentum: MomentumModel::new(config.momentum),
            jump: JumpController::new(config.jump),
            dash: DashController::new(config.dash),
            slide: SlideController::new(config.slide),
            grapple: GrappleController::new(config.grapple),
            wall_run: WallRunController::new(config.wall_run),
            crouch: CrouchController::new(config.crouch),
            integrator: PhysicsIntegrator::new(config.movement),
            current_state: LocomotionState::Walking,
            dt: 0.0,
            wall_run_end: None,
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: MovementEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<MovementEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn grounded(&self) -> bool {
        self.ground.is_grounded()
    }

    /// base speed × multiplier of `state` × momentum factor.
    pub fn speed_for(&self, state: LocomotionState) -> Real {
        let movement = self.integrator.config();
        let multiplier = match state {
            LocomotionState::Walking | LocomotionState::Dashing | LocomotionState::Grappling => {
                movement.walk_multiplier
            }
            LocomotionState::Sprinting => movement.sprint_multiplier,
            LocomotionState::Crouching => movement.crouch_multiplier,
            LocomotionState::Sliding => movement.slide_multiplier,
            LocomotionState::WallRunning => movement.wall_run_multiplier,
        };
        movement.speed(multiplier, self.momentum.speed_factor())
    }

    /// Hand a pressed jump to the jump controller.
    pub fn route_jump(&mut self) {
        if self.intents.wants_jump {
            self.jump.request_jump();
        }
    }

    /// State to resume once a mechanic hands control back.
    pub fn resume_state(&self) -> LocomotionState {
        if self.intents.wants_crouch || !self.crouch.can_stand_up() {
            LocomotionState::Crouching
        } else if self.intents.wants_sprint {
            LocomotionState::Sprinting
        } else {
            LocomotionState::Walking
        }
    }

    /// Vertical step through the jump controller, emitting the jump event.
    fn vertical_step(&mut self) -> Real {
        let gravity = self.integrator.config().gravity;
        let step = self.jump.step_vertical(
            self.body.velocity.y,
            self.grounded(),
            gravity,
            self.body.gravity_enabled,
            self.dt,
        );
        if let Some(force) = step.jumped {
            self.emit(MovementEvent::Jumped { force });
        }
        step.velocity
    }

    /// Standard ground/air locomotion at the current state's speed.
    pub fn locomote(&mut self) {
        let vertical = self.vertical_step();
        let request = MoveRequest {
            move_axis: self.intents.move_axis,
            speed: self.speed_for(self.current_state),
            smoothing_scale: 1.0,
            vertical,
        };
        let ground = *self.ground.hit();
        let view = self.view;
        let dt = self.dt;
        self.integrator
            .integrate(&mut self.body, &ground, &view, &request, dt);
    }

    /// Vertical-only locomotion for states that own horizontal velocity.
    pub fn locomote_vertical(&mut self, smoothing_scale: Real) {
        let vertical = self.vertical_step();
        let request = MoveRequest {
            move_axis: self.intents.move_axis,
            speed: 0.0,
            smoothing_scale,
            vertical,
        };
        let dt = self.dt;
        self.integrator
            .integrate_vertical(&mut self.body, &request, dt);
    }
}
