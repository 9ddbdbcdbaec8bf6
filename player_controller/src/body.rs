//! Binds the simulated player capsule to a [`BodyState`].

use character_motor_shooter::{BodyState, CrouchConfig};
use physics_rapier::{layers, PhysicsWorld};
use rapier3d::prelude::*;

/// Positions written back closer than this are left to the solver.
const POSITION_EPSILON: Real = 1.0e-4;

#[derive(Clone, Copy, Debug)]
pub struct PlayerBody {
    body: RigidBodyHandle,
    collider: ColliderHandle,
    radius: Real,
    height: Real,
}

impl PlayerBody {
    /// Spawn a rotation-locked dynamic capsule centered at `position`. World
    /// gravity is disabled on the body; vertical motion is commanded through
    /// the velocity written back each tick.
    pub fn spawn(world: &mut PhysicsWorld, position: Vector<Real>, crouch: &CrouchConfig) -> Self {
        let rigid_body = RigidBodyBuilder::dynamic()
            .translation(position)
            .gravity_scale(0.0)
            .lock_rotations()
            .ccd_enabled(true)
            .build();
        let body = world.insert_body(rigid_body);
        let radius = crouch.radius;
        let height = crouch.stand_height;
        let collider = ColliderBuilder::new(Self::shape(height, radius))
            .collision_groups(InteractionGroups::new(layers::PLAYER, Group::ALL))
            .friction(0.0)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .build();
        let collider = world.insert_collider_with_parent(collider, body);
        world.refresh_queries();
        Self {
            body,
            collider,
            radius,
            height,
        }
    }

    pub fn handle(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn collider(&self) -> ColliderHandle {
        self.collider
    }

    pub fn height(&self) -> Real {
        self.height
    }

    /// Copy the simulated position and velocity into `state`. Returns false
    /// when the body no longer exists.
    pub fn read(&self, world: &PhysicsWorld, state: &mut BodyState) -> bool {
        let Some(body) = world.body(self.body) else {
            return false;
        };
        state.position = *body.translation();
        state.velocity = *body.linvel();
        true
    }

    /// Apply the commanded kinematics and collider height.
    pub fn write(&mut self, world: &mut PhysicsWorld, state: &BodyState, height: Real) {
        if let Some(body) = world.body_mut(self.body) {
            if (body.translation() - state.position).norm() > POSITION_EPSILON {
                body.set_translation(state.position, true);
            }
            body.set_linvel(state.velocity, true);
            body.set_linear_damping(state.linear_drag.max(0.0));
        }
        if (height - self.height).abs() > POSITION_EPSILON {
            if let Some(collider) = world.collider_mut(self.collider) {
                collider.set_shape(Self::shape(height, self.radius));
            }
            self.height = height;
        }
    }

    fn shape(height: Real, radius: Real) -> SharedShape {
        let half_segment = (height * 0.5 - radius).max(0.0);
        SharedShape::capsule_y(half_segment, radius)
    }
}
