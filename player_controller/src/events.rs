use character_motor_shooter::{LandingImpact, WallRunEnd, WallSide};
use rapier3d::math::Vector;
use rapier3d::prelude::Real;

use crate::LocomotionState;

/// Outbound notifications, drained once per fixed tick into the
/// [`TickReport`](crate::TickReport).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MovementEvent {
    StateChanged {
        from: Option<LocomotionState>,
        to: LocomotionState,
    },
    Landed(LandingImpact),
    LeftGround,
    EnteredSlope,
    ExitedSlope,
    /// Takeoff speed applied by the jump.
    Jumped { force: Real },
    DashStarted { charges_left: u32 },
    DashEnded,
    SlideStarted,
    SlideEnded,
    GrappleFired { point: Vector<Real> },
    GrappleAttached,
    GrappleReleased,
    WallRunStarted { side: Option<WallSide> },
    WallRunEnded { reason: WallRunEnd },
    WallJumped,
}
