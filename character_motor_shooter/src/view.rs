//! Camera look angles supplied by the camera collaborator.

use rapier3d::math::Vector;
use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};

const PITCH_LIMIT: Real = 1.54;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewAngles {
    pub yaw: Real,
    pub pitch: Real,
}

impl ViewAngles {
    pub fn new(yaw: Real, pitch: Real) -> Self {
        Self {
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
        }
    }

    /// Yaw-only forward on the ground plane.
    pub fn flat_forward(&self) -> Vector<Real> {
        Vector::new(self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    pub fn right(&self) -> Vector<Real> {
        Vector::new(self.yaw.cos(), 0.0, self.yaw.sin())
    }

    /// Full look direction including pitch.
    pub fn forward(&self) -> Vector<Real> {
        let (sp, cp) = self.pitch.sin_cos();
        Vector::new(self.yaw.sin() * cp, sp, -self.yaw.cos() * cp)
    }

    /// Rotate a 2D stick axis (x = strafe, y = forward) into world space.
    pub fn planar_direction(&self, axis: [Real; 2]) -> Vector<Real> {
        self.right() * axis[0] + self.flat_forward() * axis[1]
    }
}
