//! Movement-shooter mechanics: ground sensing, momentum, jump, dash, slide,
//! grapple, wall-run, crouch and the per-tick velocity integrator.
//!
//! Every controller is deterministic and tick-driven. Waiting is modelled with
//! explicit timers decremented by the caller's fixed `dt`; nothing here touches
//! the physics engine directly; mechanics read and write a [`BodyState`] and query
//! the world through [`physics_rapier::WorldQuery`].
#![forbid(unsafe_code)]

pub mod crouch;
pub mod curve;
pub mod dash;
pub mod grapple;
pub mod ground;
pub mod integrator;
pub mod jump;
pub mod momentum;
pub mod slide;
pub mod view;
pub mod wall_run;

use rapier3d::math::Vector;
use rapier3d::prelude::Real;

pub use crouch::{CrouchConfig, CrouchController};
pub use curve::EaseCurve;
pub use dash::{DashConfig, DashController, DashStatus};
pub use grapple::{GrappleConfig, GrappleController, GrapplePhase};
pub use ground::{GroundConfig, GroundEdges, GroundHit, GroundSensor, LandingImpact};
pub use integrator::{MoveRequest, MovementConfig, PhysicsIntegrator};
pub use jump::{JumpConfig, JumpController, JumpPhase, VerticalStep};
pub use momentum::{MomentumConfig, MomentumFuel, MomentumModel};
pub use slide::{SlideConfig, SlideController};
pub use view::ViewAngles;
pub use wall_run::{WallContact, WallRunConfig, WallRunController, WallRunEnd, WallSide};

/// Kinematic snapshot of the player body, copied in and out of the physics
/// engine once per fixed tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    /// Collider center in world space.
    pub position: Vector<Real>,
    pub velocity: Vector<Real>,
    pub gravity_enabled: bool,
    pub linear_drag: Real,
}

impl BodyState {
    pub fn new(position: Vector<Real>, linear_drag: Real) -> Self {
        Self {
            position,
            velocity: Vector::zeros(),
            gravity_enabled: true,
            linear_drag,
        }
    }

    pub fn horizontal_velocity(&self) -> Vector<Real> {
        horizontal(self.velocity)
    }

    pub fn horizontal_speed(&self) -> Real {
        self.horizontal_velocity().norm()
    }

    pub fn set_horizontal_velocity(&mut self, planar: Vector<Real>) {
        self.velocity.x = planar.x;
        self.velocity.z = planar.z;
    }
}

pub fn up() -> Vector<Real> {
    Vector::y()
}

pub fn horizontal(v: Vector<Real>) -> Vector<Real> {
    Vector::new(v.x, 0.0, v.z)
}

/// Normalized copy of `v`, or zero when `v` is (nearly) zero.
pub fn normalize_or_zero(v: Vector<Real>) -> Vector<Real> {
    let len = v.norm();
    if len <= 1.0e-6 {
        Vector::zeros()
    } else {
        v / len
    }
}

pub fn project_on_plane(v: Vector<Real>, normal: Vector<Real>) -> Vector<Real> {
    let n2 = normal.norm_squared();
    if n2 <= 1.0e-12 {
        return v;
    }
    v - normal * (v.dot(&normal) / n2)
}

/// Tilt a horizontal velocity so it runs along the surface with `normal`,
/// keeping its horizontal part. Near-vertical normals leave it unchanged.
pub fn along_surface(planar: Vector<Real>, normal: Vector<Real>) -> Vector<Real> {
    if normal.y <= 1.0e-3 {
        return horizontal(planar);
    }
    let rise = -(normal.x * planar.x + normal.z * planar.z) / normal.y;
    Vector::new(planar.x, rise, planar.z)
}

pub fn lerp(a: Real, b: Real, t: Real) -> Real {
    a + (b - a) * t
}

pub fn lerp_vector(a: Vector<Real>, b: Vector<Real>, t: Real) -> Vector<Real> {
    a + (b - a) * t
}

pub fn move_towards(current: Real, target: Real, max_delta: Real) -> Real {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

pub fn move_towards_vector(
    current: Vector<Real>,
    target: Vector<Real>,
    max_delta: Real,
) -> Vector<Real> {
    let delta = target - current;
    let dist = delta.norm();
    if dist <= max_delta || dist <= 1.0e-6 {
        target
    } else {
        current + delta / dist * max_delta
    }
}

/// Decrement a countdown timer, never going below zero.
pub(crate) fn tick_down(timer: &mut Real, dt: Real) {
    if *timer > 0.0 {
        *timer = (*timer - dt).max(0.0);
    }
}

/// Scripted fakes shared by the unit tests here and by downstream crates
/// through the `test-support` feature.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use physics_rapier::{layers, Group, RayHit, RigidBodyHandle, WorldQuery};

    pub fn approx_eq(a: Real, b: Real, tolerance: Real) -> bool {
        (a - b).abs() <= tolerance
    }

    pub fn body_at(position: Vector<Real>, velocity: Vector<Real>) -> BodyState {
        BodyState {
            position,
            velocity,
            gravity_enabled: true,
            linear_drag: 4.0,
        }
    }

    /// One-sided infinite plane.
    pub struct Plane {
        pub point: Vector<Real>,
        pub normal: Vector<Real>,
        pub layer: Group,
        pub body: Option<(RigidBodyHandle, Vector<Real>)>,
    }

    /// Scripted world made of infinite planes.
    #[derive(Default)]
    pub struct PlaneWorld {
        pub planes: Vec<Plane>,
    }

    impl PlaneWorld {
        pub fn with_plane(mut self, point: Vector<Real>, normal: Vector<Real>, layer: Group) -> Self {
            self.planes.push(Plane {
                point,
                normal: normal.normalize(),
                layer,
                body: None,
            });
            self
        }

        pub fn with_moving_plane(
            mut self,
            point: Vector<Real>,
            normal: Vector<Real>,
            layer: Group,
            body: RigidBodyHandle,
            velocity: Vector<Real>,
        ) -> Self {
            self.planes.push(Plane {
                point,
                normal: normal.normalize(),
                layer,
                body: Some((body, velocity)),
            });
            self
        }
    }

    impl PlaneWorld {
        /// Push a body whose feet sank below a ground plane back on top of it
        /// and drop the velocity component into that plane.
        pub fn resolve_ground(&self, body: &mut BodyState, half_height: Real) {
            for plane in &self.planes {
                if !plane.layer.intersects(layers::GROUND) || plane.normal.y <= 1.0e-3 {
                    continue;
                }
                let offset = body.position - plane.point;
                let surface = plane.point.y
                    - (plane.normal.x * offset.x + plane.normal.z * offset.z) / plane.normal.y;
                if body.position.y - half_height < surface {
                    body.position.y = surface + half_height;
                    let into = body.velocity.dot(&plane.normal);
                    if into < 0.0 {
                        body.velocity -= plane.normal * into;
                    }
                }
            }
        }
    }

    impl WorldQuery for PlaneWorld {
        fn cast_ray(
            &self,
            origin: Vector<Real>,
            direction: Vector<Real>,
            max_distance: Real,
            mask: Group,
        ) -> Option<RayHit> {
            let dir = direction.normalize();
            let mut best: Option<RayHit> = None;
            for plane in &self.planes {
                if !plane.layer.intersects(mask) {
                    continue;
                }
                let denom = dir.dot(&plane.normal);
                if denom >= -1.0e-6 {
                    continue;
                }
                let t = (plane.point - origin).dot(&plane.normal) / denom;
                if t < 0.0 || t > max_distance {
                    continue;
                }
                if best.map(|hit| t < hit.distance).unwrap_or(true) {
                    best = Some(RayHit {
                        point: origin + dir * t,
                        normal: plane.normal,
                        distance: t,
                        body: plane.body.map(|(handle, _)| handle),
                    });
                }
            }
            best
        }

        fn overlap_sphere(&self, center: Vector<Real>, radius: Real, mask: Group) -> bool {
            self.planes.iter().any(|plane| {
                plane.layer.intersects(mask)
                    && (center - plane.point).dot(&plane.normal).abs() <= radius
            })
        }

        fn point_velocity(&self, body: RigidBodyHandle, _point: Vector<Real>) -> Vector<Real> {
            self.planes
                .iter()
                .filter_map(|plane| plane.body)
                .find(|(handle, _)| *handle == body)
                .map(|(_, velocity)| velocity)
                .unwrap_or_else(Vector::zeros)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_towards_clamps_step() {
        assert_eq!(move_towards(0.0, 10.0, 3.0), 3.0);
        assert_eq!(move_towards(9.0, 10.0, 3.0), 10.0);
        assert_eq!(move_towards(0.0, -10.0, 3.0), -3.0);
        let v = move_towards_vector(Vector::zeros(), Vector::new(3.0, 0.0, 4.0), 1.0);
        assert!((v.norm() - 1.0).abs() < 1.0e-5);
    }

    #[test]
    fn project_on_plane_removes_normal_component() {
        let normal = Vector::new(0.0, 1.0, 0.0);
        let projected = project_on_plane(Vector::new(1.0, 2.0, 3.0), normal);
        assert_eq!(projected, Vector::new(1.0, 0.0, 3.0));
        assert_eq!(normalize_or_zero(Vector::zeros()), Vector::zeros());
    }

    #[test]
    fn along_surface_follows_slope_and_keeps_planar_speed() {
        let angle: Real = 30.0_f32.to_radians();
        let normal = Vector::new(angle.sin(), angle.cos(), 0.0);
        let downhill = along_surface(Vector::new(6.0, 0.0, 2.0), normal);
        assert!(downhill.dot(&normal).abs() < 1.0e-5);
        assert_eq!(horizontal(downhill), Vector::new(6.0, 0.0, 2.0));
        assert!(downhill.y < 0.0);
        assert!(along_surface(Vector::new(-6.0, 0.0, 0.0), normal).y > 0.0);
        assert_eq!(along_surface(Vector::new(1.0, 3.0, 0.0), up()), Vector::new(1.0, 0.0, 0.0));
    }
}
