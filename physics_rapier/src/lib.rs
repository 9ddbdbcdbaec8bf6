//! Rapier integration entrypoints, collision layers and the world query surface.
#![forbid(unsafe_code)]

use rapier3d::prelude::*;

pub use rapier3d::prelude::{Group, RigidBodyHandle};

/// Named collision masks used by the movement queries.
pub mod layers {
    use rapier3d::prelude::Group;

    pub const GROUND: Group = Group::GROUP_1;
    pub const WALL: Group = Group::GROUP_2;
    pub const GRAPPLE_SURFACE: Group = Group::GROUP_3;
    pub const PLAYER: Group = Group::GROUP_4;

    /// Geometry that blocks standing up from a crouch.
    pub const CEILING: Group = GROUND.union(WALL);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub point: Vector<Real>,
    pub normal: Vector<Real>,
    pub distance: Real,
    /// Parent body of the hit collider. A handle, never an owning reference.
    pub body: Option<RigidBodyHandle>,
}

/// Query surface the movement core consumes. Implemented by [`PhysicsWorld`] and
/// by scripted fakes in tests.
pub trait WorldQuery {
    /// Cast a ray against colliders whose membership intersects `mask`.
    /// Sensor colliders are ignored. `direction` does not need to be normalized.
    fn cast_ray(
        &self,
        origin: Vector<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        mask: Group,
    ) -> Option<RayHit>;

    /// True when a sphere at `center` overlaps any non-sensor collider in `mask`.
    fn overlap_sphere(&self, center: Vector<Real>, radius: Real, mask: Group) -> bool;

    /// Velocity of `body` at the world-space `point`; zero when the body is gone.
    fn point_velocity(&self, body: RigidBodyHandle, point: Vector<Real>) -> Vector<Real>;
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector<Real>) -> Self {
        Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn query_pipeline(&self) -> &QueryPipeline {
        &self.query_pipeline
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn collider_mut(&mut self, handle: ColliderHandle) -> Option<&mut Collider> {
        self.colliders.get_mut(handle)
    }

    pub fn step(&mut self, dt: Real) {
        self.integration_parameters.dt = dt;
        let physics_hooks = ();
        let event_handler = ();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &physics_hooks,
            &event_handler,
        );
        self.query_pipeline.update(&self.colliders);
    }

    /// Refresh the query acceleration structure without advancing the simulation.
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    pub fn insert_static_collider(&mut self, collider: Collider) -> ColliderHandle {
        self.colliders.insert(collider)
    }

    /// Insert a static collider that only belongs to `layer`.
    pub fn insert_layered_collider(&mut self, collider: Collider, layer: Group) -> ColliderHandle {
        let mut collider = collider;
        collider.set_collision_groups(InteractionGroups::new(layer, Group::ALL));
        self.colliders.insert(collider)
    }

    pub fn insert_body(&mut self, body: RigidBody) -> RigidBodyHandle {
        self.bodies.insert(body)
    }

    pub fn insert_collider_with_parent(
        &mut self,
        collider: Collider,
        parent: RigidBodyHandle,
    ) -> ColliderHandle {
        self.colliders
            .insert_with_parent(collider, parent, &mut self.bodies)
    }

    fn layer_filter(mask: Group) -> QueryFilter<'static> {
        QueryFilter::default()
            .groups(InteractionGroups::new(Group::ALL, mask))
            .exclude_sensors()
    }
}

impl WorldQuery for PhysicsWorld {
    fn cast_ray(
        &self,
        origin: Vector<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        mask: Group,
    ) -> Option<RayHit> {
        if direction.norm_squared() <= 1.0e-12 || max_distance <= 0.0 {
            return None;
        }
        let ray = Ray::new(Point::from(origin), direction.normalize());
        let (handle, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            max_distance,
            true,
            Self::layer_filter(mask),
        )?;
        let body = self.colliders.get(handle).and_then(|collider| collider.parent());
        Some(RayHit {
            point: ray.point_at(hit.time_of_impact).coords,
            normal: hit.normal,
            distance: hit.time_of_impact,
            body,
        })
    }

    fn overlap_sphere(&self, center: Vector<Real>, radius: Real, mask: Group) -> bool {
        if radius <= 0.0 {
            return false;
        }
        let shape = Ball::new(radius);
        let shape_pos = Isometry::translation(center.x, center.y, center.z);
        self.query_pipeline
            .intersection_with_shape(
                &self.bodies,
                &self.colliders,
                &shape_pos,
                &shape,
                Self::layer_filter(mask),
            )
            .is_some()
    }

    fn point_velocity(&self, body: RigidBodyHandle, point: Vector<Real>) -> Vector<Real> {
        self.bodies
            .get(body)
            .map(|body| body.velocity_at_point(&Point::from(point)))
            .unwrap_or_else(Vector::zeros)
    }
}
