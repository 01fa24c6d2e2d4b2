//! rapier2d simulation driver.
//!
//! The driver speaks world units (pixels, y down) at its boundary and meters
//! internally, one cell edge per meter. Every body carries the identifier of
//! the piece that owns it in `user_data`, which is how contact reports are
//! routed back to pieces.

use std::{collections::HashMap, fmt};

use contraption_core::{Material, Motion, PieceId, CELL_LENGTH};
use glam::Vec2;
use rapier2d::crossbeam::channel::{unbounded, Receiver};
use rapier2d::prelude::*;

/// World units per simulation meter.
pub(crate) const PIXELS_PER_METER: f32 = CELL_LENGTH;

/// Collision geometry of a body, expressed in world units around the body
/// origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Shape {
    Ball { radius: f32 },
    Cuboid { half_extents: Vec2 },
    Triangle { vertices: [Vec2; 3] },
}

/// Everything required to build the body owned by a piece.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BodyDesc {
    pub(crate) piece: PieceId,
    pub(crate) motion: Motion,
    pub(crate) position: Vec2,
    pub(crate) angle: f32,
    pub(crate) shape: Shape,
    pub(crate) material: Material,
    pub(crate) linear_damping: f32,
    /// Overrides the rotational inertia (mass times square world units).
    pub(crate) angular_inertia: Option<f32>,
}

/// Contact transition observed during a single step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum ContactEvent {
    Started(PieceId, PieceId),
    Stopped(PieceId, PieceId),
}

impl ContactEvent {
    fn sort_key(&self) -> (u32, u32, bool) {
        let (a, b, stopped) = match *self {
            Self::Started(a, b) => (a, b, false),
            Self::Stopped(a, b) => (a, b, true),
        };
        (a.get().min(b.get()), a.get().max(b.get()), stopped)
    }
}

/// Owns the rapier sets and steps them.
pub(crate) struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    event_handler: ChannelEventCollector,
    collision_recv: Receiver<CollisionEvent>,
    force_recv: Receiver<ContactForceEvent>,
    impact_velocities: HashMap<RigidBodyHandle, Vec2>,
}

impl PhysicsWorld {
    /// Creates an empty simulation with downward gravity in world units per
    /// second squared.
    pub(crate) fn new(gravity: f32) -> Self {
        let (collision_send, collision_recv) = unbounded::<CollisionEvent>();
        let (force_send, force_recv) = unbounded::<ContactForceEvent>();
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, gravity / PIXELS_PER_METER],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            event_handler: ChannelEventCollector::new(collision_send, force_send),
            collision_recv,
            force_recv,
            impact_velocities: HashMap::new(),
        }
    }

    /// Builds a body and its collider and returns the body handle.
    pub(crate) fn insert(&mut self, desc: &BodyDesc) -> RigidBodyHandle {
        let builder = match desc.motion {
            Motion::Dynamic => RigidBodyBuilder::dynamic()
                .can_sleep(false)
                .ccd_enabled(true)
                .linear_damping(desc.linear_damping),
            Motion::Static => RigidBodyBuilder::fixed(),
        };
        let body = builder
            .translation(to_meters(desc.position))
            .rotation(desc.angle)
            .user_data(u128::from(desc.piece.get()))
            .build();
        let body_handle = self.rigid_body_set.insert(body);

        let shape = match desc.shape {
            Shape::Ball { radius } => SharedShape::ball(radius / PIXELS_PER_METER),
            Shape::Cuboid { half_extents } => SharedShape::cuboid(
                half_extents.x / PIXELS_PER_METER,
                half_extents.y / PIXELS_PER_METER,
            ),
            Shape::Triangle { vertices } => {
                let [a, b, c] = vertices.map(|vertex| {
                    let meters = to_meters(vertex);
                    point![meters.x, meters.y]
                });
                SharedShape::triangle(a, b, c)
            }
        };

        let mut collider = ColliderBuilder::new(shape)
            .friction(desc.material.friction)
            .restitution(desc.material.restitution)
            .sensor(desc.material.sensor)
            .active_events(ActiveEvents::COLLISION_EVENTS);
        if desc.motion == Motion::Dynamic {
            collider = match desc.angular_inertia {
                Some(inertia) => collider.mass_properties(MassProperties::new(
                    point![0.0, 0.0],
                    desc.material.mass,
                    inertia / (PIXELS_PER_METER * PIXELS_PER_METER),
                )),
                None => collider.mass(desc.material.mass),
            };
        }

        let _ = self.collider_set.insert_with_parent(
            collider.build(),
            body_handle,
            &mut self.rigid_body_set,
        );
        body_handle
    }

    /// Removes a body together with its colliders.
    pub(crate) fn remove(&mut self, handle: RigidBodyHandle) {
        let _ = self.impact_velocities.remove(&handle);
        let _ = self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Number of live bodies.
    pub(crate) fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Advances the simulation by `dt` seconds and reports the contact
    /// transitions the step produced, ordered by piece pair.
    pub(crate) fn step(&mut self, dt: f32) -> Vec<ContactEvent> {
        self.impact_velocities.clear();
        for (handle, body) in self.rigid_body_set.iter() {
            if body.is_dynamic() {
                let _ = self
                    .impact_velocities
                    .insert(handle, to_pixels(*body.linvel()));
            }
        }

        self.integration_params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &self.event_handler,
        );

        while self.force_recv.try_recv().is_ok() {}

        let mut contacts = Vec::new();
        while let Ok(event) = self.collision_recv.try_recv() {
            if event.removed() {
                continue;
            }
            let pieces = (
                self.piece_of(event.collider1()),
                self.piece_of(event.collider2()),
            );
            if let (Some(a), Some(b)) = pieces {
                contacts.push(if event.started() {
                    ContactEvent::Started(a, b)
                } else {
                    ContactEvent::Stopped(a, b)
                });
            }
        }
        contacts.sort_by_key(ContactEvent::sort_key);
        contacts
    }

    /// Body centre in world units.
    pub(crate) fn position(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.rigid_body_set
            .get(handle)
            .map(|body| to_pixels(*body.translation()))
    }

    /// Body angle in radians, clockwise on screen.
    pub(crate) fn angle(&self, handle: RigidBodyHandle) -> Option<f32> {
        self.rigid_body_set
            .get(handle)
            .map(|body| body.rotation().angle())
    }

    /// Linear velocity in world units per second.
    pub(crate) fn velocity(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.rigid_body_set
            .get(handle)
            .map(|body| to_pixels(*body.linvel()))
    }

    /// Velocity a dynamic body had before the most recent step.
    pub(crate) fn impact_velocity(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.impact_velocities.get(&handle).copied()
    }

    /// Mass of the body; zero for static bodies.
    pub(crate) fn mass(&self, handle: RigidBodyHandle) -> f32 {
        self.rigid_body_set
            .get(handle)
            .filter(|body| body.is_dynamic())
            .map_or(0.0, RigidBody::mass)
    }

    /// Reports whether the body is integrated by the simulation.
    pub(crate) fn is_dynamic(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .get(handle)
            .map_or(false, RigidBody::is_dynamic)
    }

    /// Places a body at a new centre and angle and stops it.
    pub(crate) fn teleport(&mut self, handle: RigidBodyHandle, position: Vec2, angle: f32) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_translation(to_meters(position), true);
            body.set_rotation(Rotation::new(angle), true);
            body.set_linvel(vector![0.0, 0.0], true);
            body.set_angvel(0.0, true);
        }
    }

    /// Overwrites the linear velocity in world units per second.
    pub(crate) fn set_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec2) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_linvel(to_meters(velocity), true);
        }
    }

    /// Overwrites the body angle.
    pub(crate) fn set_angle(&mut self, handle: RigidBodyHandle, angle: f32) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_rotation(Rotation::new(angle), true);
        }
    }

    /// Accumulates a force in mass times world units per second squared.
    ///
    /// Forces persist across steps until [`PhysicsWorld::reset_forces`].
    pub(crate) fn add_force(&mut self, handle: RigidBodyHandle, force: Vec2) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.add_force(to_meters(force), true);
        }
    }

    /// Clears the forces accumulated on every dynamic body.
    pub(crate) fn reset_forces(&mut self) {
        for (_, body) in self.rigid_body_set.iter_mut() {
            if body.is_dynamic() {
                body.reset_forces(false);
            }
        }
    }

    fn piece_of(&self, collider: ColliderHandle) -> Option<PieceId> {
        let parent = self.collider_set.get(collider)?.parent()?;
        let body = self.rigid_body_set.get(parent)?;
        u32::try_from(body.user_data).ok().map(PieceId::new)
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("gravity", &self.gravity)
            .field("bodies", &self.rigid_body_set.len())
            .field("colliders", &self.collider_set.len())
            .finish()
    }
}

fn to_meters(value: Vec2) -> Vector<Real> {
    vector![value.x / PIXELS_PER_METER, value.y / PIXELS_PER_METER]
}

fn to_pixels(value: Vector<Real>) -> Vec2 {
    Vec2::new(value.x * PIXELS_PER_METER, value.y * PIXELS_PER_METER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(id: u32, position: Vec2) -> BodyDesc {
        BodyDesc {
            piece: PieceId::new(id),
            motion: Motion::Dynamic,
            position,
            angle: 0.0,
            shape: Shape::Ball { radius: 20.0 },
            material: Material {
                mass: 5.0,
                friction: 0.05,
                restitution: 0.3,
                sensor: false,
            },
            linear_damping: 0.0,
            angular_inertia: None,
        }
    }

    fn floor(id: u32, position: Vec2, sensor: bool) -> BodyDesc {
        BodyDesc {
            piece: PieceId::new(id),
            motion: Motion::Static,
            position,
            angle: 0.0,
            shape: Shape::Cuboid {
                half_extents: Vec2::new(96.0, 24.0),
            },
            material: Material {
                mass: 1.0,
                friction: 0.5,
                restitution: 0.0,
                sensor,
            },
            linear_damping: 0.0,
            angular_inertia: None,
        }
    }

    #[test]
    fn dynamic_bodies_fall_under_gravity() {
        let mut physics = PhysicsWorld::new(1_000.0);
        let handle = physics.insert(&ball(0, Vec2::new(100.0, 100.0)));
        for _ in 0..30 {
            let _ = physics.step(1.0 / 60.0);
        }
        let position = physics.position(handle).expect("ball exists");
        assert!(position.y > 150.0, "ball only reached {position:?}");
        assert!((position.x - 100.0).abs() < 1e-3);
        assert!((physics.mass(handle) - 5.0).abs() < 1e-3);
    }

    #[test]
    fn sensor_contacts_report_owning_pieces() {
        let mut physics = PhysicsWorld::new(1_000.0);
        let _ = physics.insert(&ball(1, Vec2::new(96.0, 24.0)));
        let _ = physics.insert(&floor(2, Vec2::new(96.0, 200.0), true));

        let mut started = Vec::new();
        for _ in 0..120 {
            for contact in physics.step(1.0 / 60.0) {
                if let ContactEvent::Started(a, b) = contact {
                    started.push((a.get().min(b.get()), a.get().max(b.get())));
                }
            }
        }
        assert_eq!(started, vec![(1, 2)]);
    }

    #[test]
    fn removal_releases_bodies() {
        let mut physics = PhysicsWorld::new(1_000.0);
        let handle = physics.insert(&floor(3, Vec2::ZERO, false));
        assert_eq!(physics.body_count(), 1);
        physics.remove(handle);
        assert_eq!(physics.body_count(), 0);
        assert!(physics.position(handle).is_none());
    }
}
