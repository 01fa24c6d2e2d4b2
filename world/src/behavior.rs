//! Per-kind piece behaviour.
//!
//! Behaviours never touch the simulation directly. Contact, tick and trigger
//! handlers push [`Effect`] values which the world commits after every piece
//! has been visited, so a handler always observes the state the step left
//! behind.

use std::collections::BTreeSet;

use contraption_core::{PieceId, PieceKind, Rotation, CELL_LENGTH};
use glam::Vec2;

/// Peak force a fan applies, in mass times world units per second squared.
pub(crate) const FAN_FORCE: f32 = 500.0;
/// Reach of a fan measured in cells from its face.
pub(crate) const FAN_RANGE_CELLS: f32 = 5.0;
/// Converts rider lever arm and mass into seesaw torque.
pub(crate) const SEESAW_TORQUE_MULTIPLIER: f32 = 0.001;
/// Fraction of seesaw angular velocity lost every tick.
pub(crate) const SEESAW_ANGULAR_DAMPING: f32 = 0.1;
/// Largest tilt of a seesaw board in either direction.
pub(crate) const SEESAW_MAX_ANGLE: f32 = std::f32::consts::FRAC_PI_4;
/// Factor applied to the reflected vertical speed of a trampoline bounce.
pub(crate) const TRAMPOLINE_BOOST: f32 = 1.5;

/// Geometry of the piece a handler runs for.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Frame {
    pub(crate) piece: PieceId,
    pub(crate) rotation: Rotation,
    /// Footprint centre in world units.
    pub(crate) center: Vec2,
    /// Footprint extent in world units.
    pub(crate) extent: Vec2,
}

/// The other piece involved in a contact transition.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Contact {
    pub(crate) piece: PieceId,
    pub(crate) kind: PieceKind,
    pub(crate) dynamic: bool,
    /// Velocity the other piece had before the step that produced the contact.
    pub(crate) impact_velocity: Option<Vec2>,
}

/// Read-only state of a live body sampled after a step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BodySample {
    pub(crate) piece: PieceId,
    pub(crate) position: Vec2,
    pub(crate) mass: f32,
    pub(crate) dynamic: bool,
}

/// A write requested by a behaviour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Effect {
    Push { piece: PieceId, force: Vec2 },
    SetVelocity { piece: PieceId, velocity: Vec2 },
    Tilt { piece: PieceId, angle: f32 },
    Sensor { piece: PieceId, engaged: bool },
    Fire { source: PieceId },
    Goal { goal: PieceId, ball: PieceId },
}

/// Rider-driven tilt integrator for the seesaw.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct SeesawState {
    pub(crate) angle: f32,
    pub(crate) angular_velocity: f32,
    pub(crate) riders: BTreeSet<PieceId>,
}

/// Mutable state carried by a piece.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Behavior {
    Inert,
    Goal { triggered: bool },
    Plate { contacts: BTreeSet<PieceId> },
    Fan { active: bool },
    Seesaw(SeesawState),
    Trampoline,
}

impl Behavior {
    pub(crate) fn for_kind(kind: PieceKind) -> Self {
        match kind {
            PieceKind::Basket => Self::Goal { triggered: false },
            PieceKind::PressurePlate => Self::Plate {
                contacts: BTreeSet::new(),
            },
            PieceKind::Fan => Self::Fan { active: true },
            PieceKind::Seesaw => Self::Seesaw(SeesawState::default()),
            PieceKind::Trampoline => Self::Trampoline,
            PieceKind::Ball | PieceKind::Ramp | PieceKind::Platform | PieceKind::Domino => {
                Self::Inert
            }
        }
    }

    pub(crate) fn contact_started(&mut self, frame: &Frame, other: &Contact, out: &mut Vec<Effect>) {
        match self {
            Self::Goal { triggered } => {
                if !*triggered && other.kind == PieceKind::Ball {
                    *triggered = true;
                    out.push(Effect::Goal {
                        goal: frame.piece,
                        ball: other.piece,
                    });
                }
            }
            Self::Plate { contacts } => {
                if other.kind == PieceKind::Ball
                    && contacts.insert(other.piece)
                    && contacts.len() == 1
                {
                    out.push(Effect::Sensor {
                        piece: frame.piece,
                        engaged: true,
                    });
                    out.push(Effect::Fire {
                        source: frame.piece,
                    });
                }
            }
            Self::Seesaw(state) => {
                if other.dynamic {
                    let _ = state.riders.insert(other.piece);
                }
            }
            Self::Trampoline => {
                if let Some(velocity) = other.impact_velocity.filter(|_| other.dynamic) {
                    if velocity.y > 0.0 {
                        out.push(Effect::SetVelocity {
                            piece: other.piece,
                            velocity: Vec2::new(velocity.x, -velocity.y * TRAMPOLINE_BOOST),
                        });
                    }
                }
            }
            Self::Inert | Self::Fan { .. } => {}
        }
    }

    pub(crate) fn contact_stopped(&mut self, frame: &Frame, other: PieceId, out: &mut Vec<Effect>) {
        match self {
            Self::Plate { contacts } => {
                if contacts.remove(&other) && contacts.is_empty() {
                    out.push(Effect::Sensor {
                        piece: frame.piece,
                        engaged: false,
                    });
                }
            }
            Self::Seesaw(state) => {
                let _ = state.riders.remove(&other);
            }
            Self::Inert | Self::Goal { .. } | Self::Fan { .. } | Self::Trampoline => {}
        }
    }

    /// Per-tick update. `bodies` is sorted by piece identifier.
    pub(crate) fn tick(
        &mut self,
        frame: &Frame,
        dt: f32,
        bodies: &[BodySample],
        out: &mut Vec<Effect>,
    ) {
        match self {
            Self::Fan { active: true } => blow(frame, bodies, out),
            Self::Seesaw(state) => {
                let pivot = frame.center.x;
                let torque: f32 = state
                    .riders
                    .iter()
                    .filter_map(|rider| sample(bodies, *rider))
                    .map(|body| (body.position.x - pivot) * body.mass * SEESAW_TORQUE_MULTIPLIER)
                    .sum();

                state.angular_velocity += torque * dt;
                state.angular_velocity *= 1.0 - SEESAW_ANGULAR_DAMPING;
                state.angle += state.angular_velocity * dt;
                state.angle = state.angle.clamp(-SEESAW_MAX_ANGLE, SEESAW_MAX_ANGLE);
                if state.angle.abs() >= SEESAW_MAX_ANGLE * 0.99 {
                    state.angular_velocity = 0.0;
                }

                out.push(Effect::Tilt {
                    piece: frame.piece,
                    angle: frame.rotation.radians() + state.angle,
                });
            }
            Self::Fan { active: false }
            | Self::Inert
            | Self::Goal { .. }
            | Self::Plate { .. }
            | Self::Trampoline => {}
        }
    }

    /// Clears state tied to the piece orientation.
    pub(crate) fn reorient(&mut self) {
        if let Self::Seesaw(state) = self {
            *state = SeesawState::default();
        }
    }

    /// Handles a trigger from a linked sensor and reports the resulting
    /// activity, or `None` when the piece ignores triggers.
    pub(crate) fn trigger(&mut self) -> Option<bool> {
        match self {
            Self::Fan { active } => {
                *active = !*active;
                Some(*active)
            }
            Self::Inert
            | Self::Goal { .. }
            | Self::Plate { .. }
            | Self::Seesaw(_)
            | Self::Trampoline => None,
        }
    }
}

/// Unit vector a fan blows along for the provided rotation.
pub(crate) fn fan_direction(rotation: Rotation) -> Vec2 {
    match rotation {
        Rotation::Deg0 => Vec2::new(0.0, -1.0),
        Rotation::Deg90 => Vec2::new(1.0, 0.0),
        Rotation::Deg180 => Vec2::new(0.0, 1.0),
        Rotation::Deg270 => Vec2::new(-1.0, 0.0),
    }
}

/// Reports whether `point` lies inside the fan's air column.
pub(crate) fn in_fan_range(frame: &Frame, point: Vec2) -> bool {
    let direction = fan_direction(frame.rotation);
    let reach = FAN_RANGE_CELLS * CELL_LENGTH;
    let half = frame.extent / 2.0;

    let (axis, lateral, half_along, half_across, sign) = if direction.x != 0.0 {
        (
            point.x - frame.center.x,
            point.y - frame.center.y,
            half.x,
            half.y,
            direction.x,
        )
    } else {
        (
            point.y - frame.center.y,
            point.x - frame.center.x,
            half.y,
            half.x,
            direction.y,
        )
    };

    let along = axis * sign;
    along >= half_along && along <= half_along + reach && lateral.abs() < half_across + CELL_LENGTH
}

fn blow(frame: &Frame, bodies: &[BodySample], out: &mut Vec<Effect>) {
    let direction = fan_direction(frame.rotation);
    let reach = FAN_RANGE_CELLS * CELL_LENGTH;
    for body in bodies {
        if body.piece == frame.piece || !body.dynamic || !in_fan_range(frame, body.position) {
            continue;
        }
        let distance = body.position.distance(frame.center);
        let falloff = 1.0 - (distance / reach) * 0.5;
        out.push(Effect::Push {
            piece: body.piece,
            force: direction * FAN_FORCE * falloff,
        });
    }
}

fn sample(bodies: &[BodySample], piece: PieceId) -> Option<&BodySample> {
    bodies
        .binary_search_by_key(&piece, |body| body.piece)
        .ok()
        .and_then(|index| bodies.get(index))
}
