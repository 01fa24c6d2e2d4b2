//! Placed pieces and the bodies they own.

use contraption_core::{
    catalogue::rotated_footprint, CellCoord, CellRect, Motion, PieceId, PieceKind, Rotation,
    CELL_LENGTH,
};
use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;

use crate::{
    behavior::{Behavior, Frame},
    grid::{region_center, Occupant},
    physics::{BodyDesc, Shape},
};

/// Gap between the ball and the walls of its cell.
const BALL_RADIUS_INSET: f32 = 4.0;
/// Linear damping applied to the ball.
const BALL_LINEAR_DAMPING: f32 = 0.01;
/// Thickness of a domino relative to a cell.
const DOMINO_THICKNESS: f32 = 0.3;
/// Length removed from a domino so neighbours do not touch.
const DOMINO_LENGTH_INSET: f32 = 8.0;
/// Rotational inertia of a domino, low enough that a light tap topples it.
const DOMINO_INERTIA: f32 = 50.0;
/// Thickness of the seesaw board relative to its footprint height.
const SEESAW_BOARD_THICKNESS: f32 = 0.3;

/// A piece on the grid together with the body it owns.
#[derive(Debug)]
pub(crate) struct Piece {
    pub(crate) id: PieceId,
    pub(crate) kind: PieceKind,
    pub(crate) origin: CellCoord,
    pub(crate) rotation: Rotation,
    pub(crate) fixed: bool,
    pub(crate) body: RigidBodyHandle,
    pub(crate) behavior: Behavior,
}

impl Piece {
    pub(crate) fn region(&self) -> CellRect {
        region_of(self.kind, self.origin, self.rotation)
    }

    pub(crate) fn occupant(&self) -> Occupant {
        Occupant {
            piece: self.id,
            kind: self.kind,
        }
    }

    pub(crate) fn frame(&self) -> Frame {
        let region = self.region();
        let size = region.size();
        Frame {
            piece: self.id,
            rotation: self.rotation,
            center: region_center(region),
            extent: Vec2::new(size.width() as f32, size.height() as f32) * CELL_LENGTH,
        }
    }

    /// Angle the body should hold when no behaviour is acting on it.
    pub(crate) fn rest_angle(&self) -> f32 {
        self.rotation.radians()
    }
}

/// Region covered by a piece of `kind` at `origin` and `rotation`.
pub(crate) fn region_of(kind: PieceKind, origin: CellCoord, rotation: Rotation) -> CellRect {
    CellRect::from_origin_and_size(origin, rotated_footprint(kind, rotation))
}

/// Body for a piece, centred on its footprint.
///
/// Shapes are described at rotation zero and turned by the body angle, which
/// keeps the body origin pinned to the footprint centre for every rotation.
pub(crate) fn body_desc(
    id: PieceId,
    kind: PieceKind,
    origin: CellCoord,
    rotation: Rotation,
) -> BodyDesc {
    let spec = kind.spec();
    let base = Vec2::new(
        spec.footprint.width() as f32,
        spec.footprint.height() as f32,
    ) * CELL_LENGTH;
    let half = base / 2.0;

    let shape = match kind {
        PieceKind::Ball => Shape::Ball {
            radius: CELL_LENGTH / 2.0 - BALL_RADIUS_INSET,
        },
        PieceKind::Ramp => Shape::Triangle {
            vertices: [
                Vec2::new(-half.x, -half.y),
                Vec2::new(-half.x, half.y),
                Vec2::new(half.x, half.y),
            ],
        },
        PieceKind::Domino => Shape::Cuboid {
            half_extents: Vec2::new(
                CELL_LENGTH * DOMINO_THICKNESS,
                base.y - DOMINO_LENGTH_INSET,
            ) / 2.0,
        },
        PieceKind::Seesaw => Shape::Cuboid {
            half_extents: Vec2::new(half.x, half.y * SEESAW_BOARD_THICKNESS),
        },
        PieceKind::Platform
        | PieceKind::Basket
        | PieceKind::Trampoline
        | PieceKind::Fan
        | PieceKind::PressurePlate => Shape::Cuboid { half_extents: half },
    };

    let (linear_damping, angular_inertia) = match kind {
        PieceKind::Ball => (BALL_LINEAR_DAMPING, None),
        PieceKind::Domino => (0.0, Some(DOMINO_INERTIA)),
        _ => (0.0, None),
    };

    BodyDesc {
        piece: id,
        motion: spec.motion,
        position: region_center(region_of(kind, origin, rotation)),
        angle: rotation.radians(),
        shape,
        material: spec.material,
        linear_damping,
        angular_inertia: angular_inertia.filter(|_| spec.motion == Motion::Dynamic),
    }
}
