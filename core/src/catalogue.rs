//! Static registry describing the shape and physical material of every piece.
//!
//! The footprint returned by [`rotated_footprint`] is the only place a piece
//! footprint is ever derived; the grid and the world never store one.

use crate::{CellRectSize, PieceKind, Rotation};

/// Whether a piece body is driven by the physics integrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Motion {
    /// The body never moves unless the world moves it explicitly.
    Static,
    /// The body is integrated by the physics simulation.
    Dynamic,
}

/// Physical material of a piece body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Mass in arbitrary mass units; ignored for static bodies.
    pub mass: f32,
    /// Coulomb friction coefficient.
    pub friction: f32,
    /// Bounciness; values above one add energy on impact.
    pub restitution: f32,
    /// Sensors report contacts without producing a collision response.
    pub sensor: bool,
}

impl Material {
    const SOLID: Self = Self {
        mass: 1.0,
        friction: 0.5,
        restitution: 0.0,
        sensor: false,
    };

    const SENSOR: Self = Self {
        sensor: true,
        ..Self::SOLID
    };
}

/// Registry entry for a single piece type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PieceSpec {
    /// Footprint at [`Rotation::Deg0`].
    pub footprint: CellRectSize,
    /// Orientations the piece may adopt, in rotation order.
    pub rotations: &'static [Rotation],
    /// Whether the body is static or dynamic.
    pub motion: Motion,
    /// Physical material of the body.
    pub material: Material,
}

const FIXED: &[Rotation] = &[Rotation::Deg0];
const HALF_TURNS: &[Rotation] = &[Rotation::Deg0, Rotation::Deg90];
const FULL_TURNS: &[Rotation] = &[
    Rotation::Deg0,
    Rotation::Deg90,
    Rotation::Deg180,
    Rotation::Deg270,
];

const BALL: PieceSpec = PieceSpec {
    footprint: CellRectSize::new(1, 1),
    rotations: FIXED,
    motion: Motion::Dynamic,
    material: Material {
        mass: 5.0,
        friction: 0.05,
        restitution: 0.3,
        sensor: false,
    },
};

const RAMP: PieceSpec = PieceSpec {
    footprint: CellRectSize::new(3, 1),
    rotations: FULL_TURNS,
    motion: Motion::Static,
    material: Material {
        friction: 0.1,
        ..Material::SOLID
    },
};

const PLATFORM: PieceSpec = PieceSpec {
    footprint: CellRectSize::new(2, 1),
    rotations: HALF_TURNS,
    motion: Motion::Static,
    material: Material::SOLID,
};

const BASKET: PieceSpec = PieceSpec {
    footprint: CellRectSize::new(2, 2),
    rotations: FIXED,
    motion: Motion::Static,
    material: Material::SENSOR,
};

const SEESAW: PieceSpec = PieceSpec {
    footprint: CellRectSize::new(3, 1),
    rotations: HALF_TURNS,
    motion: Motion::Static,
    material: Material::SOLID,
};

const TRAMPOLINE: PieceSpec = PieceSpec {
    footprint: CellRectSize::new(2, 1),
    rotations: HALF_TURNS,
    motion: Motion::Static,
    material: Material {
        friction: 0.3,
        restitution: 1.5,
        ..Material::SOLID
    },
};

const DOMINO: PieceSpec = PieceSpec {
    footprint: CellRectSize::new(1, 2),
    rotations: HALF_TURNS,
    motion: Motion::Dynamic,
    material: Material {
        mass: 1.0,
        friction: 0.8,
        restitution: 0.0,
        sensor: false,
    },
};

const FAN: PieceSpec = PieceSpec {
    footprint: CellRectSize::new(2, 2),
    rotations: FULL_TURNS,
    motion: Motion::Static,
    material: Material::SOLID,
};

const PRESSURE_PLATE: PieceSpec = PieceSpec {
    footprint: CellRectSize::new(1, 1),
    rotations: FIXED,
    motion: Motion::Static,
    material: Material::SENSOR,
};

impl PieceKind {
    /// Registry entry describing the piece type.
    #[must_use]
    pub const fn spec(self) -> &'static PieceSpec {
        match self {
            Self::Ball => &BALL,
            Self::Ramp => &RAMP,
            Self::Platform => &PLATFORM,
            Self::Basket => &BASKET,
            Self::Seesaw => &SEESAW,
            Self::Trampoline => &TRAMPOLINE,
            Self::Domino => &DOMINO,
            Self::Fan => &FAN,
            Self::PressurePlate => &PRESSURE_PLATE,
        }
    }

    /// Reports whether the piece may adopt the provided orientation.
    #[must_use]
    pub fn allows_rotation(self, rotation: Rotation) -> bool {
        self.spec().rotations.contains(&rotation)
    }

    /// Reports whether the piece has more than one orientation.
    #[must_use]
    pub fn is_rotatable(self) -> bool {
        self.spec().rotations.len() > 1
    }

    /// Reports whether the piece can fire trigger links.
    #[must_use]
    pub const fn is_trigger_source(self) -> bool {
        matches!(self, Self::PressurePlate)
    }
}

/// Footprint of a piece type at the provided orientation.
#[must_use]
pub fn rotated_footprint(kind: PieceKind, rotation: Rotation) -> CellRectSize {
    let footprint = kind.spec().footprint;
    if rotation.is_quarter_turn() {
        footprint.transposed()
    } else {
        footprint
    }
}

/// Cyclic successor of `rotation` within the piece's allowed orientations.
///
/// An orientation outside the allowed list restarts the cycle at its first
/// entry.
#[must_use]
pub fn next_rotation(kind: PieceKind, rotation: Rotation) -> Rotation {
    let rotations = kind.spec().rotations;
    match rotations.iter().position(|candidate| *candidate == rotation) {
        Some(index) => rotations[(index + 1) % rotations.len()],
        None => rotations[0],
    }
}
