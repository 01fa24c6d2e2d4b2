#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Contraption puzzle engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point and broadcasts [`Event`] values describing what
//! changed. Requests the world refuses come back as a [`Rejection`].
//!
//! The static piece registry lives in [`catalogue`] and the serialisable level
//! description consumed by hosts lives in [`level`].

pub mod catalogue;
pub mod level;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use catalogue::{Material, Motion, PieceSpec};
pub use level::{FixtureSpec, InventorySpec, LevelDescriptor};

/// Edge length of a single grid cell measured in world units (pixels).
pub const CELL_LENGTH: f32 = 48.0;

/// Number of cell columns in the standard play area.
pub const DEFAULT_COLUMNS: u32 = 20;

/// Number of cell rows in the standard play area.
pub const DEFAULT_ROWS: u32 = 15;

/// Describes the active phase of a puzzle attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayMode {
    /// Pieces may be placed, moved, rotated and deleted; physics is paused.
    Edit,
    /// The physics simulation is running and the layout is frozen.
    Simulate,
    /// The goal was reached; the clock is stopped until the level is reset.
    Complete,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Tears down the current layout and builds the provided level.
    LoadLevel {
        /// Description of the fixtures and inventory to install.
        level: LevelDescriptor,
    },
    /// Requests placement of a piece drawn from the inventory.
    PlacePiece {
        /// Type of piece to place.
        kind: PieceKind,
        /// Upper-left cell of the piece footprint.
        origin: CellCoord,
        /// Orientation the piece should adopt.
        rotation: Rotation,
    },
    /// Requests that a placed piece be dragged to a new origin.
    MovePiece {
        /// Identifier of the piece being moved.
        piece: PieceId,
        /// Upper-left cell the footprint should occupy after the move.
        origin: CellCoord,
    },
    /// Requests that a placed piece advance to its next allowed rotation.
    RotatePiece {
        /// Identifier of the piece being rotated.
        piece: PieceId,
    },
    /// Requests that a placed piece be removed and returned to the inventory.
    DeletePiece {
        /// Identifier of the piece being removed.
        piece: PieceId,
    },
    /// Connects a trigger source to the piece it should activate.
    LinkTrigger {
        /// Sensor piece that fires the link.
        source: PieceId,
        /// Piece that receives the trigger.
        target: PieceId,
    },
    /// Captures the current layout and starts the physics simulation.
    StartSimulation,
    /// Rewinds the level to the state captured when the simulation started.
    ResetLevel,
    /// Reverses the most recent placement action.
    Undo,
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a level finished loading.
    LevelLoaded {
        /// Human readable name of the level.
        name: String,
    },
    /// Announces that the world entered a new play mode.
    PlayModeChanged {
        /// Mode that became active after processing commands.
        mode: PlayMode,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a piece now exists on the grid.
    PieceCreated {
        /// Identifier assigned to the piece.
        piece: PieceId,
        /// Type of the piece.
        kind: PieceKind,
        /// Cells occupied by the piece.
        region: CellRect,
        /// Orientation of the piece.
        rotation: Rotation,
        /// Whether the piece is an immovable level fixture.
        fixed: bool,
    },
    /// Confirms that a piece was removed from the grid.
    PieceDestroyed {
        /// Identifier of the removed piece.
        piece: PieceId,
        /// Type of the removed piece.
        kind: PieceKind,
        /// Cells the piece occupied before removal.
        region: CellRect,
    },
    /// Confirms that a piece was dragged to a new origin.
    PieceMoved {
        /// Identifier of the moved piece.
        piece: PieceId,
        /// Region occupied before the move.
        from: CellRect,
        /// Region occupied after the move.
        to: CellRect,
    },
    /// Confirms that a piece adopted a new orientation in place.
    PieceRotated {
        /// Identifier of the rotated piece.
        piece: PieceId,
        /// Orientation after the rotation.
        rotation: Rotation,
        /// Region occupied after the rotation.
        region: CellRect,
    },
    /// Reports the remaining stock of a piece type.
    InventoryChanged {
        /// Type whose stock changed.
        kind: PieceKind,
        /// Number of pieces of that type still available.
        remaining: u32,
    },
    /// Confirms that a trigger source now activates a target piece.
    TriggerLinked {
        /// Sensor piece that fires the link.
        source: PieceId,
        /// Piece that receives the trigger.
        target: PieceId,
    },
    /// Reports that a sensor piece became engaged or released.
    SensorChanged {
        /// Identifier of the sensor piece.
        piece: PieceId,
        /// Whether the sensor is currently engaged.
        engaged: bool,
    },
    /// Reports that a piece received a trigger from a linked sensor.
    PieceTriggered {
        /// Identifier of the triggered piece.
        piece: PieceId,
        /// Sensor that fired the link.
        source: PieceId,
        /// Whether the triggered piece is active after handling the trigger.
        active: bool,
    },
    /// Announces that a ball entered the goal.
    GoalReached {
        /// Goal piece that detected the ball.
        goal: PieceId,
        /// Ball that reached the goal.
        ball: PieceId,
    },
    /// Confirms that the most recent placement action was reversed.
    UndoApplied {
        /// Kind of action that was reversed.
        action: UndoAction,
    },
    /// Confirms that the layout was rewound to its pre-simulation state.
    SnapshotRestored,
}

/// Placement actions that can be reversed by [`Command::Undo`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UndoAction {
    /// A piece was placed from the inventory.
    Place,
    /// A placed piece was dragged to a new origin.
    Move,
    /// A placed piece was rotated in place.
    Rotate,
}

/// Reasons the world may refuse a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum Rejection {
    /// The command is not available in the current play mode.
    #[error("command is not available in {0:?} mode")]
    InvalidMode(PlayMode),
    /// The requested footprint extends beyond the grid.
    #[error("footprint extends beyond the grid")]
    OutOfBounds,
    /// The requested footprint overlaps an occupied cell.
    #[error("footprint overlaps an occupied cell")]
    Occupied,
    /// The inventory holds no more pieces of the requested type.
    #[error("no {0:?} pieces remain in the inventory")]
    OutOfStock(PieceKind),
    /// The requested orientation is not allowed for the piece type.
    #[error("{kind:?} does not support {rotation:?}")]
    RotationNotAllowed {
        /// Type of the piece.
        kind: PieceKind,
        /// Orientation that was requested.
        rotation: Rotation,
    },
    /// No piece with the provided identifier exists.
    #[error("piece {0:?} does not exist")]
    MissingPiece(PieceId),
    /// The piece is a level fixture and cannot be edited.
    #[error("piece {0:?} is a level fixture")]
    FixedPiece(PieceId),
    /// The piece type has a single orientation.
    #[error("piece {0:?} has a single orientation")]
    NotRotatable(PieceId),
    /// The piece cannot fire trigger links.
    #[error("piece {0:?} cannot act as a trigger source")]
    NotATrigger(PieceId),
    /// A trigger source cannot target itself.
    #[error("a piece cannot be linked to itself")]
    SelfLink,
    /// The undo slot is empty.
    #[error("there is nothing to undo")]
    NothingToUndo,
}

/// Unique identifier assigned to a piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(u32);

impl PieceId {
    /// Creates a new piece identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Enumerates every mechanical piece the player or a level can place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    /// Dynamic ball that must reach the goal.
    Ball,
    /// Static triangular slope.
    Ramp,
    /// Static flat slab.
    Platform,
    /// Goal sensor that detects the ball.
    Basket,
    /// Pivoting board tilted by the weight of its riders.
    Seesaw,
    /// Springy slab that boosts falling bodies.
    Trampoline,
    /// Thin dynamic slab that topples easily.
    Domino,
    /// Static blower pushing nearby dynamic pieces.
    Fan,
    /// Sensor that fires its trigger link when pressed.
    PressurePlate,
}

impl PieceKind {
    /// Every piece type in declaration order.
    pub const ALL: [PieceKind; 9] = [
        PieceKind::Ball,
        PieceKind::Ramp,
        PieceKind::Platform,
        PieceKind::Basket,
        PieceKind::Seesaw,
        PieceKind::Trampoline,
        PieceKind::Domino,
        PieceKind::Fan,
        PieceKind::PressurePlate,
    ];

    /// Stable lowercase name used by level files and layout strings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ball => "ball",
            Self::Ramp => "ramp",
            Self::Platform => "platform",
            Self::Basket => "basket",
            Self::Seesaw => "seesaw",
            Self::Trampoline => "trampoline",
            Self::Domino => "domino",
            Self::Fan => "fan",
            Self::PressurePlate => "pressure_plate",
        }
    }

    /// Parses a name produced by [`PieceKind::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// Orientation of a piece in quarter turns, serialised as degrees.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    /// Canonical orientation.
    #[default]
    Deg0,
    /// A quarter turn clockwise.
    Deg90,
    /// A half turn.
    Deg180,
    /// Three quarter turns clockwise.
    Deg270,
}

impl Rotation {
    /// Angle of the rotation in degrees.
    #[must_use]
    pub const fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Converts a whole number of degrees into a rotation.
    #[must_use]
    pub const fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// Angle of the rotation in radians, clockwise on a y-down screen.
    #[must_use]
    pub fn radians(self) -> f32 {
        f32::from(self.degrees()).to_radians()
    }

    /// Reports whether the rotation swaps a footprint's width and height.
    #[must_use]
    pub const fn is_quarter_turn(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Error returned when a degree value does not name a quarter turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("{0} degrees is not a multiple of a quarter turn below 360")]
pub struct InvalidRotation(pub u16);

impl TryFrom<u16> for Rotation {
    type Error = InvalidRotation;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        Self::from_degrees(degrees).ok_or(InvalidRotation(degrees))
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Coordinates are signed so that points left of or above the play area map to
/// cells the grid reports as invalid instead of wrapping around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: i32,
    row: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Returns the cell displaced by the provided column and row offsets.
    #[must_use]
    pub const fn offset(self, columns: i32, rows: i32) -> Self {
        Self::new(self.column + columns, self.row + rows)
    }
}

/// Axis-aligned rectangle of cells anchored at its upper-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    origin: CellCoord,
    size: CellRectSize,
}

impl CellRect {
    /// Creates a rectangle from its upper-left cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: CellRectSize) -> Self {
        Self { origin, size }
    }

    /// Upper-left cell of the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Dimensions of the rectangle.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        self.size
    }

    /// Reports whether the rectangle covers the provided cell.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        let column = cell.column() - self.origin.column();
        let row = cell.row() - self.origin.row();
        column >= 0
            && row >= 0
            && (column as u32) < self.size.width()
            && (row as u32) < self.size.height()
    }

    /// Iterates every covered cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let origin = self.origin;
        let width = self.size.width() as i32;
        let height = self.size.height() as i32;
        (0..height).flat_map(move |row| (0..width).map(move |column| origin.offset(column, row)))
    }
}

/// Size of a [`CellRect`] measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRectSize {
    width: u32,
    height: u32,
}

impl CellRectSize {
    /// Creates a new size descriptor.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns the size with width and height exchanged.
    #[must_use]
    pub const fn transposed(self) -> Self {
        Self::new(self.height, self.width)
    }

    /// Number of cells covered.
    #[must_use]
    pub const fn area(&self) -> u32 {
        self.width * self.height
    }
}
