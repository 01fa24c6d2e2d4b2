//! Single-slot record of the most recent placement action.

use contraption_core::{CellCoord, PieceId, Rotation, UndoAction};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UndoRecord {
    Place {
        piece: PieceId,
    },
    Move {
        piece: PieceId,
        previous_origin: CellCoord,
    },
    Rotate {
        piece: PieceId,
        previous_rotation: Rotation,
    },
}

impl UndoRecord {
    pub(crate) fn piece(&self) -> PieceId {
        match *self {
            Self::Place { piece } | Self::Move { piece, .. } | Self::Rotate { piece, .. } => piece,
        }
    }

    pub(crate) fn action(&self) -> UndoAction {
        match self {
            Self::Place { .. } => UndoAction::Place,
            Self::Move { .. } => UndoAction::Move,
            Self::Rotate { .. } => UndoAction::Rotate,
        }
    }
}
