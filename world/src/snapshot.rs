//! Pre-simulation capture of the player's layout.

use contraption_core::{CellCoord, PieceId, PieceKind, Rotation};

use crate::{inventory::Inventory, links::TriggerLinks, pieces::Piece};

/// Everything needed to recreate one player-placed piece.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PieceRecord {
    pub(crate) id: PieceId,
    pub(crate) kind: PieceKind,
    pub(crate) origin: CellCoord,
    pub(crate) rotation: Rotation,
    pub(crate) link: Option<PieceId>,
}

/// Layout and inventory captured when the simulation starts.
///
/// Fixtures are not recorded; they are rebuilt from the level descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub(crate) pieces: Vec<PieceRecord>,
    pub(crate) inventory: Inventory,
}

impl Snapshot {
    pub(crate) fn capture<'a>(
        pieces: impl IntoIterator<Item = &'a Piece>,
        links: &TriggerLinks,
        inventory: &Inventory,
    ) -> Self {
        let pieces = pieces
            .into_iter()
            .filter(|piece| !piece.fixed)
            .map(|piece| PieceRecord {
                id: piece.id,
                kind: piece.kind,
                origin: piece.origin,
                rotation: piece.rotation,
                link: links.target_of(piece.id),
            })
            .collect();
        Self {
            pieces,
            inventory: inventory.clone(),
        }
    }
}
