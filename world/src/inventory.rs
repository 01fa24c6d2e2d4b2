//! Remaining stock per piece type.

use std::collections::BTreeMap;

use contraption_core::{LevelDescriptor, PieceKind, Rejection};

/// Counts of pieces the player may still place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Inventory {
    counts: BTreeMap<PieceKind, u32>,
}

impl Inventory {
    /// Starting stock declared by a level.
    pub(crate) fn from_level(level: &LevelDescriptor) -> Self {
        let mut counts = BTreeMap::new();
        for entry in &level.inventory {
            let count = counts.entry(entry.kind).or_insert(0_u32);
            *count = count.saturating_add(entry.count);
        }
        Self { counts }
    }

    pub(crate) fn count(&self, kind: PieceKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Removes one piece of `kind` and returns the remaining stock.
    pub(crate) fn take(&mut self, kind: PieceKind) -> Result<u32, Rejection> {
        match self.counts.get_mut(&kind) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(*count)
            }
            _ => Err(Rejection::OutOfStock(kind)),
        }
    }

    /// Returns one piece of `kind` and reports the new stock.
    pub(crate) fn restock(&mut self, kind: PieceKind) -> u32 {
        let count = self.counts.entry(kind).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub(crate) fn counts(&self) -> &BTreeMap<PieceKind, u32> {
        &self.counts
    }
}
