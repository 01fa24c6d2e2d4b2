//! Directed trigger links from sensor pieces to the pieces they activate.

use std::collections::BTreeMap;

use contraption_core::PieceId;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TriggerLinks {
    targets: BTreeMap<PieceId, PieceId>,
}

impl TriggerLinks {
    /// Points `source` at `target`, replacing any previous target.
    pub(crate) fn link(&mut self, source: PieceId, target: PieceId) {
        let _ = self.targets.insert(source, target);
    }

    pub(crate) fn target_of(&self, source: PieceId) -> Option<PieceId> {
        self.targets.get(&source).copied()
    }

    /// Drops every link that starts or ends at `piece`.
    pub(crate) fn forget(&mut self, piece: PieceId) {
        self.targets
            .retain(|source, target| *source != piece && *target != piece);
    }

    pub(crate) fn clear(&mut self) {
        self.targets.clear();
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (PieceId, PieceId)> + '_ {
        self.targets
            .iter()
            .map(|(source, target)| (*source, *target))
    }
}
