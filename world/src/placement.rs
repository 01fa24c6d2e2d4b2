//! Edit-mode placement transactions.
//!
//! Every mutation releases the piece's current cells, validates the new
//! footprint against the remaining occupancy, and then either commits the new
//! footprint or re-occupies the original one. A rejected request leaves the
//! grid, the inventory and the bodies untouched.

use contraption_core::{
    catalogue::{next_rotation, rotated_footprint},
    CellCoord, Event, PieceId, PieceKind, Rejection, Rotation,
};

use crate::{
    grid::region_center,
    pieces::{body_desc, region_of, Piece},
    undo::UndoRecord,
    World,
};

impl World {
    pub(crate) fn try_place(
        &mut self,
        kind: PieceKind,
        origin: CellCoord,
        rotation: Rotation,
        out_events: &mut Vec<Event>,
    ) -> Result<PieceId, Rejection> {
        self.require_edit()?;
        if !kind.allows_rotation(rotation) {
            return Err(Rejection::RotationNotAllowed { kind, rotation });
        }
        if self.inventory.count(kind) == 0 {
            return Err(Rejection::OutOfStock(kind));
        }
        self.grid
            .check_placement(origin, rotated_footprint(kind, rotation))?;

        let remaining = self.inventory.take(kind)?;
        let id = self.allocate_id();
        self.spawn(id, kind, origin, rotation, false, out_events);
        out_events.push(Event::InventoryChanged { kind, remaining });
        self.undo = Some(UndoRecord::Place { piece: id });

        log::info!("placed {kind:?} {id:?} at {origin:?}");
        Ok(id)
    }

    pub(crate) fn try_move(
        &mut self,
        id: PieceId,
        origin: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), Rejection> {
        self.require_edit()?;
        let previous_origin = self.editable(id)?.origin;
        self.relocate(id, origin, out_events)?;
        self.undo = Some(UndoRecord::Move {
            piece: id,
            previous_origin,
        });
        Ok(())
    }

    pub(crate) fn try_rotate(
        &mut self,
        id: PieceId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), Rejection> {
        self.require_edit()?;
        let piece = self.editable(id)?;
        let (kind, previous_rotation) = (piece.kind, piece.rotation);
        if !kind.is_rotatable() {
            return Err(Rejection::NotRotatable(id));
        }

        self.reorient(id, next_rotation(kind, previous_rotation), out_events)?;
        self.undo = Some(UndoRecord::Rotate {
            piece: id,
            previous_rotation,
        });
        Ok(())
    }

    pub(crate) fn delete(
        &mut self,
        id: PieceId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), Rejection> {
        self.require_edit()?;
        let _ = self.editable(id)?;
        if let Some(piece) = self.destroy(id, out_events) {
            let remaining = self.inventory.restock(piece.kind);
            out_events.push(Event::InventoryChanged {
                kind: piece.kind,
                remaining,
            });
            log::info!("deleted {:?} {id:?}", piece.kind);
        }
        if self.undo.map_or(false, |record| record.piece() == id) {
            self.undo = None;
        }
        Ok(())
    }

    pub(crate) fn link(
        &mut self,
        source: PieceId,
        target: PieceId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), Rejection> {
        self.require_edit()?;
        let kind = self.editable(source)?.kind;
        if !kind.is_trigger_source() {
            return Err(Rejection::NotATrigger(source));
        }
        if source == target {
            return Err(Rejection::SelfLink);
        }
        if !self.pieces.contains_key(&target) {
            return Err(Rejection::MissingPiece(target));
        }

        self.links.link(source, target);
        log::info!("linked {source:?} to {target:?}");
        out_events.push(Event::TriggerLinked { source, target });
        Ok(())
    }

    pub(crate) fn undo(&mut self, out_events: &mut Vec<Event>) -> Result<(), Rejection> {
        self.require_edit()?;
        let record = self.undo.ok_or(Rejection::NothingToUndo)?;
        match record {
            UndoRecord::Place { piece } => {
                if let Some(piece) = self.destroy(piece, out_events) {
                    let remaining = self.inventory.restock(piece.kind);
                    out_events.push(Event::InventoryChanged {
                        kind: piece.kind,
                        remaining,
                    });
                }
            }
            UndoRecord::Move {
                piece,
                previous_origin,
            } => self.relocate(piece, previous_origin, out_events)?,
            UndoRecord::Rotate {
                piece,
                previous_rotation,
            } => self.reorient(piece, previous_rotation, out_events)?,
        }
        self.undo = None;

        log::info!("undid {:?} of {:?}", record.action(), record.piece());
        out_events.push(Event::UndoApplied {
            action: record.action(),
        });
        Ok(())
    }

    /// Looks up a piece the player is allowed to edit.
    fn editable(&self, id: PieceId) -> Result<&Piece, Rejection> {
        let piece = self.pieces.get(&id).ok_or(Rejection::MissingPiece(id))?;
        if piece.fixed {
            return Err(Rejection::FixedPiece(id));
        }
        Ok(piece)
    }

    /// Moves a piece to `origin` keeping its rotation.
    fn relocate(
        &mut self,
        id: PieceId,
        origin: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), Rejection> {
        let piece = self.pieces.get_mut(&id).ok_or(Rejection::MissingPiece(id))?;
        let from = piece.region();
        let occupant = piece.occupant();

        self.grid.free(from.origin(), from.size());
        if let Err(rejection) = self.grid.check_placement(origin, from.size()) {
            self.grid.occupy(from.origin(), from.size(), occupant);
            return Err(rejection);
        }
        self.grid.occupy(origin, from.size(), occupant);
        piece.origin = origin;

        let to = piece.region();
        self.physics
            .teleport(piece.body, region_center(to), piece.rest_angle());

        log::debug!("moved {id:?} from {:?} to {origin:?}", from.origin());
        out_events.push(Event::PieceMoved { piece: id, from, to });
        Ok(())
    }

    /// Turns a piece in place to `rotation`, rebuilding its body.
    fn reorient(
        &mut self,
        id: PieceId,
        rotation: Rotation,
        out_events: &mut Vec<Event>,
    ) -> Result<(), Rejection> {
        let piece = self.pieces.get_mut(&id).ok_or(Rejection::MissingPiece(id))?;
        let from = piece.region();
        let occupant = piece.occupant();
        let to = region_of(piece.kind, piece.origin, rotation);

        self.grid.free(from.origin(), from.size());
        if let Err(rejection) = self.grid.check_placement(to.origin(), to.size()) {
            self.grid.occupy(from.origin(), from.size(), occupant);
            return Err(rejection);
        }
        self.grid.occupy(to.origin(), to.size(), occupant);
        piece.rotation = rotation;
        piece.behavior.reorient();

        self.physics.remove(piece.body);
        piece.body = self
            .physics
            .insert(&body_desc(id, piece.kind, piece.origin, rotation));

        log::debug!("rotated {id:?} to {rotation:?}");
        out_events.push(Event::PieceRotated {
            piece: id,
            rotation,
            region: to,
        });
        Ok(())
    }
}
