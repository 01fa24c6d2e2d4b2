#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure edit-mode system translating drag and drop gestures into placement commands.
//!
//! The builder never reads the world directly. Adapters hand it the events
//! emitted since the previous frame, the frame's input, and two closures that
//! mirror the world's `query::piece_at` and `query::can_place`/`query::can_move`
//! helpers. The builder answers with commands for the world to apply.

use contraption_core::{
    catalogue::{next_rotation, rotated_footprint},
    CellCoord, CellRect, CellRectSize, Command, Event, PieceId, PieceKind, PlayMode, Rotation,
    DEFAULT_COLUMNS, DEFAULT_ROWS,
};

/// Ghost placement describing where a drop would land.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementPreview {
    /// Kind of piece being dragged.
    pub kind: PieceKind,
    /// Upper-left cell of the footprint the drop would occupy.
    pub origin: CellCoord,
    /// Rotation the piece would be placed with.
    pub rotation: Rotation,
    /// Cells the piece would occupy.
    pub region: CellRect,
    /// Placed piece being repositioned, if the drag started on the board.
    pub moving: Option<PieceId>,
    /// Indicates whether the drop would be accepted.
    pub placeable: bool,
}

impl PlacementPreview {
    /// Creates a new placement preview descriptor.
    #[must_use]
    pub fn new(
        kind: PieceKind,
        origin: CellCoord,
        rotation: Rotation,
        moving: Option<PieceId>,
        placeable: bool,
    ) -> Self {
        Self {
            kind,
            origin,
            rotation,
            region: CellRect::from_origin_and_size(origin, rotated_footprint(kind, rotation)),
            moving,
            placeable,
        }
    }
}

/// Piece found under the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HoveredPiece {
    /// Identifier of the piece.
    pub piece: PieceId,
    /// Type of the piece.
    pub kind: PieceKind,
    /// Upper-left cell of the piece footprint.
    pub origin: CellCoord,
    /// Current rotation of the piece.
    pub rotation: Rotation,
    /// Whether the level authored the piece.
    pub fixed: bool,
}

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderInput {
    /// Cell currently hovered by the cursor.
    pub cursor_cell: Option<CellCoord>,
    /// Inventory entry the player started dragging on this frame.
    pub grab_from_inventory: Option<PieceKind>,
    /// Indicates whether the player pressed on the board on this frame.
    pub grab_action: bool,
    /// Indicates whether the player released the dragged piece on this frame.
    pub drop_action: bool,
    /// Indicates whether the player asked to rotate on this frame.
    pub rotate_action: bool,
    /// Indicates whether the player asked to delete on this frame.
    pub delete_action: bool,
    /// Indicates whether the player asked to undo on this frame.
    pub undo_action: bool,
    /// Indicates whether the player abandoned the current drag on this frame.
    pub cancel_action: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drag {
    Inventory {
        kind: PieceKind,
        rotation: Rotation,
    },
    Placed {
        piece: PieceId,
        kind: PieceKind,
        origin: CellCoord,
        rotation: Rotation,
    },
}

/// Edit-mode system that turns gestures into placement commands.
#[derive(Clone, Debug)]
pub struct Builder {
    play_mode: PlayMode,
    columns: u32,
    rows: u32,
    drag: Option<Drag>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMNS, DEFAULT_ROWS)
    }
}

impl Builder {
    /// Creates a builder for a grid of the provided dimensions.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self {
            play_mode: PlayMode::Edit,
            columns,
            rows,
            drag: None,
        }
    }

    /// Reports whether a piece is currently being dragged.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Computes the ghost for the current drag with the cursor over `cursor`.
    ///
    /// The footprint is centred on the cursor and clamped inside the grid.
    /// `validate` decides whether the world would accept the drop.
    pub fn preview<G>(&self, cursor: CellCoord, mut validate: G) -> Option<PlacementPreview>
    where
        G: FnMut(&PlacementPreview) -> bool,
    {
        let (kind, rotation, moving) = match self.drag? {
            Drag::Inventory { kind, rotation } => (kind, rotation, None),
            Drag::Placed {
                piece,
                kind,
                rotation,
                ..
            } => (kind, rotation, Some(piece)),
        };
        let origin = self.ghost_origin(cursor, rotated_footprint(kind, rotation));
        let mut preview = PlacementPreview::new(kind, origin, rotation, moving, false);
        preview.placeable = validate(&preview);
        Some(preview)
    }

    /// Consumes world events and adapter-derived input to emit builder commands.
    ///
    /// `piece_at` should mirror the world's `query::piece_at` lookup and
    /// `validate` the world's placement checks for the previewed drop.
    pub fn handle<F, G>(
        &mut self,
        events: &[Event],
        input: BuilderInput,
        mut piece_at: F,
        validate: G,
        out: &mut Vec<Command>,
    ) where
        F: FnMut(CellCoord) -> Option<HoveredPiece>,
        G: FnMut(&PlacementPreview) -> bool,
    {
        self.observe(events);
        if self.play_mode != PlayMode::Edit {
            return;
        }

        if input.cancel_action {
            self.drag = None;
        }

        let hovered = input
            .cursor_cell
            .and_then(&mut piece_at)
            .filter(|hovered| !hovered.fixed);

        if self.drag.is_none() {
            if let Some(kind) = input.grab_from_inventory {
                self.drag = Some(Drag::Inventory {
                    kind,
                    rotation: Rotation::Deg0,
                });
            } else if input.grab_action {
                self.drag = hovered.map(|hovered| Drag::Placed {
                    piece: hovered.piece,
                    kind: hovered.kind,
                    origin: hovered.origin,
                    rotation: hovered.rotation,
                });
            }
        }

        if input.rotate_action {
            match &mut self.drag {
                Some(Drag::Inventory { kind, rotation }) => {
                    *rotation = next_rotation(*kind, *rotation);
                }
                // A carried piece keeps its rotation until it is dropped.
                Some(Drag::Placed { .. }) => {}
                None => {
                    if let Some(hovered) = hovered.filter(|hovered| hovered.kind.is_rotatable()) {
                        out.push(Command::RotatePiece {
                            piece: hovered.piece,
                        });
                    }
                }
            }
        }

        if input.delete_action {
            match self.drag {
                Some(Drag::Placed { piece, .. }) => {
                    self.drag = None;
                    out.push(Command::DeletePiece { piece });
                }
                Some(Drag::Inventory { .. }) => self.drag = None,
                None => {
                    if let Some(hovered) = hovered {
                        out.push(Command::DeletePiece {
                            piece: hovered.piece,
                        });
                    }
                }
            }
        }

        if input.undo_action && self.drag.is_none() {
            out.push(Command::Undo);
        }

        if input.drop_action {
            self.release(input.cursor_cell, validate, out);
        }
    }

    fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::PlayModeChanged { mode } => {
                    self.play_mode = *mode;
                    if *mode != PlayMode::Edit {
                        self.drag = None;
                    }
                }
                Event::LevelLoaded { .. } => self.drag = None,
                Event::PieceDestroyed { piece, .. } => {
                    if matches!(self.drag, Some(Drag::Placed { piece: dragged, .. }) if dragged == *piece)
                    {
                        self.drag = None;
                    }
                }
                _ => {}
            }
        }
    }

    fn release<G>(&mut self, cursor: Option<CellCoord>, validate: G, out: &mut Vec<Command>)
    where
        G: FnMut(&PlacementPreview) -> bool,
    {
        let Some(cursor) = cursor else {
            self.drag = None;
            return;
        };
        let preview = self.preview(cursor, validate);
        let Some(drag) = self.drag.take() else {
            return;
        };
        let Some(preview) = preview.filter(|preview| preview.placeable) else {
            return;
        };

        match drag {
            Drag::Inventory { kind, rotation } => out.push(Command::PlacePiece {
                kind,
                origin: preview.origin,
                rotation,
            }),
            Drag::Placed { piece, origin, .. } => {
                if preview.origin != origin {
                    out.push(Command::MovePiece {
                        piece,
                        origin: preview.origin,
                    });
                }
            }
        }
    }

    fn ghost_origin(&self, cursor: CellCoord, footprint: CellRectSize) -> CellCoord {
        let clamp = |value: i32, extent: u32, limit: u32| {
            let upper = limit.saturating_sub(extent) as i32;
            (value - (extent / 2) as i32).min(upper).max(0)
        };
        CellCoord::new(
            clamp(cursor.column(), footprint.width(), self.columns),
            clamp(cursor.row(), footprint.height(), self.rows),
        )
    }
}
