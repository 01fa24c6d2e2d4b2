#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Contraption.
//!
//! The world owns the cell grid, every placed piece together with the physics
//! body it drives, the inventory, trigger links, the pre-simulation snapshot
//! and the undo slot. All mutation flows through [`apply`]; adapters and
//! systems observe state through [`query`].

mod behavior;
pub mod grid;
mod inventory;
mod links;
mod physics;
mod pieces;
mod placement;
mod simulation;
mod snapshot;
mod undo;

use std::{collections::BTreeMap, time::Duration};

use contraption_core::{
    catalogue::rotated_footprint, CellCoord, Command, Event, LevelDescriptor, PieceId, PieceKind,
    PlayMode, Rejection, Rotation, DEFAULT_COLUMNS, DEFAULT_ROWS,
};

use crate::{
    behavior::Behavior,
    grid::Grid,
    inventory::Inventory,
    links::TriggerLinks,
    physics::PhysicsWorld,
    pieces::{body_desc, Piece},
    snapshot::Snapshot,
    undo::UndoRecord,
};

/// Downward acceleration applied to dynamic pieces, in world units per second
/// squared.
pub const DEFAULT_GRAVITY: f32 = 1_000.0;

/// Construction parameters for a [`World`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldConfig {
    /// Number of cell columns.
    pub columns: u32,
    /// Number of cell rows.
    pub rows: u32,
    /// Downward acceleration in world units per second squared.
    pub gravity: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
            gravity: DEFAULT_GRAVITY,
        }
    }
}

/// Represents the authoritative Contraption world state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    grid: Grid,
    physics: PhysicsWorld,
    pieces: BTreeMap<PieceId, Piece>,
    inventory: Inventory,
    links: TriggerLinks,
    level: Option<LevelDescriptor>,
    snapshot: Option<Snapshot>,
    undo: Option<UndoRecord>,
    play_mode: PlayMode,
    next_piece_id: u32,
    goal_reached: bool,
    elapsed: Duration,
}

impl World {
    /// Creates an empty world on the standard 20 by 15 grid.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Creates an empty world using the provided configuration.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            config,
            grid: Grid::new(config.columns, config.rows),
            physics: PhysicsWorld::new(config.gravity),
            pieces: BTreeMap::new(),
            inventory: Inventory::default(),
            links: TriggerLinks::default(),
            level: None,
            snapshot: None,
            undo: None,
            play_mode: PlayMode::Edit,
            next_piece_id: 0,
            goal_reached: false,
            elapsed: Duration::ZERO,
        }
    }

    fn set_play_mode(&mut self, mode: PlayMode, out_events: &mut Vec<Event>) {
        if self.play_mode != mode {
            self.play_mode = mode;
            log::info!("play mode changed to {mode:?}");
            out_events.push(Event::PlayModeChanged { mode });
        }
    }

    fn require_edit(&self) -> Result<(), Rejection> {
        match self.play_mode {
            PlayMode::Edit => Ok(()),
            mode => Err(Rejection::InvalidMode(mode)),
        }
    }

    fn allocate_id(&mut self) -> PieceId {
        let id = PieceId::new(self.next_piece_id);
        self.next_piece_id = self.next_piece_id.saturating_add(1);
        id
    }

    /// Creates a piece whose footprint the caller has already validated.
    fn spawn(
        &mut self,
        id: PieceId,
        kind: PieceKind,
        origin: CellCoord,
        rotation: Rotation,
        fixed: bool,
        out_events: &mut Vec<Event>,
    ) {
        let body = self.physics.insert(&body_desc(id, kind, origin, rotation));
        let piece = Piece {
            id,
            kind,
            origin,
            rotation,
            fixed,
            body,
            behavior: Behavior::for_kind(kind),
        };
        let region = piece.region();
        self.grid
            .occupy(origin, rotated_footprint(kind, rotation), piece.occupant());
        let _ = self.pieces.insert(id, piece);

        log::debug!("created {kind:?} {id:?} at {origin:?} ({rotation:?})");
        out_events.push(Event::PieceCreated {
            piece: id,
            kind,
            region,
            rotation,
            fixed,
        });
    }

    /// Removes a piece, releasing its cells, its body and its links.
    fn destroy(&mut self, id: PieceId, out_events: &mut Vec<Event>) -> Option<Piece> {
        let piece = self.pieces.remove(&id)?;
        let region = piece.region();
        self.grid.free(region.origin(), region.size());
        self.physics.remove(piece.body);
        self.links.forget(id);

        log::debug!("destroyed {:?} {id:?}", piece.kind);
        out_events.push(Event::PieceDestroyed {
            piece: id,
            kind: piece.kind,
            region,
        });
        Some(piece)
    }

    fn destroy_where(&mut self, predicate: impl Fn(&Piece) -> bool, out_events: &mut Vec<Event>) {
        let doomed: Vec<PieceId> = self
            .pieces
            .values()
            .filter(|piece| predicate(piece))
            .map(|piece| piece.id)
            .collect();
        for id in doomed {
            let _ = self.destroy(id, out_events);
        }
    }

    fn announce_inventory(&self, out_events: &mut Vec<Event>) {
        for (kind, remaining) in self.inventory.counts() {
            out_events.push(Event::InventoryChanged {
                kind: *kind,
                remaining: *remaining,
            });
        }
    }

    /// Reports whether every piece owns exactly the cells of its footprint and
    /// exactly one body.
    fn is_consistent(&self) -> bool {
        let owned: usize = self
            .pieces
            .values()
            .map(|piece| piece.region().size().area() as usize)
            .sum();
        owned == self.grid.occupied_count()
            && self.physics.body_count() == self.pieces.len()
            && self.pieces.values().all(|piece| {
                self.grid.cells_for(piece.id) == piece.region().cells().collect::<Vec<_>>()
            })
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Every command either succeeds and appends the events describing its effect
/// to `out_events`, or fails with a [`Rejection`] and leaves the world exactly
/// as it was.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), Rejection> {
    let outcome = match command {
        Command::LoadLevel { level } => {
            world.load_level(level, out_events);
            Ok(())
        }
        Command::PlacePiece {
            kind,
            origin,
            rotation,
        } => world
            .try_place(kind, origin, rotation, out_events)
            .map(|_| ()),
        Command::MovePiece { piece, origin } => world.try_move(piece, origin, out_events),
        Command::RotatePiece { piece } => world.try_rotate(piece, out_events),
        Command::DeletePiece { piece } => world.delete(piece, out_events),
        Command::LinkTrigger { source, target } => world.link(source, target, out_events),
        Command::StartSimulation => world.start_simulation(out_events),
        Command::ResetLevel => {
            world.reset_level(out_events);
            Ok(())
        }
        Command::Undo => world.undo(out_events),
        Command::Tick { dt } => {
            world.tick(dt, out_events);
            Ok(())
        }
    };

    if let Err(rejection) = &outcome {
        log::debug!("command rejected: {rejection}");
    }
    debug_assert!(
        world.is_consistent(),
        "grid occupancy diverged from piece footprints"
    );
    outcome
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::{collections::BTreeMap, time::Duration};

    use contraption_core::{
        catalogue::rotated_footprint, CellCoord, CellRect, PieceId, PieceKind, PlayMode,
        Rotation,
    };
    use glam::Vec2;

    use super::{behavior::Behavior, grid::Grid, World};

    /// Immutable description of a piece.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PieceSnapshot {
        /// Identifier of the piece.
        pub id: PieceId,
        /// Type of the piece.
        pub kind: PieceKind,
        /// Cells covered by the piece.
        pub region: CellRect,
        /// Orientation of the piece.
        pub rotation: Rotation,
        /// Whether the piece is a level fixture.
        pub fixed: bool,
    }

    /// Collection of piece snapshots ordered by identifier.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct PieceView {
        pieces: Vec<PieceSnapshot>,
    }

    impl PieceView {
        /// Iterates over the captured pieces.
        pub fn iter(&self) -> impl Iterator<Item = &PieceSnapshot> {
            self.pieces.iter()
        }

        /// Consumes the view and returns the owned snapshots.
        #[must_use]
        pub fn into_vec(self) -> Vec<PieceSnapshot> {
            self.pieces
        }
    }

    /// Continuous state of a piece body.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct Pose {
        /// Body centre in world units.
        pub position: Vec2,
        /// Body angle in radians, clockwise on screen.
        pub angle: f32,
        /// Linear velocity in world units per second.
        pub velocity: Vec2,
    }

    /// Provides read-only access to the cell grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Reports the active play mode.
    #[must_use]
    pub fn play_mode(world: &World) -> PlayMode {
        world.play_mode
    }

    /// Name of the loaded level, if any.
    #[must_use]
    pub fn level_name(world: &World) -> Option<&str> {
        world.level.as_ref().map(|level| level.name.as_str())
    }

    /// Captures every piece currently on the grid.
    #[must_use]
    pub fn piece_view(world: &World) -> PieceView {
        PieceView {
            pieces: world.pieces.values().map(snapshot_of).collect(),
        }
    }

    /// Captures a single piece.
    #[must_use]
    pub fn piece(world: &World, id: PieceId) -> Option<PieceSnapshot> {
        world.pieces.get(&id).map(snapshot_of)
    }

    /// Piece owning the provided cell.
    #[must_use]
    pub fn piece_at(world: &World, cell: CellCoord) -> Option<PieceId> {
        world.grid.occupant(cell).map(|occupant| occupant.piece)
    }

    /// Continuous pose of a piece body.
    #[must_use]
    pub fn pose(world: &World, id: PieceId) -> Option<Pose> {
        let piece = world.pieces.get(&id)?;
        Some(Pose {
            position: world.physics.position(piece.body)?,
            angle: world.physics.angle(piece.body)?,
            velocity: world.physics.velocity(piece.body)?,
        })
    }

    /// Remaining stock for every piece type the level provides.
    #[must_use]
    pub fn inventory(world: &World) -> &BTreeMap<PieceKind, u32> {
        world.inventory.counts()
    }

    /// Remaining stock of a single piece type.
    #[must_use]
    pub fn remaining(world: &World, kind: PieceKind) -> u32 {
        world.inventory.count(kind)
    }

    /// Reports whether a new piece could be placed at `origin` right now.
    #[must_use]
    pub fn can_place(world: &World, kind: PieceKind, origin: CellCoord, rotation: Rotation) -> bool {
        kind.allows_rotation(rotation)
            && world.grid.can_place(origin, rotated_footprint(kind, rotation))
    }

    /// Reports whether a placed piece could be moved to `origin`, treating its
    /// own cells as free.
    #[must_use]
    pub fn can_move(world: &World, id: PieceId, origin: CellCoord) -> bool {
        let Some(piece) = world.pieces.get(&id) else {
            return false;
        };
        CellRect::from_origin_and_size(origin, piece.region().size())
            .cells()
            .all(|cell| {
                world.grid.is_valid_cell(cell)
                    && world
                        .grid
                        .occupant(cell)
                        .map_or(true, |occupant| occupant.piece == id)
            })
    }

    /// Piece activated by the provided trigger source.
    #[must_use]
    pub fn trigger_target(world: &World, source: PieceId) -> Option<PieceId> {
        world.links.target_of(source)
    }

    /// Every trigger link as `(source, target)` ordered by source.
    #[must_use]
    pub fn trigger_links(world: &World) -> Vec<(PieceId, PieceId)> {
        world.links.iter().collect()
    }

    /// Whether a fan is blowing; `None` for other pieces.
    #[must_use]
    pub fn fan_active(world: &World, id: PieceId) -> Option<bool> {
        match world.pieces.get(&id)?.behavior {
            Behavior::Fan { active } => Some(active),
            _ => None,
        }
    }

    /// Current tilt of a seesaw board in radians; `None` for other pieces.
    #[must_use]
    pub fn seesaw_angle(world: &World, id: PieceId) -> Option<f32> {
        match &world.pieces.get(&id)?.behavior {
            Behavior::Seesaw(state) => Some(state.angle),
            _ => None,
        }
    }

    /// Whether a pressure plate is held down; `None` for other pieces.
    #[must_use]
    pub fn plate_pressed(world: &World, id: PieceId) -> Option<bool> {
        match &world.pieces.get(&id)?.behavior {
            Behavior::Plate { contacts } => Some(!contacts.is_empty()),
            _ => None,
        }
    }

    /// Reports whether a ball reached a goal since the last reset.
    #[must_use]
    pub fn goal_reached(world: &World) -> bool {
        world.goal_reached
    }

    /// Reports whether [`contraption_core::Command::Undo`] has anything to reverse.
    #[must_use]
    pub fn can_undo(world: &World) -> bool {
        world.undo.is_some()
    }

    /// Reports whether a pre-simulation snapshot is waiting to be restored.
    #[must_use]
    pub fn has_snapshot(world: &World) -> bool {
        world.snapshot.is_some()
    }

    /// Simulated time since the simulation started.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Reports whether every piece owns exactly its footprint cells and body.
    #[must_use]
    pub fn occupancy_is_consistent(world: &World) -> bool {
        world.is_consistent()
    }

    fn snapshot_of(piece: &super::pieces::Piece) -> PieceSnapshot {
        PieceSnapshot {
            id: piece.id,
            kind: piece.kind,
            region: piece.region(),
            rotation: piece.rotation,
            fixed: piece.fixed,
        }
    }
}
