use contraption_core::{
    CellCoord, CellRect, CellRectSize, Command, Event, PieceId, PieceKind, PlayMode, Rotation,
};
use contraption_system_builder::{Builder, BuilderInput, HoveredPiece, PlacementPreview};

fn placed_ramp(id: u32, origin: CellCoord) -> HoveredPiece {
    HoveredPiece {
        piece: PieceId::new(id),
        kind: PieceKind::Ramp,
        origin,
        rotation: Rotation::Deg0,
        fixed: false,
    }
}

fn grab(kind: PieceKind, cursor: CellCoord) -> BuilderInput {
    BuilderInput {
        grab_from_inventory: Some(kind),
        cursor_cell: Some(cursor),
        ..BuilderInput::default()
    }
}

fn drop_at(cursor: CellCoord) -> BuilderInput {
    BuilderInput {
        drop_action: true,
        cursor_cell: Some(cursor),
        ..BuilderInput::default()
    }
}

#[test]
fn dragging_from_inventory_places_the_piece() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();

    builder.handle(
        &[],
        grab(PieceKind::Ramp, CellCoord::new(5, 5)),
        |_| None,
        |_| true,
        &mut commands,
    );
    assert!(builder.is_dragging());
    assert!(commands.is_empty(), "grabbing alone must not emit commands");

    builder.handle(
        &[],
        drop_at(CellCoord::new(5, 5)),
        |_| None,
        |_| true,
        &mut commands,
    );

    assert_eq!(
        commands,
        vec![Command::PlacePiece {
            kind: PieceKind::Ramp,
            origin: CellCoord::new(4, 5),
            rotation: Rotation::Deg0,
        }],
        "drop should centre the footprint on the cursor",
    );
    assert!(!builder.is_dragging());
}

#[test]
fn preview_is_clamped_inside_the_grid() {
    let mut builder = Builder::new(20, 15);
    let mut commands = Vec::new();
    builder.handle(
        &[],
        grab(PieceKind::Fan, CellCoord::new(0, 0)),
        |_| None,
        |_| true,
        &mut commands,
    );

    let corner = builder
        .preview(CellCoord::new(0, 0), |_| true)
        .expect("dragging yields a preview");
    assert_eq!(corner.origin, CellCoord::new(0, 0));

    let far = builder
        .preview(CellCoord::new(25, 30), |_| true)
        .expect("dragging yields a preview");
    assert_eq!(far.origin, CellCoord::new(18, 13));
    assert_eq!(
        far.region,
        CellRect::from_origin_and_size(CellCoord::new(18, 13), CellRectSize::new(2, 2)),
    );
}

#[test]
fn rotating_a_ghost_changes_its_footprint() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();
    builder.handle(
        &[],
        grab(PieceKind::Ramp, CellCoord::new(5, 5)),
        |_| None,
        |_| true,
        &mut commands,
    );
    builder.handle(
        &[],
        BuilderInput {
            rotate_action: true,
            cursor_cell: Some(CellCoord::new(5, 5)),
            ..BuilderInput::default()
        },
        |_| None,
        |_| true,
        &mut commands,
    );

    let preview = builder
        .preview(CellCoord::new(5, 5), |_| true)
        .expect("dragging yields a preview");
    assert_eq!(
        preview,
        PlacementPreview::new(
            PieceKind::Ramp,
            CellCoord::new(5, 4),
            Rotation::Deg90,
            None,
            true,
        ),
    );
    assert!(commands.is_empty(), "rotating a ghost is local to the builder");
}

#[test]
fn invalid_drop_returns_the_piece() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();
    let mut checked = None;

    builder.handle(
        &[],
        grab(PieceKind::Platform, CellCoord::new(3, 3)),
        |_| None,
        |_| false,
        &mut commands,
    );
    builder.handle(
        &[],
        drop_at(CellCoord::new(3, 3)),
        |_| None,
        |preview| {
            checked = Some(preview.origin);
            false
        },
        &mut commands,
    );

    assert_eq!(checked, Some(CellCoord::new(2, 3)));
    assert!(commands.is_empty(), "blocked drop must not emit commands");
    assert!(!builder.is_dragging(), "the drag ends even when the drop fails");
}

#[test]
fn dragging_a_placed_piece_moves_it() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();
    let ramp = placed_ramp(4, CellCoord::new(2, 3));

    builder.handle(
        &[],
        BuilderInput {
            grab_action: true,
            cursor_cell: Some(CellCoord::new(3, 3)),
            ..BuilderInput::default()
        },
        |_| Some(ramp),
        |_| true,
        &mut commands,
    );
    let mut moving = None;
    builder.handle(
        &[],
        drop_at(CellCoord::new(9, 7)),
        |_| None,
        |preview| {
            moving = preview.moving;
            true
        },
        &mut commands,
    );

    assert_eq!(moving, Some(ramp.piece), "preview should name the carried piece");
    assert_eq!(
        commands,
        vec![Command::MovePiece {
            piece: ramp.piece,
            origin: CellCoord::new(8, 7),
        }],
    );
}

#[test]
fn dropping_a_piece_where_it_was_is_a_no_op() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();
    let ramp = placed_ramp(4, CellCoord::new(2, 3));

    builder.handle(
        &[],
        BuilderInput {
            grab_action: true,
            cursor_cell: Some(CellCoord::new(3, 3)),
            ..BuilderInput::default()
        },
        |_| Some(ramp),
        |_| true,
        &mut commands,
    );
    builder.handle(
        &[],
        drop_at(CellCoord::new(3, 3)),
        |_| Some(ramp),
        |_| true,
        &mut commands,
    );

    assert!(commands.is_empty(), "an unchanged origin is not a move");
}

#[test]
fn fixtures_cannot_be_grabbed_rotated_or_deleted() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();
    let fixture = HoveredPiece {
        fixed: true,
        ..placed_ramp(0, CellCoord::new(2, 3))
    };

    builder.handle(
        &[],
        BuilderInput {
            grab_action: true,
            rotate_action: true,
            delete_action: true,
            cursor_cell: Some(CellCoord::new(2, 3)),
            ..BuilderInput::default()
        },
        |_| Some(fixture),
        |_| true,
        &mut commands,
    );

    assert!(commands.is_empty(), "fixtures are immutable");
    assert!(!builder.is_dragging());
}

#[test]
fn hovered_pieces_can_be_rotated_and_deleted() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();
    let ramp = placed_ramp(6, CellCoord::new(2, 3));

    builder.handle(
        &[],
        BuilderInput {
            rotate_action: true,
            cursor_cell: Some(CellCoord::new(2, 3)),
            ..BuilderInput::default()
        },
        |_| Some(ramp),
        |_| true,
        &mut commands,
    );
    builder.handle(
        &[],
        BuilderInput {
            delete_action: true,
            cursor_cell: Some(CellCoord::new(2, 3)),
            ..BuilderInput::default()
        },
        |_| Some(ramp),
        |_| true,
        &mut commands,
    );

    assert_eq!(
        commands,
        vec![
            Command::RotatePiece { piece: ramp.piece },
            Command::DeletePiece { piece: ramp.piece },
        ],
    );
}

#[test]
fn balls_are_not_rotated() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();
    let ball = HoveredPiece {
        kind: PieceKind::Ball,
        ..placed_ramp(2, CellCoord::new(1, 1))
    };

    builder.handle(
        &[],
        BuilderInput {
            rotate_action: true,
            cursor_cell: Some(CellCoord::new(1, 1)),
            ..BuilderInput::default()
        },
        |_| Some(ball),
        |_| true,
        &mut commands,
    );

    assert!(commands.is_empty());
}

#[test]
fn undo_waits_for_the_drag_to_finish() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();
    builder.handle(
        &[],
        grab(PieceKind::Ramp, CellCoord::new(5, 5)),
        |_| None,
        |_| true,
        &mut commands,
    );
    builder.handle(
        &[],
        BuilderInput {
            undo_action: true,
            ..BuilderInput::default()
        },
        |_| None,
        |_| true,
        &mut commands,
    );
    assert!(commands.is_empty(), "undo is ignored mid-drag");

    builder.handle(
        &[],
        BuilderInput {
            cancel_action: true,
            undo_action: true,
            ..BuilderInput::default()
        },
        |_| None,
        |_| true,
        &mut commands,
    );
    assert_eq!(commands, vec![Command::Undo]);
}

#[test]
fn simulation_cancels_the_drag_and_mutes_input() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();
    builder.handle(
        &[],
        grab(PieceKind::Ramp, CellCoord::new(5, 5)),
        |_| None,
        |_| true,
        &mut commands,
    );

    builder.handle(
        &[Event::PlayModeChanged {
            mode: PlayMode::Simulate,
        }],
        drop_at(CellCoord::new(5, 5)),
        |_| None,
        |_| true,
        &mut commands,
    );
    assert!(commands.is_empty(), "no commands outside edit mode");
    assert!(!builder.is_dragging());

    builder.handle(
        &[Event::PlayModeChanged {
            mode: PlayMode::Edit,
        }],
        grab(PieceKind::Ramp, CellCoord::new(5, 5)),
        |_| None,
        |_| true,
        &mut commands,
    );
    assert!(builder.is_dragging(), "edit mode accepts gestures again");
}

#[test]
fn destroyed_pieces_are_dropped_from_the_hand() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();
    let ramp = placed_ramp(4, CellCoord::new(2, 3));
    builder.handle(
        &[],
        BuilderInput {
            grab_action: true,
            cursor_cell: Some(CellCoord::new(2, 3)),
            ..BuilderInput::default()
        },
        |_| Some(ramp),
        |_| true,
        &mut commands,
    );
    assert!(builder.is_dragging());

    builder.handle(
        &[Event::PieceDestroyed {
            piece: ramp.piece,
            kind: ramp.kind,
            region: CellRect::from_origin_and_size(ramp.origin, CellRectSize::new(3, 1)),
        }],
        drop_at(CellCoord::new(8, 8)),
        |_| None,
        |_| true,
        &mut commands,
    );

    assert!(commands.is_empty());
    assert!(!builder.is_dragging());
}
