#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line host for Contraption puzzles.
//!
//! Loads a level, applies the requested placements, runs the simulation for a
//! bounded number of ticks and reports what happened.

mod layout_transfer;
mod levels;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, ensure, Context, Result};
use clap::Parser;
use contraption_core::{CellCoord, Command, Event, PlayMode};
use contraption_system_builder::{Builder, BuilderInput, HoveredPiece};
use contraption_world::{apply, query, World};
use env_logger::Env;

use crate::{
    layout_transfer::{LayoutPiece, LayoutSnapshot},
    levels::{load_level, LinkArg, PlacementArg},
};

/// Command-line options for a single headless run.
#[derive(Debug, Parser)]
#[command(name = "contraption", about = "Run a Contraption puzzle without a window")]
struct CliArgs {
    /// Level descriptor in TOML.
    #[arg(long)]
    level: PathBuf,
    /// Place a piece with its upper-left cell at column,row.
    #[arg(long = "place", value_name = "KIND@COLUMN,ROW[@DEGREES]")]
    placements: Vec<PlacementArg>,
    /// Drag a piece from the inventory and drop it centred on column,row.
    #[arg(long = "drag", value_name = "KIND@COLUMN,ROW[@DEGREES]")]
    drags: Vec<PlacementArg>,
    /// Wire a placed plate to the piece it toggles, by piece id.
    #[arg(long = "link", value_name = "SOURCE,TARGET")]
    links: Vec<LinkArg>,
    /// Layout string previously produced by --export.
    #[arg(long)]
    layout: Option<String>,
    /// Maximum number of simulation ticks.
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// Length of a tick in milliseconds.
    #[arg(long, default_value_t = 16)]
    dt_ms: u64,
    /// Print the placed layout as a shareable string before simulating.
    #[arg(long)]
    export: bool,
    /// Log lifecycle messages.
    #[arg(short, long)]
    verbose: bool,
}

/// Entry point for the Contraption command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    let filter = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();
    run(&args)
}

fn run(args: &CliArgs) -> Result<()> {
    let level = load_level(&args.level)?;
    let mut world = World::new();
    let mut events = Vec::new();
    apply(&mut world, Command::LoadLevel { level }, &mut events)
        .context("loading level into the world")?;
    println!(
        "level {:?}: {} pieces on a {}x{} grid",
        query::level_name(&world).unwrap_or_default(),
        query::piece_view(&world).iter().count(),
        query::grid(&world).columns(),
        query::grid(&world).rows(),
    );

    if let Some(layout) = &args.layout {
        apply_layout(&mut world, layout, &mut events)?;
    }
    for placement in &args.placements {
        submit(
            &mut world,
            Command::PlacePiece {
                kind: placement.kind,
                origin: placement.cell,
                rotation: placement.rotation,
            },
            &mut events,
        )
        .with_context(|| format!("placing {placement:?}"))?;
    }
    let mut builder = Builder::new(query::grid(&world).columns(), query::grid(&world).rows());
    for placement in &args.drags {
        drag(&mut world, &mut builder, *placement, &mut events)
            .with_context(|| format!("dragging {placement:?}"))?;
    }
    for link in &args.links {
        submit(
            &mut world,
            Command::LinkTrigger {
                source: link.source,
                target: link.target,
            },
            &mut events,
        )
        .with_context(|| {
            format!(
                "linking piece {} to piece {}",
                link.source.get(),
                link.target.get()
            )
        })?;
    }

    if args.export {
        println!("{}", export_layout(&world)?);
    }

    simulate(&mut world, args.ticks, Duration::from_millis(args.dt_ms))
}

fn submit(world: &mut World, command: Command, events: &mut Vec<Event>) -> Result<()> {
    apply(world, command, events).map_err(anyhow::Error::new)
}

fn apply_layout(world: &mut World, encoded: &str, events: &mut Vec<Event>) -> Result<()> {
    let layout = LayoutSnapshot::decode(encoded).context("decoding layout string")?;
    let grid = query::grid(world);
    ensure!(
        layout.columns == grid.columns() && layout.rows == grid.rows(),
        "layout was built on a {}x{} grid but the level uses {}x{}",
        layout.columns,
        layout.rows,
        grid.columns(),
        grid.rows(),
    );
    for piece in layout.pieces {
        submit(
            world,
            Command::PlacePiece {
                kind: piece.kind,
                origin: piece.origin,
                rotation: piece.rotation,
            },
            events,
        )
        .with_context(|| format!("placing {piece:?} from layout"))?;
    }
    Ok(())
}

/// Replays a drag gesture through the builder: grab from the inventory, turn
/// the ghost to the requested rotation, then drop it over `placement.cell`.
fn drag(
    world: &mut World,
    builder: &mut Builder,
    placement: PlacementArg,
    events: &mut Vec<Event>,
) -> Result<()> {
    let cursor = Some(placement.cell);
    let mut gestures = vec![BuilderInput {
        grab_from_inventory: Some(placement.kind),
        cursor_cell: cursor,
        ..BuilderInput::default()
    }];
    let turns = placement
        .kind
        .spec()
        .rotations
        .iter()
        .position(|rotation| *rotation == placement.rotation)
        .with_context(|| format!("{:?} cannot face {:?}", placement.kind, placement.rotation))?;
    gestures.extend((0..turns).map(|_| BuilderInput {
        rotate_action: true,
        cursor_cell: cursor,
        ..BuilderInput::default()
    }));
    gestures.push(BuilderInput {
        drop_action: true,
        cursor_cell: cursor,
        ..BuilderInput::default()
    });

    let mut commands = Vec::new();
    let view: &World = world;
    for input in gestures {
        let seen = std::mem::take(events);
        builder.handle(
            &seen,
            input,
            |cell| hovered(view, cell),
            |preview| match preview.moving {
                Some(piece) => query::can_move(view, piece, preview.origin),
                None => query::can_place(view, preview.kind, preview.origin, preview.rotation),
            },
            &mut commands,
        );
    }

    if commands.is_empty() {
        bail!("no free spot for the piece around {:?}", placement.cell);
    }
    for command in commands {
        submit(world, command, events)?;
    }
    Ok(())
}

fn hovered(world: &World, cell: CellCoord) -> Option<HoveredPiece> {
    let piece = query::piece(world, query::piece_at(world, cell)?)?;
    Some(HoveredPiece {
        piece: piece.id,
        kind: piece.kind,
        origin: piece.region.origin(),
        rotation: piece.rotation,
        fixed: piece.fixed,
    })
}

fn export_layout(world: &World) -> Result<String> {
    let grid = query::grid(world);
    let layout = LayoutSnapshot {
        columns: grid.columns(),
        rows: grid.rows(),
        pieces: query::piece_view(world)
            .iter()
            .filter(|piece| !piece.fixed)
            .map(|piece| LayoutPiece {
                kind: piece.kind,
                origin: piece.region.origin(),
                rotation: piece.rotation,
            })
            .collect(),
    };
    Ok(layout.encode()?)
}

fn simulate(world: &mut World, ticks: u32, dt: Duration) -> Result<()> {
    let mut events = Vec::new();
    submit(world, Command::StartSimulation, &mut events).context("starting the simulation")?;

    for _ in 0..ticks {
        events.clear();
        submit(world, Command::Tick { dt }, &mut events)?;
        for event in &events {
            report(world, event);
        }
        if query::play_mode(world) == PlayMode::Complete {
            break;
        }
    }

    if query::goal_reached(world) {
        println!("solved in {:.2}s", query::elapsed(world).as_secs_f32());
    } else {
        println!(
            "no goal reached after {:.2}s",
            query::elapsed(world).as_secs_f32()
        );
    }
    Ok(())
}

fn report(world: &World, event: &Event) {
    let at = query::elapsed(world).as_secs_f32();
    match event {
        Event::GoalReached { goal, ball } => {
            println!("{at:>6.2}s  ball {} reached goal {}", ball.get(), goal.get());
        }
        Event::PieceTriggered {
            piece,
            source,
            active,
        } => {
            let state = if *active { "on" } else { "off" };
            println!(
                "{at:>6.2}s  plate {} switched piece {} {state}",
                source.get(),
                piece.get()
            );
        }
        Event::SensorChanged { piece, engaged } => {
            log::info!("plate {} engaged: {engaged}", piece.get());
        }
        _ => {}
    }
}
