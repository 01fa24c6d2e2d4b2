//! Level files plus the placement and link arguments supplied on the command line.

use std::{fs, path::Path, str::FromStr};

use anyhow::{Context, Result};
use contraption_core::{CellCoord, LevelDescriptor, PieceId, PieceKind, Rotation};
use thiserror::Error;

/// Reads a level descriptor from a TOML file.
pub(crate) fn load_level(path: &Path) -> Result<LevelDescriptor> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("reading level file {}", path.display()))?;
    parse_level(&source).with_context(|| format!("parsing level file {}", path.display()))
}

fn parse_level(source: &str) -> Result<LevelDescriptor> {
    let level: LevelDescriptor = toml::from_str(source)?;
    log::debug!(
        "parsed level {:?}: {} fixtures, {} stock entries",
        level.name,
        level.fixtures.len(),
        level.inventory.len()
    );
    Ok(level)
}

/// A piece requested as `kind@column,row[@degrees]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PlacementArg {
    pub(crate) kind: PieceKind,
    pub(crate) cell: CellCoord,
    pub(crate) rotation: Rotation,
}

/// Reasons a placement argument could not be understood.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum PlacementArgError {
    #[error("expected kind@column,row[@degrees], got '{0}'")]
    Malformed(String),
    #[error("unknown piece kind '{0}'")]
    UnknownKind(String),
    #[error("could not parse cell '{0}'")]
    InvalidCell(String),
    #[error("rotation must be 0, 90, 180 or 270, got '{0}'")]
    InvalidRotation(String),
}

impl FromStr for PlacementArg {
    type Err = PlacementArgError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.trim().split('@');
        let (Some(kind), Some(cell)) = (parts.next(), parts.next()) else {
            return Err(PlacementArgError::Malformed(value.to_owned()));
        };
        let degrees = parts.next();
        if parts.next().is_some() {
            return Err(PlacementArgError::Malformed(value.to_owned()));
        }

        let kind = PieceKind::from_name(kind.trim())
            .ok_or_else(|| PlacementArgError::UnknownKind(kind.to_owned()))?;
        let cell = parse_cell(cell).ok_or_else(|| PlacementArgError::InvalidCell(cell.to_owned()))?;
        let rotation = match degrees {
            None => Rotation::Deg0,
            Some(degrees) => degrees
                .trim()
                .parse::<u16>()
                .ok()
                .and_then(|degrees| Rotation::try_from(degrees).ok())
                .ok_or_else(|| PlacementArgError::InvalidRotation(degrees.to_owned()))?,
        };

        Ok(Self {
            kind,
            cell,
            rotation,
        })
    }
}

/// A trigger link requested as `source,target` piece ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LinkArg {
    pub(crate) source: PieceId,
    pub(crate) target: PieceId,
}

/// Reasons a link argument could not be understood.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum LinkArgError {
    #[error("expected source,target piece ids, got '{0}'")]
    Malformed(String),
    #[error("could not parse piece id '{0}'")]
    InvalidId(String),
}

impl FromStr for LinkArg {
    type Err = LinkArgError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (source, target) = value
            .split_once(',')
            .ok_or_else(|| LinkArgError::Malformed(value.to_owned()))?;
        let id = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map(PieceId::new)
                .map_err(|_| LinkArgError::InvalidId(part.trim().to_owned()))
        };
        Ok(Self {
            source: id(source)?,
            target: id(target)?,
        })
    }
}

fn parse_cell(value: &str) -> Option<CellCoord> {
    let (column, row) = value.split_once(',')?;
    Some(CellCoord::new(
        column.trim().parse().ok()?,
        row.trim().parse().ok()?,
    ))
}
