//! Serialisable description of a puzzle level.
//!
//! Hosts load descriptors from whatever storage they use and submit them with
//! [`crate::Command::LoadLevel`]; the world never reads files itself.

use serde::{Deserialize, Serialize};

use crate::{CellCoord, PieceKind, Rotation};

/// Fixtures and starting inventory of a single level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    /// Human readable level name.
    pub name: String,
    /// Immovable pieces installed when the level loads.
    #[serde(default)]
    pub fixtures: Vec<FixtureSpec>,
    /// Pieces the player may place.
    #[serde(default)]
    pub inventory: Vec<InventorySpec>,
}

impl LevelDescriptor {
    /// Creates an empty level with the provided name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixtures: Vec::new(),
            inventory: Vec::new(),
        }
    }

    /// Adds a fixture and returns the descriptor.
    #[must_use]
    pub fn with_fixture(mut self, fixture: FixtureSpec) -> Self {
        self.fixtures.push(fixture);
        self
    }

    /// Adds inventory stock and returns the descriptor.
    #[must_use]
    pub fn with_stock(mut self, kind: PieceKind, count: u32) -> Self {
        self.inventory.push(InventorySpec { kind, count });
        self
    }

    /// Total stock of the provided kind across every inventory entry.
    #[must_use]
    pub fn stock_of(&self, kind: PieceKind) -> u32 {
        self.inventory
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.count)
            .sum()
    }
}

/// A level-authored piece.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureSpec {
    /// Type of the fixture.
    pub kind: PieceKind,
    /// Upper-left cell of the fixture footprint.
    pub origin: CellCoord,
    /// Orientation of the fixture.
    #[serde(default)]
    pub rotation: Rotation,
    /// Name other fixtures use to refer to this one.
    #[serde(default)]
    pub tag: Option<String>,
    /// Tag of the fixture this one triggers.
    #[serde(default)]
    pub linked_target: Option<String>,
}

impl FixtureSpec {
    /// Creates an untagged fixture.
    #[must_use]
    pub fn new(kind: PieceKind, origin: CellCoord, rotation: Rotation) -> Self {
        Self {
            kind,
            origin,
            rotation,
            tag: None,
            linked_target: None,
        }
    }

    /// Names the fixture so links can refer to it.
    #[must_use]
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Links the fixture to the fixture carrying `target`.
    #[must_use]
    pub fn linked_to(mut self, target: impl Into<String>) -> Self {
        self.linked_target = Some(target.into());
        self
    }
}

/// Starting stock of one piece type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySpec {
    /// Type of piece.
    pub kind: PieceKind,
    /// Number of pieces available.
    pub count: u32,
}
