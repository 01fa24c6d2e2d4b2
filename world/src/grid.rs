//! Cell occupancy for the play area.
//!
//! The grid records which piece owns each cell. It never derives a footprint
//! on its own; callers always pass the footprint produced by the piece
//! registry for the piece's current rotation.

use contraption_core::{
    CellCoord, CellRect, CellRectSize, PieceId, PieceKind, Rejection, CELL_LENGTH,
};
use glam::Vec2;

/// Record stored in every cell covered by a piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Occupant {
    /// Piece owning the cell.
    pub piece: PieceId,
    /// Type of the owning piece.
    pub kind: PieceKind,
}

/// Dense row-major occupancy map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    columns: u32,
    rows: u32,
    cells: Vec<Option<Occupant>>,
}

impl Grid {
    /// Creates an empty grid with the provided dimensions.
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![None; capacity],
        }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn is_valid_cell(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some()
    }

    /// Reports whether a piece owns the cell. Cells outside the grid are never
    /// occupied.
    #[must_use]
    pub fn is_occupied(&self, cell: CellCoord) -> bool {
        self.occupant(cell).is_some()
    }

    /// Occupancy record stored at the cell, if any.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<Occupant> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    /// Explains why a footprint cannot be placed at `origin`.
    ///
    /// Bounds are checked before occupancy so a footprint that both leaves the
    /// grid and overlaps a piece reports [`Rejection::OutOfBounds`].
    pub fn check_placement(
        &self,
        origin: CellCoord,
        footprint: CellRectSize,
    ) -> Result<(), Rejection> {
        let region = CellRect::from_origin_and_size(origin, footprint);
        if !region.cells().all(|cell| self.is_valid_cell(cell)) {
            return Err(Rejection::OutOfBounds);
        }
        if region.cells().any(|cell| self.is_occupied(cell)) {
            return Err(Rejection::Occupied);
        }
        Ok(())
    }

    /// Reports whether every cell of the footprint at `origin` is inside the
    /// grid and unoccupied.
    #[must_use]
    pub fn can_place(&self, origin: CellCoord, footprint: CellRectSize) -> bool {
        self.check_placement(origin, footprint).is_ok()
    }

    /// Records `occupant` in every cell of the footprint at `origin`.
    ///
    /// Cells outside the grid are skipped.
    pub fn occupy(&mut self, origin: CellCoord, footprint: CellRectSize, occupant: Occupant) {
        self.fill(origin, footprint, Some(occupant));
    }

    /// Clears every cell of the footprint at `origin`.
    pub fn free(&mut self, origin: CellCoord, footprint: CellRectSize) {
        self.fill(origin, footprint, None);
    }

    /// Cells currently owned by `piece`, in row-major order.
    #[must_use]
    pub fn cells_for(&self, piece: PieceId) -> Vec<CellCoord> {
        let width = self.columns as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.map_or(false, |occupant| occupant.piece == piece))
            .map(|(index, _)| CellCoord::new((index % width) as i32, (index / width) as i32))
            .collect()
    }

    /// Number of cells owned by any piece.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|slot| slot.is_some()).count()
    }

    /// Releases every cell.
    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    fn fill(&mut self, origin: CellCoord, footprint: CellRectSize, value: Option<Occupant>) {
        let region = CellRect::from_origin_and_size(origin, footprint);
        for cell in region.cells() {
            if let Some(index) = self.index(cell) {
                if let Some(slot) = self.cells.get_mut(index) {
                    *slot = value;
                }
            }
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        let column = u32::try_from(cell.column()).ok()?;
        let row = u32::try_from(cell.row()).ok()?;
        if column < self.columns && row < self.rows {
            let width = usize::try_from(self.columns).ok()?;
            Some(usize::try_from(row).ok()? * width + usize::try_from(column).ok()?)
        } else {
            None
        }
    }
}

/// Top-left corner of a cell in world units.
#[must_use]
pub fn cell_to_pixel(cell: CellCoord) -> Vec2 {
    Vec2::new(
        cell.column() as f32 * CELL_LENGTH,
        cell.row() as f32 * CELL_LENGTH,
    )
}

/// Cell containing a point in world units.
#[must_use]
pub fn pixel_to_cell(point: Vec2) -> CellCoord {
    CellCoord::new(
        (point.x / CELL_LENGTH).floor() as i32,
        (point.y / CELL_LENGTH).floor() as i32,
    )
}

/// Centre of a cell in world units.
#[must_use]
pub fn cell_center(cell: CellCoord) -> Vec2 {
    cell_to_pixel(cell) + Vec2::splat(CELL_LENGTH / 2.0)
}

/// Centre of a rectangular region in world units.
#[must_use]
pub fn region_center(region: CellRect) -> Vec2 {
    let size = region.size();
    cell_to_pixel(region.origin())
        + Vec2::new(size.width() as f32, size.height() as f32) * (CELL_LENGTH / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(id: u32) -> Occupant {
        Occupant {
            piece: PieceId::new(id),
            kind: PieceKind::Ramp,
        }
    }

    #[test]
    fn pixel_conversion_is_exact_for_top_left_corners() {
        let cell = CellCoord::new(14, 11);
        assert_eq!(cell_to_pixel(cell), Vec2::new(672.0, 528.0));
        assert_eq!(pixel_to_cell(cell_to_pixel(cell)), cell);
        assert_eq!(pixel_to_cell(Vec2::new(671.9, 575.9)), CellCoord::new(13, 11));
        assert_eq!(cell_center(cell), Vec2::new(696.0, 552.0));
    }

    #[test]
    fn points_outside_the_area_map_to_invalid_cells() {
        let grid = Grid::new(20, 15);
        let cell = pixel_to_cell(Vec2::new(-1.0, 10.0));
        assert_eq!(cell, CellCoord::new(-1, 0));
        assert!(!grid.is_valid_cell(cell));
        assert!(!grid.is_occupied(cell));
    }

    #[test]
    fn placement_distinguishes_bounds_from_overlap() {
        let mut grid = Grid::new(20, 15);
        let footprint = CellRectSize::new(3, 1);
        grid.occupy(CellCoord::new(2, 3), footprint, ramp(1));

        assert_eq!(
            grid.check_placement(CellCoord::new(18, 0), footprint),
            Err(Rejection::OutOfBounds)
        );
        assert_eq!(
            grid.check_placement(CellCoord::new(4, 3), footprint),
            Err(Rejection::Occupied)
        );
        assert!(grid.can_place(CellCoord::new(5, 3), footprint));
        assert!(!grid.can_place(CellCoord::new(0, 14), CellRectSize::new(1, 2)));
    }

    #[test]
    fn occupy_and_free_track_piece_cells() {
        let mut grid = Grid::new(20, 15);
        let footprint = CellRectSize::new(3, 1);
        grid.occupy(CellCoord::new(3, 4), footprint, ramp(7));

        assert_eq!(grid.occupied_count(), 3);
        assert_eq!(
            grid.cells_for(PieceId::new(7)),
            vec![
                CellCoord::new(3, 4),
                CellCoord::new(4, 4),
                CellCoord::new(5, 4)
            ]
        );
        assert_eq!(grid.occupant(CellCoord::new(4, 4)), Some(ramp(7)));

        grid.free(CellCoord::new(3, 4), footprint);
        assert_eq!(grid.occupied_count(), 0);
        assert!(grid.cells_for(PieceId::new(7)).is_empty());
    }

    #[test]
    fn clear_releases_everything() {
        let mut grid = Grid::new(4, 4);
        grid.occupy(CellCoord::new(0, 0), CellRectSize::new(2, 2), ramp(1));
        grid.occupy(CellCoord::new(2, 2), CellRectSize::new(2, 2), ramp(2));
        assert_eq!(grid.occupied_count(), 8);
        grid.clear();
        assert_eq!(grid.occupied_count(), 0);
    }
}
