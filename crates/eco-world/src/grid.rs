//! Toroidal occupancy grid.

use eco_core::{Direction, Error, OrganismId, Position, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Spatial index of the world.
///
/// Every cell is either in `occupied` or in `free`, never both. Both
/// collections are ordered so that anything iterating them is
/// reproducible for a fixed seed.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    pub width: i32,
    pub height: i32,
    occupied: BTreeMap<Position, OrganismId>,
    free: BTreeSet<Position>,
}

impl SpatialGrid {
    /// Create an empty grid; dimensions must already be validated as positive
    pub fn new(width: i32, height: i32) -> Self {
        let free = (0..width)
            .flat_map(|x| (0..height).map(move |y| Position::new(x, y)))
            .collect();

        Self {
            width,
            height,
            occupied: BTreeMap::new(),
            free,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.occupied.len() + self.free.len()
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.is_within(self.width, self.height)
    }

    pub fn is_free(&self, pos: Position) -> bool {
        self.free.contains(&pos)
    }

    pub fn occupant(&self, pos: Position) -> Option<OrganismId> {
        self.occupied.get(&pos).copied()
    }

    /// Claim a free cell for an organism
    pub fn insert(&mut self, pos: Position, id: OrganismId) -> Result<()> {
        if !self.free.remove(&pos) {
            return Err(Error::CellOccupied(pos));
        }
        self.occupied.insert(pos, id);
        Ok(())
    }

    /// Release an occupied cell, returning its former occupant
    pub fn remove(&mut self, pos: Position) -> Result<OrganismId> {
        let id = self.occupied.remove(&pos).ok_or(Error::CellVacant(pos))?;
        self.free.insert(pos);
        Ok(id)
    }

    /// Move the occupant of `from` to the free cell `to`.
    ///
    /// Both preconditions are checked before anything changes, so a failed
    /// relocation leaves the grid untouched.
    pub fn relocate(&mut self, from: Position, to: Position) -> Result<()> {
        if !self.occupied.contains_key(&from) {
            return Err(Error::CellVacant(from));
        }
        if !self.free.contains(&to) {
            return Err(Error::CellOccupied(to));
        }
        let id = self.remove(from)?;
        self.insert(to, id)
    }

    /// Moore neighborhood of `center` with toroidal wrapping.
    ///
    /// Grids at least 3 cells wide and tall always yield 8 distinct cells.
    /// Narrower grids wrap onto themselves; duplicates and the center are
    /// dropped there.
    pub fn neighbors8(&self, center: Position) -> Vec<Position> {
        let mut neighbors = Vec::with_capacity(8);
        for direction in Direction::all() {
            let (dx, dy) = direction.to_delta();
            let pos = center.add(dx, dy).wrap(self.width, self.height);
            if pos != center && !neighbors.contains(&pos) {
                neighbors.push(pos);
            }
        }
        neighbors
    }

    pub fn free_neighbors(&self, center: Position) -> Vec<Position> {
        self.neighbors8(center)
            .into_iter()
            .filter(|pos| self.free.contains(pos))
            .collect()
    }

    pub fn occupied_neighbors(&self, center: Position) -> Vec<OrganismId> {
        self.neighbors8(center)
            .into_iter()
            .filter_map(|pos| self.occupant(pos))
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Iterator over occupied cells in position order
    pub fn occupants(&self) -> impl Iterator<Item = (Position, OrganismId)> + '_ {
        self.occupied.iter().map(|(pos, id)| (*pos, *id))
    }

    /// Iterator over free cells in position order
    pub fn free_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.free.iter().copied()
    }

    /// True when occupied and free cells partition the whole grid exactly
    pub fn is_consistent(&self) -> bool {
        self.cell_count() == self.width as usize * self.height as usize
            && self.occupied.keys().all(|pos| self.contains(*pos) && !self.free.contains(pos))
            && self.free.iter().all(|pos| self.contains(*pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_creation() {
        let grid = SpatialGrid::new(10, 8);
        assert_eq!(grid.cell_count(), 80);
        assert_eq!(grid.free_count(), 80);
        assert_eq!(grid.occupied_count(), 0);
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_insert_and_remove() {
        let mut grid = SpatialGrid::new(5, 5);
        let pos = Position::new(2, 3);

        grid.insert(pos, OrganismId(1)).unwrap();
        assert_eq!(grid.occupant(pos), Some(OrganismId(1)));
        assert!(!grid.is_free(pos));
        assert!(grid.is_consistent());

        assert_eq!(grid.remove(pos).unwrap(), OrganismId(1));
        assert!(grid.is_free(pos));
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_double_occupancy_is_rejected() {
        let mut grid = SpatialGrid::new(5, 5);
        let pos = Position::new(0, 0);
        grid.insert(pos, OrganismId(1)).unwrap();

        assert!(matches!(grid.insert(pos, OrganismId(2)), Err(Error::CellOccupied(p)) if p == pos));
        assert_eq!(grid.occupant(pos), Some(OrganismId(1)));
    }

    #[test]
    fn test_out_of_bounds_insert_is_rejected() {
        let mut grid = SpatialGrid::new(5, 5);
        assert!(grid.insert(Position::new(5, 0), OrganismId(1)).is_err());
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_remove_vacant_is_rejected() {
        let mut grid = SpatialGrid::new(5, 5);
        assert!(matches!(grid.remove(Position::new(1, 1)), Err(Error::CellVacant(_))));
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_relocate() {
        let mut grid = SpatialGrid::new(5, 5);
        let from = Position::new(1, 1);
        let to = Position::new(1, 2);
        grid.insert(from, OrganismId(7)).unwrap();

        grid.relocate(from, to).unwrap();
        assert!(grid.is_free(from));
        assert_eq!(grid.occupant(to), Some(OrganismId(7)));
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_failed_relocate_leaves_grid_untouched() {
        let mut grid = SpatialGrid::new(5, 5);
        let a = Position::new(1, 1);
        let b = Position::new(1, 2);
        grid.insert(a, OrganismId(1)).unwrap();
        grid.insert(b, OrganismId(2)).unwrap();

        assert!(grid.relocate(a, b).is_err());
        assert!(grid.relocate(Position::new(3, 3), Position::new(4, 4)).is_err());
        assert_eq!(grid.occupant(a), Some(OrganismId(1)));
        assert_eq!(grid.occupant(b), Some(OrganismId(2)));
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_neighbors_exclude_center() {
        let grid = SpatialGrid::new(10, 10);
        let center = Position::new(5, 5);
        let neighbors = grid.neighbors8(center);

        assert_eq!(neighbors.len(), 8);
        assert!(!neighbors.contains(&center));
        for pos in &neighbors {
            assert!((pos.x - 5).abs() <= 1 && (pos.y - 5).abs() <= 1);
        }
    }

    #[test]
    fn test_neighbors_wrap_at_corner() {
        let grid = SpatialGrid::new(10, 6);
        let mut neighbors = grid.neighbors8(Position::new(0, 0));
        neighbors.sort();

        let mut expected = vec![
            Position::new(9, 5),
            Position::new(0, 5),
            Position::new(1, 5),
            Position::new(9, 0),
            Position::new(1, 0),
            Position::new(9, 1),
            Position::new(0, 1),
            Position::new(1, 1),
        ];
        expected.sort();
        assert_eq!(neighbors, expected);
    }

    #[test]
    fn test_neighbors_every_center_has_eight() {
        let grid = SpatialGrid::new(4, 3);
        for x in 0..4 {
            for y in 0..3 {
                assert_eq!(grid.neighbors8(Position::new(x, y)).len(), 8);
            }
        }
    }

    #[test]
    fn test_neighbors_on_narrow_grid() {
        let grid = SpatialGrid::new(1, 3);
        let center = Position::new(0, 1);
        let neighbors = grid.neighbors8(center);
        assert_eq!(neighbors.len(), 2);
        assert!(!neighbors.contains(&center));

        let single = SpatialGrid::new(1, 1);
        assert!(single.neighbors8(Position::new(0, 0)).is_empty());
    }

    #[test]
    fn test_free_and_occupied_neighbors() {
        let mut grid = SpatialGrid::new(10, 10);
        let center = Position::new(0, 0);
        grid.insert(center, OrganismId(0)).unwrap();
        grid.insert(Position::new(9, 9), OrganismId(1)).unwrap();
        grid.insert(Position::new(1, 0), OrganismId(2)).unwrap();
        grid.insert(Position::new(5, 5), OrganismId(3)).unwrap();

        let free = grid.free_neighbors(center);
        assert_eq!(free.len(), 6);
        assert!(!free.contains(&Position::new(9, 9)));

        let mut occupied = grid.occupied_neighbors(center);
        occupied.sort();
        assert_eq!(occupied, vec![OrganismId(1), OrganismId(2)]);
    }
}
