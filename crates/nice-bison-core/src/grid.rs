//! Toroidal multi-occupancy grid used as a pure spatial index.

use crate::entity::Occupant;
use serde::{Deserialize, Serialize};

/// Integer cell coordinates, always inside `[0, width) × [0, height)` once wrapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Debug)]
pub struct SpatialGrid {
    width: usize,
    height: usize,
    /// Row-major, `cells[y * width + x]`.
    cells: Vec<Vec<Occupant>>,
}

impl SpatialGrid {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        Self {
            width,
            height,
            cells: vec![Vec::new(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Wrap signed coordinates onto the torus.
    pub fn wrap(&self, x: i64, y: i64) -> Cell {
        Cell {
            x: x.rem_euclid(self.width as i64) as usize,
            y: y.rem_euclid(self.height as i64) as usize,
        }
    }

    /// Cell reached from `cell` by the offset `(dx, dy)`, wrapping at the edges.
    pub fn offset(&self, cell: Cell, dx: i64, dy: i64) -> Cell {
        self.wrap(cell.x as i64 + dx, cell.y as i64 + dy)
    }

    fn slot(&self, cell: Cell) -> usize {
        let c = self.wrap(cell.x as i64, cell.y as i64);
        c.y * self.width + c.x
    }

    /// Occupancy never blocks placement.
    pub fn place(&mut self, occupant: Occupant, cell: Cell) {
        let idx = self.slot(cell);
        self.cells[idx].push(occupant);
    }

    /// Returns whether the occupant was found in `cell`.
    pub fn remove(&mut self, occupant: Occupant, cell: Cell) -> bool {
        let idx = self.slot(cell);
        let slot = &mut self.cells[idx];
        match slot.iter().position(|o| *o == occupant) {
            Some(pos) => {
                slot.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Move an occupant between cells and return the wrapped destination.
    pub fn move_to(&mut self, occupant: Occupant, from: Cell, to: Cell) -> Cell {
        let to = self.wrap(to.x as i64, to.y as i64);
        let removed = self.remove(occupant, from);
        debug_assert!(removed, "moved occupant was not at its recorded cell");
        self.place(occupant, to);
        to
    }

    pub fn occupants(&self, cell: Cell) -> &[Occupant] {
        &self.cells[self.slot(cell)]
    }

    /// Distinct cells in the Moore neighbourhood of `center`, in `dx`-major order.
    ///
    /// On grids narrower than the window a wrapped cell is listed once.
    pub fn neighborhood(&self, center: Cell, radius: usize, include_center: bool) -> Vec<Cell> {
        let r = radius as i64;
        let mut cells = Vec::with_capacity((2 * radius + 1).pow(2));
        for dx in -r..=r {
            for dy in -r..=r {
                if dx == 0 && dy == 0 && !include_center {
                    continue;
                }
                let cell = self.offset(center, dx, dy);
                if !include_center && cell == center {
                    continue;
                }
                if !cells.contains(&cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// All occupants within the Moore neighbourhood of `center`.
    pub fn neighbors(&self, center: Cell, radius: usize, include_center: bool) -> Vec<Occupant> {
        self.neighborhood(center, radius, include_center)
            .into_iter()
            .flat_map(|cell| self.occupants(cell).iter().copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Vec::is_empty)
    }
}
