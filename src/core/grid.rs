//! Grid Geometry
//!
//! Integer cells, directions and the two edge topologies of the play grid.
//! No floating point anywhere: a cell is a pair of `i32` so a head that
//! steps off the grid can be represented before the topology resolves it.

use serde::{Serialize, Deserialize};

use crate::GRID_COUNT;

// =============================================================================
// CELL
// =============================================================================

/// A grid coordinate. In-bounds cells satisfy `0 <= x, y < GRID_COUNT`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Column
    pub x: i32,
    /// Row (grows downward)
    pub y: i32,
}

impl Cell {
    /// Create a cell.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Centre cell of the grid.
    #[inline]
    pub const fn center() -> Self {
        Self::new(GRID_COUNT / 2, GRID_COUNT / 2)
    }

    /// Neighbouring cell one step in `direction`, unresolved.
    #[inline]
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Check if the cell lies within `[0, GRID_COUNT)` on both axes.
    #[inline]
    pub fn in_bounds(self) -> bool {
        (0..GRID_COUNT).contains(&self.x) && (0..GRID_COUNT).contains(&self.y)
    }

    /// Wrap the cell onto the torus (modulo on both axes).
    #[inline]
    pub fn wrapped(self) -> Self {
        Self::new(self.x.rem_euclid(GRID_COUNT), self.y.rem_euclid(GRID_COUNT))
    }
}

// =============================================================================
// DIRECTION
// =============================================================================

/// Movement direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Direction {
    /// Toward row 0
    Up = 0,
    /// Toward the last row
    Down = 1,
    /// Toward column 0
    Left = 2,
    /// Toward the last column
    #[default]
    Right = 3,
}

impl Direction {
    /// All four directions, in discriminant order.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// The exact reverse of this direction.
    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Check if `other` is the exact reverse of this direction.
    #[inline]
    pub fn is_opposite(self, other: Direction) -> bool {
        self.opposite() == other
    }

    /// Unit step as `(dx, dy)`.
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Get direction from index (0-3).
    pub fn from_index(index: u8) -> Option<Direction> {
        match index {
            0 => Some(Direction::Up),
            1 => Some(Direction::Down),
            2 => Some(Direction::Left),
            3 => Some(Direction::Right),
            _ => None,
        }
    }
}

// =============================================================================
// TOPOLOGY
// =============================================================================

/// How the grid edges behave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    /// Edges wrap around (free mode).
    Torus,
    /// Edges are walls (campaign mode).
    Walled,
}

impl Topology {
    /// Resolve a freshly stepped head.
    ///
    /// On the torus this wraps; behind walls the cell is returned as-is so
    /// the collision detector can see that it left the grid.
    #[inline]
    pub fn resolve(self, cell: Cell) -> Cell {
        match self {
            Topology::Torus => cell.wrapped(),
            Topology::Walled => cell,
        }
    }

    /// Normalise a cell for food matching.
    ///
    /// Uses the same modulo as wrapping so food lookups agree with movement.
    #[inline]
    pub fn normalize(self, cell: Cell) -> Cell {
        match self {
            Topology::Torus => cell.wrapped(),
            Topology::Walled => cell,
        }
    }
}

// =============================================================================
// RECT
// =============================================================================

/// Axis-aligned rectangle of cells, covering `[x, x+width) x [y, y+height)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left column
    pub x: i32,
    /// Top row
    pub y: i32,
    /// Width in cells
    pub width: i32,
    /// Height in cells
    pub height: i32,
}

impl Rect {
    /// Create a rectangle.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Check if a cell lies inside. The lower bound is inclusive, the upper exclusive.
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= self.x
            && cell.x < self.x + self.width
            && cell.y >= self.y
            && cell.y < self.y + self.height
    }

    /// Check if every covered cell is inside the grid.
    pub fn fits_grid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.x >= 0
            && self.y >= 0
            && self.x + self.width <= GRID_COUNT
            && self.y + self.height <= GRID_COUNT
    }

    /// Iterate covered cells row by row.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| Cell::new(x, y)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposites() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert!(dir.is_opposite(dir.opposite()));
            assert!(!dir.is_opposite(dir));
        }
        assert!(!Direction::Up.is_opposite(Direction::Left));
    }

    #[test]
    fn test_torus_wraps_every_edge() {
        let last = GRID_COUNT - 1;
        let t = Topology::Torus;

        assert_eq!(t.resolve(Cell::new(last, 4).step(Direction::Right)), Cell::new(0, 4));
        assert_eq!(t.resolve(Cell::new(0, 4).step(Direction::Left)), Cell::new(last, 4));
        assert_eq!(t.resolve(Cell::new(7, 0).step(Direction::Up)), Cell::new(7, last));
        assert_eq!(t.resolve(Cell::new(7, last).step(Direction::Down)), Cell::new(7, 0));
    }

    #[test]
    fn test_walled_keeps_out_of_bounds() {
        let t = Topology::Walled;
        let head = t.resolve(Cell::new(GRID_COUNT - 1, 3).step(Direction::Right));
        assert_eq!(head, Cell::new(GRID_COUNT, 3));
        assert!(!head.in_bounds());
        assert!(!Cell::new(-1, 0).in_bounds());
        assert!(Cell::new(0, GRID_COUNT - 1).in_bounds());
    }

    #[test]
    fn test_rect_bounds_inclusive_exclusive() {
        let rect = Rect::new(5, 5, 3, 2);

        assert!(rect.contains(Cell::new(5, 5)));
        assert!(rect.contains(Cell::new(7, 6)));
        assert!(!rect.contains(Cell::new(8, 5)));
        assert!(!rect.contains(Cell::new(5, 7)));
        assert!(!rect.contains(Cell::new(4, 5)));
        assert_eq!(rect.cells().count(), 6);
    }

    #[test]
    fn test_rect_fits_grid() {
        assert!(Rect::new(0, 0, GRID_COUNT, 1).fits_grid());
        assert!(!Rect::new(1, 0, GRID_COUNT, 1).fits_grid());
        assert!(!Rect::new(2, 2, 0, 1).fits_grid());
    }
}
