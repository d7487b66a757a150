//! Snake Body
//!
//! Ordered cell sequence, head first. Only `advance` mutates it.

use std::collections::VecDeque;

use serde::{Serialize, Deserialize};

use crate::core::grid::{Cell, Direction};

/// The snake body. Index 0 is the head, the back is the tail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snake {
    body: VecDeque<Cell>,
}

impl Snake {
    /// Straight snake of `length` cells with its head at `head`, trailing
    /// away from `heading`.
    pub fn straight(head: Cell, heading: Direction, length: usize) -> Self {
        let length = length.max(1);
        let behind = heading.opposite();
        let mut body = VecDeque::with_capacity(length + 8);
        let mut cell = head;
        for _ in 0..length {
            body.push_back(cell);
            cell = cell.step(behind);
        }
        Self { body }
    }

    /// Build from explicit cells, head first. Returns `None` when empty.
    pub fn from_cells(cells: impl IntoIterator<Item = Cell>) -> Option<Self> {
        let body: VecDeque<Cell> = cells.into_iter().collect();
        if body.is_empty() {
            None
        } else {
            Some(Self { body })
        }
    }

    /// Head cell.
    #[inline]
    pub fn head(&self) -> Cell {
        self.body[0]
    }

    /// Tail cell.
    #[inline]
    pub fn tail(&self) -> Cell {
        self.body[self.body.len() - 1]
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// A snake always has a head; provided for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Check if any cell of the body equals `cell`.
    pub fn contains(&self, cell: Cell) -> bool {
        self.body.contains(&cell)
    }

    /// Check `cell` against the body cells that will still be occupied
    /// after the next move. The tail is excluded unless the snake grows.
    pub fn occupies_after_move(&self, cell: Cell, growing: bool) -> bool {
        let keep = if growing { self.body.len() } else { self.body.len() - 1 };
        self.body.iter().take(keep).any(|c| *c == cell)
    }

    /// Iterate cells head first.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.body.iter()
    }

    /// Prepend a new head. Drops and returns the tail unless `grow`.
    pub fn advance(&mut self, new_head: Cell, grow: bool) -> Option<Cell> {
        self.body.push_front(new_head);
        if grow {
            None
        } else {
            self.body.pop_back()
        }
    }

    /// Check that no two cells are equal.
    pub fn is_self_disjoint(&self) -> bool {
        let mut seen: Vec<Cell> = self.body.iter().copied().collect();
        seen.sort_unstable();
        seen.windows(2).all(|w| w[0] != w[1])
    }
}

// =============================================================================
// TESTS
// =============================================================================
