//! Collision Detection
//!
//! Evaluated once per tick on the freshly computed head, before the move
//! is committed. Checks run in a fixed order: wall, self, obstacle.

use serde::{Serialize, Deserialize};

use crate::core::grid::{Cell, Topology};
use crate::game::level::Obstacle;
use crate::game::snake::Snake;

/// What the head ran into. Every collision is fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collision {
    /// Left the grid behind walls
    Wall,
    /// Ran into its own body
    SelfBody,
    /// Ran into an obstacle (index into the session's obstacle list)
    Obstacle(usize),
}

/// Check if the head left the grid. Only walled grids have walls.
#[inline]
pub fn check_wall(topology: Topology, head: Cell) -> bool {
    topology == Topology::Walled && !head.in_bounds()
}

/// Index of the first obstacle covering `cell`.
pub fn find_obstacle(obstacles: &[Obstacle], cell: Cell) -> Option<usize> {
    obstacles.iter().position(|o| o.contains(cell))
}

/// Check if `cell` is covered by any obstacle.
#[inline]
pub fn is_blocked(obstacles: &[Obstacle], cell: Cell) -> bool {
    find_obstacle(obstacles, cell).is_some()
}

/// Run all checks against a new head.
///
/// `growing` tells whether this move eats food; a growing snake keeps its
/// tail, so the tail cell is only safe when not growing.
pub fn check_head(
    topology: Topology,
    snake: &Snake,
    obstacles: &[Obstacle],
    head: Cell,
    growing: bool,
) -> Option<Collision> {
    if check_wall(topology, head) {
        return Some(Collision::Wall);
    }

    if snake.occupies_after_move(head, growing) {
        return Some(Collision::SelfBody);
    }

    // Obstacles only exist in walled sessions, but the list decides
    find_obstacle(obstacles, head).map(Collision::Obstacle)
}
