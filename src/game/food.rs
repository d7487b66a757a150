//! Food Spawning
//!
//! Rejection sampling for normal food and the short-lived bonus food.
//! Placement is best-effort: when the attempt budget runs out the last
//! sample is used even if it overlaps, and the caller is told so.

use serde::{Serialize, Deserialize};

use crate::core::grid::Cell;
use crate::core::rng::DeterministicRng;
use crate::game::collision::is_blocked;
use crate::game::level::Obstacle;
use crate::game::snake::Snake;

/// Configuration for cell placement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Samples tried before accepting the last one (at least one is always drawn)
    pub max_attempts: u32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self { max_attempts: 100 }
    }
}

/// Configuration for bonus food.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusConfig {
    /// Chance to spawn on each normal food consumption
    pub spawn_percent: u32,
    /// Extra chance from luck modifiers (hook for external systems)
    pub luck_percent: u32,
    /// Smallest coin value
    pub min_value: u32,
    /// Largest coin value
    pub max_value: u32,
    /// Ticks before an uncollected bonus disappears
    pub lifetime_ticks: u32,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            spawn_percent: 10,
            luck_percent: 0,
            min_value: 5,
            max_value: 10,
            lifetime_ticks: 50,
        }
    }
}

impl BonusConfig {
    /// Effective spawn chance, capped at 100%.
    #[inline]
    pub fn effective_percent(&self) -> u32 {
        self.spawn_percent.saturating_add(self.luck_percent).min(100)
    }
}

/// Result of a placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Chosen cell
    pub cell: Cell,
    /// The attempt budget ran out; `cell` may overlap something
    pub fallback: bool,
}

/// A bonus food item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusFood {
    /// Where it sits
    pub cell: Cell,
    /// Coins granted when eaten
    pub value: u32,
    /// Ticks left before it disappears
    pub remaining_ticks: u32,
}

impl BonusFood {
    /// Count down one tick. Returns true once expired.
    pub fn countdown(&mut self) -> bool {
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        self.remaining_ticks == 0
    }
}

/// Sample a cell clear of the snake, obstacles and `avoid`.
pub fn place_cell(
    rng: &mut DeterministicRng,
    snake: &Snake,
    obstacles: &[Obstacle],
    avoid: Option<Cell>,
    config: &PlacementConfig,
) -> Placement {
    let attempts = config.max_attempts.max(1);
    let mut cell = rng.random_cell();

    for attempt in 1..=attempts {
        let clear = !snake.contains(cell)
            && !is_blocked(obstacles, cell)
            && avoid != Some(cell);
        if clear {
            return Placement { cell, fallback: false };
        }
        if attempt < attempts {
            cell = rng.random_cell();
        }
    }

    Placement { cell, fallback: true }
}

/// Roll for a bonus food after a normal food was eaten.
///
/// Returns the bonus and whether its placement fell back.
pub fn maybe_spawn_bonus(
    rng: &mut DeterministicRng,
    snake: &Snake,
    obstacles: &[Obstacle],
    food: Cell,
    placement: &PlacementConfig,
    config: &BonusConfig,
) -> Option<(BonusFood, bool)> {
    if !rng.next_percent(config.effective_percent()) {
        return None;
    }

    let spot = place_cell(rng, snake, obstacles, Some(food), placement);
    let value = rng.next_int_range(config.min_value as i32, config.max_value as i32) as u32;

    Some((
        BonusFood {
            cell: spot.cell,
            value,
            remaining_ticks: config.lifetime_ticks,
        },
        spot.fallback,
    ))
}

// =============================================================================
// TESTS
// =============================================================================
