//! Direction Input and Recording
//!
//! A single-slot direction buffer consumed exactly once per movement tick,
//! plus a delta-compressed log of effective direction changes for replay.

use serde::{Serialize, Deserialize};

use crate::core::grid::Direction;

// =============================================================================
// DIRECTION BUFFER
// =============================================================================

/// Single pending direction, checked against reversals.
///
/// Inputs are rejected when they reverse the *pending* direction. A pending
/// value that would reverse the *current* direction (two quick turns inside
/// one tick) is discarded when the tick consumes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionBuffer {
    current: Direction,
    pending: Direction,
}

impl DirectionBuffer {
    /// Create a buffer already heading `direction`.
    pub const fn new(direction: Direction) -> Self {
        Self {
            current: direction,
            pending: direction,
        }
    }

    /// Offer a direction. Returns false when it was ignored as a reversal.
    pub fn request(&mut self, direction: Direction) -> bool {
        if direction.is_opposite(self.pending) {
            return false;
        }
        self.pending = direction;
        true
    }

    /// Consume the pending direction for this tick and return the effective one.
    pub fn consume(&mut self) -> Direction {
        if self.pending.is_opposite(self.current) {
            self.pending = self.current;
        }
        self.current = self.pending;
        self.current
    }

    /// Direction applied on the last tick.
    #[inline]
    pub fn current(&self) -> Direction {
        self.current
    }

    /// Direction the next tick will try to apply.
    #[inline]
    pub fn pending(&self) -> Direction {
        self.pending
    }
}

impl Default for DirectionBuffer {
    fn default() -> Self {
        Self::new(Direction::Right)
    }
}

// =============================================================================
// INPUT LOG
// =============================================================================

/// An effective direction change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDelta {
    /// Tick on which the direction took effect
    pub tick: u32,
    /// New direction
    pub direction: Direction,
}

/// Delta-compressed record of direction changes for one session.
///
/// Only stores ticks where the effective direction CHANGED.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLog {
    deltas: Vec<InputDelta>,
}

impl InputLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a direction that became effective on `tick`.
    pub fn record(&mut self, tick: u32, direction: Direction) {
        if self.deltas.last().map(|d| d.direction) == Some(direction) {
            return;
        }
        self.deltas.push(InputDelta { tick, direction });
    }

    /// Direction change taking effect exactly on `tick`, if any.
    pub fn change_at(&self, tick: u32) -> Option<Direction> {
        let idx = self.deltas.partition_point(|d| d.tick < tick);
        self.deltas
            .get(idx)
            .filter(|d| d.tick == tick)
            .map(|d| d.direction)
    }

    /// All deltas in tick order.
    pub fn deltas(&self) -> &[InputDelta] {
        &self.deltas
    }

    /// Number of recorded changes.
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Serialize to bytes using bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

// =============================================================================
// TESTS
// =============================================================================
