//! State Hashing for Verification
//!
//! Provides deterministic hashing of session state for:
//! - Replay validation (seed + input log must reproduce the hash)
//! - Pause/resume idempotence checks
//! - Log correlation between runs

use sha2::{Sha256, Digest};
use super::grid::Cell;

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for session state.
///
/// Wraps SHA-256 with helpers for grid types.
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for session state.
    pub fn for_session_state() -> Self {
        Self::new(b"SNAKE_ENGINE_STATE_V1")
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a cell.
    #[inline]
    pub fn update_cell(&mut self, cell: Cell) {
        self.update_i32(cell.x);
        self.update_i32(cell.y);
    }

    /// Update with an optional cell. `None` and `Some` never collide.
    #[inline]
    pub fn update_opt_cell(&mut self, cell: Option<Cell>) {
        match cell {
            Some(cell) => {
                self.update_bool(true);
                self.update_cell(cell);
            }
            None => self.update_bool(false),
        }
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute state hash for session verification.
///
/// This function is called by `Session::compute_hash()`.
/// The parameter is a closure that adds session-specific data.
pub fn compute_state_hash<F>(tick: u32, rng_seed: u64, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_session_state();

    // Always hash tick and seed first
    hasher.update_u32(tick);
    hasher.update_u64(rng_seed);

    add_state(&mut hasher);

    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_determinism() {
        let hash1 = compute_state_hash(10, 42, |h| h.update_cell(Cell::new(3, 4)));
        let hash2 = compute_state_hash(10, 42, |h| h.update_cell(Cell::new(3, 4)));
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_sensitivity() {
        let base = compute_state_hash(10, 42, |h| h.update_cell(Cell::new(3, 4)));

        assert_ne!(base, compute_state_hash(11, 42, |h| h.update_cell(Cell::new(3, 4))));
        assert_ne!(base, compute_state_hash(10, 43, |h| h.update_cell(Cell::new(3, 4))));
        assert_ne!(base, compute_state_hash(10, 42, |h| h.update_cell(Cell::new(4, 3))));
    }

    #[test]
    fn test_optional_cell_tagging() {
        let none = compute_state_hash(0, 0, |h| h.update_opt_cell(None));
        let origin = compute_state_hash(0, 0, |h| h.update_opt_cell(Some(Cell::new(0, 0))));
        assert_ne!(none, origin);
    }
}
