//! Core deterministic primitives.
//!
//! Integer grid geometry, the seeded PRNG and state hashing. Nothing in
//! here reads the clock or touches floating point.

pub mod grid;
pub mod rng;
pub mod hash;

// Re-export core types
pub use grid::{Cell, Direction, Rect, Topology};
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateHash};
