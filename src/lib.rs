//! # Snake Engine
//!
//! Deterministic grid snake engine: free mode on a wrap-around grid and a
//! 20-level walled campaign with obstacles, bonus food and continues.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SNAKE ENGINE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── grid.rs     - Cells, directions, topology, rectangles   │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── level.rs    - Campaign level catalog                    │
//! │  ├── snake.rs    - Snake body                                │
//! │  ├── collision.rs- Wall/self/obstacle checks                 │
//! │  ├── food.rs     - Food and bonus placement                  │
//! │  ├── input.rs    - Direction buffer and input log            │
//! │  ├── state.rs    - Session state and render snapshot         │
//! │  ├── tick.rs     - Authoritative movement tick               │
//! │  ├── machine.rs  - Phase state machine                       │
//! │  └── reward.rs   - Outcome publishing                        │
//! │                                                              │
//! │  runtime/        - Timers (non-deterministic)                │
//! │  ├── scheduler.rs- Loop handles, movement/render timers      │
//! │  └── driver.rs   - Async driver around the machine           │
//! │                                                              │
//! │  config.rs       - Engine configuration                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are deterministic:
//! - Integer grid coordinates only
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! Given the same seed, configuration, catalog and inputs, a run produces
//! identical state hashes on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod runtime;
pub mod config;

// Re-export commonly used types
pub use crate::core::grid::{Cell, Direction};
pub use crate::core::rng::DeterministicRng;
pub use config::EngineConfig;
pub use game::machine::{GameMachine, GameStart};
pub use game::state::{GameMode, GamePhase, RenderSnapshot};
pub use runtime::{GameDriver, RenderSurface};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cells per grid side
pub const GRID_COUNT: i32 = 20;
