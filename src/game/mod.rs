//! Game Logic Module
//!
//! All session simulation code. Deterministic given the session seed.
//!
//! ## Module Structure
//!
//! - `level`: Campaign level catalog and loader
//! - `snake`: Snake body
//! - `collision`: Wall/self/obstacle checks
//! - `food`: Food and bonus food placement
//! - `input`: Direction buffer and input log
//! - `state`: Session state and render snapshot
//! - `tick`: Authoritative movement tick
//! - `machine`: Phase state machine
//! - `reward`: Publishing outcomes to external collaborators
//! - `events`: Game events

pub mod level;
pub mod snake;
pub mod collision;
pub mod food;
pub mod input;
pub mod state;
pub mod tick;
pub mod machine;
pub mod reward;
pub mod events;

// Re-export key types
pub use level::{Level, LevelCatalog, Obstacle, CatalogError};
pub use snake::Snake;
pub use collision::Collision;
pub use input::{DirectionBuffer, InputLog};
pub use state::{GameMode, GamePhase, Session, SnakeTone, RenderSnapshot};
pub use tick::{GameConfig, TickOutcome};
pub use machine::{GameMachine, GameStart, MachineError};
pub use reward::{RewardCalculator, CurrencyStore, ProgressTracker, ProgressKind};
pub use events::{GameEvent, GameEventData};
