//! Session State Definitions
//!
//! One `Session` owns everything a run mutates: snake, food, bonus food,
//! obstacles, counters and the RNG. It is created on start, mutated by the
//! movement tick and the state machine only, and dropped on return to menu.

use serde::{Serialize, Deserialize};

use crate::core::grid::{Cell, Direction, Topology};
use crate::core::rng::DeterministicRng;
use crate::core::hash::{StateHash, compute_state_hash};
use crate::game::events::{GameEvent, GameEventData, LevelReport, PlacedItem, RunOutcome};
use crate::game::food::{BonusFood, place_cell};
use crate::game::input::{DirectionBuffer, InputLog};
use crate::game::level::{Level, Obstacle};
use crate::game::snake::Snake;
use crate::game::tick::GameConfig;

/// Unique session identifier (UUID bytes).
pub type SessionId = [u8; 16];

// =============================================================================
// MODE & PHASE
// =============================================================================

/// Play variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum GameMode {
    /// Wrap-around grid, escalating speed, no win condition
    Free = 0,
    /// Walled grid, obstacles, per-level target score
    Campaign = 1,
}

impl GameMode {
    /// Edge behaviour for this mode.
    #[inline]
    pub fn topology(self) -> Topology {
        match self {
            GameMode::Free => Topology::Torus,
            GameMode::Campaign => Topology::Walled,
        }
    }
}

/// State machine phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    /// No session
    #[default]
    Menu,
    /// Movement loop running
    Playing,
    /// Frozen, resumable without loss
    Paused,
    /// Campaign target reached, waiting to advance
    LevelComplete,
    /// Fatal collision, waiting for restart/continue/abandon
    GameOver,
    /// Continue countdown running
    AdWatching,
}

impl GamePhase {
    /// Check if a session exists in this phase.
    #[inline]
    pub fn has_session(self) -> bool {
        self != GamePhase::Menu
    }
}

/// Theme-agnostic colour token for the snake.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnakeTone {
    /// Normal play
    #[default]
    Alive,
    /// Paused
    Paused,
    /// Frozen after a fatal collision
    Dead,
    /// Waiting for a continue
    Respawning,
    /// Level target reached
    Celebrating,
}

impl From<GamePhase> for SnakeTone {
    fn from(phase: GamePhase) -> Self {
        match phase {
            GamePhase::Menu | GamePhase::Playing => SnakeTone::Alive,
            GamePhase::Paused => SnakeTone::Paused,
            GamePhase::GameOver => SnakeTone::Dead,
            GamePhase::AdWatching => SnakeTone::Respawning,
            GamePhase::LevelComplete => SnakeTone::Celebrating,
        }
    }
}

// =============================================================================
// PUBLISHED COUNTERS
// =============================================================================

/// Amounts already reported to the currency store by earlier game overs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Published {
    /// Score already added to the total
    pub score: u32,
    /// Coins already credited
    pub coins: u32,
    /// Survival time already reported, in milliseconds
    pub survival_ms: u64,
    /// Game overs settled so far
    pub game_overs: u32,
}

// =============================================================================
// SESSION
// =============================================================================

/// Complete state of one run (one level in campaign mode).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier
    pub id: SessionId,

    /// Mode played
    pub mode: GameMode,

    /// Campaign level id (None in free mode)
    pub level: Option<u8>,

    /// Movement ticks completed
    pub tick: u32,

    /// RNG seed (for verification)
    pub rng_seed: u64,

    /// Deterministic RNG state
    pub rng: DeterministicRng,

    /// Snake body
    pub snake: Snake,

    /// Pending/current direction
    pub input: DirectionBuffer,

    /// Recorded direction changes
    pub input_log: InputLog,

    /// Normal food cell
    pub food: Cell,

    /// Bonus food, if any
    pub bonus: Option<BonusFood>,

    /// Active obstacles (copied from the level)
    pub obstacles: Vec<Obstacle>,

    /// Campaign win condition
    pub target_score: Option<u32>,

    /// Declared time limit of the level, in seconds
    pub time_limit: Option<u32>,

    /// Movement tick interval in milliseconds
    pub tick_interval_ms: u64,

    /// Score (+1 per normal food)
    pub score: u32,

    /// Coins (+1 per normal food, + value per bonus food)
    pub coins: u32,

    /// Normal food eaten
    pub food_eaten: u32,

    /// Simulated time survived, in milliseconds
    pub survival_ms: u64,

    /// Continue uses left
    pub continues_left: u8,

    /// Amounts already published on earlier game overs
    pub published: Published,

    /// Events generated since the last drain
    #[serde(skip)]
    pub pending_events: Vec<GameEvent>,
}

impl Session {
    /// Create a fresh session.
    ///
    /// `level` is required for campaign mode and ignored in free mode.
    pub fn new(
        id: SessionId,
        mode: GameMode,
        level: Option<&Level>,
        config: &GameConfig,
        rng_seed: u64,
    ) -> Self {
        let level = match mode {
            GameMode::Free => None,
            GameMode::Campaign => level,
        };
        let direction = Direction::Right;
        let snake = Snake::straight(Cell::center(), direction, config.initial_length);

        let mut session = Self {
            id,
            mode,
            level: level.map(|l| l.id),
            tick: 0,
            rng_seed,
            rng: DeterministicRng::new(rng_seed),
            snake,
            input: DirectionBuffer::new(direction),
            input_log: InputLog::new(),
            food: Cell::default(),
            bonus: None,
            obstacles: level.map(|l| l.obstacles.clone()).unwrap_or_default(),
            target_score: level.map(|l| l.target_score),
            time_limit: level.and_then(|l| l.time_limit),
            tick_interval_ms: level
                .map(|l| l.tick_interval_ms)
                .unwrap_or(config.speed.base_interval_ms),
            score: 0,
            coins: 0,
            food_eaten: 0,
            survival_ms: 0,
            continues_left: match mode {
                GameMode::Free => config.continues.free_uses,
                GameMode::Campaign => config.continues.campaign_uses_per_level,
            },
            published: Published::default(),
            pending_events: Vec::new(),
        };

        session.respawn_food(config);
        session
    }

    /// Edge behaviour for this session.
    #[inline]
    pub fn topology(&self) -> Topology {
        self.mode.topology()
    }

    /// Place normal food somewhere clear. Reports a fallback placement.
    pub fn respawn_food(&mut self, config: &GameConfig) {
        let placement = place_cell(
            &mut self.rng,
            &self.snake,
            &self.obstacles,
            self.bonus.map(|b| b.cell),
            &config.placement,
        );
        self.food = placement.cell;
        if placement.fallback {
            tracing::warn!("Food placement fell back to {:?} after exhausting attempts", placement.cell);
            self.push_event(GameEvent::new(
                self.tick,
                GameEventData::PlacementFallback { item: PlacedItem::Food, cell: placement.cell },
            ));
        }
    }

    /// Check if the campaign target has been reached exactly.
    #[inline]
    pub fn target_reached(&self) -> bool {
        self.target_score == Some(self.score)
    }

    /// Whole seconds survived since the last publication. Floors the totals,
    /// not the difference, so remainders carry over to the next one.
    fn unpublished_survival_secs(&self) -> u64 {
        self.survival_ms / 1000 - self.published.survival_ms / 1000
    }

    /// Build the game-over outcome and mark its amounts as published.
    pub fn settle_outcome(&mut self) -> RunOutcome {
        let outcome = RunOutcome {
            mode: self.mode,
            level: self.level,
            score: self.score,
            coins: self.coins,
            score_delta: self.score - self.published.score,
            coin_delta: self.coins - self.published.coins,
            survival_secs_delta: self.unpublished_survival_secs(),
            food_eaten: self.food_eaten,
            continued: self.published.game_overs > 0,
        };
        self.published = Published {
            score: self.score,
            coins: self.coins,
            survival_ms: self.survival_ms,
            game_overs: self.published.game_overs + 1,
        };
        outcome
    }

    /// Build the level-complete report. Earlier game-over publications of
    /// this level are subtracted so nothing is paid twice.
    pub fn settle_level(&mut self, level: &Level) -> LevelReport {
        let report = LevelReport {
            level: level.id,
            score: self.score,
            score_delta: self.score - self.published.score,
            reward_coins: level.completion_coins(),
            collected_coins: self.coins - self.published.coins,
            survival_secs_delta: self.unpublished_survival_secs(),
        };
        self.published = Published {
            score: self.score,
            coins: self.coins,
            survival_ms: self.survival_ms,
            game_overs: self.published.game_overs,
        };
        report
    }

    /// Read-only view for rendering.
    pub fn snapshot(&self, phase: GamePhase) -> RenderSnapshot {
        RenderSnapshot {
            phase,
            mode: Some(self.mode),
            level: self.level,
            tick: self.tick,
            snake: self.snake.cells().copied().collect(),
            food: Some(self.food),
            bonus: self.bonus,
            obstacles: self.obstacles.clone(),
            direction: self.input.current(),
            tone: SnakeTone::from(phase),
            score: self.score,
            coins: self.coins,
            continues_left: self.continues_left,
            time_limit: self.time_limit,
            tick_interval_ms: self.tick_interval_ms,
        }
    }

    /// Compute hash of current state for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng_seed, |hasher| {
            hasher.update_u8(self.mode as u8);
            hasher.update_u8(self.level.unwrap_or(0));

            hasher.update_u32(self.snake.len() as u32);
            for cell in self.snake.cells() {
                hasher.update_cell(*cell);
            }
            hasher.update_u8(self.input.current() as u8);
            hasher.update_u8(self.input.pending() as u8);

            hasher.update_cell(self.food);
            hasher.update_opt_cell(self.bonus.map(|b| b.cell));
            if let Some(bonus) = &self.bonus {
                hasher.update_u32(bonus.value);
                hasher.update_u32(bonus.remaining_ticks);
            }

            for obstacle in &self.obstacles {
                hasher.update_i32(obstacle.rect.x);
                hasher.update_i32(obstacle.rect.y);
                hasher.update_i32(obstacle.rect.width);
                hasher.update_i32(obstacle.rect.height);
            }

            hasher.update_u64(self.tick_interval_ms);
            hasher.update_u32(self.score);
            hasher.update_u32(self.coins);
            hasher.update_u32(self.food_eaten);
            hasher.update_u64(self.survival_ms);
            hasher.update_u8(self.continues_left);

            let rng_state = self.rng.state();
            hasher.update_u64(rng_state[0]);
            hasher.update_u64(rng_state[1]);
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

// =============================================================================
// RENDER SNAPSHOT
// =============================================================================

/// Consistent post-tick view handed to the render surface.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    /// Current phase
    pub phase: GamePhase,
    /// Mode (None in menu)
    pub mode: Option<GameMode>,
    /// Campaign level
    pub level: Option<u8>,
    /// Session tick
    pub tick: u32,
    /// Snake cells, head first
    pub snake: Vec<Cell>,
    /// Normal food
    pub food: Option<Cell>,
    /// Bonus food
    pub bonus: Option<BonusFood>,
    /// Obstacles
    pub obstacles: Vec<Obstacle>,
    /// Direction in effect
    pub direction: Direction,
    /// Snake colour token
    pub tone: SnakeTone,
    /// Score
    pub score: u32,
    /// Coins
    pub coins: u32,
    /// Continue uses left
    pub continues_left: u8,
    /// Declared level time limit, in seconds
    pub time_limit: Option<u32>,
    /// Movement tick interval in milliseconds
    pub tick_interval_ms: u64,
}

impl RenderSnapshot {
    /// Snapshot shown while no session exists.
    pub fn menu() -> Self {
        Self::default()
    }
}

// =============================================================================
// TESTS
// =============================================================================
