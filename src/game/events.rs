//! Game Events
//!
//! Events generated by ticks and transitions. The reward calculator and the
//! runtime consume them; nothing in the simulation reads them back.

use serde::{Serialize, Deserialize};

use crate::core::grid::Cell;
use crate::game::collision::Collision;
use crate::game::state::{GameMode, GamePhase};

/// What a best-effort placement was for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacedItem {
    /// Normal food
    Food,
    /// Bonus food
    Bonus,
    /// Snake respawn after a continue
    Respawn,
}

/// Final numbers of a run, published on game over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Mode played
    pub mode: GameMode,
    /// Campaign level (None in free mode)
    pub level: Option<u8>,
    /// Full score of the run
    pub score: u32,
    /// Full coins of the run
    pub coins: u32,
    /// Score not yet published by an earlier game over
    pub score_delta: u32,
    /// Coins not yet published by an earlier game over
    pub coin_delta: u32,
    /// Whole seconds survived not yet published
    pub survival_secs_delta: u64,
    /// Normal food eaten over the run
    pub food_eaten: u32,
    /// An earlier game over of this run was continued
    pub continued: bool,
}

/// Numbers of a completed campaign level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReport {
    /// Completed level
    pub level: u8,
    /// Score reached (equals the target)
    pub score: u32,
    /// Score not yet added to the total by an earlier game over
    pub score_delta: u32,
    /// `coinReward + bonusCoin`
    pub reward_coins: u32,
    /// Coins picked up and not yet credited by an earlier game over
    pub collected_coins: u32,
    /// Whole seconds survived not yet published
    pub survival_secs_delta: u64,
}

impl LevelReport {
    /// Coins credited for the level in total.
    #[inline]
    pub fn total_coins(&self) -> u32 {
        self.reward_coins + self.collected_coins
    }
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Normal food eaten
    FoodEaten {
        cell: Cell,
        score: u32,
        coins: u32,
    },

    /// Bonus food appeared
    BonusSpawned {
        cell: Cell,
        value: u32,
        lifetime_ticks: u32,
    },

    /// Bonus food eaten
    BonusEaten {
        cell: Cell,
        value: u32,
    },

    /// Bonus food ran out uncollected
    BonusExpired {
        cell: Cell,
    },

    /// A placement exhausted its attempts and may overlap something
    PlacementFallback {
        item: PlacedItem,
        cell: Cell,
    },

    /// Free-mode tick interval changed
    SpeedChanged {
        tick_interval_ms: u64,
    },

    /// Fatal collision
    SnakeCollided {
        collision: Collision,
        head: Cell,
    },

    /// Campaign level target reached
    LevelCompleted(LevelReport),

    /// Final campaign level acknowledged
    CampaignCompleted,

    /// Run ended
    GameOver(RunOutcome),

    /// A continue finished and the snake was respawned
    ContinueGranted {
        head: Cell,
        continues_left: u8,
    },

    /// State machine moved between phases
    PhaseChanged {
        from: GamePhase,
        to: GamePhase,
    },
}

/// A game event with timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Session tick when the event occurred (0 outside a session)
    pub tick: u32,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: GameEventData) -> Self {
        Self { tick, data }
    }

    /// Create food eaten event.
    pub fn food_eaten(tick: u32, cell: Cell, score: u32, coins: u32) -> Self {
        Self::new(tick, GameEventData::FoodEaten { cell, score, coins })
    }

    /// Create phase changed event.
    pub fn phase_changed(tick: u32, from: GamePhase, to: GamePhase) -> Self {
        Self::new(tick, GameEventData::PhaseChanged { from, to })
    }

    /// Check if this event ends a run or a level.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.data,
            GameEventData::GameOver(_) | GameEventData::LevelCompleted(_)
        )
    }
}
