//! Reward Calculator
//!
//! Turns terminal events into calls on the external currency store and
//! progress tracker. The engine owns neither; both are trait objects.

use std::sync::Arc;

use serde::{Serialize, Deserialize};

use crate::game::events::{GameEvent, GameEventData, LevelReport, RunOutcome};
use crate::game::state::GameMode;

/// Persistent coin and score totals, owned outside the engine.
pub trait CurrencyStore: Send + Sync {
    /// Credit coins.
    fn apply_coin_delta(&self, amount: u64);

    /// Record a high score for the mode if it beats the stored one.
    fn set_high_score_if_greater(&self, mode: GameMode, score: u32);

    /// Add to the lifetime score total.
    fn add_to_total_score(&self, amount: u64);
}

/// Progress counter categories understood by the task/achievement tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    /// Normal food eaten
    FoodEaten,
    /// Coins picked up in play
    CoinsCollected,
    /// Runs finished
    GamesPlayed,
    /// Score of a finished run or level
    ScoreReached,
    /// Seconds survived
    SurvivalTime,
}

/// Task/achievement progress sink, owned outside the engine.
pub trait ProgressTracker: Send + Sync {
    /// Report progress of a kind.
    fn report_progress(&self, kind: ProgressKind, amount: u64);
}

/// Reward tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Coin multiplier in percent (100 = none). Hook for external boosts.
    pub multiplier_percent: u32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self { multiplier_percent: 100 }
    }
}

/// Publishes session outcomes to the external collaborators.
#[derive(Clone)]
pub struct RewardCalculator {
    store: Arc<dyn CurrencyStore>,
    progress: Arc<dyn ProgressTracker>,
    config: RewardConfig,
}

impl std::fmt::Debug for RewardCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewardCalculator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RewardCalculator {
    /// Create a calculator.
    pub fn new(
        store: Arc<dyn CurrencyStore>,
        progress: Arc<dyn ProgressTracker>,
        config: RewardConfig,
    ) -> Self {
        Self { store, progress, config }
    }

    /// Coins after the multiplier.
    pub fn apply_multiplier(&self, coins: u32) -> u64 {
        coins as u64 * self.config.multiplier_percent as u64 / 100
    }

    /// Publish everything the events call for. Each terminal event is
    /// published exactly once, so events must not be fed in twice.
    pub fn publish(&self, events: &[GameEvent]) {
        for event in events {
            match &event.data {
                GameEventData::FoodEaten { .. } => {
                    self.progress.report_progress(ProgressKind::FoodEaten, 1);
                }
                GameEventData::GameOver(outcome) => self.publish_game_over(outcome),
                GameEventData::LevelCompleted(report) => self.publish_level(report),
                _ => {}
            }
        }
    }

    fn publish_game_over(&self, outcome: &RunOutcome) {
        let coins = self.apply_multiplier(outcome.coin_delta);
        tracing::info!(
            "Publishing game over: {} coins, {} score (full score {})",
            coins, outcome.score_delta, outcome.score
        );

        self.store.apply_coin_delta(coins);
        self.store.set_high_score_if_greater(outcome.mode, outcome.score);
        self.store.add_to_total_score(outcome.score_delta as u64);

        if !outcome.continued {
            self.progress.report_progress(ProgressKind::GamesPlayed, 1);
        }
        self.progress.report_progress(ProgressKind::CoinsCollected, outcome.coin_delta as u64);
        self.progress.report_progress(ProgressKind::ScoreReached, outcome.score as u64);
        self.progress.report_progress(ProgressKind::SurvivalTime, outcome.survival_secs_delta);
    }

    fn publish_level(&self, report: &LevelReport) {
        let coins = self.apply_multiplier(report.total_coins());
        tracing::info!(
            "Publishing level {}: {} coins, {} score (full score {})",
            report.level, coins, report.score_delta, report.score
        );

        self.store.apply_coin_delta(coins);
        self.store.set_high_score_if_greater(GameMode::Campaign, report.score);
        self.store.add_to_total_score(report.score_delta as u64);

        self.progress.report_progress(ProgressKind::CoinsCollected, report.collected_coins as u64);
        self.progress.report_progress(ProgressKind::ScoreReached, report.score as u64);
        self.progress.report_progress(ProgressKind::SurvivalTime, report.survival_secs_delta);
    }
}

// =============================================================================
// TESTS
// =============================================================================
