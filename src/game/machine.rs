//! Game State Machine
//!
//! Owns the phase and the active session, and routes start/input/tick/ad
//! events into session mutations. Everything here is synchronous; the
//! runtime module wraps it with timers.

use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::grid::{Cell, Direction};
use crate::core::rng::derive_session_seed;
use crate::game::collision::is_blocked;
use crate::game::events::{GameEvent, GameEventData, PlacedItem};
use crate::game::input::DirectionBuffer;
use crate::game::level::LevelCatalog;
use crate::game::snake::Snake;
use crate::game::state::{GameMode, GamePhase, RenderSnapshot, Session, SessionId};
use crate::game::tick::{movement_tick, GameConfig, TickOutcome};

// =============================================================================
// CONFIG & ERRORS
// =============================================================================

/// Configuration for the continue (ad-watch) path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinueConfig {
    /// Uses per free-mode run
    pub free_uses: u8,
    /// Uses per campaign level
    pub campaign_uses_per_level: u8,
    /// Simulated ad length in milliseconds
    pub ad_duration_ms: u64,
}

impl Default for ContinueConfig {
    fn default() -> Self {
        Self {
            free_uses: 2,
            campaign_uses_per_level: 1,
            ad_duration_ms: 3000,
        }
    }
}

impl ContinueConfig {
    /// Ad countdown length.
    pub fn ad_duration(&self) -> Duration {
        Duration::from_millis(self.ad_duration_ms)
    }
}

/// State machine errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MachineError {
    /// Action not allowed in the current phase.
    #[error("Cannot {action} while {phase:?}")]
    InvalidTransition {
        /// Phase at the time of the request
        phase: GamePhase,
        /// Rejected action
        action: &'static str,
    },

    /// Level id not in the catalog.
    #[error("Unknown level {0}")]
    UnknownLevel(u8),

    /// Continue budget used up.
    #[error("No continues left")]
    NoContinuesLeft,
}

/// How to start a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStart {
    /// Free mode
    Free,
    /// Campaign from a level
    Campaign {
        /// First level to play
        level: u8,
    },
}

// =============================================================================
// MACHINE
// =============================================================================

/// Phase plus the session it governs.
#[derive(Debug)]
pub struct GameMachine {
    phase: GamePhase,
    session: Option<Session>,
    catalog: Arc<LevelCatalog>,
    config: GameConfig,
    /// Fixed run id (deterministic seeding); random per run when None
    fixed_run_id: Option<SessionId>,
    run_id: SessionId,
    events: Vec<GameEvent>,
}

impl GameMachine {
    /// Create a machine in the menu phase.
    pub fn new(catalog: Arc<LevelCatalog>, config: GameConfig) -> Self {
        Self {
            phase: GamePhase::Menu,
            session: None,
            catalog,
            config,
            fixed_run_id: None,
            run_id: [0; 16],
            events: Vec::new(),
        }
    }

    /// Create a machine that seeds every run from `run_id`.
    pub fn with_run_id(catalog: Arc<LevelCatalog>, config: GameConfig, run_id: SessionId) -> Self {
        let mut machine = Self::new(catalog, config);
        machine.fixed_run_id = Some(run_id);
        machine
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Active session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Level table in use.
    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    /// Simulation configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Current movement interval (None without a session).
    pub fn tick_interval(&self) -> Option<Duration> {
        self.session
            .as_ref()
            .map(|s| Duration::from_millis(s.tick_interval_ms))
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// `menu -> playing`.
    pub fn start(&mut self, start: GameStart) -> Result<(), MachineError> {
        self.require(GamePhase::Menu, "start")?;

        self.run_id = self
            .fixed_run_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().into_bytes());

        match start {
            GameStart::Free => self.load_session(GameMode::Free, None)?,
            GameStart::Campaign { level } => self.load_session(GameMode::Campaign, Some(level))?,
        }

        info!("Run {} started: {:?}", hex::encode(&self.run_id[..4]), start);
        self.set_phase(GamePhase::Playing);
        Ok(())
    }

    /// Direction input. Returns whether it was accepted.
    pub fn on_direction(&mut self, direction: Direction) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        match self.session.as_mut() {
            Some(session) => session.input.request(direction),
            None => false,
        }
    }

    /// `playing <-> paused`. Returns the new phase.
    pub fn on_pause_toggle(&mut self) -> Result<GamePhase, MachineError> {
        match self.phase {
            GamePhase::Playing => self.set_phase(GamePhase::Paused),
            GamePhase::Paused => self.set_phase(GamePhase::Playing),
            phase => return Err(MachineError::InvalidTransition { phase, action: "toggle pause" }),
        }
        Ok(self.phase)
    }

    /// Run one movement tick and apply its terminal transitions.
    pub fn movement_tick(&mut self) -> Result<TickOutcome, MachineError> {
        self.require(GamePhase::Playing, "tick")?;
        let phase = self.phase;
        let session = self
            .session
            .as_mut()
            .ok_or(MachineError::InvalidTransition { phase, action: "tick" })?;
        let outcome = movement_tick(session, &self.config);

        match outcome {
            TickOutcome::Moved => {}
            TickOutcome::Collided(_) => self.game_over()?,
            TickOutcome::TargetReached => self.level_complete()?,
        }

        Ok(outcome)
    }

    /// `levelComplete -> playing` on the next level, or `-> menu` after the
    /// final level. Returns the new phase.
    pub fn advance_level(&mut self) -> Result<GamePhase, MachineError> {
        self.require(GamePhase::LevelComplete, "advance level")?;
        let current = self.session_mut("advance level")?.level.unwrap_or(0);

        if current >= self.catalog.final_level() {
            self.collect_session_events();
            let tick = self.current_tick();
            self.events.push(GameEvent::new(tick, GameEventData::CampaignCompleted));
            info!("Campaign completed");
            self.session = None;
            self.set_phase(GamePhase::Menu);
        } else {
            self.collect_session_events();
            self.load_session(GameMode::Campaign, Some(current + 1))?;
            info!("Advancing to level {}", current + 1);
            self.set_phase(GamePhase::Playing);
        }

        Ok(self.phase)
    }

    /// `gameOver -> adWatching`. Consumes a continue and returns the
    /// countdown length.
    pub fn watch_ad(&mut self) -> Result<Duration, MachineError> {
        self.require(GamePhase::GameOver, "watch ad")?;
        let session = self.session_mut("watch ad")?;
        if session.continues_left == 0 {
            return Err(MachineError::NoContinuesLeft);
        }
        session.continues_left -= 1;

        self.set_phase(GamePhase::AdWatching);
        Ok(self.config.continues.ad_duration())
    }

    /// `adWatching -> playing`. Respawns the snake; score and coins carry over.
    pub fn finish_ad(&mut self) -> Result<(), MachineError> {
        self.require(GamePhase::AdWatching, "finish ad")?;
        let config = self.config.clone();
        let session = self.session_mut("finish ad")?;

        respawn_snake(session, &config);
        let event = GameEvent::new(
            session.tick,
            GameEventData::ContinueGranted {
                head: session.snake.head(),
                continues_left: session.continues_left,
            },
        );
        session.push_event(event);

        self.set_phase(GamePhase::Playing);
        Ok(())
    }

    /// `gameOver -> playing` with a fresh run (campaign restarts at level 1).
    pub fn restart(&mut self) -> Result<(), MachineError> {
        self.require(GamePhase::GameOver, "restart")?;
        let mode = self.session_mut("restart")?.mode;

        self.collect_session_events();
        if self.fixed_run_id.is_none() {
            self.run_id = uuid::Uuid::new_v4().into_bytes();
        }
        match mode {
            GameMode::Free => self.load_session(GameMode::Free, None)?,
            GameMode::Campaign => self.load_session(GameMode::Campaign, Some(1))?,
        }

        info!("Run restarted in {:?} mode", mode);
        self.set_phase(GamePhase::Playing);
        Ok(())
    }

    /// Any phase `-> menu`. Drops the session.
    pub fn abandon(&mut self) {
        if self.phase == GamePhase::Menu {
            return;
        }
        self.collect_session_events();
        self.session = None;
        info!("Run abandoned");
        self.set_phase(GamePhase::Menu);
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    /// Read-only view of the current state.
    pub fn snapshot(&self) -> RenderSnapshot {
        match &self.session {
            Some(session) => session.snapshot(self.phase),
            None => RenderSnapshot::menu(),
        }
    }

    /// Drain all events generated since the last call, in order.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        self.collect_session_events();
        std::mem::take(&mut self.events)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn require(&self, phase: GamePhase, action: &'static str) -> Result<(), MachineError> {
        if self.phase != phase {
            warn!("Rejected {} while {:?}", action, self.phase);
            return Err(MachineError::InvalidTransition { phase: self.phase, action });
        }
        Ok(())
    }

    fn session_mut(&mut self, action: &'static str) -> Result<&mut Session, MachineError> {
        let phase = self.phase;
        self.session
            .as_mut()
            .ok_or(MachineError::InvalidTransition { phase, action })
    }

    fn current_tick(&self) -> u32 {
        self.session.as_ref().map(|s| s.tick).unwrap_or(0)
    }

    fn set_phase(&mut self, to: GamePhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.collect_session_events();
        self.phase = to;
        debug!("Phase {:?} -> {:?}", from, to);
        let tick = self.current_tick();
        self.events.push(GameEvent::phase_changed(tick, from, to));
    }

    fn collect_session_events(&mut self) {
        if let Some(session) = self.session.as_mut() {
            self.events.extend(session.take_events());
        }
    }

    fn load_session(&mut self, mode: GameMode, level: Option<u8>) -> Result<(), MachineError> {
        let level = match level {
            Some(id) => Some(self.catalog.get(id).ok_or(MachineError::UnknownLevel(id))?),
            None => None,
        };
        let seed = derive_session_seed(&self.run_id, mode as u8, level.map(|l| l.id).unwrap_or(0));

        self.session = Some(Session::new(self.run_id, mode, level, &self.config, seed));
        Ok(())
    }

    fn game_over(&mut self) -> Result<(), MachineError> {
        let session = self.session_mut("game over")?;
        let outcome = session.settle_outcome();
        info!(
            "Game over at tick {}: score {}, coins {}, {} continues left",
            session.tick, outcome.score, outcome.coins, session.continues_left
        );
        let event = GameEvent::new(session.tick, GameEventData::GameOver(outcome));
        session.push_event(event);

        self.set_phase(GamePhase::GameOver);
        Ok(())
    }

    fn level_complete(&mut self) -> Result<(), MachineError> {
        let catalog = Arc::clone(&self.catalog);
        let session = self.session_mut("complete level")?;
        let id = session.level.unwrap_or(0);
        let level = catalog.get(id).ok_or(MachineError::UnknownLevel(id))?;

        let report = session.settle_level(level);
        info!(
            "Level {} complete at tick {}: {} reward coins, {} collected",
            id, session.tick, report.reward_coins, report.collected_coins
        );
        let event = GameEvent::new(session.tick, GameEventData::LevelCompleted(report));
        session.push_event(event);

        self.set_phase(GamePhase::LevelComplete);
        Ok(())
    }
}

/// Put the snake back at its initial length on a safe spot.
///
/// A spot is safe when the whole body and the first cell ahead are inside
/// the grid, off obstacles. Falls back to the spawn layout at the centre.
fn respawn_snake(session: &mut Session, config: &GameConfig) {
    let length = config.initial_length;
    let attempts = config.placement.max_attempts.max(1);
    let mut chosen = None;

    for _ in 0..attempts {
        let head = session.rng.random_cell();
        let heading = session.rng.choose(&Direction::ALL).copied().unwrap_or_default();
        let candidate = Snake::straight(head, heading, length);
        let ahead = head.step(heading);

        let safe = ahead.in_bounds()
            && !is_blocked(&session.obstacles, ahead)
            && candidate
                .cells()
                .all(|c| c.in_bounds() && !is_blocked(&session.obstacles, *c));
        if safe {
            chosen = Some((candidate, heading));
            break;
        }
    }

    let (snake, heading) = match chosen {
        Some(found) => found,
        None => {
            let center = Cell::center();
            warn!("Respawn fell back to the grid centre");
            session.push_event(GameEvent::new(
                session.tick,
                GameEventData::PlacementFallback { item: PlacedItem::Respawn, cell: center },
            ));
            (Snake::straight(center, Direction::Right, length), Direction::Right)
        }
    };

    session.snake = snake;
    session.input = DirectionBuffer::new(heading);
    session.bonus = None;
    if session.snake.contains(session.food) {
        session.respawn_food(config);
    }

    debug!("Snake respawned at {:?} heading {:?}", session.snake.head(), heading);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::collision::Collision;
    use crate::game::level::Obstacle;
    use crate::game::reward::{CurrencyStore, ProgressKind, ProgressTracker, RewardCalculator, RewardConfig};

    fn machine() -> GameMachine {
        GameMachine::with_run_id(Arc::new(LevelCatalog::builtin()), GameConfig::default(), [7; 16])
    }

    fn session(machine: &mut GameMachine) -> &mut Session {
        machine.session.as_mut().unwrap()
    }

    /// Food directly ahead, then tick.
    fn feed(machine: &mut GameMachine) -> TickOutcome {
        let s = session(machine);
        s.food = s.topology().resolve(s.snake.head().step(s.input.pending()));
        machine.movement_tick().unwrap()
    }

    /// Bend the snake into a hook so the next tick bites the body.
    fn crash(machine: &mut GameMachine) {
        let s = session(machine);
        s.snake = Snake::from_cells([
            Cell::new(5, 5), Cell::new(6, 5), Cell::new(6, 6), Cell::new(5, 6), Cell::new(4, 6),
        ]).unwrap();
        s.input = DirectionBuffer::new(Direction::Down);
        s.food = Cell::new(15, 15);
        assert_eq!(machine.movement_tick().unwrap(), TickOutcome::Collided(Collision::SelfBody));
    }

    fn events_of(machine: &mut GameMachine) -> Vec<GameEventData> {
        machine.take_events().into_iter().map(|e| e.data).collect()
    }

    #[test]
    fn test_start_and_reject_double_start() {
        let mut m = machine();
        assert_eq!(m.phase(), GamePhase::Menu);

        m.start(GameStart::Free).unwrap();
        assert_eq!(m.phase(), GamePhase::Playing);
        assert_eq!(
            m.start(GameStart::Free),
            Err(MachineError::InvalidTransition { phase: GamePhase::Playing, action: "start" })
        );
    }

    #[test]
    fn test_unknown_level() {
        let mut m = machine();
        assert_eq!(m.start(GameStart::Campaign { level: 21 }), Err(MachineError::UnknownLevel(21)));
        assert_eq!(m.phase(), GamePhase::Menu);
    }

    #[test]
    fn test_level_one_completes_once() {
        let mut m = machine();
        m.start(GameStart::Campaign { level: 1 }).unwrap();
        session(&mut m).snake = Snake::straight(Cell::new(3, 5), Direction::Right, 3);

        for _ in 0..9 {
            assert_eq!(feed(&mut m), TickOutcome::Moved);
            assert_eq!(m.phase(), GamePhase::Playing);
        }
        assert_eq!(feed(&mut m), TickOutcome::TargetReached);
        assert_eq!(m.phase(), GamePhase::LevelComplete);

        let reports: Vec<_> = events_of(&mut m)
            .into_iter()
            .filter_map(|e| match e {
                GameEventData::LevelCompleted(report) => Some(report),
                _ => None,
            })
            .collect();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].reward_coins, 10);
        assert_eq!(reports[0].score, 10);
        assert!(reports[0].collected_coins >= 10);

        // Scheduler is stopped: no more ticks
        assert!(m.movement_tick().is_err());
    }

    #[test]
    fn test_advance_swaps_level() {
        let mut m = machine();
        m.start(GameStart::Campaign { level: 1 }).unwrap();
        session(&mut m).snake = Snake::straight(Cell::new(3, 5), Direction::Right, 3);
        for _ in 0..10 {
            feed(&mut m);
        }

        assert_eq!(m.advance_level().unwrap(), GamePhase::Playing);
        let s = m.session().unwrap();
        assert_eq!(s.level, Some(2));
        assert_eq!(s.score, 0);
        assert_eq!(s.tick_interval_ms, 78);
        assert_eq!(s.obstacles.len(), 4);
        assert_eq!(s.continues_left, 1);
    }

    #[test]
    fn test_final_level_returns_to_menu() {
        let mut m = machine();
        m.start(GameStart::Campaign { level: 20 }).unwrap();
        let target = session(&mut m).target_score.unwrap();
        session(&mut m).score = target - 1;
        feed(&mut m);
        assert_eq!(m.phase(), GamePhase::LevelComplete);

        assert_eq!(m.advance_level().unwrap(), GamePhase::Menu);
        assert!(m.session().is_none());
        assert!(events_of(&mut m).contains(&GameEventData::CampaignCompleted));
    }

    #[test]
    fn test_pause_resume_is_lossless() {
        let mut m = machine();
        m.start(GameStart::Free).unwrap();
        session(&mut m).food = Cell::new(0, 0);
        m.movement_tick().unwrap();
        let before = m.session().unwrap().compute_hash();

        assert_eq!(m.on_pause_toggle().unwrap(), GamePhase::Paused);
        assert!(m.movement_tick().is_err());
        assert!(!m.on_direction(Direction::Up));
        assert_eq!(m.on_pause_toggle().unwrap(), GamePhase::Playing);

        assert_eq!(m.session().unwrap().compute_hash(), before);
    }

    #[test]
    fn test_pause_only_from_playing() {
        let mut m = machine();
        assert!(m.on_pause_toggle().is_err());
        m.start(GameStart::Free).unwrap();
        crash(&mut m);
        assert!(m.on_pause_toggle().is_err());
    }

    #[test]
    fn test_free_continues_are_bounded() {
        let mut m = machine();
        m.start(GameStart::Free).unwrap();
        session(&mut m).score = 4;
        session(&mut m).coins = 6;

        for left in [1u8, 0] {
            crash(&mut m);
            assert_eq!(m.watch_ad().unwrap(), Duration::from_millis(3000));
            assert_eq!(m.phase(), GamePhase::AdWatching);
            m.finish_ad().unwrap();
            assert_eq!(m.phase(), GamePhase::Playing);

            let s = m.session().unwrap();
            assert_eq!(s.continues_left, left);
            assert_eq!(s.score, 4);
            assert_eq!(s.coins, 6);
            assert_eq!(s.snake.len(), 3);
            assert!(s.snake.cells().all(|c| c.in_bounds()));
            assert!(!s.snake.contains(s.food));
        }

        crash(&mut m);
        assert_eq!(m.watch_ad(), Err(MachineError::NoContinuesLeft));
        assert_eq!(m.phase(), GamePhase::GameOver);
    }

    #[test]
    fn test_campaign_continue_avoids_obstacles() {
        let mut m = machine();
        m.start(GameStart::Campaign { level: 17 }).unwrap();
        crash(&mut m);
        m.watch_ad().unwrap();
        m.finish_ad().unwrap();

        let s = m.session().unwrap();
        assert!(s.snake.cells().all(|c| c.in_bounds() && !is_blocked(&s.obstacles, *c)));
        assert_eq!(s.continues_left, 0);

        crash(&mut m);
        assert_eq!(m.watch_ad(), Err(MachineError::NoContinuesLeft));
    }

    #[test]
    fn test_continue_falls_back_to_centre() {
        let config = GameConfig {
            placement: crate::game::food::PlacementConfig { max_attempts: 1 },
            ..GameConfig::default()
        };
        let mut m = GameMachine::with_run_id(Arc::new(LevelCatalog::builtin()), config, [1; 16]);
        m.start(GameStart::Free).unwrap();
        crash(&mut m);
        // Nothing is safe
        session(&mut m).obstacles = vec![Obstacle::block(0, 0, 20, 20)];
        m.watch_ad().unwrap();
        m.finish_ad().unwrap();

        assert_eq!(m.session().unwrap().snake.head(), Cell::center());
        assert!(events_of(&mut m).iter().any(|e| matches!(
            e,
            GameEventData::PlacementFallback { item: PlacedItem::Respawn, .. }
        )));
    }

    #[test]
    fn test_second_game_over_publishes_only_new_amounts() {
        let mut m = machine();
        m.start(GameStart::Free).unwrap();
        session(&mut m).score = 3;
        session(&mut m).coins = 3;
        crash(&mut m);
        m.watch_ad().unwrap();
        m.finish_ad().unwrap();
        session(&mut m).score = 5;
        session(&mut m).coins = 9;
        crash(&mut m);

        let outcomes: Vec<_> = events_of(&mut m)
            .into_iter()
            .filter_map(|e| match e {
                GameEventData::GameOver(outcome) => Some(outcome),
                _ => None,
            })
            .collect();
        assert_eq!(outcomes.len(), 2);
        assert_eq!((outcomes[0].score_delta, outcomes[0].coin_delta), (3, 3));
        assert_eq!((outcomes[1].score, outcomes[1].score_delta, outcomes[1].coin_delta), (5, 2, 6));
    }

    #[derive(Default)]
    struct ScoreLog {
        high_scores: std::sync::Mutex<Vec<u32>>,
        totals: std::sync::Mutex<Vec<u64>>,
    }

    impl CurrencyStore for ScoreLog {
        fn apply_coin_delta(&self, _amount: u64) {}
        fn set_high_score_if_greater(&self, _mode: GameMode, score: u32) {
            self.high_scores.lock().unwrap().push(score);
        }
        fn add_to_total_score(&self, amount: u64) {
            self.totals.lock().unwrap().push(amount);
        }
    }

    struct NoProgress;

    impl ProgressTracker for NoProgress {
        fn report_progress(&self, _kind: ProgressKind, _amount: u64) {}
    }

    #[test]
    fn test_level_completed_after_continue_reports_full_score() {
        let store = Arc::new(ScoreLog::default());
        let rewards = RewardCalculator::new(store.clone(), Arc::new(NoProgress), RewardConfig::default());
        let mut m = machine();
        m.start(GameStart::Campaign { level: 1 }).unwrap();
        session(&mut m).snake = Snake::straight(Cell::new(3, 5), Direction::Right, 3);
        for _ in 0..4 {
            feed(&mut m);
        }
        crash(&mut m);
        m.watch_ad().unwrap();
        m.finish_ad().unwrap();
        rewards.publish(&m.take_events());

        let s = session(&mut m);
        s.snake = Snake::straight(Cell::new(3, 5), Direction::Right, 3);
        s.input = DirectionBuffer::new(Direction::Right);
        for _ in 0..5 {
            assert_eq!(feed(&mut m), TickOutcome::Moved);
        }
        assert_eq!(feed(&mut m), TickOutcome::TargetReached);

        let events = m.take_events();
        let report = events
            .iter()
            .find_map(|e| match &e.data {
                GameEventData::LevelCompleted(report) => Some(report.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!((report.score, report.score_delta), (10, 6));

        rewards.publish(&events);
        assert_eq!(*store.high_scores.lock().unwrap(), vec![4, 10]);
        assert_eq!(*store.totals.lock().unwrap(), vec![4, 6]);
    }

    #[test]
    fn test_restart_campaign_goes_to_level_one() {
        let mut m = machine();
        m.start(GameStart::Campaign { level: 5 }).unwrap();
        crash(&mut m);

        m.restart().unwrap();
        assert_eq!(m.phase(), GamePhase::Playing);
        let s = m.session().unwrap();
        assert_eq!(s.level, Some(1));
        assert_eq!(s.score, 0);
    }

    #[test]
    fn test_obstacle_corner_ends_run() {
        let mut m = machine();
        m.start(GameStart::Campaign { level: 2 }).unwrap();
        let s = session(&mut m);
        assert!(s.obstacles.contains(&Obstacle::block(4, 4, 2, 2)));
        s.snake = Snake::straight(Cell::new(3, 4), Direction::Right, 3);
        s.input = DirectionBuffer::new(Direction::Right);
        s.food = Cell::new(15, 10);

        assert!(matches!(m.movement_tick().unwrap(), TickOutcome::Collided(Collision::Obstacle(_))));
        assert_eq!(m.phase(), GamePhase::GameOver);
        assert_eq!(m.snapshot().tone, crate::game::state::SnakeTone::Dead);
    }

    #[test]
    fn test_abandon_from_anywhere() {
        let mut m = machine();
        m.abandon();
        assert_eq!(m.phase(), GamePhase::Menu);

        m.start(GameStart::Free).unwrap();
        crash(&mut m);
        m.watch_ad().unwrap();
        m.abandon();

        assert_eq!(m.phase(), GamePhase::Menu);
        assert!(m.session().is_none());
        assert_eq!(m.snapshot(), RenderSnapshot::menu());
    }

    #[test]
    fn test_seeded_runs_match() {
        let mut a = machine();
        let mut b = machine();
        a.start(GameStart::Free).unwrap();
        b.start(GameStart::Free).unwrap();

        for _ in 0..30 {
            let _ = a.movement_tick();
            let _ = b.movement_tick();
        }
        assert_eq!(a.session().unwrap().compute_hash(), b.session().unwrap().compute_hash());
    }

    #[test]
    fn test_phase_events_in_order() {
        let mut m = machine();
        m.start(GameStart::Free).unwrap();
        m.on_pause_toggle().unwrap();
        m.on_pause_toggle().unwrap();

        let phases: Vec<_> = events_of(&mut m)
            .into_iter()
            .filter_map(|e| match e {
                GameEventData::PhaseChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect();
        assert_eq!(phases, vec![GamePhase::Playing, GamePhase::Paused, GamePhase::Playing]);
    }
}
