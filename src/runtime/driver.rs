//! Game driver.
//!
//! Wraps a `GameMachine` in an `RwLock` and runs its timers. A movement tick
//! runs entirely under the write lock, so renders and inputs only ever see
//! committed state.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, info, warn};

use super::scheduler::{movement_ticker, render_loop, Scheduler, SchedulerConfig};
use super::RenderSurface;
use crate::core::grid::Direction;
use crate::game::events::GameEvent;
use crate::game::machine::{GameMachine, GameStart, MachineError};
use crate::game::reward::RewardCalculator;
use crate::game::state::{GamePhase, RenderSnapshot};
use crate::game::tick::TickOutcome;

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// State shared between the driver and its tasks.
struct Shared {
    machine: RwLock<GameMachine>,
    scheduler: Mutex<Scheduler>,
    snapshots: watch::Sender<RenderSnapshot>,
    events: broadcast::Sender<GameEvent>,
    rewards: Option<RewardCalculator>,
    surface: Arc<dyn RenderSurface>,
    config: SchedulerConfig,
}

impl Shared {
    fn scheduler(&self) -> MutexGuard<'_, Scheduler> {
        // Handles stay valid even if a holder panicked
        self.scheduler.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Hand a committed state to the renderer and the event consumers.
    fn publish(&self, snapshot: RenderSnapshot, events: Vec<GameEvent>) {
        self.snapshots.send_replace(snapshot);
        if let Some(rewards) = &self.rewards {
            rewards.publish(&events);
        }
        for event in events {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }
}

/// Spawn the movement and render loops.
fn start_loops(shared: &Arc<Shared>, period: Duration) {
    let movement = tokio::spawn(movement_loop(Arc::clone(shared), period));
    let render = tokio::spawn(render_loop(
        shared.snapshots.subscribe(),
        Arc::clone(&shared.surface),
        shared.config.render_period(),
    ));
    shared.scheduler().run_loops(movement, render);
    debug!("Loops started at {}ms per tick", period.as_millis());
}

async fn movement_loop(shared: Arc<Shared>, mut period: Duration) {
    let mut ticker = movement_ticker(period);

    loop {
        ticker.tick().await;

        // Publish before the guard drops so a later commit cannot be overwritten
        let (outcome, next_period) = {
            let mut machine = shared.machine.write().await;
            if machine.phase() != GamePhase::Playing {
                break;
            }
            let outcome = match machine.movement_tick() {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Movement tick failed: {}", e);
                    break;
                }
            };
            shared.publish(machine.snapshot(), machine.take_events());
            (outcome, machine.tick_interval())
        };

        if outcome != TickOutcome::Moved {
            break;
        }

        // Re-arm on speed change
        if let Some(next) = next_period {
            if next != period {
                period = next;
                ticker = movement_ticker(period);
            }
        }
    }
}

/// Async front end for a `GameMachine`.
///
/// Dropping the driver aborts every task it spawned.
pub struct GameDriver {
    shared: Arc<Shared>,
}

impl GameDriver {
    /// Create a driver around a machine.
    pub fn new(
        machine: GameMachine,
        surface: Arc<dyn RenderSurface>,
        config: SchedulerConfig,
        rewards: Option<RewardCalculator>,
    ) -> Self {
        let snapshot = machine.snapshot();
        let (snapshots, _) = watch::channel(snapshot);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                machine: RwLock::new(machine),
                scheduler: Mutex::new(Scheduler::new()),
                snapshots,
                events,
                rewards,
                surface,
                config,
            }),
        }
    }

    /// Start a run and its loops.
    pub async fn start(&self, start: GameStart) -> Result<(), MachineError> {
        let period = {
            let mut machine = self.shared.machine.write().await;
            machine.start(start)?;
            self.commit(&mut machine);
            machine.tick_interval()
        };
        if let Some(period) = period {
            start_loops(&self.shared, period);
        }
        Ok(())
    }

    /// Direction input. Returns whether it was accepted.
    pub async fn on_direction(&self, direction: Direction) -> bool {
        self.shared.machine.write().await.on_direction(direction)
    }

    /// Pause or resume. Resuming restarts the loops one full period out.
    pub async fn on_pause_toggle(&self) -> Result<GamePhase, MachineError> {
        let (phase, period) = {
            let mut machine = self.shared.machine.write().await;
            let phase = machine.on_pause_toggle()?;
            if phase == GamePhase::Paused {
                self.shared.scheduler().stop_loops();
                self.commit_frozen(&mut machine);
            } else {
                self.commit(&mut machine);
            }
            (phase, machine.tick_interval())
        };

        if phase == GamePhase::Playing {
            if let Some(period) = period {
                start_loops(&self.shared, period);
            }
        }
        Ok(phase)
    }

    /// Move on from a completed level.
    pub async fn advance_level(&self) -> Result<GamePhase, MachineError> {
        let (phase, period) = {
            let mut machine = self.shared.machine.write().await;
            let phase = machine.advance_level()?;
            self.commit(&mut machine);
            (phase, machine.tick_interval())
        };

        if phase == GamePhase::Playing {
            if let Some(period) = period {
                start_loops(&self.shared, period);
            }
        }
        Ok(phase)
    }

    /// Start the continue countdown. Play resumes when it ends.
    pub async fn watch_ad(&self) -> Result<Duration, MachineError> {
        let duration = {
            let mut machine = self.shared.machine.write().await;
            let duration = machine.watch_ad()?;
            self.commit_frozen(&mut machine);
            duration
        };

        let shared = Arc::clone(&self.shared);
        let countdown = tokio::spawn(async move {
            tokio::time::sleep(duration).await;

            let period = {
                let mut machine = shared.machine.write().await;
                if let Err(e) = machine.finish_ad() {
                    warn!("Continue countdown ended in the wrong phase: {}", e);
                    return;
                }
                let snapshot = machine.snapshot();
                let events = machine.take_events();
                shared.publish(snapshot, events);
                machine.tick_interval()
            };

            info!("Continue granted");
            if let Some(period) = period {
                start_loops(&shared, period);
            }
        });
        self.shared.scheduler().run_countdown(countdown);

        Ok(duration)
    }

    /// Restart after a game over.
    pub async fn restart(&self) -> Result<(), MachineError> {
        let period = {
            let mut machine = self.shared.machine.write().await;
            machine.restart()?;
            self.commit(&mut machine);
            machine.tick_interval()
        };
        if let Some(period) = period {
            start_loops(&self.shared, period);
        }
        Ok(())
    }

    /// Return to the menu from anywhere, cancelling every timer.
    pub async fn abandon(&self) {
        let mut machine = self.shared.machine.write().await;
        self.shared.scheduler().stop_all();
        machine.abandon();
        self.commit_frozen(&mut machine);
    }

    /// Stop every timer without changing the phase.
    pub fn stop(&self) {
        self.shared.scheduler().stop_all();
    }

    /// Latest committed snapshot.
    pub fn snapshot(&self) -> RenderSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    /// Current phase.
    pub async fn phase(&self) -> GamePhase {
        self.shared.machine.read().await.phase()
    }

    /// Subscribe to game events.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.shared.events.subscribe()
    }

    /// Check if the play loops are running.
    pub fn is_running(&self) -> bool {
        self.shared.scheduler().loops_active()
    }

    /// Check if a continue countdown is pending.
    pub fn countdown_pending(&self) -> bool {
        self.shared.scheduler().countdown_active()
    }

    fn commit(&self, machine: &mut GameMachine) {
        let snapshot = machine.snapshot();
        let events = machine.take_events();
        self.shared.publish(snapshot, events);
    }

    /// Commit a phase with no render loop running and draw it once.
    fn commit_frozen(&self, machine: &mut GameMachine) {
        let snapshot = machine.snapshot();
        self.shared.surface.draw(&snapshot);
        self.shared.publish(snapshot, machine.take_events());
    }
}

impl Drop for GameDriver {
    fn drop(&mut self) {
        self.shared.scheduler().stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use crate::game::events::GameEventData;
    use crate::game::level::LevelCatalog;
    use crate::game::reward::{CurrencyStore, ProgressKind, ProgressTracker, RewardConfig};
    use crate::game::state::{GameMode, SnakeTone};
    use crate::game::tick::{GameConfig, SpeedConfig};

    #[derive(Default)]
    struct CountingSurface {
        frames: AtomicU32,
        last_tone: Mutex<Option<SnakeTone>>,
    }

    impl CountingSurface {
        fn last_tone(&self) -> Option<SnakeTone> {
            *self.last_tone.lock().unwrap()
        }
    }

    impl RenderSurface for CountingSurface {
        fn draw(&self, snapshot: &RenderSnapshot) {
            self.frames.fetch_add(1, Ordering::SeqCst);
            *self.last_tone.lock().unwrap() = Some(snapshot.tone);
        }
    }

    #[derive(Default)]
    struct CoinLog {
        coins: Mutex<Vec<u64>>,
        high_scores: Mutex<Vec<u32>>,
    }

    impl CurrencyStore for CoinLog {
        fn apply_coin_delta(&self, amount: u64) {
            self.coins.lock().unwrap().push(amount);
        }
        fn set_high_score_if_greater(&self, _mode: GameMode, score: u32) {
            self.high_scores.lock().unwrap().push(score);
        }
        fn add_to_total_score(&self, _amount: u64) {}
    }

    struct NoProgress;

    impl ProgressTracker for NoProgress {
        fn report_progress(&self, _kind: ProgressKind, _amount: u64) {}
    }

    fn driver_with(config: GameConfig, rewards: Option<RewardCalculator>) -> (GameDriver, Arc<CountingSurface>) {
        let surface = Arc::new(CountingSurface::default());
        let machine = GameMachine::with_run_id(Arc::new(LevelCatalog::builtin()), config, [3; 16]);
        let driver = GameDriver::new(machine, surface.clone(), SchedulerConfig::default(), rewards);
        (driver, surface)
    }

    fn driver() -> (GameDriver, Arc<CountingSurface>) {
        driver_with(GameConfig::default(), None)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_interval() {
        let (driver, surface) = driver();
        driver.start(GameStart::Free).await.unwrap();
        assert!(driver.is_running());

        sleep_ms(350).await;
        assert_eq!(driver.snapshot().tick, 3);
        assert!(surface.frames.load(Ordering::SeqCst) >= 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_and_resume_does_not_catch_up() {
        let (driver, _) = driver();
        driver.start(GameStart::Free).await.unwrap();

        sleep_ms(150).await;
        assert_eq!(driver.on_pause_toggle().await.unwrap(), GamePhase::Paused);
        assert!(!driver.is_running());
        let frozen = driver.snapshot();
        assert_eq!(frozen.tick, 1);

        sleep_ms(1000).await;
        assert_eq!(driver.snapshot().tick, 1);

        assert_eq!(driver.on_pause_toggle().await.unwrap(), GamePhase::Playing);
        sleep_ms(50).await;
        assert_eq!(driver.snapshot().tick, 1);
        sleep_ms(60).await;
        assert_eq!(driver.snapshot().tick, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_hit_stops_loops_and_continue_restarts_them() {
        let (driver, _) = driver();
        let mut events = driver.subscribe();
        driver.start(GameStart::Campaign { level: 1 }).await.unwrap();

        // Heading right from the centre, the wall is ten ticks away
        sleep_ms(80 * 10 + 40).await;
        assert_eq!(driver.phase().await, GamePhase::GameOver);
        tokio::task::yield_now().await;
        assert!(!driver.is_running());

        let mut saw_game_over = false;
        while let Ok(event) = events.try_recv() {
            saw_game_over |= matches!(event.data, GameEventData::GameOver(_));
        }
        assert!(saw_game_over);

        assert_eq!(driver.watch_ad().await.unwrap(), Duration::from_millis(3000));
        assert_eq!(driver.phase().await, GamePhase::AdWatching);
        assert!(driver.countdown_pending());

        sleep_ms(3010).await;
        assert_eq!(driver.phase().await, GamePhase::Playing);
        assert!(driver.is_running());
        assert_eq!(driver.snapshot().continues_left, 0);

        driver.abandon().await;
        assert_eq!(driver.phase().await, GamePhase::Menu);
        assert!(!driver.is_running());
        assert_eq!(driver.snapshot(), RenderSnapshot::menu());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandon_cancels_countdown() {
        let (driver, _) = driver();
        driver.start(GameStart::Campaign { level: 1 }).await.unwrap();
        sleep_ms(900).await;
        assert_eq!(driver.phase().await, GamePhase::GameOver);

        driver.watch_ad().await.unwrap();
        sleep_ms(1000).await;
        driver.abandon().await;
        assert!(!driver.countdown_pending());

        sleep_ms(5000).await;
        assert_eq!(driver.phase().await, GamePhase::Menu);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_rendering() {
        let (driver, surface) = driver();
        driver.start(GameStart::Free).await.unwrap();
        sleep_ms(100).await;
        drop(driver);

        tokio::task::yield_now().await;
        let frames = surface.frames.load(Ordering::SeqCst);
        sleep_ms(500).await;
        assert_eq!(surface.frames.load(Ordering::SeqCst), frames);
    }

    #[tokio::test(start_paused = true)]
    async fn test_direction_input_through_driver() {
        let (driver, _) = driver();
        assert!(!driver.on_direction(Direction::Up).await);

        driver.start(GameStart::Free).await.unwrap();
        assert!(!driver.on_direction(Direction::Left).await);
        assert!(driver.on_direction(Direction::Up).await);

        sleep_ms(110).await;
        let snapshot = driver.snapshot();
        assert_eq!(snapshot.direction, Direction::Up);
        assert_eq!(snapshot.snake[0], crate::core::grid::Cell::new(10, 9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewards_published_once_per_game_over() {
        let store = Arc::new(CoinLog::default());
        let rewards = RewardCalculator::new(store.clone(), Arc::new(NoProgress), RewardConfig::default());
        let (driver, _) = driver_with(GameConfig::default(), Some(rewards));
        driver.start(GameStart::Campaign { level: 1 }).await.unwrap();

        sleep_ms(80 * 10 + 40).await;
        assert_eq!(driver.phase().await, GamePhase::GameOver);
        assert_eq!(store.coins.lock().unwrap().len(), 1);
        assert_eq!(store.high_scores.lock().unwrap().len(), 1);

        // The ad commit and the countdown commit carry no terminal events
        driver.watch_ad().await.unwrap();
        sleep_ms(3010).await;
        assert_eq!(driver.phase().await, GamePhase::Playing);
        assert_eq!(store.coins.lock().unwrap().len(), 1);

        // Level 1 has no obstacles: the respawned snake runs into a wall
        sleep_ms(80 * 20 + 40).await;
        assert_eq!(driver.phase().await, GamePhase::GameOver);
        assert_eq!(store.coins.lock().unwrap().len(), 2);
        assert_eq!(store.high_scores.lock().unwrap().len(), 2);
        assert_eq!(driver.watch_ad().await, Err(MachineError::NoContinuesLeft));

        driver.abandon().await;
        assert_eq!(store.coins.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frozen_phases_are_drawn() {
        let (driver, surface) = driver();
        driver.start(GameStart::Free).await.unwrap();
        sleep_ms(150).await;
        assert_eq!(surface.last_tone(), Some(SnakeTone::Alive));

        driver.on_pause_toggle().await.unwrap();
        assert_eq!(surface.last_tone(), Some(SnakeTone::Paused));
        driver.abandon().await;

        driver.start(GameStart::Campaign { level: 1 }).await.unwrap();
        sleep_ms(80 * 10 + 40).await;
        assert_eq!(surface.last_tone(), Some(SnakeTone::Dead));

        driver.watch_ad().await.unwrap();
        assert_eq!(surface.last_tone(), Some(SnakeTone::Respawning));
        sleep_ms(3100).await;
        assert_eq!(surface.last_tone(), Some(SnakeTone::Alive));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pause_snapshot_survives_concurrent_ticks() {
        let config = GameConfig {
            speed: SpeedConfig { base_interval_ms: 1, min_interval_ms: 1, points_per_ms: 10 },
            ..GameConfig::default()
        };
        let (driver, _) = driver_with(config, None);
        driver.start(GameStart::Free).await.unwrap();

        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(2)).await;
            match driver.on_pause_toggle().await {
                Ok(GamePhase::Paused) => {}
                _ => break,
            }
            tokio::time::sleep(Duration::from_millis(3)).await;
            assert_eq!(driver.snapshot().phase, GamePhase::Paused);
            assert_eq!(driver.on_pause_toggle().await.unwrap(), GamePhase::Playing);
        }
    }
}
