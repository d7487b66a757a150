//! Snake Engine demo
//!
//! Plays the campaign headless with a greedy autopilot, verifies each clean
//! level by replay, then runs a short free-mode session on real timers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use snake_engine::{
    VERSION, GRID_COUNT,
    config::EngineConfig,
    core::grid::{Cell, Direction},
    game::{
        collision::check_head,
        events::GameEventData,
        level::LevelCatalog,
        machine::{GameMachine, GameStart},
        reward::{CurrencyStore, ProgressKind, ProgressTracker, RewardCalculator},
        state::{GameMode, GamePhase, RenderSnapshot, Session},
        tick::{replay_run, TickOutcome},
    },
    runtime::{GameDriver, RenderSurface},
};

/// Upper bound on ticks for the headless campaign.
const MAX_DEMO_TICKS: u32 = 50_000;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Snake Engine v{}", VERSION);
    info!("Grid: {}x{}", GRID_COUNT, GRID_COUNT);

    let config = EngineConfig::from_env().context("Failed to load engine config")?;
    let catalog = Arc::new(config.load_catalog().context("Failed to load level catalog")?);
    info!("Loaded {} campaign levels", catalog.len());

    let rewards = RewardCalculator::new(
        Arc::new(LogStore),
        Arc::new(LogTracker),
        config.rewards.clone(),
    );

    demo_campaign(&config, Arc::clone(&catalog), &rewards)?;
    demo_driver(&config, catalog, rewards).await?;

    Ok(())
}

// =============================================================================
// HEADLESS CAMPAIGN
// =============================================================================

fn demo_campaign(config: &EngineConfig, catalog: Arc<LevelCatalog>, rewards: &RewardCalculator) -> Result<()> {
    info!("=== Starting Demo Campaign ===");

    let run_id = [1u8; 16];
    let mut machine = GameMachine::with_run_id(Arc::clone(&catalog), config.game.clone(), run_id);
    machine.start(GameStart::Campaign { level: 1 })?;
    info!("Run ID: {}", hex::encode(run_id));

    let mut continued = false;
    let mut verified = 0;

    for _ in 0..MAX_DEMO_TICKS {
        let Some(session) = machine.session() else {
            break;
        };
        let direction = autopilot(session);
        machine.on_direction(direction);

        let outcome = machine.movement_tick()?;
        let events = machine.take_events();
        rewards.publish(&events);
        for event in &events {
            if let GameEventData::BonusEaten { value, .. } = event.data {
                debug!("Bonus worth {} collected", value);
            }
        }

        match outcome {
            TickOutcome::Moved => {}
            TickOutcome::TargetReached => {
                if let Some(session) = machine.session() {
                    if !continued {
                        verify_replay(session, &catalog, config)?;
                        verified += 1;
                    }
                    info!("Level {:?} hash: {}", session.level, hex::encode(session.compute_hash()));
                }
                continued = false;
                if machine.advance_level()? == GamePhase::Menu {
                    break;
                }
            }
            TickOutcome::Collided(collision) => {
                info!("Autopilot crashed: {:?}", collision);
                match machine.watch_ad() {
                    Ok(duration) => {
                        info!("Watching a {}ms ad to continue", duration.as_millis());
                        machine.finish_ad()?;
                        continued = true;
                    }
                    Err(e) => {
                        info!("Run over: {}", e);
                        break;
                    }
                }
            }
        }
    }

    rewards.publish(&machine.take_events());
    info!("=== Campaign Results ===");
    info!("Final phase: {:?}", machine.phase());
    if let Some(session) = machine.session() {
        info!("Stopped on level {:?} with score {}", session.level, session.score);
    }
    info!("Levels verified by replay: {}", verified);
    Ok(())
}

/// Replay a finished level from its seed and input log and compare hashes.
fn verify_replay(session: &Session, catalog: &LevelCatalog, config: &EngineConfig) -> Result<()> {
    let level = session.level.and_then(|id| catalog.get(id));
    let replayed = replay_run(
        session.id,
        GameMode::Campaign,
        level,
        session.rng_seed,
        &session.input_log,
        &config.game,
        session.tick,
    );

    let hash = session.compute_hash();
    let replay_hash = replayed.compute_hash();
    if hash != replay_hash {
        bail!(
            "Determinism failure on level {:?}: {} != {}",
            session.level,
            hex::encode(hash),
            hex::encode(replay_hash)
        );
    }
    debug!("Level {:?} replay verified ({} direction changes)", session.level, session.input_log.len());
    Ok(())
}

/// Greedy autopilot: the safe direction that gets closest to the food.
fn autopilot(session: &Session) -> Direction {
    let topology = session.topology();
    let head = session.snake.head();
    let current = session.input.current();

    Direction::ALL
        .into_iter()
        .filter(|d| !d.is_opposite(current))
        .filter_map(|d| {
            let next = topology.resolve(head.step(d));
            let growing = next == session.food;
            check_head(topology, &session.snake, &session.obstacles, next, growing)
                .is_none()
                .then(|| (distance(next, session.food), d))
        })
        .min_by_key(|(dist, d)| (*dist, *d != current))
        .map(|(_, d)| d)
        .unwrap_or(current)
}

fn distance(a: Cell, b: Cell) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

// =============================================================================
// TIMED FREE MODE
// =============================================================================

async fn demo_driver(config: &EngineConfig, catalog: Arc<LevelCatalog>, rewards: RewardCalculator) -> Result<()> {
    info!("=== Starting Timed Free Run ===");

    let machine = GameMachine::new(catalog, config.game.clone());
    let driver = GameDriver::new(
        machine,
        Arc::new(LogSurface),
        config.scheduler.clone(),
        Some(rewards),
    );

    driver.start(GameStart::Free).await?;
    for direction in [Direction::Up, Direction::Left, Direction::Down, Direction::Right] {
        tokio::time::sleep(Duration::from_millis(400)).await;
        if !driver.on_direction(direction).await {
            warn!("Turn {:?} rejected", direction);
        }
    }

    let snapshot = driver.snapshot();
    info!(
        "After {} ticks: length {}, score {}, phase {:?}",
        snapshot.tick,
        snapshot.snake.len(),
        snapshot.score,
        snapshot.phase
    );

    driver.abandon().await;
    info!("Timed run abandoned, timers running: {}", driver.is_running());
    Ok(())
}

// =============================================================================
// LOGGING COLLABORATORS
// =============================================================================

struct LogStore;

impl CurrencyStore for LogStore {
    fn apply_coin_delta(&self, amount: u64) {
        info!("Coins +{}", amount);
    }

    fn set_high_score_if_greater(&self, mode: GameMode, score: u32) {
        info!("High score candidate ({:?}): {}", mode, score);
    }

    fn add_to_total_score(&self, amount: u64) {
        info!("Total score +{}", amount);
    }
}

struct LogTracker;

impl ProgressTracker for LogTracker {
    fn report_progress(&self, kind: ProgressKind, amount: u64) {
        debug!("Progress {:?} +{}", kind, amount);
    }
}

struct LogSurface;

impl RenderSurface for LogSurface {
    fn draw(&self, snapshot: &RenderSnapshot) {
        if let Some(head) = snapshot.snake.first() {
            tracing::trace!("Frame: head {:?} tone {:?} score {}", head, snapshot.tone, snapshot.score);
        }
    }
}
