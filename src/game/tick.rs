//! Authoritative Movement Tick
//!
//! One discrete simulation step. Order is fixed: direction apply, move,
//! collision, bonus/food resolution, score/coin update, completion check.
//! Everything here is synchronous and deterministic given the session RNG.

use serde::{Serialize, Deserialize};

use crate::core::grid::{Cell, Direction};
use crate::game::collision::{check_head, Collision};
use crate::game::events::{GameEvent, GameEventData, PlacedItem};
use crate::game::food::{maybe_spawn_bonus, BonusConfig, PlacementConfig};
use crate::game::input::InputLog;
use crate::game::level::Level;
use crate::game::machine::ContinueConfig;
use crate::game::state::{GameMode, Session, SessionId};

/// Free-mode speed curve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Interval at score 0, in milliseconds
    pub base_interval_ms: u64,
    /// Floor of the interval, in milliseconds
    pub min_interval_ms: u64,
    /// Points needed per 1 ms of speed-up
    pub points_per_ms: u32,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 100,
            min_interval_ms: 50,
            points_per_ms: 10,
        }
    }
}

impl SpeedConfig {
    /// Free-mode tick interval for a score.
    pub fn interval_for(&self, score: u32) -> u64 {
        let speedup = (score / self.points_per_ms.max(1)) as u64;
        self.base_interval_ms
            .saturating_sub(speedup)
            .max(self.min_interval_ms)
    }
}

/// Configuration for session simulation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Snake length at spawn and after a continue
    pub initial_length: usize,
    /// Free-mode speed curve
    pub speed: SpeedConfig,
    /// Placement retry budget
    pub placement: PlacementConfig,
    /// Bonus food rules
    pub bonus: BonusConfig,
    /// Continue rules
    pub continues: ContinueConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_length: 3,
            speed: SpeedConfig::default(),
            placement: PlacementConfig::default(),
            bonus: BonusConfig::default(),
            continues: ContinueConfig::default(),
        }
    }
}

/// What a tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Move committed
    Moved,
    /// Fatal collision; the snake was left unmodified
    Collided(Collision),
    /// Move committed and the campaign target was reached this tick
    TargetReached,
}

/// Run one movement tick.
///
/// # Determinism
///
/// All randomness comes from `session.rng`; nothing reads the clock.
pub fn movement_tick(session: &mut Session, config: &GameConfig) -> TickOutcome {
    // 0. Advance tick counter
    session.tick += 1;

    // 1. Apply direction (consumed exactly once)
    let previous = session.input.current();
    let direction = session.input.consume();
    if direction != previous {
        session.input_log.record(session.tick, direction);
    }

    // 2. Compute head
    let topology = session.topology();
    let head = topology.resolve(session.snake.head().step(direction));
    let growing = topology.normalize(head) == topology.normalize(session.food);

    // 3. Collision, before commit
    if let Some(collision) = check_head(topology, &session.snake, &session.obstacles, head, growing) {
        tracing::debug!("Tick {}: {:?} collision at {:?}", session.tick, collision, head);
        session.push_event(GameEvent::new(
            session.tick,
            GameEventData::SnakeCollided { collision, head },
        ));
        return TickOutcome::Collided(collision);
    }

    // 4. Commit move
    session.snake.advance(head, growing);
    session.survival_ms += session.tick_interval_ms;

    // 5. Bonus food
    resolve_bonus(session, head);

    // 6. Normal food
    if growing {
        eat_food(session, head, config);
    }

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(
        "Tick {}: head {:?} len {} score {} coins {}",
        session.tick, head, session.snake.len(), session.score, session.coins
    );

    // 7. Completion check
    if growing && session.target_reached() {
        return TickOutcome::TargetReached;
    }

    TickOutcome::Moved
}

/// Eat or count down the bonus food present at the start of this tick.
fn resolve_bonus(session: &mut Session, head: Cell) {
    let Some(mut bonus) = session.bonus.take() else {
        return;
    };
    let topology = session.topology();

    if topology.normalize(head) == topology.normalize(bonus.cell) {
        session.coins += bonus.value;
        tracing::debug!("Tick {}: bonus worth {} eaten", session.tick, bonus.value);
        session.push_event(GameEvent::new(
            session.tick,
            GameEventData::BonusEaten { cell: bonus.cell, value: bonus.value },
        ));
    } else if bonus.countdown() {
        tracing::debug!("Tick {}: bonus at {:?} expired", session.tick, bonus.cell);
        session.push_event(GameEvent::new(
            session.tick,
            GameEventData::BonusExpired { cell: bonus.cell },
        ));
    } else {
        session.bonus = Some(bonus);
    }
}

/// Score normal food, respawn it and roll for a bonus.
fn eat_food(session: &mut Session, head: Cell, config: &GameConfig) {
    session.score += 1;
    session.coins += 1;
    session.food_eaten += 1;
    session.push_event(GameEvent::food_eaten(session.tick, head, session.score, session.coins));

    session.respawn_food(config);

    if session.bonus.is_none() {
        let spawned = maybe_spawn_bonus(
            &mut session.rng,
            &session.snake,
            &session.obstacles,
            session.food,
            &config.placement,
            &config.bonus,
        );
        if let Some((bonus, fallback)) = spawned {
            tracing::debug!("Tick {}: bonus worth {} at {:?}", session.tick, bonus.value, bonus.cell);
            if fallback {
                tracing::warn!("Bonus placement fell back to {:?} after exhausting attempts", bonus.cell);
                session.push_event(GameEvent::new(
                    session.tick,
                    GameEventData::PlacementFallback { item: PlacedItem::Bonus, cell: bonus.cell },
                ));
            }
            session.push_event(GameEvent::new(
                session.tick,
                GameEventData::BonusSpawned {
                    cell: bonus.cell,
                    value: bonus.value,
                    lifetime_ticks: bonus.remaining_ticks,
                },
            ));
            session.bonus = Some(bonus);
        }
    }

    if session.mode == GameMode::Free {
        let interval = config.speed.interval_for(session.score);
        if interval != session.tick_interval_ms {
            session.tick_interval_ms = interval;
            tracing::debug!("Tick {}: interval now {}ms", session.tick, interval);
            session.push_event(GameEvent::new(
                session.tick,
                GameEventData::SpeedChanged { tick_interval_ms: interval },
            ));
        }
    }
}

/// Re-simulate a run from its seed and input log.
///
/// Stops at the first collision or at the campaign target, or after
/// `max_ticks`. Runs that used a continue cannot be replayed this way, the
/// respawn resets the snake outside the log.
pub fn replay_run(
    id: SessionId,
    mode: GameMode,
    level: Option<&Level>,
    rng_seed: u64,
    log: &InputLog,
    config: &GameConfig,
    max_ticks: u32,
) -> Session {
    let mut session = Session::new(id, mode, level, config, rng_seed);

    for _ in 0..max_ticks {
        if let Some(direction) = log.change_at(session.tick + 1) {
            request_direction(&mut session, direction);
        }
        match movement_tick(&mut session, config) {
            TickOutcome::Moved => {}
            TickOutcome::Collided(_) | TickOutcome::TargetReached => break,
        }
    }

    session
}

fn request_direction(session: &mut Session, direction: Direction) {
    if !session.input.request(direction) {
        tracing::warn!("Replay input {:?} at tick {} rejected", direction, session.tick + 1);
    }
}

// =============================================================================
// TESTS
// =============================================================================
