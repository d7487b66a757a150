//! Campaign Level Catalog
//!
//! The fixed, ordered table of campaign levels and its JSON loader.
//! Levels are immutable once loaded and shared between sessions behind an `Arc`.

use std::path::Path;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::grid::{Cell, Rect};

/// Cells that must stay free of obstacles on every level: the spawn body
/// plus a short runway ahead of the head.
pub const SPAWN_CLEARANCE: Rect = Rect::new(5, 10, 10, 1);

// =============================================================================
// TAGS
// =============================================================================

/// Behaviour tag on an obstacle. Carried as data only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    /// Declared as moving
    Moving,
    /// Declared as electric
    Electric,
    /// Declared as rotating
    Rotating,
    /// Declared as teleporting
    Teleporting,
}

/// Special mechanic label on a level. Carried as data only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpecialMechanic {
    /// Obstacles declared as moving
    MovingObstacles,
    /// Walls declared as electric
    ElectricWalls,
    /// Reduced visibility
    Darkness,
    /// Obstacles declared as rotating
    RotatingObstacles,
    /// Fog over unexplored cells
    FogOfWar,
    /// Obstacles declared as teleporting
    TeleportingObstacles,
    /// Hostile snakes
    EnemySnakes,
    /// Harmful food items
    PoisonousFood,
}

/// Power-up label on a level. Carried as data only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUp {
    /// Survive one hit
    Shield,
    /// Light in darkness
    Flashlight,
    /// Slower ticks
    SlowMotion,
    /// Pulls food closer
    Magnet,
    /// Faster ticks
    SpeedBoost,
    /// Cures poison
    Antidote,
}

// =============================================================================
// OBSTACLE
// =============================================================================

/// A rectangular obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Obstacle {
    /// Covered cells
    #[serde(flatten)]
    pub rect: Rect,

    /// Optional behaviour tag
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ObstacleKind>,
}

impl Obstacle {
    /// Plain static block.
    pub const fn block(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { rect: Rect::new(x, y, width, height), kind: None }
    }

    /// Block carrying a behaviour tag.
    pub const fn tagged(x: i32, y: i32, width: i32, height: i32, kind: ObstacleKind) -> Self {
        Self { rect: Rect::new(x, y, width, height), kind: Some(kind) }
    }

    /// Check if a cell is covered.
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        self.rect.contains(cell)
    }
}

// =============================================================================
// LEVEL
// =============================================================================

/// One campaign level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    /// Level number, 1-based
    pub id: u8,

    /// Display name
    pub name: String,

    /// Obstacle layout
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,

    /// Score that completes the level (reached by exact equality)
    pub target_score: u32,

    /// Movement tick interval in milliseconds
    #[serde(rename = "speed")]
    pub tick_interval_ms: u64,

    /// Coins awarded on completion
    pub coin_reward: u32,

    /// Extra coins awarded on completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_coin: Option<u32>,

    /// Declared time limit in seconds (not enforced)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,

    /// Declared mechanics (not enforced)
    #[serde(default)]
    pub special_mechanics: Vec<SpecialMechanic>,

    /// Declared power-ups (not enforced)
    #[serde(default)]
    pub power_ups: Vec<PowerUp>,
}

impl Level {
    fn new(id: u8, name: &str, target_score: u32, tick_interval_ms: u64, coin_reward: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            obstacles: Vec::new(),
            target_score,
            tick_interval_ms,
            coin_reward,
            bonus_coin: None,
            time_limit: None,
            special_mechanics: Vec::new(),
            power_ups: Vec::new(),
        }
    }

    fn obstacles(mut self, obstacles: &[Obstacle]) -> Self {
        self.obstacles = obstacles.to_vec();
        self
    }

    fn bonus(mut self, coins: u32) -> Self {
        self.bonus_coin = Some(coins);
        self
    }

    fn timed(mut self, seconds: u32) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    fn mechanics(mut self, mechanics: &[SpecialMechanic]) -> Self {
        self.special_mechanics = mechanics.to_vec();
        self
    }

    fn power_ups(mut self, power_ups: &[PowerUp]) -> Self {
        self.power_ups = power_ups.to_vec();
        self
    }

    /// Total coins paid on completion.
    #[inline]
    pub fn completion_coins(&self) -> u32 {
        self.coin_reward + self.bonus_coin.unwrap_or(0)
    }

    /// Check if any obstacle covers the cell.
    pub fn is_blocked(&self, cell: Cell) -> bool {
        self.obstacles.iter().any(|o| o.contains(cell))
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidLevel { id: self.id, reason };

        if self.target_score == 0 {
            return Err(invalid("target score must be positive".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(invalid("speed must be positive".into()));
        }
        for (i, obstacle) in self.obstacles.iter().enumerate() {
            if !obstacle.rect.fits_grid() {
                return Err(invalid(format!("obstacle {} leaves the grid", i)));
            }
            if SPAWN_CLEARANCE.cells().any(|c| obstacle.contains(c)) {
                return Err(invalid(format!("obstacle {} blocks the spawn lane", i)));
            }
        }
        Ok(())
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Catalog loading errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Catalog file could not be read.
    #[error("failed to read level catalog {path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Catalog is not valid JSON for the level schema.
    #[error("failed to parse level catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// Catalog holds no levels.
    #[error("level catalog is empty")]
    Empty,

    /// Level ids must run 1, 2, 3, ...
    #[error("expected level id {expected}, found {found}")]
    NonContiguousIds {
        /// Id expected at this position
        expected: u8,
        /// Id found
        found: u8,
    },

    /// A level failed validation.
    #[error("level {id} is invalid: {reason}")]
    InvalidLevel {
        /// Offending level
        id: u8,
        /// What is wrong
        reason: String,
    },
}

/// Ordered, validated level table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LevelCatalog {
    levels: Vec<Level>,
}

impl LevelCatalog {
    /// Build a catalog from levels, validating ids and layouts.
    pub fn new(levels: Vec<Level>) -> Result<Self, CatalogError> {
        if levels.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (i, level) in levels.iter().enumerate() {
            let expected = (i + 1) as u8;
            if level.id != expected {
                return Err(CatalogError::NonContiguousIds { expected, found: level.id });
            }
            level.validate()?;
        }
        Ok(Self { levels })
    }

    /// Parse a catalog from a JSON array of levels.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let levels: Vec<Level> = serde_json::from_str(json)?;
        Self::new(levels)
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The built-in 20-level campaign.
    pub fn builtin() -> Self {
        Self { levels: builtin_levels() }
    }

    /// Get a level by id.
    pub fn get(&self, id: u8) -> Option<&Level> {
        if id == 0 {
            return None;
        }
        self.levels.get(id as usize - 1)
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Catalogs are never empty; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Id of the last level.
    pub fn final_level(&self) -> u8 {
        self.levels.len() as u8
    }

    /// Iterate levels in order.
    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }
}

impl Default for LevelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_levels() -> Vec<Level> {
    use ObstacleKind::*;
    use PowerUp as P;
    use SpecialMechanic as M;

    let b = Obstacle::block;
    let t = Obstacle::tagged;

    vec![
        Level::new(1, "First Steps", 10, 80, 10),
        Level::new(2, "Pillars", 12, 78, 12)
            .obstacles(&[b(4, 4, 2, 2), b(14, 4, 2, 2), b(4, 14, 2, 2), b(14, 14, 2, 2)]),
        Level::new(3, "Crossbars", 14, 76, 15)
            .obstacles(&[b(5, 5, 10, 1), b(5, 15, 10, 1)]),
        Level::new(4, "Side Walls", 15, 74, 18)
            .obstacles(&[b(2, 3, 1, 14), b(17, 3, 1, 14)])
            .bonus(5),
        Level::new(5, "Corners", 16, 72, 20)
            .obstacles(&[
                b(2, 2, 4, 1), b(2, 2, 1, 4),
                b(14, 2, 4, 1), b(17, 2, 1, 4),
                b(2, 17, 4, 1), b(2, 14, 1, 4),
                b(14, 17, 4, 1), b(17, 14, 1, 4),
            ]),
        Level::new(6, "The Gate", 18, 70, 22)
            .obstacles(&[b(9, 0, 2, 8), b(9, 12, 2, 8)])
            .timed(120),
        Level::new(7, "Moving Blocks", 20, 68, 25)
            .obstacles(&[t(6, 4, 2, 2, Moving), t(12, 14, 2, 2, Moving), b(3, 7, 1, 1), b(16, 12, 1, 1)])
            .mechanics(&[M::MovingObstacles]),
        Level::new(8, "Maze Lite", 20, 66, 28)
            .obstacles(&[
                b(3, 3, 6, 1), b(11, 3, 6, 1),
                b(3, 16, 6, 1), b(11, 16, 6, 1),
                b(3, 4, 1, 4), b(16, 12, 1, 4),
            ])
            .bonus(10),
        Level::new(9, "Electric Fence", 22, 64, 30)
            .obstacles(&[t(0, 6, 8, 1, Electric), t(12, 13, 8, 1, Electric)])
            .mechanics(&[M::ElectricWalls])
            .power_ups(&[P::Shield]),
        Level::new(10, "Halfway", 24, 62, 40)
            .obstacles(&[b(4, 4, 12, 1), b(4, 15, 12, 1), b(4, 5, 1, 3), b(15, 12, 1, 3)])
            .bonus(20)
            .timed(150),
        Level::new(11, "Darkness", 25, 60, 35)
            .obstacles(&[b(7, 2, 6, 1), b(7, 17, 6, 1), b(2, 7, 1, 6), b(17, 7, 1, 6)])
            .mechanics(&[M::Darkness])
            .power_ups(&[P::Flashlight]),
        Level::new(12, "Spiral", 26, 58, 38)
            .obstacles(&[b(3, 3, 14, 1), b(16, 4, 1, 12), b(5, 15, 12, 1), b(3, 5, 1, 12)]),
        Level::new(13, "Rotating Bars", 28, 56, 40)
            .obstacles(&[t(4, 6, 5, 1, Rotating), t(11, 13, 5, 1, Rotating)])
            .mechanics(&[M::RotatingObstacles])
            .power_ups(&[P::SlowMotion]),
        Level::new(14, "Fog", 30, 54, 45)
            .obstacles(&[
                b(5, 2, 1, 5), b(14, 2, 1, 5),
                b(5, 13, 1, 5), b(14, 13, 1, 5),
                b(9, 4, 2, 2), b(9, 14, 2, 2),
            ])
            .mechanics(&[M::FogOfWar])
            .timed(180),
        Level::new(15, "Teleport Maze", 30, 52, 50)
            .obstacles(&[
                t(2, 5, 5, 1, Teleporting), t(13, 5, 5, 1, Teleporting),
                t(2, 14, 5, 1, Teleporting), t(13, 14, 5, 1, Teleporting),
            ])
            .mechanics(&[M::TeleportingObstacles])
            .power_ups(&[P::Magnet])
            .bonus(25),
        Level::new(16, "Hunters", 32, 50, 55)
            .obstacles(&[b(8, 3, 4, 2), b(8, 15, 4, 2), b(3, 8, 2, 1), b(15, 11, 2, 1)])
            .mechanics(&[M::EnemySnakes])
            .power_ups(&[P::Shield, P::SpeedBoost]),
        Level::new(17, "Poison Garden", 34, 48, 60)
            .obstacles(&[
                b(3, 3, 3, 3), b(14, 3, 3, 3),
                b(3, 14, 3, 3), b(14, 14, 3, 3),
                b(9, 6, 2, 2),
            ])
            .mechanics(&[M::PoisonousFood])
            .power_ups(&[P::Antidote]),
        Level::new(18, "Labyrinth", 35, 46, 65)
            .obstacles(&[
                b(2, 2, 16, 1), b(2, 17, 16, 1),
                b(2, 3, 1, 5), b(17, 12, 1, 5),
                b(6, 6, 8, 1), b(6, 13, 8, 1),
            ])
            .mechanics(&[M::MovingObstacles, M::Darkness])
            .timed(200),
        Level::new(19, "Storm", 38, 44, 70)
            .obstacles(&[
                t(1, 4, 6, 1, Electric), t(13, 4, 6, 1, Electric),
                t(1, 15, 6, 1, Electric), t(13, 15, 6, 1, Electric),
                t(9, 1, 2, 5, Rotating), t(9, 14, 2, 5, Rotating),
            ])
            .mechanics(&[M::ElectricWalls, M::RotatingObstacles, M::FogOfWar])
            .bonus(30),
        Level::new(20, "Final Serpent", 40, 42, 100)
            .obstacles(&[
                b(0, 0, 20, 1), b(0, 19, 20, 1),
                b(0, 1, 1, 18), b(19, 1, 1, 18),
                b(5, 5, 3, 3), b(12, 5, 3, 3),
                b(5, 12, 3, 3), b(12, 12, 3, 3),
            ])
            .mechanics(&[M::EnemySnakes, M::TeleportingObstacles, M::Darkness])
            .power_ups(&[P::Shield, P::SlowMotion, P::Magnet])
            .bonus(50)
            .timed(300),
    ]
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = LevelCatalog::builtin();
        assert_eq!(catalog.len(), 20);
        assert_eq!(catalog.final_level(), 20);

        let rebuilt = LevelCatalog::new(catalog.iter().cloned().collect());
        assert!(rebuilt.is_ok(), "built-in catalog must pass validation: {:?}", rebuilt.err());
    }

    #[test]
    fn test_first_level() {
        let catalog = LevelCatalog::builtin();
        let level = catalog.get(1).unwrap();

        assert!(level.obstacles.is_empty());
        assert_eq!(level.target_score, 10);
        assert_eq!(level.tick_interval_ms, 80);
        assert_eq!(level.coin_reward, 10);
        assert_eq!(level.completion_coins(), 10);
    }

    #[test]
    fn test_get_out_of_range() {
        let catalog = LevelCatalog::builtin();
        assert!(catalog.get(0).is_none());
        assert!(catalog.get(21).is_none());
        assert_eq!(catalog.get(20).unwrap().name, "Final Serpent");
    }

    #[test]
    fn test_speeds_never_slow_down() {
        let catalog = LevelCatalog::builtin();
        let speeds: Vec<u64> = catalog.iter().map(|l| l.tick_interval_ms).collect();
        assert!(speeds.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_json_round_trip() {
        let catalog = LevelCatalog::builtin();
        let json = serde_json::to_string(&catalog.iter().collect::<Vec<_>>()).unwrap();

        let loaded = LevelCatalog::from_json(&json).unwrap();
        assert_eq!(loaded, catalog);
        assert!(json.contains("\"targetScore\""));
        assert!(json.contains("\"type\":\"electric\""));
    }

    #[test]
    fn test_json_minimal_level() {
        let json = r#"[{"id":1,"name":"Tiny","targetScore":3,"speed":90,"coinReward":2,
                        "obstacles":[{"x":0,"y":0,"width":2,"height":2}]}]"#;
        let catalog = LevelCatalog::from_json(json).unwrap();
        let level = catalog.get(1).unwrap();

        assert_eq!(level.obstacles.len(), 1);
        assert_eq!(level.obstacles[0].kind, None);
        assert!(level.special_mechanics.is_empty());
        assert_eq!(level.bonus_coin, None);
    }

    #[test]
    fn test_rejects_empty_and_gaps() {
        assert!(matches!(LevelCatalog::from_json("[]"), Err(CatalogError::Empty)));

        let json = r#"[{"id":2,"name":"Gap","targetScore":3,"speed":90,"coinReward":2}]"#;
        assert!(matches!(
            LevelCatalog::from_json(json),
            Err(CatalogError::NonContiguousIds { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn test_rejects_blocked_spawn() {
        let json = r#"[{"id":1,"name":"Blocked","targetScore":3,"speed":90,"coinReward":2,
                        "obstacles":[{"x":10,"y":10,"width":1,"height":1}]}]"#;
        assert!(matches!(
            LevelCatalog::from_json(json),
            Err(CatalogError::InvalidLevel { id: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_obstacle_off_grid() {
        let json = r#"[{"id":1,"name":"Off","targetScore":3,"speed":90,"coinReward":2,
                        "obstacles":[{"x":18,"y":0,"width":5,"height":1}]}]"#;
        assert!(matches!(
            LevelCatalog::from_json(json),
            Err(CatalogError::InvalidLevel { id: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(LevelCatalog::from_json("{"), Err(CatalogError::Parse(_))));
    }
}
