use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CELL_SIZE, GHOST_AGGRESSION, GHOST_BASE_SPEED, PACMAN_BASE_SPEED, PATH_WORKERS,
    REPATH_DISTANCE, SCATTER_DURATION_MS, TICK_MS,
};
use crate::goals::GoalPolicy;
use crate::types::HeuristicMode;

/// Goal policies for one ghost, matched to ghost spawns by index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GhostProfile {
    pub chase: Vec<GoalPolicy>,
    pub scatter: Vec<GoalPolicy>,
    #[serde(default)]
    pub heuristic: HeuristicMode,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub cell_size: i32,
    /// Side of the square collision box of every agent; defaults to the cell size.
    pub entity_size: Option<f32>,
    pub pacman_speed: f32,
    pub ghost_speed: f32,
    pub ghost_aggression: usize,
    pub repath_distance: f32,
    pub scatter_duration_ms: u64,
    pub path_workers: usize,
    pub tick_ms: u64,
    /// Random goals are sampled inside this area; defaults to the layout size.
    pub screen: Option<(f32, f32)>,
    pub ghosts: Vec<GhostProfile>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            entity_size: None,
            pacman_speed: PACMAN_BASE_SPEED,
            ghost_speed: GHOST_BASE_SPEED,
            ghost_aggression: GHOST_AGGRESSION,
            repath_distance: REPATH_DISTANCE,
            scatter_duration_ms: SCATTER_DURATION_MS,
            path_workers: PATH_WORKERS,
            tick_ms: TICK_MS,
            screen: None,
            ghosts: default_ghost_profiles(),
        }
    }
}

pub fn default_ghost_profiles() -> Vec<GhostProfile> {
    vec![
        GhostProfile {
            chase: vec![GoalPolicy::ToPacman],
            scatter: vec![GoalPolicy::ToRandom],
            heuristic: HeuristicMode::Closest,
        },
        GhostProfile {
            chase: vec![GoalPolicy::UnitsAwayPacman { units: 40.0 }],
            scatter: vec![GoalPolicy::ToRandom],
            heuristic: HeuristicMode::Closest,
        },
        GhostProfile {
            chase: vec![GoalPolicy::ToPacman, GoalPolicy::ToRandom],
            scatter: vec![GoalPolicy::ToRandom],
            heuristic: HeuristicMode::Farthest,
        },
        GhostProfile {
            chase: vec![GoalPolicy::UnitsAwayPacman { units: 80.0 }, GoalPolicy::ToPacman],
            scatter: vec![GoalPolicy::ToPoint { x: 10.0, y: 10.0 }, GoalPolicy::ToRandom],
            heuristic: HeuristicMode::Closest,
        },
    ]
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config {}: {source}", path.display())
            }
            ConfigError::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl GameConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: GameConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cell_size <= 0 {
            return Err(ConfigError::Invalid("cell_size must be positive".to_string()));
        }
        if self.entity_size.is_some_and(|size| size <= 0.0) {
            return Err(ConfigError::Invalid("entity_size must be positive".to_string()));
        }
        if self.pacman_speed <= 0.0 || self.ghost_speed <= 0.0 {
            return Err(ConfigError::Invalid("speeds must be positive".to_string()));
        }
        if self.path_workers == 0 {
            return Err(ConfigError::Invalid("path_workers must be at least 1".to_string()));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be positive".to_string()));
        }
        for (index, ghost) in self.ghosts.iter().enumerate() {
            if ghost.chase.is_empty() || ghost.scatter.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "ghost {index} needs at least one chase and one scatter policy"
                )));
            }
        }
        Ok(())
    }

    pub fn entity_size(&self) -> f32 {
        self.entity_size.unwrap_or(self.cell_size as f32)
    }
}
