pub const TICK_RATE: u32 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const DEFAULT_CELL_SIZE: i32 = 10;
pub const PACMAN_BASE_SPEED: f32 = 1.0;
pub const GHOST_BASE_SPEED: f32 = 1.0;
pub const SCATTER_DURATION_MS: u64 = 8_000;
pub const GHOST_AGGRESSION: usize = 5;
pub const REPATH_DISTANCE: f32 = 30.0;
pub const PATH_WORKERS: usize = 4;

pub const POINT_SCORE: u32 = 10;
pub const GHOST_SCORE: u32 = 200;

/// Depth of the reduced-speed retries after a blocked step.
pub const ADVANCE_RETRY_DEPTH: u32 = 4;
pub const FALLBACK_SPEED: f32 = 1.0;

pub const UNITS_AWAY_THETA_STEP: f32 = 0.15;
pub const MAX_RANDOM_SAMPLES: usize = 10_000;

/// Number of upcoming waypoints a ghost may skip to when both axes tie.
pub const TIE_LOOKAHEAD: usize = 3;
