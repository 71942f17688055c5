use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn manhattan(self, other: Point) -> f32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// A navigation graph node. Coordinates are in position units and always a
/// multiple of the graph's cell size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_point(self) -> Point {
        Point::new(self.x as f32, self.y as f32)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn delta(self) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
            Direction::None => (0.0, 0.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Chase,
    Scatter,
}

/// Sign of the Manhattan heuristic used by the path search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicMode {
    #[default]
    Closest,
    Farthest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionLayer {
    Pacman,
    Ghost,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    pub width: f32,
    pub height: f32,
}

impl Hitbox {
    pub const fn square(size: f32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }

    /// Strict overlap of two boxes placed with their top-left corners at `a` and `b`.
    pub fn overlaps(self, a: Point, other: Hitbox, b: Point) -> bool {
        a.x < b.x + other.width
            && b.x < a.x + self.width
            && a.y < b.y + other.height
            && b.y < a.y + self.height
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    Caught,
    Cleared,
}

#[derive(Clone, Debug, Serialize)]
pub struct PacmanView {
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
    pub moving: bool,
    /// Time since the current uninterrupted run began; 0 while stalled.
    #[serde(rename = "movingMs")]
    pub moving_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub id: usize,
    pub x: f32,
    pub y: f32,
    pub dir: Direction,
    #[serde(rename = "movingMs")]
    pub moving_ms: u64,
    #[serde(rename = "pathLen")]
    pub path_len: usize,
    pub searching: bool,
    pub path: Vec<Point>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    PointEaten {
        x: f32,
        y: f32,
    },
    ScatterEaten {
        x: f32,
        y: f32,
    },
    ModeChanged {
        mode: Mode,
    },
    PathRequested {
        #[serde(rename = "ghostId")]
        ghost_id: usize,
        #[serde(rename = "requestId")]
        request_id: u64,
        mode: Mode,
        target: Point,
    },
    PathAdopted {
        #[serde(rename = "ghostId")]
        ghost_id: usize,
        #[serde(rename = "requestId")]
        request_id: u64,
        len: usize,
    },
    GhostReset {
        #[serde(rename = "ghostId")]
        ghost_id: usize,
    },
    GameOver {
        reason: GameOverReason,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub mode: Mode,
    #[serde(rename = "scatterProgress")]
    pub scatter_progress: f32,
    pub score: u32,
    pub pacman: PacmanView,
    pub ghosts: Vec<GhostView>,
    #[serde(rename = "scatterTriggers")]
    pub scatter_triggers: Vec<Point>,
    #[serde(rename = "pointsLeft")]
    pub points_left: usize,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSummary {
    pub reason: Option<GameOverReason>,
    pub ticks: u64,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub score: u32,
    #[serde(rename = "pointsEaten")]
    pub points_eaten: u32,
    #[serde(rename = "ghostsReset")]
    pub ghosts_reset: u32,
    #[serde(rename = "scatterCount")]
    pub scatter_count: u32,
}
