use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use maze_chase::board::Board;
use maze_chase::config::GameConfig;
use maze_chase::layout::{BoardLayout, DEFAULT_LAYOUT};
use maze_chase::logging::{emit_event, emit_log};
use maze_chase::motion::WallCheck;
use maze_chase::types::{CollisionLayer, Direction, GameSummary, Hitbox, RuntimeEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::json;

const DEFAULT_MAX_TICKS: u64 = 60 * 60 * 5;
const AUTOPILOT_TURN_EVERY: u64 = 45;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless maze-chase run with a wandering autopilot")]
struct Cli {
    /// JSON game config; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Text maze; the built-in layout when omitted.
    #[arg(long)]
    layout: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
    max_ticks: u64,
    #[arg(long)]
    summary_out: Option<PathBuf>,
    /// Sleep one tick between steps so searches finish at game pace.
    #[arg(long)]
    realtime: bool,
    /// Also log path requests and adoptions.
    #[arg(long)]
    verbose: bool,
}

#[derive(Clone, Debug, Serialize)]
struct RunResult {
    seed: u64,
    #[serde(flatten)]
    summary: GameSummary,
    #[serde(rename = "tickLimitHit")]
    tick_limit_hit: bool,
}

/// Drives the pacman in place of an input device: keeps going until stuck or
/// until it has held a heading for a while, then picks an open direction.
struct Autopilot {
    rng: StdRng,
    ticks_since_turn: u64,
}

impl Autopilot {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed ^ 0x5eed),
            ticks_since_turn: 0,
        }
    }

    fn next_direction(&mut self, board: &Board) -> Option<Direction> {
        self.ticks_since_turn += 1;
        let stuck = !board.pacman_has_moved();
        if !stuck && self.ticks_since_turn < AUTOPILOT_TURN_EVERY {
            return None;
        }

        let open = open_directions(board);
        let back = opposite(board.pacman_direction());
        let forward: Vec<Direction> = open.iter().copied().filter(|dir| *dir != back).collect();
        let pool = if forward.is_empty() { &open } else { &forward };
        if pool.is_empty() {
            return None;
        }
        self.ticks_since_turn = 0;
        Some(pool[self.rng.random_range(0..pool.len())])
    }
}

fn open_directions(board: &Board) -> Vec<Direction> {
    let hitbox = Hitbox::square(board.config().entity_size());
    let pos = board.pacman_pos();
    let speed = board.config().pacman_speed;
    [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
        .into_iter()
        .filter(|dir| {
            let (dx, dy) = dir.delta();
            !board
                .walls()
                .collides(hitbox, pos.offset(dx * speed, dy * speed), CollisionLayer::Pacman)
        })
        .collect()
}

fn opposite(direction: Direction) -> Direction {
    match direction {
        Direction::Up => Direction::Down,
        Direction::Down => Direction::Up,
        Direction::Left => Direction::Right,
        Direction::Right => Direction::Left,
        Direction::None => Direction::None,
    }
}

fn main() {
    let cli = Cli::parse();
    let seed = cli
        .seed
        .unwrap_or_else(|| Utc::now().timestamp_millis().unsigned_abs());

    let result = match run(&cli, seed) {
        Ok(result) => result,
        Err(error) => {
            emit_log(
                "error",
                "run_failed",
                None,
                json!({ "seed": seed, "error": format!("{error:#}") }),
            );
            std::process::exit(1);
        }
    };

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &result) {
            emit_log(
                "error",
                "summary_write_failed",
                Some(result.summary.ticks),
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
    }

    match serde_json::to_string(&result) {
        Ok(line) => println!("{line}"),
        Err(error) => {
            emit_log("error", "summary_serialize_failed", None, json!({ "error": error.to_string() }));
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli, seed: u64) -> Result<RunResult> {
    let config = match cli.config.as_deref() {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let layout_text = match cli.layout.as_deref() {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read layout {}", path.display()))?,
        None => DEFAULT_LAYOUT.to_string(),
    };
    let layout = BoardLayout::parse(&layout_text, config.cell_size)
        .context("failed to parse layout")?;

    emit_log(
        "info",
        "run_started",
        None,
        json!({
            "seed": seed,
            "maxTicks": cli.max_ticks,
            "ghosts": layout.ghost_spawns.len(),
            "points": layout.points.len(),
            "pathWorkers": config.path_workers,
        }),
    );

    let tick_ms = config.tick_ms;
    let mut board = Board::new(&config, layout, seed).context("failed to build board")?;
    let mut autopilot = Autopilot::new(seed);

    while !board.is_ended() && board.tick() < cli.max_ticks {
        if let Some(direction) = autopilot.next_direction(&board) {
            board.input(direction);
        }
        board.step(tick_ms);
        let snapshot = board.build_snapshot(true);
        for event in &snapshot.events {
            if cli.verbose || is_notable(event) {
                emit_event(snapshot.tick, event);
            }
        }
        if cli.realtime {
            std::thread::sleep(Duration::from_millis(tick_ms));
        }
    }

    let summary = board.build_summary();
    let tick_limit_hit = !board.is_ended();
    emit_log(
        "info",
        "run_finished",
        Some(summary.ticks),
        json!({
            "reason": summary.reason,
            "score": summary.score,
            "tickLimitHit": tick_limit_hit,
        }),
    );

    Ok(RunResult {
        seed,
        summary,
        tick_limit_hit,
    })
}

fn is_notable(event: &RuntimeEvent) -> bool {
    !matches!(
        event,
        RuntimeEvent::PathRequested { .. } | RuntimeEvent::PathAdopted { .. } | RuntimeEvent::PointEaten { .. }
    )
}

fn write_summary(path: &Path, result: &RunResult) -> io::Result<()> {
    let text = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
    std::fs::write(path, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn corridor_board() -> Board {
        let layout = BoardLayout::parse("#####\n#P  #\n#####", 10).expect("valid layout");
        Board::new(&GameConfig::default(), layout, 3).expect("board builds")
    }

    fn result() -> RunResult {
        RunResult {
            seed: 1,
            summary: GameSummary {
                reason: None,
                ticks: 10,
                duration_ms: 160,
                score: 0,
                points_eaten: 0,
                ghosts_reset: 0,
                scatter_count: 0,
            },
            tick_limit_hit: true,
        }
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let target = std::env::temp_dir()
            .join(format!("maze-chase-missing-{now}"))
            .join("summary.json");
        assert!(write_summary(&target, &result()).is_err());
    }

    #[test]
    fn run_result_flattens_the_summary() {
        let value = serde_json::to_value(result()).expect("result serializes");
        assert_eq!(value["durationMs"], 160);
        assert_eq!(value["tickLimitHit"], true);
        assert!(value["reason"].is_null());
    }

    #[test]
    fn autopilot_only_picks_open_directions() {
        let board = corridor_board();
        assert_eq!(open_directions(&board), vec![Direction::Right]);
        let mut autopilot = Autopilot::new(9);
        assert_eq!(autopilot.next_direction(&board), Some(Direction::Right));
    }

    #[test]
    fn autopilot_holds_course_while_moving() {
        let mut board = corridor_board();
        let mut autopilot = Autopilot::new(9);
        if let Some(direction) = autopilot.next_direction(&board) {
            board.input(direction);
        }
        board.step(16);
        assert!(board.pacman_has_moved());
        assert_eq!(autopilot.next_direction(&board), None);
    }

    #[test]
    fn opposite_reverses_each_heading() {
        assert_eq!(opposite(Direction::Up), Direction::Down);
        assert_eq!(opposite(Direction::Left), Direction::Right);
        assert_eq!(opposite(Direction::None), Direction::None);
    }
}
