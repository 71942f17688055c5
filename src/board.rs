use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ConfigError, GameConfig};
use crate::constants::{GHOST_SCORE, POINT_SCORE};
use crate::ghost::{Ghost, GhostTuning, PathRequest};
use crate::goals::GoalContext;
use crate::grid::{Bitmap, NavGraph};
use crate::layout::{BoardLayout, LayoutError};
use crate::mode::{ContactOutcome, ModeMachine, ModeTransition};
use crate::motion::{Motion, WallCheck};
use crate::types::{
    CollisionLayer, Direction, GameOverReason, GameSummary, GhostView, Hitbox, Mode, PacmanView,
    Point, RuntimeEvent, Snapshot,
};
use crate::workers::{PathWorkers, WorkersError};

#[derive(Debug)]
pub enum BoardError {
    Config(ConfigError),
    CellSizeMismatch { config: i32, layout: i32 },
    GhostNotConfigured { index: usize },
    Layout(LayoutError),
    Workers(WorkersError),
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::Config(err) => write!(f, "{err}"),
            BoardError::CellSizeMismatch { config, layout } => write!(
                f,
                "layout was built with cell size {layout} but config says {config}"
            ),
            BoardError::GhostNotConfigured { index } => {
                write!(f, "ghost spawn {index} has no goal profile configured")
            }
            BoardError::Layout(err) => write!(f, "{err}"),
            BoardError::Workers(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for BoardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoardError::Config(err) => Some(err),
            BoardError::Layout(err) => Some(err),
            BoardError::Workers(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for BoardError {
    fn from(err: ConfigError) -> Self {
        BoardError::Config(err)
    }
}

impl From<WorkersError> for BoardError {
    fn from(err: WorkersError) -> Self {
        BoardError::Workers(err)
    }
}

/// Wall bitmaps per collision layer; ghosts walk through pacman-only walls.
pub struct BoardWalls {
    pacman: Bitmap,
    ghost: Bitmap,
}

impl WallCheck for BoardWalls {
    fn collides(&self, hitbox: Hitbox, pos: Point, layer: CollisionLayer) -> bool {
        let bitmap = match layer {
            CollisionLayer::Pacman => &self.pacman,
            CollisionLayer::Ghost => &self.ghost,
        };
        bitmap.any_wall_in_rect(pos, hitbox.width, hitbox.height)
    }
}

#[derive(Clone, Debug, Default)]
struct BoardStats {
    points_eaten: u32,
    ghosts_reset: u32,
    scatter_count: u32,
}

pub struct Board {
    config: GameConfig,
    walls: BoardWalls,
    graph: Arc<NavGraph>,
    workers: PathWorkers,
    rng: StdRng,
    screen: (f32, f32),
    cell_size: f32,

    pacman: Motion,
    ghosts: Vec<Ghost>,
    scatter_triggers: Vec<Point>,
    points: Vec<Point>,
    mode: ModeMachine,

    events: Vec<RuntimeEvent>,
    stats: BoardStats,
    score: u32,
    had_points: bool,
    tick_counter: u64,
    elapsed_ms: u64,
    ended: bool,
    end_reason: Option<GameOverReason>,
}

impl Board {
    pub fn new(config: &GameConfig, layout: BoardLayout, seed: u64) -> Result<Self, BoardError> {
        config.validate()?;
        if layout.cell_size != config.cell_size {
            return Err(BoardError::CellSizeMismatch {
                config: config.cell_size,
                layout: layout.cell_size,
            });
        }

        if layout.pacman_spawns.is_empty() {
            return Err(BoardError::Layout(LayoutError::MissingPacmanSpawn));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let graph = Arc::new(NavGraph::build(&layout.ghost_walls, layout.cell_size));
        let workers = PathWorkers::new(config.path_workers)?;
        let hitbox = Hitbox::square(config.entity_size());
        let tuning = GhostTuning {
            speed: config.ghost_speed,
            hitbox,
            cell_size: config.cell_size as f32,
            aggression: config.ghost_aggression,
            repath_distance: config.repath_distance,
        };

        let mut ghosts = Vec::with_capacity(layout.ghost_spawns.len());
        for (index, spawn) in layout.ghost_spawns.iter().enumerate() {
            let profile = config
                .ghosts
                .get(index)
                .ok_or(BoardError::GhostNotConfigured { index })?;
            ghosts.push(Ghost::new(index, *spawn, profile, tuning));
        }

        let pacman_spawn = layout.pacman_spawns[rng.random_range(0..layout.pacman_spawns.len())];
        let pacman = Motion::new(pacman_spawn, config.pacman_speed, hitbox, CollisionLayer::Pacman);
        let screen = config
            .screen
            .unwrap_or((layout.width as f32, layout.height as f32));

        Ok(Self {
            config: config.clone(),
            walls: BoardWalls {
                pacman: layout.pacman_walls,
                ghost: layout.ghost_walls,
            },
            graph,
            workers,
            rng,
            screen,
            cell_size: layout.cell_size as f32,
            pacman,
            ghosts,
            had_points: !layout.points.is_empty(),
            scatter_triggers: layout.scatter_triggers,
            points: layout.points,
            mode: ModeMachine::new(config.scatter_duration_ms),
            events: Vec::new(),
            stats: BoardStats::default(),
            score: 0,
            tick_counter: 0,
            elapsed_ms: 0,
            ended: false,
            end_reason: None,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn walls(&self) -> &BoardWalls {
        &self.walls
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn end_reason(&self) -> Option<GameOverReason> {
        self.end_reason
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn pacman_pos(&self) -> Point {
        self.pacman.pos
    }

    pub fn pacman_direction(&self) -> Direction {
        self.pacman.direction()
    }

    pub fn pacman_has_moved(&self) -> bool {
        self.pacman.has_moved()
    }

    pub fn ghosts(&self) -> &[Ghost] {
        &self.ghosts
    }

    pub fn input(&mut self, direction: Direction) {
        if direction != Direction::None {
            self.pacman.change(direction);
        }
    }

    pub fn step(&mut self, dt_ms: u64) {
        if self.ended {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        let now_ms = self.elapsed_ms;

        self.pacman.update(&self.walls, now_ms);

        let mut start_scatter = false;
        let mut start_chase = false;
        for trigger in self.collect_touched(Pickup::Scatter) {
            self.events.push(RuntimeEvent::ScatterEaten {
                x: trigger.x,
                y: trigger.y,
            });
            if self.mode.on_scatter_trigger(now_ms) == Some(ModeTransition::EnteredScatter) {
                start_scatter = true;
                self.stats.scatter_count += 1;
                self.events.push(RuntimeEvent::ModeChanged {
                    mode: Mode::Scatter,
                });
            }
        }
        for point in self.collect_touched(Pickup::Point) {
            self.score += POINT_SCORE;
            self.stats.points_eaten += 1;
            self.events.push(RuntimeEvent::PointEaten {
                x: point.x,
                y: point.y,
            });
        }
        if self.mode.tick(now_ms) == Some(ModeTransition::EnteredChase) {
            start_chase = true;
            self.events.push(RuntimeEvent::ModeChanged { mode: Mode::Chase });
        }

        self.update_ghosts(now_ms, start_scatter, start_chase);
        if self.ended {
            return;
        }

        if self.had_points && self.points.is_empty() {
            self.finish(GameOverReason::Cleared);
        }
    }

    fn update_ghosts(&mut self, now_ms: u64, start_scatter: bool, start_chase: bool) {
        let pacman_pos = self.pacman.pos;
        let pacman_hitbox = self.pacman.hitbox();

        for idx in 0..self.ghosts.len() {
            if let Some(adoption) = self.ghosts[idx].update(&self.walls, now_ms, &mut self.rng) {
                self.events.push(RuntimeEvent::PathAdopted {
                    ghost_id: self.ghosts[idx].id,
                    request_id: adoption.request_id,
                    len: adoption.len,
                });
            }

            let ghost = &self.ghosts[idx];
            if ghost.hitbox().overlaps(ghost.pos(), pacman_hitbox, pacman_pos) {
                match self.mode.contact() {
                    ContactOutcome::ResetGhost => {
                        self.ghosts[idx].replace();
                        self.score += GHOST_SCORE;
                        self.stats.ghosts_reset += 1;
                        self.events.push(RuntimeEvent::GhostReset {
                            ghost_id: self.ghosts[idx].id,
                        });
                        continue;
                    }
                    ContactOutcome::GameOver => {
                        self.finish(GameOverReason::Caught);
                        return;
                    }
                }
            }

            let can_path = self.ghosts[idx].can_pathfind();
            let ctx = GoalContext {
                pacman: pacman_pos,
                graph: &self.graph,
                screen: self.screen,
            };
            let request = if (can_path && self.mode.mode() == Mode::Scatter) || start_scatter {
                self.ghosts[idx].scatter_pathfind(&self.workers, &self.graph, &ctx, &mut self.rng)
            } else if can_path || start_chase {
                self.ghosts[idx].chase_pathfind(&self.workers, &self.graph, &ctx, &mut self.rng)
            } else {
                None
            };
            if let Some(PathRequest {
                request_id,
                mode,
                target,
            }) = request
            {
                self.events.push(RuntimeEvent::PathRequested {
                    ghost_id: self.ghosts[idx].id,
                    request_id,
                    mode,
                    target,
                });
            }
        }
    }

    fn finish(&mut self, reason: GameOverReason) {
        self.ended = true;
        self.end_reason = Some(reason);
        self.events.push(RuntimeEvent::GameOver { reason });
    }

    /// Removes and returns every pickup of the given kind the pacman overlaps.
    fn collect_touched(&mut self, kind: Pickup) -> Vec<Point> {
        let pacman_pos = self.pacman.pos;
        let pacman_hitbox = self.pacman.hitbox();
        let size = (self.cell_size / 5.0).max(1.0);
        let inset = (self.cell_size - size) / 2.0;
        let item = Hitbox::square(size);

        let items = match kind {
            Pickup::Scatter => &mut self.scatter_triggers,
            Pickup::Point => &mut self.points,
        };
        let mut touched = Vec::new();
        items.retain(|origin| {
            let hit = item.overlaps(origin.offset(inset, inset), pacman_hitbox, pacman_pos);
            if hit {
                touched.push(*origin);
            }
            !hit
        });
        touched
    }

    /// Events are drained either way; `include_events` only decides whether
    /// they ride along in the snapshot.
    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let events = std::mem::take(&mut self.events);
        Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            mode: self.mode.mode(),
            scatter_progress: self.mode.scatter_progress(self.elapsed_ms),
            score: self.score,
            pacman: PacmanView {
                x: self.pacman.pos.x,
                y: self.pacman.pos.y,
                dir: self.pacman.direction(),
                moving: self.pacman.has_moved(),
                moving_ms: self.pacman.moving_for_ms(self.elapsed_ms).unwrap_or(0),
            },
            ghosts: self
                .ghosts
                .iter()
                .map(|ghost| ghost.view(self.elapsed_ms))
                .collect::<Vec<GhostView>>(),
            scatter_triggers: self.scatter_triggers.clone(),
            points_left: self.points.len(),
            events: if include_events { events } else { Vec::new() },
        }
    }

    pub fn build_summary(&self) -> GameSummary {
        GameSummary {
            reason: self.end_reason,
            ticks: self.tick_counter,
            duration_ms: self.elapsed_ms,
            score: self.score,
            points_eaten: self.stats.points_eaten,
            ghosts_reset: self.stats.ghosts_reset,
            scatter_count: self.stats.scatter_count,
        }
    }
}

#[derive(Clone, Copy)]
enum Pickup {
    Scatter,
    Point,
}
