use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_RANDOM_SAMPLES, UNITS_AWAY_THETA_STEP};
use crate::grid::NavGraph;
use crate::types::Point;

/// Board state a goal policy may look at.
#[derive(Clone, Copy)]
pub struct GoalContext<'a> {
    pub pacman: Point,
    pub graph: &'a NavGraph,
    pub screen: (f32, f32),
}

/// Where a ghost heads when it asks for a new path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GoalPolicy {
    ToRandom,
    ToPacman,
    ToPoint { x: f32, y: f32 },
    UnitsAwayPacman { units: f32 },
}

impl GoalPolicy {
    pub fn target<R: Rng + ?Sized>(&self, ctx: &GoalContext<'_>, rng: &mut R) -> Point {
        match *self {
            GoalPolicy::ToRandom => to_random(ctx, rng),
            GoalPolicy::ToPacman => to_pacman(ctx),
            GoalPolicy::ToPoint { x, y } => to_point(Point::new(x, y)),
            GoalPolicy::UnitsAwayPacman { units } => units_away_pacman(ctx, units),
        }
    }
}

/// Samples the screen until a point lands on the graph. Falls back to the
/// pacman position when the board has (almost) no open cells.
pub fn to_random<R: Rng + ?Sized>(ctx: &GoalContext<'_>, rng: &mut R) -> Point {
    let (width, height) = ctx.screen;
    for _ in 0..MAX_RANDOM_SAMPLES {
        let candidate = Point::new(
            rng.random_range(0.0..=width.max(0.0)).floor(),
            rng.random_range(0.0..=height.max(0.0)).floor(),
        );
        if ctx.graph.valid_point(candidate) {
            return candidate;
        }
    }
    ctx.pacman
}

pub fn to_pacman(ctx: &GoalContext<'_>) -> Point {
    ctx.pacman
}

pub fn to_point(point: Point) -> Point {
    point
}

/// First valid point on the circle of radius `units` around the pacman,
/// sweeping the angle from 0. One full turn without a hit falls back to the
/// pacman position.
pub fn units_away_pacman(ctx: &GoalContext<'_>, units: f32) -> Point {
    let steps = (std::f32::consts::TAU / UNITS_AWAY_THETA_STEP).ceil() as usize;
    (0..=steps)
        .map(|i| i as f32 * UNITS_AWAY_THETA_STEP)
        .map(|theta| ctx.pacman.offset(units * theta.cos(), units * theta.sin()))
        .find(|&candidate| ctx.graph.valid_point(candidate))
        .unwrap_or(ctx.pacman)
}

/// Picks one policy uniformly and resolves its target.
pub fn choose_target<R: Rng + ?Sized>(
    policies: &[GoalPolicy],
    ctx: &GoalContext<'_>,
    rng: &mut R,
) -> Option<Point> {
    if policies.is_empty() {
        return None;
    }
    let policy = &policies[rng.random_range(0..policies.len())];
    Some(policy.target(ctx, rng))
}
