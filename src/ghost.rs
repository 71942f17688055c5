use std::collections::VecDeque;
use std::sync::Arc;

use rand::Rng;

use crate::config::GhostProfile;
use crate::constants::TIE_LOOKAHEAD;
use crate::goals::{choose_target, GoalContext, GoalPolicy};
use crate::grid::NavGraph;
use crate::motion::{Motion, WallCheck};
use crate::types::{CollisionLayer, Direction, GhostView, HeuristicMode, Hitbox, Mode, Point};
use crate::workers::{PathTicket, PathWorkers, TicketState};

#[derive(Clone, Copy, Debug)]
pub struct GhostTuning {
    pub speed: f32,
    pub hitbox: Hitbox,
    pub cell_size: f32,
    pub aggression: usize,
    pub repath_distance: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathRequest {
    pub request_id: u64,
    pub mode: Mode,
    pub target: Point,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathAdoption {
    pub request_id: u64,
    pub len: usize,
}

pub struct Ghost {
    pub id: usize,
    motion: Motion,
    spawn: Point,
    tuning: GhostTuning,
    heuristic: HeuristicMode,
    chase_goals: Vec<GoalPolicy>,
    scatter_goals: Vec<GoalPolicy>,
    path: VecDeque<Point>,
    waypoint: Option<Point>,
    pending: Option<PathTicket>,
    /// Path length when the current path was computed.
    aggression: usize,
}

impl Ghost {
    pub fn new(id: usize, spawn: Point, profile: &GhostProfile, tuning: GhostTuning) -> Self {
        Self {
            id,
            motion: Motion::new(spawn, tuning.speed, tuning.hitbox, CollisionLayer::Ghost),
            spawn,
            tuning,
            heuristic: profile.heuristic,
            chase_goals: profile.chase.clone(),
            scatter_goals: profile.scatter.clone(),
            path: VecDeque::new(),
            waypoint: None,
            pending: None,
            aggression: 0,
        }
    }

    pub fn pos(&self) -> Point {
        self.motion.pos
    }

    pub fn hitbox(&self) -> Hitbox {
        self.motion.hitbox()
    }

    pub fn spawn(&self) -> Point {
        self.spawn
    }

    pub fn path_len(&self) -> usize {
        self.path.len()
    }

    pub fn is_searching(&self) -> bool {
        self.pending.is_some()
    }

    /// No search in flight, and either nothing left to follow or a once-long
    /// path has been walked down to the aggression threshold.
    pub fn can_pathfind(&self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        let threshold = self.tuning.aggression;
        self.path.is_empty() || (self.path.len() <= threshold && self.aggression > threshold)
    }

    /// Starts a search towards `target`. The current path and any staged turn
    /// are dropped right away; an older search still running is abandoned.
    pub fn path_find_to(&mut self, workers: &PathWorkers, graph: &Arc<NavGraph>, target: Point) -> u64 {
        self.motion.clear_queued();
        self.path.clear();
        self.waypoint = None;
        let ticket = workers.submit(graph.clone(), self.motion.pos, target, self.heuristic);
        let request_id = ticket.request_id();
        self.pending = Some(ticket);
        request_id
    }

    pub fn chase_pathfind<R: Rng + ?Sized>(
        &mut self,
        workers: &PathWorkers,
        graph: &Arc<NavGraph>,
        ctx: &GoalContext<'_>,
        rng: &mut R,
    ) -> Option<PathRequest> {
        let target = choose_target(&self.chase_goals, ctx, rng)?;
        let request_id = self.path_find_to(workers, graph, target);
        Some(PathRequest {
            request_id,
            mode: Mode::Chase,
            target,
        })
    }

    pub fn scatter_pathfind<R: Rng + ?Sized>(
        &mut self,
        workers: &PathWorkers,
        graph: &Arc<NavGraph>,
        ctx: &GoalContext<'_>,
        rng: &mut R,
    ) -> Option<PathRequest> {
        let target = choose_target(&self.scatter_goals, ctx, rng)?;
        let request_id = self.path_find_to(workers, graph, target);
        Some(PathRequest {
            request_id,
            mode: Mode::Scatter,
            target,
        })
    }

    /// One tick: move, pick up a finished search, then advance along the path.
    pub fn update<W, R>(&mut self, walls: &W, now_ms: u64, rng: &mut R) -> Option<PathAdoption>
    where
        W: WallCheck + ?Sized,
        R: Rng + ?Sized,
    {
        let moved = self.motion.update(walls, now_ms);

        let adopted = self.take_finished_search();

        let needs_next = match self.waypoint {
            None => true,
            Some(waypoint) => {
                let distance = self.motion.pos.distance(waypoint);
                distance < self.tuning.cell_size
                    || distance > self.tuning.repath_distance
                    || (!moved && self.pending.is_none())
            }
        };
        if needs_next {
            self.waypoint = self.path.pop_front();
            self.steer(rng);
        }
        adopted
    }

    /// Back to the spawn point with no path and no search in flight.
    pub fn replace(&mut self) {
        self.motion.teleport(self.spawn);
        self.path.clear();
        self.waypoint = None;
        self.pending = None;
        self.aggression = 0;
    }

    #[cfg(test)]
    pub(crate) fn place_at(&mut self, pos: Point) {
        self.motion.teleport(pos);
    }

    #[cfg(test)]
    pub(crate) fn hold_search(&mut self, ticket: PathTicket) {
        self.pending = Some(ticket);
    }

    pub fn view(&self, now_ms: u64) -> GhostView {
        GhostView {
            id: self.id,
            x: self.motion.pos.x,
            y: self.motion.pos.y,
            dir: self.motion.direction(),
            moving_ms: self.motion.moving_for_ms(now_ms).unwrap_or(0),
            path_len: self.path.len(),
            searching: self.pending.is_some(),
            path: self.waypoint.iter().chain(self.path.iter()).copied().collect(),
        }
    }

    fn take_finished_search(&mut self) -> Option<PathAdoption> {
        let ticket = self.pending.as_mut()?;
        let TicketState::Ready(path) = ticket.poll() else {
            return None;
        };
        let request_id = ticket.request_id();
        self.pending = None;
        self.adopt_path(path);
        Some(PathAdoption {
            request_id,
            len: self.path.len(),
        })
    }

    fn adopt_path(&mut self, path: Vec<Point>) {
        self.aggression = path.len();
        self.path = path.into();
        self.waypoint = None;
    }

    fn steer<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let Some(waypoint) = self.waypoint else {
            return;
        };
        let pos = self.motion.pos;
        let (dx, dy) = (waypoint.x - pos.x, waypoint.y - pos.y);

        if dx.abs() == dy.abs() && dx != 0.0 && self.path.len() >= 3 {
            // Equal pull on both axes: jump ahead so the ghost doesn't oscillate.
            let skip = rng.random_range(0..TIE_LOOKAHEAD.min(self.path.len()));
            self.path.drain(..skip);
            self.waypoint = self.path.pop_front();
            let Some(ahead) = self.waypoint else {
                return;
            };
            let direction = axis_direction(ahead.x - pos.x, ahead.y - pos.y);
            if direction != Direction::None {
                self.motion.change(direction);
            }
            return;
        }

        let direction = axis_direction(dx, dy);
        if direction != Direction::None {
            self.motion.change(direction);
        }
    }
}

/// The axis with the larger offset wins; horizontal on a tie.
fn axis_direction(dx: f32, dy: f32) -> Direction {
    if dx == 0.0 && dy == 0.0 {
        return Direction::None;
    }
    if dx.abs() >= dy.abs() {
        if dx > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        }
    } else if dy > 0.0 {
        Direction::Down
    } else {
        Direction::Up
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::tests::walls_from_rows;
    use crate::workers::tests::wait_ready;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::{Duration, Instant};

    fn tuning(aggression: usize) -> GhostTuning {
        GhostTuning {
            speed: 1.0,
            hitbox: Hitbox::square(10.0),
            cell_size: 10.0,
            aggression,
            repath_distance: 30.0,
        }
    }

    fn profile() -> GhostProfile {
        GhostProfile {
            chase: vec![GoalPolicy::ToPacman],
            scatter: vec![GoalPolicy::ToPoint { x: 10.0, y: 10.0 }],
            heuristic: HeuristicMode::Closest,
        }
    }

    const CORRIDOR: [&str; 3] = ["############", "#          #", "############"];

    fn corridor_graph() -> Arc<NavGraph> {
        Arc::new(NavGraph::build(&walls_from_rows(&CORRIDOR).0, 10))
    }

    fn points(n: usize) -> Vec<Point> {
        (0..n).map(|i| Point::new(10.0 + 10.0 * i as f32, 10.0)).collect()
    }

    fn tick_until_adopted(ghost: &mut Ghost, rng: &mut StdRng) -> PathAdoption {
        let walls = walls_from_rows(&CORRIDOR);
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut now = 0;
        loop {
            now += 16;
            if let Some(adoption) = ghost.update(&walls, now, rng) {
                return adoption;
            }
            assert!(Instant::now() < deadline, "search never adopted");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn fresh_ghost_can_pathfind() {
        let ghost = Ghost::new(0, Point::new(10.0, 10.0), &profile(), tuning(5));
        assert!(ghost.can_pathfind());
    }

    #[test]
    fn path_find_to_clears_path_and_blocks_replanning_until_done() {
        let workers = PathWorkers::new(1).expect("workers start");
        let graph = corridor_graph();
        let mut rng = StdRng::seed_from_u64(1);
        let mut ghost = Ghost::new(0, Point::new(10.0, 10.0), &profile(), tuning(5));
        assert!(ghost.can_pathfind());
        ghost.path = points(3).into();
        ghost.motion.change(Direction::Right);

        ghost.path_find_to(&workers, &graph, Point::new(100.0, 10.0));
        assert!(!ghost.can_pathfind());
        assert_eq!(ghost.path_len(), 0);
        assert_eq!(ghost.motion.queued(), None);
        assert!(ghost.is_searching());

        let adoption = tick_until_adopted(&mut ghost, &mut rng);
        assert_eq!(adoption.len, 10);
        assert!(!ghost.is_searching());
    }

    #[test]
    fn newer_request_supersedes_an_outstanding_one() {
        let workers = PathWorkers::new(2).expect("workers start");
        let graph = corridor_graph();
        let mut rng = StdRng::seed_from_u64(2);
        let mut ghost = Ghost::new(0, Point::new(10.0, 10.0), &profile(), tuning(5));

        let first = ghost.path_find_to(&workers, &graph, Point::new(100.0, 10.0));
        let second = ghost.path_find_to(&workers, &graph, Point::new(30.0, 10.0));
        assert!(second > first);

        let adoption = tick_until_adopted(&mut ghost, &mut rng);
        assert_eq!(adoption.request_id, second);
        assert_eq!(adoption.len, 3);

        // Nothing else arrives afterwards.
        std::thread::sleep(Duration::from_millis(20));
        let walls = walls_from_rows(&CORRIDOR);
        for now in 0..5 {
            assert_eq!(ghost.update(&walls, now, &mut rng), None);
        }
    }

    #[test]
    fn long_path_throttles_replanning_until_it_shrinks_to_threshold() {
        let mut ghost = Ghost::new(0, Point::new(10.0, 10.0), &profile(), tuning(5));
        ghost.adopt_path(points(9));
        assert!(!ghost.can_pathfind());
        while ghost.path_len() > 5 {
            assert!(!ghost.can_pathfind());
            ghost.path.pop_front();
        }
        assert!(ghost.can_pathfind());
    }

    #[test]
    fn short_path_waits_until_empty() {
        let mut ghost = Ghost::new(0, Point::new(10.0, 10.0), &profile(), tuning(5));
        ghost.adopt_path(points(4));
        while !ghost.path.is_empty() {
            assert!(!ghost.can_pathfind());
            ghost.path.pop_front();
        }
        assert!(ghost.can_pathfind());
    }

    #[test]
    fn ghost_walks_its_path_to_the_goal() {
        let walls = walls_from_rows(&CORRIDOR);
        let mut rng = StdRng::seed_from_u64(3);
        let mut ghost = Ghost::new(0, Point::new(10.0, 10.0), &profile(), tuning(5));
        ghost.adopt_path(points(5));
        for now in 0..60 {
            ghost.update(&walls, now * 16, &mut rng);
        }
        assert!(ghost.pos().x >= 40.0, "{:?}", ghost.pos());
        assert_eq!(ghost.pos().y, 10.0);
    }

    #[test]
    fn drifting_past_repath_distance_moves_on_to_the_next_waypoint() {
        let walls = walls_from_rows(&CORRIDOR);
        let mut rng = StdRng::seed_from_u64(5);
        let mut ghost = Ghost::new(0, Point::new(10.0, 10.0), &profile(), tuning(5));
        ghost.waypoint = Some(Point::new(10.0, 10.0));
        ghost.path = points(5).into_iter().skip(1).collect();
        // Knocked 40 units away from its waypoint, still moving freely.
        ghost.motion.pos = Point::new(50.0, 10.0);
        ghost.motion.change(Direction::Right);

        ghost.update(&walls, 16, &mut rng);
        assert!(ghost.motion.has_moved());
        assert_eq!(ghost.waypoint, Some(Point::new(20.0, 10.0)));
        assert_eq!(ghost.path_len(), 3);
        assert_eq!(ghost.motion.queued(), Some(Direction::Left));
    }

    #[test]
    fn stalled_ghost_without_a_search_skips_a_waypoint_each_tick() {
        let walls = walls_from_rows(&CORRIDOR);
        let mut rng = StdRng::seed_from_u64(6);
        // Pinned against the right wall; the waypoint is 20 units into the
        // wall below, inside the re-path distance and out of reach.
        let mut ghost = Ghost::new(0, Point::new(100.0, 10.0), &profile(), tuning(5));
        let below = Point::new(100.0, 30.0);
        ghost.waypoint = Some(below);
        ghost.path = vec![below; 3].into();
        ghost.motion.change(Direction::Down);

        for (tick, expected) in [(1u64, 2usize), (2, 1), (3, 0)] {
            ghost.update(&walls, tick * 16, &mut rng);
            assert!(!ghost.motion.has_moved());
            assert!(!ghost.is_searching());
            assert_eq!(ghost.path_len(), expected);
        }
        assert_eq!(ghost.pos(), Point::new(100.0, 10.0));
    }

    #[test]
    fn stalled_ghost_with_a_search_in_flight_keeps_its_waypoint() {
        let walls = walls_from_rows(&CORRIDOR);
        let mut rng = StdRng::seed_from_u64(6);
        let mut ghost = Ghost::new(0, Point::new(100.0, 10.0), &profile(), tuning(5));
        let below = Point::new(100.0, 30.0);
        ghost.waypoint = Some(below);
        ghost.path = vec![below; 3].into();
        let (_answer, ticket) = PathTicket::unanswered(1);
        ghost.hold_search(ticket);

        ghost.update(&walls, 16, &mut rng);
        assert!(ghost.is_searching());
        assert_eq!(ghost.waypoint, Some(below));
        assert_eq!(ghost.path_len(), 3);
    }

    #[test]
    fn diagonal_tie_jumps_ahead_and_steers_for_the_new_waypoint() {
        let walls = walls_from_rows(&["########", "#      #", "#      #", "#      #", "#      #", "#      #", "#      #", "########"]);
        let ahead = [Point::new(20.0, 40.0), Point::new(20.0, 50.0), Point::new(20.0, 60.0)];
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut ghost = Ghost::new(0, Point::new(10.0, 10.0), &profile(), tuning(5));
            // First waypoint sits exactly diagonal: |dx| == |dy| == 10.
            let mut path = vec![Point::new(20.0, 20.0)];
            path.extend(ahead);
            ghost.adopt_path(path);

            ghost.update(&walls, 16, &mut rng);
            let waypoint = ghost.waypoint.expect("jumped to a later waypoint");
            let skipped = ahead
                .iter()
                .position(|p| *p == waypoint)
                .expect("waypoint comes from the lookahead window");
            assert_eq!(ghost.path_len(), ahead.len() - skipped - 1);
            // Horizontal would win the tie; the new waypoint is mostly below.
            assert_eq!(ghost.motion.queued(), Some(Direction::Down));
        }
    }

    #[test]
    fn diagonal_tie_near_the_end_just_follows_the_waypoint() {
        let walls = walls_from_rows(&["######", "#    #", "#    #", "######"]);
        let mut rng = StdRng::seed_from_u64(9);
        let mut ghost = Ghost::new(0, Point::new(10.0, 10.0), &profile(), tuning(5));
        ghost.adopt_path(vec![Point::new(20.0, 20.0), Point::new(30.0, 20.0)]);

        ghost.update(&walls, 16, &mut rng);
        assert_eq!(ghost.waypoint, Some(Point::new(20.0, 20.0)));
        assert_eq!(ghost.path_len(), 1);
        assert_eq!(ghost.motion.queued(), Some(Direction::Right));
    }

    #[test]
    fn replace_returns_to_spawn_and_forgets_everything() {
        let workers = PathWorkers::new(1).expect("workers start");
        let graph = corridor_graph();
        let mut ghost = Ghost::new(0, Point::new(10.0, 10.0), &profile(), tuning(5));
        ghost.motion.pos = Point::new(55.0, 10.0);
        ghost.adopt_path(points(3));
        ghost.path_find_to(&workers, &graph, Point::new(100.0, 10.0));

        ghost.replace();
        assert_eq!(ghost.pos(), Point::new(10.0, 10.0));
        assert!(!ghost.is_searching());
        assert_eq!(ghost.path_len(), 0);
        assert!(ghost.can_pathfind());
    }

    #[test]
    fn chase_and_scatter_use_their_own_policies() {
        let workers = PathWorkers::new(1).expect("workers start");
        let graph = corridor_graph();
        let mut rng = StdRng::seed_from_u64(4);
        let mut ghost = Ghost::new(0, Point::new(50.0, 10.0), &profile(), tuning(5));
        let ctx = GoalContext {
            pacman: Point::new(90.0, 10.0),
            graph: &graph,
            screen: (120.0, 30.0),
        };

        let chase = ghost
            .chase_pathfind(&workers, &graph, &ctx, &mut rng)
            .expect("chase policy configured");
        assert_eq!(chase.mode, Mode::Chase);
        assert_eq!(chase.target, Point::new(90.0, 10.0));

        let scatter = ghost
            .scatter_pathfind(&workers, &graph, &ctx, &mut rng)
            .expect("scatter policy configured");
        assert_eq!(scatter.mode, Mode::Scatter);
        assert_eq!(scatter.target, Point::new(10.0, 10.0));
        assert!(scatter.request_id > chase.request_id);

        let mut ticket = ghost.pending.take().expect("search in flight");
        assert_eq!(wait_ready(&mut ticket).len(), 5);
    }

    #[test]
    fn axis_direction_prefers_the_larger_offset() {
        assert_eq!(axis_direction(5.0, 1.0), Direction::Right);
        assert_eq!(axis_direction(-5.0, 1.0), Direction::Left);
        assert_eq!(axis_direction(1.0, -5.0), Direction::Up);
        assert_eq!(axis_direction(0.0, 3.0), Direction::Down);
        assert_eq!(axis_direction(0.0, 0.0), Direction::None);
    }
}
