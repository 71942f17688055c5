use crate::constants::{ADVANCE_RETRY_DEPTH, FALLBACK_SPEED};
use crate::types::{CollisionLayer, Direction, Hitbox, Point};

/// Answers whether a hitbox placed at a position overlaps a wall of the given layer.
pub trait WallCheck {
    fn collides(&self, hitbox: Hitbox, pos: Point, layer: CollisionLayer) -> bool;
}

/// Per-agent movement: one speed-step per tick along the current direction,
/// with a staged direction that is taken as soon as it fits.
#[derive(Clone, Debug)]
pub struct Motion {
    pub pos: Point,
    speed: f32,
    direction: Direction,
    queued: Option<Direction>,
    hitbox: Hitbox,
    layer: CollisionLayer,
    moved: bool,
    moving_since_ms: Option<u64>,
}

impl Motion {
    pub fn new(pos: Point, speed: f32, hitbox: Hitbox, layer: CollisionLayer) -> Self {
        Self {
            pos,
            speed,
            direction: Direction::None,
            queued: None,
            hitbox,
            layer,
            moved: false,
            moving_since_ms: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn queued(&self) -> Option<Direction> {
        self.queued
    }

    pub fn hitbox(&self) -> Hitbox {
        self.hitbox
    }

    pub fn has_moved(&self) -> bool {
        self.moved
    }

    /// How long the agent has been moving without a stop, if it is moving.
    pub fn moving_for_ms(&self, now_ms: u64) -> Option<u64> {
        self.moving_since_ms
            .map(|since| now_ms.saturating_sub(since))
    }

    pub fn change(&mut self, direction: Direction) {
        self.queued = Some(direction);
    }

    pub fn clear_queued(&mut self) {
        self.queued = None;
    }

    pub fn stop(&mut self) {
        self.direction = Direction::None;
        self.queued = None;
    }

    pub fn teleport(&mut self, pos: Point) {
        self.pos = pos;
        self.stop();
        self.moved = false;
        self.moving_since_ms = None;
    }

    pub fn update<W: WallCheck + ?Sized>(&mut self, walls: &W, now_ms: u64) -> bool {
        let moved = match self.queued {
            Some(next) if next != self.direction => {
                let previous = self.direction;
                self.direction = next;
                if self.advance_if_able(walls) {
                    self.queued = None;
                    true
                } else {
                    self.direction = previous;
                    self.advance_if_able(walls)
                }
            }
            Some(_) => {
                self.queued = None;
                self.advance_if_able(walls)
            }
            None => self.advance_if_able(walls),
        };

        if moved && !self.moved {
            self.moving_since_ms = Some(now_ms);
        } else if !moved {
            self.moving_since_ms = None;
        }
        self.moved = moved;
        moved
    }

    fn advance_if_able<W: WallCheck + ?Sized>(&mut self, walls: &W) -> bool {
        self.try_step(walls, self.speed, 0)
    }

    fn try_step<W: WallCheck + ?Sized>(&mut self, walls: &W, speed: f32, depth: u32) -> bool {
        let (dx, dy) = self.direction.delta();
        if (dx, dy) == (0.0, 0.0) || speed <= 0.0 {
            return false;
        }
        let before = self.pos;
        self.pos = before.offset(dx * speed, dy * speed);
        if !walls.collides(self.hitbox, self.pos, self.layer) {
            return true;
        }
        self.pos = before;
        if depth >= ADVANCE_RETRY_DEPTH {
            return false;
        }
        self.try_step(walls, speed.min(FALLBACK_SPEED), depth + 1)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::grid::Bitmap;

    pub(crate) struct Walls(pub Bitmap);

    impl WallCheck for Walls {
        fn collides(&self, hitbox: Hitbox, pos: Point, _layer: CollisionLayer) -> bool {
            self.0.any_wall_in_rect(pos, hitbox.width, hitbox.height)
        }
    }

    /// Cell-sized walls from ascii rows, 10 units per cell.
    pub(crate) fn walls_from_rows(rows: &[&str]) -> Walls {
        let width = rows.iter().map(|row| row.len()).max().unwrap_or(0) * 10;
        let mut bitmap = Bitmap::new(width, rows.len() * 10);
        for (cy, row) in rows.iter().enumerate() {
            for (cx, ch) in row.chars().enumerate() {
                if ch == '#' {
                    for y in cy * 10..(cy + 1) * 10 {
                        for x in cx * 10..(cx + 1) * 10 {
                            bitmap.set_wall(x, y, true);
                        }
                    }
                }
            }
        }
        Walls(bitmap)
    }

    fn mover(x: f32, y: f32, speed: f32) -> Motion {
        Motion::new(Point::new(x, y), speed, Hitbox::square(10.0), CollisionLayer::Pacman)
    }

    #[test]
    fn idle_agent_does_not_move() {
        let walls = walls_from_rows(&["#####", "#   #", "#####"]);
        let mut motion = mover(10.0, 10.0, 1.0);
        assert!(!motion.update(&walls, 0));
        assert_eq!(motion.pos, Point::new(10.0, 10.0));
        assert!(!motion.has_moved());
    }

    #[test]
    fn staged_direction_applies_on_update() {
        let walls = walls_from_rows(&["#####", "#   #", "#####"]);
        let mut motion = mover(10.0, 10.0, 1.0);
        motion.change(Direction::Right);
        assert_eq!(motion.direction(), Direction::None);
        assert!(motion.update(&walls, 0));
        assert_eq!(motion.direction(), Direction::Right);
        assert_eq!(motion.pos, Point::new(11.0, 10.0));
        assert_eq!(motion.queued(), None);
    }

    #[test]
    fn blocked_turn_keeps_previous_direction_and_stays_staged() {
        // Corridor along row 1 with an opening downwards at column 3.
        let walls = walls_from_rows(&["######", "#    #", "###  #", "######"]);
        let mut motion = mover(10.0, 10.0, 1.0);
        motion.change(Direction::Right);
        motion.update(&walls, 0);
        motion.change(Direction::Down);

        for tick in 1..=19 {
            assert!(motion.update(&walls, tick));
            assert_eq!(motion.direction(), Direction::Right);
        }
        assert_eq!(motion.pos, Point::new(30.0, 10.0));
        assert_eq!(motion.queued(), Some(Direction::Down));

        // Lined up with the opening: the staged turn is taken.
        assert!(motion.update(&walls, 20));
        assert_eq!(motion.direction(), Direction::Down);
        assert_eq!(motion.pos, Point::new(30.0, 11.0));
    }

    #[test]
    fn wall_stops_the_agent_without_error() {
        let walls = walls_from_rows(&["#####", "#   #", "#####"]);
        let mut motion = mover(28.0, 10.0, 1.0);
        motion.change(Direction::Right);
        assert!(motion.update(&walls, 0));
        assert!(motion.update(&walls, 1));
        assert_eq!(motion.pos, Point::new(30.0, 10.0));
        assert!(!motion.update(&walls, 2));
        assert_eq!(motion.pos, Point::new(30.0, 10.0));
        assert_eq!(motion.moving_for_ms(2), None);
    }

    #[test]
    fn fast_agent_falls_back_to_single_units_near_walls() {
        let walls = walls_from_rows(&["#####", "#   #", "#####"]);
        let mut motion = mover(27.0, 10.0, 4.0);
        motion.change(Direction::Right);
        // A full 4-unit step would hit the wall at x = 40; a 1-unit step fits.
        assert!(motion.update(&walls, 0));
        assert_eq!(motion.pos, Point::new(28.0, 10.0));
    }

    #[test]
    fn moving_time_counts_from_the_first_step() {
        let walls = walls_from_rows(&["########", "#      #", "########"]);
        let mut motion = mover(10.0, 10.0, 1.0);
        motion.change(Direction::Right);
        motion.update(&walls, 100);
        motion.update(&walls, 116);
        motion.update(&walls, 132);
        assert_eq!(motion.moving_for_ms(132), Some(32));
    }
}
