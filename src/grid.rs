use std::collections::HashMap;

use crate::types::{GridPoint, Point};

/// Row-major wall bitmap, one bit per position unit.
#[derive(Clone, Debug)]
pub struct Bitmap {
    width: usize,
    height: usize,
    walls: Vec<bool>,
}

impl Bitmap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            walls: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn set_wall(&mut self, x: usize, y: usize, wall: bool) {
        if x < self.width && y < self.height {
            self.walls[y * self.width + x] = wall;
        }
    }

    /// Anything outside the bitmap counts as wall.
    pub fn is_wall(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return true;
        }
        self.walls[y as usize * self.width + x as usize]
    }

    /// Whether a `width × height` rectangle with its top-left corner at `pos`
    /// leaves the bitmap or covers any wall bit.
    pub fn any_wall_in_rect(&self, pos: Point, width: f32, height: f32) -> bool {
        let left = pos.x.floor() as i64;
        let top = pos.y.floor() as i64;
        let w = width.ceil().max(1.0) as i64;
        let h = height.ceil().max(1.0) as i64;
        if left < 0
            || top < 0
            || left + w > self.width as i64
            || top + h > self.height as i64
        {
            return true;
        }
        (top..top + h).any(|y| (left..left + w).any(|x| self.is_wall(x, y)))
    }
}

/// Four-connected graph over the wall-free grid intersections of a bitmap.
#[derive(Clone, Debug)]
pub struct NavGraph {
    cell_size: i32,
    nodes: HashMap<GridPoint, Vec<GridPoint>>,
}

impl NavGraph {
    pub fn build(boundary: &Bitmap, cell_size: i32) -> Self {
        let cell_size = cell_size.max(1);
        let step = cell_size as usize;
        let open = |x: i64, y: i64| !boundary.is_wall(x, y);

        let mut nodes = HashMap::new();
        for y in (0..boundary.height()).step_by(step) {
            for x in (0..boundary.width()).step_by(step) {
                let (x, y) = (x as i64, y as i64);
                if !open(x, y) {
                    continue;
                }
                let c = cell_size as i64;
                let neighbors = [(-c, 0), (0, -c), (c, 0), (0, c)]
                    .into_iter()
                    .map(|(dx, dy)| (x + dx, y + dy))
                    .filter(|&(nx, ny)| open(nx, ny))
                    .map(|(nx, ny)| GridPoint::new(nx as i32, ny as i32))
                    .collect();
                nodes.insert(GridPoint::new(x as i32, y as i32), neighbors);
            }
        }
        Self { cell_size, nodes }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Rounds each coordinate up to the next multiple of the cell size.
    pub fn normalize(&self, point: Point) -> GridPoint {
        let c = self.cell_size as f32;
        GridPoint::new(
            ((point.x / c).ceil() * c) as i32,
            ((point.y / c).ceil() * c) as i32,
        )
    }

    pub fn contains(&self, node: GridPoint) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn valid_point(&self, point: Point) -> bool {
        if !point.x.is_finite() || !point.y.is_finite() {
            return false;
        }
        self.contains(self.normalize(point))
    }

    pub fn neighbors(&self, node: GridPoint) -> &[GridPoint] {
        self.nodes.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = GridPoint> + '_ {
        self.nodes.keys().copied()
    }
}
