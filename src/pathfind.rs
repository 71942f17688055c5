use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::grid::NavGraph;
use crate::types::{GridPoint, HeuristicMode, Point};

#[derive(Clone, Copy, Debug)]
struct Frontier {
    priority: f32,
    cost: f32,
    seq: u64,
    node: GridPoint,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    // BinaryHeap is a max-heap: lowest priority first, then earliest insertion.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

fn heuristic(node: GridPoint, goal: GridPoint, mode: HeuristicMode) -> f32 {
    let manhattan = node.to_point().manhattan(goal.to_point());
    match mode {
        HeuristicMode::Closest => manhattan,
        HeuristicMode::Farthest => -manhattan,
    }
}

/// A* over the navigation graph. Start and goal are rounded up onto the grid
/// first; the returned path includes both endpoints and is empty when either
/// endpoint is off the graph or the goal can't be reached.
pub fn find_path(graph: &NavGraph, start: Point, goal: Point, mode: HeuristicMode) -> Vec<Point> {
    if !graph.valid_point(start) || !graph.valid_point(goal) {
        return Vec::new();
    }
    let start = graph.normalize(start);
    let goal = graph.normalize(goal);

    let mut open = BinaryHeap::new();
    let mut best_cost: HashMap<GridPoint, f32> = HashMap::new();
    let mut came_from: HashMap<GridPoint, GridPoint> = HashMap::new();
    let mut seq = 0u64;

    best_cost.insert(start, 0.0);
    open.push(Frontier {
        priority: heuristic(start, goal, mode),
        cost: 0.0,
        seq,
        node: start,
    });

    while let Some(current) = open.pop() {
        if current.node == goal {
            return reconstruct(&came_from, start, goal);
        }
        if best_cost
            .get(&current.node)
            .is_some_and(|&best| current.cost > best)
        {
            continue;
        }

        for &next in graph.neighbors(current.node) {
            let cost = current.cost + current.node.to_point().distance(next.to_point());
            if best_cost.get(&next).is_some_and(|&best| cost >= best) {
                continue;
            }
            best_cost.insert(next, cost);
            came_from.insert(next, current.node);
            seq += 1;
            open.push(Frontier {
                priority: cost + heuristic(next, goal, mode),
                cost,
                seq,
                node: next,
            });
        }
    }
    Vec::new()
}

fn reconstruct(came_from: &HashMap<GridPoint, GridPoint>, start: GridPoint, goal: GridPoint) -> Vec<Point> {
    let mut path = vec![goal.to_point()];
    let mut node = goal;
    while node != start {
        let Some(&prev) = came_from.get(&node) else {
            break;
        };
        path.push(prev.to_point());
        node = prev;
    }
    path.reverse();
    path
}

/// Sum of the segment lengths along a path.
pub fn path_length(path: &[Point]) -> f32 {
    path.windows(2).map(|pair| pair[0].distance(pair[1])).sum()
}
