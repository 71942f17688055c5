use std::fmt;

use crate::grid::Bitmap;
use crate::types::Point;

pub const DEFAULT_LAYOUT: &str = "\
############################
#o...........##...........o#
#.####.#####.##.#####.####.#
#..........................#
#.####.##.########.##.####.#
#......##....##....##......#
######.##### ## #####.######
######.##          ##.######
######.## ###==### ##.######
#     .   #GG  GG#   .     #
######.## ######## ##.######
#............P.............#
#.####.#####.##.#####.####.#
#o..##.......##.......##..o#
############################
";

#[derive(Debug, PartialEq, Eq)]
pub enum LayoutError {
    Empty,
    ZeroCellSize,
    MissingPacmanSpawn,
    UnknownTile { row: usize, col: usize, tile: char },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Empty => write!(f, "layout has no rows"),
            LayoutError::ZeroCellSize => write!(f, "cell size must be positive"),
            LayoutError::MissingPacmanSpawn => write!(f, "layout has no pacman spawn ('P')"),
            LayoutError::UnknownTile { row, col, tile } => {
                write!(f, "unknown tile {tile:?} at row {row}, column {col}")
            }
        }
    }
}

impl std::error::Error for LayoutError {}

/// A maze expanded to position units: one wall bitmap per collision layer
/// plus the spots where things start.
#[derive(Clone, Debug)]
pub struct BoardLayout {
    pub cell_size: i32,
    pub width: usize,
    pub height: usize,
    pub pacman_walls: Bitmap,
    pub ghost_walls: Bitmap,
    pub pacman_spawns: Vec<Point>,
    pub ghost_spawns: Vec<Point>,
    pub scatter_triggers: Vec<Point>,
    pub points: Vec<Point>,
}

impl BoardLayout {
    /// `#` wall, `=` pacman-only wall, `P` pacman spawn, `G` ghost spawn,
    /// `o` scatter trigger, `.` point, space open.
    pub fn parse(text: &str, cell_size: i32) -> Result<Self, LayoutError> {
        if cell_size <= 0 {
            return Err(LayoutError::ZeroCellSize);
        }
        let rows: Vec<&str> = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .collect();
        if rows.is_empty() {
            return Err(LayoutError::Empty);
        }

        let cell = cell_size as usize;
        let cols = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
        let width = cols * cell;
        let height = rows.len() * cell;
        let mut pacman_walls = Bitmap::new(width, height);
        let mut ghost_walls = Bitmap::new(width, height);
        let mut pacman_spawns = Vec::new();
        let mut ghost_spawns = Vec::new();
        let mut scatter_triggers = Vec::new();
        let mut points = Vec::new();

        for (row, line) in rows.iter().enumerate() {
            for (col, tile) in line.chars().enumerate() {
                let origin = Point::new((col * cell) as f32, (row * cell) as f32);
                let (pacman_blocked, ghost_blocked) = match tile {
                    '#' => (true, true),
                    '=' => (true, false),
                    'P' => {
                        pacman_spawns.push(origin);
                        (false, false)
                    }
                    'G' => {
                        ghost_spawns.push(origin);
                        (false, false)
                    }
                    'o' => {
                        scatter_triggers.push(origin);
                        (false, false)
                    }
                    '.' => {
                        points.push(origin);
                        (false, false)
                    }
                    ' ' => (false, false),
                    other => {
                        return Err(LayoutError::UnknownTile {
                            row,
                            col,
                            tile: other,
                        })
                    }
                };
                if !pacman_blocked && !ghost_blocked {
                    continue;
                }
                for y in row * cell..(row + 1) * cell {
                    for x in col * cell..(col + 1) * cell {
                        if pacman_blocked {
                            pacman_walls.set_wall(x, y, true);
                        }
                        if ghost_blocked {
                            ghost_walls.set_wall(x, y, true);
                        }
                    }
                }
            }
        }

        if pacman_spawns.is_empty() {
            return Err(LayoutError::MissingPacmanSpawn);
        }

        Ok(Self {
            cell_size,
            width,
            height,
            pacman_walls,
            ghost_walls,
            pacman_spawns,
            ghost_spawns,
            scatter_triggers,
            points,
        })
    }
}
