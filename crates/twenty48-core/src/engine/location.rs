use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A direction to slide/merge tiles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four directions, in keybinding order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit step `(dx, dy)` for this direction. `y` grows downwards.
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Name of the key bound to this direction.
    pub fn key_name(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown direction `{0}`")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    /// Accepts key names case-insensitively (`up`, `LEFT`) and their initials (`u`, `l`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "u" => Ok(Direction::Up),
            "down" | "d" => Ok(Direction::Down),
            "left" | "l" => Ok(Direction::Left),
            "right" | "r" => Ok(Direction::Right),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

/// A cell coordinate on the grid. `x` is the column, `y` the row.
///
/// Coordinates are signed so that stepping off the edge yields a location
/// that simply fails [`Location::is_valid_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    x: i32,
    y: i32,
}

impl Location {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Location { x, y }
    }

    #[inline]
    pub fn x(self) -> i32 {
        self.x
    }

    #[inline]
    pub fn y(self) -> i32 {
        self.y
    }

    /// Neighbouring location in `direction`. No bounds check.
    #[inline]
    pub fn offset(self, direction: Direction) -> Location {
        let (dx, dy) = direction.delta();
        Location::new(self.x + dx, self.y + dy)
    }

    #[inline]
    pub fn is_valid_for(self, grid_size: usize) -> bool {
        let n = grid_size as i64;
        (0..n).contains(&(self.x as i64)) && (0..n).contains(&(self.y as i64))
    }

    /// Row-major cell index (`x + grid_size * y`). Only meaningful for valid locations.
    #[inline]
    pub fn index(self, grid_size: usize) -> usize {
        debug_assert!(self.is_valid_for(grid_size), "{self} outside {grid_size}x{grid_size}");
        self.x as usize + grid_size * self.y as usize
    }

    /// Inverse of [`Location::index`].
    #[inline]
    pub fn from_index(index: usize, grid_size: usize) -> Location {
        Location::new((index % grid_size) as i32, (index / grid_size) as i32)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_offsets_by_direction_delta() {
        let loc = Location::new(1, 1);
        assert_eq!(loc.offset(Direction::Up), Location::new(1, 0));
        assert_eq!(loc.offset(Direction::Down), Location::new(1, 2));
        assert_eq!(loc.offset(Direction::Left), Location::new(0, 1));
        assert_eq!(loc.offset(Direction::Right), Location::new(2, 1));
    }

    #[test]
    fn it_bounds_checks() {
        assert!(Location::new(0, 0).is_valid_for(4));
        assert!(Location::new(3, 3).is_valid_for(4));
        assert!(!Location::new(4, 0).is_valid_for(4));
        assert!(!Location::new(0, -1).is_valid_for(4));
        assert!(!Location::new(0, 0).offset(Direction::Left).is_valid_for(4));
    }

    #[test]
    fn it_maps_index_both_ways() {
        for idx in 0..16 {
            let loc = Location::from_index(idx, 4);
            assert_eq!(loc.index(4), idx);
        }
        assert_eq!(Location::new(2, 1).index(4), 6);
    }

    #[test]
    fn it_parses_directions() {
        assert_eq!("up".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("R".parse::<Direction>().unwrap(), Direction::Right);
        assert_eq!(" Left ".parse::<Direction>().unwrap(), Direction::Left);
        assert!("sideways".parse::<Direction>().is_err());
        for dir in Direction::ALL {
            assert_eq!(dir.key_name().parse::<Direction>().unwrap(), dir);
        }
    }
}
