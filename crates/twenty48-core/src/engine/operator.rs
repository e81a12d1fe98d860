use super::location::{Direction, Location};

pub const DEFAULT_GRID_SIZE: usize = 4;

/// Grid-size-aware traversal and bounds checking.
///
/// Traversal orders are computed per call from the direction, so there is no
/// shared ordering state to keep in sync between moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridOperator {
    grid_size: usize,
}

impl Default for GridOperator {
    fn default() -> Self {
        GridOperator::new(DEFAULT_GRID_SIZE)
    }
}

impl GridOperator {
    pub fn new(grid_size: usize) -> Self {
        assert!(grid_size > 0, "grid size must be positive");
        GridOperator { grid_size }
    }

    #[inline]
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Column order for a move: high to low when moving right, else low to high.
    pub fn traverse_x(&self, direction: Direction) -> Vec<i32> {
        axis_order(self.grid_size, direction == Direction::Right)
    }

    /// Row order for a move: high to low when moving down, else low to high.
    pub fn traverse_y(&self, direction: Direction) -> Vec<i32> {
        axis_order(self.grid_size, direction == Direction::Down)
    }

    /// Every cell, columns outer and rows inner, ordered so that cells closer
    /// to the wall the tiles move toward come first.
    ///
    /// ```
    /// use twenty48_core::engine::{Direction, GridOperator, Location};
    /// let op = GridOperator::new(2);
    /// assert_eq!(
    ///     op.traversal_order(Direction::Right),
    ///     vec![
    ///         Location::new(1, 0),
    ///         Location::new(1, 1),
    ///         Location::new(0, 0),
    ///         Location::new(0, 1),
    ///     ],
    /// );
    /// ```
    pub fn traversal_order(&self, direction: Direction) -> Vec<Location> {
        let ys = self.traverse_y(direction);
        self.traverse_x(direction)
            .into_iter()
            .flat_map(|x| ys.iter().map(move |&y| Location::new(x, y)))
            .collect()
    }

    /// Every cell in row-major order.
    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        (0..self.cell_count()).map(|idx| Location::from_index(idx, self.grid_size))
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.grid_size * self.grid_size
    }

    #[inline]
    pub fn is_valid_location(&self, loc: Location) -> bool {
        loc.is_valid_for(self.grid_size)
    }
}

fn axis_order(grid_size: usize, reversed: bool) -> Vec<i32> {
    let forward = 0..grid_size as i32;
    if reversed {
        forward.rev().collect()
    } else {
        forward.collect()
    }
}
