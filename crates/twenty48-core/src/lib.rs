//! Sliding-tile (2048) grid engine.
//!
//! ```
//! use twenty48_core::engine::{Direction, GameGrid};
//! use rand::{SeedableRng, rngs::StdRng};
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut grid = GameGrid::new(4);
//! grid.start(&mut rng);
//! let out = grid.move_tiles(Direction::Up, &mut rng);
//! assert!(out.moved || out.events.is_empty());
//! ```

pub mod engine;
pub mod session;
