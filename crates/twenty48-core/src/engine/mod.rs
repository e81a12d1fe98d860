//! Engine module: grid model and move resolution for sliding-tile play.
//!
//! - `GameGrid` owns the cells and resolves moves, spawns and end of game.
//! - `GridOperator` knows the grid size and the direction-aware scan order.
//! - `Tile`, `Location` and `Direction` are the small value types underneath.
//!
//! Everything here is synchronous and free of I/O; randomness comes in
//! through a caller-provided `rand::Rng`.

mod events;
mod grid;
mod location;
mod operator;
mod tile;

pub use events::{GameEvent, MoveOutcome};
pub use grid::{GameGrid, WIN_VALUE};
pub use location::{Direction, Location, ParseDirectionError};
pub use operator::{DEFAULT_GRID_SIZE, GridOperator};
pub use tile::{MAX_TILE_VALUE, Tile, TileId};
