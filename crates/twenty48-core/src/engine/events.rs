use serde::{Deserialize, Serialize};

use super::location::{Direction, Location};
use super::tile::Tile;

/// Logical change notifications for the presentation layer, in the order
/// they happened. They carry no timing; animating them is up to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    TileAdded { tile: Tile },
    TileMoved { tile: Tile, from: Location, to: Location },
    /// `surviving` carries the doubled value; `removed` is about to disappear.
    TileMerged { surviving: Tile, removed: Tile },
    TileRemoved { tile: Tile },
    PointsEarned(u64),
    ScoreChanged(u64),
    /// First 2048 tile of the game.
    GameWon,
    GameOver,
}

/// Result of resolving one move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub direction: Direction,
    /// False when nothing could slide or merge; the grid is then untouched.
    pub moved: bool,
    /// Number of cells whose tile slid or merged.
    pub moved_tiles: usize,
    /// Sum of the values of every tile produced by a merge.
    pub points: u64,
    pub spawned: Option<Tile>,
    /// A merge produced the winning value during this move.
    pub reached_win_value: bool,
    /// The win signal fired (first time only, per game).
    pub won: bool,
    pub game_over: bool,
    pub events: Vec<GameEvent>,
}

impl MoveOutcome {
    pub(crate) fn blocked(direction: Direction) -> Self {
        MoveOutcome {
            direction,
            moved: false,
            moved_tiles: 0,
            points: 0,
            spawned: None,
            reached_win_value: false,
            won: false,
            game_over: false,
            events: Vec::new(),
        }
    }
}
