use rand::Rng;
use serde::{Deserialize, Serialize};

use super::location::Location;

/// Identity of a tile for the lifetime of one game. Sliding keeps the id;
/// the tile absorbed by a merge is gone for good.
pub type TileId = u64;

/// Largest value a tile may hold. Tiles of this value no longer merge, so tile
/// values stay within `u32` and the session encoding.
pub const MAX_TILE_VALUE: u32 = 1 << 30;

/// A numbered game piece. `value` is always a power of two, at least 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    id: TileId,
    value: u32,
    location: Location,
}

impl Tile {
    /// A tile with a fixed value, as used when restoring a session.
    pub fn new(id: TileId, value: u32, location: Location) -> Self {
        assert!(
            value >= 2 && value.is_power_of_two() && value <= MAX_TILE_VALUE,
            "tile value {value} is not a power of two in 2..={MAX_TILE_VALUE}"
        );
        Tile { id, value, location }
    }

    /// A 2 (90%) or 4 (10%) tile, drawn from `rng`.
    ///
    /// ```
    /// use twenty48_core::engine::{Location, Tile};
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(7);
    /// let t = Tile::new_random(&mut rng, 0, Location::new(0, 0));
    /// assert!(t.value() == 2 || t.value() == 4);
    /// ```
    pub fn new_random<R: Rng + ?Sized>(rng: &mut R, id: TileId, location: Location) -> Self {
        let value = if rng.gen_range(0..10) < 9 { 2 } else { 4 };
        Tile { id, value, location }
    }

    #[inline]
    pub fn id(&self) -> TileId {
        self.id
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.value
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.location
    }

    #[inline]
    pub(crate) fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    /// True if `other` exists and carries the same value, below
    /// [`MAX_TILE_VALUE`].
    ///
    /// Whether `self` already absorbed a tile during the current move is
    /// tracked by the grid, not the tile.
    #[inline]
    pub fn is_mergeable(&self, other: Option<&Tile>) -> bool {
        self.value < MAX_TILE_VALUE && other.is_some_and(|o| o.value == self.value)
    }

    /// Absorb `other`, returning the new value (the points the merge is worth).
    pub fn merge(&mut self, other: &Tile) -> u32 {
        debug_assert_eq!(self.value, other.value, "merging unequal tiles");
        self.value += other.value;
        self.value
    }

    /// `log2(value)`, the exponent used by the session encoding.
    #[inline]
    pub fn exponent(&self) -> u32 {
        self.value.trailing_zeros()
    }
}
