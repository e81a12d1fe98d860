use std::collections::HashSet;
use std::fmt;

use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;

use super::events::{GameEvent, MoveOutcome};
use super::location::{Direction, Location};
use super::operator::GridOperator;
use super::tile::{Tile, TileId};

/// Tile value that wins the game. Reaching it does not end play.
pub const WIN_VALUE: u32 = 2048;

/// Square grid of cells, each empty or holding one [`Tile`].
///
/// Cells are stored row-major (`x + size * y`), so every location of the grid
/// always has exactly one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameGrid {
    operator: GridOperator,
    cells: Vec<Option<Tile>>,
    next_id: TileId,
    won: bool,
}

impl GameGrid {
    /// An empty `grid_size` x `grid_size` grid.
    pub fn new(grid_size: usize) -> Self {
        let operator = GridOperator::new(grid_size);
        GameGrid {
            operator,
            cells: vec![None; operator.cell_count()],
            next_id: 0,
            won: false,
        }
    }

    /// Rebuild a grid from row-major tile values, `0` meaning empty.
    ///
    /// ```
    /// use twenty48_core::engine::{GameGrid, Location};
    /// let g = GameGrid::from_values(2, &[2, 0, 0, 4]);
    /// assert_eq!(g.get(Location::new(1, 1)).map(|t| t.value()), Some(4));
    /// assert_eq!(g.count_empty(), 2);
    /// ```
    pub fn from_values(grid_size: usize, values: &[u32]) -> Self {
        let mut grid = GameGrid::new(grid_size);
        assert_eq!(
            values.len(),
            grid.cells.len(),
            "expected {} values for a {grid_size}x{grid_size} grid",
            grid.cells.len()
        );
        for (idx, &value) in values.iter().enumerate() {
            if value != 0 {
                grid.insert_tile(value, Location::from_index(idx, grid_size));
            }
        }
        grid
    }

    #[inline]
    pub fn grid_size(&self) -> usize {
        self.operator.grid_size()
    }

    #[inline]
    pub fn operator(&self) -> &GridOperator {
        &self.operator
    }

    /// The tile at `loc`, or `None` if the cell is empty or off the grid.
    #[inline]
    pub fn get(&self, loc: Location) -> Option<&Tile> {
        if !self.operator.is_valid_location(loc) {
            return None;
        }
        self.cells[loc.index(self.grid_size())].as_ref()
    }

    /// Put a new tile of `value` on an empty cell.
    pub fn insert_tile(&mut self, value: u32, loc: Location) -> Tile {
        let tile = Tile::new(self.issue_id(), value, loc);
        self.place(tile);
        tile
    }

    /// Occupied cells, row-major.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.cells.iter().flatten()
    }

    /// Row-major tile values, `0` for empty cells.
    pub fn values(&self) -> Vec<u32> {
        self.cells
            .iter()
            .map(|c| c.map_or(0, |t| t.value()))
            .collect()
    }

    pub fn empty_locations(&self) -> Vec<Location> {
        self.operator
            .locations()
            .filter(|&loc| self.get(loc).is_none())
            .collect()
    }

    #[inline]
    pub fn count_empty(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Sum of all tile values. Merges keep it; only spawns raise it.
    pub fn tile_sum(&self) -> u64 {
        self.tiles().map(|t| t.value() as u64).sum()
    }

    /// Highest tile value on the grid, `0` if empty.
    pub fn highest_tile(&self) -> u32 {
        self.tiles().map(Tile::value).max().unwrap_or(0)
    }

    /// Whether the win signal already fired for this game.
    #[inline]
    pub fn is_won(&self) -> bool {
        self.won
    }

    /// Mark the game as won, without a signal, if a tile of at least
    /// [`WIN_VALUE`] is present. Used after restoring a session.
    pub fn mark_won_if_reached(&mut self) -> bool {
        if self.highest_tile() >= WIN_VALUE {
            self.won = true;
        }
        self.won
    }

    /// Empty every cell and reset the win signal, then place one random tile
    /// and, with probability 0.8, a second one. Two 4s never open a game.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<GameEvent> {
        self.cells.iter_mut().for_each(|c| *c = None);
        self.won = false;

        let mut locations: Vec<Location> = self.operator.locations().collect();
        locations.shuffle(rng);

        let mut events = Vec::with_capacity(2);
        let id = self.issue_id();
        let first = Tile::new_random(rng, id, locations[0]);
        self.place(first);
        events.push(GameEvent::TileAdded { tile: first });

        if locations.len() > 1 && rng.gen_bool(0.8) {
            let id = self.issue_id();
            let mut second = Tile::new_random(rng, id, locations[1]);
            if first.value() == 4 && second.value() == 4 {
                second = Tile::new(id, 2, locations[1]);
            }
            self.place(second);
            events.push(GameEvent::TileAdded { tile: second });
        }
        events
    }

    /// Insert a random 2 (90%) or 4 (10%) tile into a uniformly chosen empty
    /// cell. Returns `None` when the grid is full.
    pub fn spawn_random_tile<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Tile> {
        let empty = self.empty_locations();
        if empty.is_empty() {
            return None;
        }
        let loc = empty[rng.gen_range(0..empty.len())];
        let id = self.issue_id();
        let tile = Tile::new_random(rng, id, loc);
        self.place(tile);
        Some(tile)
    }

    /// Last empty cell reached walking from `loc` in `direction`; `loc` itself
    /// if the first step is blocked by a tile or the edge.
    pub fn find_farthest_location(&self, loc: Location, direction: Direction) -> Location {
        let mut farthest = loc;
        let mut next = loc.offset(direction);
        while self.operator.is_valid_location(next) && self.get(next).is_none() {
            farthest = next;
            next = next.offset(direction);
        }
        farthest
    }

    /// Slide every tile toward `direction`, merging equal neighbours, then
    /// spawn one random tile if anything changed.
    ///
    /// Each tile absorbs at most one other tile per move. A blocked move
    /// returns an outcome with `moved == false` and leaves the grid untouched.
    ///
    /// ```
    /// use twenty48_core::engine::{Direction, GameGrid, Location};
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(1);
    /// let mut grid = GameGrid::new(4);
    /// grid.insert_tile(2, Location::new(0, 0));
    /// grid.insert_tile(2, Location::new(1, 0));
    /// let out = grid.move_tiles(Direction::Left, &mut rng);
    /// assert!(out.moved);
    /// assert_eq!(out.points, 4);
    /// assert_eq!(grid.get(Location::new(0, 0)).unwrap().value(), 4);
    /// assert_eq!(grid.tiles().count(), 2);
    /// ```
    pub fn move_tiles<R: Rng + ?Sized>(
        &mut self,
        direction: Direction,
        rng: &mut R,
    ) -> MoveOutcome {
        let mut outcome = MoveOutcome::blocked(direction);
        let mut merged_into: HashSet<TileId> = HashSet::new();
        let mut absorbed: Vec<Tile> = Vec::new();

        for here in self.operator.traversal_order(direction) {
            let Some(tile) = self.get(here).copied() else {
                continue;
            };
            let farthest = self.find_farthest_location(here, direction);
            let next = farthest.offset(direction);

            if let Some(&target) = self.get(next) {
                if target.is_mergeable(Some(&tile)) && !merged_into.contains(&target.id()) {
                    let mut survivor = target;
                    let value = survivor.merge(&tile);
                    merged_into.insert(survivor.id());
                    self.replace(survivor);
                    self.vacate(here);

                    let mut gone = tile;
                    gone.set_location(next);
                    outcome.events.push(GameEvent::TileMoved { tile: gone, from: here, to: next });
                    outcome.events.push(GameEvent::TileMerged {
                        surviving: survivor,
                        removed: gone,
                    });
                    absorbed.push(gone);

                    outcome.points += u64::from(value);
                    if value == WIN_VALUE {
                        outcome.reached_win_value = true;
                        if !self.won {
                            self.won = true;
                            outcome.won = true;
                        }
                    }
                    outcome.moved_tiles += 1;
                    continue;
                }
            }

            if farthest != here {
                let mut slid = self.vacate(here);
                slid.set_location(farthest);
                self.place(slid);
                outcome.events.push(GameEvent::TileMoved { tile: slid, from: here, to: farthest });
                outcome.moved_tiles += 1;
            }
        }

        if outcome.moved_tiles == 0 {
            debug!("move {direction} blocked");
            return outcome;
        }
        outcome.moved = true;

        outcome
            .events
            .extend(absorbed.into_iter().map(|tile| GameEvent::TileRemoved { tile }));
        if outcome.points > 0 {
            outcome.events.push(GameEvent::PointsEarned(outcome.points));
        }
        if outcome.won {
            outcome.events.push(GameEvent::GameWon);
        }

        outcome.spawned = self.spawn_random_tile(rng);
        if let Some(tile) = outcome.spawned {
            outcome.events.push(GameEvent::TileAdded { tile });
        }

        outcome.game_over = self.check_end_game();
        if outcome.game_over {
            outcome.events.push(GameEvent::GameOver);
        }

        self.debug_check_consistent();
        debug!(
            "move {direction}: {} tile(s) moved, {} point(s), game over: {}",
            outcome.moved_tiles, outcome.points, outcome.game_over
        );
        outcome
    }

    /// Count of adjacent equal pairs, probing each cell's right and lower
    /// neighbour so every horizontal and vertical pair is seen once.
    pub fn merge_movements_available(&self) -> usize {
        self.tiles()
            .map(|tile| {
                [Direction::Right, Direction::Down]
                    .into_iter()
                    .filter(|&dir| tile.is_mergeable(self.get(tile.location().offset(dir))))
                    .count()
            })
            .sum()
    }

    /// Terminal state: no empty cell and no adjacent equal pair.
    pub fn check_end_game(&self) -> bool {
        self.is_full() && self.merge_movements_available() == 0
    }

    fn issue_id(&mut self) -> TileId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn place(&mut self, tile: Tile) {
        let idx = tile.location().index(self.grid_size());
        let slot = &mut self.cells[idx];
        assert!(
            slot.is_none(),
            "cell {} already holds a tile while placing {:?}",
            tile.location(),
            tile
        );
        *slot = Some(tile);
    }

    fn replace(&mut self, tile: Tile) {
        let idx = tile.location().index(self.grid_size());
        let slot = &mut self.cells[idx];
        assert_eq!(
            slot.map(|t| t.id()),
            Some(tile.id()),
            "replacing a different tile at {}",
            tile.location()
        );
        *slot = Some(tile);
    }

    fn vacate(&mut self, loc: Location) -> Tile {
        let idx = loc.index(self.grid_size());
        match self.cells[idx].take() {
            Some(tile) => tile,
            None => panic!("no tile to remove at {loc}"),
        }
    }

    fn debug_check_consistent(&self) {
        if cfg!(debug_assertions) {
            for (idx, cell) in self.cells.iter().enumerate() {
                if let Some(tile) = cell {
                    assert_eq!(
                        tile.location().index(self.grid_size()),
                        idx,
                        "tile {tile:?} misplaced"
                    );
                }
            }
        }
    }
}

fn format_val(val: u32) -> String {
    if val == 0 {
        " ".repeat(7)
    } else {
        format!("{val:^7}")
    }
}

impl fmt::Display for GameGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.grid_size();
        let rule = "-".repeat(8 * n);
        let values = self.values();
        for (row_idx, row) in values.chunks(n).enumerate() {
            if row_idx > 0 {
                writeln!(f, "{rule}")?;
            }
            let cells: Vec<String> = row.iter().map(|&v| format_val(v)).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}
