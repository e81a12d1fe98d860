use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;
use twenty48_core::engine::{Direction, GameEvent, GameGrid, MoveOutcome};
use twenty48_core::session::SessionRecord;

use crate::clock::GameClock;
use crate::mode::GameMode;
use crate::repository::{SessionError, SessionRepository};
use crate::store::{KeyValueStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    /// The current mode does not allow saving right now.
    NotAllowed,
    /// The store refused the write; the game in memory is unchanged.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreStatus {
    /// The saved session replaced the current game. Events announce its tiles.
    Restored(Vec<GameEvent>),
    /// Nothing usable could be read; a new game was started instead.
    NotFound(Vec<GameEvent>),
    NotAllowed,
}

/// One player's game: the grid plus score, best score, mode, clock and the
/// persistence around them.
///
/// Storage failures never abort play. They are logged and the game carries on
/// in memory.
pub struct Game<S, R> {
    repo: SessionRepository<S>,
    rng: R,
    grid: GameGrid,
    mode: GameMode,
    score: u64,
    best: u64,
    points: u64,
    game_id: u32,
    paused: bool,
    over: bool,
    tile_2048_found: bool,
    clock: GameClock,
}

impl<S: KeyValueStore, R: Rng> Game<S, R> {
    /// Load settings from `repo` and start a first game of `grid_size`.
    pub fn new(mut repo: SessionRepository<S>, rng: R, grid_size: usize) -> Self {
        if let Err(err) = repo.init_defaults() {
            warn!("could not initialise settings: {err}");
        }
        let mode = repo.game_mode().unwrap_or_else(|err| {
            warn!("could not read game mode: {err}");
            GameMode::default()
        });
        let mut game = Game {
            repo,
            rng,
            grid: GameGrid::new(grid_size),
            mode,
            score: 0,
            best: 0,
            points: 0,
            game_id: 0,
            paused: false,
            over: false,
            tile_2048_found: false,
            clock: GameClock::default(),
        };
        game.best = game.load_best();
        game.begin(grid_size, None);
        game
    }

    /// Resolve one move. `None` when moves are not accepted (paused or over).
    pub fn move_tiles(&mut self, direction: Direction) -> Option<MoveOutcome> {
        if self.paused || self.over {
            debug!("move {direction} ignored: paused={} over={}", self.paused, self.over);
            return None;
        }
        self.points = 0;
        let mut outcome = self.grid.move_tiles(direction, &mut self.rng);
        if !outcome.moved {
            return Some(outcome);
        }

        self.points = outcome.points;
        if outcome.points > 0 {
            self.score += outcome.points;
            self.best = self.best.max(self.score);
            let at = outcome
                .events
                .iter()
                .position(|e| matches!(e, GameEvent::PointsEarned(_)))
                .map_or(outcome.events.len(), |i| i + 1);
            outcome.events.insert(at, GameEvent::ScoreChanged(self.score));
        }
        if outcome.reached_win_value {
            self.tile_2048_found = true;
        }
        if outcome.won {
            info!("game {} won with score {}", self.game_id, self.score);
        }
        if outcome.game_over {
            self.over = true;
            self.clock.pause();
            info!("game {} over with score {}", self.game_id, self.score);
            self.persist_best();
        }
        Some(outcome)
    }

    /// Abandon the current game and start a fresh one, possibly with a
    /// different grid size. Returns the events for the opening tiles.
    pub fn start_new_game(&mut self, grid_size: usize) -> Vec<GameEvent> {
        self.persist_best();
        let current = self.game_id;
        self.grid = GameGrid::new(grid_size);
        self.best = self.load_best();
        self.begin(grid_size, Some(current))
    }

    pub fn save_session(&mut self) -> SaveStatus {
        if !self.mode.save_allowed(self.tile_2048_found) {
            return SaveStatus::NotAllowed;
        }
        let record = SessionRecord::from_grid(
            &self.grid,
            self.score,
            self.clock.elapsed_nanos(),
            self.game_id,
        );
        match self.repo.save_session(self.mode, &record) {
            Ok(()) => {
                self.tile_2048_found = false;
                self.persist_best();
                info!("saved game {} ({}, score {})", self.game_id, self.mode, self.score);
                SaveStatus::Saved
            }
            Err(err) => {
                warn!("could not save game {}: {err}", self.game_id);
                SaveStatus::Failed
            }
        }
    }

    /// Replace the current game with the saved one for this grid size and
    /// mode. A missing, corrupt or unreadable save starts a new game.
    pub fn restore_session(&mut self) -> RestoreStatus {
        if !self.mode.restore_allowed() {
            return RestoreStatus::NotAllowed;
        }
        let grid_size = self.grid.grid_size();
        let record = match self.repo.restore_session(grid_size, self.mode) {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!("no saved game for {grid_size}x{grid_size} in {}", self.mode);
                return RestoreStatus::NotFound(self.start_new_game(grid_size));
            }
            Err(err @ SessionError::Corrupt { .. }) => {
                warn!("discarding saved game: {err}");
                return RestoreStatus::NotFound(self.start_new_game(grid_size));
            }
            Err(SessionError::Store(err)) => {
                warn!("could not read saved game, starting a new one: {err}");
                return RestoreStatus::NotFound(self.start_new_game(grid_size));
            }
        };

        self.persist_best();
        self.grid = record.to_grid();
        self.grid.mark_won_if_reached();
        self.score = record.score;
        self.points = 0;
        self.game_id = record.game_id;
        self.tile_2048_found = false;
        self.paused = false;
        self.over = self.grid.check_end_game();
        self.clock = GameClock::started_at(Duration::from_nanos(record.elapsed_nanos));
        if self.over {
            self.clock.pause();
        }
        self.best = self.load_best().max(self.score);
        info!("restored game {} ({}, score {})", self.game_id, self.mode, self.score);

        let mut events: Vec<GameEvent> = self
            .grid
            .tiles()
            .map(|&tile| GameEvent::TileAdded { tile })
            .collect();
        events.push(GameEvent::ScoreChanged(self.score));
        if self.over {
            events.push(GameEvent::GameOver);
        }
        RestoreStatus::Restored(events)
    }

    /// Switch mode: keep the best score of the old mode, remember the new mode
    /// and start a new game in it.
    pub fn set_game_mode(&mut self, mode: GameMode) -> Vec<GameEvent> {
        self.persist_best();
        if let Err(err) = self.repo.set_game_mode(mode) {
            warn!("could not store game mode: {err}");
        }
        info!("game mode {} -> {mode}", self.mode);
        self.mode = mode;
        self.best = self.load_best();
        let grid_size = self.grid.grid_size();
        self.start_new_game(grid_size)
    }

    /// Persist the best score for the current grid size and mode.
    pub fn save_record(&mut self) -> Result<u64, StoreError> {
        let stored = self.repo.save_record(self.grid.grid_size(), self.mode, self.best)?;
        self.best = stored;
        Ok(stored)
    }

    pub fn pause(&mut self) {
        self.paused = true;
        self.clock.pause();
    }

    pub fn resume(&mut self) {
        self.paused = false;
        if !self.over {
            self.clock.resume();
        }
    }

    pub fn grid(&self) -> &GameGrid {
        &self.grid
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn best(&self) -> u64 {
        self.best
    }

    /// Points earned by the last move.
    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn game_id(&self) -> u32 {
        self.game_id
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn is_won(&self) -> bool {
        self.grid.is_won()
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    pub fn repository(&self) -> &SessionRepository<S> {
        &self.repo
    }

    fn begin(&mut self, grid_size: usize, current: Option<u32>) -> Vec<GameEvent> {
        self.game_id = self.issue_game_id(current);
        self.score = 0;
        self.points = 0;
        self.over = false;
        self.paused = false;
        self.tile_2048_found = false;
        self.clock = GameClock::started_at(Duration::ZERO);
        let events = self.grid.start(&mut self.rng);
        info!("new {grid_size}x{grid_size} game {} ({})", self.game_id, self.mode);
        events
    }

    /// Next id is one past the larger of the stored and the current id.
    fn issue_game_id(&mut self, current: Option<u32>) -> u32 {
        let stored = self.repo.last_game_id().unwrap_or_else(|err| {
            warn!("could not read last game id: {err}");
            -1
        });
        let current = current.map_or(-1, i64::from);
        let next = u32::try_from(stored.max(current) + 1).unwrap_or(0);
        if let Err(err) = self.repo.set_last_game_id(next) {
            warn!("could not store game id {next}: {err}");
        }
        next
    }

    fn load_best(&self) -> u64 {
        self.repo
            .restore_record(self.grid.grid_size(), self.mode)
            .unwrap_or_else(|err| {
                warn!("could not read best score: {err}");
                0
            })
    }

    fn persist_best(&mut self) {
        if let Err(err) = self.save_record() {
            warn!("could not store best score: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rand::{SeedableRng, rngs::StdRng};
    use twenty48_core::engine::Location;

    type TestGame = Game<MemoryStore, StdRng>;

    fn new_game(store: MemoryStore) -> TestGame {
        Game::new(SessionRepository::new(store), StdRng::seed_from_u64(7), 4)
    }

    fn count(events: &[GameEvent], pred: impl Fn(&GameEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(*e)).count()
    }

    /// Fails every write; reads see an empty store.
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(std::io::Error::other("read-only").into())
        }
    }

    /// Memory store whose reads can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_reads: bool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            if self.fail_reads {
                return Err(std::io::Error::other("disk gone").into());
            }
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.inner.set(key, value)
        }
    }

    #[test]
    fn first_games_get_consecutive_ids() {
        let mut game = new_game(MemoryStore::new());
        assert_eq!(game.game_id(), 0);
        assert_eq!(game.repository().last_game_id().unwrap(), 0);
        let tiles = game.grid().tiles().count();
        assert!((1..=2).contains(&tiles), "{tiles} opening tiles");

        let events = game.start_new_game(4);
        assert_eq!(game.game_id(), 1);
        assert_eq!(game.repository().last_game_id().unwrap(), 1);
        assert_eq!(
            count(&events, |e| matches!(e, GameEvent::TileAdded { .. })),
            game.grid().tiles().count()
        );
    }

    #[test]
    fn game_id_continues_from_store() {
        let mut store = MemoryStore::new();
        store.set("game_id", "41").unwrap();
        let game = new_game(store);
        assert_eq!(game.game_id(), 42);
    }

    #[test]
    fn merge_left_scores_and_spawns() {
        let mut game = new_game(MemoryStore::new());
        game.grid = GameGrid::new(4);
        game.grid.insert_tile(2, Location::new(0, 0));
        game.grid.insert_tile(2, Location::new(1, 0));

        let out = game.move_tiles(Direction::Left).expect("move accepted");
        assert!(out.moved);
        assert_eq!(out.points, 4);
        assert_eq!(game.score(), 4);
        assert_eq!(game.points(), 4);
        assert_eq!(game.best(), 4);
        assert_eq!(game.grid().get(Location::new(0, 0)).map(|t| t.value()), Some(4));
        assert_eq!(game.grid().tiles().count(), 2);

        let earned = out.events.iter().position(|e| *e == GameEvent::PointsEarned(4)).unwrap();
        assert_eq!(out.events[earned + 1], GameEvent::ScoreChanged(4));
    }

    #[test]
    fn blocked_move_changes_nothing() {
        let mut game = new_game(MemoryStore::new());
        game.grid = GameGrid::from_values(2, &[2, 0, 0, 0]);
        let out = game.move_tiles(Direction::Left).unwrap();
        assert!(!out.moved);
        assert!(out.events.is_empty());
        assert_eq!(game.score(), 0);
        assert_eq!(game.grid().values(), vec![2, 0, 0, 0]);
    }

    #[test]
    fn blocked_move_clears_last_points() {
        let mut game = new_game(MemoryStore::new());
        game.grid = GameGrid::new(4);
        game.grid.insert_tile(2, Location::new(0, 0));
        game.grid.insert_tile(2, Location::new(1, 0));
        game.move_tiles(Direction::Left).unwrap();
        assert_eq!(game.points(), 4);

        game.grid = GameGrid::from_values(4, &[2, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let out = game.move_tiles(Direction::Left).unwrap();
        assert!(!out.moved);
        assert_eq!(game.points(), 0);
        assert_eq!(game.score(), 4);
    }

    #[test]
    fn moves_are_rejected_while_paused() {
        let mut game = new_game(MemoryStore::new());
        game.pause();
        assert!(game.is_paused());
        let before = game.grid().clone();
        assert!(game.move_tiles(Direction::Up).is_none());
        assert_eq!(game.grid(), &before);
        game.resume();
        assert!(!game.is_paused());
    }

    #[test]
    fn game_over_stops_play() {
        let mut game = new_game(MemoryStore::new());
        // Whatever spawns in the freed corner cannot match its neighbours.
        game.grid = GameGrid::from_values(2, &[8, 16, 32, 0]);
        let out = game.move_tiles(Direction::Right).unwrap();
        assert!(out.game_over);
        assert_eq!(out.events.last(), Some(&GameEvent::GameOver));
        assert!(game.is_over());
        assert!(game.move_tiles(Direction::Left).is_none());

        let frozen = game.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(game.elapsed(), frozen);
    }

    #[test]
    fn save_and_restore_roundtrip() {
        let mut game = new_game(MemoryStore::new());
        let values = [2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 0, 0, 0, 0, 0, 0];
        game.grid = GameGrid::from_values(4, &values);
        game.score = 3000;
        game.best = 3000;
        let saved_id = game.game_id();
        assert_eq!(game.save_session(), SaveStatus::Saved);

        game.start_new_game(4);
        assert_ne!(game.game_id(), saved_id);
        assert_eq!(game.score(), 0);

        let RestoreStatus::Restored(events) = game.restore_session() else {
            panic!("expected a restored game");
        };
        assert_eq!(game.game_id(), saved_id);
        assert_eq!(game.score(), 3000);
        assert_eq!(game.best(), 3000);
        assert_eq!(game.grid().values()[9], 1024);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::TileAdded { .. })), 10);
        assert!(!game.is_won());
        assert!(!game.is_over());
    }

    #[test]
    fn restore_with_2048_is_silently_won() {
        let mut game = new_game(MemoryStore::new());
        let mut values = vec![0; 16];
        values[0] = 2048;
        values[4] = 1024;
        values[5] = 1024;
        game.grid = GameGrid::from_values(4, &values);
        assert_eq!(game.save_session(), SaveStatus::Saved);

        let RestoreStatus::Restored(events) = game.restore_session() else {
            panic!("expected a restored game");
        };
        assert!(game.is_won());
        assert_eq!(count(&events, |e| *e == GameEvent::GameWon), 0);

        let out = game.move_tiles(Direction::Left).unwrap();
        assert!(out.reached_win_value);
        assert!(!out.won);
        assert_eq!(count(&out.events, |e| *e == GameEvent::GameWon), 0);
    }

    #[test]
    fn missing_save_starts_new_game() {
        let mut game = new_game(MemoryStore::new());
        let id = game.game_id();
        assert!(matches!(game.restore_session(), RestoreStatus::NotFound(_)));
        assert_eq!(game.game_id(), id + 1);
    }

    #[test]
    fn corrupt_save_starts_new_game() {
        let mut store = MemoryStore::new();
        store.set("Location.4.0", "zz").unwrap();
        store.set("score.4.0", "5").unwrap();
        let mut game = new_game(store);
        assert!(matches!(game.restore_session(), RestoreStatus::NotFound(_)));
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn advanced_saves_only_after_2048() {
        let mut game = new_game(MemoryStore::new());
        game.set_game_mode(GameMode::Advanced);
        assert_eq!(game.save_session(), SaveStatus::NotAllowed);

        let mut values = vec![0; 16];
        values[0] = 1024;
        values[1] = 1024;
        game.grid = GameGrid::from_values(4, &values);
        let out = game.move_tiles(Direction::Left).unwrap();
        assert!(out.won);
        assert_eq!(count(&out.events, |e| *e == GameEvent::GameWon), 1);

        assert_eq!(game.save_session(), SaveStatus::Saved);
        assert_eq!(game.save_session(), SaveStatus::NotAllowed);
        assert!(game.repository().has_session(4, GameMode::Advanced).unwrap());
        assert!(!game.repository().has_session(4, GameMode::Easy).unwrap());
    }

    #[test]
    fn expert_neither_saves_nor_restores() {
        let mut game = new_game(MemoryStore::new());
        game.set_game_mode(GameMode::Expert);
        assert_eq!(game.save_session(), SaveStatus::NotAllowed);
        assert_eq!(game.restore_session(), RestoreStatus::NotAllowed);
    }

    #[test]
    fn mode_change_keeps_best_per_mode() {
        let mut game = new_game(MemoryStore::new());
        game.best = 900;
        game.set_game_mode(GameMode::Advanced);
        assert_eq!(game.mode(), GameMode::Advanced);
        assert_eq!(game.best(), 0);
        assert_eq!(game.repository().game_mode().unwrap(), GameMode::Advanced);

        game.set_game_mode(GameMode::Easy);
        assert_eq!(game.best(), 900);
    }

    #[test]
    fn stored_mode_is_loaded() {
        let mut store = MemoryStore::new();
        store.set("game_mode", "2").unwrap();
        store.set("record.4.2", "640").unwrap();
        let game = new_game(store);
        assert_eq!(game.mode(), GameMode::Expert);
        assert_eq!(game.best(), 640);
    }

    #[test]
    fn unreadable_store_restores_as_new_game() {
        let mut game = Game::new(
            SessionRepository::new(FlakyStore::default()),
            StdRng::seed_from_u64(5),
            4,
        );
        game.score = 512;
        assert_eq!(game.save_session(), SaveStatus::Saved);
        let id = game.game_id();

        game.repo.store_mut().fail_reads = true;
        let RestoreStatus::NotFound(events) = game.restore_session() else {
            panic!("expected a fresh game");
        };
        assert_eq!(game.game_id(), id + 1);
        assert_eq!(game.score(), 0);
        assert!(!game.is_over());
        assert_eq!(
            count(&events, |e| matches!(e, GameEvent::TileAdded { .. })),
            game.grid().tiles().count()
        );
    }

    #[test]
    fn failed_save_leaves_game_alone() {
        let repo = SessionRepository::new(ReadOnlyStore);
        let mut game = Game::new(repo, StdRng::seed_from_u64(3), 4);
        assert_eq!(game.game_id(), 0);
        let before = game.grid().clone();
        assert_eq!(game.save_session(), SaveStatus::Failed);
        assert_eq!(game.grid(), &before);
        assert!(game.save_record().is_err());
    }
}
