use log::warn;
use thiserror::Error;
use twenty48_core::session::codec::{self, CodecError, EncodedSession, SessionRecord};

use crate::mode::GameMode;
use crate::store::{KeyValueStore, StoreError};

pub const GAME_MODE_KEY: &str = "game_mode";
pub const GAME_ID_KEY: &str = "game_id";
pub const GAME_LEGACY_KEY: &str = "game_legacy";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("corrupt session under `{key}`: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: CodecError,
    },
}

fn key(field: &str, grid_size: usize, mode: GameMode) -> String {
    format!("{field}.{grid_size}.{}", mode.id())
}

pub fn board_key(grid_size: usize, mode: GameMode) -> String {
    key("Location", grid_size, mode)
}

pub fn score_key(grid_size: usize, mode: GameMode) -> String {
    key("score", grid_size, mode)
}

pub fn time_key(grid_size: usize, mode: GameMode) -> String {
    key("time", grid_size, mode)
}

pub fn game_id_key(grid_size: usize, mode: GameMode) -> String {
    key("gameID", grid_size, mode)
}

pub fn record_key(grid_size: usize, mode: GameMode) -> String {
    key("record", grid_size, mode)
}

/// Sessions, best scores and global settings, namespaced by grid size and
/// game mode on top of a [`KeyValueStore`].
pub struct SessionRepository<S> {
    store: S,
}

impl<S: KeyValueStore> SessionRepository<S> {
    pub fn new(store: S) -> Self {
        SessionRepository { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Seed global settings on first run: mode Easy, no game issued yet.
    pub fn init_defaults(&mut self) -> Result<(), StoreError> {
        if self.get_non_empty(GAME_MODE_KEY)?.is_none() {
            self.store.set(GAME_MODE_KEY, &GameMode::default().id().to_string())?;
        }
        if self.get_non_empty(GAME_ID_KEY)?.is_none() {
            self.store.set(GAME_ID_KEY, "-1")?;
        }
        Ok(())
    }

    /// Whether a session is stored for this slot, without decoding it.
    pub fn has_session(&self, grid_size: usize, mode: GameMode) -> Result<bool, StoreError> {
        Ok(self.store.get(&board_key(grid_size, mode))?.is_some()
            && self.store.get(&score_key(grid_size, mode))?.is_some())
    }

    /// Store `record` in its slot. All four keys are written together.
    pub fn save_session(
        &mut self,
        mode: GameMode,
        record: &SessionRecord,
    ) -> Result<(), StoreError> {
        let n = record.grid_size;
        let encoded = codec::encode_session(record);
        self.store.set_many(&[
            (board_key(n, mode), encoded.board),
            (score_key(n, mode), encoded.score),
            (time_key(n, mode), encoded.elapsed_nanos),
            (game_id_key(n, mode), encoded.game_id),
        ])
    }

    /// Load the session for this slot. `Ok(None)` when nothing was saved;
    /// [`SessionError::Corrupt`] when something was, but cannot be decoded.
    pub fn restore_session(
        &self,
        grid_size: usize,
        mode: GameMode,
    ) -> Result<Option<SessionRecord>, SessionError> {
        let board_key = board_key(grid_size, mode);
        let (Some(board), Some(score)) = (
            self.store.get(&board_key)?,
            self.store.get(&score_key(grid_size, mode))?,
        ) else {
            return Ok(None);
        };
        let or_zero = |raw: Option<String>| raw.unwrap_or_else(|| "0".into());
        let encoded = EncodedSession {
            board,
            score,
            elapsed_nanos: or_zero(self.store.get(&time_key(grid_size, mode))?),
            game_id: or_zero(self.store.get(&game_id_key(grid_size, mode))?),
        };
        codec::decode_session(grid_size, &encoded)
            .map(Some)
            .map_err(|source| SessionError::Corrupt { key: board_key, source })
    }

    /// Best score for this slot, `0` if none (or unreadable).
    pub fn restore_record(&self, grid_size: usize, mode: GameMode) -> Result<u64, StoreError> {
        let key = record_key(grid_size, mode);
        Ok(match self.store.get(&key)? {
            Some(raw) => codec::parse_field("record", &raw).unwrap_or_else(|err| {
                warn!("ignoring best score under `{key}`: {err}");
                0
            }),
            None => 0,
        })
    }

    /// Persist `max(stored, best)` and return it.
    pub fn save_record(
        &mut self,
        grid_size: usize,
        mode: GameMode,
        best: u64,
    ) -> Result<u64, StoreError> {
        let record = self.restore_record(grid_size, mode)?.max(best);
        self.store.set(&record_key(grid_size, mode), &record.to_string())?;
        Ok(record)
    }

    pub fn game_mode(&self) -> Result<GameMode, StoreError> {
        let Some(raw) = self.get_non_empty(GAME_MODE_KEY)? else {
            return Ok(GameMode::default());
        };
        let mode = raw.trim().parse::<u8>().ok().and_then(GameMode::from_id);
        Ok(mode.unwrap_or_else(|| {
            warn!("unknown stored game mode {raw:?}, using {}", GameMode::default());
            GameMode::default()
        }))
    }

    pub fn set_game_mode(&mut self, mode: GameMode) -> Result<(), StoreError> {
        self.store.set(GAME_MODE_KEY, &mode.id().to_string())
    }

    /// Last issued game id, `-1` before the first game.
    pub fn last_game_id(&self) -> Result<i64, StoreError> {
        Ok(self
            .get_non_empty(GAME_ID_KEY)?
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(-1))
    }

    pub fn set_last_game_id(&mut self, game_id: u32) -> Result<(), StoreError> {
        self.store.set(GAME_ID_KEY, &game_id.to_string())
    }

    pub fn legacy_migrated(&self) -> Result<bool, StoreError> {
        Ok(self.store.get(GAME_LEGACY_KEY)?.as_deref() == Some("1"))
    }

    pub fn mark_legacy_migrated(&mut self) -> Result<(), StoreError> {
        self.store.set(GAME_LEGACY_KEY, "1")
    }

    fn get_non_empty(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.store.get(key)?.filter(|v| !v.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn sample() -> SessionRecord {
        let mut values = vec![0; 16];
        values[0] = 2;
        values[5] = 64;
        values[15] = 2048;
        SessionRecord {
            grid_size: 4,
            values,
            score: 4242,
            elapsed_nanos: 12_345,
            game_id: 7,
        }
    }

    #[test]
    fn it_uses_namespaced_keys() {
        assert_eq!(board_key(4, GameMode::Easy), "Location.4.0");
        assert_eq!(score_key(4, GameMode::Advanced), "score.4.1");
        assert_eq!(time_key(5, GameMode::Expert), "time.5.2");
        assert_eq!(game_id_key(4, GameMode::Easy), "gameID.4.0");
        assert_eq!(record_key(4, GameMode::Easy), "record.4.0");
    }

    #[test]
    fn session_roundtrip_per_slot() {
        let mut repo = SessionRepository::new(MemoryStore::new());
        assert!(repo.restore_session(4, GameMode::Easy).unwrap().is_none());
        assert!(!repo.has_session(4, GameMode::Easy).unwrap());

        repo.save_session(GameMode::Easy, &sample()).unwrap();
        assert!(repo.has_session(4, GameMode::Easy).unwrap());
        assert_eq!(repo.restore_session(4, GameMode::Easy).unwrap(), Some(sample()));
        assert_eq!(
            repo.store().get("Location.4.0").unwrap().unwrap().len(),
            32
        );
        // Other modes and sizes stay empty.
        assert!(repo.restore_session(4, GameMode::Advanced).unwrap().is_none());
        assert!(repo.restore_session(5, GameMode::Easy).unwrap().is_none());
    }

    #[test]
    fn zero_score_session_is_found() {
        let mut repo = SessionRepository::new(MemoryStore::new());
        let mut record = sample();
        record.score = 0;
        repo.save_session(GameMode::Easy, &record).unwrap();
        let back = repo.restore_session(4, GameMode::Easy).unwrap();
        assert_eq!(back.map(|r| r.score), Some(0));
    }

    #[test]
    fn corrupt_board_is_reported() {
        let mut store = MemoryStore::new();
        store.set("Location.4.0", "not-hex").unwrap();
        store.set("score.4.0", "10").unwrap();
        let repo = SessionRepository::new(store);
        match repo.restore_session(4, GameMode::Easy) {
            Err(SessionError::Corrupt { key, source }) => {
                assert_eq!(key, "Location.4.0");
                assert_eq!(source, CodecError::BadHex('n'));
            }
            other => panic!("expected corrupt session, got {other:?}"),
        }
    }

    #[test]
    fn missing_time_and_id_default_to_zero() {
        let mut store = MemoryStore::new();
        store.set("Location.4.0", &"00".repeat(16)).unwrap();
        store.set("score.4.0", "12").unwrap();
        let repo = SessionRepository::new(store);
        let record = repo.restore_session(4, GameMode::Easy).unwrap().unwrap();
        assert_eq!(record.elapsed_nanos, 0);
        assert_eq!(record.game_id, 0);
        assert_eq!(record.score, 12);
    }

    #[test]
    fn record_only_grows() {
        let mut repo = SessionRepository::new(MemoryStore::new());
        assert_eq!(repo.restore_record(4, GameMode::Easy).unwrap(), 0);
        assert_eq!(repo.save_record(4, GameMode::Easy, 500).unwrap(), 500);
        assert_eq!(repo.save_record(4, GameMode::Easy, 200).unwrap(), 500);
        assert_eq!(repo.restore_record(4, GameMode::Easy).unwrap(), 500);
        assert_eq!(repo.restore_record(4, GameMode::Expert).unwrap(), 0);
    }

    #[test]
    fn defaults_are_seeded_once() {
        let mut repo = SessionRepository::new(MemoryStore::new());
        repo.init_defaults().unwrap();
        assert_eq!(repo.game_mode().unwrap(), GameMode::Easy);
        assert_eq!(repo.last_game_id().unwrap(), -1);

        repo.set_game_mode(GameMode::Expert).unwrap();
        repo.set_last_game_id(9).unwrap();
        repo.init_defaults().unwrap();
        assert_eq!(repo.game_mode().unwrap(), GameMode::Expert);
        assert_eq!(repo.last_game_id().unwrap(), 9);
    }

    #[test]
    fn legacy_flag() {
        let mut repo = SessionRepository::new(MemoryStore::new());
        assert!(!repo.legacy_migrated().unwrap());
        repo.mark_legacy_migrated().unwrap();
        assert!(repo.legacy_migrated().unwrap());
    }
}
