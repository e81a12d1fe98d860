//! Session layer around `twenty48-core`: a playable [`Game`] with score, best
//! score, modes and clock, persisted through a [`KeyValueStore`].
//!
//! Storage goes through [`SessionRepository`], which namespaces keys by grid
//! size and mode. [`SqliteStore`] is the on-disk backend, [`MemoryStore`] the
//! in-process one. Old `.properties` saves are imported once by
//! [`legacy::migrate_legacy`].

pub mod clock;
pub mod command;
pub mod config;
pub mod game;
pub mod legacy;
pub mod mode;
pub mod repository;
pub mod sqlite;
pub mod store;

pub use clock::{GameClock, format_elapsed};
pub use command::{Command, ParseCommandError};
pub use config::Config;
pub use game::{Game, RestoreStatus, SaveStatus};
pub use legacy::{MigrationReport, migrate_legacy};
pub use mode::GameMode;
pub use repository::{SessionError, SessionRepository};
pub use sqlite::SqliteStore;
pub use store::{KeyValueStore, MemoryStore, StoreError};
