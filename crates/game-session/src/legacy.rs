//! One-time import of the old per-file `.properties` saves.
//!
//! Old layout, in a single directory:
//! - `game2048_<N>.properties`: `Location_<x>_<y>` tile values, `score`, `time` (nanoseconds)
//! - `game2048_<N>_record.properties`: `record`

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};
use twenty48_core::engine::MAX_TILE_VALUE;
use twenty48_core::session::codec::{self, CodecError, SessionRecord};

use crate::mode::GameMode;
use crate::repository::{SessionError, SessionRepository};
use crate::store::{KeyValueStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationReport {
    /// The flag was already set; nothing was read.
    AlreadyMigrated,
    /// No usable legacy session was found.
    NothingToMigrate,
    /// A new-format session already occupied the slot and was kept.
    KeptExisting,
    Migrated { score: u64, best: u64 },
}

pub fn session_file(dir: &Path, grid_size: usize) -> PathBuf {
    dir.join(format!("game2048_{grid_size}.properties"))
}

pub fn record_file(dir: &Path, grid_size: usize) -> PathBuf {
    dir.join(format!("game2048_{grid_size}_record.properties"))
}

/// Minimal Java `.properties` reader: `key=value` or `key:value` per line,
/// `#` and `!` start comments.
pub fn parse_properties(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(['=', ':'])?;
            let (key, value) = line.split_at(split);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}

fn read_properties(path: &Path) -> Result<Option<HashMap<String, String>>, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(parse_properties(&text))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn corrupt(path: &Path, source: CodecError) -> SessionError {
    SessionError::Corrupt {
        key: path.display().to_string(),
        source,
    }
}

/// Read the old session file. Missing cells count as empty; a missing score
/// counts as 0.
pub fn read_legacy_session(
    dir: &Path,
    grid_size: usize,
) -> Result<Option<SessionRecord>, SessionError> {
    let path = session_file(dir, grid_size);
    let Some(props) = read_properties(&path)? else {
        return Ok(None);
    };

    let mut values = vec![0u32; grid_size * grid_size];
    for y in 0..grid_size {
        for x in 0..grid_size {
            let Some(raw) = props.get(&format!("Location_{x}_{y}")) else {
                continue;
            };
            let value: u32 = codec::parse_field("Location", raw).map_err(|e| corrupt(&path, e))?;
            if value != 0 && (value < 2 || !value.is_power_of_two() || value > MAX_TILE_VALUE) {
                return Err(corrupt(
                    &path,
                    CodecError::BadNumber { field: "Location", value: raw.clone() },
                ));
            }
            values[x + grid_size * y] = value;
        }
    }

    let optional = |field: &'static str| -> Result<u64, SessionError> {
        props
            .get(field)
            .map_or(Ok(0), |raw| codec::parse_field(field, raw).map_err(|e| corrupt(&path, e)))
    };
    Ok(Some(SessionRecord {
        grid_size,
        values,
        score: optional("score")?,
        elapsed_nanos: optional("time")?,
        game_id: 0,
    }))
}

/// Old best score, `0` when the file or the entry is absent.
pub fn read_legacy_record(dir: &Path, grid_size: usize) -> Result<u64, SessionError> {
    let path = record_file(dir, grid_size);
    let Some(props) = read_properties(&path)? else {
        return Ok(0);
    };
    props
        .get("record")
        .map_or(Ok(0), |raw| codec::parse_field("record", raw).map_err(|e| corrupt(&path, e)))
}

/// Move a legacy save in `dir` into the Easy slot of `repo`, then set the
/// migration flag so this never runs again.
///
/// An existing new-format session is never overwritten. An unreadable legacy
/// file is skipped and still marks the migration done; a failing store leaves
/// the flag unset so the next start retries.
pub fn migrate_legacy<S: KeyValueStore>(
    repo: &mut SessionRepository<S>,
    dir: &Path,
    grid_size: usize,
) -> Result<MigrationReport, SessionError> {
    if repo.legacy_migrated()? {
        return Ok(MigrationReport::AlreadyMigrated);
    }

    let mode = GameMode::Easy;
    let report = match read_legacy_session(dir, grid_size) {
        Ok(None) => MigrationReport::NothingToMigrate,
        Ok(Some(record)) => {
            let legacy_best = read_legacy_record(dir, grid_size).unwrap_or_else(|err| {
                warn!("ignoring legacy best score: {err}");
                0
            });
            let best = repo.save_record(grid_size, mode, legacy_best.max(record.score))?;
            if repo.has_session(grid_size, mode)? {
                MigrationReport::KeptExisting
            } else {
                repo.save_session(mode, &record)?;
                MigrationReport::Migrated { score: record.score, best }
            }
        }
        Err(err @ SessionError::Corrupt { .. }) => {
            warn!("skipping legacy session: {err}");
            MigrationReport::NothingToMigrate
        }
        Err(err) => return Err(err),
    };

    repo.mark_legacy_migrated()?;
    info!("legacy migration from {}: {report:?}", dir.display());
    Ok(report)
}
