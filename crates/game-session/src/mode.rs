use std::fmt;

use serde::Deserialize;

/// Difficulty slot. Each mode keeps its own saved session and best score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Easy,
    Advanced,
    Expert,
}

impl GameMode {
    /// Numeric id used in persisted keys.
    pub fn id(self) -> u8 {
        match self {
            GameMode::Easy => 0,
            GameMode::Advanced => 1,
            GameMode::Expert => 2,
        }
    }

    pub fn from_id(id: u8) -> Option<GameMode> {
        match id {
            0 => Some(GameMode::Easy),
            1 => Some(GameMode::Advanced),
            2 => Some(GameMode::Expert),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GameMode::Easy => "Easy Mode",
            GameMode::Advanced => "Advanced Mode",
            GameMode::Expert => "Expert Mode",
        }
    }

    /// Easy always saves, Expert never does, Advanced only once a 2048 tile
    /// has been reached since the last save.
    pub fn save_allowed(self, tile_2048_found: bool) -> bool {
        match self {
            GameMode::Easy => true,
            GameMode::Advanced => tile_2048_found,
            GameMode::Expert => false,
        }
    }

    pub fn restore_allowed(self) -> bool {
        self != GameMode::Expert
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
