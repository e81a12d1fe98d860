use std::io::Read;
use std::path::PathBuf;

use crate::mode::GameMode;

/// Smallest and largest supported board side.
pub const MIN_GRID_SIZE: usize = 2;
pub const MAX_GRID_SIZE: usize = 16;

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct Config {
    #[serde(default = "defaults::grid_size")]
    pub grid_size: usize,

    /// Mode to play in. When omitted the mode stored by the last run is used.
    #[serde(default)]
    pub mode: Option<GameMode>,

    /// Seed for tile spawns; entropy when omitted.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub storage: Storage,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, Default)]
pub struct Storage {
    /// SQLite database file. Without it nothing outlives the process.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Directory holding `game2048_<N>.properties` files from old installs.
    #[serde(default)]
    pub legacy_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_size: defaults::grid_size(),
            mode: None,
            seed: None,
            storage: Storage::default(),
        }
    }
}

impl Config {
    pub fn from_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut file = std::fs::File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let cfg: Self = toml::from_str(&contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(format!(
                "grid_size must be between {MIN_GRID_SIZE} and {MAX_GRID_SIZE}, got {}",
                self.grid_size
            )
            .into());
        }
        Ok(())
    }
}

mod defaults {
    pub fn grid_size() -> usize {
        twenty48_core::engine::DEFAULT_GRID_SIZE
    }
}
