use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use env_logger::Env;
use game_session::command::HELP;
use game_session::config::{MAX_GRID_SIZE, MIN_GRID_SIZE};
use game_session::{
    Command, Config, Game, GameMode, KeyValueStore, MemoryStore, RestoreStatus, SaveStatus,
    SessionRepository, SqliteStore, format_elapsed, migrate_legacy,
};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Parser)]
#[command(author, version, about = "Play 2048 from the terminal, one command per line")]
struct Cli {
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for tile spawns (overrides the config file)
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Game mode (overrides the config file and the stored mode)
    #[arg(long, value_enum)]
    mode: Option<GameMode>,

    /// Board side length (overrides the config file)
    #[arg(long, value_name = "N")]
    grid_size: Option<usize>,

    /// SQLite database file (overrides the config file)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut cfg = match &cli.config {
        Some(path) => {
            Config::from_toml(path).map_err(|e| anyhow!("loading {}: {e}", path.display()))?
        }
        None => Config::default(),
    };
    cfg.seed = cli.seed.or(cfg.seed);
    cfg.mode = cli.mode.or(cfg.mode);
    cfg.grid_size = cli.grid_size.unwrap_or(cfg.grid_size);
    cfg.storage.path = cli.db.or(cfg.storage.path);
    cfg.validate().map_err(|e| anyhow!("invalid configuration: {e}"))?;

    let store: Box<dyn KeyValueStore> = match &cfg.storage.path {
        Some(path) => Box::new(
            SqliteStore::open(path).with_context(|| format!("opening {}", path.display()))?,
        ),
        None => {
            info!("no database configured, progress is kept in memory");
            Box::new(MemoryStore::new())
        }
    };
    let mut repo = SessionRepository::new(store);
    if let Some(dir) = &cfg.storage.legacy_dir {
        if let Err(err) = migrate_legacy(&mut repo, dir, cfg.grid_size) {
            warn!("legacy migration failed, will retry next start: {err}");
        }
    }

    let rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut game = Game::new(repo, rng, cfg.grid_size);
    if let Some(mode) = cfg.mode.filter(|&m| m != game.mode()) {
        game.set_game_mode(mode);
    }

    println!("{HELP}\n");
    print_status(&game);
    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => {
                apply(&mut game, command);
                print_status(&game);
            }
            Err(err) => println!("{err}"),
        }
    }

    if let Err(err) = game.save_record() {
        warn!("could not store best score: {err}");
    }
    Ok(())
}

fn apply<S: KeyValueStore, R: Rng>(game: &mut Game<S, R>, command: Command) {
    match command {
        Command::Move(direction) => match game.move_tiles(direction) {
            None if game.is_over() => println!("Game over. Type `new` to play again."),
            None => println!("Paused. Type `resume` to continue."),
            Some(out) if !out.moved => println!("Nothing moves {direction}."),
            Some(out) => {
                if out.won {
                    println!("You reached 2048! Keep going.");
                }
                if out.game_over {
                    println!("Game over.");
                }
            }
        },
        Command::New(size) => {
            let size = size.unwrap_or(game.grid().grid_size());
            if (MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&size) {
                game.start_new_game(size);
            } else {
                println!("Board size must be between {MIN_GRID_SIZE} and {MAX_GRID_SIZE}.");
            }
        }
        Command::Save => match game.save_session() {
            SaveStatus::Saved => println!("Saved."),
            SaveStatus::NotAllowed => println!("{} does not allow saving now.", game.mode()),
            SaveStatus::Failed => println!("Save failed, see log."),
        },
        Command::Restore => match game.restore_session() {
            RestoreStatus::Restored(_) => println!("Restored game {}.", game.game_id()),
            RestoreStatus::NotFound(_) => println!("No saved game, started a new one."),
            RestoreStatus::NotAllowed => println!("{} does not allow restoring.", game.mode()),
        },
        Command::Pause => game.pause(),
        Command::Resume => game.resume(),
        Command::Mode(mode) => {
            game.set_game_mode(mode);
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

fn print_status<S: KeyValueStore, R: Rng>(game: &Game<S, R>) {
    println!("{}", game.grid());
    println!(
        "{} | game {} | score {} (+{}) | best {} | {}{}",
        game.mode(),
        game.game_id(),
        game.score(),
        game.points(),
        game.best(),
        format_elapsed(game.elapsed()),
        if game.is_paused() { " | paused" } else { "" },
    );
}
