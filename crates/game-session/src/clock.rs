use std::time::{Duration, Instant};

/// Play-time stopwatch. Time only accumulates while running.
#[derive(Debug, Clone, Default)]
pub struct GameClock {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl GameClock {
    /// A running clock that already shows `elapsed`.
    pub fn started_at(elapsed: Duration) -> Self {
        GameClock {
            accumulated: elapsed,
            running_since: Some(Instant::now()),
        }
    }

    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    pub fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.accumulated + self.running_since.map_or(Duration::ZERO, |s| s.elapsed())
    }

    /// Elapsed time in nanoseconds, saturating at `u64::MAX`.
    pub fn elapsed_nanos(&self) -> u64 {
        u64::try_from(self.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// `H:MM:SS`, the way the clock is shown to players.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
