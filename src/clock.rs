use chrono::{DateTime, Utc};

/// Elapsed game time, in milliseconds since the game (re)started.
#[derive(Debug, Clone)]
pub struct GameClock {
    started_at: DateTime<Utc>,
    /// Time accumulated before the last start (e.g. a resumed game)
    elapsed_offset_ms: u64,
}

impl GameClock {
    pub fn new(elapsed_offset_ms: u64) -> Self {
        Self {
            started_at: Utc::now(),
            elapsed_offset_ms,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Milliseconds of game time. Never negative, even if the wall clock steps back.
    pub fn elapsed_ms(&self) -> u64 {
        let wall = (Utc::now() - self.started_at).num_milliseconds().max(0);
        u64::try_from(wall)
            .unwrap_or(0)
            .saturating_add(self.elapsed_offset_ms)
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(0)
    }
}
