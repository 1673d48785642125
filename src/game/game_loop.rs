use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::Game;
use crate::error::GameError;

/// Loop lifecycle. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Drives a game tick after tick on the calling thread.
pub struct GameLoop {
    game: Arc<Game>,
    state: LoopState,
    tick_interval: Option<Duration>,
}

impl GameLoop {
    pub fn new(game: Arc<Game>) -> Self {
        Self {
            game,
            state: LoopState::Running,
            tick_interval: None,
        }
    }

    /// Sleep this long between ticks.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn game(&self) -> &Arc<Game> {
        &self.game
    }

    /// Tick while `is_running` holds, then stop. Returns the number of ticks run.
    ///
    /// A failing action stops the loop and its error is returned. Calling
    /// `run` on a stopped loop does nothing.
    pub fn run<F>(&mut self, mut is_running: F) -> Result<u64, GameError>
    where
        F: FnMut() -> bool,
    {
        if self.state == LoopState::Stopped {
            return Ok(0);
        }
        info!(game_id = %self.game.id(), "Game loop started");

        let mut ticks = 0;
        while is_running() {
            if let Err(e) = self.game.run_tick() {
                self.state = LoopState::Stopped;
                error!(game_id = %self.game.id(), error = %e, "Game loop stopped by failed action");
                return Err(e);
            }
            ticks += 1;

            if let Some(interval) = self.tick_interval {
                std::thread::sleep(interval);
            }
        }

        self.state = LoopState::Stopped;
        info!(game_id = %self.game.id(), ticks, "Game loop stopped");
        Ok(ticks)
    }
}
