//! Encounter configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default board size used by the dungeon board.
pub const DEFAULT_GRID_SIZE: u32 = 10;

/// Experience granted to the player side for each enemy it defeats.
pub const DEFAULT_KILL_EXPERIENCE: u32 = 50;

/// Configuration for creating a new encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterConfig {
    /// Width and height of the square grid.
    pub grid_size: u32,

    /// Experience awarded for a player-side kill.
    pub kill_experience: u32,

    /// Pause applied by the headless driver after each automatic enemy turn.
    /// Never affects resolution order or outcomes.
    pub turn_delay: Duration,
}

impl EncounterConfig {
    pub fn new() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            kill_experience: DEFAULT_KILL_EXPERIENCE,
            turn_delay: Duration::ZERO,
        }
    }

    /// Set the grid size.
    pub fn with_grid_size(mut self, size: u32) -> Self {
        self.grid_size = size;
        self
    }

    /// Set the experience reward per kill.
    pub fn with_kill_experience(mut self, xp: u32) -> Self {
        self.kill_experience = xp;
        self
    }

    /// Set the pacing delay between enemy turns.
    pub fn with_turn_delay(mut self, delay: Duration) -> Self {
        self.turn_delay = delay;
        self
    }
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self::new()
    }
}
