//! Encounter persistence for save/load functionality.
//!
//! Snapshots are stored as versioned, human-readable JSON. Loaded
//! snapshots are checked against the same invariants a new encounter
//! must satisfy before they are handed back.

use crate::combatant::Side;
use crate::encounter::{EncounterState, Phase, RosterError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Saved encounter is inconsistent: {0}")]
    Corrupt(#[from] RosterError),
}

/// Current save file version.
const SAVE_VERSION: u32 = 1;

/// A saved encounter with everything needed to resume it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedEncounter {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// When the save was created (seconds since the Unix epoch).
    pub saved_at: String,

    pub metadata: SaveMetadata,

    /// The complete encounter snapshot.
    pub state: EncounterState,
}

/// Summary readable without restoring the whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub round: u32,
    pub phase: Phase,
    pub players_standing: usize,
    pub enemies_standing: usize,
    pub player_experience: u32,
}

impl SavedEncounter {
    pub fn new(state: EncounterState) -> Self {
        let metadata = SaveMetadata {
            round: state.round(),
            phase: state.phase(),
            players_standing: state.living_count(Side::Player),
            enemies_standing: state.living_count(Side::Enemy),
            player_experience: state.player_experience(),
        };

        Self {
            version: SAVE_VERSION,
            saved_at: chrono_now(),
            metadata,
            state,
        }
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a save, rejecting other versions and inconsistent snapshots.
    pub fn from_json(content: &str) -> Result<Self, PersistError> {
        let saved: Self = serde_json::from_str(content)?;

        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }
        saved.state.check_integrity()?;

        Ok(saved)
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = self.to_json()?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    /// Read a save's metadata without validating the full snapshot.
    pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<SaveMetadata, PersistError> {
        let content = fs::read_to_string(path).await?;

        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            metadata: SaveMetadata,
        }

        let partial: Partial = serde_json::from_str(&content)?;

        if partial.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: partial.version,
            });
        }

        Ok(partial.metadata)
    }

    pub fn into_state(self) -> EncounterState {
        self.state
    }
}

/// Get current timestamp as seconds since the Unix epoch.
fn chrono_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", now.as_secs())
}
