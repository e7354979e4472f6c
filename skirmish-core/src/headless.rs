//! Headless encounter interface for programmatic use.
//!
//! This module wraps an [`EncounterState`], a [`CombatResolver`] and a dice
//! source behind a small async interface. It's designed for:
//! - Script-driven fights
//! - Agents playing the player side
//! - Front ends that want enemy turns paced out over time
//!
//! # Example
//!
//! ```ignore
//! use skirmish_core::headless::{HeadlessConfig, HeadlessEncounter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HeadlessConfig::quick_start("Roland").with_seed(7);
//!     let mut encounter = HeadlessEncounter::new(config).await?;
//!
//!     let report = encounter.step(1, 1).await?;
//!     println!("{}", report.narrative);
//!
//!     let report = encounter.attack_named("Goblin 1").await?;
//!     println!("{} ({})", report.narrative, report.phase);
//!
//!     encounter.save("skirmish.json").await?;
//!     Ok(())
//! }
//! ```

use crate::combatant::{BuilderError, Combatant, CombatantBuilder, CombatantId};
use crate::config::EncounterConfig;
use crate::dice::{DiceSource, RngDice};
use crate::encounter::{create_encounter, EncounterState, Phase, RosterError};
use crate::persist::{PersistError, SavedEncounter};
use crate::rules::{ActionError, CombatResolver, Effect, Transition};
use rand::rngs::StdRng;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from the headless driver.
#[derive(Debug, Error)]
pub enum HeadlessError {
    #[error("Action rejected: {0}")]
    Action(#[from] ActionError),

    #[error("Invalid roster: {0}")]
    Roster(#[from] RosterError),

    #[error("Invalid combatant: {0}")]
    Builder(#[from] BuilderError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("No combatant named {0}")]
    UnknownName(String),
}

/// Configuration for a headless encounter.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Name of the player's hero in the quick-start roster.
    pub name: String,
    /// Grid, reward and pacing settings.
    pub encounter: EncounterConfig,
    /// Seed for the dice; `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Explicit roster. Replaces the quick-start lineup when set.
    pub roster: Option<Vec<Combatant>>,
}

impl HeadlessConfig {
    /// The dungeon board lineup: the hero at (1, 1) facing two goblins at
    /// (7, 3) and (4, 6) on a 10x10 grid.
    pub fn quick_start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encounter: EncounterConfig::new(),
            seed: None,
            roster: None,
        }
    }

    /// Fight with an explicit roster instead of the quick-start lineup.
    pub fn custom(roster: Vec<Combatant>) -> Self {
        Self {
            name: String::new(),
            encounter: EncounterConfig::new(),
            seed: None,
            roster: Some(roster),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_turn_delay(mut self, delay: Duration) -> Self {
        self.encounter.turn_delay = delay;
        self
    }

    pub fn with_encounter(mut self, encounter: EncounterConfig) -> Self {
        self.encounter = encounter;
        self
    }

    /// Build the roster this configuration describes.
    pub fn build_roster(&self) -> Result<Vec<Combatant>, BuilderError> {
        if let Some(roster) = &self.roster {
            return Ok(roster.clone());
        }

        Ok(vec![
            CombatantBuilder::hero(&self.name).at(1, 1).build()?,
            CombatantBuilder::goblin("Goblin 1").at(7, 3).build()?,
            CombatantBuilder::goblin("Goblin 2").at(4, 6).build()?,
        ])
    }

    fn dice(&self) -> RngDice<StdRng> {
        match self.seed {
            Some(seed) => RngDice::seeded(seed),
            None => RngDice::from_entropy(),
        }
    }
}

/// What one player command produced, enemy replies included.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub events: Vec<Effect>,
    /// Narration lines joined with newlines.
    pub narrative: String,
    /// Phase after the command resolved.
    pub phase: Phase,
    /// Enemy turns played automatically before control came back.
    pub enemy_turns: usize,
}

impl TurnReport {
    fn from_transition(transition: &Transition) -> Self {
        Self {
            events: transition.events.clone(),
            narrative: transition.narration().join("\n"),
            phase: transition.state.phase(),
            enemy_turns: transition.enemy_turns(),
        }
    }
}

/// An encounter that can be driven programmatically.
///
/// Commands always act for whoever holds the turn. After `new`, `load` or
/// `begin` that is a player-side combatant for as long as the encounter is
/// in progress; a state wrapped with `with_dice` needs `begin` first.
pub struct HeadlessEncounter<D: DiceSource = RngDice<StdRng>> {
    state: EncounterState,
    dice: D,
    resolver: CombatResolver,
    turn_delay: Duration,
    reports: Vec<TurnReport>,
}

impl HeadlessEncounter {
    /// Build the roster, roll the dice source and play any enemy turns that
    /// come before the first player turn.
    pub async fn new(config: HeadlessConfig) -> Result<Self, HeadlessError> {
        let roster = config.build_roster()?;
        let state = create_encounter(roster, &config.encounter)?;
        info!(
            grid_size = state.grid_size(),
            combatants = state.combatants().len(),
            "headless encounter created"
        );

        let mut encounter = Self::with_dice(state, config.dice(), config.encounter.turn_delay);
        encounter.begin().await?;
        Ok(encounter)
    }

    /// Resume a saved encounter with fresh dice. A save made on an enemy
    /// turn plays that turn out before returning.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HeadlessError> {
        let saved = SavedEncounter::load_json(path).await?;
        let mut encounter =
            Self::with_dice(saved.into_state(), RngDice::from_entropy(), Duration::ZERO);
        if !encounter.is_over() {
            encounter.begin().await?;
        }
        Ok(encounter)
    }
}

impl<D: DiceSource> HeadlessEncounter<D> {
    /// Wrap an existing state. Nothing is resolved until a command is sent.
    pub fn with_dice(state: EncounterState, dice: D, turn_delay: Duration) -> Self {
        Self {
            state,
            dice,
            resolver: CombatResolver::new(),
            turn_delay,
            reports: Vec::new(),
        }
    }

    pub fn with_turn_delay(mut self, delay: Duration) -> Self {
        self.turn_delay = delay;
        self
    }

    /// Play enemy turns until a player is up. Does nothing on a player turn.
    pub async fn begin(&mut self) -> Result<TurnReport, HeadlessError> {
        let outcome = self.resolver.start(&self.state, &mut self.dice);
        self.apply(outcome).await
    }

    /// Step the turn holder one cell; stepping into an enemy attacks it.
    pub async fn step(&mut self, dx: i32, dy: i32) -> Result<TurnReport, HeadlessError> {
        let actor = self.holder()?;
        let outcome = self
            .resolver
            .request_move(&self.state, actor, dx, dy, &mut self.dice);
        self.apply(outcome).await
    }

    pub async fn attack(&mut self, target: CombatantId) -> Result<TurnReport, HeadlessError> {
        let actor = self.holder()?;
        let outcome = self
            .resolver
            .request_attack(&self.state, actor, target, &mut self.dice);
        self.apply(outcome).await
    }

    /// Attack a combatant by display name.
    pub async fn attack_named(&mut self, name: &str) -> Result<TurnReport, HeadlessError> {
        let target = self
            .state
            .find_by_name(name)
            .map(|c| c.id)
            .ok_or_else(|| HeadlessError::UnknownName(name.to_string()))?;
        self.attack(target).await
    }

    pub async fn pass(&mut self) -> Result<TurnReport, HeadlessError> {
        let actor = self.holder()?;
        let outcome = self.resolver.advance_turn(&self.state, actor, &mut self.dice);
        self.apply(outcome).await
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), HeadlessError> {
        SavedEncounter::new(self.state.clone()).save_json(path).await?;
        Ok(())
    }

    fn holder(&self) -> Result<CombatantId, HeadlessError> {
        self.state
            .active_turn_holder()
            .ok_or(HeadlessError::Action(ActionError::EncounterAlreadyOver(
                self.state.phase(),
            )))
    }

    async fn apply(
        &mut self,
        outcome: Result<Transition, ActionError>,
    ) -> Result<TurnReport, HeadlessError> {
        let transition = match outcome {
            Ok(transition) => transition,
            Err(e) => {
                warn!(error = %e, "action rejected");
                return Err(e.into());
            }
        };

        let report = TurnReport::from_transition(&transition);
        self.state = transition.state;
        self.pace(report.enemy_turns).await;

        if report.phase.is_over() {
            info!(phase = %report.phase, round = self.state.round(), "headless encounter finished");
        }
        self.reports.push(report.clone());
        Ok(report)
    }

    /// Resolution is already complete; this only spaces out the replay.
    async fn pace(&self, enemy_turns: usize) {
        if self.turn_delay.is_zero() {
            return;
        }
        for _ in 0..enemy_turns {
            tokio::time::sleep(self.turn_delay).await;
        }
    }

    // ========================================================================
    // Encounter Queries
    // ========================================================================

    pub fn state(&self) -> &EncounterState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_over(&self) -> bool {
        self.state.phase().is_over()
    }

    pub fn round(&self) -> u32 {
        self.state.round()
    }

    /// The combatant whose turn it is, if the encounter is still running.
    pub fn active(&self) -> Option<&Combatant> {
        self.state.active_combatant()
    }

    /// Current and maximum hit points of a named combatant.
    pub fn hp(&self, name: &str) -> Option<(i32, i32)> {
        self.state
            .find_by_name(name)
            .map(|c| (c.hit_points, c.max_hit_points))
    }

    pub fn log(&self) -> &[String] {
        self.state.log()
    }

    /// Every report produced so far, oldest first.
    pub fn reports(&self) -> &[TurnReport] {
        &self.reports
    }

    pub fn dice(&self) -> &D {
        &self.dice
    }

    pub fn into_state(self) -> EncounterState {
        self.state
    }
}
