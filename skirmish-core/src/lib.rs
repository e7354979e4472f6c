//! Turn-based grid combat for a tabletop dungeon board.
//!
//! This crate provides:
//! - Positioned combatants on a bounded square grid
//! - An Intent/Effect resolver for moves, attacks and turn passing
//! - A simple enemy policy that closes in and attacks
//! - Dice notation and pluggable random sources
//! - Encounter persistence and a headless async driver
//!
//! # Quick Start
//!
//! ```ignore
//! use skirmish_core::{
//!     create_encounter, CombatResolver, CombatantBuilder, EncounterConfig, RngDice,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hero = CombatantBuilder::hero("Roland").at(1, 1).build()?;
//!     let goblin = CombatantBuilder::goblin("Snik").at(2, 2).build()?;
//!     let hero_id = hero.id;
//!     let goblin_id = goblin.id;
//!
//!     let state = create_encounter(vec![hero, goblin], &EncounterConfig::new())?;
//!     let mut dice = RngDice::seeded(42);
//!
//!     let transition = CombatResolver::new().request_attack(&state, hero_id, goblin_id, &mut dice)?;
//!     for line in transition.narration() {
//!         println!("{line}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod combatant;
pub mod config;
pub mod dice;
pub mod encounter;
pub mod headless;
pub mod persist;
pub mod rules;
pub mod testing;

// Primary public API
pub use combatant::{BuilderError, Combatant, CombatantBuilder, CombatantId, Position, Side};
pub use config::EncounterConfig;
pub use dice::{DiceSource, DieType, RngDice};
pub use encounter::{create_encounter, EncounterState, Phase, RosterError};
pub use headless::{HeadlessConfig, HeadlessEncounter, HeadlessError, TurnReport};
pub use persist::{PersistError, SavedEncounter};
pub use rules::{ActionError, CombatResolver, Effect, Intent, TargetIssue, Transition};
pub use testing::{ScriptedDice, TestHarness};
