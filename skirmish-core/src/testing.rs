//! Testing utilities for encounters.
//!
//! This module provides tools for integration testing:
//! - `ScriptedDice` for forcing exact roll sequences
//! - `TestHarness` for scripted combat scenarios addressed by name
//! - Assertion helpers for verifying encounter state

use crate::combatant::{Combatant, CombatantId, Position};
use crate::config::EncounterConfig;
use crate::dice::{DiceSource, DieType};
use crate::encounter::{create_encounter, EncounterState, Phase};
use crate::rules::{ActionError, CombatResolver, Effect, Transition};
use std::collections::VecDeque;

/// Dice that return a fixed sequence of rolls.
///
/// Values outside a die's range are clamped into it. Running out of rolls
/// panics, since it means the scenario drew more dice than it scripted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    rolls: VecDeque<u32>,
    history: Vec<(DieType, u32)>,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            history: Vec::new(),
        }
    }

    /// Queue more rolls after the existing ones.
    pub fn push(&mut self, rolls: impl IntoIterator<Item = u32>) {
        self.rolls.extend(rolls);
    }

    /// How many dice have been drawn so far.
    pub fn draws(&self) -> usize {
        self.history.len()
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }

    /// Every draw so far, with the die it was made on.
    pub fn history(&self) -> &[(DieType, u32)] {
        &self.history
    }
}

impl DiceSource for ScriptedDice {
    fn roll_die(&mut self, die: DieType) -> u32 {
        let Some(value) = self.rolls.pop_front() else {
            panic!(
                "ScriptedDice ran out after {} draws (needed a {die})",
                self.history.len()
            );
        };
        let value = value.clamp(1, die.sides());
        self.history.push((die, value));
        value
    }
}

/// Test harness for scripted encounters.
///
/// Combatants are addressed by name; every accepted action replaces the
/// harness state with the resolver's new snapshot.
pub struct TestHarness {
    pub state: EncounterState,
    pub dice: ScriptedDice,
    resolver: CombatResolver,
}

impl TestHarness {
    /// Create a harness on the default 10x10 grid.
    pub fn new(roster: Vec<Combatant>) -> Self {
        Self::with_config(roster, &EncounterConfig::new())
    }

    pub fn with_config(roster: Vec<Combatant>, config: &EncounterConfig) -> Self {
        let state = create_encounter(roster, config).expect("harness roster should be valid");
        Self {
            state,
            dice: ScriptedDice::default(),
            resolver: CombatResolver::new(),
        }
    }

    /// Queue rolls for upcoming actions.
    pub fn rolls(&mut self, rolls: impl IntoIterator<Item = u32>) -> &mut Self {
        self.dice.push(rolls);
        self
    }

    pub fn id(&self, name: &str) -> CombatantId {
        self.state
            .find_by_name(name)
            .unwrap_or_else(|| panic!("no combatant named {name}"))
            .id
    }

    pub fn start(&mut self) -> Result<Vec<Effect>, ActionError> {
        let outcome = self.resolver.start(&self.state, &mut self.dice);
        self.accept(outcome)
    }

    pub fn move_by(&mut self, name: &str, dx: i32, dy: i32) -> Result<Vec<Effect>, ActionError> {
        let actor = self.id(name);
        let outcome = self
            .resolver
            .request_move(&self.state, actor, dx, dy, &mut self.dice);
        self.accept(outcome)
    }

    pub fn attack(&mut self, name: &str, target: &str) -> Result<Vec<Effect>, ActionError> {
        let (actor, target) = (self.id(name), self.id(target));
        let outcome = self
            .resolver
            .request_attack(&self.state, actor, target, &mut self.dice);
        self.accept(outcome)
    }

    pub fn pass(&mut self, name: &str) -> Result<Vec<Effect>, ActionError> {
        let actor = self.id(name);
        let outcome = self
            .resolver
            .advance_turn(&self.state, actor, &mut self.dice);
        self.accept(outcome)
    }

    fn accept(&mut self, outcome: Result<Transition, ActionError>) -> Result<Vec<Effect>, ActionError> {
        let transition = outcome?;
        self.state = transition.state;
        Ok(transition.events)
    }

    pub fn hp(&self, name: &str) -> i32 {
        self.state.combatant(self.id(name)).map_or(0, |c| c.hit_points)
    }

    pub fn position(&self, name: &str) -> Position {
        self.state
            .combatant(self.id(name))
            .map_or(Position::ORIGIN, |c| c.position)
    }

    /// Name of whoever holds the turn.
    pub fn holder(&self) -> Option<&str> {
        self.state.active_combatant().map(|c| c.name.as_str())
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn last_log(&self) -> Option<&str> {
        self.state.log().last().map(String::as_str)
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert a combatant's current hit points.
pub fn assert_hp(harness: &TestHarness, name: &str, hp: i32) {
    let actual = harness.hp(name);
    assert_eq!(actual, hp, "Expected {name} at {hp} HP, found {actual}");
}

/// Assert a combatant's grid position.
pub fn assert_position(harness: &TestHarness, name: &str, x: i32, y: i32) {
    let actual = harness.position(name);
    assert_eq!(
        actual,
        Position::new(x, y),
        "Expected {name} at ({x}, {y}), found {actual}"
    );
}

/// Assert the encounter phase.
pub fn assert_phase(harness: &TestHarness, phase: Phase) {
    assert_eq!(harness.phase(), phase, "Unexpected encounter phase");
}

/// Assert who holds the turn.
pub fn assert_turn(harness: &TestHarness, name: &str) {
    assert_eq!(harness.holder(), Some(name), "Expected it to be {name}'s turn");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::CombatantBuilder;

    #[test]
    fn test_scripted_dice_clamps_and_records() {
        let mut dice = ScriptedDice::new([25, 0]);
        assert_eq!(dice.roll_die(DieType::D20), 20);
        assert_eq!(dice.roll_die(DieType::D6), 1);
        assert_eq!(dice.history(), &[(DieType::D20, 20), (DieType::D6, 1)]);
        assert_eq!(dice.remaining(), 0);
    }

    #[test]
    #[should_panic(expected = "ran out")]
    fn test_scripted_dice_panics_when_exhausted() {
        ScriptedDice::new([]).roll_die(DieType::D20);
    }

    #[test]
    fn test_harness_tracks_state() {
        let mut harness = TestHarness::new(vec![
            CombatantBuilder::hero("Roland").at(1, 1).build().unwrap(),
            CombatantBuilder::goblin("Snik").at(7, 3).build().unwrap(),
        ]);
        assert_turn(&harness, "Roland");

        harness.move_by("Roland", 1, 1).unwrap();
        assert_position(&harness, "Roland", 2, 2);
        assert_position(&harness, "Snik", 6, 2);
        assert_turn(&harness, "Roland");
        assert_eq!(harness.last_log(), Some("Round 2: Roland's turn."));
        assert_eq!(harness.dice.draws(), 0);
    }
}
