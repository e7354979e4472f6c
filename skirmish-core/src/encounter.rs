//! Encounter state.
//!
//! An [`EncounterState`] is a plain value: the combat rules take a snapshot
//! by reference and hand back a new one, so callers always hold the latest
//! state and a rejected action can never leave a half-applied change behind.

use crate::combatant::{Combatant, CombatantId, Position, Side};
use crate::config::EncounterConfig;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Where an encounter is in its lifecycle. Both victory phases are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    InProgress,
    PlayerVictory,
    EnemyVictory,
}

impl Phase {
    pub fn is_over(&self) -> bool {
        !matches!(self, Phase::InProgress)
    }

    pub fn winner(&self) -> Option<Side> {
        match self {
            Phase::InProgress => None,
            Phase::PlayerVictory => Some(Side::Player),
            Phase::EnemyVictory => Some(Side::Enemy),
        }
    }

    /// The victory phase for the side left standing.
    pub fn victory_for(side: Side) -> Phase {
        match side {
            Side::Player => Phase::PlayerVictory,
            Side::Enemy => Phase::EnemyVictory,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::InProgress => write!(f, "in progress"),
            Phase::PlayerVictory => write!(f, "player victory"),
            Phase::EnemyVictory => write!(f, "enemy victory"),
        }
    }
}

/// Errors from assembling (or reloading) an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("Grid size must be positive")]
    InvalidGridSize,

    #[error("Combatant id {0} appears more than once")]
    DuplicateId(CombatantId),

    #[error("{name} at {position} is outside the {grid_size}x{grid_size} grid")]
    OutOfBounds {
        name: String,
        position: Position,
        grid_size: u32,
    },

    #[error("{first} and {second} both occupy {position}")]
    Overlap {
        first: String,
        second: String,
        position: Position,
    },

    #[error("{name} has {current}/{max} hit points")]
    InvalidHitPoints { name: String, current: i32, max: i32 },

    #[error("Phase is {recorded} but the survivors imply {expected}")]
    PhaseMismatch { recorded: Phase, expected: Phase },

    #[error("No combatants on the {0} side")]
    MissingSide(Side),

    #[error("Turn order does not match the living combatants")]
    CorruptTurnOrder,
}

/// Complete state of one encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterState {
    pub(crate) grid_size: u32,
    /// Roster in insertion order. Dead combatants stay here with 0 HP.
    pub(crate) combatants: Vec<Combatant>,
    /// Living combatants, highest initiative first.
    pub(crate) turn_order: Vec<CombatantId>,
    pub(crate) current_turn_index: usize,
    pub(crate) round: u32,
    pub(crate) phase: Phase,
    pub(crate) player_experience: u32,
    pub(crate) kill_experience: u32,
    pub(crate) log: Vec<String>,
}

/// Create an encounter from a roster.
///
/// Turn order is computed once here: initiative descending, ties kept in
/// roster order.
pub fn create_encounter(
    roster: Vec<Combatant>,
    config: &EncounterConfig,
) -> Result<EncounterState, RosterError> {
    validate_roster(&roster, config.grid_size)?;

    if let Some(fallen) = roster.iter().find(|c| !c.is_alive()) {
        return Err(RosterError::InvalidHitPoints {
            name: fallen.name.clone(),
            current: fallen.hit_points,
            max: fallen.max_hit_points,
        });
    }

    for side in [Side::Player, Side::Enemy] {
        if !roster.iter().any(|c| c.side == side) {
            return Err(RosterError::MissingSide(side));
        }
    }

    let mut order: Vec<&Combatant> = roster.iter().collect();
    order.sort_by_key(|c| Reverse(c.initiative));
    let turn_order: Vec<CombatantId> = order.iter().map(|c| c.id).collect();

    let order_names = order
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let log = vec![
        format!("The encounter begins on a {0}x{0} grid.", config.grid_size),
        format!("Turn order: {order_names}."),
    ];

    tracing::debug!(
        combatants = roster.len(),
        grid_size = config.grid_size,
        "encounter created"
    );

    Ok(EncounterState {
        grid_size: config.grid_size,
        combatants: roster,
        turn_order,
        current_turn_index: 0,
        round: 1,
        phase: Phase::InProgress,
        player_experience: 0,
        kill_experience: config.kill_experience,
        log,
    })
}

fn validate_roster(roster: &[Combatant], grid_size: u32) -> Result<(), RosterError> {
    if grid_size == 0 {
        return Err(RosterError::InvalidGridSize);
    }

    let mut ids = HashSet::new();
    for (i, c) in roster.iter().enumerate() {
        if !ids.insert(c.id) {
            return Err(RosterError::DuplicateId(c.id));
        }
        if c.max_hit_points <= 0 || c.hit_points < 0 || c.hit_points > c.max_hit_points {
            return Err(RosterError::InvalidHitPoints {
                name: c.name.clone(),
                current: c.hit_points,
                max: c.max_hit_points,
            });
        }
        if !c.position.in_bounds(grid_size) {
            return Err(RosterError::OutOfBounds {
                name: c.name.clone(),
                position: c.position,
                grid_size,
            });
        }
        if !c.is_alive() {
            continue;
        }
        if let Some(other) = roster[..i]
            .iter()
            .find(|o| o.is_alive() && o.position == c.position)
        {
            return Err(RosterError::Overlap {
                first: other.name.clone(),
                second: c.name.clone(),
                position: c.position,
            });
        }
    }

    Ok(())
}

impl EncounterState {
    // ------------------------------------------------------------------------
    // Read-only queries
    // ------------------------------------------------------------------------

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.name == name)
    }

    pub fn turn_order(&self) -> &[CombatantId] {
        &self.turn_order
    }

    pub fn current_turn_index(&self) -> usize {
        self.current_turn_index
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn winner(&self) -> Option<Side> {
        self.phase.winner()
    }

    pub fn player_experience(&self) -> u32 {
        self.player_experience
    }

    pub fn kill_experience(&self) -> u32 {
        self.kill_experience
    }

    /// Narrated history, oldest first.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// The combatant allowed to act, or `None` once the encounter is over.
    pub fn active_turn_holder(&self) -> Option<CombatantId> {
        if self.phase.is_over() {
            return None;
        }
        self.turn_order.get(self.current_turn_index).copied()
    }

    pub fn active_combatant(&self) -> Option<&Combatant> {
        self.active_turn_holder().and_then(|id| self.combatant(id))
    }

    /// Living combatants on one side, in roster order.
    pub fn living(&self, side: Side) -> impl Iterator<Item = &Combatant> {
        self.combatants
            .iter()
            .filter(move |c| c.side == side && c.is_alive())
    }

    pub fn living_count(&self, side: Side) -> usize {
        self.living(side).count()
    }

    /// The living combatant standing on `position`, if any.
    pub fn occupant_at(&self, position: Position) -> Option<&Combatant> {
        self.combatants
            .iter()
            .find(|c| c.is_alive() && c.position == position)
    }

    /// The phase implied by who is still standing.
    pub fn decided_phase(&self) -> Option<Phase> {
        if self.living_count(Side::Enemy) == 0 {
            Some(Phase::victory_for(Side::Player))
        } else if self.living_count(Side::Player) == 0 {
            Some(Phase::victory_for(Side::Enemy))
        } else {
            None
        }
    }

    /// Who acts after `holder`, with the round that turn falls in.
    ///
    /// Only living combatants are in the turn order, so the answer is never
    /// a dead combatant.
    pub fn next_turn_holder(&self, holder: CombatantId) -> Option<(CombatantId, u32)> {
        let len = self.turn_order.len();
        if len == 0 {
            return None;
        }
        let next = match self.turn_order.iter().position(|id| *id == holder) {
            Some(index) => index + 1,
            // Holder already left the order; whoever slid into its slot is next.
            None => self.current_turn_index,
        };
        if next >= len {
            Some((self.turn_order[0], self.round + 1))
        } else {
            Some((self.turn_order[next], self.round))
        }
    }

    /// Check the invariants a freshly loaded snapshot must satisfy.
    pub fn check_integrity(&self) -> Result<(), RosterError> {
        validate_roster(&self.combatants, self.grid_size)?;

        let living: HashSet<CombatantId> = self
            .combatants
            .iter()
            .filter(|c| c.is_alive())
            .map(|c| c.id)
            .collect();
        let ordered: HashSet<CombatantId> = self.turn_order.iter().copied().collect();
        if living != ordered || ordered.len() != self.turn_order.len() {
            return Err(RosterError::CorruptTurnOrder);
        }
        if !self.phase.is_over() && self.current_turn_index >= self.turn_order.len() {
            return Err(RosterError::CorruptTurnOrder);
        }

        let expected = self.decided_phase().unwrap_or(Phase::InProgress);
        if self.phase != expected {
            return Err(RosterError::PhaseMismatch {
                recorded: self.phase,
                expected,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Mutation (driven by rules::apply_effect)
    // ------------------------------------------------------------------------

    pub(crate) fn combatant_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }

    pub(crate) fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    pub(crate) fn remove_from_turn_order(&mut self, id: CombatantId) {
        let Some(pos) = self.turn_order.iter().position(|t| *t == id) else {
            return;
        };
        self.turn_order.remove(pos);
        if pos < self.current_turn_index {
            self.current_turn_index -= 1;
        }
        if self.current_turn_index >= self.turn_order.len() {
            self.current_turn_index = 0;
        }
    }

    pub(crate) fn set_turn(&mut self, id: CombatantId, round: u32) {
        if let Some(index) = self.turn_order.iter().position(|t| *t == id) {
            self.current_turn_index = index;
            self.round = round;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::CombatantBuilder;

    fn roster() -> Vec<Combatant> {
        vec![
            CombatantBuilder::hero("Roland").at(1, 1).initiative(5).build().unwrap(),
            CombatantBuilder::goblin("Snik").at(7, 3).initiative(12).build().unwrap(),
            CombatantBuilder::goblin("Grub").at(4, 6).initiative(5).build().unwrap(),
        ]
    }

    #[test]
    fn test_turn_order_sorted_by_initiative_with_stable_ties() {
        let state = create_encounter(roster(), &EncounterConfig::new()).unwrap();
        let names: Vec<&str> = state
            .turn_order()
            .iter()
            .map(|id| state.combatant(*id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["Snik", "Roland", "Grub"]);
        assert_eq!(state.round(), 1);
        assert_eq!(state.phase(), Phase::InProgress);
        assert_eq!(
            state.active_combatant().map(|c| c.name.as_str()),
            Some("Snik")
        );
    }

    #[test]
    fn test_rejects_overlapping_combatants() {
        let mut combatants = roster();
        combatants[2].position = Position::new(1, 1);
        let err = create_encounter(combatants, &EncounterConfig::new()).unwrap_err();
        assert!(matches!(err, RosterError::Overlap { .. }));
    }

    #[test]
    fn test_rejects_out_of_bounds() {
        let combatants = roster();
        let err = create_encounter(combatants, &EncounterConfig::new().with_grid_size(5))
            .unwrap_err();
        assert!(matches!(err, RosterError::OutOfBounds { grid_size: 5, .. }));
    }

    #[test]
    fn test_rejects_duplicate_ids_and_empty_sides() {
        let mut combatants = roster();
        let shared = combatants[1].id;
        combatants[2].id = shared;
        assert_eq!(
            create_encounter(combatants, &EncounterConfig::new()),
            Err(RosterError::DuplicateId(shared))
        );

        let heroes_only = vec![roster().remove(0)];
        assert_eq!(
            create_encounter(heroes_only, &EncounterConfig::new()),
            Err(RosterError::MissingSide(Side::Enemy))
        );
        assert_eq!(
            create_encounter(roster(), &EncounterConfig::new().with_grid_size(0)),
            Err(RosterError::InvalidGridSize)
        );
    }

    #[test]
    fn test_next_turn_holder_wraps_into_next_round() {
        let state = create_encounter(roster(), &EncounterConfig::new()).unwrap();
        let last = *state.turn_order().last().unwrap();
        let (next, round) = state.next_turn_holder(last).unwrap();
        assert_eq!(next, state.turn_order()[0]);
        assert_eq!(round, 2);
    }

    #[test]
    fn test_remove_from_turn_order_keeps_current_holder() {
        let mut state = create_encounter(roster(), &EncounterConfig::new()).unwrap();
        let roland = state.find_by_name("Roland").unwrap().id;
        let snik = state.find_by_name("Snik").unwrap().id;
        state.set_turn(roland, 1);
        assert_eq!(state.current_turn_index(), 1);

        state.remove_from_turn_order(snik);
        assert_eq!(state.active_turn_holder(), Some(roland));
        assert_eq!(state.turn_order().len(), 2);
    }

    #[test]
    fn test_occupant_ignores_the_dead() {
        let mut combatants = roster();
        combatants[1].hit_points = 0;
        let state = EncounterState {
            grid_size: 10,
            turn_order: vec![combatants[0].id, combatants[2].id],
            combatants,
            current_turn_index: 0,
            round: 1,
            phase: Phase::InProgress,
            player_experience: 0,
            kill_experience: 50,
            log: Vec::new(),
        };
        assert!(state.occupant_at(Position::new(7, 3)).is_none());
        assert!(state.occupant_at(Position::new(1, 1)).is_some());
        assert_eq!(state.living_count(Side::Enemy), 1);
        assert!(state.check_integrity().is_ok());
    }

    #[test]
    fn test_integrity_rejects_phase_that_disagrees_with_survivors() {
        let mut state = create_encounter(roster(), &EncounterConfig::new()).unwrap();
        state.phase = Phase::PlayerVictory;
        assert_eq!(
            state.check_integrity(),
            Err(RosterError::PhaseMismatch {
                recorded: Phase::PlayerVictory,
                expected: Phase::InProgress,
            })
        );

        let mut state = create_encounter(roster(), &EncounterConfig::new()).unwrap();
        for name in ["Snik", "Grub"] {
            let id = state.find_by_name(name).unwrap().id;
            state.combatant_mut(id).unwrap().hit_points = 0;
            state.remove_from_turn_order(id);
        }
        assert_eq!(
            state.check_integrity(),
            Err(RosterError::PhaseMismatch {
                recorded: Phase::InProgress,
                expected: Phase::PlayerVictory,
            })
        );

        state.phase = Phase::PlayerVictory;
        assert!(state.check_integrity().is_ok());
    }
}
