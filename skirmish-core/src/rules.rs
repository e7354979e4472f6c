//! Combat rules with an Intent/Effect pipeline.
//!
//! 1. A caller (or the enemy policy) expresses an [`Intent`]
//! 2. [`CombatResolver`] validates it against the current snapshot
//! 3. Resolution produces [`Effect`]s describing each state change
//! 4. Effects are applied, in order, to a copy of the snapshot
//!
//! A rejected intent returns an [`ActionError`] before anything is copied,
//! so the caller's snapshot is the unchanged state.

use crate::combatant::{Combatant, CombatantId, Position, Side};
use crate::dice::{DiceSource, DieType};
use crate::encounter::{EncounterState, Phase};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// What the turn holder wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Step one cell; stepping into an enemy attacks it instead.
    Move {
        actor: CombatantId,
        dx: i32,
        dy: i32,
    },

    /// Attack a living opponent.
    Attack {
        actor: CombatantId,
        target: CombatantId,
    },

    /// End the turn without acting.
    Pass { actor: CombatantId },
}

impl Intent {
    pub fn actor(&self) -> CombatantId {
        match self {
            Intent::Move { actor, .. } | Intent::Attack { actor, .. } | Intent::Pass { actor } => {
                *actor
            }
        }
    }
}

/// Why a target was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetIssue {
    Missing,
    Dead,
    Ally,
}

impl fmt::Display for TargetIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetIssue::Missing => write!(f, "no such combatant"),
            TargetIssue::Dead => write!(f, "already defeated"),
            TargetIssue::Ally => write!(f, "on the same side"),
        }
    }
}

/// A rejected action. The encounter state is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("The encounter is already over ({0})")]
    EncounterAlreadyOver(Phase),

    #[error("No combatant with id {0}")]
    UnknownCombatant(CombatantId),

    #[error("{name} has been defeated and cannot act")]
    ActorDead { id: CombatantId, name: String },

    #[error("It is not {name}'s turn")]
    NotYourTurn { id: CombatantId, name: String },

    #[error("Invalid target {target}: {issue}")]
    InvalidTarget {
        target: CombatantId,
        issue: TargetIssue,
    },

    #[error("({dx}, {dy}) is not a single-cell step")]
    InvalidStep { dx: i32, dy: i32 },

    #[error("{name} is already at {position}")]
    NoMovement { name: String, position: Position },
}

/// Effects describe concrete state changes, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Moved {
        id: CombatantId,
        name: String,
        from: Position,
        to: Position,
    },

    /// The d20 attack roll and whether it met the target's armor class.
    AttackRolled {
        attacker: CombatantId,
        attacker_name: String,
        target: CombatantId,
        target_name: String,
        roll: u32,
        armor_class: i32,
        hit: bool,
    },

    DamageDealt {
        target: CombatantId,
        target_name: String,
        die: DieType,
        amount: i32,
        remaining: i32,
        maximum: i32,
    },

    Defeated {
        id: CombatantId,
        name: String,
        by: CombatantId,
    },

    /// Experience awarded to the player side.
    ExperienceGained { amount: u32, total: u32 },

    /// An enemy with no open cell toward its quarry.
    HeldPosition { id: CombatantId, name: String },

    Waited { id: CombatantId, name: String },

    TurnAdvanced {
        round: u32,
        id: CombatantId,
        name: String,
        side: Side,
    },

    EncounterEnded { phase: Phase },
}

impl Effect {
    /// One line of narration for the encounter log.
    pub fn narrate(&self) -> String {
        match self {
            Effect::Moved { name, to, .. } => format!("{name} moves to {to}."),
            Effect::AttackRolled {
                attacker_name,
                target_name,
                roll,
                armor_class,
                hit,
                ..
            } => format!(
                "{attacker_name} attacks {target_name} with a roll of {roll} against AC {armor_class}... {}",
                if *hit { "HIT!" } else { "MISS!" }
            ),
            Effect::DamageDealt {
                target_name,
                die,
                amount,
                remaining,
                maximum,
                ..
            } => format!(
                "{target_name} takes {amount} damage ({die}), {remaining}/{maximum} HP left."
            ),
            Effect::Defeated { name, .. } => format!("{name} is defeated!"),
            Effect::ExperienceGained { amount, total } => {
                format!("The party earns {amount} XP ({total} total).")
            }
            Effect::HeldPosition { name, .. } => format!("{name} holds position."),
            Effect::Waited { name, .. } => format!("{name} waits."),
            Effect::TurnAdvanced { round, name, .. } => {
                format!("Round {round}: {name}'s turn.")
            }
            Effect::EncounterEnded { phase } => match phase {
                Phase::PlayerVictory => "Victory! Every enemy has fallen.".to_string(),
                Phase::EnemyVictory => "Defeat. The party has fallen.".to_string(),
                Phase::InProgress => "The fight goes on.".to_string(),
            },
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.narrate())
    }
}

/// The outcome of an accepted action: the next snapshot and what happened.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: EncounterState,
    pub events: Vec<Effect>,
}

impl Transition {
    pub fn narration(&self) -> Vec<String> {
        self.events.iter().map(Effect::narrate).collect()
    }

    /// Number of enemy turns resolved automatically in this transition.
    pub fn enemy_turns(&self) -> usize {
        self.events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    Effect::TurnAdvanced {
                        side: Side::Enemy,
                        ..
                    }
                )
            })
            .count()
    }
}

enum Plan {
    Step(Position),
    Attack(CombatantId),
    Wait,
}

/// Resolves intents into effects and drives enemy turns.
///
/// The resolver holds no state of its own; randomness comes only from the
/// [`DiceSource`] passed to each call.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombatResolver;

impl CombatResolver {
    pub fn new() -> Self {
        Self
    }

    /// Step the turn holder by `(dx, dy)`, each in `-1..=1`.
    pub fn request_move<D: DiceSource + ?Sized>(
        &self,
        state: &EncounterState,
        actor: CombatantId,
        dx: i32,
        dy: i32,
        dice: &mut D,
    ) -> Result<Transition, ActionError> {
        self.resolve(state, Intent::Move { actor, dx, dy }, dice)
    }

    pub fn request_attack<D: DiceSource + ?Sized>(
        &self,
        state: &EncounterState,
        actor: CombatantId,
        target: CombatantId,
        dice: &mut D,
    ) -> Result<Transition, ActionError> {
        self.resolve(state, Intent::Attack { actor, target }, dice)
    }

    /// End the holder's turn without acting; enemy turns that follow are
    /// resolved before this returns.
    pub fn advance_turn<D: DiceSource + ?Sized>(
        &self,
        state: &EncounterState,
        actor: CombatantId,
        dice: &mut D,
    ) -> Result<Transition, ActionError> {
        self.resolve(state, Intent::Pass { actor }, dice)
    }

    /// Play out enemy turns until a player holds the turn. A fresh encounter
    /// whose highest initiative belongs to an enemy needs this once.
    pub fn start<D: DiceSource + ?Sized>(
        &self,
        state: &EncounterState,
        dice: &mut D,
    ) -> Result<Transition, ActionError> {
        if state.phase().is_over() {
            return Err(ActionError::EncounterAlreadyOver(state.phase()));
        }

        let mut next = state.clone();
        let mut events = Vec::new();
        if let Some(holder) = next.active_combatant().cloned() {
            if !holder.side.is_player_controlled() {
                self.enemy_turn(&mut next, &mut events, holder.id, dice);
                self.settle(&mut next, &mut events, holder.id, dice);
            }
        }

        Ok(Transition {
            state: next,
            events,
        })
    }

    /// Validate and resolve an intent.
    pub fn resolve<D: DiceSource + ?Sized>(
        &self,
        state: &EncounterState,
        intent: Intent,
        dice: &mut D,
    ) -> Result<Transition, ActionError> {
        let actor = check_actor(state, intent.actor())?;
        let plan = match intent {
            Intent::Move { dx, dy, .. } => plan_move(state, actor, dx, dy)?,
            Intent::Attack { target, .. } => {
                check_target(state, actor, target)?;
                Plan::Attack(target)
            }
            Intent::Pass { .. } => Plan::Wait,
        };
        debug!(actor = %actor.name, ?intent, "resolving intent");

        let mut next = state.clone();
        let mut events = Vec::new();
        match plan {
            Plan::Step(to) => commit(
                &mut next,
                &mut events,
                Effect::Moved {
                    id: actor.id,
                    name: actor.name.clone(),
                    from: actor.position,
                    to,
                },
            ),
            Plan::Attack(target) => self.attack(&mut next, &mut events, actor.id, target, dice),
            Plan::Wait => commit(
                &mut next,
                &mut events,
                Effect::Waited {
                    id: actor.id,
                    name: actor.name.clone(),
                },
            ),
        }
        self.settle(&mut next, &mut events, actor.id, dice);

        Ok(Transition {
            state: next,
            events,
        })
    }

    /// One attack roll, then a damage roll only on a hit.
    fn attack<D: DiceSource + ?Sized>(
        &self,
        state: &mut EncounterState,
        events: &mut Vec<Effect>,
        attacker_id: CombatantId,
        target_id: CombatantId,
        dice: &mut D,
    ) {
        let (Some(attacker), Some(target)) = (
            state.combatant(attacker_id).cloned(),
            state.combatant(target_id).cloned(),
        ) else {
            return;
        };

        let roll = dice.roll_die(DieType::D20);
        let hit = roll as i32 >= target.armor_class;
        commit(
            state,
            events,
            Effect::AttackRolled {
                attacker: attacker.id,
                attacker_name: attacker.name.clone(),
                target: target.id,
                target_name: target.name.clone(),
                roll,
                armor_class: target.armor_class,
                hit,
            },
        );
        if !hit {
            return;
        }

        let amount = dice.roll_die(attacker.weapon_die) as i32;
        let remaining = (target.hit_points - amount).max(0);
        commit(
            state,
            events,
            Effect::DamageDealt {
                target: target.id,
                target_name: target.name.clone(),
                die: attacker.weapon_die,
                amount,
                remaining,
                maximum: target.max_hit_points,
            },
        );
        if remaining > 0 {
            return;
        }

        commit(
            state,
            events,
            Effect::Defeated {
                id: target.id,
                name: target.name.clone(),
                by: attacker.id,
            },
        );
        if attacker.side == Side::Player && target.side == Side::Enemy {
            let amount = state.kill_experience();
            let total = state.player_experience() + amount;
            commit(state, events, Effect::ExperienceGained { amount, total });
        }
    }

    /// Enemy policy: attack an adjacent opponent, otherwise close in on the
    /// nearest one diagonally. Ties go to the earliest in roster order.
    fn enemy_turn<D: DiceSource + ?Sized>(
        &self,
        state: &mut EncounterState,
        events: &mut Vec<Effect>,
        id: CombatantId,
        dice: &mut D,
    ) {
        let Some(me) = state.combatant(id).cloned() else {
            return;
        };
        let opponents: Vec<Combatant> = state.living(me.side.opponent()).cloned().collect();

        if let Some(target) = opponents
            .iter()
            .find(|o| me.position.distance_to(o.position) <= 1)
        {
            debug!(enemy = %me.name, target = %target.name, "enemy attacks adjacent opponent");
            self.attack(state, events, me.id, target.id, dice);
            return;
        }

        let Some(nearest) = opponents
            .iter()
            .min_by_key(|o| me.position.distance_to(o.position))
        else {
            return;
        };
        let (sx, sy) = me.position.step_toward(nearest.position);
        debug!(enemy = %me.name, quarry = %nearest.name, sx, sy, "enemy advances");

        // Diagonal first; if an ally is in the way, try each axis alone.
        // Opponents one step away were already attacked above, so any
        // occupant here is an ally.
        for (dx, dy) in [(sx, sy), (sx, 0), (0, sy)] {
            let to = me.position.offset(dx, dy).clamped(state.grid_size());
            if to == me.position || state.occupant_at(to).is_some() {
                continue;
            }
            commit(
                state,
                events,
                Effect::Moved {
                    id: me.id,
                    name: me.name.clone(),
                    from: me.position,
                    to,
                },
            );
            return;
        }

        commit(
            state,
            events,
            Effect::HeldPosition {
                id: me.id,
                name: me.name.clone(),
            },
        );
    }

    /// Close out `acted`'s turn: end the encounter if a side is wiped out,
    /// otherwise hand the turn on, playing enemy turns until a player is up.
    fn settle<D: DiceSource + ?Sized>(
        &self,
        state: &mut EncounterState,
        events: &mut Vec<Effect>,
        acted: CombatantId,
        dice: &mut D,
    ) {
        let mut acted = acted;
        loop {
            if let Some(phase) = state.decided_phase() {
                info!(%phase, round = state.round(), "encounter decided");
                commit(state, events, Effect::EncounterEnded { phase });
                return;
            }

            let Some((id, round)) = state.next_turn_holder(acted) else {
                return;
            };
            let Some(holder) = state.combatant(id).cloned() else {
                return;
            };
            commit(
                state,
                events,
                Effect::TurnAdvanced {
                    round,
                    id,
                    name: holder.name.clone(),
                    side: holder.side,
                },
            );

            if holder.side.is_player_controlled() {
                return;
            }
            self.enemy_turn(state, events, id, dice);
            acted = id;
        }
    }
}

fn check_actor(state: &EncounterState, id: CombatantId) -> Result<&Combatant, ActionError> {
    if state.phase().is_over() {
        return Err(ActionError::EncounterAlreadyOver(state.phase()));
    }
    let actor = state
        .combatant(id)
        .ok_or(ActionError::UnknownCombatant(id))?;
    if !actor.is_alive() {
        return Err(ActionError::ActorDead {
            id,
            name: actor.name.clone(),
        });
    }
    if state.active_turn_holder() != Some(id) {
        return Err(ActionError::NotYourTurn {
            id,
            name: actor.name.clone(),
        });
    }
    Ok(actor)
}

fn check_target(
    state: &EncounterState,
    actor: &Combatant,
    target: CombatantId,
) -> Result<(), ActionError> {
    let invalid = |issue| ActionError::InvalidTarget { target, issue };
    let victim = state
        .combatant(target)
        .ok_or(invalid(TargetIssue::Missing))?;
    if !victim.is_alive() {
        return Err(invalid(TargetIssue::Dead));
    }
    if !victim.is_opponent_of(actor) {
        return Err(invalid(TargetIssue::Ally));
    }
    Ok(())
}

/// Only the landing cell matters: cells passed next to on a diagonal step
/// never trigger attacks.
fn plan_move(
    state: &EncounterState,
    actor: &Combatant,
    dx: i32,
    dy: i32,
) -> Result<Plan, ActionError> {
    if !(-1..=1).contains(&dx) || !(-1..=1).contains(&dy) {
        return Err(ActionError::InvalidStep { dx, dy });
    }

    let to = actor.position.offset(dx, dy).clamped(state.grid_size());
    if to == actor.position {
        return Err(ActionError::NoMovement {
            name: actor.name.clone(),
            position: to,
        });
    }

    match state.occupant_at(to) {
        Some(occupant) if occupant.is_opponent_of(actor) => {
            debug!(actor = %actor.name, target = %occupant.name, "move into enemy becomes an attack");
            Ok(Plan::Attack(occupant.id))
        }
        Some(occupant) => Err(ActionError::InvalidTarget {
            target: occupant.id,
            issue: TargetIssue::Ally,
        }),
        None => Ok(Plan::Step(to)),
    }
}

/// Apply an effect, log its narration, and record it.
fn commit(state: &mut EncounterState, events: &mut Vec<Effect>, effect: Effect) {
    apply_effect(state, &effect);
    state.push_log(effect.narrate());
    events.push(effect);
}

/// Apply a list of effects to an encounter.
pub fn apply_effects(state: &mut EncounterState, effects: &[Effect]) {
    for effect in effects {
        apply_effect(state, effect);
    }
}

/// Apply a single effect to an encounter. Does not touch the log.
pub fn apply_effect(state: &mut EncounterState, effect: &Effect) {
    match effect {
        Effect::Moved { id, to, .. } => {
            if let Some(combatant) = state.combatant_mut(*id) {
                combatant.position = *to;
            }
        }
        Effect::DamageDealt { target, amount, .. } => {
            if let Some(combatant) = state.combatant_mut(*target) {
                combatant.take_damage(*amount);
            }
        }
        Effect::Defeated { id, .. } => state.remove_from_turn_order(*id),
        Effect::ExperienceGained { total, .. } => state.player_experience = *total,
        Effect::TurnAdvanced { round, id, .. } => state.set_turn(*id, *round),
        Effect::EncounterEnded { phase } => state.phase = *phase,
        Effect::AttackRolled { .. } | Effect::HeldPosition { .. } | Effect::Waited { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::CombatantBuilder;
    use crate::config::EncounterConfig;
    use crate::encounter::create_encounter;
    use crate::testing::ScriptedDice;

    fn hero_and_goblin(goblin_hp: i32, goblin_ac: i32) -> (EncounterState, CombatantId, CombatantId) {
        let hero = CombatantBuilder::player("Player")
            .hit_points(20)
            .armor_class(15)
            .at(1, 1)
            .build()
            .unwrap();
        let goblin = CombatantBuilder::goblin("Goblin")
            .hit_points(goblin_hp)
            .armor_class(goblin_ac)
            .at(2, 1)
            .build()
            .unwrap();
        let (h, g) = (hero.id, goblin.id);
        let state = create_encounter(vec![hero, goblin], &EncounterConfig::new()).unwrap();
        (state, h, g)
    }

    #[test]
    fn test_lethal_attack_ends_encounter() {
        let (state, hero, goblin) = hero_and_goblin(1, 5);
        let mut dice = ScriptedDice::new([15, 3]);

        let t = CombatResolver::new()
            .request_attack(&state, hero, goblin, &mut dice)
            .unwrap();

        assert_eq!(t.state.combatant(goblin).unwrap().hit_points, 0);
        assert!(t
            .events
            .iter()
            .any(|e| matches!(e, Effect::Defeated { id, .. } if *id == goblin)));
        assert_eq!(t.state.phase(), Phase::PlayerVictory);
        assert_eq!(t.state.active_turn_holder(), None);
        assert_eq!(t.state.player_experience(), 50);
        assert_eq!(dice.draws(), 2);
    }

    #[test]
    fn test_miss_draws_no_damage_roll() {
        let (state, hero, goblin) = hero_and_goblin(12, 13);
        // Player misses, goblin answers and misses.
        let mut dice = ScriptedDice::new([12, 14]);

        let t = CombatResolver::new()
            .request_attack(&state, hero, goblin, &mut dice)
            .unwrap();

        assert_eq!(dice.draws(), 2);
        assert!(!t
            .events
            .iter()
            .any(|e| matches!(e, Effect::DamageDealt { .. })));
        assert_eq!(t.state.active_turn_holder(), Some(hero));
        assert_eq!(t.state.round(), 2);
    }

    #[test]
    fn test_hit_roll_equal_to_armor_class_hits() {
        let (state, hero, goblin) = hero_and_goblin(12, 13);
        let mut dice = ScriptedDice::new([13, 4, 1]);

        let t = CombatResolver::new()
            .request_attack(&state, hero, goblin, &mut dice)
            .unwrap();

        assert_eq!(t.state.combatant(goblin).unwrap().hit_points, 8);
        assert!(matches!(
            t.events[0],
            Effect::AttackRolled { roll: 13, hit: true, .. }
        ));
        assert!(matches!(
            t.events[1],
            Effect::DamageDealt { amount: 4, remaining: 8, die: DieType::D6, .. }
        ));
    }

    #[test]
    fn test_move_into_enemy_is_an_attack() {
        let (state, hero, goblin) = hero_and_goblin(12, 13);
        let mut dice = ScriptedDice::new([2, 3]);

        let t = CombatResolver::new()
            .request_move(&state, hero, 1, 0, &mut dice)
            .unwrap();

        assert_eq!(t.state.combatant(hero).unwrap().position, Position::new(1, 1));
        assert!(matches!(
            &t.events[0],
            Effect::AttackRolled { attacker, target, .. } if *attacker == hero && *target == goblin
        ));
        assert!(!t.events.iter().any(|e| matches!(e, Effect::Moved { .. })));
    }

    #[test]
    fn test_rejections_leave_state_alone() {
        let (state, hero, goblin) = hero_and_goblin(12, 13);
        let resolver = CombatResolver::new();
        let mut dice = ScriptedDice::new([]);

        assert!(matches!(
            resolver.request_move(&state, goblin, -1, 0, &mut dice),
            Err(ActionError::NotYourTurn { .. })
        ));
        assert_eq!(
            resolver.request_move(&state, hero, 2, 0, &mut dice).unwrap_err(),
            ActionError::InvalidStep { dx: 2, dy: 0 }
        );
        assert_eq!(
            resolver.request_move(&state, hero, 0, 0, &mut dice).unwrap_err(),
            ActionError::NoMovement {
                name: "Player".to_string(),
                position: Position::new(1, 1)
            }
        );
        assert_eq!(
            resolver.request_attack(&state, hero, hero, &mut dice).unwrap_err(),
            ActionError::InvalidTarget {
                target: hero,
                issue: TargetIssue::Ally
            }
        );
        let stranger = CombatantId::new();
        assert_eq!(
            resolver
                .request_attack(&state, hero, stranger, &mut dice)
                .unwrap_err(),
            ActionError::InvalidTarget {
                target: stranger,
                issue: TargetIssue::Missing
            }
        );
        assert_eq!(
            resolver.advance_turn(&state, stranger, &mut dice).unwrap_err(),
            ActionError::UnknownCombatant(stranger)
        );
        assert_eq!(dice.draws(), 0);
        assert_eq!(state.log().len(), 2);
    }

    #[test]
    fn test_move_clamps_at_grid_edge() {
        let hero = CombatantBuilder::player("Edge").hit_points(5).at(0, 0).build().unwrap();
        let goblin = CombatantBuilder::goblin("Far").at(4, 4).build().unwrap();
        let hero_id = hero.id;
        let state = create_encounter(
            vec![hero, goblin],
            &EncounterConfig::new().with_grid_size(5),
        )
        .unwrap();
        let resolver = CombatResolver::new();
        let mut dice = ScriptedDice::new([]);

        assert!(matches!(
            resolver.request_move(&state, hero_id, -1, -1, &mut dice),
            Err(ActionError::NoMovement { .. })
        ));

        // (-1, +1) clamps x and still moves down a row.
        let t = resolver.request_move(&state, hero_id, -1, 1, &mut dice).unwrap();
        assert_eq!(t.state.combatant(hero_id).unwrap().position, Position::new(0, 1));
    }

    #[test]
    fn test_pass_hands_turn_to_enemy_which_closes_in() {
        let hero = CombatantBuilder::hero("Roland").at(1, 1).build().unwrap();
        let goblin = CombatantBuilder::goblin("Snik").at(7, 3).build().unwrap();
        let (hero_id, goblin_id) = (hero.id, goblin.id);
        let state = create_encounter(vec![hero, goblin], &EncounterConfig::new()).unwrap();
        let mut dice = ScriptedDice::new([]);

        let t = CombatResolver::new()
            .advance_turn(&state, hero_id, &mut dice)
            .unwrap();

        assert_eq!(t.state.combatant(goblin_id).unwrap().position, Position::new(6, 2));
        assert_eq!(t.state.active_turn_holder(), Some(hero_id));
        assert_eq!(t.enemy_turns(), 1);
        assert_eq!(
            t.narration(),
            vec![
                "Roland waits.",
                "Round 1: Snik's turn.",
                "Snik moves to (6, 2).",
                "Round 2: Roland's turn.",
            ]
        );
    }

    #[test]
    fn test_enemy_victory_grants_no_experience() {
        let hero = CombatantBuilder::player("Frail")
            .hit_points(1)
            .armor_class(5)
            .at(3, 3)
            .build()
            .unwrap();
        let goblin = CombatantBuilder::goblin("Quick")
            .initiative(20)
            .at(4, 4)
            .build()
            .unwrap();
        let state = create_encounter(vec![hero, goblin], &EncounterConfig::new()).unwrap();
        let mut dice = ScriptedDice::new([20, 6]);

        let t = CombatResolver::new().start(&state, &mut dice).unwrap();

        assert_eq!(t.state.phase(), Phase::EnemyVictory);
        assert_eq!(t.state.winner(), Some(Side::Enemy));
        assert_eq!(t.state.player_experience(), 0);
        assert!(matches!(
            t.events.last(),
            Some(Effect::EncounterEnded {
                phase: Phase::EnemyVictory
            })
        ));

        let resolver = CombatResolver::new();
        let frail = t.state.find_by_name("Frail").unwrap().id;
        assert_eq!(
            resolver.advance_turn(&t.state, frail, &mut dice).unwrap_err(),
            ActionError::EncounterAlreadyOver(Phase::EnemyVictory)
        );
        assert!(resolver.start(&t.state, &mut dice).is_err());
    }

    #[test]
    fn test_start_is_a_no_op_on_player_turn() {
        let (state, hero, _) = hero_and_goblin(12, 13);
        let mut dice = ScriptedDice::new([]);
        let t = CombatResolver::new().start(&state, &mut dice).unwrap();
        assert!(t.events.is_empty());
        assert_eq!(t.state, state);
        assert_eq!(t.state.active_turn_holder(), Some(hero));
    }

    #[test]
    fn test_apply_effects_replays_a_transition() {
        let (state, hero, goblin) = hero_and_goblin(12, 13);
        let mut dice = ScriptedDice::new([18, 5, 3]);
        let t = CombatResolver::new()
            .request_attack(&state, hero, goblin, &mut dice)
            .unwrap();

        let mut replayed = state.clone();
        apply_effects(&mut replayed, &t.events);
        assert_eq!(replayed.combatants(), t.state.combatants());
        assert_eq!(replayed.active_turn_holder(), t.state.active_turn_holder());
        assert_eq!(replayed.round(), t.state.round());
    }
}
