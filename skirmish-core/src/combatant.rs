//! Combatants and grid geometry.
//!
//! Contains the identity, allegiance, and position types shared by the
//! encounter state and the combat rules, plus a builder for assembling
//! rosters.

use crate::dice::{DiceSource, DieType};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for combatants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Allegiance
// ============================================================================

/// Which side of the fight a combatant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn opponent(&self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Side::Player => "player",
            Side::Enemy => "enemy",
        }
    }

    /// Player-side combatants wait for input; enemies act automatically.
    pub fn is_player_controlled(&self) -> bool {
        matches!(self, Side::Player)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Grid Geometry
// ============================================================================

/// A cell on the square encounter grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Clamp both coordinates into `[0, grid_size - 1]`.
    pub fn clamped(&self, grid_size: u32) -> Self {
        let max = grid_size.saturating_sub(1) as i32;
        Self::new(self.x.clamp(0, max), self.y.clamp(0, max))
    }

    pub fn in_bounds(&self, grid_size: u32) -> bool {
        let size = grid_size as i32;
        (0..size).contains(&self.x) && (0..size).contains(&self.y)
    }

    /// Chebyshev distance: diagonal steps cost the same as orthogonal ones.
    pub fn distance_to(&self, other: Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn is_adjacent(&self, other: Position) -> bool {
        self.distance_to(other) == 1
    }

    /// The single diagonal-seeking step that closes distance to `target`.
    pub fn step_toward(&self, target: Position) -> (i32, i32) {
        ((target.x - self.x).signum(), (target.y - self.y).signum())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ============================================================================
// Combatant
// ============================================================================

/// A positioned participant in an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub side: Side,
    pub position: Position,
    pub hit_points: i32,
    pub max_hit_points: i32,
    /// Minimum attack roll needed to hit this combatant.
    pub armor_class: i32,
    pub initiative: i32,
    /// Damage die for this combatant's weapon.
    pub weapon_die: DieType,
}

impl Combatant {
    pub fn is_alive(&self) -> bool {
        self.hit_points > 0
    }

    pub fn is_opponent_of(&self, other: &Combatant) -> bool {
        self.side != other.side
    }

    /// Reduce hit points, never below zero. Returns the HP actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.hit_points;
        self.hit_points = (self.hit_points - amount.max(0)).max(0);
        before - self.hit_points
    }
}

/// Errors from building a combatant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("Combatant needs a name")]
    MissingName,

    #[error("Hit points were never set for {0}")]
    MissingHitPoints(String),

    #[error("Maximum hit points must be positive, got {0}")]
    InvalidMaxHitPoints(i32),

    #[error("Current hit points {current} must be within 1..={max}")]
    InvalidHitPoints { current: i32, max: i32 },
}

/// Builder for combatants.
///
/// Armor class defaults to 10, initiative to 0, and the weapon die to a
/// d6 for the player side or a d4 for enemies.
#[derive(Debug, Clone)]
pub struct CombatantBuilder {
    id: Option<CombatantId>,
    name: String,
    side: Side,
    position: Position,
    max_hit_points: Option<i32>,
    hit_points: Option<i32>,
    armor_class: i32,
    initiative: i32,
    weapon_die: Option<DieType>,
}

impl CombatantBuilder {
    pub fn new(name: impl Into<String>, side: Side) -> Self {
        Self {
            id: None,
            name: name.into(),
            side,
            position: Position::ORIGIN,
            max_hit_points: None,
            hit_points: None,
            armor_class: 10,
            initiative: 0,
            weapon_die: None,
        }
    }

    pub fn player(name: impl Into<String>) -> Self {
        Self::new(name, Side::Player)
    }

    pub fn enemy(name: impl Into<String>) -> Self {
        Self::new(name, Side::Enemy)
    }

    /// Player hero: 20 HP, AC 15, +2 initiative, d6 weapon.
    pub fn hero(name: impl Into<String>) -> Self {
        Self::player(name)
            .hit_points(20)
            .armor_class(15)
            .initiative(2)
            .weapon(DieType::D6)
    }

    /// Goblin raider: 12 HP, AC 13, d6 scimitar.
    pub fn goblin(name: impl Into<String>) -> Self {
        Self::enemy(name)
            .hit_points(12)
            .armor_class(13)
            .weapon(DieType::D6)
    }

    pub fn id(mut self, id: CombatantId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Set maximum hit points; the combatant starts at full health.
    pub fn hit_points(mut self, max: i32) -> Self {
        self.max_hit_points = Some(max);
        self
    }

    /// Start the combatant wounded.
    pub fn current_hit_points(mut self, current: i32) -> Self {
        self.hit_points = Some(current);
        self
    }

    pub fn armor_class(mut self, ac: i32) -> Self {
        self.armor_class = ac;
        self
    }

    pub fn initiative(mut self, initiative: i32) -> Self {
        self.initiative = initiative;
        self
    }

    /// Roll initiative: d20 plus the given modifier.
    pub fn roll_initiative<D: DiceSource + ?Sized>(mut self, modifier: i32, dice: &mut D) -> Self {
        self.initiative = dice.roll_die(DieType::D20) as i32 + modifier;
        self
    }

    pub fn weapon(mut self, die: DieType) -> Self {
        self.weapon_die = Some(die);
        self
    }

    pub fn build(self) -> Result<Combatant, BuilderError> {
        if self.name.trim().is_empty() {
            return Err(BuilderError::MissingName);
        }

        let max_hit_points = self
            .max_hit_points
            .ok_or_else(|| BuilderError::MissingHitPoints(self.name.clone()))?;
        if max_hit_points <= 0 {
            return Err(BuilderError::InvalidMaxHitPoints(max_hit_points));
        }

        let hit_points = self.hit_points.unwrap_or(max_hit_points);
        if hit_points <= 0 || hit_points > max_hit_points {
            return Err(BuilderError::InvalidHitPoints {
                current: hit_points,
                max: max_hit_points,
            });
        }

        let weapon_die = self.weapon_die.unwrap_or(match self.side {
            Side::Player => DieType::D6,
            Side::Enemy => DieType::D4,
        });

        Ok(Combatant {
            id: self.id.unwrap_or_default(),
            name: self.name,
            side: self.side,
            position: self.position,
            hit_points,
            max_hit_points,
            armor_class: self.armor_class,
            initiative: self.initiative,
            weapon_die,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDice;

    #[test]
    fn test_clamp_to_grid() {
        assert_eq!(Position::new(-1, 4).clamped(5), Position::new(0, 4));
        assert_eq!(Position::new(5, 7).clamped(5), Position::new(4, 4));
        assert_eq!(Position::new(2, 2).clamped(5), Position::new(2, 2));
    }

    #[test]
    fn test_chebyshev_distance() {
        let origin = Position::new(3, 3);
        assert_eq!(origin.distance_to(Position::new(4, 4)), 1);
        assert_eq!(origin.distance_to(Position::new(6, 4)), 3);
        assert!(origin.is_adjacent(Position::new(2, 4)));
        assert!(!origin.is_adjacent(origin));
    }

    #[test]
    fn test_step_toward_is_diagonal() {
        let from = Position::new(7, 3);
        assert_eq!(from.step_toward(Position::new(1, 1)), (-1, -1));
        assert_eq!(from.step_toward(Position::new(7, 9)), (0, 1));
    }

    #[test]
    fn test_damage_floors_at_zero() {
        let mut goblin = CombatantBuilder::goblin("Goblin").build().unwrap();
        assert_eq!(goblin.take_damage(5), 5);
        assert_eq!(goblin.hit_points, 7);
        assert_eq!(goblin.take_damage(10), 7);
        assert_eq!(goblin.hit_points, 0);
        assert!(!goblin.is_alive());
    }

    #[test]
    fn test_builder_defaults() {
        let player = CombatantBuilder::player("Ayla").hit_points(8).build().unwrap();
        assert_eq!(player.weapon_die, DieType::D6);
        assert_eq!(player.armor_class, 10);
        assert_eq!(player.hit_points, 8);

        let rat = CombatantBuilder::enemy("Rat").hit_points(2).build().unwrap();
        assert_eq!(rat.weapon_die, DieType::D4);
        assert_ne!(player.id, rat.id);
    }

    #[test]
    fn test_builder_rejects_bad_hit_points() {
        assert_eq!(
            CombatantBuilder::enemy("Shade").build(),
            Err(BuilderError::MissingHitPoints("Shade".to_string()))
        );
        assert_eq!(
            CombatantBuilder::enemy("Shade").hit_points(0).build(),
            Err(BuilderError::InvalidMaxHitPoints(0))
        );
        assert_eq!(
            CombatantBuilder::enemy("Shade")
                .hit_points(5)
                .current_hit_points(6)
                .build(),
            Err(BuilderError::InvalidHitPoints { current: 6, max: 5 })
        );
        assert_eq!(
            CombatantBuilder::enemy("  ").hit_points(5).build(),
            Err(BuilderError::MissingName)
        );
    }

    #[test]
    fn test_roll_initiative() {
        let mut dice = ScriptedDice::new([14]);
        let hero = CombatantBuilder::hero("Roland")
            .roll_initiative(2, &mut dice)
            .build()
            .unwrap();
        assert_eq!(hero.initiative, 16);
        assert_eq!(dice.draws(), 1);
    }
}
