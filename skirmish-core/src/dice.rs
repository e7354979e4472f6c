//! Dice rolling for encounters.
//!
//! Every random draw the combat rules make goes through a [`DiceSource`],
//! so tests can force exact roll sequences while live play uses a seeded
//! or thread-local RNG. Standard `XdY+Z` notation is supported for
//! free-form rolls.

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
    #[error("Too many dice: {0} (at most {max})", max = MAX_DICE)]
    TooManyDice(u32),
}

/// Most dice a single expression may roll.
pub const MAX_DICE: u32 = 1000;

/// Standard tabletop die types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl DieType {
    pub fn sides(&self) -> u32 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
            DieType::D100 => 100,
        }
    }

    pub fn from_sides(sides: u32) -> Option<DieType> {
        match sides {
            4 => Some(DieType::D4),
            6 => Some(DieType::D6),
            8 => Some(DieType::D8),
            10 => Some(DieType::D10),
            12 => Some(DieType::D12),
            20 => Some(DieType::D20),
            100 => Some(DieType::D100),
            _ => None,
        }
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// A source of die rolls.
///
/// Implementations must return a value in `1..=die.sides()`.
pub trait DiceSource {
    fn roll_die(&mut self, die: DieType) -> u32;
}

impl<D: DiceSource + ?Sized> DiceSource for &mut D {
    fn roll_die(&mut self, die: DieType) -> u32 {
        (**self).roll_die(die)
    }
}

/// Dice backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngDice<R> {
    rng: R,
}

impl<R: Rng> RngDice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl RngDice<StdRng> {
    /// Deterministic dice for reproducible encounters.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Dice seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl RngDice<ThreadRng> {
    pub fn thread() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl<R: Rng> DiceSource for RngDice<R> {
    fn roll_die(&mut self, die: DieType) -> u32 {
        self.rng.gen_range(1..=die.sides())
    }
}

/// A single die component of a dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceComponent {
    pub count: u32,
    pub die_type: DieType,
}

/// A complete dice expression (e.g., 2d6+3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    pub components: Vec<DiceComponent>,
    pub modifier: i32,
    pub original: String,
}

impl DiceExpression {
    /// Parse a dice notation string such as `d20`, `2d6+3` or `1d8+1d4-1`.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let mut components = Vec::new();
        let mut modifier: i32 = 0;
        let mut current = String::new();
        let mut sign: i32 = 1;

        for ch in notation.chars() {
            match ch {
                '+' | '-' => {
                    if !current.is_empty() {
                        Self::parse_term(&current, sign, &mut components, &mut modifier)?;
                        current.clear();
                    }
                    sign = if ch == '+' { 1 } else { -1 };
                }
                ' ' => continue,
                _ => current.push(ch),
            }
        }

        if !current.is_empty() {
            Self::parse_term(&current, sign, &mut components, &mut modifier)?;
        }

        if components.is_empty() {
            return Err(DiceError::NoDice);
        }

        Ok(DiceExpression {
            components,
            modifier,
            original: notation,
        })
    }

    /// A single die, e.g. the d20 of an attack roll.
    pub fn single(die_type: DieType) -> Self {
        DiceExpression {
            components: vec![DiceComponent { count: 1, die_type }],
            modifier: 0,
            original: die_type.to_string(),
        }
    }

    fn parse_term(
        s: &str,
        sign: i32,
        components: &mut Vec<DiceComponent>,
        modifier: &mut i32,
    ) -> Result<(), DiceError> {
        let Some(d_pos) = s.find('d') else {
            let value: i32 = s
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            let current = *modifier;
            *modifier = value
                .checked_mul(sign)
                .and_then(|v| current.checked_add(v))
                .ok_or_else(|| DiceError::InvalidNotation(s.to_string()))?;
            return Ok(());
        };

        // Subtracting dice is not a thing at the table.
        if sign < 0 {
            return Err(DiceError::InvalidNotation(s.to_string()));
        }

        let count_str = &s[..d_pos];
        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?
        };
        if count == 0 {
            return Err(DiceError::NoDice);
        }
        let rolled: u32 = components.iter().map(|c| c.count).sum();
        if count > MAX_DICE - rolled {
            return Err(DiceError::TooManyDice(rolled.saturating_add(count)));
        }

        let sides: u32 = s[d_pos + 1..]
            .parse()
            .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
        let die_type = DieType::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))?;

        components.push(DiceComponent { count, die_type });
        Ok(())
    }

    /// Roll using thread-local randomness.
    pub fn roll(&self) -> RollResult {
        self.roll_with(&mut RngDice::thread())
    }

    /// Roll with a specific dice source (useful for testing).
    pub fn roll_with<D: DiceSource + ?Sized>(&self, dice: &mut D) -> RollResult {
        let component_results: Vec<ComponentResult> = self
            .components
            .iter()
            .map(|component| {
                let rolls: Vec<u32> = (0..component.count)
                    .map(|_| dice.roll_die(component.die_type))
                    .collect();
                let subtotal = rolls.iter().fold(0u32, |acc, r| acc.saturating_add(*r));
                ComponentResult {
                    die_type: component.die_type,
                    rolls,
                    subtotal,
                }
            })
            .collect();

        let dice_total: i64 = component_results.iter().map(|c| i64::from(c.subtotal)).sum();
        let total = i32::try_from(dice_total + i64::from(self.modifier)).unwrap_or(i32::MAX);

        // Natural 20/1 only means something on a lone d20
        let d20_roll = component_results
            .iter()
            .find(|c| c.die_type == DieType::D20 && c.rolls.len() == 1)
            .and_then(|c| c.rolls.first().copied());

        RollResult {
            expression: self.clone(),
            component_results,
            modifier: self.modifier,
            total,
            natural_20: d20_roll == Some(20),
            natural_1: d20_roll == Some(1),
        }
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// Result of rolling a single dice component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub die_type: DieType,
    pub rolls: Vec<u32>,
    pub subtotal: u32,
}

/// Complete result of a dice roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub expression: DiceExpression,
    pub component_results: Vec<ComponentResult>,
    pub modifier: i32,
    pub total: i32,
    pub natural_20: bool,
    pub natural_1: bool,
}

impl RollResult {
    /// Format the individual dice results for display, e.g. `[3, 5] + 2`.
    pub fn dice_display(&self) -> String {
        let dice_str = self
            .component_results
            .iter()
            .map(|c| {
                let rolls: Vec<String> = c.rolls.iter().map(|r| r.to_string()).collect();
                format!("[{}]", rolls.join(", "))
            })
            .collect::<Vec<_>>()
            .join(" + ");

        match self.modifier {
            0 => dice_str,
            m if m > 0 => format!("{dice_str} + {m}"),
            m => format!("{dice_str} - {}", m.abs()),
        }
    }

    /// Check if the roll meets or exceeds a target number.
    pub fn meets(&self, target: i32) -> bool {
        self.total >= target
    }
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.dice_display(), self.total)
    }
}

/// Convenience function to roll dice from a notation string.
pub fn roll(notation: &str) -> Result<RollResult, DiceError> {
    let expr = DiceExpression::parse(notation)?;
    Ok(expr.roll())
}
