//! Dice notation parsing and rolling.
//!
//! Rolls feed the active call of a room. The supported notation is
//! `[count]d<sides>[+modifier|-modifier]`, for example `d20`, `1d20+3` or
//! `4d6-1`.

use std::{fmt, str::FromStr};

use rand::Rng;
use thiserror::Error;

/// Maximum number of dice in one roll.
const MAX_COUNT: u32 = 100;
/// Maximum number of sides of a die.
const MAX_SIDES: u32 = 1000;
/// Maximum absolute value of the modifier.
const MAX_MODIFIER: i64 = 1000;

/// Errors that can occur while parsing dice notation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("missing `d` in dice notation")]
    MissingSeparator,
    #[error("invalid number `{0}` in dice notation")]
    InvalidNumber(String),
    #[error("dice notation out of range")]
    OutOfRange,
}

/// A parsed dice expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dice {
    /// Number of dice
    pub count: u32,
    /// Number of sides of each die
    pub sides: u32,
    /// Value added to the sum of the dice
    pub modifier: i64,
}

/// Result of rolling a [`Dice`] expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiceRoll {
    /// The rolled expression
    pub dice: Dice,
    /// Value of each die
    pub results: Vec<u32>,
    /// Sum of the dice plus the modifier
    pub total: i64,
}

impl Dice {
    /// Rolls every die with the given random number generator.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> DiceRoll {
        let results: Vec<u32> = (0..self.count)
            .map(|_| rng.gen_range(1..=self.sides))
            .collect();
        let total = results.iter().map(|r| i64::from(*r)).sum::<i64>() + self.modifier;

        DiceRoll {
            dice: *self,
            results,
            total,
        }
    }
}

impl FromStr for Dice {
    type Err = DiceError;

    fn from_str(notation: &str) -> Result<Self, Self::Err> {
        let notation = notation.trim().to_lowercase();
        let (count, rest) = notation
            .split_once('d')
            .ok_or(DiceError::MissingSeparator)?;

        let count = match count {
            "" => 1,
            count => parse_number::<u32>(count)?,
        };

        let (sides, modifier) = match rest.find(['+', '-']) {
            Some(index) => {
                let (sides, modifier) = rest.split_at(index);
                let value = parse_number::<i64>(&modifier[1..])?;
                let modifier = if modifier.starts_with('-') { -value } else { value };
                (parse_number::<u32>(sides)?, modifier)
            }
            None => (parse_number::<u32>(rest)?, 0),
        };

        if count == 0 || count > MAX_COUNT || sides == 0 || sides > MAX_SIDES {
            return Err(DiceError::OutOfRange);
        }
        if modifier.abs() > MAX_MODIFIER {
            return Err(DiceError::OutOfRange);
        }

        Ok(Dice {
            count,
            sides,
            modifier,
        })
    }
}

fn parse_number<T: FromStr>(raw: &str) -> Result<T, DiceError> {
    // Signs are handled by the caller
    if raw.starts_with(['+', '-']) {
        return Err(DiceError::InvalidNumber(raw.to_owned()));
    }
    raw.parse::<T>()
        .map_err(|_| DiceError::InvalidNumber(raw.to_owned()))
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{}", m),
            m => write!(f, "{}", m),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_parse_single_die() {
        assert_eq!(
            "d20".parse::<Dice>(),
            Ok(Dice {
                count: 1,
                sides: 20,
                modifier: 0
            })
        );
    }

    #[test]
    fn test_parse_with_count_and_modifiers() {
        assert_eq!(
            "3d6+2".parse::<Dice>(),
            Ok(Dice {
                count: 3,
                sides: 6,
                modifier: 2
            })
        );
        assert_eq!(
            "1D20-1".parse::<Dice>(),
            Ok(Dice {
                count: 1,
                sides: 20,
                modifier: -1
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("20".parse::<Dice>(), Err(DiceError::MissingSeparator));
        assert_eq!(
            "xd6".parse::<Dice>(),
            Err(DiceError::InvalidNumber("x".to_string()))
        );
        assert_eq!(
            "d".parse::<Dice>(),
            Err(DiceError::InvalidNumber("".to_string()))
        );
        assert_eq!(
            "d20+".parse::<Dice>(),
            Err(DiceError::InvalidNumber("".to_string()))
        );
        assert_eq!(
            "d20+-2".parse::<Dice>(),
            Err(DiceError::InvalidNumber("-2".to_string()))
        );
    }

    #[test]
    fn test_parse_out_of_range() {
        assert_eq!("0d6".parse::<Dice>(), Err(DiceError::OutOfRange));
        assert_eq!("101d6".parse::<Dice>(), Err(DiceError::OutOfRange));
        assert_eq!("d0".parse::<Dice>(), Err(DiceError::OutOfRange));
        assert_eq!("d1001".parse::<Dice>(), Err(DiceError::OutOfRange));
        assert_eq!("d20+1001".parse::<Dice>(), Err(DiceError::OutOfRange));
    }

    #[test]
    fn test_display() {
        assert_eq!("d20".parse::<Dice>().unwrap().to_string(), "1d20");
        assert_eq!("2d8+3".parse::<Dice>().unwrap().to_string(), "2d8+3");
        assert_eq!("2d8-3".parse::<Dice>().unwrap().to_string(), "2d8-3");
    }

    #[test]
    fn test_roll_stays_in_bounds() {
        let dice: Dice = "4d6+2".parse().unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let roll = dice.roll(&mut rng);
            assert_eq!(roll.results.len(), 4);
            assert!(roll.results.iter().all(|r| (1..=6).contains(r)));
            assert!((6..=26).contains(&roll.total));
            assert_eq!(
                roll.total,
                roll.results.iter().map(|r| i64::from(*r)).sum::<i64>() + 2
            );
        }
    }

    #[test]
    fn test_roll_is_reproducible_with_seed() {
        let dice: Dice = "d20".parse().unwrap();

        let first = dice.roll(&mut StdRng::seed_from_u64(7));
        let second = dice.roll(&mut StdRng::seed_from_u64(7));

        assert_eq!(first, second);
    }
}
