//! Scores: ordered tuples of weighted levels.
//!
//! A score is compared level by level, most significant level first. The
//! hard level decides feasibility; the soft level ranks feasible solutions.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SolveError;

/// Behaviour shared by all score types.
pub trait Score:
    Copy
    + Ord
    + Default
    + fmt::Debug
    + fmt::Display
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    /// Returns true when no hard constraint is broken.
    fn is_feasible(&self) -> bool;

    /// The zero score.
    fn zero() -> Self;

    /// Number of levels, most significant first.
    fn levels_count() -> usize;

    /// Level values, most significant first.
    fn to_level_numbers(&self) -> Vec<i64>;

    /// Multiplies every level by `multiplier`.
    fn multiply(&self, multiplier: i64) -> Self;
}

/// A score with separate hard and soft constraint levels.
///
/// Hard constraints must be satisfied for a solution to be feasible.
/// Soft constraints are optimization objectives.
///
/// # Examples
///
/// ```
/// use school_timetabling::score::{HardSoftScore, Score};
///
/// let infeasible = HardSoftScore::of(-1, -100);
/// let feasible = HardSoftScore::of(0, -200);
///
/// // Feasible solutions are always better than infeasible ones
/// assert!(feasible > infeasible);
/// assert!(feasible.is_feasible());
/// assert_eq!(feasible.to_string(), "0hard/-200soft");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HardSoftScore {
    hard: i64,
    soft: i64,
}

impl HardSoftScore {
    /// The zero score.
    pub const ZERO: HardSoftScore = HardSoftScore { hard: 0, soft: 0 };

    /// Weight of one hard match.
    pub const ONE_HARD: HardSoftScore = HardSoftScore { hard: 1, soft: 0 };

    /// Weight of one soft match.
    pub const ONE_SOFT: HardSoftScore = HardSoftScore { hard: 0, soft: 1 };

    #[inline]
    pub const fn of(hard: i64, soft: i64) -> Self {
        HardSoftScore { hard, soft }
    }

    #[inline]
    pub const fn of_hard(hard: i64) -> Self {
        HardSoftScore { hard, soft: 0 }
    }

    #[inline]
    pub const fn of_soft(soft: i64) -> Self {
        HardSoftScore { hard: 0, soft }
    }

    #[inline]
    pub const fn hard(&self) -> i64 {
        self.hard
    }

    #[inline]
    pub const fn soft(&self) -> i64 {
        self.soft
    }
}

impl Score for HardSoftScore {
    #[inline]
    fn is_feasible(&self) -> bool {
        self.hard >= 0
    }

    #[inline]
    fn zero() -> Self {
        HardSoftScore::ZERO
    }

    fn levels_count() -> usize {
        2
    }

    fn to_level_numbers(&self) -> Vec<i64> {
        vec![self.hard, self.soft]
    }

    fn multiply(&self, multiplier: i64) -> Self {
        HardSoftScore::of(self.hard * multiplier, self.soft * multiplier)
    }
}

impl Ord for HardSoftScore {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.hard.cmp(&other.hard) {
            Ordering::Equal => self.soft.cmp(&other.soft),
            other => other,
        }
    }
}

impl PartialOrd for HardSoftScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for HardSoftScore {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        HardSoftScore::of(self.hard + rhs.hard, self.soft + rhs.soft)
    }
}

impl Sub for HardSoftScore {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        HardSoftScore::of(self.hard - rhs.hard, self.soft - rhs.soft)
    }
}

impl Neg for HardSoftScore {
    type Output = Self;

    fn neg(self) -> Self {
        HardSoftScore::of(-self.hard, -self.soft)
    }
}

impl std::iter::Sum for HardSoftScore {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(HardSoftScore::ZERO, Add::add)
    }
}

impl fmt::Debug for HardSoftScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HardSoftScore({}, {})", self.hard, self.soft)
    }
}

impl fmt::Display for HardSoftScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}hard/{}soft", self.hard, self.soft)
    }
}

impl FromStr for HardSoftScore {
    type Err = SolveError;

    /// Parses the `"<hard>hard/<soft>soft"` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SolveError::Configuration(format!("invalid HardSoftScore ({s})"));
        let (hard, soft) = s.trim().split_once('/').ok_or_else(invalid)?;
        let hard = hard
            .strip_suffix("hard")
            .and_then(|h| h.parse::<i64>().ok())
            .ok_or_else(invalid)?;
        let soft = soft
            .strip_suffix("soft")
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(invalid)?;
        Ok(HardSoftScore::of(hard, soft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_level_dominates_soft_level() {
        assert!(HardSoftScore::of(0, -1000) > HardSoftScore::of(-1, 0));
        assert!(HardSoftScore::of(-1, 5) > HardSoftScore::of(-1, 4));
        assert_eq!(
            HardSoftScore::of(-2, 3).cmp(&HardSoftScore::of(-2, 3)),
            Ordering::Equal
        );
    }

    #[test]
    fn feasibility_depends_on_hard_level_only() {
        assert!(HardSoftScore::of(0, -50).is_feasible());
        assert!(HardSoftScore::of(3, 0).is_feasible());
        assert!(!HardSoftScore::of(-1, 100).is_feasible());
    }

    #[test]
    fn arithmetic() {
        let a = HardSoftScore::of(-1, 2);
        let b = HardSoftScore::ONE_SOFT.multiply(3);
        assert_eq!(a + b, HardSoftScore::of(-1, 5));
        assert_eq!(a - b, HardSoftScore::of(-1, -1));
        assert_eq!(-a, HardSoftScore::of(1, -2));
        let total: HardSoftScore = vec![a, b, HardSoftScore::ONE_HARD].into_iter().sum();
        assert_eq!(total, HardSoftScore::of(0, 5));
    }

    #[test]
    fn parses_display_form() {
        let score: HardSoftScore = "-3hard/-14soft".parse().unwrap();
        assert_eq!(score, HardSoftScore::of(-3, -14));
        assert_eq!(score.to_string().parse::<HardSoftScore>().unwrap(), score);
        assert!("3/4".parse::<HardSoftScore>().is_err());
        assert!("xhard/0soft".parse::<HardSoftScore>().is_err());
    }
}
