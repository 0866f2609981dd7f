//! Roulette bet shapes on the European 0-36 layout.
//!
//! The table grid has three numbers per row: `n, n+1, n+2` with `n % 3 == 1`.
//! Every shape is validated in closed form and normalised to the numbers it
//! covers, so resolving a spin is a single membership test.

use serde::{Deserialize, Serialize};

use crate::errors::domain::{DomainError, ValidationKind};

pub const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

pub const MAX_NUMBER: u8 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    Straight,
    Split,
    Street,
    Corner,
    Line,
    Dozen,
    Column,
    Red,
    Black,
    Odd,
    Even,
    Low,
    High,
}

impl BetType {
    /// Winnings per unit staked, excluding the stake.
    pub fn payout_ratio(self) -> i64 {
        match self {
            BetType::Straight => 35,
            BetType::Split => 17,
            BetType::Street => 11,
            BetType::Corner => 8,
            BetType::Line => 5,
            BetType::Dozen | BetType::Column => 2,
            BetType::Red
            | BetType::Black
            | BetType::Odd
            | BetType::Even
            | BetType::Low
            | BetType::High => 1,
        }
    }

    pub fn is_outside(self) -> bool {
        matches!(
            self,
            BetType::Red | BetType::Black | BetType::Odd | BetType::Even | BetType::Low | BetType::High
        )
    }
}

pub fn is_red(number: u8) -> bool {
    RED_NUMBERS.contains(&number)
}

fn invalid(detail: impl Into<String>) -> DomainError {
    DomainError::validation(ValidationKind::InvalidBet, detail)
}

fn sorted(numbers: &[u8]) -> Vec<u8> {
    let mut v = numbers.to_vec();
    v.sort_unstable();
    v
}

/// Validate a bet and return the numbers it covers, ascending.
pub fn validate_bet(bet_type: BetType, numbers: &[u8]) -> Result<Vec<u8>, DomainError> {
    if numbers.iter().any(|n| *n > MAX_NUMBER) {
        return Err(invalid("Numbers must be between 0 and 36"));
    }
    let nums = sorted(numbers);
    let expect_len = |len: usize| {
        if nums.len() == len {
            Ok(())
        } else {
            Err(invalid(format!(
                "{bet_type:?} bet needs exactly {len} number(s)"
            )))
        }
    };

    match bet_type {
        BetType::Straight => {
            expect_len(1)?;
            Ok(nums)
        }
        BetType::Split => {
            expect_len(2)?;
            let (a, b) = (nums[0], nums[1]);
            let with_zero = a == 0 && (1..=3).contains(&b);
            let horizontal = a >= 1 && b == a + 1 && a % 3 != 0;
            let vertical = a >= 1 && b == a + 3;
            if with_zero || horizontal || vertical {
                Ok(nums)
            } else {
                Err(invalid(format!("{a} and {b} are not adjacent")))
            }
        }
        BetType::Street => {
            expect_len(3)?;
            let n = nums[0];
            if n >= 1 && n % 3 == 1 && nums == [n, n + 1, n + 2] {
                Ok(nums)
            } else {
                Err(invalid("A street is one row of three numbers"))
            }
        }
        BetType::Corner => {
            expect_len(4)?;
            let n = nums[0];
            if n >= 1 && n % 3 != 0 && n + 4 <= MAX_NUMBER && nums == [n, n + 1, n + 3, n + 4] {
                Ok(nums)
            } else {
                Err(invalid("A corner must be a 2x2 square on the grid"))
            }
        }
        BetType::Line => {
            expect_len(6)?;
            let n = nums[0];
            if n >= 1 && n % 3 == 1 && n + 5 <= MAX_NUMBER && nums == (n..=n + 5).collect::<Vec<_>>()
            {
                Ok(nums)
            } else {
                Err(invalid("A line is two adjacent rows"))
            }
        }
        BetType::Dozen => {
            let k = selector(&nums, bet_type)?;
            Ok(((k - 1) * 12 + 1..=k * 12).collect())
        }
        BetType::Column => {
            let k = selector(&nums, bet_type)?;
            Ok((1..=MAX_NUMBER).filter(|n| n % 3 == k % 3).collect())
        }
        BetType::Red
        | BetType::Black
        | BetType::Odd
        | BetType::Even
        | BetType::Low
        | BetType::High => {
            if !nums.is_empty() {
                return Err(invalid(format!("{bet_type:?} bet takes no numbers")));
            }
            Ok((1..=MAX_NUMBER)
                .filter(|n| match bet_type {
                    BetType::Red => is_red(*n),
                    BetType::Black => !is_red(*n),
                    BetType::Odd => n % 2 == 1,
                    BetType::Even => n % 2 == 0,
                    BetType::Low => *n <= 18,
                    _ => *n >= 19,
                })
                .collect())
        }
    }
}

fn selector(nums: &[u8], bet_type: BetType) -> Result<u8, DomainError> {
    match nums {
        [k] if (1..=3).contains(k) => Ok(*k),
        _ => Err(invalid(format!("{bet_type:?} bet needs a selector 1-3"))),
    }
}

/// Gross return of a bet: `amount × (ratio + 1)` when `winning` is covered,
/// otherwise 0.
pub fn calculate_bet_payout(bet_type: BetType, amount: i64, covered: &[u8], winning: u8) -> i64 {
    if covered.contains(&winning) {
        amount * (bet_type.payout_ratio() + 1)
    } else {
        0
    }
}
