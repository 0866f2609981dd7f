//! Pure dice-scoring functions. No state, no randomness.

use serde::{Deserialize, Serialize};

use super::ruleset::{FullHouseRule, Ruleset, StraightRule};

pub type Dice = [u8; 5];

pub const UPPER_BONUS: u32 = 35;
pub const UPPER_BONUS_THRESHOLD: u32 = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Ones,
    Twos,
    Threes,
    Fours,
    Fives,
    Sixes,
    ThreeOfAKind,
    FourOfAKind,
    FullHouse,
    SmallStraight,
    LargeStraight,
    Kniffel,
    Chance,
    // Only reachable through the category randomizer.
    TwoPairs,
    AllEven,
    AllOdd,
}

pub const UPPER_CATEGORIES: [Category; 6] = [
    Category::Ones,
    Category::Twos,
    Category::Threes,
    Category::Fours,
    Category::Fives,
    Category::Sixes,
];

pub const STANDARD_CATEGORIES: [Category; 13] = [
    Category::Ones,
    Category::Twos,
    Category::Threes,
    Category::Fours,
    Category::Fives,
    Category::Sixes,
    Category::ThreeOfAKind,
    Category::FourOfAKind,
    Category::FullHouse,
    Category::SmallStraight,
    Category::LargeStraight,
    Category::Kniffel,
    Category::Chance,
];

pub const SPECIAL_CATEGORIES: [Category; 3] =
    [Category::TwoPairs, Category::AllEven, Category::AllOdd];

impl Category {
    /// Face counted by an upper-section category.
    pub fn face(self) -> Option<u8> {
        match self {
            Category::Ones => Some(1),
            Category::Twos => Some(2),
            Category::Threes => Some(3),
            Category::Fours => Some(4),
            Category::Fives => Some(5),
            Category::Sixes => Some(6),
            _ => None,
        }
    }

    pub fn is_upper(self) -> bool {
        self.face().is_some()
    }
}

/// Occurrences of each face; index 0 is unused.
pub fn face_counts(dice: &Dice) -> [u8; 7] {
    let mut counts = [0u8; 7];
    for &d in dice {
        if (1..=6).contains(&d) {
            counts[d as usize] += 1;
        }
    }
    counts
}

pub fn dice_sum(dice: &Dice) -> u32 {
    dice.iter().map(|&d| d as u32).sum()
}

/// Length of the longest run of consecutive distinct faces.
pub fn longest_run(dice: &Dice) -> u8 {
    let counts = face_counts(dice);
    let mut best = 0;
    let mut run = 0;
    for face in 1..=6 {
        if counts[face] > 0 {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

pub fn is_valid_dice(dice: &Dice) -> bool {
    dice.iter().all(|d| (1..=6).contains(d))
}

/// Score `dice` in `category` under the active ruleset. Always >= 0.
pub fn score(category: Category, dice: &Dice, rules: &Ruleset) -> u32 {
    if !is_valid_dice(dice) {
        return 0;
    }
    let counts = face_counts(dice);
    let max_same = counts.iter().copied().max().unwrap_or(0);
    let sum = dice_sum(dice);

    match category {
        Category::Ones
        | Category::Twos
        | Category::Threes
        | Category::Fours
        | Category::Fives
        | Category::Sixes => {
            let face = category.face().unwrap_or(0);
            counts[face as usize] as u32 * face as u32
        }
        Category::ThreeOfAKind => {
            if max_same >= 3 {
                sum
            } else {
                0
            }
        }
        Category::FourOfAKind => {
            if max_same >= 4 {
                sum
            } else {
                0
            }
        }
        Category::FullHouse => {
            let has_three = counts.contains(&3);
            let has_two = counts.contains(&2);
            if has_three && has_two {
                match rules.full_house {
                    FullHouseRule::Fixed => 25,
                    FullHouseRule::DiceSum => sum,
                }
            } else {
                0
            }
        }
        Category::SmallStraight => {
            let run = longest_run(dice);
            let ok = match rules.straights {
                StraightRule::Loose => run >= 4,
                StraightRule::Strict => run == 4,
            };
            if ok {
                30
            } else {
                0
            }
        }
        Category::LargeStraight => {
            if longest_run(dice) == 5 {
                40
            } else {
                0
            }
        }
        Category::Kniffel => {
            if max_same == 5 {
                50
            } else {
                0
            }
        }
        Category::Chance => sum,
        Category::TwoPairs => {
            let pairs = counts.iter().filter(|&&c| c >= 2).count();
            if pairs >= 2 {
                sum
            } else {
                0
            }
        }
        Category::AllEven => {
            if dice.iter().all(|d| d % 2 == 0) {
                sum
            } else {
                0
            }
        }
        Category::AllOdd => {
            if dice.iter().all(|d| d % 2 == 1) {
                sum
            } else {
                0
            }
        }
    }
}

/// Highest score a category can ever yield under `rules`.
pub fn max_score(category: Category, rules: &Ruleset) -> u32 {
    match category {
        Category::Ones
        | Category::Twos
        | Category::Threes
        | Category::Fours
        | Category::Fives
        | Category::Sixes => category.face().unwrap_or(0) as u32 * 5,
        Category::ThreeOfAKind | Category::FourOfAKind | Category::Chance => 30,
        Category::FullHouse => match rules.full_house {
            FullHouseRule::Fixed => 25,
            FullHouseRule::DiceSum => 28,
        },
        Category::SmallStraight => 30,
        Category::LargeStraight => 40,
        Category::Kniffel => 50,
        Category::TwoPairs => 28,
        Category::AllEven => 30,
        Category::AllOdd => 25,
    }
}

/// 35 when the upper-section sum reaches 63, otherwise 0.
pub fn upper_bonus(upper_sum: u32) -> u32 {
    if upper_sum >= UPPER_BONUS_THRESHOLD {
        UPPER_BONUS
    } else {
        0
    }
}

/// Upper bonus for a set of scored cells; lower-section cells are ignored.
pub fn calculate_upper_bonus<'a, I>(cells: I) -> u32
where
    I: IntoIterator<Item = (&'a Category, &'a u32)>,
{
    let upper_sum = cells
        .into_iter()
        .filter(|(cat, _)| cat.is_upper())
        .map(|(_, score)| *score)
        .sum();
    upper_bonus(upper_sum)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;

    use super::*;

    fn classic() -> Ruleset {
        Ruleset::classic()
    }

    #[test]
    fn upper_categories_count_their_face() {
        let dice = [3, 3, 3, 4, 5];
        assert_eq!(score(Category::Threes, &dice, &classic()), 9);
        assert_eq!(score(Category::Fours, &dice, &classic()), 4);
        assert_eq!(score(Category::Sixes, &dice, &classic()), 0);
    }

    #[test]
    fn of_a_kind_scores_total() {
        assert_eq!(score(Category::ThreeOfAKind, &[2, 2, 2, 5, 6], &classic()), 17);
        assert_eq!(score(Category::FourOfAKind, &[2, 2, 2, 5, 6], &classic()), 0);
        assert_eq!(score(Category::FourOfAKind, &[4, 4, 4, 4, 1], &classic()), 17);
    }

    #[test]
    fn full_house_fixed_or_sum() {
        let dice = [6, 6, 6, 5, 5];
        assert_eq!(score(Category::FullHouse, &dice, &classic()), 25);
        let mut rules = classic();
        rules.full_house = FullHouseRule::DiceSum;
        assert_eq!(score(Category::FullHouse, &dice, &rules), 28);
        assert_eq!(score(Category::FullHouse, &[6, 6, 6, 6, 6], &classic()), 0);
    }

    #[test]
    fn straights_loose_and_strict() {
        let large = [1, 2, 3, 4, 5];
        let small = [1, 2, 3, 4, 6];
        assert_eq!(score(Category::LargeStraight, &large, &classic()), 40);
        assert_eq!(score(Category::SmallStraight, &large, &classic()), 30);
        assert_eq!(score(Category::SmallStraight, &small, &classic()), 30);

        let mut strict = classic();
        strict.straights = StraightRule::Strict;
        assert_eq!(score(Category::SmallStraight, &large, &strict), 0);
        assert_eq!(score(Category::SmallStraight, &small, &strict), 30);
        assert_eq!(score(Category::SmallStraight, &[3, 4, 5, 6, 3], &strict), 30);
    }

    #[test]
    fn specials() {
        assert_eq!(score(Category::TwoPairs, &[2, 2, 5, 5, 1], &classic()), 15);
        assert_eq!(score(Category::TwoPairs, &[2, 2, 2, 2, 1], &classic()), 0);
        assert_eq!(score(Category::AllEven, &[2, 4, 6, 6, 2], &classic()), 20);
        assert_eq!(score(Category::AllOdd, &[1, 3, 5, 5, 2], &classic()), 0);
    }

    #[test]
    fn upper_bonus_ignores_lower_section() {
        let mut cells = BTreeMap::new();
        cells.insert(Category::Fours, 12);
        cells.insert(Category::Fives, 15);
        cells.insert(Category::Sixes, 18);
        cells.insert(Category::Threes, 9);
        cells.insert(Category::Twos, 6);
        cells.insert(Category::Ones, 3);
        assert_eq!(calculate_upper_bonus(&cells), 35);

        cells.insert(Category::Ones, 2);
        cells.insert(Category::Kniffel, 50);
        cells.insert(Category::Chance, 30);
        assert_eq!(calculate_upper_bonus(&cells), 0);
    }

    proptest! {
        #[test]
        fn score_never_negative_and_kniffel_iff_all_same(dice in prop::array::uniform5(1u8..=6)) {
            let rules = classic();
            for cat in STANDARD_CATEGORIES.iter().chain(SPECIAL_CATEGORIES.iter()) {
                let s = score(*cat, &dice, &rules);
                prop_assert!(s <= max_score(*cat, &rules));
            }
            let all_same = dice.iter().all(|d| *d == dice[0]);
            prop_assert_eq!(score(Category::Kniffel, &dice, &rules) == 50, all_same);
        }

        #[test]
        fn upper_bonus_threshold(upper in 0u32..=105) {
            prop_assert_eq!(upper_bonus(upper) == 35, upper >= 63);
        }
    }
}
