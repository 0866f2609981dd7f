//! Main and side pots from per-seat contributions, and their distribution.

use serde::Serialize;

use super::hand_eval::HandValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    pub seat: usize,
    pub amount: i64,
    pub folded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pot {
    pub amount: i64,
    /// Seats that may win this pot, ascending.
    pub eligible: Vec<usize>,
}

/// Partition contributions into pots by the contribution tiers of players
/// still in the hand. Money from folded players above the top live tier goes
/// to the last pot. Adjacent tiers with the same eligible set are merged.
///
/// `Σ pot.amount == Σ contribution.amount` always holds.
pub fn calculate_pots(contributions: &[Contribution]) -> Vec<Pot> {
    let mut levels: Vec<i64> = contributions
        .iter()
        .filter(|c| !c.folded && c.amount > 0)
        .map(|c| c.amount)
        .collect();
    levels.sort_unstable();
    levels.dedup();

    let total: i64 = contributions.iter().map(|c| c.amount).sum();
    if levels.is_empty() {
        return if total > 0 {
            vec![Pot {
                amount: total,
                eligible: Vec::new(),
            }]
        } else {
            Vec::new()
        };
    }

    let mut pots: Vec<Pot> = Vec::new();
    let mut prev = 0i64;
    for level in levels {
        let amount: i64 = contributions
            .iter()
            .map(|c| c.amount.min(level) - c.amount.min(prev))
            .sum();
        let mut eligible: Vec<usize> = contributions
            .iter()
            .filter(|c| !c.folded && c.amount >= level)
            .map(|c| c.seat)
            .collect();
        eligible.sort_unstable();
        match pots.last_mut() {
            Some(last) if last.eligible == eligible => last.amount += amount,
            _ => pots.push(Pot { amount, eligible }),
        }
        prev = level;
    }

    let above: i64 = contributions
        .iter()
        .map(|c| (c.amount - prev).max(0))
        .sum();
    if above > 0 {
        if let Some(last) = pots.last_mut() {
            last.amount += above;
        }
    }
    pots
}

/// Share every pot among its best hands. Odd chips go one at a time to the
/// winners nearest the dealer's left. Returns `(seat, amount)` per winner.
pub fn distribute(
    pots: &[Pot],
    hands: &[(usize, HandValue)],
    dealer: usize,
    seat_count: usize,
) -> Vec<(usize, i64)> {
    let mut payouts: Vec<(usize, i64)> = Vec::new();
    let mut credit = |seat: usize, amount: i64| {
        if let Some(entry) = payouts.iter_mut().find(|(s, _)| *s == seat) {
            entry.1 += amount;
        } else {
            payouts.push((seat, amount));
        }
    };

    for pot in pots {
        let contenders: Vec<&(usize, HandValue)> = hands
            .iter()
            .filter(|(seat, _)| pot.eligible.contains(seat))
            .collect();
        let Some(best) = contenders.iter().map(|(_, v)| v).max() else {
            continue;
        };
        let mut winners: Vec<usize> = contenders
            .iter()
            .filter(|(_, v)| v == best)
            .map(|(seat, _)| *seat)
            .collect();
        // Clockwise from the dealer's left.
        let n = seat_count.max(1);
        let start = (dealer + 1) % n;
        winners.sort_by_key(|seat| (seat + n - start) % n);

        let share = pot.amount / winners.len() as i64;
        let mut odd = pot.amount % winners.len() as i64;
        for seat in winners {
            let extra = if odd > 0 {
                odd -= 1;
                1
            } else {
                0
            };
            credit(seat, share + extra);
        }
    }
    payouts
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::domain::cards::cards;
    use crate::domain::poker::hand_eval::evaluate_best;

    fn c(seat: usize, amount: i64, folded: bool) -> Contribution {
        Contribution {
            seat,
            amount,
            folded,
        }
    }

    #[test]
    fn all_in_player_only_contests_what_they_matched() {
        let pots = calculate_pots(&[c(0, 50, false), c(1, 200, false), c(2, 200, false)]);
        assert_eq!(
            pots,
            vec![
                Pot {
                    amount: 150,
                    eligible: vec![0, 1, 2]
                },
                Pot {
                    amount: 300,
                    eligible: vec![1, 2]
                },
            ]
        );
    }

    #[test]
    fn folded_money_stays_in_play() {
        let pots = calculate_pots(&[c(0, 100, true), c(1, 40, false), c(2, 60, false)]);
        let total: i64 = pots.iter().map(|p| p.amount).sum();
        assert_eq!(total, 200);
        assert_eq!(pots[0].eligible, vec![1, 2]);
        assert_eq!(pots.last().unwrap().eligible, vec![2]);
    }

    #[test]
    fn split_pot_odd_chip_goes_left_of_dealer() {
        let pots = vec![Pot {
            amount: 101,
            eligible: vec![0, 2],
        }];
        let same = evaluate_best(&cards("AS KS QD JC 9H")).unwrap();
        let hands = vec![(0, same.clone()), (2, same)];
        // Dealer at 1: seat 2 is first to the left.
        let paid = distribute(&pots, &hands, 1, 3);
        assert!(paid.contains(&(2, 51)));
        assert!(paid.contains(&(0, 50)));
    }

    proptest! {
        #[test]
        fn pots_conserve_chips(amounts in prop::collection::vec((0i64..500, any::<bool>()), 2..7)) {
            let contributions: Vec<Contribution> = amounts
                .iter()
                .enumerate()
                .map(|(seat, (amount, folded))| c(seat, *amount, *folded))
                .collect();
            let total: i64 = contributions.iter().map(|c| c.amount).sum();
            let pots = calculate_pots(&contributions);
            prop_assert_eq!(pots.iter().map(|p| p.amount).sum::<i64>(), total);

            let hand = evaluate_best(&cards("2C 3D 5H 8S JC")).unwrap();
            let hands: Vec<(usize, HandValue)> = contributions
                .iter()
                .filter(|c| !c.folded)
                .map(|c| (c.seat, hand.clone()))
                .collect();
            if !hands.is_empty() && pots.iter().all(|p| !p.eligible.is_empty()) {
                let paid: i64 = distribute(&pots, &hands, 0, contributions.len())
                    .iter()
                    .map(|(_, a)| a)
                    .sum();
                prop_assert_eq!(paid, total);
            }
        }
    }
}
