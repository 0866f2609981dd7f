//! Ranked results of a finished tournament-style game.

use serde::Serialize;

use crate::domain::engine::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub user_id: UserId,
    /// 1-based; tied entries share a rank.
    pub rank: u32,
    pub score: i64,
}

/// Rank `(user, score)` pairs best-first. Equal scores share a rank and the
/// next rank skips accordingly (1, 1, 3). Input order breaks display ties.
pub fn rank_by_score(entries: &[(UserId, i64)]) -> Vec<Standing> {
    let mut sorted: Vec<(usize, UserId, i64)> = entries
        .iter()
        .enumerate()
        .map(|(i, (u, s))| (i, *u, *s))
        .collect();
    sorted.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

    let mut out = Vec::with_capacity(sorted.len());
    let mut prev: Option<i64> = None;
    let mut rank = 0u32;
    for (pos, (_, user_id, score)) in sorted.into_iter().enumerate() {
        if prev != Some(score) {
            rank = pos as u32 + 1;
            prev = Some(score);
        }
        out.push(Standing {
            user_id,
            rank,
            score,
        });
    }
    out
}

/// Keep the standings of users matching `keep` and close the rank gaps the
/// dropped entries leave. Ties among the kept entries stay tied.
pub fn retain_ranked(standings: &[Standing], keep: impl Fn(UserId) -> bool) -> Vec<Standing> {
    let mut out: Vec<Standing> = Vec::with_capacity(standings.len());
    let mut prev_rank: Option<u32> = None;
    let mut rank = 0u32;
    for (pos, s) in standings.iter().filter(|s| keep(s.user_id)).enumerate() {
        if prev_rank != Some(s.rank) {
            rank = pos as u32 + 1;
            prev_rank = Some(s.rank);
        }
        out.push(Standing { rank, ..s.clone() });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_share_rank_and_skip() {
        let ranked = rank_by_score(&[(1, 10), (2, 30), (3, 30), (4, 5)]);
        let ranks: Vec<(UserId, u32)> = ranked.iter().map(|s| (s.user_id, s.rank)).collect();
        assert_eq!(ranks, vec![(2, 1), (3, 1), (1, 3), (4, 4)]);
    }

    #[test]
    fn retained_standings_close_gaps() {
        let ranked = rank_by_score(&[(1, 50), (2, 30), (3, 30), (4, 5)]);
        let kept = retain_ranked(&ranked, |u| u != 1);
        let ranks: Vec<(UserId, u32)> = kept.iter().map(|s| (s.user_id, s.rank)).collect();
        assert_eq!(ranks, vec![(2, 1), (3, 1), (4, 3)]);
    }

    #[test]
    fn empty_input() {
        assert!(rank_by_score(&[]).is_empty());
    }
}
