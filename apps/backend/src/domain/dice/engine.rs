//! Dice-scoring rule engine.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::ruleset::{MatchMode, Ruleset};
use super::scoring::{
    calculate_upper_bonus, max_score, score, upper_bonus, Category, Dice, SPECIAL_CATEGORIES,
    STANDARD_CATEGORIES, UPPER_BONUS, UPPER_BONUS_THRESHOLD,
};
use crate::domain::engine::{
    check_player_count, wrong_phase, Actor, GameKind, Outcome, Pending, PlayerSeat, RuleEngine,
    UserId,
};
use crate::domain::rng::{GameRng, Seed};
use crate::domain::standings::rank_by_score;
use crate::errors::domain::{DomainError, ValidationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DicePhase {
    Rolling,
    DraftClaim,
    Paused,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiceAction {
    /// `kept` holds die indices (0..5) that stay as they are.
    RollDice { kept: Vec<usize> },
    ChooseCategory { category: Category, column: usize },
    UseJoker { die: usize, delta: i8 },
    StopRolling,
    AutoScore,
    Pause,
    Resume,
    RemovePlayer { user_id: UserId },
}

/// Filled cells per column. A filled cell never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Scoresheet {
    columns: Vec<BTreeMap<Category, u32>>,
}

impl Scoresheet {
    pub fn new(columns: usize) -> Self {
        Self {
            columns: vec![BTreeMap::new(); columns],
        }
    }

    pub fn get(&self, column: usize, category: Category) -> Option<u32> {
        self.columns.get(column)?.get(&category).copied()
    }

    pub fn is_open(&self, column: usize, category: Category) -> bool {
        self.columns
            .get(column)
            .is_some_and(|c| !c.contains_key(&category))
    }

    fn fill(&mut self, column: usize, category: Category, value: u32) -> Result<(), DomainError> {
        let cells = self.columns.get_mut(column).ok_or_else(|| {
            DomainError::validation_other(format!("Column {column} does not exist"))
        })?;
        if cells.contains_key(&category) {
            return Err(DomainError::validation(
                ValidationKind::CategoryFilled,
                "Category already filled",
            ));
        }
        cells.insert(category, value);
        Ok(())
    }

    pub fn filled(&self) -> usize {
        self.columns.iter().map(BTreeMap::len).sum()
    }

    /// Column sum plus the upper bonus, before the multiplier.
    pub fn column_total(&self, column: usize) -> u32 {
        self.columns
            .get(column)
            .map(|cells| cells.values().sum::<u32>() + calculate_upper_bonus(cells))
            .unwrap_or(0)
    }

    pub fn total(&self, multipliers: &[u32]) -> u32 {
        multipliers
            .iter()
            .enumerate()
            .map(|(col, m)| m * self.column_total(col))
            .sum()
    }

    fn upper_sum(&self, column: usize) -> u32 {
        self.columns
            .get(column)
            .map(|cells| {
                cells
                    .iter()
                    .filter(|(c, _)| c.is_upper())
                    .map(|(_, s)| *s)
                    .sum()
            })
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DicePlayer {
    pub user_id: UserId,
    pub display_name: String,
    pub sheet: Scoresheet,
}

#[derive(Debug, Clone)]
pub struct DiceState {
    pub ruleset: Ruleset,
    /// Enabled categories in scoring order.
    pub categories: Vec<Category>,
    pub phase: DicePhase,
    pub players: Vec<DicePlayer>,
    /// Seat index of the roller.
    pub current: usize,
    pub dice: Dice,
    pub rolls_left: u8,
    pub has_rolled: bool,
    pub jokers_left: u8,
    /// Draft mode: players still to claim a cell with the shared dice.
    pub claim_queue: VecDeque<UserId>,
    pub round: u32,
    pub total_rounds: u32,
    pub winner: Option<UserId>,
    rng: GameRng,
}

impl DiceState {
    pub fn seat_of(&self, user_id: UserId) -> Option<usize> {
        self.players.iter().position(|p| p.user_id == user_id)
    }

    pub fn roller(&self) -> Option<UserId> {
        self.players.get(self.current).map(|p| p.user_id)
    }

    /// Player expected to act right now.
    pub fn active_player(&self) -> Option<UserId> {
        match self.phase {
            DicePhase::Rolling => self.roller(),
            DicePhase::DraftClaim => self.claim_queue.front().copied(),
            DicePhase::Paused | DicePhase::Ended => None,
        }
    }

    pub fn total_for(&self, seat: usize) -> u32 {
        self.players
            .get(seat)
            .map(|p| p.sheet.total(&self.ruleset.columns))
            .unwrap_or(0)
    }

    fn roller_id(&self) -> Result<UserId, DomainError> {
        self.roller()
            .ok_or_else(|| DomainError::validation(ValidationKind::NotSeated, "No active roller"))
    }

    fn is_enabled(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    /// Open cells for a seat: columns outer, category order inner.
    fn open_cells(&self, seat: usize) -> Vec<(usize, Category)> {
        let Some(player) = self.players.get(seat) else {
            return Vec::new();
        };
        let mut cells = Vec::new();
        for col in 0..self.ruleset.column_count() {
            for cat in &self.categories {
                if player.sheet.is_open(col, *cat) {
                    cells.push((col, *cat));
                }
            }
        }
        cells
    }

    fn reset_turn(&mut self) {
        self.dice = [0; 5];
        self.rolls_left = self.ruleset.max_rolls;
        self.has_rolled = false;
        self.jokers_left = self.ruleset.joker_uses();
        self.claim_queue.clear();
    }

    fn open_draft(&mut self) {
        let n = self.players.len();
        self.claim_queue = (0..n)
            .map(|i| self.players[(self.current + i) % n].user_id)
            .collect();
        self.rolls_left = 0;
        self.phase = DicePhase::DraftClaim;
    }

    /// Claimant for a scoring action, opening the draft when the roller
    /// scores first in draft mode.
    fn claimant(&mut self, actor: Actor) -> Result<UserId, DomainError> {
        match self.phase {
            DicePhase::Rolling => {
                let roller = self.roller_id()?;
                actor.ensure_turn(roller)?;
                if !self.has_rolled {
                    return Err(DomainError::validation(
                        ValidationKind::MustRollFirst,
                        "Roll the dice before scoring",
                    ));
                }
                if self.ruleset.match_mode == MatchMode::Draft {
                    self.open_draft();
                }
                Ok(roller)
            }
            DicePhase::DraftClaim => {
                let front = self.claim_queue.front().copied().ok_or_else(|| {
                    DomainError::validation(ValidationKind::NotSeated, "Nobody left to claim")
                })?;
                actor.ensure_turn(front)?;
                Ok(front)
            }
            other => Err(wrong_phase(&other, "score")),
        }
    }

    fn score_cell(
        &mut self,
        seat: usize,
        column: usize,
        category: Category,
        voluntary: bool,
    ) -> Result<(), DomainError> {
        if column >= self.ruleset.column_count() {
            return Err(DomainError::validation_other(format!(
                "Column {column} does not exist"
            )));
        }
        if !self.is_enabled(category) {
            return Err(DomainError::validation(
                ValidationKind::CategoryDisabled,
                format!("{category:?} is disabled in this game"),
            ));
        }
        if !self.players[seat].sheet.is_open(column, category) {
            return Err(DomainError::validation(
                ValidationKind::CategoryFilled,
                "Category already filled",
            ));
        }
        let value = score(category, &self.dice, &self.ruleset);
        if voluntary && value == 0 && !self.ruleset.allow_scratch {
            let better = self
                .open_cells(seat)
                .into_iter()
                .any(|(_, cat)| score(cat, &self.dice, &self.ruleset) > 0);
            if better {
                return Err(DomainError::validation(
                    ValidationKind::ScratchNotAllowed,
                    "Scratching is not allowed while another category scores",
                ));
            }
        }
        self.players[seat].sheet.fill(column, category, value)
    }

    fn best_cell(&self, seat: usize) -> Option<(usize, Category)> {
        let mut best: Option<((usize, Category), u32)> = None;
        for cell in self.open_cells(seat) {
            let value = score(cell.1, &self.dice, &self.ruleset);
            if best.is_none_or(|(_, b)| value > b) {
                best = Some((cell, value));
            }
        }
        best.map(|(cell, _)| cell)
    }

    fn after_score(&mut self) {
        self.recompute_round();
        if self.phase == DicePhase::DraftClaim {
            self.claim_queue.pop_front();
            if !self.claim_queue.is_empty() {
                return;
            }
        }
        self.end_turn();
    }

    fn recompute_round(&mut self) {
        let min_filled = self
            .players
            .iter()
            .map(|p| p.sheet.filled())
            .min()
            .unwrap_or(0) as u32;
        self.round = (min_filled + 1).min(self.total_rounds);
    }

    fn end_turn(&mut self) {
        if self.is_complete() || self.duel_decided() {
            self.finish();
            return;
        }
        let n = self.players.len();
        self.current = (self.current + 1) % n;
        self.reset_turn();
        self.phase = DicePhase::Rolling;
    }

    fn is_complete(&self) -> bool {
        self.players
            .iter()
            .all(|p| p.sheet.filled() as u32 >= self.total_rounds)
    }

    /// Most points a seat can still add: every open cell at its maximum,
    /// plus each column's upper bonus that is still reachable.
    fn max_remaining(&self, seat: usize) -> u32 {
        let player = &self.players[seat];
        let mut remaining = 0;
        for (col, mult) in self.ruleset.columns.iter().enumerate() {
            let mut open_upper = 0;
            let mut gain = 0;
            for cat in &self.categories {
                if player.sheet.is_open(col, *cat) {
                    let m = max_score(*cat, &self.ruleset);
                    gain += m;
                    if cat.is_upper() {
                        open_upper += m;
                    }
                }
            }
            let upper = player.sheet.upper_sum(col);
            if upper < UPPER_BONUS_THRESHOLD && upper + open_upper >= UPPER_BONUS_THRESHOLD {
                gain += UPPER_BONUS;
            }
            remaining += mult * gain;
        }
        remaining
    }

    fn duel_decided(&self) -> bool {
        if self.ruleset.match_mode != MatchMode::Duel || self.players.len() != 2 {
            return false;
        }
        let (a, b) = (self.total_for(0), self.total_for(1));
        let (trailer, lead, trail) = if a >= b { (1, a, b) } else { (0, b, a) };
        trail + self.max_remaining(trailer) < lead
    }

    fn finish(&mut self) {
        self.phase = DicePhase::Ended;
        self.claim_queue.clear();
        let mut winner: Option<(UserId, u32)> = None;
        for (seat, p) in self.players.iter().enumerate() {
            let total = self.total_for(seat);
            if winner.is_none_or(|(_, best)| total > best) {
                winner = Some((p.user_id, total));
            }
        }
        self.winner = winner.map(|(id, _)| id);
    }

    fn remove(&mut self, user_id: UserId) -> Result<(), DomainError> {
        let seat = self.seat_of(user_id).ok_or_else(|| {
            DomainError::validation(ValidationKind::NotSeated, "Player is not seated")
        })?;
        self.players.remove(seat);
        self.claim_queue.retain(|id| *id != user_id);

        if self.players.len() <= 1 {
            self.finish();
            return Ok(());
        }
        let n = self.players.len();
        match self.phase {
            DicePhase::Rolling | DicePhase::Paused => {
                if seat < self.current {
                    self.current -= 1;
                } else if seat == self.current {
                    self.current %= n;
                    self.reset_turn();
                }
            }
            DicePhase::DraftClaim => {
                if seat < self.current {
                    self.current -= 1;
                } else if seat == self.current {
                    // end_turn advances by one; land on the player after the leaver.
                    self.current = (seat + n - 1) % n;
                }
                if self.claim_queue.is_empty() {
                    self.end_turn();
                }
            }
            DicePhase::Ended => {}
        }
        self.recompute_round();
        Ok(())
    }
}

pub struct DiceEngine;

impl RuleEngine for DiceEngine {
    type State = DiceState;
    type Action = DiceAction;
    type Settings = Ruleset;

    fn initialize(
        players: &[PlayerSeat],
        ruleset: &Ruleset,
        seed: Seed,
    ) -> Result<DiceState, DomainError> {
        check_player_count(GameKind::Dice, players)?;
        if ruleset.match_mode == MatchMode::Duel && players.len() != 2 {
            return Err(DomainError::validation(
                ValidationKind::InvalidPlayerCount,
                "Duel mode needs exactly two players",
            ));
        }

        let mut rng = GameRng::from_seed(seed);
        let categories = pick_categories(ruleset, &mut rng);
        let total_rounds = (categories.len() * ruleset.column_count()) as u32;

        Ok(DiceState {
            ruleset: ruleset.clone(),
            categories,
            phase: DicePhase::Rolling,
            players: players
                .iter()
                .map(|p| DicePlayer {
                    user_id: p.user_id,
                    display_name: p.display_name.clone(),
                    sheet: Scoresheet::new(ruleset.column_count()),
                })
                .collect(),
            current: 0,
            dice: [0; 5],
            rolls_left: ruleset.max_rolls,
            has_rolled: false,
            jokers_left: ruleset.joker_uses(),
            claim_queue: VecDeque::new(),
            round: 1,
            total_rounds,
            winner: None,
            rng,
        })
    }

    fn apply(state: &DiceState, action: DiceAction, actor: Actor) -> Result<DiceState, DomainError> {
        let mut next = state.clone();
        match action {
            DiceAction::RollDice { kept } => {
                if next.phase != DicePhase::Rolling {
                    return Err(wrong_phase(&next.phase, "roll"));
                }
                actor.ensure_turn(next.roller_id()?)?;
                let mut seen = [false; 5];
                for &i in &kept {
                    if i >= 5 || seen[i] {
                        return Err(DomainError::validation(
                            ValidationKind::InvalidDice,
                            "Kept dice must be distinct indices 0-4",
                        ));
                    }
                    seen[i] = true;
                }
                if !next.has_rolled && !kept.is_empty() {
                    return Err(DomainError::validation(
                        ValidationKind::MustRollFirst,
                        "Cannot keep dice before the first roll",
                    ));
                }
                if next.rolls_left == 0 {
                    return Err(DomainError::validation(
                        ValidationKind::NoRollsLeft,
                        "No rolls left this turn",
                    ));
                }
                for (i, keep) in seen.iter().enumerate() {
                    if !keep {
                        next.dice[i] = next.rng.die();
                    }
                }
                next.rolls_left -= 1;
                next.has_rolled = true;
                if next.rolls_left == 0 && next.ruleset.match_mode == MatchMode::Draft {
                    next.open_draft();
                }
            }
            DiceAction::ChooseCategory { category, column } => {
                let claimant = next.claimant(actor)?;
                let seat = next.seat_of(claimant).ok_or_else(|| {
                    DomainError::validation(ValidationKind::NotSeated, "Player is not seated")
                })?;
                next.score_cell(seat, column, category, true)?;
                next.after_score();
            }
            DiceAction::AutoScore => {
                actor.ensure_system()?;
                let claimant = next.claimant(actor)?;
                let seat = next.seat_of(claimant).ok_or_else(|| {
                    DomainError::validation(ValidationKind::NotSeated, "Player is not seated")
                })?;
                let (column, category) = next.best_cell(seat).ok_or_else(|| {
                    DomainError::validation(ValidationKind::CategoryFilled, "No open cells left")
                })?;
                next.score_cell(seat, column, category, false)?;
                next.after_score();
            }
            DiceAction::UseJoker { die, delta } => {
                if next.phase != DicePhase::Rolling {
                    return Err(wrong_phase(&next.phase, "use a joker"));
                }
                actor.ensure_turn(next.roller_id()?)?;
                if die >= 5 || !(delta == 1 || delta == -1) {
                    return Err(DomainError::validation(
                        ValidationKind::InvalidDice,
                        "A joker moves one die (0-4) by +1 or -1",
                    ));
                }
                if next.ruleset.jokers.is_none() || next.jokers_left == 0 {
                    return Err(DomainError::validation(
                        ValidationKind::NoJokersLeft,
                        "No jokers left this turn",
                    ));
                }
                if !next.has_rolled {
                    return Err(DomainError::validation(
                        ValidationKind::MustRollFirst,
                        "Roll the dice before using a joker",
                    ));
                }
                let face = next.dice[die] as i8 + delta;
                if !(1..=6).contains(&face) {
                    return Err(DomainError::validation(
                        ValidationKind::InvalidDice,
                        "Die face must stay between 1 and 6",
                    ));
                }
                next.dice[die] = face as u8;
                next.jokers_left -= 1;
            }
            DiceAction::StopRolling => {
                if next.phase != DicePhase::Rolling {
                    return Err(wrong_phase(&next.phase, "stop rolling"));
                }
                actor.ensure_turn(next.roller_id()?)?;
                if next.ruleset.match_mode != MatchMode::Draft {
                    return Err(DomainError::validation(
                        ValidationKind::UnsupportedAction,
                        "Stop rolling only exists in draft mode",
                    ));
                }
                if !next.has_rolled {
                    return Err(DomainError::validation(
                        ValidationKind::MustRollFirst,
                        "Roll the dice before stopping",
                    ));
                }
                next.open_draft();
            }
            DiceAction::Pause => {
                actor.ensure_system()?;
                if next.phase != DicePhase::Rolling {
                    return Err(wrong_phase(&next.phase, "pause"));
                }
                next.phase = DicePhase::Paused;
            }
            DiceAction::Resume => {
                actor.ensure_system()?;
                if next.phase != DicePhase::Paused {
                    return Err(wrong_phase(&next.phase, "resume"));
                }
                next.phase = DicePhase::Rolling;
            }
            DiceAction::RemovePlayer { user_id } => {
                actor.ensure_system()?;
                if next.phase == DicePhase::Ended {
                    return Err(wrong_phase(&next.phase, "remove a player"));
                }
                next.remove(user_id)?;
            }
        }
        Ok(next)
    }

    fn remove_player(user_id: UserId) -> DiceAction {
        DiceAction::RemovePlayer { user_id }
    }

    fn outcome(state: &DiceState) -> Option<Outcome> {
        if state.phase != DicePhase::Ended {
            return None;
        }
        let totals: Vec<(UserId, i64)> = state
            .players
            .iter()
            .enumerate()
            .map(|(seat, p)| (p.user_id, state.total_for(seat) as i64))
            .collect();
        Some(Outcome::Finished {
            winner: state.winner,
            standings: rank_by_score(&totals),
        })
    }

    fn pending(state: &DiceState) -> Pending {
        match state.active_player() {
            Some(user) => Pending::Turn(user),
            None => Pending::Idle,
        }
    }

    fn on_timer(state: &DiceState) -> Vec<DiceAction> {
        match state.phase {
            DicePhase::Rolling if !state.has_rolled => vec![
                DiceAction::RollDice { kept: Vec::new() },
                DiceAction::AutoScore,
            ],
            DicePhase::Rolling | DicePhase::DraftClaim => vec![DiceAction::AutoScore],
            DicePhase::Paused | DicePhase::Ended => Vec::new(),
        }
    }
}

/// Enabled categories: the standard thirteen, with the randomizer swapping
/// some lower-section ones for specials.
fn pick_categories(ruleset: &Ruleset, rng: &mut GameRng) -> Vec<Category> {
    let Some(randomizer) = ruleset.randomizer else {
        return STANDARD_CATEGORIES.to_vec();
    };
    let swaps = randomizer.swaps as usize;

    let mut lower: Vec<Category> = STANDARD_CATEGORIES
        .iter()
        .copied()
        .filter(|c| !c.is_upper())
        .collect();
    rng.shuffle(&mut lower);
    let disabled: Vec<Category> = lower.into_iter().take(swaps).collect();

    let mut specials = SPECIAL_CATEGORIES.to_vec();
    rng.shuffle(&mut specials);
    let added: Vec<Category> = specials.into_iter().take(swaps).collect();

    let mut categories: Vec<Category> = STANDARD_CATEGORIES
        .iter()
        .copied()
        .filter(|c| !disabled.contains(c))
        .chain(added)
        .collect();
    categories.sort();
    categories
}

/// Snapshot sent to every room member.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceView {
    pub phase: DicePhase,
    pub ruleset: Ruleset,
    pub categories: Vec<Category>,
    pub players: Vec<DicePlayerView>,
    pub current_player: Option<UserId>,
    pub dice: Dice,
    pub rolls_left: u8,
    pub has_rolled: bool,
    pub jokers_left: u8,
    pub claim_queue: Vec<UserId>,
    pub round: u32,
    pub total_rounds: u32,
    pub winner: Option<UserId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DicePlayerView {
    pub user_id: UserId,
    pub display_name: String,
    pub sheet: Scoresheet,
    pub upper_bonus: Vec<u32>,
    pub total: u32,
}

impl DiceState {
    pub fn view(&self) -> DiceView {
        DiceView {
            phase: self.phase,
            ruleset: self.ruleset.clone(),
            categories: self.categories.clone(),
            players: self
                .players
                .iter()
                .enumerate()
                .map(|(seat, p)| DicePlayerView {
                    user_id: p.user_id,
                    display_name: p.display_name.clone(),
                    sheet: p.sheet.clone(),
                    upper_bonus: (0..self.ruleset.column_count())
                        .map(|col| upper_bonus(p.sheet.upper_sum(col)))
                        .collect(),
                    total: self.total_for(seat),
                })
                .collect(),
            current_player: self.active_player(),
            dice: self.dice,
            rolls_left: self.rolls_left,
            has_rolled: self.has_rolled,
            jokers_left: self.jokers_left,
            claim_queue: self.claim_queue.iter().copied().collect(),
            round: self.round,
            total_rounds: self.total_rounds,
            winner: self.winner,
        }
    }

    /// Test hook: set the dice directly after a roll.
    #[cfg(test)]
    pub(crate) fn force_dice(&mut self, dice: Dice) {
        self.dice = dice;
    }
}
