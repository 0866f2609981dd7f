use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use super::reconciliation::{QueuedJob, ReconciliationQueue};
use crate::db::txn::with_txn;
use crate::domain::engine::UserId;
use crate::domain::payouts::split_pot;
use crate::domain::standings::{retain_ranked, Standing};
use crate::entities::escrows::EscrowStatus;
use crate::entities::ledger_entries::LedgerKind;
use crate::errors::domain::{ConflictKind, DomainError, ValidationKind};
use crate::repos::{escrows, ledger, settlements, wallets};
use crate::ws::hub::Notifier;
use crate::ws::protocol::ServerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `failed`-th consecutive failure (0-based), doubling up
    /// to `max_backoff`.
    pub fn backoff(&self, failed: u32) -> Duration {
        let factor = 1u32.checked_shl(failed).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// A unit of money movement that can be retried as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementJob {
    Tournament {
        room_id: String,
        hand_number: i32,
        standings: Vec<Standing>,
        ratios: Vec<u32>,
    },
    House {
        room_id: String,
        hand_number: i32,
        payouts: Vec<(UserId, i64)>,
    },
    Refund {
        room_id: String,
        user_id: UserId,
    },
    Forfeit {
        room_id: String,
        user_id: UserId,
    },
}

impl SettlementJob {
    pub fn room_id(&self) -> &str {
        match self {
            SettlementJob::Tournament { room_id, .. }
            | SettlementJob::House { room_id, .. }
            | SettlementJob::Refund { room_id, .. }
            | SettlementJob::Forfeit { room_id, .. } => room_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SettlementReport {
    pub hand_number: i32,
    pub pot: i64,
    /// Net amounts credited, per user.
    pub payouts: Vec<(UserId, i64)>,
}

/// How a job ended after its inline retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Settled(SettlementReport),
    /// Refund or forfeit applied (or nothing was left to apply).
    Done,
    /// An earlier run already paid this hand out.
    AlreadySettled,
    /// Still failing; parked in the reconciliation queue.
    Queued,
    /// Failed in a way retrying cannot fix.
    Dropped,
}

fn is_retryable(err: &DomainError) -> bool {
    matches!(
        err,
        DomainError::Infra(..) | DomainError::Conflict(ConflictKind::EscrowState, _)
    )
}

fn is_already_settled(err: &DomainError) -> bool {
    matches!(err, DomainError::Conflict(ConflictKind::AlreadySettled, _))
}

fn positive(amount: i64) -> Result<(), DomainError> {
    if amount <= 0 {
        return Err(DomainError::validation(
            ValidationKind::InvalidAmount,
            format!("Amount must be positive, got {amount}"),
        ));
    }
    Ok(())
}

fn hand_reference(room_id: &str, hand_number: i32) -> String {
    format!("room:{room_id}:hand:{hand_number}")
}

/// Couples room outcomes to the escrow ledger.
pub struct SettlementCoordinator {
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    queue: ReconciliationQueue,
}

impl SettlementCoordinator {
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_retry(db, notifier, RetryPolicy::default())
    }

    pub fn with_retry(db: DatabaseConnection, notifier: Arc<dyn Notifier>, retry: RetryPolicy) -> Self {
        Self {
            db,
            notifier,
            retry,
            queue: ReconciliationQueue::new(),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn pending_reconciliation(&self) -> usize {
        self.queue.len()
    }

    pub async fn balance(&self, user_id: UserId) -> Result<i64, DomainError> {
        Ok(wallets::require_wallet(&self.db, user_id).await?.balance)
    }

    fn push_balances(&self, balances: &[(UserId, i64)]) {
        for (user_id, balance) in balances {
            self.notifier
                .to_user(*user_id, &ServerEvent::WalletBalance { balance: *balance });
        }
    }

    /// Escrow the room stake for `user_id` unless an open escrow already
    /// exists. Returns whether money moved.
    pub async fn ensure_stake(&self, room_id: &str, user_id: UserId, amount: i64) -> Result<bool, DomainError> {
        positive(amount)?;
        let room = room_id.to_string();
        let balance = with_txn(&self.db, move |txn| {
            Box::pin(async move {
                if escrows::find_active(txn, &room, user_id).await?.is_some() {
                    return Ok(None);
                }
                let balance = wallets::debit(txn, user_id, amount).await?;
                let escrow = escrows::create_escrow(txn, &room, user_id, amount).await?;
                ledger::record(
                    txn,
                    user_id,
                    &room,
                    -amount,
                    LedgerKind::Stake,
                    &format!("escrow:{}", escrow.id),
                )
                .await?;
                Ok(Some(balance))
            })
        })
        .await?;

        match balance {
            Some(balance) => {
                info!(room_id, user_id, amount, "stake escrowed");
                self.push_balances(&[(user_id, balance)]);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Add `delta` to the user's open escrow in the room, opening one if
    /// needed. Returns the new wallet balance.
    pub async fn top_up(&self, room_id: &str, user_id: UserId, delta: i64) -> Result<i64, DomainError> {
        positive(delta)?;
        let room = room_id.to_string();
        let balance = with_txn(&self.db, move |txn| {
            Box::pin(async move {
                let balance = wallets::debit(txn, user_id, delta).await?;
                let escrow_id = match escrows::find_active(txn, &room, user_id).await? {
                    Some(escrow) => {
                        escrows::add_amount(txn, escrow.id, delta).await?;
                        escrow.id
                    }
                    None => escrows::create_escrow(txn, &room, user_id, delta).await?.id,
                };
                ledger::record(
                    txn,
                    user_id,
                    &room,
                    -delta,
                    LedgerKind::Stake,
                    &format!("escrow:{escrow_id}"),
                )
                .await?;
                Ok(balance)
            })
        })
        .await?;
        self.push_balances(&[(user_id, balance)]);
        Ok(balance)
    }

    /// PENDING -> LOCKED for every open escrow in the room.
    pub async fn lock_room(&self, room_id: &str) -> Result<usize, DomainError> {
        let room = room_id.to_string();
        let locked = with_txn(&self.db, move |txn| {
            Box::pin(async move {
                let mut locked = 0;
                for escrow in escrows::list_active_for_room(txn, &room).await? {
                    if escrow.status == EscrowStatus::Pending {
                        escrows::transition(txn, &escrow, EscrowStatus::Locked).await?;
                        locked += 1;
                    }
                }
                Ok(locked)
            })
        })
        .await?;
        info!(room_id, locked, "room escrows locked");
        Ok(locked)
    }

    /// Return the user's open escrow to their wallet. `None` when there was
    /// nothing open.
    pub async fn refund(&self, room_id: &str, user_id: UserId) -> Result<Option<i64>, DomainError> {
        let room = room_id.to_string();
        let refunded = with_txn(&self.db, move |txn| {
            Box::pin(async move {
                let Some(escrow) = escrows::find_active(txn, &room, user_id).await? else {
                    return Ok(None);
                };
                escrows::transition(txn, &escrow, EscrowStatus::Released).await?;
                if escrow.amount == 0 {
                    return Ok(Some((0, None)));
                }
                let balance = wallets::credit(txn, user_id, escrow.amount).await?;
                ledger::record(
                    txn,
                    user_id,
                    &room,
                    escrow.amount,
                    LedgerKind::Refund,
                    &format!("escrow:{}", escrow.id),
                )
                .await?;
                Ok(Some((escrow.amount, Some(balance))))
            })
        })
        .await?;

        Ok(refunded.map(|(amount, balance)| {
            info!(room_id, user_id, amount, "escrow refunded");
            if let Some(balance) = balance {
                self.push_balances(&[(user_id, balance)]);
            }
            amount
        }))
    }

    /// The user's open escrow goes to the house. Returns the forfeited amount.
    pub async fn forfeit(&self, room_id: &str, user_id: UserId) -> Result<Option<i64>, DomainError> {
        let room = room_id.to_string();
        let forfeited = with_txn(&self.db, move |txn| {
            Box::pin(async move {
                let Some(escrow) = escrows::find_active(txn, &room, user_id).await? else {
                    return Ok(None);
                };
                escrows::transition(txn, &escrow, EscrowStatus::Forfeited).await?;
                ledger::record(
                    txn,
                    user_id,
                    &room,
                    0,
                    LedgerKind::Forfeit,
                    &format!("escrow:{}:amount:{}", escrow.id, escrow.amount),
                )
                .await?;
                Ok(Some(escrow.amount))
            })
        })
        .await?;
        if let Some(amount) = forfeited {
            warn!(room_id, user_id, amount, "escrow forfeited");
        }
        Ok(forfeited)
    }

    /// Refund every open escrow in the room.
    pub async fn refund_room(&self, room_id: &str) -> Result<usize, DomainError> {
        let open = escrows::list_active_for_room(&self.db, room_id).await?;
        let mut refunded = 0;
        for escrow in open {
            if self.refund(room_id, escrow.user_id).await?.is_some() {
                refunded += 1;
            }
        }
        Ok(refunded)
    }

    /// Pay the LOCKED pot out by `standings` and `ratios`. Players who never
    /// had a locked stake are skipped and the ranks close up behind them.
    pub async fn settle_tournament(
        &self,
        room_id: &str,
        hand_number: i32,
        standings: &[Standing],
        ratios: &[u32],
    ) -> Result<SettlementReport, DomainError> {
        let room = room_id.to_string();
        let standings = standings.to_vec();
        let ratios = ratios.to_vec();
        let (report, balances) = with_txn(&self.db, move |txn| {
            Box::pin(async move {
                let locked: Vec<_> = escrows::list_active_for_room(txn, &room)
                    .await?
                    .into_iter()
                    .filter(|e| e.status == EscrowStatus::Locked)
                    .collect();
                let pot: i64 = locked.iter().map(|e| e.amount).sum();
                settlements::claim(txn, &room, hand_number, pot).await?;

                let staked: HashSet<UserId> = locked.iter().map(|e| e.user_id).collect();
                let eligible = retain_ranked(&standings, |user| staked.contains(&user));
                let payouts = split_pot(pot, &eligible, &ratios);

                for escrow in &locked {
                    escrows::transition(txn, escrow, EscrowStatus::Released).await?;
                }
                let reference = hand_reference(&room, hand_number);
                let mut balances = Vec::with_capacity(payouts.len());
                for (user_id, amount) in &payouts {
                    let balance = wallets::credit(txn, *user_id, *amount).await?;
                    ledger::record(txn, *user_id, &room, *amount, LedgerKind::Payout, &reference)
                        .await?;
                    balances.push((*user_id, balance));
                }
                Ok((
                    SettlementReport {
                        hand_number,
                        pot,
                        payouts,
                    },
                    balances,
                ))
            })
        })
        .await?;

        info!(room_id, hand_number, pot = report.pot, winners = report.payouts.len(), "tournament settled");
        self.push_balances(&balances);
        Ok(report)
    }

    /// Close a house round: every open escrow in the room is released and
    /// the engine's gross payouts are credited.
    pub async fn settle_house(
        &self,
        room_id: &str,
        hand_number: i32,
        payouts: &[(UserId, i64)],
    ) -> Result<SettlementReport, DomainError> {
        let room = room_id.to_string();
        let payouts = payouts.to_vec();
        let (report, balances) = with_txn(&self.db, move |txn| {
            Box::pin(async move {
                let open = escrows::list_active_for_room(txn, &room).await?;
                let pot: i64 = open.iter().map(|e| e.amount).sum();
                settlements::claim(txn, &room, hand_number, pot).await?;

                for escrow in &open {
                    escrows::transition(txn, escrow, EscrowStatus::Released).await?;
                }
                let reference = hand_reference(&room, hand_number);
                let mut credited = Vec::new();
                let mut balances = Vec::new();
                for (user_id, amount) in payouts.into_iter().filter(|(_, a)| *a > 0) {
                    if !open.iter().any(|e| e.user_id == user_id) {
                        warn!(room_id = %room, user_id, amount, "payout without escrow skipped");
                        continue;
                    }
                    let balance = wallets::credit(txn, user_id, amount).await?;
                    ledger::record(txn, user_id, &room, amount, LedgerKind::Payout, &reference)
                        .await?;
                    credited.push((user_id, amount));
                    balances.push((user_id, balance));
                }
                Ok((
                    SettlementReport {
                        hand_number,
                        pot,
                        payouts: credited,
                    },
                    balances,
                ))
            })
        })
        .await?;

        info!(room_id, hand_number, pot = report.pot, "house round settled");
        self.push_balances(&balances);
        Ok(report)
    }

    /// Refund open escrows whose room is not in `live_rooms`. Run at startup
    /// with an empty set to unwind anything a crash left behind.
    pub async fn refund_orphans(&self, live_rooms: &HashSet<String>) -> Result<usize, DomainError> {
        let open = escrows::list_all_active(&self.db).await?;
        let mut refunded = 0;
        for escrow in open.into_iter().filter(|e| !live_rooms.contains(&e.room_id)) {
            match self.refund(&escrow.room_id, escrow.user_id).await {
                Ok(Some(_)) => refunded += 1,
                Ok(None) => {}
                Err(err) => {
                    error!(room_id = %escrow.room_id, user_id = escrow.user_id, error = %err, "orphan refund failed");
                }
            }
        }
        if refunded > 0 {
            warn!(refunded, "orphaned escrows refunded");
        }
        Ok(refunded)
    }

    /// One attempt at a job.
    pub async fn run(&self, job: &SettlementJob) -> Result<JobOutcome, DomainError> {
        Ok(match job {
            SettlementJob::Tournament {
                room_id,
                hand_number,
                standings,
                ratios,
            } => JobOutcome::Settled(
                self.settle_tournament(room_id, *hand_number, standings, ratios)
                    .await?,
            ),
            SettlementJob::House {
                room_id,
                hand_number,
                payouts,
            } => JobOutcome::Settled(self.settle_house(room_id, *hand_number, payouts).await?),
            SettlementJob::Refund { room_id, user_id } => {
                self.refund(room_id, *user_id).await?;
                JobOutcome::Done
            }
            SettlementJob::Forfeit { room_id, user_id } => {
                self.forfeit(room_id, *user_id).await?;
                JobOutcome::Done
            }
        })
    }

    /// Run a job with exponential backoff. A job that keeps failing for
    /// transient reasons goes to the reconciliation queue; the game outcome
    /// that produced it stands either way.
    pub async fn run_with_retry(&self, job: SettlementJob) -> JobOutcome {
        let mut failures = 0u32;
        loop {
            match self.run(&job).await {
                Ok(outcome) => return outcome,
                Err(err) if is_already_settled(&err) => {
                    info!(room_id = job.room_id(), "settlement already applied");
                    return JobOutcome::AlreadySettled;
                }
                Err(err) if !is_retryable(&err) => {
                    error!(room_id = job.room_id(), error = %err, ?job, "settlement rejected");
                    return JobOutcome::Dropped;
                }
                Err(err) => {
                    failures += 1;
                    if failures >= self.retry.attempts {
                        error!(room_id = job.room_id(), error = %err, failures, "settlement queued for reconciliation");
                        self.queue.push(QueuedJob { job, failures });
                        return JobOutcome::Queued;
                    }
                    let delay = self.retry.backoff(failures - 1);
                    warn!(room_id = job.room_id(), error = %err, failures, delay_ms = delay.as_millis() as u64, "settlement failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Give every queued job one more attempt. Returns `(settled, still_queued)`.
    pub async fn reconcile_once(&self) -> (usize, usize) {
        let mut settled = 0;
        for queued in self.queue.drain() {
            match self.run(&queued.job).await {
                Ok(_) => settled += 1,
                Err(err) if is_already_settled(&err) => settled += 1,
                Err(err) if is_retryable(&err) => {
                    warn!(room_id = queued.job.room_id(), error = %err, failures = queued.failures + 1, "reconciliation attempt failed");
                    self.queue.push(QueuedJob {
                        job: queued.job,
                        failures: queued.failures + 1,
                    });
                }
                Err(err) => {
                    error!(room_id = queued.job.room_id(), error = %err, "reconciliation gave up on job");
                }
            }
        }
        (settled, self.queue.len())
    }
}
