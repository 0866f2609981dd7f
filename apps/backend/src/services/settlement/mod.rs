//! Escrow ledger money movement for rooms.
//!
//! Every operation is one transaction; payouts are keyed by
//! `(room_id, hand_number)` so running one twice never pays twice.

mod coordinator;
mod reconciliation;

pub use coordinator::{
    JobOutcome, RetryPolicy, SettlementCoordinator, SettlementJob, SettlementReport,
};
pub use reconciliation::{spawn_reconciler, QueuedJob, ReconciliationQueue};
