//! Escrow ledger and settlement coordinator tests against an in-memory
//! SQLite ledger.
//!
//! Run all settlement tests:
//!   cargo test --test settlement_tests

mod common;

#[path = "support"]
#[allow(dead_code)]
mod support {
    pub mod ledger;
}

#[path = "suites/settlement"]
mod settlement {
    pub mod escrow_lifecycle;
    pub mod payouts;
    pub mod reconciliation;
}
