//! Shared helpers for the gamehall test suites: one-time logging setup and
//! assertions on the HTTP error contract.

pub mod logging;
pub mod problem_details;
