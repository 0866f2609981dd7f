//! Realtime transport: frame codec, fan-out hub and per-connection sessions.

pub mod hub;
pub mod protocol;
pub mod session;
