//! Repository functions over the ledger tables (generic over ConnectionTrait).
//!
//! Every function maps `DbErr` through `map_db_err`, so callers only ever
//! see `DomainError`.

pub mod escrows;
pub mod ledger;
pub mod settlements;
pub mod users;
pub mod wallets;
