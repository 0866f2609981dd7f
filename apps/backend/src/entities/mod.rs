pub mod escrows;
pub mod ledger_entries;
pub mod settlements;
pub mod users;
pub mod wallets;

pub use escrows::Entity as Escrows;
pub use escrows::Model as Escrow;
pub use ledger_entries::Entity as LedgerEntries;
pub use ledger_entries::Model as LedgerEntry;
pub use settlements::Entity as Settlements;
pub use settlements::Model as Settlement;
pub use users::Entity as Users;
pub use users::Model as User;
pub use wallets::Entity as Wallets;
pub use wallets::Model as Wallet;
