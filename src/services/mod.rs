// services/mod.rs - Operations that span more than one collection
pub mod accounts;
pub mod family;
pub mod ledger;

pub use accounts::{AccountError, AccountService, NewAccount};
pub use family::{FamilyError, FamilyLinks};
pub use ledger::FeeLedger;
