//! Persistent findings ledger.

pub mod ledger;
pub mod schema;

pub use ledger::Ledger;
