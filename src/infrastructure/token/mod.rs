//! Token infrastructure - generation and the single-use ledger

mod generator;
mod ledger;

pub use generator::TokenGenerator;
pub use ledger::TokenLedger;
