//! User ledger - canonical users merged from identity fragments

mod ledger;

pub use ledger::UserLedger;
