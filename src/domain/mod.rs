//! Business rules that don't touch the database.

pub mod grading;
pub mod ledger;
