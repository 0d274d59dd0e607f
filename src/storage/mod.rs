mod error;
mod ledger;
mod repository;
mod rows;
mod tx;

pub use error::*;
pub use ledger::*;
pub use repository::*;
pub use tx::*;

/// SQL migration for the initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
