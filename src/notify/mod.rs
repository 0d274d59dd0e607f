//! Notification tasks dispatched from the account workflows' after-create hooks.

mod distributor;
mod processor;
mod tasks;

pub use distributor::*;
pub use processor::*;
pub use tasks::*;
