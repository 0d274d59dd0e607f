// Application layer: the transactional workflows and the service the CLI
// (or any other boundary) talks to.

pub mod engine;
pub mod error;
pub mod hooks;
pub mod service;

pub use engine::*;
pub use error::*;
pub use hooks::*;
pub use service::*;
