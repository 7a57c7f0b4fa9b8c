//! Reconciliation module: the batch engine and the sync run driving it
//! against an accounting API.

pub mod engine;
pub mod sync;

pub use engine::*;
pub use sync::*;
