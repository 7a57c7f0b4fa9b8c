//! Utility modules

pub mod memory_api;

pub use memory_api::*;
