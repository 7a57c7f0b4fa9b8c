//! Matching module: purpose parsing, counterparty checks and invoice selection

pub mod entity;
pub mod purpose;
pub mod selector;
pub mod strategy;

pub use entity::*;
pub use purpose::*;
pub use selector::*;
pub use strategy::*;
