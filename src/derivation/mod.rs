//! Drives recomputation over the attribute store.
pub mod engine;

pub use engine::DerivationEngine;
