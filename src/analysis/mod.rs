//! Dependency resolution: graph construction and topological ordering.
pub mod graph;
pub mod topology;

pub use graph::DepGraph;

use thiserror::Error;

/// Raised when the registered rules cannot be ordered. The engine refuses
/// to evaluate; the store keeps its last fully-resolved values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Cycle detected involving attribute '{attribute}'")]
    Cycle { attribute: String },
}
