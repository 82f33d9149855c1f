//! The rule model: operators, steps and the additive registry.
pub mod registry;
pub mod step;
pub mod table;

pub use registry::RuleSet;
pub use step::{Op, Step};
pub use table::{RuleDef, RuleTable, StepDef};

use crate::expr::ParseError;
use thiserror::Error;

/// Raised synchronously at registration; rejects only the offending call,
/// prior registrations stay valid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    #[error("Unknown operator '{symbol}' for target '{target}'")]
    UnknownOperator { target: String, symbol: String },
    #[error("Rule registered without a target name")]
    MissingTarget,
    #[error("Malformed formula '{formula}': {source}")]
    Formula {
        formula: String,
        #[source]
        source: ParseError,
    },
    #[error("Malformed rule table: {0}")]
    Table(String),
}
