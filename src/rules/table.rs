//! Declarative rule definitions, as content modules ship them.
//!
//! A `RuleTable` is plain data: target names, operator symbols and formula
//! text. Nothing is validated here; validation happens when the table is
//! registered against an engine. Tables are cloneable and may be shared
//! read-only across any number of engine instances.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
    pub source: String,
    pub op: String,
    pub formula: String,
}

impl StepDef {
    pub fn new(source: &str, op: &str, formula: &str) -> Self {
        Self {
            source: source.to_string(),
            op: op.to_string(),
            formula: formula.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDef {
    pub target: String,
    pub steps: Vec<StepDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub rules: Vec<RuleDef>,
}

impl RuleTable {
    pub fn from_json(text: &str) -> Result<Self, super::RegistrationError> {
        serde_json::from_str(text).map_err(|e| super::RegistrationError::Table(e.to_string()))
    }
}
