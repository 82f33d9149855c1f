//! Declarative attribute-derivation engine for a character-sheet generator.
//!
//! Content modules register rules — ordered chains of
//! (source, operator, formula) steps — against named target attributes.
//! The engine builds the dependency graph those rules imply, orders it
//! topologically (cycles are a hard configuration error), and recomputes
//! dirty targets whenever a base attribute changes:
//!
//! ```
//! use chargen_core::{DerivationEngine, StepDef, Value};
//!
//! let mut engine = DerivationEngine::new();
//! engine.register("Carry capacity", &[
//!     StepDef::new("Str score", "=", "[Str score] * 15"),
//!     StepDef::new("feat.powerful_build", "*", "feat.powerful_build ? 2 : 1"),
//! ]).unwrap();
//! engine.set_base("Str score", 14.0);
//! engine.resolve_all().unwrap();
//! assert_eq!(engine.get("Carry capacity"), Value::Number(210.0));
//! ```
//!
//! Attribute names and formulas are opaque to the engine: game semantics
//! live entirely in the content tables that feed it.

pub mod analysis;
pub mod derivation;
pub mod display;
pub mod expr;
pub mod rules;
pub mod store;

pub use analysis::ConfigError;
pub use derivation::DerivationEngine;
pub use expr::{Expr, ParseError};
pub use rules::{Op, RegistrationError, RuleDef, RuleTable, StepDef};
pub use store::{AttrId, AttrState, Value};
