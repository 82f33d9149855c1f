//! Attribute identity and value storage.
pub mod ledger;
pub mod registry;
pub mod types;

pub use ledger::AttributeStore;
pub use registry::AttributeRegistry;
pub use types::{AttrId, AttrState, Value};
