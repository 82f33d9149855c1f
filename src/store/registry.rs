use super::types::AttrId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Interns attribute names to dense ids.
///
/// Names are opaque dotted/namespaced strings supplied by the content-table
/// layer ("Str score", "feat.powerful_build"); the engine imposes no meaning
/// on them. Every name is interned exactly once and keeps its id for the
/// lifetime of the registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeRegistry {
    names: Vec<String>,

    // Ephemeral lookup index (not serialized, rebuilt on load)
    #[serde(skip)]
    index: HashMap<String, AttrId>,
}

impl AttributeRegistry {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.names.len() }

    /// Rebuilds the lookup index after deserialization.
    pub fn rebuild_index(&mut self) {
        self.index = self
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), AttrId::new(i)))
            .collect();
    }

    pub fn intern(&mut self, name: &str) -> AttrId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = AttrId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<AttrId> {
        self.index.get(name).copied()
    }

    #[inline(always)]
    pub fn name(&self, id: AttrId) -> &str {
        &self.names[id.index()]
    }
}
