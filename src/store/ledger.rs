//! Dense value storage for attributes, indexed by `AttrId`.

use super::types::{AttrId, AttrState, Value};

/// Holds base inputs and current values side by side.
///
/// Base values are what external callers wrote; `values` is what readers
/// see. The two are kept separate so a recomputation can always restart a
/// rule target from its base (or from nothing) rather than from a stale
/// partial result.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    base: Vec<Value>,
    values: Vec<Value>,
    states: Vec<AttrState>,
}

impl AttributeStore {
    pub fn new() -> Self { Self::default() }

    pub fn ensure_capacity(&mut self, size: usize) {
        if self.base.len() < size {
            self.base.resize(size, Value::Absent);
            self.values.resize(size, Value::Absent);
            self.states.resize(size, AttrState::Unset);
        }
    }

    #[inline(always)]
    pub fn base(&self, id: AttrId) -> &Value {
        self.base.get(id.index()).unwrap_or(&Value::Absent)
    }

    pub fn set_base(&mut self, id: AttrId, value: Value) {
        self.ensure_capacity(id.index() + 1);
        self.base[id.index()] = value;
    }

    #[inline(always)]
    pub fn value(&self, id: AttrId) -> &Value {
        self.values.get(id.index()).unwrap_or(&Value::Absent)
    }

    pub fn put(&mut self, id: AttrId, value: Value) {
        self.ensure_capacity(id.index() + 1);
        self.values[id.index()] = value;
    }

    #[inline(always)]
    pub fn state(&self, id: AttrId) -> AttrState {
        self.states.get(id.index()).copied().unwrap_or_default()
    }

    pub fn set_state(&mut self, id: AttrId, state: AttrState) {
        self.ensure_capacity(id.index() + 1);
        self.states[id.index()] = state;
    }

    /// Marks the given attributes stale relative to their upstreams.
    pub fn invalidate(&mut self, ids: impl IntoIterator<Item = AttrId>) {
        for id in ids {
            self.set_state(id, AttrState::Dirty);
        }
    }
}
