use super::step::Step;
use crate::store::AttrId;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Most rules are a handful of steps; keep them inline.
type StepList = SmallVec<[Step; 4]>;

/// All registered derivation rules, keyed by target attribute.
///
/// Registration is additive: a later call for an already-known target
/// appends its steps after the existing ones, in stable first-to-last
/// order. This is how supplemental content layers extra contributing
/// sources onto a base rule set without touching it.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    steps: HashMap<AttrId, StepList>,
    targets: Vec<AttrId>,
    revision: u64,
}

impl RuleSet {
    pub fn new() -> Self { Self::default() }

    pub fn register(&mut self, target: AttrId, steps: impl IntoIterator<Item = Step>) {
        if !self.steps.contains_key(&target) {
            self.targets.push(target);
        }
        self.steps.entry(target).or_default().extend(steps);
        self.revision += 1;
    }

    #[inline]
    pub fn has(&self, target: AttrId) -> bool {
        self.steps.contains_key(&target)
    }

    pub fn steps(&self, target: AttrId) -> &[Step] {
        self.steps.get(&target).map(|s| s.as_slice()).unwrap_or(&[])
    }

    /// Targets in first-registration order.
    pub fn targets(&self) -> &[AttrId] {
        &self.targets
    }

    /// Bumped on every registration; the scheduler compares it against the
    /// revision its dependency graph was built at.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
