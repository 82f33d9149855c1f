//! The synchronous, single-threaded derivation engine.
//!
//! One engine owns the state of one logical character/session: the name
//! registry, the rule set and the attribute store. There is no ambient
//! global registry; hosts that evaluate many characters create one engine
//! each and share the (read-only) rule tables.

use crate::analysis::{topology, ConfigError, DepGraph};
use crate::display;
use crate::expr;
use crate::rules::{Op, RegistrationError, RuleSet, RuleTable, Step, StepDef};
use crate::store::{AttrId, AttrState, AttributeRegistry, AttributeStore, Value};

#[derive(Debug, Default)]
pub struct DerivationEngine {
    attrs: AttributeRegistry,
    rules: RuleSet,
    store: AttributeStore,

    // Evaluation plan, rebuilt lazily whenever registration has occurred
    // (or new attributes appeared) since it was last built.
    graph: Option<DepGraph>,
    order: Vec<AttrId>,
    planned_revision: u64,
}

impl DerivationEngine {
    pub fn new() -> Self { Self::default() }

    /// Appends a rule for `target`. Additive: registering the same target
    /// again extends its step chain in stable first-to-last order.
    ///
    /// Operator symbols and formulas are validated here; a bad step rejects
    /// this call only and leaves every earlier registration valid.
    pub fn register(&mut self, target: &str, steps: &[StepDef]) -> Result<(), RegistrationError> {
        if target.trim().is_empty() {
            return Err(RegistrationError::MissingTarget);
        }

        let mut parsed = Vec::with_capacity(steps.len());
        for def in steps {
            let op = Op::parse(&def.op).ok_or_else(|| RegistrationError::UnknownOperator {
                target: target.to_string(),
                symbol: def.op.clone(),
            })?;
            let expr = expr::parse(&def.formula, &mut self.attrs).map_err(|e| {
                RegistrationError::Formula {
                    formula: def.formula.clone(),
                    source: e,
                }
            })?;
            let source = self.attrs.intern(&def.source);
            parsed.push(Step { source, op, expr });
        }

        let target_id = self.attrs.intern(target);
        self.rules.register(target_id, parsed);
        self.store.ensure_capacity(self.attrs.count());
        Ok(())
    }

    /// Registers a declarative rule table, rule by rule, in table order.
    pub fn load_table(&mut self, table: &RuleTable) -> Result<(), RegistrationError> {
        for rule in &table.rules {
            self.register(&rule.target, &rule.steps)?;
        }
        Ok(())
    }

    /// Writes a base attribute and marks its transitive dependents dirty.
    pub fn set_base(&mut self, name: &str, value: impl Into<Value>) {
        let id = self.attrs.intern(name);
        self.store.ensure_capacity(self.attrs.count());

        let value = value.into();
        self.store.set_base(id, value.clone());
        if !self.rules.has(id) {
            // plain inputs are readable immediately; rule targets combine
            // the base into their next evaluation instead
            self.store.put(id, value);
            self.store.set_state(id, AttrState::Resolved);
        }

        // With a current plan, only the downstream cone goes dirty. A stale
        // plan recomputes everything at the next resolve anyway.
        let dependents: Option<Vec<AttrId>> = match &self.graph {
            Some(g) if !self.plan_stale() => {
                Some(topology::downstream_from(g, &[id]).into_iter().collect())
            }
            _ => None,
        };
        if let Some(dependents) = dependents {
            for d in dependents {
                if self.rules.has(d) {
                    self.store.set_state(d, AttrState::Dirty);
                }
            }
        }
    }

    /// Evaluates every dirty rule target in dependency order.
    ///
    /// On a cycle this fails before touching any value: the store keeps its
    /// last fully-resolved contents.
    pub fn resolve_all(&mut self) -> Result<(), ConfigError> {
        if self.plan_stale() {
            let graph = DepGraph::build(self.attrs.count(), &self.rules);
            let order = topology::sort(&graph, &self.attrs)?;
            self.graph = Some(graph);
            self.order = order;
            self.planned_revision = self.rules.revision();
            self.store.ensure_capacity(self.attrs.count());

            // a fresh plan recomputes every rule target
            let targets: Vec<AttrId> = self.rules.targets().to_vec();
            self.store.invalidate(targets);
        }

        let order = self.order.clone();
        for id in order {
            if self.store.state(id) != AttrState::Dirty || !self.rules.has(id) {
                continue;
            }
            let result = self.evaluate_target(id);
            let state = if result.is_absent() {
                AttrState::Unset
            } else {
                AttrState::Resolved
            };
            self.store.put(id, result);
            self.store.set_state(id, state);
        }
        Ok(())
    }

    /// Current value of `name`; `Absent` for names never seen.
    pub fn get(&self, name: &str) -> Value {
        match self.attrs.lookup(name) {
            Some(id) => self.store.value(id).clone(),
            None => Value::Absent,
        }
    }

    pub fn state(&self, name: &str) -> AttrState {
        match self.attrs.lookup(name) {
            Some(id) => self.store.state(id),
            None => AttrState::Unset,
        }
    }

    /// Plain-text audit trace of how `name` derives from its upstreams.
    pub fn trace(&self, name: &str) -> String {
        display::trace::format_trace(&self.attrs, &self.rules, &self.store, name)
    }

    fn plan_stale(&self) -> bool {
        match &self.graph {
            Some(g) => {
                self.planned_revision != self.rules.revision()
                    || g.count() != self.attrs.count()
            }
            None => true,
        }
    }

    /// Runs all of a target's steps from a fresh accumulator. A target that
    /// also holds a base value starts from that base, so rule results
    /// combine with it rather than silently discarding it.
    fn evaluate_target(&self, id: AttrId) -> Value {
        let mut acc = self.store.base(id).clone();
        for step in self.rules.steps(id) {
            match step.op {
                Op::Require => {
                    if !self.store.value(step.source).truthy() {
                        // gate failed: the rest of the rule is void and the
                        // target is left unset for this pass
                        return Value::Absent;
                    }
                }
                _ => {
                    let value = step.expr.eval(&self.store);
                    acc = step.op.apply(acc, value);
                }
            }
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(source: &str, op: &str, formula: &str) -> StepDef {
        StepDef::new(source, op, formula)
    }

    #[test]
    fn test_accumulation() {
        let mut engine = DerivationEngine::new();
        engine
            .register("T", &[step("X", "+=", "2"), step("Y", "+=", "3")])
            .unwrap();
        engine.set_base("X", 1.0);
        engine.set_base("Y", 1.0);
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("T"), Value::Number(5.0));
    }

    #[test]
    fn test_gating_leaves_target_unset() {
        let mut engine = DerivationEngine::new();
        engine
            .register("T", &[step("hasFeat", "?", "true"), step("X", "=", "10")])
            .unwrap();
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("T"), Value::Absent);
        assert_eq!(engine.state("T"), AttrState::Unset);

        engine.set_base("hasFeat", true);
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("T"), Value::Number(10.0));
        assert_eq!(engine.state("T"), AttrState::Resolved);
    }

    #[test]
    fn test_gate_failure_voids_earlier_steps() {
        let mut engine = DerivationEngine::new();
        engine
            .register(
                "T",
                &[step("X", "+=", "4"), step("hasFeat", "?", "true"), step("X", "+=", "1")],
            )
            .unwrap();
        engine.set_base("X", 1.0);
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("T"), Value::Absent);
    }

    #[test]
    fn test_cap_semantics_across_layers() {
        let mut engine = DerivationEngine::new();
        engine.register("T", &[step("A", "^=", "5")]).unwrap();
        engine.set_base("A", 5.0);
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("T"), Value::Number(5.0));

        // a supplemental module raises the same target later
        engine.register("T", &[step("B", "^=", "8")]).unwrap();
        engine.set_base("B", 8.0);
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("T"), Value::Number(8.0));
    }

    #[test]
    fn test_layering_keeps_earlier_steps() {
        let mut engine = DerivationEngine::new();
        engine.register("T", &[step("X", "+=", "2")]).unwrap();
        engine.set_base("X", 1.0);
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("T"), Value::Number(2.0));

        engine.register("T", &[step("Y", "+=", "3")]).unwrap();
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("T"), Value::Number(5.0));
    }

    #[test]
    fn test_idempotent_resolution() {
        let mut engine = DerivationEngine::new();
        engine
            .register("mod.str", &[step("Str score", "=", "([Str score] - 10) / 2")])
            .unwrap();
        engine.set_base("Str score", 14.0);
        engine.resolve_all().unwrap();
        let first = engine.get("mod.str");
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("mod.str"), first);
        assert_eq!(first, Value::Number(2.0));
    }

    #[test]
    fn test_determinism_under_independent_reordering() {
        let table_a = [("T1", step("X", "=", "X * 2")), ("T2", step("Y", "=", "Y + 1"))];
        let mut forward = DerivationEngine::new();
        let mut reversed = DerivationEngine::new();
        for (target, s) in table_a.iter() {
            forward.register(target, std::slice::from_ref(s)).unwrap();
        }
        for (target, s) in table_a.iter().rev() {
            reversed.register(target, std::slice::from_ref(s)).unwrap();
        }
        for engine in [&mut forward, &mut reversed] {
            engine.set_base("X", 3.0);
            engine.set_base("Y", 4.0);
            engine.resolve_all().unwrap();
        }
        assert_eq!(forward.get("T1"), reversed.get("T1"));
        assert_eq!(forward.get("T2"), reversed.get("T2"));
    }

    #[test]
    fn test_cycle_fails_and_preserves_state() {
        let mut engine = DerivationEngine::new();
        engine.register("T", &[step("X", "=", "X + 1")]).unwrap();
        engine.set_base("X", 1.0);
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("T"), Value::Number(2.0));

        engine.register("A", &[step("B", "=", "B")]).unwrap();
        engine.register("B", &[step("A", "=", "A")]).unwrap();
        let err = engine.resolve_all().unwrap_err();
        let ConfigError::Cycle { attribute } = err;
        assert!(attribute == "A" || attribute == "B");

        // nothing partially overwritten
        assert_eq!(engine.get("T"), Value::Number(2.0));
    }

    #[test]
    fn test_base_value_combines_with_rule() {
        let mut engine = DerivationEngine::new();
        engine.register("T", &[step("X", "+=", "5")]).unwrap();
        engine.set_base("T", 10.0);
        engine.set_base("X", 1.0);
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("T"), Value::Number(15.0));
    }

    #[test]
    fn test_absence_forgiveness_in_formulas() {
        let mut engine = DerivationEngine::new();
        engine
            .register("T", &[step("X", "=", "never.set + 2")])
            .unwrap();
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("T"), Value::Number(2.0));
    }

    #[test]
    fn test_incremental_dirty_propagation() {
        let mut engine = DerivationEngine::new();
        engine.register("Y", &[step("X", "=", "X + 1")]).unwrap();
        engine.register("Z", &[step("Y", "=", "Y + 1")]).unwrap();
        engine.register("W", &[step("V", "=", "V + 1")]).unwrap();
        engine.set_base("X", 1.0);
        engine.set_base("V", 1.0);
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("Z"), Value::Number(3.0));

        engine.set_base("X", 10.0);
        // only X's cone went dirty
        assert_eq!(engine.state("Y"), AttrState::Dirty);
        assert_eq!(engine.state("Z"), AttrState::Dirty);
        assert_eq!(engine.state("W"), AttrState::Resolved);

        engine.resolve_all().unwrap();
        assert_eq!(engine.get("Z"), Value::Number(12.0));
        assert_eq!(engine.get("W"), Value::Number(2.0));
    }

    #[test]
    fn test_conditional_multiplier_chain() {
        // carry capacity: score times 15, doubled by a granted feature
        let mut engine = DerivationEngine::new();
        engine
            .register(
                "Carry capacity",
                &[
                    step("Str score", "=", "[Str score] * 15"),
                    step("feat.powerful_build", "*", "feat.powerful_build ? 2 : 1"),
                ],
            )
            .unwrap();
        engine.set_base("Str score", 14.0);
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("Carry capacity"), Value::Number(210.0));

        engine.set_base("feat.powerful_build", true);
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("Carry capacity"), Value::Number(420.0));
    }

    #[test]
    fn test_registration_errors_reject_only_that_call() {
        let mut engine = DerivationEngine::new();
        engine.register("good", &[step("X", "=", "1")]).unwrap();

        let err = engine
            .register("bad", &[step("X", "%=", "1")])
            .unwrap_err();
        assert!(matches!(err, RegistrationError::UnknownOperator { .. }));

        let err = engine.register("", &[step("X", "=", "1")]).unwrap_err();
        assert!(matches!(err, RegistrationError::MissingTarget));

        let err = engine
            .register("bad", &[step("X", "=", "1 +")])
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Formula { .. }));

        engine.resolve_all().unwrap();
        assert_eq!(engine.get("good"), Value::Number(1.0));
        assert_eq!(engine.get("bad"), Value::Absent);
    }

    #[test]
    fn test_load_table_from_json() {
        let table = RuleTable::from_json(
            r#"{
                "rules": [
                    {
                        "target": "Speed",
                        "steps": [
                            { "source": "race.base_speed", "op": "=", "formula": "race.base_speed" },
                            { "source": "feat.mobile", "op": "+=", "formula": "feat.mobile ? 10 : 0" }
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();

        let mut engine = DerivationEngine::new();
        engine.load_table(&table).unwrap();
        engine.set_base("race.base_speed", 30.0);
        engine.set_base("feat.mobile", true);
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("Speed"), Value::Number(40.0));
    }

    #[test]
    fn test_get_unknown_is_absent() {
        let engine = DerivationEngine::new();
        assert_eq!(engine.get("nobody"), Value::Absent);
        assert_eq!(engine.state("nobody"), AttrState::Unset);
    }

    #[test]
    fn test_text_derivation() {
        let mut engine = DerivationEngine::new();
        engine
            .register(
                "title",
                &[step("race", "=", "race + ' ' + class"), step("class", "?", "true")],
            )
            .unwrap();
        engine.set_base("race", "Dwarf");
        engine.set_base("class", "Cleric");
        engine.resolve_all().unwrap();
        assert_eq!(engine.get("title"), Value::Text("Dwarf Cleric".into()));
    }
}
