use crate::rules::{Op, RuleSet};
use crate::store::{AttrId, AttributeRegistry, AttributeStore, Value};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders the derivation tree of one attribute as plain text: every rule
/// step with its operator and formula, recursing into the upstream
/// attributes each step reads. Attributes already printed higher up are
/// back-referenced instead of expanded again.
pub fn format_trace(
    registry: &AttributeRegistry,
    rules: &RuleSet,
    store: &AttributeStore,
    target: &str,
) -> String {
    let mut tracer = Tracer {
        registry,
        rules,
        store,
        visited_at_level: HashMap::new(),
        output: String::new(),
    };

    match registry.lookup(target) {
        Some(id) => {
            let _ = writeln!(tracer.output, "DERIVATION TRACE for attribute '{}':", target);
            let _ = writeln!(tracer.output, "--------------------------------------------------");
            tracer.trace_attr(id, 1, "");
        }
        None => {
            let _ = writeln!(tracer.output, "Error: Unknown attribute '{}'", target);
        }
    }
    tracer.output
}

struct Tracer<'a> {
    registry: &'a AttributeRegistry,
    rules: &'a RuleSet,
    store: &'a AttributeStore,
    visited_at_level: HashMap<AttrId, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_attr(&mut self, id: AttrId, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(&id) {
            let _ = writeln!(self.output, "{}-> (Ref to L{})", prefix, first_seen);
            return;
        }
        self.visited_at_level.insert(id, level);

        let name = self.registry.name(id);
        let line_header = format!("[L{}] {}{}", level, name, self.format_value(id));

        if !self.rules.has(id) {
            let _ = writeln!(
                self.output,
                "{}{} -> Base({})",
                prefix,
                line_header,
                self.format_value(id)
            );
            return;
        }

        let _ = writeln!(self.output, "{}{}", prefix, line_header);

        let steps = self.rules.steps(id);
        let stem = build_child_stem(prefix);
        for (i, step) in steps.iter().enumerate() {
            let is_last = i == steps.len() - 1;
            let connector = if is_last { "`--" } else { "|--" };

            let annotation = match step.op {
                Op::Require => format!(
                    "? gate on {}{}",
                    self.registry.name(step.source),
                    self.format_value(step.source)
                ),
                op => format!("{} {}", op.symbol(), step.expr.render(self.registry)),
            };
            let _ = writeln!(self.output, "{}{} {}", stem, connector, annotation);

            // upstreams of this step, in mention order
            let mut upstream = vec![step.source];
            step.expr.collect_refs(&mut upstream);
            let mut seen = Vec::new();
            upstream.retain(|u| {
                if seen.contains(u) {
                    false
                } else {
                    seen.push(*u);
                    true
                }
            });

            let child_stem = format!("{}{}", stem, if is_last { "   " } else { "|  " });
            for (j, &up) in upstream.iter().enumerate() {
                let up_connector = if j == upstream.len() - 1 { "`--" } else { "|--" };
                let full_prefix = format!("{}{} ", child_stem, up_connector);
                self.trace_attr(up, level + 1, &full_prefix);
            }
        }
    }

    fn format_value(&self, id: AttrId) -> String {
        match self.store.value(id) {
            Value::Absent => "[?]".to_string(),
            Value::Text(s) => format!("['{}']", s),
            other => format!("[{}]", other.as_text()),
        }
    }
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`--", "   ").replace("|--", "|  ")
}
