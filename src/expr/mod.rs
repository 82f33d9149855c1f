//! Typed formula trees and their evaluator.
//!
//! Formulas arrive from content tables as short text expressions
//! ("Str score * 15", "level >= 5 ? 3 : 2"). They are parsed once, at
//! registration time, into an `Expr` tree; evaluation is a pure function of
//! the attribute store with no text execution involved.
pub mod parser;

pub use parser::{parse, ParseError};

use crate::store::{AttrId, AttributeRegistry, AttributeStore, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ref(AttrId),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    /// Evaluates against the current store. Total: unknown references fall
    /// back to the neutral default of their context, division by zero
    /// yields 0.
    pub fn eval(&self, store: &AttributeStore) -> Value {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Ref(id) => store.value(*id).clone(),
            Expr::Neg(e) => Value::Number(-e.eval(store).as_number()),
            Expr::Binary { op, lhs, rhs } => {
                let l = lhs.eval(store);
                let r = rhs.eval(store);
                apply_binary(*op, &l, &r)
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                if cond.eval(store).truthy() {
                    then.eval(store)
                } else {
                    otherwise.eval(store)
                }
            }
        }
    }

    /// Collects every attribute id the expression reads.
    pub fn collect_refs(&self, out: &mut Vec<AttrId>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ref(id) => out.push(*id),
            Expr::Neg(e) => e.collect_refs(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_refs(out);
                rhs.collect_refs(out);
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                cond.collect_refs(out);
                then.collect_refs(out);
                otherwise.collect_refs(out);
            }
        }
    }

    /// Renders the tree back to formula text, for audit traces.
    pub fn render(&self, attrs: &AttributeRegistry) -> String {
        match self {
            Expr::Literal(Value::Text(s)) => format!("'{}'", s),
            Expr::Literal(v) => v.as_text(),
            Expr::Ref(id) => render_name(attrs.name(*id)),
            Expr::Neg(e) => format!("-{}", e.render(attrs)),
            Expr::Binary { op, lhs, rhs } => format!(
                "({} {} {})",
                lhs.render(attrs),
                binop_symbol(*op),
                rhs.render(attrs)
            ),
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => format!(
                "({} ? {} : {})",
                cond.render(attrs),
                then.render(attrs),
                otherwise.render(attrs)
            ),
        }
    }
}

fn apply_binary(op: BinOp, l: &Value, r: &Value) -> Value {
    match op {
        BinOp::Add => {
            // `+` composes text if either side is text, otherwise it is
            // numeric addition.
            if matches!(l, Value::Text(_)) || matches!(r, Value::Text(_)) {
                Value::Text(format!("{}{}", l.as_text(), r.as_text()))
            } else {
                Value::Number(l.as_number() + r.as_number())
            }
        }
        BinOp::Sub => Value::Number(l.as_number() - r.as_number()),
        BinOp::Mul => Value::Number(l.as_number() * r.as_number()),
        BinOp::Div => {
            let d = r.as_number();
            if d == 0.0 {
                Value::Number(0.0)
            } else {
                Value::Number(l.as_number() / d)
            }
        }
        BinOp::Eq => Value::Flag(values_equal(l, r)),
        BinOp::Ne => Value::Flag(!values_equal(l, r)),
        BinOp::Lt => compare(l, r, |o| o == std::cmp::Ordering::Less),
        BinOp::Le => compare(l, r, |o| o != std::cmp::Ordering::Greater),
        BinOp::Gt => compare(l, r, |o| o == std::cmp::Ordering::Greater),
        BinOp::Ge => compare(l, r, |o| o != std::cmp::Ordering::Less),
        BinOp::And => Value::Flag(l.truthy() && r.truthy()),
        BinOp::Or => Value::Flag(l.truthy() || r.truthy()),
    }
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Text(a), Value::Text(b)) => a == b,
        _ => l.as_number() == r.as_number(),
    }
}

fn compare(l: &Value, r: &Value, pick: impl Fn(std::cmp::Ordering) -> bool) -> Value {
    let ord = match (l, r) {
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        _ => l
            .as_number()
            .partial_cmp(&r.as_number())
            .unwrap_or(std::cmp::Ordering::Equal),
    };
    Value::Flag(pick(ord))
}

fn binop_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "&&",
        BinOp::Or => "||",
    }
}

/// Names that are not plain identifiers render bracketed.
fn render_name(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        name.to_string()
    } else {
        format!("[{}]", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AttributeStore;

    fn eval_with(src: &str, seed: &[(&str, Value)]) -> Value {
        let mut attrs = AttributeRegistry::new();
        let expr = parse(src, &mut attrs).expect("parse failed");
        let mut store = AttributeStore::new();
        for (name, v) in seed {
            let id = attrs.intern(name);
            store.put(id, v.clone());
        }
        store.ensure_capacity(attrs.count());
        expr.eval(&store)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_with("2 + 3 * 4", &[]), Value::Number(14.0));
        assert_eq!(eval_with("(2 + 3) * 4", &[]), Value::Number(20.0));
        assert_eq!(eval_with("-2 + 5", &[]), Value::Number(3.0));
    }

    #[test]
    fn test_absent_reference_is_neutral() {
        // references to never-set attributes contribute nothing and never raise
        assert_eq!(eval_with("ghost + 2", &[]), Value::Number(2.0));
        assert_eq!(eval_with("ghost ? 1 : 0", &[]), Value::Number(0.0));
        assert_eq!(eval_with("'x' + ghost", &[]), Value::Text("x".into()));
    }

    #[test]
    fn test_division_by_zero_is_total() {
        assert_eq!(eval_with("5 / 0", &[]), Value::Number(0.0));
        assert_eq!(eval_with("5 / ghost", &[]), Value::Number(0.0));
    }

    #[test]
    fn test_conditional_logic() {
        let seed = [("level", Value::Number(7.0))];
        assert_eq!(eval_with("level >= 5 ? 3 : 2", &seed), Value::Number(3.0));
        assert_eq!(eval_with("level >= 5 && level < 7", &seed), Value::Flag(false));
        assert_eq!(eval_with("level == 7 || ghost", &seed), Value::Flag(true));
    }

    #[test]
    fn test_text_composition() {
        let seed = [("race", Value::Text("Dwarf".into()))];
        assert_eq!(
            eval_with("race + ' (Hill)'", &seed),
            Value::Text("Dwarf (Hill)".into())
        );
        assert_eq!(eval_with("race == 'Dwarf'", &seed), Value::Flag(true));
    }

    #[test]
    fn test_render_roundtrips_shape() {
        let mut attrs = AttributeRegistry::new();
        let expr = parse("[Str score] * 15", &mut attrs).unwrap();
        assert_eq!(expr.render(&attrs), "([Str score] * 15)");
    }
}
