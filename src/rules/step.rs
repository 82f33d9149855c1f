use crate::expr::Expr;
use crate::store::{AttrId, Value};

/// How a step folds its evaluated value into the target's accumulator.
///
/// The operator set is closed; symbols outside it are rejected at
/// registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `=` overwrite the accumulator.
    Set,
    /// `+=` numeric accumulation (text composition when text is involved).
    Add,
    /// `^=` "rises to at least": set if unset, else max when both numeric.
    Raise,
    /// `*` multiply the accumulator.
    Scale,
    /// `?` gate on the source value; failure aborts the rest of the rule.
    Require,
}

impl Op {
    pub fn parse(symbol: &str) -> Option<Op> {
        match symbol {
            "=" => Some(Op::Set),
            "+=" => Some(Op::Add),
            "^=" => Some(Op::Raise),
            "*" => Some(Op::Scale),
            "?" => Some(Op::Require),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Set => "=",
            Op::Add => "+=",
            Op::Raise => "^=",
            Op::Scale => "*",
            Op::Require => "?",
        }
    }

    /// Combines `value` into `acc`. `Require` never reaches this point; the
    /// scheduler handles gating before any combination happens.
    pub fn apply(&self, acc: Value, value: Value) -> Value {
        match self {
            Op::Set => value,
            Op::Add => {
                if matches!(acc, Value::Text(_)) || matches!(value, Value::Text(_)) {
                    Value::Text(format!("{}{}", acc.as_text(), value.as_text()))
                } else {
                    Value::Number(acc.as_number() + value.as_number())
                }
            }
            Op::Raise => match (&acc, &value) {
                (Value::Absent, _) => value,
                (Value::Number(a), Value::Number(b)) => Value::Number(a.max(*b)),
                // a non-numeric accumulator cannot be "raised"
                _ => acc,
            },
            Op::Scale => Value::Number(acc.as_number() * value.as_number()),
            Op::Require => acc,
        }
    }
}

/// One contribution within a rule: read `source`, and if the gating
/// condition passes, fold the evaluated formula into the target.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub source: AttrId,
    pub op: Op,
    pub expr: Expr,
}
