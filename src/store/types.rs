use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AttrId(pub u32);

impl AttrId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// The current value of an attribute. `Absent` is a first-class state:
/// attributes no rule step contributed to, and names never seeded, both
/// read as `Absent`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Absent,
    Number(f64),
    Text(String),
    Flag(bool),
}

impl Value {
    #[inline]
    pub fn is_absent(&self) -> bool { matches!(self, Value::Absent) }

    /// Absent, `false`, `0` and `""` are falsy; everything else is truthy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Absent => false,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Flag(b) => *b,
        }
    }

    /// Numeric coercion with the neutral default for non-numeric content.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Absent => 0.0,
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Value::Flag(b) => {
                if *b { 1.0 } else { 0.0 }
            }
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Value::Absent => String::new(),
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
            Value::Flag(b) => b.to_string(),
        }
    }
}

/// Whole numbers render without a trailing ".0"; scores and bonuses are
/// almost always integral and read that way on the sheet.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => write!(f, "?"),
            Value::Text(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.as_text()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::Number(n) }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self { Value::Number(n as f64) }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Flag(b) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Text(s.to_string()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::Text(s) }
}

/// Per-attribute lifecycle: `Unset -> Dirty -> Resolved`. An upstream write
/// moves dependents back to `Dirty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttrState {
    #[default]
    Unset,
    Dirty,
    Resolved,
}
