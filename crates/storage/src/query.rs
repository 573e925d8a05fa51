#![forbid(unsafe_code)]

use serde_json::Value;
use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Equals(Value),
    /// Inclusive on both ends; a missing bound is open.
    Between {
        lower: Option<Value>,
        upper: Option<Value>,
    },
}

/// Equality or range lookup on one top-level json field. Results come back ordered by
/// that field, then by id.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub field: String,
    pub condition: Condition,
    pub limit: Option<usize>,
}

impl Query {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            condition: Condition::Equals(value.into()),
            limit: None,
        }
    }

    pub fn between(
        field: impl Into<String>,
        lower: Option<Value>,
        upper: Option<Value>,
    ) -> Self {
        Self {
            field: field.into(),
            condition: Condition::Between { lower, upper },
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn matches(&self, candidate: &Value) -> bool {
        match &self.condition {
            Condition::Equals(expected) => compare_scalars(candidate, expected) == Ordering::Equal,
            Condition::Between { lower, upper } => {
                if candidate.is_null() {
                    return false;
                }
                let above = lower
                    .as_ref()
                    .is_none_or(|lower| compare_scalars(candidate, lower) != Ordering::Less);
                let below = upper
                    .as_ref()
                    .is_none_or(|upper| compare_scalars(candidate, upper) != Ordering::Greater);
                above && below
            }
        }
    }
}

pub(crate) fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Same ordering sqlite applies to `json_extract` results: null, then numbers
/// (booleans as 0/1), then text. Arrays and objects compare as their json text.
pub(crate) fn compare_scalars(a: &Value, b: &Value) -> Ordering {
    fn class(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) | Value::Number(_) => 1,
            _ => 2,
        }
    }
    fn number(value: &Value) -> f64 {
        match value {
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            _ => 0.0,
        }
    }
    fn text(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    match class(a).cmp(&class(b)) {
        Ordering::Equal => match class(a) {
            0 => Ordering::Equal,
            1 => number(a).total_cmp(&number(b)),
            _ => text(a).cmp(&text(b)),
        },
        other => other,
    }
}
