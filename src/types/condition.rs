use std::cmp::Ordering;
use std::fmt;

use super::Value;

/// Test applied to a rule's source field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Value),
    NotEquals(Value),
    Exists,
    NotExists,
    GreaterThan(f64),
    LessThan(f64),
}

impl Condition {
    /// Evaluate against the resolved source value. `None` is an absent field.
    ///
    /// Absent fields only satisfy [`Condition::NotExists`]. Numeric
    /// comparisons on non-numeric values are `false`.
    #[must_use]
    pub fn holds(&self, actual: Option<&Value>) -> bool {
        match (self, actual) {
            (Condition::NotExists, None) => true,
            (Condition::NotExists, Some(v)) => !v.is_present(),
            (_, None) => false,
            (Condition::Exists, Some(v)) => v.is_present(),
            (Condition::Equals(expected), Some(v)) => v.loose_eq(expected),
            (Condition::NotEquals(expected), Some(v)) => !v.loose_eq(expected),
            (Condition::GreaterThan(bound), Some(v)) => {
                v.numeric_cmp(*bound) == Some(Ordering::Greater)
            }
            (Condition::LessThan(bound), Some(v)) => v.numeric_cmp(*bound) == Some(Ordering::Less),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Equals(v) => write!(f, "== {v}"),
            Condition::NotEquals(v) => write!(f, "!= {v}"),
            Condition::Exists => write!(f, "exists"),
            Condition::NotExists => write!(f, "not exists"),
            Condition::GreaterThan(n) => write!(f, "> {n}"),
            Condition::LessThan(n) => write!(f, "< {n}"),
        }
    }
}

/// A source field paired with the condition it must meet.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub condition: Condition,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.condition)
    }
}

/// Intermediate builder for field predicates.
/// Created by [`field()`]; requires a condition method to produce a [`Predicate`].
#[derive(Debug, Clone)]
pub struct FieldRef {
    path: String,
}

impl FieldRef {
    fn with(self, condition: Condition) -> Predicate {
        Predicate {
            field: self.path,
            condition,
        }
    }

    #[must_use]
    pub fn eq(self, value: impl Into<Value>) -> Predicate {
        self.with(Condition::Equals(value.into()))
    }

    #[must_use]
    pub fn neq(self, value: impl Into<Value>) -> Predicate {
        self.with(Condition::NotEquals(value.into()))
    }

    #[must_use]
    pub fn exists(self) -> Predicate {
        self.with(Condition::Exists)
    }

    #[must_use]
    pub fn not_exists(self) -> Predicate {
        self.with(Condition::NotExists)
    }

    #[must_use]
    pub fn gt(self, bound: f64) -> Predicate {
        self.with(Condition::GreaterThan(bound))
    }

    #[must_use]
    pub fn lt(self, bound: f64) -> Predicate {
        self.with(Condition::LessThan(bound))
    }
}

#[must_use]
pub fn field(path: &str) -> FieldRef {
    FieldRef {
        path: path.to_owned(),
    }
}
