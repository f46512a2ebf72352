use std::fmt;

use super::condition::Predicate;

/// What a rule does to its targets when its predicate holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Show,
    Hide,
    Require,
    Optional,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Show => "show",
            Action::Hide => "hide",
            Action::Require => "require",
            Action::Optional => "optional",
        })
    }
}

/// A conditional-visibility rule: when `predicate` holds, apply `action` to
/// every field in `targets`.
///
/// Rules are created via [`RuleSetBuilder`](super::RuleSetBuilder) or parsed
/// from text with [`RuleSet::from_dsl()`](super::RuleSet::from_dsl).
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub predicate: Predicate,
    pub action: Action,
    pub targets: Vec<String>,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "when {} {} {}",
            self.predicate,
            self.action,
            self.targets.join(", ")
        )
    }
}
