mod condition;
mod error;
mod evaluation_report;
mod field_registry;
mod form_state;
mod rule;
mod ruleset;
mod value;
mod visibility;

pub use condition::{field, Condition, FieldRef, Predicate};
pub use error::CompileError;
pub use evaluation_report::EvaluationReport;
pub use field_registry::FieldRegistry;
pub use form_state::{FormState, FormStateError};
pub use rule::{Action, Rule};
pub use ruleset::{RuleBuilder, RuleSet, RuleSetBuilder};
pub use value::{NullValueError, Value};
pub use visibility::Visibility;
