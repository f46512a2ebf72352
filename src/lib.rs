//! Rule-driven form logic for a guided tax intake questionnaire.
//!
//! A [`RuleSet`] maps a [`FormState`] to the optional fields currently on
//! screen; [`steps`] decides which questionnaire sections are complete.
//! Around that core sit validation, drafts, the submission summary and the
//! [`IntakeService`] that ties them together.
//!
//! ```
//! use taxintake::{standard_rules, FormState};
//!
//! let rules = standard_rules().unwrap();
//! let form = FormState::new().set("maritalStatus", "married");
//! assert!(rules.evaluate(&form).is_visible("spouseFirstName"));
//! ```

mod compile;
mod draft;
mod error;
mod evaluate;
mod intake_id;
#[cfg(feature = "binary-drafts")]
mod serial;
mod standard;
mod types;

pub mod config;
pub mod logging;
pub mod notify;
pub mod parse;
pub mod service;
pub mod steps;
pub mod summary;
pub mod validate;

pub use config::{ConfigError, IntakeConfig};
pub use draft::{Draft, DraftError, DraftFormat, DraftId, DraftStore, FileDraftStore, MemoryDraftStore};
pub use error::IntakeError;
pub use intake_id::{IntakeId, IntakeIdError};
pub use parse::ParseError;
#[cfg(feature = "binary-drafts")]
pub use serial::{DeserializeError, SerializeError};
pub use service::{IntakeService, SubmitError, SubmitReceipt};
pub use standard::standard_rules;
pub use steps::{Progress, Step, StepId};
pub use types::{
    field, Action, CompileError, Condition, EvaluationReport, FieldRef, FieldRegistry, FormState,
    FormStateError, NullValueError, Predicate, Rule, RuleBuilder, RuleSet, RuleSetBuilder, Value,
    Visibility,
};
pub use validate::{FieldError, ValidationErrors};
