use thiserror::Error;

use crate::config::ConfigError;
use crate::parse::ParseError;
use crate::service::SubmitError;
use crate::validate::ValidationErrors;
use crate::{CompileError, DraftError};

/// Unified error type for the crate's fallible entry points.
///
/// Returned by [`RuleSet::from_dsl()`](crate::RuleSet::from_dsl),
/// [`RuleSet::from_file()`](crate::RuleSet::from_file) and
/// [`IntakeService::new()`](crate::IntakeService::new); each concern's own
/// error converts into it with `?`.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[cfg(feature = "binary-drafts")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-drafts")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
