use std::fmt;
use std::time::Duration;

use super::visibility::Visibility;

/// Detailed evaluation report returned by
/// [`RuleSet::evaluate_detailed()`](super::ruleset::RuleSet::evaluate_detailed).
///
/// Contains the resulting visibility, the table indices of the rules whose
/// condition held, and the wall-clock duration of the evaluation.
#[derive(Debug, Clone)]
#[must_use]
pub struct EvaluationReport<'r> {
    visibility: Visibility<'r>,
    fired: Vec<usize>,
    duration: Duration,
}

impl<'r> EvaluationReport<'r> {
    pub(crate) fn new(visibility: Visibility<'r>, fired: Vec<usize>, duration: Duration) -> Self {
        Self {
            visibility,
            fired,
            duration,
        }
    }

    /// The visibility, same as [`RuleSet::evaluate()`](super::ruleset::RuleSet::evaluate).
    pub fn visibility(&self) -> &Visibility<'r> {
        &self.visibility
    }

    /// Indices of rules whose condition held, in table order.
    #[must_use]
    pub fn fired(&self) -> &[usize] {
        &self.fired
    }

    /// Wall-clock duration of the evaluation.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn into_visibility(self) -> Visibility<'r> {
        self.visibility
    }
}

impl fmt::Display for EvaluationReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fired: Vec<String> = self.fired.iter().map(ToString::to_string).collect();
        write!(f, "fired: [{}]", fired.join(", "))?;
        write!(f, ", {}", self.visibility)?;
        write!(f, ", duration: {:?}", self.duration)?;
        Ok(())
    }
}
