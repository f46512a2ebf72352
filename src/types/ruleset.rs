use std::collections::BTreeSet;
use std::fmt;

use super::condition::Predicate;
use super::error::CompileError;
use super::evaluation_report::EvaluationReport;
use super::field_registry::FieldRegistry;
use super::form_state::FormState;
use super::rule::{Action, Rule};
use super::visibility::Visibility;

/// Builder for constructing a [`RuleSet`].
///
/// Rules are defined via closures and kept in declaration order, which is
/// also evaluation order.
///
/// # Example
///
/// ```
/// use taxintake::{RuleSetBuilder, FormState, field};
///
/// let rules = RuleSetBuilder::new()
///     .rule(|r| r.when(field("maritalStatus").eq("separated")).show(["dateOfSeparation"]))
///     .rule(|r| r.when(field("hasDependants").eq(true)).show(["dependants"]))
///     .compile()
///     .unwrap();
///
/// let state = FormState::new().set("maritalStatus", "separated");
/// assert!(rules.evaluate(&state).is_visible("dateOfSeparation"));
/// assert!(!rules.evaluate(&state).is_visible("dependants"));
/// ```
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    rules: Vec<RuleBuilder>,
}

/// Intermediate builder passed to the rule definition closure.
#[derive(Debug, Default)]
pub struct RuleBuilder {
    predicate: Option<Predicate>,
    action: Option<Action>,
    targets: Vec<String>,
}

impl RuleSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a rule. The closure must call `.when(predicate)` and one of the
    /// action methods.
    ///
    /// If either is missing, compilation fails with
    /// [`CompileError::MissingCondition`] or [`CompileError::MissingAction`].
    #[must_use]
    pub fn rule(mut self, f: impl FnOnce(RuleBuilder) -> RuleBuilder) -> Self {
        self.rules.push(f(RuleBuilder::default()));
        self
    }

    /// Compile the rules into an immutable `RuleSet`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if validation fails.
    pub fn compile(self) -> Result<RuleSet, CompileError> {
        let rules = self
            .rules
            .into_iter()
            .enumerate()
            .map(|(index, builder)| builder.finish(index))
            .collect::<Result<Vec<_>, _>>()?;
        crate::compile::compile(rules)
    }
}

impl RuleBuilder {
    /// Set the predicate for this rule.
    #[must_use]
    pub fn when(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    #[must_use]
    pub fn show<I, S>(self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.act(Action::Show, targets)
    }

    #[must_use]
    pub fn hide<I, S>(self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.act(Action::Hide, targets)
    }

    #[must_use]
    pub fn require<I, S>(self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.act(Action::Require, targets)
    }

    #[must_use]
    pub fn optional<I, S>(self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.act(Action::Optional, targets)
    }

    fn act<I, S>(mut self, action: Action, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action = Some(action);
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    fn finish(self, index: usize) -> Result<Rule, CompileError> {
        let predicate = self
            .predicate
            .ok_or(CompileError::MissingCondition { index })?;
        let action = self.action.ok_or_else(|| CompileError::MissingAction {
            index,
            field: predicate.field.clone(),
        })?;
        Ok(Rule {
            predicate,
            action,
            targets: self.targets,
        })
    }
}

/// A compiled, immutable rule table. Thread-safe and designed to live behind `Arc`.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub(crate) rules: Vec<Rule>,
    pub(crate) field_registry: FieldRegistry,
}

impl RuleSet {
    /// Evaluate every rule, in table order, against the given form state.
    pub fn evaluate(&self, state: &FormState) -> Visibility<'_> {
        crate::evaluate::evaluate(&self.rules, &self.field_registry, state)
    }

    /// The set of field names explicitly shown for this form state.
    #[must_use]
    pub fn visible_fields(&self, state: &FormState) -> BTreeSet<String> {
        self.evaluate(state).into_visible()
    }

    /// Evaluate with diagnostics: which rules fired and how long it took.
    pub fn evaluate_detailed(&self, state: &FormState) -> EvaluationReport<'_> {
        crate::evaluate::evaluate_detailed(&self.rules, &self.field_registry, state)
    }

    /// Parse a DSL string and compile into a `RuleSet`.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError`](crate::IntakeError) on parse or compile failure.
    pub fn from_dsl(input: &str) -> Result<Self, crate::IntakeError> {
        let parsed = crate::parse::parse(input)?;
        let ruleset = crate::compile::compile(parsed.rules)?;
        Ok(ruleset)
    }

    /// Read a DSL file and compile into a `RuleSet`.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError`](crate::IntakeError) on I/O, parse, or compile failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::IntakeError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_dsl(&input)
    }

    /// Rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Which fields are read and written by which rules.
    #[must_use]
    pub fn field_registry(&self) -> &FieldRegistry {
        &self.field_registry
    }

    /// Rules whose predicate reads `field`.
    #[must_use]
    pub fn rules_reading(&self, field: &str) -> Vec<&Rule> {
        self.field_registry
            .readers_of(field)
            .iter()
            .map(|&idx| &self.rules[idx])
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RuleSet({} rules, {} sources, {} targets)",
            self.rules.len(),
            self.field_registry.sources().count(),
            self.field_registry.targets().count(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;

    #[test]
    fn builder_collects_rules_in_order() {
        let ruleset = RuleSetBuilder::new()
            .rule(|r| {
                r.when(field("maritalStatus").eq("married"))
                    .show(["spouseFirstName", "spouseLastName"])
            })
            .rule(|r| r.when(field("maritalStatus").eq("separated")).show(["dateOfSeparation"]))
            .compile()
            .unwrap();

        assert_eq!(ruleset.len(), 2);
        assert_eq!(ruleset.rules()[0].targets.len(), 2);
        assert_eq!(ruleset.rules()[1].targets, vec!["dateOfSeparation"]);
        assert_eq!(ruleset.rules_reading("maritalStatus").len(), 2);
    }

    #[test]
    fn builder_rule_without_when_returns_error() {
        let result = RuleSetBuilder::new().rule(|r| r.show(["x"])).compile();
        assert!(matches!(
            result,
            Err(CompileError::MissingCondition { index: 0 })
        ));
    }

    #[test]
    fn builder_rule_without_action_returns_error() {
        let result = RuleSetBuilder::new()
            .rule(|r| r.when(field("a").exists()).show(["x"]))
            .rule(|r| r.when(field("b").exists()))
            .compile();
        assert!(matches!(
            result,
            Err(CompileError::MissingAction { index: 1, field }) if field == "b"
        ));
    }

    #[test]
    fn visible_fields_is_shown_set() {
        let ruleset = RuleSetBuilder::new()
            .rule(|r| r.when(field("hasDependants").eq(true)).show(["dependants"]))
            .compile()
            .unwrap();
        let state = FormState::new().set("hasDependants", true);
        let visible = ruleset.visible_fields(&state);
        assert_eq!(visible.into_iter().collect::<Vec<_>>(), vec!["dependants"]);
    }

    #[test]
    fn display_counts() {
        let ruleset = RuleSetBuilder::new()
            .rule(|r| r.when(field("a").exists()).show(["x", "y"]))
            .rule(|r| r.when(field("a").not_exists()).hide(["y"]))
            .compile()
            .unwrap();
        assert_eq!(ruleset.to_string(), "RuleSet(2 rules, 1 sources, 2 targets)");
    }
}
