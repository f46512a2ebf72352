use std::collections::BTreeSet;
use std::fmt;

use super::field_registry::FieldRegistry;
use super::rule::Action;

/// Outcome of evaluating a [`RuleSet`](super::RuleSet) against a form state.
///
/// Borrows the rule set's registry so that fields no `show` rule governs can be
/// answered as visible by default.
#[derive(Debug, Clone)]
#[must_use]
pub struct Visibility<'r> {
    shown: BTreeSet<String>,
    hidden: BTreeSet<String>,
    required: BTreeSet<String>,
    registry: &'r FieldRegistry,
}

impl<'r> Visibility<'r> {
    pub(crate) fn new(registry: &'r FieldRegistry) -> Self {
        Self {
            shown: BTreeSet::new(),
            hidden: BTreeSet::new(),
            required: BTreeSet::new(),
            registry,
        }
    }

    /// Apply one fired rule. Later calls win over earlier ones for the same field.
    pub(crate) fn apply(&mut self, action: Action, targets: &[String]) {
        for target in targets {
            match action {
                Action::Show => {
                    self.hidden.remove(target);
                    self.shown.insert(target.clone());
                }
                Action::Hide => {
                    self.shown.remove(target);
                    self.hidden.insert(target.clone());
                }
                Action::Require => {
                    self.required.insert(target.clone());
                }
                Action::Optional => {
                    self.required.remove(target);
                }
            }
        }
    }

    /// Fields explicitly shown by a rule.
    #[must_use]
    pub fn visible(&self) -> &BTreeSet<String> {
        &self.shown
    }

    /// Fields explicitly hidden by a rule.
    #[must_use]
    pub fn hidden(&self) -> &BTreeSet<String> {
        &self.hidden
    }

    /// Fields a rule marked as required.
    #[must_use]
    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    /// Whether `field` should be rendered. Shown and hidden fields follow the
    /// last rule that touched them; untouched fields are visible unless a
    /// `show` rule gates them.
    #[must_use]
    pub fn is_visible(&self, field: &str) -> bool {
        if self.shown.contains(field) {
            return true;
        }
        if self.hidden.contains(field) {
            return false;
        }
        !self.registry.is_gated(field)
    }

    #[must_use]
    pub fn is_required(&self, field: &str) -> bool {
        self.required.contains(field)
    }

    /// Consume into the set of shown field names.
    #[must_use]
    pub fn into_visible(self) -> BTreeSet<String> {
        self.shown
    }
}

impl fmt::Display for Visibility<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(", ");
        write!(
            f,
            "shown: [{}], hidden: [{}]",
            join(&self.shown),
            join(&self.hidden)
        )
    }
}
