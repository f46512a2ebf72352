use std::collections::{BTreeMap, BTreeSet};

use super::rule::{Action, Rule};

/// Index of which rules read and which rules write each field path.
///
/// Built during compilation. A field targeted by at least one `show` rule is
/// *gated*: it stays hidden until some rule shows it.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    sources: BTreeMap<String, Vec<usize>>,
    targets: BTreeMap<String, Vec<usize>>,
    gated: BTreeSet<String>,
}

impl FieldRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record the fields read and written by the rule at `index`.
    pub(crate) fn register(&mut self, index: usize, rule: &Rule) {
        self.sources
            .entry(rule.predicate.field.clone())
            .or_default()
            .push(index);
        for target in &rule.targets {
            self.targets.entry(target.clone()).or_default().push(index);
            if rule.action == Action::Show {
                self.gated.insert(target.clone());
            }
        }
    }

    /// Whether visibility of `field` depends on a `show` rule.
    #[must_use]
    pub fn is_gated(&self, field: &str) -> bool {
        self.gated.contains(field)
    }

    /// Indices of rules whose predicate reads `field`, in table order.
    #[must_use]
    pub fn readers_of(&self, field: &str) -> &[usize] {
        self.sources.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Indices of rules that act on `field`, in table order.
    #[must_use]
    pub fn writers_of(&self, field: &str) -> &[usize] {
        self.targets.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All source field paths, sorted.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// All target field paths, sorted.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;

    fn rule(source: &str, action: Action, targets: &[&str]) -> Rule {
        Rule {
            predicate: field(source).exists(),
            action,
            targets: targets.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    #[test]
    fn register_tracks_readers_and_writers() {
        let mut reg = FieldRegistry::new();
        reg.register(0, &rule("a", Action::Show, &["x", "y"]));
        reg.register(1, &rule("a", Action::Hide, &["y"]));
        assert_eq!(reg.readers_of("a"), &[0, 1]);
        assert_eq!(reg.writers_of("y"), &[0, 1]);
        assert_eq!(reg.writers_of("x"), &[0]);
    }

    #[test]
    fn only_show_targets_are_gated() {
        let mut reg = FieldRegistry::new();
        reg.register(0, &rule("a", Action::Show, &["x"]));
        reg.register(1, &rule("b", Action::Hide, &["z"]));
        reg.register(2, &rule("c", Action::Require, &["w"]));
        assert!(reg.is_gated("x"));
        assert!(!reg.is_gated("z"));
        assert!(!reg.is_gated("w"));
    }

    #[test]
    fn missing_fields_return_empty() {
        let reg = FieldRegistry::new();
        assert!(reg.readers_of("nope").is_empty());
        assert!(reg.writers_of("nope").is_empty());
        assert!(!reg.is_gated("nope"));
        assert_eq!(reg.sources().count(), 0);
    }

    #[test]
    fn sources_and_targets_are_sorted() {
        let mut reg = FieldRegistry::new();
        reg.register(0, &rule("b", Action::Show, &["y"]));
        reg.register(1, &rule("a", Action::Show, &["x"]));
        assert_eq!(reg.sources().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(reg.targets().collect::<Vec<_>>(), vec!["x", "y"]);
    }
}
