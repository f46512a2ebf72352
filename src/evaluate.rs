use std::time::Instant;

use crate::{EvaluationReport, FieldRegistry, FormState, Rule, Visibility};

pub(crate) fn evaluate<'r>(
    rules: &[Rule],
    registry: &'r FieldRegistry,
    state: &FormState,
) -> Visibility<'r> {
    let mut visibility = Visibility::new(registry);
    for rule in rules {
        if fires(rule, state) {
            visibility.apply(rule.action, &rule.targets);
        }
    }
    visibility
}

pub(crate) fn evaluate_detailed<'r>(
    rules: &[Rule],
    registry: &'r FieldRegistry,
    state: &FormState,
) -> EvaluationReport<'r> {
    let start = Instant::now();
    let mut visibility = Visibility::new(registry);
    let mut fired = Vec::new();

    for (index, rule) in rules.iter().enumerate() {
        if fires(rule, state) {
            visibility.apply(rule.action, &rule.targets);
            fired.push(index);
        }
    }

    let duration = start.elapsed();
    tracing::trace!(fired = fired.len(), ?duration, "evaluated visibility rules");
    EvaluationReport::new(visibility, fired, duration)
}

fn fires(rule: &Rule, state: &FormState) -> bool {
    rule.predicate
        .condition
        .holds(state.get(&rule.predicate.field))
}
