use crate::{CompileError, FieldRegistry, Rule, RuleSet};

pub(crate) fn compile(rules: Vec<Rule>) -> Result<RuleSet, CompileError> {
    check_targets(&rules)?;
    check_paths(&rules)?;

    let mut field_registry = FieldRegistry::new();
    for (index, rule) in rules.iter().enumerate() {
        field_registry.register(index, rule);
    }

    Ok(RuleSet {
        rules,
        field_registry,
    })
}

fn check_targets(rules: &[Rule]) -> Result<(), CompileError> {
    for (index, rule) in rules.iter().enumerate() {
        if rule.targets.is_empty() {
            return Err(CompileError::NoTargets {
                index,
                field: rule.predicate.field.clone(),
            });
        }
    }
    Ok(())
}

fn check_paths(rules: &[Rule]) -> Result<(), CompileError> {
    for (index, rule) in rules.iter().enumerate() {
        let paths = std::iter::once(&rule.predicate.field).chain(&rule.targets);
        for path in paths {
            if !is_valid_path(path) {
                return Err(CompileError::InvalidPath {
                    index,
                    path: path.clone(),
                });
            }
        }
    }
    Ok(())
}

/// A path is one or more non-empty, whitespace-free segments joined by `.`.
fn is_valid_path(path: &str) -> bool {
    path.split('.')
        .all(|segment| !segment.is_empty() && !segment.contains(char::is_whitespace))
}
