use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("rule {index} has no condition")]
    MissingCondition { index: usize },

    #[error("rule {index} on '{field}' has no action")]
    MissingAction { index: usize, field: String },

    #[error("rule {index} on '{field}' has no target fields")]
    NoTargets { index: usize, field: String },

    #[error("invalid field path '{path}' in rule {index}")]
    InvalidPath { index: usize, path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_condition_message() {
        let err = CompileError::MissingCondition { index: 2 };
        assert_eq!(err.to_string(), "rule 2 has no condition");
    }

    #[test]
    fn missing_action_message() {
        let err = CompileError::MissingAction {
            index: 0,
            field: "maritalStatus".into(),
        };
        assert_eq!(err.to_string(), "rule 0 on 'maritalStatus' has no action");
    }

    #[test]
    fn no_targets_message() {
        let err = CompileError::NoTargets {
            index: 4,
            field: "hasDependants".into(),
        };
        assert_eq!(
            err.to_string(),
            "rule 4 on 'hasDependants' has no target fields"
        );
    }

    #[test]
    fn invalid_path_message() {
        let err = CompileError::InvalidPath {
            index: 1,
            path: "deductions..rrsp".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid field path 'deductions..rrsp' in rule 1"
        );
    }
}
