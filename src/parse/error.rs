use std::fmt;

/// Errors produced when parsing rule-table text.
#[derive(Debug)]
pub struct ParseError {
    offset: usize,
    message: String,
}

impl ParseError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }

    /// Byte offset into the input where parsing stopped.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at byte {}: {}", self.offset, self.message)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ParseError::new(12, "expected action");
        assert_eq!(err.to_string(), "parse error at byte 12: expected action");
        assert_eq!(err.offset(), 12);
    }

    #[test]
    fn parse_failure_reports_offset() {
        let err = crate::parse::parse("when x exists flip y").unwrap_err();
        assert!((13..=14).contains(&err.offset()));
    }
}
