mod error;
mod grammar;
mod parser;

pub use error::ParseError;
pub use parser::ParsedRules;

/// Parse rule-table text into [`ParsedRules`].
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not valid rule syntax.
pub fn parse(input: &str) -> Result<ParsedRules, ParseError> {
    use winnow::Parser;
    grammar::parse_rules
        .parse(input)
        .map_err(|e| ParseError::new(e.offset(), e.to_string()))
}
