use crate::Rule;

/// Rules read from text, in the order they appeared.
#[derive(Debug)]
pub struct ParsedRules {
    pub rules: Vec<Rule>,
}
