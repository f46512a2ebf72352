use winnow::ascii::{dec_int, till_line_ending};
use winnow::combinator::{alt, cut_err, preceded, repeat, separated};
use winnow::error::{ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, take_while};

use crate::{Action, Condition, Predicate, Rule, Value};

use super::parser::ParsedRules;

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

// -- Field paths ------------------------------------------------------------

fn path<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| {
            c.is_ascii_alphanumeric() || c == '_' || c == '.'
        }),
    )
        .take()
        .parse_next(input)
}

// -- Values -----------------------------------------------------------------

fn string_literal(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            '"' => return Ok(s),
            '\\' => {
                let esc = any.parse_next(input)?;
                match esc {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

fn negative_number(input: &mut &str) -> ModalResult<Value> {
    let neg_str = (
        '-',
        take_while(1.., |c: char| c.is_ascii_digit() || c == '.'),
    )
        .take()
        .parse_next(input)?;
    if neg_str.contains('.') {
        let f: f64 = neg_str
            .parse()
            .map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(Value::Float(f))
    } else {
        let i: i64 = neg_str
            .parse()
            .map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(Value::Int(i))
    }
}

fn float_literal(input: &mut &str) -> ModalResult<f64> {
    (
        take_while(1.., |c: char| c.is_ascii_digit()),
        '.',
        take_while(1.., |c: char| c.is_ascii_digit()),
    )
        .take()
        .try_map(|s: &str| s.parse::<f64>())
        .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<Value> {
    alt((
        negative_number,
        float_literal.map(Value::Float),
        dec_int::<_, i64, _>.map(Value::Int),
    ))
    .parse_next(input)
}

fn value(input: &mut &str) -> ModalResult<Value> {
    ws.parse_next(input)?;
    alt((
        string_literal.map(Value::String),
        "true".value(Value::Bool(true)),
        "false".value(Value::Bool(false)),
        number,
    ))
    .context(StrContext::Expected(StrContextValue::Description("value")))
    .parse_next(input)
}

fn bound(input: &mut &str) -> ModalResult<f64> {
    ws.parse_next(input)?;
    number
        .map(|n| n.as_f64().unwrap_or_default())
        .context(StrContext::Expected(StrContextValue::Description(
            "numeric bound",
        )))
        .parse_next(input)
}

// -- Conditions -------------------------------------------------------------

fn condition(input: &mut &str) -> ModalResult<Condition> {
    ws.parse_next(input)?;
    alt((
        preceded("==", cut_err(value)).map(Condition::Equals),
        preceded("!=", cut_err(value)).map(Condition::NotEquals),
        preceded('>', cut_err(bound)).map(Condition::GreaterThan),
        preceded('<', cut_err(bound)).map(Condition::LessThan),
        "exists".value(Condition::Exists),
        preceded(("not", ws), cut_err("exists")).value(Condition::NotExists),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "condition",
    )))
    .parse_next(input)
}

// -- Actions & targets ------------------------------------------------------

fn action(input: &mut &str) -> ModalResult<Action> {
    ws.parse_next(input)?;
    alt((
        "show".value(Action::Show),
        "hide".value(Action::Hide),
        "require".value(Action::Require),
        "optional".value(Action::Optional),
    ))
    .context(StrContext::Expected(StrContextValue::Description("action")))
    .parse_next(input)
}

fn target(input: &mut &str) -> ModalResult<String> {
    ws.parse_next(input)?;
    path.map(str::to_owned)
        .context(StrContext::Expected(StrContextValue::Description(
            "target field",
        )))
        .parse_next(input)
}

fn targets(input: &mut &str) -> ModalResult<Vec<String>> {
    separated(1.., target, (ws, ',')).parse_next(input)
}

// -- Rule definitions -------------------------------------------------------

fn rule_def(input: &mut &str) -> ModalResult<Rule> {
    ws.parse_next(input)?;
    "when".parse_next(input)?;
    ws.parse_next(input)?;

    let source = cut_err(path)
        .context(StrContext::Expected(StrContextValue::Description(
            "source field",
        )))
        .parse_next(input)?;

    let condition = cut_err(condition).parse_next(input)?;
    let action = cut_err(action).parse_next(input)?;
    let targets = cut_err(targets).parse_next(input)?;

    Ok(Rule {
        predicate: Predicate {
            field: source.to_owned(),
            condition,
        },
        action,
        targets,
    })
}

// -- Top-level parser -------------------------------------------------------

pub fn parse_rules(input: &mut &str) -> ModalResult<ParsedRules> {
    let rules: Vec<Rule> = repeat(0.., rule_def).parse_next(input)?;
    ws.parse_next(input)?;
    Ok(ParsedRules { rules })
}

#[cfg(test)]
mod tests {
    use crate::parse::parse;

    use super::*;

    #[test]
    fn parse_single_show_rule() {
        let result = parse(r#"when maritalStatus == "separated" show dateOfSeparation"#).unwrap();
        assert_eq!(result.rules.len(), 1);
        let rule = &result.rules[0];
        assert_eq!(rule.predicate.field, "maritalStatus");
        assert_eq!(
            rule.predicate.condition,
            Condition::Equals(Value::String("separated".into()))
        );
        assert_eq!(rule.action, Action::Show);
        assert_eq!(rule.targets, vec!["dateOfSeparation"]);
    }

    #[test]
    fn parse_multiple_targets() {
        let result = parse(
            r#"when maritalStatus == "married" show spouseFirstName, spouseLastName,
                   spouseSin, dateOfMarriage"#,
        )
        .unwrap();
        assert_eq!(result.rules[0].targets.len(), 4);
        assert_eq!(result.rules[0].targets[3], "dateOfMarriage");
    }

    #[test]
    fn parse_all_conditions() {
        let cases = [
            ("x == 1", Condition::Equals(Value::Int(1))),
            ("x != false", Condition::NotEquals(Value::Bool(false))),
            ("x exists", Condition::Exists),
            ("x not exists", Condition::NotExists),
            ("x > 0", Condition::GreaterThan(0.0)),
            ("x < -2.5", Condition::LessThan(-2.5)),
        ];
        for (text, expected) in cases {
            let input = format!("when {text} show y");
            let result = parse(&input).unwrap();
            assert_eq!(result.rules[0].predicate.condition, expected, "failed for {text}");
        }
    }

    #[test]
    fn parse_all_actions() {
        let cases = [
            ("show", Action::Show),
            ("hide", Action::Hide),
            ("require", Action::Require),
            ("optional", Action::Optional),
        ];
        for (word, expected) in cases {
            let input = format!("when x exists {word} y");
            let result = parse(&input).unwrap();
            assert_eq!(result.rules[0].action, expected, "failed for {word}");
        }
    }

    #[test]
    fn parse_all_value_types() {
        let cases = [
            ("42", Value::Int(42)),
            ("3.5", Value::Float(3.5)),
            ("true", Value::Bool(true)),
            ("false", Value::Bool(false)),
            (r#""ON""#, Value::String("ON".into())),
            ("-5", Value::Int(-5)),
        ];
        for (literal, expected) in cases {
            let input = format!("when x == {literal} show y");
            let result = parse(&input).unwrap();
            assert_eq!(
                result.rules[0].predicate.condition,
                Condition::Equals(expected),
                "failed for {literal}"
            );
        }
    }

    #[test]
    fn parse_dotted_paths() {
        let result = parse("when incomeSlips.t4 exists show deductions.employmentExpenses").unwrap();
        assert_eq!(result.rules[0].predicate.field, "incomeSlips.t4");
        assert_eq!(result.rules[0].targets, vec!["deductions.employmentExpenses"]);
    }

    #[test]
    fn parse_comments_ignored() {
        let input = "# Residency\nwhen isFullYearResident == false # part-year\n    show dateOfEntry";
        let result = parse(input).unwrap();
        assert_eq!(result.rules.len(), 1);
    }

    #[test]
    fn parse_multiple_rules_keep_order() {
        let input = "when a exists show x\nwhen b exists hide x\nwhen c exists require x";
        let result = parse(input).unwrap();
        assert_eq!(result.rules.len(), 3);
        assert_eq!(result.rules[0].predicate.field, "a");
        assert_eq!(result.rules[2].action, Action::Require);
    }

    #[test]
    fn parse_empty_input() {
        assert!(parse("").unwrap().rules.is_empty());
        assert!(parse("  # only a comment\n").unwrap().rules.is_empty());
    }

    #[test]
    fn parse_string_with_escapes() {
        let result = parse(r#"when x == "a\"b\\c" show y"#).unwrap();
        assert_eq!(
            result.rules[0].predicate.condition,
            Condition::Equals(Value::String("a\"b\\c".into()))
        );
    }

    #[test]
    fn parse_rejects_non_numeric_bound() {
        assert!(parse(r#"when x > "ten" show y"#).is_err());
    }

    #[test]
    fn parse_rejects_missing_action() {
        assert!(parse("when x exists y").is_err());
    }

    #[test]
    fn parse_rejects_missing_targets() {
        assert!(parse("when x exists show").is_err());
    }

    #[test]
    fn parse_rejects_unknown_operator() {
        assert!(parse("when x >= 1 show y").is_err());
    }
}
