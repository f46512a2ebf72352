
use proptest::prelude::*;
use strategies::{arb_form, arb_ruleset, PERSONAL_FIELDS, TARGETS};
use taxintake::{field, steps, Action, FormState, RuleSetBuilder, StepId, Value};

// ---------------------------------------------------------------------------
// Invariant 1: Determinism
//
// The same rule set and form state always produce the same visibility.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn determinism(gen in arb_ruleset(), form in arb_form()) {
        let ruleset = gen.compile();
        let first = ruleset.visible_fields(&form);
        for _ in 0..5 {
            let again = ruleset.visible_fields(&form);
            prop_assert_eq!(&first, &again);
        }
    }

    #[test]
    fn determinism_recompile(gen in arb_ruleset(), form in arb_form()) {
        let a = gen.compile().visible_fields(&form);
        let b = gen.compile().visible_fields(&form);
        prop_assert_eq!(a, b);
    }
}

// ---------------------------------------------------------------------------
// Invariant 2: Last write wins
//
// A target is shown exactly when the last firing show/hide rule naming it is
// a show, and hidden exactly when it is a hide.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn last_write_wins(gen in arb_ruleset(), form in arb_form()) {
        let ruleset = gen.compile();
        let vis = ruleset.evaluate(&form);
        for target in TARGETS {
            match gen.last_display_action(&form, target) {
                Some(Action::Show) => {
                    prop_assert!(vis.visible().contains(*target));
                    prop_assert!(vis.is_visible(target));
                }
                Some(Action::Hide) => {
                    prop_assert!(vis.hidden().contains(*target));
                    prop_assert!(!vis.is_visible(target));
                }
                _ => {
                    prop_assert!(!vis.visible().contains(*target));
                    prop_assert!(!vis.hidden().contains(*target));
                }
            }
        }
    }

    #[test]
    fn shown_and_hidden_disjoint(gen in arb_ruleset(), form in arb_form()) {
        let ruleset = gen.compile();
        let vis = ruleset.evaluate(&form);
        prop_assert!(vis.visible().is_disjoint(vis.hidden()));
    }

    #[test]
    fn fired_indices_are_in_table_order(gen in arb_ruleset(), form in arb_form()) {
        let ruleset = gen.compile();
        let report = ruleset.evaluate_detailed(&form);
        let fired = report.fired();
        prop_assert!(fired.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(fired.iter().all(|&i| i < ruleset.len()));
        let direct = ruleset.evaluate(&form);
        prop_assert_eq!(report.visibility().visible(), direct.visible());
    }
}

// ---------------------------------------------------------------------------
// Invariant 3: Absent sources
//
// An `exists` rule on a field the form does not have never shows anything.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn exists_on_absent_source_never_fires(form in arb_form()) {
        let ruleset = RuleSetBuilder::new()
            .rule(|r| r.when(field("neverSet.nested").exists()).show(["target"]))
            .compile()
            .unwrap();
        let vis = ruleset.evaluate(&form);
        prop_assert!(!vis.is_visible("target"));
        prop_assert!(vis.visible().is_empty());
    }

    #[test]
    fn not_exists_on_absent_source_always_fires(form in arb_form()) {
        let ruleset = RuleSetBuilder::new()
            .rule(|r| r.when(field("neverSet").not_exists()).hide(["target"]))
            .compile()
            .unwrap();
        prop_assert!(ruleset.evaluate(&form).hidden().contains("target"));
    }
}

// ---------------------------------------------------------------------------
// Invariant 4: Step monotonicity
//
// Filling in a step's missing required fields never makes it incomplete.
// ---------------------------------------------------------------------------

fn fill(form: &FormState, fields: &[(&str, Value)]) -> FormState {
    let mut filled = form.clone();
    for (path, value) in fields {
        filled.insert(path, value.clone());
    }
    filled
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn marital_step_monotonic(form in arb_form()) {
        let spouse = [
            ("spouseFirstName", Value::from("Sam")),
            ("spouseLastName", Value::from("Doe")),
            ("dateOfMarriage", Value::from("2015-06-20")),
        ];
        let before = steps::is_step_complete(&form, StepId::MaritalStatus);
        let after = steps::is_step_complete(&fill(&form, &spouse), StepId::MaritalStatus);
        prop_assert!(!before || after);
        if form.has("maritalStatus") {
            prop_assert!(after);
        }
    }

    #[test]
    fn getting_started_monotonic(form in arb_form()) {
        let required = [
            ("province", Value::from("ON")),
            ("taxYear", Value::from(2025_i64)),
            ("filingType", Value::from("personal")),
            ("privacyConsent", Value::from(true)),
        ];
        let before = steps::is_step_complete(&form, StepId::GettingStarted);
        let after = steps::is_step_complete(&fill(&form, &required), StepId::GettingStarted);
        prop_assert!(!before || after);
        prop_assert!(after);
    }

    #[test]
    fn personal_info_monotonic(form in arb_form()) {
        let required: Vec<(&str, Value)> = PERSONAL_FIELDS
            .iter()
            .map(|name| (*name, Value::from("filled")))
            .collect();
        let before = steps::is_step_complete(&form, StepId::PersonalInfo);
        let after = steps::is_step_complete(&fill(&form, &required), StepId::PersonalInfo);
        prop_assert!(!before || after);
        prop_assert!(after);
    }

    #[test]
    fn residency_monotonic(form in arb_form()) {
        let required = [
            ("isCanadianCitizen", Value::from(false)),
            ("isFullYearResident", Value::from(false)),
            ("dateOfEntry", Value::from("2024-03-01")),
        ];
        let before = steps::is_step_complete(&form, StepId::Residency);
        let after = steps::is_step_complete(&fill(&form, &required), StepId::Residency);
        prop_assert!(!before || after);
        prop_assert!(after);
    }

    #[test]
    fn part_year_residency_hinges_on_entry_date(form in arb_form()) {
        let answered = form.get("isCanadianCitizen").is_some()
            && form.get("isFullYearResident").is_some();
        let complete = steps::is_step_complete(&form, StepId::Residency);
        if !answered {
            prop_assert!(!complete);
        } else if form.is_truthy("isFullYearResident") {
            prop_assert!(complete);
        } else {
            prop_assert_eq!(complete, form.is_truthy("dateOfEntry"));
        }
    }

    #[test]
    fn dependants_monotonic(form in arb_form()) {
        let mut kid = std::collections::BTreeMap::new();
        kid.insert("firstName".to_owned(), Value::from("Ash"));
        let required = [
            ("hasDependants", Value::from(true)),
            ("dependants", Value::List(vec![Value::Map(kid)])),
        ];
        let before = steps::is_step_complete(&form, StepId::Dependants);
        let after = steps::is_step_complete(&fill(&form, &required), StepId::Dependants);
        prop_assert!(!before || after);
        prop_assert!(after);
    }

    #[test]
    fn dependants_yes_needs_a_non_empty_list(form in arb_form()) {
        let complete = steps::is_step_complete(&form, StepId::Dependants);
        match form.get("hasDependants") {
            None => {
                prop_assert!(!complete);
            }
            Some(Value::Bool(true)) => {
                prop_assert_eq!(complete, !form.list("dependants").is_empty());
            }
            Some(_) => {
                prop_assert!(complete);
            }
        }
    }

    #[test]
    fn income_slips_monotonic(form in arb_form()) {
        let mut slip = std::collections::BTreeMap::new();
        slip.insert("employerName".to_owned(), Value::from("ACME"));
        let required = [("incomeSlips.t4", Value::List(vec![Value::Map(slip)]))];
        let before = steps::is_step_complete(&form, StepId::IncomeSlips);
        let after = steps::is_step_complete(&fill(&form, &required), StepId::IncomeSlips);
        prop_assert!(!before || after);
        prop_assert!(after);
    }

    #[test]
    fn deductions_always_complete(form in arb_form()) {
        prop_assert!(steps::is_step_complete(&form, StepId::Deductions));
    }

    #[test]
    fn review_monotonic(form in arb_form()) {
        let required = [
            ("accuracyDeclaration", Value::from(true)),
            ("consentCheckbox", Value::from(true)),
            ("digitalSignature", Value::from("Sam Doe")),
        ];
        let before = steps::is_step_complete(&form, StepId::Review);
        let after = steps::is_step_complete(&fill(&form, &required), StepId::Review);
        prop_assert!(!before || after);
        prop_assert!(after);
    }

    #[test]
    fn progress_never_exceeds_total(form in arb_form()) {
        let progress = steps::progress(&form);
        prop_assert!(progress.completed <= progress.total);
        prop_assert!((0.0..=100.0).contains(&progress.percentage));
    }
}
