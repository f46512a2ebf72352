//! The questionnaire's ordered steps, their completion gates and navigation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{FormState, Value};

/// Identifier of a questionnaire step, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    GettingStarted,
    PersonalInfo,
    Residency,
    MaritalStatus,
    Dependants,
    IncomeSlips,
    Deductions,
    Review,
}

/// Returned when a step name does not match any known step.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown step '{0}'")]
pub struct UnknownStepError(pub String);

impl StepId {
    pub const ALL: [StepId; 8] = [
        StepId::GettingStarted,
        StepId::PersonalInfo,
        StepId::Residency,
        StepId::MaritalStatus,
        StepId::Dependants,
        StepId::IncomeSlips,
        StepId::Deductions,
        StepId::Review,
    ];

    /// Kebab-case name used in URLs and drafts.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::GettingStarted => "getting-started",
            StepId::PersonalInfo => "personal-info",
            StepId::Residency => "residency",
            StepId::MaritalStatus => "marital-status",
            StepId::Dependants => "dependants",
            StepId::IncomeSlips => "income-slips",
            StepId::Deductions => "deductions",
            StepId::Review => "review",
        }
    }

    #[must_use]
    pub fn step(self) -> &'static Step {
        &STEPS[self as usize]
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = UnknownStepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownStepError(s.to_owned()))
    }
}

/// A static questionnaire section.
#[derive(Debug)]
pub struct Step {
    pub id: StepId,
    pub title: &'static str,
    pub description: &'static str,
    /// Top-level fields the step collects, used for completion percentage.
    pub fields: &'static [&'static str],
    completed: fn(&FormState) -> bool,
    visible: fn(&FormState) -> bool,
}

impl Step {
    #[must_use]
    pub fn is_complete(&self, state: &FormState) -> bool {
        (self.completed)(state)
    }

    #[must_use]
    pub fn is_visible(&self, state: &FormState) -> bool {
        (self.visible)(state)
    }
}

/// Completed versus visible steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percentage: f64,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} steps complete ({:.0}%)",
            self.completed, self.total, self.percentage
        )
    }
}

static STEPS: [Step; 8] = [
    Step {
        id: StepId::GettingStarted,
        title: "Getting Started",
        description: "Basic information about your tax situation",
        fields: &["province", "taxYear", "filingType", "privacyConsent"],
        completed: getting_started_complete,
        visible: always,
    },
    Step {
        id: StepId::PersonalInfo,
        title: "Personal Information",
        description: "Your contact and identification details",
        fields: &["firstName", "lastName", "email", "phone", "address", "city", "postalCode"],
        completed: personal_info_complete,
        visible: always,
    },
    Step {
        id: StepId::Residency,
        title: "Residency Status",
        description: "Your residency status for tax purposes",
        fields: &[
            "isCanadianCitizen",
            "residencyStatus",
            "isFullYearResident",
            "dateOfEntry",
            "previousCountry",
        ],
        completed: residency_complete,
        visible: always,
    },
    Step {
        id: StepId::MaritalStatus,
        title: "Marital Status",
        description: "Your marital status and spouse information",
        fields: &[
            "maritalStatus",
            "spouseFirstName",
            "spouseLastName",
            "spouseDateOfBirth",
            "dateOfMarriage",
        ],
        completed: marital_status_complete,
        visible: always,
    },
    Step {
        id: StepId::Dependants,
        title: "Dependants",
        description: "Information about your dependants",
        fields: &["hasDependants", "dependants"],
        completed: dependants_complete,
        visible: always,
    },
    Step {
        id: StepId::IncomeSlips,
        title: "Income Slips",
        description: "Your T-slips and other income sources",
        fields: &["incomeSlips", "otherIncomeSources"],
        completed: income_slips_complete,
        visible: always,
    },
    Step {
        id: StepId::Deductions,
        title: "Deductions & Credits",
        description: "Tax deductions and credits you may be eligible for",
        fields: &["deductions"],
        completed: always,
        visible: always,
    },
    Step {
        id: StepId::Review,
        title: "Review & Submit",
        description: "Review your information and submit",
        fields: &["accuracyDeclaration", "consentCheckbox", "digitalSignature"],
        completed: review_complete,
        visible: always,
    },
];

fn always(_: &FormState) -> bool {
    true
}

fn getting_started_complete(state: &FormState) -> bool {
    state.is_truthy("province")
        && state.is_truthy("taxYear")
        && state.is_truthy("filingType")
        && state.is_truthy("privacyConsent")
}

fn personal_info_complete(state: &FormState) -> bool {
    ["firstName", "lastName", "email", "address", "city", "postalCode"]
        .iter()
        .all(|name| state.is_truthy(name))
}

fn residency_complete(state: &FormState) -> bool {
    // Any stored answer counts, including an empty string.
    if state.get("isCanadianCitizen").is_none() || state.get("isFullYearResident").is_none() {
        return false;
    }
    state.is_truthy("isFullYearResident") || state.is_truthy("dateOfEntry")
}

fn marital_status_complete(state: &FormState) -> bool {
    if !state.is_truthy("maritalStatus") {
        return false;
    }
    match state.get_str("maritalStatus") {
        Some("married" | "common-law") => {
            state.is_truthy("spouseFirstName")
                && state.is_truthy("spouseLastName")
                && state.is_truthy("dateOfMarriage")
        }
        _ => true,
    }
}

fn dependants_complete(state: &FormState) -> bool {
    if state.get("hasDependants").is_none() {
        return false;
    }
    !state.is_truthy("hasDependants") || !state.list("dependants").is_empty()
}

fn income_slips_complete(state: &FormState) -> bool {
    let has_slips = state
        .get("incomeSlips")
        .and_then(Value::as_map)
        .is_some_and(|slips| {
            slips
                .values()
                .any(|kind| kind.as_list().is_some_and(|items| !items.is_empty()))
        });
    has_slips || state.is_truthy("otherIncomeSources")
}

fn review_complete(state: &FormState) -> bool {
    state.is_truthy("accuracyDeclaration")
        && state.is_truthy("consentCheckbox")
        && state.is_truthy("digitalSignature")
}

/// All steps in display order.
#[must_use]
pub fn steps() -> &'static [Step] {
    &STEPS
}

/// Whether the named step's completion gate passes.
#[must_use]
pub fn is_step_complete(state: &FormState, id: StepId) -> bool {
    id.step().is_complete(state)
}

/// Steps shown for this form state, in display order.
#[must_use]
pub fn visible_steps(state: &FormState) -> Vec<&'static Step> {
    STEPS.iter().filter(|s| s.is_visible(state)).collect()
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress(state: &FormState) -> Progress {
    let visible = visible_steps(state);
    let completed = visible.iter().filter(|s| s.is_complete(state)).count();
    let total = visible.len();
    let percentage = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };
    Progress {
        completed,
        total,
        percentage,
    }
}

/// Position of `id` among the visible steps.
#[must_use]
pub fn index_of(state: &FormState, id: StepId) -> Option<usize> {
    visible_steps(state).iter().position(|s| s.id == id)
}

#[must_use]
pub fn next_step(state: &FormState, id: StepId) -> Option<StepId> {
    let visible = visible_steps(state);
    let index = visible.iter().position(|s| s.id == id)?;
    visible.get(index + 1).map(|s| s.id)
}

#[must_use]
pub fn previous_step(state: &FormState, id: StepId) -> Option<StepId> {
    let visible = visible_steps(state);
    let index = visible.iter().position(|s| s.id == id)?;
    index.checked_sub(1).and_then(|i| visible.get(i)).map(|s| s.id)
}

#[must_use]
pub fn is_first(state: &FormState, id: StepId) -> bool {
    index_of(state, id) == Some(0)
}

#[must_use]
pub fn is_last(state: &FormState, id: StepId) -> bool {
    let total = visible_steps(state).len();
    total > 0 && index_of(state, id) == Some(total - 1)
}

/// The client may leave `id` for the next step only once it is complete.
#[must_use]
pub fn can_proceed(state: &FormState, id: StepId) -> bool {
    is_step_complete(state, id)
}

/// Share of the step's fields that hold a present value, from 0 to 100.
/// Hidden steps report 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn completion_percentage(state: &FormState, id: StepId) -> f64 {
    let step = id.step();
    if !step.is_visible(state) || step.fields.is_empty() {
        return 0.0;
    }
    let answered = step.fields.iter().filter(|f| state.has(f)).count();
    answered as f64 / step.fields.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_table_matches_ids() {
        for (index, step) in steps().iter().enumerate() {
            assert_eq!(step.id as usize, index);
            assert_eq!(StepId::ALL[index], step.id);
        }
    }

    #[test]
    fn step_id_round_trips_through_names() {
        for id in StepId::ALL {
            assert_eq!(id.as_str().parse::<StepId>().unwrap(), id);
        }
        assert_eq!(
            "summary".parse::<StepId>(),
            Err(UnknownStepError("summary".to_owned()))
        );
    }

    #[test]
    fn step_id_serde_uses_kebab_case() {
        let json = serde_json::to_string(&StepId::MaritalStatus).unwrap();
        assert_eq!(json, "\"marital-status\"");
    }

    #[test]
    fn getting_started_requires_consent() {
        let state = FormState::new()
            .set("province", "ON")
            .set("taxYear", "2024")
            .set("filingType", "personal");
        assert!(!is_step_complete(&state, StepId::GettingStarted));
        let state = state.set("privacyConsent", true);
        assert!(is_step_complete(&state, StepId::GettingStarted));
    }

    #[test]
    fn married_needs_spouse_details() {
        let state = FormState::new().set("maritalStatus", "married");
        assert!(!is_step_complete(&state, StepId::MaritalStatus));
        let state = state
            .set("spouseFirstName", "Sam")
            .set("spouseLastName", "Lee")
            .set("dateOfMarriage", "2015-06-20");
        assert!(is_step_complete(&state, StepId::MaritalStatus));
    }

    #[test]
    fn single_needs_nothing_else() {
        let state = FormState::new().set("maritalStatus", "single");
        assert!(is_step_complete(&state, StepId::MaritalStatus));
        assert!(!is_step_complete(&FormState::new(), StepId::MaritalStatus));
    }

    #[test]
    fn residency_part_year_needs_entry_date() {
        let state = FormState::new()
            .set("isCanadianCitizen", false)
            .set("isFullYearResident", false);
        assert!(!is_step_complete(&state, StepId::Residency));
        let state = state.set("dateOfEntry", "2024-03-01");
        assert!(is_step_complete(&state, StepId::Residency));
    }

    #[test]
    fn residency_requires_both_answers() {
        let state = FormState::new().set("isFullYearResident", true);
        assert!(!is_step_complete(&state, StepId::Residency));
        let state = state.set("isCanadianCitizen", true);
        assert!(is_step_complete(&state, StepId::Residency));
    }

    #[test]
    fn stored_empty_answers_count_as_answered() {
        let state = FormState::new()
            .set("isCanadianCitizen", "")
            .set("isFullYearResident", true);
        assert!(is_step_complete(&state, StepId::Residency));
        let state = FormState::new().set("hasDependants", "");
        assert!(is_step_complete(&state, StepId::Dependants));
        let state = FormState::new().set("isFullYearResident", "");
        assert!(!is_step_complete(&state, StepId::Residency));
    }

    #[test]
    fn marital_status_only_needs_a_truthy_answer() {
        let state = FormState::new().set("maritalStatus", 1_i64);
        assert!(is_step_complete(&state, StepId::MaritalStatus));
        let state = FormState::new().set("maritalStatus", false);
        assert!(!is_step_complete(&state, StepId::MaritalStatus));
        let state = FormState::new().set("maritalStatus", "");
        assert!(!is_step_complete(&state, StepId::MaritalStatus));
    }

    #[test]
    fn dependants_yes_needs_a_list() {
        let state = FormState::new().set("hasDependants", false);
        assert!(is_step_complete(&state, StepId::Dependants));
        let state = FormState::new()
            .set("hasDependants", true)
            .set("dependants", Value::List(vec![]));
        assert!(!is_step_complete(&state, StepId::Dependants));
        let state = state.set(
            "dependants",
            Value::List(vec![Value::Map(Default::default())]),
        );
        assert!(is_step_complete(&state, StepId::Dependants));
    }

    #[test]
    fn income_slips_any_kind_counts() {
        let empty = FormState::new().set("incomeSlips.t4", Value::List(vec![]));
        assert!(!is_step_complete(&empty, StepId::IncomeSlips));
        let rc62 = FormState::new().set("incomeSlips.rc62", Value::List(vec![Value::from("x")]));
        assert!(is_step_complete(&rc62, StepId::IncomeSlips));
        let other = FormState::new().set("otherIncomeSources", "rental income");
        assert!(is_step_complete(&other, StepId::IncomeSlips));
    }

    #[test]
    fn deductions_always_complete() {
        assert!(is_step_complete(&FormState::new(), StepId::Deductions));
    }

    #[test]
    fn review_needs_declarations_and_signature() {
        let state = FormState::new()
            .set("accuracyDeclaration", true)
            .set("consentCheckbox", true);
        assert!(!is_step_complete(&state, StepId::Review));
        assert!(is_step_complete(
            &state.set("digitalSignature", "Alex Doe"),
            StepId::Review
        ));
    }

    #[test]
    fn progress_counts_completed_steps() {
        let state = FormState::new();
        let p = progress(&state);
        assert_eq!(p.total, 8);
        assert_eq!(p.completed, 1);
        assert!((p.percentage - 12.5).abs() < f64::EPSILON);
        assert!(p.to_string().starts_with("1/8 steps complete"));
    }

    #[test]
    fn navigation() {
        let state = FormState::new();
        assert_eq!(next_step(&state, StepId::GettingStarted), Some(StepId::PersonalInfo));
        assert_eq!(next_step(&state, StepId::Review), None);
        assert_eq!(previous_step(&state, StepId::GettingStarted), None);
        assert_eq!(previous_step(&state, StepId::Review), Some(StepId::Deductions));
        assert!(is_first(&state, StepId::GettingStarted));
        assert!(is_last(&state, StepId::Review));
        assert!(!is_last(&state, StepId::Deductions));
        assert_eq!(index_of(&state, StepId::Residency), Some(2));
        assert!(can_proceed(&state, StepId::Deductions));
        assert!(!can_proceed(&state, StepId::Review));
    }

    #[test]
    fn completion_percentage_counts_present_fields() {
        let state = FormState::new()
            .set("hasDependants", true)
            .set("accuracyDeclaration", false)
            .set("digitalSignature", "");
        assert!((completion_percentage(&state, StepId::Dependants) - 50.0).abs() < 1e-9);
        let review = completion_percentage(&state, StepId::Review);
        assert!((review - 100.0 / 3.0).abs() < 1e-9);
        assert!(completion_percentage(&FormState::new(), StepId::Deductions).abs() < f64::EPSILON);
    }
}
