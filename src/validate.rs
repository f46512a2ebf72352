//! Submission-time validation of a completed form.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::steps::{is_step_complete, StepId};
use crate::{FormState, Value};

pub const MINIMUM_AGE: u32 = 18;

pub const PROVINCES: [&str; 13] = [
    "AB", "BC", "MB", "NB", "NL", "NS", "NT", "NU", "ON", "PE", "QC", "SK", "YT",
];
pub const FILING_TYPES: [&str; 3] = ["personal", "business", "both"];
pub const MARITAL_STATUSES: [&str; 6] = [
    "single",
    "married",
    "common-law",
    "separated",
    "divorced",
    "widowed",
];
pub const RESIDENCY_STATUSES: [&str; 4] = ["factual", "deemed", "non-resident", "newcomer"];

static SIN_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{3}-\d{3}-\d{3}$").ok());
static POSTAL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Z]\d[A-Z]\s?\d[A-Z]\d$").ok());
static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every check that failed, in the order they were run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("form has {} validation error(s)", .errors.len())]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// First error reported against `field`.
    #[must_use]
    pub fn for_field(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }
}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Run every schema and business check against `state`.
///
/// `today` is the reference date for the minimum-age check.
///
/// # Errors
///
/// Returns all failures at once; there is no partial success.
pub fn validate(state: &FormState, today: NaiveDate) -> Result<(), ValidationErrors> {
    let mut errors: Vec<FieldError> = SCHEMA_FIELDS
        .iter()
        .filter_map(|name| validate_field(name, state.get(name)).err())
        .collect();

    business_rules(state, today, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(count = errors.len(), "form failed validation");
        Err(ValidationErrors { errors })
    }
}

// Answers that must be strings whenever they are given.
const TEXT_FIELDS: [&str; 13] = [
    "firstName",
    "lastName",
    "email",
    "address",
    "city",
    "postalCode",
    "digitalSignature",
    "socialInsuranceNumber",
    "province",
    "filingType",
    "maritalStatus",
    "residencyStatus",
    "dateOfBirth",
];

const SCHEMA_FIELDS: [&str; 10] = [
    "firstName",
    "lastName",
    "email",
    "address",
    "city",
    "postalCode",
    "privacyConsent",
    "accuracyDeclaration",
    "consentCheckbox",
    "digitalSignature",
];

/// Check a single field in isolation. Fields without a known check pass.
///
/// # Errors
///
/// Returns the failure for `name` when `value` does not satisfy it.
pub fn validate_field(name: &str, value: Option<&Value>) -> Result<(), FieldError> {
    let fail = |message: &str| -> Result<(), FieldError> { Err(FieldError::new(name, message)) };
    let given = value.filter(|v| v.is_present());
    if TEXT_FIELDS.contains(&name) && given.is_some_and(|v| v.as_str().is_none()) {
        return fail("Must be text");
    }
    let text = given.and_then(Value::as_str).unwrap_or_default();
    match name {
        "firstName" => required(name, text, "First name is required"),
        "lastName" => required(name, text, "Last name is required"),
        "address" => required(name, text, "Address is required"),
        "city" => required(name, text, "City is required"),
        "postalCode" => required(name, text, "Postal code is required"),
        "digitalSignature" => required(name, text, "Digital signature is required"),
        "email" if text.is_empty() => fail("Email is required"),
        "email" if !is_match(&EMAIL_RE, text) => fail("Invalid email address"),
        "privacyConsent" => accepted(name, value, "You must consent to privacy policy"),
        "accuracyDeclaration" => {
            accepted(name, value, "You must declare the accuracy of information")
        }
        "consentCheckbox" => accepted(name, value, "You must consent to terms and conditions"),
        "socialInsuranceNumber" if !text.is_empty() && !is_match(&SIN_RE, text) => {
            fail("SIN must be in format 123-456-789")
        }
        "province" => one_of(name, text, &PROVINCES, "Unknown province or territory"),
        "filingType" => one_of(name, text, &FILING_TYPES, "Unknown filing type"),
        "maritalStatus" => one_of(name, text, &MARITAL_STATUSES, "Unknown marital status"),
        "residencyStatus" => one_of(name, text, &RESIDENCY_STATUSES, "Unknown residency status"),
        _ => Ok(()),
    }
}

fn business_rules(state: &FormState, today: NaiveDate, errors: &mut Vec<FieldError>) {
    for name in [
        "socialInsuranceNumber",
        "province",
        "filingType",
        "maritalStatus",
        "residencyStatus",
        "dateOfBirth",
    ] {
        if let Err(e) = validate_field(name, state.get(name)) {
            errors.push(e);
        }
    }

    if let Some(dob) = state.get_str("dateOfBirth").filter(|s| !s.is_empty()) {
        match NaiveDate::parse_from_str(dob, "%Y-%m-%d") {
            Ok(born) => {
                if today.years_since(born).map_or(true, |age| age < MINIMUM_AGE) {
                    errors.push(FieldError::new("dateOfBirth", "Must be 18 years or older"));
                }
            }
            Err(_) => errors.push(FieldError::new("dateOfBirth", "Invalid date of birth")),
        }
    }

    let postal = state.get_str("postalCode").unwrap_or_default();
    if !postal.is_empty() && !is_match(&POSTAL_RE, postal) {
        errors.push(FieldError::new(
            "postalCode",
            "Invalid Canadian postal code format",
        ));
    }

    if matches!(state.get_str("maritalStatus"), Some("married" | "common-law"))
        && !(state.is_truthy("spouseFirstName")
            && state.is_truthy("spouseLastName")
            && state.is_truthy("dateOfMarriage"))
    {
        errors.push(FieldError::new(
            "maritalStatus",
            "Spouse information is required for married/common-law status",
        ));
    }

    if state.is_truthy("hasDependants") {
        for (index, dependant) in state.list("dependants").iter().enumerate() {
            let complete = dependant.as_map().is_some_and(|d| {
                ["firstName", "lastName", "dateOfBirth"]
                    .iter()
                    .all(|k| d.get(*k).is_some_and(Value::is_truthy))
            });
            if !complete {
                errors.push(FieldError::new(
                    format!("dependants.{index}"),
                    format!("Dependant {} is missing required information", index + 1),
                ));
            }
        }
    }

    if !is_step_complete(state, StepId::IncomeSlips) {
        errors.push(FieldError::new(
            "incomeSlips",
            "At least one income source must be provided",
        ));
    }
}

fn is_match(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

fn required(name: &str, text: &str, message: &str) -> Result<(), FieldError> {
    if text.trim().is_empty() {
        Err(FieldError::new(name, message))
    } else {
        Ok(())
    }
}

fn accepted(name: &str, value: Option<&Value>, message: &str) -> Result<(), FieldError> {
    if value.and_then(Value::as_bool) == Some(true) {
        Ok(())
    } else {
        Err(FieldError::new(name, message))
    }
}

fn one_of(name: &str, text: &str, allowed: &[&str], message: &str) -> Result<(), FieldError> {
    if text.is_empty() || allowed.contains(&text) {
        Ok(())
    } else {
        Err(FieldError::new(name, message))
    }
}
