//! The sectioned summary document attached to submission emails.

use std::fmt;
use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::{FormState, IntakeId, Value};

const SLIP_KINDS: [(&str, &str); 15] = [
    ("t4", "T4"),
    ("t4a", "T4A"),
    ("t5", "T5"),
    ("t3", "T3"),
    ("t2202a", "T2202A"),
    ("t4e", "T4E"),
    ("t5007", "T5007"),
    ("t4aP", "T4A(P)"),
    ("t4aOAS", "T4A(OAS)"),
    ("t4rsp", "T4RSP"),
    ("t5008", "T5008"),
    ("t5013", "T5013"),
    ("t5018", "T5018"),
    ("rc62", "RC62"),
    ("rc210", "RC210"),
];

const DEDUCTIONS: [(&str, &str); 10] = [
    ("rrspContributions", "RRSP Contributions"),
    ("tuitionAmounts", "Tuition Amounts"),
    ("medicalExpenses", "Medical Expenses"),
    ("charitableDonations", "Charitable Donations"),
    ("childcareExpenses", "Childcare Expenses"),
    ("employmentExpenses", "Employment Expenses"),
    ("homeOfficeExpenses", "Home Office Expenses"),
    ("movingExpenses", "Moving Expenses"),
    ("studentLoanInterest", "Student Loan Interest"),
    ("supportPayments", "Support Payments"),
];

/// A typed summary value; `Display` gives the text shown to readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Date(String),
    Currency(f64),
    Boolean(bool),
    Count(usize),
    Missing,
    NotApplicable,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) | FieldValue::Date(s) => f.write_str(s),
            FieldValue::Currency(amount) => f.write_str(&format_currency(*amount)),
            FieldValue::Boolean(true) => f.write_str("Yes"),
            FieldValue::Boolean(false) => f.write_str("No"),
            FieldValue::Count(n) => write!(f, "{n} slip(s)"),
            FieldValue::Missing => f.write_str("Not provided"),
            FieldValue::NotApplicable => f.write_str("N/A"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryField {
    pub label: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummarySection {
    pub title: String,
    pub fields: Vec<SummaryField>,
}

impl SummarySection {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_owned(),
            fields: Vec::new(),
        }
    }

    fn push(&mut self, label: impl Into<String>, value: FieldValue) {
        self.fields.push(SummaryField {
            label: label.into(),
            value,
        });
    }

    /// Value of the first field with this label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| &f.value)
    }
}

/// Everything a preparer needs from one intake, grouped for reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub intake_id: IntakeId,
    pub generated_on: NaiveDate,
    pub sections: Vec<SummarySection>,
}

impl Summary {
    /// Lay out the form. Dependants, income and deduction sections appear
    /// only when they have content.
    #[must_use]
    pub fn build(form: &FormState, intake_id: IntakeId, generated_on: NaiveDate) -> Self {
        let mut sections = vec![
            personal_section(form),
            tax_section(form),
            residency_section(form),
            marital_section(form),
        ];
        sections.extend(dependants_section(form));
        sections.extend(income_section(form));
        sections.extend(deductions_section(form));
        Self {
            intake_id,
            generated_on,
            sections,
        }
    }

    #[must_use]
    pub fn section(&self, title: &str) -> Option<&SummarySection> {
        self.sections.iter().find(|s| s.title == title)
    }
}

fn text(form: &FormState, path: &str) -> FieldValue {
    match form.get(path) {
        Some(Value::String(s)) if !s.is_empty() => FieldValue::Text(s.clone()),
        Some(Value::String(_)) | None => FieldValue::Missing,
        Some(other) => FieldValue::Text(other.to_string()),
    }
}

fn date_or(form: &FormState, path: &str, fallback: FieldValue) -> FieldValue {
    match form.get_str(path) {
        Some(s) if !s.is_empty() => FieldValue::Date(s.to_owned()),
        _ => fallback,
    }
}

fn personal_section(form: &FormState) -> SummarySection {
    let mut section = SummarySection::new("Personal Information");
    section.push("First Name", text(form, "firstName"));
    section.push("Last Name", text(form, "lastName"));
    section.push("Date of Birth", date_or(form, "dateOfBirth", FieldValue::Missing));
    section.push("Email", text(form, "email"));
    section.push("Phone", text(form, "phone"));
    section.push("Address", text(form, "address"));
    section.push("City", text(form, "city"));
    section.push("Postal Code", text(form, "postalCode"));
    section
}

fn tax_section(form: &FormState) -> SummarySection {
    let mut section = SummarySection::new("Tax Information");
    section.push("Tax Year", text(form, "taxYear"));
    section.push("Province", text(form, "province"));
    section.push("Filing Type", text(form, "filingType"));
    section
}

fn residency_section(form: &FormState) -> SummarySection {
    let mut section = SummarySection::new("Residency Status");
    section.push(
        "Canadian Citizen",
        FieldValue::Boolean(form.is_truthy("isCanadianCitizen")),
    );
    section.push(
        "Full Year Resident",
        FieldValue::Boolean(form.is_truthy("isFullYearResident")),
    );
    section.push(
        "Date of Entry",
        date_or(form, "dateOfEntry", FieldValue::NotApplicable),
    );
    let previous = match text(form, "previousCountry") {
        FieldValue::Missing => FieldValue::NotApplicable,
        other => other,
    };
    section.push("Previous Country", previous);
    section
}

fn marital_section(form: &FormState) -> SummarySection {
    let mut section = SummarySection::new("Marital Status");
    section.push("Status", text(form, "maritalStatus"));
    let spouse = format!(
        "{} {}",
        form.get_str("spouseFirstName").unwrap_or_default(),
        form.get_str("spouseLastName").unwrap_or_default()
    );
    let spouse = spouse.trim();
    section.push(
        "Spouse Name",
        if spouse.is_empty() {
            FieldValue::NotApplicable
        } else {
            FieldValue::Text(spouse.to_owned())
        },
    );
    section.push(
        "Date of Marriage",
        date_or(form, "dateOfMarriage", FieldValue::NotApplicable),
    );
    section
}

fn dependants_section(form: &FormState) -> Option<SummarySection> {
    let dependants = form.list("dependants");
    if !form.is_truthy("hasDependants") || dependants.is_empty() {
        return None;
    }
    let mut section = SummarySection::new("Dependants");
    for (index, dependant) in dependants.iter().enumerate() {
        let get = |key: &str| {
            dependant
                .as_map()
                .and_then(|d| d.get(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
        };
        let mut line = format!("{} {}", get("firstName"), get("lastName"))
            .trim()
            .to_owned();
        let relationship = get("relationship");
        if !relationship.is_empty() {
            let _ = write!(line, " ({relationship})");
        }
        section.push(format!("Dependant {}", index + 1), FieldValue::Text(line));
    }
    Some(section)
}

fn income_section(form: &FormState) -> Option<SummarySection> {
    let mut section = SummarySection::new("Income Sources");
    if let Some(slips) = form.get("incomeSlips").and_then(Value::as_map) {
        let known = SLIP_KINDS.iter().map(|(key, label)| (*key, (*label).to_owned()));
        let unknown = slips
            .keys()
            .filter(|k| !SLIP_KINDS.iter().any(|(known, _)| known == k))
            .map(|k| (k.as_str(), k.to_uppercase()));
        for (key, label) in known.chain(unknown) {
            let count = slips.get(key).and_then(Value::as_list).map_or(0, <[Value]>::len);
            if count > 0 {
                section.push(format!("{label} Slips"), FieldValue::Count(count));
            }
        }
    }
    if form.is_truthy("otherIncomeSources") {
        section.push("Other Income", FieldValue::Boolean(true));
    }
    (!section.fields.is_empty()).then_some(section)
}

fn deductions_section(form: &FormState) -> Option<SummarySection> {
    let mut section = SummarySection::new("Deductions & Credits");
    for (key, label) in DEDUCTIONS {
        if let Some(amount) = form.get_f64(&format!("deductions.{key}")) {
            if amount > 0.0 {
                section.push(label, FieldValue::Currency(amount));
            }
        }
    }
    (!section.fields.is_empty()).then_some(section)
}

/// Dollars with thousands separators and cents, e.g. `$1,234.50`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_currency(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let dollars = (cents / 100).to_string();
    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{:02}", cents % 100)
}

/// A rendered summary ready to attach to an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
}

#[derive(Debug, Error)]
#[error("failed to render summary: {0}")]
pub struct RenderError(pub String);

/// Turns a [`Summary`] into a document. PDF layout lives behind this seam.
pub trait SummaryRenderer: Send + Sync {
    /// # Errors
    ///
    /// Returns [`RenderError`] if the document cannot be produced.
    fn render(&self, summary: &Summary) -> Result<RenderedDocument, RenderError>;
}

/// Plain-text rendering with the firm's header and footer.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    firm_name: String,
}

impl TextRenderer {
    #[must_use]
    pub fn new(firm_name: impl Into<String>) -> Self {
        Self {
            firm_name: firm_name.into(),
        }
    }

    fn write(&self, summary: &Summary, out: &mut String) -> fmt::Result {
        writeln!(out, "{}", self.firm_name)?;
        writeln!(out, "Tax Intake Summary")?;
        writeln!(out, "Intake ID: {}", summary.intake_id)?;
        writeln!(out, "Generated: {}", summary.generated_on.format("%Y-%m-%d"))?;

        let width = summary
            .sections
            .iter()
            .flat_map(|s| &s.fields)
            .map(|f| f.label.len())
            .max()
            .unwrap_or(0);

        for section in &summary.sections {
            writeln!(out)?;
            writeln!(out, "== {} ==", section.title)?;
            for field in &section.fields {
                writeln!(out, "{:<width$}  {}", field.label, field.value)?;
            }
        }

        writeln!(out)?;
        writeln!(
            out,
            "This intake is for tax preparation only. Do not email extra sensitive info unless requested."
        )?;
        write!(
            out,
            "Generated by {} on {}",
            self.firm_name,
            summary.generated_on.format("%Y-%m-%d")
        )
    }
}

impl SummaryRenderer for TextRenderer {
    fn render(&self, summary: &Summary) -> Result<RenderedDocument, RenderError> {
        let mut out = String::new();
        self.write(summary, &mut out)
            .map_err(|e| RenderError(e.to_string()))?;
        Ok(RenderedDocument {
            bytes: out.into_bytes(),
            content_type: "text/plain; charset=utf-8",
            extension: "txt",
        })
    }
}
