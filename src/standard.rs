//! The questionnaire's built-in visibility rules.

use crate::{field, CompileError, RuleSet, RuleSetBuilder};

const SPOUSE_FIELDS: [&str; 5] = [
    "spouseFirstName",
    "spouseLastName",
    "spouseDateOfBirth",
    "spouseSocialInsuranceNumber",
    "dateOfMarriage",
];

const ENTRY_FIELDS: [&str; 3] = ["dateOfEntry", "previousCountry", "residencyStatus"];

/// Compile the standard rule table.
///
/// Order matters only where two rules touch the same target; every rule here
/// is a `show`, so the table is order-insensitive in practice.
///
/// # Errors
///
/// Returns [`CompileError`] only if the table itself is malformed.
pub fn standard_rules() -> Result<RuleSet, CompileError> {
    RuleSetBuilder::new()
        // Marital status
        .rule(|r| r.when(field("maritalStatus").eq("married")).show(SPOUSE_FIELDS))
        .rule(|r| r.when(field("maritalStatus").eq("common-law")).show(SPOUSE_FIELDS))
        .rule(|r| r.when(field("maritalStatus").eq("separated")).show(["dateOfSeparation"]))
        // Dependants
        .rule(|r| r.when(field("hasDependants").eq(true)).show(["dependants"]))
        // Residency
        .rule(|r| r.when(field("isFullYearResident").eq(false)).show(ENTRY_FIELDS))
        .rule(|r| r.when(field("isCanadianCitizen").eq(false)).show(ENTRY_FIELDS))
        // Income-driven deductions
        .rule(|r| {
            r.when(field("incomeSlips.t2202a").exists())
                .show(["deductions.tuitionAmounts", "deductions.studentLoanInterest"])
        })
        .rule(|r| {
            r.when(field("incomeSlips.t4a").exists()).show([
                "deductions.selfEmploymentIncome",
                "deductions.selfEmploymentExpenses",
            ])
        })
        .rule(|r| {
            r.when(field("dependants").exists())
                .show(["deductions.childcareExpenses"])
        })
        .rule(|r| {
            r.when(field("deductions.foreignIncome").gt(0.0)).show([
                "deductions.foreignTaxPaid",
                "deductions.foreignAssetsOver100k",
            ])
        })
        .rule(|r| {
            r.when(field("deductions.rrspContributions").gt(0.0))
                .show(["deductions.rrspReceipts"])
        })
        .rule(|r| {
            r.when(field("deductions.medicalExpenses").gt(0.0))
                .show(["medicalExpenseDetails"])
        })
        .rule(|r| {
            r.when(field("incomeSlips.t4").exists()).show([
                "deductions.employmentExpenses",
                "deductions.homeOfficeExpenses",
            ])
        })
        .rule(|r| {
            r.when(field("residencyStatus").eq("newcomer"))
                .show(["deductions.movingExpenses"])
        })
        .compile()
}
