use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use taxintake::{field, standard_rules, steps, validate, FormState, RuleSet, RuleSetBuilder};

/// A form that fires most of the standard rules.
fn sample_form() -> FormState {
    FormState::try_from(serde_json::json!({
        "firstName": "Alex",
        "lastName": "Doe",
        "email": "alex@example.com",
        "address": "1 Main St",
        "city": "Toronto",
        "postalCode": "M5V 2T6",
        "province": "ON",
        "taxYear": 2024,
        "filingType": "personal",
        "privacyConsent": true,
        "maritalStatus": "married",
        "spouseFirstName": "Sam",
        "spouseLastName": "Doe",
        "dateOfMarriage": "2015-06-20",
        "isCanadianCitizen": false,
        "isFullYearResident": false,
        "dateOfEntry": "2024-03-01",
        "hasDependants": true,
        "dependants": [{"firstName": "Kim", "lastName": "Doe", "dateOfBirth": "2018-01-01"}],
        "incomeSlips": {"t4": [{"employerName": "ACME"}], "t2202a": [{}]},
        "deductions": {"rrspContributions": 2500, "medicalExpenses": 400, "foreignIncome": 1200}
    }))
    .unwrap()
}

/// `n` independent show rules, each on its own source field, all firing.
fn build_ruleset(n: usize) -> (RuleSet, FormState) {
    let mut builder = RuleSetBuilder::new();
    let mut form = FormState::new();

    for i in 0..n {
        let source = format!("f{i}");
        let target = format!("t{i}");
        let when = source.clone();
        builder = builder.rule(move |r| r.when(field(&when).gt(1.0)).show([target]));
        form = form.set(&source, 10_i64);
    }

    (builder.compile().unwrap(), form)
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    let standard = standard_rules().unwrap();
    let form = sample_form();
    group.bench_function("standard_rules", |b| {
        b.iter(|| standard.evaluate(black_box(&form)));
    });

    for &n in &[5, 50, 500] {
        let (ruleset, form) = build_ruleset(n);
        group.bench_function(format!("{n}_rules"), |b| {
            b.iter(|| ruleset.visible_fields(black_box(&form)));
        });
    }

    group.finish();
}

fn bench_steps(c: &mut Criterion) {
    let form = sample_form();
    c.bench_function("progress", |b| {
        b.iter(|| steps::progress(black_box(&form)));
    });

    let today = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
    c.bench_function("validate", |b| {
        b.iter(|| validate::validate(black_box(&form), today));
    });
}

fn bench_parse(c: &mut Criterion) {
    let text: String = standard_rules()
        .unwrap()
        .rules()
        .iter()
        .map(|r| format!("{r}\n"))
        .collect();
    c.bench_function("parse_standard_table", |b| {
        b.iter(|| RuleSet::from_dsl(black_box(&text)).unwrap());
    });
}

criterion_group!(benches, bench_evaluate, bench_steps, bench_parse);
criterion_main!(benches);
