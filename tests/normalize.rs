use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use retail_normalizer::{
    canonical::{AgeGroup, UNKNOWN},
    detect::detect,
    normalize::{FixedClock, Normalizer},
    raw::RawTable,
    vocabulary::{SemanticRole, Vocabulary},
};

const AGE_LABELS: [&str; 8] = [
    "13-17", "18-24", "25-34", "35-44", "45-54", "55-64", "65+", "Unknown",
];

fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 2, 1)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .expect("valid timestamp")
}

fn normalizer(seed: u64) -> Normalizer<rand::rngs::StdRng, FixedClock> {
    Normalizer::seeded(seed, FixedClock(fixed_now()))
}

fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
    RawTable::from_text_rows(headers.iter().copied(), rows.iter().map(|r| r.iter().copied()))
        .expect("raw table")
}

#[test]
fn unrecognized_columns_get_every_default() {
    let raw = table(&["foo", "bar"], &[&["1", "x"], &["2", "y"], &["3", "z"]]);
    let mapping = detect(raw.headers(), &Vocabulary::default());
    assert_eq!(mapping.iter().count(), 0);

    let canonical = normalizer(5).normalize(&raw, &mapping);
    assert_eq!(canonical.len(), 3);
    for (idx, record) in canonical.records().iter().enumerate() {
        assert_eq!(record.sales_amount, 1.0);
        assert_eq!(record.quantity, 1);
        assert_eq!(record.transaction, idx.to_string());
        for role in SemanticRole::TEXT {
            assert_eq!(record.text(role), Some(UNKNOWN));
        }
        assert!(!record.promo_used);
        assert!(!record.campaign_active);
        assert!(record.age_synthesized);
        assert_eq!(record.date, Some(fixed_now()));
    }
    assert_eq!(canonical.passthrough_headers(), ["foo", "bar"]);
    assert_eq!(canonical.report().defaulted.len(), SemanticRole::ALL.len());
}

#[test]
fn transaction_scenario_maps_and_coerces() {
    let raw = table(
        &["Txn_ID", "Sale_Amount", "Cust_Age", "City_Name"],
        &[&["T1", "150.5", "30", "Dubai"]],
    );
    let mapping = detect(raw.headers(), &Vocabulary::default());
    assert_eq!(mapping.column(SemanticRole::TransactionId), Some("Txn_ID"));
    assert_eq!(mapping.column(SemanticRole::Amount), Some("Sale_Amount"));
    assert_eq!(mapping.column(SemanticRole::Age), Some("Cust_Age"));
    assert_eq!(mapping.column(SemanticRole::City), Some("City_Name"));

    let canonical = normalizer(1).normalize(&raw, &mapping);
    let record = &canonical.records()[0];
    assert_eq!(record.transaction, "T1");
    assert_eq!(record.sales_amount, 150.5);
    assert_eq!(record.age, Some(30.0));
    assert!(!record.age_synthesized);
    assert_eq!(record.age_group.label(), "25-34");
    assert_eq!(record.city, "Dubai");
    assert_eq!(record.quantity, 1);
    assert!(!record.promo_used);
    assert!(!record.campaign_active);
    assert!(canonical.passthrough_headers().is_empty());
}

#[test]
fn unparsable_mapped_amount_becomes_zero() {
    let raw = table(&["Sale_Amount"], &[&["abc"], &["12"]]);
    let mapping = detect(raw.headers(), &Vocabulary::default());
    let canonical = normalizer(1).normalize(&raw, &mapping);
    let amounts = canonical
        .records()
        .iter()
        .map(|r| r.sales_amount)
        .collect::<Vec<_>>();
    assert_eq!(amounts, vec![0.0, 12.0]);
    assert_eq!(canonical.report().amount_fallbacks, 1);
}

#[test]
fn promo_usage_requires_a_real_code() {
    let raw = table(&["Promo"], &[&["  "], &["SAVE10"], &[""], &["nan"]]);
    let mapping = detect(raw.headers(), &Vocabulary::default());
    assert_eq!(mapping.column(SemanticRole::PromoCode), Some("Promo"));
    let canonical = normalizer(1).normalize(&raw, &mapping);
    let used = canonical
        .records()
        .iter()
        .map(|r| r.promo_used)
        .collect::<Vec<_>>();
    assert_eq!(used, vec![false, true, false, false]);
    assert_eq!(canonical.records()[0].promo_code, UNKNOWN);
}

#[test]
fn one_column_feeds_every_role_mapped_to_it() {
    let raw = table(&["Region"], &[&["Sharjah"]]);
    let mut mapping = detect(raw.headers(), &Vocabulary::default());
    mapping.assign(SemanticRole::City, "Region");
    mapping.assign(SemanticRole::Nationality, "Region");
    let canonical = normalizer(1).normalize(&raw, &mapping);
    let record = &canonical.records()[0];
    assert_eq!(record.city, "Sharjah");
    assert_eq!(record.nationality, "Sharjah");
    assert!(canonical.passthrough_headers().is_empty());
}

#[test]
fn same_seed_and_clock_reproduce_the_table() {
    let raw = table(&["City"], &[&["Dubai"], &["Ajman"], &["Fujairah"]]);
    let mapping = detect(raw.headers(), &Vocabulary::default());
    let first = normalizer(99).normalize(&raw, &mapping);
    let second = normalizer(99).normalize(&raw, &mapping);
    assert_eq!(first, second);
    for record in first.records() {
        let age = record.age.expect("synthesized age");
        assert!((18.0..65.0).contains(&age));
        assert_eq!(age.fract(), 0.0);
    }
}

#[test]
fn age_boundaries_follow_the_bucket_table() {
    let raw = table(&["Age"], &[&["18"], &["65"], &["17.9"], &[""], &["twelve"]]);
    let mapping = detect(raw.headers(), &Vocabulary::default());
    let canonical = normalizer(1).normalize(&raw, &mapping);
    let labels = canonical
        .records()
        .iter()
        .map(|r| r.age_group.label())
        .collect::<Vec<_>>();
    assert_eq!(labels, vec!["18-24", "65+", "13-17", "Unknown", "Unknown"]);
    assert_eq!(canonical.report().unparsable_ages, 2);
}

fn header_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Za-z_ ]{1,14}", 1..8)
}

proptest! {
    #[test]
    fn age_group_is_always_one_of_eight_labels(age in prop::option::of(-50.0f64..150.0)) {
        let label = AgeGroup::from_age(age).label();
        prop_assert!(AGE_LABELS.contains(&label));
    }

    #[test]
    fn detection_is_a_pure_function_of_headers(headers in header_strategy()) {
        let vocabulary = Vocabulary::default();
        let first = detect(&headers, &vocabulary);
        let second = detect(&headers, &vocabulary);
        prop_assert_eq!(&first, &second);
        for (_, column) in first.iter() {
            prop_assert!(headers.iter().any(|h| h == column));
        }
    }

    #[test]
    fn unmapped_promo_code_never_marks_usage(
        notes in prop::collection::vec("[A-Za-z0-9 ]{0,10}", 1..6)
    ) {
        let raw = RawTable::from_text_rows(["Notes"], notes.iter().map(|n| [n.as_str()]))
            .expect("raw table");
        let mut mapping = detect(raw.headers(), &Vocabulary::default());
        mapping.clear(SemanticRole::PromoCode);
        let canonical = normalizer(3).normalize(&raw, &mapping);
        prop_assert!(canonical.records().iter().all(|r| !r.promo_used));
    }
}
