/// Property-based tests using proptest
/// Tests invariants of form validation that should hold for all inputs
use churn_predict::core::models::{CustomerProfile, Field, ValidatedPayload};
use churn_predict::core::validation::{validate, REQUIRED};
use proptest::prelude::*;

prop_compose! {
    fn in_domain_profile()(
        credit_score in 300u32..=850,
        gender in 0u8..=1,
        age in 18u32..=100,
        tenure in 0u32..=10,
        balance in 0.0f64..250_000.0,
        products_number in 1u32..=4,
        credit_card in 0u8..=1,
        active_member in 0u8..=1,
        estimated_salary in 0.0f64..200_000.0,
        country in prop::sample::select(vec!["France", "Spain", "Germany"]),
    ) -> CustomerProfile {
        CustomerProfile {
            credit_score: credit_score.to_string(),
            gender: gender.to_string(),
            age: age.to_string(),
            tenure: tenure.to_string(),
            balance: format!("{:.2}", balance),
            products_number: products_number.to_string(),
            credit_card: credit_card.to_string(),
            active_member: active_member.to_string(),
            estimated_salary: format!("{:.2}", estimated_salary),
            country: country.to_string(),
        }
    }
}

// Property: in-domain profiles always validate and coerce
proptest! {
    #[test]
    fn in_domain_profiles_are_valid(profile in in_domain_profile()) {
        prop_assert!(validate(&profile).is_empty());
        prop_assert!(ValidatedPayload::try_from(&profile).is_ok());
    }

    #[test]
    fn missing_field_is_reported(
        profile in in_domain_profile(),
        field in prop::sample::select(Field::ALL.to_vec()),
    ) {
        let mut profile = profile;
        profile.set(field, "");
        let errors = validate(&profile);
        prop_assert_eq!(errors.len(), 1);
        prop_assert!(errors.contains_key(&field));
    }

    #[test]
    fn empty_numeric_field_says_required(
        profile in in_domain_profile(),
        field in prop::sample::select(vec![
            Field::CreditScore,
            Field::Age,
            Field::Tenure,
            Field::Balance,
            Field::ProductsNumber,
            Field::EstimatedSalary,
        ]),
    ) {
        let mut profile = profile;
        profile.set(field, "");
        let errors = validate(&profile);
        prop_assert_eq!(errors[&field].as_str(), REQUIRED);
    }
}

// Property: one unit outside an integer bound fails, the bound itself passes
proptest! {
    #[test]
    fn integer_bounds_are_inclusive(
        profile in in_domain_profile(),
        (field, min, max) in prop::sample::select(vec![
            (Field::CreditScore, 300i64, 850i64),
            (Field::Age, 18, 100),
            (Field::Tenure, 0, 10),
            (Field::ProductsNumber, 1, 4),
        ]),
    ) {
        for (value, valid) in [(min - 1, false), (min, true), (max, true), (max + 1, false)] {
            let mut candidate = profile.clone();
            candidate.set(field, value.to_string());
            let errors = validate(&candidate);
            prop_assert_eq!(errors.is_empty(), valid, "{}={}", field, value);
            if !valid {
                prop_assert_ne!(errors[&field].as_str(), REQUIRED);
            }
        }
    }
}

// Property: validation never panics on arbitrary input
proptest! {
    #[test]
    fn validation_never_panics(
        field in prop::sample::select(Field::ALL.to_vec()),
        raw in "\\PC*",
    ) {
        let mut profile = CustomerProfile::default();
        profile.set(field, raw);
        let errors = validate(&profile);
        prop_assert!(errors.len() >= Field::ALL.len() - 1);
    }
}
