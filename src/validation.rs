//! Form validation and payload coercion.
//!
//! `validate` is pure and independent of controller state. The payload is
//! built by the same checks, so a `ValidatedPayload` can only come out of a
//! profile that produced no errors.
use crate::models::{Country, CustomerProfile, Field, FieldErrors, ValidatedPayload};
use regex::Regex;
use std::sync::LazyLock;

pub const REQUIRED: &str = "Required";
pub const NOT_WHOLE_NUMBER: &str = "Must be a whole number";
pub const NOT_A_NUMBER: &str = "Must be a number";
pub const NEGATIVE_AMOUNT: &str = "Must be 0 or greater";

// Plain base-10 only: no exponent, no thousands separators, no inf/NaN.
static WHOLE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("whole number pattern compiles"));
static DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)$").expect("decimal pattern compiles")
});

/// Validates every field of the profile.
///
/// Returns an empty map iff the profile can be turned into a payload.
pub fn validate(profile: &CustomerProfile) -> FieldErrors {
    check_profile(profile).0
}

impl TryFrom<&CustomerProfile> for ValidatedPayload {
    type Error = FieldErrors;

    fn try_from(profile: &CustomerProfile) -> Result<Self, Self::Error> {
        match check_profile(profile) {
            (errors, Some(payload)) if errors.is_empty() => Ok(payload),
            (errors, _) => Err(errors),
        }
    }
}

fn check_profile(profile: &CustomerProfile) -> (FieldErrors, Option<ValidatedPayload>) {
    let mut checker = Checker {
        profile,
        errors: FieldErrors::new(),
    };

    let credit_score = checker.check(Field::CreditScore, |raw| {
        whole_number(raw, 300, 850, "Must be between 300-850")
    });
    let gender = checker.check(Field::Gender, |raw| binary(raw, "Select gender"));
    let age = checker.check(Field::Age, |raw| {
        whole_number(raw, 18, 100, "Must be between 18-100")
    });
    let tenure = checker.check(Field::Tenure, |raw| {
        whole_number(raw, 0, 10, "Must be between 0-10")
    });
    let balance = checker.check(Field::Balance, amount);
    let products_number = checker.check(Field::ProductsNumber, |raw| {
        whole_number(raw, 1, 4, "Must be between 1-4")
    });
    let credit_card = checker.check(Field::CreditCard, |raw| binary(raw, "Select an option"));
    let active_member = checker.check(Field::ActiveMember, |raw| binary(raw, "Select an option"));
    let estimated_salary = checker.check(Field::EstimatedSalary, amount);
    let country = checker.check(Field::Country, |raw| {
        raw.parse::<Country>().map_err(|_| "Select country".to_string())
    });

    let payload = (|| {
        Some(ValidatedPayload {
            credit_score: u16::try_from(credit_score?).ok()?,
            gender: gender?,
            age: u8::try_from(age?).ok()?,
            tenure: u8::try_from(tenure?).ok()?,
            balance: balance?,
            products_number: u8::try_from(products_number?).ok()?,
            credit_card: credit_card?,
            active_member: active_member?,
            estimated_salary: estimated_salary?,
            country: country?,
        })
    })();

    (checker.errors, payload)
}

struct Checker<'a> {
    profile: &'a CustomerProfile,
    errors: FieldErrors,
}

impl Checker<'_> {
    fn check<T>(&mut self, field: Field, parse: impl FnOnce(&str) -> Result<T, String>) -> Option<T> {
        match parse(self.profile.get(field).trim()) {
            Ok(value) => Some(value),
            Err(message) => {
                self.errors.insert(field, message);
                None
            }
        }
    }
}

fn whole_number(raw: &str, min: i64, max: i64, out_of_range: &str) -> Result<i64, String> {
    if raw.is_empty() {
        return Err(REQUIRED.to_string());
    }
    if !WHOLE_NUMBER.is_match(raw) {
        return Err(NOT_WHOLE_NUMBER.to_string());
    }
    // Digits that overflow i64 are out of every range we check.
    match raw.parse::<i64>() {
        Ok(value) if (min..=max).contains(&value) => Ok(value),
        _ => Err(out_of_range.to_string()),
    }
}

fn amount(raw: &str) -> Result<f64, String> {
    if raw.is_empty() {
        return Err(REQUIRED.to_string());
    }
    if !DECIMAL.is_match(raw) {
        return Err(NOT_A_NUMBER.to_string());
    }
    let value = raw
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| NOT_A_NUMBER.to_string())?;
    if value < 0.0 {
        return Err(NEGATIVE_AMOUNT.to_string());
    }
    // "-0" parses to negative zero; send a plain zero.
    Ok(value.abs())
}

fn binary(raw: &str, message: &str) -> Result<u8, String> {
    match raw {
        "0" => Ok(0),
        "1" => Ok(1),
        _ => Err(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_profile() -> CustomerProfile {
        CustomerProfile {
            credit_score: "619".to_string(),
            gender: "0".to_string(),
            age: "42".to_string(),
            tenure: "2".to_string(),
            balance: "0".to_string(),
            products_number: "1".to_string(),
            credit_card: "1".to_string(),
            active_member: "1".to_string(),
            estimated_salary: "101348.88".to_string(),
            country: "France".to_string(),
        }
    }

    #[test]
    fn test_valid_profile_has_no_errors() {
        assert!(validate(&valid_profile()).is_empty());
    }

    #[test]
    fn test_empty_profile_flags_every_field() {
        let errors = validate(&CustomerProfile::default());
        assert_eq!(errors.len(), Field::ALL.len());
        assert_eq!(errors[&Field::CreditScore], REQUIRED);
        assert_eq!(errors[&Field::Balance], REQUIRED);
        assert_eq!(errors[&Field::Gender], "Select gender");
        assert_eq!(errors[&Field::CreditCard], "Select an option");
        assert_eq!(errors[&Field::Country], "Select country");
    }

    #[test]
    fn test_credit_score_bounds() {
        for (value, ok) in [("299", false), ("300", true), ("850", true), ("851", false)] {
            let mut profile = valid_profile();
            profile.credit_score = value.to_string();
            let errors = validate(&profile);
            assert_eq!(errors.is_empty(), ok, "credit_score={}", value);
            if !ok {
                assert_eq!(errors[&Field::CreditScore], "Must be between 300-850");
            }
        }
    }

    #[test]
    fn test_range_message_differs_from_required() {
        let mut profile = valid_profile();
        profile.age = "17".to_string();
        profile.tenure = String::new();
        let errors = validate(&profile);
        assert_eq!(errors[&Field::Age], "Must be between 18-100");
        assert_eq!(errors[&Field::Tenure], REQUIRED);
    }

    #[test]
    fn test_format_errors() {
        let mut profile = valid_profile();
        profile.age = "42.5".to_string();
        profile.products_number = "two".to_string();
        profile.balance = "1e5".to_string();
        profile.estimated_salary = "1,000".to_string();
        let errors = validate(&profile);
        assert_eq!(errors[&Field::Age], NOT_WHOLE_NUMBER);
        assert_eq!(errors[&Field::ProductsNumber], NOT_WHOLE_NUMBER);
        assert_eq!(errors[&Field::Balance], NOT_A_NUMBER);
        assert_eq!(errors[&Field::EstimatedSalary], NOT_A_NUMBER);
    }

    #[test]
    fn test_negative_amount() {
        let mut profile = valid_profile();
        profile.balance = "-0.01".to_string();
        assert_eq!(validate(&profile)[&Field::Balance], NEGATIVE_AMOUNT);
    }

    #[test]
    fn test_huge_integer_is_out_of_range() {
        let mut profile = valid_profile();
        profile.credit_score = "99999999999999999999999".to_string();
        assert_eq!(
            validate(&profile)[&Field::CreditScore],
            "Must be between 300-850"
        );
    }

    #[test]
    fn test_enumerated_fields_reject_other_tokens() {
        let mut profile = valid_profile();
        profile.gender = "2".to_string();
        profile.active_member = "yes".to_string();
        profile.country = "Italy".to_string();
        let errors = validate(&profile);
        assert_eq!(errors.len(), 3);
        assert!(errors.contains_key(&Field::Gender));
        assert!(errors.contains_key(&Field::ActiveMember));
        assert!(errors.contains_key(&Field::Country));
    }

    #[test]
    fn test_payload_coercion() {
        let mut profile = valid_profile();
        profile.balance = " 83807.86 ".to_string();
        let payload = ValidatedPayload::try_from(&profile).unwrap();
        assert_eq!(payload.credit_score(), 619);
        assert_eq!(payload.age(), 42);
        assert_eq!(payload.balance(), 83807.86);
        assert_eq!(payload.country(), Country::France);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["credit_score"], 619);
        assert_eq!(json["gender"], 0);
        assert_eq!(json["estimated_salary"], 101348.88);
        assert_eq!(json["country"], "France");
        assert_eq!(json.as_object().unwrap().len(), 10);
    }

    #[test]
    fn test_payload_refused_for_invalid_profile() {
        let mut profile = valid_profile();
        profile.products_number = "5".to_string();
        let errors = ValidatedPayload::try_from(&profile).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[&Field::ProductsNumber], "Must be between 1-4");
    }
}
