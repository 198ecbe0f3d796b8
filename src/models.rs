use crate::errors::PredictionFailure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============ Form Input ============

/// One input of the prediction form.
///
/// The snake_case name doubles as the JSON key in the request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    CreditScore,
    Gender,
    Age,
    Tenure,
    Balance,
    ProductsNumber,
    CreditCard,
    ActiveMember,
    EstimatedSalary,
    Country,
}

impl Field {
    /// All fields in form order.
    pub const ALL: [Field; 10] = [
        Field::CreditScore,
        Field::Gender,
        Field::Age,
        Field::Tenure,
        Field::Balance,
        Field::ProductsNumber,
        Field::CreditCard,
        Field::ActiveMember,
        Field::EstimatedSalary,
        Field::Country,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::CreditScore => "credit_score",
            Field::Gender => "gender",
            Field::Age => "age",
            Field::Tenure => "tenure",
            Field::Balance => "balance",
            Field::ProductsNumber => "products_number",
            Field::CreditCard => "credit_card",
            Field::ActiveMember => "active_member",
            Field::EstimatedSalary => "estimated_salary",
            Field::Country => "country",
        }
    }

    /// Human-readable label shown next to validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            Field::CreditScore => "Credit Score",
            Field::Gender => "Gender",
            Field::Age => "Age",
            Field::Tenure => "Tenure",
            Field::Balance => "Balance",
            Field::ProductsNumber => "Number of Products",
            Field::CreditCard => "Has Credit Card",
            Field::ActiveMember => "Active Member",
            Field::EstimatedSalary => "Estimated Salary",
            Field::Country => "Country",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("Unknown form field: {}", s))
    }
}

/// Raw form values exactly as typed. An empty string means "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub credit_score: String,
    pub gender: String,
    pub age: String,
    pub tenure: String,
    pub balance: String,
    pub products_number: String,
    pub credit_card: String,
    pub active_member: String,
    pub estimated_salary: String,
    pub country: String,
}

impl CustomerProfile {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::CreditScore => &self.credit_score,
            Field::Gender => &self.gender,
            Field::Age => &self.age,
            Field::Tenure => &self.tenure,
            Field::Balance => &self.balance,
            Field::ProductsNumber => &self.products_number,
            Field::CreditCard => &self.credit_card,
            Field::ActiveMember => &self.active_member,
            Field::EstimatedSalary => &self.estimated_salary,
            Field::Country => &self.country,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::CreditScore => &mut self.credit_score,
            Field::Gender => &mut self.gender,
            Field::Age => &mut self.age,
            Field::Tenure => &mut self.tenure,
            Field::Balance => &mut self.balance,
            Field::ProductsNumber => &mut self.products_number,
            Field::CreditCard => &mut self.credit_card,
            Field::ActiveMember => &mut self.active_member,
            Field::EstimatedSalary => &mut self.estimated_salary,
            Field::Country => &mut self.country,
        };
        *slot = value.into();
    }

    /// True when every field is unset.
    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|field| self.get(*field).is_empty())
    }
}

/// Per-field validation messages. Only failing fields are present.
pub type FieldErrors = BTreeMap<Field, String>;

// ============ Request Payload ============

/// Countries the model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Country {
    France,
    Spain,
    Germany,
}

impl Country {
    pub const ALL: [Country; 3] = [Country::France, Country::Spain, Country::Germany];

    pub fn as_str(&self) -> &'static str {
        match self {
            Country::France => "France",
            Country::Spain => "Spain",
            Country::Germany => "Germany",
        }
    }
}

impl FromStr for Country {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Country::ALL
            .into_iter()
            .find(|country| country.as_str() == s)
            .ok_or_else(|| format!("Unsupported country: {}", s))
    }
}

/// Typed request body for `POST /predict`.
///
/// Only built by `TryFrom<&CustomerProfile>` in the validation module, so
/// every instance has passed validation. Binary fields are `0` or `1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedPayload {
    pub(crate) credit_score: u16,
    pub(crate) gender: u8,
    pub(crate) age: u8,
    pub(crate) tenure: u8,
    pub(crate) balance: f64,
    pub(crate) products_number: u8,
    pub(crate) credit_card: u8,
    pub(crate) active_member: u8,
    pub(crate) estimated_salary: f64,
    pub(crate) country: Country,
}

impl ValidatedPayload {
    pub fn credit_score(&self) -> u16 {
        self.credit_score
    }

    pub fn age(&self) -> u8 {
        self.age
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn estimated_salary(&self) -> f64 {
        self.estimated_salary
    }

    pub fn country(&self) -> Country {
        self.country
    }
}

// ============ Prediction Output ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    Churn,
    NoChurn,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Churn => f.write_str("Churn"),
            Classification::NoChurn => f.write_str("No Churn"),
        }
    }
}

/// Canonical prediction, whatever shape the service answered with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub classification: Classification,
    /// Probability of churn, in `[0, 1]`.
    pub churn_probability: f64,
    /// Decision boundary used by the service, in `[0, 1]`.
    pub threshold: f64,
}

impl PredictionResult {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_probability(self.churn_probability)
    }
}

/// Coarse risk bucket shown alongside the probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.30 {
            RiskLevel::Low
        } else if probability < 0.57 {
            RiskLevel::Moderate
        } else if probability < 0.75 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk - Customer is likely to stay",
            RiskLevel::Moderate => "Moderate Risk - Monitor customer engagement",
            RiskLevel::High => "High Risk - Consider retention strategies",
            RiskLevel::Critical => "Critical Risk - Immediate action recommended",
        }
    }
}

/// The value handed to the results view after a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionOutcome {
    Success(PredictionResult),
    Failure(PredictionFailure),
}

impl PredictionOutcome {
    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            PredictionOutcome::Success(result) => Some(result),
            PredictionOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&PredictionFailure> {
        match self {
            PredictionOutcome::Success(_) => None,
            PredictionOutcome::Failure(failure) => Some(failure),
        }
    }
}

impl From<Result<PredictionResult, PredictionFailure>> for PredictionOutcome {
    fn from(result: Result<PredictionResult, PredictionFailure>) -> Self {
        match result {
            Ok(prediction) => PredictionOutcome::Success(prediction),
            Err(failure) => PredictionOutcome::Failure(failure),
        }
    }
}
