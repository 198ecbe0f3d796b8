//! Normalization of prediction responses.
//!
//! The service has answered in two shapes over its lifetime:
//!
//! - `{"prediction": "Churn" | "No Churn", "churn_probability": 0.12, "threshold": 0.3}`
//! - `{"prediction": 0 | 1, "probability": [p_no_churn, p_churn]}`
//!
//! Both are parsed into [`RawPrediction`] and reduced by [`normalize`] into
//! a [`PredictionResult`]. Anything else is an `InvalidResponse` failure.
use crate::errors::PredictionFailure;
use crate::models::{Classification, PredictionResult};
use serde::Deserialize;
use serde_json::Value;

/// Used when the service does not report its own threshold. Matches the
/// decision boundary the deployed model is tuned to, which is also where the
/// Moderate risk band ends.
pub const DEFAULT_THRESHOLD: f64 = 0.57;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawClassification {
    Code(i64),
    Label(String),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawProbability {
    Scalar(f64),
    Pair(Vec<f64>),
    Other(Value),
}

/// Success body as received, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPrediction {
    #[serde(default)]
    pub prediction: Option<RawClassification>,
    #[serde(default)]
    pub churn_probability: Option<RawProbability>,
    #[serde(default)]
    pub probability: Option<RawProbability>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// Reduces a raw response into the canonical result.
///
/// `default_threshold` is used only when the response carries none.
pub fn normalize(
    raw: RawPrediction,
    default_threshold: f64,
) -> Result<PredictionResult, PredictionFailure> {
    let classification = match raw.prediction {
        Some(prediction) => classify(prediction)?,
        None => return Err(PredictionFailure::invalid_response("missing prediction")),
    };

    // The labelled shape names its field explicitly; prefer it.
    let churn_probability = match raw.churn_probability.or(raw.probability) {
        Some(probability) => churn_probability(probability)?,
        None => return Err(PredictionFailure::invalid_response("missing probability")),
    };

    let threshold = match raw.threshold {
        Some(threshold) if is_unit(threshold) => threshold,
        Some(threshold) => {
            return Err(PredictionFailure::invalid_response(format!(
                "threshold {} is outside [0, 1]",
                threshold
            )))
        }
        None => default_threshold,
    };

    Ok(PredictionResult {
        classification,
        churn_probability,
        threshold,
    })
}

fn classify(prediction: RawClassification) -> Result<Classification, PredictionFailure> {
    match prediction {
        RawClassification::Code(1) => Ok(Classification::Churn),
        RawClassification::Code(0) => Ok(Classification::NoChurn),
        RawClassification::Code(code) => Err(PredictionFailure::invalid_response(format!(
            "unknown prediction code {}",
            code
        ))),
        RawClassification::Label(label) => {
            let folded: String = label
                .trim()
                .chars()
                .filter(|c| !matches!(c, ' ' | '_' | '-'))
                .flat_map(char::to_lowercase)
                .collect();
            match folded.as_str() {
                "churn" => Ok(Classification::Churn),
                "nochurn" => Ok(Classification::NoChurn),
                _ => Err(PredictionFailure::invalid_response(format!(
                    "unknown prediction label '{}'",
                    label
                ))),
            }
        }
        RawClassification::Other(value) => Err(PredictionFailure::invalid_response(format!(
            "unsupported prediction value {}",
            value
        ))),
    }
}

fn churn_probability(probability: RawProbability) -> Result<f64, PredictionFailure> {
    let value = match probability {
        RawProbability::Scalar(value) => value,
        // [P(no churn), P(churn)]
        RawProbability::Pair(pair) if pair.len() == 2 => pair[1],
        RawProbability::Pair(pair) => {
            return Err(PredictionFailure::invalid_response(format!(
                "expected a probability pair, got {} values",
                pair.len()
            )))
        }
        RawProbability::Other(value) => {
            return Err(PredictionFailure::invalid_response(format!(
                "unsupported probability value {}",
                value
            )))
        }
    };

    if !is_unit(value) {
        return Err(PredictionFailure::invalid_response(format!(
            "probability {} is outside [0, 1]",
            value
        )));
    }
    Ok(value)
}

fn is_unit(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
