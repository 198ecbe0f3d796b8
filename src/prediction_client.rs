use crate::cancellation::CancellationToken;
use crate::config::Config;
use crate::errors::PredictionFailure;
use crate::models::{PredictionResult, ValidatedPayload};
use crate::normalize::{normalize, RawPrediction};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// Per-call knobs for [`PredictionClient::predict`].
#[derive(Debug, Clone, Default)]
pub struct PredictOptions {
    /// Overrides the configured deadline for this call.
    pub timeout: Option<Duration>,
    /// Aborts the call when triggered; the call then fails as `Cancelled`.
    pub cancel: Option<CancellationToken>,
    /// Start of the deadline window. Defaults to the start of the call.
    pub started_at: Option<Instant>,
}

/// Client for the churn prediction service.
///
/// Sends one `POST /predict` per call. Never retries.
#[derive(Clone)]
pub struct PredictionClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    warm_up_timeout: Duration,
    default_threshold: f64,
}

impl PredictionClient {
    /// Creates a new `PredictionClient` from the loaded configuration.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("churn-predict/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create prediction client: {}", e))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            warm_up_timeout: config.warm_up_timeout,
            default_threshold: config.default_threshold,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests a prediction for a validated payload.
    ///
    /// The deadline and the optional cancellation token race the request;
    /// whichever fires first decides the failure cause. Dropping the losing
    /// request future aborts the HTTP exchange.
    ///
    /// # Returns
    ///
    /// * `Result<PredictionResult, PredictionFailure>` - The normalized prediction.
    pub async fn predict(
        &self,
        payload: &ValidatedPayload,
        options: PredictOptions,
    ) -> Result<PredictionResult, PredictionFailure> {
        let url = format!("{}/predict", self.base_url);
        let timeout = options.timeout.unwrap_or(self.timeout);
        let started = Instant::now();
        let deadline = options.started_at.unwrap_or(started) + timeout;

        tracing::info!(
            "Requesting churn prediction from {} ({:?} left of {:?})",
            url,
            deadline.saturating_duration_since(started),
            timeout
        );
        tracing::debug!("Prediction payload: {:?}", payload);

        let exchange = tokio::time::timeout_at(deadline, self.exchange(&url, payload));

        let outcome = match options.cancel {
            Some(mut token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(PredictionFailure::cancelled()),
                finished = exchange => {
                    finished.unwrap_or_else(|_| Err(PredictionFailure::timeout(timeout)))
                }
            },
            None => exchange
                .await
                .unwrap_or_else(|_| Err(PredictionFailure::timeout(timeout))),
        };

        match &outcome {
            Ok(result) => tracing::info!(
                "✓ Prediction received in {:?}: {} (p={:.4})",
                started.elapsed(),
                result.classification,
                result.churn_probability
            ),
            Err(failure) => tracing::warn!(
                "❌ Prediction failed after {:?}: {}",
                started.elapsed(),
                failure
            ),
        }

        outcome
    }

    async fn exchange(
        &self,
        url: &str,
        payload: &ValidatedPayload,
    ) -> Result<PredictionResult, PredictionFailure> {
        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok();
            let message = rejection_message(status, body.as_deref());
            tracing::warn!("Prediction service returned {}: {}", status, message);
            return Err(PredictionFailure::rejected(message));
        }

        let body = response.text().await?;
        let raw: RawPrediction = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("Unexpected prediction response format: {}", body);
            PredictionFailure::invalid_response(e.to_string())
        })?;

        normalize(raw, self.default_threshold)
    }

    /// Pings `GET /` so a sleeping service starts booting.
    ///
    /// Never fails: any error is logged and reported as `false`.
    pub async fn warm_up(&self) -> bool {
        let url = format!("{}/", self.base_url);
        tracing::debug!("Warming up prediction service: {}", url);

        match self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .timeout(self.warm_up_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("✓ Prediction service is awake");
                true
            }
            Ok(response) => {
                tracing::warn!("Warm-up probe returned {}", response.status());
                false
            }
            Err(e) => {
                tracing::warn!("Warm-up probe failed: {}", e);
                false
            }
        }
    }

    /// Checks that the service at `base_url` is the churn prediction API.
    pub async fn check_health(&self) -> bool {
        let url = format!("{}/", self.base_url);

        let response = match self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .timeout(self.warm_up_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!("Health check returned {}", response.status());
                return false;
            }
            Err(e) => {
                tracing::warn!("Health check failed: {}", e);
                return false;
            }
        };

        match response.json::<Value>().await {
            Ok(body) => body
                .get("message")
                .and_then(Value::as_str)
                .map(|message| message.contains("Churn Prediction API is running"))
                .unwrap_or(false),
            Err(e) => {
                tracing::warn!("Health check body unreadable: {}", e);
                false
            }
        }
    }
}

/// Builds the user-facing message for a non-success response.
///
/// Validation errors in the `{"detail": [{"loc": [..], "msg": ..}]}` form
/// become `"field: msg"` entries joined by `", "`.
pub fn rejection_message(status: StatusCode, body: Option<&str>) -> String {
    let fallback = || format!("Request failed with status {}", status);

    let body = match body.map(str::trim) {
        Some(body) if !body.is_empty() => body,
        _ => return fallback(),
    };

    let message = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            let detail = map.get("detail").map(detail_message);
            detail.unwrap_or_else(|| Value::Object(map).to_string())
        }
        Ok(Value::String(text)) => text,
        Ok(other) => other.to_string(),
        Err(_) => body.to_string(),
    };

    if message.trim().is_empty() {
        fallback()
    } else {
        message
    }
}

fn detail_message(detail: &Value) -> String {
    match detail {
        Value::String(text) => text.clone(),
        Value::Array(entries) => entries
            .iter()
            .map(|entry| {
                let field = entry
                    .get("loc")
                    .and_then(Value::as_array)
                    .and_then(|loc| loc.last())
                    .map(|part| match part {
                        Value::String(name) => name.clone(),
                        other => other.to_string(),
                    });
                let msg = entry.get("msg").and_then(Value::as_str);
                match (field, msg) {
                    (Some(field), Some(msg)) => format!("{}: {}", field, msg),
                    (None, Some(msg)) => msg.to_string(),
                    _ => entry.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = PredictionClient::new(&Config {
            api_url: "https://example.com/".to_string(),
            ..Config::default()
        });
        assert_eq!(client.unwrap().base_url(), "https://example.com");
    }

    #[test]
    fn test_validation_detail_is_joined() {
        let body = r#"{"detail": [
            {"loc": ["body", "age"], "msg": "Input should be greater than 17", "type": "greater_than"},
            {"loc": ["body", "country"], "msg": "Field required", "type": "missing"}
        ]}"#;
        assert_eq!(
            rejection_message(StatusCode::UNPROCESSABLE_ENTITY, Some(body)),
            "age: Input should be greater than 17, country: Field required"
        );
    }

    #[test]
    fn test_string_detail_is_verbatim() {
        assert_eq!(
            rejection_message(StatusCode::BAD_REQUEST, Some(r#"{"detail": "Model not loaded"}"#)),
            "Model not loaded"
        );
    }

    #[test]
    fn test_unstructured_json_is_stringified() {
        assert_eq!(
            rejection_message(StatusCode::BAD_REQUEST, Some(r#"{"error":"bad"}"#)),
            r#"{"error":"bad"}"#
        );
        assert_eq!(
            rejection_message(StatusCode::BAD_REQUEST, Some(r#"{"detail":{"code":7}}"#)),
            r#"{"code":7}"#
        );
    }

    #[test]
    fn test_plain_text_is_verbatim() {
        assert_eq!(
            rejection_message(StatusCode::INTERNAL_SERVER_ERROR, Some("Internal Server Error")),
            "Internal Server Error"
        );
        assert_eq!(
            rejection_message(StatusCode::BAD_GATEWAY, Some(r#""upstream down""#)),
            "upstream down"
        );
    }

    #[test]
    fn test_empty_body_falls_back_to_status_line() {
        assert_eq!(
            rejection_message(StatusCode::SERVICE_UNAVAILABLE, None),
            "Request failed with status 503 Service Unavailable"
        );
        assert_eq!(
            rejection_message(StatusCode::SERVICE_UNAVAILABLE, Some("  ")),
            "Request failed with status 503 Service Unavailable"
        );
        assert_eq!(
            rejection_message(StatusCode::UNPROCESSABLE_ENTITY, Some(r#"{"detail": []}"#)),
            "Request failed with status 422 Unprocessable Entity"
        );
    }
}
