use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Why a prediction request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// The deadline elapsed before the service answered.
    Timeout,
    /// The request was aborted by the caller before it completed.
    Cancelled,
    /// The service could not be reached (DNS, connection refused, reset).
    Network,
    /// The service answered with a non-success status.
    ServerRejected,
    /// The service answered 2xx but the body was not a usable prediction.
    InvalidResponse,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureCause::Timeout => "timeout",
            FailureCause::Cancelled => "cancelled",
            FailureCause::Network => "network",
            FailureCause::ServerRejected => "server rejected",
            FailureCause::InvalidResponse => "invalid response",
        };
        f.write_str(label)
    }
}

/// A failed prediction, carrying the message shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionFailure {
    pub message: String,
    pub cause: FailureCause,
}

impl PredictionFailure {
    pub fn new(cause: FailureCause, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause,
        }
    }

    /// Deadline expired. The hosted service sleeps when idle, so the message
    /// points the user at a cold start rather than a broken backend.
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            FailureCause::Timeout,
            format!(
                "The server is taking too long to respond (no answer after {}s). \
                 It may be waking up from idle; please wait a moment and try again.",
                after.as_secs_f64()
            ),
        )
    }

    pub fn cancelled() -> Self {
        Self::new(
            FailureCause::Cancelled,
            "The prediction request was cancelled.",
        )
    }

    pub fn network() -> Self {
        Self::new(
            FailureCause::Network,
            "Cannot connect to the prediction service. Please check your internet connection.",
        )
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(FailureCause::ServerRejected, message)
    }

    pub fn invalid_response(detail: impl Into<String>) -> Self {
        Self::new(
            FailureCause::InvalidResponse,
            format!("Invalid response format from server: {}", detail.into()),
        )
    }
}

impl fmt::Display for PredictionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prediction failed ({}): {}", self.cause, self.message)
    }
}

impl std::error::Error for PredictionFailure {}

impl From<reqwest::Error> for PredictionFailure {
    /// Maps a transport-level `reqwest::Error`.
    ///
    /// Only errors raised before a response status was seen end up here;
    /// status and body handling happen in the client itself.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            tracing::warn!("Prediction transport timed out: {}", err);
            return PredictionFailure::new(
                FailureCause::Timeout,
                "The server is taking too long to respond. \
                 It may be waking up from idle; please wait a moment and try again.",
            );
        }
        if err.is_decode() {
            return PredictionFailure::invalid_response(err.to_string());
        }
        tracing::warn!("Prediction transport error: {}", err);
        PredictionFailure::network()
    }
}
