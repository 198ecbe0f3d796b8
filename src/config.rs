use crate::normalize::DEFAULT_THRESHOLD;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://bank-customer-churn-fastapi.onrender.com";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_WARM_UP_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the prediction service, without a trailing slash.
    pub api_url: String,
    /// Deadline for `POST /predict`.
    pub timeout: Duration,
    /// Deadline for the `GET /` warm-up probe.
    pub warm_up_timeout: Duration,
    /// Threshold reported when the service omits one.
    pub default_threshold: f64,
    /// Probe the service before each submission.
    pub warm_up: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            warm_up_timeout: Duration::from_millis(DEFAULT_WARM_UP_TIMEOUT_MS),
            default_threshold: DEFAULT_THRESHOLD,
            warm_up: true,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Prediction API URL: {}", config.api_url);
        tracing::debug!(
            "Timeouts: predict {:?}, warm-up {:?}",
            config.timeout,
            config.warm_up_timeout
        );
        tracing::debug!("Default threshold: {}", config.default_threshold);

        Ok(config)
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_url = var("CHURN_API_URL")
            .or_else(|| var("API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = parse_api_url(&api_url)?;

        let timeout = match var("CHURN_TIMEOUT_MS") {
            Some(raw) => millis(&raw, "CHURN_TIMEOUT_MS", 1_000)?,
            None => Duration::from_millis(DEFAULT_TIMEOUT_MS),
        };

        let warm_up_timeout = match var("CHURN_WARM_UP_TIMEOUT_MS") {
            Some(raw) => millis(&raw, "CHURN_WARM_UP_TIMEOUT_MS", 100)?,
            None => Duration::from_millis(DEFAULT_WARM_UP_TIMEOUT_MS),
        };

        let default_threshold = match var("CHURN_DEFAULT_THRESHOLD") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|t| t.is_finite() && (0.0..=1.0).contains(t))
                .ok_or_else(|| {
                    anyhow::anyhow!("CHURN_DEFAULT_THRESHOLD must be a number between 0 and 1")
                })?,
            None => DEFAULT_THRESHOLD,
        };

        let warm_up = match var("CHURN_WARM_UP") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => anyhow::bail!("CHURN_WARM_UP must be true or false"),
            },
            None => true,
        };

        Ok(Self {
            api_url,
            timeout,
            warm_up_timeout,
            default_threshold,
            warm_up,
        })
    }
}

fn parse_api_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        anyhow::bail!("CHURN_API_URL must start with http:// or https://");
    }
    url::Url::parse(trimmed)
        .map_err(|e| anyhow::anyhow!("CHURN_API_URL is not a valid URL: {}", e))?;
    Ok(trimmed.to_string())
}

fn millis(raw: &str, key: &str, min: u64) -> anyhow::Result<Duration> {
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a whole number of milliseconds", key))?;
    if !(min..=600_000).contains(&value) {
        anyhow::bail!("{} must be between {} and 600000", key, min);
    }
    Ok(Duration::from_millis(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.default_threshold, 0.57);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("CHURN_API_URL", "http://localhost:8000/"),
            ("CHURN_TIMEOUT_MS", "15000"),
            ("CHURN_WARM_UP_TIMEOUT_MS", "500"),
            ("CHURN_DEFAULT_THRESHOLD", "0.3"),
            ("CHURN_WARM_UP", "false"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.warm_up_timeout, Duration::from_millis(500));
        assert_eq!(config.default_threshold, 0.3);
        assert!(!config.warm_up);
    }

    #[test]
    fn test_api_url_fallback() {
        let config = Config::from_lookup(lookup(&[("API_URL", "https://churn.example.com")])).unwrap();
        assert_eq!(config.api_url, "https://churn.example.com");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_lookup(lookup(&[("CHURN_API_URL", "ftp://x")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CHURN_TIMEOUT_MS", "fast")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CHURN_TIMEOUT_MS", "10")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CHURN_DEFAULT_THRESHOLD", "1.5")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CHURN_WARM_UP", "maybe")])).is_err());
    }
}
