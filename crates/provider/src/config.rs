//! Provider configuration.
//!
//! Settings come from the provider block, with environment variables as a
//! fallback for the token and the API endpoint.

use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Environment variable holding the API token.
pub const ENV_TOKEN: &str = "PAGERDUTY_TOKEN";

/// Environment variable overriding the API endpoint.
pub const ENV_API_URL_OVERRIDE: &str = "PAGERDUTY_API_URL_OVERRIDE";

/// Default API endpoint (US service region).
pub const DEFAULT_API_URL: &str = "https://api.pagerduty.com";

/// Raw provider block as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// API token
    pub token: Option<String>,

    /// Service region, e.g. `eu`
    pub service_region: Option<String>,

    /// Full API URL, takes precedence over `service_region`
    pub api_url_override: Option<String>,

    /// Total time to keep retrying transient failures, in seconds
    pub retry_timeout_secs: Option<u64>,

    /// Wait between retries, in seconds
    pub retry_interval_secs: Option<u64>,

    /// User agent sent with every request
    pub user_agent: Option<String>,
}

/// Fixed-interval retry policy for transient API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Give up once this much time has passed
    pub timeout: Duration,

    /// Wait between attempts
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2 * 60),
            interval: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Checks that the interval fits inside the timeout.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero interval or one longer than the timeout.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::invalid_config("retry interval must be non-zero"));
        }
        if self.interval > self.timeout {
            return Err(Error::invalid_config(format!(
                "retry interval {:?} exceeds retry timeout {:?}",
                self.interval, self.timeout
            )));
        }
        Ok(())
    }

    /// Constant-interval schedule that stops once `timeout` has elapsed.
    pub(crate) fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.interval)
            .with_max_interval(self.interval)
            .with_multiplier(1.0)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(Some(self.timeout))
            .build()
    }
}

/// Validated provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API token
    pub token: SecretString,

    /// API base URL
    pub api_url: Url,

    /// Retry policy for transient failures
    pub retry: RetryPolicy,

    /// User agent sent with every request
    pub user_agent: String,
}

impl ProviderConfig {
    /// Creates a configuration with default retry settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_url` is not a valid URL.
    pub fn new(token: impl Into<String>, api_url: &str) -> Result<Self> {
        Ok(Self {
            token: SecretString::from(token.into()),
            api_url: parse_url(api_url)?,
            retry: RetryPolicy::default(),
            user_agent: default_user_agent(),
        })
    }

    /// Builds the configuration from a provider block and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is available, the URL is invalid, or the
    /// retry settings are inconsistent.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self> {
        let token = settings
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .or_else(|| std::env::var(ENV_TOKEN).ok().filter(|token| !token.is_empty()))
            .ok_or(Error::MissingToken)?;

        let api_url = match settings
            .api_url_override
            .clone()
            .or_else(|| std::env::var(ENV_API_URL_OVERRIDE).ok())
            .filter(|url| !url.is_empty())
        {
            Some(url) => url,
            None => region_url(settings.service_region.as_deref())?,
        };

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            timeout: settings
                .retry_timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
            interval: settings
                .retry_interval_secs
                .map_or(defaults.interval, Duration::from_secs),
        };
        retry.validate()?;

        Ok(Self {
            token: SecretString::from(token),
            api_url: parse_url(&api_url)?,
            retry,
            user_agent: settings
                .user_agent
                .clone()
                .unwrap_or_else(default_user_agent),
        })
    }

    /// Builds the configuration from a JSON provider block.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match [`ProviderSettings`] or
    /// validation fails.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: ProviderSettings = serde_json::from_str(json)?;
        Self::from_settings(&settings)
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Value of the `Authorization` header.
    pub(crate) fn authorization(&self) -> String {
        format!("Token token={}", self.token.expose_secret())
    }
}

fn region_url(region: Option<&str>) -> Result<String> {
    match region.map(str::to_ascii_lowercase).as_deref() {
        None | Some("" | "us") => Ok(DEFAULT_API_URL.to_string()),
        Some(region) if region.chars().all(|c| c.is_ascii_alphanumeric()) => {
            Ok(format!("https://api.{region}.pagerduty.com"))
        }
        Some(region) => Err(Error::invalid_config(format!(
            "invalid service region: {region}"
        ))),
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| Error::invalid_config(format!("invalid API URL {url}: {e}")))
}

fn default_user_agent() -> String {
    format!("terraform-provider-pagerduty/{}", env!("CARGO_PKG_VERSION"))
}
