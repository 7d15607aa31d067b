//! Configuration for the RustStack IAM authentication core.
//!
//! All configuration is driven by environment variables, matching the
//! conventions of the other RustStack services. Every field has a default so
//! that an empty environment yields a usable configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{RustStackError, RustStackResult};

/// Authentication core configuration.
///
/// # Examples
///
/// ```
/// use ruststack_core::AuthConfig;
///
/// let config = AuthConfig::builder()
///     .default_endpoint("s3.example.com".to_owned())
///     .s3_endpoints(vec!["s3-us.example.com".to_owned()])
///     .build();
/// let endpoints: Vec<&str> = config.endpoints().collect();
/// assert_eq!(endpoints, ["s3.example.com", "s3-us.example.com"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// The default S3 DNS endpoint (e.g. `s3.example.com`).
    #[builder(default = String::from("s3.localhost.localstack.cloud"))]
    pub default_endpoint: String,

    /// Regional S3 DNS endpoints, checked after the default endpoint.
    #[builder(default)]
    pub s3_endpoints: Vec<String>,

    /// Maximum allowed difference between the request date and the server clock.
    #[builder(default = 900)]
    pub max_request_skew_secs: u64,

    /// Maximum age of a SAML assertion, measured from its issue instant.
    #[builder(default = 300)]
    pub max_saml_request_latency_secs: u64,

    /// Audience (recipient) that SAML responses must be addressed to.
    #[builder(default = String::from("https://signin.aws.amazon.com/saml"))]
    pub saml_audience: String,

    /// Maximum number of entries held by the credential cache.
    #[builder(default = 1024)]
    pub credential_cache_capacity: usize,

    /// Time-to-live of a credential cache entry.
    #[builder(default = 60)]
    pub credential_cache_ttl_secs: u64,

    /// Fallback tracing filter (e.g. `"info"`, `"debug"`) used when `RUST_LOG`
    /// is unset.
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DEFAULT_ENDPOINT` | `s3.localhost.localstack.cloud` |
    /// | `S3_ENDPOINTS` | *(empty, comma separated)* |
    /// | `MAX_REQUEST_SKEW_SECS` | `900` |
    /// | `MAX_SAML_REQUEST_LATENCY_SECS` | `300` |
    /// | `SAML_AUDIENCE` | `https://signin.aws.amazon.com/saml` |
    /// | `CREDENTIAL_CACHE_CAPACITY` | `1024` |
    /// | `CREDENTIAL_CACHE_TTL_SECS` | `60` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// # Errors
    ///
    /// Returns [`RustStackError::Config`] if a numeric variable cannot be parsed
    /// or a time window is too large to represent.
    pub fn from_env() -> RustStackResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`RustStackError::Config`] if a numeric variable cannot be parsed
    /// or a time window is too large to represent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RustStackResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("DEFAULT_ENDPOINT") {
            config.default_endpoint = v;
        }
        if let Some(v) = lookup("S3_ENDPOINTS") {
            config.s3_endpoints = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect();
        }
        if let Some(v) = lookup("MAX_REQUEST_SKEW_SECS") {
            config.max_request_skew_secs = parse_window("MAX_REQUEST_SKEW_SECS", &v)?;
        }
        if let Some(v) = lookup("MAX_SAML_REQUEST_LATENCY_SECS") {
            config.max_saml_request_latency_secs =
                parse_window("MAX_SAML_REQUEST_LATENCY_SECS", &v)?;
        }
        if let Some(v) = lookup("SAML_AUDIENCE") {
            config.saml_audience = v;
        }
        if let Some(v) = lookup("CREDENTIAL_CACHE_CAPACITY") {
            config.credential_cache_capacity = parse_number("CREDENTIAL_CACHE_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("CREDENTIAL_CACHE_TTL_SECS") {
            config.credential_cache_ttl_secs = parse_number("CREDENTIAL_CACHE_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        Ok(config)
    }

    /// The configured S3 endpoints in match order: default first, then regional.
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.default_endpoint.as_str())
            .chain(self.s3_endpoints.iter().map(String::as_str))
    }

    /// Maximum request clock skew as a [`chrono::Duration`].
    ///
    /// Values too large for a [`chrono::Duration`] saturate to
    /// [`chrono::TimeDelta::MAX`].
    #[must_use]
    pub fn max_request_skew(&self) -> chrono::Duration {
        seconds(self.max_request_skew_secs)
    }

    /// Maximum SAML request latency as a [`chrono::Duration`].
    #[must_use]
    pub fn max_saml_request_latency(&self) -> chrono::Duration {
        seconds(self.max_saml_request_latency_secs)
    }

    /// Credential cache entry time-to-live.
    #[must_use]
    pub fn credential_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.credential_cache_ttl_secs)
    }
}

fn try_seconds(secs: u64) -> Option<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::TimeDelta::try_seconds)
}

fn seconds(secs: u64) -> chrono::Duration {
    try_seconds(secs).unwrap_or(chrono::TimeDelta::MAX)
}

fn parse_window(name: &str, value: &str) -> RustStackResult<u64> {
    let secs = parse_number(name, value)?;
    if try_seconds(secs).is_none() {
        return Err(RustStackError::Config(format!(
            "{name} is out of range, got {secs}"
        )));
    }
    Ok(secs)
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> RustStackResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RustStackError::Config(format!("{name} must be a number, got {value:?}")))
}
