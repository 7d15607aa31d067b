//! SAML validation errors.

use std::fmt;

use chrono::{DateTime, Utc};

/// The validation step at which an assertion was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationStage {
    /// Authentication status and audience restriction.
    Audience,
    /// Age of the assertion relative to its issue instant.
    Latency,
    /// The subject confirmation `NotBefore` / `NotOnOrAfter` window.
    TimeWindow,
    /// Expiry of the registered identity provider.
    ProviderExpiry,
    /// Issuer of the assertion against the registered provider.
    Issuer,
    /// XML signature and signing certificate.
    Signature,
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Audience => "audience",
            Self::Latency => "latency",
            Self::TimeWindow => "time window",
            Self::ProviderExpiry => "provider expiry",
            Self::Issuer => "issuer",
            Self::Signature => "signature",
        };
        f.write_str(name)
    }
}

/// Errors produced while validating a SAML response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SamlError {
    /// The identity provider's claim cannot be accepted.
    #[error("IdP rejected claim at {stage} check: {detail}")]
    IdpRejectedClaim {
        /// The check that failed.
        stage: ValidationStage,
        /// What was wrong.
        detail: String,
    },

    /// The assertion is older than the allowed request latency.
    #[error("SAML response issued at {issue_instant} has expired")]
    ExpiredToken {
        /// The assertion's issue instant.
        issue_instant: DateTime<Utc>,
    },

    /// The assertion does not match the registered provider.
    #[error("Invalid identity token at {stage} check: {detail}")]
    InvalidIdentityToken {
        /// The check that failed.
        stage: ValidationStage,
        /// What was wrong.
        detail: String,
    },

    /// No identity provider is registered for the issuer.
    #[error("No identity provider registered for issuer {0}")]
    ProviderNotFound(String),

    /// The identity provider store failed.
    #[error("Identity provider store unavailable: {0}")]
    StoreUnavailable(String),
}

impl SamlError {
    pub(crate) fn rejected(stage: ValidationStage, detail: impl Into<String>) -> Self {
        Self::IdpRejectedClaim {
            stage,
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid(stage: ValidationStage, detail: impl Into<String>) -> Self {
        Self::InvalidIdentityToken {
            stage,
            detail: detail.into(),
        }
    }

    /// The AWS-style error code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::IdpRejectedClaim { .. } => "IdpRejectedClaim",
            Self::ExpiredToken { .. } => "ExpiredToken",
            Self::InvalidIdentityToken { .. } | Self::ProviderNotFound(_) => "InvalidIdentityToken",
            Self::StoreUnavailable(_) => "InternalFailure",
        }
    }

    /// The validation step that rejected the assertion, if any.
    #[must_use]
    pub fn stage(&self) -> Option<ValidationStage> {
        match self {
            Self::IdpRejectedClaim { stage, .. } | Self::InvalidIdentityToken { stage, .. } => {
                Some(*stage)
            }
            Self::ExpiredToken { .. } => Some(ValidationStage::Latency),
            Self::ProviderNotFound(_) => Some(ValidationStage::Issuer),
            Self::StoreUnavailable(_) => None,
        }
    }

    /// Whether the failure is a server-side condition rather than a bad assertion.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}
