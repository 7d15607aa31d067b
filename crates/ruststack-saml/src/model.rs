//! SAML response and identity provider model.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use typed_builder::TypedBuilder;

/// Name ID format of a persistent subject.
pub const PERSISTENT_NAME_ID_FORMAT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent";

/// Session duration used when neither the client nor the assertion limits it.
pub const DEFAULT_SESSION_DURATION_SECS: i64 = 3600;

/// An X.509 certificate as base64 DER text.
///
/// Whitespace and PEM armour are ignored, so the same certificate copied from
/// metadata with different line wrapping compares equal.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Certificate(String);

impl Certificate {
    /// Wrap certificate text, normalizing it for comparison.
    pub fn new(text: impl AsRef<str>) -> Self {
        let body: String = text
            .as_ref()
            .lines()
            .filter(|line| !line.trim_start().starts_with("-----"))
            .flat_map(str::chars)
            .filter(|c| !c.is_whitespace())
            .collect();
        Self(body)
    }

    /// The normalized base64 body.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(16).collect();
        write!(f, "Certificate({prefix}..)")
    }
}

/// What a certificate registered in IdP metadata may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyUse {
    /// Verifying signatures.
    Signing,
    /// Encrypting assertions.
    Encryption,
}

impl KeyUse {
    /// Parse the `use` attribute of a metadata `KeyDescriptor`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "signing" => Some(Self::Signing),
            "encryption" => Some(Self::Encryption),
            _ => None,
        }
    }
}

/// The XML signature carried by a SAML response.
///
/// Opaque to the validator; only an [`XmlSignatureVerifier`](crate::XmlSignatureVerifier)
/// interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSignature {
    algorithm: String,
    value: String,
    signed_content: String,
}

impl ResponseSignature {
    /// Create a signature from its algorithm URI, base64 value, and the
    /// canonicalized content it covers.
    pub fn new(
        algorithm: impl Into<String>,
        value: impl Into<String>,
        signed_content: impl Into<String>,
    ) -> Self {
        Self {
            algorithm: algorithm.into(),
            value: value.into(),
            signed_content: signed_content.into(),
        }
    }

    /// The signature algorithm URI.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// The base64 signature value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The canonicalized XML covered by the signature.
    #[must_use]
    pub fn signed_content(&self) -> &str {
        &self.signed_content
    }
}

/// The subject name ID format, reduced to the two kinds STS reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectType {
    /// A stable, opaque identifier.
    Persistent,
    /// Any other format.
    #[default]
    Transient,
}

impl SubjectType {
    /// Classify a `NameID` `Format` attribute.
    #[must_use]
    pub fn from_name_id_format(format: &str) -> Self {
        if format == PERSISTENT_NAME_ID_FORMAT {
            Self::Persistent
        } else {
            Self::Transient
        }
    }

    /// The name reported to clients.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Persistent => "persistent",
            Self::Transient => "transient",
        }
    }
}

/// Claims extracted from one SAML response.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct SamlResponseTokens {
    /// Entity ID of the issuing identity provider.
    pub issuer: String,
    /// Audience restriction values of the assertion.
    #[builder(default)]
    pub audiences: Vec<String>,
    /// Whether the response status was `Success`.
    pub authentication_success: bool,
    /// When the response was issued.
    pub issue_instant: DateTime<Utc>,
    /// Start of the bearer subject confirmation window.
    #[builder(default, setter(strip_option))]
    pub not_before: Option<DateTime<Utc>>,
    /// End of the bearer subject confirmation window.
    #[builder(default, setter(strip_option))]
    pub not_on_or_after: Option<DateTime<Utc>>,
    /// Certificate embedded in the signature's `KeyInfo`.
    #[builder(default, setter(strip_option))]
    pub signing_certificate: Option<Certificate>,
    /// The response signature.
    pub signature: ResponseSignature,
    /// Subject name ID.
    pub subject: String,
    /// Subject name ID format.
    #[builder(default)]
    pub subject_type: SubjectType,
    /// Value of the `RoleSessionName` attribute.
    #[builder(default)]
    pub role_session_name: String,
    /// Values of the `Role` attribute.
    #[builder(default)]
    pub roles: Vec<String>,
    /// `SessionNotOnOrAfter` of the authentication statement.
    #[builder(default, setter(strip_option))]
    pub session_not_on_or_after: Option<DateTime<Utc>>,
}

/// An identity provider registered with an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamlProvider {
    name: String,
    account: String,
    issuer: String,
    metadata: String,
    key_descriptors: BTreeMap<KeyUse, Vec<Certificate>>,
    expiry: Option<DateTime<Utc>>,
}

impl SamlProvider {
    /// Create a provider without certificates or expiry.
    pub fn new(
        name: impl Into<String>,
        account: impl Into<String>,
        issuer: impl Into<String>,
        metadata: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            account: account.into(),
            issuer: issuer.into(),
            metadata: metadata.into(),
            key_descriptors: BTreeMap::new(),
            expiry: None,
        }
    }

    /// Register a certificate for `key_use`.
    #[must_use]
    pub fn with_certificate(mut self, key_use: KeyUse, certificate: Certificate) -> Self {
        self.key_descriptors
            .entry(key_use)
            .or_default()
            .push(certificate);
        self
    }

    /// Set when the provider registration expires.
    #[must_use]
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Provider name within its account.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Account that registered the provider.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Entity ID declared by the provider metadata.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The raw metadata document the provider was registered with.
    #[must_use]
    pub fn metadata(&self) -> &str {
        &self.metadata
    }

    /// When the registration expires, if ever.
    #[must_use]
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    /// Certificates registered for `key_use`.
    #[must_use]
    pub fn certificates(&self, key_use: KeyUse) -> &[Certificate] {
        self.key_descriptors
            .get(&key_use)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every registered certificate, signing ones first.
    pub fn all_certificates(&self) -> impl Iterator<Item = &Certificate> {
        self.key_descriptors.values().flatten()
    }

    /// Whether the registration has expired at `now`. A provider without an
    /// expiry never expires.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| now > expiry)
    }
}

/// The federated identity established by a valid SAML response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamlSession {
    /// Entity ID of the identity provider.
    pub issuer: String,
    /// Account that registered the provider.
    pub provider_account: String,
    /// Subject name ID.
    pub subject: String,
    /// Subject name ID format.
    pub subject_type: SubjectType,
    /// Session name for the assumed role.
    pub role_session_name: String,
    /// Role claims from the assertion.
    pub roles: Vec<String>,
    /// Latest time the session may last, if the IdP set one.
    pub session_not_on_or_after: Option<DateTime<Utc>>,
}

impl SamlSession {
    pub(crate) fn from_tokens(tokens: &SamlResponseTokens, provider: &SamlProvider) -> Self {
        Self {
            issuer: tokens.issuer.clone(),
            provider_account: provider.account().to_owned(),
            subject: tokens.subject.clone(),
            subject_type: tokens.subject_type,
            role_session_name: tokens.role_session_name.clone(),
            roles: tokens.roles.clone(),
            session_not_on_or_after: tokens.session_not_on_or_after,
        }
    }

    /// Lifetime in seconds of the temporary credentials issued for this session.
    ///
    /// The client's requested duration (default one hour) is capped by the
    /// IdP's `SessionNotOnOrAfter`, and never drops below zero. Requests too
    /// long for a [`Duration`] saturate to [`Duration::MAX`].
    #[must_use]
    pub fn duration_at(&self, now: DateTime<Utc>, requested_secs: Option<i64>) -> Duration {
        let secs = requested_secs
            .unwrap_or(DEFAULT_SESSION_DURATION_SECS)
            .max(0);
        let requested = Duration::try_seconds(secs).unwrap_or(Duration::MAX);
        let capped = match self.session_not_on_or_after {
            Some(limit) => requested.min(limit - now),
            None => requested,
        };
        capped.max(Duration::zero())
    }
}
