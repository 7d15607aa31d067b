//! Validation of SAML responses against a registered identity provider.
//!
//! Checks run in a fixed order and the first failure ends validation:
//!
//! 1. The response reports success and is addressed to our audience.
//! 2. The response is no older than the maximum request latency.
//! 3. The current time is inside the `NotBefore` / `NotOnOrAfter` window.
//! 4. The provider registration has not expired.
//! 5. The issuer is the provider's registered issuer.
//! 6. The signature verifies against a registered signing certificate.

use chrono::{DateTime, Utc};
use ruststack_core::{AuthConfig, dates};
use tracing::{debug, info, warn};

use crate::error::{SamlError, ValidationStage};
use crate::model::{KeyUse, SamlProvider, SamlResponseTokens, SamlSession};
use crate::provider::{IdentityProviderStore, ProviderStoreError};
use crate::verifier::XmlSignatureVerifier;

/// Validates SAML responses for the `AssumeRoleWithSAML` exchange.
#[derive(Debug)]
pub struct SamlValidator<V> {
    verifier: V,
    audience: String,
    max_request_latency: chrono::Duration,
}

impl<V: XmlSignatureVerifier> SamlValidator<V> {
    /// Create a validator with the audience and latency limit from `config`.
    pub fn new(config: &AuthConfig, verifier: V) -> Self {
        Self {
            verifier,
            audience: config.saml_audience.clone(),
            max_request_latency: config.max_saml_request_latency(),
        }
    }

    /// The signature verifier in use.
    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Validate `tokens` against `provider` at the current time.
    ///
    /// # Errors
    ///
    /// See [`SamlValidator::validate_at`].
    pub fn validate(
        &self,
        tokens: &SamlResponseTokens,
        provider: &SamlProvider,
    ) -> Result<SamlSession, SamlError> {
        self.validate_at(tokens, provider, dates::now_utc())
    }

    /// Validate `tokens` against `provider` as of `now`.
    ///
    /// # Errors
    ///
    /// - [`SamlError::IdpRejectedClaim`] if authentication failed, the audience
    ///   does not match, `now` is outside the confirmation window, or the
    ///   provider registration expired.
    /// - [`SamlError::ExpiredToken`] if the response is older than the
    ///   maximum request latency.
    /// - [`SamlError::InvalidIdentityToken`] if the issuer or signature does
    ///   not match the provider.
    pub fn validate_at(
        &self,
        tokens: &SamlResponseTokens,
        provider: &SamlProvider,
        now: DateTime<Utc>,
    ) -> Result<SamlSession, SamlError> {
        match self.check(tokens, provider, now) {
            Ok(()) => {
                info!(
                    issuer = %tokens.issuer,
                    account = provider.account(),
                    subject = %tokens.subject,
                    "SAML response accepted"
                );
                Ok(SamlSession::from_tokens(tokens, provider))
            }
            Err(e) => {
                warn!(issuer = %tokens.issuer, code = e.code(), error = %e, "SAML response rejected");
                Err(e)
            }
        }
    }

    /// Resolve the provider for the response's issuer, then validate.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::ProviderNotFound`] for an unknown issuer,
    /// [`SamlError::StoreUnavailable`] if the store failed, and otherwise
    /// anything [`SamlValidator::validate_at`] returns.
    pub fn validate_with_store<S: IdentityProviderStore + ?Sized>(
        &self,
        tokens: &SamlResponseTokens,
        store: &S,
    ) -> Result<SamlSession, SamlError> {
        self.validate_with_store_at(tokens, store, dates::now_utc())
    }

    /// [`SamlValidator::validate_with_store`] as of `now`.
    ///
    /// # Errors
    ///
    /// See [`SamlValidator::validate_with_store`].
    pub fn validate_with_store_at<S: IdentityProviderStore + ?Sized>(
        &self,
        tokens: &SamlResponseTokens,
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<SamlSession, SamlError> {
        let provider = store.find_provider(&tokens.issuer).map_err(|e| {
            warn!(issuer = %tokens.issuer, error = %e, "Identity provider lookup failed");
            match e {
                ProviderStoreError::NotFound(issuer) => SamlError::ProviderNotFound(issuer),
                ProviderStoreError::Unavailable(reason) => SamlError::StoreUnavailable(reason),
            }
        })?;
        self.validate_at(tokens, &provider, now)
    }

    fn check(
        &self,
        tokens: &SamlResponseTokens,
        provider: &SamlProvider,
        now: DateTime<Utc>,
    ) -> Result<(), SamlError> {
        if !tokens.authentication_success {
            return Err(SamlError::rejected(
                ValidationStage::Audience,
                "response status is not Success",
            ));
        }
        if !tokens.audiences.iter().any(|a| *a == self.audience) {
            return Err(SamlError::rejected(
                ValidationStage::Audience,
                format!("response is not addressed to {}", self.audience),
            ));
        }

        // An IssueInstant near the end of time has no representable deadline
        // and cannot have expired yet.
        if tokens
            .issue_instant
            .checked_add_signed(self.max_request_latency)
            .is_some_and(|deadline| now > deadline)
        {
            return Err(SamlError::ExpiredToken {
                issue_instant: tokens.issue_instant,
            });
        }

        if let Some(not_before) = tokens.not_before {
            if now < not_before {
                return Err(SamlError::rejected(
                    ValidationStage::TimeWindow,
                    format!("not valid before {not_before}"),
                ));
            }
        }
        if let Some(not_on_or_after) = tokens.not_on_or_after {
            if now > not_on_or_after {
                return Err(SamlError::rejected(
                    ValidationStage::TimeWindow,
                    format!("not valid on or after {not_on_or_after}"),
                ));
            }
        }

        if provider.is_expired_at(now) {
            return Err(SamlError::rejected(
                ValidationStage::ProviderExpiry,
                format!("identity provider {} has expired", provider.name()),
            ));
        }

        if provider.issuer() != tokens.issuer {
            return Err(SamlError::invalid(
                ValidationStage::Issuer,
                format!(
                    "issuer {} does not match provider issuer {}",
                    tokens.issuer,
                    provider.issuer()
                ),
            ));
        }

        self.check_signature(tokens, provider)
    }

    fn check_signature(
        &self,
        tokens: &SamlResponseTokens,
        provider: &SamlProvider,
    ) -> Result<(), SamlError> {
        let verified = match &tokens.signing_certificate {
            Some(certificate) => {
                if !provider.certificates(KeyUse::Signing).contains(certificate) {
                    return Err(SamlError::invalid(
                        ValidationStage::Signature,
                        "signing certificate is not registered with the provider",
                    ));
                }
                self.verifier.verify(&tokens.signature, certificate)
            }
            None => self.verifier.verify_with_provider(&tokens.signature, provider),
        };

        match verified {
            Ok(true) => {
                debug!(issuer = %tokens.issuer, "SAML signature verified");
                Ok(())
            }
            Ok(false) => Err(SamlError::invalid(
                ValidationStage::Signature,
                "signature does not verify",
            )),
            Err(e) => Err(SamlError::invalid(ValidationStage::Signature, e.to_string())),
        }
    }
}
