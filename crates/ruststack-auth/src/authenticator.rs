//! End-to-end request authentication.
//!
//! [`Authenticator`] wires the pieces together in the order the checks must
//! run:
//!
//! 1. Canonicalize the request into a [`ClientRequestToken`].
//! 2. Check the request date against the server clock.
//! 3. Resolve and validate the access key.
//! 4. Resolve and validate the owning requestor.
//! 5. Verify the signature with the signer for the token's version.

use chrono::{DateTime, Utc};
use ruststack_core::{AuthConfig, dates};
use tracing::{debug, info, warn};

use crate::credentials::{CredentialStore, Requestor, StoreError};
use crate::error::AuthError;
use crate::request::RawRequest;
use crate::requestor::RequestorValidator;
use crate::signer::signer_for;
use crate::token::{ClientRequestToken, RequestCanonicalizer, SigningVersion};

/// The result of a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    /// The access key ID that signed the request.
    pub access_key_id: String,
    /// The authenticated requestor.
    pub requestor: Requestor,
    /// The signing version used.
    pub version: SigningVersion,
    /// The region from the credential scope. Empty for V2.
    pub region: String,
    /// The service from the credential scope. Empty for V2.
    pub service: String,
    /// The list of headers that were included in the signature.
    pub signed_headers: Vec<String>,
}

/// Authenticates requests against a [`CredentialStore`].
///
/// # Examples
///
/// ```
/// use ruststack_auth::{AuthError, Authenticator, RawRequest, StaticCredentialStore};
/// use ruststack_core::AuthConfig;
///
/// let authenticator = Authenticator::new(&AuthConfig::default(), StaticCredentialStore::default());
/// let request = RawRequest::new("GET", "/").with_header("host", "s3.localhost.localstack.cloud");
///
/// assert_eq!(authenticator.authenticate(&request), Err(AuthError::MissingAuthHeader));
/// ```
#[derive(Debug)]
pub struct Authenticator<S> {
    canonicalizer: RequestCanonicalizer,
    validator: RequestorValidator,
    store: S,
    max_skew: chrono::Duration,
}

impl<S: CredentialStore> Authenticator<S> {
    /// Create an authenticator using the configured endpoints and skew limit.
    pub fn new(config: &AuthConfig, store: S) -> Self {
        Self {
            canonicalizer: RequestCanonicalizer::from_config(config),
            validator: RequestorValidator,
            store,
            max_skew: config.max_request_skew(),
        }
    }

    /// The canonicalizer in use.
    #[must_use]
    pub fn canonicalizer(&self) -> &RequestCanonicalizer {
        &self.canonicalizer
    }

    /// The credential store in use.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Authenticate a request against the current time.
    ///
    /// # Errors
    ///
    /// See [`Authenticator::authenticate_at`].
    pub fn authenticate(&self, request: &RawRequest) -> Result<AuthResult, AuthError> {
        self.authenticate_at(request, dates::now_utc())
    }

    /// Authenticate a request as if the server clock read `now`.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as an [`AuthError`]: malformed
    /// request, bad request date, unknown or inactive access key, invalid
    /// requestor, store failure, or signature mismatch.
    pub fn authenticate_at(
        &self,
        request: &RawRequest,
        now: DateTime<Utc>,
    ) -> Result<AuthResult, AuthError> {
        let result = self
            .canonicalizer
            .canonicalize(request)
            .and_then(|token| self.authenticate_token_at(&token, now));

        if let Err(err) = &result {
            warn!(code = err.code(), error = %err, "Request authentication failed");
        }
        result
    }

    /// Authenticate an already canonicalized token as if the clock read `now`.
    ///
    /// Streaming chunk tokens skip the request-date skew check: every chunk
    /// carries the seed request's `x-amz-date`, so a long upload would
    /// otherwise be rejected part way through. Chunks are still bound to that
    /// date through the chained signature.
    ///
    /// # Errors
    ///
    /// As for [`Authenticator::authenticate_at`], minus canonicalization errors.
    pub fn authenticate_token_at(
        &self,
        token: &ClientRequestToken,
        now: DateTime<Utc>,
    ) -> Result<AuthResult, AuthError> {
        let access_key_id = token.access_key_id();

        if token.chunk().is_none() {
            self.check_request_date(token.request_date(), now)?;
        }

        let access_key = lookup(self.store.find_access_key(access_key_id))?;
        let access_key = self
            .validator
            .validate_access_key(access_key_id, access_key.as_ref())?;

        let requestor = lookup(self.store.find_requestor(access_key))?;
        let requestor =
            self.validator
                .validate_requestor_at(access_key_id, requestor.as_ref(), token, now)?;

        debug!(
            access_key_id,
            requestor = requestor.name(),
            version = %token.version(),
            "Verifying signature"
        );

        if !signer_for(token.version()).authenticate(token, access_key.secret_key()) {
            return Err(AuthError::SignatureDoesNotMatch);
        }

        info!(
            access_key_id,
            requestor = requestor.name(),
            account = requestor.account_name(),
            "Request authenticated"
        );

        let scope = token.credential_scope();
        Ok(AuthResult {
            access_key_id: access_key_id.to_owned(),
            requestor: requestor.clone(),
            version: token.version(),
            region: scope.map(|s| s.region().to_owned()).unwrap_or_default(),
            service: scope.map(|s| s.service().to_owned()).unwrap_or_default(),
            signed_headers: token.signed_headers().to_vec(),
        })
    }

    fn check_request_date(&self, request_date: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
        if request_date.is_empty() {
            return Err(AuthError::InvalidRequestDate(String::new()));
        }
        let request_time = dates::parse_request_date(request_date)
            .map_err(|_| AuthError::InvalidRequestDate(request_date.to_owned()))?;

        if (now - request_time).abs() > self.max_skew {
            return Err(AuthError::RequestTimeTooSkewed {
                request_time: request_date.to_owned(),
                server_time: dates::to_rfc3339(&now),
            });
        }
        Ok(())
    }
}

/// Map a store result to `Some`, `None` for not found, or a store failure.
fn lookup<T>(result: Result<T, StoreError>) -> Result<Option<T>, AuthError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::NotFound(_)) => Ok(None),
        Err(StoreError::Unavailable(reason)) => Err(AuthError::StoreUnavailable(reason)),
    }
}
