//! Access key and requestor lifecycle rules.
//!
//! Lookups that found nothing are passed in as `None`, so a missing record can
//! never reach a check that assumes it exists.

use chrono::{DateTime, Utc};
use ruststack_core::dates;
use tracing::debug;

use crate::credentials::{AccessKey, Requestor};
use crate::crypto::constant_time_eq;
use crate::error::AuthError;
use crate::token::ClientRequestToken;

/// Enforces access key and requestor lifecycle rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestorValidator;

impl RequestorValidator {
    /// Check that an access key exists and is active.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidAccessKeyId`] if the key was not found, or
    /// [`AuthError::InactiveAccessKey`] if it is not active.
    pub fn validate_access_key<'a>(
        &self,
        access_key_id: &str,
        access_key: Option<&'a AccessKey>,
    ) -> Result<&'a AccessKey, AuthError> {
        let Some(access_key) = access_key else {
            return Err(AuthError::InvalidAccessKeyId(access_key_id.to_owned()));
        };

        if !access_key.is_active() {
            return Err(AuthError::InactiveAccessKey(access_key.id().to_owned()));
        }

        Ok(access_key)
    }

    /// Check a requestor against the current time.
    ///
    /// # Errors
    ///
    /// See [`RequestorValidator::validate_requestor_at`].
    pub fn validate_requestor<'a>(
        &self,
        access_key_id: &str,
        requestor: Option<&'a Requestor>,
        token: &ClientRequestToken,
    ) -> Result<&'a Requestor, AuthError> {
        self.validate_requestor_at(access_key_id, requestor, token, dates::now_utc())
    }

    /// Check that a requestor exists and, for federated users, that the
    /// presented session token matches and the credential has not expired.
    ///
    /// # Errors
    ///
    /// - [`AuthError::RequestorNotFound`] if no requestor owns the key.
    /// - [`AuthError::InvalidClientTokenId`] if a federated user presented a
    ///   missing or different session token.
    /// - [`AuthError::InvalidCredentialExpiry`] if the stored expiry is absent
    ///   or unparsable.
    /// - [`AuthError::ExpiredCredential`] if the expiry is before `now`.
    pub fn validate_requestor_at<'a>(
        &self,
        access_key_id: &str,
        requestor: Option<&'a Requestor>,
        token: &ClientRequestToken,
        now: DateTime<Utc>,
    ) -> Result<&'a Requestor, AuthError> {
        let Some(requestor) = requestor else {
            return Err(AuthError::RequestorNotFound(access_key_id.to_owned()));
        };

        let access_key = requestor.access_key();
        let Some(stored_token) = access_key.session_token() else {
            return Ok(requestor);
        };

        let presented = token.session_token().unwrap_or_default();
        if !constant_time_eq(presented.as_bytes(), stored_token.as_bytes()) {
            debug!(access_key_id, "Session token mismatch");
            return Err(AuthError::InvalidClientTokenId);
        }

        let invalid_expiry = || AuthError::InvalidCredentialExpiry {
            access_key_id: access_key.id().to_owned(),
            expiry: access_key.expiry().map(ToOwned::to_owned),
        };
        let raw_expiry = access_key.expiry().ok_or_else(invalid_expiry)?;
        let expiry = dates::parse_timestamp(raw_expiry).map_err(|_| invalid_expiry())?;

        if expiry < now {
            debug!(access_key_id, %expiry, %now, "Temporary credential expired");
            return Err(AuthError::ExpiredCredential {
                expiry: raw_expiry.to_owned(),
            });
        }

        Ok(requestor)
    }
}
