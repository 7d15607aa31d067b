//! Error types for request authentication.
//!
//! All authentication failures are represented by [`AuthError`]. Each variant
//! carries the structured detail a response layer needs (offending header,
//! access key id, timestamps) and maps onto a coarse [`AuthErrorKind`] and an
//! AWS error code. Secret material never appears in an error.

/// Coarse classification of authentication failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// Unparsable `Authorization` header or request line. Always a client error.
    MalformedRequest,
    /// The access key is absent or inactive.
    InvalidAccessKey,
    /// The requestor is absent, presented a bad session token, or its
    /// temporary credential has expired.
    InvalidRequestor,
    /// The computed signature differs from the claimed one.
    SignatureMismatch,
    /// The credential store could not be reached.
    StoreUnavailable,
}

/// Errors that can occur while authenticating a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The request line (method or URI) is missing or unusable.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The `Authorization` header is missing from the request.
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    /// The `Authorization` header could not be parsed.
    #[error("Invalid Authorization header: {reason}")]
    InvalidAuthHeader {
        /// What was wrong with the header.
        reason: String,
    },

    /// The signing algorithm is not supported.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The `Credential` component does not match
    /// `AKID/date/region/service/aws4_request`.
    #[error("Invalid credential scope: {0}")]
    InvalidCredential(String),

    /// A header referenced by the signature is missing.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// A header value is not valid visible ASCII/UTF-8.
    #[error("Invalid value for header: {0}")]
    InvalidHeaderValue(String),

    /// The request date is empty or not in a recognized format.
    #[error("Invalid request date: {0:?}")]
    InvalidRequestDate(String),

    /// The request date is too far from the server clock.
    #[error("Request time {request_time} is too skewed from server time {server_time}")]
    RequestTimeTooSkewed {
        /// The request date as sent by the client.
        request_time: String,
        /// The server time at validation, RFC 3339.
        server_time: String,
    },

    /// The access key id is unknown.
    #[error("Access key does not exist: {0}")]
    InvalidAccessKeyId(String),

    /// The access key exists but is not active.
    #[error("Access key is inactive: {0}")]
    InactiveAccessKey(String),

    /// A resolved access key has no owning requestor (store inconsistency).
    #[error("No requestor owns access key {0}")]
    RequestorNotFound(String),

    /// The session token presented by a federated requestor does not match.
    #[error("The security token included in the request is invalid")]
    InvalidClientTokenId,

    /// The temporary credential has expired.
    #[error("Credential expired at {expiry}")]
    ExpiredCredential {
        /// The stored expiry of the credential.
        expiry: String,
    },

    /// The stored credential expiry is missing or unparsable (store inconsistency).
    #[error("Stored expiry of access key {access_key_id} is invalid: {expiry:?}")]
    InvalidCredentialExpiry {
        /// The access key whose expiry is invalid.
        access_key_id: String,
        /// The stored value, if any.
        expiry: Option<String>,
    },

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,

    /// The credential store failed.
    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AuthError {
    pub(crate) fn invalid_header(reason: impl Into<String>) -> Self {
        Self::InvalidAuthHeader {
            reason: reason.into(),
        }
    }

    /// The coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::InvalidRequest(_)
            | Self::MissingAuthHeader
            | Self::InvalidAuthHeader { .. }
            | Self::UnsupportedAlgorithm(_)
            | Self::InvalidCredential(_)
            | Self::MissingHeader(_)
            | Self::InvalidHeaderValue(_)
            | Self::InvalidRequestDate(_)
            | Self::RequestTimeTooSkewed { .. } => AuthErrorKind::MalformedRequest,
            Self::InvalidAccessKeyId(_) | Self::InactiveAccessKey(_) => {
                AuthErrorKind::InvalidAccessKey
            }
            Self::RequestorNotFound(_)
            | Self::InvalidClientTokenId
            | Self::ExpiredCredential { .. }
            | Self::InvalidCredentialExpiry { .. } => AuthErrorKind::InvalidRequestor,
            Self::SignatureDoesNotMatch => AuthErrorKind::SignatureMismatch,
            Self::StoreUnavailable(_) => AuthErrorKind::StoreUnavailable,
        }
    }

    /// The AWS error code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::MissingAuthHeader => "MissingAuthenticationToken",
            Self::InvalidAuthHeader { .. }
            | Self::UnsupportedAlgorithm(_)
            | Self::InvalidCredential(_)
            | Self::MissingHeader(_)
            | Self::InvalidHeaderValue(_)
            | Self::InvalidRequestDate(_) => "IncompleteSignature",
            Self::RequestTimeTooSkewed { .. } => "RequestTimeTooSkewed",
            Self::InvalidAccessKeyId(_) => "InvalidAccessKeyId",
            Self::InactiveAccessKey(_) => "InactiveAccessKey",
            Self::InvalidClientTokenId => "InvalidClientTokenId",
            Self::ExpiredCredential { .. } => "ExpiredCredential",
            Self::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            Self::RequestorNotFound(_)
            | Self::InvalidCredentialExpiry { .. }
            | Self::StoreUnavailable(_) => "InternalFailure",
        }
    }

    /// Whether the failure is a server-side condition rather than a client error.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.code() == "InternalFailure"
    }
}
