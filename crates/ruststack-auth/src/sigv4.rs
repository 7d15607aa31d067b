//! AWS Signature Version 4 verification.
//!
//! This module implements the SigV4 signing flow:
//!
//! 1. Parse the `Authorization` header to extract the credential scope,
//!    signed headers, and provided signature.
//! 2. Join the canonical components of a [`ClientRequestToken`] into the
//!    canonical request.
//! 3. Build the string to sign from the timestamp, credential scope, and canonical request hash.
//! 4. Derive the signing key using HMAC-SHA256 from the secret key and credential scope components.
//! 5. Compute the expected signature. The comparison itself lives in
//!    [`Signer::authenticate`].
//!
//! Streaming uploads sign each chunk with a chained string to sign; see
//! [`build_chunk_string_to_sign`].

use crate::canonical::{build_canonical_request, build_signed_headers_string};
use crate::crypto::{EMPTY_SHA256, hmac_sha256, sha256_hex, to_hex};
use crate::error::AuthError;
use crate::signer::Signer;
use crate::token::{ClientRequestToken, SigningVersion};

/// The only algorithm supported by this implementation.
pub const SIGV4_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Algorithm line of a streaming chunk string to sign.
pub const CHUNK_ALGORITHM: &str = "AWS4-HMAC-SHA256-PAYLOAD";

/// `x-amz-content-sha256` value announcing a signed streaming upload.
pub const STREAMING_PAYLOAD: &str = "STREAMING-AWS4-HMAC-SHA256-PAYLOAD";

/// `x-amz-content-sha256` value for requests whose payload is not signed.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Parsed components of an AWS SigV4 `Authorization` header.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256 Credential=AKID/20130524/us-east-1/s3/aws4_request,
///   SignedHeaders=host;x-amz-content-sha256;x-amz-date,
///   Signature=<hex-signature>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAuth {
    /// The signing algorithm (must be `AWS4-HMAC-SHA256`).
    pub algorithm: String,
    /// The access key ID.
    pub access_key_id: String,
    /// The date component of the credential scope (YYYYMMDD).
    pub date: String,
    /// The AWS region from the credential scope.
    pub region: String,
    /// The AWS service from the credential scope.
    pub service: String,
    /// The list of signed header names (lowercase).
    pub signed_headers: Vec<String>,
    /// The hex-encoded signature.
    pub signature: String,
}

/// Parse an AWS SigV4 `Authorization` header value into its components.
///
/// The header must carry exactly three comma-separated fields,
/// `Credential`, `SignedHeaders` and `Signature`, each as `name=value`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidAuthHeader`] if the header format is invalid,
/// [`AuthError::InvalidCredential`] if the credential is not
/// `AKID/date/region/service/aws4_request`, or
/// [`AuthError::UnsupportedAlgorithm`] if the algorithm is not `AWS4-HMAC-SHA256`.
pub fn parse_authorization_header(header: &str) -> Result<ParsedAuth, AuthError> {
    let (algorithm, rest) = header
        .trim()
        .split_once(' ')
        .ok_or_else(|| AuthError::invalid_header("missing credential fields"))?;

    if algorithm != SIGV4_ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(algorithm.to_owned()));
    }

    let fields: Vec<&str> = rest.split(',').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(AuthError::invalid_header(format!(
            "expected 3 fields, found {}",
            fields.len()
        )));
    }

    let mut credential = None;
    let mut signed_headers = None;
    let mut signature = None;

    for field in fields {
        let (name, value) = field
            .split_once('=')
            .ok_or_else(|| AuthError::invalid_header(format!("missing '=' in {field:?}")))?;
        let slot = match name.trim() {
            "Credential" => &mut credential,
            "SignedHeaders" => &mut signed_headers,
            "Signature" => &mut signature,
            other => {
                return Err(AuthError::invalid_header(format!("unknown field {other:?}")));
            }
        };
        if slot.replace(value.trim()).is_some() {
            return Err(AuthError::invalid_header(format!("duplicate field {name:?}")));
        }
    }

    let credential = credential.ok_or_else(|| AuthError::invalid_header("missing Credential"))?;
    let signed_headers =
        signed_headers.ok_or_else(|| AuthError::invalid_header("missing SignedHeaders"))?;
    let signature = signature
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::invalid_header("missing Signature"))?;

    // Parse credential: AKID/date/region/service/aws4_request
    let cred_parts: Vec<&str> = credential.splitn(5, '/').collect();
    let [access_key_id, date, region, service, terminator] = cred_parts[..] else {
        return Err(AuthError::InvalidCredential(credential.to_owned()));
    };
    if terminator != "aws4_request"
        || [access_key_id, date, region, service].iter().any(|p| p.is_empty())
    {
        return Err(AuthError::InvalidCredential(credential.to_owned()));
    }

    let parsed_signed_headers: Vec<String> = signed_headers
        .split(';')
        .map(str::to_ascii_lowercase)
        .collect();
    if parsed_signed_headers.iter().any(String::is_empty) {
        return Err(AuthError::invalid_header("empty name in SignedHeaders"));
    }

    Ok(ParsedAuth {
        algorithm: algorithm.to_owned(),
        access_key_id: access_key_id.to_owned(),
        date: date.to_owned(),
        region: region.to_owned(),
        service: service.to_owned(),
        signed_headers: parsed_signed_headers,
        signature: signature.to_owned(),
    })
}

/// Build the SigV4 string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use ruststack_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{SIGV4_ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Build the string to sign for one chunk of a streaming upload.
///
/// ```text
/// AWS4-HMAC-SHA256-PAYLOAD\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <previous signature>\n
/// <hex(SHA256(""))>\n
/// <hex(SHA256(chunk data))>
/// ```
#[must_use]
pub fn build_chunk_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    previous_signature: &str,
    chunk_hash: &str,
) -> String {
    format!(
        "{CHUNK_ALGORITHM}\n{timestamp}\n{credential_scope}\n{previous_signature}\n{EMPTY_SHA256}\n{chunk_hash}"
    )
}

/// Derive the SigV4 signing key using HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
///
/// # Examples
///
/// ```
/// use ruststack_auth::sigv4::derive_signing_key;
///
/// let key = derive_signing_key(
///     "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
///     "20130524",
///     "us-east-1",
///     "s3",
/// );
/// assert_eq!(key.len(), 32);
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, b"aws4_request")
}

/// Compute the HMAC-SHA256 signature of `data` using the given `signing_key`.
///
/// Returns the hex-encoded signature.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    to_hex(&hmac_sha256(signing_key, data.as_bytes()))
}

/// Compute the SHA-256 hash of the given payload and return it as a hex string.
///
/// # Examples
///
/// ```
/// use ruststack_auth::sigv4::hash_payload;
///
/// // SHA-256 of empty payload
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    sha256_hex(payload)
}

/// Join the canonical components of a V4 token into its canonical request.
#[must_use]
pub fn canonical_request(token: &ClientRequestToken) -> String {
    build_canonical_request(
        token.method(),
        token.canonical_uri(),
        token.canonical_query(),
        token.canonical_headers(),
        &build_signed_headers_string(token.signed_headers()),
        token.hashed_payload(),
    )
}

/// The SigV4 (HMAC-SHA256) signer, covering plain requests and streaming chunks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigV4Signer;

impl Signer for SigV4Signer {
    fn version(&self) -> SigningVersion {
        SigningVersion::V4
    }

    fn string_to_sign(&self, token: &ClientRequestToken) -> String {
        let scope = token
            .credential_scope()
            .map(ToString::to_string)
            .unwrap_or_default();

        match token.chunk() {
            Some(chunk) => build_chunk_string_to_sign(
                token.request_date(),
                &scope,
                chunk.previous_signature(),
                token.hashed_payload(),
            ),
            None => build_string_to_sign(
                token.request_date(),
                &scope,
                &sha256_hex(canonical_request(token).as_bytes()),
            ),
        }
    }

    fn compute_signature(&self, token: &ClientRequestToken, secret_key: &str) -> String {
        let Some(scope) = token.credential_scope() else {
            return String::new();
        };
        let signing_key =
            derive_signing_key(secret_key, scope.date(), scope.region(), scope.service());
        compute_signature(&signing_key, &self.string_to_sign(token))
    }
}
