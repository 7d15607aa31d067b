//! AWS Signature Version 2 verification.
//!
//! SigV2 is an older signing mechanism that uses HMAC-SHA1. The `Authorization`
//! header has the format:
//!
//! ```text
//! AWS <AWSAccessKeyId>:<Signature>
//! ```
//!
//! Where `Signature = Base64(HMAC-SHA1(SecretKey, StringToSign))` and:
//!
//! ```text
//! StringToSign = HTTP-Verb + "\n" +
//!                Content-MD5 + "\n" +
//!                Content-Type + "\n" +
//!                Date + "\n" +
//!                CanonicalizedAmzHeaders +
//!                CanonicalizedResource
//! ```

use std::collections::BTreeMap;

use crate::crypto::{hmac_sha1, to_base64};
use crate::error::AuthError;
use crate::request::RawRequest;
use crate::signer::Signer;
use crate::token::{ClientRequestToken, SigningVersion};

/// Algorithm name recorded on SigV2 tokens.
pub const SIGV2_ALGORITHM: &str = "HmacSHA1";

/// S3 sub-resources that must be included in the canonical resource.
const SUB_RESOURCES: &[&str] = &[
    "acl",
    "cors",
    "delete",
    "lifecycle",
    "location",
    "logging",
    "notification",
    "partNumber",
    "policy",
    "requestPayment",
    "response-cache-control",
    "response-content-disposition",
    "response-content-encoding",
    "response-content-language",
    "response-content-type",
    "response-expires",
    "restore",
    "tagging",
    "torrent",
    "uploadId",
    "uploads",
    "versionId",
    "versioning",
    "versions",
    "website",
];

/// Check whether the `Authorization` header uses SigV2 format (`AWS AKID:sig`).
#[must_use]
pub fn is_sigv2(auth_header: &str) -> bool {
    auth_header.starts_with("AWS ") && !auth_header.starts_with("AWS4-")
}

/// Parse a SigV2 `Authorization` header: `AWS AKID:Signature`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidAuthHeader`] if the prefix, the separator, the
/// access key id, or the signature is missing.
pub fn parse_sigv2_header(header: &str) -> Result<(String, String), AuthError> {
    let rest = header
        .trim()
        .strip_prefix("AWS ")
        .ok_or_else(|| AuthError::invalid_header("expected 'AWS <AccessKeyId>:<Signature>'"))?;

    let (access_key_id, signature) = rest
        .trim()
        .split_once(':')
        .ok_or_else(|| AuthError::invalid_header("missing ':' between access key and signature"))?;

    if access_key_id.is_empty() || signature.is_empty() {
        return Err(AuthError::invalid_header("empty access key or signature"));
    }

    Ok((access_key_id.to_owned(), signature.to_owned()))
}

/// Request fields that feed the SigV2 string to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigV2Fields {
    content_md5: String,
    content_type: String,
    date: String,
    amz_headers: String,
    canonical_resource: String,
}

impl SigV2Fields {
    /// Extract the SigV2 inputs from a request.
    ///
    /// `bucket` is the bucket named by a virtual-hosted `Host` header; it is
    /// prepended to the canonical resource.
    #[must_use]
    pub fn from_request(request: &RawRequest, bucket: Option<&str>) -> Self {
        let header = |name: &str| request.header(name).unwrap_or_default().trim().to_owned();

        // When x-amz-date is present, the Date field in StringToSign is empty.
        let date = if request.header("x-amz-date").is_some() {
            String::new()
        } else {
            header("date")
        };

        Self {
            content_md5: header("content-md5"),
            content_type: header("content-type"),
            date,
            amz_headers: build_canonicalized_amz_headers(request),
            canonical_resource: build_canonicalized_resource(bucket, request.path(), request.query()),
        }
    }

    /// The `Content-MD5` header, or empty.
    #[must_use]
    pub fn content_md5(&self) -> &str {
        &self.content_md5
    }

    /// The `Content-Type` header, or empty.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The `Date` line value. Empty when `x-amz-date` is sent.
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// CanonicalizedAmzHeaders, each as `name:value\n`.
    #[must_use]
    pub fn amz_headers(&self) -> &str {
        &self.amz_headers
    }

    /// CanonicalizedResource.
    #[must_use]
    pub fn canonical_resource(&self) -> &str {
        &self.canonical_resource
    }

    /// Assemble the string to sign for `method`.
    #[must_use]
    pub fn string_to_sign(&self, method: &str) -> String {
        format!(
            "{method}\n{}\n{}\n{}\n{}{}",
            self.content_md5, self.content_type, self.date, self.amz_headers, self.canonical_resource
        )
    }
}

/// Build the CanonicalizedAmzHeaders string.
///
/// All x-amz-* headers are lowercased, sorted, and each is formatted as
/// `name:value\n`.
fn build_canonicalized_amz_headers(request: &RawRequest) -> String {
    let amz_headers: BTreeMap<&str, &str> = request
        .headers()
        .iter()
        .filter(|(name, _)| name.starts_with("x-amz-"))
        .map(|(name, value)| (name.as_str(), value.trim()))
        .collect();

    let mut result = String::new();
    for (name, value) in &amz_headers {
        result.push_str(name);
        result.push(':');
        result.push_str(value);
        result.push('\n');
    }

    result
}

/// Build the CanonicalizedResource string.
///
/// This is `/bucket` for virtual-hosted requests, then the URI path, then any
/// sub-resource query parameters (sorted).
fn build_canonicalized_resource(bucket: Option<&str>, path: &str, query: &str) -> String {
    let mut resource = String::new();
    if let Some(bucket) = bucket {
        resource.push('/');
        resource.push_str(bucket);
    }
    if path.is_empty() {
        resource.push('/');
    } else {
        resource.push_str(path);
    }

    let mut sub_params: Vec<(&str, Option<String>)> = Vec::new();
    for param in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = param.split_once('=').map_or((param, None), |(k, v)| {
            let decoded = percent_encoding::percent_decode_str(v)
                .decode_utf8_lossy()
                .into_owned();
            // Treat empty values the same as absent values for sub-resources.
            (k, Some(decoded).filter(|d| !d.is_empty()))
        });
        if SUB_RESOURCES.contains(&key) {
            sub_params.push((key, value));
        }
    }

    sub_params.sort_by(|a, b| a.0.cmp(b.0));

    if !sub_params.is_empty() {
        let params_str: Vec<String> = sub_params
            .iter()
            .map(|(k, v)| match v {
                Some(val) => format!("{k}={val}"),
                None => (*k).to_owned(),
            })
            .collect();
        resource.push('?');
        resource.push_str(&params_str.join("&"));
    }

    resource
}

/// Compute the SigV2 signature: Base64(HMAC-SHA1(secret, string_to_sign)).
#[must_use]
pub fn compute_sigv2_signature(secret_key: &str, string_to_sign: &str) -> String {
    to_base64(&hmac_sha1(secret_key.as_bytes(), string_to_sign.as_bytes()))
}

/// The SigV2 (HMAC-SHA1) signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigV2Signer;

impl Signer for SigV2Signer {
    fn version(&self) -> SigningVersion {
        SigningVersion::V2
    }

    fn string_to_sign(&self, token: &ClientRequestToken) -> String {
        token
            .sigv2()
            .map(|fields| fields.string_to_sign(token.method()))
            .unwrap_or_default()
    }

    fn compute_signature(&self, token: &ClientRequestToken, secret_key: &str) -> String {
        if token.sigv2().is_none() {
            return String::new();
        }
        compute_sigv2_signature(secret_key, &self.string_to_sign(token))
    }
}
