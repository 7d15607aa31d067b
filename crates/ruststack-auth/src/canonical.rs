//! Canonical request construction for AWS Signature Version 4.
//!
//! This module implements the canonical request format as specified by AWS:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! `CanonicalHeaders` ends with a newline of its own, so the canonical
//! request carries an empty line between headers and the signed header list.
//!
//! The canonical URI depends on how the client addressed the bucket. See
//! [`S3Endpoints::classify`].

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::AuthError;
use crate::request::RawRequest;

/// The set of characters that must be percent-encoded in query keys and values.
///
/// All characters except the RFC 3986 unreserved characters
/// (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`) are encoded. Space becomes `%20`.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Value a signed but empty `content-type` header is canonicalized to.
pub const DEFAULT_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// How a request addressed its bucket, judged from the `Host` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostStyle {
    /// `<bucket>.<endpoint>`: the bucket is in the host name.
    VirtualHosted {
        /// The bucket named by the host.
        bucket: String,
    },
    /// `<endpoint>`: the bucket, if any, is the first path segment.
    PathStyle,
    /// Not an S3 endpoint (IAM, STS, or an unknown host).
    Other,
}

/// Ordered list of S3 DNS endpoints used to classify request hosts.
///
/// # Examples
///
/// ```
/// use ruststack_auth::canonical::{HostStyle, S3Endpoints};
///
/// let endpoints = S3Endpoints::new(["s3.example.com"]);
/// assert_eq!(endpoints.classify("s3.example.com"), HostStyle::PathStyle);
/// assert_eq!(
///     endpoints.classify("photos.s3.example.com:8080"),
///     HostStyle::VirtualHosted { bucket: "photos".to_owned() }
/// );
/// assert_eq!(endpoints.classify("iam.example.com"), HostStyle::Other);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Endpoints {
    endpoints: Vec<String>,
}

impl S3Endpoints {
    /// Create from endpoints in match order (default endpoint first).
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints
                .into_iter()
                .map(|e| e.into().to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Create from the configured default and regional endpoints.
    #[must_use]
    pub fn from_config(config: &ruststack_core::AuthConfig) -> Self {
        Self::new(config.endpoints())
    }

    /// The endpoints in match order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.endpoints.iter().map(String::as_str)
    }

    /// Classify a `Host` header value.
    ///
    /// Any `:port` suffix is ignored. Virtual-hosted form is checked against
    /// every endpoint before path style, and the first matching endpoint wins.
    #[must_use]
    pub fn classify(&self, host: &str) -> HostStyle {
        let host = strip_port(host.trim()).to_ascii_lowercase();

        for endpoint in &self.endpoints {
            if let Some(bucket) = host
                .strip_suffix(endpoint.as_str())
                .and_then(|prefix| prefix.strip_suffix('.'))
                .filter(|bucket| !bucket.is_empty())
            {
                return HostStyle::VirtualHosted {
                    bucket: bucket.to_owned(),
                };
            }
        }

        if self.endpoints.iter().any(|endpoint| *endpoint == host) {
            HostStyle::PathStyle
        } else {
            HostStyle::Other
        }
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Build the canonical URI for a request path.
///
/// Empty paths are normalized to `/`. For path-style hosts a leading bucket
/// segment is removed: `/bucket/key` becomes `/key` and `/bucket/` becomes
/// `/`. A bare `/bucket` and every other host style pass through unchanged.
///
/// # Examples
///
/// ```
/// use ruststack_auth::canonical::{HostStyle, build_canonical_uri};
///
/// assert_eq!(build_canonical_uri("/mybucket/key.txt", &HostStyle::PathStyle), "/key.txt");
/// assert_eq!(build_canonical_uri("/key.txt", &HostStyle::Other), "/key.txt");
/// assert_eq!(build_canonical_uri("", &HostStyle::Other), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str, style: &HostStyle) -> String {
    if path.is_empty() {
        return "/".to_owned();
    }

    if *style == HostStyle::PathStyle {
        if let Some((_, rest)) = path
            .strip_prefix('/')
            .and_then(|p| p.split_once('/'))
            .filter(|(bucket, _)| !bucket.is_empty())
        {
            return format!("/{rest}");
        }
    }

    path.to_owned()
}

/// Build the canonical query string by encoding and sorting parameters.
///
/// Each parameter is split on the first `=` (a missing value is empty), then
/// key and value are percent-decoded and re-encoded with the RFC 3986
/// unreserved set so already-encoded input is not double-encoded. Parameters
/// are sorted by encoded key, then by encoded value for duplicate keys.
///
/// # Examples
///
/// ```
/// use ruststack_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string(""), "");
/// assert_eq!(build_canonical_query_string("b=2&a=1"), "a=1&b=2");
/// assert_eq!(build_canonical_query_string("prefix=a b&acl"), "acl=&prefix=a%20b");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(String, String)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            (reencode(key), reencode(value))
        })
        .collect();

    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers block for the signed headers.
///
/// Headers appear in the order given by `signed_headers`, each as
/// `name:value\n`. Values are trimmed and inner whitespace runs collapse to a
/// single space. An empty signed `content-type` is replaced with
/// [`DEFAULT_CONTENT_TYPE`].
///
/// # Errors
///
/// Returns [`AuthError::MissingHeader`] if a signed header is absent.
pub fn build_canonical_headers(
    request: &RawRequest,
    signed_headers: &[String],
) -> Result<String, AuthError> {
    let mut canonical = String::new();

    for name in signed_headers {
        let raw = request
            .header(name)
            .ok_or_else(|| AuthError::MissingHeader(name.clone()))?;
        let mut value = collapse_whitespace(raw.trim());
        if name == "content-type" && value.is_empty() {
            DEFAULT_CONTENT_TYPE.clone_into(&mut value);
        }

        canonical.push_str(name);
        canonical.push(':');
        canonical.push_str(&value);
        canonical.push('\n');
    }

    Ok(canonical)
}

/// Build the signed headers string as a semicolon-separated list.
///
/// # Examples
///
/// ```
/// use ruststack_auth::canonical::build_signed_headers_string;
///
/// let signed = ["host".to_owned(), "x-amz-date".to_owned()];
/// assert_eq!(build_signed_headers_string(&signed), "host;x-amz-date");
/// ```
#[must_use]
pub fn build_signed_headers_string(signed_headers: &[String]) -> String {
    signed_headers.join(";")
}

/// Join already-canonical components into the canonical request.
///
/// `canonical_headers` must carry its trailing newline, as produced by
/// [`build_canonical_headers`].
#[must_use]
pub fn build_canonical_request(
    method: &str,
    canonical_uri: &str,
    canonical_query: &str,
    canonical_headers: &str,
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
    )
}

/// Percent-decode then encode a query component with the RFC 3986 unreserved set.
fn reencode(component: &str) -> String {
    let decoded = percent_decode_str(component).decode_utf8_lossy();
    uri_encode(&decoded)
}

/// URI-encode a string using the AWS SigV4 encoding rules.
pub(crate) fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Collapse consecutive whitespace characters in a string to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
