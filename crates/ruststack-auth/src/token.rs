//! Turning a [`RawRequest`] into a signable [`ClientRequestToken`].
//!
//! The canonicalizer is stateless apart from the endpoint list it was built
//! with. It parses the `Authorization` header, classifies the host, and
//! precomputes every canonical component the signers need, so a token is
//! immutable once produced.

use std::fmt;

use tracing::debug;

use crate::canonical::{
    HostStyle, S3Endpoints, build_canonical_headers, build_canonical_query_string,
    build_canonical_uri,
};
use crate::crypto::sha256_hex;
use crate::error::AuthError;
use crate::request::RawRequest;
use crate::sigv2::{SIGV2_ALGORITHM, SigV2Fields, is_sigv2, parse_sigv2_header};
use crate::sigv4::{SIGV4_ALGORITHM, parse_authorization_header};

/// Header carrying the session token of temporary credentials.
pub const SECURITY_TOKEN_HEADER: &str = "x-amz-security-token";
/// Header carrying the client-computed payload hash.
pub const CONTENT_SHA256_HEADER: &str = "x-amz-content-sha256";
/// Header carrying the signature of the previous chunk of a streaming upload.
pub const PREVIOUS_SIGNATURE_HEADER: &str = "previous-signature-sha256";
/// Header carrying the signature of the current chunk of a streaming upload.
pub const CURRENT_SIGNATURE_HEADER: &str = "current-signature-sha256";

/// The signing protocol a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningVersion {
    /// `AWS <AccessKeyId>:<Signature>` (HMAC-SHA1).
    V2,
    /// `AWS4-HMAC-SHA256 Credential=..., SignedHeaders=..., Signature=...`.
    V4,
}

impl SigningVersion {
    /// Detect the signing version from an `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnsupportedAlgorithm`] for any other scheme.
    ///
    /// # Examples
    ///
    /// ```
    /// use ruststack_auth::SigningVersion;
    ///
    /// assert_eq!(SigningVersion::detect("AWS AKID:c2ln").unwrap(), SigningVersion::V2);
    /// assert_eq!(
    ///     SigningVersion::detect("AWS4-HMAC-SHA256 Credential=...").unwrap(),
    ///     SigningVersion::V4
    /// );
    /// assert!(SigningVersion::detect("Bearer abc").is_err());
    /// ```
    pub fn detect(authorization: &str) -> Result<Self, AuthError> {
        let authorization = authorization.trim_start();
        if authorization.starts_with("AWS4-") {
            Ok(Self::V4)
        } else if is_sigv2(authorization) {
            Ok(Self::V2)
        } else {
            let scheme = authorization.split_whitespace().next().unwrap_or_default();
            Err(AuthError::UnsupportedAlgorithm(scheme.to_owned()))
        }
    }
}

impl fmt::Display for SigningVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V2 => f.write_str("V2"),
            Self::V4 => f.write_str("V4"),
        }
    }
}

/// The `date/region/service` part of a SigV4 credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialScope {
    date: String,
    region: String,
    service: String,
}

impl CredentialScope {
    /// Create a scope.
    pub fn new(
        date: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            region: region.into(),
            service: service.into(),
        }
    }

    /// The scope date (`YYYYMMDD`).
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// The scope region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The scope service.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/aws4_request", self.date, self.region, self.service)
    }
}

/// Chaining signatures carried by one chunk of a streaming upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSignature {
    previous_signature: String,
    current_signature: String,
}

impl ChunkSignature {
    /// Signature of the previous chunk, or of the seed request for the first chunk.
    #[must_use]
    pub fn previous_signature(&self) -> &str {
        &self.previous_signature
    }

    /// Signature claimed for this chunk.
    #[must_use]
    pub fn current_signature(&self) -> &str {
        &self.current_signature
    }
}

/// A canonicalized, signable view of one client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRequestToken {
    version: SigningVersion,
    method: String,
    uri: String,
    canonical_uri: String,
    canonical_query: String,
    canonical_headers: String,
    signed_headers: Vec<String>,
    hashed_payload: String,
    access_key_id: String,
    credential_scope: Option<CredentialScope>,
    algorithm: String,
    signature: String,
    session_token: Option<String>,
    request_date: String,
    bucket: Option<String>,
    chunk: Option<ChunkSignature>,
    sigv2: Option<SigV2Fields>,
}

impl ClientRequestToken {
    /// The signing version.
    #[must_use]
    pub fn version(&self) -> SigningVersion {
        self.version
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request path as received.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The canonical URI, without the bucket segment for path-style hosts.
    #[must_use]
    pub fn canonical_uri(&self) -> &str {
        &self.canonical_uri
    }

    /// The canonical query string.
    #[must_use]
    pub fn canonical_query(&self) -> &str {
        &self.canonical_query
    }

    /// The canonical headers block, each header as `name:value\n`. Empty for V2.
    #[must_use]
    pub fn canonical_headers(&self) -> &str {
        &self.canonical_headers
    }

    /// Signed header names as delivered by the client. Empty for V2.
    #[must_use]
    pub fn signed_headers(&self) -> &[String] {
        &self.signed_headers
    }

    /// The payload hash: `x-amz-content-sha256` if sent, else SHA-256 of the body.
    #[must_use]
    pub fn hashed_payload(&self) -> &str {
        &self.hashed_payload
    }

    /// The access key id that claims to have signed the request.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The SigV4 credential scope. `None` for V2.
    #[must_use]
    pub fn credential_scope(&self) -> Option<&CredentialScope> {
        self.credential_scope.as_ref()
    }

    /// The signing algorithm named by the request.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// The signature from the `Authorization` header.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The signature this request must be verified against.
    ///
    /// For a streaming chunk this is the chunk's own signature rather than
    /// the one in the `Authorization` header.
    #[must_use]
    pub fn claimed_signature(&self) -> &str {
        self.chunk
            .as_ref()
            .map_or(self.signature.as_str(), ChunkSignature::current_signature)
    }

    /// The `x-amz-security-token` header, if sent.
    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// `x-amz-date`, falling back to `Date`. Empty if neither was sent.
    #[must_use]
    pub fn request_date(&self) -> &str {
        &self.request_date
    }

    /// The bucket named by a virtual-hosted `Host` header.
    #[must_use]
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    /// Streaming chunk signatures, if this token is a chunk.
    #[must_use]
    pub fn chunk(&self) -> Option<&ChunkSignature> {
        self.chunk.as_ref()
    }

    /// SigV2 string-to-sign inputs. `None` for V4.
    #[must_use]
    pub fn sigv2(&self) -> Option<&SigV2Fields> {
        self.sigv2.as_ref()
    }
}

/// Builds [`ClientRequestToken`]s from raw requests.
///
/// # Examples
///
/// ```
/// use ruststack_auth::{RawRequest, RequestCanonicalizer, SigningVersion};
/// use ruststack_auth::canonical::S3Endpoints;
///
/// let canonicalizer = RequestCanonicalizer::new(S3Endpoints::new(["s3.example.com"]));
/// let request = RawRequest::new("GET", "/mybucket/key.txt?b=2&a=1")
///     .with_header("host", "s3.example.com")
///     .with_header("x-amz-date", "20130524T000000Z")
///     .with_header(
///         "authorization",
///         "AWS4-HMAC-SHA256 Credential=AKID/20130524/us-east-1/s3/aws4_request, \
///          SignedHeaders=host;x-amz-date, Signature=abc",
///     );
///
/// let token = canonicalizer.canonicalize(&request).unwrap();
/// assert_eq!(token.version(), SigningVersion::V4);
/// assert_eq!(token.canonical_uri(), "/key.txt");
/// assert_eq!(token.canonical_query(), "a=1&b=2");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestCanonicalizer {
    endpoints: S3Endpoints,
}

impl RequestCanonicalizer {
    /// Create a canonicalizer for the given S3 endpoints.
    #[must_use]
    pub fn new(endpoints: S3Endpoints) -> Self {
        Self { endpoints }
    }

    /// Create a canonicalizer for the configured endpoints.
    #[must_use]
    pub fn from_config(config: &ruststack_core::AuthConfig) -> Self {
        Self::new(S3Endpoints::from_config(config))
    }

    /// The endpoints used for host classification.
    #[must_use]
    pub fn endpoints(&self) -> &S3Endpoints {
        &self.endpoints
    }

    /// Canonicalize a request.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingAuthHeader`] when there is no
    /// `Authorization` header, and a malformed-request error when the header
    /// cannot be parsed or a signed header is missing.
    pub fn canonicalize(&self, request: &RawRequest) -> Result<ClientRequestToken, AuthError> {
        let authorization = request
            .header("authorization")
            .ok_or(AuthError::MissingAuthHeader)?;
        let version = SigningVersion::detect(authorization)?;
        let style = self.endpoints.classify(request.header("host").unwrap_or_default());
        let bucket = match &style {
            HostStyle::VirtualHosted { bucket } => Some(bucket.clone()),
            HostStyle::PathStyle | HostStyle::Other => None,
        };

        debug!(
            %version,
            method = request.method(),
            path = request.path(),
            ?style,
            "Canonicalizing request"
        );

        let mut token = ClientRequestToken {
            version,
            method: request.method().to_owned(),
            uri: request.path().to_owned(),
            canonical_uri: build_canonical_uri(request.path(), &style),
            canonical_query: build_canonical_query_string(request.query()),
            canonical_headers: String::new(),
            signed_headers: Vec::new(),
            hashed_payload: payload_hash(request),
            access_key_id: String::new(),
            credential_scope: None,
            algorithm: String::new(),
            signature: String::new(),
            session_token: request.header(SECURITY_TOKEN_HEADER).map(ToOwned::to_owned),
            request_date: request_date(request).to_owned(),
            bucket,
            chunk: None,
            sigv2: None,
        };

        match version {
            SigningVersion::V4 => {
                let parsed = parse_authorization_header(authorization)?;
                token.canonical_headers = build_canonical_headers(request, &parsed.signed_headers)?;
                token.chunk = chunk_signature(request)?;
                token.access_key_id = parsed.access_key_id;
                token.credential_scope = Some(CredentialScope {
                    date: parsed.date,
                    region: parsed.region,
                    service: parsed.service,
                });
                token.signed_headers = parsed.signed_headers;
                token.algorithm = SIGV4_ALGORITHM.to_owned();
                token.signature = parsed.signature;
            }
            SigningVersion::V2 => {
                let (access_key_id, signature) = parse_sigv2_header(authorization)?;
                token.sigv2 = Some(SigV2Fields::from_request(request, token.bucket.as_deref()));
                token.access_key_id = access_key_id;
                token.algorithm = SIGV2_ALGORITHM.to_owned();
                token.signature = signature;
            }
        }

        Ok(token)
    }
}

fn payload_hash(request: &RawRequest) -> String {
    request.header(CONTENT_SHA256_HEADER).map_or_else(
        || sha256_hex(request.body()),
        |hash| hash.trim().to_owned(),
    )
}

fn request_date(request: &RawRequest) -> &str {
    request
        .header("x-amz-date")
        .or_else(|| request.header("date"))
        .unwrap_or_default()
        .trim()
}

fn chunk_signature(request: &RawRequest) -> Result<Option<ChunkSignature>, AuthError> {
    let Some(previous) = request.header(PREVIOUS_SIGNATURE_HEADER) else {
        return Ok(None);
    };
    let current = request
        .header(CURRENT_SIGNATURE_HEADER)
        .ok_or_else(|| AuthError::MissingHeader(CURRENT_SIGNATURE_HEADER.to_owned()))?;

    Ok(Some(ChunkSignature {
        previous_signature: previous.trim().to_owned(),
        current_signature: current.trim().to_owned(),
    }))
}
