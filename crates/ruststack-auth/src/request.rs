//! Transport-neutral view of an incoming request.
//!
//! The transport layer hands requests over in one of two shapes: an
//! [`http::request::Parts`] plus body, or a flat string map produced by a
//! form-encoded front end. Both are normalized into a [`RawRequest`] so the
//! canonicalizer sees one representation.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;

use crate::error::AuthError;

/// Form key carrying the HTTP method.
pub const FORM_METHOD: &str = "Method";
/// Form key carrying the request URI as sent by the client.
pub const FORM_URI: &str = "ClientAbsoluteUri";
/// Form key carrying the raw query string.
pub const FORM_QUERY: &str = "ClientQueryParams";
/// Form key carrying the request body.
pub const FORM_PAYLOAD: &str = "RequestPayload";

/// A request reduced to the parts that participate in signing.
///
/// Header names are stored lowercase. Repeated headers are joined with `,`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    method: String,
    path: String,
    query: String,
    headers: BTreeMap<String, String>,
    body: Bytes,
}

impl RawRequest {
    /// Create a request from its method and URI (path with an optional `?query`).
    ///
    /// # Examples
    ///
    /// ```
    /// use ruststack_auth::RawRequest;
    ///
    /// let request = RawRequest::new("GET", "/bucket/key?acl")
    ///     .with_header("Host", "s3.example.com");
    /// assert_eq!(request.path(), "/bucket/key");
    /// assert_eq!(request.query(), "acl");
    /// assert_eq!(request.header("host"), Some("s3.example.com"));
    /// ```
    #[must_use]
    pub fn new(method: impl Into<String>, uri: &str) -> Self {
        let (path, query) = split_uri(uri);
        Self {
            method: method.into(),
            path: path.to_owned(),
            query: query.to_owned(),
            headers: BTreeMap::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header, appending with `,` if it is already present.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.append_header(name, value.into());
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Build a request from HTTP request parts and the collected body.
    ///
    /// If the request carries no `Host` header, the URI authority is used.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidHeaderValue`] if a header value is not
    /// visible ASCII.
    pub fn from_parts(parts: &http::request::Parts, body: Bytes) -> Result<Self, AuthError> {
        let mut request = Self::new(parts.method.as_str(), "");
        request.path = parts.uri.path().to_owned();
        request.query = parts.uri.query().unwrap_or_default().to_owned();
        request.body = body;

        for (name, value) in &parts.headers {
            let value = value
                .to_str()
                .map_err(|_| AuthError::InvalidHeaderValue(name.as_str().to_owned()))?;
            request.append_header(name.as_str(), value.to_owned());
        }

        if !request.headers.contains_key("host") {
            if let Some(authority) = parts.uri.authority() {
                request.append_header("host", authority.as_str().to_owned());
            }
        }

        Ok(request)
    }

    /// Build a request from a flat form map.
    ///
    /// [`FORM_METHOD`] and [`FORM_URI`] are required. [`FORM_QUERY`] overrides
    /// any query embedded in the URI. [`FORM_PAYLOAD`] is the body. Every other
    /// key is a header, matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRequest`] if the method or URI is missing.
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, AuthError> {
        let method = form
            .get(FORM_METHOD)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| AuthError::InvalidRequest(format!("missing {FORM_METHOD}")))?;
        let uri = form
            .get(FORM_URI)
            .ok_or_else(|| AuthError::InvalidRequest(format!("missing {FORM_URI}")))?;

        let mut request = Self::new(method.as_str(), uri);
        if let Some(query) = form.get(FORM_QUERY) {
            request.query = query.trim_start_matches('?').to_owned();
        }
        if let Some(payload) = form.get(FORM_PAYLOAD) {
            request.body = Bytes::from(payload.clone());
        }

        // Sorted so that repeated case variants join in a stable order.
        let mut headers: Vec<(&String, &String)> = form
            .iter()
            .filter(|(k, _)| ![FORM_METHOD, FORM_URI, FORM_QUERY, FORM_PAYLOAD].contains(&k.as_str()))
            .collect();
        headers.sort();
        for (name, value) in headers {
            request.append_header(name, value.clone());
        }

        Ok(request)
    }

    fn append_header(&mut self, name: &str, value: String) {
        self.headers
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The URI path, exactly as received.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string without the leading `?`.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Look up a header by name, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
        } else {
            self.headers.get(name).map(String::as_str)
        }
    }

    /// All headers, keyed by lowercase name.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// The request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

fn split_uri(uri: &str) -> (&str, &str) {
    uri.split_once('?').unwrap_or((uri, ""))
}
