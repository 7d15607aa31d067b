//! Integration tests for the RustStack IAM authentication core.
//!
//! These tests sign requests the way an SDK client would and push them
//! through the full [`Authenticator`] flow, and run SAML exchanges through
//! [`SamlValidator`]. They need no running server.
//!
//! Run them with:
//! ```text
//! cargo test -p ruststack-integration
//! ```

use std::sync::Once;

use chrono::{DateTime, Utc};
use ruststack_auth::sigv4::{SigV4Signer, hash_payload};
use ruststack_auth::token::CONTENT_SHA256_HEADER;
use ruststack_auth::{
    AccessKey, AccessKeyStatus, Authenticator, RawRequest, RequestCanonicalizer, Requestor,
    SigV2Signer, Signer, StaticCredentialStore,
};
use ruststack_core::{AuthConfig, dates};
use ruststack_saml::SamlValidator;
use tracing::debug;

/// Default S3 endpoint used by the tests.
pub const ENDPOINT: &str = "s3.seagate.com";
/// Regional S3 endpoint used by the tests.
pub const REGIONAL_ENDPOINT: &str = "s3-us.seagate.com";
/// IAM endpoint, which is not an S3 endpoint.
pub const IAM_ENDPOINT: &str = "iam.seagate.com";

/// Permanent, active credential.
pub const ALICE_KEY: &str = "AKIAALICE0000000000";
/// Secret of [`ALICE_KEY`].
pub const ALICE_SECRET: &str = "alice/K7MDENG/bPxRfiCYEXAMPLEKEY";
/// Temporary credential of a federated user.
pub const BOB_KEY: &str = "ASIABOB000000000000";
/// Secret of [`BOB_KEY`].
pub const BOB_SECRET: &str = "bob/K7MDENG/bPxRfiCYEXAMPLEKEY";
/// Session token issued with [`BOB_KEY`].
pub const BOB_SESSION_TOKEN: &str = "FQoDYXdzEJr//////////session";
/// Expiry of [`BOB_KEY`].
pub const BOB_EXPIRY: &str = "2017-03-01T13:00:00.000+0000";
/// Inactive credential.
pub const CAROL_KEY: &str = "AKIACAROL0000000000";
/// Secret of [`CAROL_KEY`].
pub const CAROL_SECRET: &str = "carol/K7MDENG/bPxRfiCYEXAMPLEKEY";

static INIT: Once = Once::new();

/// Initialize tracing (once).
///
/// `RUST_LOG` wins; otherwise the filter comes from the `LOG_LEVEL` setting of
/// [`AuthConfig::from_env`], falling back to `warn` if that cannot be loaded.
pub fn init_tracing() {
    INIT.call_once(|| {
        let log_level = AuthConfig::from_env().map_or_else(|_| "warn".to_owned(), |c| c.log_level);
        tracing_subscriber::fmt()
            .with_env_filter(log_filter(&log_level))
            .with_test_writer()
            .init();
    });
}

/// Build the tracing filter: `RUST_LOG` if set and valid, else `log_level`.
#[must_use]
pub fn log_filter(log_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
}

/// Configuration with one default and one regional endpoint.
#[must_use]
pub fn test_config() -> AuthConfig {
    AuthConfig::builder()
        .default_endpoint(ENDPOINT.to_owned())
        .s3_endpoints(vec![REGIONAL_ENDPOINT.to_owned()])
        .build()
}

/// A store holding alice (permanent), bob (federated) and carol (inactive).
#[must_use]
pub fn test_store() -> StaticCredentialStore {
    StaticCredentialStore::new([
        Requestor::new(
            "user-alice",
            "alice",
            "acme",
            AccessKey::new(ALICE_KEY, "user-alice", ALICE_SECRET),
        ),
        Requestor::new(
            "user-bob",
            "bob",
            "acme",
            AccessKey::new(BOB_KEY, "user-bob", BOB_SECRET)
                .with_session(BOB_SESSION_TOKEN, BOB_EXPIRY),
        ),
        Requestor::new(
            "user-carol",
            "carol",
            "acme",
            AccessKey::new(CAROL_KEY, "user-carol", CAROL_SECRET)
                .with_status(AccessKeyStatus::Inactive),
        ),
    ])
}

/// An authenticator over [`test_config`] and [`test_store`].
#[must_use]
pub fn test_authenticator() -> Authenticator<StaticCredentialStore> {
    init_tracing();
    Authenticator::new(&test_config(), test_store())
}

/// A SAML validator over [`test_config`].
#[must_use]
pub fn test_saml_validator<V: ruststack_saml::XmlSignatureVerifier>(
    verifier: V,
) -> SamlValidator<V> {
    init_tracing();
    SamlValidator::new(&test_config(), verifier)
}

/// Sign `request` with SigV4 as a client would at `now`.
///
/// Adds `x-amz-date` and `x-amz-content-sha256` (unless already set) and signs
/// every header present.
pub fn sign_v4(
    request: RawRequest,
    access_key_id: &str,
    secret_key: &str,
    region: &str,
    service: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<RawRequest> {
    let amz_date = dates::to_amz_date(&now);
    let mut request = request.with_header("x-amz-date", amz_date.clone());
    if request.header(CONTENT_SHA256_HEADER).is_none() {
        let payload_hash = hash_payload(request.body());
        request = request.with_header(CONTENT_SHA256_HEADER, payload_hash);
    }

    let signed_headers: Vec<String> = request
        .headers()
        .keys()
        .filter(|name| *name != "authorization")
        .cloned()
        .collect();
    let authorization = |signature: &str| {
        format!(
            "AWS4-HMAC-SHA256 Credential={access_key_id}/{}/{region}/{service}/aws4_request, \
             SignedHeaders={}, Signature={signature}",
            &amz_date[..8],
            signed_headers.join(";")
        )
    };

    let unsigned = request.clone().with_header("authorization", authorization("0"));
    let token = RequestCanonicalizer::from_config(&test_config()).canonicalize(&unsigned)?;
    let signature = SigV4Signer.compute_signature(&token, secret_key);
    debug!(access_key_id, %signature, "Signed request with SigV4");

    Ok(request.with_header("authorization", authorization(&signature)))
}

/// Sign `request` with SigV2 as a client would at `now`.
pub fn sign_v2(
    request: RawRequest,
    access_key_id: &str,
    secret_key: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<RawRequest> {
    let request = request.with_header("date", now.to_rfc2822());
    let unsigned = request
        .clone()
        .with_header("authorization", format!("AWS {access_key_id}:0"));
    let token = RequestCanonicalizer::from_config(&test_config()).canonicalize(&unsigned)?;
    let signature = SigV2Signer.compute_signature(&token, secret_key);
    debug!(access_key_id, %signature, "Signed request with SigV2");

    Ok(request.with_header("authorization", format!("AWS {access_key_id}:{signature}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_filter_from_configured_log_level() {
        let config = AuthConfig::from_lookup(|name| {
            (name == "LOG_LEVEL").then(|| "ruststack_auth=debug".to_owned())
        })
        .unwrap();
        let filter = log_filter(&config.log_level);
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(filter.to_string(), "ruststack_auth=debug");
        }
    }
}

mod test_concurrency;
mod test_requestor;
mod test_saml;
mod test_sigv2;
mod test_sigv4;
