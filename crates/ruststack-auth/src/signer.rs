//! The signing capability shared by SigV2 and SigV4.

use tracing::debug;

use crate::crypto::constant_time_eq;
use crate::sigv2::SigV2Signer;
use crate::sigv4::SigV4Signer;
use crate::token::{ClientRequestToken, SigningVersion};

/// Computes and verifies request signatures for one signing version.
///
/// Implementations are stateless. `authenticate` is a pure function of the
/// token and the secret key.
pub trait Signer: Send + Sync + std::fmt::Debug {
    /// The signing version this signer handles.
    fn version(&self) -> SigningVersion;

    /// Build the string to sign for `token`.
    fn string_to_sign(&self, token: &ClientRequestToken) -> String;

    /// Compute the signature `token` should carry when signed with `secret_key`.
    fn compute_signature(&self, token: &ClientRequestToken, secret_key: &str) -> String;

    /// Check the token's claimed signature against the computed one.
    ///
    /// The comparison is constant-time.
    fn authenticate(&self, token: &ClientRequestToken, secret_key: &str) -> bool {
        let expected = self.compute_signature(token, secret_key);
        let matched = !expected.is_empty()
            && constant_time_eq(expected.as_bytes(), token.claimed_signature().as_bytes());

        if !matched {
            debug!(
                access_key_id = token.access_key_id(),
                version = %self.version(),
                "Signature mismatch"
            );
        }
        matched
    }
}

/// Select the signer for a signing version.
///
/// # Examples
///
/// ```
/// use ruststack_auth::{SigningVersion, signer_for};
///
/// assert_eq!(signer_for(SigningVersion::V4).version(), SigningVersion::V4);
/// ```
#[must_use]
pub fn signer_for(version: SigningVersion) -> &'static dyn Signer {
    match version {
        SigningVersion::V2 => &SigV2Signer,
        SigningVersion::V4 => &SigV4Signer,
    }
}
