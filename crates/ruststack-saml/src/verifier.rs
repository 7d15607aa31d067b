//! XML signature verification contract.

use crate::model::{Certificate, ResponseSignature, SamlProvider};

/// A verifier could not evaluate a signature (bad key material, unsupported
/// algorithm, malformed signed content).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("signature verification failed: {0}")]
pub struct VerifierError(pub String);

/// Checks the XML signature of a SAML response.
///
/// XML canonicalization and certificate parsing live behind this trait, so
/// the validator stays free of any XML stack.
pub trait XmlSignatureVerifier: Send + Sync {
    /// Verify `signature` against one certificate.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError`] if the signature cannot be evaluated at all.
    fn verify(
        &self,
        signature: &ResponseSignature,
        certificate: &Certificate,
    ) -> Result<bool, VerifierError>;

    /// Verify `signature` against every certificate registered for
    /// `provider`, succeeding if any of them validates it.
    ///
    /// # Errors
    ///
    /// Returns the first [`VerifierError`] if no certificate validated the
    /// signature and at least one could not be evaluated.
    fn verify_with_provider(
        &self,
        signature: &ResponseSignature,
        provider: &SamlProvider,
    ) -> Result<bool, VerifierError> {
        let mut first_error = None;
        for certificate in provider.all_certificates() {
            match self.verify(signature, certificate) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(false), Err)
    }
}
