//! SAML assertion validation for RustStack IAM federation.
//!
//! A client exchanges a SAML response issued by an external identity provider
//! for temporary credentials. Parsing the XML is the caller's job; this crate
//! takes the parsed [`SamlResponseTokens`], checks them against the registered
//! [`SamlProvider`] and returns a [`SamlSession`] describing the federated
//! identity.
//!
//! # Examples
//!
//! ```
//! use chrono::Duration;
//! use ruststack_core::{AuthConfig, dates};
//! use ruststack_saml::{
//!     Certificate, KeyUse, ResponseSignature, SamlProvider, SamlResponseTokens, SamlValidator,
//!     VerifierError, XmlSignatureVerifier,
//! };
//!
//! #[derive(Debug)]
//! struct TrustAll;
//!
//! impl XmlSignatureVerifier for TrustAll {
//!     fn verify(&self, _: &ResponseSignature, _: &Certificate) -> Result<bool, VerifierError> {
//!         Ok(true)
//!     }
//! }
//!
//! let config = AuthConfig::default();
//! let provider = SamlProvider::new("corp", "acme", "https://idp.example.com", "<md/>")
//!     .with_certificate(KeyUse::Signing, Certificate::new("MIIC"));
//! let tokens = SamlResponseTokens::builder()
//!     .issuer("https://idp.example.com".to_owned())
//!     .audiences(vec![config.saml_audience.clone()])
//!     .authentication_success(true)
//!     .issue_instant(dates::now_utc() - Duration::minutes(1))
//!     .signature(ResponseSignature::new("rsa-sha256", "c2ln", "<Response/>"))
//!     .subject("alice".to_owned())
//!     .build();
//!
//! let session = SamlValidator::new(&config, TrustAll).validate(&tokens, &provider).unwrap();
//! assert_eq!(session.provider_account, "acme");
//! ```

pub mod error;
pub mod model;
pub mod provider;
pub mod validator;
pub mod verifier;

pub use error::{SamlError, ValidationStage};
pub use model::{
    Certificate, KeyUse, ResponseSignature, SamlProvider, SamlResponseTokens, SamlSession,
    SubjectType,
};
pub use provider::{IdentityProviderStore, ProviderStoreError, StaticIdentityProviderStore};
pub use validator::SamlValidator;
pub use verifier::{VerifierError, XmlSignatureVerifier};
