//! SAML exchange tests.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use ruststack_core::dates;
    use ruststack_saml::{
        Certificate, IdentityProviderStore, KeyUse, ResponseSignature, SamlError, SamlProvider,
        SamlResponseTokens, StaticIdentityProviderStore, SubjectType, ValidationStage,
        VerifierError, XmlSignatureVerifier,
    };

    use crate::{test_config, test_saml_validator};

    const ISSUER: &str = "https://adfs.acme.example.com/adfs/services/trust";
    const SIGNING_CERT: &str = "MIIC8DCCAdigAwIBAgIQ";

    /// Treats a signature as valid when its value is the certificate body
    /// reversed.
    #[derive(Debug)]
    struct ReversingVerifier;

    impl XmlSignatureVerifier for ReversingVerifier {
        fn verify(
            &self,
            signature: &ResponseSignature,
            certificate: &Certificate,
        ) -> Result<bool, VerifierError> {
            let expected: String = certificate.as_str().chars().rev().collect();
            Ok(signature.value() == expected)
        }
    }

    fn signature() -> ResponseSignature {
        let value: String = SIGNING_CERT.chars().rev().collect();
        ResponseSignature::new(
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            value,
            "<samlp:Response/>",
        )
    }

    fn store() -> StaticIdentityProviderStore {
        StaticIdentityProviderStore::new([SamlProvider::new(
            "ADFS",
            "acme",
            ISSUER,
            "<EntityDescriptor entityID=\"https://adfs.acme.example.com/adfs/services/trust\"/>",
        )
        .with_certificate(
            KeyUse::Signing,
            Certificate::new(format!(
                "-----BEGIN CERTIFICATE-----\n{SIGNING_CERT}\n-----END CERTIFICATE-----\n"
            )),
        )
        .with_expiry(dates::now_utc() + Duration::days(365))])
    }

    fn tokens(issue_instant: DateTime<Utc>) -> SamlResponseTokens {
        SamlResponseTokens::builder()
            .issuer(ISSUER.to_owned())
            .audiences(vec![test_config().saml_audience])
            .authentication_success(true)
            .issue_instant(issue_instant)
            .not_on_or_after(issue_instant + Duration::minutes(5))
            .signing_certificate(Certificate::new(SIGNING_CERT))
            .signature(signature())
            .subject("ACME\\alice".to_owned())
            .subject_type(SubjectType::Transient)
            .role_session_name("alice@acme.example.com".to_owned())
            .roles(vec![
                "arn:seagate:iam::acme:role/ADFS-Dev,arn:seagate:iam::acme:saml-provider/ADFS"
                    .to_owned(),
            ])
            .session_not_on_or_after(issue_instant + Duration::minutes(30))
            .build()
    }

    #[test]
    fn test_should_exchange_recent_assertion_for_session() {
        let now = dates::now_utc();
        let validator = test_saml_validator(ReversingVerifier);

        let session = validator
            .validate_with_store_at(&tokens(now - Duration::minutes(1)), &store(), now)
            .unwrap();
        assert_eq!(session.provider_account, "acme");
        assert_eq!(session.role_session_name, "alice@acme.example.com");
        assert_eq!(session.subject_type.as_str(), "transient");
        assert_eq!(session.duration_at(now, None), Duration::minutes(29));
    }

    #[test]
    fn test_should_enforce_latency_window_against_wall_clock() {
        let validator = test_saml_validator(ReversingVerifier);
        let store = store();

        let stale = tokens(dates::now_utc() - Duration::minutes(10));
        let err = validator.validate_with_store(&stale, &store).unwrap_err();
        assert!(matches!(err, SamlError::ExpiredToken { .. }));

        let fresh = tokens(dates::now_utc() - Duration::minutes(1));
        assert!(validator.validate_with_store(&fresh, &store).is_ok());
    }

    #[test]
    fn test_should_reject_forged_signature() {
        let now = dates::now_utc();
        let mut tokens = tokens(now);
        tokens.signature = ResponseSignature::new("rsa-sha256", "forged", "<samlp:Response/>");

        let err = test_saml_validator(ReversingVerifier)
            .validate_with_store_at(&tokens, &store(), now)
            .unwrap_err();
        assert_eq!(err.code(), "InvalidIdentityToken");
        assert_eq!(err.stage(), Some(ValidationStage::Signature));
    }

    #[test]
    fn test_should_reject_assertion_from_unregistered_issuer() {
        let now = dates::now_utc();
        let mut tokens = tokens(now);
        tokens.issuer = "https://idp.evil.example.com".to_owned();

        let err = test_saml_validator(ReversingVerifier)
            .validate_with_store_at(&tokens, &store(), now)
            .unwrap_err();
        assert_eq!(err.code(), "InvalidIdentityToken");
    }

    #[test]
    fn test_should_reject_after_provider_is_deregistered() {
        let now = dates::now_utc();
        let store = store();
        assert!(store.find_provider(ISSUER).is_ok());
        store.deregister(ISSUER);

        let err = test_saml_validator(ReversingVerifier)
            .validate_with_store_at(&tokens(now), &store, now)
            .unwrap_err();
        assert_eq!(err, SamlError::ProviderNotFound(ISSUER.to_owned()));
    }
}
