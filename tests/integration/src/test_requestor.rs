//! Credential lifecycle tests through the full authentication flow.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use ruststack_auth::token::SECURITY_TOKEN_HEADER;
    use ruststack_auth::{AuthError, AuthErrorKind, RawRequest};

    use crate::{
        ALICE_SECRET, BOB_KEY, BOB_SECRET, BOB_SESSION_TOKEN, CAROL_KEY, CAROL_SECRET, IAM_ENDPOINT,
        sign_v4, test_authenticator,
    };

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 3, 1, 12, 0, 0).unwrap()
    }

    fn request(session_token: Option<&str>) -> RawRequest {
        let request = RawRequest::new("GET", "/?Action=GetUser").with_header("host", IAM_ENDPOINT);
        match session_token {
            Some(token) => request.with_header(SECURITY_TOKEN_HEADER, token),
            None => request,
        }
    }

    fn signed_by(key: &str, secret: &str, session_token: Option<&str>, now: DateTime<Utc>) -> RawRequest {
        sign_v4(request(session_token), key, secret, "us-east-1", "iam", now).unwrap()
    }

    #[test]
    fn test_should_authenticate_federated_user_with_session_token() {
        let request = signed_by(BOB_KEY, BOB_SECRET, Some(BOB_SESSION_TOKEN), noon());
        let result = test_authenticator().authenticate_at(&request, noon()).unwrap();
        assert!(result.requestor.is_federated_user());
        assert!(result.signed_headers.iter().any(|h| h == SECURITY_TOKEN_HEADER));
    }

    #[test]
    fn test_should_reject_federated_user_without_session_token() {
        let request = signed_by(BOB_KEY, BOB_SECRET, None, noon());
        let err = test_authenticator().authenticate_at(&request, noon()).unwrap_err();
        assert_eq!(err, AuthError::InvalidClientTokenId);
        assert_eq!(err.kind(), AuthErrorKind::InvalidRequestor);
    }

    #[test]
    fn test_should_reject_federated_user_with_foreign_session_token() {
        let request = signed_by(BOB_KEY, BOB_SECRET, Some("someone-elses-token"), noon());
        assert_eq!(
            test_authenticator().authenticate_at(&request, noon()),
            Err(AuthError::InvalidClientTokenId)
        );
    }

    #[test]
    fn test_should_reject_expired_federated_credential() {
        let later = noon() + Duration::hours(2);
        let request = signed_by(BOB_KEY, BOB_SECRET, Some(BOB_SESSION_TOKEN), later);
        let err = test_authenticator().authenticate_at(&request, later).unwrap_err();
        assert_eq!(err.code(), "ExpiredCredential");
    }

    #[test]
    fn test_should_reject_inactive_access_key() {
        let request = signed_by(CAROL_KEY, CAROL_SECRET, None, noon());
        let err = test_authenticator().authenticate_at(&request, noon()).unwrap_err();
        assert_eq!(err, AuthError::InactiveAccessKey(CAROL_KEY.to_owned()));
        assert_eq!(err.kind(), AuthErrorKind::InvalidAccessKey);
    }

    #[test]
    fn test_should_reject_unknown_access_key() {
        let request = signed_by("AKIAUNKNOWN00000000", ALICE_SECRET, None, noon());
        assert_eq!(
            test_authenticator().authenticate_at(&request, noon()),
            Err(AuthError::InvalidAccessKeyId("AKIAUNKNOWN00000000".to_owned()))
        );
    }
}
