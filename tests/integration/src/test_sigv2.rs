//! SigV2 end-to-end authentication tests.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use ruststack_auth::{AuthError, RawRequest, SigningVersion};

    use crate::{ALICE_KEY, ALICE_SECRET, ENDPOINT, sign_v2, test_authenticator};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_should_authenticate_path_style_request() {
        let request = sign_v2(
            RawRequest::new("GET", "/photos/puppy.jpg").with_header("host", ENDPOINT),
            ALICE_KEY,
            ALICE_SECRET,
            now(),
        )
        .unwrap();

        let result = test_authenticator().authenticate_at(&request, now()).unwrap();
        assert_eq!(result.version, SigningVersion::V2);
        assert_eq!(result.requestor.name(), "alice");
        assert!(result.region.is_empty());
    }

    #[test]
    fn test_should_authenticate_virtual_host_sub_resource_request() {
        let request = sign_v2(
            RawRequest::new("PUT", "/puppy.jpg?acl")
                .with_header("host", format!("photos.{ENDPOINT}"))
                .with_header("content-type", "application/xml")
                .with_header("x-amz-meta-owner", "alice")
                .with_body("<AccessControlPolicy/>"),
            ALICE_KEY,
            ALICE_SECRET,
            now(),
        )
        .unwrap();
        assert!(test_authenticator().authenticate_at(&request, now()).is_ok());
    }

    #[test]
    fn test_should_reject_wrong_secret() {
        let request = sign_v2(
            RawRequest::new("GET", "/photos/puppy.jpg").with_header("host", ENDPOINT),
            ALICE_KEY,
            "not-the-secret",
            now(),
        )
        .unwrap();
        assert_eq!(
            test_authenticator().authenticate_at(&request, now()),
            Err(AuthError::SignatureDoesNotMatch)
        );
    }

    #[test]
    fn test_should_reject_tampered_amz_header() {
        let request = sign_v2(
            RawRequest::new("PUT", "/photos/puppy.jpg")
                .with_header("host", ENDPOINT)
                .with_header("x-amz-meta-owner", "alice"),
            ALICE_KEY,
            ALICE_SECRET,
            now(),
        )
        .unwrap()
        .with_header("x-amz-meta-owner", "mallory");
        assert_eq!(
            test_authenticator().authenticate_at(&request, now()),
            Err(AuthError::SignatureDoesNotMatch)
        );
    }
}
