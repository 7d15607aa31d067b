//! SigV4 end-to-end authentication tests.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use ruststack_auth::request::{FORM_METHOD, FORM_PAYLOAD, FORM_QUERY, FORM_URI};
    use ruststack_auth::{AuthError, AuthErrorKind, RawRequest, SigningVersion};

    use crate::{
        ALICE_KEY, ALICE_SECRET, ENDPOINT, IAM_ENDPOINT, REGIONAL_ENDPOINT, sign_v4,
        test_authenticator,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 3, 1, 12, 0, 0).unwrap()
    }

    fn signed(request: RawRequest) -> RawRequest {
        sign_v4(request, ALICE_KEY, ALICE_SECRET, "us-east-1", "s3", now()).unwrap()
    }

    #[test]
    fn test_should_authenticate_path_style_request() {
        let request = signed(RawRequest::new("GET", "/photos/puppy.jpg").with_header("host", ENDPOINT));

        let result = test_authenticator().authenticate_at(&request, now()).unwrap();
        assert_eq!(result.access_key_id, ALICE_KEY);
        assert_eq!(result.requestor.name(), "alice");
        assert_eq!(result.version, SigningVersion::V4);
        assert_eq!(result.region, "us-east-1");
        assert_eq!(result.service, "s3");
        assert_eq!(result.signed_headers, ["host", "x-amz-content-sha256", "x-amz-date"]);
    }

    #[test]
    fn test_should_authenticate_virtual_host_request_with_body() {
        let request = signed(
            RawRequest::new("PUT", "/notes/today.txt")
                .with_header("host", format!("photos.{ENDPOINT}"))
                .with_header("content-type", "text/plain")
                .with_body("hello world"),
        );
        assert!(test_authenticator().authenticate_at(&request, now()).is_ok());
    }

    #[test]
    fn test_should_authenticate_against_regional_endpoint_with_port() {
        let request = signed(
            RawRequest::new("GET", "/photos/?list-type=2&prefix=2017%2F")
                .with_header("host", format!("{REGIONAL_ENDPOINT}:8080")),
        );
        assert!(test_authenticator().authenticate_at(&request, now()).is_ok());
    }

    #[test]
    fn test_should_accept_reordered_query_parameters() {
        let request = signed(
            RawRequest::new("GET", "/photos?b=2&a=1").with_header("host", ENDPOINT),
        );
        let mut reordered = RawRequest::new("GET", "/photos?a=1&b=2");
        for (name, value) in request.headers() {
            reordered = reordered.with_header(name, value.clone());
        }
        assert!(test_authenticator().authenticate_at(&reordered, now()).is_ok());
    }

    #[test]
    fn test_should_authenticate_iam_form_request() {
        let request = sign_v4(
            RawRequest::new("POST", "/")
                .with_header("host", IAM_ENDPOINT)
                .with_header("content-type", "")
                .with_body("Action=ListUsers&Version=2010-05-08"),
            ALICE_KEY,
            ALICE_SECRET,
            "us-east-1",
            "iam",
            now(),
        )
        .unwrap();

        let mut form: HashMap<String, String> = request
            .headers()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        form.insert(FORM_METHOD.to_owned(), "POST".to_owned());
        form.insert(FORM_URI.to_owned(), "/".to_owned());
        form.insert(FORM_QUERY.to_owned(), String::new());
        form.insert(
            FORM_PAYLOAD.to_owned(),
            "Action=ListUsers&Version=2010-05-08".to_owned(),
        );
        let from_form = RawRequest::from_form(&form).unwrap();

        let authenticator = test_authenticator();
        let result = authenticator.authenticate_at(&from_form, now()).unwrap();
        assert_eq!(result.service, "iam");
        assert!(authenticator.authenticate_at(&request, now()).is_ok());
    }

    #[test]
    fn test_should_authenticate_http_request_parts() -> anyhow::Result<()> {
        let signed = signed(
            RawRequest::new("GET", "/photos/puppy.jpg?versionId=3").with_header("host", ENDPOINT),
        );

        let mut builder = http::Request::builder()
            .method("GET")
            .uri("/photos/puppy.jpg?versionId=3");
        for (name, value) in signed.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let (parts, body) = builder.body(Bytes::new())?.into_parts();
        let request = RawRequest::from_parts(&parts, body)?;

        assert_eq!(request, signed);
        test_authenticator().authenticate_at(&request, now())?;
        Ok(())
    }

    #[test]
    fn test_should_reject_tampered_query() {
        let request = signed(
            RawRequest::new("GET", "/photos?max-keys=10").with_header("host", ENDPOINT),
        );
        let mut tampered = RawRequest::new("GET", "/photos?max-keys=1000");
        for (name, value) in request.headers() {
            tampered = tampered.with_header(name, value.clone());
        }

        let err = test_authenticator().authenticate_at(&tampered, now()).unwrap_err();
        assert_eq!(err, AuthError::SignatureDoesNotMatch);
        assert_eq!(err.kind(), AuthErrorKind::SignatureMismatch);
    }

    #[test]
    fn test_should_reject_wrong_secret() {
        let request = sign_v4(
            RawRequest::new("GET", "/photos").with_header("host", ENDPOINT),
            ALICE_KEY,
            "not-the-secret",
            "us-east-1",
            "s3",
            now(),
        )
        .unwrap();
        assert_eq!(
            test_authenticator().authenticate_at(&request, now()),
            Err(AuthError::SignatureDoesNotMatch)
        );
    }

    #[test]
    fn test_should_reject_skewed_request() {
        let request = signed(RawRequest::new("GET", "/photos").with_header("host", ENDPOINT));
        let err = test_authenticator()
            .authenticate_at(&request, now() + Duration::minutes(20))
            .unwrap_err();
        assert_eq!(err.code(), "RequestTimeTooSkewed");
    }

    #[test]
    fn test_should_reject_malformed_authorization_header() {
        let request = RawRequest::new("GET", "/photos")
            .with_header("host", ENDPOINT)
            .with_header("x-amz-date", "20170301T120000Z")
            .with_header(
                "authorization",
                "AWS4-HMAC-SHA256 Credential=AKIA/20170301/us-east-1/s3/aws4_request",
            );
        let err = test_authenticator().authenticate_at(&request, now()).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::MalformedRequest);
    }
}
