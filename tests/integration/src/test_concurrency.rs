//! Concurrent authentication through shared, cached credential stores.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};
    use ruststack_auth::{AuthError, Authenticator, CachingCredentialStore, RawRequest};

    use crate::{
        ALICE_KEY, ALICE_SECRET, ENDPOINT, init_tracing, sign_v4, test_config, test_store,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 3, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_should_authenticate_concurrently_through_cache() -> anyhow::Result<()> {
        init_tracing();
        let config = test_config();
        let store = CachingCredentialStore::from_config(test_store(), &config);
        let authenticator = Arc::new(Authenticator::new(&config, store));

        let mut handles = Vec::new();
        for i in 0..32 {
            let authenticator = Arc::clone(&authenticator);
            let request = sign_v4(
                RawRequest::new("GET", &format!("/photos/{i}.jpg")).with_header("host", ENDPOINT),
                ALICE_KEY,
                if i % 4 == 0 { "wrong-secret" } else { ALICE_SECRET },
                "us-east-1",
                "s3",
                now(),
            )?;
            handles.push(tokio::task::spawn_blocking(move || {
                (i, authenticator.authenticate_at(&request, now()))
            }));
        }

        for handle in handles {
            let (i, result) = handle.await?;
            if i % 4 == 0 {
                assert_eq!(result, Err(AuthError::SignatureDoesNotMatch));
            } else {
                assert_eq!(result?.access_key_id, ALICE_KEY);
            }
        }
        Ok(())
    }
}
