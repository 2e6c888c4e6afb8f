use super::{Recorder, KEY};
use bytes::Bytes;
use http::header::{HeaderName, USER_AGENT};
use http::uri::Authority;
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use std::time::Duration;
use storage_pipeline::auth::SharedKeySigner;
use storage_pipeline::retry::{RetryPolicy, StorageRetry};
use storage_pipeline::{CallOptions, SignedService, USER_AGENT_PRODUCT};

const MESSAGES: &str = "https://acct.queue.example.net/q/messages";

fn signer() -> SharedKeySigner {
    SharedKeySigner::new("acct", KEY).unwrap()
}

#[tokio::test]
async fn call_adds_standard_headers() {
    let (transport, seen) = Recorder::new(vec![201]);
    let service = SignedService::builder()
        .signer(signer())
        .user_agent_prefix("queue-tool/2.1")
        .transport(transport)
        .build()
        .unwrap();

    let response = service
        .call(
            Method::POST,
            Uri::from_static(MESSAGES),
            Some(Bytes::from_static(b"<QueueMessage/>")),
            HeaderMap::new(),
            CallOptions::new().request_id("req-42"),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.body().as_ref(), b"<ok/>");

    let seen = seen.lock().unwrap();
    let sent = &seen[0];
    assert_eq!(sent.method(), Method::POST);
    assert_eq!(sent.body().map(|b| b.len()), Some(15));
    assert_eq!(sent.headers()["x-ms-version"], "2018-11-09");
    assert_eq!(sent.headers()["x-ms-client-request-id"], "req-42");
    assert_eq!(
        sent.headers()[USER_AGENT].to_str().unwrap(),
        format!("queue-tool/2.1 {USER_AGENT_PRODUCT}")
    );
    assert!(sent.headers()["x-ms-date"].to_str().unwrap().ends_with("GMT"));
    assert!(sent.headers()["authorization"]
        .to_str()
        .unwrap()
        .starts_with("SharedKey acct:"));
}

#[tokio::test]
async fn caller_headers_win() {
    let (transport, seen) = Recorder::new(vec![200]);
    let service = SignedService::builder()
        .signer(signer())
        .api_version("2018-03-28")
        .transport(transport)
        .build()
        .unwrap();

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-ms-version"),
        HeaderValue::from_static("2017-11-09"),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static("custom/1.0"));
    service
        .call(Method::GET, Uri::from_static(MESSAGES), None, headers, CallOptions::new())
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].headers()["x-ms-version"], "2017-11-09");
    assert_eq!(seen[0].headers()[USER_AGENT], "custom/1.0");
    assert!(seen[0].headers().get("x-ms-client-request-id").is_none());
}

#[tokio::test]
async fn retries_against_secondary_and_signs_each_attempt() {
    let predicate = StorageRetry::linear(Duration::from_millis(1))
        .max_retries(3)
        .secondary(Authority::from_static("acct-secondary.queue.example.net"));
    let (transport, seen) = Recorder::new(vec![503, 500, 200]);
    let service = SignedService::builder()
        .signer(signer())
        .retry(RetryPolicy::builder().predicate(predicate).name("queue").build())
        .transport(transport)
        .build()
        .unwrap();

    let response = service
        .call(
            Method::GET,
            Uri::from_static(MESSAGES),
            None,
            HeaderMap::new(),
            CallOptions::new().request_id("req-7"),
        )
        .await
        .unwrap();
    assert!(response.is_success());

    let seen = seen.lock().unwrap();
    let hosts: Vec<_> = seen.iter().map(|r| r.uri().host().unwrap_or_default().to_string()).collect();
    assert_eq!(
        hosts,
        vec![
            "acct.queue.example.net",
            "acct-secondary.queue.example.net",
            "acct.queue.example.net",
        ]
    );
    for sent in seen.iter() {
        assert_eq!(sent.headers()["x-ms-client-request-id"], "req-7");
        assert_eq!(sent.headers().get_all("authorization").iter().count(), 1);
    }
}

#[tokio::test]
async fn unsuccessful_response_is_an_error() {
    let (transport, _) = Recorder::new(vec![403]);
    let service = SignedService::builder()
        .signer(signer())
        .transport(transport)
        .build()
        .unwrap();

    let err = service
        .call(Method::GET, Uri::from_static(MESSAGES), None, HeaderMap::new(), CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
}

#[tokio::test(start_paused = true)]
async fn call_timeout_overrides_service_default() {
    let (transport, seen) = Recorder::new(vec![200]);
    let service = SignedService::builder()
        .signer(signer())
        .timeout(Duration::from_secs(60))
        .transport(transport.slow(Duration::from_secs(10)))
        .build()
        .unwrap();

    let err = service
        .call(
            Method::GET,
            Uri::from_static(MESSAGES),
            None,
            HeaderMap::new(),
            CallOptions::new().timeout(Duration::from_secs(2)),
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    let response = service
        .call(Method::GET, Uri::from_static(MESSAGES), None, HeaderMap::new(), CallOptions::new())
        .await
        .unwrap();
    assert!(response.is_success());
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_request_id_is_rejected_before_sending() {
    let (transport, seen) = Recorder::new(vec![200]);
    let service = SignedService::builder()
        .signer(signer())
        .transport(transport)
        .build()
        .unwrap();

    let err = service
        .call(
            Method::GET,
            Uri::from_static(MESSAGES),
            None,
            HeaderMap::new(),
            CallOptions::new().request_id("line\nbreak"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, storage_pipeline::PipelineError::Config(_)));
    assert!(seen.lock().unwrap().is_empty());
}
