use super::Recorder;
use http::{HeaderMap, Method, Uri};
use storage_pipeline::core::PipelineError;
use storage_pipeline::retry::RetryPolicy;
use storage_pipeline::{CallOptions, SignedService};

#[test]
fn missing_signer_is_a_build_error() {
    let (transport, _) = Recorder::new(vec![200]);
    let err = SignedService::builder().transport(transport).build().unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
    assert!(err.to_string().contains("anonymous"));
}

#[test]
fn missing_transport_is_a_build_error() {
    let err = SignedService::builder().anonymous().build().unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[test]
fn invalid_api_version_is_a_build_error() {
    let (transport, _) = Recorder::new(vec![200]);
    let err = SignedService::builder()
        .anonymous()
        .api_version("2018\n11")
        .transport(transport)
        .build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[tokio::test]
async fn anonymous_service_sends_unsigned_requests() {
    let (transport, seen) = Recorder::new(vec![200]);
    let service = SignedService::builder()
        .anonymous()
        .transport(transport)
        .build()
        .unwrap();
    assert!(service.is_anonymous());
    assert_eq!(service.chain().filter_names(), vec!["retry", "trace", "timeout"]);

    service
        .call(
            Method::GET,
            Uri::from_static("https://acct.blob.example.net/public/logo.png"),
            None,
            HeaderMap::new(),
            CallOptions::new(),
        )
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen[0].headers().get("authorization").is_none());
    assert!(seen[0].headers().get("x-ms-date").is_none());
    assert!(seen[0].headers().get("x-ms-version").is_some());
}

#[test]
fn chain_without_trace() {
    let (transport, _) = Recorder::new(vec![200]);
    let service = SignedService::builder()
        .anonymous()
        .retry(RetryPolicy::new())
        .trace(false)
        .transport(transport)
        .build()
        .unwrap();
    assert_eq!(service.chain().filter_names(), vec!["retry", "timeout"]);
}

#[tokio::test]
async fn chain_works_as_a_tower_service() {
    use tower::{Service, ServiceExt};

    let (transport, seen) = Recorder::new(vec![200]);
    let service = SignedService::builder()
        .anonymous()
        .transport(transport)
        .build()
        .unwrap();

    let mut chain = service.chain().clone();
    let request = storage_pipeline::Request::new(
        Method::HEAD,
        Uri::from_static("https://acct.blob.example.net/public"),
    );
    let response = chain.ready().await.unwrap().call(request).await.unwrap();

    assert!(response.is_success());
    assert_eq!(seen.lock().unwrap()[0].method(), Method::HEAD);
}
