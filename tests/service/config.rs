use super::{Recorder, KEY};
use http::{HeaderMap, Method, Uri};
use storage_pipeline::{CallOptions, ServiceConfig, SignedServiceBuilder, StorageKind};

#[tokio::test]
async fn service_from_account_key_connection_string() {
    let config = ServiceConfig::from_connection_string(&format!(
        "DefaultEndpointsProtocol=https;AccountName=acct;AccountKey={KEY};EndpointSuffix=example.net"
    ))
    .unwrap();
    let endpoint = config.endpoint(StorageKind::Queue).unwrap();
    assert_eq!(endpoint.host(), Some("acct.queue.example.net"));

    let (transport, seen) = Recorder::new(vec![200]);
    let service = SignedServiceBuilder::from_config(&config)
        .unwrap()
        .transport(transport)
        .build()
        .unwrap();
    assert!(!service.is_anonymous());

    let uri: Uri = format!("{endpoint}q/messages").parse().unwrap();
    service
        .call(Method::GET, uri, None, HeaderMap::new(), CallOptions::new())
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].uri().path(), "/q/messages");
    assert!(seen[0].headers()["authorization"]
        .to_str()
        .unwrap()
        .starts_with("SharedKey acct:"));
}

#[tokio::test]
async fn service_from_sas_connection_string() {
    let config = ServiceConfig::from_connection_string(
        "QueueEndpoint=https://acct.queue.example.net;SharedAccessSignature=sv=2018-11-09&sig=s1g",
    )
    .unwrap();

    let (transport, seen) = Recorder::new(vec![200]);
    let service = SignedServiceBuilder::from_config(&config)
        .unwrap()
        .transport(transport)
        .build()
        .unwrap();

    let uri: Uri = format!("{}q", config.endpoint(StorageKind::Queue).unwrap())
        .parse()
        .unwrap();
    service
        .call(Method::PUT, uri, None, HeaderMap::new(), CallOptions::new())
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].uri().query(), Some("sv=2018-11-09&sig=s1g"));
    assert!(seen[0].headers().get("authorization").is_none());
}

#[test]
fn config_without_credentials_cannot_sign() {
    let config = ServiceConfig::builder().account_name("acct").build().unwrap();
    assert!(!config.has_credentials());
    assert!(SignedServiceBuilder::from_config(&config).is_err());
}

#[tokio::test]
async fn api_version_and_user_agent_flow_from_config() {
    let config = ServiceConfig::builder()
        .account_name("acct")
        .account_key(KEY)
        .api_version("2019-12-12")
        .user_agent_prefix("backup-job")
        .build()
        .unwrap();
    let (transport, seen) = Recorder::new(vec![200]);
    let service = SignedServiceBuilder::from_config(&config)
        .unwrap()
        .transport(transport)
        .build()
        .unwrap();

    service
        .call(
            Method::GET,
            config.endpoint(StorageKind::Blob).unwrap(),
            None,
            HeaderMap::new(),
            CallOptions::new(),
        )
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].headers()["x-ms-version"], "2019-12-12");
    assert!(seen[0].headers()["user-agent"]
        .to_str()
        .unwrap()
        .starts_with("backup-job storage-pipeline/"));
}

#[test]
fn development_storage_has_no_secondary() {
    let config = ServiceConfig::from_connection_string("UseDevelopmentStorage=true").unwrap();
    assert_eq!(
        config.endpoint(StorageKind::Queue).unwrap().to_string(),
        "http://127.0.0.1:10001/devstoreaccount1"
    );
    assert_eq!(config.secondary_endpoint(StorageKind::Queue).unwrap(), None);
}
