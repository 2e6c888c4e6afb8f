//! A minimal queue client on top of `SignedService`.
//!
//! Runs against an in-process fake service that fails the first attempt
//! of every call with a 503, so the retry policy and per-attempt signing
//! are visible in the output:
//!
//! ```text
//! cargo run -p storage-pipeline --example queue_client
//! ```

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storage_pipeline::auth::SharedKeySigner;
use storage_pipeline::core::{transport_fn, PipelineError, Request, Response};
use storage_pipeline::retry::{RetryPolicy, StorageRetry};
use storage_pipeline::{CallOptions, SignedService};

/// Per-resource operations built on `SignedService::call`.
struct QueueClient {
    service: SignedService,
    endpoint: String,
}

impl QueueClient {
    fn queue_uri(&self, queue: &str, suffix: &str) -> Result<Uri, PipelineError> {
        format!("{}/{}{}", self.endpoint, queue, suffix)
            .parse()
            .map_err(|e| PipelineError::Config(format!("invalid queue name `{queue}`: {e}")))
    }

    async fn create_queue(&self, queue: &str) -> Result<(), PipelineError> {
        let uri = self.queue_uri(queue, "")?;
        self.service
            .call(Method::PUT, uri, None, HeaderMap::new(), CallOptions::new())
            .await?;
        Ok(())
    }

    async fn put_message(&self, queue: &str, text: &str) -> Result<(), PipelineError> {
        let uri = self.queue_uri(queue, "/messages")?;
        let body = format!("<QueueMessage><MessageText>{text}</MessageText></QueueMessage>");
        self.service
            .call(
                Method::POST,
                uri,
                Some(Bytes::from(body)),
                HeaderMap::new(),
                CallOptions::new().request_id(format!("put-{queue}")),
            )
            .await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("storage-pipeline: queue client");
    println!("==============================\n");

    // Fails the first attempt of each distinct request with 503.
    let seen: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
    let transport = transport_fn(move |req: Request| {
        let key = format!("{} {}", req.method(), req.uri());
        let first_attempt = seen.lock().map(|mut s| s.insert(key)).unwrap_or(false);
        let auth = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<none>")
            .to_string();
        async move {
            println!("  -> {} {} [{}]", req.method(), req.uri(), auth);
            let status = if first_attempt {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::CREATED
            };
            Ok::<_, std::io::Error>(Response::new(status))
        }
    });

    let retry = RetryPolicy::builder()
        .predicate(StorageRetry::linear(Duration::from_millis(200)).max_retries(2))
        .name("queue")
        .on_retry(|attempt, delay| println!("  attempt {attempt} failed, retrying in {delay:?}"))
        .on_success(|attempts| println!("  done after {attempts} attempt(s)"))
        .build();

    let service = SignedService::builder()
        .signer(
            SharedKeySigner::new("devstoreaccount1", storage_pipeline::DEVELOPMENT_KEY)
                .map_err(PipelineError::from)?,
        )
        .retry(retry)
        .user_agent_prefix("queue-example/0.1")
        .timeout(Duration::from_secs(10))
        .transport(transport)
        .build()?;

    let client = QueueClient {
        service,
        endpoint: "http://127.0.0.1:10001/devstoreaccount1".to_string(),
    };

    println!("create queue:");
    client.create_queue("orders").await?;

    println!("\nput message:");
    client.put_message("orders", "hello").await?;

    Ok(())
}
