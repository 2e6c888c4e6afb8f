use super::{request, Outcome, Scripted};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storage_pipeline_core::FilterChain;
use http::StatusCode;
use storage_pipeline_retry::{RetryContext, RetryEvent, RetryPolicy, StorageRetry};

#[tokio::test]
async fn callbacks_report_attempts() {
    let retries = Arc::new(Mutex::new(Vec::new()));
    let successes = Arc::new(Mutex::new(Vec::new()));
    let errors = Arc::new(AtomicUsize::new(0));

    let r = Arc::clone(&retries);
    let s = Arc::clone(&successes);
    let e = Arc::clone(&errors);
    let policy = RetryPolicy::builder()
        .predicate(StorageRetry::linear(Duration::from_millis(1)))
        .name("queue")
        .on_retry(move |attempt, delay| r.lock().unwrap().push((attempt, delay)))
        .on_success(move |attempts| s.lock().unwrap().push(attempts))
        .on_error(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let (transport, _) = Scripted::new(vec![
        Outcome::Status(503),
        Outcome::Status(503),
        Outcome::Status(200),
    ]);
    let chain = FilterChain::builder().filter(policy).transport(transport);
    chain.execute(request()).await.unwrap();

    assert_eq!(
        *retries.lock().unwrap(),
        vec![(1, Duration::from_millis(1)), (2, Duration::from_millis(1))]
    );
    assert_eq!(*successes.lock().unwrap(), vec![3]);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn error_callback_on_final_failure() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let e = Arc::clone(&errors);
    let policy = RetryPolicy::builder()
        .retry_if(|_, ctx: &mut RetryContext| ctx.attempts() < 2)
        .on_error(move |attempts| e.lock().unwrap().push(attempts))
        .build();

    let (transport, _) = Scripted::new(vec![Outcome::Refused]);
    let chain = FilterChain::builder().filter(policy).transport(transport);
    let _ = chain.execute(request()).await;

    assert_eq!(*errors.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn panicking_listener_does_not_break_the_call() {
    let successes = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&successes);
    let policy = RetryPolicy::builder()
        .on_success(|_| panic!("listener bug"))
        .on_success(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let (transport, _) = Scripted::new(vec![Outcome::Status(200)]);
    let chain = FilterChain::builder().filter(policy).transport(transport);

    assert!(chain.execute(request()).await.is_ok());
    assert_eq!(successes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn event_stream_carries_policy_and_status() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&events);
    let policy = RetryPolicy::builder()
        .retry_if(|_, ctx: &mut RetryContext| ctx.attempts() < 3)
        .name("queue")
        .on_event(move |event| seen.lock().unwrap().push(event.clone()))
        .build();

    let (transport, _) = Scripted::new(vec![
        Outcome::Status(503),
        Outcome::Refused,
        Outcome::Status(200),
    ]);
    let chain = FilterChain::builder().filter(policy).transport(transport);
    chain.execute(request()).await.unwrap();

    let events = events.lock().unwrap();
    assert!(events.iter().all(|event| event.policy() == "queue"));
    let statuses: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            RetryEvent::Retry { status, .. } => Some(*status),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec![Some(StatusCode::SERVICE_UNAVAILABLE), None]);
    assert!(matches!(
        events.last(),
        Some(RetryEvent::Success { attempts: 3, .. })
    ));
}
