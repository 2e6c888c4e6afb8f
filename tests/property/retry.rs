//! Property tests for the retry policy.
//!
//! Invariants tested:
//! - A predicate that says yes n times makes n + 1 attempts
//! - `StorageRetry` never exceeds max_retries + 1 attempts
//! - Only retryable statuses are retried

use http::{Method, StatusCode, Uri};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storage_pipeline_core::{is_retryable_status, transport_fn, FilterChain, Request, Response};
use storage_pipeline_retry::{RetryContext, RetryPolicy, StorageRetry};
use tokio::runtime::Runtime;

fn request() -> Request {
    Request::new(
        Method::GET,
        Uri::from_static("https://acct.queue.example.net/q/messages"),
    )
}

/// A chain that answers every attempt with `status` and counts attempts.
fn counting_chain(policy: RetryPolicy, status: u16) -> (FilterChain, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let chain = FilterChain::builder()
        .filter(policy)
        .transport(transport_fn(move |_req: Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok::<_, std::io::Error>(Response::new(StatusCode::from_u16(status).unwrap()))
            }
        }));
    (chain, calls)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: n "yes" answers from the predicate mean n + 1 attempts
    #[test]
    fn attempts_follow_the_predicate(retries in 0usize..=8) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let policy = RetryPolicy::builder()
                .retry_if(move |_, ctx: &mut RetryContext| ctx.attempts() <= retries)
                .build();
            let (chain, calls) = counting_chain(policy, 200);

            let response = chain.execute(request()).await;
            prop_assert!(response.is_ok());
            prop_assert_eq!(calls.load(Ordering::SeqCst), retries + 1);
            Ok(())
        })?;
    }

    /// Property: StorageRetry stops after max_retries retries
    #[test]
    fn storage_retry_respects_max_retries(
        max_retries in 0usize..=6,
        status in prop::sample::select(vec![408u16, 500, 502, 503, 504]),
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let policy = RetryPolicy::builder()
                .predicate(StorageRetry::linear(Duration::ZERO).max_retries(max_retries))
                .build();
            let (chain, calls) = counting_chain(policy, status);

            let err = chain.execute(request()).await.unwrap_err();
            prop_assert_eq!(err.status().map(|s| s.as_u16()), Some(status));
            prop_assert_eq!(calls.load(Ordering::SeqCst), max_retries + 1);
            Ok(())
        })?;
    }

    /// Property: a status is retried exactly when it is classified retryable
    #[test]
    fn only_retryable_statuses_are_retried(status in 200u16..600) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let policy = RetryPolicy::builder()
                .predicate(StorageRetry::linear(Duration::ZERO).max_retries(2))
                .build();
            let (chain, calls) = counting_chain(policy, status);

            let result = chain.execute(request()).await;
            let code = StatusCode::from_u16(status).unwrap();
            let expected = if is_retryable_status(code) { 3 } else { 1 };
            prop_assert_eq!(calls.load(Ordering::SeqCst), expected);
            prop_assert_eq!(result.is_ok(), code.is_success());
            Ok(())
        })?;
    }
}
