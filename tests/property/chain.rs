//! Property tests for filter chains.
//!
//! Invariants tested:
//! - Filters run in insertion order, then the transport, exactly once each

use http::{HeaderValue, Method, StatusCode, Uri};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use storage_pipeline_core::{Filter, FilterChain, Next, PipelineFuture, Request, Response, Transport};
use tokio::runtime::Runtime;

/// Appends its index to a shared log and to an `x-order` header.
struct Mark {
    index: usize,
    log: Arc<Mutex<Vec<usize>>>,
}

impl Filter for Mark {
    fn apply<'a>(&'a self, request: &'a mut Request, next: Next<'a>) -> PipelineFuture<'a> {
        self.log.lock().unwrap().push(self.index);
        request.headers_mut().append(
            "x-order",
            HeaderValue::from_str(&self.index.to_string()).unwrap(),
        );
        next.run(request)
    }
}

/// Echoes the `x-order` values it received in the response body.
struct Echo;

impl Transport for Echo {
    fn send<'a>(&'a self, request: &'a Request) -> PipelineFuture<'a> {
        let order: Vec<String> = request
            .headers()
            .get_all("x-order")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        Box::pin(async move { Ok(Response::new(StatusCode::OK).with_body(order.join(","))) })
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: a chain of n filters visits them in order
    #[test]
    fn filters_run_in_order(count in 0usize..=12) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut builder = FilterChain::builder();
            for index in 0..count {
                builder = builder.filter(Mark { index, log: Arc::clone(&log) });
            }
            let chain = builder.transport(Echo);
            prop_assert_eq!(chain.len(), count);

            let uri = Uri::from_static("https://acct.table.example.net/Tables");
            let response = chain.execute(Request::new(Method::GET, uri)).await.unwrap();

            let expected: Vec<usize> = (0..count).collect();
            prop_assert_eq!(&*log.lock().unwrap(), &expected);
            let echoed = expected.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",");
            prop_assert_eq!(response.body().as_ref(), echoed.as_bytes());
            Ok(())
        })?;
    }
}
