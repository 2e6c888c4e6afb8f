//! `SignedService` tests.
//!
//! Test organization:
//! - call.rs: headers, options and the full retry + signing stack
//! - config.rs: services built from connection strings and settings
//! - builder.rs: authentication choice and chain assembly

mod builder;
mod call;
mod config;

use http::StatusCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storage_pipeline_core::{PipelineFuture, Request, Response, Transport};

pub(crate) const KEY: &str = "c2VjcmV0LWtleQ==";

/// Answers with the given statuses in order, repeating the last one, after
/// an optional delay; keeps every request it was sent.
pub(crate) struct Recorder {
    statuses: Vec<u16>,
    delay: Option<Duration>,
    seen: Arc<Mutex<Vec<Request>>>,
}

impl Recorder {
    pub(crate) fn new(statuses: Vec<u16>) -> (Self, Arc<Mutex<Vec<Request>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                statuses,
                delay: None,
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }

    pub(crate) fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Transport for Recorder {
    fn send<'a>(&'a self, request: &'a Request) -> PipelineFuture<'a> {
        let attempt = {
            let mut seen = self.seen.lock().unwrap();
            seen.push(request.clone());
            seen.len()
        };
        let status = self
            .statuses
            .get(attempt - 1)
            .or(self.statuses.last())
            .copied()
            .unwrap_or(200);
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(Response::new(StatusCode::from_u16(status).unwrap()).with_body("<ok/>"))
        })
    }
}
