use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use foundation::Extent;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::request::Request;
use crate::source::{BasemapError, BasemapImage, BasemapSource};

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Result of one refresh, delivered back to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub request: Request,
    pub result: Result<BasemapImage, BasemapError>,
}

/// Issues basemap fetches without blocking the caller.
///
/// Each `request` spawns a task on the tokio runtime; completions are queued
/// on a channel and picked up with `drain` (non-blocking) or `next` (async).
/// Nothing is cancelled: a slow earlier request still completes and is still
/// delivered after a newer one.
pub struct BasemapRefresher<S> {
    source: Arc<S>,
    runtime: Handle,
    retry: RetryPolicy,
    next_request: u64,
    in_flight: BTreeSet<Request>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl<S: BasemapSource + 'static> BasemapRefresher<S> {
    pub fn new(source: Arc<S>, runtime: Handle, retry: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            runtime,
            retry,
            next_request: 1,
            in_flight: BTreeSet::new(),
            tx,
            rx,
        }
    }

    pub fn request(&mut self, extent: Extent, width_px: u32) -> Request {
        let request = Request(self.next_request);
        self.next_request += 1;
        self.in_flight.insert(request);

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let retry = self.retry;
        debug!(?request, "basemap refresh issued");
        self.runtime.spawn(async move {
            let result = fetch_with_retry(source.as_ref(), extent, width_px, retry, request).await;
            // The receiver only goes away with the refresher itself.
            let _ = tx.send(Completion { request, result });
        });
        request
    }

    /// Completions that have arrived so far, in arrival order.
    pub fn drain(&mut self) -> Vec<Completion> {
        let mut out = Vec::new();
        while let Ok(c) = self.rx.try_recv() {
            self.in_flight.remove(&c.request);
            out.push(c);
        }
        out
    }

    /// Waits for the next completion.
    pub async fn next(&mut self) -> Option<Completion> {
        let c = self.rx.recv().await?;
        self.in_flight.remove(&c.request);
        Some(c)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

async fn fetch_with_retry<S: BasemapSource + ?Sized>(
    source: &S,
    extent: Extent,
    width_px: u32,
    retry: RetryPolicy,
    request: Request,
) -> Result<BasemapImage, BasemapError> {
    let attempts = retry.attempts.max(1);
    let mut attempt = 1;
    loop {
        match source.fetch(extent, width_px).await {
            Ok(img) => return Ok(img),
            Err(err) if attempt < attempts => {
                warn!(?request, attempt, %err, "basemap fetch failed, retrying");
                attempt += 1;
                tokio::time::sleep(retry.delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
