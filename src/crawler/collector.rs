//! Result collection for finished pages
//!
//! Results arrive in completion order. A buffered collector keeps them until
//! the crawl ends; a streaming collector forwards each one to a channel as
//! soon as it is produced.

use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Content extracted from one successfully fetched, non-duplicate page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlResult {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    pub url: String,
    pub depth: u32,
    pub content_hash: String,
}

enum Sink {
    Buffered(Mutex<Vec<CrawlResult>>),
    Streaming(mpsc::UnboundedSender<CrawlResult>),
}

/// Collects results from concurrent workers
pub struct ResultCollector {
    sink: Sink,
}

impl ResultCollector {
    /// Collector that keeps every result until [`ResultCollector::take`]
    pub fn buffered() -> Self {
        Self {
            sink: Sink::Buffered(Mutex::new(Vec::new())),
        }
    }

    /// Collector that forwards results to the returned receiver
    ///
    /// The channel closes when the collector is dropped.
    pub fn streaming() -> (Self, mpsc::UnboundedReceiver<CrawlResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                sink: Sink::Streaming(tx),
            },
            rx,
        )
    }

    pub fn push(&self, result: CrawlResult) {
        match &self.sink {
            Sink::Buffered(results) => results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(result),
            Sink::Streaming(tx) => {
                // A consumer that stopped listening does not stop the crawl
                if tx.send(result).is_err() {
                    tracing::trace!("Result stream receiver dropped");
                }
            }
        }
    }

    /// Takes the buffered results; always empty for a streaming collector
    pub fn take(&self) -> Vec<CrawlResult> {
        match &self.sink {
            Sink::Buffered(results) => {
                std::mem::take(&mut *results.lock().unwrap_or_else(PoisonError::into_inner))
            }
            Sink::Streaming(_) => Vec::new(),
        }
    }
}
