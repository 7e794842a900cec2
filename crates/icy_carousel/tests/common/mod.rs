use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use icy_carousel::{FetchBody, Fetcher, PreviewError};
use parking_lot::Mutex;
use tokio::sync::Notify;

struct Entry {
    body: Vec<u8>,
    chunk_size: usize,
    hold: Option<Arc<Notify>>,
}

/// Serves fixed bodies from memory and counts requests per URL
#[derive(Default)]
pub struct MockFetcher {
    entries: Mutex<HashMap<String, Arc<Entry>>>,
    requests: Mutex<HashMap<String, usize>>,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, body: impl Into<Vec<u8>>, chunk_size: usize) {
        self.insert(url, body.into(), chunk_size, None);
    }

    /// Delivers the first chunk, then waits for a notification before each
    /// further chunk
    pub fn serve_held(&self, url: &str, body: impl Into<Vec<u8>>, chunk_size: usize) -> Arc<Notify> {
        let hold = Arc::new(Notify::new());
        self.insert(url, body.into(), chunk_size, Some(hold.clone()));
        hold
    }

    fn insert(&self, url: &str, body: Vec<u8>, chunk_size: usize, hold: Option<Arc<Notify>>) {
        self.entries.lock().insert(
            url.to_string(),
            Arc::new(Entry {
                body,
                chunk_size: chunk_size.max(1),
                hold,
            }),
        );
    }

    pub fn requests(&self, url: &str) -> usize {
        self.requests.lock().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn open(&self, url: &str) -> Result<Box<dyn FetchBody>, PreviewError> {
        *self.requests.lock().entry(url.to_string()).or_insert(0) += 1;
        let entry = self.entries.lock().get(url).cloned();
        match entry {
            Some(entry) => Ok(Box::new(MockBody { entry, offset: 0 })),
            None => Err(PreviewError::Http {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

struct MockBody {
    entry: Arc<Entry>,
    offset: usize,
}

#[async_trait]
impl FetchBody for MockBody {
    fn content_length(&self) -> Option<u64> {
        Some(self.entry.body.len() as u64)
    }

    async fn chunk(&mut self) -> Result<Option<Vec<u8>>, PreviewError> {
        if self.offset > 0 {
            if let Some(hold) = &self.entry.hold {
                hold.notified().await;
            }
        }
        if self.offset >= self.entry.body.len() {
            return Ok(None);
        }
        let end = (self.offset + self.entry.chunk_size).min(self.entry.body.len());
        let chunk = self.entry.body[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(chunk))
    }
}

/// Let spawned fetch tasks run to completion on the test runtime
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
