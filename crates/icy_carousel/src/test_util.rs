use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::fetch::{FetchBody, Fetcher};
use crate::preloader::{Preloader, ProgressEvent};
use crate::PreviewError;

#[derive(Clone)]
struct Script {
    chunks: Vec<Vec<u8>>,
    known_length: bool,
    gate: Option<Arc<Notify>>,
}

/// In-memory fetcher serving scripted bodies; unknown URLs fail to connect
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    opens: Mutex<HashMap<String, usize>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, url: &str, chunks: Vec<Vec<u8>>, known_length: bool) {
        self.scripts.lock().insert(
            url.to_string(),
            Script {
                chunks,
                known_length,
                gate: None,
            },
        );
    }

    /// The first chunk is delivered at once, every further chunk waits for the gate
    pub fn add_gated(&self, url: &str, chunks: Vec<Vec<u8>>, known_length: bool) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.scripts.lock().insert(
            url.to_string(),
            Script {
                chunks,
                known_length,
                gate: Some(gate.clone()),
            },
        );
        gate
    }

    pub fn open_count(&self, url: &str) -> usize {
        self.opens.lock().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn open(&self, url: &str) -> Result<Box<dyn FetchBody>, PreviewError> {
        *self.opens.lock().entry(url.to_string()).or_insert(0) += 1;
        let script = self.scripts.lock().get(url).cloned();
        match script {
            Some(script) => Ok(Box::new(ScriptedBody {
                total: script.chunks.iter().map(|c| c.len() as u64).sum(),
                script,
                position: 0,
            })),
            None => Err(PreviewError::Network {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

struct ScriptedBody {
    script: Script,
    total: u64,
    position: usize,
}

#[async_trait]
impl FetchBody for ScriptedBody {
    fn content_length(&self) -> Option<u64> {
        self.script.known_length.then_some(self.total)
    }

    async fn chunk(&mut self) -> Result<Option<Vec<u8>>, PreviewError> {
        if self.position > 0 {
            if let Some(gate) = &self.script.gate {
                gate.notified().await;
            }
        }
        let chunk = self.script.chunks.get(self.position).cloned();
        self.position += 1;
        Ok(chunk)
    }
}

pub fn collect_progress(preloader: &Preloader) -> Arc<Mutex<Vec<ProgressEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    preloader.on_progress(move |event| sink.lock().push(*event));
    events
}
