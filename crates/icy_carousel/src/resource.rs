//! Locally-scoped resource handles for binary previews.
//!
//! Media and PDF content is not handed to the markup directly. The preloader
//! stores the bytes here and embeds the handle URL (`blob:icy-carousel/<id>`)
//! instead; the host resolves it back through [`ResourceStore::resolve`].
//! Handles stay valid until they are released, releasing twice is a no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// URL scheme prefix of every handle created by a store
pub const RESOURCE_URL_PREFIX: &str = "blob:icy-carousel/";

/// Reference to bytes held by a [`ResourceStore`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    id: u64,
    url: String,
}

impl ResourceHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Bytes behind a handle
#[derive(Debug, Clone)]
pub struct Resource {
    /// Raw bytes (Arc for cheap cloning)
    pub data: Arc<Vec<u8>>,
    /// MIME type reported by the server, if any
    pub mime: Option<String>,
}

#[derive(Default)]
pub struct ResourceStore {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, Resource>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, data: Arc<Vec<u8>>, mime: Option<String>) -> ResourceHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.entries.lock().insert(id, Resource { data, mime });
        ResourceHandle {
            id,
            url: format!("{}{}", RESOURCE_URL_PREFIX, id),
        }
    }

    pub fn get(&self, handle: &ResourceHandle) -> Option<Resource> {
        self.entries.lock().get(&handle.id).cloned()
    }

    /// Look up a handle by its URL, as found in rendered markup
    pub fn resolve(&self, url: &str) -> Option<Resource> {
        let id = url.strip_prefix(RESOURCE_URL_PREFIX)?.parse::<u64>().ok()?;
        self.entries.lock().get(&id).cloned()
    }

    /// Returns false if the handle was already released
    pub fn release(&self, handle: &ResourceHandle) -> bool {
        let released = self.entries.lock().remove(&handle.id).is_some();
        if released {
            log::debug!("[ResourceStore] Released {}", handle.url);
        }
        released
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
