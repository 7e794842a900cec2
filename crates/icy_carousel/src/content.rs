use std::sync::Arc;

use crate::resource::ResourceHandle;

/// Decoded content cached by the preloader, one per file index.
#[derive(Debug, Clone)]
pub enum PreviewContent {
    /// Media and PDF bytes behind a locally-scoped handle
    Resource(ResourceHandle),
    /// Raw buffer for decoders that need the whole file (spreadsheets)
    Buffer(Arc<Vec<u8>>),
    /// Decoded text
    Text(Arc<str>),
}

impl PreviewContent {
    pub fn as_resource(&self) -> Option<&ResourceHandle> {
        match self {
            PreviewContent::Resource(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&[u8]> {
        match self {
            PreviewContent::Buffer(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PreviewContent::Text(text) => Some(text),
            _ => None,
        }
    }

    /// True if both values refer to the same cached allocation
    pub fn same_as(&self, other: &PreviewContent) -> bool {
        match (self, other) {
            (PreviewContent::Resource(a), PreviewContent::Resource(b)) => a == b,
            (PreviewContent::Buffer(a), PreviewContent::Buffer(b)) => Arc::ptr_eq(a, b),
            (PreviewContent::Text(a), PreviewContent::Text(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for PreviewContent {
    fn eq(&self, other: &Self) -> bool {
        // Compare by Arc pointer (same Arc = same cache entry)
        self.same_as(other)
    }
}

impl Eq for PreviewContent {}
