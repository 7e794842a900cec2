//! Per-file content preloading.
//!
//! Each file index has at most one fetch in flight. The fetch runs as a tokio
//! task racing its [`CancellationToken`]; every caller asking for the same
//! index awaits the same shared result. Progress is broadcast through an
//! [`Emitter`] outside of the state lock, serialized by a re-entrant dispatch
//! lock so listeners may call back into the preloader.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, error, warn};
use parking_lot::{Mutex, ReentrantMutex};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::content::PreviewContent;
use crate::emitter::{Emitter, Subscription};
use crate::fetch::Fetcher;
use crate::file::{DecodeMode, FileDescriptor, TypePolicy};
use crate::resource::ResourceStore;
use crate::PreviewError;

/// Progress value of a finished (or failed) load
pub const PROGRESS_DONE: u8 = 100;

/// Upper bound while the total size is known but the body is incomplete
const PROGRESS_KNOWN_CAP: u8 = 99;

/// Upper bound while the total size is unknown
const PROGRESS_UNKNOWN_CAP: u8 = 90;

/// Per-chunk increment while the total size is unknown
const PROGRESS_UNKNOWN_STEP: u8 = 5;

/// Largest buffer reserved up front from a declared content length
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Outcome of a preload: `Ok(None)` for skipped, paused or cancelled loads
pub type PreloadResult = Result<Option<PreviewContent>, PreviewError>;

type SharedLoad = Shared<BoxFuture<'static, PreloadResult>>;

/// Progress change for one file index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub index: usize,
    pub progress: u8,
}

/// Point-in-time view of one index, taken under a single lock
#[derive(Debug, Clone, Default)]
pub struct PreloadSnapshot {
    pub progress: u8,
    pub content: Option<PreviewContent>,
    pub failed: bool,
    pub loading: bool,
}

struct InFlight {
    cancel_token: CancellationToken,
    result: SharedLoad,
}

#[derive(Default)]
struct PreloadState {
    progress: u8,
    content: Option<PreviewContent>,
    failed: bool,
    in_flight: Option<InFlight>,
}

#[derive(Default)]
struct PreloadTable {
    paused: bool,
    entries: HashMap<usize, PreloadState>,
}

struct Inner {
    runtime: Handle,
    fetcher: Arc<dyn Fetcher>,
    policy: TypePolicy,
    table: Mutex<PreloadTable>,
    /// Orders progress writes with their notification
    dispatch: ReentrantMutex<()>,
    progress: Emitter<ProgressEvent>,
    resources: Arc<ResourceStore>,
}

/// Fetches, caches and reports progress for file content.
/// Cloning is cheap; clones share the same cache.
#[derive(Clone)]
pub struct Preloader {
    inner: Arc<Inner>,
}

impl Preloader {
    pub fn new(runtime: Handle, fetcher: Arc<dyn Fetcher>, policy: TypePolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                runtime,
                fetcher,
                policy,
                table: Mutex::new(PreloadTable::default()),
                dispatch: ReentrantMutex::new(()),
                progress: Emitter::new(),
                resources: Arc::new(ResourceStore::new()),
            }),
        }
    }

    pub fn policy(&self) -> &TypePolicy {
        &self.inner.policy
    }

    pub fn resources(&self) -> Arc<ResourceStore> {
        self.inner.resources.clone()
    }

    /// Load `file` as index `index`.
    ///
    /// Returns cached content at once when complete. Resolves to `None` without
    /// touching the network if the type is not eligible or the preloader is
    /// paused. Otherwise joins (or starts) the single fetch for this index.
    pub fn preload_file(&self, file: &FileDescriptor, index: usize) -> BoxFuture<'static, PreloadResult> {
        self.request(file, index, false)
    }

    /// Explicit user request: like [`Preloader::preload_file`] but honored
    /// while paused. The paused flag itself is left alone.
    pub fn load_file(&self, file: &FileDescriptor, index: usize) -> BoxFuture<'static, PreloadResult> {
        self.request(file, index, true)
    }

    fn request(&self, file: &FileDescriptor, index: usize, explicit: bool) -> BoxFuture<'static, PreloadResult> {
        if !self.inner.policy.can_preload(&file.carousel_type) {
            return futures::future::ready(Ok(None)).boxed();
        }

        let _dispatch = self.inner.dispatch.lock();
        let mut table = self.inner.table.lock();
        if table.paused && !explicit {
            return futures::future::ready(Ok(None)).boxed();
        }

        let entry = table.entries.entry(index).or_default();
        if entry.progress == PROGRESS_DONE {
            if let Some(content) = &entry.content {
                return futures::future::ready(Ok(Some(content.clone()))).boxed();
            }
        }
        if let Some(in_flight) = &entry.in_flight {
            return in_flight.result.clone().boxed();
        }

        // A retry after a failure starts over from zero
        let reset = entry.progress != 0;
        entry.progress = 0;
        entry.failed = false;
        entry.content = None;

        let cancel_token = CancellationToken::new();
        debug!("[Preloader] Spawning fetch for #{} {}", index, file.url);
        let task = self.inner.runtime.spawn(run_fetch(self.inner.clone(), file.clone(), index, cancel_token.clone()));
        let result: SharedLoad = async move {
            match task.await {
                Ok(result) => result,
                Err(err) => {
                    error!("[Preloader] Fetch task for #{} panicked: {}", index, err);
                    Err(PreviewError::Task(err.to_string()))
                }
            }
        }
        .boxed()
        .shared();

        entry.in_flight = Some(InFlight {
            cancel_token,
            result: result.clone(),
        });
        drop(table);

        if reset {
            self.inner.progress.emit(&ProgressEvent { index, progress: 0 });
        }
        result.boxed()
    }

    /// Resume and start every given file (indexed by position) without waiting.
    pub fn preload_all(&self, files: &[FileDescriptor]) {
        self.resume();
        for (index, file) in files.iter().enumerate() {
            // The spawned task keeps running after the future is dropped
            drop(self.preload_file(file, index));
        }
    }

    /// Pause, abort every in-flight fetch and reset unfinished indices to 0.
    pub fn stop(&self) {
        let _dispatch = self.inner.dispatch.lock();
        let mut resets = Vec::new();
        {
            let mut table = self.inner.table.lock();
            table.paused = true;
            for (index, entry) in table.entries.iter_mut() {
                let was_loading = entry.in_flight.is_some();
                if let Some(in_flight) = entry.in_flight.take() {
                    in_flight.cancel_token.cancel();
                }
                if entry.progress != PROGRESS_DONE && (entry.progress != 0 || was_loading) {
                    entry.progress = 0;
                    resets.push(*index);
                }
            }
        }
        resets.sort_unstable();
        if !resets.is_empty() {
            debug!("[Preloader] Stopped, reset {} unfinished loads", resets.len());
        }
        for index in resets {
            self.inner.progress.emit(&ProgressEvent { index, progress: 0 });
        }
    }

    /// Clear the paused flag set by [`Preloader::stop`].
    pub fn resume(&self) {
        self.inner.table.lock().paused = false;
    }

    /// `stop()` plus release of every cached handle and all cached state.
    pub fn cleanup(&self) {
        self.stop();
        let entries = std::mem::take(&mut self.inner.table.lock().entries);
        for (_, entry) in entries {
            if let Some(PreviewContent::Resource(handle)) = entry.content {
                self.inner.resources.release(&handle);
            }
        }
    }

    pub fn on_progress(&self, callback: impl Fn(&ProgressEvent) + Send + Sync + 'static) -> Subscription {
        self.inner.progress.subscribe(callback)
    }

    pub fn remove_progress_listener(&self, subscription: &Subscription) -> bool {
        self.inner.progress.unsubscribe(subscription)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.progress.len()
    }

    pub fn progress(&self, index: usize) -> u8 {
        self.inner.table.lock().entries.get(&index).map_or(0, |e| e.progress)
    }

    /// Run `f` with the progress of `index`. No progress notification is
    /// dispatched until `f` returns.
    pub fn with_progress<R>(&self, index: usize, f: impl FnOnce(u8) -> R) -> R {
        let _dispatch = self.inner.dispatch.lock();
        f(self.progress(index))
    }

    pub fn content(&self, index: usize) -> Option<PreviewContent> {
        self.inner.table.lock().entries.get(&index).and_then(|e| e.content.clone())
    }

    pub fn is_loading(&self, index: usize) -> bool {
        self.inner.table.lock().entries.get(&index).is_some_and(|e| e.in_flight.is_some())
    }

    pub fn is_failed(&self, index: usize) -> bool {
        self.inner.table.lock().entries.get(&index).is_some_and(|e| e.failed)
    }

    pub fn is_paused(&self) -> bool {
        self.inner.table.lock().paused
    }

    pub fn snapshot(&self, index: usize) -> PreloadSnapshot {
        let table = self.inner.table.lock();
        match table.entries.get(&index) {
            Some(entry) => PreloadSnapshot {
                progress: entry.progress,
                content: entry.content.clone(),
                failed: entry.failed,
                loading: entry.in_flight.is_some(),
            },
            None => PreloadSnapshot::default(),
        }
    }
}

struct FetchedBody {
    data: Vec<u8>,
    content_type: Option<String>,
}

async fn run_fetch(inner: Arc<Inner>, file: FileDescriptor, index: usize, cancel_token: CancellationToken) -> PreloadResult {
    let outcome = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => {
            debug!("[Preloader] Fetch cancelled: #{} {}", index, file.url);
            return Ok(None);
        }
        result = fetch_body(&inner, &file, index, &cancel_token) => result
    };

    let _dispatch = inner.dispatch.lock();
    let result = {
        let mut table = inner.table.lock();
        if cancel_token.is_cancelled() {
            return Ok(None);
        }
        let entry = table.entries.entry(index).or_default();
        entry.in_flight = None;
        entry.progress = PROGRESS_DONE;
        match outcome {
            Ok(body) => {
                let content = decode(&inner.resources, &file, body);
                entry.content = Some(content.clone());
                entry.failed = false;
                debug!("[Preloader] Completed: #{} {}", index, file.url);
                Ok(Some(content))
            }
            Err(err) => {
                warn!("[Preloader] Failed to load #{} {}: {}", index, file.url, err);
                entry.content = None;
                entry.failed = true;
                Err(err)
            }
        }
    };
    inner.progress.emit(&ProgressEvent {
        index,
        progress: PROGRESS_DONE,
    });
    result
}

async fn fetch_body(inner: &Inner, file: &FileDescriptor, index: usize, cancel_token: &CancellationToken) -> Result<FetchedBody, PreviewError> {
    let mut body = inner.fetcher.open(&file.url).await?;
    let total = body.content_length().filter(|len| *len > 0);
    let content_type = body.content_type();
    let mut data = Vec::with_capacity(total.unwrap_or(0).min(MAX_PREALLOC) as usize);

    while let Some(chunk) = body.chunk().await? {
        data.extend_from_slice(&chunk);
        report_chunk(inner, index, data.len() as u64, total, cancel_token);
    }

    Ok(FetchedBody { data, content_type })
}

fn report_chunk(inner: &Inner, index: usize, loaded: u64, total: Option<u64>, cancel_token: &CancellationToken) {
    let _dispatch = inner.dispatch.lock();
    let progress = {
        let mut table = inner.table.lock();
        if cancel_token.is_cancelled() {
            return;
        }
        let entry = table.entries.entry(index).or_default();
        let next = next_progress(entry.progress, loaded, total);
        if next == entry.progress {
            return;
        }
        entry.progress = next;
        next
    };
    inner.progress.emit(&ProgressEvent { index, progress });
}

/// Progress after a chunk: exact ratio capped at 99 for known sizes, a fixed
/// step capped at 90 otherwise. Never decreases.
pub(crate) fn next_progress(current: u8, loaded: u64, total: Option<u64>) -> u8 {
    let next = match total {
        Some(total) => (loaded.saturating_mul(100) / total).min(PROGRESS_KNOWN_CAP as u64) as u8,
        None => current.saturating_add(PROGRESS_UNKNOWN_STEP).min(PROGRESS_UNKNOWN_CAP),
    };
    next.max(current)
}

fn decode(resources: &ResourceStore, file: &FileDescriptor, body: FetchedBody) -> PreviewContent {
    match file.carousel_type.decode_mode() {
        DecodeMode::Buffer => PreviewContent::Buffer(Arc::new(body.data)),
        DecodeMode::Resource => PreviewContent::Resource(resources.create(Arc::new(body.data), body.content_type)),
        DecodeMode::Text => PreviewContent::Text(Arc::from(String::from_utf8_lossy(&body.data).as_ref())),
    }
}
