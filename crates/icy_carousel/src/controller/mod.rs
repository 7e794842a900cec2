//! Modal session lifecycle, navigation, the thumbnail strip and the bulk
//! preload toggle.
//!
//! The controller never holds its own lock while calling into the preloader
//! or the renderer: progress callbacks arrive on fetch tasks and call back
//! into the controller. Views are rendered unlocked and applied afterwards
//! only if no newer render was applied in between.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::emitter::Subscription;
use crate::file::FileDescriptor;
use crate::keys::{CarouselCommand, KeyEvent, KeyMap};
use crate::options::{CarouselHooks, CarouselOptions};
use crate::preloader::{Preloader, ProgressEvent};
use crate::render::{self, RenderedView, Renderer};
use crate::surface::{Region, Surface};

mod action;
pub mod markup;

pub use action::Action;

struct Session {
    current_index: usize,
    files: Arc<Vec<FileDescriptor>>,
    /// File indices shown in the thumbnail strip
    strip: Vec<usize>,
    progress_subscription: Subscription,
}

#[derive(Default)]
struct ControllerState {
    session: Option<Session>,
    is_preloading: bool,
    /// Bumped for every render started
    render_generation: u64,
    /// Generation of the last view put on the surface
    applied_generation: u64,
    settle_token: Option<CancellationToken>,
}

struct ControllerInner {
    runtime: Handle,
    preloader: Preloader,
    renderer: Renderer,
    surface: Arc<dyn Surface>,
    options: Arc<CarouselOptions>,
    hooks: CarouselHooks,
    keymap: KeyMap,
    state: Mutex<ControllerState>,
}

#[derive(Clone)]
pub struct ModalController {
    inner: Arc<ControllerInner>,
}

impl ModalController {
    pub fn new(
        runtime: Handle,
        preloader: Preloader,
        surface: Arc<dyn Surface>,
        options: Arc<CarouselOptions>,
        hooks: CarouselHooks,
        keymap: KeyMap,
    ) -> Self {
        let renderer = Renderer::new(preloader.clone(), options.clone());
        Self {
            inner: Arc::new(ControllerInner {
                runtime,
                preloader,
                renderer,
                surface,
                options,
                hooks,
                keymap,
                state: Mutex::new(ControllerState::default()),
            }),
        }
    }

    /// Open a session on `files` at `index`. The index must be in range.
    pub fn open(&self, index: usize, files: Arc<Vec<FileDescriptor>>) {
        if index >= files.len() {
            warn!("[ModalController] open({}) out of range for {} files", index, files.len());
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let subscription = self.inner.preloader.on_progress(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_progress(event);
            }
        });
        let strip = markup::strip_indices(&files, self.inner.preloader.policy());

        let previous = {
            let mut state = self.inner.state.lock();
            state.session.replace(Session {
                current_index: index,
                files: files.clone(),
                strip: strip.clone(),
                progress_subscription: subscription,
            })
        };
        if let Some(previous) = previous {
            self.inner.preloader.remove_progress_listener(&previous.progress_subscription);
        }

        debug!("[ModalController] Open #{} of {}", index, files.len());
        self.inner.surface.set_visible(true);
        self.inner.render_strip(&files, &strip);
        self.inner.render_current();
    }

    pub fn close(&self) {
        let (session, settle) = {
            let mut state = self.inner.state.lock();
            (state.session.take(), state.settle_token.take())
        };
        if let Some(token) = settle {
            token.cancel();
        }
        let Some(session) = session else {
            return;
        };
        self.inner.preloader.remove_progress_listener(&session.progress_subscription);
        self.inner.surface.pause_media();
        self.inner.surface.set_visible(false);
        self.inner.surface.set_active_thumbnail(None);
        debug!("[ModalController] Closed");
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.lock().session.is_some()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.inner.state.lock().session.as_ref().map(|s| s.current_index)
    }

    pub fn current_file(&self) -> Option<FileDescriptor> {
        let state = self.inner.state.lock();
        let session = state.session.as_ref()?;
        session.files.get(session.current_index).cloned()
    }

    pub fn is_preloading(&self) -> bool {
        self.inner.state.lock().is_preloading
    }

    pub(crate) fn set_preloading(&self, is_preloading: bool) {
        self.inner.state.lock().is_preloading = is_preloading;
        self.inner.render_preload_toggle();
    }

    /// Indices in the thumbnail strip of the open session
    pub fn strip(&self) -> Vec<usize> {
        self.inner.state.lock().session.as_ref().map(|s| s.strip.clone()).unwrap_or_default()
    }

    pub fn prev(&self) {
        self.navigate(|index, _| index.checked_sub(1));
    }

    pub fn next(&self) {
        self.navigate(|index, len| (index + 1 < len).then_some(index + 1));
    }

    /// Jump to `index` within the open session
    pub fn go_to(&self, index: usize) {
        self.navigate(|_, len| (index < len).then_some(index));
    }

    fn navigate(&self, target: impl FnOnce(usize, usize) -> Option<usize>) {
        {
            let mut state = self.inner.state.lock();
            let Some(session) = state.session.as_mut() else {
                return;
            };
            match target(session.current_index, session.files.len()) {
                Some(index) if index != session.current_index => session.current_index = index,
                _ => return,
            }
        }
        self.inner.surface.pause_media();
        self.inner.render_current();
    }

    /// Start a sweep over every eligible file, or stop the running one
    pub fn toggle_preload(&self) {
        let (files, start) = {
            let mut state = self.inner.state.lock();
            let Some(session) = state.session.as_ref() else {
                return;
            };
            let files = session.files.clone();
            state.is_preloading = !state.is_preloading;
            if let Some(token) = state.settle_token.take() {
                token.cancel();
            }
            (files, state.is_preloading)
        };

        if start {
            debug!("[ModalController] Preload sweep over {} files", files.len());
            // Ineligible types are skipped by the preloader itself
            self.inner.preloader.preload_all(&files);
            self.inner.render_current();
            return;
        }

        debug!("[ModalController] Preload sweep stopped");
        self.inner.preloader.stop();
        self.inner.render_preload_toggle();

        let token = CancellationToken::new();
        self.inner.state.lock().settle_token = Some(token.clone());
        let weak = Arc::downgrade(&self.inner);
        let delay = Duration::from_millis(self.inner.options.settle_delay_ms);
        self.inner.runtime.spawn(async move {
            if cancellable_sleep(delay, &token).await {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                inner.render_current();
            }
        });
    }

    /// Explicit load of one file, honored even while the sweep is stopped
    pub fn load_preview(&self, index: usize) {
        let file = {
            let state = self.inner.state.lock();
            let Some(session) = state.session.as_ref() else {
                return;
            };
            match session.files.get(index) {
                Some(file) => file.clone(),
                None => return,
            }
        };

        let load = self.inner.preloader.load_file(&file, index);
        self.inner.render_current();

        let weak = Arc::downgrade(&self.inner);
        self.inner.runtime.spawn(async move {
            if let Err(err) = load.await {
                warn!("[ModalController] Load preview failed for {}: {}", file.name, err);
                if let Some(inner) = weak.upgrade() {
                    let generation = inner.begin_render();
                    inner.apply_if_current(index, generation, render::failed_view());
                }
            }
        });
    }

    /// Download the current file through the hook or the surface
    pub fn download(&self) {
        let Some(index) = self.current_index() else {
            return;
        };
        let Some(file) = self.current_file() else {
            return;
        };
        match &self.inner.hooks.on_file_download {
            Some(callback) => callback(&file, index),
            None => self.inner.surface.download(&file.url, &file.name),
        }
    }

    /// Dispatch a key press. Returns true if a command ran.
    pub fn handle_key(&self, event: &KeyEvent) -> bool {
        let Some(index) = self.current_index() else {
            return false;
        };
        let Some(command) = self.inner.keymap.command_for(event) else {
            return false;
        };
        debug!("[ModalController] Key {} -> {}", event.key, command.id());
        match command {
            CarouselCommand::Prev => self.prev(),
            CarouselCommand::Next => self.next(),
            CarouselCommand::Close => self.close(),
            CarouselCommand::Download => self.download(),
            CarouselCommand::TogglePreload => self.toggle_preload(),
            CarouselCommand::LoadPreview => self.load_preview(index),
        }
        true
    }

    pub fn handle_action(&self, action: Action) {
        match action {
            Action::LoadPreview(index) => self.load_preview(index),
            Action::Prev => self.prev(),
            Action::Next => self.next(),
            Action::Close => self.close(),
            Action::Download => self.download(),
            Action::TogglePreload => self.toggle_preload(),
            Action::Select(index) => self.go_to(index),
        }
    }

    /// Swap the file list of an open session and rebuild the strip
    pub(crate) fn replace_files(&self, files: Arc<Vec<FileDescriptor>>) {
        if files.is_empty() {
            self.close();
            return;
        }
        let strip = markup::strip_indices(&files, self.inner.preloader.policy());
        {
            let mut state = self.inner.state.lock();
            let Some(session) = state.session.as_mut() else {
                return;
            };
            session.current_index = session.current_index.min(files.len() - 1);
            session.files = files.clone();
            session.strip = strip.clone();
        }
        self.inner.render_strip(&files, &strip);
        self.inner.render_current();
    }
}

impl ControllerInner {
    fn on_progress(&self, event: &ProgressEvent) {
        let (is_current, in_strip) = {
            let state = self.state.lock();
            let Some(session) = state.session.as_ref() else {
                return;
            };
            (session.current_index == event.index, session.strip.contains(&event.index))
        };
        if in_strip {
            self.surface
                .replace(Region::ThumbnailProgress(event.index), &markup::thumbnail_progress_markup(event.progress));
        }
        if is_current {
            self.render_current();
        }
    }

    fn begin_render(&self) -> u64 {
        let mut state = self.state.lock();
        state.render_generation += 1;
        state.render_generation
    }

    fn render_current(&self) {
        let generation = self.begin_render();
        let target = {
            let state = self.state.lock();
            state
                .session
                .as_ref()
                .and_then(|s| s.files.get(s.current_index).cloned().map(|file| (s.current_index, file)))
        };
        let Some((index, file)) = target else {
            return;
        };
        let view = self.renderer.render(&file, index);
        self.apply_if_current(index, generation, view);
    }

    /// Put a rendered view on the surface unless the session moved on or a
    /// newer render already landed
    fn apply_if_current(&self, index: usize, generation: u64, view: RenderedView) {
        let mut state = self.state.lock();
        if generation <= state.applied_generation {
            return;
        }
        let is_preloading = state.is_preloading;
        let Some(session) = state.session.as_ref() else {
            return;
        };
        if session.current_index != index {
            return;
        }
        let Some(file) = session.files.get(index) else {
            return;
        };
        let total = session.files.len();
        let in_strip = session.strip.contains(&index);

        self.surface.replace(Region::Title, &render::markup::escape(&file.name));
        self.surface.replace(Region::Counter, &markup::counter_markup(index, total));
        self.surface.replace(Region::PreloadToggle, &markup::preload_toggle_markup(is_preloading));
        self.surface.replace(Region::Content, &view.markup);
        self.surface.set_active_thumbnail(in_strip.then_some(index));
        state.applied_generation = generation;
    }

    fn render_strip(&self, files: &[FileDescriptor], strip: &[usize]) {
        self.surface.replace(Region::Thumbnails, &markup::thumbnails_markup(files, strip));
        for &index in strip {
            // Serialized with progress callbacks so a finished load is never overwritten
            self.preloader.with_progress(index, |progress| {
                self.surface
                    .replace(Region::ThumbnailProgress(index), &markup::thumbnail_progress_markup(progress));
            });
        }
    }

    fn render_preload_toggle(&self) {
        let state = self.state.lock();
        if state.session.is_some() {
            self.surface.replace(Region::PreloadToggle, &markup::preload_toggle_markup(state.is_preloading));
        }
    }
}

/// Sleep unless cancelled first. Returns true if cancelled.
async fn cancellable_sleep(duration: Duration, cancel_token: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel_token.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::CarouselType;
    use crate::keys::{Key, Modifiers};
    use crate::options::AutoPreload;
    use crate::render::ViewKind;
    use crate::surface::MemorySurface;
    use crate::test_util::ScriptedFetcher;

    struct Fixture {
        fetcher: Arc<ScriptedFetcher>,
        preloader: Preloader,
        surface: Arc<MemorySurface>,
        controller: ModalController,
    }

    fn fixture(options: CarouselOptions, hooks: CarouselHooks) -> Fixture {
        let fetcher = ScriptedFetcher::new();
        let preloader = Preloader::new(Handle::current(), fetcher.clone(), options.type_policy());
        let surface = Arc::new(MemorySurface::new());
        let controller = ModalController::new(
            Handle::current(),
            preloader.clone(),
            surface.clone(),
            Arc::new(options),
            hooks,
            KeyMap::default(),
        );
        Fixture {
            fetcher,
            preloader,
            surface,
            controller,
        }
    }

    fn manual() -> CarouselOptions {
        CarouselOptions {
            auto_preload: AutoPreload::Flag(false),
            ..Default::default()
        }
    }

    fn files(names: &[(&str, &str)]) -> Arc<Vec<FileDescriptor>> {
        Arc::new(names.iter().map(|(name, kind)| FileDescriptor::new(*name, *name, *kind)).collect())
    }

    fn content(surface: &MemorySurface) -> String {
        surface.region(Region::Content).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_open_and_close() {
        let f = fixture(manual(), CarouselHooks::default());
        f.controller.open(1, files(&[("a.txt", "text"), ("b.txt", "text")]));

        assert!(f.controller.is_open());
        assert!(f.surface.is_visible());
        assert_eq!(f.controller.current_index(), Some(1));
        assert_eq!(f.surface.region(Region::Title).as_deref(), Some("b.txt"));
        assert_eq!(f.surface.region(Region::Counter).as_deref(), Some("2 / 2"));
        assert_eq!(f.surface.active_thumbnail(), Some(1));
        assert_eq!(f.preloader.listener_count(), 1);

        f.controller.close();
        assert!(!f.controller.is_open());
        assert!(!f.surface.is_visible());
        assert_eq!(f.surface.media_pauses(), 1);
        assert_eq!(f.preloader.listener_count(), 0);
        assert_eq!(f.controller.current_file(), None);
    }

    #[tokio::test]
    async fn test_reopen_does_not_leak_listeners() {
        let f = fixture(manual(), CarouselHooks::default());
        let list = files(&[("a.txt", "text")]);
        for _ in 0..3 {
            f.controller.open(0, list.clone());
        }
        assert_eq!(f.preloader.listener_count(), 1);
        f.controller.close();
        f.controller.open(0, list);
        f.controller.close();
        assert_eq!(f.preloader.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_boundary_navigation_is_noop() {
        let f = fixture(manual(), CarouselHooks::default());
        f.controller.open(0, files(&[("a.txt", "text"), ("b.txt", "text"), ("c.txt", "text")]));

        f.controller.prev();
        assert_eq!(f.controller.current_index(), Some(0));
        f.controller.next();
        f.controller.next();
        assert_eq!(f.controller.current_index(), Some(2));
        assert_eq!(f.surface.active_thumbnail(), Some(2));
        f.controller.next();
        assert_eq!(f.controller.current_index(), Some(2));
        f.controller.go_to(7);
        assert_eq!(f.controller.current_index(), Some(2));
        f.controller.handle_action(Action::Select(0));
        assert_eq!(f.controller.current_index(), Some(0));
    }

    #[tokio::test]
    async fn test_manual_load_flow() {
        let f = fixture(manual(), CarouselHooks::default());
        f.fetcher.add("a.txt", vec![b"hello".to_vec()], true);
        f.controller.open(0, files(&[("a.txt", "text")]));
        assert!(content(&f.surface).contains("data-action=\"load-preview\""));
        assert_eq!(f.fetcher.open_count("a.txt"), 0);

        f.controller.handle_action(Action::LoadPreview(0));
        f.preloader.preload_file(&FileDescriptor::new("a.txt", "a.txt", "text"), 0).await.unwrap();
        assert!(content(&f.surface).contains("hello"));
        assert_eq!(f.fetcher.open_count("a.txt"), 1);
    }

    #[tokio::test]
    async fn test_failed_manual_load_shows_failure() {
        let f = fixture(manual(), CarouselHooks::default());
        f.controller.open(0, files(&[("gone.pdf", "pdf")]));
        f.controller.load_preview(0);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(f.preloader.is_failed(0));
        assert!(content(&f.surface).contains("Failed to load preview."));
        assert_eq!(f.controller.inner.renderer.render(&FileDescriptor::new("gone.pdf", "gone.pdf", "pdf"), 0).kind, ViewKind::Failed);
    }

    #[tokio::test]
    async fn test_progress_updates_view_and_thumbnail() {
        let f = fixture(manual(), CarouselHooks::default());
        let gate = f.fetcher.add_gated("clip.mp4", vec![vec![0; 25], vec![0; 75]], true);
        f.controller.open(0, files(&[("clip.mp4", "video")]));
        f.controller.load_preview(0);

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        f.preloader.on_progress(move |event| {
            let _ = tx.send(*event);
        });
        assert_eq!(rx.recv().await.unwrap().progress, 25);
        assert!(content(&f.surface).contains("data-progress=\"25\""));
        assert!(f.surface.region(Region::ThumbnailProgress(0)).unwrap().contains("stroke-dasharray=\"25 100\""));

        gate.notify_one();
        assert_eq!(rx.recv().await.unwrap().progress, 99);
        // End of body is gated as well
        gate.notify_one();
        assert_eq!(rx.recv().await.unwrap().progress, 100);
        assert!(content(&f.surface).contains("<video"));
        assert_eq!(f.surface.region(Region::ThumbnailProgress(0)).as_deref(), Some(""));
    }

    /// Lets the held load finish while the first overlay write is in progress
    struct StallingSurface {
        inner: MemorySurface,
        gate: Arc<tokio::sync::Notify>,
        stalled: std::sync::atomic::AtomicBool,
    }

    impl Surface for StallingSurface {
        fn mount(&self, markup: &str) {
            self.inner.mount(markup);
        }

        fn set_visible(&self, visible: bool) {
            self.inner.set_visible(visible);
        }

        fn replace(&self, region: Region, markup: &str) {
            if region == Region::ThumbnailProgress(0) && !self.stalled.swap(true, std::sync::atomic::Ordering::SeqCst) {
                self.gate.notify_one();
                std::thread::sleep(Duration::from_millis(100));
            }
            self.inner.replace(region, markup);
        }

        fn set_active_thumbnail(&self, index: Option<usize>) {
            self.inner.set_active_thumbnail(index);
        }

        fn pause_media(&self) {
            self.inner.pause_media();
        }

        fn download(&self, url: &str, name: &str) {
            self.inner.download(url, name);
        }

        fn clear(&self) {
            self.inner.clear();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_thumbnail_overlay_not_overwritten_by_open() {
        let fetcher = ScriptedFetcher::new();
        // One chunk of unknown length, the end of the body waits for the gate
        let gate = fetcher.add_gated("clip.mp4", vec![vec![0; 50]], false);
        let options = manual();
        let preloader = Preloader::new(Handle::current(), fetcher.clone(), options.type_policy());
        let surface = Arc::new(StallingSurface {
            inner: MemorySurface::new(),
            gate,
            stalled: std::sync::atomic::AtomicBool::new(false),
        });
        let controller = ModalController::new(
            Handle::current(),
            preloader.clone(),
            surface.clone(),
            Arc::new(options),
            CarouselHooks::default(),
            KeyMap::default(),
        );

        let file = FileDescriptor::new("clip.mp4", "clip.mp4", "video");
        let load = preloader.load_file(&file, 0);
        while preloader.progress(0) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(preloader.is_loading(0));

        controller.open(0, Arc::new(vec![file]));
        assert!(load.await.unwrap().is_some());
        assert_eq!(preloader.progress(0), 100);
        assert_eq!(surface.inner.region(Region::ThumbnailProgress(0)).as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_toggle_preload_starts_and_stops() {
        let f = fixture(
            CarouselOptions {
                settle_delay_ms: 10,
                ..manual()
            },
            CarouselHooks::default(),
        );
        let _gate = f.fetcher.add_gated("a.mp4", vec![vec![0; 10], vec![0; 90]], true);
        f.fetcher.add("b.png", vec![vec![1; 4]], true);
        f.controller.open(0, files(&[("a.mp4", "video"), ("b.png", "image"), ("c.zip", "zip")]));

        f.controller.toggle_preload();
        assert!(f.controller.is_preloading());
        assert!(content(&f.surface).contains("data-progress=\"0\""));
        assert!(f.surface.region(Region::PreloadToggle).unwrap().contains("Stop preloading"));
        f.preloader.preload_file(&FileDescriptor::new("b.png", "b.png", "image"), 1).await.unwrap();
        assert_eq!(f.fetcher.open_count("a.mp4"), 1);
        assert_eq!(f.fetcher.open_count("c.zip"), 0);

        f.controller.toggle_preload();
        assert!(!f.controller.is_preloading());
        assert!(f.preloader.is_paused());
        assert_eq!(f.preloader.progress(0), 0);
        assert_eq!(f.preloader.progress(1), 100);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(content(&f.surface).contains("data-action=\"load-preview\""));
        assert!(f.surface.region(Region::PreloadToggle).unwrap().contains("Preload all"));
    }

    #[tokio::test]
    async fn test_keys_only_while_open() {
        let f = fixture(manual(), CarouselHooks::default());
        let right = KeyEvent::plain(Key::ArrowRight);
        assert!(!f.controller.handle_key(&right));

        f.controller.open(0, files(&[("a.txt", "text"), ("b.txt", "text")]));
        assert!(f.controller.handle_key(&right));
        assert_eq!(f.controller.current_index(), Some(1));
        assert!(!f.controller.handle_key(&KeyEvent::new(Key::ArrowLeft, Modifiers::CTRL)));
        assert!(f.controller.handle_key(&KeyEvent::plain(Key::Escape)));
        assert!(!f.controller.is_open());
    }

    #[tokio::test]
    async fn test_download_prefers_hook() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let f = fixture(manual(), CarouselHooks::default().on_file_download(move |file, index| sink.lock().push((file.name.clone(), index))));
        f.controller.open(1, files(&[("a.txt", "text"), ("b.txt", "text")]));
        f.controller.handle_key(&KeyEvent::plain(Key::Char('D')));
        assert_eq!(*seen.lock(), vec![("b.txt".to_string(), 1)]);
        assert!(f.surface.downloads().is_empty());

        let f = fixture(manual(), CarouselHooks::default());
        f.controller.open(0, files(&[("a.txt", "text")]));
        f.controller.download();
        assert_eq!(f.surface.downloads(), vec![("a.txt".to_string(), "a.txt".to_string())]);
    }

    #[tokio::test]
    async fn test_strip_omits_invisible_types() {
        let options = CarouselOptions {
            visible_types: vec![CarouselType::Image],
            previewable_types: vec![CarouselType::Image, CarouselType::Video],
            ..manual()
        };
        let f = fixture(options, CarouselHooks::default());
        f.controller.open(0, files(&[("a.png", "image"), ("b.mp4", "video")]));
        assert_eq!(f.controller.strip(), vec![0]);
        let thumbs = f.surface.region(Region::Thumbnails).unwrap();
        assert!(!thumbs.contains("b.mp4"));

        f.controller.next();
        assert_eq!(f.surface.active_thumbnail(), None);
    }
}
