//! Top-level carousel: owns the preloader and the modal controller, mounts
//! the modal once and applies the eager loading policy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, info};
use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::controller::{markup, Action, ModalController};
use crate::emitter::{Emitter, Subscription};
use crate::fetch::Fetcher;
use crate::file::FileDescriptor;
use crate::keys::{KeyEvent, KeyMap};
use crate::options::{AutoPreload, CarouselHooks, CarouselOptions};
use crate::preloader::Preloader;
use crate::registry::{CarouselId, CarouselRegistry};
use crate::resource::ResourceStore;
use crate::surface::Surface;

/// Host collaborators a carousel is built against
#[derive(Clone)]
pub struct CarouselContext {
    pub runtime: Handle,
    pub surface: Arc<dyn Surface>,
    pub fetcher: Arc<dyn Fetcher>,
    /// Document-level key presses
    pub input: Option<Arc<Emitter<KeyEvent>>>,
    pub registry: Option<Arc<CarouselRegistry>>,
    pub keymap: KeyMap,
}

impl CarouselContext {
    pub fn new(runtime: Handle, surface: Arc<dyn Surface>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            runtime,
            surface,
            fetcher,
            input: None,
            registry: None,
            keymap: KeyMap::default(),
        }
    }

    pub fn with_input(mut self, input: Arc<Emitter<KeyEvent>>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_registry(mut self, registry: Arc<CarouselRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_keymap(mut self, keymap: KeyMap) -> Self {
        self.keymap = keymap;
        self
    }
}

pub(crate) struct CarouselInner {
    surface: Arc<dyn Surface>,
    input: Option<Arc<Emitter<KeyEvent>>>,
    registry: Option<Arc<CarouselRegistry>>,
    options: Arc<CarouselOptions>,
    hooks: CarouselHooks,
    preloader: Preloader,
    controller: ModalController,
    files: Mutex<Arc<Vec<FileDescriptor>>>,
    input_subscription: Mutex<Option<Subscription>>,
    id: Mutex<Option<CarouselId>>,
    destroyed: AtomicBool,
}

/// File carousel. Clones share the same instance.
#[derive(Clone)]
pub struct Carousel {
    inner: Arc<CarouselInner>,
}

impl Carousel {
    pub fn new(context: CarouselContext, files: Vec<FileDescriptor>, options: CarouselOptions, hooks: CarouselHooks) -> Self {
        let options = Arc::new(options);
        let preloader = Preloader::new(context.runtime.clone(), context.fetcher.clone(), options.type_policy());
        let controller = ModalController::new(
            context.runtime.clone(),
            preloader.clone(),
            context.surface.clone(),
            options.clone(),
            hooks.clone(),
            context.keymap.clone(),
        );

        context.surface.mount(&markup::modal_markup(options.show_download_button));

        let input_subscription = context.input.as_ref().map(|input| {
            let controller = controller.clone();
            input.subscribe(move |event| {
                controller.handle_key(event);
            })
        });

        let carousel = Self {
            inner: Arc::new(CarouselInner {
                surface: context.surface,
                input: context.input,
                registry: context.registry,
                options,
                hooks,
                preloader,
                controller,
                files: Mutex::new(Arc::new(files)),
                input_subscription: Mutex::new(input_subscription),
                id: Mutex::new(None),
                destroyed: AtomicBool::new(false),
            }),
        };

        if let Some(registry) = &carousel.inner.registry {
            let id = registry.register(&carousel);
            *carousel.inner.id.lock() = Some(id);
        }

        let files = carousel.files();
        info!("[Carousel] Created with {} files", files.len());
        carousel.apply_auto_preload(&files);
        carousel
    }

    pub(crate) fn downgrade(&self) -> Weak<CarouselInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<CarouselInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn apply_auto_preload(&self, files: &[FileDescriptor]) {
        let preloader = &self.inner.preloader;
        match &self.inner.options.auto_preload {
            AutoPreload::Flag(true) => {
                preloader.preload_all(files);
                self.inner.controller.set_preloading(true);
            }
            AutoPreload::Flag(false) => self.inner.controller.set_preloading(false),
            AutoPreload::Types(types) => {
                for (index, file) in files.iter().enumerate().filter(|(_, file)| types.contains(&file.carousel_type)) {
                    drop(preloader.preload_file(file, index));
                }
                self.inner.controller.set_preloading(false);
            }
        }
    }

    /// Open the modal at `index`; out of range indices are ignored
    pub fn open(&self, index: usize) {
        if self.is_destroyed() {
            return;
        }
        let files = self.files();
        let Some(file) = files.get(index) else {
            debug!("[Carousel] Ignoring open({}) with {} files", index, files.len());
            return;
        };
        if let Some(callback) = &self.inner.hooks.on_file_click {
            callback(file, index);
        }
        self.inner.controller.open(index, files.clone());
    }

    pub fn close(&self) {
        self.inner.controller.close();
    }

    /// Replace the file list: drops every cached load, rebuilds the strip
    /// and applies the eager loading policy to the new list
    pub fn update_files(&self, files: Vec<FileDescriptor>) {
        if self.is_destroyed() {
            return;
        }
        let files = Arc::new(files);
        self.inner.preloader.cleanup();
        self.inner.preloader.resume();
        *self.inner.files.lock() = files.clone();
        debug!("[Carousel] Files updated, {} files", files.len());

        // The session moves to the new list before any of its loads can report
        self.inner.controller.replace_files(files.clone());
        self.apply_auto_preload(&files);
    }

    /// Full teardown. Safe to call more than once.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let (Some(input), Some(subscription)) = (&self.inner.input, self.inner.input_subscription.lock().take()) {
            input.unsubscribe(&subscription);
        }
        self.inner.controller.close();
        self.inner.preloader.cleanup();
        self.inner.surface.clear();
        if let (Some(registry), Some(id)) = (&self.inner.registry, self.inner.id.lock().take()) {
            registry.unregister(id);
        }
        info!("[Carousel] Destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.inner.controller.is_open()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.inner.controller.current_index()
    }

    pub fn current_file(&self) -> Option<FileDescriptor> {
        self.inner.controller.current_file()
    }

    pub fn files(&self) -> Arc<Vec<FileDescriptor>> {
        self.inner.files.lock().clone()
    }

    pub fn id(&self) -> Option<CarouselId> {
        *self.inner.id.lock()
    }

    pub fn options(&self) -> &CarouselOptions {
        &self.inner.options
    }

    pub fn controller(&self) -> &ModalController {
        &self.inner.controller
    }

    pub fn preloader(&self) -> &Preloader {
        &self.inner.preloader
    }

    pub fn resources(&self) -> Arc<ResourceStore> {
        self.inner.preloader.resources()
    }

    pub fn handle_action(&self, action: Action) {
        if !self.is_destroyed() {
            self.inner.controller.handle_action(action);
        }
    }
}
