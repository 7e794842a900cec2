//! Preload and preview engine for file upload carousels.
//!
//! [`Preloader`] fetches and caches file content and reports progress,
//! [`Renderer`] turns that state into preview markup and [`ModalController`]
//! drives the modal on a host [`Surface`]. [`Carousel`] ties them together.

mod carousel;
mod content;
pub mod controller;
mod emitter;
mod error;
pub mod fetch;
mod file;
pub mod keys;
mod options;
pub mod preloader;
mod registry;
pub mod render;
mod resource;
pub mod surface;

#[cfg(test)]
mod test_util;

pub use carousel::{Carousel, CarouselContext};
pub use content::PreviewContent;
pub use controller::{Action, ModalController};
pub use emitter::{Emitter, Subscription};
pub use error::{CarouselError, PreviewError, Result};
pub use fetch::{FetchBody, Fetcher, HttpFetcher};
pub use file::{CarouselType, DecodeMode, FileDescriptor, TypePolicy};
pub use keys::{CarouselCommand, Hotkey, Key, KeyEvent, KeyMap, Modifiers};
pub use options::{AutoPreload, CarouselHooks, CarouselOptions, FileCallback};
pub use preloader::{PreloadResult, PreloadSnapshot, Preloader, ProgressEvent, PROGRESS_DONE};
pub use registry::{CarouselId, CarouselRegistry};
pub use render::{RenderedView, Renderer, TablePreview, ViewKind};
pub use resource::{Resource, ResourceHandle, ResourceStore, RESOURCE_URL_PREFIX};
pub use surface::{MemorySurface, Region, Surface};

use i18n_embed::{
    DesktopLanguageRequester,
    fluent::{FluentLanguageLoader, fluent_language_loader},
};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "i18n"] // path to the compiled localization resources
struct Localizations;

use once_cell::sync::Lazy;
pub static LANGUAGE_LOADER: Lazy<FluentLanguageLoader> = Lazy::new(|| {
    let loader = fluent_language_loader!();
    let requested_languages = DesktopLanguageRequester::requested_languages();
    let _result = i18n_embed::select(&loader, &Localizations, &requested_languages);
    // Markup is plain text, no bidi isolation marks around arguments
    loader.set_use_isolating(false);
    loader
});
