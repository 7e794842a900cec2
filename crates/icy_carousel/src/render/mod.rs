//! Turns the preload state of one file into preview markup.

use std::sync::Arc;

use i18n_embed_fl::fl;

use crate::content::PreviewContent;
use crate::file::{CarouselType, FileDescriptor};
use crate::options::CarouselOptions;
use crate::preloader::{PROGRESS_DONE, Preloader};
use crate::LANGUAGE_LOADER;

pub mod markup;
pub mod table;

pub use table::{TablePreview, parse_csv, parse_spreadsheet, split_csv_line};

use markup::{action_button, escape, paragraph};

/// Action reported by the load button of the manual-loading prompt
pub const LOAD_PREVIEW_ACTION: &str = "load-preview";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Unsupported,
    Progress(u8),
    /// Manual loading prompt with a "Load Preview" button
    LoadPrompt,
    /// Manual loading disabled, nothing fetched yet
    NotLoaded,
    Content,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    pub kind: ViewKind,
    pub markup: String,
}

impl RenderedView {
    fn new(kind: ViewKind, markup: String) -> Self {
        Self { kind, markup }
    }
}

#[derive(Clone)]
pub struct Renderer {
    preloader: Preloader,
    options: Arc<CarouselOptions>,
}

impl Renderer {
    pub fn new(preloader: Preloader, options: Arc<CarouselOptions>) -> Self {
        Self { preloader, options }
    }

    pub fn options(&self) -> &CarouselOptions {
        &self.options
    }

    /// Render the preview area for `file` at `index`.
    ///
    /// A file designated for eager loading that has not started yet is
    /// requested here and shown as in progress.
    pub fn render(&self, file: &FileDescriptor, index: usize) -> RenderedView {
        if !self.preloader.policy().can_preload(&file.carousel_type) {
            return self.unsupported_view();
        }

        let snapshot = self.preloader.snapshot(index);
        if snapshot.progress == PROGRESS_DONE {
            return match snapshot.content {
                Some(content) if !snapshot.failed => self.content_view(file, &content),
                _ => failed_view(),
            };
        }
        if snapshot.loading || snapshot.progress > 0 {
            return progress_view(snapshot.progress);
        }

        if self.options.is_auto_preload(file) && !self.preloader.is_paused() {
            log::debug!("[Renderer] Starting designated load for #{} {}", index, file.name);
            drop(self.preloader.preload_file(file, index));
            return progress_view(self.preloader.progress(index));
        }

        if self.options.enable_manual_loading {
            load_prompt_view(index)
        } else {
            RenderedView::new(
                ViewKind::NotLoaded,
                paragraph("carousel-not-loaded", &fl!(LANGUAGE_LOADER, "preview-not-loaded")),
            )
        }
    }

    fn unsupported_view(&self) -> RenderedView {
        let message = if self.options.enable_manual_loading {
            fl!(LANGUAGE_LOADER, "preview-unsupported-manual")
        } else {
            fl!(LANGUAGE_LOADER, "preview-unsupported")
        };
        RenderedView::new(
            ViewKind::Unsupported,
            format!("<div class=\"carousel-unsupported\">{}</div>", paragraph("carousel-message", &message)),
        )
    }

    fn content_view(&self, file: &FileDescriptor, content: &PreviewContent) -> RenderedView {
        let markup = match (&file.carousel_type, content) {
            (CarouselType::Image, PreviewContent::Resource(handle)) => format!(
                "<img class=\"carousel-media carousel-image\" src=\"{}\" alt=\"{}\">",
                escape(handle.url()),
                escape(&file.name)
            ),
            (CarouselType::Video, PreviewContent::Resource(handle)) => format!(
                "<video class=\"carousel-media carousel-video\" src=\"{}\" controls preload=\"metadata\">{}</video>",
                escape(handle.url()),
                escape(&fl!(LANGUAGE_LOADER, "preview-media-fallback"))
            ),
            (CarouselType::Audio, PreviewContent::Resource(handle)) => format!(
                "<audio class=\"carousel-media carousel-audio\" src=\"{}\" controls>{}</audio>",
                escape(handle.url()),
                escape(&fl!(LANGUAGE_LOADER, "preview-media-fallback"))
            ),
            (CarouselType::Pdf, PreviewContent::Resource(handle)) => format!(
                "<iframe class=\"carousel-pdf\" src=\"{}\" title=\"{}\"></iframe>",
                escape(handle.url()),
                escape(&file.name)
            ),
            (CarouselType::Text, PreviewContent::Text(text)) => text_markup(text, self.options.max_text_preview_chars),
            (CarouselType::Csv, PreviewContent::Text(text)) => parse_csv(text, self.options.max_preview_rows).to_markup(),
            (CarouselType::Excel, PreviewContent::Buffer(data)) => table::spreadsheet_markup(data, self.options.max_preview_rows),
            (carousel_type, _) => {
                log::warn!("[Renderer] No view for {} content of {}", carousel_type, file.name);
                return failed_view();
            }
        };
        RenderedView::new(ViewKind::Content, format!("<div class=\"carousel-preview\">{}</div>", markup))
    }
}

pub fn progress_view(progress: u8) -> RenderedView {
    let label = fl!(LANGUAGE_LOADER, "preview-progress", progress = progress);
    let markup = format!(
        "<div class=\"carousel-progress\" data-progress=\"{progress}\">\
<div class=\"carousel-spinner\"></div>\
<div class=\"carousel-progress-label\">{}</div>\
<div class=\"carousel-progress-bar\"><div class=\"carousel-progress-fill\" style=\"width: {progress}%\"></div></div>\
{}</div>",
        escape(&label),
        paragraph("carousel-progress-text", &fl!(LANGUAGE_LOADER, "preview-loading")),
    );
    RenderedView::new(ViewKind::Progress(progress), markup)
}

fn load_prompt_view(index: usize) -> RenderedView {
    RenderedView::new(
        ViewKind::LoadPrompt,
        format!(
            "<div class=\"carousel-load-prompt\">{}{}</div>",
            paragraph("carousel-message", &fl!(LANGUAGE_LOADER, "preview-load-prompt")),
            action_button("carousel-load-button", LOAD_PREVIEW_ACTION, Some(index), &fl!(LANGUAGE_LOADER, "preview-load-button"))
        ),
    )
}

pub fn failed_view() -> RenderedView {
    RenderedView::new(
        ViewKind::Failed,
        format!(
            "<div class=\"carousel-failed\">{}{}</div>",
            paragraph("carousel-error", &fl!(LANGUAGE_LOADER, "preview-failed")),
            paragraph("carousel-hint", &fl!(LANGUAGE_LOADER, "preview-failed-hint"))
        ),
    )
}

fn text_markup(text: &str, limit: usize) -> String {
    let (shown, truncated) = match text.char_indices().nth(limit) {
        Some((offset, _)) => (&text[..offset], true),
        None => (text, false),
    };
    let mut out = format!("<pre class=\"carousel-text\">{}</pre>", escape(shown));
    if truncated {
        out.push_str(&paragraph(
            "carousel-truncated",
            &fl!(LANGUAGE_LOADER, "preview-text-truncated", limit = limit),
        ));
    }
    out
}
