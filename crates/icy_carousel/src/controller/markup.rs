//! Modal chrome and thumbnail strip markup.

use std::fmt::Write;

use i18n_embed_fl::fl;

use super::action::{ACTION_CLOSE, ACTION_DOWNLOAD, ACTION_NEXT, ACTION_PREV, ACTION_SELECT, ACTION_TOGGLE_PRELOAD};
use crate::file::{FileDescriptor, TypePolicy};
use crate::render::markup::{action_button, escape};
use crate::surface::Region;
use crate::LANGUAGE_LOADER;

/// Modal skeleton with one placeholder per [`Region`]
pub fn modal_markup(show_download_button: bool) -> String {
    let mut out = String::from("<div class=\"carousel-modal\" role=\"dialog\" aria-modal=\"true\">");
    let _ = write!(
        out,
        "<div class=\"carousel-header\"><span class=\"carousel-title\">{}</span><span class=\"carousel-counter\">{}</span><div class=\"carousel-tools\">{}",
        Region::Title.marker(),
        Region::Counter.marker(),
        Region::PreloadToggle.marker()
    );
    if show_download_button {
        out.push_str(&action_button("carousel-download", ACTION_DOWNLOAD, None, &fl!(LANGUAGE_LOADER, "carousel-download")));
    }
    out.push_str(&action_button("carousel-close", ACTION_CLOSE, None, &fl!(LANGUAGE_LOADER, "carousel-close")));
    out.push_str("</div></div><div class=\"carousel-body\">");
    out.push_str(&action_button("carousel-prev", ACTION_PREV, None, &fl!(LANGUAGE_LOADER, "carousel-prev")));
    let _ = write!(out, "<div class=\"carousel-content\">{}</div>", Region::Content.marker());
    out.push_str(&action_button("carousel-next", ACTION_NEXT, None, &fl!(LANGUAGE_LOADER, "carousel-next")));
    let _ = write!(out, "</div><div class=\"carousel-thumbs\">{}</div></div>", Region::Thumbnails.marker());
    out
}

pub fn counter_markup(index: usize, total: usize) -> String {
    let current = index + 1;
    escape(&fl!(LANGUAGE_LOADER, "carousel-counter", current = current, total = total))
}

pub fn preload_toggle_markup(is_preloading: bool) -> String {
    let label = if is_preloading {
        fl!(LANGUAGE_LOADER, "carousel-preload-stop")
    } else {
        fl!(LANGUAGE_LOADER, "carousel-preload-start")
    };
    action_button("carousel-preload-toggle", ACTION_TOGGLE_PRELOAD, None, &label)
}

/// Indices of the files shown in the strip
pub fn strip_indices(files: &[FileDescriptor], policy: &TypePolicy) -> Vec<usize> {
    files
        .iter()
        .enumerate()
        .filter(|(_, file)| policy.is_visible(&file.carousel_type))
        .map(|(index, _)| index)
        .collect()
}

pub fn thumbnails_markup(files: &[FileDescriptor], indices: &[usize]) -> String {
    let mut out = String::new();
    for &index in indices {
        let Some(file) = files.get(index) else {
            continue;
        };
        let _ = write!(
            out,
            "<button type=\"button\" class=\"carousel-thumb\" data-index=\"{}\" data-action=\"{}\" title=\"{}\">",
            index,
            ACTION_SELECT,
            escape(&file.name)
        );
        match &file.thumbnail {
            Some(thumbnail) => {
                let _ = write!(out, "<img src=\"{}\" alt=\"\">", escape(thumbnail));
            }
            None => {
                let _ = write!(out, "<span class=\"carousel-glyph\">{}</span>", file.carousel_type.glyph());
            }
        }
        out.push_str(&Region::ThumbnailProgress(index).marker());
        out.push_str("</button>");
    }
    out
}

/// Circular overlay while a load is under way, nothing otherwise
pub fn thumbnail_progress_markup(progress: u8) -> String {
    if progress == 0 || progress >= 100 {
        return String::new();
    }
    format!(
        "<div class=\"carousel-thumb-progress\" data-progress=\"{p}\"><svg viewBox=\"0 0 36 36\">\
<circle class=\"track\" cx=\"18\" cy=\"18\" r=\"15.9155\" fill=\"none\"/>\
<circle class=\"fill\" cx=\"18\" cy=\"18\" r=\"15.9155\" fill=\"none\" stroke-dasharray=\"{p} 100\"/></svg></div>",
        p = progress
    )
}
