//! The display surface the modal draws into.

use std::collections::HashMap;
use std::fmt::Write;

use parking_lot::Mutex;

/// Replaceable part of the modal markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Title,
    Counter,
    Content,
    Thumbnails,
    /// Progress overlay of one thumbnail, keyed by file index
    ThumbnailProgress(usize),
    PreloadToggle,
}

impl Region {
    /// Placeholder the modal markup carries where this region goes
    pub fn marker(&self) -> String {
        match self {
            Region::Title => "<!--region:title-->".to_string(),
            Region::Counter => "<!--region:counter-->".to_string(),
            Region::Content => "<!--region:content-->".to_string(),
            Region::Thumbnails => "<!--region:thumbnails-->".to_string(),
            Region::ThumbnailProgress(index) => format!("<!--region:thumb-progress-{}-->", index),
            Region::PreloadToggle => "<!--region:preload-toggle-->".to_string(),
        }
    }
}

/// Host rendering surface. Calls arrive from the controller and from
/// progress callbacks, so implementations use interior mutability.
pub trait Surface: Send + Sync {
    /// Attach the modal markup. Called once per carousel.
    fn mount(&self, markup: &str);

    fn set_visible(&self, visible: bool);

    fn replace(&self, region: Region, markup: &str);

    /// Mark the active thumbnail and scroll it into view
    fn set_active_thumbnail(&self, index: Option<usize>);

    /// Pause any playing audio or video
    fn pause_media(&self);

    /// Default download action for a file
    fn download(&self, url: &str, name: &str);

    /// Remove everything mounted
    fn clear(&self);
}

#[derive(Default)]
struct MemoryState {
    mounted: Option<String>,
    visible: bool,
    regions: HashMap<Region, String>,
    active_thumbnail: Option<usize>,
    media_pauses: usize,
    downloads: Vec<(String, String)>,
}

/// Surface that keeps everything in memory
#[derive(Default)]
pub struct MemorySurface {
    state: Mutex<MemoryState>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_mounted(&self) -> bool {
        self.state.lock().mounted.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    pub fn region(&self, region: Region) -> Option<String> {
        self.state.lock().regions.get(&region).cloned()
    }

    pub fn active_thumbnail(&self) -> Option<usize> {
        self.state.lock().active_thumbnail
    }

    pub fn media_pauses(&self) -> usize {
        self.state.lock().media_pauses
    }

    /// `(url, name)` of every default download
    pub fn downloads(&self) -> Vec<(String, String)> {
        self.state.lock().downloads.clone()
    }

    /// Standalone HTML page of the current state
    pub fn to_html_document(&self) -> String {
        let state = self.state.lock();
        let mut body = state.mounted.clone().unwrap_or_default();

        // Thumbnails carry the progress markers, so they go in first
        if let Some(thumbs) = state.regions.get(&Region::Thumbnails) {
            body = body.replace(&Region::Thumbnails.marker(), thumbs);
        }
        for (region, markup) in &state.regions {
            if *region != Region::Thumbnails {
                body = body.replace(&region.marker(), markup);
            }
        }
        if let Some(active) = state.active_thumbnail {
            body = body.replace(
                &format!("class=\"carousel-thumb\" data-index=\"{}\"", active),
                &format!("class=\"carousel-thumb active\" data-index=\"{}\"", active),
            );
        }

        let mut out = String::new();
        let _ = write!(
            out,
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n<div class=\"carousel-host{}\">{}</div>\n</body>\n</html>\n",
            state.regions.get(&Region::Title).map(String::as_str).unwrap_or("icy_carousel"),
            STYLE,
            if state.visible { " open" } else { "" },
            body
        );
        out
    }
}

const STYLE: &str = ".carousel-host{display:none}.carousel-host.open{display:block}\
.carousel-thumb.active{outline:2px solid #39f}\
.carousel-table{border-collapse:collapse}.carousel-table td,.carousel-table th{border:1px solid #ccc;padding:2px 6px}\
.carousel-progress-bar{background:#eee;height:6px}.carousel-progress-fill{background:#39f;height:6px}\
.carousel-media,.carousel-pdf{max-width:100%}";

impl Surface for MemorySurface {
    fn mount(&self, markup: &str) {
        self.state.lock().mounted = Some(markup.to_string());
    }

    fn set_visible(&self, visible: bool) {
        self.state.lock().visible = visible;
    }

    fn replace(&self, region: Region, markup: &str) {
        self.state.lock().regions.insert(region, markup.to_string());
    }

    fn set_active_thumbnail(&self, index: Option<usize>) {
        self.state.lock().active_thumbnail = index;
    }

    fn pause_media(&self) {
        self.state.lock().media_pauses += 1;
    }

    fn download(&self, url: &str, name: &str) {
        log::info!("[MemorySurface] Download {} ({})", name, url);
        self.state.lock().downloads.push((url.to_string(), name.to_string()));
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.mounted = None;
        state.visible = false;
        state.regions.clear();
        state.active_thumbnail = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_fills_regions() {
        let surface = MemorySurface::new();
        surface.mount(&format!("<h1>{}</h1><main>{}</main><nav>{}</nav>", Region::Title.marker(), Region::Content.marker(), Region::Thumbnails.marker()));
        surface.replace(Region::Title, "a.png");
        surface.replace(Region::Content, "<img>");
        surface.replace(
            Region::Thumbnails,
            &format!("<div class=\"carousel-thumb\" data-index=\"0\">{}</div>", Region::ThumbnailProgress(0).marker()),
        );
        surface.replace(Region::ThumbnailProgress(0), "<span>40%</span>");
        surface.set_active_thumbnail(Some(0));
        surface.set_visible(true);

        let doc = surface.to_html_document();
        assert!(doc.contains("<title>a.png</title>"));
        assert!(doc.contains("<h1>a.png</h1><main><img></main>"));
        assert!(doc.contains("class=\"carousel-thumb active\" data-index=\"0\"><span>40%</span>"));
        assert!(doc.contains("carousel-host open"));
    }

    #[test]
    fn test_clear() {
        let surface = MemorySurface::new();
        surface.mount("x");
        surface.set_visible(true);
        surface.replace(Region::Counter, "1 / 2");
        surface.clear();
        assert!(!surface.is_mounted());
        assert!(!surface.is_visible());
        assert_eq!(surface.region(Region::Counter), None);
    }
}
