use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared content category of a file. Selects both the fetch decoding mode
/// and the render strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CarouselType {
    Image,
    Video,
    Audio,
    Pdf,
    Excel,
    Csv,
    Text,
    /// Any type tag this engine has no renderer for
    Other(String),
}

impl CarouselType {
    /// All types the renderer knows how to draw
    pub const KNOWN: [CarouselType; 7] = [
        CarouselType::Image,
        CarouselType::Video,
        CarouselType::Audio,
        CarouselType::Pdf,
        CarouselType::Excel,
        CarouselType::Csv,
        CarouselType::Text,
    ];

    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "image" => CarouselType::Image,
            "video" => CarouselType::Video,
            "audio" => CarouselType::Audio,
            "pdf" => CarouselType::Pdf,
            "excel" => CarouselType::Excel,
            "csv" => CarouselType::Csv,
            "text" => CarouselType::Text,
            other => CarouselType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CarouselType::Image => "image",
            CarouselType::Video => "video",
            CarouselType::Audio => "audio",
            CarouselType::Pdf => "pdf",
            CarouselType::Excel => "excel",
            CarouselType::Csv => "csv",
            CarouselType::Text => "text",
            CarouselType::Other(tag) => tag,
        }
    }

    /// How fetched bytes are turned into cached content
    pub fn decode_mode(&self) -> DecodeMode {
        match self {
            CarouselType::Excel => DecodeMode::Buffer,
            CarouselType::Image | CarouselType::Video | CarouselType::Audio | CarouselType::Pdf => DecodeMode::Resource,
            _ => DecodeMode::Text,
        }
    }

    /// Short label shown in thumbnails without a preview image
    pub fn glyph(&self) -> &'static str {
        match self {
            CarouselType::Image => "IMG",
            CarouselType::Video => "VID",
            CarouselType::Audio => "AUD",
            CarouselType::Pdf => "PDF",
            CarouselType::Excel => "XLS",
            CarouselType::Csv => "CSV",
            CarouselType::Text => "TXT",
            CarouselType::Other(_) => "FILE",
        }
    }
}

impl From<String> for CarouselType {
    fn from(value: String) -> Self {
        CarouselType::parse(&value)
    }
}

impl From<&str> for CarouselType {
    fn from(value: &str) -> Self {
        CarouselType::parse(value)
    }
}

impl From<CarouselType> for String {
    fn from(value: CarouselType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CarouselType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decoding applied to a fetched body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Whole buffer kept as raw bytes (spreadsheets)
    Buffer,
    /// Wrapped into a locally-scoped resource handle (media, pdf)
    Resource,
    /// Decoded as UTF-8 text (lossy)
    Text,
}

/// One uploaded file eligible for preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub url: String,
    #[serde(rename = "type", alias = "carousel_type")]
    pub carousel_type: CarouselType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>, carousel_type: impl Into<CarouselType>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            carousel_type: carousel_type.into(),
            thumbnail: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }
}

/// Visible and previewable type sets.
#[derive(Debug, Clone, PartialEq)]
pub struct TypePolicy {
    pub visible: Vec<CarouselType>,
    pub previewable: Vec<CarouselType>,
}

impl TypePolicy {
    pub fn new(visible: Vec<CarouselType>, previewable: Vec<CarouselType>) -> Self {
        Self { visible, previewable }
    }

    pub fn is_visible(&self, carousel_type: &CarouselType) -> bool {
        self.visible.contains(carousel_type)
    }

    pub fn is_previewable(&self, carousel_type: &CarouselType) -> bool {
        self.previewable.contains(carousel_type)
    }

    /// Only files that are both shown and renderable are ever fetched
    pub fn can_preload(&self, carousel_type: &CarouselType) -> bool {
        self.is_visible(carousel_type) && self.is_previewable(carousel_type)
    }
}

impl Default for TypePolicy {
    fn default() -> Self {
        Self::new(CarouselType::KNOWN.to_vec(), CarouselType::KNOWN.to_vec())
    }
}
