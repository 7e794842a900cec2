use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CarouselError;
use crate::file::{CarouselType, FileDescriptor, TypePolicy};

/// Delay before re-rendering after a sweep was stopped
const DEFAULT_SETTLE_DELAY_MS: u64 = 100;

/// Which files are fetched without user action
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AutoPreload {
    /// `true` sweeps every eligible file, `false` loads nothing eagerly
    Flag(bool),
    /// Only files of the listed types are loaded eagerly
    Types(Vec<CarouselType>),
}

impl AutoPreload {
    /// Whether files of this type are designated for eager loading
    pub fn includes(&self, carousel_type: &CarouselType) -> bool {
        match self {
            AutoPreload::Flag(enabled) => *enabled,
            AutoPreload::Types(types) => types.contains(carousel_type),
        }
    }
}

impl Default for AutoPreload {
    fn default() -> Self {
        AutoPreload::Flag(true)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CarouselOptions {
    pub auto_preload: AutoPreload,
    pub enable_manual_loading: bool,
    pub show_download_button: bool,
    pub visible_types: Vec<CarouselType>,
    pub previewable_types: Vec<CarouselType>,
    /// Table rows shown for csv/excel, header included
    pub max_preview_rows: usize,
    pub max_text_preview_chars: usize,
    pub settle_delay_ms: u64,
}

impl Default for CarouselOptions {
    fn default() -> Self {
        Self {
            auto_preload: AutoPreload::default(),
            enable_manual_loading: true,
            show_download_button: true,
            visible_types: CarouselType::KNOWN.to_vec(),
            previewable_types: CarouselType::KNOWN.to_vec(),
            max_preview_rows: 100,
            max_text_preview_chars: 50_000,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

impl CarouselOptions {
    pub fn from_toml_str(text: &str) -> Result<Self, CarouselError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CarouselError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| CarouselError::ReadFile {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn type_policy(&self) -> TypePolicy {
        TypePolicy::new(self.visible_types.clone(), self.previewable_types.clone())
    }

    pub fn is_auto_preload(&self, file: &FileDescriptor) -> bool {
        self.auto_preload.includes(&file.carousel_type)
    }
}

/// Callback receiving the file and its index in the list
pub type FileCallback = Arc<dyn Fn(&FileDescriptor, usize) + Send + Sync>;

/// Host callbacks, kept apart from the serializable options
#[derive(Clone, Default)]
pub struct CarouselHooks {
    pub on_file_click: Option<FileCallback>,
    /// Replaces the default surface download when set
    pub on_file_download: Option<FileCallback>,
}

impl CarouselHooks {
    pub fn on_file_click(mut self, callback: impl Fn(&FileDescriptor, usize) + Send + Sync + 'static) -> Self {
        self.on_file_click = Some(Arc::new(callback));
        self
    }

    pub fn on_file_download(mut self, callback: impl Fn(&FileDescriptor, usize) + Send + Sync + 'static) -> Self {
        self.on_file_download = Some(Arc::new(callback));
        self
    }
}
