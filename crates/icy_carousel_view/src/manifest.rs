use std::path::Path;

use icy_carousel::{CarouselError, CarouselOptions, FileDescriptor};
use serde::Deserialize;

/// Carousel description read from TOML:
///
/// ```toml
/// [options]
/// auto_preload = ["image"]
///
/// [[files]]
/// name = "cat.png"
/// url = "images/cat.png"
/// type = "image"
/// ```
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Manifest {
    pub options: CarouselOptions,
    pub files: Vec<FileDescriptor>,
}

impl Manifest {
    pub fn from_toml_str(text: &str) -> Result<Self, CarouselError> {
        let manifest: Manifest = toml::from_str(text)?;
        if manifest.files.is_empty() {
            return Err(CarouselError::Manifest("no [[files]] entries".to_string()));
        }
        if let Some(file) = manifest.files.iter().find(|file| file.url.trim().is_empty()) {
            return Err(CarouselError::Manifest(format!("file '{}' has an empty url", file.name)));
        }
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self, CarouselError> {
        let text = std::fs::read_to_string(path).map_err(|err| CarouselError::ReadFile {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_toml_str(&text)
    }
}
