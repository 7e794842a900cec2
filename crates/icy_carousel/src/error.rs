//! Error types for icy_carousel

use std::path::PathBuf;
use thiserror::Error;

/// Rejection reason of a preload. Cloneable because every caller awaiting the
/// same in-flight fetch receives its own copy of the outcome.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PreviewError {
    #[error("Connection error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Preload task failed: {0}")]
    Task(String),
}

/// Errors raised while loading configuration, manifests or key maps
#[derive(Debug, Error)]
pub enum CarouselError {
    #[error("Failed to read '{path}': {message}")]
    ReadFile { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid manifest: {0}")]
    Manifest(String),
}

pub type Result<T> = std::result::Result<T, CarouselError>;
