#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::too_many_lines, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

mod export;
mod local;
mod manifest;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming};
use icy_carousel::{AutoPreload, Carousel, CarouselContext, CarouselHooks, Emitter, Hotkey, KeyEvent, MemorySurface};
use semver::Version;

use crate::local::ManifestFetcher;
use crate::manifest::Manifest;

lazy_static::lazy_static! {
    pub static ref VERSION: Version = Version::parse(env!("CARGO_PKG_VERSION")).unwrap();
}

/// Poll interval while waiting for the current preview
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Parser, Debug)]
#[command(version, about = "Render a file carousel preview to HTML", long_about = None)]
pub struct Args {
    /// Manifest with [options] and [[files]]
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,

    /// File to open in the modal
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Preload every file regardless of the manifest options
    #[arg(long, default_value_t = false)]
    preload_all: bool,

    /// Key presses replayed after opening, e.g. "ArrowRight,Enter"
    #[arg(long, value_delimiter = ',')]
    keys: Vec<String>,

    /// Seconds to wait for a preview to finish loading
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Write the page here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn get_log_dir() -> Option<PathBuf> {
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "GitHub", "icy_carousel") {
        let dir = proj_dirs.config_dir().to_path_buf();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).ok()?;
        }
        return Some(dir);
    }
    None
}

fn start_logger() -> anyhow::Result<Option<LoggerHandle>> {
    let Some(log_dir) = get_log_dir() else {
        eprintln!("Failed to create log file");
        return Ok(None);
    };
    let handle = Logger::try_with_env_or_str("info, reqwest=warn, hyper=warn, i18n_embed=error")?
        .log_to_file(FileSpec::default().directory(&log_dir).basename("icy_carousel").suffix("log").suppress_timestamp())
        .rotate(Criterion::Size(64 * 1024), Naming::Numbers, Cleanup::KeepLogFiles(3))
        .create_symlink(log_dir.join("icy_carousel.log"))
        .duplicate_to_stderr(flexi_logger::Duplicate::Warn)
        .start()?;
    Ok(Some(handle))
}

/// Wait until the file shown in the modal is no longer loading
async fn wait_for_current(carousel: &Carousel, timeout: Duration) {
    let wait = async {
        loop {
            let Some(index) = carousel.current_index() else {
                return;
            };
            if !carousel.preloader().is_loading(index) {
                return;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };
    if tokio::time::timeout(timeout, wait).await.is_err() {
        log::warn!("Preview did not finish within {} s", timeout.as_secs());
    }
    // The final progress notification re-renders right after the load is marked done
    tokio::time::sleep(POLL_INTERVAL).await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _logger = start_logger()?;
    log::info!("Starting icy_carousel_view {}", *VERSION);

    let mut manifest = Manifest::load(&args.manifest).with_context(|| format!("loading {}", args.manifest.display()))?;
    if args.preload_all {
        manifest.options.auto_preload = AutoPreload::Flag(true);
    }
    if args.index >= manifest.files.len() {
        bail!("index {} out of range, manifest has {} files", args.index, manifest.files.len());
    }
    let keys = args
        .keys
        .iter()
        .map(|text| Hotkey::parse(text).map(|hk| KeyEvent::new(hk.key, hk.modifiers)).with_context(|| format!("invalid key '{}'", text)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let base_dir = args.manifest.parent().map(PathBuf::from).unwrap_or_default();
    let surface = Arc::new(MemorySurface::new());
    let input = Arc::new(Emitter::new());
    let context = CarouselContext::new(tokio::runtime::Handle::current(), surface.clone(), Arc::new(ManifestFetcher::new(base_dir))).with_input(input.clone());
    let hooks = CarouselHooks::default().on_file_click(|file, index| log::info!("Opening #{} {}", index, file.name));
    let carousel = Carousel::new(context, manifest.files, manifest.options, hooks);

    let timeout = Duration::from_secs(args.timeout);
    carousel.open(args.index);
    wait_for_current(&carousel, timeout).await;
    for key in &keys {
        input.emit(key);
        wait_for_current(&carousel, timeout).await;
    }

    let html = export::inline_resources(&surface.to_html_document(), &carousel.resources());
    match &args.output {
        Some(path) => {
            std::fs::write(path, html).with_context(|| format!("writing {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => print!("{}", html),
    }
    for (url, name) in surface.downloads() {
        log::info!("Download requested: {} ({})", name, url);
    }

    carousel.destroy();
    log::info!("Shutting down.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let args = Args::parse_from(["icy_carousel_view", "files.toml", "--index", "2", "--keys", "ArrowRight,Enter", "-o", "out.html"]);
        assert_eq!(args.index, 2);
        assert_eq!(args.keys, vec!["ArrowRight", "Enter"]);
        assert_eq!(args.output, Some(PathBuf::from("out.html")));
        assert!(!args.preload_all);
        assert_eq!(args.timeout, 30);
    }
}
