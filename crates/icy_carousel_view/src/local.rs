use std::path::{Path, PathBuf};

use async_trait::async_trait;
use icy_carousel::{FetchBody, Fetcher, HttpFetcher, PreviewError};
use tokio::io::AsyncReadExt;

const READ_CHUNK: usize = 64 * 1024;

/// Fetches `http(s)://` URLs over the network and everything else from disk,
/// relative to the manifest directory
pub struct ManifestFetcher {
    base_dir: PathBuf,
    http: HttpFetcher,
}

impl ManifestFetcher {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            http: HttpFetcher::new(),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        if path.is_absolute() { path.to_path_buf() } else { self.base_dir.join(path) }
    }
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Content type guessed from the file extension
pub fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime)
}

#[async_trait]
impl Fetcher for ManifestFetcher {
    async fn open(&self, url: &str) -> Result<Box<dyn FetchBody>, PreviewError> {
        if is_remote(url) {
            return self.http.open(url).await;
        }

        let path = self.resolve(url);
        let io_error = |err: std::io::Error| PreviewError::Network {
            url: url.to_string(),
            message: err.to_string(),
        };
        let file = tokio::fs::File::open(&path).await.map_err(io_error)?;
        let length = file.metadata().await.map_err(io_error)?.len();
        log::debug!("[ManifestFetcher] Reading {} ({} bytes)", path.display(), length);

        Ok(Box::new(LocalBody {
            url: url.to_string(),
            content_type: mime_for(&path),
            length,
            file,
        }))
    }
}

struct LocalBody {
    url: String,
    content_type: Option<&'static str>,
    length: u64,
    file: tokio::fs::File,
}

#[async_trait]
impl FetchBody for LocalBody {
    fn content_length(&self) -> Option<u64> {
        Some(self.length)
    }

    fn content_type(&self) -> Option<String> {
        self.content_type.map(str::to_string)
    }

    async fn chunk(&mut self) -> Result<Option<Vec<u8>>, PreviewError> {
        let mut buffer = vec![0; READ_CHUNK];
        let read = self.file.read(&mut buffer).await.map_err(|err| PreviewError::Network {
            url: self.url.clone(),
            message: err.to_string(),
        })?;
        if read == 0 {
            return Ok(None);
        }
        buffer.truncate(read);
        Ok(Some(buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_to_manifest() {
        let fetcher = ManifestFetcher::new("/data/upload");
        assert_eq!(fetcher.resolve("a/cat.png"), PathBuf::from("/data/upload/a/cat.png"));
        assert_eq!(fetcher.resolve("file:///tmp/x.txt"), PathBuf::from("/tmp/x.txt"));
        assert!(is_remote("https://example.com/a.png"));
        assert!(!is_remote("a.png"));
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(mime_for(Path::new("notes.txt")), None);
        assert_eq!(mime_for(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn test_reads_local_file_in_chunks() {
        let dir = std::env::temp_dir().join(format!("icy_carousel_view_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("notes.txt"), vec![b'a'; READ_CHUNK + 10]).unwrap();

        let fetcher = ManifestFetcher::new(&dir);
        let mut body = fetcher.open("notes.txt").await.unwrap();
        assert_eq!(body.content_length(), Some(READ_CHUNK as u64 + 10));
        let mut total = 0;
        while let Some(chunk) = body.chunk().await.unwrap() {
            total += chunk.len();
        }
        assert_eq!(total, READ_CHUNK + 10);

        assert!(matches!(fetcher.open("missing.txt").await, Err(PreviewError::Network { .. })));
        std::fs::remove_dir_all(&dir).ok();
    }
}
