use async_trait::async_trait;

use crate::PreviewError;

/// Streaming body of a fetched resource
#[async_trait]
pub trait FetchBody: Send {
    /// Declared total size in bytes, if the server sent one
    fn content_length(&self) -> Option<u64>;

    fn content_type(&self) -> Option<String> {
        None
    }

    /// Next chunk of the body, `None` once the body is complete
    async fn chunk(&mut self) -> Result<Option<Vec<u8>>, PreviewError>;
}

/// Source of file content (GET by URL)
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn FetchBody>, PreviewError>;
}

/// Fetcher backed by a shared reqwest client
#[derive(Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn open(&self, url: &str) -> Result<Box<dyn FetchBody>, PreviewError> {
        let response = self.client.get(url).send().await.map_err(|err| {
            log::debug!("[HttpFetcher] Connection error for {}: {}", url, err);
            PreviewError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(PreviewError::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(Box::new(HttpBody {
            url: url.to_string(),
            response,
        }))
    }
}

struct HttpBody {
    url: String,
    response: reqwest::Response,
}

#[async_trait]
impl FetchBody for HttpBody {
    fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    fn content_type(&self) -> Option<String> {
        self.response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
    }

    async fn chunk(&mut self) -> Result<Option<Vec<u8>>, PreviewError> {
        match self.response.chunk().await {
            Ok(chunk) => Ok(chunk.map(|bytes| bytes.to_vec())),
            Err(err) => Err(PreviewError::Network {
                url: self.url.clone(),
                message: format!("Failed to read response: {}", err),
            }),
        }
    }
}
