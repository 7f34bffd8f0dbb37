use std::future::Future;
use std::pin::Pin;

use reqwest::Url;
use tracing::debug;

use crate::error::FetchError;

pub const DEFAULT_MAX_BYTES: u64 = 20 * 1024 * 1024;

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, FetchError>> + Send + 'a>>;

/// Boundary to whatever downloads the source image.
pub trait ImageFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a Url) -> FetchFuture<'a>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        if max_bytes > 0 {
            self.max_bytes = max_bytes;
        }
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> FetchFuture<'a> {
        Box::pin(async move {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
            }
            let mut response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|err| FetchError::Transport(err.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            let limit = self.max_bytes;
            if response.content_length().is_some_and(|len| len > limit) {
                return Err(FetchError::TooLarge { limit });
            }

            let mut bytes = Vec::new();
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|err| FetchError::Transport(err.to_string()))?
            {
                if bytes.len() as u64 + chunk.len() as u64 > limit {
                    return Err(FetchError::TooLarge { limit });
                }
                bytes.extend_from_slice(&chunk);
            }
            debug!(url = %url, bytes = bytes.len(), "downloaded image");
            Ok(bytes)
        })
    }
}
