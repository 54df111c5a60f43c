use bytes::Bytes;
pub use reqwest::Url;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: Url, status: u16 },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("no image registered for {0}")]
    NotFound(Url),
}

/// Raw image bytes as served, plus the declared content type if any.
#[derive(Clone, Debug)]
pub struct FetchedImage {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Resolves image URLs to encoded bytes.
///
/// Calls block; the service runs them on the blocking pool.
pub trait ImageSource: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<FetchedImage, FetchError>;

    /// Content type announced for `url` without downloading the body.
    fn probe_content_type(&self, url: &Url) -> Result<Option<String>, FetchError>;
}

/// Strips parameters and normalises case: `Image/GIF; x=y` -> `image/gif`.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
