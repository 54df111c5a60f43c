use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;

use crate::media::domain::image_source::{FetchError, FetchedImage, ImageSource};

/// Fetches images over HTTP(S) with `reqwest`'s blocking client.
///
/// The client is built once and reused. It must not be created or dropped
/// inside async context; the service only calls it from blocking threads.
pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("moosificator/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &Url) -> Result<FetchedImage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| http_err(url, e))?;
        let response = check_status(url, response)?;
        let content_type = header_content_type(&response);
        let bytes = response.bytes().map_err(|e| http_err(url, e))?;
        log::debug!("Fetched {} bytes from {url}", bytes.len());
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }

    fn probe_content_type(&self, url: &Url) -> Result<Option<String>, FetchError> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .map_err(|e| http_err(url, e))?;
        let response = check_status(url, response)?;
        Ok(header_content_type(&response))
    }
}

fn http_err(url: &Url, source: reqwest::Error) -> FetchError {
    FetchError::Http {
        url: url.clone(),
        source,
    }
}

fn check_status(url: &Url, response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(FetchError::Status {
            url: url.clone(),
            status: status.as_u16(),
        })
    }
}

fn header_content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    /// A loopback URL nothing is listening on.
    fn closed_port_url() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Url::parse(&format!("http://127.0.0.1:{port}/face.png")).unwrap()
    }

    #[test]
    fn test_refused_connection_is_http_error() {
        let source = HttpImageSource::new(Duration::from_secs(2)).unwrap();
        let url = closed_port_url();
        assert!(matches!(source.fetch(&url), Err(FetchError::Http { .. })));
        assert!(matches!(
            source.probe_content_type(&url),
            Err(FetchError::Http { .. })
        ));
    }
}
