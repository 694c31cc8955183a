//! Blocking GET transport for catalog requests.

use std::time::Duration;

use crate::downloader::CurlOptions;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("civitdl/", env!("CARGO_PKG_VERSION"));

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u32,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues one GET. `Err` is a transport failure; any HTTP status is `Ok`.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, curl::Error>;
}

/// libcurl-backed transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlTransport {
    curl: CurlOptions,
}

impl CurlTransport {
    pub fn new(curl: CurlOptions) -> Self {
        Self { curl }
    }
}

impl Transport for CurlTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, curl::Error> {
        let mut body = Vec::new();
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.useragent(USER_AGENT)?;
        easy.connect_timeout(self.curl.connect_timeout)?;
        easy.timeout(REQUEST_TIMEOUT)?;

        let mut headers = curl::easy::List::new();
        headers.append("Accept: application/json")?;
        easy.http_headers(headers)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        Ok(HttpResponse { status, body })
    }
}
