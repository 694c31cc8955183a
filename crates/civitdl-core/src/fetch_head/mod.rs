//! Response metadata probing for download URLs.
//!
//! Determines the total size of a download before chunking it, and captures
//! `Content-Disposition` for the file name. Uses GET rather than HEAD since
//! the catalog's download endpoints redirect to storage that may refuse HEAD;
//! the body is abandoned as soon as the headers are in.

mod parse;

use std::str;
use std::time::Duration;

use crate::downloader::CurlOptions;
use crate::error::FetchError;

/// Range used to coax a `Content-Range` total out of servers that omit
/// `Content-Length` on a plain GET.
const OVERSIZED_RANGE: &str = "0-999999999";
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Headers of interest from one probe response.
#[derive(Debug, Clone, Default)]
pub struct ProbeResult {
    /// Final HTTP status after redirects.
    pub status: u32,
    /// `Content-Length`, if present.
    pub content_length: Option<u64>,
    /// Total from `Content-Range: bytes a-b/TOTAL`, if present.
    pub content_range_total: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// `Content-Disposition` value (filename hint).
    pub content_disposition: Option<String>,
}

/// Outcome of size determination.
#[derive(Debug, Clone)]
pub struct SizeProbe {
    pub total_size: u64,
    pub content_disposition: Option<String>,
}

/// Issues a GET (optionally ranged) and returns the parsed response headers.
/// The transfer is cut off at the first body byte.
pub fn probe(url: &str, range: Option<&str>, curl: CurlOptions) -> Result<ProbeResult, curl::Error> {
    let mut lines: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(curl.connect_timeout)?;
    easy.timeout(PROBE_TIMEOUT)?;
    if let Some(r) = range {
        easy.range(r)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                lines.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.write_function(|_| Ok(0))?;
        match transfer.perform() {
            Ok(()) => {}
            Err(e) if e.is_write_error() => {}
            Err(e) => return Err(e),
        }
    }

    let status = easy.response_code()?;
    Ok(parse::parse_headers(status, &lines))
}

/// Determines the total size of `url`.
///
/// Tries `Content-Length` on a plain GET, then the total of a `Content-Range`
/// answer to an oversized range request, then `known_size` (e.g. from the
/// catalog's `sizeKB`). Fails with `UnknownSize` when all three come up empty,
/// and with `RemoteUnavailable` when the plain GET gets a non-2xx answer.
pub fn determine_total_size(
    url: &str,
    known_size: Option<u64>,
    curl: CurlOptions,
) -> Result<SizeProbe, FetchError> {
    let mut content_disposition = None;

    match probe(url, None, curl) {
        Ok(r) if !(200..300).contains(&r.status) => {
            return Err(FetchError::RemoteUnavailable {
                url: url.to_string(),
                status: r.status,
            });
        }
        Ok(r) => {
            content_disposition = r.content_disposition;
            if let Some(n) = r.content_length {
                tracing::debug!(url, total = n, "size from Content-Length");
                return Ok(SizeProbe {
                    total_size: n,
                    content_disposition,
                });
            }
        }
        Err(e) => tracing::warn!(url, "size probe GET failed: {}", e),
    }

    match probe(url, Some(OVERSIZED_RANGE), curl) {
        Ok(r) => {
            if content_disposition.is_none() {
                content_disposition = r.content_disposition;
            }
            if let Some(n) = r.content_range_total {
                tracing::debug!(url, total = n, "size from Content-Range");
                return Ok(SizeProbe {
                    total_size: n,
                    content_disposition,
                });
            }
        }
        Err(e) => tracing::warn!(url, "range size probe failed: {}", e),
    }

    match known_size.filter(|n| *n > 0) {
        Some(n) => {
            tracing::debug!(url, total = n, "size from catalog metadata");
            Ok(SizeProbe {
                total_size: n,
                content_disposition,
            })
        }
        None => Err(FetchError::UnknownSize {
            url: url.to_string(),
        }),
    }
}
