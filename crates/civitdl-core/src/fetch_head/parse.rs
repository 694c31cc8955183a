//! Parse HTTP response header lines into a ProbeResult.

use super::ProbeResult;

/// Parse collected header lines. When redirects were followed the lines hold
/// several responses; only the last block (after the last status line) counts.
pub(crate) fn parse_headers(status: u32, lines: &[String]) -> ProbeResult {
    let mut out = ProbeResult {
        status,
        ..ProbeResult::default()
    };

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            out = ProbeResult {
                status,
                ..ProbeResult::default()
            };
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    out.content_length = Some(n);
                }
            }
            if name.eq_ignore_ascii_case("content-range") {
                out.content_range_total = parse_content_range_total(value);
            }
            if name.eq_ignore_ascii_case("accept-ranges") {
                out.accept_ranges = value.eq_ignore_ascii_case("bytes");
            }
            if name.eq_ignore_ascii_case("content-disposition") {
                out.content_disposition = Some(value.to_string());
            }
        }
    }

    out
}

/// Total length from a `Content-Range` value: `bytes 0-999/4000` or
/// `bytes */4000` give 4000; an unknown total (`/*`) gives None.
pub(crate) fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse::<u64>().ok()
}
