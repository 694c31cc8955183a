//! Local file names for downloads.
//!
//! Catalog names are used as-is when safe; otherwise the name comes from the
//! download response's `Content-Disposition`, then the URL's last path
//! segment, then `download.bin`.

mod disposition;

pub use disposition::disposition_file_name;

const FALLBACK_NAME: &str = "download.bin";
const NAME_MAX: usize = 255;

/// Last non-empty path segment of `url`, percent-decoded.
pub fn url_file_name(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = disposition::percent_decode(last);
    (decoded != "." && decoded != "..").then_some(decoded)
}

/// Makes `name` a single safe path component: separators, NUL and control
/// characters become `_`, surrounding dots and whitespace are trimmed, and
/// the result is cut to 255 bytes. Inner spaces are kept.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == '\0' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

/// `name` sanitized, or `download.bin` when nothing usable is left.
pub fn local_file_name(name: &str) -> String {
    let cleaned = sanitize_file_name(name);
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

/// Name for a download whose catalog entry has none.
pub fn derive_file_name(url: &str, content_disposition: Option<&str>) -> String {
    let candidate = content_disposition
        .and_then(disposition_file_name)
        .or_else(|| url_file_name(url))
        .unwrap_or_default();
    local_file_name(&candidate)
}
