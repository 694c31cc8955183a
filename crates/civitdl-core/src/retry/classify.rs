//! Classify HTTP statuses, curl errors and chunk errors into retry kinds.

use super::error::ChunkError;
use super::policy::ErrorKind;

/// Errors that know how the retry policy should treat them.
pub trait Retryable {
    fn kind(&self) -> ErrorKind;
}

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify the status of a ranged GET. Anything other than 206 is retried:
/// a 200 means the server ignored the Range header this time, and CDNs in
/// front of signed URLs answer transient 4xx as well.
pub fn classify_chunk_status(code: u32) -> ErrorKind {
    match classify_http_status(code) {
        ErrorKind::Other => ErrorKind::Protocol,
        kind => kind,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

impl Retryable for curl::Error {
    fn kind(&self) -> ErrorKind {
        classify_curl_error(self)
    }
}

impl Retryable for ChunkError {
    fn kind(&self) -> ErrorKind {
        match self {
            ChunkError::ConnectionLost(e) => classify_curl_error(e),
            ChunkError::Http(code) => classify_chunk_status(*code),
            ChunkError::PartialTransfer { .. } => ErrorKind::Connection,
            ChunkError::Storage(_) | ChunkError::Aborted => ErrorKind::Other,
        }
    }
}
