//! One ranged GET for the unwritten tail of a chunk.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::retry::ChunkError;
use crate::segmenter::Chunk;
use crate::storage::StorageWriter;

use super::CurlOptions;

const LOW_SPEED_LIMIT: u32 = 1024;
const PARTIAL_CONTENT: u32 = 206;

/// Fetches `chunk` from `start + *written` to its end and writes it at the
/// matching file offset. `*written` advances with every byte that lands, so
/// a failed attempt can be resumed by calling again. Every byte is also
/// added to `bytes_done`.
pub(super) fn fetch_range(
    url: &str,
    chunk: &Chunk,
    written: &mut u64,
    storage: &StorageWriter,
    bytes_done: &AtomicU64,
    abort: &AtomicBool,
    curl: CurlOptions,
) -> Result<(), ChunkError> {
    if abort.load(Ordering::Relaxed) {
        return Err(ChunkError::Aborted);
    }
    if chunk.is_complete(*written) {
        return Ok(());
    }

    let expected = chunk.len() - *written;
    let first_written = *written;
    let status = Cell::new(0u32);
    let mut storage_error: Option<std::io::Error> = None;

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(ChunkError::ConnectionLost)?;
    easy.follow_location(true).map_err(ChunkError::ConnectionLost)?;
    easy.connect_timeout(curl.connect_timeout)
        .map_err(ChunkError::ConnectionLost)?;
    easy.low_speed_limit(LOW_SPEED_LIMIT)
        .map_err(ChunkError::ConnectionLost)?;
    easy.low_speed_time(curl.low_speed_time)
        .map_err(ChunkError::ConnectionLost)?;
    easy.range(&chunk.curl_range(*written))
        .map_err(ChunkError::ConnectionLost)?;
    easy.progress(true).map_err(ChunkError::ConnectionLost)?;

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|line| {
                if let Some(code) = status_code(line) {
                    status.set(code);
                }
                true
            })
            .map_err(ChunkError::ConnectionLost)?;
        // Also fires while no bytes flow, so a stalled request sees the abort.
        transfer
            .progress_function(|_, _, _, _| !abort.load(Ordering::Relaxed))
            .map_err(ChunkError::ConnectionLost)?;
        transfer
            .write_function(|data| {
                if abort.load(Ordering::Relaxed) || status.get() != PARTIAL_CONTENT {
                    return Ok(0);
                }
                // A server that sends past the end of the range is cut at the chunk boundary.
                let room = chunk.len().saturating_sub(*written);
                let take = (data.len() as u64).min(room) as usize;
                if let Err(e) = storage.write_at(chunk.start + *written, &data[..take]) {
                    storage_error = Some(e);
                    return Ok(0);
                }
                *written += take as u64;
                bytes_done.fetch_add(take as u64, Ordering::Relaxed);
                Ok(data.len())
            })
            .map_err(ChunkError::ConnectionLost)?;
        transfer.perform()
    };

    if let Err(e) = perform_result {
        if let Some(io_err) = storage_error {
            return Err(ChunkError::Storage(io_err));
        }
        if abort.load(Ordering::Relaxed) {
            return Err(ChunkError::Aborted);
        }
        if e.is_write_error() && status.get() != PARTIAL_CONTENT {
            return Err(ChunkError::Http(status.get()));
        }
        return Err(ChunkError::ConnectionLost(e));
    }

    let code = easy.response_code().map_err(ChunkError::ConnectionLost)?;
    if code != PARTIAL_CONTENT {
        return Err(ChunkError::Http(code));
    }
    if !chunk.is_complete(*written) {
        return Err(ChunkError::PartialTransfer {
            expected,
            received: *written - first_written,
        });
    }
    Ok(())
}

/// Status code from an `HTTP/x.y NNN ...` status line; `None` for header lines.
fn status_code(line: &[u8]) -> Option<u32> {
    let line = std::str::from_utf8(line).ok()?;
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}
