//! Chunk type and range planning.

/// One chunk of a download: the inclusive byte range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the plan (0-based).
    pub index: usize,
    /// First byte (inclusive).
    pub start: u64,
    /// Last byte (inclusive).
    pub end: u64,
    /// Ranged GETs issued for this chunk; 0 until its worker reports back.
    pub attempts: u32,
}

impl Chunk {
    /// Length of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end + 1 - self.start
    }

    /// Byte range still missing after `written` bytes landed, as `(first, last)`.
    pub fn remaining(&self, written: u64) -> (u64, u64) {
        (self.start + written.min(self.len()), self.end)
    }

    /// True once `written` covers the whole chunk.
    pub fn is_complete(&self, written: u64) -> bool {
        written >= self.len()
    }

    /// Range for curl (`first-last`, no unit) resuming after `written` bytes.
    pub fn curl_range(&self, written: u64) -> String {
        let (first, last) = self.remaining(written);
        format!("{}-{}", first, last)
    }

    /// HTTP Range header value resuming after `written` bytes.
    pub fn range_header_value(&self, written: u64) -> String {
        format!("bytes={}", self.curl_range(written))
    }
}

/// Splits `[0, total_size)` into `chunk_count` contiguous chunks.
///
/// Every chunk gets `total_size / chunk_count` bytes and the last one also
/// takes the remainder. The count is reduced when the file has fewer bytes
/// than requested chunks, so no chunk is ever empty. Returns an empty plan
/// when `total_size` or `chunk_count` is 0.
pub fn plan_chunks(total_size: u64, chunk_count: usize) -> Vec<Chunk> {
    if total_size == 0 || chunk_count == 0 {
        return Vec::new();
    }

    let count = (chunk_count as u64).min(total_size);
    let base = total_size / count;

    (0..count)
        .map(|i| {
            let start = i * base;
            let end = if i == count - 1 {
                total_size - 1
            } else {
                start + base - 1
            };
            Chunk {
                index: i as usize,
                start,
                end,
                attempts: 0,
            }
        })
        .collect()
}
