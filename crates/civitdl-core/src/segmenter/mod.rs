//! Range math and chunk planning.
//!
//! Splits a download into N contiguous chunks and computes the HTTP Range
//! bounds for each, including the resumed range after a partial attempt.

mod range;

pub use range::{plan_chunks, Chunk};
