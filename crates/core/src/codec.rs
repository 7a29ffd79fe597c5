//! Structural codec for the `pinBatchData` payload blob.
//!
//! The blob is the bincode encoding (fixed-width little-endian integers,
//! u64 length prefixes) of the tuple:
//!
//! ```text
//! (uuids: bytes, batch_hash: bytes, payload_ref: string, contexts: seq<bytes>)
//! ```
//!
//! Decoding is all-or-nothing: trailing bytes, truncation, invalid UTF-8 and
//! oversized input are rejected before any record is built.

use bincode::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default upper bound on an encoded payload: 1 MiB.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// The four logical fields carried by a `pinBatchData` payload.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct PinPayload {
    pub uuids: Vec<u8>,
    pub batch_hash: Vec<u8>,
    pub payload_ref: String,
    pub contexts: Vec<Vec<u8>>,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is {len} bytes, limit is {limit}")]
    TooLarge { len: usize, limit: usize },
    #[error("malformed payload: {0}")]
    Malformed(#[source] bincode::Error),
}

fn options(limit: usize) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(limit as u64)
        .reject_trailing_bytes()
}

/// Decode a payload blob into its typed tuple.
pub fn decode_payload(blob: &[u8], limit: usize) -> Result<PinPayload, DecodeError> {
    if blob.len() > limit {
        return Err(DecodeError::TooLarge {
            len: blob.len(),
            limit,
        });
    }
    options(limit)
        .deserialize(blob)
        .map_err(DecodeError::Malformed)
}

/// Encode a payload into the blob format accepted by [`decode_payload`].
pub fn encode_payload(payload: &PinPayload) -> Result<Vec<u8>, DecodeError> {
    // Encoding is unbounded; the limit applies when the blob is decoded.
    options(usize::MAX)
        .serialize(payload)
        .map_err(DecodeError::Malformed)
}
