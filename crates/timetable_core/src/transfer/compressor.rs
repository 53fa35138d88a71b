//! Payload compression and text-safe encoding.
//!
//! `CompactPayload` -> JSON -> zlib -> base64 (URL-safe alphabet, padded).
//!
//! The URL-safe alphabet (`A-Z a-z 0-9 - _` plus `=`) never produces `:` or `/`,
//! so encoded text can be framed without escaping. Decoding also accepts the
//! standard alphabet, which some senders use.

use crate::transfer::compact::CompactPayload;
use crate::transfer::error::{TransferError, TransferResult};
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::error::Category;
use std::io::{Read, Write};

/// Upper bound on inflated payload size. A real timetable is a few KiB.
pub const MAX_INFLATED_BYTES: u64 = 4 * 1024 * 1024;

/// Serializes, compresses and encodes a payload for framing.
pub fn encode(payload: &CompactPayload) -> TransferResult<String> {
    let json = serde_json::to_vec(payload)
        .map_err(|e| TransferError::CorruptPayload(format!("serialize: {}", e)))?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| TransferError::CorruptPayload(format!("deflate: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| TransferError::CorruptPayload(format!("deflate: {}", e)))?;

    Ok(URL_SAFE.encode(compressed))
}

/// Inverse of [`encode`].
///
/// # Errors
/// - `CorruptPayload` if base64 decoding, inflating or JSON parsing fails
/// - `MalformedPayload` if the JSON parses but does not have the payload's shape
pub fn decode(text: &str) -> TransferResult<CompactPayload> {
    let compressed = if text.contains(['+', '/']) {
        STANDARD.decode(text)
    } else {
        URL_SAFE.decode(text)
    }
    .map_err(|e| TransferError::CorruptPayload(format!("base64: {}", e)))?;

    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .take(MAX_INFLATED_BYTES + 1)
        .read_to_end(&mut json)
        .map_err(|e| TransferError::CorruptPayload(format!("inflate: {}", e)))?;
    if json.len() as u64 > MAX_INFLATED_BYTES {
        return Err(TransferError::CorruptPayload(format!(
            "inflated payload exceeds {} bytes",
            MAX_INFLATED_BYTES
        )));
    }

    serde_json::from_slice(&json).map_err(|e| match e.classify() {
        Category::Data => TransferError::MalformedPayload(e.to_string()),
        Category::Io | Category::Syntax | Category::Eof => {
            TransferError::CorruptPayload(format!("json: {}", e))
        }
    })
}
