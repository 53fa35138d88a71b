//! Chunk framing for scannable codes.
//!
//! An encoded payload is cut into fragments small enough for one code each,
//! and every fragment is wrapped in a frame:
//!
//! ```text
//! <part>/<total>:<fragment>
//! ```
//!
//! - `part`: 1-based position, decimal
//! - `total`: number of frames in this transfer, decimal, same for all frames
//! - `fragment`: arbitrary text; it may itself contain `:` or `/`, so only the
//!   first colon delimits the header
//!
//! # Example
//!
//! ```text
//! 1/3:eJyrVirOzFWyUvJNLMlQ0lEqUbJSSs7PS0nNS...
//! ```

use crate::transfer::error::{TransferError, TransferResult};
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

/// One frame of a transfer. `1 <= part <= total` holds for every value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    part: u32,
    total: u32,
    fragment: String,
}

impl Chunk {
    /// Create a chunk, checking the part/total invariant.
    ///
    /// # Errors
    /// - `TransferError::InvalidFrame` if `part` or `total` is zero, or `part > total`
    pub fn new(part: u32, total: u32, fragment: impl Into<String>) -> TransferResult<Self> {
        if part == 0 || total == 0 {
            return Err(TransferError::InvalidFrame(format!(
                "part and total must be positive, got {}/{}",
                part, total
            )));
        }
        if part > total {
            return Err(TransferError::InvalidFrame(format!(
                "part {} exceeds total {}",
                part, total
            )));
        }
        Ok(Self {
            part,
            total,
            fragment: fragment.into(),
        })
    }

    pub fn part(&self) -> u32 {
        self.part
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn into_fragment(self) -> String {
        self.fragment
    }

    /// Text to embed in one code.
    pub fn frame(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.part, self.total, self.fragment)
    }
}

impl FromStr for Chunk {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Splits `text` into frames of at most `max_fragment_size` characters each.
///
/// Fragments are contiguous and in order; only the last may be shorter.
/// Empty text still yields one frame, `1/1:`.
pub fn split(text: &str, max_fragment_size: NonZeroUsize) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![Chunk {
            part: 1,
            total: 1,
            fragment: String::new(),
        }];
    }

    let pieces = chars.chunks(max_fragment_size.get());
    let total = pieces.len() as u32;

    pieces
        .enumerate()
        .map(|(index, piece)| Chunk {
            part: index as u32 + 1,
            total,
            fragment: piece.iter().collect(),
        })
        .collect()
}

/// Parses scanned text back into a chunk.
///
/// # Errors
/// - `TransferError::InvalidFrame` if the `:` or `/` delimiter is missing, either
///   number is not plain decimal, either is zero, or `part > total`
pub fn parse(frame: &str) -> TransferResult<Chunk> {
    let (header, fragment) = frame
        .split_once(':')
        .ok_or_else(|| TransferError::InvalidFrame("missing ':' after header".into()))?;
    let (part, total) = header
        .split_once('/')
        .ok_or_else(|| TransferError::InvalidFrame(format!("header {:?} has no '/'", header)))?;

    Chunk::new(parse_count(part)?, parse_count(total)?, fragment)
}

fn parse_count(digits: &str) -> TransferResult<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TransferError::InvalidFrame(format!(
            "{:?} is not a decimal number",
            digits
        )));
    }
    digits
        .parse()
        .map_err(|_| TransferError::InvalidFrame(format!("{:?} is out of range", digits)))
}
