//! Container framing.
//!
//! # Wire Format
//!
//! ```text
//! [metadata_len: 4, big-endian u32]
//! [metadata: metadata_len bytes, UTF-8 JSON]
//! [payload: remainder, zlib stream of the token stream]
//! ```
//!
//! Metadata JSON fields:
//!
//! | Field        | Type       | Meaning                                  |
//! |--------------|------------|------------------------------------------|
//! | `original`   | u64        | Input size in bytes                      |
//! | `compressed` | u64        | Payload size in bytes                    |
//! | `patterns`   | u32        | Pattern table size                       |
//! | `timestamp`  | u64        | Epoch milliseconds at compression time   |
//! | `version`    | string     | Format version                           |
//! | `table`      | [hex]      | Pattern bytes in id order (optional)     |
//! | `checksum`   | u32        | CRC-32 of the input (optional)           |

use serde::{Deserialize, Serialize};

use crate::error::{KolibriError, Result};

/// Size of the metadata length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Descriptive record stored ahead of the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// Input size in bytes
    #[serde(rename = "original")]
    pub original_size: u64,
    /// Payload size in bytes
    #[serde(rename = "compressed")]
    pub compressed_size: u64,
    /// Number of patterns used by the encoder
    #[serde(rename = "patterns")]
    pub pattern_count: u32,
    /// Epoch milliseconds
    pub timestamp: u64,
    /// Format version that wrote the frame
    pub version: String,
    /// Hex-encoded pattern table in id order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table: Vec<String>,
    /// CRC-32 of the original bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<u32>,
}

/// Borrowed view of a parsed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame<'a> {
    /// Decoded metadata
    pub metadata: FrameMetadata,
    /// Compressed payload, unmodified
    pub payload: &'a [u8],
}

/// Assemble a frame from metadata and payload
pub fn build_frame(metadata: &FrameMetadata, payload: &[u8]) -> Result<Vec<u8>> {
    let meta_bytes = serde_json::to_vec(metadata).map_err(KolibriError::MetadataEncode)?;
    let meta_len = u32::try_from(meta_bytes.len()).map_err(|_| {
        KolibriError::Format(format!(
            "Metadata too large for frame: {} bytes",
            meta_bytes.len()
        ))
    })?;

    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + meta_bytes.len() + payload.len());
    buf.extend_from_slice(&meta_len.to_be_bytes());
    buf.extend_from_slice(&meta_bytes);
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Split a frame into metadata and payload
pub fn parse_frame(data: &[u8]) -> Result<ParsedFrame<'_>> {
    if data.len() < LENGTH_PREFIX_SIZE {
        return Err(KolibriError::Format(format!(
            "Buffer too short for a frame: {} < {}",
            data.len(),
            LENGTH_PREFIX_SIZE
        )));
    }

    let declared = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let available = data.len() - LENGTH_PREFIX_SIZE;
    if declared > available {
        return Err(KolibriError::CorruptFrame {
            declared,
            available,
        });
    }

    let meta_end = LENGTH_PREFIX_SIZE + declared;
    let metadata: FrameMetadata = serde_json::from_slice(&data[LENGTH_PREFIX_SIZE..meta_end])
        .map_err(KolibriError::MetadataDecode)?;

    Ok(ParsedFrame {
        metadata,
        payload: &data[meta_end..],
    })
}
