//! Two-stage compression pipeline.
//!
//! This module provides the pattern-substitution pre-pass, the generic
//! DEFLATE stage and the self-describing container around them.
//!
//! # Stages
//!
//! | Stage                  | Module        | Output                          |
//! |------------------------|---------------|---------------------------------|
//! | Pattern analysis       | [`analyzer`]  | Ranked [`PatternCandidate`]s    |
//! | Token encoding         | [`token`]     | `KOLI`-prefixed token stream    |
//! | Generic compression    | [`deflate`]   | zlib stream                     |
//! | Framing                | [`frame`]     | `[len][metadata][payload]`      |
//!
//! # Wire Format
//!
//! ```text
//! [metadata_len: 4 BE][metadata JSON][zlib("KOLI" tokens...)]
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use kolibri::codec::KolibriCodec;
//!
//! let codec = KolibriCodec::new();
//! let result = codec.compress(&data)?;
//! println!("Ratio: {:.2}%", result.ratio_percent);
//!
//! let original = codec.decompress(&result.data)?;
//! ```

pub mod analyzer;
pub mod deflate;
mod engine;
pub mod frame;
mod result;
pub mod token;

pub use analyzer::{PatternAnalyzer, PatternCandidate};
pub use deflate::DeflateCodec;
pub use engine::KolibriCodec;
pub use frame::{build_frame, parse_frame, FrameMetadata, ParsedFrame};
pub use result::{ratio_percent, CodecStats, CompressionResult};
pub use token::{
    decode_tokens, encode_tokens, encode_tokens_with_usage, max_stream_len, PatternTable, SENTINEL,
    TOKEN_MAGIC,
};

/// Format version written into frame metadata
pub const FORMAT_VERSION: &str = "1.0.0";

/// Algorithm name reported by the capability query
pub const ALGORITHM_NAME: &str = "Kolibri DECIMAL10X v1.0";

/// Check if a buffer looks like a Kolibri frame (metadata parses)
pub fn is_kolibri_frame(data: &[u8]) -> bool {
    parse_frame(data).is_ok()
}
