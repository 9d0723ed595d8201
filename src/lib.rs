//! # Kolibri - Self-Framed Two-Stage Compressor
//!
//! Byte-buffer compressor that runs a pattern-substitution pre-pass ahead of
//! DEFLATE and wraps the result in a length-prefixed, self-describing frame.
//! Frames decompress without any external context.
//!
//! ## Pipeline
//!
//! ```text
//!  compress
//!  bytes ──> PatternAnalyzer ──> candidates
//!    │                               │
//!    └──────> encode_tokens <────────┘
//!                  │  "KOLI" + tokens
//!                  v
//!             DeflateCodec ──> payload ──> build_frame ──> frame
//!
//!  decompress
//!  frame ──> parse_frame ──> metadata (+ pattern table), payload
//!                                          │
//!             DeflateCodec (inflate) <─────┘
//!                  │  token stream
//!                  v
//!             decode_tokens ──> verify sizes / CRC-32 ──> bytes
//! ```
//!
//! ### Token Stream
//!
//! | Bytes          | Meaning                         |
//! |----------------|---------------------------------|
//! | `b` (≠ `0xFF`) | Literal byte                    |
//! | `0xFF 0xFF`    | Literal `0xFF`                  |
//! | `0xFF id`      | Pattern `id` from the table     |
//!
//! ### Frame
//!
//! | Offset      | Size | Content                              |
//! |-------------|------|--------------------------------------|
//! | 0           | 4    | Metadata length `M`, big-endian      |
//! | 4           | M    | Metadata JSON                        |
//! | 4 + M       | rest | zlib stream of the token stream      |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kolibri::KolibriCodec;
//!
//! let codec = KolibriCodec::new();
//! let data = vec![0u8; 5000];
//!
//! let result = codec.compress(&data).unwrap();
//! println!("{} -> {} bytes ({}%)", result.original_size, result.compressed_size, result.ratio_percent);
//!
//! let restored = codec.decompress(&result.data).unwrap();
//! assert_eq!(restored, data);
//! ```
//!
//! ## Modules
//!
//! - [`codec`]: Pattern analysis, token stream, DEFLATE stage and framing
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod codec;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use codec::{
    CodecStats, CompressionResult, FrameMetadata, KolibriCodec, PatternAnalyzer,
    PatternCandidate, PatternTable, ALGORITHM_NAME, FORMAT_VERSION,
};
pub use config::{CodecConfig, Config, VersionPolicy};
pub use error::{KolibriError, Result, Stage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Check if a buffer looks like a Kolibri frame
pub fn is_kolibri_frame(data: &[u8]) -> bool {
    codec::is_kolibri_frame(data)
}
