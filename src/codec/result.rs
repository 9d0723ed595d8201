//! Compression results and codec descriptors.

use serde::{Deserialize, Serialize};

/// Result of compression operation
#[derive(Debug, Clone)]
pub struct CompressionResult {
    /// Complete frame (wire format)
    pub data: Vec<u8>,
    /// Frame size as a percentage of the input, rounded to two decimals
    pub ratio_percent: f64,
    /// Original size in bytes
    pub original_size: usize,
    /// Frame size in bytes
    pub compressed_size: usize,
    /// Patterns substituted by the token stage
    pub pattern_count: usize,
}

impl CompressionResult {
    /// Create new compression result
    pub fn new(data: Vec<u8>, original_size: usize, pattern_count: usize) -> Self {
        let compressed_size = data.len();
        Self {
            data,
            ratio_percent: ratio_percent(compressed_size, original_size),
            original_size,
            compressed_size,
            pattern_count,
        }
    }

    /// Original size divided by frame size
    pub fn byte_ratio(&self) -> f64 {
        if self.compressed_size == 0 {
            0.0
        } else {
            self.original_size as f64 / self.compressed_size as f64
        }
    }

    /// Check if compression was beneficial
    pub fn is_beneficial(&self) -> bool {
        self.compressed_size < self.original_size
    }
}

/// `compressed / original * 100` rounded to two decimals; 0 for empty input.
pub fn ratio_percent(compressed: usize, original: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let ratio = compressed as f64 / original as f64 * 100.0;
    (ratio * 100.0).round() / 100.0
}

/// Read-only codec descriptor for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecStats {
    /// Algorithm name
    pub algorithm: String,
    /// Configured block size
    pub block_size: usize,
    /// Configured DEFLATE level
    pub compression_level: u32,
    /// Format version written into frames
    pub version: String,
}
