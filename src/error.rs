//! Kolibri error types.
//!
//! Leaf variants describe what went wrong inside a single pipeline stage.
//! At the `compress`/`decompress` boundary every leaf error is wrapped in
//! [`KolibriError::Compression`] or [`KolibriError::Decompression`] together
//! with the [`Stage`] that produced it, so callers always see both the stage
//! and the original cause via `#[source]`.

use std::fmt;

use thiserror::Error;

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Pattern discovery.
    Analyze,
    /// Generic (DEFLATE) compression.
    Deflate,
    /// Container framing.
    Frame,
    /// Container parsing.
    Parse,
    /// Generic (DEFLATE) decompression.
    Inflate,
    /// Token stream decoding.
    Decode,
    /// Post-decode integrity checks.
    Verify,
}

impl Stage {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Analyze => "analyze",
            Stage::Deflate => "deflate",
            Stage::Frame => "frame",
            Stage::Parse => "parse",
            Stage::Inflate => "inflate",
            Stage::Decode => "decode",
            Stage::Verify => "verify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kolibri codec errors.
#[derive(Error, Debug)]
pub enum KolibriError {
    /// Buffer too short to contain a frame, or missing the token stream marker.
    #[error("Invalid format: {0}")]
    Format(String),

    /// Declared metadata length is inconsistent with the buffer size.
    #[error("Corrupt frame: metadata length {declared} exceeds {available} available bytes")]
    CorruptFrame {
        /// Metadata length read from the prefix.
        declared: usize,
        /// Bytes actually present after the prefix.
        available: usize,
    },

    /// Metadata bytes are not a valid metadata record.
    #[error("Malformed metadata: {0}")]
    MetadataDecode(#[source] serde_json::Error),

    /// Metadata record could not be serialized.
    #[error("Metadata encode error: {0}")]
    MetadataEncode(#[source] serde_json::Error),

    /// The generic compressor rejected or failed on its input.
    #[error("Underlying codec error: {0}")]
    UnderlyingCodec(#[source] std::io::Error),

    /// Inflated output grew past the size the metadata allows.
    #[error("Inflated output exceeds limit of {limit} bytes")]
    OutputLimit {
        /// Largest output accepted.
        limit: u64,
    },

    /// Token stream references a pattern id outside the table.
    #[error("Unknown pattern reference {id} (table has {table_len} entries)")]
    InternalEncoding {
        /// Referenced id.
        id: u8,
        /// Number of patterns in the table.
        table_len: usize,
    },

    /// Frame was written by an incompatible format version.
    #[error("Version mismatch: frame version {found}, codec version {expected}")]
    VersionMismatch {
        /// Version recorded in the frame.
        found: String,
        /// Version this codec writes.
        expected: String,
    },

    /// A size recorded in the metadata does not match the data.
    #[error("Size mismatch in {field}: metadata says {expected}, found {actual}")]
    SizeMismatch {
        /// Which size disagreed.
        field: &'static str,
        /// Size recorded in the metadata.
        expected: u64,
        /// Size actually observed.
        actual: u64,
    },

    /// CRC-32 of the recovered data does not match the metadata.
    #[error("Checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Checksum recorded in the metadata.
        expected: u32,
        /// Checksum of the recovered bytes.
        actual: u32,
    },

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Background worker failed before producing a result.
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// Compression failed in the given stage.
    #[error("Compression error ({stage}): {source}")]
    Compression {
        /// Stage that failed.
        stage: Stage,
        /// Original cause.
        #[source]
        source: Box<KolibriError>,
    },

    /// Decompression failed in the given stage.
    #[error("Decompression error ({stage}): {source}")]
    Decompression {
        /// Stage that failed.
        stage: Stage,
        /// Original cause.
        #[source]
        source: Box<KolibriError>,
    },
}

impl KolibriError {
    /// Wrap as a compression failure in `stage`.
    pub fn in_compress(self, stage: Stage) -> Self {
        KolibriError::Compression {
            stage,
            source: Box::new(self),
        }
    }

    /// Wrap as a decompression failure in `stage`.
    pub fn in_decompress(self, stage: Stage) -> Self {
        KolibriError::Decompression {
            stage,
            source: Box::new(self),
        }
    }

    /// Stage recorded by the outermost boundary wrapper, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            KolibriError::Compression { stage, .. } | KolibriError::Decompression { stage, .. } => {
                Some(*stage)
            },
            _ => None,
        }
    }

    /// Innermost error with all boundary wrappers removed.
    pub fn root_cause(&self) -> &KolibriError {
        match self {
            KolibriError::Compression { source, .. } | KolibriError::Decompression { source, .. } => {
                source.root_cause()
            },
            other => other,
        }
    }
}

/// Result type alias for Kolibri operations
pub type Result<T> = std::result::Result<T, KolibriError>;

impl From<toml::de::Error> for KolibriError {
    fn from(err: toml::de::Error) -> Self {
        KolibriError::Config(err.to_string())
    }
}
