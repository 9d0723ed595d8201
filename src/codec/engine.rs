//! Codec engine: runs the full compress/decompress pipeline.
//!
//! ```text
//! compress:   bytes -> analyze -> encode -> deflate -> frame
//! decompress: frame -> parse -> inflate -> decode -> verify
//! ```
//!
//! Every call owns its pattern table and token buffer; the engine itself is
//! immutable configuration and can be shared across threads.

use super::analyzer::{PatternAnalyzer, PatternCandidate};
use super::deflate::DeflateCodec;
use super::frame::{build_frame, parse_frame, FrameMetadata};
use super::result::{CodecStats, CompressionResult};
use super::token::{decode_tokens, encode_tokens_with_usage, max_stream_len, PatternTable};
use super::{ALGORITHM_NAME, FORMAT_VERSION};
use crate::config::{CodecConfig, VersionPolicy, DEFAULT_BLOCK_SIZE};
use crate::error::{KolibriError, Result, Stage};

/// Two-stage pattern + DEFLATE codec
#[derive(Debug, Clone)]
pub struct KolibriCodec {
    analyzer: PatternAnalyzer,
    deflate: DeflateCodec,
    /// Block size reported by [`KolibriCodec::stats`]
    pub block_size: usize,
    /// Store the pattern table in frame metadata
    pub embed_table: bool,
    /// Check the CRC-32 on decompress
    pub verify_checksum: bool,
    /// Reaction to frames from another format version
    pub version_policy: VersionPolicy,
}

impl Default for KolibriCodec {
    fn default() -> Self {
        Self {
            analyzer: PatternAnalyzer::default(),
            deflate: DeflateCodec::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            embed_table: true,
            verify_checksum: true,
            version_policy: VersionPolicy::default(),
        }
    }
}

impl KolibriCodec {
    /// Create new codec with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create codec from validated configuration
    pub fn from_config(config: &CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            analyzer: PatternAnalyzer {
                min_length: config.min_pattern_length,
                max_length: config.max_pattern_length,
                length_step: config.pattern_length_step,
                max_tracked: config.max_tracked_patterns,
                max_patterns: config.max_patterns,
                sample_target: config.sample_target,
            },
            deflate: DeflateCodec::with_level(config.compression_level),
            block_size: config.block_size,
            embed_table: config.embed_table,
            verify_checksum: config.verify_checksum,
            version_policy: config.version_policy,
        })
    }

    /// Set DEFLATE level (clamped to 0-9)
    pub fn with_level(mut self, level: u32) -> Self {
        self.deflate = DeflateCodec::with_level(level);
        self
    }

    /// Set version policy
    pub fn with_version_policy(mut self, policy: VersionPolicy) -> Self {
        self.version_policy = policy;
        self
    }

    /// Enable or disable storing the pattern table in frames
    pub fn with_embedded_table(mut self, embed: bool) -> Self {
        self.embed_table = embed;
        self
    }

    /// Configured DEFLATE level
    pub fn level(&self) -> u32 {
        self.deflate.level
    }

    /// Run only the pattern analyzer
    pub fn analyze(&self, data: &[u8]) -> Vec<PatternCandidate> {
        self.analyzer.analyze(data)
    }

    /// Compress `data`, stamping the frame with the current time
    pub fn compress(&self, data: &[u8]) -> Result<CompressionResult> {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        self.compress_at(data, now)
    }

    /// Compress `data` with a caller-provided timestamp (epoch millis).
    ///
    /// Output is byte-identical for identical input, level and timestamp.
    pub fn compress_at(&self, data: &[u8], timestamp: u64) -> Result<CompressionResult> {
        let candidates = self.analyzer.analyze(data);
        let mut table = PatternTable::from_candidates(&candidates)
            .map_err(|e| e.in_compress(Stage::Analyze))?;

        let (tokens, used) = encode_tokens_with_usage(data, &table);
        table.truncate(used);
        let payload = self
            .deflate
            .compress(&tokens)
            .map_err(|e| e.in_compress(Stage::Deflate))?;

        let metadata = FrameMetadata {
            original_size: data.len() as u64,
            compressed_size: payload.len() as u64,
            pattern_count: candidates.len() as u32,
            timestamp,
            version: FORMAT_VERSION.to_string(),
            table: if self.embed_table {
                table.to_hex()
            } else {
                Vec::new()
            },
            checksum: Some(crc32fast::hash(data)),
        };
        let frame = build_frame(&metadata, &payload).map_err(|e| e.in_compress(Stage::Frame))?;

        tracing::debug!(
            original = data.len(),
            tokens = tokens.len(),
            payload = payload.len(),
            frame = frame.len(),
            patterns = candidates.len(),
            referenced = used,
            "compressed"
        );

        Ok(CompressionResult::new(frame, data.len(), candidates.len()))
    }

    /// Decompress a frame produced by [`KolibriCodec::compress`]
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.decompress_with_metadata(data).map(|(bytes, _)| bytes)
    }

    /// Decompress a frame and return its metadata alongside the data
    pub fn decompress_with_metadata(&self, data: &[u8]) -> Result<(Vec<u8>, FrameMetadata)> {
        let frame = parse_frame(data).map_err(|e| e.in_decompress(Stage::Parse))?;
        let metadata = frame.metadata;

        self.check_version(&metadata)
            .map_err(|e| e.in_decompress(Stage::Parse))?;
        check_size("compressed", metadata.compressed_size, frame.payload.len())
            .map_err(|e| e.in_decompress(Stage::Parse))?;

        let limit = usize::try_from(max_stream_len(metadata.original_size)).unwrap_or(usize::MAX);
        let tokens = self
            .deflate
            .decompress_bounded(frame.payload, limit)
            .map_err(|e| e.in_decompress(Stage::Inflate))?;

        let table =
            PatternTable::from_hex(&metadata.table).map_err(|e| e.in_decompress(Stage::Decode))?;
        let recovered = decode_tokens(&tokens, &table).map_err(|e| e.in_decompress(Stage::Decode))?;

        self.verify(&metadata, &table, &recovered)
            .map_err(|e| e.in_decompress(Stage::Verify))?;

        tracing::debug!(
            payload = frame.payload.len(),
            tokens = tokens.len(),
            recovered = recovered.len(),
            "decompressed"
        );

        Ok((recovered, metadata))
    }

    /// Parse frame metadata without inflating the payload
    pub fn inspect(&self, data: &[u8]) -> Result<FrameMetadata> {
        parse_frame(data)
            .map(|frame| frame.metadata)
            .map_err(|e| e.in_decompress(Stage::Parse))
    }

    /// Capability descriptor
    pub fn stats(&self) -> CodecStats {
        CodecStats {
            algorithm: ALGORITHM_NAME.to_string(),
            block_size: self.block_size,
            compression_level: self.deflate.level,
            version: FORMAT_VERSION.to_string(),
        }
    }

    /// Compress on the blocking thread pool
    pub async fn compress_async(&self, data: Vec<u8>) -> Result<CompressionResult> {
        let codec = self.clone();
        tokio::task::spawn_blocking(move || codec.compress(&data))
            .await
            .map_err(|e| KolibriError::TaskFailed(e.to_string()))?
    }

    /// Decompress on the blocking thread pool
    pub async fn decompress_async(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let codec = self.clone();
        tokio::task::spawn_blocking(move || codec.decompress(&data))
            .await
            .map_err(|e| KolibriError::TaskFailed(e.to_string()))?
    }

    fn check_version(&self, metadata: &FrameMetadata) -> Result<()> {
        if metadata.version == FORMAT_VERSION {
            return Ok(());
        }

        match self.version_policy {
            VersionPolicy::Strict => Err(KolibriError::VersionMismatch {
                found: metadata.version.clone(),
                expected: FORMAT_VERSION.to_string(),
            }),
            VersionPolicy::Warn => {
                tracing::warn!(
                    found = %metadata.version,
                    expected = FORMAT_VERSION,
                    "frame written by a different format version"
                );
                Ok(())
            },
            VersionPolicy::Ignore => Ok(()),
        }
    }

    fn verify(&self, metadata: &FrameMetadata, table: &PatternTable, recovered: &[u8]) -> Result<()> {
        if table.len() as u64 > u64::from(metadata.pattern_count) {
            return Err(KolibriError::SizeMismatch {
                field: "patterns",
                expected: u64::from(metadata.pattern_count),
                actual: table.len() as u64,
            });
        }
        check_size("original", metadata.original_size, recovered.len())?;

        if self.verify_checksum {
            if let Some(expected) = metadata.checksum {
                let actual = crc32fast::hash(recovered);
                if actual != expected {
                    return Err(KolibriError::ChecksumMismatch { expected, actual });
                }
            }
        }
        Ok(())
    }
}

fn check_size(field: &'static str, expected: u64, actual: usize) -> Result<()> {
    if expected == actual as u64 {
        Ok(())
    } else {
        Err(KolibriError::SizeMismatch {
            field,
            expected,
            actual: actual as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::token::TOKEN_MAGIC;

    #[test]
    fn test_compress_decompress() {
        let codec = KolibriCodec::new();
        let original = b"Kolibri compresses repeated patterns. Kolibri compresses repeated patterns.".repeat(5);

        let result = codec.compress(&original).unwrap();
        assert_eq!(result.original_size, original.len());
        assert_eq!(result.compressed_size, result.data.len());
        assert!(result.pattern_count > 0);

        assert_eq!(codec.decompress(&result.data).unwrap(), original);
    }

    #[test]
    fn test_zero_run_scenario() {
        let codec = KolibriCodec::new();
        let original = vec![0u8; 5000];

        let result = codec.compress(&original).unwrap();
        assert!(result.compressed_size < 800);
        assert!(result.ratio_percent < 20.0);

        let (recovered, metadata) = codec.decompress_with_metadata(&result.data).unwrap();
        assert_eq!(recovered, original);
        assert_eq!(metadata.table[0], "00".repeat(32));
        // Lengths 32, 30, ..., 8 cover ids 0..=12; the 8-byte tail is the last reference
        assert_eq!(metadata.pattern_count, 15);
        assert_eq!(metadata.table.len(), 13);
        assert_eq!(metadata.table[12], "00".repeat(8));
    }

    #[test]
    fn test_zero_run_tokens_are_references() {
        let codec = KolibriCodec::new();
        let original = vec![0u8; 5000];
        let table = PatternTable::from_candidates(&codec.analyze(&original)).unwrap();

        let (tokens, _) = encode_tokens_with_usage(&original, &table);
        // 156 references to the 32-byte run plus one for the 8-byte tail
        assert_eq!(tokens.len(), TOKEN_MAGIC.len() + 2 * 157);
        assert_eq!(&tokens[4..6], &[0xFFu8, 0x00]);
    }

    #[test]
    fn test_tiny_input_scenario() {
        let codec = KolibriCodec::new();
        let original = [0x9Cu8, 0x01, 0xFF, 0x5A];

        let result = codec.compress(&original).unwrap();
        assert_eq!(result.pattern_count, 0);

        let (recovered, metadata) = codec.decompress_with_metadata(&result.data).unwrap();
        assert_eq!(recovered, original);
        assert!(metadata.table.is_empty());
        assert_eq!(metadata.original_size, 4);
    }

    #[test]
    fn test_empty_input() {
        let codec = KolibriCodec::new();
        let result = codec.compress(&[]).unwrap();

        assert_eq!(result.ratio_percent, 0.0);
        assert!(codec.decompress(&result.data).unwrap().is_empty());
    }

    #[test]
    fn test_compress_at_is_deterministic() {
        let codec = KolibriCodec::new();
        let data = b"abcabcabcabcabcabc determinism abcabcabcabc".repeat(30);

        let a = codec.compress_at(&data, 42).unwrap();
        let b = codec.compress_at(&data, 42).unwrap();
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn test_metadata_fields() {
        let codec = KolibriCodec::new();
        let data = b"metadata metadata metadata metadata".to_vec();
        let result = codec.compress_at(&data, 1_700_000_000_000).unwrap();

        let meta = codec.inspect(&result.data).unwrap();
        assert_eq!(meta.original_size, data.len() as u64);
        assert_eq!(meta.timestamp, 1_700_000_000_000);
        assert_eq!(meta.version, FORMAT_VERSION);
        assert!(meta.table.len() <= meta.pattern_count as usize);
        assert_eq!(meta.checksum, Some(crc32fast::hash(&data)));
    }

    #[test]
    fn test_without_embedded_table_patterns_cannot_decode() {
        let codec = KolibriCodec::new().with_embedded_table(false);
        let data = vec![7u8; 1000];
        let result = codec.compress(&data).unwrap();

        let err = codec.decompress(&result.data).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Decode));
        assert!(matches!(
            err.root_cause(),
            KolibriError::InternalEncoding { table_len: 0, .. }
        ));
    }

    #[test]
    fn test_version_policy() {
        let data = b"versioned payload".to_vec();
        let result = KolibriCodec::new().compress(&data).unwrap();

        // Rewrite the frame with a foreign version
        let frame = parse_frame(&result.data).unwrap();
        let mut meta = frame.metadata.clone();
        meta.version = "0.9.0".to_string();
        let foreign = build_frame(&meta, frame.payload).unwrap();

        let strict = KolibriCodec::new().with_version_policy(VersionPolicy::Strict);
        let err = strict.decompress(&foreign).unwrap_err();
        assert!(matches!(err.root_cause(), KolibriError::VersionMismatch { .. }));

        for policy in [VersionPolicy::Warn, VersionPolicy::Ignore] {
            let codec = KolibriCodec::new().with_version_policy(policy);
            assert_eq!(codec.decompress(&foreign).unwrap(), data);
        }
    }

    #[test]
    fn test_checksum_mismatch_detected() {
        let codec = KolibriCodec::new();
        let data = b"checksummed".to_vec();
        let result = codec.compress(&data).unwrap();

        let frame = parse_frame(&result.data).unwrap();
        let mut meta = frame.metadata.clone();
        meta.checksum = meta.checksum.map(|c| c ^ 1);
        let tampered = build_frame(&meta, frame.payload).unwrap();

        let err = codec.decompress(&tampered).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Verify));
        assert!(matches!(err.root_cause(), KolibriError::ChecksumMismatch { .. }));

        let lenient = KolibriCodec {
            verify_checksum: false,
            ..KolibriCodec::new()
        };
        assert_eq!(lenient.decompress(&tampered).unwrap(), data);
    }

    #[test]
    fn test_unreferenced_patterns_are_not_embedded() {
        let codec = KolibriCodec::new();
        let data = b"ABCDEFGH0123456789ABCDEFGH!".to_vec();

        let result = codec.compress(&data).unwrap();
        let (recovered, meta) = codec.decompress_with_metadata(&result.data).unwrap();
        assert_eq!(recovered, data);

        // One 8-byte, three 6-byte and five 4-byte candidates; only the 8-byte one is used
        assert_eq!(meta.pattern_count, 9);
        assert_eq!(meta.table, vec![hex::encode(b"ABCDEFGH")]);
    }

    #[test]
    fn test_oversized_table_is_rejected() {
        let codec = KolibriCodec::new();
        let data = vec![3u8; 2000];
        let result = codec.compress(&data).unwrap();

        let frame = parse_frame(&result.data).unwrap();
        let mut meta = frame.metadata.clone();
        meta.pattern_count = 0;
        let forged = build_frame(&meta, frame.payload).unwrap();

        let err = codec.decompress(&forged).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Verify));
        assert!(matches!(
            err.root_cause(),
            KolibriError::SizeMismatch {
                field: "patterns",
                ..
            }
        ));
    }

    #[test]
    fn test_inflate_is_capped_by_original_size() {
        let codec = KolibriCodec::new();
        let payload = DeflateCodec::new().compress(&vec![0u8; 1_000_000]).unwrap();
        let meta = FrameMetadata {
            original_size: 10,
            compressed_size: payload.len() as u64,
            pattern_count: 0,
            timestamp: 0,
            version: FORMAT_VERSION.to_string(),
            table: Vec::new(),
            checksum: None,
        };
        let forged = build_frame(&meta, &payload).unwrap();

        let err = codec.decompress(&forged).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Inflate));
        assert!(matches!(err.root_cause(), KolibriError::OutputLimit { limit: 24 }));
    }

    #[test]
    fn test_stats() {
        let codec = KolibriCodec::new().with_level(6);
        let stats = codec.stats();

        assert_eq!(stats.algorithm, ALGORITHM_NAME);
        assert_eq!(stats.block_size, 4096);
        assert_eq!(stats.compression_level, 6);
        assert_eq!(stats.version, FORMAT_VERSION);
    }

    #[test]
    fn test_from_config() {
        let config = CodecConfig {
            compression_level: 3,
            max_patterns: 8,
            ..Default::default()
        };
        let codec = KolibriCodec::from_config(&config).unwrap();
        assert_eq!(codec.level(), 3);
        assert!(codec.analyze(&vec![1u8; 4000]).len() <= 8);

        let invalid = CodecConfig {
            compression_level: 10,
            ..Default::default()
        };
        assert!(KolibriCodec::from_config(&invalid).is_err());
    }
}
