//! Pattern analyzer: finds repeated fixed-length substrings worth substituting.
//!
//! The scan is subsampled so its cost stays roughly linear in the input:
//! starting offsets advance by `max(1, len / sample_target)`, and at most
//! `max_tracked` distinct substrings are remembered. Candidates that never
//! repeat, or that would save too little, are dropped before ranking.

use std::collections::HashMap;

use serde::Serialize;

/// Shortest substring considered
pub const DEFAULT_MIN_PATTERN_LENGTH: usize = 4;

/// Longest substring considered
pub const DEFAULT_MAX_PATTERN_LENGTH: usize = 32;

/// Increment between candidate lengths
pub const DEFAULT_PATTERN_LENGTH_STEP: usize = 2;

/// Distinct substrings tracked while scanning
pub const DEFAULT_MAX_TRACKED: usize = 256;

/// Candidates retained after ranking
pub const DEFAULT_MAX_PATTERNS: usize = 64;

/// Buffer length divisor that sets the scan stride
pub const DEFAULT_SAMPLE_TARGET: usize = 10_000;

/// Savings threshold a candidate must exceed to be kept
const MIN_SAVINGS: usize = 5;

/// A repeated substring found by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternCandidate {
    /// Literal bytes of the substring
    #[serde(serialize_with = "serialize_hex")]
    pub bytes: Vec<u8>,
    /// Sampled occurrence count
    pub occurrences: usize,
}

impl PatternCandidate {
    fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            occurrences: 1,
        }
    }

    /// Substring length in bytes
    pub fn length(&self) -> usize {
        self.bytes.len()
    }

    /// Bytes saved per substitution: the raw bytes minus a 2-byte reference,
    /// counted the way the ranking expects (`length * 2 - 2`).
    pub fn estimated_savings(&self) -> usize {
        (self.bytes.len() * 2).saturating_sub(2)
    }

    /// Hex identity of the substring
    pub fn key(&self) -> String {
        hex::encode(&self.bytes)
    }
}

fn serialize_hex<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// Frequency-based pattern discovery
#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    /// Shortest candidate length
    pub min_length: usize,
    /// Longest candidate length (inclusive)
    pub max_length: usize,
    /// Increment between candidate lengths
    pub length_step: usize,
    /// Maximum distinct substrings remembered during the scan
    pub max_tracked: usize,
    /// Maximum candidates returned
    pub max_patterns: usize,
    /// Divisor for the scan stride
    pub sample_target: usize,
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_PATTERN_LENGTH,
            max_length: DEFAULT_MAX_PATTERN_LENGTH,
            length_step: DEFAULT_PATTERN_LENGTH_STEP,
            max_tracked: DEFAULT_MAX_TRACKED,
            max_patterns: DEFAULT_MAX_PATTERNS,
            sample_target: DEFAULT_SAMPLE_TARGET,
        }
    }
}

impl PatternAnalyzer {
    /// Create analyzer with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset stride used for a buffer of `len` bytes
    pub fn stride(&self, len: usize) -> usize {
        (len / self.sample_target.max(1)).max(1)
    }

    /// Scan `data` and return ranked candidates.
    ///
    /// The result is sorted by estimated savings, highest first; ties keep
    /// discovery order (shorter lengths and earlier offsets first). Position
    /// in the returned list is the pattern id used by the token codec.
    pub fn analyze(&self, data: &[u8]) -> Vec<PatternCandidate> {
        let step = self.stride(data.len());
        let mut index: HashMap<&[u8], usize> = HashMap::new();
        let mut candidates: Vec<PatternCandidate> = Vec::new();

        let mut length = self.min_length.max(1);
        while length <= self.max_length {
            let mut pos = 0;
            // Windows ending exactly at the buffer end are not sampled.
            while pos + length < data.len() {
                let window = &data[pos..pos + length];
                if let Some(&slot) = index.get(window) {
                    candidates[slot].occurrences += 1;
                } else if candidates.len() < self.max_tracked {
                    index.insert(window, candidates.len());
                    candidates.push(PatternCandidate::new(window));
                }
                pos += step;
            }
            length += self.length_step.max(1);
        }

        let tracked = candidates.len();
        candidates.retain(|c| c.occurrences > 1 && c.estimated_savings() > MIN_SAVINGS);
        candidates.sort_by(|a, b| b.estimated_savings().cmp(&a.estimated_savings()));
        candidates.truncate(self.max_patterns);

        tracing::debug!(
            input = data.len(),
            step,
            tracked,
            kept = candidates.len(),
            "pattern analysis complete"
        );

        candidates
    }
}
