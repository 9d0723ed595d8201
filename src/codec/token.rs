//! Escape-coded token stream.
//!
//! # Wire Format
//!
//! ```text
//! [magic: 4 = "KOLI"] [token]*
//!
//! token := b              literal byte, b != 0xFF
//!        | 0xFF 0xFF      one literal 0xFF
//!        | 0xFF id        pattern reference, id != 0xFF
//! ```
//!
//! Pattern ids index into a [`PatternTable`]. Matching is greedy: at each
//! position the first pattern in table order that matches wins, so table
//! order is part of the contract between encoder and decoder.

use super::analyzer::PatternCandidate;
use crate::error::{KolibriError, Result};

/// Token stream marker ("KOLI")
pub const TOKEN_MAGIC: [u8; 4] = [0x4B, 0x4F, 0x4C, 0x49];

/// Byte that introduces an escape or a pattern reference
pub const SENTINEL: u8 = 0xFF;

/// Largest table that still leaves the sentinel free as an id
pub const MAX_TABLE_SIZE: usize = SENTINEL as usize;

/// Ordered pattern table; a pattern's id is its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternTable {
    patterns: Vec<Vec<u8>>,
}

impl PatternTable {
    /// Create a table from literal byte sequences in id order
    pub fn new(patterns: Vec<Vec<u8>>) -> Result<Self> {
        if patterns.len() > MAX_TABLE_SIZE {
            return Err(KolibriError::Format(format!(
                "Pattern table too large: {} > {}",
                patterns.len(),
                MAX_TABLE_SIZE
            )));
        }
        if let Some(id) = patterns.iter().position(Vec::is_empty) {
            return Err(KolibriError::Format(format!("Pattern {id} is empty")));
        }
        Ok(Self { patterns })
    }

    /// Build a table from ranked analyzer output
    pub fn from_candidates(candidates: &[PatternCandidate]) -> Result<Self> {
        Self::new(candidates.iter().map(|c| c.bytes.clone()).collect())
    }

    /// Rebuild a table from hex-encoded patterns
    pub fn from_hex<S: AsRef<str>>(encoded: &[S]) -> Result<Self> {
        let patterns = encoded
            .iter()
            .enumerate()
            .map(|(id, s)| {
                hex::decode(s.as_ref())
                    .map_err(|e| KolibriError::Format(format!("Pattern {id} is not valid hex: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(patterns)
    }

    /// Hex-encode patterns in id order
    pub fn to_hex(&self) -> Vec<String> {
        self.patterns.iter().map(hex::encode).collect()
    }

    /// Number of patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True when the table holds no patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Drop every pattern with id `len` or above
    pub fn truncate(&mut self, len: usize) {
        self.patterns.truncate(len);
    }

    /// Pattern bytes for `id`
    pub fn get(&self, id: u8) -> Option<&[u8]> {
        self.patterns.get(id as usize).map(Vec::as_slice)
    }

    /// First pattern (in id order) that prefixes `input`
    fn match_at(&self, input: &[u8]) -> Option<(u8, usize)> {
        let lead = *input.first()?;
        self.patterns
            .iter()
            .position(|p| p[0] == lead && input.starts_with(p))
            .map(|id| (id as u8, self.patterns[id].len()))
    }
}

/// Largest token stream an input of `original` bytes can encode to
/// (every byte an escaped sentinel).
pub fn max_stream_len(original: u64) -> u64 {
    TOKEN_MAGIC.len() as u64 + original.saturating_mul(2)
}

/// Encode `data` into a token stream using `table`.
pub fn encode_tokens(data: &[u8], table: &PatternTable) -> Vec<u8> {
    encode_tokens_with_usage(data, table).0
}

/// Encode `data` and report how many leading table entries the stream
/// needs (highest referenced id + 1, or 0 without references).
pub fn encode_tokens_with_usage(data: &[u8], table: &PatternTable) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(TOKEN_MAGIC.len() + data.len() + data.len() / 16);
    out.extend_from_slice(&TOKEN_MAGIC);

    let mut pos = 0;
    let mut references = 0usize;
    let mut used = 0usize;
    while pos < data.len() {
        if let Some((id, len)) = table.match_at(&data[pos..]) {
            out.push(SENTINEL);
            out.push(id);
            pos += len;
            references += 1;
            used = used.max(id as usize + 1);
            continue;
        }

        let byte = data[pos];
        if byte == SENTINEL {
            out.push(SENTINEL);
        }
        out.push(byte);
        pos += 1;
    }

    tracing::debug!(
        input = data.len(),
        output = out.len(),
        references,
        used,
        "token stream encoded"
    );
    (out, used)
}

/// Decode a full token stream, marker included.
pub fn decode_tokens(stream: &[u8], table: &PatternTable) -> Result<Vec<u8>> {
    let body = stream.strip_prefix(&TOKEN_MAGIC[..]).ok_or_else(|| {
        KolibriError::Format("Token stream is missing the KOLI marker".to_string())
    })?;
    decode_body(body, table)
}

/// Decode token bytes that follow the marker.
///
/// A trailing lone sentinel is dropped.
pub fn decode_body(body: &[u8], table: &PatternTable) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len() * 2);
    let mut pos = 0;

    while pos < body.len() {
        let byte = body[pos];
        if byte != SENTINEL {
            out.push(byte);
            pos += 1;
            continue;
        }

        match body.get(pos + 1) {
            Some(&SENTINEL) => out.push(SENTINEL),
            Some(&id) => {
                let pattern = table.get(id).ok_or(KolibriError::InternalEncoding {
                    id,
                    table_len: table.len(),
                })?;
                out.extend_from_slice(pattern);
            },
            None => break,
        }
        pos += 2;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(patterns: &[&[u8]]) -> PatternTable {
        PatternTable::new(patterns.iter().map(|p| p.to_vec()).collect()).unwrap()
    }

    #[test]
    fn test_empty_input_is_marker_only() {
        let encoded = encode_tokens(&[], &PatternTable::default());
        assert_eq!(encoded, TOKEN_MAGIC);
        assert!(decode_tokens(&encoded, &PatternTable::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_literals_without_patterns() {
        let data = [0x01u8, 0x02, 0x03, 0x04];
        let encoded = encode_tokens(&data, &PatternTable::default());

        assert_eq!(&encoded[..4], &TOKEN_MAGIC);
        assert_eq!(&encoded[4..], &data);
    }

    #[test]
    fn test_sentinel_is_escaped() {
        let data = [0x41u8, 0xFF, 0x42];
        let encoded = encode_tokens(&data, &PatternTable::default());

        assert_eq!(&encoded[4..], &[0x41u8, 0xFF, 0xFF, 0x42]);
        assert_eq!(
            decode_tokens(&encoded, &PatternTable::default()).unwrap(),
            data
        );
    }

    #[test]
    fn test_pattern_reference() {
        let t = table(&[b"hello"]);
        let encoded = encode_tokens(b"hello, hello!", &t);

        assert_eq!(
            &encoded[4..],
            &[0xFFu8, 0x00, b',', b' ', 0xFF, 0x00, b'!']
        );
        assert_eq!(decode_tokens(&encoded, &t).unwrap(), b"hello, hello!");
    }

    #[test]
    fn test_usage_stops_at_highest_reference() {
        let mut t = table(&[b"zzzz", b"abc", b"qqqq", b"rrrr"]);
        let data = b"abc-abc-plain";

        let (encoded, used) = encode_tokens_with_usage(data, &t);
        assert_eq!(used, 2);

        t.truncate(used);
        assert_eq!(t.len(), 2);
        assert_eq!(decode_tokens(&encoded, &t).unwrap(), data);

        let (_, none) = encode_tokens_with_usage(b"plain", &t);
        assert_eq!(none, 0);
    }

    #[test]
    fn test_max_stream_len_bounds_sentinel_runs() {
        let data = vec![SENTINEL; 300];
        let encoded = encode_tokens(&data, &PatternTable::default());
        assert_eq!(encoded.len() as u64, max_stream_len(data.len() as u64));
    }

    #[test]
    fn test_first_match_wins_over_longest() {
        // "abcd" ranks first, so "abcdef" is never used at position 0.
        let t = table(&[b"abcd", b"abcdef"]);
        let encoded = encode_tokens(b"abcdef", &t);

        assert_eq!(&encoded[4..], &[0xFFu8, 0x00, b'e', b'f']);
        assert_eq!(decode_tokens(&encoded, &t).unwrap(), b"abcdef");
    }

    #[test]
    fn test_pattern_containing_sentinel() {
        let t = table(&[&[0xFF, 0xFF, 0xFF, 0xFF]]);
        let data = [0xFFu8; 5];
        let encoded = encode_tokens(&data, &t);

        assert_eq!(&encoded[4..], &[0xFFu8, 0x00, 0xFF, 0xFF]);
        assert_eq!(decode_tokens(&encoded, &t).unwrap(), data);
    }

    #[test]
    fn test_unknown_id_is_rejected() {
        let t = table(&[b"abcd"]);
        let err = decode_body(&[0x61, 0xFF, 0x05], &t).unwrap_err();

        assert!(matches!(
            err,
            KolibriError::InternalEncoding {
                id: 5,
                table_len: 1
            }
        ));
    }

    #[test]
    fn test_trailing_sentinel_dropped() {
        let decoded = decode_body(&[0x61, 0x62, 0xFF], &PatternTable::default()).unwrap();
        assert_eq!(decoded, b"ab");
    }

    #[test]
    fn test_missing_marker() {
        let err = decode_tokens(b"KOL", &PatternTable::default()).unwrap_err();
        assert!(matches!(err, KolibriError::Format(_)));
    }

    #[test]
    fn test_table_hex_roundtrip() {
        let t = table(&[b"abcd", &[0x00, 0xFF, 0x10, 0x20]]);
        let hex = t.to_hex();

        assert_eq!(hex, vec!["61626364".to_string(), "00ff1020".to_string()]);
        assert_eq!(PatternTable::from_hex(&hex).unwrap(), t);
    }

    #[test]
    fn test_table_rejects_bad_entries() {
        assert!(PatternTable::new(vec![Vec::new()]).is_err());
        assert!(PatternTable::new(vec![vec![1]; 256]).is_err());
        assert!(PatternTable::from_hex(&["zz"]).is_err());
    }
}
