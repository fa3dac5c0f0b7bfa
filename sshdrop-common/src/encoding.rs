//! Base64 encoding and fixed-size chunking of upload payloads.
//!
//! The payload is encoded once into standard padded base64. Chunks are plain
//! slices of that text, so the remote side only has to concatenate them in
//! order before decoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::DropError;

/// Chunk size used by default, in encoded characters.
pub const DEFAULT_CHUNK_SIZE: usize = 20_000;

/// Encoded form of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Length of the raw source in bytes.
    pub source_len: u64,
    /// Base64 text of the source.
    pub text: String,
}

impl EncodedPayload {
    /// Length of the encoded text in characters.
    pub fn encoded_len(&self) -> usize {
        self.text.len()
    }

    /// Iterate over fixed-size slices of the encoded text.
    pub fn chunks(&self, chunk_size: usize) -> Result<ChunkIter<'_>, DropError> {
        if chunk_size == 0 {
            return Err(DropError::InvalidChunkSize(chunk_size));
        }
        Ok(ChunkIter {
            text: &self.text,
            chunk_size,
            index: 0,
            total: chunk_count(self.text.len(), chunk_size),
        })
    }
}

/// One slice of encoded text, tagged with its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Chunk<'a> {
    /// Zero-based position of this chunk.
    pub index: usize,
    /// Total number of chunks in the payload.
    pub total: usize,
    /// Length of the encoded text preceding this chunk.
    pub offset: usize,
    /// The encoded characters carried by this chunk.
    pub text: &'a str,
}

impl Chunk<'_> {
    /// One-based position, as shown in progress output.
    pub fn ordinal(&self) -> usize {
        self.index + 1
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }
}

/// Iterator returned by [`EncodedPayload::chunks`].
#[derive(Debug, Clone)]
pub struct ChunkIter<'a> {
    text: &'a str,
    chunk_size: usize,
    index: usize,
    total: usize,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total {
            return None;
        }
        let start = self.index * self.chunk_size;
        let end = (start + self.chunk_size).min(self.text.len());
        // Base64 output is ASCII, so any byte offset is a char boundary.
        let chunk = Chunk {
            index: self.index,
            total: self.total,
            offset: start,
            text: &self.text[start..end],
        };
        self.index += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkIter<'_> {}

/// Encode raw bytes into standard padded base64.
pub fn encode(bytes: &[u8]) -> EncodedPayload {
    EncodedPayload {
        source_len: bytes.len() as u64,
        text: STANDARD.encode(bytes),
    }
}

/// Decode standard padded base64 back into bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, DropError> {
    STANDARD
        .decode(text.as_bytes())
        .map_err(|e| DropError::Decode(e.to_string()))
}

/// Number of chunks needed for `encoded_len` characters.
///
/// Returns 0 for empty input.
pub fn chunk_count(encoded_len: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    encoded_len.div_ceil(chunk_size)
}

/// Length of the final chunk: the remainder, or a full chunk when the text
/// divides evenly.
pub fn last_chunk_len(encoded_len: usize, chunk_size: usize) -> usize {
    if encoded_len == 0 || chunk_size == 0 {
        return 0;
    }
    match encoded_len % chunk_size {
        0 => chunk_size,
        rem => rem,
    }
}

/// Number of base64 characters produced for `source_len` raw bytes.
pub fn encoded_len_for(source_len: u64) -> u64 {
    source_len.div_ceil(3) * 4
}

/// Hex-encoded SHA-256 of `data`, matching `sha256sum` output.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_known_value() {
        let payload = encode(b"hello world");
        assert_eq!(payload.text, "aGVsbG8gd29ybGQ=");
        assert_eq!(payload.source_len, 11);
        assert_eq!(payload.encoded_len(), 16);
    }

    #[test]
    fn test_empty_payload_has_no_chunks() {
        let payload = encode(b"");
        assert_eq!(payload.text, "");
        assert_eq!(payload.chunks(10).unwrap().count(), 0);
        assert_eq!(chunk_count(0, 10), 0);
        assert_eq!(last_chunk_len(0, 10), 0);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let payload = encode(b"abc");
        let err = payload.chunks(0).unwrap_err();
        assert!(matches!(err, DropError::InvalidChunkSize(0)));
    }

    #[test]
    fn test_chunk_positions() {
        let payload = encode(&[7u8; 30]); // 40 encoded chars
        let chunks: Vec<_> = payload.chunks(16).unwrap().collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].ordinal(), 1);
        assert_eq!(chunks[2].total, 3);
        assert!(chunks[2].is_last());
        assert!(!chunks[1].is_last());
        assert_eq!(chunks[2].text.len(), 8);
    }

    #[test]
    fn test_evenly_divisible_last_chunk_is_full() {
        assert_eq!(chunk_count(40, 20), 2);
        assert_eq!(last_chunk_len(40, 20), 20);
        assert_eq!(last_chunk_len(41, 20), 1);
    }

    #[test]
    fn test_size_hint_is_exact() {
        let payload = encode(&[1u8; 300]);
        let mut iter = payload.chunks(100).unwrap();
        assert_eq!(iter.len(), 4);
        iter.next();
        assert_eq!(iter.len(), 3);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not base64!!").is_err());
    }

    #[test]
    fn test_sha256_matches_sha256sum() {
        // printf 'abc' | sha256sum
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    proptest! {
        #[test]
        fn prop_chunks_reassemble_to_source(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            chunk_size in 1usize..300,
        ) {
            let payload = encode(&data);
            let chunks: Vec<_> = payload.chunks(chunk_size).unwrap().collect();

            prop_assert_eq!(chunks.len(), chunk_count(payload.encoded_len(), chunk_size));
            if let Some(last) = chunks.last() {
                prop_assert_eq!(last.text.len(), last_chunk_len(payload.encoded_len(), chunk_size));
            }
            for chunk in &chunks[..chunks.len().saturating_sub(1)] {
                prop_assert_eq!(chunk.text.len(), chunk_size);
            }

            let joined: String = chunks.iter().map(|c| c.text).collect();
            prop_assert_eq!(decode(&joined).unwrap(), data);
        }

        #[test]
        fn prop_encoded_len_prediction(len in 0u64..10_000) {
            let data = vec![0u8; len as usize];
            prop_assert_eq!(encode(&data).encoded_len() as u64, encoded_len_for(len));
        }
    }
}
