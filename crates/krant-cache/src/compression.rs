//! Transparent payload compression above `compression_threshold` (C11, §4.11).
//!
//! Redis has no notion of "this value is gzipped"; the first byte of every
//! stored payload is a self-describing flag so `get` can tell whether to
//! inflate before handing bytes back to the caller.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use krant_types::error::{KrantError, Result};

const FLAG_RAW: u8 = 0;
const FLAG_GZIP: u8 = 1;

/// Compresses `value` when it exceeds `threshold` bytes, prefixing the
/// result with a one-byte flag so [`decode`] can tell raw from gzipped.
pub fn encode(value: &[u8], threshold: usize) -> Result<Vec<u8>> {
    if value.len() <= threshold {
        let mut out = Vec::with_capacity(value.len() + 1);
        out.push(FLAG_RAW);
        out.extend_from_slice(value);
        return Ok(out);
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(value)
        .map_err(|e| KrantError::Storage(format!("gzip compress: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| KrantError::Storage(format!("gzip compress: {e}")))?;

    let mut out = Vec::with_capacity(compressed.len() + 1);
    out.push(FLAG_GZIP);
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Reverses [`encode`], inflating the payload if its flag byte says so.
pub fn decode(stored: &[u8]) -> Result<Vec<u8>> {
    let (flag, body) = stored
        .split_first()
        .ok_or_else(|| KrantError::Decode("empty cache payload".into()))?;

    match *flag {
        FLAG_RAW => Ok(body.to_vec()),
        FLAG_GZIP => {
            let mut decoder = GzDecoder::new(body);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| KrantError::Decode(format!("gzip decompress: {e}")))?;
            Ok(out)
        }
        other => Err(KrantError::Decode(format!(
            "unknown cache payload flag {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_are_stored_raw() {
        let encoded = encode(b"short", 1024).unwrap();
        assert_eq!(encoded[0], FLAG_RAW);
        assert_eq!(decode(&encoded).unwrap(), b"short");
    }

    #[test]
    fn large_values_round_trip_through_gzip() {
        let value = vec![b'x'; 4096];
        let encoded = encode(&value, 1024).unwrap();
        assert_eq!(encoded[0], FLAG_GZIP);
        assert!(encoded.len() < value.len());
        assert_eq!(decode(&encoded).unwrap(), value);
    }
}
