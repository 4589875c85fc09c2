// src/transform/compress.rs

//! Byte-level encodings for the distribution tree.

use std::io::Write;

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;

/// Brotli window size (log2) and quality used for distribution files.
const BROTLI_LG_WINDOW: u32 = 22;
const BROTLI_QUALITY: u32 = 11;
const BROTLI_BUFFER: usize = 4096;

/// A compression algorithm and the suffix its output files carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Gzip,
    Brotli,
}

impl Encoding {
    pub const ALL: [Encoding; 2] = [Encoding::Gzip, Encoding::Brotli];

    pub fn extension(self) -> &'static str {
        match self {
            Encoding::Gzip => "gz",
            Encoding::Brotli => "br",
        }
    }

    pub fn encode(self, bytes: &[u8]) -> Result<Vec<u8>> {
        match self {
            Encoding::Gzip => encode_gzip(bytes),
            Encoding::Brotli => encode_brotli(bytes),
        }
    }
}

/// Gzip at maximum compression. The header carries no timestamp, so equal
/// input always yields equal output.
pub fn encode_gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes).context("gzip encoding")?;
    encoder.finish().context("finishing gzip stream")
}

pub fn encode_brotli(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut writer = brotli::CompressorWriter::new(
        Vec::new(),
        BROTLI_BUFFER,
        BROTLI_QUALITY,
        BROTLI_LG_WINDOW,
    );
    writer.write_all(bytes).context("brotli encoding")?;
    writer.flush().context("flushing brotli stream")?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;

    use super::*;

    const SAMPLE: &[u8] = b"body { margin: 0 } body { margin: 0 } body { margin: 0 }";

    #[test]
    fn gzip_decodes_back_and_is_deterministic() {
        let encoded = encode_gzip(SAMPLE).unwrap();
        assert_eq!(encoded, encode_gzip(SAMPLE).unwrap());

        let mut decoded = Vec::new();
        GzDecoder::new(encoded.as_slice())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, SAMPLE);
    }

    #[test]
    fn brotli_decodes_back() {
        let encoded = encode_brotli(SAMPLE).unwrap();
        let mut decoded = Vec::new();
        brotli::Decompressor::new(encoded.as_slice(), 4096)
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, SAMPLE);
    }

    #[test]
    fn empty_input_still_produces_a_stream() {
        for encoding in Encoding::ALL {
            assert!(!encoding.encode(b"").unwrap().is_empty(), "{encoding:?}");
        }
    }
}
