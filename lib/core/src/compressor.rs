//! Lossless compressors used as a proxy for Kolmogorov complexity.

use crate::{Error, Result};
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

/// Default compression level (zlib's own default).
pub const DEFAULT_LEVEL: u32 = 6;

/// Anything that can report the compressed size of a byte string.
pub trait Compressor: Send + Sync {
    fn name(&self) -> &str;

    fn compressed_len(&self, data: &[u8]) -> Result<usize>;
}

/// Built-in compressor families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressorKind {
    #[default]
    Zlib,
    Gzip,
    Deflate,
}

impl CompressorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressorKind::Zlib => "zlib",
            CompressorKind::Gzip => "gzip",
            CompressorKind::Deflate => "deflate",
        }
    }

    /// Build a shareable compressor at `level` (0-9).
    pub fn build(self, level: u32) -> Result<Arc<dyn Compressor>> {
        if level > 9 {
            return Err(Error::InvalidConfig(format!(
                "compression level must be in 0..=9, got {}",
                level
            )));
        }
        Ok(Arc::new(FlateCompressor { kind: self, level }))
    }
}

impl fmt::Display for CompressorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "zlib" => Ok(CompressorKind::Zlib),
            "gzip" | "gz" => Ok(CompressorKind::Gzip),
            "deflate" => Ok(CompressorKind::Deflate),
            other => Err(Error::InvalidConfig(format!("unknown compressor: {}", other))),
        }
    }
}

/// flate2-backed compressor for the zlib, gzip and raw deflate containers.
#[derive(Debug, Clone)]
pub struct FlateCompressor {
    kind: CompressorKind,
    level: u32,
}

impl FlateCompressor {
    pub fn new(kind: CompressorKind, level: u32) -> Self {
        Self { kind, level }
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for FlateCompressor {
    fn default() -> Self {
        Self::new(CompressorKind::Zlib, DEFAULT_LEVEL)
    }
}

impl Compressor for FlateCompressor {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn compressed_len(&self, data: &[u8]) -> Result<usize> {
        let level = Compression::new(self.level);
        let capacity = data.len() / 2 + 64;
        let out = match self.kind {
            CompressorKind::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::with_capacity(capacity), level);
                encoder.write_all(data).map_err(compression_failure)?;
                encoder.finish().map_err(compression_failure)?
            }
            CompressorKind::Gzip => {
                let mut encoder = GzEncoder::new(Vec::with_capacity(capacity), level);
                encoder.write_all(data).map_err(compression_failure)?;
                encoder.finish().map_err(compression_failure)?
            }
            CompressorKind::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::with_capacity(capacity), level);
                encoder.write_all(data).map_err(compression_failure)?;
                encoder.finish().map_err(compression_failure)?
            }
        };
        Ok(out.len())
    }
}

fn compression_failure(e: std::io::Error) -> Error {
    Error::CompressionFailure(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("zlib".parse::<CompressorKind>().unwrap(), CompressorKind::Zlib);
        assert_eq!("GZIP".parse::<CompressorKind>().unwrap(), CompressorKind::Gzip);
        assert!("bz2".parse::<CompressorKind>().is_err());
    }

    #[test]
    fn test_invalid_level() {
        assert!(matches!(
            CompressorKind::Zlib.build(12),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_container_overheads() {
        let data = b"1,2,3,4,5,6,7,8,9,10";
        let zlib = FlateCompressor::new(CompressorKind::Zlib, 6).compressed_len(data).unwrap();
        let gzip = FlateCompressor::new(CompressorKind::Gzip, 6).compressed_len(data).unwrap();
        let raw = FlateCompressor::new(CompressorKind::Deflate, 6).compressed_len(data).unwrap();
        // zlib adds a 2-byte header and 4-byte trailer, gzip 10 + 8
        assert_eq!(zlib, raw + 6);
        assert_eq!(gzip, raw + 18);
    }

    #[test]
    fn test_repetitive_data_compresses() {
        let data = "1,2,3,".repeat(500);
        let len = FlateCompressor::default().compressed_len(data.as_bytes()).unwrap();
        assert!(len < data.len() / 10);
    }
}
