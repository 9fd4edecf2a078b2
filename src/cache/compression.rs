//! Compression Module
//!
//! Gzip codec applied to serialized payloads above the size threshold.

use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Reversible byte codec used by the store.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    level: Compression,
}

impl Default for Compressor {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl Compressor {
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level),
        }
    }

    /// Compress data using gzip
    pub fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder.write_all(data)?;
        encoder.finish()
    }

    /// Decompress gzip-compressed data
    pub fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}
