use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::Arc;
use thiserror::Error;

/// Codes of the built-in compressors as carried in `compressor_code`.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
pub enum CompressorCode {
    None = 0,
    Gzip = 1,
}

#[derive(Debug, Error)]
pub enum CompressorError {
    #[error("unknown compressor")]
    UnknownCompressor(u8),

    #[error("compression failed: {0}")]
    Io(#[from] io::Error),
}

/// Transforms serialized payload bytes before they go on the wire.
pub trait Compressor: Send + Sync + 'static {
    fn code(&self) -> u8;

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressorError>;

    fn uncompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressorError>;
}

/// Passes bytes through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompressor;

impl Compressor for NoopCompressor {
    fn code(&self) -> u8 {
        CompressorCode::None.into()
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressorError> {
        Ok(data.to_vec())
    }

    fn uncompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressorError> {
        Ok(data.to_vec())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GzipCompressor {
    level: Compression,
}

impl GzipCompressor {
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level),
        }
    }
}

impl Compressor for GzipCompressor {
    fn code(&self) -> u8 {
        CompressorCode::Gzip.into()
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressorError> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), self.level);
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn uncompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressorError> {
        let mut out = Vec::with_capacity(data.len() * 2);
        GzDecoder::new(data).read_to_end(&mut out)?;
        Ok(out)
    }
}

/// Compressors known to one side of a connection, keyed by code.
///
/// The no-op compressor is always present.
#[derive(Clone)]
pub struct CompressorRegistry {
    compressors: HashMap<u8, Arc<dyn Compressor>>,
}

impl Default for CompressorRegistry {
    fn default() -> Self {
        Self::new().with(GzipCompressor::default())
    }
}

impl CompressorRegistry {
    /// A registry holding only the no-op compressor.
    pub fn new() -> Self {
        let noop: Arc<dyn Compressor> = Arc::new(NoopCompressor);
        Self {
            compressors: HashMap::from([(noop.code(), noop)]),
        }
    }

    /// Adds (or replaces) the compressor registered under its code.
    pub fn with<C: Compressor>(mut self, compressor: C) -> Self {
        self.compressors
            .insert(compressor.code(), Arc::new(compressor));
        self
    }

    pub fn get(&self, code: u8) -> Result<&Arc<dyn Compressor>, CompressorError> {
        self.compressors
            .get(&code)
            .ok_or(CompressorError::UnknownCompressor(code))
    }

    pub fn compress(&self, code: u8, data: &[u8]) -> Result<Vec<u8>, CompressorError> {
        self.get(code)?.compress(data)
    }

    pub fn uncompress(&self, code: u8, data: &[u8]) -> Result<Vec<u8>, CompressorError> {
        self.get(code)?.uncompress(data)
    }
}

impl std::fmt::Debug for CompressorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut codes: Vec<_> = self.compressors.keys().collect();
        codes.sort();
        f.debug_struct("CompressorRegistry")
            .field("codes", &codes)
            .finish()
    }
}
