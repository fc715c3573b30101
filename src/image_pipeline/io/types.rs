//! Output encoding configuration types

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression (slow, good compression)
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - best compression (slower)
    DeflateBest,
    /// Deflate compression - balanced
    DeflateBalanced,
}

/// Sample depth of encoded output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Eight,
    Sixteen,
}

/// Configuration for writing restored images and intermediate maps
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Compression method to use (TIFF only)
    pub compression: TiffCompression,
    /// Predictor value for compression (typically 2 for horizontal differencing)
    pub predictor: Option<u16>,
    /// Sample depth (PNG output is always 8-bit)
    pub bit_depth: BitDepth,
    /// Whether dark channel and transmission maps are written next to the result
    pub write_intermediates: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::None,
            predictor: None,
            bit_depth: BitDepth::Sixteen,
            write_intermediates: false,
        }
    }
}

impl WriterConfig {
    pub fn builder() -> WriterConfigBuilder {
        WriterConfigBuilder::default()
    }
}

/// Builder for WriterConfig
#[derive(Default)]
pub struct WriterConfigBuilder {
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
    bit_depth: Option<BitDepth>,
    write_intermediates: Option<bool>,
}

impl WriterConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn bit_depth(mut self, depth: BitDepth) -> Self {
        self.bit_depth = Some(depth);
        self
    }

    pub fn write_intermediates(mut self, enable: bool) -> Self {
        self.write_intermediates = Some(enable);
        self
    }

    pub fn build(self) -> WriterConfig {
        let default = WriterConfig::default();
        WriterConfig {
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
            bit_depth: self.bit_depth.unwrap_or(default.bit_depth),
            write_intermediates: self.write_intermediates.unwrap_or(default.write_intermediates),
        }
    }
}
