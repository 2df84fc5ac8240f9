use std::io;

use thiserror::Error;

/// Errors returned while decoding, editing or encoding a bitmap.
#[derive(Debug, Error)]
pub enum BMPError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("I/O error: {0}")]
    IO(#[from] io::Error),
}

/// The input is not a BMP this crate can represent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("wrong magic numbers: expected \"BM\", found {0:02x?}")]
    BadMagic([u8; 2]),

    #[error("unsupported DIB header size {0}, only the 40 byte BITMAPINFOHEADER is supported")]
    UnsupportedHeaderVariant(u32),

    #[error("unsupported {field}: expected {expected}, found {found}")]
    UnsupportedPixelFormat {
        field: &'static str,
        expected: &'static str,
        found: i64,
    },

    #[error("unsupported compression method {0}, only uncompressed (0) is supported")]
    UnsupportedCompression(u32),

    #[error("pixel array offset {offset} outside of {min}..={max}")]
    PixelOffsetOutOfRange { offset: u32, min: u32, max: u32 },

    #[error("truncated buffer: need {needed} header bytes, got {actual}")]
    TruncatedBuffer { needed: usize, actual: usize },

    #[error("truncated pixel data: need {needed} bytes, got {actual}")]
    TruncatedPixelData { needed: usize, actual: usize },
}

/// A caller supplied a value the bitmap cannot hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("{channel} value {value} out of range 0..=255")]
    OutOfRange { channel: &'static str, value: i32 },

    #[error("pixel ({x}, {y}) outside of {width}x{height} bitmap")]
    CoordinatesOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

pub type Result<T> = std::result::Result<T, BMPError>;
