use crate::bmp_header::BYTES_PER_PIXEL;
use crate::error::{BMPError, Result};

/// Upper bounds a decoded bitmap must stay within.
///
/// `Limits::default()` accepts any image the format can describe.
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    pub max_pixels: Option<u64>,
    /// Bound on the unpadded pixel grid, `width * 3 * height` bytes.
    pub max_memory_bytes: Option<u64>,
}

fn exceeds(what: &str, value: u64, limit: Option<u64>) -> Result<()> {
    match limit {
        Some(max) if value > max => {
            Err(BMPError::LimitExceeded(format!("{} is {}, limit is {}", what, value, max)))
        },
        _ => Ok(()),
    }
}

impl Limits {
    /// Runs before the pixel grid is allocated.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<()> {
        let pixels = u64::from(width) * u64::from(height);

        exceeds("width", width.into(), self.max_width)?;
        exceeds("height", height.into(), self.max_height)?;
        exceeds("pixel count", pixels, self.max_pixels)?;
        exceeds("grid size in bytes", pixels.saturating_mul(BYTES_PER_PIXEL as u64), self.max_memory_bytes)
    }
}
