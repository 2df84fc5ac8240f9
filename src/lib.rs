//! Read, edit and write uncompressed 24 bit Windows bitmaps.
//!
//! A [`Bitmap`] decoded from a file re-serializes to the identical bytes as
//! long as no pixel was changed. Trailing bytes after the pixel array are the
//! exception: they are dropped.
//!
//! ```no_run
//! use bmp24::Bitmap;
//!
//! # fn main() -> bmp24::Result<()> {
//! let mut bitmap = Bitmap::open("input.bmp")?;
//! for mut px in bitmap.enumerate_pixels_mut() {
//!     let (b, g, r) = px.pixel_data();
//!     let lighten = |c: u8| (i32::from(c) + 40).min(255);
//!     px.update_pixel_data((lighten(b), lighten(g), lighten(r)))?;
//! }
//! bitmap.save_as("output.bmp")?;
//! # Ok(())
//! # }
//! ```

mod bitmap;
mod bmp_header;
mod bmp_pixels;
mod error;
mod limits;

pub use crate::bitmap::Bitmap;
pub use crate::bmp_header::{encode_headers, row_stride, BMPHeader, FileHeader, InfoHeader, RowOrder,
                            BITS_PER_PIXEL, BYTES_PER_PIXEL, FILE_HEADER_SIZE, HEADER_SIZE,
                            INFO_HEADER_SIZE};
pub use crate::bmp_pixels::{Bgr, Pixel, PixelMut, Pixels, PixelsMut};
pub use crate::error::{BMPError, FormatError, Result, ValueError};
pub use crate::limits::Limits;
