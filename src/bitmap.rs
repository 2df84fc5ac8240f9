use log::{debug, trace, warn};
use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::bmp_header::{self, BMPHeader, FileHeader, InfoHeader, RowOrder, BITS_PER_PIXEL,
                        BYTES_PER_PIXEL, HEADER_SIZE};
use crate::bmp_pixels::{checked_bgr, Bgr, Pixel, PixelMut, Pixels, PixelsMut};
use crate::error::{BMPError, FormatError, Result, ValueError};
use crate::limits::Limits;

/// A decoded 24 bit BMP image.
///
/// Rows are kept in file storage order with their padding stripped; all
/// public coordinates are top-down, with y = 0 the top row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    file: FileHeader,
    info: InfoHeader,
    /* Bytes between the end of the info header and the pixel array. */
    gap: Vec<u8>,
    data: Vec<u8>,
}

impl Bitmap {
    /// A black `width` x `height` image, stored bottom-up.
    pub fn new(width: u32, height: u32) -> Result<Bitmap> {
        let info = InfoHeader::new(width, height)?;
        let len = info.abs_width() as usize * BYTES_PER_PIXEL * info.abs_height() as usize;
        let file_size = HEADER_SIZE
            .checked_add(info.image_size)
            .ok_or(BMPError::DimensionsTooLarge { width, height })?;
        let file = FileHeader {
            file_size,
            reserved: 0,
            pixel_offset: HEADER_SIZE,
        };

        Ok(Bitmap {
            file,
            info,
            gap: Vec::new(),
            data: vec![0; len],
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Bitmap> {
        Bitmap::from_bytes_with_limits(bytes, &Limits::default())
    }

    pub fn from_bytes_with_limits(bytes: &[u8], limits: &Limits) -> Result<Bitmap> {
        let header = BMPHeader::from_bytes(bytes)?;
        let width = header.info.abs_width();
        let height = header.info.abs_height();

        limits.check(width, height)?;

        let pixel_array_len = header.info.pixel_array_len()?;
        let row_len = width as usize * BYTES_PER_PIXEL;

        /* The offset itself may already lie past the end of a cut-off file. */
        let pixel_end = header
            .pixel_offset
            .checked_add(pixel_array_len)
            .ok_or(BMPError::DimensionsTooLarge { width, height })?;
        if bytes.len() < pixel_end {
            return Err(FormatError::TruncatedPixelData {
                needed: pixel_end,
                actual: bytes.len(),
            }
            .into());
        }

        if bytes.len() > pixel_end {
            warn!("ignoring {} trailing bytes after the pixel array", bytes.len() - pixel_end);
        }

        let pixels = &bytes[header.pixel_offset..pixel_end];
        let mut data = Vec::with_capacity(row_len * height as usize);
        for row in pixels.chunks_exact(header.row_stride) {
            data.extend_from_slice(&row[..row_len]);
        }

        debug!("loaded {}x{} bitmap, {} bytes of pixel data", width, height, data.len());

        Ok(Bitmap {
            gap: bytes[HEADER_SIZE as usize..header.pixel_offset].to_vec(),
            file: header.file,
            info: header.info,
            data,
        })
    }

    pub fn from_reader<R: Read>(source: &mut R) -> Result<Bitmap> {
        Bitmap::from_reader_with_limits(source, &Limits::default())
    }

    pub fn from_reader_with_limits<R: Read>(source: &mut R, limits: &Limits) -> Result<Bitmap> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        Bitmap::from_bytes_with_limits(&bytes, limits)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Bitmap> {
        Bitmap::open_with_limits(path, &Limits::default())
    }

    pub fn open_with_limits<P: AsRef<Path>>(path: P, limits: &Limits) -> Result<Bitmap> {
        let bytes = fs::read(path)?;
        Bitmap::from_bytes_with_limits(&bytes, limits)
    }

    pub fn width(&self) -> u32 {
        self.info.abs_width()
    }

    pub fn height(&self) -> u32 {
        self.info.abs_height()
    }

    pub fn bits_per_pixel(&self) -> u16 {
        BITS_PER_PIXEL
    }

    pub fn bytes_per_pixel(&self) -> usize {
        BYTES_PER_PIXEL
    }

    pub fn row_order(&self) -> RowOrder {
        self.info.row_order()
    }

    /// Length of one serialized row, padding included.
    pub fn row_stride(&self) -> usize {
        /* The dimensions were validated when the bitmap was built. */
        bmp_header::row_stride(self.width()).unwrap_or(0)
    }

    pub fn file_header(&self) -> &FileHeader {
        &self.file
    }

    pub fn info_header(&self) -> &InfoHeader {
        &self.info
    }

    fn row_len(&self) -> usize {
        self.width() as usize * BYTES_PER_PIXEL
    }

    fn storage_row(&self, y: u32) -> usize {
        match self.row_order() {
            RowOrder::BottomUp => (self.height() - 1 - y) as usize,
            RowOrder::TopDown => y as usize,
        }
    }

    fn storage_offset(&self, x: u32, y: u32) -> usize {
        self.storage_row(y) * self.row_len() + x as usize * BYTES_PER_PIXEL
    }

    pub(crate) fn pixel_bytes(&self, x: u32, y: u32) -> &[u8] {
        let offset = self.storage_offset(x, y);
        &self.data[offset..offset + BYTES_PER_PIXEL]
    }

    fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height()
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(Pixel::new(self, x, y))
    }

    pub fn get_pixel_mut(&mut self, x: u32, y: u32) -> Option<PixelMut> {
        if !self.in_bounds(x, y) {
            return None;
        }
        let offset = self.storage_offset(x, y);
        Some(PixelMut::new(x, y, &mut self.data[offset..offset + BYTES_PER_PIXEL]))
    }

    /// Overwrites the pixel at logical (x, y).
    pub fn set_pixel(&mut self, x: u32, y: u32, bgr: (i32, i32, i32)) -> Result<()> {
        if !self.in_bounds(x, y) {
            return Err(ValueError::CoordinatesOutOfBounds {
                x,
                y,
                width: self.width(),
                height: self.height(),
            }
            .into());
        }

        let bytes = checked_bgr(bgr)?;
        let offset = self.storage_offset(x, y);
        self.data[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&bytes);
        Ok(())
    }

    /// Pixel value at logical (x, y), if it is inside the image.
    pub fn pixel_data(&self, x: u32, y: u32) -> Option<Bgr> {
        self.get_pixel(x, y).map(|px| px.pixel_data())
    }

    /// Every pixel, top row first, each row left to right.
    ///
    /// Each call starts a fresh pass over the current grid.
    pub fn enumerate_pixels(&self) -> Pixels {
        Pixels::new(self)
    }

    pub fn enumerate_pixels_mut(&mut self) -> PixelsMut {
        let width = self.width();
        let order = self.row_order();
        PixelsMut::new(&mut self.data, width, order)
    }

    /// Writes the complete file: headers, preserved gap bytes and re-padded
    /// rows in storage order.
    pub fn write_to<W: Write>(&self, dest: &mut W) -> Result<()> {
        let headers = bmp_header::encode_headers(&self.file, &self.info)?;
        let padding = [0u8; 3];
        let pad_len = self.row_stride() - self.row_len();

        trace!("writing {}x{} bitmap, {} padding bytes per row", self.width(), self.height(), pad_len);

        dest.write_all(&headers)?;
        dest.write_all(&self.gap)?;
        for row in self.data.chunks_exact(self.row_len()) {
            dest.write_all(row)?;
            dest.write_all(&padding[..pad_len])?;
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let len = self.file.pixel_offset as usize + self.row_stride() * self.height() as usize;
        let mut out = Vec::with_capacity(len);
        self.write_to(&mut out)?;
        Ok(out)
    }

    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }
}

impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Size in bytes: {}, width: {}, height: {}, bits per pixel: {}",
               self.file.file_size, self.width(), self.height(), self.bits_per_pixel())
    }
}
