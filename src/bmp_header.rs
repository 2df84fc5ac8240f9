use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use std::io::{Cursor, Read, Write};

use crate::error::{BMPError, FormatError, Result};

pub const FILE_HEADER_SIZE: u32 = 14;
pub const INFO_HEADER_SIZE: u32 = 40;
pub const HEADER_SIZE: u32 = FILE_HEADER_SIZE + INFO_HEADER_SIZE;
pub const BITS_PER_PIXEL: u16 = 24;
pub const BYTES_PER_PIXEL: usize = 3;

const MAGIC: [u8; 2] = *b"BM";
/* 72 DPI */
const DEFAULT_PIXELS_PER_METER: i32 = 2835;

/// Storage order of the rows in the pixel array.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RowOrder {
    /// Positive height: the first stored row is the bottom of the image.
    BottomUp,
    /// Negative height: the first stored row is the top of the image.
    TopDown,
}

impl RowOrder {
    fn from_height(height: i32) -> RowOrder {
        if height < 0 {
            RowOrder::TopDown
        } else {
            RowOrder::BottomUp
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHeader {
    pub file_size: u32,
    /* Two reserved u16s, carried through untouched. */
    pub reserved: u32,
    pub pixel_offset: u32,
}

/// BITMAPINFOHEADER fields, as stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfoHeader {
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bpp: u16,
    pub compression: u32,
    /// Zero means "compute from the dimensions".
    pub image_size: u32,
    pub x_pixels_per_meter: i32,
    pub y_pixels_per_meter: i32,
    pub n_colors: u32,
    pub n_important_colors: u32,
}

/// Bytes needed for one stored row of `width` pixels, padded to four bytes.
pub fn row_stride(width: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(BYTES_PER_PIXEL)
        .and_then(|len| len.checked_add(3))
        .map(|len| len & !3)
}

impl InfoHeader {
    /// A bottom-up 24 bit header for a `width` x `height` image.
    pub fn new(width: u32, height: u32) -> Result<InfoHeader> {
        if width == 0 {
            return Err(unsupported("width", "> 0", 0).into());
        }

        if height == 0 {
            return Err(unsupported("height", "!= 0", 0).into());
        }

        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(BMPError::DimensionsTooLarge { width, height });
        }

        let info = InfoHeader {
            width: width as i32,
            height: height as i32,
            planes: 1,
            bpp: BITS_PER_PIXEL,
            compression: 0,
            image_size: 0,
            x_pixels_per_meter: DEFAULT_PIXELS_PER_METER,
            y_pixels_per_meter: DEFAULT_PIXELS_PER_METER,
            n_colors: 0,
            n_important_colors: 0,
        };
        let image_size = info.pixel_array_len()?;
        if image_size > u32::MAX as usize {
            return Err(BMPError::DimensionsTooLarge { width, height });
        }

        Ok(InfoHeader { image_size: image_size as u32, ..info })
    }

    pub fn abs_width(&self) -> u32 {
        self.width.max(0) as u32
    }

    pub fn abs_height(&self) -> u32 {
        self.height.unsigned_abs()
    }

    pub fn row_order(&self) -> RowOrder {
        RowOrder::from_height(self.height)
    }

    pub fn row_stride(&self) -> Result<usize> {
        row_stride(self.abs_width()).ok_or_else(|| self.too_large())
    }

    /// Length of the padded pixel array.
    pub fn pixel_array_len(&self) -> Result<usize> {
        self.row_stride()?
            .checked_mul(self.abs_height() as usize)
            .ok_or_else(|| self.too_large())
    }

    fn too_large(&self) -> BMPError {
        BMPError::DimensionsTooLarge {
            width: self.abs_width(),
            height: self.abs_height(),
        }
    }

    fn validate(&self) -> std::result::Result<(), FormatError> {
        if self.width <= 0 {
            return Err(unsupported("width", "> 0", self.width.into()));
        }

        if self.height == 0 {
            return Err(unsupported("height", "!= 0", 0));
        }

        if self.planes != 1 {
            return Err(unsupported("number of planes", "1", self.planes.into()));
        }

        if self.bpp != BITS_PER_PIXEL {
            return Err(unsupported("bits per pixel", "24", self.bpp.into()));
        }

        if self.compression != 0 {
            return Err(FormatError::UnsupportedCompression(self.compression));
        }

        if self.n_colors != 0 {
            return Err(unsupported("palette color count", "0", self.n_colors.into()));
        }

        if self.n_important_colors != 0 {
            return Err(unsupported("important color count", "0", self.n_important_colors.into()));
        }

        Ok(())
    }

    fn from_buffer<R: Read>(source: &mut R) -> Result<InfoHeader> {
        let header_size = source.read_u32::<LittleEndian>()?;
        if header_size != INFO_HEADER_SIZE {
            return Err(FormatError::UnsupportedHeaderVariant(header_size).into());
        }

        let info = InfoHeader {
            width: source.read_i32::<LittleEndian>()?,
            height: source.read_i32::<LittleEndian>()?,
            planes: source.read_u16::<LittleEndian>()?,
            bpp: source.read_u16::<LittleEndian>()?,
            compression: source.read_u32::<LittleEndian>()?,
            image_size: source.read_u32::<LittleEndian>()?,
            x_pixels_per_meter: source.read_i32::<LittleEndian>()?,
            y_pixels_per_meter: source.read_i32::<LittleEndian>()?,
            n_colors: source.read_u32::<LittleEndian>()?,
            n_important_colors: source.read_u32::<LittleEndian>()?,
        };
        info.validate()?;

        Ok(info)
    }
}

fn unsupported(field: &'static str, expected: &'static str, found: i64) -> FormatError {
    FormatError::UnsupportedPixelFormat { field, expected, found }
}

impl FileHeader {
    fn from_buffer<R: Read>(source: &mut R) -> Result<FileHeader> {
        let mut bm = [0, 0];

        source.read_exact(&mut bm)?;
        if bm != MAGIC {
            return Err(FormatError::BadMagic(bm).into());
        }

        Ok(FileHeader {
            file_size: source.read_u32::<LittleEndian>()?,
            reserved: source.read_u32::<LittleEndian>()?,
            pixel_offset: source.read_u32::<LittleEndian>()?,
        })
    }
}

/// Both decoded headers plus the layout derived from them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BMPHeader {
    pub file: FileHeader,
    pub info: InfoHeader,
    pub pixel_offset: usize,
    pub row_stride: usize,
}

impl BMPHeader {
    /// Decodes and validates the 54 header bytes at the start of `bytes`.
    ///
    /// Only the headers are read; the pixel offset is checked against the
    /// stored file size, not against the length of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<BMPHeader> {
        if bytes.len() < HEADER_SIZE as usize {
            return Err(FormatError::TruncatedBuffer {
                needed: HEADER_SIZE as usize,
                actual: bytes.len(),
            }
            .into());
        }

        let mut source = Cursor::new(bytes);
        let file = FileHeader::from_buffer(&mut source)?;
        let info = InfoHeader::from_buffer(&mut source)?;

        if file.pixel_offset < HEADER_SIZE || file.pixel_offset > file.file_size {
            return Err(FormatError::PixelOffsetOutOfRange {
                offset: file.pixel_offset,
                min: HEADER_SIZE,
                max: file.file_size,
            }
            .into());
        }

        let row_stride = info.row_stride()?;
        let pixel_array_len = info.pixel_array_len()?;
        let expected_size = file.pixel_offset as u64 + pixel_array_len as u64;

        if u64::from(file.file_size) != expected_size {
            warn!("BMP file size field is {}, layout implies {}", file.file_size, expected_size);
        }

        if info.image_size != 0 && info.image_size as usize != pixel_array_len {
            warn!("BMP image size field is {}, layout implies {}", info.image_size, pixel_array_len);
        }

        debug!("decoded BMP header: {}x{} {:?}, stride {}, pixels at {}",
               info.width, info.abs_height(), info.row_order(), row_stride, file.pixel_offset);

        Ok(BMPHeader {
            pixel_offset: file.pixel_offset as usize,
            row_stride,
            file,
            info,
        })
    }
}

/// Serializes both headers into their 54 byte on-disk form.
///
/// The file size and a non-zero image size are recomputed from `info`'s
/// current dimensions and `file.pixel_offset`; the stored values are ignored.
pub fn encode_headers(file: &FileHeader, info: &InfoHeader) -> Result<[u8; HEADER_SIZE as usize]> {
    info.validate()?;

    let pixel_array_len = info.pixel_array_len()?;
    let file_size = (file.pixel_offset as usize)
        .checked_add(pixel_array_len)
        .filter(|&size| size <= u32::MAX as usize)
        .ok_or_else(|| info.too_large())?;
    let image_size = if info.image_size == 0 { 0 } else { pixel_array_len as u32 };

    let mut out = [0u8; HEADER_SIZE as usize];
    {
        let mut dest = Cursor::new(&mut out[..]);
        dest.write_all(&MAGIC)?;
        dest.write_u32::<LittleEndian>(file_size as u32)?;
        dest.write_u32::<LittleEndian>(file.reserved)?;
        dest.write_u32::<LittleEndian>(file.pixel_offset)?;

        dest.write_u32::<LittleEndian>(INFO_HEADER_SIZE)?;
        dest.write_i32::<LittleEndian>(info.width)?;
        dest.write_i32::<LittleEndian>(info.height)?;
        dest.write_u16::<LittleEndian>(info.planes)?;
        dest.write_u16::<LittleEndian>(info.bpp)?;
        dest.write_u32::<LittleEndian>(info.compression)?;
        dest.write_u32::<LittleEndian>(image_size)?;
        dest.write_i32::<LittleEndian>(info.x_pixels_per_meter)?;
        dest.write_i32::<LittleEndian>(info.y_pixels_per_meter)?;
        dest.write_u32::<LittleEndian>(info.n_colors)?;
        dest.write_u32::<LittleEndian>(info.n_important_colors)?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(width: i32, height: i32, bpp: u16, compression: u32) -> Vec<u8> {
        let stride = ((width.max(0) as u32 * 3 + 3) & !3) as i64;
        let image_size = stride * height.unsigned_abs() as i64;
        let mut buf = Vec::new();

        buf.extend_from_slice(b"BM");
        buf.write_u32::<LittleEndian>(54 + image_size as u32).unwrap();
        buf.write_u32::<LittleEndian>(0).unwrap();
        buf.write_u32::<LittleEndian>(54).unwrap();
        buf.write_u32::<LittleEndian>(40).unwrap();
        buf.write_i32::<LittleEndian>(width).unwrap();
        buf.write_i32::<LittleEndian>(height).unwrap();
        buf.write_u16::<LittleEndian>(1).unwrap();
        buf.write_u16::<LittleEndian>(bpp).unwrap();
        buf.write_u32::<LittleEndian>(compression).unwrap();
        buf.write_u32::<LittleEndian>(image_size as u32).unwrap();
        buf.write_i32::<LittleEndian>(2835).unwrap();
        buf.write_i32::<LittleEndian>(2835).unwrap();
        buf.write_u32::<LittleEndian>(0).unwrap();
        buf.write_u32::<LittleEndian>(0).unwrap();
        buf
    }

    fn format_error(bytes: &[u8]) -> FormatError {
        match BMPHeader::from_bytes(bytes) {
            Err(BMPError::Format(err)) => err,
            Err(err) => panic!("unexpected error {}", err),
            Ok(_) => panic!("header unexpectedly accepted"),
        }
    }

    #[test]
    fn test_row_stride() {
        assert_eq!(row_stride(1), Some(4));
        assert_eq!(row_stride(3), Some(12));
        assert_eq!(row_stride(4), Some(12));
        assert_eq!(row_stride(5), Some(16));
    }

    #[test]
    fn test_decode() {
        let bytes = header_bytes(3, 2, 24, 0);
        let header = BMPHeader::from_bytes(&bytes).unwrap();

        assert_eq!(header.pixel_offset, 54);
        assert_eq!(header.row_stride, 12);
        assert_eq!(header.file.file_size, 54 + 24);
        assert_eq!(header.info.width, 3);
        assert_eq!(header.info.height, 2);
        assert_eq!(header.info.image_size, 24);
        assert_eq!(header.info.row_order(), RowOrder::BottomUp);
    }

    #[test]
    fn test_decode_top_down() {
        let bytes = header_bytes(2, -5, 24, 0);
        let header = BMPHeader::from_bytes(&bytes).unwrap();

        assert_eq!(header.info.row_order(), RowOrder::TopDown);
        assert_eq!(header.info.abs_height(), 5);
        assert_eq!(header.info.pixel_array_len().unwrap(), 40);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = header_bytes(3, 2, 24, 0);
        bytes[0] = b'X';
        bytes[1] = b'X';
        assert_eq!(format_error(&bytes), FormatError::BadMagic(*b"XX"));
    }

    #[test]
    fn test_truncated_buffer() {
        let bytes = header_bytes(3, 2, 24, 0);
        assert_eq!(format_error(&bytes[..53]),
                   FormatError::TruncatedBuffer { needed: 54, actual: 53 });
    }

    #[test]
    fn test_unsupported_fields() {
        match format_error(&header_bytes(3, 2, 32, 0)) {
            FormatError::UnsupportedPixelFormat { field, found, .. } => {
                assert_eq!(field, "bits per pixel");
                assert_eq!(found, 32);
            },
            err => panic!("unexpected error {}", err),
        }

        assert_eq!(format_error(&header_bytes(3, 2, 24, 1)), FormatError::UnsupportedCompression(1));

        match format_error(&header_bytes(0, 2, 24, 0)) {
            FormatError::UnsupportedPixelFormat { field, .. } => assert_eq!(field, "width"),
            err => panic!("unexpected error {}", err),
        }

        match format_error(&header_bytes(3, 0, 24, 0)) {
            FormatError::UnsupportedPixelFormat { field, .. } => assert_eq!(field, "height"),
            err => panic!("unexpected error {}", err),
        }

        let mut bytes = header_bytes(3, 2, 24, 0);
        bytes[26] = 2;
        match format_error(&bytes) {
            FormatError::UnsupportedPixelFormat { field, found, .. } => {
                assert_eq!(field, "number of planes");
                assert_eq!(found, 2);
            },
            err => panic!("unexpected error {}", err),
        }

        let mut bytes = header_bytes(3, 2, 24, 0);
        bytes[46] = 16;
        match format_error(&bytes) {
            FormatError::UnsupportedPixelFormat { field, .. } => assert_eq!(field, "palette color count"),
            err => panic!("unexpected error {}", err),
        }
    }

    #[test]
    fn test_unsupported_header_variant() {
        let mut bytes = header_bytes(3, 2, 24, 0);
        bytes[14] = 124;
        assert_eq!(format_error(&bytes), FormatError::UnsupportedHeaderVariant(124));
    }

    #[test]
    fn test_pixel_offset_out_of_range() {
        let mut bytes = header_bytes(3, 2, 24, 0);
        bytes[10] = 20;
        match format_error(&bytes) {
            FormatError::PixelOffsetOutOfRange { offset, .. } => assert_eq!(offset, 20),
            err => panic!("unexpected error {}", err),
        }

        bytes[10] = 200;
        match format_error(&bytes) {
            FormatError::PixelOffsetOutOfRange { offset, max, .. } => {
                assert_eq!(offset, 200);
                assert_eq!(max, 78);
            },
            err => panic!("unexpected error {}", err),
        }
    }

    #[test]
    fn test_decode_header_only_with_gap_offset() {
        let mut bytes = header_bytes(3, 2, 24, 0);
        bytes[10] = 58;
        bytes[2] = 58 + 24;

        let header = BMPHeader::from_bytes(&bytes).unwrap();
        assert_eq!(bytes.len(), 54);
        assert_eq!(header.pixel_offset, 58);
        assert_eq!(header.row_stride, 12);
    }

    #[test]
    fn test_encode_matches_decoded_bytes() {
        let bytes = header_bytes(5, 3, 24, 0);
        let header = BMPHeader::from_bytes(&bytes).unwrap();

        assert_eq!(&encode_headers(&header.file, &header.info).unwrap()[..], &bytes[..]);
    }

    #[test]
    fn test_encode_recomputes_sizes() {
        let bytes = header_bytes(5, 3, 24, 0);
        let mut header = BMPHeader::from_bytes(&bytes).unwrap();
        header.info.width = 1;
        header.info.height = 1;

        let encoded = encode_headers(&header.file, &header.info).unwrap();
        let decoded = BMPHeader::from_bytes(&encoded).unwrap();
        assert_eq!(decoded.file.file_size, 58);
        assert_eq!(decoded.info.image_size, 4);
    }

    #[test]
    fn test_encode_keeps_zero_image_size() {
        let mut bytes = header_bytes(5, 3, 24, 0);
        bytes[34..38].copy_from_slice(&[0, 0, 0, 0]);
        let header = BMPHeader::from_bytes(&bytes).unwrap();

        assert_eq!(&encode_headers(&header.file, &header.info).unwrap()[..], &bytes[..]);
    }

    #[test]
    fn test_new_info_header() {
        let info = InfoHeader::new(3, 2).unwrap();
        assert_eq!(info.image_size, 24);
        assert_eq!(info.row_order(), RowOrder::BottomUp);
        assert!(InfoHeader::new(0, 2).is_err());
        assert!(InfoHeader::new(3, 0).is_err());
    }
}
