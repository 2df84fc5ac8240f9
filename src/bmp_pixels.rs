use std::fmt;
use std::mem;

use crate::bitmap::Bitmap;
use crate::bmp_header::{RowOrder, BYTES_PER_PIXEL};
use crate::error::{Result, ValueError};

/// A (blue, green, red) triple, in the order the bytes are stored.
pub type Bgr = (u8, u8, u8);

pub(crate) fn checked_bgr((blue, green, red): (i32, i32, i32)) -> std::result::Result<[u8; 3], ValueError> {
    fn channel(channel: &'static str, value: i32) -> std::result::Result<u8, ValueError> {
        if value < 0 || value > 255 {
            return Err(ValueError::OutOfRange { channel, value });
        }
        Ok(value as u8)
    }

    Ok([channel("blue", blue)?, channel("green", green)?, channel("red", red)?])
}

/// Read-only view of one pixel of a [`Bitmap`].
///
/// Reads go to the bitmap's grid, so the view never holds a stale copy.
#[derive(Copy, Clone)]
pub struct Pixel<'a> {
    bitmap: &'a Bitmap,
    x: u32,
    y: u32,
}

impl<'a> Pixel<'a> {
    pub(crate) fn new(bitmap: &'a Bitmap, x: u32, y: u32) -> Pixel<'a> {
        Pixel { bitmap, x, y }
    }

    /// Logical (x, y), with y = 0 the top row.
    pub fn position(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    pub fn pixel_data(&self) -> Bgr {
        let px = self.bitmap.pixel_bytes(self.x, self.y);
        (px[0], px[1], px[2])
    }
}

impl<'a> fmt::Display for Pixel<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "x[{}] y[{}]: {:?}", self.x, self.y, self.pixel_data())
    }
}

/// Mutable view of one pixel, borrowing exactly that pixel's bytes.
pub struct PixelMut<'a> {
    x: u32,
    y: u32,
    data: &'a mut [u8],
}

impl<'a> PixelMut<'a> {
    pub(crate) fn new(x: u32, y: u32, data: &'a mut [u8]) -> PixelMut<'a> {
        debug_assert_eq!(data.len(), BYTES_PER_PIXEL);
        PixelMut { x, y, data }
    }

    pub fn position(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    pub fn pixel_data(&self) -> Bgr {
        (self.data[0], self.data[1], self.data[2])
    }

    /// Overwrites the pixel in the owning bitmap.
    ///
    /// Every channel must be within `0..=255`; callers clamp. On error the
    /// pixel is left as it was.
    pub fn update_pixel_data(&mut self, bgr: (i32, i32, i32)) -> Result<()> {
        let bytes = checked_bgr(bgr)?;
        self.data.copy_from_slice(&bytes);
        Ok(())
    }
}

impl<'a> fmt::Display for PixelMut<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "x[{}] y[{}]: {:?}", self.x, self.y, self.pixel_data())
    }
}

/// Top-down, left-to-right iterator over the pixels of a [`Bitmap`].
pub struct Pixels<'a> {
    bitmap: &'a Bitmap,
    width: usize,
    index: usize,
    len: usize,
}

impl<'a> Pixels<'a> {
    pub(crate) fn new(bitmap: &'a Bitmap) -> Pixels<'a> {
        let width = bitmap.width() as usize;

        Pixels {
            bitmap,
            width,
            index: 0,
            len: width * bitmap.height() as usize,
        }
    }
}

impl<'a> Iterator for Pixels<'a> {
    type Item = Pixel<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }

        let x = self.index % self.width;
        let y = self.index / self.width;
        self.index += 1;

        Some(Pixel::new(self.bitmap, x as u32, y as u32))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for Pixels<'a> {}

/// Like [`Pixels`], but yields disjoint [`PixelMut`] handles.
///
/// Rows are split off the grid one at a time, from the back when the rows
/// are stored bottom-up.
pub struct PixelsMut<'a> {
    rows: &'a mut [u8],
    row: &'a mut [u8],
    row_len: usize,
    order: RowOrder,
    x: u32,
    y: u32,
    next_y: u32,
}

impl<'a> PixelsMut<'a> {
    pub(crate) fn new(rows: &'a mut [u8], width: u32, order: RowOrder) -> PixelsMut<'a> {
        PixelsMut {
            rows,
            row: Default::default(),
            row_len: width as usize * BYTES_PER_PIXEL,
            order,
            x: 0,
            y: 0,
            next_y: 0,
        }
    }
}

impl<'a> Iterator for PixelsMut<'a> {
    type Item = PixelMut<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row.is_empty() {
            if self.rows.is_empty() {
                return None;
            }

            let rows = mem::take(&mut self.rows);
            let (row, rest) = match self.order {
                RowOrder::TopDown => rows.split_at_mut(self.row_len),
                RowOrder::BottomUp => {
                    let split = rows.len() - self.row_len;
                    let (rest, row) = rows.split_at_mut(split);
                    (row, rest)
                },
            };

            self.rows = rest;
            self.row = row;
            self.x = 0;
            self.y = self.next_y;
            self.next_y += 1;
        }

        let row = mem::take(&mut self.row);
        let (px, rest) = row.split_at_mut(BYTES_PER_PIXEL);
        self.row = rest;

        let pixel = PixelMut::new(self.x, self.y, px);
        self.x += 1;

        Some(pixel)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.row.len() + self.rows.len()) / BYTES_PER_PIXEL;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for PixelsMut<'a> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_bgr() {
        assert_eq!(checked_bgr((0, 128, 255)).unwrap(), [0, 128, 255]);
        assert_eq!(checked_bgr((256, 0, 0)).unwrap_err(),
                   ValueError::OutOfRange { channel: "blue", value: 256 });
        assert_eq!(checked_bgr((0, -1, 0)).unwrap_err(),
                   ValueError::OutOfRange { channel: "green", value: -1 });
        assert_eq!(checked_bgr((0, 0, 300)).unwrap_err(),
                   ValueError::OutOfRange { channel: "red", value: 300 });
    }

    #[test]
    fn test_pixels_mut_bottom_up_order() {
        /* Two rows of two pixels, stored bottom row first. */
        let mut grid: Vec<u8> = (0..12).collect();
        let positions: Vec<_> = PixelsMut::new(&mut grid, 2, RowOrder::BottomUp)
            .map(|px| (px.position(), px.pixel_data()))
            .collect();

        assert_eq!(positions, vec![
            ((0, 0), (6, 7, 8)),
            ((1, 0), (9, 10, 11)),
            ((0, 1), (0, 1, 2)),
            ((1, 1), (3, 4, 5)),
        ]);
    }

    #[test]
    fn test_pixels_mut_top_down_order() {
        let mut grid: Vec<u8> = (0..12).collect();
        let first: Vec<_> = PixelsMut::new(&mut grid, 2, RowOrder::TopDown)
            .map(|px| px.pixel_data())
            .collect();

        assert_eq!(first[0], (0, 1, 2));
        assert_eq!(first[3], (9, 10, 11));
    }

    #[test]
    fn test_pixel_mut_writes_through() {
        let mut grid = vec![0u8; 6];
        {
            let mut pixels = PixelsMut::new(&mut grid, 1, RowOrder::BottomUp);
            assert_eq!(pixels.len(), 2);
            let mut top = pixels.next().unwrap();
            top.update_pixel_data((1, 2, 3)).unwrap();
            assert!(top.update_pixel_data((1, 2, 256)).is_err());
            assert_eq!(top.pixel_data(), (1, 2, 3));
        }
        assert_eq!(grid, vec![0, 0, 0, 1, 2, 3]);
    }
}
