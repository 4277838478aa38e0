//! Frame buffer with bounds-checked pixel access
//!
//! Pixel memory is a tagged store: either packed RGB565 words or compact
//! RGB332 bytes, chosen by [`ColorMode`]. Both variants are addressed through
//! the same accessors, which dispatch on the tag, so the same memory is never
//! viewed at two element widths.

use alloc::vec;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::color::{Color, Rgb332, Rgb565};

/// Buffer storage format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// 16 bits per pixel, identical to the wire format
    #[default]
    Rgb565,
    /// 8 bits per pixel (3-3-2), half the memory at reduced fidelity
    Rgb332,
}

impl ColorMode {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            ColorMode::Rgb565 => 2,
            ColorMode::Rgb332 => 1,
        }
    }
}

/// Pixel memory, one element per pixel, row-major
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PixelStore {
    Rgb565(Vec<u16>),
    Rgb332(Vec<u8>),
}

impl PixelStore {
    fn allocate(mode: ColorMode, pixels: usize) -> Self {
        match mode {
            ColorMode::Rgb565 => PixelStore::Rgb565(vec![0; pixels]),
            ColorMode::Rgb332 => PixelStore::Rgb332(vec![0; pixels]),
        }
    }

    fn mode(&self) -> ColorMode {
        match self {
            PixelStore::Rgb565(_) => ColorMode::Rgb565,
            PixelStore::Rgb332(_) => ColorMode::Rgb332,
        }
    }

    fn pixels(&self) -> usize {
        match self {
            PixelStore::Rgb565(words) => words.len(),
            PixelStore::Rgb332(bytes) => bytes.len(),
        }
    }
}

/// Frame buffer sized `width × height × bytes_per_pixel`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    store: PixelStore,
}

impl FrameBuffer {
    /// Byte length of a buffer with these parameters
    pub const fn buffer_length(width: u16, height: u16, mode: ColorMode) -> usize {
        (width as usize) * (height as usize) * mode.bytes_per_pixel()
    }

    /// Allocate a buffer initialized to black
    pub fn new(width: u16, height: u16, mode: ColorMode) -> Self {
        let pixels = (width as usize) * (height as usize);
        Self {
            width,
            height,
            store: PixelStore::allocate(mode, pixels),
        }
    }

    /// A 0×0 buffer, used before setup allocates the real one
    pub fn unallocated(mode: ColorMode) -> Self {
        Self::new(0, 0, mode)
    }

    /// Reallocate for new dimensions or format; contents reset to black
    pub fn resize(&mut self, width: u16, height: u16, mode: ColorMode) {
        *self = Self::new(width, height, mode);
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn color_mode(&self) -> ColorMode {
        self.store.mode()
    }

    /// Allocated size in bytes
    pub fn len_bytes(&self) -> usize {
        self.store.pixels() * self.color_mode().bytes_per_pixel()
    }

    /// Raw storage, for inspection and DMA-style transfers
    pub fn store(&self) -> &PixelStore {
        &self.store
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> Option<usize> {
        if x < self.width && y < self.height {
            Some((y as usize) * (self.width as usize) + (x as usize))
        } else {
            None
        }
    }

    /// Store a pixel in the buffer's format (bounds-checked)
    ///
    /// Returns `false`, leaving the buffer untouched, when out of range.
    pub fn write(&mut self, x: u16, y: u16, color: Color) -> bool {
        let Some(idx) = self.index(x, y) else {
            return false;
        };
        match &mut self.store {
            PixelStore::Rgb565(words) => words[idx] = Rgb565::from(color).0,
            PixelStore::Rgb332(bytes) => bytes[idx] = Rgb332::from(color).0,
        }
        true
    }

    /// Get pixel at coordinates, quantized to the storage format
    pub fn read(&self, x: u16, y: u16) -> Option<Color> {
        let idx = self.index(x, y)?;
        Some(match &self.store {
            PixelStore::Rgb565(words) => Rgb565(words[idx]).into(),
            PixelStore::Rgb332(bytes) => Rgb332(bytes[idx]).into(),
        })
    }

    /// Pixel converted to the controller's wire format
    pub fn wire_pixel(&self, x: u16, y: u16) -> Option<Rgb565> {
        let idx = self.index(x, y)?;
        Some(match &self.store {
            PixelStore::Rgb565(words) => Rgb565(words[idx]),
            PixelStore::Rgb332(bytes) => Rgb565::from(Rgb332(bytes[idx])),
        })
    }

    /// Wire-format pixels of one row segment `[x, x + w)`
    pub fn wire_row(&self, x: u16, y: u16, w: u16) -> impl Iterator<Item = Rgb565> + '_ {
        (x..x.saturating_add(w)).filter_map(move |col| self.wire_pixel(col, y))
    }

    /// Clear framebuffer to a solid color
    pub fn fill(&mut self, color: Color) {
        match &mut self.store {
            PixelStore::Rgb565(words) => words.fill(Rgb565::from(color).0),
            PixelStore::Rgb332(bytes) => bytes.fill(Rgb332::from(color).0),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_length() {
        assert_eq!(FrameBuffer::buffer_length(480, 320, ColorMode::Rgb565), 307_200);
        assert_eq!(FrameBuffer::buffer_length(480, 320, ColorMode::Rgb332), 153_600);
        assert_eq!(FrameBuffer::new(480, 320, ColorMode::Rgb565).len_bytes(), 307_200);
        assert_eq!(FrameBuffer::new(480, 320, ColorMode::Rgb332).len_bytes(), 153_600);
        assert_eq!(FrameBuffer::unallocated(ColorMode::Rgb565).len_bytes(), 0);
    }

    #[test]
    fn test_write_read_round_trip_565() {
        let mut fb = FrameBuffer::new(16, 8, ColorMode::Rgb565);
        let color = Color::rgb(0x12, 0x34, 0x56);
        assert!(fb.write(15, 7, color));
        assert_eq!(fb.read(15, 7), Some(color.quantize_565()));
        assert_eq!(fb.wire_pixel(15, 7), Some(Rgb565::from(color)));
    }

    #[test]
    fn test_write_read_round_trip_332() {
        let mut fb = FrameBuffer::new(16, 8, ColorMode::Rgb332);
        let color = Color::rgb(0xC0, 0x60, 0xFF);
        assert!(fb.write(3, 2, color));
        assert_eq!(fb.read(3, 2), Some(color.quantize_332()));
        assert_eq!(fb.wire_pixel(3, 2), Some(Rgb565::from(Rgb332::from(color))));
    }

    #[test]
    fn test_out_of_bounds_is_noop() {
        let mut fb = FrameBuffer::new(4, 4, ColorMode::Rgb565);
        let before = fb.clone();
        assert!(!fb.write(4, 0, Color::WHITE));
        assert!(!fb.write(0, 4, Color::WHITE));
        assert_eq!(fb, before);
        assert_eq!(fb.read(4, 4), None);
        assert_eq!(fb.wire_pixel(9, 0), None);
    }

    #[test]
    fn test_fill_sets_every_pixel() {
        let mut fb = FrameBuffer::new(5, 3, ColorMode::Rgb332);
        fb.fill(Color::RED);
        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(fb.read(x, y), Some(Color::RED));
            }
        }
    }

    #[test]
    fn test_resize_switches_format() {
        let mut fb = FrameBuffer::new(4, 4, ColorMode::Rgb565);
        fb.write(1, 1, Color::WHITE);
        fb.resize(8, 2, ColorMode::Rgb332);
        assert_eq!(fb.color_mode(), ColorMode::Rgb332);
        assert_eq!(fb.len_bytes(), 16);
        assert!(matches!(fb.store(), PixelStore::Rgb332(bytes) if bytes.len() == 16));
        assert_eq!(fb.read(1, 1), Some(Color::BLACK));
    }

    #[test]
    fn test_wire_row() {
        let mut fb = FrameBuffer::new(4, 2, ColorMode::Rgb565);
        fb.write(1, 1, Color::BLUE);
        fb.write(2, 1, Color::GREEN);
        let row: Vec<Rgb565> = fb.wire_row(1, 1, 2).collect();
        assert_eq!(row, [Rgb565::BLUE, Rgb565::GREEN]);
    }
}
