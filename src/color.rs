//! Color conversion between the caller's RGB colors and the buffer formats
//!
//! Three representations are involved:
//!
//! | Type     | Bits | Layout            | Used for                        |
//! |----------|------|-------------------|---------------------------------|
//! | `Color`  | 32   | R8 G8 B8 (A8)     | values handed in by the caller  |
//! | `Rgb565` | 16   | `RRRRRGGG GGGBBBBB` | wire format, 16-bit buffers   |
//! | `Rgb332` | 8    | `RRRGGGBB`        | compact buffers (half memory)   |
//!
//! # Properties
//!
//! - All conversions are total (no error path)
//! - Packing keeps the top red bits in bits 11-15 (Verus `ensures`, bit_vector proof)
//! - `Rgb332 -> Rgb565 -> Rgb332` is the identity on all 256 compact values (tested)
//! - Expanding a compact channel reaches the full target range, 7 -> 31 and 3 -> 31 (tested)

use verus_builtin_macros::verus;

verus! {

/// Largest value of a 5-bit channel
pub const MAX5: u16 = 31;
/// Largest value of a 6-bit channel
pub const MAX6: u16 = 63;

/// Pack 8-bit channels into RGB565 by keeping the top bits of each.
pub fn color565_from_rgb(r: u8, g: u8, b: u8) -> (result: u16)
    ensures
        result >> 11 == (r >> 3) as u16,
{
    let r5 = (r >> 3) as u16;
    let g6 = (g >> 2) as u16;
    let b5 = (b >> 3) as u16;
    assert(r5 < 32 && g6 < 64 && b5 < 32) by (bit_vector)
        requires
            r5 == (r >> 3) as u16,
            g6 == (g >> 2) as u16,
            b5 == (b >> 3) as u16;
    assert(((r5 << 11) | (g6 << 5) | b5) >> 11 == r5) by (bit_vector)
        requires
            r5 < 32,
            g6 < 64,
            b5 < 32;
    (r5 << 11) | (g6 << 5) | b5
}

/// Pack 8-bit channels into RGB332 by keeping the top bits of each.
pub fn color332_from_rgb(r: u8, g: u8, b: u8) -> (result: u8) {
    (r & 0xE0) | ((g >> 3) & 0x1C) | (b >> 6)
}

/// Expand a compact color to RGB565.
///
/// Each field is rescaled to the full target range (multiply by the target
/// maximum, divide by the source maximum, rounded), so full intensity stays
/// full intensity instead of stopping short the way a plain shift would.
pub fn color565_from_color332(color: u8) -> (result: u16) {
    let r3 = ((color >> 5) & 0x07) as u16;
    let g3 = ((color >> 2) & 0x07) as u16;
    let b2 = (color & 0x03) as u16;

    let r5 = (r3 * MAX5 + 3) / 7;
    let g6 = (g3 * MAX6) / 7;
    let b5 = (b2 * MAX5 + 1) / 3;

    (r5 << 11) | (g6 << 5) | b5
}

/// Truncate an RGB565 color to the compact format.
pub fn color332_from_color565(color: u16) -> (result: u8) {
    let r5 = (color >> 11) & 0x1F;
    let g6 = (color >> 5) & 0x3F;
    let b5 = color & 0x1F;

    (((r5 >> 2) << 5) | ((g6 >> 3) << 2) | (b5 >> 3)) as u8
}

/// Unpack RGB565 into 8-bit channels, replicating the high bits into the low ones.
pub fn rgb_from_color565(color: u16) -> (result: (u8, u8, u8)) {
    let r5 = ((color >> 11) & 0x1F) as u8;
    let g6 = ((color >> 5) & 0x3F) as u8;
    let b5 = (color & 0x1F) as u8;

    ((r5 << 3) | (r5 >> 2), (g6 << 2) | (g6 >> 4), (b5 << 3) | (b5 >> 2))
}

} // verus!

/// RGB color as supplied by the graphics layer
///
/// Alpha is carried for API compatibility but never blended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);

    /// Opaque color from three channels
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue, alpha: 255 }
    }

    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self { red, green, blue, alpha }
    }

    /// The color as it survives a round trip through a 16-bit buffer.
    pub fn quantize_565(self) -> Self {
        Rgb565::from(self).into()
    }

    /// The color as it survives a round trip through a compact buffer.
    pub fn quantize_332(self) -> Self {
        Rgb332::from(self).into()
    }
}

/// RGB565 color (16-bit: 5 red, 6 green, 5 blue), the controller's wire format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb565(pub u16);

impl Rgb565 {
    pub const BLACK: Self = Self(0x0000);
    pub const WHITE: Self = Self(0xFFFF);
    pub const RED: Self = Self(0xF800);
    pub const GREEN: Self = Self(0x07E0);
    pub const BLUE: Self = Self(0x001F);

    /// Create RGB565 from RGB888 components
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(color565_from_rgb(r, g, b))
    }

    /// Big-endian byte pair as it goes out on the bus
    #[inline]
    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

/// RGB332 color (8-bit: 3 red, 3 green, 2 blue), the compact buffer format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb332(pub u8);

impl Rgb332 {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(color332_from_rgb(r, g, b))
    }
}

impl From<Color> for Rgb565 {
    fn from(color: Color) -> Self {
        Self::from_rgb(color.red, color.green, color.blue)
    }
}

impl From<Color> for Rgb332 {
    fn from(color: Color) -> Self {
        Self::from_rgb(color.red, color.green, color.blue)
    }
}

impl From<Rgb332> for Rgb565 {
    fn from(color: Rgb332) -> Self {
        Self(color565_from_color332(color.0))
    }
}

impl From<Rgb565> for Rgb332 {
    fn from(color: Rgb565) -> Self {
        Self(color332_from_color565(color.0))
    }
}

impl From<Rgb565> for Color {
    fn from(color: Rgb565) -> Self {
        let (r, g, b) = rgb_from_color565(color.0);
        Color::rgb(r, g, b)
    }
}

impl From<Rgb332> for Color {
    fn from(color: Rgb332) -> Self {
        Rgb565::from(color).into()
    }
}

impl From<embedded_graphics_core::pixelcolor::Rgb888> for Color {
    fn from(color: embedded_graphics_core::pixelcolor::Rgb888) -> Self {
        use embedded_graphics_core::pixelcolor::RgbColor;
        Color::rgb(color.r(), color.g(), color.b())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_round_trip_is_lossless() {
        for c in 0..=255u8 {
            let wide = Rgb565::from(Rgb332(c));
            assert_eq!(Rgb332::from(wide), Rgb332(c), "compact value {:#04x}", c);
        }
    }

    #[test]
    fn test_compact_expansion_reaches_full_range() {
        assert_eq!(Rgb565::from(Rgb332(0xFF)), Rgb565::WHITE);
        assert_eq!(Rgb565::from(Rgb332(0x00)), Rgb565::BLACK);
        assert_eq!(Rgb565::from(Rgb332(0xE0)), Rgb565::RED);
        assert_eq!(Rgb565::from(Rgb332(0x1C)), Rgb565::GREEN);
        assert_eq!(Rgb565::from(Rgb332(0x03)), Rgb565::BLUE);
    }

    #[test]
    fn test_primary_colors_pack() {
        assert_eq!(Rgb565::from(Color::RED), Rgb565::RED);
        assert_eq!(Rgb565::from(Color::GREEN), Rgb565::GREEN);
        assert_eq!(Rgb565::from(Color::BLUE), Rgb565::BLUE);
        assert_eq!(Rgb332::from(Color::WHITE), Rgb332(0xFF));
        assert_eq!(Rgb332::from(Color::RED), Rgb332(0xE0));
    }

    #[test]
    fn test_packing_keeps_red_top_bits() {
        for r in 0..=255u8 {
            for (g, b) in [(0u8, 0u8), (255, 255), (0x5A, 0xC3)] {
                assert_eq!(color565_from_rgb(r, g, b) >> 11, (r >> 3) as u16, "r {:#04x}", r);
            }
        }
    }

    #[test]
    fn test_compact_agrees_with_truncated_565() {
        // Packing straight to 332 must match packing to 565 then truncating
        for v in (0..=255u8).step_by(7) {
            let color = Color::rgb(v, v.wrapping_mul(3), 255 - v);
            let direct = Rgb332::from(color);
            let via_565 = Rgb332::from(Rgb565::from(color));
            assert_eq!(direct, via_565);
        }
    }

    #[test]
    fn test_565_quantization_is_stable() {
        let color = Color::rgb(0x12, 0x9A, 0xEF);
        let once = color.quantize_565();
        assert_eq!(once.quantize_565(), once);
        assert_eq!(Rgb565::from(once), Rgb565::from(color));
    }

    #[test]
    fn test_alpha_is_ignored() {
        let opaque = Color::rgb(10, 20, 30);
        let translucent = Color::rgba(10, 20, 30, 0);
        assert_eq!(Rgb565::from(opaque), Rgb565::from(translucent));
    }

    #[test]
    fn test_wire_bytes_are_big_endian() {
        assert_eq!(Rgb565::RED.to_be_bytes(), [0xF8, 0x00]);
        assert_eq!(Rgb565::BLUE.to_be_bytes(), [0x00, 0x1F]);
    }
}
