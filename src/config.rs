//! Display configuration
//!
//! Plain data describing one panel: which model, how pixels are buffered,
//! orientation, refresh period and the SPI settings the HAL must use. Pin
//! handles are not part of it; they are moved into the session directly.

use serde::{Deserialize, Serialize};

use crate::display::framebuffer::ColorMode;
use crate::display::ili9486::{Model, Rotation};
use crate::hal::SpiConfig;

/// Default period between update ticks
pub const DEFAULT_UPDATE_INTERVAL_MS: u32 = 1000;

/// Panel configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Controller model, selects the init table and native size
    pub model: Model,
    /// Frame buffer storage format
    pub color_mode: ColorMode,
    pub rotation: Rotation,
    /// Force color inversion on top of the model's default
    pub invert_colors: bool,
    /// Period of the scheduler's update tick
    pub update_interval_ms: u32,
    pub spi: SpiConfig,
}

impl DisplayConfig {
    /// Configuration for a model with every other field at its default
    pub fn for_model(model: Model) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    pub fn with_color_mode(mut self, color_mode: ColorMode) -> Self {
        self.color_mode = color_mode;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Frame buffer size in bytes once set up
    pub fn buffer_length(&self) -> usize {
        let (w, h) = self.model.controller().size(self.rotation);
        crate::display::FrameBuffer::buffer_length(w, h, self.color_mode)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            model: Model::Tft35,
            color_mode: ColorMode::Rgb565,
            rotation: Rotation::Deg0,
            invert_colors: false,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            spi: SpiConfig::DISPLAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = DisplayConfig::default();
        assert_eq!(cfg.model, Model::Tft35);
        assert_eq!(cfg.color_mode, ColorMode::Rgb565);
        assert_eq!(cfg.update_interval_ms, 1000);
        assert_eq!(cfg.spi, SpiConfig::DISPLAY);
        assert_eq!(cfg.buffer_length(), 480 * 320 * 2);
    }

    #[test]
    fn test_builders() {
        let cfg = DisplayConfig::for_model(Model::Tft35)
            .with_color_mode(ColorMode::Rgb332)
            .with_rotation(Rotation::Deg90);
        assert_eq!(cfg.buffer_length(), 320 * 480);
    }
}
