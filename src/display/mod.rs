//! Display session
//!
//! [`Ili9486`] owns the frame buffer, the dirty region and the bus. The
//! graphics layer writes pixels in between scheduler ticks; each tick calls
//! [`Ili9486::update`], which pushes only the dirty rectangle:
//!
//! ```text
//!            dirty empty
//!          ┌─────────────┐
//!          ▼             │
//!        Idle ───────────┘
//!          │ dirty rect (clipped)
//!          ▼
//!      WindowSet   CASET / PASET / RAMWR
//!          │
//!          ▼
//!      Streaming   row-major RGB565, big-endian
//!          │
//!          ▼
//!        Idle      dirty region cleared
//! ```

pub mod bus;
pub mod dirty;
pub mod framebuffer;
pub mod ili9486;

#[cfg(test)]
pub(crate) mod testing;

pub use bus::Transport;
pub use dirty::{DirtyRegion, Rect};
pub use framebuffer::{ColorMode, FrameBuffer, PixelStore};
pub use ili9486::{ControllerModel, Model, Rotation, Tft35};

use core::convert::Infallible;

use embedded_graphics_core::draw_target::DrawTarget;
use embedded_graphics_core::geometry::{OriginDimensions, Point, Size};
use embedded_graphics_core::pixelcolor::Rgb888;
use embedded_graphics_core::Pixel;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::color::Color;
use crate::config::DisplayConfig;
use crate::hal::{ControlPins, NoPin, PinError, SpiError, SpiPort};

/// Display errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    /// The SPI peripheral reported a failure
    Spi(SpiError),
    /// A control pin could not be driven
    Pin(PinError),
}

impl From<SpiError> for DisplayError {
    fn from(err: SpiError) -> Self {
        DisplayError::Spi(err)
    }
}

impl From<PinError> for DisplayError {
    fn from(err: PinError) -> Self {
        DisplayError::Pin(err)
    }
}

impl core::fmt::Display for DisplayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DisplayError::Spi(err) => write!(f, "display bus: {}", err),
            DisplayError::Pin(err) => write!(f, "display pin: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DisplayError {}

/// Where the update state machine is
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpdateState {
    #[default]
    Idle,
    WindowSet,
    Streaming,
}

/// Outcome of one update tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flush {
    /// Nothing to draw; the bus was not touched
    Skipped,
    /// `rect` was streamed, `pixels` pixels in total
    Sent { rect: Rect, pixels: usize },
}

/// ILI9486 display session
pub struct Ili9486<SPI, DC, D, RST = NoPin, BL = NoPin> {
    transport: Transport<SPI, DC, RST, BL>,
    delay: D,
    config: DisplayConfig,
    model: &'static dyn ControllerModel,
    width: u16,
    height: u16,
    buffer: FrameBuffer,
    dirty: DirtyRegion,
    state: UpdateState,
    initialized: bool,
}

impl<SPI, DC, D, RST, BL> Ili9486<SPI, DC, D, RST, BL>
where
    SPI: SpiPort,
    DC: OutputPin,
    RST: OutputPin,
    BL: OutputPin,
    D: DelayNs,
{
    /// Create a session; nothing touches the bus until [`setup`](Self::setup)
    pub fn new(spi: SPI, pins: ControlPins<DC, RST, BL>, delay: D, config: DisplayConfig) -> Self {
        let model = config.model.controller();
        let (width, height) = model.size(config.rotation);
        Self {
            transport: Transport::new(spi, pins),
            delay,
            config,
            model,
            width,
            height,
            buffer: FrameBuffer::unallocated(config.color_mode),
            dirty: DirtyRegion::new(),
            state: UpdateState::Idle,
            initialized: false,
        }
    }

    /// Bring the panel up: pins, then the model's init table, then memory
    pub fn setup(&mut self) -> Result<(), DisplayError> {
        self.setup_pins()?;
        self.initialize()?;
        self.setup_memory();
        self.initialized = true;
        self.dump_config();
        Ok(())
    }

    fn setup_pins(&mut self) -> Result<(), DisplayError> {
        let pins = self.transport.pins_mut();
        pins.dc_command()?;
        pins.reset_deassert()?;
        pins.backlight_on()?;
        self.transport.hardware_reset(&mut self.delay)
    }

    fn initialize(&mut self) -> Result<(), DisplayError> {
        let sent = self
            .transport
            .run_init_sequence(self.model.init_sequence(), &mut self.delay)?;
        debug!("{}: {} init commands", self.model.name(), sent);

        let (width, height) = self.model.size(self.config.rotation);
        self.width = width;
        self.height = height;
        if self.config.rotation != Rotation::Deg0 {
            self.transport.set_madctl(self.model.madctl(self.config.rotation))?;
        }
        self.transport
            .invert(self.model.inverted() || self.config.invert_colors)
    }

    fn setup_memory(&mut self) {
        self.buffer.resize(self.width, self.height, self.config.color_mode);
        self.dirty.clear();
    }

    /// Log the active configuration
    pub fn dump_config(&self) {
        info!("ILI9486 display");
        info!("  Model: {}", self.model.name());
        info!("  Size: {}x{} (rotation {})", self.width, self.height, self.config.rotation.degrees());
        info!("  Color mode: {:?}", self.config.color_mode);
        info!("  Buffer: {} bytes", self.buffer.len_bytes());
        info!(
            "  SPI: {} Hz, mode {}, {:?}",
            self.config.spi.clock_hz,
            self.config.spi.mode_number(),
            self.config.spi.bit_order
        );
        info!(
            "  Pins: reset={} backlight={}",
            self.transport.pins().has_reset(),
            self.transport.pins().has_backlight()
        );
        info!("  Update interval: {} ms", self.config.update_interval_ms);
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn model(&self) -> &'static dyn ControllerModel {
        self.model
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Polling period the scheduler should call [`update`](Self::update) at
    pub fn update_interval(&self) -> core::time::Duration {
        core::time::Duration::from_millis(self.config.update_interval_ms as u64)
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Size of the allocated frame buffer in bytes
    pub fn buffer_length(&self) -> usize {
        self.buffer.len_bytes()
    }

    /// Dirty rectangle as `(x, y, w, h)`, unclipped
    pub fn dirty_rect(&self) -> Option<Rect> {
        self.dirty.rect()
    }

    pub fn transport(&self) -> &Transport<SPI, DC, RST, BL> {
        &self.transport
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Tear the session down and hand back the HAL objects
    pub fn release(self) -> (SPI, ControlPins<DC, RST, BL>, D) {
        let (spi, pins) = self.transport.release();
        (spi, pins, self.delay)
    }

    #[inline]
    fn visible(&self, x: i32, y: i32) -> Option<(u16, u16)> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            None
        } else {
            Some((x as u16, y as u16))
        }
    }

    /// Set one pixel; coordinates outside the panel are ignored
    pub fn draw_pixel(&mut self, x: i32, y: i32, color: Color) {
        let Some((x, y)) = self.visible(x, y) else {
            return;
        };
        if self.buffer.write(x, y, color) {
            self.dirty.mark(x, y);
        }
    }

    /// Buffered pixel, quantized to the storage format
    pub fn read_pixel(&self, x: i32, y: i32) -> Option<Color> {
        let (x, y) = self.visible(x, y)?;
        self.buffer.read(x, y)
    }

    /// Fill the whole buffer and mark the whole panel dirty
    pub fn fill(&mut self, color: Color) {
        self.buffer.fill(color);
        self.dirty.mark_all(self.buffer.width(), self.buffer.height());
    }

    /// Periodic tick: push the dirty rectangle to the controller.
    ///
    /// On a bus error the dirty region is kept, so the next tick sends it again.
    pub fn update(&mut self) -> Result<Flush, DisplayError> {
        let Some(rect) = self.dirty.clipped(self.buffer.width(), self.buffer.height()) else {
            // Nothing, or nothing visible, left to draw
            self.dirty.clear();
            return Ok(Flush::Skipped);
        };

        let result = self.flush(rect);
        self.state = UpdateState::Idle;
        match result {
            Ok(pixels) => {
                self.dirty.clear();
                debug!("flushed {}x{} at ({}, {}): {} px", rect.w, rect.h, rect.x, rect.y, pixels);
                Ok(Flush::Sent { rect, pixels })
            }
            Err(err) => {
                warn!("display update failed, keeping dirty region: {}", err);
                Err(err)
            }
        }
    }

    fn flush(&mut self, rect: Rect) -> Result<usize, DisplayError> {
        self.state = UpdateState::WindowSet;
        self.transport.set_addr_window(rect)?;

        self.state = UpdateState::Streaming;
        let buffer = &self.buffer;
        let pixels = (rect.y..rect.y + rect.h).flat_map(|row| buffer.wire_row(rect.x, row, rect.w));
        self.transport.write_pixels(pixels)
    }

    /// Change orientation.
    ///
    /// When width and height swap the buffer is reallocated; either way the
    /// whole panel is redrawn next tick.
    pub fn set_rotation(&mut self, rotation: Rotation) -> Result<(), DisplayError> {
        if rotation == self.config.rotation {
            return Ok(());
        }
        if self.initialized {
            self.transport.set_madctl(self.model.madctl(rotation))?;
        }
        self.config.rotation = rotation;
        let (width, height) = self.model.size(rotation);
        let resized = (width, height) != (self.width, self.height);
        self.width = width;
        self.height = height;
        if !self.initialized {
            return Ok(());
        }
        if resized {
            self.reallocate();
        } else {
            self.dirty.mark_all(self.width, self.height);
        }
        Ok(())
    }

    /// Change the buffer format; contents are lost and redrawn next tick
    pub fn set_color_mode(&mut self, color_mode: ColorMode) {
        if self.config.color_mode == color_mode {
            return;
        }
        self.config.color_mode = color_mode;
        if self.initialized {
            self.reallocate();
        } else {
            self.buffer = FrameBuffer::unallocated(color_mode);
        }
    }

    fn reallocate(&mut self) {
        self.buffer.resize(self.width, self.height, self.config.color_mode);
        self.dirty.clear();
        self.dirty.mark_all(self.width, self.height);
        debug!("frame buffer reallocated: {} bytes", self.buffer.len_bytes());
    }

    /// Color inversion on or off
    pub fn invert_display(&mut self, invert: bool) -> Result<(), DisplayError> {
        self.transport.invert(invert)
    }

    /// Backlight on or off (no-op without a backlight pin)
    pub fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        let pins = self.transport.pins_mut();
        if on {
            pins.backlight_on()?;
        } else {
            pins.backlight_off()?;
        }
        Ok(())
    }

    /// Diagnostic register read, see [`Transport::read_command`]
    pub fn read_command(&mut self, command: u8, index: u8) -> Result<u8, DisplayError> {
        self.transport.read_command(command, index)
    }
}

impl<SPI, DC, D, RST, BL> OriginDimensions for Ili9486<SPI, DC, D, RST, BL> {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl<SPI, DC, D, RST, BL> DrawTarget for Ili9486<SPI, DC, D, RST, BL>
where
    SPI: SpiPort,
    DC: OutputPin,
    RST: OutputPin,
    BL: OutputPin,
    D: DelayNs,
{
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(Point { x, y }, color) in pixels {
            self.draw_pixel(x, y, color.into());
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color.into());
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
