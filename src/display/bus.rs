//! Command/data framing over SPI
//!
//! Every byte the controller sees goes through [`Transport`]. The D/C pin
//! selects the phase (low: command, high: data) and one chip-select
//! transaction spans one phase:
//!
//! ```text
//! command(c)           DC=0  CS↓ c CS↑
//! data(d)              DC=1  CS↓ d CS↑
//! send_command(c, ds)  DC=0  CS↓ c CS↑  DC=1  CS↓ d0 d1 .. dn CS↑
//! ```
//!
//! There is no acknowledgment in this protocol. Errors reported here come from
//! the HAL itself (pin or SPI peripheral failures).

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::trace;

use super::dirty::Rect;
use super::ili9486::{cmd, InitCommands};
use super::DisplayError;
use crate::color::Rgb565;
use crate::hal::{ControlPins, SpiError, SpiPort};

/// Pixels are packed into this many bytes per SPI write
const CHUNK_BYTES: usize = 64;

/// Reset pulse width and recovery time
const RESET_DELAY_MS: u32 = 10;

/// Value written to the index register before reading parameter `index`
const READ_INDEX_BASE: u8 = 0x10;

/// SPI port plus control pins
pub struct Transport<SPI, DC, RST, BL> {
    spi: SPI,
    pins: ControlPins<DC, RST, BL>,
}

impl<SPI, DC, RST, BL> Transport<SPI, DC, RST, BL>
where
    SPI: SpiPort,
    DC: OutputPin,
    RST: OutputPin,
    BL: OutputPin,
{
    pub fn new(spi: SPI, pins: ControlPins<DC, RST, BL>) -> Self {
        Self { spi, pins }
    }

    pub fn spi(&self) -> &SPI {
        &self.spi
    }

    pub fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    pub fn pins(&self) -> &ControlPins<DC, RST, BL> {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut ControlPins<DC, RST, BL> {
        &mut self.pins
    }

    pub fn release(self) -> (SPI, ControlPins<DC, RST, BL>) {
        (self.spi, self.pins)
    }

    /// Run `body` with chip select asserted; CS is released on every path.
    fn transaction<F>(&mut self, body: F) -> Result<(), SpiError>
    where
        F: FnOnce(&mut SPI) -> Result<(), SpiError>,
    {
        self.spi.select()?;
        let result = body(&mut self.spi);
        let released = self.spi.deselect();
        result.and(released)
    }

    /// Send one command byte
    pub fn command(&mut self, value: u8) -> Result<(), DisplayError> {
        trace!("cmd {:#04x}", value);
        self.pins.dc_command()?;
        self.transaction(|spi| spi.write(&[value]))?;
        Ok(())
    }

    /// Send one data byte
    pub fn data(&mut self, value: u8) -> Result<(), DisplayError> {
        self.pins.dc_data()?;
        self.transaction(|spi| spi.write(&[value]))?;
        Ok(())
    }

    /// Command byte followed by its parameters in a single data phase
    pub fn send_command(&mut self, command: u8, data: &[u8]) -> Result<(), DisplayError> {
        self.command(command)?;
        if data.is_empty() {
            return Ok(());
        }
        trace!("  data {:02x?}", data);
        self.pins.dc_data()?;
        self.transaction(|spi| spi.write(data))?;
        Ok(())
    }

    /// Read byte `index` of the response to `command`.
    ///
    /// Selects the parameter through the index register, then clocks in
    /// `index + 1` bytes in one data phase and keeps the last.
    pub fn read_command(&mut self, command: u8, index: u8) -> Result<u8, DisplayError> {
        self.send_command(cmd::READ_INDEX, &[READ_INDEX_BASE.wrapping_add(index)])?;

        let mut response = [0u8; 256];
        let response = &mut response[..=index as usize];

        self.pins.dc_command()?;
        self.spi.select()?;
        let result = self.read_response(command, response);
        let released = self.spi.deselect();
        result?;
        released?;

        let value = response[index as usize];
        trace!("read {:#04x}[{}] = {:#04x}", command, index, value);
        Ok(value)
    }

    fn read_response(&mut self, command: u8, response: &mut [u8]) -> Result<(), DisplayError> {
        self.spi.write(&[command])?;
        // The command byte must be on the wire before D/C goes high
        self.spi.flush()?;
        self.pins.dc_data()?;
        self.spi.read(response)?;
        Ok(())
    }

    /// Set the controller's address window and open memory write
    pub fn set_addr_window(&mut self, rect: Rect) -> Result<(), DisplayError> {
        let x_end = rect.x.saturating_add(rect.w.saturating_sub(1));
        let y_end = rect.y.saturating_add(rect.h.saturating_sub(1));
        let [xs_hi, xs_lo] = rect.x.to_be_bytes();
        let [xe_hi, xe_lo] = x_end.to_be_bytes();
        let [ys_hi, ys_lo] = rect.y.to_be_bytes();
        let [ye_hi, ye_lo] = y_end.to_be_bytes();

        self.send_command(cmd::CASET, &[xs_hi, xs_lo, xe_hi, xe_lo])?;
        self.send_command(cmd::PASET, &[ys_hi, ys_lo, ye_hi, ye_lo])?;
        self.command(cmd::RAMWR)
    }

    /// Stream pixels in one data phase; returns the number sent
    pub fn write_pixels<I>(&mut self, pixels: I) -> Result<usize, DisplayError>
    where
        I: IntoIterator<Item = Rgb565>,
    {
        self.pins.dc_data()?;
        let mut count = 0usize;
        self.transaction(|spi| {
            let mut chunk = [0u8; CHUNK_BYTES];
            let mut len = 0;
            for pixel in pixels {
                chunk[len..len + 2].copy_from_slice(&pixel.to_be_bytes());
                len += 2;
                count += 1;
                if len == CHUNK_BYTES {
                    spi.write(&chunk)?;
                    len = 0;
                }
            }
            if len > 0 {
                spi.write(&chunk[..len])?;
            }
            Ok(())
        })?;
        Ok(count)
    }

    /// Color inversion on or off
    pub fn invert(&mut self, invert: bool) -> Result<(), DisplayError> {
        self.command(if invert { cmd::INVON } else { cmd::INVOFF })
    }

    /// Write the memory access control register
    pub fn set_madctl(&mut self, value: u8) -> Result<(), DisplayError> {
        self.send_command(cmd::MADCTL, &[value])
    }

    /// Pulse the reset line (no-op without a reset pin)
    pub fn hardware_reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), DisplayError> {
        if !self.pins.has_reset() {
            return Ok(());
        }
        self.pins.reset_assert()?;
        delay.delay_ms(RESET_DELAY_MS);
        self.pins.reset_deassert()?;
        delay.delay_ms(RESET_DELAY_MS);
        Ok(())
    }

    /// Play an init table
    pub fn run_init_sequence<D: DelayNs>(
        &mut self,
        table: &'static [u8],
        delay: &mut D,
    ) -> Result<usize, DisplayError> {
        let mut sent = 0;
        for entry in InitCommands::new(table) {
            self.send_command(entry.command, entry.args)?;
            if entry.delay_ms > 0 {
                delay.delay_ms(entry.delay_ms);
            }
            sent += 1;
        }
        Ok(sent)
    }
}
