//! SPI seam between the display driver and the platform HAL
//!
//! The driver talks to an [`SpiPort`]: a bus it can select, write and read
//! while holding chip select for as long as one logical transaction lasts.
//! [`ExclusiveSpi`] provides that on top of any `embedded_hal` SPI bus plus a
//! chip-select pin, so board crates only hand over their HAL objects.
//!
//! # Bus settings for the ILI9486
//!
//! - SPI mode 0 (CPOL=0, CPHA=0)
//! - MSB first
//! - 20 MHz write clock
//! - CS active low

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{self, SpiBus};
use serde::{Deserialize, Serialize};

/// Maximum write clock the ILI9486 serial interface accepts
pub const MAX_CLOCK_HZ: u32 = 20_000_000;

/// Bit order on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

/// Clock idle level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockPolarity {
    IdleLow,
    IdleHigh,
}

/// Clock edge on which data is sampled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockPhase {
    /// Sample on the leading edge
    Leading,
    /// Sample on the trailing edge
    Trailing,
}

/// SPI configuration
///
/// The HAL owns the peripheral, so these are the settings the caller must
/// program into it; [`SpiConfig::mode`] converts to the `embedded_hal` form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiConfig {
    /// Bus clock in Hz
    pub clock_hz: u32,
    pub bit_order: BitOrder,
    pub polarity: ClockPolarity,
    pub phase: ClockPhase,
}

impl SpiConfig {
    /// 20 MHz, mode 0, MSB first
    pub const DISPLAY: Self = Self {
        clock_hz: MAX_CLOCK_HZ,
        bit_order: BitOrder::MsbFirst,
        polarity: ClockPolarity::IdleLow,
        phase: ClockPhase::Leading,
    };

    /// SPI mode for `embedded_hal` based HALs
    pub fn mode(&self) -> spi::Mode {
        spi::Mode {
            polarity: match self.polarity {
                ClockPolarity::IdleLow => spi::Polarity::IdleLow,
                ClockPolarity::IdleHigh => spi::Polarity::IdleHigh,
            },
            phase: match self.phase {
                ClockPhase::Leading => spi::Phase::CaptureOnFirstTransition,
                ClockPhase::Trailing => spi::Phase::CaptureOnSecondTransition,
            },
        }
    }

    /// Mode number 0-3
    pub fn mode_number(&self) -> u8 {
        let cpol = matches!(self.polarity, ClockPolarity::IdleHigh) as u8;
        let cpha = matches!(self.phase, ClockPhase::Trailing) as u8;
        (cpol << 1) | cpha
    }
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self::DISPLAY
    }
}

/// Byte-level bus used by the transaction layer
///
/// A transaction is `select`, any number of `write`/`read`, `deselect`.
pub trait SpiPort {
    /// Assert chip select
    fn select(&mut self) -> Result<(), SpiError>;

    /// Wait for the bus to drain, then release chip select
    fn deselect(&mut self) -> Result<(), SpiError>;

    /// Wait until every written byte has left the bus, keeping chip select
    fn flush(&mut self) -> Result<(), SpiError>;

    /// Write-only transfer (ignore received data)
    fn write(&mut self, data: &[u8]) -> Result<(), SpiError>;

    /// Read-only transfer (clock out zeros)
    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SpiError>;
}

impl<T: SpiPort + ?Sized> SpiPort for &mut T {
    fn select(&mut self) -> Result<(), SpiError> {
        (**self).select()
    }

    fn deselect(&mut self) -> Result<(), SpiError> {
        (**self).deselect()
    }

    fn flush(&mut self) -> Result<(), SpiError> {
        (**self).flush()
    }

    fn write(&mut self, data: &[u8]) -> Result<(), SpiError> {
        (**self).write(data)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SpiError> {
        (**self).read(buffer)
    }
}

/// Exclusive use of an `embedded_hal` SPI bus with a dedicated chip select
pub struct ExclusiveSpi<BUS, CS> {
    bus: BUS,
    cs: CS,
}

impl<BUS, CS> ExclusiveSpi<BUS, CS>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
{
    /// Take ownership of the bus and chip select; CS starts released.
    pub fn new(bus: BUS, mut cs: CS) -> Result<Self, SpiError> {
        cs.set_high().map_err(|_| SpiError::ChipSelect)?;
        Ok(Self { bus, cs })
    }

    /// Give the HAL objects back
    pub fn release(self) -> (BUS, CS) {
        (self.bus, self.cs)
    }
}

impl<BUS, CS> SpiPort for ExclusiveSpi<BUS, CS>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
{
    fn select(&mut self) -> Result<(), SpiError> {
        self.cs.set_low().map_err(|_| SpiError::ChipSelect)
    }

    fn deselect(&mut self) -> Result<(), SpiError> {
        let flushed = self.bus.flush().map_err(SpiError::from_hal);
        // Release CS even when the flush failed
        self.cs.set_high().map_err(|_| SpiError::ChipSelect)?;
        flushed
    }

    fn flush(&mut self) -> Result<(), SpiError> {
        self.bus.flush().map_err(SpiError::from_hal)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), SpiError> {
        self.bus.write(data).map_err(SpiError::from_hal)
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SpiError> {
        self.bus.read(buffer).map_err(SpiError::from_hal)
    }
}

/// SPI errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiError {
    /// Chip select pin could not be driven
    ChipSelect,
    /// Receive FIFO overrun
    Overrun,
    /// Mode fault (another master drove the bus)
    ModeFault,
    /// Any other HAL-reported failure
    Other,
}

impl SpiError {
    fn from_hal<E: spi::Error>(err: E) -> Self {
        match err.kind() {
            spi::ErrorKind::Overrun => SpiError::Overrun,
            spi::ErrorKind::ModeFault => SpiError::ModeFault,
            _ => SpiError::Other,
        }
    }
}

impl core::fmt::Display for SpiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SpiError::ChipSelect => write!(f, "chip select pin failed"),
            SpiError::Overrun => write!(f, "SPI receive overrun"),
            SpiError::ModeFault => write!(f, "SPI mode fault"),
            SpiError::Other => write!(f, "SPI bus error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    #[derive(Default)]
    struct FakeBus {
        written: Vec<u8>,
        flushes: usize,
    }

    impl spi::ErrorType for FakeBus {
        type Error = Infallible;
    }

    impl SpiBus<u8> for FakeBus {
        fn read(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
            words.fill(0xA5);
            Ok(())
        }
        fn write(&mut self, words: &[u8]) -> Result<(), Infallible> {
            self.written.extend_from_slice(words);
            Ok(())
        }
        fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Infallible> {
            self.written.extend_from_slice(write);
            read.fill(0);
            Ok(())
        }
        fn transfer_in_place(&mut self, _words: &mut [u8]) -> Result<(), Infallible> {
            Ok(())
        }
        fn flush(&mut self) -> Result<(), Infallible> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeCs {
        levels: Vec<bool>,
    }

    impl embedded_hal::digital::ErrorType for FakeCs {
        type Error = Infallible;
    }

    impl OutputPin for FakeCs {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.levels.push(false);
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.levels.push(true);
            Ok(())
        }
    }

    #[test]
    fn test_display_config_is_mode_0() {
        let cfg = SpiConfig::default();
        assert_eq!(cfg.mode_number(), 0);
        assert_eq!(cfg.mode(), spi::MODE_0);
        assert_eq!(cfg.clock_hz, MAX_CLOCK_HZ);
        assert_eq!(cfg.bit_order, BitOrder::MsbFirst);
    }

    #[test]
    fn test_mode_number() {
        let cfg = SpiConfig {
            polarity: ClockPolarity::IdleHigh,
            phase: ClockPhase::Trailing,
            ..SpiConfig::DISPLAY
        };
        assert_eq!(cfg.mode_number(), 3);
        assert_eq!(cfg.mode(), spi::MODE_3);
    }

    #[test]
    fn test_exclusive_spi_frames_chip_select() {
        let mut port = ExclusiveSpi::new(FakeBus::default(), FakeCs::default()).unwrap();
        port.select().unwrap();
        port.write(&[0x2A, 0x00]).unwrap();
        let mut rx = [0u8; 2];
        port.read(&mut rx).unwrap();
        port.deselect().unwrap();

        let (bus, cs) = port.release();
        assert_eq!(bus.written, [0x2A, 0x00]);
        assert_eq!(bus.flushes, 1);
        assert_eq!(rx, [0xA5, 0xA5]);
        // released at construction, asserted, released
        assert_eq!(cs.levels, [true, false, true]);
    }
}
