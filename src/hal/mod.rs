//! Hardware Abstraction Layer
//!
//! Thin seam over `embedded_hal`:
//! - SPI port with explicit chip-select framing
//! - GPIO control pins (D/C, reset, backlight)

pub mod gpio;
pub mod spi;

pub use gpio::{ControlPins, NoPin, Pin, PinError};
pub use spi::{BitOrder, ClockPhase, ClockPolarity, ExclusiveSpi, SpiConfig, SpiError, SpiPort};
