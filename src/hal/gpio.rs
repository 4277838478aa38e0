//! Control pins for the display
//!
//! The controller needs one mandatory and two optional GPIO outputs besides
//! the SPI lines.
//!
//! # Pin Assignments
//!
//! | Role | Function                      | Required |
//! |------|-------------------------------|----------|
//! | DC   | Data/Command (mode select)    | yes      |
//! | RST  | Hardware reset, active low    | no       |
//! | BL   | Backlight (LED) enable        | no       |
//!
//! Absent optional pins are represented by [`NoPin`].

use core::convert::Infallible;
use embedded_hal::digital::{ErrorType, OutputPin};

/// Pin roles, used in error reports
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pin {
    /// Data/Command select
    Dc,
    /// Reset
    Rst,
    /// Backlight
    Backlight,
}

/// A control pin could not be driven
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinError(pub Pin);

impl core::fmt::Display for PinError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?} pin could not be driven", self.0)
    }
}

/// Placeholder for an unconnected optional pin
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// D/C, reset and backlight outputs
pub struct ControlPins<DC, RST = NoPin, BL = NoPin> {
    dc: DC,
    reset: Option<RST>,
    backlight: Option<BL>,
}

impl<DC: OutputPin> ControlPins<DC, NoPin, NoPin> {
    /// Only the mandatory D/C pin is wired
    pub fn new(dc: DC) -> Self {
        Self {
            dc,
            reset: None,
            backlight: None,
        }
    }
}

impl<DC, RST, BL> ControlPins<DC, RST, BL>
where
    DC: OutputPin,
    RST: OutputPin,
    BL: OutputPin,
{
    /// All three pins, any of the optional ones may be `None`
    pub fn with_pins(dc: DC, reset: Option<RST>, backlight: Option<BL>) -> Self {
        Self { dc, reset, backlight }
    }

    /// Attach a reset pin
    pub fn reset_pin<R: OutputPin>(self, reset: R) -> ControlPins<DC, R, BL> {
        ControlPins {
            dc: self.dc,
            reset: Some(reset),
            backlight: self.backlight,
        }
    }

    /// Attach a backlight pin
    pub fn backlight_pin<B: OutputPin>(self, backlight: B) -> ControlPins<DC, RST, B> {
        ControlPins {
            dc: self.dc,
            reset: self.reset,
            backlight: Some(backlight),
        }
    }

    pub fn has_reset(&self) -> bool {
        self.reset.is_some()
    }

    pub fn has_backlight(&self) -> bool {
        self.backlight.is_some()
    }

    /// Give the pins back
    pub fn release(self) -> (DC, Option<RST>, Option<BL>) {
        (self.dc, self.reset, self.backlight)
    }
}

/// Display control helper functions
impl<DC, RST, BL> ControlPins<DC, RST, BL>
where
    DC: OutputPin,
    RST: OutputPin,
    BL: OutputPin,
{
    /// Set DC pin for command mode (low)
    #[inline]
    pub fn dc_command(&mut self) -> Result<(), PinError> {
        self.dc.set_low().map_err(|_| PinError(Pin::Dc))
    }

    /// Set DC pin for data mode (high)
    #[inline]
    pub fn dc_data(&mut self) -> Result<(), PinError> {
        self.dc.set_high().map_err(|_| PinError(Pin::Dc))
    }

    /// Assert reset (active low); no-op without a reset pin
    #[inline]
    pub fn reset_assert(&mut self) -> Result<(), PinError> {
        match self.reset.as_mut() {
            Some(pin) => pin.set_low().map_err(|_| PinError(Pin::Rst)),
            None => Ok(()),
        }
    }

    /// Deassert reset
    #[inline]
    pub fn reset_deassert(&mut self) -> Result<(), PinError> {
        match self.reset.as_mut() {
            Some(pin) => pin.set_high().map_err(|_| PinError(Pin::Rst)),
            None => Ok(()),
        }
    }

    /// Turn backlight on
    #[inline]
    pub fn backlight_on(&mut self) -> Result<(), PinError> {
        match self.backlight.as_mut() {
            Some(pin) => pin.set_high().map_err(|_| PinError(Pin::Backlight)),
            None => Ok(()),
        }
    }

    /// Turn backlight off
    #[inline]
    pub fn backlight_off(&mut self) -> Result<(), PinError> {
        match self.backlight.as_mut() {
            Some(pin) => pin.set_low().map_err(|_| PinError(Pin::Backlight)),
            None => Ok(()),
        }
    }
}
