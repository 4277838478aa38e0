//! ILI9486 LCD Controller
//!
//! Command set, supported panel models and their initialization tables.
//! Commonly found on 3.5" 480×320 SPI displays.
//!
//! # Init table format
//!
//! ```text
//! cmd, flags, arg0 .. argN-1,  cmd, flags, ...,  0x00
//!      └─ bits 0-6: N, bit 7: wait 150 ms after the command
//! ```

use serde::{Deserialize, Serialize};

/// ILI9486 commands
pub mod cmd {
    pub const NOP: u8 = 0x00;        // No operation
    pub const SWRESET: u8 = 0x01;    // Software reset
    pub const RDDID: u8 = 0x04;      // Read display identification
    pub const RDDST: u8 = 0x09;      // Read display status
    pub const RDMODE: u8 = 0x0A;     // Read display power mode
    pub const RDMADCTL: u8 = 0x0B;   // Read memory access control
    pub const RDPIXFMT: u8 = 0x0C;   // Read pixel format
    pub const RDSELFDIAG: u8 = 0x0F; // Read self-diagnostic result
    pub const SLPIN: u8 = 0x10;      // Sleep in
    pub const SLPOUT: u8 = 0x11;     // Sleep out
    pub const NORON: u8 = 0x13;      // Normal display mode on
    pub const INVOFF: u8 = 0x20;     // Display inversion off
    pub const INVON: u8 = 0x21;      // Display inversion on
    pub const DISPOFF: u8 = 0x28;    // Display off
    pub const DISPON: u8 = 0x29;     // Display on
    pub const CASET: u8 = 0x2A;      // Column address set
    pub const PASET: u8 = 0x2B;      // Page address set
    pub const RAMWR: u8 = 0x2C;      // Memory write
    pub const MADCTL: u8 = 0x36;     // Memory access control
    pub const PIXFMT: u8 = 0x3A;     // Pixel format
    pub const PWCTR3: u8 = 0xC2;     // Power control 3
    pub const VMCTR1: u8 = 0xC5;     // VCOM control 1
    pub const READ_INDEX: u8 = 0xD9; // Index register for SPI register reads
    pub const GMCTRP1: u8 = 0xE0;    // Positive gamma correction
    pub const GMCTRN1: u8 = 0xE1;    // Negative gamma correction
}

/// MADCTL bits
pub mod madctl {
    pub const MY: u8 = 0x80;  // Row address order
    pub const MX: u8 = 0x40;  // Column address order
    pub const MV: u8 = 0x20;  // Row/column exchange
    pub const ML: u8 = 0x10;  // Vertical refresh order
    pub const BGR: u8 = 0x08; // BGR panel
}

/// Flag in an init table entry: wait after the command
pub const INIT_DELAY_FLAG: u8 = 0x80;

/// Wait applied for [`INIT_DELAY_FLAG`]
pub const INIT_DELAY_MS: u32 = 150;

/// Panel rotation relative to the model's native orientation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    #[serde(rename = "0")]
    Deg0,
    #[serde(rename = "90")]
    Deg90,
    #[serde(rename = "180")]
    Deg180,
    #[serde(rename = "270")]
    Deg270,
}

impl Rotation {
    /// Width and height swap at 90° and 270°
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    pub const fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

/// What a panel model contributes to setup
///
/// One implementation per supported panel; the session drives the bus.
pub trait ControllerModel {
    /// Human readable model name
    fn name(&self) -> &'static str;

    /// Width and height at [`Rotation::Deg0`]
    fn native_size(&self) -> (u16, u16);

    /// Register writes run once at setup, in init table format
    fn init_sequence(&self) -> &'static [u8];

    /// MADCTL value for a rotation
    fn madctl(&self, rotation: Rotation) -> u8;

    /// Whether the panel needs color inversion on
    fn inverted(&self) -> bool {
        false
    }

    /// Width and height at `rotation`
    fn size(&self, rotation: Rotation) -> (u16, u16) {
        let (w, h) = self.native_size();
        if rotation.swaps_axes() {
            (h, w)
        } else {
            (w, h)
        }
    }
}

/// Generic 3.5" 480×320 ILI9486 module
pub struct Tft35;

static TFT35_INIT: &[u8] = &[
    cmd::SWRESET, INIT_DELAY_FLAG,
    cmd::SLPOUT, INIT_DELAY_FLAG,
    cmd::PIXFMT, 1, 0x55,            // 16 bits per pixel
    cmd::PWCTR3, 1, 0x44,
    cmd::VMCTR1, 4, 0x00, 0x00, 0x00, 0x00,
    cmd::GMCTRP1, 15, 0x0F, 0x1F, 0x1C, 0x0C, 0x0F, 0x08, 0x48, 0x98,
                      0x37, 0x0A, 0x13, 0x04, 0x11, 0x0D, 0x00,
    cmd::GMCTRN1, 15, 0x0F, 0x32, 0x2E, 0x0B, 0x0D, 0x05, 0x47, 0x75,
                      0x37, 0x06, 0x10, 0x03, 0x24, 0x20, 0x00,
    cmd::MADCTL, 1, madctl::MV | madctl::BGR,
    cmd::DISPON, INIT_DELAY_FLAG,
    0x00,
];

impl ControllerModel for Tft35 {
    fn name(&self) -> &'static str {
        "ILI9486 3.5\" TFT"
    }

    fn native_size(&self) -> (u16, u16) {
        (480, 320)
    }

    fn init_sequence(&self) -> &'static [u8] {
        TFT35_INIT
    }

    fn madctl(&self, rotation: Rotation) -> u8 {
        match rotation {
            Rotation::Deg0 => madctl::MV | madctl::BGR,
            Rotation::Deg90 => madctl::MX | madctl::BGR,
            Rotation::Deg180 => madctl::MY | madctl::MX | madctl::MV | madctl::BGR,
            Rotation::Deg270 => madctl::MY | madctl::BGR,
        }
    }
}

/// Supported models, selected by configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    #[default]
    Tft35,
}

impl Model {
    pub const ALL: [Model; 1] = [Model::Tft35];

    /// The model's implementation
    pub fn controller(self) -> &'static dyn ControllerModel {
        match self {
            Model::Tft35 => &Tft35,
        }
    }

    /// Configuration key
    pub fn key(self) -> &'static str {
        match self {
            Model::Tft35 => "tft35",
        }
    }

    /// Look a model up by its configuration key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key().eq_ignore_ascii_case(key))
    }
}

/// One decoded init table entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitCommand {
    pub command: u8,
    pub args: &'static [u8],
    pub delay_ms: u32,
}

/// Iterator over an init table; stops at the terminator or a truncated entry
pub struct InitCommands {
    table: &'static [u8],
    pos: usize,
}

impl InitCommands {
    pub fn new(table: &'static [u8]) -> Self {
        Self { table, pos: 0 }
    }
}

impl Iterator for InitCommands {
    type Item = InitCommand;

    fn next(&mut self) -> Option<InitCommand> {
        let command = *self.table.get(self.pos)?;
        if command == cmd::NOP {
            return None;
        }
        let flags = *self.table.get(self.pos + 1)?;
        let count = (flags & !INIT_DELAY_FLAG) as usize;
        let start = self.pos + 2;
        let args = self.table.get(start..start + count)?;
        self.pos = start + count;
        Some(InitCommand {
            command,
            args,
            delay_ms: if flags & INIT_DELAY_FLAG != 0 { INIT_DELAY_MS } else { 0 },
        })
    }
}
