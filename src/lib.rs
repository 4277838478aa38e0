//! Verified frame buffer driver for ILI9486 SPI TFT panels
//!
//! The graphics layer draws into a RAM frame buffer; a periodic update pushes
//! only the bounding box of what changed since the last update.
//!
//! # Architecture
//!
//! ```text
//! Graphics (embedded-graphics DrawTarget)
//!     │ draw_pixel / fill
//!     ▼
//! ┌──────────────────────────────┐
//! │  Display session (Ili9486)   │
//! │  ┌─────────────┐ ┌─────────┐ │
//! │  │ FrameBuffer │ │  Dirty  │ │
//! │  │ 565 or 332  │ │ Region  │ │
//! │  └─────────────┘ └─────────┘ │
//! └──────────────┬───────────────┘
//!                │ update(): window + stream
//!                ▼
//!         ┌─────────────┐
//!         │  Transport  │  command / data framing
//!         └──────┬──────┘
//!                ▼
//!      ┌───────────────────┐
//!      │ SpiPort + pins    │  embedded-hal
//!      └─────────┬─────────┘
//!                ▼
//!           ILI9486 panel
//! ```
//!
//! # Verification
//!
//! The dirty region and the RGB565 packing carry Verus contracts:
//! - The dirty box always covers every marked pixel
//! - A flushed rectangle never leaves the panel
//! - Packing places the red channel's top bits in the high field
//!
//! The remaining conversion laws (lossless compact round trip, full-range
//! expansion) are covered by exhaustive unit tests rather than proofs.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod color;
pub mod config;
pub mod display;
pub mod hal;

// Re-export main types
pub use color::{Color, Rgb332, Rgb565};
pub use config::DisplayConfig;
pub use display::{
    ColorMode, DisplayError, Flush, FrameBuffer, Ili9486, Model, Rect, Rotation, UpdateState,
};
pub use hal::{ControlPins, ExclusiveSpi, NoPin, SpiConfig, SpiPort};
