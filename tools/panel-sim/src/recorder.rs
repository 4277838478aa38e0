//! Recording bus and virtual panel
//!
//! [`Wire`] is the shared state behind the simulated SPI port and control
//! pins. Every byte is logged per transaction and also fed to a
//! [`VirtualPanel`], which decodes the command stream the way the
//! controller would: address window, memory write, and register reads.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use ili9486_spi_display::display::ili9486::cmd;
use ili9486_spi_display::hal::{SpiError, SpiPort};

/// One chip-select transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// D/C level at the time of select (true: data)
    pub data: bool,
    pub bytes: Vec<u8>,
}

/// Byte counts for a slice of traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficStats {
    pub transactions: usize,
    pub commands: usize,
    pub command_bytes: usize,
    pub data_bytes: usize,
}

impl TrafficStats {
    pub fn total_bytes(&self) -> usize {
        self.command_bytes + self.data_bytes
    }
}

/// Controller memory and registers as seen through the command stream
#[derive(Debug, Clone)]
pub struct VirtualPanel {
    width: u16,
    height: u16,
    gram: Vec<u16>,
    command: u8,
    params: Vec<u8>,
    columns: (u16, u16),
    pages: (u16, u16),
    cursor: (u16, u16),
    pending: Option<u8>,
    madctl: u8,
    pixfmt: u8,
    sleeping: bool,
    display_on: bool,
    inverted: bool,
    read_index: u8,
}

impl VirtualPanel {
    /// Panel with `width × height` of addressable memory, cleared to black
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            gram: vec![0; width as usize * height as usize],
            command: cmd::NOP,
            params: Vec::new(),
            columns: (0, width.saturating_sub(1)),
            pages: (0, height.saturating_sub(1)),
            cursor: (0, 0),
            pending: None,
            madctl: 0,
            pixfmt: 0x66,
            sleeping: true,
            display_on: false,
            inverted: false,
            read_index: 0,
        }
    }

    /// Re-dimension memory, e.g. after setup settled the orientation
    pub fn resize(&mut self, width: u16, height: u16) {
        *self = Self {
            madctl: self.madctl,
            pixfmt: self.pixfmt,
            sleeping: self.sleeping,
            display_on: self.display_on,
            inverted: self.inverted,
            ..Self::new(width, height)
        };
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Raw RGB565 word in panel memory
    pub fn pixel(&self, x: u16, y: u16) -> Option<u16> {
        if x < self.width && y < self.height {
            Some(self.gram[y as usize * self.width as usize + x as usize])
        } else {
            None
        }
    }

    pub fn madctl(&self) -> u8 {
        self.madctl
    }

    pub fn is_display_on(&self) -> bool {
        self.display_on && !self.sleeping
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    fn on_command(&mut self, command: u8) {
        self.command = command;
        self.params.clear();
        self.pending = None;
        match command {
            cmd::SWRESET => {
                self.madctl = 0;
                self.pixfmt = 0x66;
                self.sleeping = true;
                self.display_on = false;
                self.inverted = false;
            }
            cmd::SLPIN => self.sleeping = true,
            cmd::SLPOUT => self.sleeping = false,
            cmd::DISPOFF => self.display_on = false,
            cmd::DISPON => self.display_on = true,
            cmd::INVOFF => self.inverted = false,
            cmd::INVON => self.inverted = true,
            cmd::RAMWR => self.cursor = (self.columns.0, self.pages.0),
            _ => {}
        }
    }

    fn on_data(&mut self, byte: u8) {
        if self.command == cmd::RAMWR {
            match self.pending.take() {
                None => self.pending = Some(byte),
                Some(high) => self.write_pixel(u16::from_be_bytes([high, byte])),
            }
            return;
        }

        self.params.push(byte);
        match (self.command, self.params.as_slice()) {
            (cmd::CASET, [s0, s1, e0, e1]) => {
                self.columns = (u16::from_be_bytes([*s0, *s1]), u16::from_be_bytes([*e0, *e1]));
            }
            (cmd::PASET, [s0, s1, e0, e1]) => {
                self.pages = (u16::from_be_bytes([*s0, *s1]), u16::from_be_bytes([*e0, *e1]));
            }
            (cmd::MADCTL, [value]) => self.madctl = *value,
            (cmd::PIXFMT, [value]) => self.pixfmt = *value,
            (cmd::READ_INDEX, [value]) => self.read_index = value.wrapping_sub(0x10),
            _ => {}
        }
    }

    /// Store at the cursor, then advance column first, wrapping inside the window
    fn write_pixel(&mut self, word: u16) {
        let (x, y) = self.cursor;
        if x < self.width && y < self.height {
            self.gram[y as usize * self.width as usize + x as usize] = word;
        }
        if x >= self.columns.1 {
            let next_row = if y >= self.pages.1 { self.pages.0 } else { y + 1 };
            self.cursor = (self.columns.0, next_row);
        } else {
            self.cursor = (x + 1, y);
        }
    }

    /// Parameter bytes a read of `command` returns
    fn register(&self, command: u8) -> Vec<u8> {
        match command {
            cmd::RDDID => vec![0x00, 0x00, 0x94, 0x86],
            cmd::RDDST => {
                let mut status = 0u8;
                if !self.sleeping {
                    status |= 0x08;
                }
                if self.display_on {
                    status |= 0x04;
                }
                vec![0x00, self.madctl, self.pixfmt, status, 0x00]
            }
            cmd::RDMODE => {
                let mut mode = 0x80 | 0x08;
                if !self.sleeping {
                    mode |= 0x10;
                }
                if self.display_on {
                    mode |= 0x04;
                }
                vec![0x00, mode]
            }
            cmd::RDMADCTL => vec![0x00, self.madctl],
            cmd::RDPIXFMT => vec![0x00, self.pixfmt],
            cmd::RDSELFDIAG => vec![0x00, 0xC0],
            _ => Vec::new(),
        }
    }

    fn respond(&self, buffer: &mut [u8]) {
        let register = self.register(self.command);
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = register.get(i).copied().unwrap_or(0);
        }
        log::debug!(
            "panel read {:#04x} (index register {}): {:02x?}",
            self.command,
            self.read_index,
            buffer
        );
    }
}

/// State shared by the port, the pins and the caller
#[derive(Debug)]
struct Wire {
    dc: bool,
    selected: bool,
    reset_low: bool,
    backlight: bool,
    transactions: Vec<Transaction>,
    current: Option<Transaction>,
    responses: VecDeque<u8>,
    panel: VirtualPanel,
}

/// Simulated SPI port; clones share one wire
#[derive(Debug, Clone)]
pub struct RecordingBus {
    wire: Rc<RefCell<Wire>>,
}

impl RecordingBus {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            wire: Rc::new(RefCell::new(Wire {
                dc: false,
                selected: false,
                reset_low: false,
                backlight: false,
                transactions: Vec::new(),
                current: None,
                responses: VecDeque::new(),
                panel: VirtualPanel::new(width, height),
            })),
        }
    }

    /// Output pin driving one control line of this bus
    pub fn pin(&self, line: Line) -> SimPin {
        SimPin {
            wire: self.wire.clone(),
            line,
        }
    }

    /// Transactions logged since the last call
    pub fn take_transactions(&self) -> Vec<Transaction> {
        std::mem::take(&mut self.wire.borrow_mut().transactions)
    }

    /// Bytes to return from the next reads instead of the panel's registers
    pub fn queue_response(&self, bytes: &[u8]) {
        self.wire.borrow_mut().responses.extend(bytes.iter().copied());
    }

    pub fn panel(&self) -> VirtualPanel {
        self.wire.borrow().panel.clone()
    }

    pub fn resize_panel(&self, width: u16, height: u16) {
        self.wire.borrow_mut().panel.resize(width, height);
    }

    pub fn backlight(&self) -> bool {
        self.wire.borrow().backlight
    }

    /// Count commands and bytes in a slice of transactions
    pub fn stats(transactions: &[Transaction]) -> TrafficStats {
        let mut stats = TrafficStats::default();
        for t in transactions {
            stats.transactions += 1;
            if t.data {
                stats.data_bytes += t.bytes.len();
            } else {
                stats.commands += 1;
                stats.command_bytes += t.bytes.len();
            }
        }
        stats
    }
}

impl SpiPort for RecordingBus {
    fn select(&mut self) -> Result<(), SpiError> {
        let mut wire = self.wire.borrow_mut();
        if wire.selected {
            return Err(SpiError::ChipSelect);
        }
        wire.selected = true;
        wire.current = Some(Transaction {
            data: wire.dc,
            bytes: Vec::new(),
        });
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), SpiError> {
        let mut wire = self.wire.borrow_mut();
        wire.selected = false;
        if let Some(t) = wire.current.take() {
            wire.transactions.push(t);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SpiError> {
        if self.wire.borrow().selected {
            Ok(())
        } else {
            Err(SpiError::ChipSelect)
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), SpiError> {
        let mut wire = self.wire.borrow_mut();
        if !wire.selected {
            return Err(SpiError::ChipSelect);
        }
        if wire.reset_low {
            log::warn!("write while the panel is held in reset");
        }
        let dc = wire.dc;
        for &byte in data {
            if dc {
                wire.panel.on_data(byte);
            } else {
                wire.panel.on_command(byte);
            }
        }
        if let Some(t) = wire.current.as_mut() {
            t.bytes.extend_from_slice(data);
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SpiError> {
        let mut wire = self.wire.borrow_mut();
        if !wire.selected {
            return Err(SpiError::ChipSelect);
        }
        if wire.responses.is_empty() {
            wire.panel.respond(buffer);
        } else {
            for byte in buffer.iter_mut() {
                *byte = wire.responses.pop_front().unwrap_or(0);
            }
        }
        Ok(())
    }
}

/// Control line a [`SimPin`] drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Dc,
    Reset,
    Backlight,
}

/// Output pin writing into the shared wire state
#[derive(Debug)]
pub struct SimPin {
    wire: Rc<RefCell<Wire>>,
    line: Line,
}

impl SimPin {
    fn set(&mut self, high: bool) {
        let mut wire = self.wire.borrow_mut();
        match self.line {
            Line::Dc => wire.dc = high,
            Line::Reset => {
                if !high && !wire.reset_low {
                    log::debug!("reset asserted");
                }
                wire.reset_low = !high;
            }
            Line::Backlight => wire.backlight = high,
        }
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.set(true);
        Ok(())
    }
}

/// Delay that accumulates simulated time instead of sleeping
#[derive(Debug, Default)]
pub struct SimDelay {
    elapsed_ns: u64,
}

impl SimDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(bus: &mut RecordingBus, dc: &mut SimPin, command: u8, params: &[u8]) {
        dc.set_low().unwrap();
        bus.select().unwrap();
        bus.write(&[command]).unwrap();
        bus.deselect().unwrap();
        if !params.is_empty() {
            dc.set_high().unwrap();
            bus.select().unwrap();
            bus.write(params).unwrap();
            bus.deselect().unwrap();
        }
    }

    #[test]
    fn test_memory_write_fills_window() {
        let mut bus = RecordingBus::new(8, 4);
        let mut dc = bus.pin(Line::Dc);
        send(&mut bus, &mut dc, cmd::CASET, &[0, 2, 0, 3]);
        send(&mut bus, &mut dc, cmd::PASET, &[0, 1, 0, 2]);
        send(&mut bus, &mut dc, cmd::RAMWR, &[0xF8, 0x00, 0x07, 0xE0, 0x00, 0x1F, 0xFF, 0xFF]);

        let panel = bus.panel();
        assert_eq!(panel.pixel(2, 1), Some(0xF800));
        assert_eq!(panel.pixel(3, 1), Some(0x07E0));
        assert_eq!(panel.pixel(2, 2), Some(0x001F));
        assert_eq!(panel.pixel(3, 2), Some(0xFFFF));
        assert_eq!(panel.pixel(4, 1), Some(0));
    }

    #[test]
    fn test_stats_split_commands_and_data() {
        let mut bus = RecordingBus::new(4, 4);
        let mut dc = bus.pin(Line::Dc);
        send(&mut bus, &mut dc, cmd::MADCTL, &[0x28]);
        send(&mut bus, &mut dc, cmd::DISPON, &[]);
        let stats = RecordingBus::stats(&bus.take_transactions());
        assert_eq!(stats.transactions, 3);
        assert_eq!(stats.commands, 2);
        assert_eq!(stats.data_bytes, 1);
        assert_eq!(stats.total_bytes(), 3);
        assert_eq!(bus.panel().madctl(), 0x28);
        assert!(bus.take_transactions().is_empty());
    }

    #[test]
    fn test_register_read_follows_state() {
        let mut bus = RecordingBus::new(4, 4);
        let mut dc = bus.pin(Line::Dc);
        send(&mut bus, &mut dc, cmd::SLPOUT, &[]);
        send(&mut bus, &mut dc, cmd::DISPON, &[]);
        send(&mut bus, &mut dc, cmd::RDMODE, &[]);
        let mut response = [0u8; 2];
        bus.select().unwrap();
        bus.read(&mut response).unwrap();
        bus.deselect().unwrap();
        assert_eq!(response, [0x00, 0x9C]);
    }

    #[test]
    fn test_write_without_select_is_rejected() {
        let mut bus = RecordingBus::new(4, 4);
        assert_eq!(bus.write(&[0x00]), Err(SpiError::ChipSelect));
    }

    #[test]
    fn test_delay_accumulates() {
        let mut delay = SimDelay::default();
        delay.delay_ms(150);
        delay.delay_us(500);
        assert_eq!(delay.elapsed_ms(), 150);
    }
}
