//! Recording fakes for the HAL seam, shared by the display tests

use core::cell::RefCell;
use core::convert::Infallible;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::hal::{SpiError, SpiPort};

/// Everything observable on the wires, in order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Dc(bool),
    Reset(bool),
    Backlight(bool),
    Select,
    Deselect,
    Flush,
    Write(Vec<u8>),
    Read(usize),
}

#[derive(Default)]
struct BusLog {
    events: Vec<BusEvent>,
    responses: VecDeque<u8>,
    fail_writes: bool,
}

/// `SpiPort` that records into a log shared with its [`FakePin`]s
#[derive(Clone, Default)]
pub struct RecordingSpi {
    log: Rc<RefCell<BusLog>>,
}

impl RecordingSpi {
    pub fn events(&self) -> Vec<BusEvent> {
        self.log.borrow().events.clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().events.clear();
    }

    pub fn selects(&self) -> usize {
        self.log
            .borrow()
            .events
            .iter()
            .filter(|e| **e == BusEvent::Select)
            .count()
    }

    /// Bytes written per transaction, tagged with the D/C level at select
    pub fn transfers(&self) -> Vec<(bool, Vec<u8>)> {
        let mut dc = false;
        let mut out = Vec::new();
        let mut current: Option<(bool, Vec<u8>)> = None;
        for event in &self.log.borrow().events {
            match event {
                BusEvent::Dc(level) => dc = *level,
                BusEvent::Select => current = Some((dc, Vec::new())),
                BusEvent::Write(bytes) => {
                    if let Some((_, buf)) = current.as_mut() {
                        buf.extend_from_slice(bytes);
                    }
                }
                BusEvent::Deselect => out.extend(current.take()),
                _ => {}
            }
        }
        out
    }

    /// All bytes written in data-phase transactions
    pub fn data_bytes(&self) -> Vec<u8> {
        self.transfers()
            .into_iter()
            .filter(|(dc, _)| *dc)
            .flat_map(|(_, bytes)| bytes)
            .collect()
    }

    /// Command bytes in the order they were sent
    pub fn commands(&self) -> Vec<u8> {
        self.transfers()
            .into_iter()
            .filter(|(dc, _)| !*dc)
            .filter_map(|(_, bytes)| bytes.first().copied())
            .collect()
    }

    pub fn queue_response(&self, bytes: &[u8]) {
        self.log.borrow_mut().responses.extend(bytes.iter().copied());
    }

    pub fn fail_writes(&self, fail: bool) {
        self.log.borrow_mut().fail_writes = fail;
    }

    fn push(&self, event: BusEvent) {
        self.log.borrow_mut().events.push(event);
    }
}

impl SpiPort for RecordingSpi {
    fn select(&mut self) -> Result<(), SpiError> {
        self.push(BusEvent::Select);
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), SpiError> {
        self.push(BusEvent::Deselect);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SpiError> {
        self.push(BusEvent::Flush);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), SpiError> {
        if self.log.borrow().fail_writes {
            return Err(SpiError::Other);
        }
        self.push(BusEvent::Write(data.to_vec()));
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SpiError> {
        let mut log = self.log.borrow_mut();
        for byte in buffer.iter_mut() {
            *byte = log.responses.pop_front().unwrap_or(0);
        }
        log.events.push(BusEvent::Read(buffer.len()));
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Role {
    Dc,
    Reset,
    Backlight,
}

/// Output pin whose level changes land in the bus log
pub struct FakePin {
    log: Rc<RefCell<BusLog>>,
    role: Role,
}

impl FakePin {
    fn new(spi: &RecordingSpi, role: Role) -> Self {
        Self { log: spi.log.clone(), role }
    }

    pub fn dc(spi: &RecordingSpi) -> Self {
        Self::new(spi, Role::Dc)
    }

    pub fn reset(spi: &RecordingSpi) -> Self {
        Self::new(spi, Role::Reset)
    }

    pub fn backlight(spi: &RecordingSpi) -> Self {
        Self::new(spi, Role::Backlight)
    }

    fn set(&mut self, level: bool) {
        let event = match self.role {
            Role::Dc => BusEvent::Dc(level),
            Role::Reset => BusEvent::Reset(level),
            Role::Backlight => BusEvent::Backlight(level),
        };
        self.log.borrow_mut().events.push(event);
    }
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.set(true);
        Ok(())
    }
}

/// Delay that only adds up what it was asked to wait
#[derive(Default)]
pub struct FakeDelay {
    total_ns: u64,
}

impl FakeDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}
