//! Hand-written fakes shared by the unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{self, ErrorKind, Operation};

use crate::sensors::{AnalogChannel, AnalogFrontEnd, PowerMonitor};
use crate::sink::{Console, FileStore};

/// Volts per code of the ADS1115 at its default gain.
pub const DEFAULT_VOLTS_PER_CODE: f32 = 0.0001875;

pub struct FakeAnalog {
    pub codes: [i16; 4],
    pub volts_per_code: f32,
    pub reads: Vec<AnalogChannel>,
}

impl FakeAnalog {
    pub fn uniform(code: i16) -> Self {
        Self::with_codes([code; 4])
    }

    pub fn with_codes(codes: [i16; 4]) -> Self {
        Self {
            codes,
            volts_per_code: DEFAULT_VOLTS_PER_CODE,
            reads: Vec::new(),
        }
    }
}

impl AnalogFrontEnd for FakeAnalog {
    fn read_single_ended(&mut self, channel: AnalogChannel) -> i16 {
        self.reads.push(channel);
        self.codes[usize::from(channel.index())]
    }

    fn compute_volts(&self, raw: i16) -> f32 {
        f32::from(raw) * self.volts_per_code
    }
}

pub struct FakePowerMonitor {
    pub bus_voltage: f32,
    pub current: f32,
    pub power: f32,
}

impl FakePowerMonitor {
    pub fn new(bus_voltage: f32, current: f32, power: f32) -> Self {
        Self {
            bus_voltage,
            current,
            power,
        }
    }
}

impl PowerMonitor for FakePowerMonitor {
    fn read_bus_voltage(&mut self) -> f32 {
        self.bus_voltage
    }

    fn read_current(&mut self) -> f32 {
        self.current
    }

    fn read_power(&mut self) -> f32 {
        self.power
    }
}

/// Console that keeps every line; clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingConsole {
    lines: Rc<RefCell<Vec<String>>>,
}

impl RecordingConsole {
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl Console for RecordingConsole {
    fn write_line(&mut self, line: &str) {
        self.lines.borrow_mut().push(line.into());
    }
}

/// Byte stream for `SerialConsole`; clones share the same buffer.
#[derive(Clone, Default)]
pub struct ByteLog {
    bytes: Rc<RefCell<Vec<u8>>>,
    failing: bool,
}

impl ByteLog {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.bytes.borrow().clone()).unwrap()
    }
}

impl embedded_io::ErrorType for ByteLog {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Write for ByteLog {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.failing {
            return Err(embedded_io::ErrorKind::BrokenPipe);
        }
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Default)]
struct StoreState {
    files: Vec<(String, String)>,
    events: Vec<String>,
    fail_open: bool,
    fail_write: bool,
}

/// In-memory file store; clones share the same files.
#[derive(Clone, Default)]
pub struct MemoryFileStore {
    state: Rc<RefCell<StoreState>>,
}

#[derive(Debug)]
pub struct MemoryFile {
    index: usize,
}

impl MemoryFileStore {
    pub fn fail_open(&self) {
        self.state.borrow_mut().fail_open = true;
    }

    pub fn fail_write(&self) {
        self.state.borrow_mut().fail_write = true;
    }

    pub fn contents(&self, name: &str) -> Option<String> {
        self.state
            .borrow()
            .files
            .iter()
            .find(|(file_name, _)| file_name == name)
            .map(|(_, contents)| contents.clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.state
            .borrow()
            .files
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// `open <name>` / `close <name>` in call order.
    pub fn events(&self) -> Vec<String> {
        self.state.borrow().events.clone()
    }
}

impl FileStore for MemoryFileStore {
    type File = MemoryFile;
    type Error = &'static str;

    fn open(&mut self, name: &str) -> Result<MemoryFile, &'static str> {
        let mut state = self.state.borrow_mut();
        if state.fail_open {
            return Err("open failed");
        }
        state.files.push((name.into(), String::new()));
        state.events.push(format!("open {name}"));
        Ok(MemoryFile {
            index: state.files.len() - 1,
        })
    }

    fn write(&mut self, file: &mut MemoryFile, bytes: &[u8]) -> Result<(), &'static str> {
        let mut state = self.state.borrow_mut();
        if state.fail_write {
            return Err("write failed");
        }
        let text = core::str::from_utf8(bytes).map_err(|_| "not utf-8")?;
        state.files[file.index].1.push_str(text);
        Ok(())
    }

    fn close(&mut self, file: MemoryFile) -> Result<(), &'static str> {
        let mut state = self.state.borrow_mut();
        let name = state.files[file.index].0.clone();
        state.events.push(format!("close {name}"));
        Ok(())
    }
}

/// Indicator pin that records every level it is driven to.
#[derive(Clone, Default)]
pub struct FakeLed {
    levels: Rc<RefCell<Vec<bool>>>,
}

impl FakeLed {
    pub fn levels(&self) -> Vec<bool> {
        self.levels.borrow().clone()
    }

    pub fn clear(&self) {
        self.levels.borrow_mut().clear();
    }
}

impl digital::ErrorType for FakeLed {
    type Error = core::convert::Infallible;
}

impl OutputPin for FakeLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

/// Register-file I2C bus. A write stores the bytes after the register
/// pointer; a read returns them (zero-filled when unset).
#[derive(Default)]
pub struct FakeI2c {
    registers: BTreeMap<(u8, u8), Vec<u8>>,
    frozen: BTreeSet<(u8, u8)>,
    writes: Vec<(u8, Vec<u8>)>,
    failing: bool,
}

impl FakeI2c {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_register(&mut self, address: u8, register: u8, bytes: &[u8]) {
        self.registers.insert((address, register), bytes.to_vec());
    }

    /// Later writes to this register are recorded but not stored.
    pub fn freeze_register(&mut self, address: u8, register: u8) {
        self.frozen.insert((address, register));
    }

    pub fn fail_all(&mut self) {
        self.failing = true;
    }

    /// Payload of the most recent write to `register`, without the pointer.
    pub fn last_write_to(&self, address: u8, register: u8) -> Option<Vec<u8>> {
        self.writes
            .iter()
            .rev()
            .find(|(addr, bytes)| *addr == address && bytes.len() > 1 && bytes[0] == register)
            .map(|(_, bytes)| bytes[1..].to_vec())
    }
}

impl i2c::ErrorType for FakeI2c {
    type Error = ErrorKind;
}

impl i2c::I2c for FakeI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.failing {
            return Err(ErrorKind::Bus);
        }

        let mut pointer = None;
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    self.writes.push((address, bytes.to_vec()));
                    if let Some((&register, payload)) = bytes.split_first() {
                        pointer = Some(register);
                        if !payload.is_empty() && !self.frozen.contains(&(address, register)) {
                            self.registers.insert((address, register), payload.to_vec());
                        }
                    }
                }
                Operation::Read(buffer) => {
                    buffer.fill(0);
                    let stored = pointer.and_then(|register| self.registers.get(&(address, register)));
                    if let Some(stored) = stored {
                        let len = stored.len().min(buffer.len());
                        buffer[..len].copy_from_slice(&stored[..len]);
                    }
                }
            }
        }
        Ok(())
    }
}
