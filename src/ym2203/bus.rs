//! Chip bus abstraction
//!
//! The YM2203 sits on an 8-bit parallel bus with a single address line (A0).
//! A0 = 0 selects the address latch (write) / status register (read), A0 = 1
//! selects the data port. Everything above this layer talks to the chip only
//! through [`ChipBus`], so the same driver runs against memory-mapped hardware
//! or the [`RecordingBus`] simulation used by tests and the CLI.

use std::time::{Duration, Instant};

/// Bus port selected by the A0 line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    /// A0 = 0: address latch on write, status register on read
    Address,
    /// A0 = 1: register data
    Data,
}

/// Raw byte transport to the chip
///
/// Implementations perform exactly one bus cycle per call and never fail;
/// bus faults are a platform concern. `delay_us` must be a deterministic wait
/// (busy loop or cycle counter), never a yield to a scheduler.
///
/// # Example
///
/// ```
/// use ym2203_mml::ym2203::bus::{ChipBus, Port, RecordingBus};
///
/// let mut bus = RecordingBus::new();
/// bus.write_port(Port::Address, 0x07);
/// bus.delay_us(5);
/// bus.write_port(Port::Data, 0x3F);
/// assert_eq!(bus.register(0x07), 0x3F);
/// ```
pub trait ChipBus: Send {
    /// Drive one write cycle on the given port
    fn write_port(&mut self, port: Port, value: u8);

    /// Drive one read cycle on the given port
    fn read_port(&mut self, port: Port) -> u8;

    /// Hold the bus for at least `micros` microseconds
    fn delay_us(&mut self, micros: u32);
}

/// Busy-wait delay on the host clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinDelay;

impl SpinDelay {
    /// Spin until `micros` microseconds have elapsed
    pub fn wait_us(micros: u32) {
        let deadline = Instant::now() + Duration::from_micros(micros as u64);
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// One register write observed on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    /// Simulated bus time of the data phase, in microseconds since creation
    pub time_us: u64,
    /// Latched register address
    pub address: u8,
    /// Value written
    pub value: u8,
}

/// Simulated chip bus that records every register write
///
/// Keeps a 256-byte register file behind the address latch, so reads return
/// what was last written, and accumulates requested delays into a simulated
/// clock. With `with_realtime_delays` the delays are also spun on the host.
#[derive(Debug, Clone)]
pub struct RecordingBus {
    latched: u8,
    registers: [u8; 256],
    writes: Vec<RegisterWrite>,
    address_cycles: usize,
    elapsed_us: u64,
    status: u8,
    realtime_delays: bool,
}

impl RecordingBus {
    /// Create a bus with an all-zero register file
    pub fn new() -> Self {
        RecordingBus {
            latched: 0,
            registers: [0; 256],
            writes: Vec::new(),
            address_cycles: 0,
            elapsed_us: 0,
            status: 0,
            realtime_delays: false,
        }
    }

    /// Create a bus whose delays really wait on the host clock
    pub fn with_realtime_delays() -> Self {
        RecordingBus {
            realtime_delays: true,
            ..Self::new()
        }
    }

    /// Current value of a register in the simulated chip
    pub fn register(&self, addr: u8) -> u8 {
        self.registers[addr as usize]
    }

    /// All register writes in bus order
    pub fn writes(&self) -> &[RegisterWrite] {
        &self.writes
    }

    /// Writes that targeted one register address
    pub fn writes_to(&self, addr: u8) -> impl Iterator<Item = &RegisterWrite> + '_ {
        self.writes.iter().filter(move |w| w.address == addr)
    }

    /// Number of address-latch cycles seen
    pub fn address_cycles(&self) -> usize {
        self.address_cycles
    }

    /// Simulated time spent in bus delays, in microseconds
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    /// Set the value returned by status reads
    pub fn set_status(&mut self, status: u8) {
        self.status = status;
    }

    /// Drop the recorded write log (register file is kept)
    pub fn clear_log(&mut self) {
        self.writes.clear();
        self.address_cycles = 0;
    }
}

impl Default for RecordingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChipBus for RecordingBus {
    fn write_port(&mut self, port: Port, value: u8) {
        match port {
            Port::Address => {
                self.latched = value;
                self.address_cycles += 1;
            }
            Port::Data => {
                self.registers[self.latched as usize] = value;
                self.writes.push(RegisterWrite {
                    time_us: self.elapsed_us,
                    address: self.latched,
                    value,
                });
            }
        }
    }

    fn read_port(&mut self, port: Port) -> u8 {
        match port {
            Port::Address => self.status,
            Port::Data => self.registers[self.latched as usize],
        }
    }

    fn delay_us(&mut self, micros: u32) {
        self.elapsed_us += micros as u64;
        if self.realtime_delays {
            SpinDelay::wait_us(micros);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_then_data() {
        let mut bus = RecordingBus::new();
        bus.write_port(Port::Address, 0x28);
        bus.write_port(Port::Data, 0xF1);

        assert_eq!(bus.register(0x28), 0xF1);
        assert_eq!(bus.address_cycles(), 1);
        assert_eq!(
            bus.writes(),
            &[RegisterWrite {
                time_us: 0,
                address: 0x28,
                value: 0xF1
            }]
        );
    }

    #[test]
    fn test_reads_follow_latch() {
        let mut bus = RecordingBus::new();
        bus.write_port(Port::Address, 0x07);
        bus.write_port(Port::Data, 0x3F);
        bus.set_status(0x80);

        assert_eq!(bus.read_port(Port::Data), 0x3F);
        assert_eq!(bus.read_port(Port::Address), 0x80);
    }

    #[test]
    fn test_delays_accumulate() {
        let mut bus = RecordingBus::new();
        bus.delay_us(5);
        bus.delay_us(21);
        bus.write_port(Port::Address, 0x00);
        bus.write_port(Port::Data, 0x12);

        assert_eq!(bus.elapsed_us(), 26);
        assert_eq!(bus.writes()[0].time_us, 26);
    }

    #[test]
    fn test_spin_delay_waits() {
        let start = Instant::now();
        SpinDelay::wait_us(200);
        assert!(start.elapsed() >= Duration::from_micros(200));
    }
}
