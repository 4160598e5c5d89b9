//! Periodic tick source
//!
//! The sequencer advances on a fixed-rate tick: one tick is 1/8 of a 96th
//! note, so a quarter note lasts 24 * 8 ticks. On the target board the tick
//! is a compare-match interrupt of a 16-bit timer clocked from the peripheral
//! clock through a prescaler; [`TimerConfig`] reproduces that arithmetic so
//! the host-side tick runs at the same (truncated) rate.

#[cfg(feature = "realtime")]
pub mod thread;

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[cfg(feature = "realtime")]
pub use thread::{ThreadTicks, TickThread};

/// Tempo applied by `begin()`, in quarter notes per minute
pub const DEFAULT_TEMPO: u16 = 80;

/// Ticks per quarter note (24 96th notes, 8 ticks each)
pub const TICKS_PER_QUARTER: u32 = 24 * 8;

const MICROS_PER_MINUTE: u64 = 60_000_000;

/// Clocking of the hardware tick timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Timer input clock in Hz
    pub peripheral_clock_hz: u32,
    /// Prescaler between the clock and the counter
    pub prescaler: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        TimerConfig {
            peripheral_clock_hz: 48_000_000,
            prescaler: 64,
        }
    }
}

impl TimerConfig {
    /// Compare-match count for `bpm`, saturated into the 16-bit register.
    ///
    /// `None` for a zero tempo or a zero prescaler.
    pub fn compare_match(&self, bpm: u16) -> Option<u16> {
        if bpm == 0 || self.prescaler == 0 {
            return None;
        }
        let clock_mhz = (self.peripheral_clock_hz / 1_000_000) as u64;
        let count = MICROS_PER_MINUTE * clock_mhz
            / (bpm as u64 * TICKS_PER_QUARTER as u64 * self.prescaler as u64);
        Some(count.min(u16::MAX as u64) as u16)
    }

    /// Tick period produced by a compare-match count
    pub fn period_of(&self, compare: u16) -> Duration {
        if self.peripheral_clock_hz == 0 {
            return Duration::ZERO;
        }
        let nanos = compare as u64 * self.prescaler as u64 * 1_000_000_000
            / self.peripheral_clock_hz as u64;
        Duration::from_nanos(nanos)
    }

    /// Tick timing for `bpm`, `None` when [`TimerConfig::compare_match`] is
    pub fn tick_period(&self, bpm: u16) -> Option<TickPeriod> {
        let compare = self.compare_match(bpm)?;
        Some(TickPeriod {
            compare,
            period: self.period_of(compare),
        })
    }
}

/// Programmed tick timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPeriod {
    /// Compare-match count loaded into the timer
    pub compare: u16,
    /// Resulting time between ticks
    pub period: Duration,
}

impl TickPeriod {
    /// Ticks per second
    pub fn frequency(&self) -> f64 {
        let secs = self.period.as_secs_f64();
        if secs > 0.0 {
            1.0 / secs
        } else {
            0.0
        }
    }
}

/// Periodic timer that drives the sequencer's tick handler
///
/// Only the programming side lives here: whoever owns the timer (an
/// interrupt vector, a host thread, a test loop) calls the player's
/// `on_tick` when it fires.
pub trait TickSource: Send {
    /// Load a new period and restart the count from zero.
    ///
    /// The next tick comes one full period after this call regardless of
    /// how far the previous period had run.
    fn program(&mut self, period: TickPeriod);
}

/// Tick source for hosts that call `on_tick` themselves
///
/// Remembers what was programmed so the host can pace its own loop (or not
/// pace it at all, as tests do).
#[derive(Debug, Clone, Default)]
pub struct ManualTicks {
    period: Option<TickPeriod>,
    restarts: usize,
}

impl ManualTicks {
    /// Create an unprogrammed source
    pub fn new() -> Self {
        Self::default()
    }

    /// Last programmed period
    pub fn period(&self) -> Option<TickPeriod> {
        self.period
    }

    /// Number of times the count was restarted
    pub fn restarts(&self) -> usize {
        self.restarts
    }
}

impl TickSource for ManualTicks {
    fn program(&mut self, period: TickPeriod) {
        self.period = Some(period);
        self.restarts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_compare_match() {
        let config = TimerConfig::default();
        // 60e6 * 48 / (80 * 192 * 64) = 2929.6875
        assert_eq!(config.compare_match(80), Some(2929));
        assert_eq!(config.compare_match(104), Some(2253));
    }

    #[test]
    fn test_zero_tempo_ignored() {
        let config = TimerConfig::default();
        assert_eq!(config.compare_match(0), None);
        assert!(config.tick_period(0).is_none());

        let broken = TimerConfig {
            prescaler: 0,
            ..config
        };
        assert_eq!(broken.compare_match(120), None);
    }

    #[test]
    fn test_compare_match_saturates() {
        let config = TimerConfig {
            peripheral_clock_hz: 48_000_000,
            prescaler: 1,
        };
        assert_eq!(config.compare_match(1), Some(u16::MAX));
    }

    #[test]
    fn test_tick_period_close_to_ideal() {
        let config = TimerConfig::default();
        let tick = config.tick_period(80).unwrap();
        let ideal = 60.0 / (80.0 * TICKS_PER_QUARTER as f64);
        assert_relative_eq!(tick.period.as_secs_f64(), ideal, max_relative = 1e-3);
        assert_relative_eq!(tick.frequency(), 1.0 / ideal, max_relative = 1e-3);
    }

    #[test]
    fn test_manual_ticks_records_programming() {
        let mut ticks = ManualTicks::new();
        assert!(ticks.period().is_none());
        let period = TimerConfig::default().tick_period(120).unwrap();
        ticks.program(period);
        ticks.program(period);
        assert_eq!(ticks.period(), Some(period));
        assert_eq!(ticks.restarts(), 2);
    }

    #[test]
    fn test_timer_config_json_defaults() {
        let config: TimerConfig = serde_json::from_str(r#"{"prescaler": 8}"#).unwrap();
        assert_eq!(config.peripheral_clock_hz, 48_000_000);
        assert_eq!(config.prescaler, 8);
    }
}
