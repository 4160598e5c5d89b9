//! YM2203 Register Definitions
//!
//! The OPN exposes one flat 8-bit register space. Addresses below 0x10 belong to
//! the SSG block (an AY-3-8910 compatible PSG), 0x20-0xB6 to the three FM channels.
//! Most FM registers are repeated per channel and per operator slot; the enum below
//! names the base address of each group.

use std::fmt;

/// Time the address latch needs before the data phase (> 17 master clocks)
pub const ADDRESS_SETUP_US: u32 = 5;

/// Operator slot offsets inside an FM register group, indexed by operator 1-4.
///
/// The chip orders slots 1, 3, 2, 4 in the address space.
pub const OPERATOR_OFFSETS: [u8; 4] = [0x00, 0x08, 0x04, 0x0C];

/// Base address of a YM2203 register group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// SSG tone period, low 8 bits (channel A; +2 per channel)
    SsgToneFreqLo = 0x00,
    /// SSG tone period, high 4 bits (channel A; +2 per channel)
    SsgToneFreqHi = 0x01,
    /// SSG noise period
    SsgNoiseFreq = 0x06,
    /// SSG mixer (tone/noise disable bits, active high). Write-only in practice.
    SsgMixing = 0x07,
    /// SSG level / envelope select (channel A; +1 per channel)
    SsgLevelEnv = 0x08,
    /// SSG envelope period, low byte
    SsgEnvFreqLo = 0x0B,
    /// SSG envelope period, high byte
    SsgEnvFreqHi = 0x0C,
    /// SSG envelope shape
    SsgEnvType = 0x0D,
    /// FM key on/off (operator mask in the high nibble, channel in the low bits)
    FmKeyOn = 0x28,
    /// Prescaler select 1
    FmPrescaler1 = 0x2D,
    /// Prescaler select 2
    FmPrescaler2 = 0x2E,
    /// Prescaler select 3
    FmPrescaler3 = 0x2F,
    /// Detune (bits 6-4) and multiple (bits 3-0)
    FmDetuneMulti = 0x30,
    /// Total level (7 bits)
    FmTotalLevel = 0x40,
    /// Key scale (bits 7-6) and attack rate (bits 4-0)
    FmKeyScaleAttack = 0x50,
    /// Decay rate
    FmDecayRate = 0x60,
    /// Sustain rate
    FmSustainRate = 0x70,
    /// Sustain level (bits 7-4) and release rate (bits 3-0)
    FmSustainRelease = 0x80,
    /// F-number, low 8 bits
    FmFreqLo = 0xA0,
    /// Block (bits 5-3) and F-number high 3 bits
    FmFreqHi = 0xA4,
    /// Feedback (bits 5-3) and algorithm (bits 2-0)
    FmFeedbackAlgorithm = 0xB0,
}

impl Register {
    /// Get the base address value
    pub fn addr(&self) -> u8 {
        *self as u8
    }

    /// Address of this register for a channel / operator offset
    pub fn at(&self, offset: u8) -> u8 {
        self.addr() + offset
    }

    /// Address of an FM per-operator register for `channel` (0-2) and `operator` (0-3)
    pub fn operator(&self, channel: usize, operator: usize) -> u8 {
        self.at(channel as u8 + OPERATOR_OFFSETS[operator])
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::SsgToneFreqLo => "SSG tone period low",
            Register::SsgToneFreqHi => "SSG tone period high",
            Register::SsgNoiseFreq => "SSG noise period",
            Register::SsgMixing => "SSG mixer",
            Register::SsgLevelEnv => "SSG level/envelope",
            Register::SsgEnvFreqLo => "SSG envelope period low",
            Register::SsgEnvFreqHi => "SSG envelope period high",
            Register::SsgEnvType => "SSG envelope shape",
            Register::FmKeyOn => "FM key on/off",
            Register::FmPrescaler1 => "prescaler 1",
            Register::FmPrescaler2 => "prescaler 2",
            Register::FmPrescaler3 => "prescaler 3",
            Register::FmDetuneMulti => "FM detune/multiple",
            Register::FmTotalLevel => "FM total level",
            Register::FmKeyScaleAttack => "FM key scale/attack rate",
            Register::FmDecayRate => "FM decay rate",
            Register::FmSustainRate => "FM sustain rate",
            Register::FmSustainRelease => "FM sustain level/release rate",
            Register::FmFreqLo => "FM F-number low",
            Register::FmFreqHi => "FM block/F-number high",
            Register::FmFeedbackAlgorithm => "FM feedback/algorithm",
        };
        write!(f, "0x{:02X} ({})", self.addr(), name)
    }
}

/// Settle-time class of a register address
///
/// After the data phase the chip is busy for a number of master clocks that
/// depends on which block the register belongs to. The host must not touch the
/// bus again before that time has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterClass {
    /// 0x00-0x27: SSG and timer registers, > 17 clocks
    Ssg,
    /// 0x28-0x9F: key-on and operator parameters, > 83 clocks
    FmParameter,
    /// 0xA0 and above: F-number and feedback/algorithm, > 47 clocks
    FmFrequency,
}

impl RegisterClass {
    /// Classify a register address
    pub fn of(addr: u8) -> Self {
        if addr >= Register::FmFreqLo.addr() {
            RegisterClass::FmFrequency
        } else if addr >= Register::FmKeyOn.addr() {
            RegisterClass::FmParameter
        } else {
            RegisterClass::Ssg
        }
    }

    /// Minimum hold time after the data phase, in microseconds
    pub fn settle_us(&self) -> u32 {
        match self {
            RegisterClass::Ssg => 5,
            RegisterClass::FmParameter => 21,
            RegisterClass::FmFrequency => 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_classes() {
        assert_eq!(RegisterClass::of(0x00), RegisterClass::Ssg);
        assert_eq!(RegisterClass::of(0x0D), RegisterClass::Ssg);
        assert_eq!(RegisterClass::of(0x27), RegisterClass::Ssg);
        assert_eq!(RegisterClass::of(0x28), RegisterClass::FmParameter);
        assert_eq!(RegisterClass::of(0x9F), RegisterClass::FmParameter);
        assert_eq!(RegisterClass::of(0xA0), RegisterClass::FmFrequency);
        assert_eq!(RegisterClass::of(0xB2), RegisterClass::FmFrequency);
    }

    #[test]
    fn test_settle_times() {
        assert_eq!(RegisterClass::Ssg.settle_us(), 5);
        assert_eq!(RegisterClass::FmParameter.settle_us(), 21);
        assert_eq!(RegisterClass::FmFrequency.settle_us(), 12);
    }

    #[test]
    fn test_operator_addressing() {
        // Slot order in the address space is 1, 3, 2, 4
        assert_eq!(Register::FmTotalLevel.operator(0, 0), 0x40);
        assert_eq!(Register::FmTotalLevel.operator(0, 1), 0x48);
        assert_eq!(Register::FmTotalLevel.operator(0, 2), 0x44);
        assert_eq!(Register::FmTotalLevel.operator(2, 3), 0x4E);
        assert_eq!(Register::SsgLevelEnv.at(2), 0x0A);
    }
}
