//! YM2203 (OPN) chip interface
//!
//! Register-level driver for the three FM channels and the three SSG channels
//! of the YM2203, talking to the chip through a [`ChipBus`].
//!
//! - `registers` - address map and per-class settle times
//! - `bus` - raw port transport and the recording simulation
//! - `mixer` - soft mirror of the write-only SSG mixer register
//! - `tables` - pitch tables
//! - `chip` - logical operations (pitch, key on/off, volume, envelope, voice)

pub mod bus;
pub mod chip;
pub mod mixer;
pub mod registers;
pub mod tables;

/// Number of FM channels
pub const FM_CH_NUM: usize = 3;
/// Number of SSG channels
pub const SSG_CH_NUM: usize = 3;
/// Total channel count; channels 0-2 are FM, 3-5 are SSG A-C
pub const ALL_CH_NUM: usize = FM_CH_NUM + SSG_CH_NUM;

/// FM channel 1
pub const FM_CH1: usize = 0;
/// FM channel 2
pub const FM_CH2: usize = 1;
/// FM channel 3
pub const FM_CH3: usize = 2;
/// SSG channel A
pub const SSG_CH_A: usize = 3;
/// SSG channel B
pub const SSG_CH_B: usize = 4;
/// SSG channel C
pub const SSG_CH_C: usize = 5;

/// Which block of the chip a channel id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// FM channel, index 0-2 within the FM block
    Fm(usize),
    /// SSG channel, index 0-2 within the SSG block
    Ssg(usize),
}

impl ChannelKind {
    /// Classify a channel id; `None` if it is not 0-5
    pub fn of(ch: usize) -> Option<Self> {
        match ch {
            0..=2 => Some(ChannelKind::Fm(ch)),
            3..=5 => Some(ChannelKind::Ssg(ch - SSG_CH_A)),
            _ => None,
        }
    }
}

pub use bus::{ChipBus, Port, RecordingBus, RegisterWrite};
pub use chip::Ym2203;
pub use mixer::{MixerFlags, SsgMixer, ToneNoiseMode};
pub use registers::{Register, RegisterClass};
