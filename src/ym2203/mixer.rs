//! SSG Mixer Mirror
//!
//! Register 0x07 packs the tone and noise disable bits of all three SSG
//! channels. The host cannot rely on reading it back, so the driver keeps a
//! soft copy and every key-on/off is a read-modify-write on that copy followed
//! by a write of the whole byte. The copy is only changed through [`SsgMixer`]
//! methods that return the byte to write, and the driver writes it immediately.

use bitflags::bitflags;
use num_derive::FromPrimitive;

use super::SSG_CH_NUM;

bitflags! {
    /// Mixer Control Register (0x07) bitflags (1 = disabled, 0 = enabled)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MixerFlags: u8 {
        /// Channel A tone disable
        const CH_A_TONE = 0x01;
        /// Channel B tone disable
        const CH_B_TONE = 0x02;
        /// Channel C tone disable
        const CH_C_TONE = 0x04;
        /// Channel A noise disable
        const CH_A_NOISE = 0x08;
        /// Channel B noise disable
        const CH_B_NOISE = 0x10;
        /// Channel C noise disable
        const CH_C_NOISE = 0x20;
    }
}

impl MixerFlags {
    /// Tone bit of SSG channel `ch` (0-2)
    pub fn tone(ch: usize) -> Self {
        MixerFlags::from_bits_truncate(0x01 << ch)
    }

    /// Noise bit of SSG channel `ch` (0-2)
    pub fn noise(ch: usize) -> Self {
        MixerFlags::from_bits_truncate(0x08 << ch)
    }
}

/// Which generator an SSG channel gates on key-on
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum ToneNoiseMode {
    /// Square-wave tone only (power-on default)
    Tone = 0,
    /// Noise only
    Noise = 1,
    /// Tone and noise together
    ToneNoise = 2,
}

impl ToneNoiseMode {
    /// Mixer bits toggled by key-on/off of SSG channel `ch`
    pub fn mask(&self, ch: usize) -> MixerFlags {
        match self {
            ToneNoiseMode::Tone => MixerFlags::tone(ch),
            ToneNoiseMode::Noise => MixerFlags::noise(ch),
            ToneNoiseMode::ToneNoise => MixerFlags::tone(ch) | MixerFlags::noise(ch),
        }
    }
}

/// Soft mirror of the write-only mixer register
#[derive(Debug, Clone)]
pub struct SsgMixer {
    mirror: MixerFlags,
    masks: [MixerFlags; SSG_CH_NUM],
}

impl SsgMixer {
    /// All channels keyed off, tone mode on every channel
    pub fn new() -> Self {
        SsgMixer {
            mirror: MixerFlags::all(),
            masks: [
                MixerFlags::CH_A_TONE,
                MixerFlags::CH_B_TONE,
                MixerFlags::CH_C_TONE,
            ],
        }
    }

    /// Key every channel off; returns the byte to write
    #[must_use]
    pub fn reset(&mut self) -> u8 {
        self.mirror = MixerFlags::all();
        self.mirror.bits()
    }

    /// Clear the channel's enable bits; returns the byte to write
    #[must_use]
    pub fn key_on(&mut self, ch: usize) -> u8 {
        self.mirror.remove(self.masks[ch]);
        self.mirror.bits()
    }

    /// Set the channel's enable bits back; returns the byte to write
    #[must_use]
    pub fn key_off(&mut self, ch: usize) -> u8 {
        self.mirror.insert(self.masks[ch]);
        self.mirror.bits()
    }

    /// Select the generator(s) toggled by the channel's key-on/off.
    ///
    /// Only affects later key events; the mirror itself is untouched.
    pub fn set_mode(&mut self, ch: usize, mode: ToneNoiseMode) {
        self.masks[ch] = mode.mask(ch);
    }

    /// Bits the channel toggles
    pub fn mask(&self, ch: usize) -> MixerFlags {
        self.masks[ch]
    }

    /// Last byte handed out for writing
    pub fn value(&self) -> u8 {
        self.mirror.bits()
    }
}

impl Default for SsgMixer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn test_key_on_off_tone() {
        let mut mixer = SsgMixer::new();
        assert_eq!(mixer.value(), 0x3F);
        assert_eq!(mixer.key_on(1), 0x3D);
        assert_eq!(mixer.key_on(0), 0x3C);
        assert_eq!(mixer.key_off(1), 0x3E);
    }

    #[test]
    fn test_noise_mode_masks() {
        let mut mixer = SsgMixer::new();
        mixer.set_mode(2, ToneNoiseMode::Noise);
        assert_eq!(mixer.key_on(2), 0x3F & !0x20);

        mixer.set_mode(0, ToneNoiseMode::ToneNoise);
        assert_eq!(mixer.mask(0).bits(), 0x09);
        assert_eq!(mixer.key_on(0), 0x1F & !0x09);
    }

    #[test]
    fn test_key_off_is_idempotent() {
        let mut mixer = SsgMixer::new();
        let _ = mixer.key_on(0);
        let first = mixer.key_off(0);
        let second = mixer.key_off(0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_mode_from_primitive() {
        assert_eq!(ToneNoiseMode::from_u8(0), Some(ToneNoiseMode::Tone));
        assert_eq!(ToneNoiseMode::from_u8(2), Some(ToneNoiseMode::ToneNoise));
        assert_eq!(ToneNoiseMode::from_u8(3), None);
    }
}
