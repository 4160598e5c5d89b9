//! YM2203 register driver
//!
//! Turns logical channel operations into register writes. Channels 0-2 are the
//! FM block, 3-5 the SSG block; operations addressed to the wrong block or to
//! a channel outside 0-5 are ignored. No operation can fail: bus access is
//! assumed to always succeed.

use log::{debug, trace};

use super::bus::{ChipBus, Port};
use super::mixer::{SsgMixer, ToneNoiseMode};
use super::registers::{Register, RegisterClass, ADDRESS_SETUP_US};
use super::tables::{fm_frequency, ssg_period, KEY_NUM, MAX_PITCH_OCTAVE};
use super::{ChannelKind, FM_CH_NUM, SSG_CH_NUM};
use crate::voice::{OperatorMask, Voice, OPERATOR_NUM};

/// Total-level attenuation per volume step below 15
const ATTENUATION_PER_STEP: u8 = 3;

/// Envelope shapes that run once and must be re-armed on every key-on
const ONE_SHOT_ENVELOPES: [u8; 2] = [9, 15];

/// Level register value that hands the channel to the envelope generator
const LEVEL_USE_ENVELOPE: u8 = 0x10;

/// YM2203 driver over a chip bus
pub struct Ym2203<B: ChipBus> {
    bus: B,
    voices: [Option<Voice>; FM_CH_NUM],
    mixer: SsgMixer,
    enveloped: [bool; SSG_CH_NUM],
    envelope_type: u8,
}

impl<B: ChipBus> Ym2203<B> {
    /// Create a driver; nothing is written until [`Ym2203::begin`]
    pub fn new(bus: B) -> Self {
        Ym2203 {
            bus,
            voices: [None; FM_CH_NUM],
            mixer: SsgMixer::new(),
            enveloped: [false; SSG_CH_NUM],
            envelope_type: 0,
        }
    }

    /// Initialize the chip: every SSG tone/noise generator keyed off
    pub fn begin(&mut self) {
        let value = self.mixer.reset();
        self.write(Register::SsgMixing.addr(), value);
    }

    /// Borrow the underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutably borrow the underlying bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Consume the driver and return the bus
    pub fn into_bus(self) -> B {
        self.bus
    }

    // ------------------------------------------------------------------
    // Register access
    // ------------------------------------------------------------------

    /// Write one register: latch, setup delay, data, class settle delay
    pub fn write(&mut self, addr: u8, value: u8) {
        trace!("reg 0x{:02X} <- 0x{:02X}", addr, value);
        self.bus.write_port(Port::Address, addr);
        self.bus.delay_us(ADDRESS_SETUP_US);
        self.bus.write_port(Port::Data, value);
        self.bus.delay_us(RegisterClass::of(addr).settle_us());
    }

    /// Latch an address without a data phase
    pub fn write_address_only(&mut self, addr: u8) {
        self.bus.write_port(Port::Address, addr);
        self.bus.delay_us(ADDRESS_SETUP_US);
    }

    /// Read one register
    pub fn read(&mut self, addr: u8) -> u8 {
        self.write_address_only(addr);
        self.bus.read_port(Port::Data)
    }

    /// Read the status register
    pub fn read_status(&mut self) -> u8 {
        self.bus.read_port(Port::Address)
    }

    fn write_mixer(&mut self, value: u8) {
        self.write(Register::SsgMixing.addr(), value);
    }

    // ------------------------------------------------------------------
    // Channel operations
    // ------------------------------------------------------------------

    /// Key the channel on
    pub fn note_on(&mut self, ch: usize) {
        debug!("note on ch{}", ch);
        match ChannelKind::of(ch) {
            Some(ChannelKind::Fm(fm)) => {
                let Some(voice) = self.voices[fm] else {
                    return;
                };
                let value = (voice.key_on_mask().bits() << 4) | fm as u8;
                self.write(Register::FmKeyOn.addr(), value);
            }
            Some(ChannelKind::Ssg(ssg)) => {
                let value = self.mixer.key_on(ssg);
                self.write_mixer(value);
                if self.enveloped[ssg] && ONE_SHOT_ENVELOPES.contains(&self.envelope_type) {
                    self.write(Register::SsgEnvType.addr(), self.envelope_type);
                }
            }
            None => {}
        }
    }

    /// Key the channel off
    pub fn note_off(&mut self, ch: usize) {
        debug!("note off ch{}", ch);
        match ChannelKind::of(ch) {
            Some(ChannelKind::Fm(fm)) => {
                self.write(Register::FmKeyOn.addr(), fm as u8);
            }
            Some(ChannelKind::Ssg(ssg)) => {
                let value = self.mixer.key_off(ssg);
                self.write_mixer(value);
            }
            None => {}
        }
    }

    /// Set the channel's pitch from an octave (0-8) and a key index (0 = C .. 11 = B).
    ///
    /// Out-of-range octaves and keys are ignored.
    pub fn set_pitch(&mut self, ch: usize, octave: u8, key: usize) {
        if key >= KEY_NUM || octave > MAX_PITCH_OCTAVE {
            debug!("ignoring pitch o{} k{} on ch{}", octave, key, ch);
            return;
        }
        debug!("set pitch ch{} o{} k{}", ch, octave, key);
        match ChannelKind::of(ch) {
            Some(ChannelKind::Fm(fm)) => {
                let (high, low) = fm_frequency(octave, key);
                self.write(Register::FmFreqHi.at(fm as u8), high);
                self.write(Register::FmFreqLo.at(fm as u8), low);
            }
            Some(ChannelKind::Ssg(ssg)) => {
                let period = ssg_period(octave, key);
                let offset = (ssg * 2) as u8;
                self.write(Register::SsgToneFreqLo.at(offset), (period & 0xFF) as u8);
                self.write(Register::SsgToneFreqHi.at(offset), (period >> 8) as u8 & 0x0F);
            }
            None => {}
        }
    }

    /// Set the channel's volume (0 = quietest, 15 = loudest)
    ///
    /// FM channels scale the carrier total levels of the assigned voice and
    /// need one to be assigned. SSG channels get a fixed level, which also
    /// takes them off the envelope generator. Volumes above 15 are ignored.
    pub fn set_volume(&mut self, ch: usize, volume: u8) {
        if volume > 15 {
            return;
        }
        match ChannelKind::of(ch) {
            Some(ChannelKind::Fm(fm)) => {
                let Some(voice) = self.voices[fm] else {
                    return;
                };
                let attenuation = (15 - volume) * ATTENUATION_PER_STEP;
                let carriers = voice.carriers();
                // Operator 4 first, then 2, 3, 1
                for op in [3, 1, 2, 0] {
                    if carriers.contains(OperatorMask::of(op)) {
                        let tl = voice.operator(op).tl.wrapping_add(attenuation) & 0x7F;
                        self.write(Register::FmTotalLevel.operator(fm, op), tl);
                    }
                }
            }
            Some(ChannelKind::Ssg(ssg)) => {
                self.write(Register::SsgLevelEnv.at(ssg as u8), volume & 0x0F);
                self.enveloped[ssg] = false;
            }
            None => {}
        }
    }

    /// Put an SSG channel on the envelope generator
    ///
    /// The envelope shape and period are chip-wide; the last call wins for
    /// every enveloped channel.
    pub fn set_envelope(&mut self, ch: usize, shape: u8, interval: u16) {
        let Some(ChannelKind::Ssg(ssg)) = ChannelKind::of(ch) else {
            return;
        };
        self.write(Register::SsgLevelEnv.at(ssg as u8), LEVEL_USE_ENVELOPE);
        self.enveloped[ssg] = true;

        let shape = shape & 0x0F;
        self.write(Register::SsgEnvType.addr(), shape);
        self.envelope_type = shape;

        self.write(Register::SsgEnvFreqLo.addr(), (interval & 0xFF) as u8);
        self.write(Register::SsgEnvFreqHi.addr(), (interval >> 8) as u8);
    }

    /// Select which generator(s) an SSG channel's key-on/off toggles
    pub fn set_tone_noise(&mut self, ch: usize, mode: ToneNoiseMode) {
        if let Some(ChannelKind::Ssg(ssg)) = ChannelKind::of(ch) {
            self.mixer.set_mode(ssg, mode);
        }
    }

    /// Program a voice into an FM channel and keep a copy for key-on and volume
    pub fn set_voice(&mut self, ch: usize, voice: &Voice) {
        let Some(ChannelKind::Fm(fm)) = ChannelKind::of(ch) else {
            return;
        };
        debug!("set voice ch{} alg{} fb{}", ch, voice.algorithm, voice.feedback);
        for op in 0..OPERATOR_NUM {
            let params = voice.operator(op);
            self.write(Register::FmDetuneMulti.operator(fm, op), params.detune_multiple());
            self.write(Register::FmTotalLevel.operator(fm, op), params.tl & 0x7F);
            self.write(Register::FmKeyScaleAttack.operator(fm, op), params.key_scale_attack());
            self.write(Register::FmDecayRate.operator(fm, op), params.dr & 0x1F);
            self.write(Register::FmSustainRate.operator(fm, op), params.sr & 0x1F);
            self.write(Register::FmSustainRelease.operator(fm, op), params.sustain_release());
        }
        self.write(Register::FmFeedbackAlgorithm.at(fm as u8), voice.feedback_algorithm());
        self.voices[fm] = Some(*voice);
    }

    // ------------------------------------------------------------------
    // State accessors
    // ------------------------------------------------------------------

    /// Voice currently assigned to an FM channel
    pub fn voice(&self, ch: usize) -> Option<&Voice> {
        match ChannelKind::of(ch) {
            Some(ChannelKind::Fm(fm)) => self.voices[fm].as_ref(),
            _ => None,
        }
    }

    /// Last value written to the SSG mixer register
    pub fn mixer_value(&self) -> u8 {
        self.mixer.value()
    }

    /// Whether an SSG channel is driven by the envelope generator
    pub fn is_enveloped(&self, ch: usize) -> bool {
        match ChannelKind::of(ch) {
            Some(ChannelKind::Ssg(ssg)) => self.enveloped[ssg],
            _ => false,
        }
    }

    /// Envelope shape last programmed
    pub fn envelope_type(&self) -> u8 {
        self.envelope_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ym2203::bus::RecordingBus;
    use crate::ym2203::{FM_CH1, FM_CH3, SSG_CH_A, SSG_CH_B, SSG_CH_C};

    fn chip() -> Ym2203<RecordingBus> {
        let mut chip = Ym2203::new(RecordingBus::new());
        chip.begin();
        chip.bus_mut().clear_log();
        chip
    }

    fn voice(algorithm: u8) -> Voice {
        let mut voice = Voice::new(algorithm, 3, 0x0F);
        voice.set_tl(10, 20, 30, 40);
        voice
    }

    fn pairs(chip: &Ym2203<RecordingBus>) -> Vec<(u8, u8)> {
        chip.bus().writes().iter().map(|w| (w.address, w.value)).collect()
    }

    #[test]
    fn test_begin_keys_ssg_off() {
        let mut chip = Ym2203::new(RecordingBus::new());
        chip.begin();
        assert_eq!(pairs(&chip), vec![(0x07, 0x3F)]);
        assert_eq!(chip.mixer_value(), 0x3F);
    }

    #[test]
    fn test_write_settle_times() {
        let mut chip = chip();
        let start = chip.bus().elapsed_us();
        chip.write(0x07, 0x3F);
        assert_eq!(chip.bus().elapsed_us() - start, 5 + 5);

        let start = chip.bus().elapsed_us();
        chip.write(0x28, 0x00);
        assert_eq!(chip.bus().elapsed_us() - start, 5 + 21);

        let start = chip.bus().elapsed_us();
        chip.write(0xA4, 0x22);
        assert_eq!(chip.bus().elapsed_us() - start, 5 + 12);
    }

    #[test]
    fn test_read_and_status() {
        let mut chip = chip();
        chip.write(0x0B, 0x55);
        assert_eq!(chip.read(0x0B), 0x55);
        chip.bus_mut().set_status(0x03);
        assert_eq!(chip.read_status(), 0x03);

        let cycles = chip.bus().address_cycles();
        chip.write_address_only(0x0D);
        assert_eq!(chip.bus().address_cycles(), cycles + 1);
        assert!(chip.bus().writes().len() == 1);
    }

    #[test]
    fn test_fm_note_on_requires_voice() {
        let mut chip = chip();
        chip.note_on(FM_CH1);
        assert!(chip.bus().writes().is_empty());

        chip.set_voice(FM_CH3, &Voice::new(4, 0, 0x0B));
        chip.bus_mut().clear_log();
        chip.note_on(FM_CH3);
        chip.note_off(FM_CH3);
        assert_eq!(pairs(&chip), vec![(0x28, 0xB2), (0x28, 0x02)]);
    }

    #[test]
    fn test_fm_set_pitch() {
        let mut chip = chip();
        chip.set_pitch(1, 4, 9);
        assert_eq!(pairs(&chip), vec![(0xA5, 0x24), (0xA1, 0x0E)]);
    }

    #[test]
    fn test_ssg_set_pitch() {
        let mut chip = chip();
        chip.set_pitch(SSG_CH_B, 4, 9);
        // 284 = 0x011C
        assert_eq!(pairs(&chip), vec![(0x02, 0x1C), (0x03, 0x01)]);
    }

    #[test]
    fn test_out_of_range_pitch_ignored() {
        let mut chip = chip();
        chip.set_pitch(FM_CH1, 4, KEY_NUM);
        chip.set_pitch(SSG_CH_A, 4, 255);
        chip.set_pitch(SSG_CH_A, 20, 0);
        chip.set_pitch(FM_CH1, 9, 0);
        assert!(chip.bus().writes().is_empty());

        // Octave 8 is still accepted
        chip.set_pitch(SSG_CH_A, 8, 0);
        assert_eq!(chip.bus().writes().len(), 2);
    }

    #[test]
    fn test_set_voice_writes() {
        let mut chip = chip();
        let mut voice = Voice::new(5, 6, 0x0F);
        voice.set_ar(31, 30, 29, 28);
        voice.set_ks(1, 2, 3, 0);
        voice.set_sl(1, 2, 3, 4);
        voice.set_rr(15, 14, 13, 12);
        voice.set_ml(1, 2, 3, 4);
        voice.set_dt(-1, 0, 2, -3);
        voice.set_tl(0x80, 1, 2, 3);
        chip.set_voice(1, &voice);

        let writes = pairs(&chip);
        assert_eq!(writes.len(), OPERATOR_NUM * 6 + 1);
        // Operator 1 of channel 2
        assert_eq!(writes[0], (0x31, 0x51));
        assert_eq!(writes[1], (0x41, 0x00));
        assert_eq!(writes[2], (0x51, 0x5F));
        assert_eq!(writes[5], (0x81, 0x1F));
        // Operator 2 sits at slot offset 0x08
        assert_eq!(writes[6], (0x39, 0x02));
        // Operator 4 detune -3 -> 7
        assert_eq!(writes[18], (0x3D, 0x74));
        assert_eq!(writes[24], (0xB1, 0x35));
        assert_eq!(chip.voice(1), Some(&voice));
    }

    #[test]
    fn test_voice_is_copied() {
        let mut chip = chip();
        let mut voice = voice(7);
        chip.set_voice(FM_CH1, &voice);
        voice.set_tl(127, 127, 127, 127);
        assert_eq!(chip.voice(FM_CH1).unwrap().operator(0).tl, 10);
    }

    #[test]
    fn test_fm_volume_carriers() {
        for algorithm in 0..8u8 {
            for volume in 0..=15u8 {
                let mut chip = chip();
                chip.set_voice(FM_CH1, &voice(algorithm));
                chip.bus_mut().clear_log();
                chip.set_volume(FM_CH1, volume);

                let attenuation = (15 - volume) * 3;
                let carriers = OperatorMask::carriers(algorithm);
                let mut expected = Vec::new();
                for op in [3usize, 1, 2, 0] {
                    if carriers.contains(OperatorMask::of(op)) {
                        let tl = ([10u8, 20, 30, 40][op] + attenuation) & 0x7F;
                        expected.push((Register::FmTotalLevel.operator(0, op), tl));
                    }
                }
                assert_eq!(pairs(&chip), expected, "alg {} vol {}", algorithm, volume);
            }
        }
    }

    #[test]
    fn test_fm_volume_wraps_into_seven_bits() {
        let mut chip = chip();
        let mut voice = Voice::new(0, 0, 0x0F);
        voice.set_tl(0, 0, 0, 100);
        chip.set_voice(FM_CH1, &voice);
        chip.bus_mut().clear_log();
        chip.set_volume(FM_CH1, 0);
        assert_eq!(pairs(&chip), vec![(0x4C, (100 + 45) & 0x7F)]);
    }

    #[test]
    fn test_volume_edge_cases() {
        let mut chip = chip();
        chip.set_volume(FM_CH1, 10);
        chip.set_volume(SSG_CH_A, 16);
        assert!(chip.bus().writes().is_empty());

        chip.set_volume(SSG_CH_C, 12);
        assert_eq!(pairs(&chip), vec![(0x0A, 12)]);
    }

    #[test]
    fn test_ssg_key_on_off_mirror() {
        let mut chip = chip();
        chip.note_on(SSG_CH_A);
        chip.note_on(SSG_CH_C);
        chip.note_off(SSG_CH_A);
        assert_eq!(pairs(&chip), vec![(0x07, 0x3E), (0x07, 0x3A), (0x07, 0x3B)]);
        assert_eq!(chip.bus().register(0x07), chip.mixer_value());
    }

    #[test]
    fn test_note_off_twice_keeps_mirror() {
        let mut chip = chip();
        chip.note_on(SSG_CH_B);
        chip.note_off(SSG_CH_B);
        let after_first = chip.mixer_value();
        chip.note_off(SSG_CH_B);
        assert_eq!(chip.mixer_value(), after_first);
        assert_eq!(chip.bus().register(0x07), after_first);
    }

    #[test]
    fn test_noise_mode_key_on() {
        let mut chip = chip();
        chip.set_tone_noise(SSG_CH_B, ToneNoiseMode::ToneNoise);
        chip.set_tone_noise(FM_CH1, ToneNoiseMode::Noise);
        assert!(chip.bus().writes().is_empty());
        chip.note_on(SSG_CH_B);
        assert_eq!(chip.mixer_value(), 0x3F & !0x12);
    }

    #[test]
    fn test_envelope_setup_and_rearm() {
        let mut chip = chip();
        chip.set_envelope(SSG_CH_B, 0x19, 0x1234);
        assert_eq!(
            pairs(&chip),
            vec![(0x09, 0x10), (0x0D, 0x09), (0x0B, 0x34), (0x0C, 0x12)]
        );
        assert!(chip.is_enveloped(SSG_CH_B));
        assert_eq!(chip.envelope_type(), 9);

        chip.bus_mut().clear_log();
        chip.note_on(SSG_CH_B);
        assert_eq!(pairs(&chip), vec![(0x07, 0x3D), (0x0D, 0x09)]);

        // Channel A is not enveloped: no re-arm
        chip.bus_mut().clear_log();
        chip.note_on(SSG_CH_A);
        assert_eq!(pairs(&chip), vec![(0x07, 0x3C)]);

        // A fixed level takes the channel off the envelope
        chip.set_volume(SSG_CH_B, 8);
        assert!(!chip.is_enveloped(SSG_CH_B));
    }

    #[test]
    fn test_repeating_envelope_not_rearmed() {
        let mut chip = chip();
        chip.set_envelope(SSG_CH_A, 14, 300);
        chip.bus_mut().clear_log();
        chip.note_on(SSG_CH_A);
        assert_eq!(pairs(&chip), vec![(0x07, 0x3E)]);
    }

    #[test]
    fn test_envelope_ignored_on_fm() {
        let mut chip = chip();
        chip.set_envelope(FM_CH1, 9, 100);
        chip.note_on(9);
        chip.set_pitch(6, 4, 0);
        assert!(chip.bus().writes().is_empty());
    }
}
