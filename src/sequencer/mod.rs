//! MML sequencer engine
//!
//! [`MmlPlayer`] owns the chip driver, the six channel states and the voice
//! bank. The tick source calls [`MmlPlayer::on_tick`] once per tick; every
//! other method is a foreground operation. The player itself does no
//! locking: wrap it in a [`SharedPlayer`] when ticks arrive from another
//! thread, so each call runs as one critical section.

pub mod channel;
pub mod shared;

use std::sync::Arc;

use log::{debug, info, warn};
use num_traits::FromPrimitive;

use crate::mml::{next_command, Accidental, Command, MmlError, MmlErrorKind, NoteEvent};
use crate::mml::{MAX_OCTAVE, MIN_OCTAVE};
use crate::timer::{TickPeriod, TickSource, TimerConfig, DEFAULT_TEMPO};
use crate::voice::{Voice, VoiceBank};
use crate::ym2203::bus::ChipBus;
use crate::ym2203::mixer::ToneNoiseMode;
use crate::ym2203::tables::KEY_NUM;
use crate::ym2203::{ChannelKind, Ym2203, ALL_CH_NUM};

pub use channel::ChannelState;
pub use shared::SharedPlayer;

/// Ticks per 96th note
pub const TICKS_PER_LENGTH_UNIT: u32 = 8;

/// Player setup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Tick timer clocking
    pub timer: TimerConfig,
    /// Tempo programmed by `begin()`
    pub tempo: u16,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            timer: TimerConfig::default(),
            tempo: DEFAULT_TEMPO,
        }
    }
}

/// Six-channel MML player
pub struct MmlPlayer<B: ChipBus, T: TickSource> {
    chip: Ym2203<B>,
    ticks: T,
    config: PlayerConfig,
    tempo: u16,
    period: Option<TickPeriod>,
    channels: [ChannelState; ALL_CH_NUM],
    bank: VoiceBank,
    playing: bool,
    tick_count: u64,
    errors: Vec<MmlError>,
}

impl<B: ChipBus, T: TickSource> MmlPlayer<B, T> {
    /// Create a player; call [`MmlPlayer::begin`] before playing
    pub fn new(bus: B, ticks: T, config: PlayerConfig) -> Self {
        MmlPlayer {
            chip: Ym2203::new(bus),
            ticks,
            config,
            tempo: config.tempo,
            period: None,
            channels: Default::default(),
            bank: VoiceBank::new(),
            playing: false,
            tick_count: 0,
            errors: Vec::new(),
        }
    }

    /// Initialize the chip, program the tick timer and load the preset voices
    pub fn begin(&mut self) {
        self.chip.begin();
        self.set_tempo(self.config.tempo);
        self.bank = VoiceBank::new();
        info!("player ready, tempo {}", self.tempo);
    }

    // ------------------------------------------------------------------
    // Foreground API
    // ------------------------------------------------------------------

    /// Change the tempo in quarter notes per minute.
    ///
    /// The tick timer restarts from zero, so the tick in progress is cut
    /// short rather than stretched. A tempo of 0 is ignored.
    pub fn set_tempo(&mut self, bpm: u16) {
        let Some(period) = self.config.timer.tick_period(bpm) else {
            warn!("ignoring tempo {}", bpm);
            return;
        };
        self.ticks.program(period);
        self.tempo = bpm;
        self.period = Some(period);
        info!(
            "tempo {} bpm, compare {}, tick {:?}",
            bpm, period.compare, period.period
        );
    }

    /// Store the phrase a channel plays from the next [`MmlPlayer::play`]
    pub fn set_note(&mut self, ch: usize, phrase: impl Into<Arc<str>>) {
        if let Some(state) = self.channels.get_mut(ch) {
            state.phrase = phrase.into();
        }
    }

    /// Start every channel's stored phrase from the top
    pub fn play(&mut self) {
        for state in self.channels.iter_mut() {
            state.rewind();
        }
        self.playing = true;
        info!("play");
    }

    /// Key every channel off and stop ticking the phrases
    pub fn stop(&mut self) {
        for ch in 0..ALL_CH_NUM {
            self.chip.note_off(ch);
        }
        self.playing = false;
        info!("stop after {} ticks", self.tick_count);
    }

    /// Whether phrases are being played
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Set a channel's volume (0-15)
    pub fn set_volume(&mut self, ch: usize, volume: u8) {
        self.chip.set_volume(ch, volume);
    }

    /// Put an SSG channel on the envelope generator (shape 8-15)
    pub fn set_envelope(&mut self, ch: usize, shape: u8, interval: u16) {
        self.chip.set_envelope(ch, shape, interval);
    }

    /// Select tone (0), noise (1) or both (2) for an SSG channel; other modes are ignored
    pub fn set_tone_noise(&mut self, ch: usize, mode: u8) {
        match ToneNoiseMode::from_u8(mode) {
            Some(mode) => self.chip.set_tone_noise(ch, mode),
            None => debug!("ignoring tone/noise mode {} on ch{}", mode, ch),
        }
    }

    /// Set a channel's gate time in eighths (1-8); other values are ignored
    pub fn set_gate_time(&mut self, ch: usize, gate_time: u8) {
        if !(1..=8).contains(&gate_time) {
            return;
        }
        if let Some(state) = self.channels.get_mut(ch) {
            state.gate_time = gate_time;
        }
    }

    /// Program a voice into an FM channel
    pub fn set_timbre(&mut self, ch: usize, voice: &Voice) {
        self.chip.set_voice(ch, voice);
    }

    /// Replace a voice bank slot used by `@n`; false if the slot does not exist
    pub fn set_bank_voice(&mut self, slot: usize, voice: Voice) -> bool {
        self.bank.set(slot, voice)
    }

    /// Drain the MML errors raised since the last call
    pub fn take_errors(&mut self) -> Vec<MmlError> {
        std::mem::take(&mut self.errors)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// State of channel `ch`
    pub fn channel(&self, ch: usize) -> Option<&ChannelState> {
        self.channels.get(ch)
    }

    /// The chip driver
    pub fn chip(&self) -> &Ym2203<B> {
        &self.chip
    }

    /// The chip driver, mutably
    pub fn chip_mut(&mut self) -> &mut Ym2203<B> {
        &mut self.chip
    }

    /// The tick source
    pub fn ticks(&self) -> &T {
        &self.ticks
    }

    /// The voice bank
    pub fn voice_bank(&self) -> &VoiceBank {
        &self.bank
    }

    /// Current tempo
    pub fn tempo(&self) -> u16 {
        self.tempo
    }

    /// Current tick timing, once a tempo has been programmed
    pub fn tick_period(&self) -> Option<TickPeriod> {
        self.period
    }

    /// Ticks handled while playing since creation
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ------------------------------------------------------------------
    // Tick handler
    // ------------------------------------------------------------------

    /// Advance every running channel by one tick
    pub fn on_tick(&mut self) {
        if !self.playing {
            return;
        }
        self.tick_count += 1;

        for ch in 0..ALL_CH_NUM {
            if self.channels[ch].ended {
                continue;
            }

            let state = &mut self.channels[ch];
            if state.gate > 0 {
                state.gate -= 1;
                if state.gate == 0 && !state.tied {
                    self.chip.note_off(ch);
                }
            }

            let state = &mut self.channels[ch];
            if state.step > 0 {
                state.step -= 1;
                if state.step == 0 {
                    self.scan_one_note(ch);
                }
            }
        }

        if self.channels.iter().all(|state| state.ended) {
            self.stop();
        }
    }

    /// Consume tokens until a note, a rest or the end of the phrase
    fn scan_one_note(&mut self, ch: usize) {
        let text = Arc::clone(&self.channels[ch].active);
        loop {
            let position = self.channels[ch].cursor;
            let (rest, command) = match next_command(&text[position..]) {
                Ok(token) => token,
                Err(err) => {
                    self.abort_channel(err.at(ch, position));
                    return;
                }
            };
            self.channels[ch].cursor = text.len() - rest.len();
            debug!("ch{} @{}: {:?}", ch, position, command);

            let state = &mut self.channels[ch];
            match command {
                Command::Octave(octave) => state.octave = octave,
                Command::OctaveUp => {
                    if state.octave < MAX_OCTAVE {
                        state.octave += 1;
                    }
                }
                Command::OctaveDown => {
                    if state.octave > MIN_OCTAVE {
                        state.octave -= 1;
                    }
                }
                Command::Length(length) => state.default_length = length,
                Command::GateTime(gate_time) => state.gate_time = gate_time,
                Command::Volume(volume) => self.chip.set_volume(ch, volume),
                Command::Voice(slot) => self.select_voice(ch, slot),
                Command::Note(note) => {
                    self.start_note(ch, position, note);
                    return;
                }
                Command::End => {
                    debug!("ch{} end of phrase", ch);
                    state.ended = true;
                    return;
                }
            }
        }
    }

    fn select_voice(&mut self, ch: usize, slot: u8) {
        if !matches!(ChannelKind::of(ch), Some(ChannelKind::Fm(_))) {
            debug!("ch{}: voice select ignored on SSG", ch);
            return;
        }
        if let Some(voice) = self.bank.get(slot as usize).copied() {
            self.chip.set_voice(ch, &voice);
        }
    }

    /// Resolve the note's pitch, load the step/gate counters and key on
    fn start_note(&mut self, ch: usize, position: usize, note: NoteEvent) {
        let mut octave = self.channels[ch].octave;
        let key = match (note.key, note.accidental) {
            (None, _) => None,
            (Some(key), None) => Some(key),
            (Some(key), Some(Accidental::Sharp)) => {
                if key as usize + 1 == KEY_NUM {
                    if octave >= MAX_OCTAVE {
                        self.abort_channel(MmlError {
                            channel: ch,
                            position,
                            command: '#',
                            kind: MmlErrorKind::PitchTooHigh,
                        });
                        return;
                    }
                    octave += 1;
                    Some(0)
                } else {
                    Some(key + 1)
                }
            }
            (Some(key), Some(Accidental::Flat)) => {
                if key == 0 {
                    if octave <= MIN_OCTAVE {
                        self.abort_channel(MmlError {
                            channel: ch,
                            position,
                            command: '-',
                            kind: MmlErrorKind::PitchTooLow,
                        });
                        return;
                    }
                    octave -= 1;
                    Some(KEY_NUM as u8 - 1)
                } else {
                    Some(key - 1)
                }
            }
        };

        let state = &mut self.channels[ch];
        let was_tied = state.tied;
        let tied_key = state.tied_key;
        if note.tie {
            state.tied = true;
            state.tied_key = key;
        } else {
            state.tied = false;
        }

        let length = note.ticks(state.default_length) as u32;
        state.step = length * TICKS_PER_LENGTH_UNIT;
        state.gate = length * state.gate_time as u32;

        match key {
            Some(key) if was_tied && tied_key == Some(key) => {
                debug!("ch{} tie, key {} held", ch, key);
            }
            Some(key) => {
                self.chip.set_pitch(ch, octave, key as usize);
                self.chip.note_on(ch);
            }
            None => debug!("ch{} rest {}", ch, length),
        }
    }

    /// Report an MML error and end the channel
    fn abort_channel(&mut self, error: MmlError) {
        warn!("MML error: {}", error);
        let ch = error.channel;
        self.chip.note_off(ch);
        self.channels[ch].terminate();
        self.errors.push(error);
    }
}
