//! JSON song description
//!
//! A song is a set of sections, each holding one phrase per channel, played
//! in the order given by `sequence`. Voices are defined once by name, either
//! field by field or as a 5x10 matrix, and assigned to FM channels in the
//! channel setup or at the start of a sequence step.
//!
//! ```json
//! {
//!   "title": "Scale",
//!   "tempo": 120,
//!   "voices": { "bell": [[4, 15, 0, 0, 0, 0, 0, 0, 0, 0], ...] },
//!   "channels": [ { "channel": 0, "voice": "bell" }, { "channel": 3, "volume": 12 } ],
//!   "sections": [ ["CDEF", "", "", "GAB", "", ""] ],
//!   "sequence": [0, 0]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::mml::{next_command, tokenize, Accidental, Command, MmlError, MmlErrorKind};
use crate::mml::{DEFAULT_OCTAVE, MAX_OCTAVE, MIN_OCTAVE};
use crate::sequencer::{MmlPlayer, PlayerConfig};
use crate::timer::{TickSource, TimerConfig, DEFAULT_TEMPO};
use crate::voice::{Voice, VoiceMatrix};
use crate::ym2203::bus::ChipBus;
use crate::ym2203::tables::KEY_NUM;
use crate::ym2203::{ChannelKind, ALL_CH_NUM};
use crate::{Error, Result};

/// A voice in either accepted form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VoiceDef {
    /// 5x10 matrix layout
    Matrix(VoiceMatrix),
    /// Field-by-field layout
    Fields(Voice),
}

impl VoiceDef {
    /// Build the voice
    pub fn to_voice(&self) -> Voice {
        match self {
            VoiceDef::Matrix(matrix) => Voice::from_matrix(matrix),
            VoiceDef::Fields(voice) => *voice,
        }
    }
}

/// SSG envelope setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeSetup {
    /// Envelope shape (8-15)
    pub shape: u8,
    /// Envelope period
    pub interval: u16,
}

/// Initial setup of one channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSetup {
    /// Channel id (0-2 FM, 3-5 SSG)
    pub channel: usize,
    /// Named voice (FM only)
    #[serde(default)]
    pub voice: Option<String>,
    /// Volume (0-15)
    #[serde(default)]
    pub volume: Option<u8>,
    /// Gate time in eighths (1-8)
    #[serde(default)]
    pub gate_time: Option<u8>,
    /// Envelope (SSG only)
    #[serde(default)]
    pub envelope: Option<EnvelopeSetup>,
    /// Tone/noise mode (SSG only): 0 tone, 1 noise, 2 both
    #[serde(default)]
    pub tone_noise: Option<u8>,
}

/// Voice assignment made before a sequence step starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceChange {
    /// Index into `sequence`
    pub step: usize,
    /// FM channel
    pub channel: usize,
    /// Named voice
    pub voice: String,
}

/// A complete song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Display title
    #[serde(default)]
    pub title: Option<String>,
    /// Tempo in quarter notes per minute
    #[serde(default = "default_tempo")]
    pub tempo: u16,
    /// Tick timer clocking
    #[serde(default)]
    pub timer: TimerConfig,
    /// Named voices
    #[serde(default)]
    pub voices: BTreeMap<String, VoiceDef>,
    /// Per-channel setup applied once before the first step
    #[serde(default)]
    pub channels: Vec<ChannelSetup>,
    /// Sections of six phrases, one per channel
    pub sections: Vec<[String; ALL_CH_NUM]>,
    /// Section indices in play order; empty means every section once
    #[serde(default)]
    pub sequence: Vec<usize>,
    /// Voice changes keyed by sequence step
    #[serde(default)]
    pub voice_changes: Vec<VoiceChange>,
}

fn default_tempo() -> u16 {
    DEFAULT_TEMPO
}

fn is_fm(ch: usize) -> bool {
    matches!(ChannelKind::of(ch), Some(ChannelKind::Fm(_)))
}

impl Song {
    /// Parse and validate a song
    pub fn from_json(text: &str) -> Result<Self> {
        let song: Song = serde_json::from_str(text)?;
        song.validate()?;
        Ok(song)
    }

    /// Read, parse and validate a song file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Player setup for this song's timer and tempo
    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig {
            timer: self.timer,
            tempo: self.tempo,
        }
    }

    /// Check references, ranges, every phrase's syntax and the pitch range
    /// reached in play order
    pub fn validate(&self) -> Result<()> {
        if self.timer.tick_period(self.tempo).is_none() {
            return Err(Error::Config(format!(
                "no tick period for tempo {} with prescaler {}",
                self.tempo, self.timer.prescaler
            )));
        }
        if self.sections.is_empty() {
            return Err(Error::Config("song has no sections".into()));
        }

        for setup in &self.channels {
            if setup.channel >= ALL_CH_NUM {
                return Err(Error::Config(format!("no channel {}", setup.channel)));
            }
            if let Some(name) = &setup.voice {
                self.check_voice(setup.channel, name)?;
            }
        }

        for (step, &section) in self.sequence.iter().enumerate() {
            if section >= self.sections.len() {
                return Err(Error::Config(format!(
                    "sequence step {} names missing section {}",
                    step, section
                )));
            }
        }

        let steps = self.play_order().len();
        for change in &self.voice_changes {
            if change.step >= steps {
                return Err(Error::Config(format!("voice change at missing step {}", change.step)));
            }
            self.check_voice(change.channel, &change.voice)?;
        }

        for section in &self.sections {
            for (ch, phrase) in section.iter().enumerate() {
                tokenize(ch, phrase)?;
            }
        }
        self.check_pitch_range()
    }

    /// Follow each channel's octave through the play order, as playback does,
    /// and report the first sharp or flat that leaves octaves 1-8
    fn check_pitch_range(&self) -> Result<()> {
        let mut octaves = [DEFAULT_OCTAVE; ALL_CH_NUM];
        for section in self.play_order().iter().filter_map(|&s| self.sections.get(s)) {
            for (ch, phrase) in section.iter().enumerate() {
                let octave = &mut octaves[ch];
                let mut rest = phrase.as_str();
                loop {
                    let position = phrase.len() - rest.len();
                    let (next, command) =
                        next_command(rest).map_err(|err| err.at(ch, position))?;
                    match command {
                        Command::Octave(value) => *octave = value,
                        Command::OctaveUp => *octave = (*octave + 1).min(MAX_OCTAVE),
                        Command::OctaveDown => *octave = octave.saturating_sub(1).max(MIN_OCTAVE),
                        Command::Note(note) => {
                            let out_of_range = match (note.key, note.accidental) {
                                (Some(key), Some(Accidental::Sharp))
                                    if key as usize + 1 == KEY_NUM && *octave >= MAX_OCTAVE =>
                                {
                                    Some(('#', MmlErrorKind::PitchTooHigh))
                                }
                                (Some(0), Some(Accidental::Flat)) if *octave <= MIN_OCTAVE => {
                                    Some(('-', MmlErrorKind::PitchTooLow))
                                }
                                _ => None,
                            };
                            if let Some((command, kind)) = out_of_range {
                                return Err(MmlError {
                                    channel: ch,
                                    position,
                                    command,
                                    kind,
                                }
                                .into());
                            }
                        }
                        Command::End => break,
                        _ => {}
                    }
                    rest = next;
                }
            }
        }
        Ok(())
    }

    fn check_voice(&self, ch: usize, name: &str) -> Result<()> {
        if !is_fm(ch) {
            return Err(Error::Config(format!("voice '{}' on non-FM channel {}", name, ch)));
        }
        if !self.voices.contains_key(name) {
            return Err(Error::Config(format!("unknown voice '{}'", name)));
        }
        Ok(())
    }

    /// Named voice
    pub fn voice(&self, name: &str) -> Option<Voice> {
        self.voices.get(name).map(VoiceDef::to_voice)
    }

    /// Section indices in play order
    pub fn play_order(&self) -> Vec<usize> {
        if self.sequence.is_empty() {
            (0..self.sections.len()).collect()
        } else {
            self.sequence.clone()
        }
    }

    /// Apply tempo and channel setup
    pub fn setup<B: ChipBus, T: TickSource>(&self, player: &mut MmlPlayer<B, T>) {
        player.set_tempo(self.tempo);
        for setup in &self.channels {
            let ch = setup.channel;
            if let Some(voice) = setup.voice.as_deref().and_then(|name| self.voice(name)) {
                player.set_timbre(ch, &voice);
            }
            if let Some(volume) = setup.volume {
                player.set_volume(ch, volume);
            }
            if let Some(gate_time) = setup.gate_time {
                player.set_gate_time(ch, gate_time);
            }
            if let Some(envelope) = setup.envelope {
                player.set_envelope(ch, envelope.shape, envelope.interval);
            }
            if let Some(mode) = setup.tone_noise {
                player.set_tone_noise(ch, mode);
            }
        }
    }

    /// Apply the voice changes of `step` and load its section's phrases.
    ///
    /// Returns false when `step` is past the end of the play order.
    pub fn load_step<B: ChipBus, T: TickSource>(
        &self,
        player: &mut MmlPlayer<B, T>,
        step: usize,
    ) -> bool {
        let Some(section) = self.play_order().get(step).and_then(|&s| self.sections.get(s)) else {
            return false;
        };
        for change in self.voice_changes.iter().filter(|c| c.step == step) {
            if let Some(voice) = self.voice(&change.voice) {
                debug!("step {}: ch{} voice '{}'", step, change.channel, change.voice);
                player.set_timbre(change.channel, &voice);
            }
        }
        for (ch, phrase) in section.iter().enumerate() {
            player.set_note(ch, phrase.as_str());
        }
        true
    }
}
