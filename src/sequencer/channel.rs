//! Per-channel sequencer state

use std::sync::Arc;

use crate::mml::{DEFAULT_GATE_TIME, DEFAULT_LENGTH, DEFAULT_OCTAVE};

/// Playback state of one channel
///
/// The phrase is shared immutable text; the channel only keeps a byte cursor
/// into it. `set_note` replaces `phrase`, while the scan keeps reading
/// `active` until the next `play()` copies the handle over.
#[derive(Debug, Clone)]
pub struct ChannelState {
    pub(crate) phrase: Arc<str>,
    pub(crate) active: Arc<str>,
    pub(crate) cursor: usize,
    pub(crate) octave: u8,
    pub(crate) default_length: u16,
    pub(crate) gate_time: u8,
    pub(crate) step: u32,
    pub(crate) gate: u32,
    pub(crate) ended: bool,
    pub(crate) tied: bool,
    pub(crate) tied_key: Option<u8>,
}

impl ChannelState {
    /// Fresh channel with an empty phrase
    pub fn new() -> Self {
        let empty: Arc<str> = Arc::from("");
        ChannelState {
            phrase: Arc::clone(&empty),
            active: empty,
            cursor: 0,
            octave: DEFAULT_OCTAVE,
            default_length: DEFAULT_LENGTH,
            gate_time: DEFAULT_GATE_TIME,
            step: 0,
            gate: 0,
            ended: true,
            tied: false,
            tied_key: None,
        }
    }

    /// Start the stored phrase from the top; the first scan fires on the next tick.
    ///
    /// Octave, default length and gate time carry over from the previous run.
    pub(crate) fn rewind(&mut self) {
        self.active = Arc::clone(&self.phrase);
        self.cursor = 0;
        self.step = 1;
        self.gate = 0;
        self.ended = false;
        self.tied = false;
    }

    /// Jump to the end of the active phrase and stop scanning it
    pub(crate) fn terminate(&mut self) {
        self.cursor = self.active.len();
        self.step = 0;
        self.gate = 0;
        self.tied = false;
        self.ended = true;
    }

    /// Phrase the next `play()` starts
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Phrase currently being scanned
    pub fn active_phrase(&self) -> &str {
        &self.active
    }

    /// Unread part of the active phrase
    pub fn remaining(&self) -> &str {
        &self.active[self.cursor..]
    }

    /// Byte offset of the scan in the active phrase
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current octave (1-8)
    pub fn octave(&self) -> u8 {
        self.octave
    }

    /// Default note length in 96th notes
    pub fn default_length(&self) -> u16 {
        self.default_length
    }

    /// Gate time in eighths of the note length
    pub fn gate_time(&self) -> u8 {
        self.gate_time
    }

    /// Ticks until the next scan
    pub fn step_counter(&self) -> u32 {
        self.step
    }

    /// Ticks until key-off
    pub fn gate_counter(&self) -> u32 {
        self.gate
    }

    /// The phrase has been fully consumed (or aborted)
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// The last note carried `&`
    pub fn is_tied(&self) -> bool {
        self.tied
    }

    /// Key of the last tied note
    pub fn tied_key(&self) -> Option<u8> {
        self.tied_key
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}
