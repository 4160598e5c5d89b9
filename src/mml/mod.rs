//! MML (Music Macro Language) tokens
//!
//! Phrases are plain ASCII, consumed left to right without backtracking.
//! Command letters are case-insensitive.
//!
//! | Command | Meaning |
//! | --- | --- |
//! | `O1`-`O8` | set octave |
//! | `>` / `<` | octave up / down (clamped to 1-8) |
//! | `L<n>` | default length, n in 1, 2, 3, 4, 6, 8, 12, 16, 24, 32 |
//! | `@0`-`@63` | FM voice from the voice bank |
//! | `V0`-`V15` | volume |
//! | `Q1`-`Q8` | gate time in eighths of the note length |
//! | `A`-`G`, `R` | note / rest, then optional `#` `+` `-`, length, `.`, `&` |
//!
//! Lengths are in 96th notes: a quarter note is 24.

pub mod parser;

use thiserror::Error;

pub use parser::{next_command, tokenize, TokenError};

/// Lowest octave reachable from MML
pub const MIN_OCTAVE: u8 = 1;
/// Highest octave reachable from MML
pub const MAX_OCTAVE: u8 = 8;

/// Octave of a fresh channel
pub const DEFAULT_OCTAVE: u8 = 4;
/// Default length of a fresh channel (quarter note)
pub const DEFAULT_LENGTH: u16 = 24;
/// Gate time of a fresh channel, in eighths
pub const DEFAULT_GATE_TIME: u8 = 7;

/// Note length denominators and their durations in 96th notes
pub const LENGTH_TABLE: [(u8, u16); 10] = [
    (1, 96),
    (2, 48),
    (3, 32),
    (4, 24),
    (6, 16),
    (8, 12),
    (12, 8),
    (16, 6),
    (24, 4),
    (32, 3),
];

/// Duration in 96th notes of a length denominator
pub fn length_ticks(denominator: u8) -> Option<u16> {
    LENGTH_TABLE
        .iter()
        .find(|(d, _)| *d == denominator)
        .map(|(_, ticks)| *ticks)
}

/// Chromatic key (0 = C .. 11 = B) of a note letter
pub fn letter_key(letter: char) -> Option<u8> {
    const KEYS: [u8; 7] = [9, 11, 0, 2, 4, 5, 7];
    match letter.to_ascii_uppercase() {
        c @ 'A'..='G' => Some(KEYS[(c as u8 - b'A') as usize]),
        _ => None,
    }
}

/// Sharp or flat following a note letter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accidental {
    /// `#` or `+`
    Sharp,
    /// `-`
    Flat,
}

/// A sounding token: note or rest with its modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    /// Key of the letter before any accidental, `None` for a rest
    pub key: Option<u8>,
    /// Accidental applied to the key
    pub accidental: Option<Accidental>,
    /// Explicit length in 96th notes
    pub length: Option<u16>,
    /// Dotted: length plus half of it
    pub dotted: bool,
    /// Followed by `&`
    pub tie: bool,
}

impl NoteEvent {
    /// True for `R`
    pub fn is_rest(&self) -> bool {
        self.key.is_none()
    }

    /// Duration in 96th notes given the channel's default length
    pub fn ticks(&self, default_length: u16) -> u16 {
        let length = self.length.unwrap_or(default_length);
        if self.dotted {
            length + (length >> 1)
        } else {
            length
        }
    }
}

/// One MML token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `O<n>`
    Octave(u8),
    /// `>`
    OctaveUp,
    /// `<`
    OctaveDown,
    /// `L<n>`, already converted to 96th notes
    Length(u16),
    /// `@<n>`
    Voice(u8),
    /// `V<n>`
    Volume(u8),
    /// `Q<n>`
    GateTime(u8),
    /// Note letter or `R`
    Note(NoteEvent),
    /// End of the phrase
    End,
}

/// Kind of an MML error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MmlErrorKind {
    /// Character that starts no command
    #[error("unknown command")]
    UnknownCommand,
    /// Missing or out-of-range numeric argument
    #[error("missing or invalid argument")]
    InvalidArgument,
    /// Sharp pushes the note above octave 8
    #[error("pitch above octave 8")]
    PitchTooHigh,
    /// Flat pushes the note below octave 1
    #[error("pitch below octave 1")]
    PitchTooLow,
    /// `@` with a voice number outside the bank
    #[error("voice number out of range")]
    VoiceOutOfRange,
}

/// Error raised while scanning a channel's phrase
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("channel {channel}, offset {position}, command '{command}': {kind}")]
pub struct MmlError {
    /// Channel whose phrase failed
    pub channel: usize,
    /// Byte offset of the offending command in the phrase
    pub position: usize,
    /// Offending command character
    pub command: char,
    /// What went wrong
    pub kind: MmlErrorKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_table() {
        assert_eq!(length_ticks(4), Some(24));
        assert_eq!(length_ticks(32), Some(3));
        assert_eq!(length_ticks(5), None);
    }

    #[test]
    fn test_letter_keys() {
        let keys: Vec<_> = "ABCDEFG".chars().filter_map(letter_key).collect();
        assert_eq!(keys, vec![9, 11, 0, 2, 4, 5, 7]);
        assert_eq!(letter_key('c'), Some(0));
        assert_eq!(letter_key('R'), None);
    }

    #[test]
    fn test_dotted_length() {
        let note = NoteEvent {
            key: Some(2),
            accidental: None,
            length: Some(6),
            dotted: true,
            tie: false,
        };
        assert_eq!(note.ticks(24), 9);
        assert_eq!(NoteEvent { length: None, ..note }.ticks(24), 36);
    }

    #[test]
    fn test_error_display() {
        let err = MmlError {
            channel: 3,
            position: 7,
            command: 'O',
            kind: MmlErrorKind::InvalidArgument,
        };
        assert_eq!(
            err.to_string(),
            "channel 3, offset 7, command 'O': missing or invalid argument"
        );
    }
}
