//! Single-token MML lexer
//!
//! [`next_command`] reads exactly one token from the front of a phrase and
//! returns the unread remainder, so the sequencer can keep a plain byte cursor
//! into the phrase between ticks.

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, one_of, satisfy};
use nom::combinator::{map, opt, value, verify};
use nom::sequence::pair;
use nom::IResult;
use thiserror::Error;

use super::{
    letter_key, Accidental, Command, MmlError, MmlErrorKind, NoteEvent, MAX_OCTAVE, MIN_OCTAVE,
};
use crate::voice::VOICE_BANK_SIZE;

type Lex<'a, T> = IResult<&'a str, T>;

/// Lexer failure, keyed by the command character that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("command '{command}': {kind}")]
pub struct TokenError {
    /// Offending command character
    pub command: char,
    /// What went wrong
    pub kind: MmlErrorKind,
}

impl TokenError {
    fn new(command: char, kind: MmlErrorKind) -> Self {
        TokenError { command, kind }
    }

    /// Attach the channel and the byte offset of the command
    pub fn at(self, channel: usize, position: usize) -> MmlError {
        MmlError {
            channel,
            position,
            command: self.command,
            kind: self.kind,
        }
    }
}

fn digit(input: &str) -> Lex<'_, u8> {
    map(satisfy(|c| c.is_ascii_digit()), |c: char| c as u8 - b'0')(input)
}

fn octave(input: &str) -> Lex<'_, u8> {
    verify(digit, |d: &u8| (MIN_OCTAVE..=MAX_OCTAVE).contains(d))(input)
}

fn gate_time(input: &str) -> Lex<'_, u8> {
    verify(digit, |d: &u8| (1..=8).contains(d))(input)
}

/// `0`-`9`, or `1` followed by `0`-`5` for 10-15
fn volume(input: &str) -> Lex<'_, u8> {
    alt((
        map(pair(char('1'), verify(digit, |d: &u8| *d <= 5)), |(_, d): (char, u8)| 10 + d),
        digit,
    ))(input)
}

/// One or two decimal digits
fn voice_number(input: &str) -> Lex<'_, u8> {
    map(pair(digit, opt(digit)), |(high, low): (u8, Option<u8>)| match low {
        Some(low) => high * 10 + low,
        None => high,
    })(input)
}

/// Length denominator, longest match first, converted to 96th notes
fn length_code(input: &str) -> Lex<'_, u16> {
    alt((
        value(6u16, tag("16")),
        value(8, tag("12")),
        value(96, tag("1")),
        value(4, tag("24")),
        value(48, tag("2")),
        value(24, tag("4")),
        value(12, tag("8")),
        value(3, tag("32")),
        value(32, tag("3")),
        value(16, tag("6")),
    ))(input)
}

fn accidental_sign(input: &str) -> Lex<'_, Accidental> {
    alt((
        value(Accidental::Sharp, one_of("#+")),
        value(Accidental::Flat, char('-')),
    ))(input)
}

fn note(input: &str) -> Lex<'_, NoteEvent> {
    let (input, letter) = satisfy(|c| matches!(c.to_ascii_uppercase(), 'A'..='G' | 'R'))(input)?;
    let key = letter_key(letter);
    // Rests take no accidental
    let (input, accidental) = match key {
        Some(_) => opt(accidental_sign)(input)?,
        None => (input, None),
    };
    let (input, length) = opt(length_code)(input)?;
    let (input, dotted) = opt(char('.'))(input)?;
    let (input, tie) = opt(char('&'))(input)?;
    Ok((
        input,
        NoteEvent {
            key,
            accidental,
            length,
            dotted: dotted.is_some(),
            tie: tie.is_some(),
        },
    ))
}

fn argument<T>(command: char, result: Lex<'_, T>) -> Result<(&str, T), TokenError> {
    result.map_err(|_| TokenError::new(command, MmlErrorKind::InvalidArgument))
}

/// Read one token from the front of `input`
///
/// Returns the remainder after the token. An empty input or a NUL character
/// yields [`Command::End`].
pub fn next_command(input: &str) -> Result<(&str, Command), TokenError> {
    let mut chars = input.chars();
    let Some(first) = chars.next() else {
        return Ok((input, Command::End));
    };
    let rest = chars.as_str();
    let command = first.to_ascii_uppercase();

    match command {
        '\0' => Ok((rest, Command::End)),
        '>' => Ok((rest, Command::OctaveUp)),
        '<' => Ok((rest, Command::OctaveDown)),
        'O' => argument(command, map(octave, Command::Octave)(rest)),
        'L' => argument(command, map(length_code, Command::Length)(rest)),
        'V' => argument(command, map(volume, Command::Volume)(rest)),
        'Q' => argument(command, map(gate_time, Command::GateTime)(rest)),
        '@' => {
            let (rest, number) = argument(command, voice_number(rest))?;
            if number as usize >= VOICE_BANK_SIZE {
                return Err(TokenError::new(command, MmlErrorKind::VoiceOutOfRange));
            }
            Ok((rest, Command::Voice(number)))
        }
        'A'..='G' | 'R' => argument(command, map(note, Command::Note)(input)),
        _ => Err(TokenError::new(first, MmlErrorKind::UnknownCommand)),
    }
}

/// Split a whole phrase into tokens, ending with [`Command::End`]
///
/// Used to check phrases up front; playback itself reads one token at a time.
pub fn tokenize(channel: usize, phrase: &str) -> Result<Vec<Command>, MmlError> {
    let mut rest = phrase;
    let mut commands = Vec::new();
    loop {
        let position = phrase.len() - rest.len();
        let (next, command) = next_command(rest).map_err(|err| err.at(channel, position))?;
        commands.push(command);
        if command == Command::End {
            return Ok(commands);
        }
        rest = next;
    }
}
